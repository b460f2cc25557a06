use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

/// The three reference entities an appointment points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Patient,
    Doctor,
    Clinic,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Patient => "patient",
            ReferenceKind::Doctor => "doctor",
            ReferenceKind::Clinic => "clinic",
        }
    }

    fn lookup_sql(&self) -> &'static str {
        match self {
            ReferenceKind::Patient => "SELECT EXISTS(SELECT 1 FROM patients WHERE cpf = ?)",
            ReferenceKind::Doctor => "SELECT EXISTS(SELECT 1 FROM doctors WHERE code = ?)",
            ReferenceKind::Clinic => "SELECT EXISTS(SELECT 1 FROM clinics WHERE code = ?)",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub async fn reference_exists(
    conn: &mut SqliteConnection,
    kind: ReferenceKind,
    key: &str,
) -> Result<bool, sqlx::Error> {
    let found = sqlx::query_scalar::<_, i64>(kind.lookup_sql())
        .bind(key)
        .fetch_one(conn)
        .await?;

    Ok(found != 0)
}

/// Probes patient, doctor and clinic in that order and returns every one
/// that no longer resolves.
pub async fn missing_references(
    conn: &mut SqliteConnection,
    patient_cpf: &str,
    doctor_code: &str,
    clinic_code: &str,
) -> Result<Vec<(ReferenceKind, String)>, sqlx::Error> {
    let mut missing = Vec::new();

    for (kind, key) in [
        (ReferenceKind::Patient, patient_cpf),
        (ReferenceKind::Doctor, doctor_code),
        (ReferenceKind::Clinic, clinic_code),
    ] {
        if !reference_exists(&mut *conn, kind, key).await? {
            missing.push((kind, key.to_string()));
        }
    }

    Ok(missing)
}
