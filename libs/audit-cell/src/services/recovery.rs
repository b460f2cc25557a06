//! Rebuilds cancelled appointments from the cancellation log.
//!
//! Checks run in a fixed order and stop at the first step that fails:
//! references (all three probed), then duplicate booking, then doctor
//! conflict. `commit_recovery` repeats them inside the transaction that
//! performs the insert; the unique indexes back the checks up.

use chrono::NaiveDateTime;
use sqlx::SqliteConnection;
use tracing::{debug, info, instrument, warn};

use appointment_cell::services::conflict::{
    find_doctor_conflict, find_duplicate, suggest_alternative_slots, BookingKey,
};
use appointment_cell::services::references::missing_references;
use shared_database::{classify, ConstraintViolation, Database};

use crate::models::{
    CancellationLogEntry, RecoveryError, RecoveryFailure, RecoveryReceipt, SuggestedSlot, ValidationReport,
};

pub struct RecoveryEngine {
    db: Database,
}

impl RecoveryEngine {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Read-only dry run. `candidate` defaults to the logged timestamp.
    #[instrument(skip(self))]
    pub async fn validate_recovery(
        &self,
        log_entry_id: i64,
        candidate: Option<NaiveDateTime>,
    ) -> Result<ValidationReport, RecoveryError> {
        let mut conn = self.db.pool().acquire().await?;

        let entry = load_entry(&mut conn, log_entry_id).await?;
        let scheduled_at = candidate.unwrap_or(entry.scheduled_at);
        let failures = run_checks(&mut conn, &entry, scheduled_at).await?;

        debug!(log_entry_id, failures = failures.len(), "Recovery validated");

        Ok(ValidationReport {
            log_entry_id,
            ok: failures.is_empty(),
            scheduled_at,
            failures,
        })
    }

    /// Validates and inserts in one transaction; on any error nothing is written.
    #[instrument(skip(self))]
    pub async fn commit_recovery(
        &self,
        log_entry_id: i64,
        resolved: Option<NaiveDateTime>,
        purge_log: bool,
    ) -> Result<RecoveryReceipt, RecoveryError> {
        let mut tx = self.db.pool().begin().await?;

        let entry = load_entry(&mut tx, log_entry_id).await?;
        let scheduled_at = resolved.unwrap_or(entry.scheduled_at);

        if let Some(failure) = run_checks(&mut tx, &entry, scheduled_at).await?.into_iter().next() {
            warn!(log_entry_id, failure = ?failure, "Recovery rejected");
            return Err(failure.into());
        }

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO appointments (clinic_code, doctor_code, patient_cpf, scheduled_at, recovered_from_log_id) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&entry.clinic_code)
        .bind(&entry.doctor_code)
        .bind(&entry.patient_cpf)
        .bind(scheduled_at)
        .bind(entry.id)
        .fetch_one(&mut *tx)
        .await;

        let appointment_id = match inserted {
            Ok(id) => id,
            Err(e) => {
                let err = explain_insert_failure(&mut tx, &entry, scheduled_at, e).await;
                warn!(log_entry_id, failure = %err, "Recovery insert failed");
                return Err(err);
            }
        };

        sqlx::query("INSERT INTO recoveries (log_entry_id, appointment_id) VALUES (?, ?)")
            .bind(entry.id)
            .bind(appointment_id)
            .execute(&mut *tx)
            .await?;

        if purge_log {
            sqlx::query("DELETE FROM cancellation_log WHERE id = ?")
                .bind(entry.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            log_entry_id,
            appointment_id,
            original_appointment_id = entry.original_appointment_id,
            log_purged = purge_log,
            "Cancelled appointment recovered"
        );

        Ok(RecoveryReceipt {
            appointment_id,
            log_entry_id,
            original_appointment_id: entry.original_appointment_id,
            scheduled_at,
            rescheduled: scheduled_at != entry.scheduled_at,
            log_purged: purge_log,
        })
    }
}

async fn load_entry(conn: &mut SqliteConnection, log_entry_id: i64) -> Result<CancellationLogEntry, RecoveryError> {
    sqlx::query_as::<_, CancellationLogEntry>(
        "SELECT id, original_appointment_id, clinic_code, doctor_code, patient_cpf, scheduled_at, cancelled_at \
         FROM cancellation_log WHERE id = ?",
    )
    .bind(log_entry_id)
    .fetch_optional(conn)
    .await?
    .ok_or(RecoveryError::LogEntryNotFound(log_entry_id))
}

fn booking_key(entry: &CancellationLogEntry, scheduled_at: NaiveDateTime) -> BookingKey<'_> {
    BookingKey {
        patient_cpf: &entry.patient_cpf,
        doctor_code: &entry.doctor_code,
        clinic_code: &entry.clinic_code,
        scheduled_at,
    }
}

/// Empty when the entry can be restored at `scheduled_at`.
async fn run_checks(
    conn: &mut SqliteConnection,
    entry: &CancellationLogEntry,
    scheduled_at: NaiveDateTime,
) -> Result<Vec<RecoveryFailure>, sqlx::Error> {
    let stale: Vec<RecoveryFailure> =
        missing_references(&mut *conn, &entry.patient_cpf, &entry.doctor_code, &entry.clinic_code)
            .await?
            .into_iter()
            .map(|(entity, key)| RecoveryFailure::StaleReference { entity, key })
            .collect();
    if !stale.is_empty() {
        return Ok(stale);
    }

    let key = booking_key(entry, scheduled_at);
    if let Some(existing_id) = find_duplicate(&mut *conn, &key, None).await? {
        return Ok(vec![RecoveryFailure::DuplicateAppointment { existing_id }]);
    }

    if let Some(conflicting_id) = find_doctor_conflict(&mut *conn, &entry.doctor_code, scheduled_at, None).await? {
        let suggestions = suggest_alternative_slots(&mut *conn, &entry.doctor_code, scheduled_at)
            .await?
            .into_iter()
            .map(|scheduled_at| SuggestedSlot { scheduled_at })
            .collect();

        return Ok(vec![RecoveryFailure::SchedulingConflict {
            doctor: entry.doctor_code.clone(),
            at: scheduled_at,
            conflicting_id,
            suggestions,
        }]);
    }

    Ok(Vec::new())
}

/// A unique violation here means the slot was taken after the checks ran;
/// report it the way the checks would have.
async fn explain_insert_failure(
    conn: &mut SqliteConnection,
    entry: &CancellationLogEntry,
    scheduled_at: NaiveDateTime,
    err: sqlx::Error,
) -> RecoveryError {
    match classify(&err) {
        Some(ConstraintViolation::Unique(_)) => match run_checks(conn, entry, scheduled_at).await {
            Ok(failures) => match failures.into_iter().next() {
                Some(failure) => failure.into(),
                None => RecoveryError::InsertionFailure(err.to_string()),
            },
            Err(_) => RecoveryError::InsertionFailure(err.to_string()),
        },
        _ => RecoveryError::InsertionFailure(err.to_string()),
    }
}
