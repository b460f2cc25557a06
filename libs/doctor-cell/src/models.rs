use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub code: String,
    pub name: String,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub specialty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorSummary {
    pub code: String,
    pub name: String,
    pub specialty: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_appointments: i64,
    pub patients_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DoctorAppointment {
    pub id: i64,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub patient_name: String,
    pub patient_cpf: String,
    pub clinic_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorAgenda {
    pub doctor: Doctor,
    pub appointments: Vec<DoctorAppointment>,
    pub monthly: Vec<MonthlyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorStats {
    pub total_appointments: i64,
    pub patients_seen: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub code: String,
    pub name: String,
    pub specialty: String,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSearchQuery {
    pub name: Option<String>,
    pub specialty: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor {0} not found")]
    NotFound(String),

    #[error("Doctor code or email already registered: {0}")]
    AlreadyExists(String),

    #[error("Doctor {code} still has appointments; cancel them first")]
    HasAppointments { code: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for DoctorError {
    fn from(err: sqlx::Error) -> Self {
        DoctorError::DatabaseError(err.to_string())
    }
}

/// `F`/`M` are kept; anything else (including "Outro") is stored as unknown.
pub fn normalize_gender(gender: Option<String>) -> Option<String> {
    gender
        .map(|g| g.trim().to_uppercase())
        .filter(|g| g == "F" || g == "M")
}
