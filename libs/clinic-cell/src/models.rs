use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Clinic {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClinicSummary {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub total_appointments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClinicAppointment {
    pub id: i64,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub doctor_name: String,
    pub specialty: String,
    pub patient_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SpecialtyCount {
    pub specialty: String,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicActivity {
    pub clinic: Clinic,
    pub appointments: Vec<ClinicAppointment>,
    pub specialties: Vec<SpecialtyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicRequest {
    pub code: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClinicRequest {
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicSearchQuery {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum ClinicError {
    #[error("Clinic {0} not found")]
    NotFound(String),

    #[error("Clinic code or name already registered: {0}")]
    AlreadyExists(String),

    #[error("Clinic {code} still has appointments; cancel them first")]
    HasAppointments { code: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for ClinicError {
    fn from(err: sqlx::Error) -> Self {
        ClinicError::DatabaseError(err.to_string())
    }
}
