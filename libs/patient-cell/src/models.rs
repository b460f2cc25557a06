use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub cpf: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Listing row: the patient plus how many appointments they currently hold.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatientSummary {
    pub cpf: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub total_appointments: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PatientAppointment {
    pub id: i64,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub doctor_name: String,
    pub specialty: String,
    pub clinic_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub cpf: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientSearchQuery {
    /// Matches a substring of the name or the CPF.
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum PatientError {
    #[error("Patient {0} not found")]
    NotFound(String),

    #[error("Patient with CPF {cpf} already exists")]
    AlreadyExists { cpf: String },

    #[error("Patient {cpf} still has appointments; cancel them first")]
    HasAppointments { cpf: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for PatientError {
    fn from(err: sqlx::Error) -> Self {
        PatientError::DatabaseError(err.to_string())
    }
}
