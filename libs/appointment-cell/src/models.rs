use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: i64,
    pub clinic_code: String,
    pub doctor_code: String,
    pub patient_cpf: String,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub recovered_from_log_id: Option<i64>,
}

/// An appointment joined with the names operators read.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppointmentDetail {
    pub id: i64,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub clinic_code: String,
    pub clinic_name: String,
    pub doctor_code: String,
    pub doctor_name: String,
    pub specialty: String,
    pub patient_cpf: String,
    pub patient_name: String,
    pub recovered_from_log_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledAppointment {
    pub appointment: AppointmentDetail,
    pub log_entry_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgendaView {
    pub period: String,
    pub appointments: Vec<AppointmentDetail>,
}

// ==============================================================================
// REQUEST / QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub clinic_code: String,
    pub doctor_code: String,
    pub patient_cpf: String,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub clinic_code: Option<String>,
    pub doctor_code: Option<String>,
    pub patient_cpf: Option<String>,
    #[serde(default, with = "shared_models::timestamp::option")]
    pub scheduled_at: Option<NaiveDateTime>,
}

/// Case-insensitive name filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient: Option<String>,
    pub doctor: Option<String>,
    pub clinic: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgendaQuery {
    pub day: Option<NaiveDate>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(i64),

    #[error("Patient {0} not found")]
    PatientNotFound(String),

    #[error("Doctor {0} not found")]
    DoctorNotFound(String),

    #[error("Clinic {0} not found")]
    ClinicNotFound(String),

    #[error("Doctor {doctor_code} already has an appointment at {scheduled_at}")]
    SchedulingConflict {
        doctor_code: String,
        scheduled_at: String,
        conflicting_id: Option<i64>,
    },

    #[error("An identical appointment already exists")]
    Duplicate { existing_id: Option<i64> },

    #[error("Invalid agenda period: {0}")]
    InvalidPeriod(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AppointmentError {
    fn from(err: sqlx::Error) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}
