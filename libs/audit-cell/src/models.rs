// =====================================================================================
// AUDIT CELL MODELS
// =====================================================================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use appointment_cell::services::ReferenceKind;

pub const DEFAULT_RECOVERED_LIMIT: i64 = 10;
pub const MAX_RECOVERED_LIMIT: i64 = 100;

// =====================================================================================
// LOG MODELS
// =====================================================================================

/// A deleted appointment as the trigger captured it. Never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CancellationLogEntry {
    pub id: i64,
    pub original_appointment_id: i64,
    pub clinic_code: String,
    pub doctor_code: String,
    pub patient_cpf: String,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    #[serde(with = "shared_models::timestamp")]
    pub cancelled_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecoveredAppointment {
    pub id: i64,
    pub recovered_from_log_id: i64,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub clinic_name: String,
    pub doctor_name: String,
    pub patient_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancellationQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveredQuery {
    pub limit: Option<i64>,
}

// =====================================================================================
// RECOVERY MODELS
// =====================================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateRecoveryRequest {
    #[serde(default, with = "shared_models::timestamp::option")]
    pub scheduled_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitRecoveryRequest {
    #[serde(default, with = "shared_models::timestamp::option")]
    pub scheduled_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub purge_log: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedSlot {
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
}

/// One reason a log entry cannot be restored as requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryFailure {
    StaleReference {
        entity: ReferenceKind,
        key: String,
    },
    DuplicateAppointment {
        existing_id: i64,
    },
    SchedulingConflict {
        doctor: String,
        #[serde(with = "shared_models::timestamp")]
        at: NaiveDateTime,
        conflicting_id: i64,
        suggestions: Vec<SuggestedSlot>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub log_entry_id: i64,
    pub ok: bool,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub failures: Vec<RecoveryFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryReceipt {
    pub appointment_id: i64,
    pub log_entry_id: i64,
    pub original_appointment_id: i64,
    #[serde(with = "shared_models::timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub rescheduled: bool,
    pub log_purged: bool,
}

// =====================================================================================
// ERROR TYPES
// =====================================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum RecoveryError {
    #[error("Cancellation log entry {0} not found")]
    LogEntryNotFound(i64),

    #[error("The {entity} {key} no longer exists")]
    StaleReference { entity: ReferenceKind, key: String },

    #[error("Appointment already exists (id {existing_id}): already recovered or never actually deleted")]
    DuplicateAppointment { existing_id: i64 },

    #[error("Doctor {doctor} already has appointment {conflicting_id} at {at}")]
    SchedulingConflict {
        doctor: String,
        at: NaiveDateTime,
        conflicting_id: i64,
        suggestions: Vec<SuggestedSlot>,
    },

    #[error("Recovered appointment could not be inserted: {0}")]
    InsertionFailure(String),

    #[error("Cancellation log entry {0} has not been recovered; refusing to purge it")]
    NotRecovered(i64),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RecoveryError {
    fn from(err: sqlx::Error) -> Self {
        RecoveryError::Database(err.to_string())
    }
}

impl From<RecoveryFailure> for RecoveryError {
    fn from(failure: RecoveryFailure) -> Self {
        match failure {
            RecoveryFailure::StaleReference { entity, key } => RecoveryError::StaleReference { entity, key },
            RecoveryFailure::DuplicateAppointment { existing_id } => {
                RecoveryError::DuplicateAppointment { existing_id }
            }
            RecoveryFailure::SchedulingConflict {
                doctor,
                at,
                conflicting_id,
                suggestions,
            } => RecoveryError::SchedulingConflict {
                doctor,
                at,
                conflicting_id,
                suggestions,
            },
        }
    }
}

impl RecoveryError {
    /// The validation failure behind this error, if it is one.
    pub fn as_failure(&self) -> Option<RecoveryFailure> {
        match self {
            RecoveryError::StaleReference { entity, key } => Some(RecoveryFailure::StaleReference {
                entity: *entity,
                key: key.clone(),
            }),
            RecoveryError::DuplicateAppointment { existing_id } => Some(RecoveryFailure::DuplicateAppointment {
                existing_id: *existing_id,
            }),
            RecoveryError::SchedulingConflict {
                doctor,
                at,
                conflicting_id,
                suggestions,
            } => Some(RecoveryFailure::SchedulingConflict {
                doctor: doctor.clone(),
                at: *at,
                conflicting_id: *conflicting_id,
                suggestions: suggestions.clone(),
            }),
            _ => None,
        }
    }
}
