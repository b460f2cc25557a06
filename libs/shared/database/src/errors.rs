use sqlx::error::ErrorKind;
use thiserror::Error;

/// Constraint failures the cells translate into domain errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstraintViolation {
    #[error("unique constraint violated: {0}")]
    Unique(String),

    #[error("foreign key constraint violated: {0}")]
    ForeignKey(String),

    #[error("check constraint violated: {0}")]
    Check(String),
}

impl ConstraintViolation {
    pub fn message(&self) -> &str {
        match self {
            ConstraintViolation::Unique(msg)
            | ConstraintViolation::ForeignKey(msg)
            | ConstraintViolation::Check(msg) => msg,
        }
    }

    /// SQLite names the offending columns in the message, e.g.
    /// `UNIQUE constraint failed: appointments.doctor_code, appointments.scheduled_at`.
    pub fn mentions(&self, column: &str) -> bool {
        self.message().contains(column)
    }
}

const SQLITE_CONSTRAINT_FOREIGNKEY: &str = "787";
const FOREIGN_KEY_FAILED: &str = "FOREIGN KEY constraint failed";

pub fn classify(err: &sqlx::Error) -> Option<ConstraintViolation> {
    let db_err = err.as_database_error()?;
    let message = db_err.message().to_string();

    match db_err.kind() {
        ErrorKind::UniqueViolation => Some(ConstraintViolation::Unique(message)),
        ErrorKind::ForeignKeyViolation => Some(ConstraintViolation::ForeignKey(message)),
        ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
            Some(ConstraintViolation::Check(message))
        }
        // `ON DELETE RESTRICT` fires as SQLITE_CONSTRAINT_TRIGGER (1811), the same
        // code a `RAISE` in a trigger produces, so only the message tells them apart.
        _ if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_FOREIGNKEY)
            || message.contains(FOREIGN_KEY_FAILED) =>
        {
            Some(ConstraintViolation::ForeignKey(message))
        }
        _ => None,
    }
}
