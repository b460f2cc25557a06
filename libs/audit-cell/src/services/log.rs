use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, instrument, warn};

use shared_database::Database;

use crate::models::{
    CancellationLogEntry, CancellationQuery, RecoveredAppointment, RecoveryError, DEFAULT_RECOVERED_LIMIT,
    MAX_RECOVERED_LIMIT,
};

const LOG_COLUMNS: &str = "SELECT id, original_appointment_id, clinic_code, doctor_code, patient_cpf, \
     scheduled_at, cancelled_at FROM cancellation_log";

pub struct CancellationLogService {
    db: Database,
}

impl CancellationLogService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Newest cancellations first, optionally bounded by the date they were cancelled on.
    pub async fn list_cancellations(
        &self,
        query: CancellationQuery,
    ) -> Result<Vec<CancellationLogEntry>, RecoveryError> {
        debug!("Listing cancellations: {:?}", query);

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(LOG_COLUMNS);
        builder.push(" WHERE 1 = 1");

        if let Some(from) = query.from {
            builder.push(" AND date(cancelled_at) >= ").push_bind(from);
        }
        if let Some(to) = query.to {
            builder.push(" AND date(cancelled_at) <= ").push_bind(to);
        }

        builder.push(" ORDER BY cancelled_at DESC, id DESC");

        Ok(builder
            .build_query_as::<CancellationLogEntry>()
            .fetch_all(self.db.pool())
            .await?)
    }

    pub async fn get_cancellation(&self, log_entry_id: i64) -> Result<CancellationLogEntry, RecoveryError> {
        sqlx::query_as::<_, CancellationLogEntry>(&format!("{} WHERE id = ?", LOG_COLUMNS))
            .bind(log_entry_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or(RecoveryError::LogEntryNotFound(log_entry_id))
    }

    /// Appointments created by recovery, most recent first.
    pub async fn list_recovered(&self, limit: Option<i64>) -> Result<Vec<RecoveredAppointment>, RecoveryError> {
        let limit = limit
            .unwrap_or(DEFAULT_RECOVERED_LIMIT)
            .clamp(1, MAX_RECOVERED_LIMIT);

        let recovered = sqlx::query_as::<_, RecoveredAppointment>(
            "SELECT a.id, a.recovered_from_log_id, a.scheduled_at, \
             c.name AS clinic_name, d.name AS doctor_name, p.name AS patient_name \
             FROM appointments a \
             JOIN clinics c ON a.clinic_code = c.code \
             JOIN doctors d ON a.doctor_code = d.code \
             JOIN patients p ON a.patient_cpf = p.cpf \
             WHERE a.recovered_from_log_id IS NOT NULL \
             ORDER BY a.id DESC \
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;

        Ok(recovered)
    }

    /// Removes a log row, but only once an appointment has been recovered from it.
    /// The recovered appointment itself may since have been cancelled.
    #[instrument(skip(self))]
    pub async fn purge_cancellation(&self, log_entry_id: i64) -> Result<(), RecoveryError> {
        let mut tx = self.db.pool().begin().await?;

        let recovered = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM recoveries WHERE log_entry_id = ?",
        )
        .bind(log_entry_id)
        .fetch_one(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM cancellation_log WHERE id = ?")
            .bind(log_entry_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RecoveryError::LogEntryNotFound(log_entry_id));
        }
        if recovered == 0 {
            warn!(log_entry_id, "Refusing to purge a cancellation that was never recovered");
            return Err(RecoveryError::NotRecovered(log_entry_id));
        }

        tx.commit().await?;

        info!(log_entry_id, "Cancellation log entry purged");
        Ok(())
    }
}
