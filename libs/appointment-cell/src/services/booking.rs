use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::{debug, info, instrument, warn};

use shared_database::{classify, ConstraintViolation, Database};
use shared_models::timestamp::format_timestamp;
use shared_utils::validation::{normalize_optional, validate_cpf};

use crate::models::{
    AgendaQuery, AgendaView, Appointment, AppointmentDetail, AppointmentError, AppointmentSearchQuery,
    BookAppointmentRequest, CancelledAppointment, UpdateAppointmentRequest,
};
use crate::services::agenda::AgendaPeriod;
use crate::services::conflict::{find_doctor_conflict, find_duplicate, BookingKey};
use crate::services::references::{missing_references, ReferenceKind};

pub const DETAIL_SELECT: &str = "SELECT a.id, a.scheduled_at, \
     a.clinic_code, c.name AS clinic_name, \
     a.doctor_code, d.name AS doctor_name, d.specialty, \
     a.patient_cpf, p.name AS patient_name, \
     a.recovered_from_log_id \
     FROM appointments a \
     JOIN clinics c ON a.clinic_code = c.code \
     JOIN doctors d ON a.doctor_code = d.code \
     JOIN patients p ON a.patient_cpf = p.cpf";

pub struct AppointmentBookingService {
    db: Database,
}

impl AppointmentBookingService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn list_appointments(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<AppointmentDetail>, AppointmentError> {
        debug!("Listing appointments with filters: {:?}", query);

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(DETAIL_SELECT);
        builder.push(" WHERE 1 = 1");

        if let Some(patient) = normalize_optional(query.patient) {
            builder.push(" AND p.name LIKE ").push_bind(format!("%{}%", patient));
        }
        if let Some(doctor) = normalize_optional(query.doctor) {
            builder.push(" AND d.name LIKE ").push_bind(format!("%{}%", doctor));
        }
        if let Some(clinic) = normalize_optional(query.clinic) {
            builder.push(" AND c.name LIKE ").push_bind(format!("%{}%", clinic));
        }

        builder.push(" ORDER BY a.id ASC");

        let appointments = builder
            .build_query_as::<AppointmentDetail>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(appointments)
    }

    pub async fn get_appointment(&self, id: i64) -> Result<AppointmentDetail, AppointmentError> {
        let mut conn = self.db.pool().acquire().await?;
        fetch_detail(&mut conn, id).await
    }

    pub async fn get_agenda(&self, query: AgendaQuery) -> Result<AgendaView, AppointmentError> {
        let period = AgendaPeriod::from_query(&query)?;
        let (start, end) = period.bounds()?;

        let appointments = sqlx::query_as::<_, AppointmentDetail>(&format!(
            "{} WHERE a.scheduled_at >= ? AND a.scheduled_at < ? ORDER BY a.scheduled_at ASC",
            DETAIL_SELECT
        ))
        .bind(start)
        .bind(end)
        .fetch_all(self.db.pool())
        .await?;

        debug!("{} appointment(s) found for {}", appointments.len(), period.describe());

        Ok(AgendaView {
            period: period.describe(),
            appointments,
        })
    }

    #[instrument(skip(self, request), fields(doctor = %request.doctor_code, at = %request.scheduled_at))]
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<AppointmentDetail, AppointmentError> {
        validate_cpf(&request.patient_cpf).map_err(AppointmentError::ValidationError)?;

        let key = BookingKey {
            patient_cpf: &request.patient_cpf,
            doctor_code: &request.doctor_code,
            clinic_code: &request.clinic_code,
            scheduled_at: request.scheduled_at,
        };

        let mut tx = self.db.pool().begin().await?;
        check_slot(&mut tx, &key, None).await?;

        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO appointments (clinic_code, doctor_code, patient_cpf, scheduled_at) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(key.clinic_code)
        .bind(key.doctor_code)
        .bind(key.patient_cpf)
        .bind(key.scheduled_at)
        .fetch_one(&mut *tx)
        .await;

        let id = match inserted {
            Ok(id) => id,
            Err(e) => return Err(explain_write_failure(&mut tx, &key, None, e).await),
        };

        let detail = fetch_detail(&mut tx, id).await?;
        tx.commit().await?;

        info!("Appointment {} booked", id);
        Ok(detail)
    }

    #[instrument(skip(self, request))]
    pub async fn update_appointment(
        &self,
        id: i64,
        request: UpdateAppointmentRequest,
    ) -> Result<AppointmentDetail, AppointmentError> {
        let mut tx = self.db.pool().begin().await?;

        let current = sqlx::query_as::<_, Appointment>(
            "SELECT id, clinic_code, doctor_code, patient_cpf, scheduled_at, recovered_from_log_id \
             FROM appointments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppointmentError::NotFound(id))?;

        let clinic_code = request.clinic_code.unwrap_or(current.clinic_code);
        let doctor_code = request.doctor_code.unwrap_or(current.doctor_code);
        let patient_cpf = request.patient_cpf.unwrap_or(current.patient_cpf);
        validate_cpf(&patient_cpf).map_err(AppointmentError::ValidationError)?;

        let key = BookingKey {
            patient_cpf: &patient_cpf,
            doctor_code: &doctor_code,
            clinic_code: &clinic_code,
            scheduled_at: request.scheduled_at.unwrap_or(current.scheduled_at),
        };

        check_slot(&mut tx, &key, Some(id)).await?;

        let updated = sqlx::query(
            "UPDATE appointments SET clinic_code = ?, doctor_code = ?, patient_cpf = ?, scheduled_at = ? WHERE id = ?",
        )
        .bind(key.clinic_code)
        .bind(key.doctor_code)
        .bind(key.patient_cpf)
        .bind(key.scheduled_at)
        .bind(id)
        .execute(&mut *tx)
        .await;

        if let Err(e) = updated {
            return Err(explain_write_failure(&mut tx, &key, Some(id), e).await);
        }

        let detail = fetch_detail(&mut tx, id).await?;
        tx.commit().await?;

        info!("Appointment {} updated", id);
        Ok(detail)
    }

    /// Deleting the row fires the cancellation-log trigger; the new log id is
    /// returned alongside the cancelled appointment.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(&self, id: i64) -> Result<CancelledAppointment, AppointmentError> {
        let mut tx = self.db.pool().begin().await?;

        let appointment = fetch_detail(&mut tx, id).await?;

        sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let log_entry_id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM cancellation_log WHERE original_appointment_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(log_entry_id, "Appointment {} cancelled", id);
        Ok(CancelledAppointment {
            appointment,
            log_entry_id,
        })
    }
}

pub async fn fetch_detail(conn: &mut SqliteConnection, id: i64) -> Result<AppointmentDetail, AppointmentError> {
    sqlx::query_as::<_, AppointmentDetail>(&format!("{} WHERE a.id = ?", DETAIL_SELECT))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(AppointmentError::NotFound(id))
}

async fn check_slot(
    conn: &mut SqliteConnection,
    key: &BookingKey<'_>,
    exclude_id: Option<i64>,
) -> Result<(), AppointmentError> {
    let missing = missing_references(&mut *conn, key.patient_cpf, key.doctor_code, key.clinic_code).await?;
    if let Some((kind, code)) = missing.into_iter().next() {
        return Err(match kind {
            ReferenceKind::Patient => AppointmentError::PatientNotFound(code),
            ReferenceKind::Doctor => AppointmentError::DoctorNotFound(code),
            ReferenceKind::Clinic => AppointmentError::ClinicNotFound(code),
        });
    }

    if let Some(existing) = find_duplicate(&mut *conn, key, exclude_id).await? {
        return Err(AppointmentError::Duplicate {
            existing_id: Some(existing),
        });
    }

    if let Some(conflicting) = find_doctor_conflict(&mut *conn, key.doctor_code, key.scheduled_at, exclude_id).await? {
        return Err(AppointmentError::SchedulingConflict {
            doctor_code: key.doctor_code.to_string(),
            scheduled_at: format_timestamp(&key.scheduled_at),
            conflicting_id: Some(conflicting),
        });
    }

    Ok(())
}

/// The unique indexes have the final say; translate a violation back into
/// the same errors the pre-checks produce.
async fn explain_write_failure(
    conn: &mut SqliteConnection,
    key: &BookingKey<'_>,
    exclude_id: Option<i64>,
    err: sqlx::Error,
) -> AppointmentError {
    match classify(&err) {
        Some(ConstraintViolation::Unique(msg)) => {
            warn!("Unique index rejected appointment write: {}", msg);
            if let Ok(Some(existing)) = find_duplicate(&mut *conn, key, exclude_id).await {
                return AppointmentError::Duplicate {
                    existing_id: Some(existing),
                };
            }
            let conflicting = find_doctor_conflict(&mut *conn, key.doctor_code, key.scheduled_at, exclude_id)
                .await
                .ok()
                .flatten();
            AppointmentError::SchedulingConflict {
                doctor_code: key.doctor_code.to_string(),
                scheduled_at: format_timestamp(&key.scheduled_at),
                conflicting_id: conflicting,
            }
        }
        Some(violation) => AppointmentError::ValidationError(violation.to_string()),
        None => AppointmentError::from(err),
    }
}
