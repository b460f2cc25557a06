use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, instrument};

use shared_database::{classify, ConstraintViolation, Database};
use shared_utils::validation::{normalize_optional, require_non_blank, validate_email, validate_entity_code};

use crate::models::{
    normalize_gender, CreateDoctorRequest, Doctor, DoctorAgenda, DoctorAppointment, DoctorError,
    DoctorSearchQuery, DoctorStats, DoctorSummary, MonthlyCount, UpdateDoctorRequest,
};

pub struct DoctorService {
    db: Database,
}

impl DoctorService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        debug!("Registering doctor");

        validate_entity_code("Doctor", &request.code).map_err(DoctorError::ValidationError)?;
        require_non_blank("name", &request.name).map_err(DoctorError::ValidationError)?;
        require_non_blank("specialty", &request.specialty).map_err(DoctorError::ValidationError)?;

        let email = normalize_optional(request.email);
        if let Some(email) = &email {
            validate_email(email).map_err(DoctorError::ValidationError)?;
        }

        sqlx::query(
            "INSERT INTO doctors (code, name, gender, phone, email, specialty) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.code)
        .bind(request.name.trim())
        .bind(normalize_gender(request.gender))
        .bind(normalize_optional(request.phone))
        .bind(email)
        .bind(request.specialty.trim())
        .execute(self.db.pool())
        .await
        .map_err(|e| match classify(&e) {
            Some(ConstraintViolation::Unique(msg)) => DoctorError::AlreadyExists(msg),
            _ => DoctorError::from(e),
        })?;

        info!("Doctor {} registered", request.code);
        self.get_doctor(&request.code).await
    }

    pub async fn get_doctor(&self, code: &str) -> Result<Doctor, DoctorError> {
        sqlx::query_as::<_, Doctor>(
            "SELECT code, name, gender, phone, email, specialty FROM doctors WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| DoctorError::NotFound(code.to_string()))
    }

    pub async fn search_doctors(&self, query: DoctorSearchQuery) -> Result<Vec<DoctorSummary>, DoctorError> {
        debug!("Searching doctors with query: {:?}", query);

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT d.code, d.name, d.specialty, d.email, d.phone, \
             COUNT(a.id) AS total_appointments, \
             COUNT(DISTINCT a.patient_cpf) AS patients_seen \
             FROM doctors d LEFT JOIN appointments a ON a.doctor_code = d.code",
        );

        let mut has_filter = false;
        if let Some(name) = normalize_optional(query.name) {
            builder.push(" WHERE d.name LIKE ").push_bind(format!("%{}%", name));
            has_filter = true;
        }
        if let Some(specialty) = normalize_optional(query.specialty) {
            builder
                .push(if has_filter { " AND " } else { " WHERE " })
                .push("d.specialty = ")
                .push_bind(specialty);
        }

        builder.push(" GROUP BY d.code, d.name, d.specialty, d.email, d.phone ORDER BY d.name ASC");

        let doctors = builder
            .build_query_as::<DoctorSummary>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(doctors)
    }

    pub async fn list_specialties(&self) -> Result<Vec<String>, DoctorError> {
        let specialties = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT specialty FROM doctors ORDER BY specialty",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(specialties)
    }

    pub async fn get_doctor_stats(&self, code: &str) -> Result<DoctorStats, DoctorError> {
        self.get_doctor(code).await?;

        let (total_appointments, patients_seen) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(id), COUNT(DISTINCT patient_cpf) FROM appointments WHERE doctor_code = ?",
        )
        .bind(code)
        .fetch_one(self.db.pool())
        .await?;

        Ok(DoctorStats {
            total_appointments,
            patients_seen,
        })
    }

    /// Appointments newest first, plus a per-month tally for charting.
    pub async fn get_doctor_agenda(&self, code: &str) -> Result<DoctorAgenda, DoctorError> {
        let doctor = self.get_doctor(code).await?;

        let appointments = sqlx::query_as::<_, DoctorAppointment>(
            "SELECT a.id, a.scheduled_at, p.name AS patient_name, p.cpf AS patient_cpf, c.name AS clinic_name \
             FROM appointments a \
             JOIN patients p ON a.patient_cpf = p.cpf \
             JOIN clinics c ON a.clinic_code = c.code \
             WHERE a.doctor_code = ? \
             ORDER BY a.scheduled_at DESC",
        )
        .bind(code)
        .fetch_all(self.db.pool())
        .await?;

        let monthly = sqlx::query_as::<_, MonthlyCount>(
            "SELECT strftime('%Y-%m', scheduled_at) AS month, COUNT(*) AS total \
             FROM appointments WHERE doctor_code = ? \
             GROUP BY month ORDER BY month ASC",
        )
        .bind(code)
        .fetch_all(self.db.pool())
        .await?;

        Ok(DoctorAgenda {
            doctor,
            appointments,
            monthly,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update_doctor(&self, code: &str, request: UpdateDoctorRequest) -> Result<Doctor, DoctorError> {
        debug!("Updating doctor contact details");

        self.get_doctor(code).await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE doctors SET ");
        let mut fields = builder.separated(", ");
        let mut touched = false;

        if let Some(email) = request.email {
            let email = normalize_optional(Some(email));
            if let Some(email) = &email {
                validate_email(email).map_err(DoctorError::ValidationError)?;
            }
            fields.push("email = ").push_bind_unseparated(email);
            touched = true;
        }
        if let Some(phone) = request.phone {
            fields.push("phone = ").push_bind_unseparated(normalize_optional(Some(phone)));
            touched = true;
        }
        if let Some(specialty) = request.specialty {
            require_non_blank("specialty", &specialty).map_err(DoctorError::ValidationError)?;
            fields.push("specialty = ").push_bind_unseparated(specialty.trim().to_string());
            touched = true;
        }

        if !touched {
            return self.get_doctor(code).await;
        }

        builder.push(" WHERE code = ").push_bind(code);
        builder
            .build()
            .execute(self.db.pool())
            .await
            .map_err(|e| match classify(&e) {
                Some(ConstraintViolation::Unique(msg)) => DoctorError::AlreadyExists(msg),
                _ => DoctorError::from(e),
            })?;

        info!("Doctor {} updated", code);
        self.get_doctor(code).await
    }

    /// Appointments reference doctors with ON DELETE RESTRICT; the database refuses while any remain.
    #[instrument(skip(self))]
    pub async fn delete_doctor(&self, code: &str) -> Result<(), DoctorError> {
        let result = sqlx::query("DELETE FROM doctors WHERE code = ?")
            .bind(code)
            .execute(self.db.pool())
            .await
            .map_err(|e| match classify(&e) {
                Some(ConstraintViolation::ForeignKey(_)) => DoctorError::HasAppointments { code: code.to_string() },
                _ => DoctorError::from(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(DoctorError::NotFound(code.to_string()));
        }

        info!("Doctor {} removed", code);
        Ok(())
    }
}
