use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, instrument};

use shared_database::{classify, ConstraintViolation, Database};
use shared_utils::validation::{normalize_optional, require_non_blank, validate_email, validate_entity_code};

use crate::models::{
    Clinic, ClinicActivity, ClinicAppointment, ClinicError, ClinicSearchQuery, ClinicSummary,
    CreateClinicRequest, SpecialtyCount, UpdateClinicRequest,
};

pub struct ClinicService {
    db: Database,
}

impl ClinicService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_clinic(&self, request: CreateClinicRequest) -> Result<Clinic, ClinicError> {
        validate_entity_code("Clinic", &request.code).map_err(ClinicError::ValidationError)?;
        require_non_blank("name", &request.name).map_err(ClinicError::ValidationError)?;

        let email = normalize_optional(request.email);
        if let Some(email) = &email {
            validate_email(email).map_err(ClinicError::ValidationError)?;
        }

        sqlx::query("INSERT INTO clinics (code, name, address, phone, email) VALUES (?, ?, ?, ?, ?)")
            .bind(&request.code)
            .bind(request.name.trim())
            .bind(normalize_optional(request.address))
            .bind(normalize_optional(request.phone))
            .bind(email)
            .execute(self.db.pool())
            .await
            .map_err(|e| match classify(&e) {
                Some(ConstraintViolation::Unique(msg)) => ClinicError::AlreadyExists(msg),
                _ => ClinicError::from(e),
            })?;

        info!("Clinic {} registered", request.code);
        self.get_clinic(&request.code).await
    }

    pub async fn get_clinic(&self, code: &str) -> Result<Clinic, ClinicError> {
        sqlx::query_as::<_, Clinic>("SELECT code, name, address, phone, email FROM clinics WHERE code = ?")
            .bind(code)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| ClinicError::NotFound(code.to_string()))
    }

    pub async fn search_clinics(&self, query: ClinicSearchQuery) -> Result<Vec<ClinicSummary>, ClinicError> {
        debug!("Searching clinics with query: {:?}", query);

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT c.code, c.name, c.address, COUNT(a.id) AS total_appointments \
             FROM clinics c LEFT JOIN appointments a ON a.clinic_code = c.code",
        );

        if let Some(name) = normalize_optional(query.name) {
            builder.push(" WHERE c.name LIKE ").push_bind(format!("%{}%", name));
        }

        builder.push(" GROUP BY c.code, c.name, c.address ORDER BY c.name ASC");

        let clinics = builder
            .build_query_as::<ClinicSummary>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(clinics)
    }

    pub async fn get_clinic_activity(&self, code: &str) -> Result<ClinicActivity, ClinicError> {
        let clinic = self.get_clinic(code).await?;

        let appointments = sqlx::query_as::<_, ClinicAppointment>(
            "SELECT a.id, a.scheduled_at, d.name AS doctor_name, d.specialty, p.name AS patient_name \
             FROM appointments a \
             JOIN doctors d ON a.doctor_code = d.code \
             JOIN patients p ON a.patient_cpf = p.cpf \
             WHERE a.clinic_code = ? \
             ORDER BY a.scheduled_at DESC",
        )
        .bind(code)
        .fetch_all(self.db.pool())
        .await?;

        let specialties = sqlx::query_as::<_, SpecialtyCount>(
            "SELECT d.specialty, COUNT(*) AS total \
             FROM appointments a JOIN doctors d ON a.doctor_code = d.code \
             WHERE a.clinic_code = ? \
             GROUP BY d.specialty ORDER BY total DESC, d.specialty ASC",
        )
        .bind(code)
        .fetch_all(self.db.pool())
        .await?;

        Ok(ClinicActivity {
            clinic,
            appointments,
            specialties,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update_clinic(&self, code: &str, request: UpdateClinicRequest) -> Result<Clinic, ClinicError> {
        self.get_clinic(code).await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE clinics SET ");
        let mut fields = builder.separated(", ");
        let mut touched = false;

        if let Some(address) = request.address {
            fields.push("address = ").push_bind_unseparated(normalize_optional(Some(address)));
            touched = true;
        }
        if let Some(phone) = request.phone {
            fields.push("phone = ").push_bind_unseparated(normalize_optional(Some(phone)));
            touched = true;
        }
        if let Some(email) = request.email {
            let email = normalize_optional(Some(email));
            if let Some(email) = &email {
                validate_email(email).map_err(ClinicError::ValidationError)?;
            }
            fields.push("email = ").push_bind_unseparated(email);
            touched = true;
        }

        if !touched {
            return self.get_clinic(code).await;
        }

        builder.push(" WHERE code = ").push_bind(code);
        builder.build().execute(self.db.pool()).await?;

        info!("Clinic {} updated", code);
        self.get_clinic(code).await
    }

    #[instrument(skip(self))]
    pub async fn delete_clinic(&self, code: &str) -> Result<(), ClinicError> {
        let result = sqlx::query("DELETE FROM clinics WHERE code = ?")
            .bind(code)
            .execute(self.db.pool())
            .await
            .map_err(|e| match classify(&e) {
                Some(ConstraintViolation::ForeignKey(_)) => ClinicError::HasAppointments { code: code.to_string() },
                _ => ClinicError::from(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(ClinicError::NotFound(code.to_string()));
        }

        info!("Clinic {} removed", code);
        Ok(())
    }
}
