use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, instrument};

use shared_database::{classify, ConstraintViolation, Database};
use shared_utils::validation::{normalize_optional, require_non_blank, validate_cpf, validate_email};

use crate::models::{
    CreatePatientRequest, Patient, PatientAppointment, PatientError, PatientSearchQuery,
    PatientSummary, UpdatePatientRequest,
};

pub struct PatientService {
    db: Database,
}

impl PatientService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    #[instrument(skip(self, request), fields(cpf = %request.cpf))]
    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        debug!("Creating patient record");

        validate_cpf(&request.cpf).map_err(PatientError::ValidationError)?;
        require_non_blank("name", &request.name).map_err(PatientError::ValidationError)?;

        let email = normalize_optional(request.email);
        if let Some(email) = &email {
            validate_email(email).map_err(PatientError::ValidationError)?;
        }

        sqlx::query(
            "INSERT INTO patients (cpf, name, birth_date, gender, phone, email) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.cpf)
        .bind(request.name.trim())
        .bind(request.birth_date)
        .bind(normalize_optional(request.gender))
        .bind(normalize_optional(request.phone))
        .bind(email)
        .execute(self.db.pool())
        .await
        .map_err(|e| match classify(&e) {
            Some(ConstraintViolation::Unique(_)) => PatientError::AlreadyExists { cpf: request.cpf.clone() },
            _ => PatientError::from(e),
        })?;

        info!("Patient {} registered", request.cpf);
        self.get_patient(&request.cpf).await
    }

    pub async fn get_patient(&self, cpf: &str) -> Result<Patient, PatientError> {
        sqlx::query_as::<_, Patient>(
            "SELECT cpf, name, birth_date, gender, phone, email FROM patients WHERE cpf = ?",
        )
        .bind(cpf)
        .fetch_optional(self.db.pool())
        .await?
        .ok_or_else(|| PatientError::NotFound(cpf.to_string()))
    }

    pub async fn search_patients(&self, query: PatientSearchQuery) -> Result<Vec<PatientSummary>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT p.cpf, p.name, p.birth_date, p.gender, p.phone, p.email, \
             COUNT(a.id) AS total_appointments \
             FROM patients p LEFT JOIN appointments a ON a.patient_cpf = p.cpf",
        );

        if let Some(term) = normalize_optional(query.search) {
            let pattern = format!("%{}%", term);
            builder
                .push(" WHERE p.name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.cpf LIKE ")
                .push_bind(pattern);
        }

        builder.push(
            " GROUP BY p.cpf, p.name, p.birth_date, p.gender, p.phone, p.email ORDER BY p.name ASC",
        );

        let patients = builder
            .build_query_as::<PatientSummary>()
            .fetch_all(self.db.pool())
            .await?;

        Ok(patients)
    }

    /// Appointment history, newest first.
    pub async fn get_patient_appointments(&self, cpf: &str) -> Result<Vec<PatientAppointment>, PatientError> {
        self.get_patient(cpf).await?;

        let appointments = sqlx::query_as::<_, PatientAppointment>(
            "SELECT a.id, a.scheduled_at, d.name AS doctor_name, d.specialty, c.name AS clinic_name \
             FROM appointments a \
             JOIN doctors d ON a.doctor_code = d.code \
             JOIN clinics c ON a.clinic_code = c.code \
             WHERE a.patient_cpf = ? \
             ORDER BY a.scheduled_at DESC",
        )
        .bind(cpf)
        .fetch_all(self.db.pool())
        .await?;

        Ok(appointments)
    }

    #[instrument(skip(self, request))]
    pub async fn update_patient(&self, cpf: &str, request: UpdatePatientRequest) -> Result<Patient, PatientError> {
        debug!("Updating patient record");

        self.get_patient(cpf).await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE patients SET ");
        let mut fields = builder.separated(", ");
        let mut touched = false;

        if let Some(name) = request.name {
            require_non_blank("name", &name).map_err(PatientError::ValidationError)?;
            fields.push("name = ").push_bind_unseparated(name.trim().to_string());
            touched = true;
        }
        if let Some(birth_date) = request.birth_date {
            fields.push("birth_date = ").push_bind_unseparated(birth_date);
            touched = true;
        }
        if let Some(gender) = request.gender {
            fields.push("gender = ").push_bind_unseparated(normalize_optional(Some(gender)));
            touched = true;
        }
        if let Some(phone) = request.phone {
            fields.push("phone = ").push_bind_unseparated(normalize_optional(Some(phone)));
            touched = true;
        }
        if let Some(email) = request.email {
            let email = normalize_optional(Some(email));
            if let Some(email) = &email {
                validate_email(email).map_err(PatientError::ValidationError)?;
            }
            fields.push("email = ").push_bind_unseparated(email);
            touched = true;
        }

        if !touched {
            return self.get_patient(cpf).await;
        }

        builder.push(" WHERE cpf = ").push_bind(cpf);
        builder.build().execute(self.db.pool()).await?;

        info!("Patient {} updated", cpf);
        self.get_patient(cpf).await
    }

    #[instrument(skip(self))]
    pub async fn delete_patient(&self, cpf: &str) -> Result<(), PatientError> {
        let result = sqlx::query("DELETE FROM patients WHERE cpf = ?")
            .bind(cpf)
            .execute(self.db.pool())
            .await
            .map_err(|e| match classify(&e) {
                Some(ConstraintViolation::ForeignKey(_)) => PatientError::HasAppointments { cpf: cpf.to_string() },
                _ => PatientError::from(e),
            })?;

        if result.rows_affected() == 0 {
            return Err(PatientError::NotFound(cpf.to_string()));
        }

        info!("Patient {} removed", cpf);
        Ok(())
    }
}
