use std::sync::Arc;

use chrono::NaiveDateTime;

use shared_config::{AppConfig, DatabaseConfig, DEFAULT_BIND_ADDR};
use shared_database::{AppState, Database};
use shared_models::timestamp::parse_timestamp;

pub const TEST_OPERATOR_TOKEN: &str = "test-operator-token-long-enough";

pub const CLINIC_CENTRAL: &str = "CLI0001";
pub const CLINIC_NORTH: &str = "CLI0002";

pub const DOCTOR_CARDIO: &str = "MED0001";
pub const DOCTOR_PEDIATRIC: &str = "MED0002";
pub const DOCTOR_IDLE: &str = "MED0003";

pub const PATIENT_PAULO: &str = "11111111111";
pub const PATIENT_MARIA: &str = "22222222222";
pub const PATIENT_JOAO: &str = "33333333333";

pub struct TestConfig {
    pub operator_token: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            operator_token: TEST_OPERATOR_TOKEN.to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            database: DatabaseConfig::new("sqlite::memory:"),
            operator_token: self.operator_token.clone(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }

    pub fn to_state(&self, db: &Database) -> Arc<AppState> {
        AppState::new(self.to_app_config(), db.clone())
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.operator_token)
    }
}

/// Parses a fixture timestamp; panics on malformed literals since only tests call it.
pub fn ts(raw: &str) -> NaiveDateTime {
    parse_timestamp(raw).unwrap_or_else(|e| panic!("bad fixture timestamp: {}", e))
}

/// Migrated in-memory database with a small clinic seeded into it.
pub struct TestDatabase {
    pub db: Database,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let db = Database::in_memory()
            .await
            .unwrap_or_else(|e| panic!("failed to open in-memory database: {}", e));
        db.migrate()
            .await
            .unwrap_or_else(|e| panic!("failed to migrate test database: {}", e));
        Self { db }
    }

    pub async fn seeded() -> Self {
        let test_db = Self::new().await;
        test_db.seed_reference_data().await;
        test_db
    }

    pub fn state(&self) -> Arc<AppState> {
        TestConfig::default().to_state(&self.db)
    }

    pub async fn seed_reference_data(&self) {
        let pool = self.db.pool();

        for (code, name, address) in [
            (CLINIC_CENTRAL, "Clinica Central", "Rua das Flores, 100"),
            (CLINIC_NORTH, "Clinica Norte", "Av. Norte, 2000"),
        ] {
            sqlx::query("INSERT INTO clinics (code, name, address, phone, email) VALUES (?, ?, ?, NULL, NULL)")
                .bind(code)
                .bind(name)
                .bind(address)
                .execute(pool)
                .await
                .unwrap_or_else(|e| panic!("seed clinic {}: {}", code, e));
        }

        for (code, name, gender, email, specialty) in [
            (DOCTOR_CARDIO, "Ana Souza", "F", "ana@clinic.test", "Cardiologia"),
            (DOCTOR_PEDIATRIC, "Bruno Lima", "M", "bruno@clinic.test", "Pediatria"),
            (DOCTOR_IDLE, "Carla Dias", "F", "carla@clinic.test", "Cardiologia"),
        ] {
            sqlx::query("INSERT INTO doctors (code, name, gender, phone, email, specialty) VALUES (?, ?, ?, NULL, ?, ?)")
                .bind(code)
                .bind(name)
                .bind(gender)
                .bind(email)
                .bind(specialty)
                .execute(pool)
                .await
                .unwrap_or_else(|e| panic!("seed doctor {}: {}", code, e));
        }

        for (cpf, name, birth_date) in [
            (PATIENT_PAULO, "Paulo Mendes", "1980-03-14"),
            (PATIENT_MARIA, "Maria Silva", "1992-11-02"),
            (PATIENT_JOAO, "Joao Pereira", "2001-07-21"),
        ] {
            sqlx::query("INSERT INTO patients (cpf, name, birth_date, gender, phone, email) VALUES (?, ?, ?, NULL, NULL, NULL)")
                .bind(cpf)
                .bind(name)
                .bind(birth_date)
                .execute(pool)
                .await
                .unwrap_or_else(|e| panic!("seed patient {}: {}", cpf, e));
        }
    }

    pub async fn insert_appointment(&self, clinic: &str, doctor: &str, patient: &str, at: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO appointments (clinic_code, doctor_code, patient_cpf, scheduled_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(clinic)
        .bind(doctor)
        .bind(patient)
        .bind(ts(at))
        .fetch_one(self.db.pool())
        .await
        .unwrap_or_else(|e| panic!("insert appointment: {}", e))
    }

    /// Deletes the appointment so the trigger writes a log row; returns that row's id.
    pub async fn cancel_appointment(&self, appointment_id: i64) -> i64 {
        sqlx::query("DELETE FROM appointments WHERE id = ?")
            .bind(appointment_id)
            .execute(self.db.pool())
            .await
            .unwrap_or_else(|e| panic!("cancel appointment {}: {}", appointment_id, e));

        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM cancellation_log WHERE original_appointment_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(appointment_id)
        .fetch_one(self.db.pool())
        .await
        .unwrap_or_else(|e| panic!("cancellation log row for {}: {}", appointment_id, e))
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(self.db.pool())
            .await
            .unwrap_or_else(|e| panic!("count query '{}': {}", sql, e))
    }
}
