use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use serde_json::Value;
use tower::ServiceExt;

use patient_cell::models::{CreatePatientRequest, PatientError, PatientSearchQuery, UpdatePatientRequest};
use patient_cell::router::patient_routes;
use patient_cell::services::PatientService;
use shared_utils::test_utils::{
    TestConfig, TestDatabase, CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_MARIA, PATIENT_PAULO,
};

fn new_patient(cpf: &str, name: &str) -> CreatePatientRequest {
    CreatePatientRequest {
        cpf: cpf.to_string(),
        name: name.to_string(),
        birth_date: NaiveDate::from_ymd_opt(1975, 5, 20),
        gender: Some("F".to_string()),
        phone: Some("11 99999-0000".to_string()),
        email: Some("".to_string()),
    }
}

#[tokio::test]
async fn create_and_fetch_patient() {
    let test_db = TestDatabase::seeded().await;
    let service = PatientService::new(&test_db.db);

    let created = service.create_patient(new_patient("44444444444", "Lucia Alves")).await.unwrap();
    assert_eq!(created.name, "Lucia Alves");
    assert_eq!(created.email, None, "blank email should be stored as NULL");

    let fetched = service.get_patient("44444444444").await.unwrap();
    assert_eq!(fetched.birth_date, NaiveDate::from_ymd_opt(1975, 5, 20));
}

#[tokio::test]
async fn create_rejects_bad_cpf_and_duplicates() {
    let test_db = TestDatabase::seeded().await;
    let service = PatientService::new(&test_db.db);

    let result = service.create_patient(new_patient("123", "Short Cpf")).await;
    assert_matches!(result, Err(PatientError::ValidationError(_)));

    let result = service.create_patient(new_patient(PATIENT_PAULO, "Paulo Again")).await;
    assert_matches!(result, Err(PatientError::AlreadyExists { cpf }) if cpf == PATIENT_PAULO);
}

#[tokio::test]
async fn search_counts_appointments_and_filters() {
    let test_db = TestDatabase::seeded().await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_MARIA, "2025-02-01 10:00:00").await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_MARIA, "2025-02-08 10:00:00").await;

    let service = PatientService::new(&test_db.db);

    let all = service.search_patients(PatientSearchQuery::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let maria = service
        .search_patients(PatientSearchQuery { search: Some("maria".to_string()) })
        .await
        .unwrap();
    assert_eq!(maria.len(), 1);
    assert_eq!(maria[0].total_appointments, 2);

    let by_cpf = service
        .search_patients(PatientSearchQuery { search: Some("1111".to_string()) })
        .await
        .unwrap();
    assert_eq!(by_cpf[0].cpf, PATIENT_PAULO);
}

#[tokio::test]
async fn history_is_newest_first() {
    let test_db = TestDatabase::seeded().await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00").await;
    let latest = test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-03-10 09:00:00").await;

    let service = PatientService::new(&test_db.db);
    let history = service.get_patient_appointments(PATIENT_PAULO).await.unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, latest);
    assert_eq!(history[0].specialty, "Cardiologia");
    assert_eq!(history[0].clinic_name, "Clinica Central");
}

#[tokio::test]
async fn update_only_touches_supplied_fields() {
    let test_db = TestDatabase::seeded().await;
    let service = PatientService::new(&test_db.db);

    let updated = service
        .update_patient(
            PATIENT_PAULO,
            UpdatePatientRequest {
                phone: Some("21 3333-4444".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Paulo Mendes");
    assert_eq!(updated.phone.as_deref(), Some("21 3333-4444"));

    let missing = service.update_patient("99999999999", UpdatePatientRequest::default()).await;
    assert_matches!(missing, Err(PatientError::NotFound(_)));
}

#[tokio::test]
async fn delete_is_restricted_while_appointments_exist() {
    let test_db = TestDatabase::seeded().await;
    let appointment = test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00").await;
    let service = PatientService::new(&test_db.db);

    let blocked = service.delete_patient(PATIENT_PAULO).await;
    assert_matches!(blocked, Err(PatientError::HasAppointments { .. }));

    test_db.cancel_appointment(appointment).await;
    service.delete_patient(PATIENT_PAULO).await.unwrap();

    let gone = service.get_patient(PATIENT_PAULO).await;
    assert_matches!(gone, Err(PatientError::NotFound(_)));
}

#[tokio::test]
async fn routes_require_operator_credential() {
    let test_db = TestDatabase::seeded().await;
    let app = patient_routes(test_db.state());

    let unauthenticated = Request::builder()
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(unauthenticated).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri(format!("/{}", PATIENT_MARIA))
        .header("Authorization", TestConfig::default().bearer())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["name"], "Maria Silva");
}
