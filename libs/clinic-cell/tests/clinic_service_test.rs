use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use clinic_cell::models::{ClinicError, ClinicSearchQuery, CreateClinicRequest, UpdateClinicRequest};
use clinic_cell::router::clinic_routes;
use clinic_cell::services::ClinicService;
use shared_utils::test_utils::{
    TestConfig, TestDatabase, CLINIC_CENTRAL, CLINIC_NORTH, DOCTOR_CARDIO, DOCTOR_IDLE, DOCTOR_PEDIATRIC,
    PATIENT_JOAO, PATIENT_MARIA, PATIENT_PAULO,
};

fn new_clinic(code: &str, name: &str) -> CreateClinicRequest {
    CreateClinicRequest {
        code: code.to_string(),
        name: name.to_string(),
        address: Some("Rua Sul, 10".to_string()),
        phone: None,
        email: None,
    }
}

#[tokio::test]
async fn create_requires_unique_code_and_name() {
    let test_db = TestDatabase::seeded().await;
    let service = ClinicService::new(&test_db.db);

    let created = service.create_clinic(new_clinic("CLI0003", "Clinica Sul")).await.unwrap();
    assert_eq!(created.address.as_deref(), Some("Rua Sul, 10"));

    let same_name = service.create_clinic(new_clinic("CLI0004", "Clinica Central")).await;
    assert_matches!(same_name, Err(ClinicError::AlreadyExists(_)));

    let bad_code = service.create_clinic(new_clinic("C1", "Clinica Leste")).await;
    assert_matches!(bad_code, Err(ClinicError::ValidationError(_)));
}

#[tokio::test]
async fn activity_lists_appointments_and_specialty_mix() {
    let test_db = TestDatabase::seeded().await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00").await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_IDLE, PATIENT_MARIA, "2025-01-11 09:00:00").await;
    let latest = test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_PEDIATRIC, PATIENT_JOAO, "2025-01-12 09:00:00").await;
    test_db.insert_appointment(CLINIC_NORTH, DOCTOR_PEDIATRIC, PATIENT_JOAO, "2025-01-13 09:00:00").await;

    let service = ClinicService::new(&test_db.db);
    let activity = service.get_clinic_activity(CLINIC_CENTRAL).await.unwrap();

    assert_eq!(activity.appointments.len(), 3);
    assert_eq!(activity.appointments[0].id, latest);
    assert_eq!(activity.specialties[0].specialty, "Cardiologia");
    assert_eq!(activity.specialties[0].total, 2);
    assert_eq!(activity.specialties[1].total, 1);

    let listed = service.search_clinics(ClinicSearchQuery::default()).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].code, CLINIC_CENTRAL);
    assert_eq!(listed[0].total_appointments, 3);

    let north = service
        .search_clinics(ClinicSearchQuery { name: Some("norte".to_string()) })
        .await
        .unwrap();
    assert_eq!(north.len(), 1);
    assert_eq!(north[0].total_appointments, 1);
}

#[tokio::test]
async fn update_and_restricted_delete() {
    let test_db = TestDatabase::seeded().await;
    let appointment = test_db.insert_appointment(CLINIC_NORTH, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00").await;
    let service = ClinicService::new(&test_db.db);

    let updated = service
        .update_clinic(
            CLINIC_NORTH,
            UpdateClinicRequest {
                phone: Some("11 4000-0000".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.phone.as_deref(), Some("11 4000-0000"));
    assert_eq!(updated.address.as_deref(), Some("Av. Norte, 2000"));

    let bad_email = service
        .update_clinic(
            CLINIC_NORTH,
            UpdateClinicRequest {
                email: Some("not-an-email".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(bad_email, Err(ClinicError::ValidationError(_)));

    let blocked = service.delete_clinic(CLINIC_NORTH).await;
    assert_matches!(blocked, Err(ClinicError::HasAppointments { .. }));

    test_db.cancel_appointment(appointment).await;
    service.delete_clinic(CLINIC_NORTH).await.unwrap();
    assert_matches!(service.get_clinic(CLINIC_NORTH).await, Err(ClinicError::NotFound(_)));
}

#[tokio::test]
async fn create_route_returns_created() {
    let test_db = TestDatabase::seeded().await;
    let app = clinic_routes(test_db.state());

    let body = json!({ "code": "CLI0009", "name": "Clinica Oeste" });
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", TestConfig::default().bearer())
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("Authorization", TestConfig::default().bearer())
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].as_str().unwrap().contains("already registered"));
}
