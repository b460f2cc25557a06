use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;

use doctor_cell::models::{CreateDoctorRequest, DoctorError, DoctorSearchQuery, UpdateDoctorRequest};
use doctor_cell::router::doctor_routes;
use doctor_cell::services::DoctorService;
use shared_utils::test_utils::{
    TestConfig, TestDatabase, CLINIC_CENTRAL, CLINIC_NORTH, DOCTOR_CARDIO, DOCTOR_IDLE, DOCTOR_PEDIATRIC,
    PATIENT_JOAO, PATIENT_MARIA, PATIENT_PAULO,
};

fn new_doctor(code: &str, email: &str) -> CreateDoctorRequest {
    CreateDoctorRequest {
        code: code.to_string(),
        name: "Diego Ramos".to_string(),
        specialty: "Dermatologia".to_string(),
        gender: Some("Outro".to_string()),
        phone: None,
        email: Some(email.to_string()),
    }
}

#[tokio::test]
async fn create_normalizes_gender_and_validates_code() {
    let test_db = TestDatabase::seeded().await;
    let service = DoctorService::new(&test_db.db);

    let created = service.create_doctor(new_doctor("MED0100", "diego@clinic.test")).await.unwrap();
    assert_eq!(created.gender, None);
    assert_eq!(created.specialty, "Dermatologia");

    let result = service.create_doctor(new_doctor("MED-1", "other@clinic.test")).await;
    assert_matches!(result, Err(DoctorError::ValidationError(_)));
}

#[tokio::test]
async fn create_rejects_taken_code_or_email() {
    let test_db = TestDatabase::seeded().await;
    let service = DoctorService::new(&test_db.db);

    let same_code = service.create_doctor(new_doctor(DOCTOR_CARDIO, "fresh@clinic.test")).await;
    assert_matches!(same_code, Err(DoctorError::AlreadyExists(_)));

    let same_email = service.create_doctor(new_doctor("MED0101", "ana@clinic.test")).await;
    assert_matches!(same_email, Err(DoctorError::AlreadyExists(_)));
}

#[tokio::test]
async fn search_reports_totals_and_distinct_patients() {
    let test_db = TestDatabase::seeded().await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00").await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-02-10 09:00:00").await;
    test_db.insert_appointment(CLINIC_NORTH, DOCTOR_CARDIO, PATIENT_MARIA, "2025-02-11 09:00:00").await;

    let service = DoctorService::new(&test_db.db);

    let cardiology = service
        .search_doctors(DoctorSearchQuery {
            specialty: Some("Cardiologia".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(cardiology.len(), 2);

    let ana = cardiology.iter().find(|d| d.code == DOCTOR_CARDIO).unwrap();
    assert_eq!(ana.total_appointments, 3);
    assert_eq!(ana.patients_seen, 2);

    let idle = cardiology.iter().find(|d| d.code == DOCTOR_IDLE).unwrap();
    assert_eq!(idle.total_appointments, 0);

    let by_name = service
        .search_doctors(DoctorSearchQuery {
            name: Some("bruno".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].code, DOCTOR_PEDIATRIC);

    let specialties = service.list_specialties().await.unwrap();
    assert_eq!(specialties, vec!["Cardiologia".to_string(), "Pediatria".to_string()]);
}

#[tokio::test]
async fn agenda_groups_by_month() {
    let test_db = TestDatabase::seeded().await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_PEDIATRIC, PATIENT_JOAO, "2025-03-01 08:00:00").await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_PEDIATRIC, PATIENT_MARIA, "2025-03-15 08:00:00").await;
    let latest = test_db.insert_appointment(CLINIC_NORTH, DOCTOR_PEDIATRIC, PATIENT_JOAO, "2025-04-02 10:30:00").await;

    let service = DoctorService::new(&test_db.db);
    let agenda = service.get_doctor_agenda(DOCTOR_PEDIATRIC).await.unwrap();

    assert_eq!(agenda.appointments.len(), 3);
    assert_eq!(agenda.appointments[0].id, latest);
    assert_eq!(agenda.appointments[0].clinic_name, "Clinica Norte");
    assert_eq!(agenda.monthly.len(), 2);
    assert_eq!(agenda.monthly[0].month, "2025-03");
    assert_eq!(agenda.monthly[0].total, 2);

    let stats = service.get_doctor_stats(DOCTOR_PEDIATRIC).await.unwrap();
    assert_eq!(stats.total_appointments, 3);
    assert_eq!(stats.patients_seen, 2);
}

#[tokio::test]
async fn update_and_restricted_delete() {
    let test_db = TestDatabase::seeded().await;
    let appointment = test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00").await;
    let service = DoctorService::new(&test_db.db);

    let updated = service
        .update_doctor(
            DOCTOR_CARDIO,
            UpdateDoctorRequest {
                specialty: Some("Cardiologia Pediatrica".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.specialty, "Cardiologia Pediatrica");
    assert_eq!(updated.email.as_deref(), Some("ana@clinic.test"));

    let taken = service
        .update_doctor(
            DOCTOR_CARDIO,
            UpdateDoctorRequest {
                email: Some("bruno@clinic.test".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(taken, Err(DoctorError::AlreadyExists(_)));

    let blocked = service.delete_doctor(DOCTOR_CARDIO).await;
    assert_matches!(blocked, Err(DoctorError::HasAppointments { .. }));

    test_db.cancel_appointment(appointment).await;
    service.delete_doctor(DOCTOR_CARDIO).await.unwrap();

    let missing = service.delete_doctor(DOCTOR_CARDIO).await;
    assert_matches!(missing, Err(DoctorError::NotFound(_)));
}

#[tokio::test]
async fn detail_route_includes_stats() {
    let test_db = TestDatabase::seeded().await;
    test_db.insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00").await;
    let app = doctor_routes(test_db.state());

    let request = Request::builder()
        .uri(format!("/{}", DOCTOR_CARDIO))
        .header("Authorization", TestConfig::default().bearer())
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["doctor"]["name"], "Ana Souza");
    assert_eq!(json["stats"]["total_appointments"], 1);

    let request = Request::builder()
        .uri("/MED9999")
        .header("Authorization", TestConfig::default().bearer())
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
