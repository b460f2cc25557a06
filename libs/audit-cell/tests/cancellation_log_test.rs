use assert_matches::assert_matches;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tower::ServiceExt;

use audit_cell::models::{CancellationQuery, RecoveryError};
use audit_cell::router::audit_routes;
use audit_cell::services::{CancellationLogService, RecoveryEngine};
use shared_utils::test_utils::{
    TestConfig, TestDatabase, CLINIC_CENTRAL, CLINIC_NORTH, DOCTOR_CARDIO, DOCTOR_PEDIATRIC, PATIENT_JOAO,
    PATIENT_MARIA, PATIENT_PAULO,
};

/// Writes a log row directly so `cancelled_at` is deterministic.
async fn log_row(test_db: &TestDatabase, original_id: i64, doctor: &str, at: &str, cancelled_at: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO cancellation_log \
         (original_appointment_id, clinic_code, doctor_code, patient_cpf, scheduled_at, cancelled_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
    )
    .bind(original_id)
    .bind(CLINIC_CENTRAL)
    .bind(doctor)
    .bind(PATIENT_PAULO)
    .bind(at)
    .bind(cancelled_at)
    .fetch_one(test_db.db.pool())
    .await
    .unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", TestConfig::default().bearer());
    let body = match body {
        Some(body) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn cancellations_are_listed_newest_first_and_filtered_by_date() {
    let test_db = TestDatabase::seeded().await;
    let oldest = log_row(&test_db, 1, DOCTOR_CARDIO, "2025-01-10 09:00:00", "2025-01-05 12:00:00").await;
    let middle = log_row(&test_db, 2, DOCTOR_CARDIO, "2025-01-11 09:00:00", "2025-01-06 08:00:00").await;
    let newest = log_row(&test_db, 3, DOCTOR_PEDIATRIC, "2025-01-12 09:00:00", "2025-01-07 18:30:00").await;

    let service = CancellationLogService::new(&test_db.db);

    let all = service.list_cancellations(CancellationQuery::default()).await.unwrap();
    assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), vec![newest, middle, oldest]);

    let window = service
        .list_cancellations(CancellationQuery {
            from: NaiveDate::from_ymd_opt(2025, 1, 6),
            to: NaiveDate::from_ymd_opt(2025, 1, 6),
        })
        .await
        .unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].id, middle);

    let entry = service.get_cancellation(newest).await.unwrap();
    assert_eq!(entry.doctor_code, DOCTOR_PEDIATRIC);
    assert_eq!(entry.original_appointment_id, 3);

    assert_matches!(service.get_cancellation(999).await, Err(RecoveryError::LogEntryNotFound(999)));
}

#[tokio::test]
async fn purge_requires_a_prior_recovery() {
    let test_db = TestDatabase::seeded().await;
    let appointment = test_db
        .insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00")
        .await;
    let log_entry_id = test_db.cancel_appointment(appointment).await;

    let service = CancellationLogService::new(&test_db.db);

    let refused = service.purge_cancellation(log_entry_id).await;
    assert_matches!(refused, Err(RecoveryError::NotRecovered(id)) if id == log_entry_id);
    assert_eq!(test_db.count("SELECT COUNT(*) FROM cancellation_log").await, 1);

    RecoveryEngine::new(&test_db.db)
        .commit_recovery(log_entry_id, None, false)
        .await
        .unwrap();

    service.purge_cancellation(log_entry_id).await.unwrap();
    assert_eq!(test_db.count("SELECT COUNT(*) FROM cancellation_log").await, 0);

    let again = service.purge_cancellation(log_entry_id).await;
    assert_matches!(again, Err(RecoveryError::LogEntryNotFound(_)));
}

#[tokio::test]
async fn purge_still_allowed_after_recovered_appointment_is_cancelled() {
    let test_db = TestDatabase::seeded().await;
    let appointment = test_db
        .insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00")
        .await;
    let log_entry_id = test_db.cancel_appointment(appointment).await;

    let receipt = RecoveryEngine::new(&test_db.db)
        .commit_recovery(log_entry_id, None, false)
        .await
        .unwrap();
    let second_log_entry = test_db.cancel_appointment(receipt.appointment_id).await;
    assert_eq!(test_db.count("SELECT COUNT(*) FROM appointments").await, 0);

    let service = CancellationLogService::new(&test_db.db);
    service.purge_cancellation(log_entry_id).await.unwrap();

    let remaining = service.list_cancellations(CancellationQuery::default()).await.unwrap();
    assert_eq!(remaining.iter().map(|e| e.id).collect::<Vec<_>>(), vec![second_log_entry]);

    // The second cancellation was never recovered itself.
    assert_matches!(
        service.purge_cancellation(second_log_entry).await,
        Err(RecoveryError::NotRecovered(id)) if id == second_log_entry
    );
}

#[tokio::test]
async fn recovered_list_is_newest_first_and_limited() {
    let test_db = TestDatabase::seeded().await;
    let engine = RecoveryEngine::new(&test_db.db);

    let mut receipts = Vec::new();
    for (doctor, patient, at) in [
        (DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00"),
        (DOCTOR_CARDIO, PATIENT_MARIA, "2025-01-10 10:00:00"),
        (DOCTOR_PEDIATRIC, PATIENT_JOAO, "2025-01-10 11:00:00"),
    ] {
        let id = test_db.insert_appointment(CLINIC_NORTH, doctor, patient, at).await;
        let log_entry_id = test_db.cancel_appointment(id).await;
        receipts.push(engine.commit_recovery(log_entry_id, None, false).await.unwrap());
    }
    // Ordinary bookings never show up as recovered.
    test_db
        .insert_appointment(CLINIC_CENTRAL, DOCTOR_PEDIATRIC, PATIENT_PAULO, "2025-02-01 09:00:00")
        .await;

    let service = CancellationLogService::new(&test_db.db);

    let recovered = service.list_recovered(None).await.unwrap();
    assert_eq!(recovered.len(), 3);
    assert_eq!(recovered[0].id, receipts[2].appointment_id);
    assert_eq!(recovered[0].patient_name, "Joao Pereira");
    assert_eq!(recovered[0].recovered_from_log_id, receipts[2].log_entry_id);

    let limited = service.list_recovered(Some(2)).await.unwrap();
    assert_eq!(limited.len(), 2);

    let clamped = service.list_recovered(Some(0)).await.unwrap();
    assert_eq!(clamped.len(), 1);
}

#[tokio::test]
async fn recovery_routes_report_failures() {
    let test_db = TestDatabase::seeded().await;
    let appointment = test_db
        .insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00")
        .await;
    let log_entry_id = test_db.cancel_appointment(appointment).await;
    test_db
        .insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_MARIA, "2025-01-10 09:00:00")
        .await;

    let app = audit_routes(test_db.state());

    let (status, report) = call(
        &app,
        "POST",
        &format!("/cancellations/{}/validate", log_entry_id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["ok"], false);
    assert_eq!(report["failures"][0]["kind"], "scheduling_conflict");
    assert_eq!(report["failures"][0]["suggestions"][0]["scheduled_at"], "2025-01-10 09:30:00");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/cancellations/{}/recover", log_entry_id),
        Some(json!({ "purge_log": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["kind"], "scheduling_conflict");
    assert_eq!(body["details"]["doctor"], DOCTOR_CARDIO);

    let (status, receipt) = call(
        &app,
        "POST",
        &format!("/cancellations/{}/recover", log_entry_id),
        Some(json!({ "scheduled_at": "2025-01-10T09:30:00", "purge_log": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["scheduled_at"], "2025-01-10 09:30:00");
    assert_eq!(receipt["log_purged"], true);

    let (status, _) = call(&app, "GET", &format!("/cancellations/{}", log_entry_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, recovered) = call(&app, "GET", "/recovered?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recovered["total"], 1);
}

#[tokio::test]
async fn bodiless_requests_use_the_logged_timestamp() {
    let test_db = TestDatabase::seeded().await;
    let appointment = test_db
        .insert_appointment(CLINIC_CENTRAL, DOCTOR_CARDIO, PATIENT_PAULO, "2025-01-10 09:00:00")
        .await;
    let log_entry_id = test_db.cancel_appointment(appointment).await;

    let app = audit_routes(test_db.state());

    let (status, report) = call(&app, "POST", &format!("/cancellations/{}/validate", log_entry_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["ok"], true);
    assert_eq!(report["scheduled_at"], "2025-01-10 09:00:00");

    let (status, receipt) = call(&app, "POST", &format!("/cancellations/{}/recover", log_entry_id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(receipt["scheduled_at"], "2025-01-10 09:00:00");
    assert_eq!(receipt["log_purged"], false);
}

#[tokio::test]
async fn stale_reference_is_unprocessable() {
    let test_db = TestDatabase::seeded().await;
    let appointment = test_db
        .insert_appointment(CLINIC_CENTRAL, DOCTOR_PEDIATRIC, PATIENT_JOAO, "2025-01-10 09:00:00")
        .await;
    let log_entry_id = test_db.cancel_appointment(appointment).await;
    sqlx::query("DELETE FROM patients WHERE cpf = ?")
        .bind(PATIENT_JOAO)
        .execute(test_db.db.pool())
        .await
        .unwrap();

    let app = audit_routes(test_db.state());
    let (status, body) = call(
        &app,
        "POST",
        &format!("/cancellations/{}/recover", log_entry_id),
        Some(json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["kind"], "stale_reference");
    assert_eq!(body["details"]["entity"], "patient");
    assert_eq!(body["details"]["key"], PATIENT_JOAO);
}

#[tokio::test]
async fn audit_routes_require_operator_credential() {
    let test_db = TestDatabase::seeded().await;
    let app = audit_routes(test_db.state());

    let request = Request::builder()
        .uri("/cancellations")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
