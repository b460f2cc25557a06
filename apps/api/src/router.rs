use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::router::appointment_routes;
use audit_cell::router::audit_routes;
use clinic_cell::router::clinic_routes;
use dashboard_cell::router::dashboard_routes;
use doctor_cell::router::doctor_routes;
use patient_cell::router::patient_routes;
use shared_database::AppState;
use shared_models::error::AppError;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic Console API is running!" }))
        .route("/health", get(health_check))
        .with_state(state.clone())
        .nest("/dashboard", dashboard_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/clinics", clinic_routes(state.clone()))
        .nest("/audit", audit_routes(state))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    state
        .db
        .ping()
        .await
        .map_err(|e| AppError::Database(format!("database unreachable: {}", e)))?;

    Ok(Json(json!({
        "status": "ok",
        "database": "reachable"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    use shared_utils::test_utils::{TestConfig, TestDatabase};

    #[tokio::test]
    async fn health_is_public_and_cells_are_protected() {
        let test_db = TestDatabase::seeded().await;
        let app = create_router(test_db.state());

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/audit/cancellations").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/doctors/specialties")
                    .header("Authorization", TestConfig::default().bearer())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
