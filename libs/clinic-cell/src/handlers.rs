use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use shared_database::AppState;
use shared_models::auth::Operator;
use shared_models::error::AppError;

use crate::models::{ClinicError, ClinicSearchQuery, CreateClinicRequest, UpdateClinicRequest};
use crate::services::ClinicService;

fn to_app_error(e: ClinicError) -> AppError {
    match e {
        ClinicError::NotFound(_) => AppError::NotFound(e.to_string()),
        ClinicError::AlreadyExists(_) | ClinicError::HasAppointments { .. } => AppError::Conflict(e.to_string()),
        ClinicError::ValidationError(msg) => AppError::ValidationError(msg),
        ClinicError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_clinic(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = ClinicService::new(&state.db);

    let clinic = service.create_clinic(request).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Clinic {} created", clinic.code);

    Ok((StatusCode::CREATED, Json(json!(clinic))))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&state.db);

    let clinic = service.get_clinic(&code).await.map_err(to_app_error)?;

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn search_clinics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClinicSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&state.db);

    let clinics = service.search_clinics(query).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "clinics": clinics,
        "total": clinics.len()
    })))
}

#[axum::debug_handler]
pub async fn get_clinic_activity(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&state.db);

    let activity = service.get_clinic_activity(&code).await.map_err(to_app_error)?;

    Ok(Json(json!(activity)))
}

#[axum::debug_handler]
pub async fn update_clinic(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(code): Path<String>,
    Json(request): Json<UpdateClinicRequest>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&state.db);

    let clinic = service.update_clinic(&code, request).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Clinic {} updated", code);

    Ok(Json(json!(clinic)))
}

#[axum::debug_handler]
pub async fn delete_clinic(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = ClinicService::new(&state.db);

    service.delete_clinic(&code).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Clinic {} deleted", code);

    Ok(Json(json!({
        "success": true,
        "message": format!("Clinic {} removed", code)
    })))
}
