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

use crate::models::{CreateDoctorRequest, DoctorError, DoctorSearchQuery, UpdateDoctorRequest};
use crate::services::DoctorService;

fn to_app_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound(_) => AppError::NotFound(e.to_string()),
        DoctorError::AlreadyExists(_) | DoctorError::HasAppointments { .. } => AppError::Conflict(e.to_string()),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Json(request): Json<CreateDoctorRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = DoctorService::new(&state.db);

    let doctor = service.create_doctor(request).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Doctor {} created", doctor.code);

    Ok((StatusCode::CREATED, Json(json!(doctor))))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state.db);

    let doctor = service.get_doctor(&code).await.map_err(to_app_error)?;
    let stats = service.get_doctor_stats(&code).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "doctor": doctor,
        "stats": stats
    })))
}

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state.db);

    let doctors = service.search_doctors(query).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn list_specialties(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state.db);

    let specialties = service.list_specialties().await.map_err(to_app_error)?;

    Ok(Json(json!({ "specialties": specialties })))
}

#[axum::debug_handler]
pub async fn get_doctor_agenda(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state.db);

    let agenda = service.get_doctor_agenda(&code).await.map_err(to_app_error)?;

    Ok(Json(json!(agenda)))
}

#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(code): Path<String>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state.db);

    let doctor = service.update_doctor(&code, request).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Doctor {} updated", code);

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state.db);

    service.delete_doctor(&code).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Doctor {} deleted", code);

    Ok(Json(json!({
        "success": true,
        "message": format!("Doctor {} removed", code)
    })))
}
