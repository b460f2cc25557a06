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

use crate::models::{CreatePatientRequest, PatientError, PatientSearchQuery, UpdatePatientRequest};
use crate::services::PatientService;

fn to_app_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound(_) => AppError::NotFound(e.to_string()),
        PatientError::AlreadyExists { .. } | PatientError::HasAppointments { .. } => {
            AppError::Conflict(e.to_string())
        }
        PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PatientService::new(&state.db);

    let patient = service.create_patient(request).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Patient {} created", patient.cpf);

    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppState>>,
    Path(cpf): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);

    let patient = service.get_patient(&cpf).await.map_err(to_app_error)?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);

    let patients = service.search_patients(query).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppState>>,
    Path(cpf): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);

    let appointments = service.get_patient_appointments(&cpf).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "cpf": cpf,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(cpf): Path<String>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);

    let patient = service.update_patient(&cpf, request).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Patient {} updated", cpf);

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(cpf): Path<String>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state.db);

    service.delete_patient(&cpf).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Patient {} deleted", cpf);

    Ok(Json(json!({
        "success": true,
        "message": format!("Patient {} removed", cpf)
    })))
}
