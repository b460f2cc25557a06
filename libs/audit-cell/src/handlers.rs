// =====================================================================================
// AUDIT CELL HANDLERS
// =====================================================================================

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

use crate::models::{
    CancellationQuery, CommitRecoveryRequest, RecoveredQuery, RecoveryError, ValidateRecoveryRequest,
};
use crate::services::{CancellationLogService, RecoveryEngine};

fn to_app_error(e: RecoveryError) -> AppError {
    match e {
        RecoveryError::LogEntryNotFound(_) => AppError::NotFound(e.to_string()),
        RecoveryError::NotRecovered(_) => AppError::Conflict(e.to_string()),
        RecoveryError::StaleReference { .. } => rejected(StatusCode::UNPROCESSABLE_ENTITY, e),
        RecoveryError::DuplicateAppointment { .. } | RecoveryError::SchedulingConflict { .. } => {
            rejected(StatusCode::CONFLICT, e)
        }
        RecoveryError::InsertionFailure(_) => AppError::Internal(e.to_string()),
        RecoveryError::Database(msg) => AppError::Database(msg),
    }
}

fn rejected(status: StatusCode, e: RecoveryError) -> AppError {
    AppError::Rejected {
        status,
        message: e.to_string(),
        details: json!(e.as_failure()),
    }
}

// =====================================================================================
// CANCELLATION LOG
// =====================================================================================

#[axum::debug_handler]
pub async fn list_cancellations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CancellationQuery>,
) -> Result<Json<Value>, AppError> {
    let service = CancellationLogService::new(&state.db);

    let entries = service.list_cancellations(query).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "cancellations": entries,
        "total": entries.len()
    })))
}

#[axum::debug_handler]
pub async fn get_cancellation(
    State(state): State<Arc<AppState>>,
    Path(log_entry_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = CancellationLogService::new(&state.db);

    let entry = service.get_cancellation(log_entry_id).await.map_err(to_app_error)?;

    Ok(Json(json!(entry)))
}

#[axum::debug_handler]
pub async fn purge_cancellation(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(log_entry_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = CancellationLogService::new(&state.db);

    service.purge_cancellation(log_entry_id).await.map_err(to_app_error)?;
    info!(operator = %operator.name, log_entry_id, "Cancellation log entry purged");

    Ok(Json(json!({
        "success": true,
        "message": format!("Cancellation log entry {} purged", log_entry_id)
    })))
}

#[axum::debug_handler]
pub async fn list_recovered(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecoveredQuery>,
) -> Result<Json<Value>, AppError> {
    let service = CancellationLogService::new(&state.db);

    let recovered = service.list_recovered(query.limit).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "recovered": recovered,
        "total": recovered.len()
    })))
}

// =====================================================================================
// RECOVERY
// =====================================================================================

/// Always 200 when the entry exists; the report says whether recovery would succeed.
/// A bare POST validates at the logged timestamp.
#[axum::debug_handler]
pub async fn validate_recovery(
    State(state): State<Arc<AppState>>,
    Path(log_entry_id): Path<i64>,
    body: Option<Json<ValidateRecoveryRequest>>,
) -> Result<Json<Value>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let engine = RecoveryEngine::new(&state.db);

    let report = engine
        .validate_recovery(log_entry_id, request.scheduled_at)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!(report)))
}

#[axum::debug_handler]
pub async fn commit_recovery(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(log_entry_id): Path<i64>,
    body: Option<Json<CommitRecoveryRequest>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let engine = RecoveryEngine::new(&state.db);

    let receipt = engine
        .commit_recovery(log_entry_id, request.scheduled_at, request.purge_log)
        .await
        .map_err(to_app_error)?;
    info!(
        operator = %operator.name,
        log_entry_id,
        appointment_id = receipt.appointment_id,
        "Appointment recovered from cancellation log"
    );

    Ok((StatusCode::CREATED, Json(json!(receipt))))
}
