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
    AgendaQuery, AppointmentError, AppointmentSearchQuery, BookAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::AppointmentBookingService;

fn to_app_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound(_)
        | AppointmentError::PatientNotFound(_)
        | AppointmentError::DoctorNotFound(_)
        | AppointmentError::ClinicNotFound(_) => AppError::NotFound(e.to_string()),
        AppointmentError::SchedulingConflict { .. } | AppointmentError::Duplicate { .. } => AppError::Rejected {
            status: StatusCode::CONFLICT,
            message: e.to_string(),
            details: json!(e),
        },
        AppointmentError::InvalidPeriod(_) => AppError::BadRequest(e.to_string()),
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state.db);

    let appointments = service.list_appointments(query).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_agenda(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgendaQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state.db);

    let agenda = service.get_agenda(query).await.map_err(to_app_error)?;

    Ok(Json(json!({
        "period": agenda.period,
        "appointments": agenda.appointments,
        "total": agenda.appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state.db);

    let appointment = service.get_appointment(appointment_id).await.map_err(to_app_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AppointmentBookingService::new(&state.db);

    let appointment = service.book_appointment(request).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Appointment {} booked", appointment.id);

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state.db);

    let appointment = service
        .update_appointment(appointment_id, request)
        .await
        .map_err(to_app_error)?;
    info!(operator = %operator.name, "Appointment {} updated", appointment_id);

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state.db);

    let cancelled = service.cancel_appointment(appointment_id).await.map_err(to_app_error)?;
    info!(operator = %operator.name, "Appointment {} cancelled", appointment_id);

    Ok(Json(json!({
        "success": true,
        "cancelled": cancelled.appointment,
        "log_entry_id": cancelled.log_entry_id
    })))
}
