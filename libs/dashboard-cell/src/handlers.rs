use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_database::AppState;
use shared_models::error::AppError;

use crate::models::{DashboardError, DashboardQuery};
use crate::services::DashboardService;

fn to_app_error(e: DashboardError) -> AppError {
    match e {
        DashboardError::InvalidRange(_) => AppError::BadRequest(e.to_string()),
        DashboardError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DashboardService::new(&state.db);

    let report = service.build_report(query).await.map_err(to_app_error)?;

    Ok(Json(json!(report)))
}
