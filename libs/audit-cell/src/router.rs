use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn audit_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cancellations", get(handlers::list_cancellations))
        .route(
            "/cancellations/{log_entry_id}",
            get(handlers::get_cancellation).delete(handlers::purge_cancellation),
        )
        .route("/cancellations/{log_entry_id}/validate", post(handlers::validate_recovery))
        .route("/cancellations/{log_entry_id}/recover", post(handlers::commit_recovery))
        .route("/recovered", get(handlers::list_recovered))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
