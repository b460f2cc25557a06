use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn clinic_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(search_clinics).post(create_clinic))
        .route("/{code}", get(get_clinic).put(update_clinic).delete(delete_clinic))
        .route("/{code}/appointments", get(get_clinic_activity))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
