use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn doctor_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(search_doctors).post(create_doctor))
        .route("/specialties", get(list_specialties))
        .route("/{code}", get(get_doctor).put(update_doctor).delete(delete_doctor))
        .route("/{code}/appointments", get(get_doctor_agenda))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
