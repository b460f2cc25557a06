use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_appointments).post(book_appointment))
        .route("/agenda", get(get_agenda))
        .route(
            "/{appointment_id}",
            get(get_appointment).put(update_appointment).delete(cancel_appointment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
