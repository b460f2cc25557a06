use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};

use shared_database::AppState;
use shared_models::error::AppError;

use crate::credential::validate_operator_token;

// Middleware for the single shared operator credential
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::Auth("Missing or malformed authorization header".to_string()))?;

    let operator = validate_operator_token(bearer.token(), &state.config.operator_token)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(operator);

    Ok(next.run(request).await)
}
