//! Axum middleware that validates the bearer token once per request and
//! attaches the verified [`AuthContext`] as an extension.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::{AuthContext, AuthError, JwtValidator};

/// Shared middleware state
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub validator: Arc<JwtValidator>,
}

/// Verified claims wrapper for handler extraction via `Extension`
#[derive(Clone)]
pub struct AuthContextExt(pub AuthContext);

fn bearer_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)
}

fn reject(error: AuthError) -> Response {
    let status = match error {
        AuthError::MissingToken => StatusCode::UNAUTHORIZED,
        AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden => StatusCode::FORBIDDEN,
    };
    (status, error.to_string()).into_response()
}

/// Validate the caller's token and attach the context
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(e) => return reject(e),
    };

    let context = match state.validator.validate(token) {
        Ok(context) => context,
        Err(e) => return reject(e),
    };

    request.extensions_mut().insert(AuthContextExt(context));
    next.run(request).await
}
