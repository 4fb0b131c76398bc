//! Authentication middleware.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use egide_jwt::{AuthOutcome, FailReason, Strategy};
use serde::Serialize;

use crate::adapter::auth_request;
use crate::directory::Account;
use crate::AppState;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Short error code.
    pub error: &'static str,
    /// Human-readable message.
    pub message: String,
}

fn error_response(status: StatusCode, error: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error,
            message: message.into(),
        }),
    )
        .into_response()
}

/// 401 with a bearer challenge.
fn unauthorized(reason: &FailReason, status: Option<StatusCode>) -> Response {
    let mut response = error_response(
        status.unwrap_or(StatusCode::UNAUTHORIZED),
        "unauthorized",
        reason.message(),
    );
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}

fn internal_error() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        "authentication error",
    )
}

/// Runs the strategy and stores the authenticated [`Account`] in the request
/// extensions.
pub async fn authenticate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to buffer request body");
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                e.to_string(),
            );
        },
    };

    let outcome = state.strategy.authenticate(&auth_request(&parts, &bytes)).await;
    let mut request = Request::from_parts(parts, Body::from(bytes));

    match outcome {
        Ok(AuthOutcome::Success { identity, .. }) => {
            tracing::debug!(sub = %identity.sub, "Request authenticated");
            request.extensions_mut().insert::<Account>(identity);
            next.run(request).await
        },
        Ok(AuthOutcome::Fail { reason, status }) => {
            tracing::debug!(reason = %reason, "Authentication failed");
            unauthorized(&reason, status)
        },
        Ok(AuthOutcome::Error(e)) => {
            tracing::warn!(error = %e, "Authentication error");
            internal_error()
        },
        Err(e) => {
            tracing::error!(
                error = %e,
                strategy = state.strategy.name(),
                "Authentication strategy misbehaved"
            );
            internal_error()
        },
    }
}
