//! HTTP routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Extension, Json, Router};
use egide_jwt::Strategy;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::authenticate;
use crate::directory::Account;
use crate::AppState;

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: &'static str,
    /// Server version.
    pub version: &'static str,
    /// Name of the configured strategy.
    pub strategy: String,
}

/// Identity of the caller.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    /// Token subject.
    pub sub: String,
    /// Display name.
    pub name: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        strategy: state.strategy.name().to_string(),
    })
}

async fn whoami(Extension(account): Extension<Account>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        sub: account.sub,
        name: account.name,
    })
}

/// Builds the application router.
///
/// `/v1/sys/health` is public; everything under `/v1/auth` requires a token.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v1/auth/whoami", get(whoami).post(whoami))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/v1/sys/health", get(health))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::GATEWAY_TIMEOUT,
                    state.request_timeout,
                )),
        )
        .with_state(state)
}
