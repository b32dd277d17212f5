//! REST API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::types::{
    ErrorResponse, ExecuteRequest, ExecuteResponse, InstallRequest, PackagesResponse,
};
use crate::error::PlaygroundError;
use crate::execution::ExecutionRequest;
use crate::session::{SessionManager, SessionSnapshot};

/// Handler error: status code plus JSON body.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionManager>,
}

impl AppState {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }
}

/// Map a session error to a status code and body.
pub fn error_response(err: PlaygroundError) -> ApiError {
    match err {
        PlaygroundError::NotReady(status) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::not_ready(status)),
        ),
        PlaygroundError::Busy => (StatusCode::CONFLICT, Json(ErrorResponse::busy())),
        PlaygroundError::Installation { module, message } => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse::installation_failed(&module, message)),
        ),
        e @ (PlaygroundError::InvalidModuleName(_)
        | PlaygroundError::SourceTooLong { .. }
        | PlaygroundError::InvalidCharacter(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(e.to_string())),
        ),
        e => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal_error(e.to_string())),
        ),
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "playground-runtime",
        "version": env!("CARGO_PKG_VERSION"),
        "status": state.session.status(),
    }))
}

/// Session status and counters.
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

/// Initialize the session (no-op when already Ready).
pub async fn initialize_session(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state
        .session
        .initialize()
        .await
        .map_err(error_response)?;
    Ok(Json(state.session.snapshot()))
}

/// Execute a snippet.
pub async fn execute(
    State(state): State<AppState>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    let request = ExecutionRequest::new(req.source.as_str())
        .language(req.language)
        .maybe_timeout(req.timeout());

    let result = state
        .session
        .execute_request(request)
        .await
        .map_err(error_response)?;

    Ok(Json(ExecuteResponse::from_result(&result)))
}

/// List installed packages.
pub async fn list_packages(State(state): State<AppState>) -> Json<PackagesResponse> {
    Json(PackagesResponse::new(state.session.installed_modules()))
}

/// Install a package.
pub async fn install_package(
    State(state): State<AppState>,
    Json(req): Json<InstallRequest>,
) -> Result<(StatusCode, Json<PackagesResponse>), ApiError> {
    state
        .session
        .install_package(&req.name)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(PackagesResponse::new(state.session.installed_modules())),
    ))
}
