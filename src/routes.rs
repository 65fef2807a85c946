//! HTTP surface: Smart Home fulfillment, Firestore events and a health check.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::{debug, error, instrument, warn};

use crate::smarthome::models::{SmartHomeRequest, SmartHomeResponse};
use crate::smarthome::{SmartHomeApp, SmartHomeError};
use crate::triggers::{DeviceEvent, DeviceTriggers, TriggerError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub smarthome: SmartHomeApp,
    pub triggers: DeviceTriggers,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/smarthome", post(fulfillment))
        .route("/events", post(device_event))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// A failed request, rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.message, "request failed");
        } else {
            warn!(status = %self.status, error = %self.message, "request rejected");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<SmartHomeError> for ApiError {
    fn from(err: SmartHomeError) -> Self {
        let status = if err.is_unauthorized() {
            StatusCode::UNAUTHORIZED
        } else if err.is_bad_request() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

impl From<TriggerError> for ApiError {
    fn from(err: TriggerError) -> Self {
        let status = if err.is_bad_request() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.to_string())
    }
}

/// `POST /smarthome`
#[instrument(skip_all)]
async fn fulfillment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SmartHomeResponse>, ApiError> {
    let request: SmartHomeRequest = serde_json::from_slice(&body).map_err(|e| {
        ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid request: {}", e))
    })?;

    let response = state.smarthome.handle(&request, &headers).await?;
    Ok(Json(response))
}

/// `POST /events`: Firestore document CloudEvents in binary content mode.
#[instrument(skip_all)]
async fn device_event(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let Some(event) = DeviceEvent::from_headers(&headers)? else {
        debug!("ignoring event for a non-device document");
        return Ok(StatusCode::NO_CONTENT);
    };

    state.triggers.dispatch(&event).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /healthz`
async fn healthz() -> &'static str {
    "ok"
}
