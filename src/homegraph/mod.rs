//! Google Home Graph client.
//!
//! Home Graph is Google's copy of every linked user's devices. `request_sync`
//! tells it the device list changed so it issues a fresh SYNC intent;
//! `report_state` pushes the current state of a device.

pub mod models;


use crate::core::middleware::AuthMiddleware;
use crate::core::{authorized_client, parse_error_response};
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;

use self::models::{ReportStateRequest, ReportStateResponse, RequestSyncRequest};

pub const HOME_GRAPH_V1_API: &str = "https://homegraph.googleapis.com/v1";

#[derive(Error, Debug)]
pub enum HomeGraphError {
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Client for the Home Graph API.
#[derive(Clone)]
pub struct HomeGraph {
    client: ClientWithMiddleware,
    base_url: String,
}

impl HomeGraph {
    /// Creates a client authenticated with the service account in `middleware`,
    /// which must carry the Home Graph scope.
    pub fn new(middleware: AuthMiddleware) -> Self {
        Self::new_with_client(authorized_client(middleware), HOME_GRAPH_V1_API)
    }

    /// Creates a client with a custom client and base URL (useful for testing).
    pub fn new_with_client(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Points the client at another Home Graph endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Asks Google to re-SYNC the devices of `agent_user_id`.
    pub async fn request_sync(&self, agent_user_id: &str) -> Result<(), HomeGraphError> {
        let url = format!("{}/devices:requestSync", self.base_url);
        let request = RequestSyncRequest {
            agent_user_id: agent_user_id.to_string(),
            is_async: false,
        };

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HomeGraphError::ApiError(
                parse_error_response(response, "Request sync failed").await,
            ));
        }

        Ok(())
    }

    /// Pushes device states for a user. Returns the request id echoed by Home Graph.
    pub async fn report_state(
        &self,
        request: &ReportStateRequest,
    ) -> Result<Option<String>, HomeGraphError> {
        let url = format!("{}/devices:reportStateAndNotification", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(request)?)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HomeGraphError::ApiError(
                parse_error_response(response, "Report state failed").await,
            ));
        }

        let result: ReportStateResponse = response.json().await?;
        Ok(result.request_id)
    }
}
