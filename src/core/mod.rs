pub mod middleware;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;

use self::middleware::AuthMiddleware;

/// Error body returned by Google APIs (Firestore, Home Graph).
#[derive(Debug, Deserialize)]
pub struct GoogleErrorResponse {
    pub error: GoogleErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct GoogleErrorDetails {
    pub code: u16,
    pub message: String,
    pub status: Option<String>,
}

impl GoogleErrorResponse {
    pub fn display_message(&self) -> String {
        match &self.error.status {
            Some(status) => format!(
                "{} (code: {}, status: {})",
                self.error.message, self.error.code, status
            ),
            None => format!("{} (code: {})", self.error.message, self.error.code),
        }
    }
}

/// Reads a failed response and turns it into a readable message.
///
/// Falls back to `default_msg` plus the HTTP status when the body is not a
/// Google error document.
pub async fn parse_error_response(response: reqwest::Response, default_msg: &str) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<GoogleErrorResponse>(&text) {
        Ok(error_resp) => error_resp.display_message(),
        Err(_) if text.is_empty() => format!("{}: {}", default_msg, status),
        Err(_) => format!("{} {}: {}", default_msg, status, text),
    }
}

/// Builds the retrying client every Google service client uses.
pub fn authorized_client(middleware: AuthMiddleware) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(middleware)
        .build()
}

/// Same as [`authorized_client`] without credentials, for emulators and
/// endpoints that take the caller's own token.
pub fn anonymous_client() -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}
