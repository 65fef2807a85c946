//! Resolves Smart Home callers to user ids.
//!
//! Google sends the access token Auth0 issued during account linking. We do
//! not validate it ourselves: the Auth0 `/userinfo` endpoint does that and
//! hands back the subject id.

pub mod models;

#[cfg(test)]
mod tests;

use crate::core::anonymous_client;
use http::HeaderMap;
use reqwest::{header, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;

use self::models::UserProfile;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Missing or malformed Authorization header")]
    MissingBearerToken,
    #[error("Access token rejected: {0}")]
    Unauthorized(StatusCode),
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingBearerToken)?;

    let token = value
        .get(..BEARER_PREFIX.len())
        .filter(|scheme| scheme.eq_ignore_ascii_case(BEARER_PREFIX))
        .map(|_| value[BEARER_PREFIX.len()..].trim())
        .ok_or(AuthError::MissingBearerToken)?;

    if token.is_empty() {
        return Err(AuthError::MissingBearerToken);
    }
    Ok(token)
}

/// Client for the Auth0 authentication API.
#[derive(Clone)]
pub struct ProfileClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl ProfileClient {
    /// Creates a client for the tenant at `domain` (e.g. `example.eu.auth0.com`).
    pub fn new(domain: &str) -> Self {
        let domain = domain.trim_end_matches('/');
        let base_url = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{}", domain)
        };
        Self::new_with_client(anonymous_client(), base_url)
    }

    /// Creates a client with a custom client and base URL (useful for testing).
    pub fn new_with_client(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Looks up the profile of the user an access token was issued to.
    pub async fn get_profile(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let url = format!("{}/userinfo", self.base_url);

        let response = self.client.get(&url).bearer_auth(access_token).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Unauthorized(status));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::ApiError(format!("Get profile failed {}: {}", status, text)));
        }

        Ok(response.json().await?)
    }

    /// Resolves the `Authorization` header of a request to a user id.
    pub async fn resolve_user(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let token = bearer_token(headers)?;
        Ok(self.get_profile(token).await?.sub)
    }
}
