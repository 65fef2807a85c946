use super::*;
use http::HeaderValue;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use serde_json::json;

fn headers(authorization: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(authorization).unwrap(),
    );
    headers
}

fn profile_client(server: &MockServer) -> ProfileClient {
    let client = ClientBuilder::new(Client::new()).build();
    ProfileClient::new_with_client(client, server.base_url())
}

#[test]
fn test_bearer_token() {
    assert_eq!(bearer_token(&headers("Bearer 123ABC")).unwrap(), "123ABC");
    assert_eq!(bearer_token(&headers("bearer 123ABC")).unwrap(), "123ABC");

    assert!(matches!(
        bearer_token(&HeaderMap::new()),
        Err(AuthError::MissingBearerToken)
    ));
    assert!(matches!(
        bearer_token(&headers("Basic dXNlcjpwYXNz")),
        Err(AuthError::MissingBearerToken)
    ));
    assert!(matches!(
        bearer_token(&headers("Bearer ")),
        Err(AuthError::MissingBearerToken)
    ));
    assert!(matches!(
        bearer_token(&headers("Bear")),
        Err(AuthError::MissingBearerToken)
    ));
}

#[test]
fn test_new_normalizes_domain() {
    let client = ProfileClient::new("example.eu.auth0.com/");
    assert_eq!(client.base_url, "https://example.eu.auth0.com");

    let client = ProfileClient::new("http://localhost:9000");
    assert_eq!(client.base_url, "http://localhost:9000");
}

#[tokio::test]
async fn test_resolve_user() {
    let server = MockServer::start();
    let client = profile_client(&server);

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/userinfo")
            .header("authorization", "Bearer 123ABC");
        then.status(200).json_body(json!({
            "sub": "google-oauth2|1234567890",
            "name": "Alice",
            "email": "alice@example.com",
            "email_verified": true
        }));
    });

    let user_id = client.resolve_user(&headers("Bearer 123ABC")).await.unwrap();
    assert_eq!(user_id, "google-oauth2|1234567890");
    mock.assert();
}

#[tokio::test]
async fn test_get_profile_rejected_token() {
    let server = MockServer::start();
    let client = profile_client(&server);

    server.mock(|when, then| {
        when.method(GET).path("/userinfo");
        then.status(401).body("Unauthorized");
    });

    let err = client.get_profile("expired").await.unwrap_err();
    assert!(matches!(err, AuthError::Unauthorized(StatusCode::UNAUTHORIZED)));
}

#[tokio::test]
async fn test_resolve_user_without_header_skips_lookup() {
    let server = MockServer::start();
    let client = profile_client(&server);

    let mock = server.mock(|when, then| {
        when.method(GET).path("/userinfo");
        then.status(200).json_body(json!({ "sub": "x" }));
    });

    let err = client.resolve_user(&HeaderMap::new()).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingBearerToken));
    mock.assert_calls(0);
}
