//! Cloud Firestore module.
//!
//! A small REST client for the parts of Cloud Firestore the device store
//! needs: reading documents, listing collections, field-masked updates and
//! real-time listeners.
//!
//! It mirrors the server SDKs' structure using `CollectionReference` and
//! `DocumentReference`.

pub mod listen;
pub mod models;
pub mod reference;
pub mod snapshot;


use self::reference::{split_path, CollectionReference, DocumentReference};
use crate::core::middleware::AuthMiddleware;
use crate::core::{anonymous_client, authorized_client};
use reqwest_middleware::ClientWithMiddleware;
use thiserror::Error;

const FIRESTORE_V1_API: &str =
    "https://firestore.googleapis.com/v1/projects/{project_id}/databases/(default)/documents";

/// Errors that can occur during Firestore operations.
#[derive(Error, Debug)]
pub enum FirestoreError {
    /// Wrapper for `reqwest::Error`.
    #[error("HTTP Request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// Wrapper for `reqwest_middleware::Error`.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    /// Errors returned by the Firestore API.
    #[error("API error: {0}")]
    ApiError(String),
    /// A write required an existing document.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// Wrapper for `serde_json::Error`.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    /// The document path could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

/// Client for interacting with Cloud Firestore.
#[derive(Clone)]
pub struct FirebaseFirestore {
    client: ClientWithMiddleware,
    base_url: String,
}

impl FirebaseFirestore {
    /// Creates a new `FirebaseFirestore` instance for the service account's project.
    ///
    /// This is typically called via `FirebaseApp::firestore()`.
    pub fn new(middleware: AuthMiddleware) -> Self {
        let project_id = middleware.project_id().unwrap_or_default().to_string();
        let base_url = FIRESTORE_V1_API.replace("{project_id}", &project_id);

        Self {
            client: authorized_client(middleware),
            base_url,
        }
    }

    /// Creates a client for the Firestore emulator at `host` (e.g. `localhost:8080`).
    ///
    /// The emulator accepts unauthenticated requests.
    pub fn emulator(host: &str, project_id: &str) -> Self {
        let base_url = format!(
            "http://{}/v1/projects/{}/databases/(default)/documents",
            host, project_id
        );
        Self::new_with_client(anonymous_client(), base_url)
    }

    /// Creates a new `FirebaseFirestore` instance with a custom client and base URL
    /// (useful for testing).
    pub fn new_with_client(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Gets a `CollectionReference` instance that refers to the collection at the specified path.
    ///
    /// # Arguments
    ///
    /// * `collection_path` - The slash-separated path of the collection (e.g., "users").
    pub fn collection(&self, collection_path: &str) -> CollectionReference<'_> {
        CollectionReference {
            client: &self.client,
            base_url: &self.base_url,
            segments: split_path(collection_path),
        }
    }

    /// Gets a `DocumentReference` instance that refers to the document at the specified path.
    ///
    /// # Arguments
    ///
    /// * `document_path` - The slash-separated path to the document (e.g., "users/user1").
    pub fn doc(&self, document_path: &str) -> DocumentReference<'_> {
        DocumentReference {
            client: &self.client,
            base_url: &self.base_url,
            segments: split_path(document_path),
        }
    }
}
