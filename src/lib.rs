pub mod auth;
pub mod companion;
pub mod config;
pub mod core;
pub mod devices;
pub mod firestore;
pub mod homegraph;
pub mod routes;
pub mod smarthome;
pub mod triggers;

use crate::core::middleware::{AuthMiddleware, FIRESTORE_SCOPES, HOME_GRAPH_SCOPES};
use firestore::FirebaseFirestore;
use homegraph::HomeGraph;
use yup_oauth2::ServiceAccountKey;

pub use yup_oauth2;

/// Entry point for the Google services a service account can reach.
pub struct FirebaseApp {
    key: ServiceAccountKey,
}

impl FirebaseApp {
    pub fn new(service_account_key: ServiceAccountKey) -> Self {
        Self {
            key: service_account_key,
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        self.key.project_id.as_deref()
    }

    pub fn firestore(&self) -> FirebaseFirestore {
        FirebaseFirestore::new(AuthMiddleware::new(self.key.clone(), FIRESTORE_SCOPES))
    }

    pub fn home_graph(&self) -> HomeGraph {
        HomeGraph::new(AuthMiddleware::new(self.key.clone(), HOME_GRAPH_SCOPES))
    }
}
