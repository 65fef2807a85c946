use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::homegraph::HOME_GRAPH_V1_API;

const ENV_PREFIX: &str = "SMARTHOME";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error) or a full `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Address the HTTP server binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to the service account JSON key
    #[serde(default = "default_service_account_path")]
    pub service_account_path: String,

    /// Auth0 tenant domain that issued the account-linking tokens
    pub auth0_domain: String,

    /// Firebase project; defaults to the service account's project
    #[serde(default)]
    pub project_id: Option<String>,

    /// `host:port` of a Firestore emulator to use instead of Cloud Firestore
    #[serde(default)]
    pub firestore_emulator_host: Option<String>,

    /// Home Graph API base URL
    #[serde(default = "default_home_graph_url")]
    pub home_graph_url: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_service_account_path() -> String {
    "service-account.json".to_string()
}

fn default_home_graph_url() -> String {
    HOME_GRAPH_V1_API.to_string()
}

impl ServiceConfig {
    /// Reads `SMARTHOME_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(None)
    }

    /// Same as [`ServiceConfig::from_env`], reading from `vars` instead of the
    /// process environment when given.
    pub fn from_source(vars: Option<config::Map<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).source(vars))
            .build()?
            .try_deserialize()
    }
}
