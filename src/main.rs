use std::net::SocketAddr;

use anyhow::Context;
use gizmo_home::auth::ProfileClient;
use gizmo_home::config::ServiceConfig;
use gizmo_home::devices::DeviceStore;
use gizmo_home::firestore::FirebaseFirestore;
use gizmo_home::routes::{build_router, AppState};
use gizmo_home::smarthome::SmartHomeApp;
use gizmo_home::triggers::DeviceTriggers;
use gizmo_home::FirebaseApp;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut key = yup_oauth2::read_service_account_key(&config.service_account_path)
        .await
        .with_context(|| {
            format!(
                "failed to read service account key {}",
                config.service_account_path
            )
        })?;
    if let Some(project_id) = &config.project_id {
        key.project_id = Some(project_id.clone());
    }
    let app = FirebaseApp::new(key);
    let project_id = app
        .project_id()
        .context("no project id in configuration or service account key")?
        .to_string();

    let firestore = match &config.firestore_emulator_host {
        Some(host) => {
            info!(host = %host, "using Firestore emulator");
            FirebaseFirestore::emulator(host, &project_id)
        }
        None => app.firestore(),
    };
    let devices = DeviceStore::new(firestore);
    let home_graph = app.home_graph().with_base_url(config.home_graph_url.as_str());

    let state = AppState {
        smarthome: SmartHomeApp::new(devices.clone(), ProfileClient::new(&config.auth0_domain)),
        triggers: DeviceTriggers::new(devices, home_graph),
    };

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", config.listen_addr))?;

    info!(addr = %addr, project_id = %project_id, "starting gizmo-home");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
