use crate::devices::{DevicePath, DeviceStore, DeviceStoreError};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::gizmo::{Gizmo, ToggleCommand};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    DeviceStore(#[from] DeviceStoreError),
}

/// Where the companion reads gizmos from and sends toggle commands to.
#[async_trait]
pub trait GizmoRepository: Send + Sync {
    /// Streams the gizmo; `None` while it does not exist.
    fn observe_gizmo(
        &self,
        user_id: &str,
        gizmo_id: &str,
    ) -> BoxStream<'static, Result<Option<Gizmo>, RepositoryError>>;

    async fn send_toggle_command(&self, command: &ToggleCommand) -> Result<(), RepositoryError>;
}

/// Reads and writes gizmos as device documents.
#[derive(Clone)]
pub struct FirestoreGizmoRepository {
    devices: DeviceStore,
}

impl FirestoreGizmoRepository {
    pub fn new(devices: DeviceStore) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl GizmoRepository for FirestoreGizmoRepository {
    fn observe_gizmo(
        &self,
        user_id: &str,
        gizmo_id: &str,
    ) -> BoxStream<'static, Result<Option<Gizmo>, RepositoryError>> {
        let id = gizmo_id.to_string();
        self.devices
            .observe(&DevicePath::new(user_id, gizmo_id))
            .map(move |item| {
                item.map(|doc| doc.map(|doc| Gizmo::from_document(id.as_str(), &doc)))
                    .map_err(RepositoryError::from)
            })
            .boxed()
    }

    async fn send_toggle_command(&self, command: &ToggleCommand) -> Result<(), RepositoryError> {
        let path = DevicePath::try_new(command.user_id.as_str(), command.gizmo_id.as_str())?;
        self.devices
            .set_state(&path, &command.toggle_id, Value::Bool(command.on))
            .await?;
        debug!(
            device = %path,
            toggle = %command.toggle_id,
            on = command.on,
            issued_at = %command.timestamp,
            "sent toggle command"
        );
        Ok(())
    }
}
