//! Propagates device document changes to Google.
//!
//! Created and deleted devices change what SYNC returns, so Home Graph is
//! asked to re-sync the owner. Updated devices have their current `states`
//! reported.

pub mod models;


use crate::devices::{DevicePath, DeviceStore, DeviceStoreError};
use crate::homegraph::models::ReportStateRequest;
use crate::homegraph::{HomeGraph, HomeGraphError};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use self::models::{DeviceEvent, DeviceEventKind};

#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
    #[error(transparent)]
    DeviceStore(#[from] DeviceStoreError),
    #[error("Home Graph error: {0}")]
    HomeGraph(#[from] HomeGraphError),
}

impl TriggerError {
    pub fn is_bad_request(&self) -> bool {
        matches!(self, TriggerError::InvalidEvent(_))
    }
}

#[derive(Clone)]
pub struct DeviceTriggers {
    devices: DeviceStore,
    home_graph: HomeGraph,
}

impl DeviceTriggers {
    pub fn new(devices: DeviceStore, home_graph: HomeGraph) -> Self {
        Self {
            devices,
            home_graph,
        }
    }

    pub async fn dispatch(&self, event: &DeviceEvent) -> Result<(), TriggerError> {
        debug!(
            event_id = ?event.id,
            kind = ?event.kind,
            device = %event.path,
            "dispatching device event"
        );

        match event.kind {
            DeviceEventKind::Created => self.on_device_create(&event.path).await,
            DeviceEventKind::Deleted => self.on_device_delete(&event.path).await,
            DeviceEventKind::Updated => self.on_device_state_update(&event.path).await,
        }
    }

    pub async fn on_device_create(&self, path: &DevicePath) -> Result<(), TriggerError> {
        self.home_graph.request_sync(&path.user_id).await?;
        info!(
            user_id = %path.user_id,
            device_id = %path.device_id,
            "requested sync for new device"
        );
        Ok(())
    }

    pub async fn on_device_delete(&self, path: &DevicePath) -> Result<(), TriggerError> {
        self.home_graph.request_sync(&path.user_id).await?;
        info!(
            user_id = %path.user_id,
            device_id = %path.device_id,
            "requested sync for deleted device"
        );
        Ok(())
    }

    /// Reports the device's current states, as re-read from Firestore.
    pub async fn on_device_state_update(&self, path: &DevicePath) -> Result<(), TriggerError> {
        let states = match self.devices.device_states(path).await {
            Ok(Some(states)) => states,
            Ok(None) => {
                debug!(device = %path, "device has no states to report");
                return Ok(());
            }
            Err(DeviceStoreError::DeviceNotFound(_)) => {
                warn!(device = %path, "device disappeared before its state could be reported");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let request = report_state_request(path, states);
        let echoed = self.home_graph.report_state(&request).await?;
        info!(
            device = %path,
            request_id = %request.request_id,
            echoed = ?echoed,
            "reported device state"
        );
        Ok(())
    }
}

fn report_state_request(path: &DevicePath, states: Value) -> ReportStateRequest {
    ReportStateRequest::single(
        Uuid::new_v4().to_string(),
        path.user_id.as_str(),
        path.device_id.as_str(),
        states,
    )
}
