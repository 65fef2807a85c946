//! Smart Home intent fulfillment.
//!
//! Answers SYNC, QUERY and EXECUTE for the devices stored under the calling
//! user. The caller is identified by exchanging the request's bearer token
//! for an Auth0 subject id, which doubles as the Firestore user id and the
//! `agentUserId` reported to Google.

pub mod models;

#[cfg(test)]
mod tests;

use crate::auth::{AuthError, ProfileClient};
use crate::devices::{DevicePath, DeviceStore, DeviceStoreError};
use http::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use self::models::{
    CommandResult, ExecutePayload, ExecuteResponse, ExecuteResponsePayload, Execution,
    QueryPayload, QueryResponse, QueryResponsePayload, SmartHomeRequest, SmartHomeResponse,
    SyncDevice, SyncPayload, SyncResponse, EXECUTE_INTENT, ON_OFF_COMMAND, QUERY_INTENT,
    SYNC_INTENT,
};

#[derive(Error, Debug)]
pub enum SmartHomeError {
    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    DeviceStore(#[from] DeviceStoreError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Unsupported intent: {0}")]
    UnsupportedIntent(String),
    #[error("Invalid parameters for {command}: {reason}")]
    InvalidParams { command: String, reason: String },
}

impl SmartHomeError {
    /// Whether the caller's credentials were missing or rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            SmartHomeError::Auth(AuthError::MissingBearerToken | AuthError::Unauthorized(_))
        )
    }

    /// Whether the request itself was malformed.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            SmartHomeError::InvalidRequest(_)
                | SmartHomeError::UnsupportedIntent(_)
                | SmartHomeError::InvalidParams { .. }
                | SmartHomeError::DeviceStore(DeviceStoreError::InvalidId(_))
        )
    }
}

/// A decoded EXECUTE step.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    OnOff { on: bool },
    /// Recognized by Google but not implemented by these devices.
    Unsupported(String),
}

impl DeviceCommand {
    pub fn parse(execution: &Execution) -> Result<Self, SmartHomeError> {
        match execution.command.as_str() {
            ON_OFF_COMMAND => {
                let on = execution
                    .params
                    .get("on")
                    .and_then(Value::as_bool)
                    .ok_or_else(|| SmartHomeError::InvalidParams {
                        command: execution.command.clone(),
                        reason: "`on` must be a boolean".to_string(),
                    })?;
                Ok(DeviceCommand::OnOff { on })
            }
            other => Ok(DeviceCommand::Unsupported(other.to_string())),
        }
    }
}

/// The fulfillment handlers. Holds no per-request state.
#[derive(Clone)]
pub struct SmartHomeApp {
    devices: DeviceStore,
    profiles: ProfileClient,
}

impl SmartHomeApp {
    pub fn new(devices: DeviceStore, profiles: ProfileClient) -> Self {
        Self { devices, profiles }
    }

    /// Dispatches on the intent of the first input.
    pub async fn handle(
        &self,
        request: &SmartHomeRequest,
        headers: &HeaderMap,
    ) -> Result<SmartHomeResponse, SmartHomeError> {
        let intent = request
            .inputs
            .first()
            .map(|input| input.intent.as_str())
            .ok_or_else(|| SmartHomeError::InvalidRequest("request has no inputs".to_string()))?;

        debug!(request_id = %request.request_id, intent, "fulfilling intent");

        match intent {
            SYNC_INTENT => Ok(SmartHomeResponse::Sync(self.on_sync(request, headers).await?)),
            QUERY_INTENT => Ok(SmartHomeResponse::Query(self.on_query(request, headers).await?)),
            EXECUTE_INTENT => Ok(SmartHomeResponse::Execute(
                self.on_execute(request, headers).await?,
            )),
            other => Err(SmartHomeError::UnsupportedIntent(other.to_string())),
        }
    }

    /// Lists the caller's devices. Users without an account document get `{}`.
    pub async fn on_sync(
        &self,
        request: &SmartHomeRequest,
        headers: &HeaderMap,
    ) -> Result<SyncResponse, SmartHomeError> {
        let user_id = self.profiles.resolve_user(headers).await?;

        if !self.devices.user_exists(&user_id).await? {
            error!(user_id = %user_id, "user has not created an account, so there are no devices");
            return Ok(SyncResponse::empty());
        }

        let devices: Vec<SyncDevice> = self
            .devices
            .list_devices(&user_id)
            .await?
            .into_iter()
            .map(|(id, doc)| SyncDevice::from_document(id, doc))
            .collect();

        info!(user_id = %user_id, devices = devices.len(), "synced devices");

        Ok(SyncResponse {
            request_id: Some(request.request_id.clone()),
            payload: Some(SyncPayload {
                agent_user_id: user_id,
                devices,
            }),
        })
    }

    /// Reports the `states` of every requested device.
    pub async fn on_query(
        &self,
        request: &SmartHomeRequest,
        headers: &HeaderMap,
    ) -> Result<QueryResponse, SmartHomeError> {
        let user_id = self.profiles.resolve_user(headers).await?;
        let mut payload = QueryResponsePayload::default();

        for input in &request.inputs {
            let query: QueryPayload = decode_payload(&input.payload)?;
            for device in query.devices {
                let path = DevicePath::try_new(user_id.as_str(), device.id.as_str())?;
                if let Some(states) = self.devices.device_states(&path).await? {
                    payload.devices.insert(device.id, states);
                }
            }
        }

        Ok(QueryResponse {
            request_id: request.request_id.clone(),
            payload,
        })
    }

    /// Applies commands to devices.
    ///
    /// Every targeted device is reported as a success, including devices that
    /// only received commands we do not implement.
    pub async fn on_execute(
        &self,
        request: &SmartHomeRequest,
        headers: &HeaderMap,
    ) -> Result<ExecuteResponse, SmartHomeError> {
        let user_id = self.profiles.resolve_user(headers).await?;
        let mut result = CommandResult::success();

        for input in &request.inputs {
            let execute: ExecutePayload = decode_payload(&input.payload)?;
            for command in &execute.commands {
                let steps = command
                    .execution
                    .iter()
                    .map(DeviceCommand::parse)
                    .collect::<Result<Vec<_>, _>>()?;

                for device in &command.devices {
                    let path = DevicePath::try_new(user_id.as_str(), device.id.as_str())?;
                    result.ids.push(device.id.clone());

                    for step in &steps {
                        match step {
                            DeviceCommand::OnOff { on } => {
                                self.devices.set_state(&path, "on", Value::Bool(*on)).await?;
                                result.states.on = Some(*on);
                                info!(device = %path, on = *on, "applied OnOff");
                            }
                            DeviceCommand::Unsupported(name) => {
                                debug!(
                                    device = %path,
                                    command = %name,
                                    "ignoring unsupported command"
                                );
                            }
                        }
                    }
                }
            }
        }

        Ok(ExecuteResponse {
            request_id: request.request_id.clone(),
            payload: ExecuteResponsePayload {
                commands: vec![result],
            },
        })
    }
}

fn decode_payload<T: DeserializeOwned + Default>(payload: &Value) -> Result<T, SmartHomeError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload.clone())
        .map_err(|e| SmartHomeError::InvalidRequest(format!("malformed payload: {}", e)))
}
