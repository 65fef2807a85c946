use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestSyncRequest {
    pub agent_user_id: String,
    /// When false, Home Graph waits for the SYNC round trip before answering.
    #[serde(rename = "async")]
    pub is_async: bool,
}

/// Body of `devices:reportStateAndNotification`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportStateRequest {
    pub request_id: String,
    pub agent_user_id: String,
    pub payload: StatePayload,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct StatePayload {
    pub devices: ReportedDevices,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct ReportedDevices {
    /// Device id to its full state object.
    pub states: Map<String, Value>,
}

impl ReportStateRequest {
    /// Reports the state of a single device.
    pub fn single(
        request_id: impl Into<String>,
        agent_user_id: impl Into<String>,
        device_id: impl Into<String>,
        states: Value,
    ) -> Self {
        let mut reported = Map::new();
        reported.insert(device_id.into(), states);
        Self {
            request_id: request_id.into(),
            agent_user_id: agent_user_id.into(),
            payload: StatePayload {
                devices: ReportedDevices { states: reported },
            },
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportStateResponse {
    pub request_id: Option<String>,
}
