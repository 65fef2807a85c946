use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::devices::DeviceDocument;

pub const SYNC_INTENT: &str = "action.devices.SYNC";
pub const QUERY_INTENT: &str = "action.devices.QUERY";
pub const EXECUTE_INTENT: &str = "action.devices.EXECUTE";

pub const ON_OFF_COMMAND: &str = "action.devices.commands.OnOff";

/// A Smart Home intent request as posted by Google.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SmartHomeRequest {
    pub request_id: String,
    #[serde(default)]
    pub inputs: Vec<RawInput>,
}

/// One input block; `payload` is decoded once the intent is known.
#[derive(Deserialize, Debug, Clone)]
pub struct RawInput {
    pub intent: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct QueryPayload {
    #[serde(default)]
    pub devices: Vec<DeviceRef>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ExecutePayload {
    #[serde(default)]
    pub commands: Vec<Command>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRef {
    pub id: String,
    pub custom_data: Option<Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Command {
    #[serde(default)]
    pub devices: Vec<DeviceRef>,
    #[serde(default)]
    pub execution: Vec<Execution>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Execution {
    pub command: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Response to SYNC. Both fields are absent for users without an account,
/// which serializes to `{}`.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<SyncPayload>,
}

impl SyncResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncPayload {
    pub agent_user_id: String,
    pub devices: Vec<SyncDevice>,
}

/// Device descriptor in a SYNC response.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncDevice {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<String>>,
    pub name: DeviceName,
    pub device_info: DeviceInfo,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nicknames: Option<Vec<String>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
}

impl SyncDevice {
    pub fn from_document(id: String, doc: DeviceDocument) -> Self {
        Self {
            id,
            device_type: doc.device_type,
            traits: doc.traits,
            name: DeviceName {
                default_names: doc.default_names,
                name: doc.name,
                nicknames: doc.nicknames,
            },
            device_info: DeviceInfo {
                manufacturer: doc.manufacturer,
                model: doc.model,
                hw_version: doc.hw_version,
                sw_version: doc.sw_version,
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub request_id: String,
    pub payload: QueryResponsePayload,
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct QueryResponsePayload {
    /// Device id to its `states` object.
    pub devices: Map<String, Value>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub request_id: String,
    pub payload: ExecuteResponsePayload,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ExecuteResponsePayload {
    pub commands: Vec<CommandResult>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Success,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub ids: Vec<String>,
    pub status: CommandStatus,
    pub states: CommandStates,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CommandStates {
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            ids: Vec::new(),
            status: CommandStatus::Success,
            states: CommandStates {
                online: true,
                on: None,
            },
        }
    }
}

/// A fulfillment response for any intent.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SmartHomeResponse {
    Sync(SyncResponse),
    Query(QueryResponse),
    Execute(ExecuteResponse),
}
