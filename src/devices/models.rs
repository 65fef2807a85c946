use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::DeviceStoreError;

/// A device document as stored under `users/{userId}/devices/{deviceId}`.
///
/// Every field is optional: documents are written by hand or by other
/// clients, and absent fields must stay absent in what we return.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDocument {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nicknames: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<Map<String, Value>>,
}

/// Location of a device document: `users/{user_id}/devices/{device_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DevicePath {
    pub user_id: String,
    pub device_id: String,
}

impl DevicePath {
    pub fn new(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            device_id: device_id.into(),
        }
    }

    /// Builds a path from ids supplied by a caller, rejecting ids that are not
    /// a single Firestore document id.
    pub fn try_new(
        user_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Result<Self, DeviceStoreError> {
        let path = Self::new(user_id, device_id);
        path.validate()?;
        Ok(path)
    }

    /// Checks that both ids are valid document ids.
    pub fn validate(&self) -> Result<(), DeviceStoreError> {
        for id in [&self.user_id, &self.device_id] {
            if !is_valid_document_id(id) {
                return Err(DeviceStoreError::InvalidId(id.clone()));
            }
        }
        Ok(())
    }

    /// Parses a document path, accepting anything in front of the `users/`
    /// segment (a full resource name or a `documents/` prefix).
    ///
    /// Returns `None` for paths that are not exactly a device document.
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let tail = segments.len().checked_sub(4)?;
        match &segments[tail..] {
            ["users", user_id, "devices", device_id]
                if is_valid_document_id(user_id) && is_valid_document_id(device_id) =>
            {
                // The segment before `users` must not be a document id, or this
                // would be a nested sub-collection.
                if tail > 0 && segments[tail - 1] != "documents" {
                    return None;
                }
                Some(Self::new(*user_id, *device_id))
            }
            _ => None,
        }
    }
}

/// Whether `id` names exactly one document: non-empty, no `/`, not `.` or
/// `..`, and not of the reserved `__*__` form.
pub fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains('/')
        && !(id.len() >= 4 && id.starts_with("__") && id.ends_with("__"))
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "users/{}/devices/{}", self.user_id, self.device_id)
    }
}
