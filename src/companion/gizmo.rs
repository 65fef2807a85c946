use crate::devices::DeviceDocument;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Connectivity flag reported by the device, not something the user flips.
const ONLINE_STATE: &str = "online";

/// A device as the companion app presents it.
#[derive(Debug, Clone, PartialEq)]
pub struct Gizmo {
    pub id: String,
    pub display_name: String,
    pub device_type: Option<String>,
    pub toggles: Vec<Toggle>,
}

/// A boolean state of a gizmo the user can flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toggle {
    pub id: String,
    pub display_name: String,
    pub on: bool,
}

/// Request to set one toggle of a gizmo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleCommand {
    pub user_id: String,
    pub gizmo_id: String,
    pub toggle_id: String,
    pub on: bool,
    pub timestamp: DateTime<Utc>,
}

impl Gizmo {
    /// Builds a gizmo from its device document.
    ///
    /// The display name falls back from the given name to the first default
    /// name to the id. Every boolean entry of `states` except `online`
    /// becomes a toggle.
    pub fn from_document(id: impl Into<String>, doc: &DeviceDocument) -> Self {
        let id = id.into();
        let display_name = doc
            .name
            .clone()
            .or_else(|| doc.default_names.as_ref().and_then(|n| n.first().cloned()))
            .unwrap_or_else(|| id.clone());

        let mut toggles: Vec<Toggle> = doc
            .states
            .iter()
            .flatten()
            .filter(|(key, _)| key.as_str() != ONLINE_STATE)
            .filter_map(|(key, value)| match value {
                Value::Bool(on) => Some(Toggle {
                    id: key.clone(),
                    display_name: key.clone(),
                    on: *on,
                }),
                _ => None,
            })
            .collect();
        toggles.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            id,
            display_name,
            device_type: doc.device_type.clone(),
            toggles,
        }
    }
}

impl Toggle {
    /// One-line description, e.g. `on is ON`.
    pub fn summary(&self) -> String {
        format!("{} is {}", self.display_name, if self.on { "ON" } else { "OFF" })
    }
}
