use crate::devices::DevicePath;
use http::HeaderMap;

use super::TriggerError;

pub const CREATED_EVENT: &str = "google.cloud.firestore.document.v1.created";
pub const UPDATED_EVENT: &str = "google.cloud.firestore.document.v1.updated";
pub const DELETED_EVENT: &str = "google.cloud.firestore.document.v1.deleted";

const CE_ID: &str = "ce-id";
const CE_TYPE: &str = "ce-type";
const CE_SUBJECT: &str = "ce-subject";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEventKind {
    Created,
    Updated,
    Deleted,
}

impl DeviceEventKind {
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            CREATED_EVENT => Some(DeviceEventKind::Created),
            UPDATED_EVENT => Some(DeviceEventKind::Updated),
            DELETED_EVENT => Some(DeviceEventKind::Deleted),
            _ => None,
        }
    }
}

/// A change to one device document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    /// CloudEvent id, used only for logging.
    pub id: Option<String>,
    pub kind: DeviceEventKind,
    pub path: DevicePath,
}

impl DeviceEvent {
    /// Decodes a binary-mode CloudEvent from its `ce-*` headers.
    ///
    /// Returns `Ok(None)` for events we do not react to: other Firestore event
    /// types, or documents outside `users/*/devices/*`.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, TriggerError> {
        let event_type = required_header(headers, CE_TYPE)?;
        let subject = required_header(headers, CE_SUBJECT)?;

        let Some(kind) = DeviceEventKind::from_event_type(event_type) else {
            return Ok(None);
        };
        let Some(path) = DevicePath::parse(subject) else {
            return Ok(None);
        };

        Ok(Some(Self {
            id: header_str(headers, CE_ID).map(str::to_string),
            kind,
            path,
        }))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn required_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, TriggerError> {
    header_str(headers, name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TriggerError::InvalidEvent(format!("missing `{}` header", name)))
}
