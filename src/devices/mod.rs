//! Typed access to the per-user device collections.
//!
//! Layout: `users/{userId}` exists once the user has an account, and each of
//! their devices lives at `users/{userId}/devices/{deviceId}`. Nothing else in
//! the crate builds these paths by hand.

pub mod models;

#[cfg(test)]
mod tests;

use crate::firestore::listen::ListenStream;
use crate::firestore::models::{ListenResponse, TargetChangeType};
use crate::firestore::reference::DocumentReference;
use crate::firestore::{FirebaseFirestore, FirestoreError};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub use self::models::{is_valid_document_id, DeviceDocument, DevicePath};

const USERS: &str = "users";
const DEVICES: &str = "devices";

/// Pause before re-opening a listen stream the server closed.
const RECONNECT_DELAY: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum DeviceStoreError {
    #[error("Firestore error: {0}")]
    Firestore(#[from] FirestoreError),
    #[error("Device not found: {0}")]
    DeviceNotFound(DevicePath),
    #[error("Invalid document id: {0:?}")]
    InvalidId(String),
}

/// Reads and writes device documents through a shared Firestore handle.
#[derive(Clone)]
pub struct DeviceStore {
    firestore: FirebaseFirestore,
}

impl DeviceStore {
    pub fn new(firestore: FirebaseFirestore) -> Self {
        Self { firestore }
    }

    /// Whether `users/{user_id}` exists, i.e. the user has created an account.
    pub async fn user_exists(&self, user_id: &str) -> Result<bool, DeviceStoreError> {
        if !is_valid_document_id(user_id) {
            return Err(DeviceStoreError::InvalidId(user_id.to_string()));
        }
        let snapshot = self
            .firestore
            .collection(USERS)
            .doc(user_id)
            .get_snapshot()
            .await?;
        Ok(snapshot.exists())
    }

    /// Lists all of a user's devices as `(device_id, document)` pairs.
    pub async fn list_devices(
        &self,
        user_id: &str,
    ) -> Result<Vec<(String, DeviceDocument)>, DeviceStoreError> {
        if !is_valid_document_id(user_id) {
            return Err(DeviceStoreError::InvalidId(user_id.to_string()));
        }
        let documents = self
            .firestore
            .collection(USERS)
            .doc(user_id)
            .collection(DEVICES)
            .list_all_documents()
            .await?;

        documents
            .iter()
            .map(|doc| Ok((doc.id().to_string(), doc.data::<DeviceDocument>()?)))
            .collect()
    }

    /// Reads the `states` field of a device.
    ///
    /// A missing document is an error; a document without `states` is `Ok(None)`.
    pub async fn device_states(
        &self,
        path: &DevicePath,
    ) -> Result<Option<Value>, DeviceStoreError> {
        let snapshot = device_ref(&self.firestore, path)?.get_snapshot().await?;
        if !snapshot.exists() {
            return Err(DeviceStoreError::DeviceNotFound(path.clone()));
        }
        Ok(snapshot.get_field("states")?)
    }

    /// Sets `states.<key>` on an existing device, leaving other states untouched.
    pub async fn set_state(
        &self,
        path: &DevicePath,
        key: &str,
        value: Value,
    ) -> Result<(), DeviceStoreError> {
        let mut states = serde_json::Map::new();
        states.insert(key.to_string(), value);
        let update = serde_json::json!({ "states": states });
        let mask = vec![format!("states.{}", field_path_segment(key))];

        match device_ref(&self.firestore, path)?
            .update(&update, Some(mask))
            .await
        {
            Err(FirestoreError::NotFound(_)) => Err(DeviceStoreError::DeviceNotFound(path.clone())),
            other => Ok(other?),
        }
    }

    /// Streams the device document: `Some` for every new version, `None` when
    /// it does not exist or is deleted.
    ///
    /// Listen streams the server closes are re-opened from the last resume
    /// token, so the stream only ends after yielding an error.
    pub fn observe(
        &self,
        path: &DevicePath,
    ) -> BoxStream<'static, Result<Option<DeviceDocument>, DeviceStoreError>> {
        if let Err(e) = path.validate() {
            return stream::once(async move { Err(e) }).boxed();
        }

        let state = ObserveState::Opening {
            observation: Observation {
                firestore: self.firestore.clone(),
                path: path.clone(),
                resume_token: None,
                seen: false,
            },
            reconnect: false,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                match state {
                    ObserveState::Opening {
                        observation,
                        reconnect,
                    } => {
                        if reconnect {
                            debug!(device = %observation.path, "listen stream closed, re-opening");
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        }
                        let opened = observation.open().await;
                        match opened {
                            Ok(listen) => state = ObserveState::Listening { observation, listen },
                            Err(e) => return Some((Err(e), ObserveState::Done)),
                        }
                    }
                    ObserveState::Listening {
                        mut observation,
                        mut listen,
                    } => match listen.next().await {
                        None => {
                            state = ObserveState::Opening {
                                observation,
                                reconnect: true,
                            }
                        }
                        Some(Err(e)) => return Some((Err(e.into()), ObserveState::Done)),
                        Some(Ok(message)) => {
                            let event = observation.interpret(message);
                            let next = ObserveState::Listening { observation, listen };
                            match event {
                                Some(event) => return Some((event, next)),
                                None => state = next,
                            }
                        }
                    },
                    ObserveState::Done => return None,
                }
            }
        })
        .boxed()
    }
}

/// The document reference of a device, built segment by segment.
fn device_ref<'a>(
    firestore: &'a FirebaseFirestore,
    path: &DevicePath,
) -> Result<DocumentReference<'a>, DeviceStoreError> {
    path.validate()?;
    Ok(firestore
        .collection(USERS)
        .doc(&path.user_id)
        .collection(DEVICES)
        .doc(&path.device_id))
}

/// A device listener that survives reconnects.
struct Observation {
    firestore: FirebaseFirestore,
    path: DevicePath,
    resume_token: Option<String>,
    /// Whether any state of the document has been reported yet.
    seen: bool,
}

impl Observation {
    async fn open(&self) -> Result<ListenStream, DeviceStoreError> {
        Ok(device_ref(&self.firestore, &self.path)?
            .listen(self.resume_token.clone())
            .await?)
    }

    fn interpret(
        &mut self,
        message: ListenResponse,
    ) -> Option<Result<Option<DeviceDocument>, DeviceStoreError>> {
        if let Some(token) = message
            .target_change
            .as_ref()
            .and_then(|c| c.resume_token.clone())
        {
            self.resume_token = Some(token);
        }
        interpret(message, &mut self.seen)
    }
}

enum ObserveState {
    Opening {
        observation: Observation,
        reconnect: bool,
    },
    Listening {
        observation: Observation,
        listen: ListenStream,
    },
    Done,
}

/// Maps one listen message to a device event, if it carries one.
///
/// A target that turns CURRENT before any document arrived means the document
/// does not exist.
fn interpret(
    message: ListenResponse,
    seen: &mut bool,
) -> Option<Result<Option<DeviceDocument>, DeviceStoreError>> {
    if let Some(change) = message.document_change {
        *seen = true;
        return Some(change.document.data().map(Some).map_err(Into::into));
    }
    if message.document_delete.is_some() || message.document_remove.is_some() {
        *seen = true;
        return Some(Ok(None));
    }
    match message.target_change.and_then(|c| c.target_change_type) {
        Some(TargetChangeType::Current) if !*seen => {
            *seen = true;
            Some(Ok(None))
        }
        _ => None,
    }
}

/// Quotes a field name for use in a field path when it is not a plain identifier.
fn field_path_segment(key: &str) -> String {
    let simple = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        key.to_string()
    } else {
        format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
    }
}
