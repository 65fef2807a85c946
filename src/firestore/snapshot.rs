use super::models::{Document, Value, ValueType};
use super::reference::convert_value_to_serde_value;
use super::FirestoreError;
use serde::de::DeserializeOwned;

/// A snapshot of a document in Firestore.
///
/// It contains data read from a document in your Firestore database.
/// Fields are read with `.get_field()`.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub(crate) document: Option<Document>,
}

impl DocumentSnapshot {
    /// Returns `true` if the document exists.
    pub fn exists(&self) -> bool {
        self.document.is_some()
    }

    /// Retrieves a specific field from the document.
    ///
    /// Returns `Ok(None)` if the document or the field does not exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The dot-separated path to the field (e.g., "states.on").
    pub fn get_field<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, FirestoreError> {
        let Some(doc) = &self.document else {
            return Ok(None);
        };

        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Ok(None);
        };

        let mut current: Option<&Value> = doc.fields.get(first);
        for segment in segments {
            current = match current.map(|v| &v.value_type) {
                Some(ValueType::MapValue(map)) => map.fields.get(segment),
                _ => None,
            };
        }

        match current {
            Some(value) => {
                let serde_value = convert_value_to_serde_value(value.clone())?;
                Ok(Some(serde_json::from_value(serde_value)?))
            }
            None => Ok(None),
        }
    }
}
