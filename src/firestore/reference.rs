use super::listen::{listen_request, ListenStream};
use super::models::{
    ArrayValue, Document, DocumentsTarget, ListDocumentsResponse, ListenRequest, MapValue, Target,
    Value, ValueType,
};
use super::snapshot::DocumentSnapshot;
use super::FirestoreError;
use crate::core::parse_error_response;
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::Error;
use serde::ser::Error as SerError;
use serde::Serialize;
use serde_json::map::Map;
use serde_json::Value as SerdeValue;
use std::collections::HashMap;
use url::Url;

const LISTEN_TARGET_ID: i32 = 1;

// Helper to convert Firestore's value map to a standard serde_json::Value
pub(crate) fn convert_fields_to_serde_value(
    fields: HashMap<String, Value>,
) -> Result<SerdeValue, FirestoreError> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key, convert_value_to_serde_value(value)?);
    }
    Ok(SerdeValue::Object(map))
}

pub(crate) fn convert_value_to_serde_value(value: Value) -> Result<SerdeValue, FirestoreError> {
    use serde_json::json;
    Ok(match value.value_type {
        ValueType::StringValue(s) => SerdeValue::String(s),
        ValueType::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|e| {
                <serde_json::Error as Error>::custom(format!(
                    "Failed to parse integer string '{}': {}",
                    s, e
                ))
            })?;
            SerdeValue::Number(i.into())
        }
        ValueType::DoubleValue(d) => SerdeValue::Number(
            serde_json::Number::from_f64(d).ok_or_else(|| {
                <serde_json::Error as Error>::custom(format!("Invalid f64 value: {}", d))
            })?,
        ),
        ValueType::BooleanValue(b) => SerdeValue::Bool(b),
        ValueType::MapValue(map_value) => convert_fields_to_serde_value(map_value.fields)?,
        ValueType::ArrayValue(array_value) => {
            let values = array_value
                .values
                .into_iter()
                .map(convert_value_to_serde_value)
                .collect::<Result<Vec<_>, _>>()?;
            SerdeValue::Array(values)
        }
        ValueType::NullValue(_) => SerdeValue::Null,
        ValueType::TimestampValue(s) => SerdeValue::String(s),
        ValueType::GeoPointValue(gp) => {
            json!({ "latitude": gp.latitude, "longitude": gp.longitude })
        }
        ValueType::BytesValue(s) => SerdeValue::String(s),
        ValueType::ReferenceValue(s) => SerdeValue::String(s),
    })
}

// Helper to convert a serializable Rust struct to Firestore's value map
pub(crate) fn convert_serializable_to_fields<T: Serialize>(
    value: &T,
) -> Result<HashMap<String, Value>, FirestoreError> {
    let serde_value = serde_json::to_value(value)?;
    if let SerdeValue::Object(map) = serde_value {
        let mut fields = HashMap::new();
        for (k, v) in map {
            fields.insert(k, convert_serde_value_to_firestore_value(v)?);
        }
        Ok(fields)
    } else {
        Err(FirestoreError::SerializationError(SerError::custom(
            "Can only write objects as documents",
        )))
    }
}

pub(crate) fn convert_serde_value_to_firestore_value(
    value: SerdeValue,
) -> Result<Value, FirestoreError> {
    let value_type = match value {
        SerdeValue::Null => ValueType::NullValue(()),
        SerdeValue::Bool(b) => ValueType::BooleanValue(b),
        SerdeValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                ValueType::IntegerValue(i.to_string())
            } else if let Some(f) = n.as_f64() {
                ValueType::DoubleValue(f)
            } else {
                return Err(FirestoreError::SerializationError(SerError::custom(
                    format!("Unsupported number type: {}", n),
                )));
            }
        }
        SerdeValue::String(s) => ValueType::StringValue(s),
        SerdeValue::Array(a) => {
            let values = a
                .into_iter()
                .map(convert_serde_value_to_firestore_value)
                .collect::<Result<Vec<_>, _>>()?;
            ValueType::ArrayValue(ArrayValue { values })
        }
        SerdeValue::Object(o) => {
            let mut fields = HashMap::new();
            for (k, v) in o {
                fields.insert(k, convert_serde_value_to_firestore_value(v)?);
            }
            ValueType::MapValue(MapValue { fields })
        }
    };
    Ok(Value { value_type })
}

/// Returns the `projects/{p}/databases/{d}/documents` part of a REST URL.
pub(crate) fn resource_name(base_url: &str) -> &str {
    base_url.find("projects/").map(|i| &base_url[i..]).unwrap_or(base_url)
}

/// Returns the database URL (everything before `/documents`).
pub(crate) fn database_url(base_url: &str) -> &str {
    base_url.rfind("/documents").map(|i| &base_url[..i]).unwrap_or(base_url)
}

/// Appends `segments` to the documents root, percent-encoding each one.
///
/// Segments are never interpreted as path syntax: `/`, `?` and `#` are
/// escaped and `.` / `..` are dropped, so a document id cannot address a
/// document outside its collection.
pub(crate) fn document_url(base_url: &str, segments: &[String]) -> Result<Url, FirestoreError> {
    let mut url = Url::parse(base_url)?;
    url.path_segments_mut()
        .map_err(|_| FirestoreError::ApiError(format!("Invalid base URL: {}", base_url)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Splits a slash-separated document or collection path into segments.
pub(crate) fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Debug)]
pub struct DocumentReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) base_url: &'a str,
    pub(crate) segments: Vec<String>,
}

impl<'a> DocumentReference<'a> {
    /// The fully qualified resource name of the document.
    pub fn name(&self) -> String {
        format!("{}/{}", resource_name(self.base_url), self.segments.join("/"))
    }

    /// Gets a sub-collection of this document.
    pub fn collection(&self, collection_id: &str) -> CollectionReference<'a> {
        let mut segments = self.segments.clone();
        segments.push(collection_id.to_string());
        CollectionReference {
            client: self.client,
            base_url: self.base_url,
            segments,
        }
    }

    fn url(&self) -> Result<Url, FirestoreError> {
        document_url(self.base_url, &self.segments)
    }

    async fn fetch(&self) -> Result<Option<Document>, FirestoreError> {
        let response = self.client.get(self.url()?).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Get document failed").await,
            ));
        }

        Ok(Some(response.json().await?))
    }

    /// Reads the document into a snapshot, which also records whether it exists.
    pub async fn get_snapshot(&self) -> Result<DocumentSnapshot, FirestoreError> {
        let document = self.fetch().await?;
        Ok(DocumentSnapshot { document })
    }

    /// Updates the fields named in `update_mask`, or every field of `value` when
    /// no mask is given.
    ///
    /// Like the server SDKs' `update`, this fails with `NotFound` instead of
    /// creating the document when it does not exist.
    pub async fn update<T: Serialize>(
        &self,
        value: &T,
        update_mask: Option<Vec<String>>,
    ) -> Result<(), FirestoreError> {
        let fields = convert_serializable_to_fields(value)?;
        let mask = update_mask.unwrap_or_else(|| fields.keys().cloned().collect());

        let mut url = self.url()?;
        {
            let mut query = url.query_pairs_mut();
            for field in &mask {
                query.append_pair("updateMask.fieldPaths", field);
            }
            query.append_pair("currentDocument.exists", "true");
        }

        let body = serde_json::to_vec(&serde_json::json!({ "fields": fields }))?;

        let response = self
            .client
            .patch(url)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FirestoreError::NotFound(self.name()));
        }

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "Update document failed").await,
            ));
        }

        Ok(())
    }

    /// Opens a real-time listener on this document, resuming from
    /// `resume_token` when given.
    ///
    /// The stream owns the response body, so it can outlive the reference.
    pub async fn listen(
        &self,
        resume_token: Option<String>,
    ) -> Result<ListenStream, FirestoreError> {
        let request = ListenRequest {
            add_target: Target {
                documents: DocumentsTarget {
                    documents: vec![self.name()],
                },
                target_id: LISTEN_TARGET_ID,
                resume_token,
            },
        };
        listen_request(self.client, database_url(self.base_url), &request).await
    }
}

#[derive(Clone, Debug)]
pub struct CollectionReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) base_url: &'a str,
    pub(crate) segments: Vec<String>,
}

impl<'a> CollectionReference<'a> {
    /// Gets the document `document_id` of this collection. The id is always a
    /// single path segment.
    pub fn doc(&self, document_id: &str) -> DocumentReference<'a> {
        let mut segments = self.segments.clone();
        segments.push(document_id.to_string());
        DocumentReference {
            client: self.client,
            base_url: self.base_url,
            segments,
        }
    }

    /// Lists one page of documents.
    pub async fn list_documents(
        &self,
        page_token: Option<&str>,
    ) -> Result<ListDocumentsResponse, FirestoreError> {
        let mut url = document_url(self.base_url, &self.segments)?;
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", token);
        }

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FirestoreError::ApiError(
                parse_error_response(response, "List documents failed").await,
            ));
        }

        Ok(response.json().await?)
    }

    /// Lists every document in the collection, following page tokens.
    pub async fn list_all_documents(&self) -> Result<Vec<Document>, FirestoreError> {
        let mut documents = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let page = self.list_documents(next_page_token.as_deref()).await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => next_page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }
}
