// src/models/mod.rs

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use validator::Validate;

use crate::{error::AppError, schema::CollectionName};

pub mod code_template;
pub mod exercise;
pub mod lesson_content;
pub mod user_note;

/// A typed document of one collection.
///
/// Raw JSON that passed the collection validator is deserialized into the
/// implementing type, checked against its domain rules and serialized back,
/// so stored documents always have the canonical shape.
pub trait Document: Serialize + DeserializeOwned + Validate {
    const COLLECTION: CollectionName;

    /// Adjusts the document before it is stored (defaults, sanitizing).
    fn normalize(&mut self) {}

    fn id(&self) -> Option<&str>;
}

/// Runs the typed half of write validation for `T`.
pub fn canonicalize<T: Document>(raw: Value) -> Result<Value, AppError> {
    let mut doc: T = serde_json::from_value(raw)
        .map_err(|e| AppError::ValidationFailed(vec![e.to_string()]))?;
    doc.normalize();
    doc.validate()?;
    Ok(serde_json::to_value(&doc)?)
}

/// Dispatches [`canonicalize`] on the collection's model type.
pub fn canonicalize_for(collection: CollectionName, raw: Value) -> Result<Value, AppError> {
    match collection {
        CollectionName::LessonContent => canonicalize::<lesson_content::LessonContent>(raw),
        CollectionName::CodeTemplates => canonicalize::<code_template::CodeTemplate>(raw),
        CollectionName::UserNotes => canonicalize::<user_note::UserNote>(raw),
        CollectionName::Exercises => canonicalize::<exercise::Exercise>(raw),
    }
}

/// Deserializes a stored document into its model.
pub fn from_stored<T: Document>(stored: Value) -> Result<T, AppError> {
    serde_json::from_value(stored).map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Timestamp fields shared by every collection.
pub type Timestamp = Option<DateTime<Utc>>;

/// RFC 3339 in UTC with a fixed nine-digit fraction, so stored timestamps
/// compare correctly as strings (and in indexes).
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Timestamp;

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    pub fn serialize<S: Serializer>(value: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_str(&format(value)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        Option::<DateTime<Utc>>::deserialize(deserializer)
    }
}
