// src/models/lesson_content.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use super::{Document, Timestamp};
use crate::{schema::CollectionName, utils::html::clean_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Markdown,
    Html,
    Video,
    Interactive,
}

/// Represents a document of the 'lesson_content' collection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_metadata))]
pub struct LessonContent {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Unique across the collection.
    pub lesson_id: i64,

    pub course_id: i64,

    pub content_type: ContentType,

    /// Opaque payload, e.g. `{"markdown": "..."}`.
    #[validate(custom(function = validate_object))]
    pub content: Value,

    /// Opaque payload; `metadata.tags` is indexed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "version must be at least 1"))]
    pub version: Option<i32>,

    #[serde(default, with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Timestamp,

    #[serde(default, with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Timestamp,
}

impl Document for LessonContent {
    const COLLECTION: CollectionName = CollectionName::LessonContent;

    fn normalize(&mut self) {
        if self.version.is_none() {
            self.version = Some(1);
        }
        if self.content_type == ContentType::Html {
            sanitize_strings(&mut self.content);
        }
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl LessonContent {
    pub fn tags(&self) -> Vec<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("tags"))
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Applies an edit. A changed content payload bumps the version;
    /// `updatedAt` is refreshed regardless.
    pub fn apply_edit(&mut self, edit: UpdateLessonContentRequest, now: DateTime<Utc>) {
        let mut content_changed = false;

        if let Some(content_type) = edit.content_type {
            content_changed |= content_type != self.content_type;
            self.content_type = content_type;
        }
        if edit.content != self.content {
            content_changed = true;
            self.content = edit.content;
        }
        if let Some(metadata) = edit.metadata {
            self.metadata = Some(metadata);
        }

        if content_changed {
            self.version = Some(self.version.unwrap_or(1).saturating_add(1));
        }
        self.updated_at = Some(now);
    }
}

/// DTO for editing the content of a lesson.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLessonContentRequest {
    #[validate(custom(function = validate_object))]
    pub content: Value,
    pub content_type: Option<ContentType>,
    pub metadata: Option<Value>,
}

fn validate_object(value: &Value) -> Result<(), validator::ValidationError> {
    if !value.is_object() {
        return Err(validator::ValidationError::new("expected_object"));
    }
    Ok(())
}

fn validate_metadata(lesson: &LessonContent) -> Result<(), validator::ValidationError> {
    match &lesson.metadata {
        Some(metadata) => validate_object(metadata),
        None => Ok(()),
    }
}

/// Sanitizes every string inside an HTML payload.
fn sanitize_strings(value: &mut Value) {
    match value {
        Value::String(s) => *s = clean_html(s),
        Value::Array(items) => items.iter_mut().for_each(sanitize_strings),
        Value::Object(map) => map.values_mut().for_each(sanitize_strings),
        _ => {}
    }
}
