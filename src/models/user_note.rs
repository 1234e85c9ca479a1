// src/models/user_note.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Document, Timestamp};
use crate::schema::CollectionName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    Text,
    Code,
    Bookmark,
    Question,
}

/// Anchor of a note inside the source material.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NotePosition {
    /// Offset into a video, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<i32>,
}

/// Represents a document of the 'user_notes' collection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserNote {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Owner of the note.
    pub user_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<i64>,

    pub note_type: NoteType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 20000))]
    pub content: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Private notes are visible to their owner only.
    #[serde(default)]
    pub is_private: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<NotePosition>,

    #[serde(default, with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Timestamp,

    #[serde(default, with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Timestamp,
}

impl Document for UserNote {
    const COLLECTION: CollectionName = CollectionName::UserNotes;

    fn normalize(&mut self) {
        self.tags.sort();
        self.tags.dedup();
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl UserNote {
    /// Whether `viewer` may read this note. Anonymous viewers only see public notes.
    pub fn is_visible_to(&self, viewer: Option<i64>) -> bool {
        !self.is_private || viewer == Some(self.user_id)
    }
}

/// Query for a user's notes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesQuery {
    pub user_id: i64,
    pub course_id: Option<i64>,
    pub lesson_id: Option<i64>,
    /// The user on whose behalf the notes are read.
    pub viewer_id: Option<i64>,
}
