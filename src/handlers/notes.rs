// src/handlers/notes.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::Value;

use crate::{
    error::AppError,
    models::{
        from_stored,
        user_note::{NotesQuery, UserNote},
    },
    schema::CollectionName,
    store::DocumentStore,
};

/// Lists a user's notes, newest first.
///
/// Private notes are only returned when `viewerId` is the owner.
pub async fn list_notes(
    State(store): State<Arc<DocumentStore>>,
    Query(query): Query<NotesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = vec![("userId".to_string(), Value::from(query.user_id))];
    if let Some(course_id) = query.course_id {
        filter.push(("courseId".to_string(), Value::from(course_id)));
    }
    if let Some(lesson_id) = query.lesson_id {
        filter.push(("lessonId".to_string(), Value::from(lesson_id)));
    }

    let mut notes = store
        .find(CollectionName::UserNotes, &filter, None)
        .await?
        .into_iter()
        .map(from_stored::<UserNote>)
        .collect::<Result<Vec<_>, _>>()?;

    notes.retain(|note| note.is_visible_to(query.viewer_id));
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(notes))
}
