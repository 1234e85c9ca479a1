// src/handlers/lessons.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::Value;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        from_stored,
        lesson_content::{LessonContent, UpdateLessonContentRequest},
    },
    schema::CollectionName,
    store::DocumentStore,
};

/// Looks up the content document of a lesson through the unique `lessonId` index.
async fn find_lesson(store: &DocumentStore, lesson_id: i64) -> Result<Value, AppError> {
    store
        .find(
            CollectionName::LessonContent,
            &[("lessonId".to_string(), Value::from(lesson_id))],
            Some(1),
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("Lesson {} has no content", lesson_id)))
}

pub async fn get_lesson(
    State(store): State<Arc<DocumentStore>>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(find_lesson(&store, lesson_id).await?))
}

/// Edits the content of a lesson.
///
/// A changed payload increments `version`; `updatedAt` is refreshed on every edit.
pub async fn update_content(
    State(store): State<Arc<DocumentStore>>,
    Path(lesson_id): Path<i64>,
    Json(payload): Json<UpdateLessonContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let current = find_lesson(&store, lesson_id).await?;
    let id = current
        .get("_id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::InternalServerError("Stored lesson without id".to_string()))?;

    let updated = store
        .modify(CollectionName::LessonContent, &id, move |stored| {
            let mut lesson: LessonContent = from_stored(stored)?;
            lesson.apply_edit(payload, Utc::now());
            Ok(serde_json::to_value(lesson)?)
        })
        .await?;

    tracing::info!(lesson_id, version = ?updated.get("version"), "Lesson content updated");
    Ok(Json(updated))
}
