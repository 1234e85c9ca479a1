// src/handlers/exercises.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::Value;

use crate::{
    error::AppError,
    models::{
        from_stored,
        exercise::{Exercise, PublicExercise},
    },
    schema::CollectionName,
    store::DocumentStore,
};

/// Returns an exercise as learners see it: no solution, no hidden test cases.
pub async fn get_public_exercise(
    State(store): State<Arc<DocumentStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exercise: Exercise = from_stored(store.get(CollectionName::Exercises, &id).await?)?;
    Ok(Json(PublicExercise::from(exercise)))
}

/// Lists the exercises of a lesson in their public form.
pub async fn list_lesson_exercises(
    State(store): State<Arc<DocumentStore>>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exercises = store
        .find(
            CollectionName::Exercises,
            &[("lessonId".to_string(), Value::from(lesson_id))],
            None,
        )
        .await?
        .into_iter()
        .map(|doc| from_stored::<Exercise>(doc).map(PublicExercise::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(exercises))
}
