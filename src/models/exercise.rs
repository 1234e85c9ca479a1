// src/models/exercise.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Document, Timestamp};
use crate::schema::CollectionName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    /// Hidden cases are used for grading but never shown to learners.
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Represents a document of the 'exercises' collection.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub lesson_id: i64,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(min = 1))]
    pub description: String,

    #[validate(length(min = 1, max = 32))]
    pub language: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starter_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_code: Option<String>,

    #[validate(length(min = 1, message = "an exercise needs at least one test case"))]
    pub test_cases: Vec<TestCase>,

    #[serde(default)]
    pub hints: Vec<String>,

    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<i32>,

    /// Kilobytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<i32>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default, with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub created_at: Timestamp,

    #[serde(default, with = "super::timestamp", skip_serializing_if = "Option::is_none")]
    pub updated_at: Timestamp,
}

impl Document for Exercise {
    const COLLECTION: CollectionName = CollectionName::Exercises;

    fn normalize(&mut self) {
        self.tags.sort();
        self.tags.dedup();
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// DTO for sending an exercise to learners (excludes the solution and hidden test cases).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicExercise {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub lesson_id: i64,
    pub title: String,
    pub description: String,
    pub language: String,
    pub difficulty: Option<Difficulty>,
    pub starter_code: Option<String>,
    pub test_cases: Vec<TestCase>,
    pub hidden_test_cases: usize,
    pub hints: Vec<String>,
    pub time_limit: Option<i32>,
    pub memory_limit: Option<i32>,
    pub tags: Vec<String>,
}

impl From<Exercise> for PublicExercise {
    fn from(exercise: Exercise) -> Self {
        let (hidden, visible): (Vec<TestCase>, Vec<TestCase>) =
            exercise.test_cases.into_iter().partition(|t| t.is_hidden);

        Self {
            id: exercise.id,
            lesson_id: exercise.lesson_id,
            title: exercise.title,
            description: exercise.description,
            language: exercise.language,
            difficulty: exercise.difficulty,
            starter_code: exercise.starter_code,
            test_cases: visible,
            hidden_test_cases: hidden.len(),
            hints: exercise.hints,
            time_limit: exercise.time_limit,
            memory_limit: exercise.memory_limit,
            tags: exercise.tags,
        }
    }
}
