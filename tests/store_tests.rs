// tests/store_tests.rs

use std::{collections::HashMap, time::Duration};

use platform_docs::{
    config::{Config, DEFAULT_NAMESPACE},
    error::AppError,
    models::{code_template::CodeTemplate, from_stored},
    provision::provision,
    schema::{CollectionName, LESSON_CONTENT},
    store::{DocumentStore, credential::Role, persistence::Persistence},
};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;

fn config(seed_examples: bool) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret".to_string(),
        jwt_expiration: 600,
        namespace: DEFAULT_NAMESPACE.to_string(),
        app_username: "app_user".to_string(),
        app_password: Some("app_password".to_string()),
        seed_examples,
        bind_addr: "127.0.0.1:0".to_string(),
        rust_log: "error".to_string(),
    }
}

async fn provisioned_store() -> DocumentStore {
    let store = DocumentStore::in_memory(DEFAULT_NAMESPACE);
    provision(&store, &config(false)).await.unwrap();
    store
}

fn lesson(lesson_id: i64, tags: &[&str]) -> Value {
    json!({
        "lessonId": lesson_id,
        "courseId": 1,
        "contentType": "markdown",
        "content": { "markdown": "body" },
        "metadata": { "tags": tags }
    })
}

fn template(code: &str, placeholders: Value) -> Value {
    json!({
        "language": "rust",
        "templateType": "function",
        "name": "Rust function",
        "code": code,
        "placeholders": placeholders
    })
}

#[tokio::test]
async fn provisioning_creates_every_collection_once() {
    let store = DocumentStore::in_memory(DEFAULT_NAMESPACE);

    let first = provision(&store, &config(true)).await.unwrap();
    assert_eq!(first.collections_created, 4);
    assert_eq!(first.seeded, 4);
    assert!(first.credential_created);

    // Re-running redefines validators and leaves the data alone.
    let second = provision(&store, &config(true)).await.unwrap();
    assert_eq!(second.collections_created, 0);
    assert_eq!(second.seeded, 0);
    assert!(!second.credential_created);
    assert_eq!(store.count(CollectionName::LessonContent).await.unwrap(), 1);
    assert_eq!(store.count(CollectionName::CodeTemplates).await.unwrap(), 2);
    assert!(!store.create_collection_with_validator(&LESSON_CONTENT).await);
}

#[tokio::test]
async fn provisioning_requires_an_application_password() {
    let store = DocumentStore::in_memory(DEFAULT_NAMESPACE);
    let mut cfg = config(true);
    cfg.app_password = None;

    let err = provision(&store, &cfg).await.unwrap_err();
    assert!(matches!(err, AppError::InternalServerError(msg) if msg.contains("APP_DB_PASSWORD")));
    assert!(store.describe().await.is_empty());
    assert!(store.authenticate("app_user", "app_password").await.is_err());
}

#[tokio::test]
async fn duplicate_lesson_id_is_a_conflict() {
    let store = provisioned_store().await;

    store
        .insert_one(CollectionName::LessonContent, lesson(1, &[]))
        .await
        .unwrap();
    let err = store
        .insert_one(CollectionName::LessonContent, lesson(1, &[]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(store.count(CollectionName::LessonContent).await.unwrap(), 1);
}

#[tokio::test]
async fn duplicate_lesson_id_inside_one_batch_is_a_conflict() {
    let store = provisioned_store().await;

    let err = store
        .insert_many(
            CollectionName::LessonContent,
            vec![lesson(2, &[]), lesson(2, &[])],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(store.count(CollectionName::LessonContent).await.unwrap(), 0);
}

#[tokio::test]
async fn template_language_must_be_known() {
    let store = provisioned_store().await;

    for language in ["java", "python", "javascript", "cpp", "csharp", "go", "rust"] {
        let mut doc = template("fn main() {}", json!([]));
        doc["language"] = json!(language);
        store
            .insert_one(CollectionName::CodeTemplates, doc)
            .await
            .unwrap_or_else(|e| panic!("{language} rejected: {e}"));
    }

    let mut doc = template("fn main() {}", json!([]));
    doc["language"] = json!("kotlin");
    let err = store
        .insert_one(CollectionName::CodeTemplates, doc)
        .await
        .unwrap_err();

    match err {
        AppError::ValidationFailed(details) => {
            assert!(details.iter().any(|d| d.starts_with("language:")), "{details:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn exercise_needs_a_test_case() {
    let store = provisioned_store().await;

    let err = store
        .insert_one(
            CollectionName::Exercises,
            json!({
                "lessonId": 1,
                "title": "Nothing to check",
                "description": "No test cases",
                "language": "go",
                "testCases": []
            }),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ValidationFailed(_)));
    assert_eq!(store.count(CollectionName::Exercises).await.unwrap(), 0);
}

#[tokio::test]
async fn exercise_limits_accept_any_integer() {
    let store = provisioned_store().await;

    let id = store
        .insert_one(
            CollectionName::Exercises,
            json!({
                "lessonId": 1,
                "title": "Unbounded",
                "description": "Limits left to the grader",
                "language": "go",
                "testCases": [{ "expectedOutput": "ok" }],
                "timeLimit": 0,
                "memoryLimit": 0
            }),
        )
        .await
        .unwrap();

    let stored = store.get(CollectionName::Exercises, &id).await.unwrap();
    assert_eq!(stored["timeLimit"], 0);
    assert_eq!(stored["memoryLimit"], 0);

    let err = store
        .insert_one(
            CollectionName::Exercises,
            json!({
                "lessonId": 1,
                "title": "Fractional",
                "description": "Limits must be integers",
                "language": "go",
                "testCases": [{ "expectedOutput": "ok" }],
                "timeLimit": 1.5
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationFailed(_)));
}

#[tokio::test]
async fn unknown_and_missing_fields_are_reported() {
    let store = provisioned_store().await;

    let err = store
        .insert_one(
            CollectionName::UserNotes,
            json!({ "userId": 1, "content": "hi", "colour": "red" }),
        )
        .await
        .unwrap_err();

    let AppError::ValidationFailed(details) = err else {
        panic!("expected a validation failure");
    };
    assert!(details.iter().any(|d| d == "noteType: required field is missing"));
    assert!(details.iter().any(|d| d == "colour: unknown field"));
}

#[tokio::test]
async fn failed_batch_is_rolled_back_with_position() {
    let store = provisioned_store().await;

    let mut bad = lesson(4, &[]);
    bad["courseId"] = json!("one");

    let err = store
        .insert_many(CollectionName::LessonContent, vec![lesson(3, &[]), bad])
        .await
        .unwrap_err();

    let AppError::ValidationFailed(details) = err else {
        panic!("expected a validation failure");
    };
    assert!(details[0].starts_with("documents[1].courseId"), "{details:?}");
    assert_eq!(store.count(CollectionName::LessonContent).await.unwrap(), 0);
}

#[tokio::test]
async fn single_document_errors_carry_no_batch_position() {
    let store = provisioned_store().await;

    let mut bad = lesson(5, &[]);
    bad["courseId"] = json!("one");

    for err in [
        store.insert_one(CollectionName::LessonContent, bad.clone()).await.unwrap_err(),
        store.insert_many(CollectionName::LessonContent, vec![bad]).await.unwrap_err(),
    ] {
        let AppError::ValidationFailed(details) = err else {
            panic!("expected a validation failure");
        };
        assert!(details[0].starts_with("courseId"), "{details:?}");
        assert!(details.iter().all(|d| !d.starts_with("documents[")), "{details:?}");
    }
}

#[tokio::test]
async fn find_uses_multikey_tags() {
    let store = provisioned_store().await;

    store
        .insert_many(
            CollectionName::LessonContent,
            vec![
                lesson(1, &["rust", "ownership"]),
                lesson(2, &["rust", "traits"]),
                lesson(3, &["java"]),
            ],
        )
        .await
        .unwrap();

    let rust = store
        .find(
            CollectionName::LessonContent,
            &[("metadata.tags".to_string(), json!("rust"))],
            None,
        )
        .await
        .unwrap();
    assert_eq!(rust.len(), 2);

    let traits = store
        .find(
            CollectionName::LessonContent,
            &[
                ("courseId".to_string(), json!(1)),
                ("metadata.tags".to_string(), json!("traits")),
            ],
            None,
        )
        .await
        .unwrap();
    assert_eq!(traits.len(), 1);
    assert_eq!(traits[0]["lessonId"], 2);
}

#[tokio::test]
async fn descending_index_scans_newest_first() {
    let store = provisioned_store().await;

    for lesson_id in 1..=3 {
        store
            .insert_one(CollectionName::LessonContent, lesson(lesson_id, &[]))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let docs = store
        .scan(CollectionName::LessonContent, "createdAt_-1", None)
        .await
        .unwrap();
    let order: Vec<i64> = docs.iter().map(|d| d["lessonId"].as_i64().unwrap()).collect();
    assert_eq!(order, vec![3, 2, 1]);

    let err = store
        .scan(CollectionName::LessonContent, "missing_1", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn whole_second_timestamps_order_before_fractional_ones() {
    let store = provisioned_store().await;

    let mut early = lesson(1, &[]);
    early["createdAt"] = json!("2025-01-01T00:00:05Z");
    let mut late = lesson(2, &[]);
    late["createdAt"] = json!("2025-01-01T00:00:05.500Z");
    let early_id = store.insert_one(CollectionName::LessonContent, early).await.unwrap();
    store.insert_one(CollectionName::LessonContent, late).await.unwrap();

    let docs = store
        .scan(CollectionName::LessonContent, "createdAt_-1", None)
        .await
        .unwrap();
    let order: Vec<i64> = docs.iter().map(|d| d["lessonId"].as_i64().unwrap()).collect();
    assert_eq!(order, vec![2, 1]);

    let stored = store.get(CollectionName::LessonContent, &early_id).await.unwrap();
    assert_eq!(stored["createdAt"], "2025-01-01T00:00:05.000000000Z");
}

#[tokio::test]
async fn text_search_scores_matching_terms() {
    let store = provisioned_store().await;

    store
        .insert_many(
            CollectionName::Exercises,
            vec![
                json!({
                    "lessonId": 1,
                    "title": "Binary search",
                    "description": "Implement binary search over a sorted array",
                    "language": "rust",
                    "testCases": [{ "expectedOutput": "2" }]
                }),
                json!({
                    "lessonId": 1,
                    "title": "Linear search",
                    "description": "Scan an array",
                    "language": "rust",
                    "testCases": [{ "expectedOutput": "0" }]
                }),
            ],
        )
        .await
        .unwrap();

    let hits = store
        .search(CollectionName::Exercises, "Binary SEARCH", None)
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document["title"], "Binary search");
    assert!(hits[0].score > hits[1].score);

    // No text index on lesson content.
    let err = store
        .search(CollectionName::LessonContent, "anything", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn undeclared_placeholders_are_rejected() {
    let store = provisioned_store().await;

    let err = store
        .insert_one(
            CollectionName::CodeTemplates,
            template("fn {{name}}() { {{body}} }", json!([{ "name": "name" }])),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationFailed(_)));

    let id = store
        .insert_one(
            CollectionName::CodeTemplates,
            template(
                "fn {{name}}() { {{body}} }",
                json!([{ "name": "name", "defaultValue": "run" }, { "name": "body" }]),
            ),
        )
        .await
        .unwrap();

    let stored: CodeTemplate =
        from_stored(store.get(CollectionName::CodeTemplates, &id).await.unwrap()).unwrap();

    let err = stored.render(&HashMap::new()).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg.contains("body")));

    let values = HashMap::from([("body".to_string(), "todo!()".to_string())]);
    assert_eq!(stored.render(&values).unwrap(), "fn run() { todo!() }");
}

#[tokio::test]
async fn html_lessons_are_sanitized() {
    let store = provisioned_store().await;

    let id = store
        .insert_one(
            CollectionName::LessonContent,
            json!({
                "lessonId": 9,
                "courseId": 1,
                "contentType": "html",
                "content": { "html": "<p>Hello</p><script>alert(1)</script>" }
            }),
        )
        .await
        .unwrap();

    let doc = store.get(CollectionName::LessonContent, &id).await.unwrap();
    assert_eq!(doc["content"]["html"], "<p>Hello</p>");
    assert_eq!(doc["version"], 1);
}

#[tokio::test]
async fn credentials_are_unique_and_verified() {
    let store = provisioned_store().await;

    let credential = store
        .create_credential("app_user", "s3cret", Role::ReadWrite)
        .await
        .unwrap();
    assert_eq!(credential.scope.namespace, DEFAULT_NAMESPACE);
    assert_ne!(credential.secret_hash, "s3cret");

    let err = store
        .create_credential("app_user", "other", Role::Read)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    assert!(store.authenticate("app_user", "s3cret").await.is_ok());
    assert!(matches!(
        store.authenticate("app_user", "wrong").await,
        Err(AppError::AuthError(_))
    ));
    assert!(matches!(
        store.authenticate("nobody", "s3cret").await,
        Err(AppError::AuthError(_))
    ));
}

#[tokio::test]
async fn persisted_documents_survive_a_restart() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    let cfg = config(true);

    let first = DocumentStore::with_persistence(DEFAULT_NAMESPACE, Persistence::new(pool.clone()))
        .await
        .unwrap();
    let report = provision(&first, &cfg).await.unwrap();
    assert!(report.credential_created);
    let id = first
        .insert_one(CollectionName::LessonContent, lesson(2, &["persisted"]))
        .await
        .unwrap();
    drop(first);

    let second = DocumentStore::with_persistence(DEFAULT_NAMESPACE, Persistence::new(pool))
        .await
        .unwrap();
    let report = provision(&second, &cfg).await.unwrap();

    // Seeded examples plus the extra lesson; nothing seeded twice.
    assert_eq!(report.restored, 5);
    assert_eq!(report.seeded, 0);
    assert!(!report.credential_created);

    let doc = second.get(CollectionName::LessonContent, &id).await.unwrap();
    assert_eq!(doc["metadata"]["tags"], json!(["persisted"]));
    assert!(second.authenticate("app_user", "app_password").await.is_ok());

    // Unique index was rebuilt from the restored rows.
    let err = second
        .insert_one(CollectionName::LessonContent, lesson(2, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
