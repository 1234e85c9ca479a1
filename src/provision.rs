// src/provision.rs

//! Store bootstrap: collections with validators, indexes, the application
//! credential, restore of persisted data and example content.

use serde::Serialize;

use crate::{
    config::Config,
    error::AppError,
    schema::CollectionName,
    seed,
    store::{
        DocumentStore,
        credential::Role,
        index::{IndexSpec, KeyKind},
    },
};

/// Query indexes of each collection.
pub fn index_specs(name: CollectionName) -> Vec<IndexSpec> {
    match name {
        CollectionName::LessonContent => vec![
            IndexSpec::ascending("lessonId").unique(),
            IndexSpec::ascending("courseId"),
            IndexSpec::ascending("contentType"),
            IndexSpec::ascending("metadata.tags"),
            IndexSpec::descending("createdAt"),
        ],
        CollectionName::CodeTemplates => vec![
            IndexSpec::new(&[("language", KeyKind::Ascending), ("templateType", KeyKind::Ascending)]),
            IndexSpec::ascending("tags"),
            IndexSpec::ascending("difficulty"),
            IndexSpec::ascending("isPublic"),
            IndexSpec::ascending("createdBy"),
            IndexSpec::text(&["name", "description"]),
        ],
        CollectionName::UserNotes => vec![
            IndexSpec::new(&[("userId", KeyKind::Ascending), ("courseId", KeyKind::Ascending)]),
            IndexSpec::new(&[("userId", KeyKind::Ascending), ("lessonId", KeyKind::Ascending)]),
            IndexSpec::ascending("noteType"),
            IndexSpec::ascending("tags"),
            IndexSpec::descending("createdAt"),
            IndexSpec::text(&["title", "content"]),
        ],
        CollectionName::Exercises => vec![
            IndexSpec::ascending("lessonId"),
            IndexSpec::ascending("language"),
            IndexSpec::ascending("difficulty"),
            IndexSpec::ascending("tags"),
            IndexSpec::text(&["title", "description"]),
        ],
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ProvisionReport {
    pub collections_created: usize,
    pub indexes: usize,
    pub credential_created: bool,
    pub restored: usize,
    pub seeded: usize,
}

/// Provisions the store. Safe to re-run: validators are redefined, identical
/// indexes and an existing credential are left alone, seeding skips
/// collections that already hold documents. Fails before touching the store
/// when no application password is configured.
pub async fn provision(store: &DocumentStore, config: &Config) -> Result<ProvisionReport, AppError> {
    let Some(app_password) = config.app_password.as_deref() else {
        tracing::error!(username = %config.app_username, "APP_DB_PASSWORD not set");
        return Err(AppError::InternalServerError(
            "APP_DB_PASSWORD must be set to provision the application credential".to_string(),
        ));
    };

    let mut report = ProvisionReport::default();

    for name in CollectionName::ALL {
        if store.create_collection_with_validator(name.schema()).await {
            report.collections_created += 1;
        }
        for spec in index_specs(name) {
            store.create_index(name, spec).await?;
            report.indexes += 1;
        }
    }

    report.restored = store.restore().await?;

    match store
        .create_credential(&config.app_username, app_password, Role::ReadWrite)
        .await
    {
        Ok(_) => report.credential_created = true,
        Err(AppError::Conflict(_)) => {
            tracing::info!(username = %config.app_username, "Credential already provisioned");
        }
        Err(e) => return Err(e),
    }

    if config.seed_examples {
        report.seeded = seed::seed_examples(store).await?;
    }

    tracing::info!(
        namespace = %store.namespace(),
        collections = CollectionName::ALL.len(),
        indexes = report.indexes,
        restored = report.restored,
        seeded = report.seeded,
        "Store provisioned"
    );
    Ok(report)
}
