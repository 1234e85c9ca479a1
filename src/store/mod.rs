// src/store/mod.rs

//! Validated document store.
//!
//! Collections live in memory behind one async `RwLock`; every write is
//! validated, checked against unique indexes, persisted (when a SQLite pool
//! is attached) and only then applied, so a rejected write leaves no trace.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models,
    schema::{CollectionName, CollectionSchema},
    utils::hash::{hash_secret, verify_secret},
};

pub mod collection;
pub mod credential;
pub mod index;
pub mod persistence;

use collection::{Collection, Stamp};
use credential::{Credential, Role, Scope};
use index::{IndexSpec, IndexValue};
use persistence::Persistence;

/// A document matched by a text search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub score: usize,
    pub document: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub keys: Vec<index::IndexKey>,
    pub unique: bool,
}

/// Summary of a collection: validator, indexes and size.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: CollectionName,
    pub validator: Value,
    pub indexes: Vec<IndexInfo>,
    pub count: usize,
}

#[derive(Debug, Default)]
struct StoreInner {
    collections: BTreeMap<CollectionName, Collection>,
    credentials: HashMap<String, Credential>,
}

impl StoreInner {
    fn collection(&self, name: CollectionName) -> Result<&Collection, AppError> {
        self.collections
            .get(&name)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' does not exist", name)))
    }

    fn collection_mut(&mut self, name: CollectionName) -> Result<&mut Collection, AppError> {
        self.collections
            .get_mut(&name)
            .ok_or_else(|| AppError::NotFound(format!("Collection '{}' does not exist", name)))
    }
}

#[derive(Debug)]
pub struct DocumentStore {
    namespace: String,
    inner: RwLock<StoreInner>,
    persistence: Option<Persistence>,
}

impl DocumentStore {
    /// A store kept in memory only.
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            inner: RwLock::new(StoreInner::default()),
            persistence: None,
        }
    }

    /// A store writing through to SQLite. Runs the migrations.
    pub async fn with_persistence(
        namespace: impl Into<String>,
        persistence: Persistence,
    ) -> Result<Self, AppError> {
        persistence.migrate().await?;
        Ok(Self {
            namespace: namespace.into(),
            inner: RwLock::new(StoreInner::default()),
            persistence: Some(persistence),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Creates a collection guarded by `schema`. On an existing collection the
    /// validator is redefined and documents and indexes are kept.
    ///
    /// Returns `true` when the collection was newly created.
    pub async fn create_collection_with_validator(&self, schema: &'static CollectionSchema) -> bool {
        let mut inner = self.inner.write().await;
        match inner.collections.get_mut(&schema.name) {
            Some(existing) => {
                existing.set_schema(schema);
                tracing::info!(collection = %schema.name, "Validator redefined");
                false
            }
            None => {
                inner.collections.insert(schema.name, Collection::new(schema));
                tracing::info!(collection = %schema.name, "Collection created");
                true
            }
        }
    }

    /// Builds an index over the collection. Returns the index name.
    pub async fn create_index(&self, name: CollectionName, spec: IndexSpec) -> Result<String, AppError> {
        let mut inner = self.inner.write().await;
        let index_name = inner.collection_mut(name)?.add_index(spec)?;
        tracing::debug!(collection = %name, index = %index_name, "Index ready");
        Ok(index_name)
    }

    /// Provisions a login scoped to this store's namespace.
    pub async fn create_credential(&self, username: &str, secret: &str, role: Role) -> Result<Credential, AppError> {
        let mut inner = self.inner.write().await;
        if inner.credentials.contains_key(username) {
            return Err(AppError::Conflict(format!("Credential '{}' already exists", username)));
        }

        let credential = Credential {
            username: username.to_string(),
            secret_hash: hash_secret(secret)?,
            scope: Scope {
                role,
                namespace: self.namespace.clone(),
            },
        };

        if let Some(persistence) = &self.persistence {
            persistence.insert_credential(&credential).await?;
        }
        inner.credentials.insert(username.to_string(), credential.clone());
        tracing::info!(username, role = %role, namespace = %self.namespace, "Credential created");
        Ok(credential)
    }

    /// Checks a username/secret pair.
    pub async fn authenticate(&self, username: &str, secret: &str) -> Result<Credential, AppError> {
        let credential = {
            let inner = self.inner.read().await;
            inner
                .credentials
                .get(username)
                .cloned()
                .ok_or_else(|| AppError::AuthError("Unknown credential".to_string()))?
        };

        if !verify_secret(secret, &credential.secret_hash)? {
            return Err(AppError::AuthError("Invalid secret".to_string()));
        }
        Ok(credential)
    }

    pub async fn insert_one(&self, name: CollectionName, document: Value) -> Result<String, AppError> {
        let mut ids = self.insert_many(name, vec![document]).await?;
        ids.pop()
            .ok_or_else(|| AppError::InternalServerError("Insert returned no id".to_string()))
    }

    /// Inserts a batch atomically: either every document is stored or none.
    pub async fn insert_many(&self, name: CollectionName, documents: Vec<Value>) -> Result<Vec<String>, AppError> {
        let now = now_rfc3339();
        let mut inner = self.inner.write().await;
        let collection = inner.collection_mut(name)?;

        // Details of a multi-document batch name the failing position.
        let positioned = documents.len() > 1;
        let mut batch = Vec::with_capacity(documents.len());
        for (pos, raw) in documents.into_iter().enumerate() {
            let prepared = collection
                .prepare(raw, None, Stamp::Insert, &now)
                .map_err(|e| if positioned { at_position(e, pos) } else { e })?;
            batch.push(prepared);
        }
        collection.check_insert(&batch)?;

        if let Some(persistence) = &self.persistence {
            persistence.insert_documents(name, &batch).await?;
        }

        let ids: Vec<String> = batch.iter().map(|(id, _)| id.clone()).collect();
        for (id, doc) in batch {
            collection.insert(id, doc);
        }
        tracing::info!(collection = %name, inserted = ids.len(), "Documents inserted");
        Ok(ids)
    }

    /// Replaces a stored document. `createdAt` is kept, `updatedAt` refreshed.
    pub async fn replace(&self, name: CollectionName, id: &str, document: Value) -> Result<Value, AppError> {
        self.modify(name, id, |_| Ok(document)).await
    }

    /// Read-modify-write of one document under the store's write lock.
    pub async fn modify<F>(&self, name: CollectionName, id: &str, f: F) -> Result<Value, AppError>
    where
        F: FnOnce(Value) -> Result<Value, AppError>,
    {
        let now = now_rfc3339();
        let mut inner = self.inner.write().await;
        let collection = inner.collection_mut(name)?;

        let current = collection
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", id)))?;
        let created_at = current.get("createdAt").cloned();

        let raw = f(current)?;
        let (_, doc) = collection.prepare(raw, Some(id), Stamp::Replace { created_at }, &now)?;
        collection.check_replace(id, &doc)?;

        if let Some(persistence) = &self.persistence {
            persistence.replace_document(name, id, &doc).await?;
        }
        collection.replace(id, doc.clone());
        tracing::info!(collection = %name, id, "Document replaced");
        Ok(doc)
    }

    pub async fn delete(&self, name: CollectionName, id: &str) -> Result<(), AppError> {
        let mut inner = self.inner.write().await;
        let collection = inner.collection_mut(name)?;
        if collection.get(id).is_none() {
            return Err(AppError::NotFound(format!("Document '{}' not found", id)));
        }

        if let Some(persistence) = &self.persistence {
            persistence.delete_document(name, id).await?;
        }
        collection.remove(id);
        tracing::info!(collection = %name, id, "Document deleted");
        Ok(())
    }

    pub async fn get(&self, name: CollectionName, id: &str) -> Result<Value, AppError> {
        let inner = self.inner.read().await;
        inner
            .collection(name)?
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", id)))
    }

    /// Documents equal to every `(path, value)` pair of `filter`.
    pub async fn find(
        &self,
        name: CollectionName,
        filter: &[(String, Value)],
        limit: Option<usize>,
    ) -> Result<Vec<Value>, AppError> {
        let filter: Vec<(String, IndexValue)> = filter
            .iter()
            .map(|(path, value)| (path.clone(), IndexValue::from_json(value)))
            .collect();

        let inner = self.inner.read().await;
        let (docs, index) = inner.collection(name)?.find(&filter);
        tracing::debug!(collection = %name, index = index.unwrap_or("<scan>"), matched = docs.len(), "Find");
        Ok(docs
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    /// Documents in the order of the named index (descending keys reverse it).
    pub async fn scan(&self, name: CollectionName, index_name: &str, limit: Option<usize>) -> Result<Vec<Value>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collection(name)?
            .scan(index_name)?
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    pub async fn search(&self, name: CollectionName, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .collection(name)?
            .search(query)?
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(score, doc)| SearchHit {
                score,
                document: doc.clone(),
            })
            .collect())
    }

    pub async fn count(&self, name: CollectionName) -> Result<usize, AppError> {
        let inner = self.inner.read().await;
        Ok(inner.collection(name)?.len())
    }

    pub async fn describe(&self) -> Vec<CollectionInfo> {
        let inner = self.inner.read().await;
        inner
            .collections
            .iter()
            .map(|(name, collection)| CollectionInfo {
                name: *name,
                validator: collection.schema().to_json_schema(),
                indexes: collection
                    .indexes()
                    .iter()
                    .map(|index| IndexInfo {
                        name: index.name.clone(),
                        keys: index.spec.keys.clone(),
                        unique: index.spec.unique,
                    })
                    .collect(),
                count: collection.len(),
            })
            .collect()
    }

    /// Reloads persisted credentials and documents into the provisioned
    /// collections. Documents that no longer pass the validator are skipped.
    pub async fn restore(&self) -> Result<usize, AppError> {
        let Some(persistence) = &self.persistence else {
            return Ok(0);
        };

        let credentials = persistence.load_credentials().await?;
        let mut restored = 0;
        let mut inner = self.inner.write().await;
        for credential in credentials {
            inner.credentials.insert(credential.username.clone(), credential);
        }

        let names: Vec<CollectionName> = inner.collections.keys().copied().collect();
        for name in names {
            let rows = persistence.load_documents(name).await?;
            let collection = inner.collection_mut(name)?;
            for (id, doc) in rows {
                if collection.get(&id).is_some() {
                    continue;
                }
                if let Err(e) = collection
                    .schema()
                    .validate(&doc)
                    .and_then(|_| collection.check_replace(&id, &doc))
                {
                    tracing::warn!(collection = %name, id = %id, error = %e, "Skipping persisted document");
                    continue;
                }
                collection.insert(id, doc);
                restored += 1;
            }
        }
        tracing::info!(restored, "Persisted documents restored");
        Ok(restored)
    }
}

fn now_rfc3339() -> String {
    models::timestamp::format(&Utc::now())
}

/// Prefixes validation details with the position of the rejected document.
fn at_position(err: AppError, pos: usize) -> AppError {
    match err {
        AppError::ValidationFailed(details) => AppError::ValidationFailed(
            details
                .into_iter()
                .map(|d| format!("documents[{}].{}", pos, d))
                .collect(),
        ),
        other => other,
    }
}
