// src/store/persistence.rs

//! Write-through persistence of documents and credentials into SQLite.

use serde_json::Value;
use sqlx::SqlitePool;

use super::credential::{Credential, Scope};
use crate::{error::AppError, schema::CollectionName};

#[derive(Debug, Clone)]
pub struct Persistence {
    pool: SqlitePool,
}

impl Persistence {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts a batch in a single transaction.
    pub async fn insert_documents(
        &self,
        collection: CollectionName,
        documents: &[(String, Value)],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        for (id, body) in documents {
            sqlx::query("INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)")
                .bind(collection.as_str())
                .bind(id.as_str())
                .bind(body.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_document(
        &self,
        collection: CollectionName,
        id: &str,
        body: &Value,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE documents SET body = ? WHERE collection = ? AND id = ?")
            .bind(body.to_string())
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Document '{}' not found", id)));
        }
        Ok(())
    }

    pub async fn delete_document(&self, collection: CollectionName, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn load_documents(
        &self,
        collection: CollectionName,
    ) -> Result<Vec<(String, Value)>, AppError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, body FROM documents WHERE collection = ? ORDER BY id")
                .bind(collection.as_str())
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(id, body)| {
                let value = serde_json::from_str(&body)
                    .map_err(|e| AppError::InternalServerError(format!("Corrupt document '{}': {}", id, e)))?;
                Ok((id, value))
            })
            .collect()
    }

    pub async fn insert_credential(&self, credential: &Credential) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO credentials (username, secret_hash, role, namespace) VALUES (?, ?, ?, ?)",
        )
        .bind(credential.username.as_str())
        .bind(credential.secret_hash.as_str())
        .bind(credential.scope.role.as_str())
        .bind(credential.scope.namespace.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn load_credentials(&self) -> Result<Vec<Credential>, AppError> {
        let rows: Vec<(String, String, String, String)> =
            sqlx::query_as("SELECT username, secret_hash, role, namespace FROM credentials")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(username, secret_hash, role, namespace)| {
                Ok(Credential {
                    username,
                    secret_hash,
                    scope: Scope {
                        role: role.parse()?,
                        namespace,
                    },
                })
            })
            .collect()
    }
}
