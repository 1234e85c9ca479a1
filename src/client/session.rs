// src/client/session.rs

//! Client session state.
//!
//! The session is an explicit context object handed to the navigation guard.
//! It has a single writer (sign-in, sign-out, restore) and any number of
//! readers, which is what a `watch` channel models.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    /// e.g. 'student', 'teacher', 'admin'.
    pub role: String,
}

/// What survives a restart: the access token and the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub token: String,
    pub user: SessionUser,
}

/// Durable storage for the session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedSession>, AppError>;
    async fn save(&self, session: &PersistedSession) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// Session persisted as a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn load(&self) -> Result<Option<PersistedSession>, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::InternalServerError(e.to_string())),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), AppError> {
        let raw = serde_json::to_string_pretty(session)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    async fn clear(&self) -> Result<(), AppError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::InternalServerError(e.to_string())),
        }
    }
}

/// Session kept in process memory.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> Result<Option<PersistedSession>, AppError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), AppError> {
        *self.slot.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

/// Authentication state as the navigation guard sees it.
#[async_trait]
pub trait AuthStore: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn role(&self) -> Option<String>;

    /// Hydrates the session from persisted storage. Resolves once done,
    /// whether or not a session was found.
    async fn initialize_auth(&self) -> Result<(), AppError>;
}

/// Claims the client reads from an access token. The signature is checked
/// by the server; the client only needs to know whether the token expired.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[allow(dead_code)]
    exp: u64,
}

fn token_is_live(token: &str) -> bool {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation).is_ok()
}

pub struct SessionContext {
    state: watch::Sender<Option<SessionUser>>,
    token: Mutex<Option<String>>,
    storage: Box<dyn SessionStorage>,
}

impl SessionContext {
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            state,
            token: Mutex::new(None),
            storage: Box::new(storage),
        }
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.state.borrow().clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    /// Receiver notified on every sign-in, sign-out and restore.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.state.subscribe()
    }

    /// Stores a fresh session (e.g. after a login response).
    pub async fn sign_in(&self, session: PersistedSession) -> Result<(), AppError> {
        self.storage.save(&session).await?;
        *self.token.lock().await = Some(session.token);
        tracing::info!(username = %session.user.username, role = %session.user.role, "Signed in");
        self.state.send_replace(Some(session.user));
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        *self.token.lock().await = None;
        self.state.send_replace(None);
        self.storage.clear().await?;
        tracing::info!("Signed out");
        Ok(())
    }
}

#[async_trait]
impl AuthStore for SessionContext {
    fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    fn role(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|user| user.role.clone())
    }

    async fn initialize_auth(&self) -> Result<(), AppError> {
        let Some(persisted) = self.storage.load().await? else {
            tracing::debug!("No persisted session");
            return Ok(());
        };

        if !token_is_live(&persisted.token) {
            tracing::info!(username = %persisted.user.username, "Persisted session expired, discarding");
            return self.storage.clear().await;
        }

        *self.token.lock().await = Some(persisted.token);
        tracing::debug!(username = %persisted.user.username, "Session restored");
        self.state.send_replace(Some(persisted.user));
        Ok(())
    }
}
