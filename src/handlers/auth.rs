// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{config::Config, error::AppError, store::DocumentStore, utils::jwt::sign_jwt};

/// DTO for credential login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Authenticates a store credential and returns a JWT token.
///
/// The token carries the credential's role and namespace; the role decides
/// whether write routes are reachable.
pub async fn login(
    State(store): State<Arc<DocumentStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let credential = store
        .authenticate(&payload.username, &payload.password)
        .await
        .inspect_err(|e| tracing::info!(username = %payload.username, "Login rejected: {}", e))?;

    let token = sign_jwt(&credential, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "expires_in": config.jwt_expiration,
        "role": credential.scope.role,
        "namespace": credential.scope.namespace,
    })))
}
