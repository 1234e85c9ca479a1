// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::AppError,
    store::credential::{Credential, Role},
};

/// Claims of a store access token.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Credential username.
    pub sub: String,
    pub role: Role,
    /// Namespace the role is granted on.
    pub ns: String,
    pub exp: i64,
}

impl Claims {
    pub fn for_credential(credential: &Credential, lifetime_seconds: u64) -> Self {
        let lifetime = i64::try_from(lifetime_seconds).unwrap_or(i64::MAX);
        Self {
            sub: credential.username.clone(),
            role: credential.scope.role,
            ns: credential.scope.namespace.clone(),
            exp: Utc::now().timestamp().saturating_add(lifetime),
        }
    }

    pub fn can_write(&self) -> bool {
        self.role.can_write()
    }
}

pub fn sign_jwt(credential: &Credential, secret: &str, lifetime_seconds: u64) -> Result<String, AppError> {
    let claims = Claims::for_credential(credential, lifetime_seconds);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Checks signature and expiry of a token.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            AppError::AuthError("Invalid token".to_string())
        })
}

/// Requires a valid Bearer token issued for this store's namespace and
/// makes its `Claims` available to later layers and handlers.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &config.jwt_secret)?;
    if claims.ns != config.namespace {
        tracing::warn!(sub = %claims.sub, ns = %claims.ns, "Token scoped to another namespace");
        return Err(AppError::AuthError("Token not valid for this namespace".to_string()));
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Layered inside `auth_middleware`: only 'readWrite' tokens pass.
pub async fn write_scope_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::AuthError("Missing credentials".to_string()))?;

    if !claims.can_write() {
        tracing::info!(sub = %claims.sub, "Write attempted with read-only token");
        return Err(AppError::Forbidden("Write access requires the readWrite role".to_string()));
    }

    Ok(next.run(req).await)
}
