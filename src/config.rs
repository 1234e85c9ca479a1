// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Namespace the application credential is scoped to.
pub const DEFAULT_NAMESPACE: &str = "programming_platform_docs";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub namespace: String,
    pub app_username: String,
    /// Required by `provision`; unset fails provisioning.
    pub app_password: Option<String>,
    pub seed_examples: bool,
    pub bind_addr: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let namespace = env::var("DOCS_NAMESPACE")
            .unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());

        let app_username = env::var("APP_DB_USER")
            .unwrap_or_else(|_| "app_user".to_string());

        let app_password = env::var("APP_DB_PASSWORD").ok().filter(|p| !p.is_empty());

        let seed_examples = env::var("SEED_EXAMPLES")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            namespace,
            app_username,
            app_password,
            seed_examples,
            bind_addr,
            rust_log,
        }
    }
}
