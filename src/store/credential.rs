// src/store/credential.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Access level granted on a namespace. Neither level is administrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "readWrite")]
    ReadWrite,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Read => "read",
            Role::ReadWrite => "readWrite",
        }
    }

    pub fn can_write(&self) -> bool {
        matches!(self, Role::ReadWrite)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Role::Read),
            "readWrite" => Ok(Role::ReadWrite),
            other => Err(AppError::BadRequest(format!("Unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub role: Role,
    pub namespace: String,
}

/// An application login against the store.
#[derive(Debug, Clone, Serialize)]
pub struct Credential {
    pub username: String,

    /// Argon2 hash of the secret.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub secret_hash: String,

    pub scope: Scope,
}
