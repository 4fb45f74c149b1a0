//! Operator account model.
//!
//! # Responsibility
//! - Define registry operator accounts and their role.
//! - Own password digest derivation so plaintext never reaches storage.
//!
//! # Invariants
//! - `username` is unique across accounts.
//! - `password_hash` is a lowercase hex SHA-256 digest.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for operator accounts.
pub type UserId = Uuid;

/// Operator role controlling which registry pages are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access including deletes and account management.
    Admin,
    /// Can add and edit residents.
    Editor,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Stable string id used in storage and login responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }

    /// Parses a role name, ignoring surrounding whitespace and ASCII case.
    pub fn parse(value: &str) -> Result<Self, RoleParseError> {
        let normalized = value.trim();
        if normalized.is_empty() {
            return Err(RoleParseError::Empty);
        }
        match normalized.to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "viewer" => Ok(Self::Viewer),
            _ => Err(RoleParseError::Unsupported(normalized.to_string())),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleParseError {
    Empty,
    Unsupported(String),
}

impl Display for RoleParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "role must not be empty"),
            Self::Unsupported(value) => {
                write!(f, "unsupported role `{value}`; expected admin|editor|viewer")
            }
        }
    }
}

impl Error for RoleParseError {}

/// Registry operator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Never serialized to callers.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
}

impl User {
    /// Creates an account with a generated id and hashed password.
    pub fn new(username: impl Into<String>, password: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: hash_password(password),
            role,
        }
    }

    /// Returns whether `password` matches the stored digest.
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash == hash_password(password)
    }
}

/// Derives the stored password digest.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
