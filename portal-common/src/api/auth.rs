//! Admin key handling
//!
//! The admin console is protected by a single shared key sent in the
//! `x-admin-key` header. Only its SHA-256 digest is stored, under the
//! `admin_key_sha256` setting. An empty stored digest disables the check
//! (development mode).
//!
//! # Pure Functions
//!
//! Hashing and comparison carry no HTTP framework dependencies; the server
//! wraps them in axum middleware.

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// Settings key holding the hex digest
pub const ADMIN_KEY_SETTING: &str = "admin_key_sha256";

// ========================================
// Error Types
// ========================================

#[derive(Debug, Clone)]
pub enum AdminAuthError {
    /// Header missing from request
    MissingKey,

    /// Key does not hash to the stored digest
    InvalidKey,

    /// Database error loading or storing the digest
    DatabaseError(String),
}

impl std::fmt::Display for AdminAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminAuthError::MissingKey => write!(f, "Missing admin key"),
            AdminAuthError::InvalidKey => write!(f, "Invalid admin key"),
            AdminAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
        }
    }
}

impl std::error::Error for AdminAuthError {}

/// Outcome of startup key initialization
#[derive(Debug, Clone, PartialEq)]
pub enum AdminKeySetup {
    /// Key came from configuration and replaced any stored digest
    Configured { digest: String },
    /// A digest was already stored
    Existing { digest: String },
    /// No key anywhere; a new one was generated and must be shown to the operator once
    Generated { key: String, digest: String },
    /// Stored digest is empty: admin routes are open
    Disabled,
}

impl AdminKeySetup {
    /// Digest to enforce, or None when auth is disabled
    pub fn digest(&self) -> Option<String> {
        match self {
            AdminKeySetup::Configured { digest }
            | AdminKeySetup::Existing { digest }
            | AdminKeySetup::Generated { digest, .. } => Some(digest.clone()),
            AdminKeySetup::Disabled => None,
        }
    }
}

// ========================================
// Hashing
// ========================================

/// SHA-256 of the key as 64 lowercase hex characters
pub fn hash_admin_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Random 32-character hex key
pub fn generate_admin_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Compare two strings without short-circuiting on the first difference
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check a provided key against the stored digest
pub fn verify_admin_key(provided: Option<&str>, digest: &str) -> Result<(), AdminAuthError> {
    let provided = provided
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(AdminAuthError::MissingKey)?;

    if constant_time_eq(&hash_admin_key(provided), digest) {
        Ok(())
    } else {
        Err(AdminAuthError::InvalidKey)
    }
}

// ========================================
// Persistence
// ========================================

/// Load the stored digest; None when never initialized
pub async fn load_admin_key_digest(db: &SqlitePool) -> Result<Option<String>, AdminAuthError> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(ADMIN_KEY_SETTING)
            .fetch_optional(db)
            .await
            .map_err(|e| AdminAuthError::DatabaseError(e.to_string()))?;

    Ok(row.and_then(|(value,)| value))
}

async fn store_admin_key_digest(db: &SqlitePool, digest: &str) -> Result<(), AdminAuthError> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(ADMIN_KEY_SETTING)
        .bind(digest)
        .execute(db)
        .await
        .map_err(|e| AdminAuthError::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Resolve the admin key at startup
///
/// A configured key always wins and is re-hashed into the database. Otherwise
/// the stored digest is reused, and a fresh key is generated on first run.
pub async fn initialize_admin_key(
    db: &SqlitePool,
    configured: Option<&str>,
) -> Result<AdminKeySetup, AdminAuthError> {
    if let Some(key) = configured.map(str::trim).filter(|k| !k.is_empty()) {
        let digest = hash_admin_key(key);
        store_admin_key_digest(db, &digest).await?;
        return Ok(AdminKeySetup::Configured { digest });
    }

    match load_admin_key_digest(db).await? {
        Some(digest) if digest.is_empty() => Ok(AdminKeySetup::Disabled),
        Some(digest) => Ok(AdminKeySetup::Existing { digest }),
        None => {
            let key = generate_admin_key();
            let digest = hash_admin_key(&key);
            store_admin_key_digest(db, &digest).await?;
            Ok(AdminKeySetup::Generated { key, digest })
        }
    }
}

// ========================================
// Tests
// ========================================
