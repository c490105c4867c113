//! Shared HTTP API functionality
//!
//! This module contains ONLY pure functions and database operations; the
//! server wraps them with axum middleware.

pub mod auth;

pub use auth::{
    constant_time_eq, generate_admin_key, hash_admin_key, initialize_admin_key,
    load_admin_key_digest, verify_admin_key, AdminAuthError, AdminKeySetup,
};
