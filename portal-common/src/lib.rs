//! # Speaker Portal Common Library
//!
//! Shared code for the speaker portal server and its tooling:
//! - Database schema, initialization and row models
//! - Event types (PortalEvent enum) and the event bus
//! - Admin key handling
//! - Configuration loading
//! - Slug generation for speaker-facing URLs

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod slug;
pub mod sse;

pub use error::{Error, Result};
pub use slug::{slugify, unique_slug};
