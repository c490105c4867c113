//! Database access layer for the portal server
//!
//! One module per table group; every function takes the pool and returns
//! `portal_common::Result`.

pub mod fields;
pub mod files;
pub mod guides;
pub mod projects;
pub mod sessions;
pub mod steps;
pub mod sync_runs;
