//! External datastore access
//!
//! The external backend-as-a-service instance is a read source for project
//! and speaker rosters. [`ExternalDirectory`] is the seam the sync engine
//! depends on; [`RestDirectoryClient`] talks to the real instance.

mod rest;

pub use rest::RestDirectoryClient;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// External directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("External datastore is not configured")]
    NotConfigured,
}

/// Project row as stored in the external datastore
///
/// Different external tables name the title `title`, `project_name` or
/// `event_name`; all three are accepted.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ExternalProject {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Speaker row as stored in the external datastore
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ExternalSpeaker {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub project_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
}

/// A returned row that could not be decoded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    /// Identifier as sent, when one could be read
    pub id: Option<String>,
    pub message: String,
}

/// Rows from one listing; undecodable rows are kept apart instead of failing the call
#[derive(Debug, Clone)]
pub struct RowBatch<T> {
    pub rows: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T: DeserializeOwned> RowBatch<T> {
    /// Decode each element on its own
    pub fn decode(values: Vec<Value>) -> Self {
        let mut rows = Vec::with_capacity(values.len());
        let mut rejected = Vec::new();

        for value in values {
            let id = value.get("id").and_then(id_to_string);
            match serde_json::from_value::<T>(value) {
                Ok(row) => rows.push(row),
                Err(e) => rejected.push(RejectedRow {
                    id,
                    message: format!("malformed row: {}", e),
                }),
            }
        }

        Self { rows, rejected }
    }
}

/// Read access to the external project/speaker roster
#[async_trait]
pub trait ExternalDirectory: Send + Sync {
    /// Every project row
    async fn list_projects(&self) -> Result<RowBatch<ExternalProject>, DirectoryError>;

    /// One project row; None when the id is unknown
    async fn get_project(&self, id: &str) -> Result<Option<ExternalProject>, DirectoryError>;

    /// Speakers belonging to one external project
    async fn list_speakers(
        &self,
        project_id: &str,
    ) -> Result<RowBatch<ExternalSpeaker>, DirectoryError>;
}

/// Render a JSON identifier (string or number) as a string
///
/// Returns None for null, blank strings and non-scalar values.
pub fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier: {}", value)))
}
