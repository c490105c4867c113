//! Row-change webhook payloads
//!
//! The external datastore posts `{ type, table, record, old_record }` on every
//! insert, update or delete. Only identifiers are read.

use serde::Deserialize;
use serde_json::Value;

use crate::external::id_to_string;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    /// INSERT, UPDATE or DELETE
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub record: Option<Value>,
    #[serde(default)]
    pub old_record: Option<Value>,
}

/// What a webhook asks the portal to resync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookTarget {
    /// One external project (and its speakers)
    Project(String),
    /// Only the speaker roster of one external project
    SpeakersOf(String),
    /// No usable identifier: resync every project
    Everything,
}

impl WebhookPayload {
    fn is_speaker_table(&self) -> bool {
        self.table
            .as_deref()
            .map(|t| {
                let t = t.rsplit('.').next().unwrap_or(t);
                t.eq_ignore_ascii_case("speakers") || t.eq_ignore_ascii_case("speaker")
            })
            .unwrap_or(false)
    }

    /// First identifier found under `key` in `record`, then `old_record`
    fn read_id(&self, key: &str) -> Option<String> {
        [&self.record, &self.old_record]
            .into_iter()
            .flatten()
            .filter_map(|row| row.get(key))
            .find_map(id_to_string)
    }

    pub fn target(&self) -> WebhookTarget {
        if self.is_speaker_table() {
            return match self.read_id("project_id") {
                Some(project_id) => WebhookTarget::SpeakersOf(project_id),
                None => WebhookTarget::Everything,
            };
        }

        match self.read_id("id") {
            Some(id) => WebhookTarget::Project(id),
            None => WebhookTarget::Everything,
        }
    }
}
