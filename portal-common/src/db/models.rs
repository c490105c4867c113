//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A conference or event; either created locally or mirrored from the external datastore
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub event_date: Option<String>,
    pub venue: Option<String>,
    pub external_project_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// One speaker's working record within a project, keyed by email
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpeakerSession {
    pub id: String,
    pub project_id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub organization: Option<String>,
    pub job_title: Option<String>,
    pub bio: Option<String>,
    pub external_speaker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HonorariumInfo {
    pub session_id: String,
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
    pub id_number: Option<String>,
    pub tax_type: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl HonorariumInfo {
    /// Copy with the account number reduced to its last four digits
    pub fn masked(&self) -> Self {
        let digits: Vec<char> = self.account_number.chars().filter(|c| c.is_ascii_digit()).collect();
        let visible: String = digits.iter().skip(digits.len().saturating_sub(4)).collect();
        let hidden = "*".repeat(digits.len().saturating_sub(4));

        Self {
            account_number: format!("{}{}", hidden, visible),
            id_number: self.id_number.as_ref().map(|_| "******".to_string()),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TransportationInfo {
    pub session_id: String,
    pub mode: String,
    pub departure_location: Option<String>,
    pub return_location: Option<String>,
    pub needs_parking: bool,
    pub requested_amount: Option<i64>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Per-project transportation policy
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransportationRules {
    #[serde(default)]
    pub modes: Vec<TransportationModeRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransportationModeRule {
    pub mode: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Reimbursement cap; None means uncapped
    #[serde(default)]
    pub max_amount: Option<i64>,
}

impl TransportationRules {
    pub fn rule_for(&self, mode: &str) -> Option<&TransportationModeRule> {
        self.modes.iter().find(|r| r.mode == mode)
    }
}

/// Which form step a custom field belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FieldCategory {
    Presentation,
    Consent,
    Attendance,
}

impl FieldCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldCategory::Presentation => "presentation",
            FieldCategory::Consent => "consent",
            FieldCategory::Attendance => "attendance",
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "presentation" => Ok(FieldCategory::Presentation),
            "consent" => Ok(FieldCategory::Consent),
            "attendance" => Ok(FieldCategory::Attendance),
            other => Err(Error::InvalidInput(format!("Unknown field category: {}", other))),
        }
    }
}

/// How a custom field is rendered and validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Select,
    Checkbox,
    Date,
    File,
}

/// Admin-defined form field for one project
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectField {
    pub id: String,
    pub project_id: String,
    pub category: FieldCategory,
    pub field_key: String,
    pub label: String,
    pub field_type: FieldType,
    #[sqlx(rename = "options_json")]
    pub options: Json<Vec<String>>,
    pub required: bool,
    pub sort_order: i64,
}

/// Free-form answers keyed by field_key
pub type ResponseMap = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FieldResponses {
    pub session_id: String,
    pub category: FieldCategory,
    #[sqlx(rename = "responses_json")]
    pub responses: Json<ResponseMap>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConsentRecord {
    pub session_id: String,
    #[sqlx(rename = "responses_json")]
    pub responses: Json<BTreeMap<String, bool>>,
    /// Data URL of the drawn signature, or a typed name
    pub signature_data: String,
    pub signed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PresentationFile {
    pub id: String,
    pub session_id: String,
    pub field_key: Option<String>,
    pub original_name: String,
    /// Path relative to the uploads directory
    #[serde(skip_serializing)]
    pub stored_path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArrivalGuide {
    pub project_id: String,
    pub content: String,
    pub venue_address: Option<String>,
    pub map_url: Option<String>,
    pub contact: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// What started a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum SyncTrigger {
    Manual,
    Webhook,
    Import,
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncTrigger::Manual => "manual",
            SyncTrigger::Webhook => "webhook",
            SyncTrigger::Import => "import",
        };
        f.write_str(s)
    }
}

/// Audit row for one sync invocation
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SyncRun {
    pub id: String,
    pub trigger: SyncTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub projects_inserted: i64,
    pub projects_updated: i64,
    pub speakers_inserted: i64,
    pub speakers_updated: i64,
    pub failures: i64,
    #[sqlx(rename = "errors_json")]
    pub errors: Json<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn honorarium(account_number: &str) -> HonorariumInfo {
        HonorariumInfo {
            session_id: "s".to_string(),
            bank_name: "Bank".to_string(),
            account_holder: "Kim".to_string(),
            account_number: account_number.to_string(),
            id_number: Some("900101-1234567".to_string()),
            tax_type: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_masked_keeps_last_four_digits() {
        let masked = honorarium("123-456-789012").masked();
        assert_eq!(masked.account_number, "********9012");
        assert_eq!(masked.id_number.as_deref(), Some("******"));
        assert_eq!(masked.bank_name, "Bank");
    }

    #[test]
    fn test_masked_short_account() {
        assert_eq!(honorarium("12").masked().account_number, "12");
    }

    #[test]
    fn test_field_category_round_trip_through_str() {
        for category in [
            FieldCategory::Presentation,
            FieldCategory::Consent,
            FieldCategory::Attendance,
        ] {
            assert_eq!(category.as_str().parse::<FieldCategory>().unwrap(), category);
        }
        assert!("profile".parse::<FieldCategory>().is_err());
    }

    #[test]
    fn test_transportation_rules_lookup() {
        let rules: TransportationRules = serde_json::from_str(
            r#"{"modes": [{"mode": "ktx", "max_amount": 60000}, {"mode": "car"}]}"#,
        )
        .unwrap();

        assert_eq!(rules.rule_for("ktx").unwrap().max_amount, Some(60000));
        assert_eq!(rules.rule_for("car").unwrap().max_amount, None);
        assert!(rules.rule_for("flight").is_none());
    }
}
