//! Input validation for speaker form steps
//!
//! Every check returns a human-readable message; handlers turn it into a 400.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use portal_common::db::{FieldType, ProjectField, ResponseMap, TransportationRules};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static ACCOUNT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9][0-9-]*[0-9]$|^[0-9]$").expect("valid account regex"));

/// Trim and lowercase an email, rejecting anything that is not `local@domain.tld`
pub fn normalize_email(raw: &str) -> Result<String, String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err("email is required".to_string());
    }
    if !EMAIL.is_match(&email) {
        return Err(format!("invalid email address: {}", raw.trim()));
    }
    Ok(email)
}

/// Trimmed value, or an error naming the field when blank
pub fn require_text(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(value.to_string())
}

/// Trimmed optional value; blanks become None
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Digits and hyphens only, starting and ending with a digit
pub fn validate_account_number(value: &str) -> Result<String, String> {
    let value = value.trim();
    if !ACCOUNT_NUMBER.is_match(value) {
        return Err("account_number may contain only digits and hyphens".to_string());
    }
    Ok(value.to_string())
}

/// Check a transportation request against the project's rules
///
/// Without rules any mode is accepted.
pub fn validate_transportation(
    rules: Option<&TransportationRules>,
    mode: &str,
    requested_amount: Option<i64>,
) -> Result<(), String> {
    if let Some(amount) = requested_amount {
        if amount < 0 {
            return Err("requested_amount must not be negative".to_string());
        }
    }

    let Some(rules) = rules.filter(|r| !r.modes.is_empty()) else {
        return Ok(());
    };

    let rule = rules
        .rule_for(mode)
        .ok_or_else(|| format!("transportation mode '{}' is not allowed", mode))?;

    match (rule.max_amount, requested_amount) {
        (Some(max), Some(amount)) if amount > max => Err(format!(
            "requested_amount {} exceeds the {} limit for '{}'",
            amount, max, mode
        )),
        _ => Ok(()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(b) => !b,
        _ => false,
    }
}

fn check_value(field: &ProjectField, value: &Value) -> Result<(), String> {
    let key = &field.field_key;
    match field.field_type {
        FieldType::Checkbox => {
            if !value.is_boolean() {
                return Err(format!("{} must be true or false", key));
            }
        }
        FieldType::Select => {
            let choice = value
                .as_str()
                .ok_or_else(|| format!("{} must be one of the listed options", key))?;
            if !field.options.iter().any(|o| o == choice) {
                return Err(format!("'{}' is not an option for {}", choice, key));
            }
        }
        FieldType::Date => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("{} must be a date", key))?;
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map_err(|_| format!("{} must be a YYYY-MM-DD date", key))?;
        }
        FieldType::Text | FieldType::Textarea | FieldType::File => {
            if !value.is_string() {
                return Err(format!("{} must be text", key));
            }
        }
    }
    Ok(())
}

/// Validate presentation or attendance answers against the field definitions
///
/// Unknown keys are rejected, required fields must be non-blank, and
/// non-blank values must match the field type. Blank optional answers are
/// dropped from the returned map.
pub fn validate_responses(fields: &[ProjectField], responses: &ResponseMap) -> Result<ResponseMap, String> {
    if let Some(unknown) = responses
        .keys()
        .find(|key| !fields.iter().any(|f| &f.field_key == *key))
    {
        return Err(format!("unknown field: {}", unknown));
    }

    let mut cleaned = ResponseMap::new();
    for field in fields {
        match responses.get(&field.field_key) {
            Some(value) if !is_blank(value) || value.is_boolean() => {
                check_value(field, value)?;
                if field.required && is_blank(value) {
                    return Err(format!("{} is required", field.label));
                }
                cleaned.insert(field.field_key.clone(), value.clone());
            }
            _ if field.required => return Err(format!("{} is required", field.label)),
            _ => {}
        }
    }

    Ok(cleaned)
}

/// Validate consent answers and signature
///
/// Every required consent field must be accepted. Returns the answers for
/// known fields with missing optional ones recorded as `false`.
pub fn validate_consent(
    fields: &[ProjectField],
    responses: &BTreeMap<String, bool>,
    signature: &str,
) -> Result<BTreeMap<String, bool>, String> {
    if let Some(unknown) = responses
        .keys()
        .find(|key| !fields.iter().any(|f| &f.field_key == *key))
    {
        return Err(format!("unknown consent item: {}", unknown));
    }

    let mut accepted = BTreeMap::new();
    for field in fields {
        let value = responses.get(&field.field_key).copied().unwrap_or(false);
        if field.required && !value {
            return Err(format!("consent required: {}", field.label));
        }
        accepted.insert(field.field_key.clone(), value);
    }

    if signature.trim().is_empty() {
        return Err("signature is required".to_string());
    }

    Ok(accepted)
}

/// An upload's `field_key` must name a file field of the project
pub fn validate_file_field_key(fields: &[ProjectField], key: &str) -> Result<(), String> {
    match fields.iter().find(|f| f.field_key == key) {
        Some(f) if f.field_type == FieldType::File => Ok(()),
        Some(_) => Err(format!("field '{}' does not accept files", key)),
        None => Err(format!("unknown field '{}'", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_common::db::{FieldCategory, TransportationModeRule};
    use serde_json::json;
    use sqlx::types::Json;

    fn field(key: &str, field_type: FieldType, required: bool, options: &[&str]) -> ProjectField {
        ProjectField {
            id: format!("id-{}", key),
            project_id: "p".to_string(),
            category: FieldCategory::Presentation,
            field_key: key.to_string(),
            label: key.to_uppercase(),
            field_type,
            options: Json(options.iter().map(|o| o.to_string()).collect()),
            required,
            sort_order: 0,
        }
    }

    fn answers(value: Value) -> ResponseMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Lee@Example.org ").unwrap(), "lee@example.org");
        assert!(normalize_email("").is_err());
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("a@b").is_err());
        assert!(normalize_email("a b@c.com").is_err());
    }

    #[test]
    fn test_account_number() {
        assert_eq!(validate_account_number(" 123-45-6789 ").unwrap(), "123-45-6789");
        assert!(validate_account_number("7").is_ok());
        assert!(validate_account_number("12a4").is_err());
        assert!(validate_account_number("-123").is_err());
        assert!(validate_account_number("").is_err());
    }

    #[test]
    fn test_transportation_rules() {
        let rules = TransportationRules {
            modes: vec![
                TransportationModeRule {
                    mode: "ktx".to_string(),
                    label: None,
                    max_amount: Some(60000),
                },
                TransportationModeRule {
                    mode: "car".to_string(),
                    label: None,
                    max_amount: None,
                },
            ],
        };

        assert!(validate_transportation(Some(&rules), "ktx", Some(60000)).is_ok());
        assert!(validate_transportation(Some(&rules), "ktx", Some(60001)).is_err());
        assert!(validate_transportation(Some(&rules), "car", Some(1_000_000)).is_ok());
        assert!(validate_transportation(Some(&rules), "flight", None).is_err());
        assert!(validate_transportation(None, "anything", Some(5)).is_ok());
        assert!(validate_transportation(None, "anything", Some(-5)).is_err());
    }

    #[test]
    fn test_required_and_select() {
        let fields = vec![
            field("title", FieldType::Text, true, &[]),
            field("track", FieldType::Select, false, &["A", "B"]),
        ];

        assert!(validate_responses(&fields, &answers(json!({"track": "A"}))).is_err());
        assert!(validate_responses(&fields, &answers(json!({"title": "  "}))).is_err());
        assert!(
            validate_responses(&fields, &answers(json!({"title": "Talk", "track": "C"}))).is_err()
        );

        let ok = validate_responses(&fields, &answers(json!({"title": "Talk", "track": ""}))).unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok["title"], json!("Talk"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let fields = vec![field("title", FieldType::Text, false, &[])];
        let err = validate_responses(&fields, &answers(json!({"other": "x"}))).unwrap_err();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn test_date_and_checkbox() {
        let fields = vec![
            field("day", FieldType::Date, false, &[]),
            field("dinner", FieldType::Checkbox, false, &[]),
        ];

        assert!(validate_responses(&fields, &answers(json!({"day": "2025-11-31"}))).is_err());
        assert!(validate_responses(&fields, &answers(json!({"dinner": "yes"}))).is_err());

        let ok =
            validate_responses(&fields, &answers(json!({"day": "2025-11-03", "dinner": false})))
                .unwrap();
        assert_eq!(ok["dinner"], json!(false));
    }

    #[test]
    fn test_required_checkbox_must_be_checked() {
        let fields = vec![field("attend", FieldType::Checkbox, true, &[])];
        assert!(validate_responses(&fields, &answers(json!({"attend": false}))).is_err());
        assert!(validate_responses(&fields, &answers(json!({"attend": true}))).is_ok());
    }

    #[test]
    fn test_consent() {
        let fields = vec![
            field("privacy", FieldType::Checkbox, true, &[]),
            field("photo", FieldType::Checkbox, false, &[]),
        ];
        let mut responses = BTreeMap::new();
        responses.insert("privacy".to_string(), true);

        let accepted = validate_consent(&fields, &responses, "Kim").unwrap();
        assert_eq!(accepted.get("photo"), Some(&false));

        assert!(validate_consent(&fields, &responses, "   ").is_err());

        responses.insert("privacy".to_string(), false);
        assert!(validate_consent(&fields, &responses, "Kim").is_err());
    }

    #[test]
    fn test_file_field_key() {
        let fields = vec![
            field("slides", FieldType::File, false, &[]),
            field("title", FieldType::Text, true, &[]),
        ];
        assert!(validate_file_field_key(&fields, "slides").is_ok());
        assert!(validate_file_field_key(&fields, "title")
            .unwrap_err()
            .contains("does not accept files"));
        assert!(validate_file_field_key(&fields, "photo")
            .unwrap_err()
            .contains("unknown field"));
    }
}
