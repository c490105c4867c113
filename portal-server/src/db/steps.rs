//! Per-step submission rows
//!
//! Each speaker form step owns one row per session; saving a step replaces it.

use chrono::Utc;
use portal_common::db::{
    ConsentRecord, FieldCategory, FieldResponses, HonorariumInfo, ResponseMap,
    TransportationInfo, TransportationRules,
};
use portal_common::Result;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::collections::BTreeMap;

// ============================================================================
// Honorarium
// ============================================================================

#[derive(Debug, Clone)]
pub struct HonorariumInput {
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
    pub id_number: Option<String>,
    pub tax_type: Option<String>,
}

pub async fn get_honorarium(db: &SqlitePool, session_id: &str) -> Result<Option<HonorariumInfo>> {
    let row = sqlx::query_as::<_, HonorariumInfo>(
        "SELECT * FROM honorarium_info WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn save_honorarium(
    db: &SqlitePool,
    session_id: &str,
    input: &HonorariumInput,
) -> Result<HonorariumInfo> {
    sqlx::query(
        r#"
        INSERT INTO honorarium_info (session_id, bank_name, account_holder, account_number,
                                     id_number, tax_type, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            bank_name = excluded.bank_name,
            account_holder = excluded.account_holder,
            account_number = excluded.account_number,
            id_number = excluded.id_number,
            tax_type = excluded.tax_type,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(session_id)
    .bind(&input.bank_name)
    .bind(&input.account_holder)
    .bind(&input.account_number)
    .bind(&input.id_number)
    .bind(&input.tax_type)
    .bind(Utc::now())
    .execute(db)
    .await?;

    get_honorarium(db, session_id)
        .await?
        .ok_or_else(|| portal_common::Error::Internal("honorarium row missing after save".into()))
}

// ============================================================================
// Transportation
// ============================================================================

#[derive(Debug, Clone)]
pub struct TransportationInput {
    pub mode: String,
    pub departure_location: Option<String>,
    pub return_location: Option<String>,
    pub needs_parking: bool,
    pub requested_amount: Option<i64>,
    pub notes: Option<String>,
}

pub async fn get_transportation(
    db: &SqlitePool,
    session_id: &str,
) -> Result<Option<TransportationInfo>> {
    let row = sqlx::query_as::<_, TransportationInfo>(
        "SELECT * FROM transportation_info WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn save_transportation(
    db: &SqlitePool,
    session_id: &str,
    input: &TransportationInput,
) -> Result<TransportationInfo> {
    sqlx::query(
        r#"
        INSERT INTO transportation_info (session_id, mode, departure_location, return_location,
                                         needs_parking, requested_amount, notes, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            mode = excluded.mode,
            departure_location = excluded.departure_location,
            return_location = excluded.return_location,
            needs_parking = excluded.needs_parking,
            requested_amount = excluded.requested_amount,
            notes = excluded.notes,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(session_id)
    .bind(&input.mode)
    .bind(&input.departure_location)
    .bind(&input.return_location)
    .bind(input.needs_parking)
    .bind(input.requested_amount)
    .bind(&input.notes)
    .bind(Utc::now())
    .execute(db)
    .await?;

    get_transportation(db, session_id).await?.ok_or_else(|| {
        portal_common::Error::Internal("transportation row missing after save".into())
    })
}

pub async fn get_transportation_rules(
    db: &SqlitePool,
    project_id: &str,
) -> Result<Option<TransportationRules>> {
    let row: Option<(Json<TransportationRules>,)> =
        sqlx::query_as("SELECT rules_json FROM transportation_rules WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(db)
            .await?;
    Ok(row.map(|(Json(rules),)| rules))
}

pub async fn save_transportation_rules(
    db: &SqlitePool,
    project_id: &str,
    rules: &TransportationRules,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transportation_rules (project_id, rules_json, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(project_id) DO UPDATE SET
            rules_json = excluded.rules_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(project_id)
    .bind(Json(rules))
    .bind(Utc::now())
    .execute(db)
    .await?;
    Ok(())
}

// ============================================================================
// Presentation / attendance answers
// ============================================================================

pub async fn get_responses(
    db: &SqlitePool,
    session_id: &str,
    category: FieldCategory,
) -> Result<Option<FieldResponses>> {
    let row = sqlx::query_as::<_, FieldResponses>(
        "SELECT * FROM field_responses WHERE session_id = ? AND category = ?",
    )
    .bind(session_id)
    .bind(category)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn save_responses(
    db: &SqlitePool,
    session_id: &str,
    category: FieldCategory,
    responses: &ResponseMap,
) -> Result<FieldResponses> {
    sqlx::query(
        r#"
        INSERT INTO field_responses (session_id, category, responses_json, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(session_id, category) DO UPDATE SET
            responses_json = excluded.responses_json,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(session_id)
    .bind(category)
    .bind(Json(responses))
    .bind(Utc::now())
    .execute(db)
    .await?;

    get_responses(db, session_id, category)
        .await?
        .ok_or_else(|| portal_common::Error::Internal("responses row missing after save".into()))
}

// ============================================================================
// Consent
// ============================================================================

pub async fn get_consent(db: &SqlitePool, session_id: &str) -> Result<Option<ConsentRecord>> {
    let row = sqlx::query_as::<_, ConsentRecord>(
        "SELECT * FROM consent_records WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn save_consent(
    db: &SqlitePool,
    session_id: &str,
    responses: &BTreeMap<String, bool>,
    signature_data: &str,
) -> Result<ConsentRecord> {
    sqlx::query(
        r#"
        INSERT INTO consent_records (session_id, responses_json, signature_data, signed_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(session_id) DO UPDATE SET
            responses_json = excluded.responses_json,
            signature_data = excluded.signature_data,
            signed_at = excluded.signed_at
        "#,
    )
    .bind(session_id)
    .bind(Json(responses))
    .bind(signature_data)
    .bind(Utc::now())
    .execute(db)
    .await?;

    get_consent(db, session_id)
        .await?
        .ok_or_else(|| portal_common::Error::Internal("consent row missing after save".into()))
}

// ============================================================================
// Completion
// ============================================================================

/// Which steps a session has saved
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StepCompletion {
    pub profile: bool,
    pub honorarium: bool,
    pub transportation: bool,
    pub presentation: bool,
    pub files: bool,
    pub consent: bool,
    pub attendance: bool,
}

pub async fn completion(db: &SqlitePool, session_id: &str) -> Result<StepCompletion> {
    let row: (bool, bool, bool, bool, bool, bool, bool) = sqlx::query_as(
        r#"
        SELECT
            EXISTS(SELECT 1 FROM speaker_sessions
                   WHERE id = ?1 AND phone IS NOT NULL AND organization IS NOT NULL),
            EXISTS(SELECT 1 FROM honorarium_info WHERE session_id = ?1),
            EXISTS(SELECT 1 FROM transportation_info WHERE session_id = ?1),
            EXISTS(SELECT 1 FROM field_responses WHERE session_id = ?1 AND category = 'presentation'),
            EXISTS(SELECT 1 FROM presentation_files WHERE session_id = ?1),
            EXISTS(SELECT 1 FROM consent_records WHERE session_id = ?1),
            EXISTS(SELECT 1 FROM field_responses WHERE session_id = ?1 AND category = 'attendance')
        "#,
    )
    .bind(session_id)
    .fetch_one(db)
    .await?;

    Ok(StepCompletion {
        profile: row.0,
        honorarium: row.1,
        transportation: row.2,
        presentation: row.3,
        files: row.4,
        consent: row.5,
        attendance: row.6,
    })
}
