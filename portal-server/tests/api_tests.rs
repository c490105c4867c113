//! Integration tests for portal-server API endpoints
//!
//! Tests cover:
//! - Health endpoint (no auth required)
//! - Speaker session creation and form steps
//! - Validation rejections
//! - Admin key enforcement and admin CRUD
//! - File upload, listing, download and delete
//! - Sync endpoints and the webhook secret

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use helpers::{external_project, external_speaker, setup_db, InMemoryDirectory};
use portal_common::api::auth::hash_admin_key;
use portal_common::db::Project;
use portal_common::events::EventBus;
use portal_server::db::projects::{self, ProjectFields};
use portal_server::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const ADMIN_KEY: &str = "test-admin-key";
const WEBHOOK_SECRET: &str = "hook-secret";

struct TestApp {
    app: Router,
    db: SqlitePool,
    // Keeps the upload directory alive for the test
    _uploads: TempDir,
}

async fn setup_app_with(directory: Option<Arc<InMemoryDirectory>>) -> TestApp {
    let db = setup_db().await;
    let uploads = tempfile::tempdir().expect("Should create temp dir");

    let mut state = AppState::new(db.clone(), EventBus::new(64), uploads.path())
        .with_admin_key_digest(Some(hash_admin_key(ADMIN_KEY)))
        .with_webhook_secret(Some(WEBHOOK_SECRET.to_string()))
        .with_max_upload_bytes(1024);
    if let Some(directory) = directory {
        state = state.with_directory(directory);
    }

    TestApp {
        app: build_router(state),
        db,
        _uploads: uploads,
    }
}

async fn setup_app() -> TestApp {
    setup_app_with(None).await
}

async fn seed_project(db: &SqlitePool, slug: &str) -> Project {
    let fields = ProjectFields {
        title: format!("Project {}", slug),
        description: "Annual meetup".to_string(),
        event_date: Some("2025-11-03".to_string()),
        venue: Some("Seoul".to_string()),
    };
    projects::insert(db, slug, &fields, None).await.unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn as_admin(mut request: Request<Body>) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-admin-key", ADMIN_KEY.parse().unwrap());
    request
}

/// Send a request and decode the JSON body (Null for empty bodies)
async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn create_session(app: &Router, slug: &str, email: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            &format!("/api/projects/{}/session", slug),
            json!({"name": "Kim Minsu", "email": email}),
        ),
    )
    .await;
    assert!(status.is_success(), "session creation failed: {}", body);
    body["session"]["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let t = setup_app().await;
    let (status, body) = send(&t.app, empty_request("GET", "/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "portal-server");
    assert_eq!(body["external_configured"], false);
}

// =============================================================================
// Speaker sessions
// =============================================================================

#[tokio::test]
async fn test_session_created_once_per_email() {
    let t = setup_app().await;
    seed_project(&t.db, "devconf").await;

    let uri = "/api/projects/devconf/session";
    let (status, first) = send(
        &t.app,
        json_request("POST", uri, json!({"name": "Kim", "email": " Kim@Example.com "})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["created"], true);
    assert_eq!(first["session"]["email"], "kim@example.com");
    assert_eq!(first["project"]["slug"], "devconf");

    let (status, second) = send(
        &t.app,
        json_request("POST", uri, json!({"name": "Kim", "email": "kim@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created"], false);
    assert_eq!(second["session"]["id"], first["session"]["id"]);
}

#[tokio::test]
async fn test_session_rejections() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;

    let (status, body) = send(
        &t.app,
        json_request(
            "POST",
            "/api/projects/devconf/session",
            json!({"name": "Kim", "email": "not-an-email"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            "/api/projects/devconf/session",
            json!({"name": "  ", "email": "kim@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        json_request(
            "POST",
            "/api/projects/nope/session",
            json!({"name": "Kim", "email": "kim@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let deactivate = projects::ProjectUpdate {
        is_active: Some(false),
        ..Default::default()
    };
    projects::update(&t.db, &project.id, &deactivate).await.unwrap();
    let (status, _) = send(&t.app, empty_request("GET", "/api/projects/devconf")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Form steps
// =============================================================================

#[tokio::test]
async fn test_profile_step_updates_completion() {
    let t = setup_app().await;
    seed_project(&t.db, "devconf").await;
    let id = create_session(&t.app, "devconf", "kim@example.com").await;

    let (status, body) = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/sessions/{}/profile", id),
            json!({
                "name": "Kim Minsu",
                "phone": "010-0000-1111",
                "organization": "KAIST",
                "job_title": "  ",
                "bio": "Compilers"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["organization"], "KAIST");
    assert_eq!(body["job_title"], Value::Null);

    let (_, session) = send(&t.app, empty_request("GET", &format!("/api/sessions/{}", id))).await;
    assert_eq!(session["completion"]["profile"], true);
    assert_eq!(session["completion"]["honorarium"], false);
}

#[tokio::test]
async fn test_honorarium_validation_and_masking() {
    let t = setup_app().await;
    seed_project(&t.db, "devconf").await;
    let id = create_session(&t.app, "devconf", "kim@example.com").await;
    let uri = format!("/api/sessions/{}/honorarium", id);

    let (status, _) = send(
        &t.app,
        json_request(
            "PUT",
            &uri,
            json!({"bank_name": "KB", "account_holder": "Kim", "account_number": "12-34ab"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, saved) = send(
        &t.app,
        json_request(
            "PUT",
            &uri,
            json!({
                "bank_name": "KB",
                "account_holder": "Kim",
                "account_number": "123-456-789012",
                "id_number": "900101-1234567"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["account_number"], "123-456-789012");

    let (_, detail) = send(
        &t.app,
        as_admin(empty_request("GET", &format!("/api/admin/sessions/{}", id))),
    )
    .await;
    assert_eq!(detail["honorarium"]["account_number"], "********9012");
    assert_eq!(detail["honorarium"]["id_number"], "******");
    assert_eq!(detail["completion"]["honorarium"], true);
}

#[tokio::test]
async fn test_transportation_respects_rules() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;
    let id = create_session(&t.app, "devconf", "kim@example.com").await;

    let (status, _) = send(
        &t.app,
        as_admin(json_request(
            "PUT",
            &format!("/api/admin/projects/{}/transportation-rules", project.id),
            json!({"modes": [
                {"mode": "ktx", "label": "KTX", "max_amount": 60000},
                {"mode": "car"}
            ]}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/sessions/{}/transportation", id);
    let (status, body) = send(&t.app, json_request("PUT", &uri, json!({"mode": "flight"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("not allowed"));

    let (status, _) = send(
        &t.app,
        json_request("PUT", &uri, json!({"mode": "ktx", "requested_amount": 70000})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, saved) = send(
        &t.app,
        json_request(
            "PUT",
            &uri,
            json!({"mode": "ktx", "requested_amount": 59800, "departure_location": "Busan"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["requested_amount"], 59800);
    assert_eq!(saved["needs_parking"], false);

    let (_, stored) = send(&t.app, empty_request("GET", &uri)).await;
    assert_eq!(stored["departure_location"], "Busan");
}

#[tokio::test]
async fn test_presentation_answers_validated_against_fields() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;
    let id = create_session(&t.app, "devconf", "kim@example.com").await;

    let fields_uri = format!("/api/admin/projects/{}/fields", project.id);
    for field in [
        json!({"category": "presentation", "field_key": "talk_title", "label": "Talk title",
               "field_type": "text", "required": true, "sort_order": 1}),
        json!({"category": "presentation", "field_key": "track", "label": "Track",
               "field_type": "select", "options": ["Systems", "Web"], "sort_order": 2}),
    ] {
        let (status, _) = send(&t.app, as_admin(json_request("POST", &fields_uri, field))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, view) = send(&t.app, empty_request("GET", "/api/projects/devconf")).await;
    assert_eq!(view["presentation_fields"].as_array().unwrap().len(), 2);
    assert_eq!(view["presentation_fields"][0]["field_key"], "talk_title");

    let uri = format!("/api/sessions/{}/presentation", id);
    let (status, _) = send(
        &t.app,
        json_request("PUT", &uri, json!({"responses": {"track": "Web"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        json_request(
            "PUT",
            &uri,
            json!({"responses": {"talk_title": "Lifetimes", "track": "Mobile"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, saved) = send(
        &t.app,
        json_request(
            "PUT",
            &uri,
            json!({"responses": {"talk_title": "Lifetimes", "track": "Systems"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["responses"]["track"], "Systems");
    assert_eq!(saved["category"], "presentation");

    // Attendance has no fields defined, so any answer key is unknown
    let (status, _) = send(
        &t.app,
        json_request(
            "PUT",
            &format!("/api/sessions/{}/attendance", id),
            json!({"responses": {"talk_title": "x"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_consent_requires_required_items_and_signature() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;
    let id = create_session(&t.app, "devconf", "kim@example.com").await;

    let (status, _) = send(
        &t.app,
        as_admin(json_request(
            "POST",
            &format!("/api/admin/projects/{}/fields", project.id),
            json!({"category": "consent", "field_key": "privacy", "label": "Privacy policy",
                   "field_type": "checkbox", "required": true}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/sessions/{}/consent", id);
    let (status, _) = send(
        &t.app,
        json_request(
            "PUT",
            &uri,
            json!({"responses": {"privacy": false}, "signature_data": "Kim"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        json_request("PUT", &uri, json!({"responses": {"privacy": true}, "signature_data": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, saved) = send(
        &t.app,
        json_request(
            "PUT",
            &uri,
            json!({"responses": {"privacy": true}, "signature_data": "data:image/png;base64,AAAA"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["responses"]["privacy"], true);
    assert!(saved["signed_at"].is_string());
}

// =============================================================================
// Files
// =============================================================================

fn multipart_request(uri: &str, file_name: &str, content: &str) -> Request<Body> {
    let boundary = "portal-test-boundary";
    let body = format!(
        "--{b}\r\n\
         Content-Disposition: form-data; name=\"field_key\"\r\n\r\n\
         slides\r\n\
         --{b}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
         Content-Type: application/pdf\r\n\r\n\
         {content}\r\n\
         --{b}--\r\n",
        b = boundary,
        name = file_name,
        content = content,
    );

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn add_file_field(app: &Router, project_id: &str, key: &str) {
    let (status, _) = send(
        app,
        as_admin(json_request(
            "POST",
            &format!("/api/admin/projects/{}/fields", project_id),
            json!({"category": "presentation", "field_key": key, "label": "Slides",
                   "field_type": "file"}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_file_upload_lifecycle() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;
    add_file_field(&t.app, &project.id, "slides").await;
    let id = create_session(&t.app, "devconf", "kim@example.com").await;
    let files_uri = format!("/api/sessions/{}/files", id);

    let (status, uploaded) = send(
        &t.app,
        multipart_request(&files_uri, "my talk.pdf", "%PDF-1.4 slides"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "upload failed: {}", uploaded);
    assert_eq!(uploaded["original_name"], "my talk.pdf");
    assert_eq!(uploaded["field_key"], "slides");
    assert_eq!(uploaded["size_bytes"], 15);
    assert!(uploaded.get("stored_path").is_none());
    let file_id = uploaded["id"].as_str().unwrap().to_string();

    let (_, listed) = send(&t.app, empty_request("GET", &files_uri)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, project_files) = send(
        &t.app,
        as_admin(empty_request(
            "GET",
            &format!("/api/admin/projects/{}/files", project.id),
        )),
    )
    .await;
    assert_eq!(project_files.as_array().unwrap().len(), 1);

    let response = t
        .app
        .clone()
        .oneshot(as_admin(empty_request(
            "GET",
            &format!("/api/admin/files/{}", file_id),
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4 slides");

    let (status, _) = send(
        &t.app,
        empty_request("DELETE", &format!("{}/{}", files_uri, file_id)),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = send(&t.app, empty_request("GET", &files_uri)).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_field_key_must_name_a_file_field() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;
    let id = create_session(&t.app, "devconf", "kim@example.com").await;
    let files_uri = format!("/api/sessions/{}/files", id);

    // No field named "slides" yet
    let (status, body) =
        send(&t.app, multipart_request(&files_uri, "talk.pdf", "%PDF-1.4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("unknown field"));

    let (status, _) = send(
        &t.app,
        as_admin(json_request(
            "POST",
            &format!("/api/admin/projects/{}/fields", project.id),
            json!({"category": "presentation", "field_key": "slides", "label": "Slides",
                   "field_type": "text"}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) =
        send(&t.app, multipart_request(&files_uri, "talk.pdf", "%PDF-1.4")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("does not accept files"));

    let (_, listed) = send(&t.app, empty_request("GET", &files_uri)).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;
    add_file_field(&t.app, &project.id, "slides").await;
    let id = create_session(&t.app, "devconf", "kim@example.com").await;

    let too_big = "x".repeat(2048);
    let (status, _) = send(
        &t.app,
        multipart_request(&format!("/api/sessions/{}/files", id), "big.pdf", &too_big),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_key_enforced() {
    let t = setup_app().await;

    let (status, body) = send(&t.app, empty_request("GET", "/api/admin/projects")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let mut wrong = empty_request("GET", "/api/admin/projects");
    wrong
        .headers_mut()
        .insert("x-admin-key", "guess".parse().unwrap());
    let (status, _) = send(&t.app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&t.app, as_admin(empty_request("GET", "/api/admin/projects"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_admin_project_crud() {
    let t = setup_app().await;

    let (status, created) = send(
        &t.app,
        as_admin(json_request(
            "POST",
            "/api/admin/projects",
            json!({"title": "Rust Korea 2025", "venue": "Pangyo"}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["slug"], "rust-korea-2025");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, second) = send(
        &t.app,
        as_admin(json_request(
            "POST",
            "/api/admin/projects",
            json!({"title": "Rust Korea 2025"}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["slug"], "rust-korea-2025-2");

    let (status, _) = send(
        &t.app,
        as_admin(json_request(
            "POST",
            "/api/admin/projects",
            json!({"title": "Other", "slug": "rust-korea-2025"}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, updated) = send(
        &t.app,
        as_admin(json_request(
            "PUT",
            &format!("/api/admin/projects/{}", id),
            json!({"title": "Rust Korea", "is_active": false}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Rust Korea");
    assert_eq!(updated["slug"], "rust-korea-2025");
    assert_eq!(updated["venue"], "Pangyo");
    assert_eq!(updated["is_active"], false);

    let (status, _) = send(
        &t.app,
        as_admin(empty_request("DELETE", &format!("/api/admin/projects/{}", id))),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &t.app,
        as_admin(empty_request("GET", &format!("/api/admin/projects/{}", id))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_field_definition_rules() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;
    let uri = format!("/api/admin/projects/{}/fields", project.id);

    let (status, _) = send(
        &t.app,
        as_admin(json_request(
            "POST",
            &uri,
            json!({"category": "presentation", "field_key": "track", "label": "Track",
                   "field_type": "select"}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &t.app,
        as_admin(json_request(
            "POST",
            &uri,
            json!({"category": "presentation", "field_key": "Bad Key", "label": "x",
                   "field_type": "text"}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let field = json!({"category": "attendance", "field_key": "dinner", "label": "Dinner",
                       "field_type": "checkbox"});
    let (status, created) = send(&t.app, as_admin(json_request("POST", &uri, field.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&t.app, as_admin(json_request("POST", &uri, field))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, listed) = send(
        &t.app,
        as_admin(empty_request("GET", &format!("{}?category=attendance", uri))),
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let field_id = created["id"].as_str().unwrap();
    let (status, _) = send(
        &t.app,
        as_admin(empty_request("DELETE", &format!("/api/admin/fields/{}", field_id))),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_arrival_guide_round_trip() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;

    let (_, before) = send(&t.app, empty_request("GET", "/api/projects/devconf/arrival-guide")).await;
    assert_eq!(before, Value::Null);

    let (status, _) = send(
        &t.app,
        as_admin(json_request(
            "PUT",
            &format!("/api/admin/projects/{}/arrival-guide", project.id),
            json!({"content": "Take exit 3", "contact": "010-9999-0000"}),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, guide) = send(&t.app, empty_request("GET", "/api/projects/devconf/arrival-guide")).await;
    assert_eq!(guide["content"], "Take exit 3");
    assert_eq!(guide["map_url"], Value::Null);
}

#[tokio::test]
async fn test_submission_list_paginates() {
    let t = setup_app().await;
    let project = seed_project(&t.db, "devconf").await;
    for n in 0..3 {
        create_session(&t.app, "devconf", &format!("speaker{}@example.com", n)).await;
    }

    let (status, page) = send(
        &t.app,
        as_admin(empty_request(
            "GET",
            &format!("/api/admin/projects/{}/submissions?page=1", project.id),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["pagination"]["total_results"], 3);
    assert_eq!(page["pagination"]["total_pages"], 1);
    assert_eq!(page["submissions"].as_array().unwrap().len(), 3);
    assert_eq!(page["submissions"][0]["completion"]["consent"], false);
}

// =============================================================================
// Sync and webhook
// =============================================================================

#[tokio::test]
async fn test_sync_without_external_datastore_is_bad_gateway() {
    let t = setup_app().await;
    let (status, body) = send(&t.app, as_admin(empty_request("POST", "/api/admin/sync"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "EXTERNAL_ERROR");
}

#[tokio::test]
async fn test_sync_and_external_listing() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.add_project(external_project("1", "Synced Conf"));
    directory.add_project(external_project("2", "Later Conf"));
    directory.add_speaker(external_speaker("s1", "1", "Kim", "kim@example.com"));
    let t = setup_app_with(Some(directory)).await;

    let (status, report) = send(
        &t.app,
        as_admin(json_request("POST", "/api/admin/import", json!({"external_ids": ["1"]}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["projects_inserted"], 1);
    assert_eq!(report["speakers_inserted"], 1);
    assert_eq!(report["trigger"], "import");

    let (_, listed) = send(
        &t.app,
        as_admin(empty_request("GET", "/api/admin/external/projects")),
    )
    .await;
    let rows = listed.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["imported"], true);
    assert_eq!(rows[0]["local_slug"], "synced-conf");
    assert_eq!(rows[1]["imported"], false);

    let local = projects::get_by_external_id(&t.db, "1").await.unwrap().unwrap();
    let (status, report) = send(
        &t.app,
        as_admin(empty_request("POST", &format!("/api/admin/projects/{}/sync", local.id))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["projects_updated"], 1);

    let (_, runs) = send(&t.app, as_admin(empty_request("GET", "/api/admin/sync/runs"))).await;
    assert_eq!(runs.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_local_project_cannot_be_synced() {
    let directory = Arc::new(InMemoryDirectory::new());
    let t = setup_app_with(Some(directory)).await;
    let project = seed_project(&t.db, "local-only").await;

    let (status, _) = send(
        &t.app,
        as_admin(empty_request("POST", &format!("/api/admin/projects/{}/sync", project.id))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_requires_secret() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.add_project(external_project("9", "Hooked"));
    let t = setup_app_with(Some(directory)).await;

    let payload = json!({"type": "INSERT", "table": "projects", "record": {"id": 9}});

    let (status, _) = send(
        &t.app,
        json_request("POST", "/api/webhooks/external", payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = json_request("POST", "/api/webhooks/external", payload);
    request
        .headers_mut()
        .insert("x-webhook-secret", WEBHOOK_SECRET.parse().unwrap());
    let (status, report) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["trigger"], "webhook");
    assert_eq!(report["projects_inserted"], 1);

    let (status, view) = send(&t.app, empty_request("GET", "/api/projects/hooked")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["project"]["title"], "Hooked");
}
