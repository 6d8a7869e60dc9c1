//! # Integration Tests for the HTTP Report Store
//!
//! Runs `HttpReportStore` against a wiremock server to verify request
//! construction (paths, methods, auth header, patch bodies), envelope
//! parsing, and status-to-error mapping without a live backend.

use rapport_client::{HttpReportStore, ReportStore, StoreConfig, StoreError};
use rapport_core::{
    ContentKind, GroupId, NewReport, NewSection, ProjectId, ReportId, ReportStatus, SectionId,
    SectionPatch,
};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORT_ID: &str = "11111111-1111-1111-1111-111111111111";
const SECTION_ID: &str = "22222222-2222-2222-2222-222222222222";
const PROJECT_ID: &str = "33333333-3333-3333-3333-333333333333";
const GROUP_ID: &str = "44444444-4444-4444-4444-444444444444";

fn store(server: &MockServer) -> HttpReportStore {
    HttpReportStore::new(StoreConfig::new(server.uri(), "test-token")).expect("store build")
}

fn project_id() -> ProjectId {
    ProjectId::from_uuid(Uuid::parse_str(PROJECT_ID).unwrap())
}

fn group_id() -> GroupId {
    GroupId::from_uuid(Uuid::parse_str(GROUP_ID).unwrap())
}

fn report_json() -> serde_json::Value {
    json!({
        "id": REPORT_ID,
        "projectId": PROJECT_ID,
        "groupId": GROUP_ID,
        "title": "Final Report",
        "status": "draft",
        "createdAt": "2026-03-01T09:00:00Z",
        "updatedAt": "2026-03-01T09:30:00Z"
    })
}

#[tokio::test]
async fn fetch_report_decodes_flattened_document() {
    let server = MockServer::start().await;

    let mut body = report_json();
    body["sections"] = json!([{
        "id": SECTION_ID,
        "reportId": REPORT_ID,
        "title": "Introduction",
        "content": "hello",
        "contentType": "markdown",
        "order": 0,
        "updatedAt": "2026-03-01T09:30:00Z"
    }]);

    Mock::given(method("GET"))
        .and(path(format!(
            "/projects/{PROJECT_ID}/groups/{GROUP_ID}/report"
        )))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": body })))
        .expect(1)
        .mount(&server)
        .await;

    let doc = store(&server)
        .fetch_report(project_id(), group_id())
        .await
        .expect("fetch")
        .expect("report exists");

    assert_eq!(doc.report.title, "Final Report");
    assert_eq!(doc.report.status, ReportStatus::Draft);
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections[0].content_type, ContentKind::Markdown);
    assert_eq!(doc.sections[0].content, "hello");
}

#[tokio::test]
async fn fetch_report_maps_404_to_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "no report yet" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let doc = store(&server)
        .fetch_report(project_id(), group_id())
        .await
        .expect("404 is not an error for fetch");
    assert!(doc.is_none());
}

#[tokio::test]
async fn expired_token_maps_to_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "token expired" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server)
        .fetch_report(project_id(), group_id())
        .await
        .unwrap_err();
    match err {
        StoreError::Auth { message, .. } => assert_eq!(message, "token expired"),
        other => panic!("expected Auth, got {other:?}"),
    }
}

#[tokio::test]
async fn create_report_posts_payload_and_decodes_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!(
            "/projects/{PROJECT_ID}/groups/{GROUP_ID}/report"
        )))
        .and(body_json(json!({
            "title": "Final Report",
            "description": "Semester project"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": report_json() })))
        .expect(1)
        .mount(&server)
        .await;

    let report = store(&server)
        .create_report(
            project_id(),
            group_id(),
            &NewReport {
                title: "Final Report".to_string(),
                description: Some("Semester project".to_string()),
            },
        )
        .await
        .expect("create");
    assert_eq!(report.id.to_string(), REPORT_ID);
}

#[tokio::test]
async fn update_section_sends_only_set_patch_fields() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("/sections/{SECTION_ID}")))
        .and(body_json(json!({ "content": "revised text" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": SECTION_ID,
                "reportId": REPORT_ID,
                "title": "Introduction",
                "content": "revised text",
                "contentType": "html",
                "order": 0,
                "updatedAt": "2026-03-01T10:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let section = store(&server)
        .update_section(
            SectionId::from_uuid(Uuid::parse_str(SECTION_ID).unwrap()),
            &SectionPatch::content("revised text"),
        )
        .await
        .expect("update");
    assert_eq!(section.content, "revised text");
}

#[tokio::test]
async fn non_draft_rejection_surfaces_service_message() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({ "message": "report is not in draft" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server)
        .update_section(SectionId::new(), &SectionPatch::content("x"))
        .await
        .unwrap_err();
    match err {
        StoreError::Api {
            status, message, ..
        } => {
            assert_eq!(status, 409);
            assert_eq!(message, "report is not in draft");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn create_section_posts_to_report_scope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/reports/{REPORT_ID}/sections")))
        .and(body_json(json!({ "title": "Methods", "order": 2 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "id": SECTION_ID,
                "reportId": REPORT_ID,
                "title": "Methods",
                "content": "",
                "contentType": "html",
                "order": 2,
                "updatedAt": "2026-03-01T10:00:00Z"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let section = store(&server)
        .create_section(
            ReportId::from_uuid(Uuid::parse_str(REPORT_ID).unwrap()),
            &NewSection {
                title: "Methods".to_string(),
                content: None,
                content_type: None,
                order: 2,
            },
        )
        .await
        .expect("create section");
    assert_eq!(section.order, 2);
    assert!(section.is_blank());
}

#[tokio::test]
async fn delete_section_accepts_empty_204() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/sections/{SECTION_ID}")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .delete_section(SectionId::from_uuid(Uuid::parse_str(SECTION_ID).unwrap()))
        .await
        .expect("delete");
}

#[tokio::test]
async fn submit_report_posts_and_returns_submitted_report() {
    let server = MockServer::start().await;

    let mut body = report_json();
    body["status"] = json!("submitted");
    body["submittedAt"] = json!("2026-03-02T12:00:00Z");

    Mock::given(method("POST"))
        .and(path(format!("/reports/{REPORT_ID}/submit")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": body })))
        .expect(1)
        .mount(&server)
        .await;

    let report = store(&server)
        .submit_report(ReportId::from_uuid(Uuid::parse_str(REPORT_ID).unwrap()))
        .await
        .expect("submit");
    assert_eq!(report.status, ReportStatus::Submitted);
    assert!(report.submitted_at.is_some());
}

#[tokio::test]
async fn missing_envelope_is_a_deserialization_error() {
    let server = MockServer::start().await;

    // Body is the bare report, not wrapped in {"data": ...}.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(report_json()))
        .expect(1)
        .mount(&server)
        .await;

    let err = store(&server)
        .submit_report(ReportId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Deserialization { .. }));
}
