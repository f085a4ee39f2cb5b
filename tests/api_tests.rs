//! API integration tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use cellforge::api::handlers::{ApiResponse, HealthResponse, GENERATED_FILE_NAME};
use cellforge::api::router;
use cellforge::api::server::{ApiConfig, AppState};
use tower::ServiceExt;

const BOUNDARY: &str = "cellforge-test-boundary";

fn workbook_bytes(formula: &str) -> Vec<u8> {
    let mut book = rust_xlsxwriter::Workbook::new();
    let sheet = book.add_worksheet();
    sheet.write_string(0, 0, "Amount").unwrap();
    sheet.write_number(0, 1, 40).unwrap();
    sheet.write_string(1, 0, "Result").unwrap();
    sheet.write_formula(1, 1, formula).unwrap();
    book.save_to_buffer().unwrap()
}

fn multipart_body(file: Option<&[u8]>, cell_address: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(bytes) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"model.xlsx\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(address) = cell_address {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cell_address\"\r\n\r\n{address}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn generate_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/generate")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG AND STATE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_custom() {
    let config = ApiConfig {
        host: "0.0.0.0".to_string(),
        port: 3000,
    };
    let cloned = config.clone();
    assert_eq!(cloned.host, "0.0.0.0");
    assert_eq!(cloned.port, 3000);
}

#[test]
fn test_app_state_clone() {
    let state = AppState {
        version: "0.4.0".to_string(),
    };
    assert_eq!(state.clone().version, "0.4.0");
}

#[test]
fn test_health_response_serializes() {
    let response = ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    });
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["status"], "healthy");
}

// ═══════════════════════════════════════════════════════════════════════════
// ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_health_endpoint() {
    let response = router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_version_endpoint() {
    let response = router()
        .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["data"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_root_lists_generate() {
    let response = router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(body_text(response).await.contains("/api/v1/generate"));
}

#[tokio::test]
async fn test_generate_returns_source_attachment() {
    let body = multipart_body(Some(&workbook_bytes("=B1/8+2")), Some("Sheet1!B2"));

    let response = router().oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(GENERATED_FILE_NAME));

    let source = body_text(response).await;
    assert!(source.contains("public sealed class ModelModel"));
    assert!(source.contains("result = (amount / 8.0) + 2.0;"));
    assert!(source.contains("public double GetResult() => result;"));
}

#[tokio::test]
async fn test_generate_reports_compile_error() {
    let body = multipart_body(Some(&workbook_bytes("=FOO(B1)")), None);

    let response = router().oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["success"], false);
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("FOO"));
    assert!(error.contains("Sheet1!B2"));
}

#[tokio::test]
async fn test_generate_requires_file() {
    let body = multipart_body(None, Some("A1"));

    let response = router().oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_rejects_non_workbook() {
    let body = multipart_body(Some(b"plain text, not a zip archive"), None);

    let response = router().oneshot(generate_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Unreadable workbook"));
}
