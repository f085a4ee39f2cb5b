//! API request handlers
//!
//! Handlers for all REST API endpoints.

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::CompileOptions;
use crate::error::CompileResult;
use crate::excel::ExcelImporter;
use crate::pipeline::{self, CompileOutput};

use super::server::AppState;

/// File name of the generated source attachment.
pub const GENERATED_FILE_NAME: &str = "GeneratedCode.cs";

/// Standard API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            request_id: Uuid::new_v4().to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            request_id: Uuid::new_v4().to_string(),
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Root endpoint response
#[derive(Serialize)]
pub struct RootResponse {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
pub struct EndpointInfo {
    pub path: String,
    pub method: String,
    pub description: String,
}

fn endpoint(path: &str, method: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        path: path.to_string(),
        method: method.to_string(),
        description: description.to_string(),
    }
}

/// GET / - Root info
pub async fn root(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let response = RootResponse {
        name: "CellForge API Server".to_string(),
        version: state.version.clone(),
        description: "Compiles uploaded spreadsheet workbooks into C# classes".to_string(),
        endpoints: vec![
            endpoint("/health", "GET", "Health check endpoint"),
            endpoint("/version", "GET", "Get server version"),
            endpoint(
                "/api/v1/generate",
                "POST",
                "Upload a workbook (multipart field 'file', optional 'cell_address') and download the generated C# source",
            ),
        ],
    };
    Json(ApiResponse::ok(response))
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_message: String,
}

/// GET /health - Health check
pub async fn health() -> impl IntoResponse {
    Json(ApiResponse::ok(HealthResponse {
        status: "healthy".to_string(),
        uptime_message: "Server is running".to_string(),
    }))
}

/// Version response
#[derive(Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub features: Vec<String>,
}

/// GET /version - Server version
pub async fn version(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ApiResponse::ok(VersionResponse {
        version: state.version.clone(),
        features: vec!["generate".to_string(), "evaluate".to_string()],
    }))
}

/// Parsed multipart upload.
#[derive(Debug, Default)]
struct Upload {
    file_name: Option<String>,
    bytes: Option<Vec<u8>>,
    cell_address: Option<String>,
}

/// POST /api/v1/generate - Workbook upload → C# source download
pub async fn generate(mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let Some(bytes) = upload.bytes else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing multipart field 'file'".to_string(),
        );
    };
    let name = upload
        .file_name
        .as_deref()
        .and_then(|f| Path::new(f).file_stem())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Workbook".to_string());
    let cell_address = upload.cell_address;

    let result =
        tokio::task::spawn_blocking(move || generate_source(name, bytes, cell_address)).await;

    match result {
        Ok(Ok(output)) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{GENERATED_FILE_NAME}\""),
                ),
            ],
            output.source,
        )
            .into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "generation failed");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("generation task failed: {e}"),
        ),
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, String> {
    let mut upload = Upload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("invalid multipart body: {e}"))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                upload.file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("cannot read uploaded file: {e}"))?;
                upload.bytes = Some(bytes.to_vec());
            }
            Some("cell_address") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| format!("cannot read cell_address: {e}"))?;
                let text = text.trim();
                if !text.is_empty() {
                    upload.cell_address = Some(text.to_string());
                }
            }
            _ => {}
        }
    }
    Ok(upload)
}

/// Blocking part of a generate request; each call works on its own workbook.
fn generate_source(
    name: String,
    bytes: Vec<u8>,
    cell_address: Option<String>,
) -> CompileResult<CompileOutput> {
    let workbook = ExcelImporter::import_bytes(name, bytes)?;
    let options = CompileOptions {
        cell: cell_address,
        ..CompileOptions::default()
    };
    let output = pipeline::compile(&workbook, &options)?;
    if let Some((cell, value)) = &output.evaluation {
        info!(cell = %cell, value = %value, "requested cell evaluated");
    }
    Ok(output)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ApiResponse::<()>::err(message))).into_response()
}
