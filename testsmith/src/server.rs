//! HTTP layer: one landing page, one generation endpoint.
//!
//! `POST /` runs the whole pipeline inside a per-request temporary
//! workspace, so identical concurrent requests never share a clone or
//! output directory, and everything on disk disappears once the archive
//! bytes are in memory.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use testsmith_core::cleanup;
use testsmith_core::error::Error;
use testsmith_core::pipeline::generate_tests;
use testsmith_core::synthesize::Synthesizer;

const INDEX_HTML: &str = include_str!("../templates/index.html");

#[derive(Clone)]
pub struct AppState {
    pub synthesizer: Arc<dyn Synthesizer>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub repo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Machine-distinguishable error payload: `kind` identifies the failing
/// pipeline stage, `message` carries the underlying error text.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    pub message: String,
}

pub fn app(synthesizer: Arc<dyn Synthesizer>) -> Router {
    Router::new()
        .route("/", get(index).post(generate))
        .with_state(AppState { synthesizer })
}

pub async fn serve(addr: SocketAddr, synthesizer: Arc<dyn Synthesizer>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");
    axum::serve(listener, app(synthesizer)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let Some(repo_url) = request.repo_url.filter(|url| !url.is_empty()) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "repo_url is required".to_string(),
        );
    };

    let workspace = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "io",
                format!("failed to create request workspace: {e}"),
            )
        }
    };

    info!(repo_url = %repo_url, workspace = %workspace.path().display(), "Handling generation request");

    let output =
        match generate_tests(&repo_url, workspace.path(), state.synthesizer.as_ref()).await {
            Ok(output) => output,
            Err(e) => return pipeline_error_response(&e),
        };

    let archive_name = output
        .archive_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tests.zip".to_string());

    let bytes = match std::fs::read(&output.archive_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "io",
                format!("failed to read archive: {e}"),
            )
        }
    };

    info!(
        archive = %archive_name,
        generated = output.report.generated.len(),
        skipped = output.report.skipped.len(),
        "Serving generated archive"
    );

    // The bytes are in memory: delete the clone, the test tree and the
    // archive, then drop the workspace itself as a backstop.
    cleanup::remove_dir(&output.repo_dir);
    cleanup::remove_dir(&output.test_dir);
    cleanup::remove_file(&output.archive_path);
    drop(workspace);

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/zip"),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{archive_name}\"")) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    (StatusCode::CREATED, headers, bytes).into_response()
}

fn pipeline_error_response(e: &Error) -> Response {
    error!(error = %e, "Pipeline failed");
    let (status, kind) = match e {
        Error::InvalidRepoUrl { .. } => (StatusCode::BAD_REQUEST, "invalid_url"),
        Error::Fetch { .. } => (StatusCode::BAD_GATEWAY, "fetch"),
        Error::Parse { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "parse"),
        Error::Synthesis { .. } => (StatusCode::BAD_GATEWAY, "synthesis"),
        Error::Archive { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "archive"),
        Error::Grammar(_) => (StatusCode::INTERNAL_SERVER_ERROR, "parse"),
        Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
        Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
    };
    error_response(status, kind, e.to_string())
}

fn error_response(status: StatusCode, kind: &'static str, message: String) -> Response {
    (status, Json(ErrorBody { error: ErrorDetail { kind, message } })).into_response()
}
