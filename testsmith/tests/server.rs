//! Handler-level tests for the HTTP layer.
//!
//! The generation handler is a plain async function, so it is called
//! directly with constructed extractors; the end-to-end case clones a
//! local fixture repository over `file://`.

use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::Json;

use testsmith::server::{generate, AppState, GenerateRequest};
use testsmith_core::synthesize::MockSynthesizer;

fn state_with(mock: MockSynthesizer) -> AppState {
    AppState {
        synthesizer: Arc::new(mock),
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn missing_repo_url_is_a_400() {
    let mut mock = MockSynthesizer::new();
    mock.expect_synthesize().times(0);

    let response = generate(
        State(state_with(mock)),
        Json(GenerateRequest { repo_url: None }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("required"));
}

#[tokio::test]
async fn unreachable_host_maps_to_fetch_failure() {
    let mut mock = MockSynthesizer::new();
    mock.expect_synthesize().times(0);

    let response = generate(
        State(state_with(mock)),
        Json(GenerateRequest {
            // Nothing listens on the discard port, so git fails fast.
            repo_url: Some("https://127.0.0.1:9/user/unreachable.git".to_string()),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["kind"], "fetch");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("failed to fetch repository"));
}

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .status()
        .expect("git is available");
    assert!(status.success(), "git {args:?} failed");
}

/// Builds a committed local repository named `sample` and returns a
/// `file://` URL pointing at it.
fn fixture_repo(root: &Path) -> String {
    let repo = root.join("sample");
    std::fs::create_dir(&repo).unwrap();
    std::fs::write(
        repo.join("a.py"),
        "def foo():\n    return 1\n\ndef bar():\n    return 2\n",
    )
    .unwrap();
    git(&repo, &["init", "-q"]);
    git(&repo, &["add", "-A"]);
    git(
        &repo,
        &[
            "-c",
            "user.email=test@example.com",
            "-c",
            "user.name=test",
            "commit",
            "-q",
            "-m",
            "fixture",
        ],
    );
    format!("file://{}", repo.display())
}

#[tokio::test]
async fn end_to_end_archive_over_local_clone() {
    let fixtures = tempfile::tempdir().unwrap();
    let repo_url = fixture_repo(fixtures.path());

    let mut mock = MockSynthesizer::new();
    mock.expect_synthesize()
        .times(2)
        .returning(|name, _| Ok(format!("import unittest\n# test for {name}")));

    let response = generate(
        State(state_with(mock)),
        Json(GenerateRequest {
            repo_url: Some(repo_url),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("sample_tests.zip"));
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/zip"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut archive = zip::ZipArchive::new(cursor).unwrap();

    let mut content = String::new();
    archive
        .by_name("a/foo/test_foo_test.py")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "import unittest\n# test for foo\n");
    assert!(archive.by_name("a/bar/test_bar_test.py").is_ok());
}
