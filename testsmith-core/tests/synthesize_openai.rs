//! Retry-policy tests for the OpenAI-backed synthesizer.
//!
//! `OPENAI_BASE_URL` points the client at a local listener serving
//! scripted HTTP responses, one per connection, so the rate-limit,
//! fatal-status and exhausted-budget paths all run offline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serial_test::serial;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use testsmith_core::error::Error;
use testsmith_core::synthesize::{OpenAiSynthesizer, Synthesizer};

const OK_BODY: &str = r#"{"choices":[{"message":{"content":"import unittest"}}]}"#;

fn response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Reads one full request (headers plus content-length body) so the
/// client never sees the response before it finished sending.
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
}

/// Binds an ephemeral port and serves one scripted response per accepted
/// connection. Returns the base URL and a counter of served requests.
async fn scripted_endpoint(responses: Vec<String>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let served = Arc::clone(&hits);
    tokio::spawn(async move {
        for response in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            served.fetch_add(1, Ordering::SeqCst);
            read_request(&mut stream).await;
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });
    (format!("http://{addr}/v1"), hits)
}

fn synthesizer_for(base_url: &str) -> OpenAiSynthesizer {
    std::env::set_var("OPENAI_API_KEY", "test-key");
    std::env::set_var("OPENAI_BASE_URL", base_url);
    let synthesizer = OpenAiSynthesizer::new_from_env().unwrap();
    std::env::remove_var("OPENAI_BASE_URL");
    std::env::remove_var("OPENAI_API_KEY");
    synthesizer
}

#[tokio::test]
#[serial]
async fn rate_limited_attempt_is_retried_until_success() {
    let (base_url, hits) = scripted_endpoint(vec![
        response("429 Too Many Requests", r#"{"error":{"message":"slow down"}}"#),
        response("200 OK", OK_BODY),
    ])
    .await;

    let synthesizer = synthesizer_for(&base_url);
    let out = synthesizer
        .synthesize("foo", "def foo():\n    pass")
        .await
        .unwrap();

    assert_eq!(out, "import unittest");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
#[serial]
async fn unauthorized_fails_without_retrying() {
    let (base_url, hits) = scripted_endpoint(vec![
        response("401 Unauthorized", r#"{"error":{"message":"bad key"}}"#),
        response("200 OK", OK_BODY),
    ])
    .await;

    let synthesizer = synthesizer_for(&base_url);
    let result = synthesizer.synthesize("foo", "def foo():\n    pass").await;

    match result {
        Err(Error::Synthesis { function, message }) => {
            assert_eq!(function, "foo");
            assert!(message.contains("401"));
        }
        other => panic!("expected a synthesis error, got {other:?}"),
    }
    // The second scripted response stays unserved: no retry happened.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
#[serial]
async fn server_errors_exhaust_the_retry_budget() {
    let (base_url, hits) = scripted_endpoint(vec![
        response("500 Internal Server Error", "{}"),
        response("500 Internal Server Error", "{}"),
        response("500 Internal Server Error", "{}"),
    ])
    .await;

    let synthesizer = synthesizer_for(&base_url);
    let result = synthesizer.synthesize("foo", "def foo():\n    pass").await;

    match result {
        Err(Error::Synthesis { message, .. }) => {
            assert!(message.contains("retries exhausted"));
        }
        other => panic!("expected a synthesis error, got {other:?}"),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}
