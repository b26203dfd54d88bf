//! Test synthesis against a chat-completions endpoint.
//!
//! The [`Synthesizer`] trait is the seam between the pipeline and the
//! text-generation service. The production implementation talks to the
//! OpenAI chat-completions API; tests use the generated mock.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Bounded output budget per generated test.
const MAX_COMPLETION_TOKENS: u32 = 500;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

const SYSTEM_PROMPT: &str = "You are a helpful assistant that writes unit tests using the unittest library.\n\
You generate only code without explanation.\n\
You follow the following template for generating unit tests:\n\
1. Import unittest library.\n\
2. Define the test class named `Test{FunctionName}`.\n\
3. Create at least 3 test methods that cover various cases, including edge cases.\n\
4. Include a `main` block to run the tests.\n\
You generate consistent responses every time.";

/// Turns one function's source snippet into unit-test code.
///
/// Implementations return the generated text verbatim; no validation of
/// the returned code is performed anywhere in the pipeline.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, function_name: &str, snippet: &str) -> Result<String>;
}

fn user_prompt(function_name: &str, snippet: &str) -> String {
    format!(
        "Generate a unit test for the following Python function:\n\n{snippet}\n\n# Unit test for {function_name} using unittest."
    )
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

enum RequestFailure {
    /// Transport errors, 429 and 5xx: worth another attempt.
    Retryable(String),
    /// Auth and client errors: retrying cannot help.
    Fatal(String),
}

/// Production synthesizer backed by the OpenAI chat-completions API.
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiSynthesizer {
    /// Constructs the client from the environment. `OPENAI_API_KEY` is
    /// required; `OPENAI_MODEL` and `OPENAI_BASE_URL` override the
    /// defaults.
    pub fn new_from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            Error::Config("OPENAI_API_KEY environment variable is not set".to_string())
        })?;
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        info!(model = %model, "Initialized OpenAI synthesizer from environment");
        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }

    async fn request(&self, url: &str, body: &ChatRequest<'_>) -> std::result::Result<String, RequestFailure> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| RequestFailure::Retryable(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RequestFailure::Retryable(format!("failed to read response body: {e}")))?;

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(RequestFailure::Retryable(format!(
                "endpoint returned {status}: {text}"
            )));
        }
        if !status.is_success() {
            return Err(RequestFailure::Fatal(format!(
                "endpoint returned {status}: {text}"
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| RequestFailure::Fatal(format!("failed to parse response JSON: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RequestFailure::Fatal("response contained no choices".to_string()))
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, function_name: &str, snippet: &str) -> Result<String> {
        let prompt = user_prompt(function_name, snippet);
        let body = ChatRequest {
            model: &self.model,
            max_tokens: MAX_COMPLETION_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let mut last_error = String::new();
        for attempt in 1..=RETRY_ATTEMPTS {
            if attempt > 1 {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 2);
                debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    function = function_name,
                    "Backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
            match self.request(&url, &body).await {
                Ok(text) => {
                    info!(function = function_name, attempt, "Synthesized unit test");
                    return Ok(text);
                }
                Err(RequestFailure::Fatal(message)) => {
                    return Err(Error::Synthesis {
                        function: function_name.to_string(),
                        message,
                    });
                }
                Err(RequestFailure::Retryable(message)) => {
                    warn!(
                        attempt,
                        function = function_name,
                        error = %message,
                        "Synthesis attempt failed"
                    );
                    last_error = message;
                }
            }
        }

        Err(Error::Synthesis {
            function: function_name.to_string(),
            message: format!("retries exhausted after {RETRY_ATTEMPTS} attempts: {last_error}"),
        })
    }
}
