/// LLM client: the single point of entry for every chat-model call in the service.
///
/// ARCHITECTURAL RULE: No other module may talk to a provider API directly.
/// The agent graph and the resume tool only ever see `dyn ChatModel`.
///
/// Providers are picked from a `provider/model` string via [`load_chat_model`].
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

pub mod anthropic;
pub mod openai;
pub mod prompts;
#[cfg(test)]
pub mod testing;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RETRIES: u32 = 3;
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Model configuration error: {0}")]
    Config(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Provider-neutral message model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Always a JSON object.
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on `Role::Tool` messages: the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(tool_call_id: &str, name: &str, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            name: Some(name.to_string()),
            ..Self::new(Role::Tool, content)
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Tool definition advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool's input object.
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ChatOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            ..Self::default()
        }
    }
}

/// A chat model with tool-calling support.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn invoke(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &ChatOptions,
    ) -> Result<ChatMessage, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Provider resolution
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    pub anthropic: Option<String>,
    pub openai: Option<String>,
}

/// Loads a chat model from a fully specified name such as `openai/gpt-4o`.
/// A name without a provider prefix is treated as an Anthropic model.
pub fn load_chat_model(
    fully_specified_name: &str,
    keys: &ProviderKeys,
) -> Result<Arc<dyn ChatModel>, LlmError> {
    let (provider, model) = fully_specified_name
        .split_once('/')
        .unwrap_or(("anthropic", fully_specified_name));

    if model.trim().is_empty() {
        return Err(LlmError::Config(format!(
            "missing model name in '{fully_specified_name}'"
        )));
    }

    match provider {
        "anthropic" => {
            let key = keys.anthropic.clone().ok_or_else(|| {
                LlmError::Config("ANTHROPIC_API_KEY is required for anthropic models".to_string())
            })?;
            Ok(Arc::new(AnthropicClient::new(key, model)?))
        }
        "openai" => {
            let key = keys.openai.clone().ok_or_else(|| {
                LlmError::Config("OPENAI_API_KEY is required for openai models".to_string())
            })?;
            Ok(Arc::new(OpenAiClient::new(key, model)?))
        }
        other => Err(LlmError::Config(format!("unknown model provider '{other}'"))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared HTTP plumbing
// ────────────────────────────────────────────────────────────────────────────

fn http_client() -> Result<Client, LlmError> {
    Ok(Client::builder().timeout(HTTP_TIMEOUT).build()?)
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

/// POSTs `body` and returns the successful response.
/// Retries on transport errors, 429 and 5xx with exponential backoff.
async fn post_with_retry<B: Serialize + ?Sized>(
    request: impl Fn() -> reqwest::RequestBuilder,
    body: &B,
) -> Result<reqwest::Response, LlmError> {
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s
            let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
            warn!(
                "LLM call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match request().json(body).send().await {
            Ok(r) => r,
            Err(e) => {
                last_error = Some(LlmError::Http(e));
                continue;
            }
        };

        let status = response.status();

        if status.as_u16() == 429 || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            last_error = Some(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
            continue;
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        return Ok(response);
    }

    Err(last_error.unwrap_or(LlmError::RateLimited {
        retries: MAX_RETRIES,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> ProviderKeys {
        ProviderKeys {
            anthropic: Some("sk-ant-test".to_string()),
            openai: Some("sk-test".to_string()),
        }
    }

    #[test]
    fn test_load_chat_model_splits_provider_and_model() {
        let model = load_chat_model("openai/gpt-4o-mini", &keys()).unwrap();
        assert_eq!(model.model_name(), "gpt-4o-mini");

        let model = load_chat_model("anthropic/claude-3-5-sonnet-20240620", &keys()).unwrap();
        assert_eq!(model.model_name(), "claude-3-5-sonnet-20240620");
    }

    #[test]
    fn test_load_chat_model_defaults_to_anthropic() {
        let model = load_chat_model("claude-3-5-haiku-latest", &keys()).unwrap();
        assert_eq!(model.model_name(), "claude-3-5-haiku-latest");
    }

    #[test]
    fn test_load_chat_model_requires_provider_key() {
        let keys = ProviderKeys {
            anthropic: Some("sk-ant-test".to_string()),
            openai: None,
        };
        let err = load_chat_model("openai/gpt-4o", &keys).err().unwrap();
        assert!(matches!(err, LlmError::Config(msg) if msg.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn test_load_chat_model_rejects_unknown_provider() {
        let err = load_chat_model("mistral/large", &keys()).err().unwrap();
        assert!(matches!(err, LlmError::Config(msg) if msg.contains("mistral")));
    }

    #[test]
    fn test_load_chat_model_rejects_empty_model() {
        assert!(load_chat_model("openai/", &keys()).is_err());
    }

    #[test]
    fn test_tool_message_carries_call_id_and_name() {
        let msg = ChatMessage::tool("call_1", "generate_ideal_resume", "# Resume");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.name.as_deref(), Some("generate_ideal_resume"));
        assert!(!msg.has_tool_calls());
    }

    #[test]
    fn test_chat_message_serde_omits_empty_tool_fields() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
    }

    // ── post_with_retry against a local stub ───────────────────────────────

    use axum::{extract::State, http::StatusCode, routing::post, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct Stub {
        replies: Arc<Vec<(StatusCode, &'static str)>>,
        hits: Arc<AtomicUsize>,
    }

    async fn stub_reply(State(stub): State<Stub>) -> (StatusCode, String) {
        let n = stub.hits.fetch_add(1, Ordering::SeqCst);
        let (status, body) = stub.replies[n.min(stub.replies.len() - 1)];
        (status, body.to_string())
    }

    /// Serves `replies` in order (the last one repeats) and returns the URL and hit counter.
    async fn spawn_stub(replies: Vec<(StatusCode, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let stub = Stub {
            replies: Arc::new(replies),
            hits: hits.clone(),
        };
        let app = Router::new()
            .route("/v1/chat", post(stub_reply))
            .with_state(stub);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/v1/chat"), hits)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_server_errors_until_success() {
        let (url, hits) = spawn_stub(vec![
            (StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            (StatusCode::BAD_GATEWAY, "boom"),
            (StatusCode::OK, r#"{"ok":true}"#),
        ])
        .await;
        let client = Client::new();

        let response = post_with_retry(|| client.post(&url), &serde_json::json!({"ping": 1}))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_gives_up_after_three_attempts() {
        let (url, hits) = spawn_stub(vec![(StatusCode::TOO_MANY_REQUESTS, "slow down")]).await;
        let client = Client::new();

        let err = post_with_retry(|| client.post(&url), &serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Api { status: 429, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_fails_fast_with_provider_message() {
        let (url, hits) = spawn_stub(vec![(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"type":"invalid_request_error","message":"model not found"}}"#,
        )])
        .await;
        let client = Client::new();

        let err = post_with_retry(|| client.post(&url), &serde_json::json!({}))
            .await
            .unwrap_err();

        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "model not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried() {
        // Bind then drop, so nothing listens on the port.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/v1/chat", listener.local_addr().unwrap());
        drop(listener);

        let attempts = AtomicUsize::new(0);
        let client = Client::new();

        let err = post_with_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                client.post(&url)
            },
            &serde_json::json!({}),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LlmError::Http(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
