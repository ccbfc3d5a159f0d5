use anyhow::{Context, Result};

use crate::llm_client::prompts::DEFAULT_SYSTEM_PROMPT;

const DEFAULT_AGENT_MODEL: &str = "anthropic/claude-3-5-sonnet-20240620";
const DEFAULT_RESUME_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_RECURSION_LIMIT: usize = 25;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// `provider/model` driving the agent's model node.
    pub agent_model: String,
    /// `provider/model` used by the `generate_ideal_resume` tool.
    pub resume_model: String,
    /// May contain a `{system_time}` placeholder.
    pub system_prompt: String,
    pub recursion_limit: usize,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("s3_bucket", &self.s3_bucket)
            .field("s3_endpoint", &self.s3_endpoint)
            .field("anthropic_api_key", &self.anthropic_api_key.is_some())
            .field("openai_api_key", &self.openai_api_key.is_some())
            .field("agent_model", &self.agent_model)
            .field("resume_model", &self.resume_model)
            .field("recursion_limit", &self.recursion_limit)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            openai_api_key: optional_env("OPENAI_API_KEY"),
            agent_model: optional_env("AGENT_MODEL")
                .unwrap_or_else(|| DEFAULT_AGENT_MODEL.to_string()),
            resume_model: optional_env("RESUME_MODEL")
                .unwrap_or_else(|| DEFAULT_RESUME_MODEL.to_string()),
            system_prompt: optional_env("AGENT_SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            recursion_limit: parse_env("RECURSION_LIMIT", DEFAULT_RECURSION_LIMIT)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            port: parse_env("PORT", 8080u16)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}
