use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::agent::graph::ReactAgent;
use crate::config::Config;
use crate::llm_client::ChatModel;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Per-thread run locks.
    pub redis: RedisClient,
    /// Originals of uploaded documents.
    pub s3: S3Client,
    pub agent: Arc<ReactAgent>,
    /// Model behind the `generate_ideal_resume` tool, also used by the direct generate endpoint.
    pub resume_model: Arc<dyn ChatModel>,
    pub config: Config,
}
