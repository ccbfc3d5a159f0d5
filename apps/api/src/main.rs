mod agent;
mod config;
mod db;
mod errors;
mod extraction;
mod generation;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::agent::graph::{AgentConfig, ReactAgent};
use crate::agent::tools::{GenerateIdealResume, ToolRegistry};
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::{load_chat_model, ProviderKeys};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // `resume-agent extract <path>` prints a document's text and exits.
    let args: Vec<String> = std::env::args().collect();
    if let [_, command, path] = args.as_slice() {
        if command == "extract" {
            let text = extraction::extract_resume_text(path).await?;
            println!("{text}");
            return Ok(());
        }
    }

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume Agent API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize models
    let keys = ProviderKeys {
        anthropic: config.anthropic_api_key.clone(),
        openai: config.openai_api_key.clone(),
    };
    let agent_model = load_chat_model(&config.agent_model, &keys)?;
    let resume_model = load_chat_model(&config.resume_model, &keys)?;
    info!(
        "Models initialized (agent: {}, resume: {})",
        config.agent_model, config.resume_model
    );

    // Build the agent graph
    let tools = ToolRegistry::new(vec![Arc::new(GenerateIdealResume::new(
        resume_model.clone(),
    ))]);
    let agent = Arc::new(ReactAgent::new(
        agent_model,
        tools,
        AgentConfig {
            system_prompt: config.system_prompt.clone(),
            recursion_limit: config.recursion_limit,
        },
    ));
    info!("Agent ready (recursion limit {})", config.recursion_limit);

    // Build app state
    let state = AppState {
        db,
        redis,
        s3,
        agent,
        resume_model,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "resume-agent-static",
    );

    let shared_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO only serves path-style bucket addressing.
    let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
