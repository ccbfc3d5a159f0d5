//! Axum route handlers for threads and agent runs.

use std::future::Future;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::graph::final_answer;
use crate::agent::run_lock::RunLock;
use crate::agent::threads::{append_messages, create_thread, get_thread, list_messages};
use crate::errors::AppError;
use crate::extraction::handlers::load_document;
use crate::llm_client::ChatMessage;
use crate::models::document::DocumentRow;
use crate::models::thread::ThreadRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ThreadDetailResponse {
    pub thread: ThreadRow,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// The user's message, typically a job description.
    pub input: String,
    /// A previously uploaded resume to include as context.
    #[serde(default)]
    pub document_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub thread_id: Option<Uuid>,
    pub model: String,
    /// Messages produced by this run, starting with the user's message.
    pub messages: Vec<ChatMessage>,
    pub output: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/threads
pub async fn handle_create_thread(
    State(state): State<AppState>,
    body: Option<Json<CreateThreadRequest>>,
) -> Result<Json<ThreadRow>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let metadata = request
        .metadata
        .unwrap_or_else(|| Value::Object(Default::default()));

    let thread = create_thread(&state.db, &metadata).await?;
    Ok(Json(thread))
}

/// GET /api/v1/threads/:id
pub async fn handle_get_thread(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> Result<Json<ThreadDetailResponse>, AppError> {
    let thread = require_thread(&state, thread_id).await?;
    let messages = list_messages(&state.db, thread_id).await?;
    Ok(Json(ThreadDetailResponse { thread, messages }))
}

/// POST /api/v1/threads/:id/runs
///
/// Runs the agent on the thread's history plus a new user message and waits
/// for the result. Rejected with 409 while another run holds the thread.
pub async fn handle_thread_run(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    require_thread(&state, thread_id).await?;
    let user_message = prepare_user_message(&state, &request).await?;

    // A client disconnect drops this future; the locked section must still
    // persist its messages and release the lock.
    let run = run_to_completion(async move {
        let lock = RunLock::acquire(&state.redis, thread_id)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Thread {thread_id} already has a run in progress"))
            })?;

        let result = run_on_thread(&state, thread_id, user_message).await;

        if let Err(e) = lock.release(&state.redis).await {
            warn!("Failed to release run lock for thread {thread_id}: {e}");
        }
        result
    });

    run.await.map(Json)
}

/// POST /api/v1/runs/wait
///
/// Runs the agent on a single user message without a thread.
pub async fn handle_stateless_run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    let user_message = prepare_user_message(&state, &request).await?;

    let final_state = state.agent.invoke(vec![user_message]).await?;

    Ok(Json(RunResponse {
        thread_id: None,
        model: state.agent.model_name().to_string(),
        output: final_answer(&final_state).unwrap_or_default().to_string(),
        messages: final_state.messages,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn run_on_thread(
    state: &AppState,
    thread_id: Uuid,
    user_message: ChatMessage,
) -> Result<RunResponse, AppError> {
    let mut history = list_messages(&state.db, thread_id).await?;
    let run_start = history.len();
    history.push(user_message);

    info!(
        "Starting run on thread {thread_id} with {} prior messages",
        run_start
    );
    let final_state = state.agent.invoke(history).await?;

    let new_messages = final_state.messages[run_start..].to_vec();
    append_messages(&state.db, thread_id, &new_messages).await?;

    Ok(RunResponse {
        thread_id: Some(thread_id),
        model: state.agent.model_name().to_string(),
        output: final_answer(&final_state).unwrap_or_default().to_string(),
        messages: new_messages,
    })
}

/// Drives `task` on its own tokio task, so it finishes even if the caller is dropped.
async fn run_to_completion<T, F>(task: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, AppError>> + Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Run task failed: {e}")))?
}

async fn require_thread(state: &AppState, thread_id: Uuid) -> Result<ThreadRow, AppError> {
    get_thread(&state.db, thread_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Thread {thread_id} not found")))
}

async fn prepare_user_message(
    state: &AppState,
    request: &RunRequest,
) -> Result<ChatMessage, AppError> {
    if request.input.trim().is_empty() {
        return Err(AppError::Validation("input cannot be empty".to_string()));
    }

    let document = match request.document_id {
        Some(id) => Some(load_document(&state.db, id).await?),
        None => None,
    };

    Ok(build_user_message(&request.input, document.as_ref()))
}

/// The user's input, followed by the uploaded resume's text when one is attached.
fn build_user_message(input: &str, document: Option<&DocumentRow>) -> ChatMessage {
    let input = input.trim();
    match document {
        Some(doc) if !doc.extracted_text.is_empty() => ChatMessage::user(format!(
            "{input}\n\nMy current resume ({}):\n\"\"\"\n{}\n\"\"\"",
            doc.file_name, doc.extracted_text
        )),
        _ => ChatMessage::user(input),
    }
}
