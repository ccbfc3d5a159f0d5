//! Thread persistence. Message history is append-only: every message gets the
//! next per-thread `seq` and rows are never updated.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::llm_client::ChatMessage;
use crate::models::thread::{ThreadMessageRow, ThreadRow};

pub async fn create_thread(pool: &PgPool, metadata: &Value) -> Result<ThreadRow> {
    let thread = sqlx::query_as::<_, ThreadRow>(
        "INSERT INTO threads (id, metadata) VALUES ($1, $2) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(metadata)
    .fetch_one(pool)
    .await?;

    info!("Created thread {}", thread.id);
    Ok(thread)
}

pub async fn get_thread(pool: &PgPool, thread_id: Uuid) -> Result<Option<ThreadRow>> {
    Ok(
        sqlx::query_as::<_, ThreadRow>("SELECT * FROM threads WHERE id = $1")
            .bind(thread_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// Returns the thread's messages in the order they were appended.
pub async fn list_messages(pool: &PgPool, thread_id: Uuid) -> Result<Vec<ChatMessage>> {
    let rows = sqlx::query_as::<_, ThreadMessageRow>(
        "SELECT * FROM thread_messages WHERE thread_id = $1 ORDER BY seq ASC",
    )
    .bind(thread_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row.payload)
                .with_context(|| format!("Corrupt message seq {} in thread {thread_id}", row.seq))
        })
        .collect()
}

/// Appends `messages` to the thread and returns the last `seq` written.
pub async fn append_messages(
    pool: &PgPool,
    thread_id: Uuid,
    messages: &[ChatMessage],
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let current_max: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(seq), 0) FROM thread_messages WHERE thread_id = $1",
    )
    .bind(thread_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut seq = current_max;
    for message in messages {
        seq += 1;
        sqlx::query(
            r#"
            INSERT INTO thread_messages (thread_id, seq, message_id, role, payload)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(thread_id)
        .bind(seq)
        .bind(&message.id)
        .bind(message.role.as_str())
        .bind(serde_json::to_value(message)?)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("UPDATE threads SET updated_at = now() WHERE id = $1")
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        "Appended {} messages to thread {thread_id} (seq {}..={seq})",
        messages.len(),
        current_max + 1
    );
    Ok(seq)
}
