use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ThreadRow {
    pub id: Uuid,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One persisted chat message. `payload` holds the full serialized message.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ThreadMessageRow {
    pub thread_id: Uuid,
    pub seq: i64,
    pub message_id: String,
    pub role: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}
