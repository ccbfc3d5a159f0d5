use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub file_name: String,
    pub kind: String,
    pub s3_key: String,
    pub byte_size: i64,
    pub extracted_text: String,
    pub created_at: DateTime<Utc>,
}
