//! Axum route handlers for document uploads.

use aws_sdk_s3::primitives::ByteStream;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{extract_from_bytes, DocumentKind};
use crate::models::document::DocumentRow;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub file_name: String,
    pub kind: DocumentKind,
    pub text: String,
}

/// POST /api/v1/documents
///
/// Accepts a multipart upload (field `file`), extracts its text, stores the
/// original in S3 and records the document.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (file_name, data) = read_file_field(&mut multipart).await?;

    // Extension is validated inside extraction, before any storage side effect.
    let extracted = extract_from_bytes(&file_name, data.to_vec()).await?;

    let document_id = Uuid::new_v4();
    let s3_key = format!("documents/{document_id}/{file_name}");
    let byte_size = data.len() as i64;

    state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(&s3_key)
        .body(ByteStream::from(data))
        .content_type(extracted.kind.content_type())
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {s3_key} failed: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO documents (id, file_name, kind, s3_key, byte_size, extracted_text)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(document_id)
    .bind(&file_name)
    .bind(extracted.kind.as_str())
    .bind(&s3_key)
    .bind(byte_size)
    .bind(&extracted.text)
    .execute(&state.db)
    .await?;

    info!(
        "Stored document {document_id} ({}, {byte_size} bytes, {} chars extracted)",
        extracted.kind.as_str(),
        extracted.text.len()
    );

    Ok(Json(UploadResponse {
        document_id,
        file_name,
        kind: extracted.kind,
        text: extracted.text,
    }))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentRow>, AppError> {
    let document = load_document(&state.db, document_id).await?;
    Ok(Json(document))
}

pub async fn load_document(pool: &sqlx::PgPool, document_id: Uuid) -> Result<DocumentRow, AppError> {
    sqlx::query_as::<_, DocumentRow>("SELECT * FROM documents WHERE id = $1")
        .bind(document_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {document_id} not found")))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(sanitize_file_name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::Validation("Uploaded file has no file name".to_string()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;

        return Ok((file_name, data));
    }

    Err(AppError::Validation(format!(
        "Multipart body is missing the '{FILE_FIELD}' field"
    )))
}

/// Keeps only the final path component so the name is safe inside an S3 key.
fn sanitize_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\']).next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/resume.pdf"), "resume.pdf");
        assert_eq!(sanitize_file_name("C:\\Users\\jane\\cv.docx"), "cv.docx");
        assert_eq!(sanitize_file_name(" resume.txt "), "resume.txt");
    }

    #[test]
    fn test_sanitize_file_name_of_directory_is_empty() {
        assert_eq!(sanitize_file_name("uploads/"), "");
    }
}
