//! Axum route handlers for the Generation API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::generator::generate_ideal_resume;
use crate::models::resume::ResumeRow;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub resume_id: Uuid,
    pub model: String,
    pub resume: String,
}

/// POST /api/v1/resumes/generate
///
/// Runs the resume writer directly, without going through the agent loop.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let job_description = request.job_description.trim();
    if job_description.is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let model = state.resume_model.as_ref();
    let resume = generate_ideal_resume(model, job_description).await?;

    let resume_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO resumes (id, job_description, content_md, model) VALUES ($1, $2, $3, $4)",
    )
    .bind(resume_id)
    .bind(job_description)
    .bind(&resume)
    .bind(model.model_name())
    .execute(&state.db)
    .await?;

    Ok(Json(GenerateResponse {
        resume_id,
        model: model.model_name().to_string(),
        resume,
    }))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<ResumeRow>, AppError> {
    let resume = sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1")
        .bind(resume_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    Ok(Json(resume))
}
