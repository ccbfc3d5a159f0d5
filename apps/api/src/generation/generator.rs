//! Resume generation: writes the most ideal Markdown resume for a job description.

use tracing::info;

use crate::generation::prompts::{render_resume_prompt, RESUME_TEMPERATURE};
use crate::llm_client::{ChatMessage, ChatModel, ChatOptions, LlmError};

/// Generates a tailored resume in Markdown for `job_description`.
///
/// Callers validate that the job description is non-empty.
pub async fn generate_ideal_resume(
    model: &dyn ChatModel,
    job_description: &str,
) -> Result<String, LlmError> {
    let prompt = render_resume_prompt(job_description);

    let response = model
        .invoke(
            &[ChatMessage::user(prompt)],
            &[],
            &ChatOptions::with_temperature(RESUME_TEMPERATURE),
        )
        .await?;

    let resume = response.content.trim();
    if resume.is_empty() {
        return Err(LlmError::EmptyContent);
    }

    info!(
        "Generated resume with {} ({} chars)",
        model.model_name(),
        resume.len()
    );
    Ok(resume.to_string())
}
