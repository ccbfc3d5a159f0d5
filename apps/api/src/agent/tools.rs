//! Tools exposed to the agent, and the tool node that executes them.
//!
//! A failing tool never aborts the run: its error is handed back to the model
//! as the tool message, so the model can correct itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::generation::generator::generate_ideal_resume;
use crate::llm_client::{ChatMessage, ChatModel, LlmError, ToolCall, ToolSpec};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0} is not a valid tool, try one of [{1}].")]
    UnknownTool(String, String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn call(&self, args: Value) -> Result<String, ToolError>;
}

/// The registered tools of an agent.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    fn find(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.spec().name == name)
    }

    /// Runs every call in order, producing one tool message per call.
    pub async fn execute(&self, calls: &[ToolCall]) -> Vec<ChatMessage> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            let outcome = match self.find(&call.name) {
                Some(tool) => tool.call(call.args.clone()).await,
                None => Err(ToolError::UnknownTool(
                    call.name.clone(),
                    self.specs()
                        .iter()
                        .map(|s| s.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                )),
            };

            let content = match outcome {
                Ok(output) => {
                    info!("Tool {} ({}) succeeded", call.name, call.id);
                    output
                }
                Err(e) => {
                    warn!("Tool {} ({}) failed: {e}", call.name, call.id);
                    format!("Error: {e}\n Please fix your mistakes.")
                }
            };

            results.push(ChatMessage::tool(&call.id, &call.name, content));
        }

        results
    }
}

// ────────────────────────────────────────────────────────────────────────────
// generate_ideal_resume
// ────────────────────────────────────────────────────────────────────────────

pub const GENERATE_IDEAL_RESUME: &str = "generate_ideal_resume";

#[derive(Debug, Deserialize)]
struct JobDescriptionInput {
    job_description: String,
}

/// Writes the most ideal resume for a job description using its own model.
pub struct GenerateIdealResume {
    model: Arc<dyn ChatModel>,
}

impl GenerateIdealResume {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl Tool for GenerateIdealResume {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: GENERATE_IDEAL_RESUME.to_string(),
            description: "Generate the most ideal resume based on the given job description."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "job_description": {
                        "type": "string",
                        "description": "The full job description including company, responsibilities, and qualifications."
                    }
                },
                "required": ["job_description"]
            }),
        }
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let input: JobDescriptionInput = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let job_description = input.job_description.trim();
        if job_description.is_empty() {
            return Err(ToolError::InvalidArguments(
                "job_description cannot be empty".to_string(),
            ));
        }

        Ok(generate_ideal_resume(self.model.as_ref(), job_description).await?)
    }
}
