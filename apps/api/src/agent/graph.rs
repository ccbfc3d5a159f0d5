//! The ReAct graph.
//!
//! ```text
//! __start__ ──▶ call_model ──(tool calls?)──▶ tools
//!                   ▲   │                       │
//!                   │   └──(none)──▶ __end__    │
//!                   └───────────────────────────┘
//! ```
//!
//! Every node execution consumes one step of the recursion limit. The model
//! node refuses to request tools on its last step and answers with a fallback
//! message instead.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::state::AgentState;
use crate::agent::tools::ToolRegistry;
use crate::llm_client::prompts::render_system_prompt;
use crate::llm_client::{ChatMessage, ChatModel, ChatOptions, LlmError, Role};

pub const FALLBACK_ANSWER: &str =
    "Sorry, I could not find an answer to your question in the specified number of steps.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Expected assistant message in output edges, but got {0}")]
    UnexpectedMessage(String),

    #[error("Recursion limit of {0} reached without hitting a stop condition")]
    RecursionLimit(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    CallModel,
    Tools,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Tools,
    End,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// May contain `{system_time}`.
    pub system_prompt: String,
    pub recursion_limit: usize,
}

pub struct ReactAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl ReactAgent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, config: AgentConfig) -> Self {
        Self {
            model,
            tools,
            config,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Runs the graph from `__start__` until `__end__` and returns the final state.
    pub async fn invoke(&self, messages: Vec<ChatMessage>) -> Result<AgentState, AgentError> {
        let mut state = AgentState::new(messages, self.config.recursion_limit);
        let mut next = Node::CallModel;

        loop {
            if state.remaining_steps == 0 {
                return Err(AgentError::RecursionLimit(self.config.recursion_limit));
            }
            debug!("Executing {next:?} ({} steps remaining)", state.remaining_steps);

            match next {
                Node::CallModel => {
                    let response = self.call_model(&state).await?;
                    state.messages.push(response);
                    state.remaining_steps -= 1;

                    match route_model_output(&state)? {
                        Route::End => {
                            info!(
                                "Agent run finished with {} messages",
                                state.messages.len()
                            );
                            return Ok(state);
                        }
                        Route::Tools => next = Node::Tools,
                    }
                }
                Node::Tools => {
                    let calls = state
                        .last_message()
                        .map(|m| m.tool_calls.clone())
                        .unwrap_or_default();
                    let results = self.tools.execute(&calls).await;
                    state.messages.extend(results);
                    state.remaining_steps -= 1;
                    next = Node::CallModel;
                }
            }
        }
    }

    /// The model node: system prompt + history, with the tools bound.
    async fn call_model(&self, state: &AgentState) -> Result<ChatMessage, AgentError> {
        let system_message = render_system_prompt(&self.config.system_prompt, Utc::now());

        let mut prompt = Vec::with_capacity(state.messages.len() + 1);
        prompt.push(ChatMessage::system(system_message));
        prompt.extend(state.messages.iter().cloned());

        let response = self
            .model
            .invoke(&prompt, &self.tools.specs(), &ChatOptions::default())
            .await?;

        if state.is_last_step() && response.has_tool_calls() {
            info!("Out of steps with pending tool calls, answering with fallback");
            return Ok(ChatMessage {
                id: response.id,
                ..ChatMessage::assistant(FALLBACK_ANSWER)
            });
        }

        Ok(response)
    }
}

/// Decides whether to finish or call a tool, based on the model output.
pub fn route_model_output(state: &AgentState) -> Result<Route, AgentError> {
    let last = state
        .last_message()
        .ok_or_else(|| AgentError::UnexpectedMessage("no message".to_string()))?;

    if last.role != Role::Assistant {
        return Err(AgentError::UnexpectedMessage(format!(
            "{} message",
            last.role.as_str()
        )));
    }

    if last.has_tool_calls() {
        Ok(Route::Tools)
    } else {
        Ok(Route::End)
    }
}

/// Text of the final assistant message of a finished run.
pub fn final_answer(state: &AgentState) -> Option<&str> {
    state
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.as_str())
}
