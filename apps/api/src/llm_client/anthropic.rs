//! Anthropic Messages API backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    http_client, post_with_retry, ChatMessage, ChatModel, ChatOptions, LlmError, Role, ToolCall,
    ToolSpec,
};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, PartialEq, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<RequestBlock>,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    id: String,
    content: Vec<ResponseBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: &str) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &ChatOptions,
    ) -> Result<ChatMessage, LlmError> {
        let request_body = build_request(&self.model, messages, tools, options);

        let response = post_with_retry(
            || {
                self.client
                    .post(ANTHROPIC_API_URL)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .header("content-type", "application/json")
            },
            &request_body,
        )
        .await?;

        let body: MessagesResponse = response.json().await?;
        debug!(
            "Anthropic call succeeded: input_tokens={}, output_tokens={}",
            body.usage.input_tokens, body.usage.output_tokens
        );

        Ok(into_chat_message(body))
    }
}

/// System messages are lifted into `system`; consecutive messages that map to
/// the same Anthropic role are merged so tool results share one user turn.
fn build_request<'a>(
    model: &'a str,
    messages: &[ChatMessage],
    tools: &'a [ToolSpec],
    options: &ChatOptions,
) -> MessagesRequest<'a> {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let mut turns: Vec<AnthropicMessage> = Vec::new();
    for message in messages.iter().filter(|m| m.role != Role::System) {
        let (role, blocks) = to_blocks(message);
        if blocks.is_empty() {
            continue;
        }
        match turns.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => turns.push(AnthropicMessage {
                role,
                content: blocks,
            }),
        }
    }

    MessagesRequest {
        model,
        max_tokens: options.max_tokens,
        system: (!system.is_empty()).then(|| system.join("\n\n")),
        messages: turns,
        tools: tools
            .iter()
            .map(|t| AnthropicTool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.parameters,
            })
            .collect(),
        temperature: options.temperature,
    }
}

fn to_blocks(message: &ChatMessage) -> (&'static str, Vec<RequestBlock>) {
    match message.role {
        Role::Tool => (
            "user",
            vec![RequestBlock::ToolResult {
                tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                content: message.content.clone(),
            }],
        ),
        Role::Assistant => {
            let mut blocks = text_block(&message.content);
            blocks.extend(message.tool_calls.iter().map(|call| RequestBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.args.clone(),
            }));
            ("assistant", blocks)
        }
        Role::User | Role::System => ("user", text_block(&message.content)),
    }
}

// The API rejects empty text blocks.
fn text_block(text: &str) -> Vec<RequestBlock> {
    if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![RequestBlock::Text {
            text: text.to_string(),
        }]
    }
}

fn into_chat_message(response: MessagesResponse) -> ChatMessage {
    let mut content = String::new();
    let mut tool_calls = Vec::new();

    for block in response.content {
        match block {
            ResponseBlock::Text { text } => content.push_str(&text),
            ResponseBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id,
                name,
                args: input,
            }),
            ResponseBlock::Other => {}
        }
    }

    ChatMessage {
        id: response.id,
        tool_calls,
        ..ChatMessage::assistant(content)
    }
}
