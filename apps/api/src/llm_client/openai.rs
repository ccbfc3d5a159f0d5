//! OpenAI Chat Completions backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    http_client, post_with_retry, ChatMessage, ChatModel, ChatOptions, LlmError, Role, ToolCall,
    ToolSpec,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    /// JSON-encoded argument object.
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDef<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    id: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, model: &str) -> Result<Self, LlmError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
        options: &ChatOptions,
    ) -> Result<ChatMessage, LlmError> {
        let request_body = CompletionRequest {
            model: &self.model,
            messages: messages.iter().map(to_openai_message).collect(),
            tools: tools
                .iter()
                .map(|t| OpenAiTool {
                    kind: "function",
                    function: FunctionDef {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters,
                    },
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let response = post_with_retry(
            || self.client.post(OPENAI_API_URL).bearer_auth(&self.api_key),
            &request_body,
        )
        .await?;

        let body: CompletionResponse = response.json().await?;
        if let Some(usage) = &body.usage {
            debug!(
                "OpenAI call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        into_chat_message(body)
    }
}

fn to_openai_message(message: &ChatMessage) -> OpenAiMessage {
    let tool_calls: Option<Vec<OpenAiToolCall>> = (!message.tool_calls.is_empty()).then(|| {
        message
            .tool_calls
            .iter()
            .map(|call| OpenAiToolCall {
                id: call.id.clone(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: call.name.clone(),
                    arguments: call.args.to_string(),
                },
            })
            .collect()
    });

    // An assistant turn that only calls tools carries `content: null`.
    let content = if message.role == Role::Assistant
        && tool_calls.is_some()
        && message.content.is_empty()
    {
        None
    } else {
        Some(message.content.clone())
    };

    OpenAiMessage {
        role: message.role.as_str().to_string(),
        content,
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn into_chat_message(response: CompletionResponse) -> Result<ChatMessage, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyContent)?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| -> Result<ToolCall, LlmError> {
            let args = if call.function.arguments.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&call.function.arguments)?
            };
            Ok(ToolCall {
                id: call.id,
                name: call.function.name,
                args,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChatMessage {
        id: response.id,
        tool_calls,
        ..ChatMessage::assistant(choice.message.content.unwrap_or_default())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_only_assistant_message_has_null_content() {
        let mut assistant = ChatMessage::assistant("");
        assistant.tool_calls = vec![ToolCall {
            id: "call_1".to_string(),
            name: "generate_ideal_resume".to_string(),
            args: json!({"job_description": "Data engineer"}),
        }];

        let json = serde_json::to_value(to_openai_message(&assistant)).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["type"], "function");
        let args: Value =
            serde_json::from_str(json["tool_calls"][0]["function"]["arguments"].as_str().unwrap())
                .unwrap();
        assert_eq!(args["job_description"], "Data engineer");
    }

    #[test]
    fn test_tool_message_carries_tool_call_id() {
        let msg = ChatMessage::tool("call_1", "generate_ideal_resume", "# Resume");
        let json = serde_json::to_value(to_openai_message(&msg)).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "call_1");
        assert_eq!(json["content"], "# Resume");
    }

    #[test]
    fn test_response_arguments_are_decoded() {
        let body = json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_7",
                        "type": "function",
                        "function": {
                            "name": "generate_ideal_resume",
                            "arguments": "{\"job_description\": \"Backend engineer\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let response: CompletionResponse = serde_json::from_value(body).unwrap();
        let message = into_chat_message(response).unwrap();

        assert_eq!(message.id, "chatcmpl-1");
        assert_eq!(message.content, "");
        assert_eq!(message.tool_calls[0].name, "generate_ideal_resume");
        assert_eq!(message.tool_calls[0].args["job_description"], "Backend engineer");
    }

    #[test]
    fn test_malformed_arguments_are_a_parse_error() {
        let body = json!({
            "id": "chatcmpl-2",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_8",
                        "type": "function",
                        "function": {"name": "generate_ideal_resume", "arguments": "{not json"}
                    }]
                }
            }]
        });
        let response: CompletionResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(into_chat_message(response), Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_no_choices_is_empty_content() {
        let response: CompletionResponse =
            serde_json::from_value(json!({"id": "x", "choices": []})).unwrap();
        assert!(matches!(into_chat_message(response), Err(LlmError::EmptyContent)));
    }
}
