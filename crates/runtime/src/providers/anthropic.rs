//! Anthropic API backend.

use crate::model::{
    Backend, Message, ModelError, ModelOutput, ModelRequest, ModelResponse, ToolCall, Usage,
};
use crate::prompt::SYSTEM_PROMPT;
use crate::tools::ToolSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    system: &'a str,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ApiContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
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
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
    system: String,
}

impl AnthropicBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            system: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn build(self) -> AnthropicBackend {
        AnthropicBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            endpoint: format!("{}/messages", self.base_url.trim_end_matches('/')),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            system: self.system,
        }
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
    system: String,
}

impl AnthropicBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(api_key, model)
    }

    /// Convert the transcript to API messages.
    ///
    /// Consecutive tool results are merged into one user message, which is
    /// how the API expects the answers to a multi-call turn.
    fn messages_to_api(messages: &[Message]) -> Vec<ApiMessage> {
        let mut api: Vec<ApiMessage> = Vec::with_capacity(messages.len());

        for msg in messages {
            match msg {
                Message::User { content } => api.push(ApiMessage {
                    role: "user",
                    content: vec![ApiContentBlock::Text {
                        text: content.clone(),
                    }],
                }),
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
                    if !content.is_empty() {
                        blocks.push(ApiContentBlock::Text {
                            text: content.clone(),
                        });
                    }
                    blocks.extend(tool_calls.iter().map(|call| ApiContentBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.tool_name.clone(),
                        input: Value::Object(call.arguments.clone()),
                    }));
                    api.push(ApiMessage {
                        role: "assistant",
                        content: blocks,
                    });
                }
                Message::ToolResult(result) => {
                    let block = ApiContentBlock::ToolResult {
                        tool_use_id: result.call_id.clone(),
                        content: result.outcome.content(),
                        is_error: result.outcome.is_error(),
                    };
                    match api.last_mut() {
                        Some(last)
                            if last.role == "user"
                                && matches!(
                                    last.content.last(),
                                    Some(ApiContentBlock::ToolResult { .. })
                                ) =>
                        {
                            last.content.push(block)
                        }
                        _ => api.push(ApiMessage {
                            role: "user",
                            content: vec![block],
                        }),
                    }
                }
            }
        }

        api
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: spec.json_schema(),
        }
    }

    fn response_from_api(response: ApiResponse) -> Result<ModelOutput, ModelError> {
        let mut text = String::new();
        let mut calls = Vec::new();

        for block in response.content {
            match block {
                ApiResponseBlock::Text { text: t } => text.push_str(&t),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    calls.push(ToolCall::decode(id, name, input)?);
                }
                ApiResponseBlock::Unknown => {}
            }
        }

        Ok(ModelOutput {
            response: ModelResponse::classify(text, calls)?,
            usage: Usage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        })
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({})", self.model)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelOutput, ModelError> {
        let api_request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: Self::messages_to_api(request.messages),
            system: &self.system,
            temperature: self.temperature,
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Unavailable(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;

        Self::response_from_api(api_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolResult;
    use serde_json::json;

    fn decode(value: Value) -> Result<ModelOutput, ModelError> {
        AnthropicBackend::response_from_api(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn tool_use_blocks_become_tool_request() {
        let output = decode(json!({
            "content": [
                {"type": "text", "text": "Let me multiply."},
                {"type": "tool_use", "id": "toolu_1", "name": "multiply", "input": {"a": 6, "b": 7}}
            ],
            "usage": {"input_tokens": 20, "output_tokens": 5}
        }))
        .unwrap();

        assert_eq!(
            output.response,
            ModelResponse::ToolRequest {
                text: "Let me multiply.".into(),
                calls: vec![ToolCall::new("toolu_1", "multiply", json!({"a": 6, "b": 7}))],
            }
        );
        assert_eq!(output.usage.output_tokens, 5);
    }

    #[test]
    fn text_blocks_become_final_answer() {
        let output = decode(json!({
            "content": [{"type": "text", "text": "42"}, {"type": "thinking", "thinking": "..."}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .unwrap();
        assert_eq!(output.response, ModelResponse::FinalAnswer { text: "42".into() });
    }

    #[test]
    fn non_object_input_is_malformed() {
        let err = decode(json!({
            "content": [{"type": "tool_use", "id": "t", "name": "add", "input": "2+2"}],
            "usage": {"input_tokens": 1, "output_tokens": 1}
        }))
        .unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }

    #[test]
    fn consecutive_tool_results_share_one_user_message() {
        let messages = [
            Message::user("2+2 and 6*7"),
            Message::Assistant {
                content: String::new(),
                tool_calls: vec![
                    ToolCall::new("a", "add", json!({"a": 2, "b": 2})),
                    ToolCall::new("b", "divide", json!({})),
                ],
            },
            Message::ToolResult(ToolResult::success("a", json!(4))),
            Message::ToolResult(ToolResult::error("b", "unknown_tool", "tool not found: divide")),
        ];

        let api = serde_json::to_value(AnthropicBackend::messages_to_api(&messages)).unwrap();
        let api = api.as_array().unwrap();
        assert_eq!(api.len(), 3);
        assert_eq!(api[1]["content"][0]["type"], "tool_use");
        assert_eq!(api[2]["role"], "user");
        assert_eq!(api[2]["content"].as_array().unwrap().len(), 2);
        assert_eq!(api[2]["content"][0]["content"], "4");
        assert!(api[2]["content"][0].get("is_error").is_none());
        assert_eq!(api[2]["content"][1]["is_error"], true);
    }
}
