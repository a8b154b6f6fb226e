//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Sends the whole transcript plus the `tools` array each round and maps the
//! reply back into an [`LlmTurn`].  All OpenAI wire types are private to this
//! module.  The tool-call loop itself belongs to the agent; this provider is
//! stateless.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{ChatMessage, LlmTurn, LlmUsage, ProviderError, ToolCall, ToolSpec};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions` with
/// function calling (OpenAI, Ollama, LM Studio, vLLM…).
///
/// Cheap to clone: `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// When `api_key` is present it is sent as `Authorization: Bearer <key>`.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    /// One round-trip: transcript + tool schemas in, text and/or tool calls out.
    pub async fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec]) -> Result<LlmTurn, ProviderError> {
        let payload = build_request(&self.model, self.temperature, messages, tools);

        debug!(
            model = %payload.model,
            messages = payload.messages.len(),
            tools = tools.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        let turn = into_turn(parsed)?;
        debug!(
            has_text = turn.text.is_some(),
            tool_calls = turn.tool_calls.len(),
            "received LLM response"
        );
        Ok(turn)
    }
}

// ── Mapping ───────────────────────────────────────────────────────────────────

fn build_request(model: &str, temperature: f32, messages: &[ChatMessage], tools: &[ToolSpec]) -> ChatCompletionRequest {
    // Some models (gpt-5 family, o-series) reject a temperature parameter.
    let temperature = if model.starts_with("gpt-5") || model.starts_with('o') {
        None
    } else {
        Some(temperature)
    };

    ChatCompletionRequest {
        model: model.to_string(),
        messages: messages.iter().map(WireMessage::from).collect(),
        temperature,
        tools: tools
            .iter()
            .map(|t| WireTool {
                kind: "function".to_string(),
                function: WireFunctionSpec {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect(),
    }
}

fn into_turn(parsed: ChatCompletionResponse) -> Result<LlmTurn, ProviderError> {
    let usage = parsed.usage.map(|u| LlmUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let message = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ProviderError::Request("response contained no choices".into()))?;

    let text = message
        .content
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let tool_calls: Vec<ToolCall> = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|c| ToolCall { id: c.id, name: c.function.name, arguments: c.function.arguments })
        .collect();

    if text.is_none() && tool_calls.is_empty() {
        return Err(ProviderError::Request("empty or missing content in response".into()));
    }

    Ok(LlmTurn { text, tool_calls, usage })
}

impl From<&ChatMessage> for WireMessage {
    fn from(m: &ChatMessage) -> Self {
        match m {
            ChatMessage::System(text) => WireMessage::plain("system", text),
            ChatMessage::User(text) => WireMessage::plain("user", text),
            ChatMessage::Assistant { content, tool_calls } => WireMessage {
                role: "assistant".to_string(),
                content: content.clone(),
                tool_calls: (!tool_calls.is_empty()).then(|| {
                    tool_calls
                        .iter()
                        .map(|c| WireToolCall {
                            id: c.id.clone(),
                            kind: "function".to_string(),
                            function: WireFunctionCall {
                                name: c.name.clone(),
                                arguments: c.arguments.clone(),
                            },
                        })
                        .collect()
                }),
                tool_call_id: None,
            },
            ChatMessage::Tool { call_id, content } => WireMessage {
                role: "tool".to_string(),
                content: Some(content.clone()),
                tool_calls: None,
                tool_call_id: Some(call_id.clone()),
            },
        }
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn plain(role: &str, text: &str) -> Self {
        Self { role: role.to_string(), content: Some(text.to_string()), tool_calls: None, tool_call_id: None }
    }
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionSpec,
}

#[derive(Debug, Serialize)]
struct WireFunctionSpec {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct UsageData {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => {
            let code = env
                .error
                .code
                .map(|v| match v {
                    serde_json::Value::String(s) => format!(" [code={s}]"),
                    other => format!(" [code={other}]"),
                })
                .unwrap_or_default();
            format!("HTTP {status}{code}: {}", env.error.message)
        }
        Err(_) => format!("HTTP {status}: {body}"),
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<LlmTurn, ProviderError> {
        into_turn(serde_json::from_value(body).unwrap())
    }

    #[test]
    fn text_reply_maps_to_turn() {
        let turn = parse(json!({
            "choices": [{ "message": { "role": "assistant", "content": "  Logged! " } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        }))
        .unwrap();
        assert_eq!(turn.text.as_deref(), Some("Logged!"));
        assert!(turn.tool_calls.is_empty());
        assert_eq!(turn.usage, Some(LlmUsage { input_tokens: 12, output_tokens: 3 }));
    }

    #[test]
    fn tool_calls_map_to_turn() {
        let turn = parse(json!({
            "choices": [{ "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": { "name": "save_meal", "arguments": "{\"description\":\"oatmeal\"}" }
                }]
            } }]
        }))
        .unwrap();
        assert!(turn.text.is_none());
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].id, "call_1");
        assert_eq!(turn.tool_calls[0].name, "save_meal");
        assert!(turn.tool_calls[0].arguments.contains("oatmeal"));
    }

    #[test]
    fn empty_message_is_error() {
        assert!(parse(json!({ "choices": [{ "message": { "content": "   " } }] })).is_err());
        assert!(parse(json!({ "choices": [] })).is_err());
    }

    #[test]
    fn request_serialises_tools_and_tool_messages() {
        let messages = vec![
            ChatMessage::System("sys".into()),
            ChatMessage::User("had a banana".into()),
            ChatMessage::Assistant {
                content: None,
                tool_calls: vec![ToolCall { id: "c1".into(), name: "save_meal".into(), arguments: "{}".into() }],
            },
            ChatMessage::Tool { call_id: "c1".into(), content: "{\"status\":\"success\"}".into() },
        ];
        let tools = vec![ToolSpec {
            name: "save_meal".into(),
            description: "Save a meal".into(),
            parameters: json!({ "type": "object", "properties": {} }),
        }];

        let req = build_request("gpt-4o-mini", 0.2, &messages, &tools);
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "save_meal");
        assert_eq!(value["messages"][2]["tool_calls"][0]["function"]["name"], "save_meal");
        assert_eq!(value["messages"][3]["role"], "tool");
        assert_eq!(value["messages"][3]["tool_call_id"], "c1");
        assert!(value["messages"][1].get("tool_calls").is_none());
    }

    #[test]
    fn temperature_omitted_for_reasoning_models() {
        let req = build_request("gpt-5-mini", 0.2, &[], &[]);
        assert!(req.temperature.is_none());
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("tools").is_none());
    }
}
