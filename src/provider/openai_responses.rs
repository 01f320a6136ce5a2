//! OpenAI Responses API endpoint (also served by Groq and other compatible hosts).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::TurnloopError;
use crate::tools::ToolDescriptor;
use crate::types::{GenerationSettings, Turn};

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{EndpointRequest, ModelEndpoint};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiResponsesEndpoint {
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiResponsesEndpoint {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request_body(request: &EndpointRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "input": Self::build_input_items(&request.turns),
            "tools": Self::build_tools(&request.tools),
        });
        Self::apply_settings(&mut body, &request.settings);
        body
    }

    fn apply_settings(body: &mut Value, settings: &GenerationSettings) {
        if let Some(temperature) = settings.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_output_tokens) = settings.max_output_tokens {
            body["max_output_tokens"] = json!(max_output_tokens);
        }
    }

    fn build_input_items(turns: &[Turn]) -> Vec<Value> {
        turns
            .iter()
            .map(|turn| match turn {
                Turn::UserMessage { text } => json!({ "role": "user", "content": text }),
                Turn::AssistantMessage { text } => json!({ "role": "assistant", "content": text }),
                Turn::FunctionCallRequest(call) => json!({
                    "type": "function_call",
                    "call_id": call.call_id,
                    "name": call.name,
                    "arguments": encode_arguments(&call.arguments),
                }),
                Turn::FunctionCallOutput(output) => json!({
                    "type": "function_call_output",
                    "call_id": output.call_id,
                    "output": output.output,
                }),
            })
            .collect()
    }

    fn build_tools(tools: &[ToolDescriptor]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                })
            })
            .collect()
    }

    /// Convert a Responses API payload into turns, preserving output order.
    fn parse_response(data: ResponsesApiResponse) -> Result<Vec<Turn>, TurnloopError> {
        let outputs = data.output.ok_or_else(|| {
            TurnloopError::MalformedResponse("response has no 'output' array".into())
        })?;

        let mut turns = Vec::new();
        for item in outputs {
            match item.r#type.as_str() {
                "message" => {
                    let text: String = item
                        .content
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|part| match part.r#type.as_str() {
                            "output_text" => part.text,
                            "refusal" => part.refusal,
                            _ => None,
                        })
                        .collect();
                    if !text.is_empty() {
                        turns.push(Turn::assistant(text));
                    }
                }
                "function_call" => {
                    let (Some(call_id), Some(name)) = (item.call_id, item.name) else {
                        return Err(TurnloopError::MalformedResponse(
                            "function_call item without call_id or name".into(),
                        ));
                    };
                    let arguments = decode_arguments(item.arguments.as_deref().unwrap_or(""));
                    turns.push(Turn::call(call_id, name, arguments));
                }
                other => debug!(item_type = other, "Skipping Responses output item"),
            }
        }
        Ok(turns)
    }
}

/// Arguments travel as a JSON-encoded string on the wire.
fn encode_arguments(arguments: &Value) -> String {
    match arguments {
        Value::String(raw) => raw.clone(),
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

/// Undecodable arguments are kept verbatim so the dispatcher can reject them.
fn decode_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[async_trait]
impl ModelEndpoint for OpenAiResponsesEndpoint {
    fn endpoint_name(&self) -> &str {
        "openai-responses"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn query(&self, request: &EndpointRequest) -> Result<Vec<Turn>, TurnloopError> {
        let body = Self::build_request_body(request);
        let url = format!("{}/responses", self.base_url);

        debug!(
            model = %request.model,
            turns = request.turns.len(),
            tools = request.tools.len(),
            "OpenAI Responses query"
        );

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        let body_text = resp.text().await?;
        if !(200..300).contains(&status) {
            return Err(status_to_error(status, &body_text));
        }

        let data: ResponsesApiResponse = serde_json::from_str(&body_text)
            .map_err(|e| TurnloopError::MalformedResponse(format!("undecodable body: {e}")))?;
        Self::parse_response(data)
    }
}

#[derive(Deserialize)]
struct ResponsesApiResponse {
    output: Option<Vec<ResponsesOutputItem>>,
}

#[derive(Deserialize)]
struct ResponsesOutputItem {
    r#type: String,
    #[serde(default)]
    content: Option<Vec<ResponsesOutputContent>>,
    #[serde(default)]
    call_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ResponsesOutputContent {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}
