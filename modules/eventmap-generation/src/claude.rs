//! Minimal Anthropic Messages API client for forced tool-use extraction.
//!
//! Only what the event generator needs: one request shape, one tool, and
//! structured decoding of the tool input.

use anyhow::{anyhow, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const TOOL_NAME: &str = "structured_response";

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the model to answer by calling a single tool whose input schema is
    /// `T`'s JSON schema, then decode that input.
    pub async fn extract<T: JsonSchema + DeserializeOwned>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let request = ToolRequest {
            model: self.model.clone(),
            max_tokens: 4096,
            system: system_prompt.into(),
            messages: vec![UserMessage {
                role: "user",
                content: user_prompt.into(),
            }],
            tools: vec![ToolDefinition {
                name: TOOL_NAME,
                description: "Return the generated events.",
                input_schema: input_schema::<T>()?,
            }],
            tool_choice: serde_json::json!({ "type": "tool", "name": TOOL_NAME }),
        };

        let response = self.send(&request).await?;
        decode_tool_input(response)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn send(&self, request: &ToolRequest) -> Result<ToolResponse> {
        let url = format!("{}/messages", self.base_url);
        debug!(model = %request.model, "Claude tool request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Claude API error ({status}): {body}"));
        }

        Ok(response.json().await?)
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct ToolRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<UserMessage>,
    tools: Vec<ToolDefinition>,
    tool_choice: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct UserMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ToolDefinition {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ToolResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        #[allow(dead_code)]
        text: String,
    },
    ToolUse {
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

fn decode_tool_input<T: DeserializeOwned>(response: ToolResponse) -> Result<T> {
    let input = response
        .content
        .into_iter()
        .find_map(|block| match block {
            ContentBlock::ToolUse { input } => Some(input),
            _ => None,
        })
        .ok_or_else(|| anyhow!("No structured output in Claude response"))?;

    serde_json::from_value(input).map_err(|e| anyhow!("Failed to deserialize response: {e}"))
}

/// JSON schema for `T` with every `$ref` inlined, so the tool definition is
/// self-contained.
fn input_schema<T: JsonSchema>() -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(schema_for!(T))
        .map_err(|e| anyhow!("Failed to serialize tool schema: {e}"))?;
    let definitions = value.get("definitions").cloned();

    if let Some(defs) = definitions {
        inline_refs(&mut value, &defs);
    }
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("definitions");
        map.remove("$schema");
    }
    Ok(value)
}

fn inline_refs(value: &mut serde_json::Value, definitions: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(|r| r.as_str())
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();
            if let Some(mut def) = target {
                inline_refs(&mut def, definitions);
                *value = def;
                return;
            }
            for v in map.values_mut() {
                inline_refs(v, definitions);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}
