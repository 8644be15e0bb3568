//! Google Gemini backend
//!
//! Talks to the `generateContent` endpoint with native function calling.
//! Gemini does not assign ids to function calls, so this backend mints
//! them; the ids only need to be unique within a conversation.

use crate::*;
use reqwest::Client;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
    next_call_id: AtomicU64,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: api_base
                .unwrap_or_else(|| GEMINI_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            default_model: default_model.unwrap_or_else(|| "gemini-2.5-flash".to_string()),
            next_call_id: AtomicU64::new(0),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let mut system_parts = Vec::new();
        let mut contents: Vec<serde_json::Value> = Vec::new();

        for m in &params.messages {
            match m.role.as_str() {
                "system" => {
                    if let Some(text) = &m.content {
                        system_parts.push(json!({ "text": text }));
                    }
                }
                "assistant" => {
                    let mut parts = Vec::new();
                    if let Some(text) = m.content.as_deref().filter(|t| !t.is_empty()) {
                        parts.push(json!({ "text": text }));
                    }
                    for call in m.tool_calls.iter().flatten() {
                        parts.push(json!({
                            "functionCall": {
                                "name": &call.function.name,
                                "args": &call.function.arguments,
                            }
                        }));
                    }
                    if !parts.is_empty() {
                        contents.push(json!({ "role": "model", "parts": parts }));
                    }
                }
                "tool" => {
                    let part = json!({
                        "functionResponse": {
                            "name": m.name.as_deref().unwrap_or_default(),
                            "response": { "content": m.content.as_deref().unwrap_or_default() },
                        }
                    });
                    // Responses to one model turn travel together in a single content
                    let grouped = contents.last().map(is_function_response).unwrap_or(false);
                    if grouped {
                        if let Some(parts) =
                            contents.last_mut().and_then(|c| c["parts"].as_array_mut())
                        {
                            parts.push(part);
                        }
                    } else {
                        contents.push(json!({ "role": "user", "parts": [part] }));
                    }
                }
                _ => {
                    let text = m.content.as_deref().unwrap_or_default();
                    contents.push(json!({ "role": "user", "parts": [{ "text": text }] }));
                }
            }
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": wire_temperature(params.temperature),
                "maxOutputTokens": params.max_tokens,
            }
        });

        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
        }

        if !params.tools.is_empty() {
            let declarations: Vec<serde_json::Value> = params
                .tools
                .iter()
                .map(|t| {
                    let mut decl = json!({
                        "name": &t.function.name,
                        "description": &t.function.description,
                    });
                    let has_properties = t.function.parameters["properties"]
                        .as_object()
                        .map(|p| !p.is_empty())
                        .unwrap_or(false);
                    if has_properties {
                        decl["parameters"] = t.function.parameters.clone();
                    }
                    decl
                })
                .collect();

            body["tools"] = json!([{ "functionDeclarations": declarations }]);
            body["toolConfig"] = match &params.tool_choice {
                ToolChoice::Auto => json!({ "functionCallingConfig": { "mode": "AUTO" } }),
                ToolChoice::Required(name) => json!({
                    "functionCallingConfig": { "mode": "ANY", "allowedFunctionNames": [name] }
                }),
                ToolChoice::None => json!({ "functionCallingConfig": { "mode": "NONE" } }),
            };
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let candidate = json["candidates"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let parts = candidate["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        for part in &parts {
            if let Some(text) = part["text"].as_str() {
                texts.push(text.to_string());
            }
            if let Some(call) = part.get("functionCall") {
                let id = self.next_call_id.fetch_add(1, Ordering::Relaxed);
                tool_calls.push(ToolCall {
                    id: format!("gemini_call_{}", id),
                    name: call["name"].as_str().unwrap_or("").to_string(),
                    arguments: call
                        .get("args")
                        .cloned()
                        .unwrap_or_else(|| json!({})),
                });
            }
        }

        let content = if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        };

        let finish_reason = if tool_calls.is_empty() {
            candidate["finishReason"]
                .as_str()
                .unwrap_or("STOP")
                .to_lowercase()
        } else {
            "tool_calls".to_string()
        };

        let usage = if let Some(meta) = json["usageMetadata"].as_object() {
            let count = |key: &str| meta.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
            Usage {
                prompt_tokens: count("promptTokenCount"),
                completion_tokens: count("candidatesTokenCount"),
                total_tokens: count("totalTokenCount"),
            }
        } else {
            Usage::default()
        };

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

fn is_function_response(content: &serde_json::Value) -> bool {
    content["role"] == "user"
        && content["parts"]
            .as_array()
            .map(|parts| parts.iter().all(|p| p.get("functionResponse").is_some()))
            .unwrap_or(false)
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };
        let url = self.endpoint(&model);
        trace!("Sending generateContent to {}", url);

        let body = self.build_request(&params);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        let json: serde_json::Value = response.json().await?;

        if !status.is_success() {
            let error = json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(ProviderError::Api(format!("{} ({})", error, status)));
        }

        let response = self.parse_response(json)?;
        debug!("Gemini returned {} tool calls", response.tool_calls.len());
        Ok(response)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
