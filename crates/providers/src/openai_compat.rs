//! OpenAI-compatible provider — streaming chat completions over SSE.
//!
//! Handles tool use / function calling: tool-call fragments arrive
//! incrementally across deltas and are assembled before the final chunk.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

use namecard_core::error::ProviderError;
use namecard_core::provider::{
    CompletionRequest, PromptMessage, PromptRole, Provider, StreamChunk, ToolDefinition,
    ToolInvocation,
};

/// A provider speaking the OpenAI `/chat/completions` wire format.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    fn request_body(request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": to_wire_messages(&request.messages),
            "temperature": request.temperature,
            "stream": true,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(to_wire_tools(&request.tools));
        }
        body
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::request_body(&request);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status().as_u16();
        match status {
            200 => {}
            429 => {
                return Err(ProviderError::RateLimited { retry_after_secs: 5 });
            }
            401 | 403 => {
                return Err(ProviderError::AuthenticationFailed(
                    "Invalid API key or insufficient permissions".into(),
                ));
            }
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(status, body = %error_body, "Provider streaming error");
                return Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_body,
                });
            }
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream and translate it into StreamChunks.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut calls = CallAssembler::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines; a partial line stays buffered.
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer.drain(..=line_end);

                    let Some(data) = sse_data(&line) else { continue };

                    if data == "[DONE]" {
                        let _ = tx.send(Ok(StreamChunk::finished(calls.finish()))).await;
                        return;
                    }

                    match serde_json::from_str::<WireStreamPayload>(data) {
                        Ok(payload) => {
                            if let Some(choice) = payload.choices.first() {
                                calls.absorb(&choice.delta);

                                let fragment = choice.delta.content.as_deref().unwrap_or_default();
                                if !fragment.is_empty()
                                    && tx.send(Ok(StreamChunk::text(fragment))).await.is_err()
                                {
                                    return; // receiver dropped
                                }
                            }
                        }
                        Err(e) => {
                            trace!(
                                provider = %provider_name,
                                data = %data,
                                error = %e,
                                "Ignoring unparseable SSE chunk"
                            );
                        }
                    }
                }
            }

            // Stream ended without [DONE] — still emit the final chunk.
            let _ = tx.send(Ok(StreamChunk::finished(calls.finish()))).await;
        });

        Ok(rx)
    }
}

fn classify_request_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Extract the payload of an SSE `data:` line; `None` for anything else.
fn sse_data(line: &str) -> Option<&str> {
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    line.strip_prefix("data: ").map(str::trim)
}

/// Assembles incremental tool-call deltas, keyed (and later ordered) by the
/// delta index so parallel calls come out in the order the model issued them.
#[derive(Default)]
struct CallAssembler {
    pending: BTreeMap<u32, PendingCall>,
}

#[derive(Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

impl CallAssembler {
    fn absorb(&mut self, delta: &WireDelta) {
        let Some(tool_calls) = &delta.tool_calls else {
            return;
        };
        for tc in tool_calls {
            let pending = self.pending.entry(tc.index).or_default();
            if let Some(id) = &tc.id {
                pending.id = id.clone();
            }
            if let Some(function) = &tc.function {
                if let Some(name) = &function.name {
                    pending.name = name.clone();
                }
                if let Some(arguments) = &function.arguments {
                    pending.arguments.push_str(arguments);
                }
            }
        }
    }

    fn finish(self) -> Vec<ToolInvocation> {
        self.pending
            .into_values()
            .map(|p| ToolInvocation {
                id: p.id,
                name: p.name,
                arguments: p.arguments,
            })
            .collect()
    }
}

// --- wire types ---

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    id: String,
    r#type: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireToolDefinition {
    r#type: &'static str,
    function: WireFunctionDefinition,
}

#[derive(Debug, Serialize)]
struct WireFunctionDefinition {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

fn to_wire_messages(messages: &[PromptMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: match m.role {
                PromptRole::System => "system",
                PromptRole::User => "user",
                PromptRole::Assistant => "assistant",
                PromptRole::Tool => "tool",
            },
            content: Some(m.content.clone()),
            tool_calls: if m.tool_calls.is_empty() {
                None
            } else {
                Some(
                    m.tool_calls
                        .iter()
                        .map(|tc| WireToolCall {
                            id: tc.id.clone(),
                            r#type: "function",
                            function: WireFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: m.tool_call_id.clone(),
        })
        .collect()
}

fn to_wire_tools(tools: &[ToolDefinition]) -> Vec<WireToolDefinition> {
    tools
        .iter()
        .map(|t| WireToolDefinition {
            r#type: "function",
            function: WireFunctionDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .collect()
}

/// One SSE `data: {...}` payload from a streaming response.
#[derive(Debug, Deserialize)]
struct WireStreamPayload {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    delta: WireDelta,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCallDelta>>,
}

/// A tool-call delta — arrives incrementally across chunks.
#[derive(Debug, Deserialize)]
struct WireToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<WireFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct WireFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
