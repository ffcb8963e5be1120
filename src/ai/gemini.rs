//! Gemini `generateContent` client.
//!
//! Conversation messages, completed tool rounds, and tool declarations are
//! converted into the Gemini wire format; the response is parsed into the
//! provider-agnostic [`LlmResponse`]. Gemini does not return tool-call ids,
//! so ids are synthesized locally and results are attributed back by
//! position within the round.

use crate::ai::types::{LlmError, LlmResponse, ToolCall, ToolHistoryEntry};
use crate::ai::{LlmClient, Message, MessageRole};
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub struct GeminiClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDeclarations>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Part {
            text: Some(text.into()),
            function_call: None,
            function_response: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, endpoint: &str, model: &str) -> Result<Self, String> {
        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let auth_value = header::HeaderValue::from_str(api_key)
            .map_err(|e| format!("Invalid API key format: {}", e))?;
        auth_headers.insert("x-goog-api-key", auth_value);

        Ok(Self {
            client: crate::http::shared_client().clone(),
            auth_headers,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn build_contents(
        messages: &[Message],
        tool_history: &[ToolHistoryEntry],
    ) -> (Vec<Content>, Option<Content>) {
        let mut system_texts: Vec<String> = Vec::new();
        let mut contents: Vec<Content> = Vec::new();

        for message in messages {
            match message.role {
                MessageRole::System => system_texts.push(message.content.clone()),
                MessageRole::User => contents.push(Content {
                    role: Some("user".to_string()),
                    parts: vec![Part::text(&message.content)],
                }),
                MessageRole::Assistant => contents.push(Content {
                    role: Some("model".to_string()),
                    parts: vec![Part::text(&message.content)],
                }),
            }
        }

        // Each completed round becomes a model functionCall turn followed by
        // a user functionResponse turn, so the model sees the whole round at
        // once
        for entry in tool_history {
            let call_parts: Vec<Part> = entry
                .tool_calls
                .iter()
                .map(|tc| Part {
                    text: None,
                    function_call: Some(FunctionCall {
                        name: tc.name.clone(),
                        args: Some(tc.arguments.clone()),
                    }),
                    function_response: None,
                })
                .collect();
            contents.push(Content {
                role: Some("model".to_string()),
                parts: call_parts,
            });

            let response_parts: Vec<Part> = entry
                .tool_responses
                .iter()
                .map(|tr| Part {
                    text: None,
                    function_call: None,
                    function_response: Some(FunctionResponse {
                        name: tr.tool_name.clone(),
                        response: tr.content.clone(),
                    }),
                })
                .collect();
            contents.push(Content {
                role: Some("user".to_string()),
                parts: response_parts,
            });
        }

        let system_instruction = if system_texts.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part::text(system_texts.join("\n\n"))],
            })
        };

        (contents, system_instruction)
    }

    fn build_tools(tools: &[ToolDefinition]) -> Option<Vec<ToolDeclarations>> {
        if tools.is_empty() {
            return None;
        }
        Some(vec![ToolDeclarations {
            function_declarations: tools
                .iter()
                .map(|t| FunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.to_json_schema(),
                })
                .collect(),
        }])
    }

    fn parse_response(response: GenerateContentResponse) -> LlmResponse {
        let mut text_parts: Vec<String> = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        if let Some(content) = response.candidates.into_iter().next().and_then(|c| c.content) {
            for (index, part) in content.parts.into_iter().enumerate() {
                if let Some(text) = part.text {
                    text_parts.push(text);
                }
                if let Some(call) = part.function_call {
                    tool_calls.push(ToolCall {
                        id: format!("call_{}_{}", uuid::Uuid::new_v4().simple(), index),
                        name: call.name,
                        arguments: call.args.unwrap_or_else(|| Value::Object(Default::default())),
                    });
                }
            }
        }

        LlmResponse {
            content: text_parts.join(""),
            tool_calls,
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn send(
        &self,
        messages: Vec<Message>,
        tool_history: Vec<ToolHistoryEntry>,
        tools: Vec<ToolDefinition>,
    ) -> Result<LlmResponse, LlmError> {
        let (contents, system_instruction) = Self::build_contents(&messages, &tool_history);
        let request = GenerateContentRequest {
            contents,
            system_instruction,
            tools: Self::build_tools(&tools),
        };

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        log::debug!(
            "[GEMINI] Request: model={} contents={} tools={}",
            self.model,
            request.contents.len(),
            tools.len()
        );

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::new(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::new(format!("Gemini read failed: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            return Err(LlmError::with_status(
                format!("Gemini API error: {}", message),
                status.as_u16(),
            ));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::new(format!("Gemini returned malformed JSON: {}", e)))?;
        Ok(Self::parse_response(parsed))
    }
}
