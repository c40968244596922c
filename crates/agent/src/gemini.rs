//! Google Generative Language API client (`models/{model}:generateContent`).

use std::time::Duration;

use async_trait::async_trait;
use larder_core::config::LlmConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::llm::{
    http_client, transport_error, AgentClient, AgentError, AgentMessage, AgentReply, AgentRequest,
    FunctionCall, ReplyCandidate, ReplyPart,
};
use crate::tools::ToolDeclaration;

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig, timeout: Duration) -> Result<Self, AgentError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AgentError::NotConfigured("llm.api_key is missing".to_string()))?;

        Ok(Self {
            client: http_client(timeout)?,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            api_key,
            model: config.effective_model().to_string(),
            temperature: config.temperature,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request(&self, request: &AgentRequest<'_>) -> GeminiRequest {
        GeminiRequest {
            contents: request.messages.iter().map(content_for).collect(),
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(request.system_prompt)],
            }),
            tools: tools_for(request.tools),
            generation_config: GenerationConfig { temperature: self.temperature },
        }
    }
}

#[async_trait]
impl AgentClient for GeminiClient {
    async fn generate(&self, request: AgentRequest<'_>) -> Result<AgentReply, AgentError> {
        let body = self.build_request(&request);
        debug!(
            model = %self.model,
            messages = body.contents.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| transport_error(error, self.timeout))?;

        let status = response.status();
        let text = response.text().await.map_err(|error| transport_error(error, self.timeout))?;
        if !status.is_success() {
            let message = api_error_message(&text);
            return Err(AgentError::Api { status: status.as_u16(), message });
        }

        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|error| {
                AgentError::MalformedReply(format!("unexpected Gemini response body: {error}"))
            })?;
        parsed.into_reply()
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn content_for(message: &AgentMessage) -> GeminiContent {
    match message {
        AgentMessage::User(text) => {
            GeminiContent { role: Some("user".to_string()), parts: vec![GeminiPart::text(text)] }
        }
        AgentMessage::ToolCall(call) => GeminiContent {
            role: Some("model".to_string()),
            parts: vec![GeminiPart {
                function_call: Some(GeminiFunctionCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    args: Some(call.args_value()),
                }),
                ..GeminiPart::default()
            }],
        },
        AgentMessage::ToolResult { call_id, name, content } => GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                function_response: Some(GeminiFunctionResponse {
                    id: call_id.clone(),
                    name: name.clone(),
                    response: serde_json::json!({ "content": content }),
                }),
                ..GeminiPart::default()
            }],
        },
    }
}

fn tools_for(declarations: &[ToolDeclaration]) -> Vec<GeminiTool> {
    if declarations.is_empty() {
        return Vec::new();
    }
    vec![GeminiTool { function_declarations: declarations.to_vec() }]
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<ToolDeclaration>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self { text: Some(text.to_string()), ..Self::default() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

impl GeminiResponse {
    fn into_reply(self) -> Result<AgentReply, AgentError> {
        let candidates = self
            .candidates
            .into_iter()
            .map(|candidate| {
                let parts = candidate
                    .content
                    .map(|content| content.parts)
                    .unwrap_or_default()
                    .into_iter()
                    .map(reply_part)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ReplyCandidate { parts, finish_reason: candidate.finish_reason })
            })
            .collect::<Result<Vec<_>, AgentError>>()?;

        let prompt_feedback = self
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("blocked: {reason}"));

        Ok(AgentReply { candidates, prompt_feedback })
    }
}

fn reply_part(part: GeminiPart) -> Result<ReplyPart, AgentError> {
    if let Some(call) = part.function_call {
        let args = match call.args {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(args)) => args,
            Some(other) => {
                return Err(AgentError::MalformedReply(format!(
                    "function call `{}` carried non-object arguments: {other}",
                    call.name
                )))
            }
        };
        return Ok(ReplyPart::FunctionCall(FunctionCall { id: call.id, name: call.name, args }));
    }

    Ok(part.text.map(ReplyPart::Text).unwrap_or(ReplyPart::Other))
}
