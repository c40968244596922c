use std::sync::Arc;
use std::time::Duration;

use larder_core::errors::ApplicationError;
use tracing::{debug, info, warn};

use crate::conversation::{inspect_reply, Answer, AnswerOutcome, ConversationState, Decision, Turn};
use crate::llm::{AgentClient, AgentError, AgentMessage, AgentReply, AgentRequest, FunctionCall};
use crate::prompts::SYSTEM_PROMPT;
use crate::tools::{ToolDeclaration, ToolRegistry};

/// Drives one question through the conversation state machine.
pub struct AgentRuntime {
    client: Arc<dyn AgentClient>,
    registry: Arc<ToolRegistry>,
    declarations: Vec<ToolDeclaration>,
    system_prompt: String,
    turn_timeout: Duration,
}

impl AgentRuntime {
    pub fn new(
        client: Arc<dyn AgentClient>,
        registry: Arc<ToolRegistry>,
        turn_timeout: Duration,
    ) -> Self {
        let declarations = registry.declarations();
        Self {
            client,
            registry,
            declarations,
            system_prompt: SYSTEM_PROMPT.to_string(),
            turn_timeout,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Validates the question and maps failures onto the application taxonomy.
    pub async fn ask(
        &self,
        question: &str,
        correlation_id: &str,
    ) -> Result<Answer, ApplicationError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ApplicationError::InvalidRequest("question must not be empty".to_string()));
        }

        self.answer(question, correlation_id).await.map_err(|error| {
            warn!(
                event_name = "agent.answer.failed",
                correlation_id,
                error = %error,
                "agent exchange failed"
            );
            ApplicationError::from(error)
        })
    }

    pub async fn answer(&self, question: &str, correlation_id: &str) -> Result<Answer, AgentError> {
        let mut transcript = vec![AgentMessage::User(question.to_string())];
        let mut state = ConversationState::Start;

        loop {
            debug!(
                event_name = "agent.state",
                correlation_id,
                state = state.name(),
                "conversation step"
            );
            state = match state {
                ConversationState::Start => {
                    let reply = self.turn(&transcript, correlation_id).await?;
                    ConversationState::AgentReplied { turn: Turn::Initial, reply }
                }
                ConversationState::AgentReplied { turn, reply } => {
                    match inspect_reply(&turn, &reply, &self.registry) {
                        Decision::Dispatch(call) => ConversationState::ToolDispatch { call },
                        Decision::Finish(answer) => ConversationState::Done { answer },
                    }
                }
                ConversationState::ToolDispatch { call } => {
                    let content = self.dispatch(&call, correlation_id).await?;
                    transcript.push(AgentMessage::ToolCall(call.clone()));
                    transcript.push(AgentMessage::ToolResult {
                        call_id: call.id.clone(),
                        name: call.name.clone(),
                        content,
                    });

                    let reply = self.turn(&transcript, correlation_id).await?;
                    let turn = Turn::AfterTool { tool: call.name };
                    ConversationState::AgentReplied { turn, reply }
                }
                ConversationState::Done { answer } => {
                    if let AnswerOutcome::UnknownTool { name } = &answer.outcome {
                        warn!(
                            event_name = "agent.tool.unknown",
                            correlation_id,
                            tool = %name,
                            "agent requested a tool that is not registered"
                        );
                    }
                    info!(
                        event_name = "agent.answer.ready",
                        correlation_id,
                        outcome = answer.outcome.as_str(),
                        answer_chars = answer.text.chars().count(),
                        "answer ready"
                    );
                    return Ok(answer);
                }
            };
        }
    }

    async fn turn(
        &self,
        transcript: &[AgentMessage],
        correlation_id: &str,
    ) -> Result<AgentReply, AgentError> {
        let request = AgentRequest {
            system_prompt: &self.system_prompt,
            messages: transcript,
            tools: &self.declarations,
        };

        let reply = tokio::time::timeout(self.turn_timeout, self.client.generate(request))
            .await
            .map_err(|_| AgentError::Timeout(self.turn_timeout.as_secs()))??;

        info!(
            event_name = "agent.turn.completed",
            correlation_id,
            provider = self.client.provider_name(),
            model = self.client.model_name(),
            candidates = reply.candidates.len(),
            finish_reason = reply.finish_reason().unwrap_or("none"),
            "agent turn completed"
        );
        Ok(reply)
    }

    async fn dispatch(
        &self,
        call: &FunctionCall,
        correlation_id: &str,
    ) -> Result<String, AgentError> {
        let tool = self.registry.get(&call.name).ok_or_else(|| AgentError::ToolFailed {
            tool: call.name.clone(),
            message: "tool is not registered".to_string(),
        })?;

        info!(
            event_name = "agent.tool.dispatched",
            correlation_id,
            tool = %call.name,
            args = %call.args_value(),
            "dispatching tool call"
        );

        tool.execute(call.args_value()).await.map_err(|error| match error.downcast::<AgentError>() {
            Ok(agent_error) => agent_error,
            Err(other) => {
                AgentError::ToolFailed { tool: call.name.clone(), message: other.to_string() }
            }
        })
    }
}
