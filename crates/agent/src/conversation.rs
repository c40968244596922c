//! The per-question exchange with the agent, as an explicit state machine.
//!
//! ```text
//! Start -> AgentReplied(Initial) -> ToolDispatch -> AgentReplied(AfterTool) -> Done
//!                        \-------------------------------------------------/
//! ```
//!
//! At most one tool round trip happens per question: a reply inspected in
//! [`Turn::AfterTool`] always finishes, even when it asks for another tool.

use crate::llm::{AgentReply, FunctionCall, ReplyPart};
use crate::tools::ToolRegistry;

pub const NO_ANSWER: &str = "Sorry, I could not retrieve an answer.";
pub const TOOL_PENDING: &str = "The tool was executed, awaiting the assistant's response.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Turn {
    Initial,
    AfterTool { tool: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConversationState {
    Start,
    AgentReplied { turn: Turn, reply: AgentReply },
    ToolDispatch { call: FunctionCall },
    Done { answer: Answer },
}

impl ConversationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AgentReplied { .. } => "agent_replied",
            Self::ToolDispatch { .. } => "tool_dispatch",
            Self::Done { .. } => "done",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    Direct,
    ToolAssisted { tool: String },
    UnknownTool { name: String },
    NoContent,
    ToolPending,
}

impl AnswerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::ToolAssisted { .. } => "tool_assisted",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::NoContent => "no_content",
            Self::ToolPending => "tool_pending",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub outcome: AnswerOutcome,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    Dispatch(FunctionCall),
    Finish(Answer),
}

/// Decides what follows an agent reply without performing any I/O.
pub fn inspect_reply(turn: &Turn, reply: &AgentReply, registry: &ToolRegistry) -> Decision {
    match turn {
        Turn::Initial => inspect_initial(reply, registry),
        Turn::AfterTool { tool } => Decision::Finish(match reply.first_text() {
            Some(text) => Answer {
                text: text.to_string(),
                outcome: AnswerOutcome::ToolAssisted { tool: tool.clone() },
            },
            None => Answer { text: TOOL_PENDING.to_string(), outcome: AnswerOutcome::ToolPending },
        }),
    }
}

fn inspect_initial(reply: &AgentReply, registry: &ToolRegistry) -> Decision {
    match reply.first_part() {
        Some(ReplyPart::FunctionCall(call)) if registry.contains(&call.name) => {
            Decision::Dispatch(call.clone())
        }
        Some(ReplyPart::FunctionCall(call)) => Decision::Finish(Answer {
            text: format!("I'm sorry, I don't know how to use the tool '{}'.", call.name),
            outcome: AnswerOutcome::UnknownTool { name: call.name.clone() },
        }),
        Some(ReplyPart::Text(text)) => {
            Decision::Finish(Answer { text: text.clone(), outcome: AnswerOutcome::Direct })
        }
        Some(ReplyPart::Other) | None => Decision::Finish(Answer {
            text: no_answer_text(reply),
            outcome: AnswerOutcome::NoContent,
        }),
    }
}

fn no_answer_text(reply: &AgentReply) -> String {
    let mut details = Vec::new();
    if let Some(reason) = reply.finish_reason() {
        details.push(format!("finish reason: {reason}"));
    }
    if let Some(feedback) = &reply.prompt_feedback {
        details.push(format!("feedback: {feedback}"));
    }

    if details.is_empty() {
        NO_ANSWER.to_string()
    } else {
        format!("{NO_ANSWER} ({})", details.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use larder_core::dataset::DatasetStore;
    use serde_json::json;

    use super::{
        inspect_reply, Answer, AnswerOutcome, ConversationState, Decision, Turn, NO_ANSWER,
        TOOL_PENDING,
    };
    use crate::llm::{AgentReply, ReplyCandidate, ReplyPart};
    use crate::tools::{ToolRegistry, SEARCH_TOOL_NAME};

    fn registry() -> ToolRegistry {
        ToolRegistry::recipe_tools(Arc::new(DatasetStore::default()), 3)
    }

    #[test]
    fn recognized_tool_call_dispatches_on_first_turn() {
        let reply = AgentReply::function_call(SEARCH_TOOL_NAME, json!({"category": "Soup"}));

        match inspect_reply(&Turn::Initial, &reply, &registry()) {
            Decision::Dispatch(call) => {
                assert_eq!(call.name, SEARCH_TOOL_NAME);
                assert_eq!(call.args_value(), json!({"category": "Soup"}));
            }
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn tool_call_after_tool_result_is_never_dispatched() {
        let reply = AgentReply::function_call(SEARCH_TOOL_NAME, json!({}));
        let turn = Turn::AfterTool { tool: SEARCH_TOOL_NAME.to_string() };

        match inspect_reply(&turn, &reply, &registry()) {
            Decision::Finish(answer) => {
                assert_eq!(answer.text, TOOL_PENDING);
                assert_eq!(answer.outcome, AnswerOutcome::ToolPending);
            }
            other => panic!("expected finish, got {other:?}"),
        }
    }

    #[test]
    fn second_turn_text_is_returned_verbatim() {
        let reply = AgentReply::text("## Soups\n- Pumpkin");
        let turn = Turn::AfterTool { tool: SEARCH_TOOL_NAME.to_string() };

        assert_eq!(
            inspect_reply(&turn, &reply, &registry()),
            Decision::Finish(super::Answer {
                text: "## Soups\n- Pumpkin".to_string(),
                outcome: AnswerOutcome::ToolAssisted { tool: SEARCH_TOOL_NAME.to_string() },
            })
        );
    }

    #[test]
    fn unknown_tool_finishes_with_apology() {
        let reply = AgentReply::function_call("order_groceries", json!({}));

        match inspect_reply(&Turn::Initial, &reply, &registry()) {
            Decision::Finish(answer) => {
                assert_eq!(
                    answer.text,
                    "I'm sorry, I don't know how to use the tool 'order_groceries'."
                );
                assert_eq!(
                    answer.outcome,
                    AnswerOutcome::UnknownTool { name: "order_groceries".to_string() }
                );
            }
            other => panic!("expected finish, got {other:?}"),
        }
    }

    #[test]
    fn empty_reply_reports_available_metadata() {
        let bare = inspect_reply(&Turn::Initial, &AgentReply::empty(), &registry());
        assert!(matches!(bare, Decision::Finish(ref answer) if answer.text == NO_ANSWER));

        let blocked = AgentReply {
            candidates: vec![ReplyCandidate {
                parts: vec![ReplyPart::Other],
                finish_reason: Some("SAFETY".to_string()),
            }],
            prompt_feedback: Some("blocked: SAFETY".to_string()),
        };
        match inspect_reply(&Turn::Initial, &blocked, &registry()) {
            Decision::Finish(answer) => {
                assert_eq!(
                    answer.text,
                    "Sorry, I could not retrieve an answer. (finish reason: SAFETY; feedback: blocked: SAFETY)"
                );
                assert_eq!(answer.outcome, AnswerOutcome::NoContent);
            }
            other => panic!("expected finish, got {other:?}"),
        }
    }

    #[test]
    fn state_names_follow_the_exchange() {
        let done = ConversationState::Done {
            answer: Answer { text: "ok".to_string(), outcome: AnswerOutcome::Direct },
        };
        assert_eq!(ConversationState::Start.name(), "start");
        assert_eq!(done.name(), "done");
    }
}
