//! Agent runtime - tool-calling conversation over the recipe dataset
//!
//! This crate connects a question to an external text-generation service and
//! the structured recipe tools:
//! - Declares the tools the agent may call (`tools`)
//! - Runs the per-question state machine (`conversation`, `runtime`)
//! - Talks to Gemini or OpenAI through one vendor-neutral trait (`llm`)
//!
//! # Architecture
//!
//! One question makes at most two agent turns:
//! 1. **Initial turn** - question plus tool declarations go to the agent
//! 2. **Tool dispatch** - a recognised tool call runs against the dataset
//! 3. **Final turn** - the tool text goes back and the reply is the answer
//!
//! # Key Types
//!
//! - `AgentRuntime` - drives the exchange with a per-turn timeout
//! - `AgentClient` - pluggable trait for Gemini/OpenAI/scripted agents
//! - `ToolRegistry` - recipe search and nutrition lookup tools
//!
//! The agent never reads the dataset directly. Every recipe fact it sees comes
//! from a tool result produced by `larder-core`.

pub mod conversation;
pub mod gemini;
pub mod llm;
pub mod openai;
pub mod prompts;
pub mod runtime;
pub mod scripted;
pub mod tools;

pub use conversation::{Answer, AnswerOutcome, ConversationState, Turn};
pub use llm::{client_from_config, AgentClient, AgentError, AgentReply};
pub use runtime::AgentRuntime;
pub use scripted::ScriptedAgent;
pub use tools::{ToolRegistry, NUTRITION_TOOL_NAME, SEARCH_TOOL_NAME};
