//! The question-answering agent.
//!
//! [`Agent::run`] drives a completion model through the text tool-call
//! protocol: format the conversation, call the model, extract invocations,
//! run the tools, and repeat until the model answers without tools or the
//! run has to stop. Every run ends with an [`AgentResponse`], failures
//! included.

mod answer;
mod runner;

pub use answer::final_answer;
pub use runner::{Agent, AgentResponse, RunOutcome, ToolCallRecord};
