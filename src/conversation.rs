//! Conversation history shared by the formatter, the extractor and the agent loop.
//!
//! A [`Conversation`] is an append-only list of role-tagged [`Turn`]s. Every
//! append goes through [`Conversation::push`], which enforces the ordering and
//! correlation rules the prompt protocol relies on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The role of a turn in the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// The result of executing an [`Invocation`].
    Tool,
}

/// A model-requested call into an external tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invocation {
    /// Correlation id, matched by the tool-result turn that answers it.
    pub id: String,
    pub name: String,
    /// Free-form, untyped arguments.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl Invocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One step in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    /// Only populated on assistant turns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invocations: Vec<Invocation>,
    /// Only populated on tool-result turns: the id of the invocation answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<String>,
}

impl Turn {
    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text)
    }

    /// Assistant turn carrying tool invocations. `text` is the raw generation,
    /// kept for auditing.
    pub fn assistant_with_invocations(text: impl Into<String>, invocations: Vec<Invocation>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            invocations,
            answers: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            text: text.into(),
            invocations: Vec::new(),
            answers: Some(call_id.into()),
        }
    }

    fn plain(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            invocations: Vec::new(),
            answers: None,
        }
    }

    pub fn has_invocations(&self) -> bool {
        !self.invocations.is_empty()
    }
}

/// Violations of the conversation contract.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error("a system turn may only appear first, and only once")]
    MisplacedSystemTurn,

    #[error("assistant turn has neither text nor invocations")]
    EmptyAssistantTurn,

    #[error("tool result answers unknown call id '{0}'")]
    UnmatchedToolResult(String),

    #[error("tool result turn has no call id")]
    MissingCallId,

    #[error("call id '{0}' is already in use")]
    DuplicateCallId(String),

    #[error("{0:?} turns cannot carry invocations")]
    UnexpectedInvocations(Role),
}

/// Ordered, append-only sequence of turns for one agent run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with a system instruction and the user's question.
    pub fn with_question(system_prompt: &str, question: &str) -> Self {
        let mut conversation = Self::new();
        if !system_prompt.trim().is_empty() {
            conversation.turns.push(Turn::system(system_prompt));
        }
        conversation.turns.push(Turn::user(question));
        conversation
    }

    /// Append a turn, rejecting anything that would break the invariants.
    pub fn push(&mut self, turn: Turn) -> Result<(), ConversationError> {
        self.validate(&turn)?;
        self.turns.push(turn);
        Ok(())
    }

    fn validate(&self, turn: &Turn) -> Result<(), ConversationError> {
        if turn.has_invocations() && turn.role != Role::Assistant {
            return Err(ConversationError::UnexpectedInvocations(turn.role));
        }

        match turn.role {
            Role::System => {
                if !self.turns.is_empty() {
                    return Err(ConversationError::MisplacedSystemTurn);
                }
            }
            Role::User => {}
            Role::Assistant => {
                if turn.text.trim().is_empty() && turn.invocations.is_empty() {
                    return Err(ConversationError::EmptyAssistantTurn);
                }
                for invocation in &turn.invocations {
                    let repeated = turn
                        .invocations
                        .iter()
                        .filter(|other| other.id == invocation.id)
                        .count()
                        > 1;
                    if repeated || self.find_invocation(&invocation.id).is_some() {
                        return Err(ConversationError::DuplicateCallId(invocation.id.clone()));
                    }
                }
            }
            Role::Tool => {
                let call_id = turn.answers.as_deref().ok_or(ConversationError::MissingCallId)?;
                if self.find_invocation(call_id).is_none() {
                    return Err(ConversationError::UnmatchedToolResult(call_id.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Look up an earlier invocation by call id.
    pub fn find_invocation(&self, call_id: &str) -> Option<&Invocation> {
        self.turns
            .iter()
            .filter(|t| t.role == Role::Assistant)
            .flat_map(|t| t.invocations.iter())
            .find(|i| i.id == call_id)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.turns
            .first()
            .filter(|t| t.role == Role::System)
            .map(|t| t.text.as_str())
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn search_call(id: &str) -> Invocation {
        let args = json!({"query": "x"}).as_object().cloned().unwrap();
        Invocation::new(id, "search", args)
    }

    #[test]
    fn test_with_question_starts_with_system() {
        let conversation = Conversation::with_question("be brief", "what is 2+2?");
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.system_prompt(), Some("be brief"));
        assert_eq!(conversation.turns()[1].role, Role::User);
    }

    #[test]
    fn test_blank_system_prompt_is_skipped() {
        let conversation = Conversation::with_question("  ", "hi");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.system_prompt(), None);
    }

    #[test]
    fn test_system_turn_only_first() {
        let mut conversation = Conversation::new();
        conversation.push(Turn::system("rules")).unwrap();
        assert_eq!(
            conversation.push(Turn::system("more rules")),
            Err(ConversationError::MisplacedSystemTurn)
        );
    }

    #[test]
    fn test_empty_assistant_turn_rejected() {
        let mut conversation = Conversation::with_question("", "q");
        assert_eq!(
            conversation.push(Turn::assistant("   ")),
            Err(ConversationError::EmptyAssistantTurn)
        );
        assert!(conversation
            .push(Turn::assistant_with_invocations("", vec![search_call("call_0")]))
            .is_ok());
    }

    #[test]
    fn test_tool_result_must_match_earlier_call() {
        let mut conversation = Conversation::with_question("", "q");
        assert_eq!(
            conversation.push(Turn::tool_result("call_0", "result")),
            Err(ConversationError::UnmatchedToolResult("call_0".to_string()))
        );

        conversation
            .push(Turn::assistant_with_invocations("raw", vec![search_call("call_0")]))
            .unwrap();
        conversation.push(Turn::tool_result("call_0", "result")).unwrap();
        assert_eq!(conversation.len(), 3);
    }

    #[test]
    fn test_duplicate_call_ids_rejected() {
        let mut conversation = Conversation::with_question("", "q");
        conversation
            .push(Turn::assistant_with_invocations("raw", vec![search_call("call_0")]))
            .unwrap();
        assert_eq!(
            conversation.push(Turn::assistant_with_invocations("raw", vec![search_call("call_0")])),
            Err(ConversationError::DuplicateCallId("call_0".to_string()))
        );
        assert_eq!(
            conversation.push(Turn::assistant_with_invocations(
                "raw",
                vec![search_call("call_1"), search_call("call_1")]
            )),
            Err(ConversationError::DuplicateCallId("call_1".to_string()))
        );
    }

    #[test]
    fn test_user_turn_cannot_carry_invocations() {
        let mut conversation = Conversation::new();
        let mut turn = Turn::user("hi");
        turn.invocations.push(search_call("call_0"));
        assert_eq!(
            conversation.push(turn),
            Err(ConversationError::UnexpectedInvocations(Role::User))
        );
    }
}
