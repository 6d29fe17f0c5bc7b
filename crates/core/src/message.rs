//! Message and Conversation domain types.
//!
//! A task run owns one [`Conversation`]: the system prompt, the task, then
//! alternating assistant tool-call / tool-result pairs. History is capped,
//! never summarized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model
    Assistant,
    /// System instructions (tool list, rules, recalled cases)
    System,
    /// Tool execution result
    Tool,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content.into())
    }

    /// An assistant turn that requested exactly one tool call.
    pub fn assistant_tool_call(content: impl Into<String>, call: MessageToolCall) -> Self {
        let mut msg = Self::new(Role::Assistant, content.into());
        msg.tool_calls.push(call);
        msg
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content.into());
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON text, exactly as the model produced them
    pub arguments: String,
}

/// Ordered, capped message history for one task.
///
/// `messages[0]` is always the system message. Once the length exceeds
/// `max_messages`, only the newest `max_messages - 1` other messages are
/// kept.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    max_messages: usize,
}

impl Conversation {
    /// Start a conversation from its system prompt. `max_messages` is
    /// clamped to at least 2 so the system message always has company.
    pub fn new(system: Message, max_messages: usize) -> Self {
        Self {
            messages: vec![system],
            max_messages: max_messages.max(2),
        }
    }

    /// Append a message and apply the cap.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.enforce_limit();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    fn enforce_limit(&mut self) {
        if self.messages.len() <= self.max_messages {
            return;
        }
        let excess = self.messages.len() - self.max_messages;
        // Index 0 is the system message; evict right after it.
        self.messages.drain(1..1 + excess);
    }
}
