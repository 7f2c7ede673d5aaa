use serde::{ Serialize, Deserialize };
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Body accepted by the relay endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayRequest {
    pub messages: Vec<ChatMessage>,
}

/// Successful relay reply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayResponse {
    pub content: String,
}

/// Failure reply, sent with a non-2xx status.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Puts the system instruction in front of `messages` unless the list already
/// opens with a system message. Applying it twice yields the same list.
pub fn with_system_prompt(system_prompt: &str, messages: &[ChatMessage]) -> Vec<ChatMessage> {
    if let Some(first) = messages.first() {
        if first.role == Role::System {
            return messages.to_vec();
        }
    }
    let mut prefixed = Vec::with_capacity(messages.len() + 1);
    prefixed.push(ChatMessage::system(system_prompt));
    prefixed.extend_from_slice(messages);
    prefixed
}
