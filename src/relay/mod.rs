mod error;
mod http;

pub use self::error::RelayError;
pub use self::http::HttpRelay;

use async_trait::async_trait;
use log::{ info, warn };
use std::sync::Arc;

use crate::llm::chat::{ ChatClient, RawCompletion };
use crate::models::chat::{ with_system_prompt, ChatMessage };

/// Turns a conversation into the assistant's next reply.
///
/// Implemented in-process by [`DirectRelay`] and over HTTP by [`HttpRelay`];
/// callers cannot tell the two apart.
#[async_trait]
pub trait CompletionRelay: Send + Sync {
    async fn relay(&self, messages: &[ChatMessage]) -> Result<String, RelayError>;
}

/// Holds the credential (through its [`ChatClient`]) and calls the completion
/// API directly. This is what the hosted endpoint runs and what the terminal
/// client uses when no endpoint is given.
#[derive(Clone)]
pub struct DirectRelay {
    client: Arc<dyn ChatClient>,
    system_prompt: String,
}

impl DirectRelay {
    pub fn new(client: Arc<dyn ChatClient>, system_prompt: impl Into<String>) -> Self {
        Self { client, system_prompt: system_prompt.into() }
    }

    pub fn has_credential(&self) -> bool {
        self.client.has_credential()
    }

    pub fn model(&self) -> String {
        self.client.get_model()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub async fn passthrough(&self, body: Vec<u8>) -> Result<RawCompletion, RelayError> {
        self.client.passthrough(body).await
    }
}

#[async_trait]
impl CompletionRelay for DirectRelay {
    async fn relay(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
        let messages = with_system_prompt(&self.system_prompt, messages);
        match self.client.complete(&messages).await {
            Ok(content) => {
                info!("Relayed {} messages, reply of {} chars", messages.len(), content.chars().count());
                Ok(content)
            }
            Err(e) => {
                warn!("Relay failed ({}): {}", e.status_code(), e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted relay that records every call.
    #[derive(Default)]
    pub struct ScriptedRelay {
        replies: Mutex<VecDeque<Result<String, RelayError>>>,
        pub calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedRelay {
        pub fn new(replies: Vec<Result<String, RelayError>>) -> Self {
            Self { replies: Mutex::new(replies.into()), calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl CompletionRelay for ScriptedRelay {
        async fn relay(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RelayError::Transport("script exhausted".into())))
        }
    }

    /// Chat client double answering from a closure.
    pub struct FakeChatClient {
        pub credential: bool,
        pub seen: Mutex<Vec<Vec<ChatMessage>>>,
        pub reply: fn(&[ChatMessage]) -> Result<String, RelayError>,
    }

    #[async_trait]
    impl ChatClient for FakeChatClient {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
            if !self.credential {
                return Err(RelayError::MissingCredential);
            }
            self.seen.lock().unwrap().push(messages.to_vec());
            (self.reply)(messages)
        }

        async fn passthrough(&self, body: Vec<u8>) -> Result<RawCompletion, RelayError> {
            Ok(RawCompletion {
                status: 200,
                content_type: Some("application/json".into()),
                body,
            })
        }

        fn get_model(&self) -> String {
            "fake-model".into()
        }

        fn has_credential(&self) -> bool {
            self.credential
        }
    }
}
