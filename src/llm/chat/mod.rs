pub mod openai;

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::chat::ChatMessage;
use crate::relay::RelayError;
use super::LlmConfig;
use self::openai::OpenAIChatClient;

/// Upstream reply returned verbatim by [`ChatClient::passthrough`].
#[derive(Debug, Clone)]
pub struct RawCompletion {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends `messages` as a single completion request and returns the
    /// assistant text of the first choice.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError>;

    /// Forwards an already-built completion request body, attaching the
    /// credential when one is configured.
    async fn passthrough(&self, body: Vec<u8>) -> Result<RawCompletion, RelayError>;

    fn get_model(&self) -> String;
    fn has_credential(&self) -> bool;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, RelayError> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
