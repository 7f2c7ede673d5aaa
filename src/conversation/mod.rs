use log::{ debug, warn };
use std::sync::Arc;
use thiserror::Error;

use crate::models::chat::{ with_system_prompt, ChatMessage, Role };
use crate::relay::{ CompletionRelay, RelayError };

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingResponse,
}

/// Client-side conversation: user and assistant turns in order, one request
/// in flight at a time.
pub struct ConversationManager {
    relay: Arc<dyn CompletionRelay>,
    system_prompt: String,
    messages: Vec<ChatMessage>,
    state: ConversationState,
}

impl ConversationManager {
    pub fn new(relay: Arc<dyn CompletionRelay>, system_prompt: impl Into<String>) -> Self {
        Self {
            relay,
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            state: ConversationState::Idle,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.state = ConversationState::Idle;
    }

    /// Appends `text` as a user turn and asks the relay for a reply.
    ///
    /// On success the reply is appended as an assistant turn and returned.
    /// On failure the user turn is removed again, so the history looks as if
    /// the message had never been sent.
    pub async fn send(&mut self, text: &str) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        self.recover_abandoned();

        self.messages.push(ChatMessage::user(text));
        self.state = ConversationState::AwaitingResponse;

        let outbound = with_system_prompt(&self.system_prompt, &self.messages);
        debug!("Sending conversation of {} turns", self.messages.len());
        let result = self.relay.relay(&outbound).await;

        self.state = ConversationState::Idle;
        match result {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.messages.pop();
                warn!("Message rolled back: {}", e);
                Err(ChatError::Relay(e))
            }
        }
    }

    /// A `send` future dropped mid-request leaves its user turn behind with no
    /// reply; drop that turn before the next one goes out.
    fn recover_abandoned(&mut self) {
        if self.state != ConversationState::AwaitingResponse {
            return;
        }
        if matches!(self.messages.last(), Some(m) if m.role == Role::User) {
            self.messages.pop();
        }
        self.state = ConversationState::Idle;
        warn!("Discarded a message whose request never completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::testing::ScriptedRelay;
    use std::future::Future;
    use std::task::{ Context, Poll, Waker };

    fn manager(replies: Vec<Result<String, RelayError>>) -> (ConversationManager, Arc<ScriptedRelay>) {
        let relay = Arc::new(ScriptedRelay::new(replies));
        (ConversationManager::new(relay.clone(), "dinner helper"), relay)
    }

    #[tokio::test]
    async fn successful_send_appends_user_then_assistant() {
        let (mut conv, relay) = manager(vec![Ok("How about bibimbap?".into())]);

        let reply = conv.send("  what should I eat?  ").await.unwrap();
        assert_eq!(reply, "How about bibimbap?");
        assert_eq!(conv.messages(), &[
            ChatMessage::user("what should I eat?"),
            ChatMessage::assistant("How about bibimbap?"),
        ]);
        assert_eq!(conv.state(), ConversationState::Idle);

        let calls = relay.calls.lock().unwrap();
        assert_eq!(calls[0], vec![
            ChatMessage::system("dinner helper"),
            ChatMessage::user("what should I eat?"),
        ]);
    }

    #[tokio::test]
    async fn failure_rolls_back_the_user_turn() {
        let (mut conv, _) = manager(vec![
            Ok("first reply".into()),
            Err(RelayError::upstream(429, Some("Rate limit reached".into()))),
        ]);
        conv.send("one").await.unwrap();
        let before = conv.len();

        let err = conv.send("two").await.unwrap_err();
        assert_eq!(err.to_string(), "Rate limit reached");
        assert_eq!(conv.len(), before);
        assert_eq!(conv.messages().last(), Some(&ChatMessage::assistant("first reply")));
        assert_eq!(conv.state(), ConversationState::Idle);
    }

    #[tokio::test]
    async fn history_is_sent_in_full_each_turn() {
        let (mut conv, relay) = manager(vec![Ok("r1".into()), Ok("r2".into())]);
        conv.send("q1").await.unwrap();
        conv.send("q2").await.unwrap();

        let calls = relay.calls.lock().unwrap();
        assert_eq!(calls[1], vec![
            ChatMessage::system("dinner helper"),
            ChatMessage::user("q1"),
            ChatMessage::assistant("r1"),
            ChatMessage::user("q2"),
        ]);
    }

    #[tokio::test]
    async fn empty_input_changes_nothing() {
        let (mut conv, relay) = manager(vec![]);
        assert_eq!(conv.send("   ").await.unwrap_err(), ChatError::EmptyMessage);
        assert!(conv.is_empty());
        assert!(relay.calls.lock().unwrap().is_empty());
    }

    /// Relay that never answers.
    struct Hanging;

    #[async_trait::async_trait]
    impl CompletionRelay for Hanging {
        async fn relay(&self, _messages: &[ChatMessage]) -> Result<String, RelayError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn abandoned_send_is_discarded_on_next_send() {
        let mut conv = ConversationManager::new(Arc::new(Hanging), "sys");
        {
            let mut fut = Box::pin(conv.send("lost"));
            let mut cx = Context::from_waker(Waker::noop());
            assert!(matches!(fut.as_mut().poll(&mut cx), Poll::Pending));
        }
        assert_eq!(conv.state(), ConversationState::AwaitingResponse);
        assert_eq!(conv.len(), 1);

        conv.relay = Arc::new(ScriptedRelay::new(vec![Ok("found".into())]));
        conv.send("again").await.unwrap();
        assert_eq!(conv.messages(), &[ChatMessage::user("again"), ChatMessage::assistant("found")]);
    }

    #[test]
    fn clear_resets_everything() {
        let (mut conv, _) = manager(vec![]);
        conv.messages.push(ChatMessage::user("x"));
        conv.state = ConversationState::AwaitingResponse;
        conv.clear();
        assert!(conv.is_empty());
        assert_eq!(conv.state(), ConversationState::Idle);
    }
}
