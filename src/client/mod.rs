use crate::cli::ChatArgs;
use crate::conversation::{ ChatError, ConversationManager };
use crate::llm::chat::new_client as new_chat_client;
use crate::relay::{ CompletionRelay, DirectRelay, HttpRelay };
use std::error::Error;
use std::sync::Arc;
use tokio::io::{ AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt };
use log::info;

const RESET_COMMAND: &str = "/reset";
const QUIT_COMMAND: &str = "/quit";

/// Picks the relay for a chat session and describes the choice in one line.
///
/// With an endpoint the credential stays on the server; without one the
/// completion API is called directly with whatever key is available locally.
pub fn build_relay(
    args: &ChatArgs,
    system_prompt: &str
) -> Result<(Arc<dyn CompletionRelay>, String), Box<dyn Error + Send + Sync>> {
    match &args.endpoint {
        Some(endpoint) => {
            let relay = HttpRelay::new(endpoint)?;
            let status = format!("Using relay at {} (API key is held by the relay)", relay.endpoint());
            Ok((Arc::new(relay), status))
        }
        None => {
            let config = args.relay.llm_config();
            let status = if config.has_credential() {
                "API key is configured (direct mode)".to_string()
            } else {
                "API key is not configured (set VITE_OPENAI_API_KEY or OPENAI_API_KEY)".to_string()
            };
            let client = new_chat_client(&config)?;
            Ok((Arc::new(DirectRelay::new(client, system_prompt)), status))
        }
    }
}

/// Reads user lines from `input` until EOF or `/quit`, writing the exchange to
/// `output`.
pub async fn run_session<R, W>(
    conversation: &mut ConversationManager,
    greeting: &str,
    input: R,
    output: &mut W
) -> std::io::Result<()>
    where R: AsyncBufRead + Unpin, W: AsyncWrite + Unpin
{
    output.write_all(format!("Bot: {}\n", greeting).as_bytes()).await?;
    output.flush().await?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            QUIT_COMMAND => break,
            RESET_COMMAND => {
                conversation.clear();
                output.write_all(b"(conversation cleared)\n").await?;
                output.write_all(format!("Bot: {}\n", greeting).as_bytes()).await?;
            }
            text => {
                output.write_all(b"(thinking...)\n").await?;
                output.flush().await?;
                let rendered = match conversation.send(text).await {
                    Ok(reply) => format!("Bot: {}\n", reply),
                    Err(ChatError::EmptyMessage) => continue,
                    Err(ChatError::Relay(e)) => format!("Bot: An error occurred: {}\n", e),
                };
                output.write_all(rendered.as_bytes()).await?;
            }
        }
        output.flush().await?;
    }

    info!("Chat session ended after {} messages", conversation.len());
    Ok(())
}
