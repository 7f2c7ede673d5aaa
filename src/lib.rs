pub mod models;
pub mod server;
pub mod config;
pub mod llm;
pub mod cli;
pub mod relay;
pub mod conversation;
pub mod client;

use cli::{ Args, ChatArgs, Command, RelayArgs, ServeArgs };
use config::prompt::{ self, PromptConfig };
use conversation::ConversationManager;
use llm::chat::new_client as new_chat_client;
use log::info;
use relay::DirectRelay;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    match args.command {
        Command::Serve(serve_args) => serve(serve_args).await,
        Command::Chat(chat_args) => chat(chat_args).await,
    }
}

/// Startup summary lines. With a relay endpoint the completion settings live
/// on the relay, so only the local prompt settings are reported.
fn relay_config_lines(relay: &RelayArgs, prompts: &PromptConfig, endpoint: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match endpoint {
        Some(url) => lines.push(format!("Relay Endpoint: {}", url)),
        None => {
            let llm = relay.llm_config();
            lines.push(format!("Chat Model: {}", llm.model));
            lines.push(format!("Chat Base URL: {}", llm.base_url));
            lines.push(format!("Temperature: {}", llm.temperature));
            lines.push(format!("Max Tokens: {}", llm.max_tokens));
            lines.push(format!("API Key: {}", if llm.has_credential() { "configured" } else { "missing" }));
        }
    }
    lines.push(format!("Prompts Path: {}", relay.prompts_path.as_deref().unwrap_or("(built-in)")));
    lines.push(format!("System Prompt: {} chars", prompts.system_prompt.chars().count()));
    lines
}

fn log_relay_config(relay: &RelayArgs, prompts: &PromptConfig, endpoint: Option<&str>) {
    for line in relay_config_lines(relay, prompts, endpoint) {
        info!("{}", line);
    }
}

async fn serve(args: ServeArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let prompts = prompt::load_or_default(args.relay.prompts_path.as_deref())?;

    info!("--- Relay Configuration ---");
    info!("Server Address: {}", args.server_addr);
    log_relay_config(&args.relay, &prompts, None);
    info!("Dev Proxy Enabled: {}", args.enable_proxy);
    info!("Rate Limit: {}/s", args.rate_limit);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("---------------------------");

    let client = new_chat_client(&args.relay.llm_config())?;
    let relay = Arc::new(DirectRelay::new(client, prompts.system_prompt));
    let server = Server::new(args.server_addr.clone(), relay, args);
    server.run().await
}

async fn chat(args: ChatArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let prompts = prompt::load_or_default(args.relay.prompts_path.as_deref())?;
    log_relay_config(&args.relay, &prompts, args.endpoint.as_deref());

    let (relay, status) = client::build_relay(&args, &prompts.system_prompt)?;
    println!("{}", status);

    let mut conversation = ConversationManager::new(relay, prompts.system_prompt.clone());
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    client::run_session(&mut conversation, &prompts.greeting, stdin, &mut stdout).await?;
    Ok(())
}
