use clap::{ Args as ClapArgs, Parser, Subcommand };
use std::fmt;

use crate::llm::{ resolve_api_key_from_env, LlmConfig };
use crate::llm::{ DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the hosted relay endpoint.
    Serve(ServeArgs),
    /// Chat in the terminal, through a relay endpoint or directly.
    Chat(ChatArgs),
}

/// Completion settings shared by both commands.
#[derive(ClapArgs, Clone)]
pub struct RelayArgs {
    /// API key for the completion API. Falls back to VITE_OPENAI_API_KEY, then OPENAI_API_KEY.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Model name for chat completion (e.g., gpt-3.5-turbo, gpt-4o)
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_MODEL)]
    pub chat_model: String,

    /// Sampling temperature sent with every completion request.
    #[arg(long, env = "CHAT_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Upper bound on reply length, in tokens.
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Base URL of the completion API (e.g., https://api.openai.com)
    #[arg(long, env = "CHAT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub chat_base_url: String,

    /// Path to a JSON file overriding the system prompt and greeting.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,
}

impl RelayArgs {
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            api_key: resolve_api_key_from_env(self.api_key.as_deref()),
            model: self.chat_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            base_url: self.chat_base_url.clone(),
        }
    }
}

impl fmt::Debug for RelayArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayArgs")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("chat_model", &self.chat_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("chat_base_url", &self.chat_base_url)
            .field("prompts_path", &self.prompts_path)
            .finish()
    }
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub relay: RelayArgs,

    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:8888")]
    pub server_addr: String,

    /// Also expose POST /v1/chat/completions, forwarding raw completion requests with the credential attached.
    #[arg(long, env = "ENABLE_PROXY", default_value = "false")]
    pub enable_proxy: bool,

    /// Requests per second accepted across all clients. 0 disables the limit.
    #[arg(long, env = "RATE_LIMIT", default_value = "10")]
    pub rate_limit: u32,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChatArgs {
    #[command(flatten)]
    pub relay: RelayArgs,

    /// Relay endpoint to talk to (e.g., http://127.0.0.1:8888/api/chat). Without it the
    /// completion API is called directly with the local credential.
    #[arg(long, env = "RELAY_ENDPOINT")]
    pub endpoint: Option<String>,
}
