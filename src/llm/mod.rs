pub mod chat;
use std::fmt;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Environment variables consulted for the credential, in priority order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["VITE_OPENAI_API_KEY", "OPENAI_API_KEY"];

/// Completion API credential. Deliberately opaque in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Blank keys count as absent.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(ApiKey(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey(***)")
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl LlmConfig {
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Picks the credential: an explicit value first, then the environment
/// variables in [`API_KEY_ENV_VARS`] order.
pub fn resolve_api_key<F>(explicit: Option<&str>, lookup: F) -> Option<ApiKey>
    where F: Fn(&str) -> Option<String>
{
    if let Some(key) = explicit.and_then(ApiKey::new) {
        return Some(key);
    }
    API_KEY_ENV_VARS.into_iter().find_map(|name| lookup(name).and_then(ApiKey::new))
}

pub fn resolve_api_key_from_env(explicit: Option<&str>) -> Option<ApiKey> {
    resolve_api_key(explicit, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn explicit_key_wins() {
        let vars = env(&[("VITE_OPENAI_API_KEY", "vite"), ("OPENAI_API_KEY", "plain")]);
        let key = resolve_api_key(Some("flag"), |n| vars.get(n).cloned());
        assert_eq!(key.unwrap().expose(), "flag");
    }

    #[test]
    fn vite_variable_before_plain() {
        let vars = env(&[("VITE_OPENAI_API_KEY", "vite"), ("OPENAI_API_KEY", "plain")]);
        let key = resolve_api_key(None, |n| vars.get(n).cloned());
        assert_eq!(key.unwrap().expose(), "vite");

        let vars = env(&[("VITE_OPENAI_API_KEY", "   "), ("OPENAI_API_KEY", "plain")]);
        let key = resolve_api_key(Some(""), |n| vars.get(n).cloned());
        assert_eq!(key.unwrap().expose(), "plain");
    }

    #[test]
    fn nothing_configured() {
        assert!(resolve_api_key(None, |_| None).is_none());
    }

    #[test]
    fn debug_output_hides_the_key() {
        let key = ApiKey::new("sk-secret").unwrap();
        assert!(!format!("{:?}", key).contains("sk-secret"));
        let config = LlmConfig { api_key: Some(key), ..LlmConfig::default() };
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }
}
