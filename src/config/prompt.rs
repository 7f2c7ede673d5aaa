use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use log::info;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a friendly dinner menu recommendation chatbot. Recommend tasty dinner menus \
     that fit the user's tastes and situation. Keep the conversation warm and natural.";

pub const DEFAULT_GREETING: &str =
    "Hello! I recommend dinner menus. What kind of food do you like, \
     or is there something you're craving tonight?";

#[derive(Debug)]
pub enum PromptError {
    EmptyField(&'static str),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::EmptyField(key) => write!(f, "Prompt field '{}' must not be empty", key),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub greeting: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if self.system_prompt.trim().is_empty() {
            return Err(PromptError::EmptyField("system_prompt"));
        }
        Ok(())
    }
}

/// Reads a prompt file. Fields left out of the file keep their defaults.
pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<PromptConfig, PromptError> {
    let file_content = fs::read_to_string(&path)?;
    let config: PromptConfig = serde_json::from_str(&file_content)?;
    config.validate()?;
    info!("Loaded prompts from {}", path.as_ref().display());
    Ok(config)
}

/// Built-in prompts unless a file is given.
pub fn load_or_default(path: Option<&str>) -> Result<PromptConfig, PromptError> {
    match path {
        Some(p) => load_prompts(p),
        None => Ok(PromptConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        let config = load_or_default(None).unwrap();
        assert_eq!(config, PromptConfig::default());
        assert!(config.system_prompt.contains("dinner"));
    }

    #[test]
    fn partial_file_keeps_default_greeting() {
        let file = write_temp(r#"{ "system_prompt": "Suggest lunch instead." }"#);
        let config = load_prompts(file.path()).unwrap();
        assert_eq!(config.system_prompt, "Suggest lunch instead.");
        assert_eq!(config.greeting, DEFAULT_GREETING);
    }

    #[test]
    fn blank_system_prompt_is_rejected() {
        let file = write_temp(r#"{ "system_prompt": "  " }"#);
        assert!(matches!(load_prompts(file.path()), Err(PromptError::EmptyField("system_prompt"))));
    }

    #[test]
    fn missing_and_malformed_files() {
        assert!(matches!(load_prompts("/definitely/not/here.json"), Err(PromptError::IoError(_))));
        let file = write_temp("{ not json");
        assert!(matches!(load_prompts(file.path()), Err(PromptError::JsonError(_))));
    }
}
