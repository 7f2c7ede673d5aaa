use async_trait::async_trait;
use log::{ debug, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };
use url::Url;

use super::{ ChatClient, RawCompletion };
use crate::llm::{ ApiKey, LlmConfig };
use crate::models::chat::ChatMessage;
use crate::relay::RelayError;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

pub struct OpenAIChatClient {
    http: HttpClient,
    api_key: Option<ApiKey>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    url: Url,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

/// Builds the completion endpoint from a base URL. A base that already points
/// at the endpoint is used as is.
pub fn completions_url(base_url: &str) -> Result<Url, RelayError> {
    let mut url = Url::parse(base_url).map_err(|e|
        RelayError::InvalidRequest(format!("Invalid completion base URL '{}': {}", base_url, e))
    )?;
    if !url.path().ends_with(COMPLETIONS_PATH) {
        let path = format!("{}{}", url.path().trim_end_matches('/'), COMPLETIONS_PATH);
        url.set_path(&path);
    }
    Ok(url)
}

/// Pulls `error.message` out of an upstream failure body, if there is one.
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
}

impl OpenAIChatClient {
    pub fn new(
        api_key: Option<ApiKey>,
        model: String,
        temperature: f32,
        max_tokens: u32,
        base_url: &str,
    ) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| RelayError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            model,
            temperature,
            max_tokens,
            url: completions_url(base_url)?,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, RelayError> {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.temperature,
            config.max_tokens,
            &config.base_url,
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
        let api_key = self.api_key.as_ref().ok_or(RelayError::MissingCredential)?;

        let req = OpenAIChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!("Requesting completion from {} ({} messages, model {})", self.url, messages.len(), self.model);

        let resp = self.http
            .post(self.url.clone())
            .bearer_auth(api_key.expose())
            .json(&req)
            .send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.bytes().await.unwrap_or_default();
            let message = extract_error_message(&body);
            warn!("Completion API returned {}", status);
            return Err(RelayError::upstream(status.as_u16(), message));
        }

        let parsed = resp.json::<OpenAIResponse>().await?;
        parsed.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RelayError::InvalidResponse("no completion choices returned".to_string()))
    }

    async fn passthrough(&self, body: Vec<u8>) -> Result<RawCompletion, RelayError> {
        let mut req = self.http.post(self.url.clone()).body(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key.expose());
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = resp.bytes().await?.to_vec();

        debug!("Proxied completion request answered with {}", status);
        Ok(RawCompletion { status, content_type, body })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_appends_path() {
        let url = completions_url("https://api.openai.com").unwrap();
        assert_eq!(url.as_str(), "https://api.openai.com/v1/chat/completions");

        let url = completions_url("http://127.0.0.1:8080/openai/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/openai/v1/chat/completions");
    }

    #[test]
    fn completions_url_keeps_full_endpoint() {
        let url = completions_url("https://gateway.local/v1/chat/completions").unwrap();
        assert_eq!(url.as_str(), "https://gateway.local/v1/chat/completions");
    }

    #[test]
    fn completions_url_rejects_garbage() {
        assert!(matches!(completions_url("not a url"), Err(RelayError::InvalidRequest(_))));
    }

    #[test]
    fn error_message_extraction() {
        let body = br#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("Rate limit reached"));
        assert_eq!(extract_error_message(b"<html>bad gateway</html>"), None);
        assert_eq!(extract_error_message(br#"{"error":"flat"}"#), None);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        // Port 9 is discard; no request may be attempted anyway.
        let client = OpenAIChatClient::new(
            None,
            "gpt-3.5-turbo".into(),
            0.7,
            500,
            "http://127.0.0.1:9"
        ).unwrap();
        let err = client.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert_eq!(err, RelayError::MissingCredential);
        assert!(!client.has_credential());
    }
}
