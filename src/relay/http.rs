use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use url::Url;

use super::{ CompletionRelay, RelayError };
use crate::models::chat::{ ChatMessage, ErrorBody, RelayRequest, RelayResponse };

/// Client side of the hosted relay endpoint.
pub struct HttpRelay {
    http: HttpClient,
    endpoint: Url,
}

impl HttpRelay {
    pub fn new(endpoint: &str) -> Result<Self, RelayError> {
        let endpoint = Url::parse(endpoint).map_err(|e|
            RelayError::InvalidRequest(format!("Invalid relay endpoint '{}': {}", endpoint, e))
        )?;
        let http = HttpClient::builder()
            .build()
            .map_err(|e| RelayError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionRelay for HttpRelay {
    async fn relay(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
        let body = RelayRequest { messages: messages.to_vec() };
        debug!("POST {} ({} messages)", self.endpoint, messages.len());

        let resp = self.http
            .post(self.endpoint.clone())
            .json(&body)
            .send().await
            .map_err(|e| RelayError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorBody>().await
                .ok()
                .map(|b| b.error);
            return Err(RelayError::upstream(status.as_u16(), message));
        }

        let reply = resp.json::<RelayResponse>().await?;
        Ok(reply.content)
    }
}
