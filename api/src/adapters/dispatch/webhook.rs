//! Webhook dispatch channel
//!
//! Posts `{ "recipient": ..., "text": ... }` to the configured endpoint.
//! Any 2xx answer counts as delivered.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::domain::ports::MessageDispatcher;
use crate::error::DispatchError;

pub struct WebhookDispatcher {
    http: Client,
    url: String,
    token: Option<String>,
}

impl WebhookDispatcher {
    pub fn new(url: String, token: Option<String>) -> Self {
        Self {
            http: Client::new(),
            url,
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Serialize)]
struct DispatchRequest<'a> {
    recipient: &'a str,
    text: &'a str,
}

#[async_trait]
impl MessageDispatcher for WebhookDispatcher {
    async fn dispatch(&self, recipient: &str, text: &str) -> Result<(), DispatchError> {
        let mut request = self
            .http
            .post(&self.url)
            .json(&DispatchRequest { recipient, text });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(DispatchError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_ignored() {
        let dispatcher =
            WebhookDispatcher::new("http://localhost/send".to_string(), Some(String::new()));
        assert!(dispatcher.token.is_none());
    }

    #[test]
    fn request_body_shape() {
        let json = serde_json::to_value(DispatchRequest {
            recipient: "@talent1",
            text: "Hello",
        })
        .unwrap();

        assert_eq!(
            json,
            serde_json::json!({"recipient": "@talent1", "text": "Hello"})
        );
    }
}
