//! Message dispatch adapters
//!
//! The webhook channel delivers messages for real. Without a configured
//! endpoint the log channel records what would have been sent.

pub mod webhook;

use async_trait::async_trait;

use crate::config::Config;
use crate::domain::ports::MessageDispatcher;
use crate::error::DispatchError;

pub use webhook::WebhookDispatcher;

/// Accepts every message and only logs it
pub struct LogDispatcher;

#[async_trait]
impl MessageDispatcher for LogDispatcher {
    async fn dispatch(&self, recipient: &str, text: &str) -> Result<(), DispatchError> {
        tracing::info!(recipient, "Dispatch (log only): {}", text);
        Ok(())
    }
}

/// The dispatch channel selected by configuration
pub enum ConfiguredDispatcher {
    Webhook(WebhookDispatcher),
    Log(LogDispatcher),
}

impl ConfiguredDispatcher {
    pub fn from_config(config: &Config) -> Self {
        match &config.dispatch_url {
            Some(url) => ConfiguredDispatcher::Webhook(WebhookDispatcher::new(
                url.clone(),
                config.dispatch_token.clone(),
            )),
            None => {
                tracing::warn!("DISPATCH_URL not set - outbound messages will only be logged");
                ConfiguredDispatcher::Log(LogDispatcher)
            }
        }
    }
}

#[async_trait]
impl MessageDispatcher for ConfiguredDispatcher {
    async fn dispatch(&self, recipient: &str, text: &str) -> Result<(), DispatchError> {
        match self {
            ConfiguredDispatcher::Webhook(d) => d.dispatch(recipient, text).await,
            ConfiguredDispatcher::Log(d) => d.dispatch(recipient, text).await,
        }
    }
}
