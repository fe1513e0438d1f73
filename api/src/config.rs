use std::env;

use anyhow::Context;

use crate::app::outreach_config::DEFAULT_TICK_SECS;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// API key for the reply interpretation provider. Replies stay queued without it.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Endpoint of the message dispatch channel. Messages are only logged without it.
    pub dispatch_url: Option<String>,
    pub dispatch_token: Option<String>,
    /// Secret for verifying inbound reply callbacks (HMAC-SHA256)
    pub inbound_secret: Option<String>,
    pub scheduler_enabled: bool,
    pub scheduler_tick_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = match env::var("PORT") {
            Ok(p) => p.parse().context("PORT must be a valid port number")?,
            Err(_) => 8080,
        };

        let scheduler_tick_secs = match env::var("SCHEDULER_TICK_SECS") {
            Ok(s) => s
                .parse()
                .context("SCHEDULER_TICK_SECS must be a whole number of seconds")?,
            Err(_) => DEFAULT_TICK_SECS,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port,
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            dispatch_url: env::var("DISPATCH_URL").ok().filter(|u| !u.is_empty()),
            dispatch_token: env::var("DISPATCH_TOKEN").ok(),
            inbound_secret: env::var("INBOUND_SECRET").ok(),
            scheduler_enabled: env::var("SCHEDULER_ENABLED")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
            scheduler_tick_secs,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
