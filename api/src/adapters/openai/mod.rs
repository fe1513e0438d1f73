//! OpenAI adapter
//!
//! Chat-completion client used by the reply interpreter.

pub mod client;

pub use client::OpenAiClient;
