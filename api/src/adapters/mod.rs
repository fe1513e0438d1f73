//! Adapters layer
//!
//! Implementations of port traits for external systems.

pub mod dispatch;
pub mod openai;
pub mod postgres;

pub use dispatch::ConfiguredDispatcher;
pub use openai::OpenAiClient;
pub use postgres::{
    PostgresCampaignRepository, PostgresInvitationRepository, PostgresMessageRepository,
    PostgresSpintaxTemplateRepository, PostgresTalentRepository, PostgresTrustRepository,
};
