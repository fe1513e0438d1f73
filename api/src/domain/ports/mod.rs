//! Domain ports (traits)
//!
//! Port traits define interfaces that the domain layer requires.
//! Adapters provide concrete implementations of these traits.

pub mod dispatch;
pub mod llm;
pub mod repositories;

pub use dispatch::MessageDispatcher;
pub use llm::CompletionClient;
pub use repositories::{
    CampaignRepository, InvitationRepository, MessageRepository, OutboundSend, ReplyCommit,
    SpintaxTemplateRepository, TalentRepository, TrustRepository,
};
