//! PostgreSQL adapters
//!
//! Implementations of repository traits using SeaORM and PostgreSQL.

pub mod campaign_repo;
pub mod invitation_repo;
pub mod message_repo;
pub mod talent_repo;
pub mod template_repo;
pub mod trust_repo;


pub use campaign_repo::PostgresCampaignRepository;
pub use invitation_repo::PostgresInvitationRepository;
pub use message_repo::PostgresMessageRepository;
pub use talent_repo::PostgresTalentRepository;
pub use template_repo::PostgresSpintaxTemplateRepository;
pub use trust_repo::PostgresTrustRepository;
