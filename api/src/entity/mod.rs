//! SeaORM table models
//!
//! One module per table. The schema lives in `migrations/`.

pub mod campaign_invitations;
pub mod campaign_messages;
pub mod campaign_spintax_templates;
pub mod campaigns;
pub mod events;
pub mod talent_promoter_states;
pub mod talents;
pub mod trust_score_logs;
