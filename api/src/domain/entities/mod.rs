//! Domain entities
//!
//! Pure domain models representing core business concepts.
//! These are separate from the SeaORM entities in the `entity` module.

pub mod campaign;
pub mod event;
pub mod invitation;
pub mod invitation_filter;
pub mod message;
pub mod spintax_template;
pub mod talent;
pub mod trust;

pub use campaign::{Campaign, CampaignId, CampaignStatus};
pub use event::{Event, EventId, PromoterId};
pub use invitation::{
    CampaignInvitation, InvitationId, InvitationPatch, InvitationStatus, NewInvitation,
};
pub use invitation_filter::{InvitationFilter, InvitationPredicate};
pub use message::{CampaignMessage, MessageDirection, MessageId, NewCampaignMessage};
pub use spintax_template::{NewSpintaxTemplate, SpintaxTemplate, SpintaxTemplateId, Stage};
pub use talent::{Talent, TalentId};
pub use trust::{
    NewTrustScoreLog, TalentPromoterState, TrustPair, TrustScoreLog, TrustScoreLogId,
};
