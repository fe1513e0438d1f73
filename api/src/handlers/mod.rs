//! HTTP handlers
//!
//! Axum request handlers for the API endpoints.

pub mod campaigns;
pub mod inbound;
pub mod invitations;
pub mod trust;

pub use campaigns::{campaign_stats, can_start_batch, recommend_talents};
pub use inbound::record_reply;
pub use invitations::{
    add_talents, list_invitations, mark_attended, mark_followup, remove_invitation,
};
pub use trust::{adjust_trust, get_trust_state};
