//! Application layer
//!
//! Outreach use cases. Services coordinate domain entities through ports and
//! are driven either by HTTP handlers or by the cadence scheduler.

pub mod batch_gate;
pub mod campaign_stats_service;
pub mod interpretation_prompt;
pub mod invitation_service;
pub mod invitation_state_machine;
pub mod outreach_config;
pub mod outreach_service;
pub mod reply_interpreter;
pub mod reply_processing_service;
pub mod scheduler;
pub mod template_renderer;
pub mod template_selector;
pub mod trust_ledger_service;

pub use batch_gate::{BatchGate, GateDecision, GateReason};
pub use campaign_stats_service::{CampaignStats, CampaignStatsService};
pub use invitation_service::{InvitationService, RecommendationQuery, TalentRecommendation};
pub use outreach_config::SchedulerSettings;
pub use outreach_service::{OutreachService, StagePipeline};
pub use reply_processing_service::ReplyProcessingService;
pub use scheduler::{CadenceScheduler, Pipeline, SchedulerHandle, TickReport};
pub use trust_ledger_service::{TrustChange, TrustLedgerService, TrustSnapshot};
