//! Outreach tuning constants
//!
//! Caps, grace periods and gate thresholds used by the scheduler pipelines.

use chrono::Duration;

/// Pending invitations picked per initial-send tick
pub const INITIAL_SEND_BATCH_SIZE: u64 = 20;

/// Invitations picked per followup tick
pub const FOLLOWUP_BATCH_SIZE: u64 = 1;

/// Invitations picked per thank-you tick
pub const THANK_YOU_BATCH_SIZE: u64 = 1;

/// Minutes an invitation must have been out before its followup may go
pub const FOLLOWUP_GRACE_MINUTES: i64 = 5;

/// Lower bound of the randomized gap between two sends of one promoter
pub const MIN_SEND_GAP_SECS: i64 = 60;

/// Upper bound of the randomized gap between two sends of one promoter
pub const MAX_SEND_GAP_SECS: i64 = 180;

/// Share of the previous batch that must be sent before the next batch starts
pub const BATCH_GATE_MIN_SENT_PERCENT: u64 = 90;

/// Hours that must pass after the previous batch's last invitation
pub const BATCH_GATE_COOLDOWN_HOURS: i64 = 12;

/// Invitations a single batch may hold
pub const MAX_INVITATIONS_PER_BATCH: u64 = 100;

/// Talents returned by a recommendation request unless it asks otherwise
pub const DEFAULT_RECOMMENDATION_LIMIT: u64 = 50;

/// Upper bound on talents returned by one recommendation request
pub const MAX_RECOMMENDATION_LIMIT: u64 = 200;

/// Average gap used to estimate when a batch finishes sending
pub const AVERAGE_SEND_GAP_SECS: i64 = 120;

/// Scheduler tick period
pub const DEFAULT_TICK_SECS: u64 = 60;

/// Language used when no template exists in the talent's language
pub const FALLBACK_LANGUAGE: &str = "en";

/// Sentinel the interpreter returns when the thread mentions no location
pub const LOCATION_NOT_MENTIONED: &str = "default";

/// Score reason that marks a talent as opted out for the promoter
pub const PERMANENT_REJECTION_REASON: &str = "explicit_permanent_rejection";

/// Tunables carried by the scheduler and the outreach service
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub tick: std::time::Duration,
    pub initial_batch_size: u64,
    pub followup_batch_size: u64,
    pub thank_you_batch_size: u64,
    pub followup_grace: Duration,
    pub min_send_gap: Duration,
    pub max_send_gap: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick: std::time::Duration::from_secs(DEFAULT_TICK_SECS),
            initial_batch_size: INITIAL_SEND_BATCH_SIZE,
            followup_batch_size: FOLLOWUP_BATCH_SIZE,
            thank_you_batch_size: THANK_YOU_BATCH_SIZE,
            followup_grace: Duration::minutes(FOLLOWUP_GRACE_MINUTES),
            min_send_gap: Duration::seconds(MIN_SEND_GAP_SECS),
            max_send_gap: Duration::seconds(MAX_SEND_GAP_SECS),
        }
    }
}

impl SchedulerSettings {
    pub fn with_tick_secs(mut self, secs: u64) -> Self {
        self.tick = std::time::Duration::from_secs(secs.max(1));
        self
    }
}
