//! Repository port traits
//!
//! These traits define the interface for data persistence.
//! Implementations are provided by adapters (e.g., PostgreSQL).
//!
//! Writes that must not be observed half-done are exposed as single methods
//! taking a command value (`OutboundSend`, `ReplyCommit`, `NewTrustScoreLog`)
//! so each adapter can run them inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{
    Campaign, CampaignId, CampaignInvitation, CampaignMessage, Event, EventId, InvitationFilter,
    InvitationId, InvitationPatch, InvitationStatus, MessageId, NewCampaignMessage, NewInvitation,
    NewSpintaxTemplate, NewTrustScoreLog, PromoterId, SpintaxTemplate, Stage, TalentId,
    TalentPromoterState, Talent, TrustPair, TrustScoreLog,
};
use crate::error::DomainError;

/// Everything written when one outbound message is recorded
#[derive(Debug, Clone)]
pub struct OutboundSend {
    pub invitation_id: InvitationId,
    /// The write is refused with `Conflict` unless the invitation still has this status
    pub expected_status: InvitationStatus,
    pub patch: InvitationPatch,
    pub message: NewCampaignMessage,
}

/// Everything written when a reply thread has been interpreted
#[derive(Debug, Clone)]
pub struct ReplyCommit {
    pub invitation_id: InvitationId,
    /// The whole commit is refused with `PreconditionFailed` unless the
    /// invitation still has this status
    pub expected_status: InvitationStatus,
    pub patch: InvitationPatch,
    pub entry: NewTrustScoreLog,
    pub last_reply: DateTime<Utc>,
    pub opted_out: bool,
    /// New current city for the talent, when the thread mentioned one
    pub talent_city: Option<String>,
    /// Received messages consumed by this interpretation
    pub message_ids: Vec<MessageId>,
}

/// Repository for campaigns and the events they target
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Find a campaign by ID
    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>, DomainError>;

    /// Find an event by ID
    async fn find_event(&self, id: &EventId) -> Result<Option<Event>, DomainError>;
}

/// Repository for talents
#[async_trait]
pub trait TalentRepository: Send + Sync {
    async fn find_by_id(&self, id: &TalentId) -> Result<Option<Talent>, DomainError>;

    /// Find the talents that exist among `ids`
    async fn find_by_ids(&self, ids: &[TalentId]) -> Result<Vec<Talent>, DomainError>;

    /// Talents with no invitation to the campaign, ordered by ID
    async fn find_uninvited(&self, campaign_id: &CampaignId) -> Result<Vec<Talent>, DomainError>;
}

/// Repository for campaign invitations
#[async_trait]
pub trait InvitationRepository: Send + Sync {
    async fn find_by_id(&self, id: &InvitationId)
        -> Result<Option<CampaignInvitation>, DomainError>;

    /// Find the invitation of a talent to a campaign
    async fn find_by_campaign_and_talent(
        &self,
        campaign_id: &CampaignId,
        talent_id: &TalentId,
    ) -> Result<Option<CampaignInvitation>, DomainError>;

    /// Find invitations matching a filter, ordered by ascending ID
    async fn find(&self, filter: &InvitationFilter)
        -> Result<Vec<CampaignInvitation>, DomainError>;

    /// Count invitations matching a filter (the filter's limit is ignored)
    async fn count(&self, filter: &InvitationFilter) -> Result<u64, DomainError>;

    /// Distinct (campaign, batch) pairs of the invitations matching a filter,
    /// ordered by campaign then batch (the filter's limit is ignored)
    async fn find_batches(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<(CampaignId, i32)>, DomainError>;

    /// Most recent `invitation_at` within one batch of a campaign
    async fn latest_invitation_at(
        &self,
        campaign_id: &CampaignId,
        batch: i32,
    ) -> Result<Option<DateTime<Utc>>, DomainError>;

    /// Create invitations atomically. A duplicate (campaign, talent) is a `Conflict`.
    async fn create_many(
        &self,
        invitations: &[NewInvitation],
    ) -> Result<Vec<CampaignInvitation>, DomainError>;

    /// Apply the same patch to every invitation matching a filter in one write
    async fn update_many(
        &self,
        filter: &InvitationFilter,
        patch: &InvitationPatch,
    ) -> Result<u64, DomainError>;

    /// Delete an invitation and its messages
    async fn delete(&self, id: &InvitationId) -> Result<(), DomainError>;

    /// Atomically insert the sent message, apply the send transition and stamp
    /// `last_contacted` on the trust state of the pair.
    async fn record_send(&self, send: &OutboundSend) -> Result<CampaignMessage, DomainError>;
}

/// Repository for campaign messages
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Record a message
    async fn create(&self, message: &NewCampaignMessage) -> Result<CampaignMessage, DomainError>;

    /// Received messages not yet run through the interpreter, oldest first
    async fn find_uninterpreted_received(&self) -> Result<Vec<CampaignMessage>, DomainError>;

    /// Every received message of an invitation, oldest first
    async fn find_received_thread(
        &self,
        invitation_id: &InvitationId,
    ) -> Result<Vec<CampaignMessage>, DomainError>;

    /// All messages of a campaign, oldest first
    async fn find_by_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<CampaignMessage>, DomainError>;

    /// Timestamp of the promoter's most recent sent message
    async fn last_sent_at_for_promoter(
        &self,
        promoter_id: &PromoterId,
    ) -> Result<Option<DateTime<Utc>>, DomainError>;
}

/// Repository for spintax templates
#[async_trait]
pub trait SpintaxTemplateRepository: Send + Sync {
    /// Templates of a campaign stage whose language is one of `langs`
    async fn find_for_stage(
        &self,
        campaign_id: &CampaignId,
        stage: Stage,
        langs: &[String],
    ) -> Result<Vec<SpintaxTemplate>, DomainError>;

    async fn create(&self, template: &NewSpintaxTemplate) -> Result<SpintaxTemplate, DomainError>;
}

/// Repository for the trust ledger.
///
/// `apply` and `commit_reply` are the only writes to `trust_score`; both add the
/// ledger row and the score change in one transaction.
#[async_trait]
pub trait TrustRepository: Send + Sync {
    async fn find_state(&self, pair: &TrustPair)
        -> Result<Option<TalentPromoterState>, DomainError>;

    /// Return the state of a pair, creating a zero-score state if absent
    async fn get_or_create_state(&self, pair: &TrustPair)
        -> Result<TalentPromoterState, DomainError>;

    /// Append a ledger row and add its change to the pair's score
    async fn apply(&self, entry: &NewTrustScoreLog) -> Result<TalentPromoterState, DomainError>;

    /// Apply an interpreted reply: invitation patch, ledger row, score, reply
    /// bookkeeping, talent city and message flags. Refused with `Conflict` when
    /// none of the listed messages is still uninterpreted, and with
    /// `PreconditionFailed` when the invitation changed status meanwhile.
    async fn commit_reply(&self, commit: &ReplyCommit)
        -> Result<TalentPromoterState, DomainError>;

    /// States between a promoter and any of the listed talents
    async fn find_states_for_promoter(
        &self,
        promoter_id: &PromoterId,
        talent_ids: &[TalentId],
    ) -> Result<Vec<TalentPromoterState>, DomainError>;

    /// Ledger rows of a pair, oldest first
    async fn find_logs(&self, pair: &TrustPair) -> Result<Vec<TrustScoreLog>, DomainError>;

    /// Sum of all ledger changes of a pair
    async fn sum_changes(&self, pair: &TrustPair) -> Result<i64, DomainError>;
}
