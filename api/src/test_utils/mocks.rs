//! Mock implementations of port traits
//!
//! These are in-memory implementations that can be configured for testing.
//! They store data in memory and allow tests to verify behavior.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crate::domain::entities::{
    Campaign, CampaignId, CampaignInvitation, CampaignMessage, Event, EventId, InvitationFilter,
    InvitationId, InvitationPatch, InvitationStatus, MessageDirection, NewCampaignMessage,
    NewInvitation, NewSpintaxTemplate, NewTrustScoreLog, PromoterId, SpintaxTemplate,
    SpintaxTemplateId, Stage, TalentId, TalentPromoterState, Talent, TrustPair, TrustScoreLog,
    TrustScoreLogId,
};
use crate::domain::entities::MessageId;
use crate::domain::ports::{
    CampaignRepository, CompletionClient, InvitationRepository, MessageDispatcher,
    MessageRepository, OutboundSend, ReplyCommit, SpintaxTemplateRepository, TalentRepository,
    TrustRepository,
};
use crate::error::{DispatchError, DomainError, LlmError};

// ============================================================================
// In-Memory Outreach Store
// ============================================================================

#[derive(Default)]
struct Tables {
    campaigns: BTreeMap<CampaignId, Campaign>,
    events: HashMap<EventId, Event>,
    talents: BTreeMap<TalentId, Talent>,
    invitations: BTreeMap<InvitationId, CampaignInvitation>,
    messages: Vec<CampaignMessage>,
    templates: Vec<SpintaxTemplate>,
    states: HashMap<TrustPair, TalentPromoterState>,
    logs: Vec<TrustScoreLog>,
}

impl Tables {
    fn next_invitation_id(&self) -> InvitationId {
        InvitationId(self.invitations.keys().next_back().map_or(0, |id| id.0) + 1)
    }

    fn state_mut(&mut self, pair: TrustPair, now: DateTime<Utc>) -> &mut TalentPromoterState {
        self.states
            .entry(pair)
            .or_insert_with(|| TalentPromoterState::initial(pair, now))
    }

    /// Score of the pair after `change`, without creating its state
    fn score_after(
        &self,
        pair: TrustPair,
        change: i32,
        now: DateTime<Utc>,
    ) -> Result<i32, DomainError> {
        let current = self
            .states
            .get(&pair)
            .cloned()
            .unwrap_or_else(|| TalentPromoterState::initial(pair, now));
        current.score_after(change).ok_or_else(|| {
            DomainError::Validation(format!(
                "Trust change {} for {} would put the score out of range",
                change, pair
            ))
        })
    }

    fn push_log(&mut self, entry: &NewTrustScoreLog, now: DateTime<Utc>) {
        self.logs.push(TrustScoreLog {
            id: TrustScoreLogId::new(),
            talent_id: entry.talent_id,
            promoter_id: entry.promoter_id,
            event_id: entry.event_id,
            change: entry.change,
            reason: entry.reason.clone(),
            created_at: now,
        });
    }

    fn push_message(&mut self, message: &NewCampaignMessage) -> CampaignMessage {
        let (sent_at, received_at) = match message.direction {
            MessageDirection::Sent => (Some(message.at), None),
            MessageDirection::Received => (None, Some(message.at)),
        };
        let stored = CampaignMessage {
            id: MessageId::new(),
            campaign_id: message.campaign_id,
            invitation_id: message.invitation_id,
            talent_id: message.talent_id,
            promoter_id: message.promoter_id,
            direction: message.direction,
            stage: message.stage,
            body: message.body.clone(),
            sent_at,
            received_at,
            is_interpret: false,
            is_score_analyzed: false,
            created_at: message.at,
        };
        self.messages.push(stored.clone());
        stored
    }

    fn matching(&self, filter: &InvitationFilter) -> Vec<CampaignInvitation> {
        self.invitations
            .values()
            .filter(|inv| {
                let campaign = filter
                    .needs_campaign()
                    .then(|| self.campaigns.get(&inv.campaign_id))
                    .flatten();
                filter.matches(inv, campaign)
            })
            .cloned()
            .collect()
    }
}

/// One store implementing every repository port. Each write takes the single
/// lock once, so multi-table writes are atomic like their database versions.
#[derive(Default, Clone)]
pub struct InMemoryOutreachStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryOutreachStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_campaign(self, campaign: Campaign) -> Self {
        self.tables
            .write()
            .unwrap()
            .campaigns
            .insert(campaign.id, campaign);
        self
    }

    pub fn with_event(self, event: Event) -> Self {
        self.tables.write().unwrap().events.insert(event.id, event);
        self
    }

    pub fn with_talent(self, talent: Talent) -> Self {
        self.tables.write().unwrap().talents.insert(talent.id, talent);
        self
    }

    /// Insert an invitation, assigning the next ID when its ID is 0
    pub fn with_invitation(self, mut invitation: CampaignInvitation) -> Self {
        {
            let mut tables = self.tables.write().unwrap();
            if invitation.id.0 == 0 {
                invitation.id = tables.next_invitation_id();
            }
            tables.invitations.insert(invitation.id, invitation);
        }
        self
    }

    /// Insert a template, assigning the next ID when its ID is 0
    pub fn with_template(self, mut template: SpintaxTemplate) -> Self {
        {
            let mut tables = self.tables.write().unwrap();
            if template.id.0 == 0 {
                template.id = SpintaxTemplateId(tables.templates.len() as i64 + 1);
            }
            tables.templates.push(template);
        }
        self
    }

    pub fn with_message(self, message: CampaignMessage) -> Self {
        self.tables.write().unwrap().messages.push(message);
        self
    }

    pub fn set_invitation_status(&self, id: InvitationId, status: InvitationStatus) {
        if let Some(inv) = self.tables.write().unwrap().invitations.get_mut(&id) {
            inv.status = status;
        }
    }

    pub fn invitation(&self, id: InvitationId) -> Option<CampaignInvitation> {
        self.tables.read().unwrap().invitations.get(&id).cloned()
    }

    pub fn invitation_count(&self) -> usize {
        self.tables.read().unwrap().invitations.len()
    }

    pub fn talent(&self, id: TalentId) -> Option<Talent> {
        self.tables.read().unwrap().talents.get(&id).cloned()
    }

    pub fn messages(&self) -> Vec<CampaignMessage> {
        self.tables.read().unwrap().messages.clone()
    }

    pub fn trust_state(
        &self,
        talent_id: TalentId,
        promoter_id: PromoterId,
    ) -> Option<TalentPromoterState> {
        let pair = TrustPair::new(talent_id, promoter_id);
        self.tables.read().unwrap().states.get(&pair).cloned()
    }

    pub fn with_trust_state(self, state: TalentPromoterState) -> Self {
        self.tables
            .write()
            .unwrap()
            .states
            .insert(state.pair(), state);
        self
    }

    pub fn trust_logs(&self, pair: &TrustPair) -> Vec<TrustScoreLog> {
        self.tables
            .read()
            .unwrap()
            .logs
            .iter()
            .filter(|log| log.talent_id == pair.talent_id && log.promoter_id == pair.promoter_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryOutreachStore {
    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>, DomainError> {
        Ok(self.tables.read().unwrap().campaigns.get(id).cloned())
    }

    async fn find_event(&self, id: &EventId) -> Result<Option<Event>, DomainError> {
        Ok(self.tables.read().unwrap().events.get(id).cloned())
    }
}

#[async_trait]
impl TalentRepository for InMemoryOutreachStore {
    async fn find_by_id(&self, id: &TalentId) -> Result<Option<Talent>, DomainError> {
        Ok(self.tables.read().unwrap().talents.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[TalentId]) -> Result<Vec<Talent>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| tables.talents.get(id).cloned())
            .collect())
    }

    async fn find_uninvited(&self, campaign_id: &CampaignId) -> Result<Vec<Talent>, DomainError> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .talents
            .values()
            .filter(|talent| {
                !tables
                    .invitations
                    .values()
                    .any(|inv| inv.campaign_id == *campaign_id && inv.talent_id == talent.id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InvitationRepository for InMemoryOutreachStore {
    async fn find_by_id(
        &self,
        id: &InvitationId,
    ) -> Result<Option<CampaignInvitation>, DomainError> {
        Ok(self.tables.read().unwrap().invitations.get(id).cloned())
    }

    async fn find_by_campaign_and_talent(
        &self,
        campaign_id: &CampaignId,
        talent_id: &TalentId,
    ) -> Result<Option<CampaignInvitation>, DomainError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .invitations
            .values()
            .find(|inv| inv.campaign_id == *campaign_id && inv.talent_id == *talent_id)
            .cloned())
    }

    async fn find(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<CampaignInvitation>, DomainError> {
        let mut found = self.tables.read().unwrap().matching(filter);
        if let Some(limit) = filter.max_rows() {
            found.truncate(limit as usize);
        }
        Ok(found)
    }

    async fn count(&self, filter: &InvitationFilter) -> Result<u64, DomainError> {
        Ok(self.tables.read().unwrap().matching(filter).len() as u64)
    }

    async fn find_batches(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<(CampaignId, i32)>, DomainError> {
        let batches: BTreeSet<(CampaignId, i32)> = self
            .tables
            .read()
            .unwrap()
            .matching(filter)
            .iter()
            .map(|inv| (inv.campaign_id, inv.batch))
            .collect();
        Ok(batches.into_iter().collect())
    }

    async fn latest_invitation_at(
        &self,
        campaign_id: &CampaignId,
        batch: i32,
    ) -> Result<Option<DateTime<Utc>>, DomainError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .invitations
            .values()
            .filter(|inv| inv.campaign_id == *campaign_id && inv.batch == batch)
            .filter_map(|inv| inv.invitation_at)
            .max())
    }

    async fn create_many(
        &self,
        invitations: &[NewInvitation],
    ) -> Result<Vec<CampaignInvitation>, DomainError> {
        let mut tables = self.tables.write().unwrap();

        for (i, new) in invitations.iter().enumerate() {
            let exists = tables
                .invitations
                .values()
                .any(|inv| inv.campaign_id == new.campaign_id && inv.talent_id == new.talent_id);
            let repeated = invitations[..i]
                .iter()
                .any(|other| other.campaign_id == new.campaign_id && other.talent_id == new.talent_id);
            if exists || repeated {
                return Err(DomainError::Conflict(format!(
                    "Talent {} is already invited to campaign {}",
                    new.talent_id, new.campaign_id
                )));
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(invitations.len());
        for new in invitations {
            let invitation = CampaignInvitation {
                id: tables.next_invitation_id(),
                campaign_id: new.campaign_id,
                talent_id: new.talent_id,
                promoter_id: new.promoter_id,
                event_id: new.event_id,
                batch: new.batch,
                status: InvitationStatus::Pending,
                invitation_at: None,
                followup: false,
                followup_sent: false,
                thank_you_sent: false,
                has_replied: false,
                is_seen: false,
                created_at: now,
                updated_at: now,
            };
            tables.invitations.insert(invitation.id, invitation.clone());
            created.push(invitation);
        }
        Ok(created)
    }

    async fn update_many(
        &self,
        filter: &InvitationFilter,
        patch: &InvitationPatch,
    ) -> Result<u64, DomainError> {
        let mut tables = self.tables.write().unwrap();
        let now = Utc::now();
        let ids: Vec<InvitationId> = tables.matching(filter).iter().map(|inv| inv.id).collect();
        for id in &ids {
            if let Some(inv) = tables.invitations.get_mut(id) {
                inv.apply(patch, now);
            }
        }
        Ok(ids.len() as u64)
    }

    async fn delete(&self, id: &InvitationId) -> Result<(), DomainError> {
        let mut tables = self.tables.write().unwrap();
        if tables.invitations.remove(id).is_none() {
            return Err(DomainError::NotFound(format!("Invitation not found: {}", id)));
        }
        tables.messages.retain(|m| m.invitation_id != *id);
        Ok(())
    }

    async fn record_send(&self, send: &OutboundSend) -> Result<CampaignMessage, DomainError> {
        let mut tables = self.tables.write().unwrap();
        let at = send.message.at;

        let invitation = tables
            .invitations
            .get_mut(&send.invitation_id)
            .ok_or_else(|| {
                DomainError::NotFound(format!("Invitation not found: {}", send.invitation_id))
            })?;
        if invitation.status != send.expected_status {
            return Err(DomainError::Conflict(format!(
                "Invitation {} changed status to {}",
                invitation.id, invitation.status
            )));
        }
        invitation.apply(&send.patch, at);
        let pair = TrustPair::new(invitation.talent_id, invitation.promoter_id);

        let message = tables.push_message(&send.message);
        let state = tables.state_mut(pair, at);
        state.last_contacted = Some(at);
        state.updated_at = at;

        Ok(message)
    }
}

#[async_trait]
impl MessageRepository for InMemoryOutreachStore {
    async fn create(&self, message: &NewCampaignMessage) -> Result<CampaignMessage, DomainError> {
        Ok(self.tables.write().unwrap().push_message(message))
    }

    async fn find_uninterpreted_received(&self) -> Result<Vec<CampaignMessage>, DomainError> {
        let mut found: Vec<CampaignMessage> = self
            .tables
            .read()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.direction == MessageDirection::Received && !m.is_interpret)
            .cloned()
            .collect();
        found.sort_by_key(CampaignMessage::occurred_at);
        Ok(found)
    }

    async fn find_received_thread(
        &self,
        invitation_id: &InvitationId,
    ) -> Result<Vec<CampaignMessage>, DomainError> {
        let mut found: Vec<CampaignMessage> = self
            .tables
            .read()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.direction == MessageDirection::Received && m.invitation_id == *invitation_id)
            .cloned()
            .collect();
        found.sort_by_key(CampaignMessage::occurred_at);
        Ok(found)
    }

    async fn find_by_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<CampaignMessage>, DomainError> {
        let mut found: Vec<CampaignMessage> = self
            .tables
            .read()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.campaign_id == *campaign_id)
            .cloned()
            .collect();
        found.sort_by_key(CampaignMessage::occurred_at);
        Ok(found)
    }

    async fn last_sent_at_for_promoter(
        &self,
        promoter_id: &PromoterId,
    ) -> Result<Option<DateTime<Utc>>, DomainError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .messages
            .iter()
            .filter(|m| m.direction == MessageDirection::Sent && m.promoter_id == *promoter_id)
            .filter_map(|m| m.sent_at)
            .max())
    }
}

#[async_trait]
impl SpintaxTemplateRepository for InMemoryOutreachStore {
    async fn find_for_stage(
        &self,
        campaign_id: &CampaignId,
        stage: Stage,
        langs: &[String],
    ) -> Result<Vec<SpintaxTemplate>, DomainError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .templates
            .iter()
            .filter(|t| t.campaign_id == *campaign_id && t.stage == stage && langs.contains(&t.lang))
            .cloned()
            .collect())
    }

    async fn create(&self, template: &NewSpintaxTemplate) -> Result<SpintaxTemplate, DomainError> {
        let mut tables = self.tables.write().unwrap();
        let created = SpintaxTemplate {
            id: SpintaxTemplateId(tables.templates.len() as i64 + 1),
            campaign_id: template.campaign_id,
            stage: template.stage,
            lang: template.lang.clone(),
            content: template.content.clone(),
            created_at: Utc::now(),
        };
        tables.templates.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl TrustRepository for InMemoryOutreachStore {
    async fn find_state(
        &self,
        pair: &TrustPair,
    ) -> Result<Option<TalentPromoterState>, DomainError> {
        Ok(self.tables.read().unwrap().states.get(pair).cloned())
    }

    async fn get_or_create_state(
        &self,
        pair: &TrustPair,
    ) -> Result<TalentPromoterState, DomainError> {
        Ok(self
            .tables
            .write()
            .unwrap()
            .state_mut(*pair, Utc::now())
            .clone())
    }

    async fn apply(&self, entry: &NewTrustScoreLog) -> Result<TalentPromoterState, DomainError> {
        let mut tables = self.tables.write().unwrap();
        let now = Utc::now();
        let score = tables.score_after(entry.pair(), entry.change, now)?;
        tables.push_log(entry, now);
        let state = tables.state_mut(entry.pair(), now);
        state.trust_score = score;
        state.updated_at = now;
        Ok(state.clone())
    }

    async fn commit_reply(
        &self,
        commit: &ReplyCommit,
    ) -> Result<TalentPromoterState, DomainError> {
        let mut tables = self.tables.write().unwrap();
        let now = Utc::now();

        let fresh = tables
            .messages
            .iter()
            .any(|m| commit.message_ids.contains(&m.id) && !m.is_interpret);
        if !fresh {
            return Err(DomainError::Conflict(format!(
                "Replies of invitation {} were already interpreted",
                commit.invitation_id
            )));
        }

        let score = tables.score_after(commit.entry.pair(), commit.entry.change, now)?;

        let invitation = tables
            .invitations
            .get_mut(&commit.invitation_id)
            .filter(|inv| inv.status == commit.expected_status)
            .ok_or_else(|| {
                DomainError::PreconditionFailed(format!(
                    "Invitation {} is missing or no longer {}",
                    commit.invitation_id, commit.expected_status
                ))
            })?;
        invitation.apply(&commit.patch, now);

        for message in tables
            .messages
            .iter_mut()
            .filter(|m| commit.message_ids.contains(&m.id))
        {
            message.is_interpret = true;
        }

        if let Some(city) = &commit.talent_city {
            if let Some(talent) = tables.talents.get_mut(&commit.entry.talent_id) {
                talent.current_city = Some(city.clone());
            }
        }

        tables.push_log(&commit.entry, now);
        let state = tables.state_mut(commit.entry.pair(), now);
        state.trust_score = score;
        state.last_reply = Some(commit.last_reply);
        state.opted_out |= commit.opted_out;
        state.updated_at = now;
        Ok(state.clone())
    }

    async fn find_states_for_promoter(
        &self,
        promoter_id: &PromoterId,
        talent_ids: &[TalentId],
    ) -> Result<Vec<TalentPromoterState>, DomainError> {
        Ok(self
            .tables
            .read()
            .unwrap()
            .states
            .values()
            .filter(|s| s.promoter_id == *promoter_id && talent_ids.contains(&s.talent_id))
            .cloned()
            .collect())
    }

    async fn find_logs(&self, pair: &TrustPair) -> Result<Vec<TrustScoreLog>, DomainError> {
        Ok(self.trust_logs(pair))
    }

    async fn sum_changes(&self, pair: &TrustPair) -> Result<i64, DomainError> {
        Ok(self
            .trust_logs(pair)
            .iter()
            .map(|log| i64::from(log.change))
            .sum())
    }
}

// ============================================================================
// Scripted Completion Client
// ============================================================================

/// A completion client that answers from a script and records prompts
#[derive(Default)]
pub struct ScriptedCompletionClient {
    rules: Vec<(String, String)>,
    default: Option<String>,
    should_fail: bool,
    prompts: Arc<RwLock<Vec<String>>>,
}

impl ScriptedCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Answer with `response` when no rule matches
    pub fn default_response(mut self, response: &str) -> Self {
        self.default = Some(response.to_string());
        self
    }

    /// Answer with `response` when the prompt contains `needle`
    pub fn respond_when(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), response.to_string()));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete_json(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
        self.prompts.write().unwrap().push(prompt.to_string());

        if self.should_fail {
            return Err(LlmError::Api {
                status: 503,
                message: "scripted failure".to_string(),
            });
        }

        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .or_else(|| self.default.clone())
            .ok_or_else(|| LlmError::Unavailable("no scripted response".to_string()))
    }
}

// ============================================================================
// Recording Dispatcher
// ============================================================================

/// A dispatcher that records every (recipient, text) it is given
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Arc<RwLock<Vec<(String, String)>>>,
    should_fail: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.read().unwrap().clone()
    }
}

#[async_trait]
impl MessageDispatcher for RecordingDispatcher {
    async fn dispatch(&self, recipient: &str, text: &str) -> Result<(), DispatchError> {
        if self.should_fail {
            return Err(DispatchError::Rejected {
                status: 503,
                message: "channel down".to_string(),
            });
        }
        self.sent
            .write()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}
