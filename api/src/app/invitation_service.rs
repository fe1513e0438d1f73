//! Invitation service
//!
//! Operator-facing operations on invitations. Every call is scoped to the
//! promoter that owns the campaign's event.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::batch_gate::{BatchGate, GateDecision};
use crate::app::invitation_state_machine::{plan, Transition};
use crate::app::outreach_config::{
    DEFAULT_RECOMMENDATION_LIMIT, MAX_INVITATIONS_PER_BATCH, MAX_RECOMMENDATION_LIMIT,
};
use crate::domain::entities::{
    Campaign, CampaignId, CampaignInvitation, CampaignMessage, Event, InvitationFilter,
    InvitationId, InvitationPatch, MessageDirection, NewCampaignMessage, NewInvitation,
    PromoterId, Talent, TalentId,
};
use crate::domain::ports::{
    CampaignRepository, InvitationRepository, MessageRepository, TalentRepository,
    TrustRepository,
};
use crate::error::{AppError, DomainError};

/// Filters of a talent recommendation request
#[derive(Debug, Clone, Default)]
pub struct RecommendationQuery {
    /// Lowest trust score with the promoter; talents never scored count as 0
    pub min_trust: Option<i32>,
    pub limit: Option<u64>,
}

/// A talent worth inviting, with its standing towards the promoter
#[derive(Debug, Clone, Serialize)]
pub struct TalentRecommendation {
    #[serde(flatten)]
    pub talent: Talent,
    pub trust_score: i32,
    pub last_contacted: Option<DateTime<Utc>>,
}

pub struct InvitationService<CR, TR, IR, MR, SR>
where
    CR: CampaignRepository,
    TR: TalentRepository,
    IR: InvitationRepository,
    MR: MessageRepository,
    SR: TrustRepository,
{
    campaigns: Arc<CR>,
    talents: Arc<TR>,
    invitations: Arc<IR>,
    messages: Arc<MR>,
    trust: Arc<SR>,
    gate: BatchGate<IR>,
}

impl<CR, TR, IR, MR, SR> InvitationService<CR, TR, IR, MR, SR>
where
    CR: CampaignRepository,
    TR: TalentRepository,
    IR: InvitationRepository,
    MR: MessageRepository,
    SR: TrustRepository,
{
    pub fn new(
        campaigns: Arc<CR>,
        talents: Arc<TR>,
        invitations: Arc<IR>,
        messages: Arc<MR>,
        trust: Arc<SR>,
    ) -> Self {
        Self {
            campaigns,
            talents,
            gate: BatchGate::new(invitations.clone()),
            invitations,
            messages,
            trust,
        }
    }

    /// Load a campaign and its event, checking the promoter owns it
    pub async fn owned_campaign(
        &self,
        campaign_id: &CampaignId,
        promoter_id: &PromoterId,
    ) -> Result<(Campaign, Event), AppError> {
        let campaign = self
            .campaigns
            .find_by_id(campaign_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Campaign not found: {}", campaign_id)))?;

        let event = self
            .campaigns
            .find_event(&campaign.event_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Event not found: {}", campaign.event_id)))?;

        if !event.is_owned_by(promoter_id) {
            return Err(DomainError::Forbidden(format!(
                "Campaign {} does not belong to promoter {}",
                campaign_id, promoter_id
            ))
            .into());
        }

        Ok((campaign, event))
    }

    /// Mark invitations of a campaign as attended. All-or-nothing: any ID
    /// that is unknown or not in the campaign, or any invitation that was
    /// never sent, rejects the whole call.
    pub async fn mark_attended(
        &self,
        campaign_id: &CampaignId,
        promoter_id: &PromoterId,
        ids: &[InvitationId],
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        self.bulk_transition(campaign_id, promoter_id, ids, Transition::MarkAttended, now)
            .await
    }

    /// Request a followup message for invitations of a campaign. Same
    /// membership rules as `mark_attended`.
    pub async fn mark_followup(
        &self,
        campaign_id: &CampaignId,
        promoter_id: &PromoterId,
        ids: &[InvitationId],
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        self.bulk_transition(campaign_id, promoter_id, ids, Transition::MarkFollowup, now)
            .await
    }

    async fn bulk_transition(
        &self,
        campaign_id: &CampaignId,
        promoter_id: &PromoterId,
        ids: &[InvitationId],
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let requested: BTreeSet<InvitationId> = ids.iter().copied().collect();
        if requested.is_empty() {
            return Err(AppError::BadRequest("No invitation IDs given".to_string()));
        }
        self.owned_campaign(campaign_id, promoter_id).await?;

        let scope = InvitationFilter::new()
            .campaign(*campaign_id)
            .ids(requested.iter().copied());
        let found = self.invitations.find(&scope).await?;

        let found_ids: HashSet<InvitationId> = found.iter().map(|inv| inv.id).collect();
        let offending: Vec<InvitationId> = requested
            .iter()
            .filter(|id| !found_ids.contains(id))
            .copied()
            .collect();
        if !offending.is_empty() {
            return Err(DomainError::NotFound(format!(
                "Invitations not found in campaign {}: {}",
                campaign_id,
                join_ids(&offending)
            ))
            .into());
        }

        let mut patch: Option<InvitationPatch> = None;
        let mut rejected = Vec::new();
        for invitation in &found {
            match plan(invitation, transition, now) {
                Ok(planned) => patch = Some(planned.patch),
                Err(_) => rejected.push(invitation.id),
            }
        }
        if !rejected.is_empty() {
            return Err(DomainError::Validation(format!(
                "Invitations not yet sent: {}",
                join_ids(&rejected)
            ))
            .into());
        }

        let Some(patch) = patch else {
            return Ok(0);
        };
        let updated = self.invitations.update_many(&scope, &patch).await?;

        tracing::info!(
            campaign_id = %campaign_id,
            promoter_id = %promoter_id,
            transition = ?transition,
            updated = updated,
            "Bulk invitation update applied"
        );

        Ok(updated)
    }

    /// Add talents to a batch of a campaign. Talents already invited are
    /// returned unchanged.
    pub async fn add_talents(
        &self,
        campaign_id: &CampaignId,
        promoter_id: &PromoterId,
        talent_ids: &[TalentId],
        batch: i32,
    ) -> Result<Vec<CampaignInvitation>, AppError> {
        if batch < 1 {
            return Err(DomainError::Validation("Batch must be 1 or greater".to_string()).into());
        }
        let (campaign, event) = self.owned_campaign(campaign_id, promoter_id).await?;

        let wanted: BTreeSet<TalentId> = talent_ids.iter().copied().collect();
        if wanted.is_empty() {
            return Err(AppError::BadRequest("No talent IDs given".to_string()));
        }
        let wanted: Vec<TalentId> = wanted.into_iter().collect();

        let existing_talents: HashSet<TalentId> = self
            .talents
            .find_by_ids(&wanted)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let missing: Vec<TalentId> = wanted
            .iter()
            .filter(|id| !existing_talents.contains(id))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(DomainError::Validation(format!(
                "Talents not found: {}",
                join_ids(&missing)
            ))
            .into());
        }

        let mut result = Vec::with_capacity(wanted.len());
        let mut to_create = Vec::new();
        for talent_id in &wanted {
            match self
                .invitations
                .find_by_campaign_and_talent(&campaign.id, talent_id)
                .await?
            {
                Some(existing) => result.push(existing),
                None => to_create.push(NewInvitation {
                    campaign_id: campaign.id,
                    talent_id: *talent_id,
                    promoter_id: event.promoter_id,
                    event_id: event.id,
                    batch,
                }),
            }
        }

        if !to_create.is_empty() {
            let new_talents: Vec<TalentId> = to_create.iter().map(|n| n.talent_id).collect();
            let mut opted_out: Vec<TalentId> = self
                .trust
                .find_states_for_promoter(&event.promoter_id, &new_talents)
                .await?
                .into_iter()
                .filter(|state| state.opted_out)
                .map(|state| state.talent_id)
                .collect();
            opted_out.sort();
            if !opted_out.is_empty() {
                return Err(DomainError::Validation(format!(
                    "Talents opted out of this promoter's outreach: {}",
                    join_ids(&opted_out)
                ))
                .into());
            }

            let in_batch = self
                .invitations
                .count(&InvitationFilter::new().campaign(campaign.id).batch(batch))
                .await?;
            let remaining = MAX_INVITATIONS_PER_BATCH.saturating_sub(in_batch);
            if to_create.len() as u64 > remaining {
                return Err(DomainError::Validation(format!(
                    "Batch {} can take {} more invitations, {} requested",
                    batch,
                    remaining,
                    to_create.len()
                ))
                .into());
            }

            let created = self.invitations.create_many(&to_create).await?;
            tracing::info!(
                campaign_id = %campaign.id,
                batch = batch,
                created = created.len(),
                "Talents added to campaign"
            );
            result.extend(created);
        }

        result.sort_by_key(|inv| inv.id);
        Ok(result)
    }

    pub async fn remove_invitation(
        &self,
        campaign_id: &CampaignId,
        invitation_id: &InvitationId,
        promoter_id: &PromoterId,
    ) -> Result<(), AppError> {
        self.owned_campaign(campaign_id, promoter_id).await?;

        let invitation = self
            .invitations
            .find_by_id(invitation_id)
            .await?
            .filter(|inv| inv.campaign_id == *campaign_id)
            .ok_or_else(|| {
                DomainError::NotFound(format!("Invitation not found: {}", invitation_id))
            })?;

        self.invitations.delete(&invitation.id).await?;

        tracing::info!(
            campaign_id = %campaign_id,
            invitation_id = %invitation_id,
            "Invitation removed"
        );
        Ok(())
    }

    /// List a campaign's invitations matching `filter`, oldest first
    pub async fn list_invitations(
        &self,
        campaign_id: &CampaignId,
        promoter_id: &PromoterId,
        filter: InvitationFilter,
    ) -> Result<Vec<CampaignInvitation>, AppError> {
        self.owned_campaign(campaign_id, promoter_id).await?;
        Ok(self.invitations.find(&filter.campaign(*campaign_id)).await?)
    }

    /// Talents not yet invited to the campaign, best trust first. Talents
    /// that opted out of the promoter's outreach are never recommended.
    pub async fn recommend_talents(
        &self,
        campaign_id: &CampaignId,
        promoter_id: &PromoterId,
        query: &RecommendationQuery,
    ) -> Result<Vec<TalentRecommendation>, AppError> {
        let (_, event) = self.owned_campaign(campaign_id, promoter_id).await?;
        let limit = query
            .limit
            .unwrap_or(DEFAULT_RECOMMENDATION_LIMIT)
            .clamp(1, MAX_RECOMMENDATION_LIMIT) as usize;

        let candidates = self.talents.find_uninvited(campaign_id).await?;
        let ids: Vec<TalentId> = candidates.iter().map(|t| t.id).collect();
        let states: HashMap<TalentId, _> = self
            .trust
            .find_states_for_promoter(&event.promoter_id, &ids)
            .await?
            .into_iter()
            .map(|state| (state.talent_id, state))
            .collect();

        let mut recommended: Vec<TalentRecommendation> = candidates
            .into_iter()
            .filter_map(|talent| {
                let state = states.get(&talent.id);
                if state.is_some_and(|s| s.opted_out) {
                    return None;
                }
                let trust_score = state.map_or(0, |s| s.trust_score);
                if query.min_trust.is_some_and(|min| trust_score < min) {
                    return None;
                }
                Some(TalentRecommendation {
                    trust_score,
                    last_contacted: state.and_then(|s| s.last_contacted),
                    talent,
                })
            })
            .collect();

        recommended.sort_by(|a, b| {
            b.trust_score
                .cmp(&a.trust_score)
                .then(a.talent.id.cmp(&b.talent.id))
        });
        recommended.truncate(limit);
        Ok(recommended)
    }

    /// Whether `batch` of a campaign may start sending
    pub async fn can_start_batch(
        &self,
        campaign_id: &CampaignId,
        batch: i32,
        promoter_id: &PromoterId,
        now: DateTime<Utc>,
    ) -> Result<GateDecision, AppError> {
        if batch < 1 {
            return Err(DomainError::Validation("Batch must be 1 or greater".to_string()).into());
        }
        self.owned_campaign(campaign_id, promoter_id).await?;
        Ok(self.gate.can_start(campaign_id, batch, now).await?)
    }

    /// Record a talent's reply. It is picked up by the next reply tick.
    pub async fn record_inbound_reply(
        &self,
        campaign_id: &CampaignId,
        talent_id: &TalentId,
        text: &str,
        received_at: DateTime<Utc>,
    ) -> Result<CampaignMessage, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::Validation("Reply text is empty".to_string()).into());
        }

        let invitation = self
            .invitations
            .find_by_campaign_and_talent(campaign_id, talent_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!(
                    "No invitation of talent {} in campaign {}",
                    talent_id, campaign_id
                ))
            })?;

        let message = self
            .messages
            .create(&NewCampaignMessage {
                campaign_id: invitation.campaign_id,
                invitation_id: invitation.id,
                talent_id: invitation.talent_id,
                promoter_id: invitation.promoter_id,
                direction: MessageDirection::Received,
                stage: None,
                body: text.to_string(),
                at: received_at,
            })
            .await?;

        tracing::debug!(
            invitation_id = %invitation.id,
            campaign_id = %campaign_id,
            "Inbound reply recorded"
        );

        Ok(message)
    }
}

fn join_ids<T: std::fmt::Display>(ids: &[T]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::domain::entities::{
        CampaignStatus, InvitationStatus, TalentPromoterState, TrustPair,
    };
    use crate::test_utils::{
        sent_invitation, test_campaign, test_event, test_invitation, test_talent,
        InMemoryOutreachStore,
    };

    type TestService = InvitationService<
        InMemoryOutreachStore,
        InMemoryOutreachStore,
        InMemoryOutreachStore,
        InMemoryOutreachStore,
        InMemoryOutreachStore,
    >;

    const OWNER: PromoterId = PromoterId(1);
    const STRANGER: PromoterId = PromoterId(2);
    const CAMPAIGN: CampaignId = CampaignId(1);

    fn base_store() -> InMemoryOutreachStore {
        InMemoryOutreachStore::new()
            .with_event(test_event(1, OWNER))
            .with_event(test_event(2, STRANGER))
            .with_campaign(test_campaign(1, 1, CampaignStatus::Active))
            .with_campaign(test_campaign(2, 2, CampaignStatus::Active))
            .with_talent(test_talent(1, Some("en")))
            .with_talent(test_talent(2, Some("en")))
            .with_talent(test_talent(3, Some("fr")))
    }

    fn create_service(store: InMemoryOutreachStore) -> (TestService, Arc<InMemoryOutreachStore>) {
        let store = Arc::new(store);
        let service = InvitationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        (service, store)
    }

    #[tokio::test]
    async fn mark_attended_updates_all_sent_invitations() {
        let now = Utc::now();
        let store = base_store()
            .with_invitation(sent_invitation(CAMPAIGN, TalentId(1), 1, now))
            .with_invitation(sent_invitation(CAMPAIGN, TalentId(2), 1, now));
        let (service, store) = create_service(store);

        let updated = service
            .mark_attended(
                &CAMPAIGN,
                &OWNER,
                &[InvitationId(1), InvitationId(2), InvitationId(1)],
                now,
            )
            .await
            .unwrap();

        assert_eq!(updated, 2);
        for id in [1, 2] {
            assert_eq!(
                store.invitation(InvitationId(id)).unwrap().status,
                InvitationStatus::Attended
            );
        }
    }

    #[tokio::test]
    async fn mark_attended_rejects_pending_for_whole_call() {
        let now = Utc::now();
        let store = base_store()
            .with_invitation(sent_invitation(CAMPAIGN, TalentId(1), 1, now))
            .with_invitation(test_invitation(CAMPAIGN, TalentId(2), 1));
        let (service, store) = create_service(store);

        let result = service
            .mark_attended(&CAMPAIGN, &OWNER, &[InvitationId(1), InvitationId(2)], now)
            .await;

        match result {
            Err(AppError::Domain(DomainError::Validation(msg))) => assert!(msg.contains('2')),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(
            store.invitation(InvitationId(1)).unwrap().status,
            InvitationStatus::Sent
        );
    }

    #[tokio::test]
    async fn unknown_or_foreign_ids_abort_with_listing() {
        let now = Utc::now();
        let store = base_store()
            .with_invitation(sent_invitation(CAMPAIGN, TalentId(1), 1, now))
            .with_invitation(sent_invitation(CampaignId(2), TalentId(2), 1, now));
        let (service, store) = create_service(store);

        let result = service
            .mark_followup(
                &CAMPAIGN,
                &OWNER,
                &[InvitationId(1), InvitationId(2), InvitationId(99)],
                now,
            )
            .await;

        match result {
            Err(AppError::Domain(DomainError::NotFound(msg))) => {
                assert!(msg.ends_with("2, 99"), "{}", msg);
            }
            other => panic!("expected not found, got {:?}", other),
        }
        assert!(!store.invitation(InvitationId(1)).unwrap().followup);
    }

    #[tokio::test]
    async fn bulk_calls_are_scoped_to_one_campaign() {
        let now = Utc::now();
        let other_owned = CampaignId(3);
        let store = base_store()
            .with_campaign(test_campaign(other_owned.0, 1, CampaignStatus::Active))
            .with_invitation(sent_invitation(CAMPAIGN, TalentId(1), 1, now))
            .with_invitation(sent_invitation(other_owned, TalentId(2), 1, now));
        let (service, store) = create_service(store);

        // Both invitations belong to the owner, but not to the same campaign
        let mixed = service
            .mark_attended(&CAMPAIGN, &OWNER, &[InvitationId(1), InvitationId(2)], now)
            .await;
        match mixed {
            Err(AppError::Domain(DomainError::NotFound(msg))) => assert!(msg.ends_with('2')),
            other => panic!("expected not found, got {:?}", other),
        }
        for id in [1, 2] {
            assert_eq!(
                store.invitation(InvitationId(id)).unwrap().status,
                InvitationStatus::Sent
            );
        }

        let foreign = service
            .mark_attended(&CampaignId(2), &OWNER, &[InvitationId(1)], now)
            .await;
        assert!(matches!(
            foreign,
            Err(AppError::Domain(DomainError::Forbidden(_)))
        ));

        let updated = service
            .mark_attended(&other_owned, &OWNER, &[InvitationId(2)], now)
            .await
            .unwrap();
        assert_eq!(updated, 1);
        assert_eq!(
            store.invitation(InvitationId(1)).unwrap().status,
            InvitationStatus::Sent
        );
        assert_eq!(
            store.invitation(InvitationId(2)).unwrap().status,
            InvitationStatus::Attended
        );
    }

    #[tokio::test]
    async fn mark_followup_sets_flag_without_status_change() {
        let now = Utc::now();
        let store = base_store().with_invitation(sent_invitation(CAMPAIGN, TalentId(1), 1, now));
        let (service, store) = create_service(store);

        service
            .mark_followup(&CAMPAIGN, &OWNER, &[InvitationId(1)], now)
            .await
            .unwrap();

        let invitation = store.invitation(InvitationId(1)).unwrap();
        assert!(invitation.followup);
        assert_eq!(invitation.status, InvitationStatus::Sent);
    }

    #[tokio::test]
    async fn empty_id_list_is_a_bad_request() {
        let (service, _) = create_service(base_store());
        let result = service
            .mark_followup(&CAMPAIGN, &OWNER, &[], Utc::now())
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn add_talents_creates_pending_invitations_idempotently() {
        let (service, store) = create_service(base_store());

        let first = service
            .add_talents(&CAMPAIGN, &OWNER, &[TalentId(1), TalentId(2)], 1)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.iter().all(|i| i.status == InvitationStatus::Pending));
        assert!(first.iter().all(|i| i.promoter_id == OWNER));

        let again = service
            .add_talents(&CAMPAIGN, &OWNER, &[TalentId(2), TalentId(3)], 1)
            .await
            .unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(store.invitation_count(), 3);
    }

    #[tokio::test]
    async fn add_talents_rejects_missing_talents() {
        let (service, store) = create_service(base_store());

        let result = service
            .add_talents(&CAMPAIGN, &OWNER, &[TalentId(1), TalentId(42)], 1)
            .await;

        match result {
            Err(AppError::Domain(DomainError::Validation(msg))) => assert!(msg.contains("42")),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(store.invitation_count(), 0);
    }

    #[tokio::test]
    async fn add_talents_enforces_batch_capacity() {
        let mut store = base_store();
        for talent in 100..200 {
            store = store
                .with_talent(test_talent(talent, None))
                .with_invitation(test_invitation(CAMPAIGN, TalentId(talent), 2));
        }
        let (service, _) = create_service(store);

        let result = service
            .add_talents(&CAMPAIGN, &OWNER, &[TalentId(1)], 2)
            .await;
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::Validation(_)))
        ));

        assert!(service
            .add_talents(&CAMPAIGN, &OWNER, &[TalentId(1)], 3)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn foreign_campaign_is_forbidden() {
        let (service, _) = create_service(base_store());

        let result = service
            .add_talents(&CampaignId(2), &OWNER, &[TalentId(1)], 1)
            .await;
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::Forbidden(_)))
        ));

        let missing = service
            .list_invitations(&CampaignId(9), &OWNER, InvitationFilter::new())
            .await;
        assert!(matches!(
            missing,
            Err(AppError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn remove_invitation_checks_campaign_membership() {
        let now = Utc::now();
        let store = base_store()
            .with_invitation(test_invitation(CAMPAIGN, TalentId(1), 1))
            .with_invitation(sent_invitation(CampaignId(2), TalentId(2), 1, now));
        let (service, store) = create_service(store);

        let wrong = service
            .remove_invitation(&CAMPAIGN, &InvitationId(2), &OWNER)
            .await;
        assert!(matches!(
            wrong,
            Err(AppError::Domain(DomainError::NotFound(_)))
        ));

        service
            .remove_invitation(&CAMPAIGN, &InvitationId(1), &OWNER)
            .await
            .unwrap();
        assert!(store.invitation(InvitationId(1)).is_none());
    }

    #[tokio::test]
    async fn list_invitations_applies_typed_filters() {
        let now = Utc::now();
        let mut replied = sent_invitation(CAMPAIGN, TalentId(2), 2, now);
        replied.has_replied = true;
        let store = base_store()
            .with_invitation(test_invitation(CAMPAIGN, TalentId(1), 1))
            .with_invitation(replied)
            .with_invitation(sent_invitation(CAMPAIGN, TalentId(3), 2, now));
        let (service, _) = create_service(store);

        let batch_two = service
            .list_invitations(&CAMPAIGN, &OWNER, InvitationFilter::new().batch(2))
            .await
            .unwrap();
        assert_eq!(
            batch_two.iter().map(|i| i.id).collect::<Vec<_>>(),
            vec![InvitationId(2), InvitationId(3)]
        );

        let replied = service
            .list_invitations(
                &CAMPAIGN,
                &OWNER,
                InvitationFilter::new().batch(2).has_replied(true),
            )
            .await
            .unwrap();
        assert_eq!(replied.len(), 1);
        assert_eq!(replied[0].talent_id, TalentId(2));
    }

    #[tokio::test]
    async fn can_start_batch_reports_gate_inputs() {
        let now = Utc::now();
        let store = base_store()
            .with_invitation(sent_invitation(CAMPAIGN, TalentId(1), 1, now - Duration::hours(13)));
        let (service, _) = create_service(store);

        let decision = service
            .can_start_batch(&CAMPAIGN, 2, &OWNER, now)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.previous_total, 1);

        let foreign = service.can_start_batch(&CAMPAIGN, 2, &STRANGER, now).await;
        assert!(matches!(
            foreign,
            Err(AppError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[tokio::test]
    async fn inbound_reply_is_stored_uninterpreted() {
        let now = Utc::now();
        let store = base_store().with_invitation(sent_invitation(CAMPAIGN, TalentId(1), 1, now));
        let (service, store) = create_service(store);

        let message = service
            .record_inbound_reply(&CAMPAIGN, &TalentId(1), "  sounds good  ", now)
            .await
            .unwrap();

        assert_eq!(message.direction, MessageDirection::Received);
        assert_eq!(message.body, "sounds good");
        assert_eq!(message.received_at, Some(now));
        assert!(!message.is_interpret);
        assert_eq!(store.messages().len(), 1);

        let unknown = service
            .record_inbound_reply(&CAMPAIGN, &TalentId(3), "hi", now)
            .await;
        assert!(matches!(
            unknown,
            Err(AppError::Domain(DomainError::NotFound(_)))
        ));
    }

    fn trust_state(talent: i64, score: i32, opted_out: bool) -> TalentPromoterState {
        let pair = TrustPair::new(TalentId(talent), OWNER);
        let mut state = TalentPromoterState::initial(pair, Utc::now());
        state.trust_score = score;
        state.opted_out = opted_out;
        state
    }

    #[tokio::test]
    async fn add_talents_refuses_opted_out_talents() {
        let store = base_store().with_trust_state(trust_state(2, -8, true));
        let (service, store) = create_service(store);

        let result = service
            .add_talents(&CAMPAIGN, &OWNER, &[TalentId(1), TalentId(2)], 1)
            .await;

        match result {
            Err(AppError::Domain(DomainError::Validation(msg))) => assert!(msg.ends_with('2')),
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(store.invitation_count(), 0);
    }

    #[tokio::test]
    async fn recommendations_skip_invited_and_opted_out_talents() {
        let store = base_store()
            .with_talent(test_talent(4, None))
            .with_invitation(test_invitation(CAMPAIGN, TalentId(1), 1))
            .with_trust_state(trust_state(2, 3, false))
            .with_trust_state(trust_state(3, 9, true))
            .with_trust_state(trust_state(4, 7, false));
        let (service, _) = create_service(store);

        let all = service
            .recommend_talents(&CAMPAIGN, &OWNER, &RecommendationQuery::default())
            .await
            .unwrap();
        assert_eq!(
            all.iter().map(|r| r.talent.id).collect::<Vec<_>>(),
            vec![TalentId(4), TalentId(2)]
        );
        assert_eq!(all[0].trust_score, 7);

        let trusted = service
            .recommend_talents(
                &CAMPAIGN,
                &OWNER,
                &RecommendationQuery {
                    min_trust: Some(5),
                    limit: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(trusted.len(), 1);
        assert_eq!(trusted[0].talent.id, TalentId(4));

        let foreign = service
            .recommend_talents(&CampaignId(2), &OWNER, &RecommendationQuery::default())
            .await;
        assert!(matches!(
            foreign,
            Err(AppError::Domain(DomainError::Forbidden(_)))
        ));
    }

    #[tokio::test]
    async fn unscored_talents_count_as_zero_trust() {
        let store = base_store().with_trust_state(trust_state(3, -2, false));
        let (service, _) = create_service(store);

        let recommended = service
            .recommend_talents(
                &CAMPAIGN,
                &OWNER,
                &RecommendationQuery {
                    min_trust: Some(0),
                    limit: Some(1),
                },
            )
            .await
            .unwrap();

        assert_eq!(recommended.len(), 1);
        assert_eq!(recommended[0].talent.id, TalentId(1));
        assert_eq!(recommended[0].trust_score, 0);
        assert!(recommended[0].last_contacted.is_none());
    }
}
