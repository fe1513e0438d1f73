//! Outreach service
//!
//! Sends invitation, followup and thank-you messages. Sends of one promoter
//! are serialized through a per-promoter lease held across the gap check, the
//! dispatch and the send record, so two sends can never both pass the gap
//! check for the same promoter.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::app::batch_gate::BatchGate;
use crate::app::invitation_state_machine::{plan, Transition};
use crate::app::outreach_config::SchedulerSettings;
use crate::app::scheduler::{Pipeline, TickReport};
use crate::app::template_renderer::{render_message, TemplateVars};
use crate::app::template_selector::{choose_template, talent_language, TemplateSelector};
use crate::domain::entities::{
    CampaignId, CampaignInvitation, CampaignMessage, CampaignStatus, InvitationFilter,
    InvitationStatus, MessageDirection, NewCampaignMessage, PromoterId, Stage,
};
use crate::domain::ports::{
    CampaignRepository, InvitationRepository, MessageDispatcher, MessageRepository,
    OutboundSend, SpintaxTemplateRepository, TalentRepository,
};
use crate::error::{AppError, DomainError};

/// Why an eligible invitation was left for a later tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The promoter sent too recently
    GapNotElapsed,
    /// No template in the talent's language or English
    NoTemplate,
}

#[derive(Debug, Clone)]
pub enum SendOutcome {
    Sent(CampaignMessage),
    Skipped(SkipReason),
}

/// One async lock per promoter
#[derive(Default)]
pub struct PromoterLeases {
    locks: Mutex<HashMap<PromoterId, Arc<Mutex<()>>>>,
}

impl PromoterLeases {
    pub async fn acquire(&self, promoter_id: PromoterId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(promoter_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

pub struct OutreachService<CR, TR, IR, MR, STR, D>
where
    CR: CampaignRepository,
    TR: TalentRepository,
    IR: InvitationRepository,
    MR: MessageRepository,
    STR: SpintaxTemplateRepository,
    D: MessageDispatcher,
{
    campaigns: Arc<CR>,
    talents: Arc<TR>,
    invitations: Arc<IR>,
    messages: Arc<MR>,
    selector: TemplateSelector<STR>,
    gate: BatchGate<IR>,
    dispatcher: Arc<D>,
    leases: PromoterLeases,
    rng: Mutex<StdRng>,
    settings: SchedulerSettings,
}

impl<CR, TR, IR, MR, STR, D> OutreachService<CR, TR, IR, MR, STR, D>
where
    CR: CampaignRepository,
    TR: TalentRepository,
    IR: InvitationRepository,
    MR: MessageRepository,
    STR: SpintaxTemplateRepository,
    D: MessageDispatcher,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        campaigns: Arc<CR>,
        talents: Arc<TR>,
        invitations: Arc<IR>,
        messages: Arc<MR>,
        templates: Arc<STR>,
        dispatcher: Arc<D>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            campaigns,
            talents,
            gate: BatchGate::new(invitations.clone()),
            invitations,
            messages,
            selector: TemplateSelector::new(templates),
            dispatcher,
            leases: PromoterLeases::default(),
            rng: Mutex::new(StdRng::from_entropy()),
            settings,
        }
    }

    /// Replace the random source, e.g. with a seeded one in tests
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// Invitations eligible for a stage, oldest first, capped per tick
    pub fn selection_filter(&self, stage: Stage, now: DateTime<Utc>) -> InvitationFilter {
        match stage {
            Stage::Invitation => InvitationFilter::new()
                .status(InvitationStatus::Pending)
                .campaign_status(CampaignStatus::Active)
                .limit(self.settings.initial_batch_size),
            Stage::Followup => InvitationFilter::new()
                .followup(true)
                .followup_sent(false)
                .invited_at_or_before(now - self.settings.followup_grace)
                .campaign_status(CampaignStatus::Active)
                .limit(self.settings.followup_batch_size),
            Stage::Postevent => InvitationFilter::new()
                .status(InvitationStatus::Attended)
                .thank_you_sent(false)
                .campaign_status(CampaignStatus::Completed)
                .post_event_trigger_reached(now)
                .limit(self.settings.thank_you_batch_size),
        }
    }

    /// Run one tick of a stage pipeline. Failures of single invitations are
    /// logged and counted; only a failing selection query fails the tick.
    pub async fn run_stage(&self, stage: Stage, now: DateTime<Utc>) -> Result<TickReport, AppError> {
        let mut report = TickReport::new(pipeline_name(stage));

        // Closed batches are excluded before the per-tick cap
        let mut filter = self.selection_filter(stage, now);
        if stage == Stage::Invitation {
            let closed = self.closed_batches(now, &mut report).await?;
            filter = filter.exclude_batches(closed);
        }

        let selected = self.invitations.find(&filter).await?;
        report.selected = selected.len();

        for invitation in &selected {
            match self.send(invitation, stage, now).await {
                Ok(SendOutcome::Sent(_)) => report.sent += 1,
                Ok(SendOutcome::Skipped(reason)) => {
                    tracing::debug!(
                        invitation_id = %invitation.id,
                        promoter_id = %invitation.promoter_id,
                        stage = %stage,
                        reason = ?reason,
                        "Send skipped"
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(
                        invitation_id = %invitation.id,
                        campaign_id = %invitation.campaign_id,
                        promoter_id = %invitation.promoter_id,
                        stage = %stage,
                        error = %e,
                        "Send failed"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// (campaign, batch) pairs with pending invitations whose batch may not
    /// start yet. A failing gate check keeps its batch closed for this tick.
    async fn closed_batches(
        &self,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<Vec<(CampaignId, i32)>, AppError> {
        let waiting = self
            .invitations
            .find_batches(
                &InvitationFilter::new()
                    .status(InvitationStatus::Pending)
                    .campaign_status(CampaignStatus::Active),
            )
            .await?;

        let mut closed = Vec::new();
        for (campaign_id, batch) in waiting.into_iter().filter(|(_, batch)| *batch > 1) {
            match self.gate.can_start(&campaign_id, batch, now).await {
                Ok(decision) if decision.allowed => {}
                Ok(_) => {
                    tracing::debug!(
                        campaign_id = %campaign_id,
                        batch = batch,
                        "Batch not open yet, holding its invitations"
                    );
                    closed.push((campaign_id, batch));
                }
                Err(e) => {
                    tracing::warn!(
                        campaign_id = %campaign_id,
                        batch = batch,
                        error = %e,
                        "Batch gate check failed"
                    );
                    report.failed += 1;
                    closed.push((campaign_id, batch));
                }
            }
        }

        Ok(closed)
    }

    /// Send one message of `stage` for an invitation.
    pub async fn send(
        &self,
        invitation: &CampaignInvitation,
        stage: Stage,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome, AppError> {
        let planned = plan(invitation, Transition::Send(stage), now)?;

        let campaign = self
            .campaigns
            .find_by_id(&invitation.campaign_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Campaign not found: {}", invitation.campaign_id))
            })?;
        let event = self
            .campaigns
            .find_event(&campaign.event_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Event not found: {}", campaign.event_id)))?;
        let talent = self
            .talents
            .find_by_id(&invitation.talent_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Talent not found: {}", invitation.talent_id))
            })?;

        let _lease = self.leases.acquire(invitation.promoter_id).await;

        let last_sent = self
            .messages
            .last_sent_at_for_promoter(&invitation.promoter_id)
            .await?;
        if let Some(last) = last_sent {
            let gap = self.draw_gap().await;
            if now - last < gap {
                return Ok(SendOutcome::Skipped(SkipReason::GapNotElapsed));
            }
        }

        let lang = talent_language(talent.language.as_deref());
        let candidates = self.selector.candidates(&campaign.id, stage, &lang).await?;

        let text = {
            let mut rng = self.rng.lock().await;
            let Some(template) = choose_template(&candidates, &lang, &mut *rng) else {
                tracing::warn!(
                    invitation_id = %invitation.id,
                    campaign_id = %campaign.id,
                    stage = %stage,
                    lang = %lang,
                    "No template for language or fallback, skipping"
                );
                return Ok(SendOutcome::Skipped(SkipReason::NoTemplate));
            };
            let vars = TemplateVars::for_invitation(&talent, &event);
            render_message(&template.content, &vars, &mut *rng)
        };

        self.dispatcher.dispatch(&talent.handle, &text).await?;

        let message = self
            .invitations
            .record_send(&OutboundSend {
                invitation_id: invitation.id,
                expected_status: planned.expected_status,
                patch: planned.patch,
                message: NewCampaignMessage {
                    campaign_id: invitation.campaign_id,
                    invitation_id: invitation.id,
                    talent_id: invitation.talent_id,
                    promoter_id: invitation.promoter_id,
                    direction: MessageDirection::Sent,
                    stage: Some(stage),
                    body: text,
                    at: now,
                },
            })
            .await?;

        tracing::info!(
            invitation_id = %invitation.id,
            campaign_id = %invitation.campaign_id,
            promoter_id = %invitation.promoter_id,
            stage = %stage,
            "Message sent"
        );

        Ok(SendOutcome::Sent(message))
    }

    async fn draw_gap(&self) -> Duration {
        let min = self.settings.min_send_gap.num_seconds();
        let max = self.settings.max_send_gap.num_seconds().max(min);
        let secs = self.rng.lock().await.gen_range(min..=max);
        Duration::seconds(secs)
    }
}

fn pipeline_name(stage: Stage) -> &'static str {
    match stage {
        Stage::Invitation => "initial_send",
        Stage::Followup => "followup",
        Stage::Postevent => "thank_you",
    }
}

/// One stage of the outreach service run as a scheduler pipeline
pub struct StagePipeline<CR, TR, IR, MR, STR, D>
where
    CR: CampaignRepository,
    TR: TalentRepository,
    IR: InvitationRepository,
    MR: MessageRepository,
    STR: SpintaxTemplateRepository,
    D: MessageDispatcher,
{
    stage: Stage,
    service: Arc<OutreachService<CR, TR, IR, MR, STR, D>>,
}

impl<CR, TR, IR, MR, STR, D> StagePipeline<CR, TR, IR, MR, STR, D>
where
    CR: CampaignRepository,
    TR: TalentRepository,
    IR: InvitationRepository,
    MR: MessageRepository,
    STR: SpintaxTemplateRepository,
    D: MessageDispatcher,
{
    pub fn new(stage: Stage, service: Arc<OutreachService<CR, TR, IR, MR, STR, D>>) -> Self {
        Self { stage, service }
    }
}

#[async_trait]
impl<CR, TR, IR, MR, STR, D> Pipeline for StagePipeline<CR, TR, IR, MR, STR, D>
where
    CR: CampaignRepository + 'static,
    TR: TalentRepository + 'static,
    IR: InvitationRepository + 'static,
    MR: MessageRepository + 'static,
    STR: SpintaxTemplateRepository + 'static,
    D: MessageDispatcher + 'static,
{
    fn name(&self) -> &'static str {
        pipeline_name(self.stage)
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, AppError> {
        self.service.run_stage(self.stage, now).await
    }
}
