//! Reply processing
//!
//! Each tick collects received messages not yet interpreted, groups them by
//! invitation and interprets every invitation's whole reply thread once. A
//! successful interpretation is committed through the trust ledger as one
//! atomic write; a failed one leaves everything untouched for the next tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::app::invitation_state_machine::{plan, Transition};
use crate::app::outreach_config::PERMANENT_REJECTION_REASON;
use crate::app::reply_interpreter::{ReplyInterpreter, ReplyThread};
use crate::app::scheduler::{Pipeline, TickReport};
use crate::app::trust_ledger_service::{TrustChange, TrustLedgerService};
use crate::domain::entities::{CampaignMessage, InvitationId, MessageId, NewTrustScoreLog};
use crate::domain::ports::{
    CompletionClient, InvitationRepository, MessageRepository, ReplyCommit, TrustRepository,
};
use crate::error::{AppError, DomainError};

/// What happened to one invitation's pending replies
#[derive(Debug, Clone)]
pub enum ReplyOutcome {
    Applied(TrustChange),
    /// Another worker consumed the replies first
    AlreadyProcessed,
    /// The invitation changed status while the thread was interpreted; the
    /// replies stay queued for the next tick
    StatusChanged,
}

pub struct ReplyProcessingService<IR, MR, TR, LC>
where
    IR: InvitationRepository,
    MR: MessageRepository,
    TR: TrustRepository,
    LC: CompletionClient,
{
    invitations: Arc<IR>,
    messages: Arc<MR>,
    ledger: Arc<TrustLedgerService<TR>>,
    interpreter: ReplyInterpreter<LC>,
}

impl<IR, MR, TR, LC> ReplyProcessingService<IR, MR, TR, LC>
where
    IR: InvitationRepository,
    MR: MessageRepository,
    TR: TrustRepository,
    LC: CompletionClient,
{
    pub fn new(
        invitations: Arc<IR>,
        messages: Arc<MR>,
        ledger: Arc<TrustLedgerService<TR>>,
        llm: Arc<LC>,
    ) -> Self {
        Self {
            invitations,
            messages,
            ledger,
            interpreter: ReplyInterpreter::new(llm),
        }
    }

    /// Interpret every invitation that has uninterpreted replies
    pub async fn run(&self, now: DateTime<Utc>) -> Result<TickReport, AppError> {
        let pending = self.messages.find_uninterpreted_received().await?;

        let mut by_invitation: BTreeMap<InvitationId, Vec<MessageId>> = BTreeMap::new();
        for message in pending {
            by_invitation
                .entry(message.invitation_id)
                .or_default()
                .push(message.id);
        }

        let mut report = TickReport::new("replies");
        report.selected = by_invitation.len();

        for (invitation_id, message_ids) in by_invitation {
            match self.process(invitation_id, message_ids, now).await {
                Ok(ReplyOutcome::Applied(_)) => report.sent += 1,
                Ok(ReplyOutcome::AlreadyProcessed | ReplyOutcome::StatusChanged) => {
                    report.skipped += 1
                }
                Err(e) => {
                    tracing::warn!(
                        invitation_id = %invitation_id,
                        error = %e,
                        "Reply interpretation failed, will retry next tick"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Interpret one invitation's thread and commit the result
    pub async fn process(
        &self,
        invitation_id: InvitationId,
        message_ids: Vec<MessageId>,
        now: DateTime<Utc>,
    ) -> Result<ReplyOutcome, AppError> {
        let invitation = self
            .invitations
            .find_by_id(&invitation_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Invitation not found: {}", invitation_id))
            })?;

        let thread = self.messages.find_received_thread(&invitation_id).await?;
        let last_reply = thread
            .iter()
            .map(CampaignMessage::occurred_at)
            .max()
            .unwrap_or(now);

        let interpretation = self
            .interpreter
            .interpret(&ReplyThread {
                invitation_id,
                messages: thread.into_iter().map(|m| m.body).collect(),
            })
            .await?;

        let planned = plan(&invitation, Transition::Interpret(interpretation.status), now)?;

        let commit = ReplyCommit {
            invitation_id,
            expected_status: planned.expected_status,
            patch: planned.patch,
            entry: NewTrustScoreLog {
                talent_id: invitation.talent_id,
                promoter_id: invitation.promoter_id,
                event_id: Some(invitation.event_id),
                change: interpretation.score,
                reason: interpretation.score_reason.clone(),
            },
            last_reply,
            opted_out: interpretation.score_reason == PERMANENT_REJECTION_REASON,
            talent_city: interpretation.current_location.clone(),
            message_ids,
        };

        match self.ledger.record_reply(&commit).await {
            Ok(change) => {
                tracing::info!(
                    invitation_id = %invitation_id,
                    campaign_id = %invitation.campaign_id,
                    promoter_id = %invitation.promoter_id,
                    status = %interpretation.status,
                    score = interpretation.score,
                    reason = %interpretation.score_reason,
                    "Reply interpreted"
                );
                Ok(ReplyOutcome::Applied(change))
            }
            Err(AppError::Domain(DomainError::Conflict(_))) => {
                tracing::debug!(invitation_id = %invitation_id, "Replies already interpreted");
                Ok(ReplyOutcome::AlreadyProcessed)
            }
            Err(AppError::Domain(DomainError::PreconditionFailed(_))) => {
                tracing::debug!(
                    invitation_id = %invitation_id,
                    "Invitation changed during interpretation, retrying next tick"
                );
                Ok(ReplyOutcome::StatusChanged)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<IR, MR, TR, LC> Pipeline for ReplyProcessingService<IR, MR, TR, LC>
where
    IR: InvitationRepository + 'static,
    MR: MessageRepository + 'static,
    TR: TrustRepository + 'static,
    LC: CompletionClient + 'static,
{
    fn name(&self) -> &'static str {
        "replies"
    }

    async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, AppError> {
        self.run(now).await
    }
}
