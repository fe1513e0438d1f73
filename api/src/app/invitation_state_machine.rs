//! Invitation state machine
//!
//! The only place that decides how an invitation's status and side flags
//! change. Every transition is planned here as an `InvitationPatch` and then
//! written by a repository inside its atomic operation.

use chrono::{DateTime, Utc};

use crate::domain::entities::{CampaignInvitation, InvitationPatch, InvitationStatus, Stage};
use crate::error::DomainError;

/// A requested change to an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A message of this stage was dispatched
    Send(Stage),
    /// The reply interpreter classified the talent's thread
    Interpret(InvitationStatus),
    /// Operator confirmed the talent came to the event
    MarkAttended,
    /// Operator asked for a followup message
    MarkFollowup,
}

/// Outcome of planning a transition
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTransition {
    /// Status the invitation must still have when the patch is written
    pub expected_status: InvitationStatus,
    pub patch: InvitationPatch,
}

/// Plan a transition, rejecting it when the invitation is not in a state
/// that allows it.
pub fn plan(
    invitation: &CampaignInvitation,
    transition: Transition,
    now: DateTime<Utc>,
) -> Result<PlannedTransition, DomainError> {
    let current = invitation.status;

    let patch = match transition {
        Transition::Send(Stage::Invitation) => {
            if current != InvitationStatus::Pending {
                return Err(not_allowed(invitation, "send the invitation", "pending"));
            }
            InvitationPatch {
                status: Some(InvitationStatus::Sent),
                invitation_at: Some(now),
                ..Default::default()
            }
        }
        Transition::Send(Stage::Followup) => {
            if !invitation.followup || invitation.followup_sent || invitation.invitation_at.is_none()
            {
                return Err(DomainError::PreconditionFailed(format!(
                    "Invitation {} is not awaiting a followup",
                    invitation.id
                )));
            }
            InvitationPatch {
                followup_sent: Some(true),
                ..Default::default()
            }
        }
        Transition::Send(Stage::Postevent) => {
            if current != InvitationStatus::Attended || invitation.thank_you_sent {
                return Err(DomainError::PreconditionFailed(format!(
                    "Invitation {} is not awaiting a thank-you",
                    invitation.id
                )));
            }
            InvitationPatch {
                thank_you_sent: Some(true),
                ..Default::default()
            }
        }
        Transition::Interpret(proposed) => InvitationPatch {
            status: interpreted_status(current, proposed),
            has_replied: Some(true),
            ..Default::default()
        },
        Transition::MarkAttended => {
            if !current.is_post_send() {
                return Err(not_allowed(
                    invitation,
                    "mark as attended",
                    "sent or later",
                ));
            }
            InvitationPatch {
                status: Some(InvitationStatus::Attended),
                ..Default::default()
            }
        }
        Transition::MarkFollowup => InvitationPatch {
            followup: Some(true),
            ..Default::default()
        },
    };

    Ok(PlannedTransition {
        expected_status: current,
        patch,
    })
}

/// Status an interpretation may write, or `None` to keep the current one.
///
/// Reply outcomes replace a status only after the invitation was sent, and
/// never `attended`, which only operators set and which is final. A provider
/// `pending`, `attended` or `sent` is never written.
fn interpreted_status(
    current: InvitationStatus,
    proposed: InvitationStatus,
) -> Option<InvitationStatus> {
    if !current.is_post_send() || current == InvitationStatus::Attended {
        return None;
    }

    proposed.is_reply_outcome().then_some(proposed)
}

fn not_allowed(invitation: &CampaignInvitation, action: &str, required: &str) -> DomainError {
    DomainError::Validation(format!(
        "Cannot {} for invitation {}: status is {}, must be {}",
        action, invitation.id, invitation.status, required
    ))
}
