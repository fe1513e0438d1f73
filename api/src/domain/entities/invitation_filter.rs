//! Typed invitation filter
//!
//! Invitation queries are composed from tagged predicates instead of loose
//! optional fields. Adapters translate each predicate into their native query
//! representation. Results are always ordered by ascending invitation ID.

use chrono::{DateTime, Utc};

use super::campaign::{Campaign, CampaignId, CampaignStatus};
use super::invitation::{CampaignInvitation, InvitationId, InvitationStatus};

/// One condition an invitation must satisfy
#[derive(Debug, Clone, PartialEq)]
pub enum InvitationPredicate {
    Campaign(CampaignId),
    Batch(i32),
    StatusIn(Vec<InvitationStatus>),
    IdIn(Vec<InvitationId>),
    HasReplied(bool),
    IsSeen(bool),
    Followup(bool),
    FollowupSent(bool),
    ThankYouSent(bool),
    /// `invitation_at` is set and not later than the given instant
    InvitedAtOrBefore(DateTime<Utc>),
    /// The owning campaign has this status
    CampaignStatus(CampaignStatus),
    /// The owning campaign has a post-event trigger not later than the given instant
    PostEventTriggerReached(DateTime<Utc>),
    /// The invitation is in none of these (campaign, batch) pairs
    ExcludeBatches(Vec<(CampaignId, i32)>),
}

impl InvitationPredicate {
    /// Evaluate against an invitation and its campaign (when known).
    /// Campaign predicates never match when the campaign is missing.
    pub fn matches(&self, invitation: &CampaignInvitation, campaign: Option<&Campaign>) -> bool {
        match self {
            InvitationPredicate::Campaign(id) => invitation.campaign_id == *id,
            InvitationPredicate::Batch(batch) => invitation.batch == *batch,
            InvitationPredicate::StatusIn(statuses) => statuses.contains(&invitation.status),
            InvitationPredicate::IdIn(ids) => ids.contains(&invitation.id),
            InvitationPredicate::HasReplied(v) => invitation.has_replied == *v,
            InvitationPredicate::IsSeen(v) => invitation.is_seen == *v,
            InvitationPredicate::Followup(v) => invitation.followup == *v,
            InvitationPredicate::FollowupSent(v) => invitation.followup_sent == *v,
            InvitationPredicate::ThankYouSent(v) => invitation.thank_you_sent == *v,
            InvitationPredicate::InvitedAtOrBefore(at) => {
                invitation.invitation_at.is_some_and(|sent| sent <= *at)
            }
            InvitationPredicate::CampaignStatus(status) => {
                campaign.is_some_and(|c| c.status == *status)
            }
            InvitationPredicate::PostEventTriggerReached(at) => campaign
                .and_then(|c| c.post_event_trigger_at)
                .is_some_and(|trigger| trigger <= *at),
            InvitationPredicate::ExcludeBatches(batches) => !batches
                .contains(&(invitation.campaign_id, invitation.batch)),
        }
    }
}

/// A conjunction of predicates with an optional row limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvitationFilter {
    predicates: Vec<InvitationPredicate>,
    limit: Option<u64>,
}

impl InvitationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: InvitationPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn campaign(self, id: CampaignId) -> Self {
        self.with(InvitationPredicate::Campaign(id))
    }

    pub fn batch(self, batch: i32) -> Self {
        self.with(InvitationPredicate::Batch(batch))
    }

    pub fn status(self, status: InvitationStatus) -> Self {
        self.with(InvitationPredicate::StatusIn(vec![status]))
    }

    pub fn status_in(self, statuses: impl IntoIterator<Item = InvitationStatus>) -> Self {
        self.with(InvitationPredicate::StatusIn(statuses.into_iter().collect()))
    }

    pub fn ids(self, ids: impl IntoIterator<Item = InvitationId>) -> Self {
        self.with(InvitationPredicate::IdIn(ids.into_iter().collect()))
    }

    pub fn has_replied(self, v: bool) -> Self {
        self.with(InvitationPredicate::HasReplied(v))
    }

    pub fn is_seen(self, v: bool) -> Self {
        self.with(InvitationPredicate::IsSeen(v))
    }

    pub fn followup(self, v: bool) -> Self {
        self.with(InvitationPredicate::Followup(v))
    }

    pub fn followup_sent(self, v: bool) -> Self {
        self.with(InvitationPredicate::FollowupSent(v))
    }

    pub fn thank_you_sent(self, v: bool) -> Self {
        self.with(InvitationPredicate::ThankYouSent(v))
    }

    pub fn invited_at_or_before(self, at: DateTime<Utc>) -> Self {
        self.with(InvitationPredicate::InvitedAtOrBefore(at))
    }

    pub fn campaign_status(self, status: CampaignStatus) -> Self {
        self.with(InvitationPredicate::CampaignStatus(status))
    }

    pub fn post_event_trigger_reached(self, at: DateTime<Utc>) -> Self {
        self.with(InvitationPredicate::PostEventTriggerReached(at))
    }

    pub fn exclude_batches(self, batches: impl IntoIterator<Item = (CampaignId, i32)>) -> Self {
        self.with(InvitationPredicate::ExcludeBatches(batches.into_iter().collect()))
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn predicates(&self) -> &[InvitationPredicate] {
        &self.predicates
    }

    pub fn max_rows(&self) -> Option<u64> {
        self.limit
    }

    /// True when any predicate needs the owning campaign row
    pub fn needs_campaign(&self) -> bool {
        self.predicates.iter().any(|p| {
            matches!(
                p,
                InvitationPredicate::CampaignStatus(_)
                    | InvitationPredicate::PostEventTriggerReached(_)
            )
        })
    }

    pub fn matches(&self, invitation: &CampaignInvitation, campaign: Option<&Campaign>) -> bool {
        self.predicates
            .iter()
            .all(|p| p.matches(invitation, campaign))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{EventId, PromoterId, TalentId};
    use chrono::Duration;

    fn invitation(status: InvitationStatus) -> CampaignInvitation {
        let now = Utc::now();
        CampaignInvitation {
            id: InvitationId(7),
            campaign_id: CampaignId(1),
            talent_id: TalentId(3),
            promoter_id: PromoterId(9),
            event_id: EventId(2),
            batch: 1,
            status,
            invitation_at: None,
            followup: false,
            followup_sent: false,
            thank_you_sent: false,
            has_replied: false,
            is_seen: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn campaign(status: CampaignStatus) -> Campaign {
        Campaign {
            id: CampaignId(1),
            event_id: EventId(2),
            name: "c".to_string(),
            status,
            post_event_trigger_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = InvitationFilter::new();
        assert!(filter.matches(&invitation(InvitationStatus::Pending), None));
        assert!(!filter.needs_campaign());
    }

    #[test]
    fn predicates_are_conjunctive() {
        let filter = InvitationFilter::new()
            .campaign(CampaignId(1))
            .batch(1)
            .status(InvitationStatus::Pending);
        assert!(filter.matches(&invitation(InvitationStatus::Pending), None));
        assert!(!filter.matches(&invitation(InvitationStatus::Sent), None));

        let other_batch = InvitationFilter::new().batch(2);
        assert!(!other_batch.matches(&invitation(InvitationStatus::Pending), None));
    }

    #[test]
    fn invited_at_or_before_requires_a_timestamp() {
        let now = Utc::now();
        let filter = InvitationFilter::new().invited_at_or_before(now);

        let mut inv = invitation(InvitationStatus::Sent);
        assert!(!filter.matches(&inv, None));

        inv.invitation_at = Some(now);
        assert!(filter.matches(&inv, None));

        inv.invitation_at = Some(now + Duration::seconds(1));
        assert!(!filter.matches(&inv, None));
    }

    #[test]
    fn campaign_predicates_need_the_campaign() {
        let filter = InvitationFilter::new().campaign_status(CampaignStatus::Active);
        let inv = invitation(InvitationStatus::Pending);

        assert!(filter.needs_campaign());
        assert!(!filter.matches(&inv, None));
        assert!(filter.matches(&inv, Some(&campaign(CampaignStatus::Active))));
        assert!(!filter.matches(&inv, Some(&campaign(CampaignStatus::Draft))));
    }

    #[test]
    fn post_event_trigger_reached() {
        let now = Utc::now();
        let filter = InvitationFilter::new().post_event_trigger_reached(now);
        let inv = invitation(InvitationStatus::Attended);

        let mut c = campaign(CampaignStatus::Completed);
        assert!(!filter.matches(&inv, Some(&c)));

        c.post_event_trigger_at = Some(now - Duration::hours(1));
        assert!(filter.matches(&inv, Some(&c)));

        c.post_event_trigger_at = Some(now + Duration::hours(1));
        assert!(!filter.matches(&inv, Some(&c)));
    }

    #[test]
    fn excluded_batches_do_not_match() {
        let inv = invitation(InvitationStatus::Pending);

        let filter = InvitationFilter::new().exclude_batches([(CampaignId(1), 1)]);
        assert!(!filter.matches(&inv, None));

        let other = InvitationFilter::new().exclude_batches([(CampaignId(2), 1), (CampaignId(1), 2)]);
        assert!(other.matches(&inv, None));
        assert!(InvitationFilter::new().exclude_batches([]).matches(&inv, None));
    }

    #[test]
    fn limit_is_carried() {
        let filter = InvitationFilter::new().limit(20);
        assert_eq!(filter.max_rows(), Some(20));
        assert_eq!(InvitationFilter::new().max_rows(), None);
    }
}
