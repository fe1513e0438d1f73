//! PostgreSQL adapter for InvitationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr,
    TransactionTrait, UpdateMany,
};

use crate::adapters::postgres::message_repo::insert_message;
use crate::adapters::postgres::trust_repo::ensure_state;
use crate::domain::entities::{
    CampaignId, CampaignInvitation, CampaignMessage, EventId, InvitationFilter, InvitationId,
    InvitationPatch, InvitationPredicate, InvitationStatus, NewInvitation, PromoterId, TalentId,
    TrustPair,
};
use crate::domain::ports::{InvitationRepository, OutboundSend};
use crate::entity::{campaign_invitations, campaigns, talent_promoter_states};
use crate::error::DomainError;

/// PostgreSQL implementation of InvitationRepository
pub struct PostgresInvitationRepository {
    db: DatabaseConnection,
}

impl PostgresInvitationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Translate a typed filter into a SeaORM condition
fn condition(filter: &InvitationFilter) -> Condition {
    use campaign_invitations::Column;

    filter
        .predicates()
        .iter()
        .fold(Condition::all(), |cond, predicate| {
            let expr = match predicate {
                InvitationPredicate::Campaign(id) => Column::CampaignId.eq(id.0),
                InvitationPredicate::Batch(batch) => Column::Batch.eq(*batch),
                InvitationPredicate::StatusIn(statuses) => {
                    Column::Status.is_in(statuses.iter().map(|s| s.to_string()))
                }
                InvitationPredicate::IdIn(ids) => Column::Id.is_in(ids.iter().map(|id| id.0)),
                InvitationPredicate::HasReplied(v) => Column::HasReplied.eq(*v),
                InvitationPredicate::IsSeen(v) => Column::IsSeen.eq(*v),
                InvitationPredicate::Followup(v) => Column::Followup.eq(*v),
                InvitationPredicate::FollowupSent(v) => Column::FollowupSent.eq(*v),
                InvitationPredicate::ThankYouSent(v) => Column::ThankYouSent.eq(*v),
                InvitationPredicate::InvitedAtOrBefore(at) => {
                    Column::InvitationAt.lte(at.fixed_offset())
                }
                InvitationPredicate::CampaignStatus(status) => Column::CampaignId.in_subquery(
                    Query::select()
                        .column(campaigns::Column::Id)
                        .from(campaigns::Entity)
                        .and_where(campaigns::Column::Status.eq(status.to_string()))
                        .to_owned(),
                ),
                InvitationPredicate::PostEventTriggerReached(at) => Column::CampaignId.in_subquery(
                    Query::select()
                        .column(campaigns::Column::Id)
                        .from(campaigns::Entity)
                        .and_where(campaigns::Column::PostEventTriggerAt.lte(at.fixed_offset()))
                        .to_owned(),
                ),
                InvitationPredicate::ExcludeBatches(batches) => {
                    batches
                        .iter()
                        .fold(Expr::value(true), |acc, (campaign_id, batch)| {
                            acc.and(
                                Column::CampaignId
                                    .ne(campaign_id.0)
                                    .or(Column::Batch.ne(*batch)),
                            )
                        })
                }
            };
            cond.add(expr)
        })
}

fn select(filter: &InvitationFilter) -> Select<campaign_invitations::Entity> {
    campaign_invitations::Entity::find()
        .filter(condition(filter))
        .order_by_asc(campaign_invitations::Column::Id)
}

/// Add the `Some` fields of a patch to an update
pub(super) fn apply_patch(
    update: UpdateMany<campaign_invitations::Entity>,
    patch: &InvitationPatch,
    now: DateTime<Utc>,
) -> UpdateMany<campaign_invitations::Entity> {
    use campaign_invitations::Column;

    let mut update = update.col_expr(Column::UpdatedAt, Expr::value(now.fixed_offset()));
    if let Some(status) = patch.status {
        update = update.col_expr(Column::Status, Expr::value(status.to_string()));
    }
    if let Some(at) = patch.invitation_at {
        update = update.col_expr(Column::InvitationAt, Expr::value(at.fixed_offset()));
    }
    if let Some(v) = patch.followup {
        update = update.col_expr(Column::Followup, Expr::value(v));
    }
    if let Some(v) = patch.followup_sent {
        update = update.col_expr(Column::FollowupSent, Expr::value(v));
    }
    if let Some(v) = patch.thank_you_sent {
        update = update.col_expr(Column::ThankYouSent, Expr::value(v));
    }
    if let Some(v) = patch.has_replied {
        update = update.col_expr(Column::HasReplied, Expr::value(v));
    }
    update
}

fn insert_error(e: DbErr, new: &NewInvitation) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => DomainError::Conflict(format!(
            "Talent {} is already invited to campaign {}",
            new.talent_id, new.campaign_id
        )),
        _ => DomainError::Database(e.to_string()),
    }
}

#[async_trait]
impl InvitationRepository for PostgresInvitationRepository {
    async fn find_by_id(
        &self,
        id: &InvitationId,
    ) -> Result<Option<CampaignInvitation>, DomainError> {
        let result = campaign_invitations::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_campaign_and_talent(
        &self,
        campaign_id: &CampaignId,
        talent_id: &TalentId,
    ) -> Result<Option<CampaignInvitation>, DomainError> {
        let result = campaign_invitations::Entity::find()
            .filter(campaign_invitations::Column::CampaignId.eq(campaign_id.0))
            .filter(campaign_invitations::Column::TalentId.eq(talent_id.0))
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<CampaignInvitation>, DomainError> {
        let mut query = select(filter);
        if let Some(limit) = filter.max_rows() {
            query = query.limit(limit);
        }

        let results = query
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn count(&self, filter: &InvitationFilter) -> Result<u64, DomainError> {
        campaign_invitations::Entity::find()
            .filter(condition(filter))
            .count(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))
    }

    async fn find_batches(
        &self,
        filter: &InvitationFilter,
    ) -> Result<Vec<(CampaignId, i32)>, DomainError> {
        use campaign_invitations::Column;

        let rows: Vec<(i64, i32)> = campaign_invitations::Entity::find()
            .filter(condition(filter))
            .select_only()
            .column(Column::CampaignId)
            .column(Column::Batch)
            .distinct()
            .order_by_asc(Column::CampaignId)
            .order_by_asc(Column::Batch)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(campaign_id, batch)| (CampaignId(campaign_id), batch))
            .collect())
    }

    async fn latest_invitation_at(
        &self,
        campaign_id: &CampaignId,
        batch: i32,
    ) -> Result<Option<DateTime<Utc>>, DomainError> {
        let latest: Option<Option<sea_orm::prelude::DateTimeWithTimeZone>> =
            campaign_invitations::Entity::find()
                .filter(campaign_invitations::Column::CampaignId.eq(campaign_id.0))
                .filter(campaign_invitations::Column::Batch.eq(batch))
                .select_only()
                .column_as(
                    Expr::col(campaign_invitations::Column::InvitationAt).max(),
                    "latest",
                )
                .into_tuple()
                .one(&self.db)
                .await
                .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(latest.flatten().map(|dt| dt.with_timezone(&Utc)))
    }

    async fn create_many(
        &self,
        invitations: &[NewInvitation],
    ) -> Result<Vec<CampaignInvitation>, DomainError> {
        let now = Utc::now().fixed_offset();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        let mut created = Vec::with_capacity(invitations.len());
        for new in invitations {
            let model = campaign_invitations::ActiveModel {
                campaign_id: Set(new.campaign_id.0),
                talent_id: Set(new.talent_id.0),
                promoter_id: Set(new.promoter_id.0),
                event_id: Set(new.event_id.0),
                batch: Set(new.batch),
                status: Set(InvitationStatus::Pending.to_string()),
                invitation_at: Set(None),
                followup: Set(false),
                followup_sent: Set(false),
                thank_you_sent: Set(false),
                has_replied: Set(false),
                is_seen: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };

            let result = model
                .insert(&txn)
                .await
                .map_err(|e| insert_error(e, new))?;
            created.push(result.into());
        }

        txn.commit()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(created)
    }

    async fn update_many(
        &self,
        filter: &InvitationFilter,
        patch: &InvitationPatch,
    ) -> Result<u64, DomainError> {
        if patch.is_empty() {
            return Ok(0);
        }

        let update = campaign_invitations::Entity::update_many().filter(condition(filter));
        let result = apply_patch(update, patch, Utc::now())
            .exec(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    async fn delete(&self, id: &InvitationId) -> Result<(), DomainError> {
        let result = campaign_invitations::Entity::delete_by_id(id.0)
            .exec(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound(format!("Invitation not found: {}", id)));
        }
        Ok(())
    }

    async fn record_send(&self, send: &OutboundSend) -> Result<CampaignMessage, DomainError> {
        let at = send.message.at;
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        let update = campaign_invitations::Entity::update_many()
            .filter(campaign_invitations::Column::Id.eq(send.invitation_id.0))
            .filter(campaign_invitations::Column::Status.eq(send.expected_status.to_string()));
        let updated = apply_patch(update, &send.patch, at)
            .exec(&txn)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        if updated.rows_affected == 0 {
            // Dropping the transaction rolls it back
            return Err(DomainError::Conflict(format!(
                "Invitation {} is missing or no longer {}",
                send.invitation_id, send.expected_status
            )));
        }

        let message = insert_message(&txn, &send.message).await?;

        let pair = TrustPair::new(send.message.talent_id, send.message.promoter_id);
        ensure_state(&txn, &pair, at).await?;
        talent_promoter_states::Entity::update_many()
            .col_expr(
                talent_promoter_states::Column::LastContacted,
                Expr::value(at.fixed_offset()),
            )
            .col_expr(
                talent_promoter_states::Column::UpdatedAt,
                Expr::value(at.fixed_offset()),
            )
            .filter(talent_promoter_states::Column::TalentId.eq(pair.talent_id.0))
            .filter(talent_promoter_states::Column::PromoterId.eq(pair.promoter_id.0))
            .exec(&txn)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(message)
    }
}

/// Convert SeaORM model to domain entity
impl From<campaign_invitations::Model> for CampaignInvitation {
    fn from(model: campaign_invitations::Model) -> Self {
        CampaignInvitation {
            id: InvitationId(model.id),
            campaign_id: CampaignId(model.campaign_id),
            talent_id: TalentId(model.talent_id),
            promoter_id: PromoterId(model.promoter_id),
            event_id: EventId(model.event_id),
            batch: model.batch,
            status: model.status.parse().unwrap_or(InvitationStatus::Pending),
            invitation_at: model.invitation_at.map(|dt| dt.with_timezone(&Utc)),
            followup: model.followup,
            followup_sent: model.followup_sent,
            thank_you_sent: model.thank_you_sent,
            has_replied: model.has_replied,
            is_seen: model.is_seen,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
