//! PostgreSQL adapter for TrustRepository
//!
//! The score of a pair is only ever changed by `apply` and `commit_reply`,
//! each of which appends the ledger row and bumps the score in one
//! transaction with an in-place `trust_score = trust_score + change`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::adapters::postgres::invitation_repo::apply_patch;
use crate::domain::entities::{
    EventId, MessageDirection, NewTrustScoreLog, PromoterId, TalentId, TalentPromoterState,
    TrustPair, TrustScoreLog, TrustScoreLogId,
};
use crate::domain::ports::{ReplyCommit, TrustRepository};
use crate::entity::{
    campaign_invitations, campaign_messages, talent_promoter_states, talents, trust_score_logs,
};
use crate::error::DomainError;

/// PostgreSQL implementation of TrustRepository
pub struct PostgresTrustRepository {
    db: DatabaseConnection,
}

impl PostgresTrustRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn pair_filter(pair: &TrustPair) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(talent_promoter_states::Column::TalentId.eq(pair.talent_id.0))
        .add(talent_promoter_states::Column::PromoterId.eq(pair.promoter_id.0))
}

/// Insert a zero-score state for the pair unless one exists
pub(super) async fn ensure_state<C: ConnectionTrait>(
    conn: &C,
    pair: &TrustPair,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let model = talent_promoter_states::ActiveModel {
        talent_id: Set(pair.talent_id.0),
        promoter_id: Set(pair.promoter_id.0),
        trust_score: Set(0),
        last_contacted: Set(None),
        last_reply: Set(None),
        opted_out: Set(false),
        created_at: Set(now.fixed_offset()),
        updated_at: Set(now.fixed_offset()),
    };

    let result = talent_promoter_states::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                talent_promoter_states::Column::TalentId,
                talent_promoter_states::Column::PromoterId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await;

    match result {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(DomainError::Database(e.to_string())),
    }
}

async fn load_state<C: ConnectionTrait>(
    conn: &C,
    pair: &TrustPair,
) -> Result<Option<TalentPromoterState>, DomainError> {
    let result = talent_promoter_states::Entity::find()
        .filter(pair_filter(pair))
        .one(conn)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

    Ok(result.map(|m| m.into()))
}

/// Lock the pair's state row and check `change` keeps the score in range
async fn check_score_change<C: ConnectionTrait>(
    conn: &C,
    pair: &TrustPair,
    change: i32,
) -> Result<(), DomainError> {
    let state: TalentPromoterState = talent_promoter_states::Entity::find()
        .filter(pair_filter(pair))
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?
        .ok_or_else(|| DomainError::Internal(format!("Trust state vanished for {}", pair)))?
        .into();

    match state.score_after(change) {
        Some(_) => Ok(()),
        None => Err(score_out_of_range(pair, change)),
    }
}

fn score_out_of_range(pair: &TrustPair, change: i32) -> DomainError {
    DomainError::Validation(format!(
        "Trust change {} for {} would put the score out of range",
        change, pair
    ))
}

async fn insert_log<C: ConnectionTrait>(
    conn: &C,
    entry: &NewTrustScoreLog,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let model = trust_score_logs::ActiveModel {
        id: Set(TrustScoreLogId::new().0),
        talent_id: Set(entry.talent_id.0),
        promoter_id: Set(entry.promoter_id.0),
        event_id: Set(entry.event_id.map(|id| id.0)),
        change: Set(entry.change),
        reason: Set(entry.reason.clone()),
        created_at: Set(now.fixed_offset()),
    };

    model
        .insert(conn)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

    Ok(())
}

#[async_trait]
impl TrustRepository for PostgresTrustRepository {
    async fn find_state(
        &self,
        pair: &TrustPair,
    ) -> Result<Option<TalentPromoterState>, DomainError> {
        load_state(&self.db, pair).await
    }

    async fn get_or_create_state(
        &self,
        pair: &TrustPair,
    ) -> Result<TalentPromoterState, DomainError> {
        ensure_state(&self.db, pair, Utc::now()).await?;
        load_state(&self.db, pair)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("Trust state vanished for {}", pair)))
    }

    async fn apply(&self, entry: &NewTrustScoreLog) -> Result<TalentPromoterState, DomainError> {
        let now = Utc::now();
        let pair = entry.pair();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        insert_log(&txn, entry, now).await?;
        ensure_state(&txn, &pair, now).await?;
        check_score_change(&txn, &pair, entry.change).await?;
        talent_promoter_states::Entity::update_many()
            .col_expr(
                talent_promoter_states::Column::TrustScore,
                Expr::col(talent_promoter_states::Column::TrustScore).add(entry.change),
            )
            .col_expr(
                talent_promoter_states::Column::UpdatedAt,
                Expr::value(now.fixed_offset()),
            )
            .filter(pair_filter(&pair))
            .exec(&txn)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        let state = load_state(&txn, &pair)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("Trust state vanished for {}", pair)))?;

        txn.commit()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(state)
    }

    async fn commit_reply(
        &self,
        commit: &ReplyCommit,
    ) -> Result<TalentPromoterState, DomainError> {
        let now = Utc::now();
        let pair = commit.entry.pair();
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        // Claiming the messages first serializes concurrent commits of one thread
        let claimed = campaign_messages::Entity::update_many()
            .col_expr(campaign_messages::Column::IsInterpret, Expr::value(true))
            .filter(
                campaign_messages::Column::Id.is_in(commit.message_ids.iter().map(|id| id.0)),
            )
            .filter(campaign_messages::Column::Direction.eq(MessageDirection::Received.to_string()))
            .filter(campaign_messages::Column::IsInterpret.eq(false))
            .exec(&txn)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        if claimed.rows_affected == 0 {
            return Err(DomainError::Conflict(format!(
                "Replies of invitation {} were already interpreted",
                commit.invitation_id
            )));
        }

        // Guarded like `record_send`; a status change during interpretation
        // rolls back the claim so the thread is interpreted again
        let update = campaign_invitations::Entity::update_many()
            .filter(campaign_invitations::Column::Id.eq(commit.invitation_id.0))
            .filter(campaign_invitations::Column::Status.eq(commit.expected_status.to_string()));
        let updated = apply_patch(update, &commit.patch, now)
            .exec(&txn)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        if updated.rows_affected == 0 {
            return Err(DomainError::PreconditionFailed(format!(
                "Invitation {} is missing or no longer {}",
                commit.invitation_id, commit.expected_status
            )));
        }

        if let Some(city) = &commit.talent_city {
            talents::Entity::update_many()
                .col_expr(talents::Column::CurrentCity, Expr::value(city.clone()))
                .filter(talents::Column::Id.eq(pair.talent_id.0))
                .exec(&txn)
                .await
                .map_err(|e| DomainError::Database(e.to_string()))?;
        }

        insert_log(&txn, &commit.entry, now).await?;
        ensure_state(&txn, &pair, now).await?;
        check_score_change(&txn, &pair, commit.entry.change).await?;

        let mut update = talent_promoter_states::Entity::update_many()
            .col_expr(
                talent_promoter_states::Column::TrustScore,
                Expr::col(talent_promoter_states::Column::TrustScore).add(commit.entry.change),
            )
            .col_expr(
                talent_promoter_states::Column::LastReply,
                Expr::value(commit.last_reply.fixed_offset()),
            )
            .col_expr(
                talent_promoter_states::Column::UpdatedAt,
                Expr::value(now.fixed_offset()),
            );
        // Opt-out is sticky
        if commit.opted_out {
            update = update.col_expr(talent_promoter_states::Column::OptedOut, Expr::value(true));
        }
        update
            .filter(pair_filter(&pair))
            .exec(&txn)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        let state = load_state(&txn, &pair)
            .await?
            .ok_or_else(|| DomainError::Internal(format!("Trust state vanished for {}", pair)))?;

        txn.commit()
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(state)
    }

    async fn find_states_for_promoter(
        &self,
        promoter_id: &PromoterId,
        talent_ids: &[TalentId],
    ) -> Result<Vec<TalentPromoterState>, DomainError> {
        if talent_ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = talent_promoter_states::Entity::find()
            .filter(talent_promoter_states::Column::PromoterId.eq(promoter_id.0))
            .filter(
                talent_promoter_states::Column::TalentId.is_in(talent_ids.iter().map(|id| id.0)),
            )
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_logs(&self, pair: &TrustPair) -> Result<Vec<TrustScoreLog>, DomainError> {
        let results = trust_score_logs::Entity::find()
            .filter(trust_score_logs::Column::TalentId.eq(pair.talent_id.0))
            .filter(trust_score_logs::Column::PromoterId.eq(pair.promoter_id.0))
            .order_by_asc(trust_score_logs::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn sum_changes(&self, pair: &TrustPair) -> Result<i64, DomainError> {
        let result: Option<Option<i64>> = trust_score_logs::Entity::find()
            .filter(trust_score_logs::Column::TalentId.eq(pair.talent_id.0))
            .filter(trust_score_logs::Column::PromoterId.eq(pair.promoter_id.0))
            .select_only()
            .column_as(Expr::col(trust_score_logs::Column::Change).sum(), "sum")
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.flatten().unwrap_or(0))
    }
}

impl From<talent_promoter_states::Model> for TalentPromoterState {
    fn from(model: talent_promoter_states::Model) -> Self {
        TalentPromoterState {
            talent_id: TalentId(model.talent_id),
            promoter_id: PromoterId(model.promoter_id),
            trust_score: model.trust_score,
            last_contacted: model.last_contacted.map(|dt| dt.with_timezone(&Utc)),
            last_reply: model.last_reply.map(|dt| dt.with_timezone(&Utc)),
            opted_out: model.opted_out,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<trust_score_logs::Model> for TrustScoreLog {
    fn from(model: trust_score_logs::Model) -> Self {
        TrustScoreLog {
            id: TrustScoreLogId(model.id),
            talent_id: TalentId(model.talent_id),
            promoter_id: PromoterId(model.promoter_id),
            event_id: model.event_id.map(EventId),
            change: model.change,
            reason: model.reason,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
