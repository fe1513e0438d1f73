//! PostgreSQL adapter for MessageRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::entities::{
    CampaignId, CampaignMessage, InvitationId, MessageDirection, MessageId, NewCampaignMessage,
    PromoterId, TalentId,
};
use crate::domain::ports::MessageRepository;
use crate::entity::campaign_messages;
use crate::error::DomainError;

/// PostgreSQL implementation of MessageRepository
pub struct PostgresMessageRepository {
    db: DatabaseConnection,
}

impl PostgresMessageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Insert a message on any connection, including an open transaction
pub(super) async fn insert_message<C: ConnectionTrait>(
    conn: &C,
    message: &NewCampaignMessage,
) -> Result<CampaignMessage, DomainError> {
    let at = message.at.fixed_offset();
    let (sent_at, received_at) = match message.direction {
        MessageDirection::Sent => (Some(at), None),
        MessageDirection::Received => (None, Some(at)),
    };

    let model = campaign_messages::ActiveModel {
        id: Set(MessageId::new().0),
        campaign_id: Set(message.campaign_id.0),
        invitation_id: Set(message.invitation_id.0),
        talent_id: Set(message.talent_id.0),
        promoter_id: Set(message.promoter_id.0),
        direction: Set(message.direction.to_string()),
        stage: Set(message.stage.map(|s| s.to_string())),
        body: Set(message.body.clone()),
        sent_at: Set(sent_at),
        received_at: Set(received_at),
        is_interpret: Set(false),
        is_score_analyzed: Set(false),
        created_at: Set(Utc::now().fixed_offset()),
    };

    let result = model
        .insert(conn)
        .await
        .map_err(|e| DomainError::Database(e.to_string()))?;

    Ok(result.into())
}

#[async_trait]
impl MessageRepository for PostgresMessageRepository {
    async fn create(&self, message: &NewCampaignMessage) -> Result<CampaignMessage, DomainError> {
        insert_message(&self.db, message).await
    }

    async fn find_uninterpreted_received(&self) -> Result<Vec<CampaignMessage>, DomainError> {
        let results = campaign_messages::Entity::find()
            .filter(campaign_messages::Column::Direction.eq(MessageDirection::Received.to_string()))
            .filter(campaign_messages::Column::IsInterpret.eq(false))
            .order_by_asc(campaign_messages::Column::ReceivedAt)
            .order_by_asc(campaign_messages::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_received_thread(
        &self,
        invitation_id: &InvitationId,
    ) -> Result<Vec<CampaignMessage>, DomainError> {
        let results = campaign_messages::Entity::find()
            .filter(campaign_messages::Column::InvitationId.eq(invitation_id.0))
            .filter(campaign_messages::Column::Direction.eq(MessageDirection::Received.to_string()))
            .order_by_asc(campaign_messages::Column::ReceivedAt)
            .order_by_asc(campaign_messages::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_by_campaign(
        &self,
        campaign_id: &CampaignId,
    ) -> Result<Vec<CampaignMessage>, DomainError> {
        let results = campaign_messages::Entity::find()
            .filter(campaign_messages::Column::CampaignId.eq(campaign_id.0))
            .order_by_asc(campaign_messages::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn last_sent_at_for_promoter(
        &self,
        promoter_id: &PromoterId,
    ) -> Result<Option<DateTime<Utc>>, DomainError> {
        let latest: Option<Option<DateTimeWithTimeZone>> = campaign_messages::Entity::find()
            .filter(campaign_messages::Column::PromoterId.eq(promoter_id.0))
            .filter(campaign_messages::Column::Direction.eq(MessageDirection::Sent.to_string()))
            .select_only()
            .column_as(Expr::col(campaign_messages::Column::SentAt).max(), "latest")
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(latest.flatten().map(|dt| dt.with_timezone(&Utc)))
    }
}

/// Convert SeaORM model to domain entity
impl From<campaign_messages::Model> for CampaignMessage {
    fn from(model: campaign_messages::Model) -> Self {
        CampaignMessage {
            id: MessageId(model.id),
            campaign_id: CampaignId(model.campaign_id),
            invitation_id: InvitationId(model.invitation_id),
            talent_id: TalentId(model.talent_id),
            promoter_id: PromoterId(model.promoter_id),
            direction: model
                .direction
                .parse()
                .unwrap_or(MessageDirection::Received),
            stage: model.stage.and_then(|s| s.parse().ok()),
            body: model.body,
            sent_at: model.sent_at.map(|dt| dt.with_timezone(&Utc)),
            received_at: model.received_at.map(|dt| dt.with_timezone(&Utc)),
            is_interpret: model.is_interpret,
            is_score_analyzed: model.is_score_analyzed,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
