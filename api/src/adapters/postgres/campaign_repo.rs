//! PostgreSQL adapter for CampaignRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::domain::entities::{Campaign, CampaignId, CampaignStatus, Event, EventId, PromoterId};
use crate::domain::ports::CampaignRepository;
use crate::entity::{campaigns, events};
use crate::error::DomainError;

/// PostgreSQL implementation of CampaignRepository
pub struct PostgresCampaignRepository {
    db: DatabaseConnection,
}

impl PostgresCampaignRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CampaignRepository for PostgresCampaignRepository {
    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>, DomainError> {
        let result = campaigns::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_event(&self, id: &EventId) -> Result<Option<Event>, DomainError> {
        let result = events::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }
}

impl From<campaigns::Model> for Campaign {
    fn from(model: campaigns::Model) -> Self {
        Campaign {
            id: CampaignId(model.id),
            event_id: EventId(model.event_id),
            name: model.name,
            // An unreadable status must never make a campaign eligible for sending
            status: model.status.parse().unwrap_or(CampaignStatus::Archived),
            post_event_trigger_at: model.post_event_trigger_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<events::Model> for Event {
    fn from(model: events::Model) -> Self {
        Event {
            id: EventId(model.id),
            promoter_id: PromoterId(model.promoter_id),
            name: model.name,
            event_type: model.event_type,
            city: model.city,
            starts_at: model.starts_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}
