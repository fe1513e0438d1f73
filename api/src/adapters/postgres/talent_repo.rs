//! PostgreSQL adapter for TalentRepository

use async_trait::async_trait;
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::entities::{CampaignId, Talent, TalentId};
use crate::domain::ports::TalentRepository;
use crate::entity::{campaign_invitations, talents};
use crate::error::DomainError;

/// PostgreSQL implementation of TalentRepository
pub struct PostgresTalentRepository {
    db: DatabaseConnection,
}

impl PostgresTalentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TalentRepository for PostgresTalentRepository {
    async fn find_by_id(&self, id: &TalentId) -> Result<Option<Talent>, DomainError> {
        let result = talents::Entity::find_by_id(id.0)
            .one(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.map(|m| m.into()))
    }

    async fn find_by_ids(&self, ids: &[TalentId]) -> Result<Vec<Talent>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = talents::Entity::find()
            .filter(talents::Column::Id.is_in(ids.iter().map(|id| id.0)))
            .order_by_asc(talents::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn find_uninvited(&self, campaign_id: &CampaignId) -> Result<Vec<Talent>, DomainError> {
        let results = talents::Entity::find()
            .filter(
                talents::Column::Id.not_in_subquery(
                    Query::select()
                        .column(campaign_invitations::Column::TalentId)
                        .from(campaign_invitations::Entity)
                        .and_where(campaign_invitations::Column::CampaignId.eq(campaign_id.0))
                        .to_owned(),
                ),
            )
            .order_by_asc(talents::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }
}

impl From<talents::Model> for Talent {
    fn from(model: talents::Model) -> Self {
        Talent {
            id: TalentId(model.id),
            name: model.name,
            handle: model.handle,
            language: model.language,
            current_city: model.current_city,
        }
    }
}
