//! PostgreSQL adapter for SpintaxTemplateRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::entities::{
    CampaignId, NewSpintaxTemplate, SpintaxTemplate, SpintaxTemplateId, Stage,
};
use crate::domain::ports::SpintaxTemplateRepository;
use crate::entity::campaign_spintax_templates;
use crate::error::DomainError;

/// PostgreSQL implementation of SpintaxTemplateRepository
pub struct PostgresSpintaxTemplateRepository {
    db: DatabaseConnection,
}

impl PostgresSpintaxTemplateRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SpintaxTemplateRepository for PostgresSpintaxTemplateRepository {
    async fn find_for_stage(
        &self,
        campaign_id: &CampaignId,
        stage: Stage,
        langs: &[String],
    ) -> Result<Vec<SpintaxTemplate>, DomainError> {
        if langs.is_empty() {
            return Ok(Vec::new());
        }

        let results = campaign_spintax_templates::Entity::find()
            .filter(campaign_spintax_templates::Column::CampaignId.eq(campaign_id.0))
            .filter(campaign_spintax_templates::Column::Stage.eq(stage.to_string()))
            .filter(campaign_spintax_templates::Column::Lang.is_in(langs.iter().cloned()))
            .order_by_asc(campaign_spintax_templates::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(results.into_iter().map(|m| m.into()).collect())
    }

    async fn create(&self, template: &NewSpintaxTemplate) -> Result<SpintaxTemplate, DomainError> {
        let model = campaign_spintax_templates::ActiveModel {
            campaign_id: Set(template.campaign_id.0),
            stage: Set(template.stage.to_string()),
            lang: Set(template.lang.clone()),
            content: Set(template.content.clone()),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| DomainError::Database(e.to_string()))?;

        Ok(result.into())
    }
}

impl From<campaign_spintax_templates::Model> for SpintaxTemplate {
    fn from(model: campaign_spintax_templates::Model) -> Self {
        SpintaxTemplate {
            id: SpintaxTemplateId(model.id),
            campaign_id: CampaignId(model.campaign_id),
            stage: model.stage.parse().unwrap_or(Stage::Invitation),
            lang: model.lang,
            content: model.content,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
