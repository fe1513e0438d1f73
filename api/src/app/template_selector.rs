//! Spintax template selection
//!
//! Picks one template for a (campaign, stage, language) tuple. Templates in
//! the talent's language win; otherwise English; otherwise the stage is skipped.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::app::outreach_config::FALLBACK_LANGUAGE;
use crate::domain::entities::{CampaignId, SpintaxTemplate, Stage};
use crate::domain::ports::SpintaxTemplateRepository;
use crate::error::DomainError;

/// Normalize a talent language, defaulting to English
pub fn talent_language(language: Option<&str>) -> String {
    language
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string())
}

/// Choose among candidates: exact language first, English second, else `None`
pub fn choose_template<'a, R: Rng + ?Sized>(
    candidates: &'a [SpintaxTemplate],
    lang: &str,
    rng: &mut R,
) -> Option<&'a SpintaxTemplate> {
    let in_language: Vec<&SpintaxTemplate> = candidates
        .iter()
        .filter(|t| t.lang.eq_ignore_ascii_case(lang))
        .collect();

    let pool = if in_language.is_empty() {
        candidates
            .iter()
            .filter(|t| t.lang.eq_ignore_ascii_case(FALLBACK_LANGUAGE))
            .collect()
    } else {
        in_language
    };

    pool.choose(rng).copied()
}

/// Loads candidates from storage and applies `choose_template`
pub struct TemplateSelector<STR>
where
    STR: SpintaxTemplateRepository,
{
    templates: Arc<STR>,
}

impl<STR> TemplateSelector<STR>
where
    STR: SpintaxTemplateRepository,
{
    pub fn new(templates: Arc<STR>) -> Self {
        Self { templates }
    }

    /// Fetch candidates for the talent's language and English
    pub async fn candidates(
        &self,
        campaign_id: &CampaignId,
        stage: Stage,
        lang: &str,
    ) -> Result<Vec<SpintaxTemplate>, DomainError> {
        let mut langs = vec![lang.to_string()];
        if lang != FALLBACK_LANGUAGE {
            langs.push(FALLBACK_LANGUAGE.to_string());
        }

        self.templates
            .find_for_stage(campaign_id, stage, &langs)
            .await
    }
}
