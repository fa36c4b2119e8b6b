use std::str::FromStr;

use genome_core::FacetKind;
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// Every prompt the system knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    BrandDna,
    CompetitorMap,
    GrowthRoadmap,
    ContentBlueprint,
    AssistantPersona,
    ContentPost,
    ImageAsset,
    CompetitorList,
    AudiencePersonas,
    EngagementPrediction,
    WeeklyPlan,
    CampaignPlan,
    FreeformReply,
    IntentClassifier,
}

/// Sampling defaults a template is tuned for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationDefaults {
    pub temperature: f32,
    pub max_tokens: u32,
    pub json_response: bool,
}

impl GenerationDefaults {
    const fn new(temperature: f32, max_tokens: u32, json_response: bool) -> Self {
        Self {
            temperature,
            max_tokens,
            json_response,
        }
    }
}

impl TemplateId {
    pub const ALL: [TemplateId; 14] = [
        TemplateId::BrandDna,
        TemplateId::CompetitorMap,
        TemplateId::GrowthRoadmap,
        TemplateId::ContentBlueprint,
        TemplateId::AssistantPersona,
        TemplateId::ContentPost,
        TemplateId::ImageAsset,
        TemplateId::CompetitorList,
        TemplateId::AudiencePersonas,
        TemplateId::EngagementPrediction,
        TemplateId::WeeklyPlan,
        TemplateId::CampaignPlan,
        TemplateId::FreeformReply,
        TemplateId::IntentClassifier,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateId::BrandDna => "brand_dna",
            TemplateId::CompetitorMap => "competitor_map",
            TemplateId::GrowthRoadmap => "growth_roadmap",
            TemplateId::ContentBlueprint => "content_blueprint",
            TemplateId::AssistantPersona => "assistant_persona",
            TemplateId::ContentPost => "content_post",
            TemplateId::ImageAsset => "image_asset",
            TemplateId::CompetitorList => "competitor_list",
            TemplateId::AudiencePersonas => "audience_personas",
            TemplateId::EngagementPrediction => "engagement_prediction",
            TemplateId::WeeklyPlan => "weekly_plan",
            TemplateId::CampaignPlan => "campaign_plan",
            TemplateId::FreeformReply => "freeform_reply",
            TemplateId::IntentClassifier => "intent_classifier",
        }
    }

    /// The template that produces a given report facet.
    #[must_use]
    pub fn for_facet(kind: FacetKind) -> Self {
        match kind {
            FacetKind::BrandDna => TemplateId::BrandDna,
            FacetKind::CompetitorMap => TemplateId::CompetitorMap,
            FacetKind::GrowthRoadmap => TemplateId::GrowthRoadmap,
            FacetKind::ContentBlueprint => TemplateId::ContentBlueprint,
        }
    }

    /// Text-completion defaults, or `None` for image prompts.
    #[must_use]
    pub fn defaults(self) -> Option<GenerationDefaults> {
        let defaults = match self {
            TemplateId::BrandDna | TemplateId::GrowthRoadmap => {
                GenerationDefaults::new(0.7, 2000, true)
            }
            TemplateId::CompetitorMap => GenerationDefaults::new(0.8, 1500, true),
            TemplateId::ContentBlueprint => GenerationDefaults::new(0.8, 2000, true),
            TemplateId::AssistantPersona | TemplateId::FreeformReply => {
                GenerationDefaults::new(0.7, 1500, false)
            }
            TemplateId::ContentPost => GenerationDefaults::new(0.8, 2000, false),
            TemplateId::CompetitorList | TemplateId::AudiencePersonas => {
                GenerationDefaults::new(0.7, 2000, false)
            }
            TemplateId::EngagementPrediction => GenerationDefaults::new(0.6, 1000, false),
            TemplateId::WeeklyPlan | TemplateId::CampaignPlan => {
                GenerationDefaults::new(0.7, 2500, false)
            }
            TemplateId::IntentClassifier => GenerationDefaults::new(0.0, 10, false),
            TemplateId::ImageAsset => return None,
        };
        Some(defaults)
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| TemplateError::UnknownTemplate(s.to_string()))
    }
}
