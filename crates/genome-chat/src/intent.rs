//! Intent routing for chat turns.
//!
//! A message is first checked against fixed keyword phrases. When no
//! phrase matches (and the strategy allows it) the provider is asked to
//! pick a label. A keyword hit always wins and skips the provider call.

use std::sync::{Arc, LazyLock};

use genome_core::IntentStrategy;
use genome_llm::{with_deadline, CompletionProvider, ProviderError, TextParams};
use genome_prompts::{fields, render, ContextFields, TemplateId};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ContentPost,
    ImageAsset,
    CompetitorList,
    AudiencePersonas,
    EngagementPrediction,
    WeeklyPlan,
    CampaignPlan,
    FreeformReply,
}

/// Which provider endpoint a routed intent needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionMode {
    Text,
    Image,
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::ContentPost,
        Intent::ImageAsset,
        Intent::CompetitorList,
        Intent::AudiencePersonas,
        Intent::EngagementPrediction,
        Intent::WeeklyPlan,
        Intent::CampaignPlan,
        Intent::FreeformReply,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Intent::ContentPost => "content_post",
            Intent::ImageAsset => "image_asset",
            Intent::CompetitorList => "competitor_list",
            Intent::AudiencePersonas => "audience_personas",
            Intent::EngagementPrediction => "engagement_prediction",
            Intent::WeeklyPlan => "weekly_plan",
            Intent::CampaignPlan => "campaign_plan",
            Intent::FreeformReply => "freeform_reply",
        }
    }

    /// Parse a classifier answer. Tolerates surrounding whitespace, case
    /// and trailing punctuation.
    #[must_use]
    pub fn from_label(raw: &str) -> Option<Self> {
        let label = raw
            .trim()
            .trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .to_lowercase();
        Self::ALL.into_iter().find(|i| i.label() == label)
    }

    /// Template and provider endpoint bound to this intent.
    #[must_use]
    pub fn route(self) -> (TemplateId, CompletionMode) {
        match self {
            Intent::ContentPost => (TemplateId::ContentPost, CompletionMode::Text),
            Intent::ImageAsset => (TemplateId::ImageAsset, CompletionMode::Image),
            Intent::CompetitorList => (TemplateId::CompetitorList, CompletionMode::Text),
            Intent::AudiencePersonas => (TemplateId::AudiencePersonas, CompletionMode::Text),
            Intent::EngagementPrediction => {
                (TemplateId::EngagementPrediction, CompletionMode::Text)
            }
            Intent::WeeklyPlan => (TemplateId::WeeklyPlan, CompletionMode::Text),
            Intent::CampaignPlan => (TemplateId::CampaignPlan, CompletionMode::Text),
            Intent::FreeformReply => (TemplateId::FreeformReply, CompletionMode::Text),
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

const IMAGE_PHRASES: &[&str] = &[
    "create a image",
    "create an image",
    "generate a image",
    "generate an image",
    "generate image",
    "make image",
    "make a image",
    "make an image",
    "create a photo",
    "create photo",
    "generate a photo",
    "generate photo",
    "make photo",
    "design a post",
    "design post",
    "create visual",
    "generate visual",
    "make a post photo",
    "create post image",
    "image of",
    "photo of",
    "image about",
    "photo about",
    "picture of",
    "picture about",
    "graphic about",
    "graphic of",
    "design about",
];

const CONTENT_PHRASES: &[&str] = &[
    "generate post",
    "create caption",
    "write post",
    "generate content",
    "create content",
    "instagram post",
    "caption",
];

const COMPETITOR_PHRASES: &[&str] = &["competitor", "competition", "rival"];
const PREDICTION_PHRASES: &[&str] = &["predict", "forecast", "what if", "scenario"];
const PERSONA_PHRASES: &[&str] = &["persona", "audience segment", "who is"];
const WEEKLY_PHRASES: &[&str] = &[
    "weekly strategy",
    "weekly plan",
    "week-long",
    "7-day",
    "content calendar",
    "this week",
];
const CAMPAIGN_PHRASES: &[&str] = &["campaign", "strategy", "strategies", "plan"];

/// Ordered keyword table; the first group with a matching phrase wins.
/// Image phrases come first so "design a post" is not read as a post.
const KEYWORD_TABLE: [(Intent, &[&str]); 7] = [
    (Intent::ImageAsset, IMAGE_PHRASES),
    (Intent::ContentPost, CONTENT_PHRASES),
    (Intent::CompetitorList, COMPETITOR_PHRASES),
    (Intent::EngagementPrediction, PREDICTION_PHRASES),
    (Intent::AudiencePersonas, PERSONA_PHRASES),
    (Intent::WeeklyPlan, WEEKLY_PHRASES),
    (Intent::CampaignPlan, CAMPAIGN_PHRASES),
];

/// Asking for the full genome report from inside a chat.
const REPORT_PHRASES: &[&str] = &[
    "generate report",
    "send report",
    "create report",
    "email report",
    "generate my report",
    "send me the report",
    "send the report",
    "email me the report",
];

/// Whole-word match for any of `phrases`, allowing common inflections so
/// "competitors" hits "competitor" while "plant" does not hit "plan".
fn phrase_pattern(phrases: &[&str]) -> Regex {
    let alternatives: Vec<String> = phrases.iter().map(|p| regex::escape(p)).collect();
    Regex::new(&format!(
        r"\b(?:{})(?:s|es|ed|ing|ion|ions)?\b",
        alternatives.join("|")
    ))
    .expect("valid keyword pattern")
}

static KEYWORD_PATTERNS: LazyLock<Vec<(Intent, Regex)>> = LazyLock::new(|| {
    KEYWORD_TABLE
        .iter()
        .map(|(intent, phrases)| (*intent, phrase_pattern(phrases)))
        .collect()
});

static REPORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| phrase_pattern(REPORT_PHRASES));

/// Rule-based pre-filter. `None` means no explicit phrase was found.
#[must_use]
pub fn match_keywords(text: &str) -> Option<Intent> {
    let lower = text.to_lowercase();
    KEYWORD_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(&lower))
        .map(|(intent, _)| *intent)
}

/// True when the message asks for the emailed genome report.
#[must_use]
pub fn wants_report(text: &str) -> bool {
    REPORT_PATTERN.is_match(&text.to_lowercase())
}

/// How a turn's intent was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedBy {
    Keyword,
    Model,
    /// Neither keywords nor the model produced a usable answer.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    pub by: ClassifiedBy,
}

impl Classification {
    fn new(intent: Intent, by: ClassifiedBy) -> Self {
        Self { intent, by }
    }

    fn fallback() -> Self {
        Self::new(Intent::FreeformReply, ClassifiedBy::Fallback)
    }
}

pub struct IntentClassifier {
    provider: Arc<dyn CompletionProvider>,
    strategy: IntentStrategy,
    params: TextParams,
}

impl IntentClassifier {
    #[must_use]
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        strategy: IntentStrategy,
        params: TextParams,
    ) -> Self {
        Self {
            provider,
            strategy,
            params,
        }
    }

    #[must_use]
    pub fn strategy(&self) -> IntentStrategy {
        self.strategy
    }

    /// Decide the intent for `text`.
    ///
    /// Provider failures fall back to [`Intent::FreeformReply`]; only an
    /// authentication failure is returned, since the turn that follows
    /// would fail the same way.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Provider`] for an authentication failure.
    pub async fn classify(&self, text: &str) -> Result<Classification, SessionError> {
        if self.strategy != IntentStrategy::Model {
            if let Some(intent) = match_keywords(text) {
                return Ok(Classification::new(intent, ClassifiedBy::Keyword));
            }
            if self.strategy == IntentStrategy::Keywords {
                return Ok(Classification::fallback());
            }
        }
        self.ask_model(text).await
    }

    async fn ask_model(&self, text: &str) -> Result<Classification, SessionError> {
        let prompt = render(
            TemplateId::IntentClassifier,
            &ContextFields::new().with(fields::REQUEST, text),
        )?;

        match with_deadline(
            self.params.timeout,
            self.provider.complete_text(&prompt, &self.params),
        )
        .await
        {
            Ok(answer) => match Intent::from_label(&answer) {
                Some(intent) => Ok(Classification::new(intent, ClassifiedBy::Model)),
                None => {
                    tracing::debug!(answer = %answer.trim(), "classifier returned an unknown label");
                    Ok(Classification::fallback())
                }
            },
            Err(e @ ProviderError::Auth(_)) => Err(SessionError::Provider(e)),
            Err(e) => {
                tracing::warn!(error = %e, "intent classification failed, using freeform reply");
                Ok(Classification::fallback())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use genome_prompts::INTENT_LABELS;

    use super::*;

    #[test]
    fn image_phrases_route_to_image() {
        assert_eq!(
            match_keywords("create an image of a logo"),
            Some(Intent::ImageAsset)
        );
        assert_eq!(
            match_keywords("Can you design a post for our launch?"),
            Some(Intent::ImageAsset)
        );
    }

    #[test]
    fn keyword_groups_are_checked_in_order() {
        assert_eq!(
            match_keywords("write post about our competitors"),
            Some(Intent::ContentPost)
        );
        assert_eq!(
            match_keywords("who are our main rivals?"),
            Some(Intent::CompetitorList)
        );
        assert_eq!(
            match_keywords("forecast engagement for a reel"),
            Some(Intent::EngagementPrediction)
        );
        assert_eq!(
            match_keywords("build audience personas"),
            Some(Intent::AudiencePersonas)
        );
        assert_eq!(
            match_keywords("give me a weekly plan"),
            Some(Intent::WeeklyPlan)
        );
        assert_eq!(
            match_keywords("plan a summer campaign"),
            Some(Intent::CampaignPlan)
        );
        assert_eq!(match_keywords("we sell plant-based snacks, any tips?"), None);
        assert_eq!(match_keywords("tips for our arrival at the expo"), None);
        assert_eq!(
            match_keywords("what predictions do you have for reels?"),
            Some(Intent::EngagementPrediction)
        );
    }

    #[test]
    fn report_requests_are_detected() {
        assert!(wants_report("Please send report to me"));
        assert!(wants_report("can you GENERATE REPORT for us?"));
        assert!(wants_report("email me the report when it's ready"));
        assert!(!wants_report("how did last month's reporting go?"));
        assert!(!wants_report("write post about our launch"));
    }

    #[test]
    fn plain_questions_have_no_keyword() {
        assert_eq!(match_keywords("how do I grow on tiktok?"), None);
    }

    #[test]
    fn labels_match_the_classifier_template() {
        let labels: Vec<&str> = Intent::ALL.iter().map(|i| i.label()).collect();
        assert_eq!(labels, INTENT_LABELS);
    }

    #[test]
    fn from_label_tolerates_noise() {
        assert_eq!(Intent::from_label(" Weekly_Plan.\n"), Some(Intent::WeeklyPlan));
        assert_eq!(Intent::from_label("`image_asset`"), Some(Intent::ImageAsset));
        assert_eq!(Intent::from_label("something else"), None);
    }

    #[test]
    fn only_image_intent_uses_image_endpoint() {
        for intent in Intent::ALL {
            let (template, mode) = intent.route();
            assert_eq!(mode == CompletionMode::Image, intent == Intent::ImageAsset);
            assert_eq!(template.as_str(), intent.label());
        }
    }
}
