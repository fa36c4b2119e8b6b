use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::brand::BrandContext;

/// One named sub-analysis of a brand report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    BrandDna,
    CompetitorMap,
    GrowthRoadmap,
    ContentBlueprint,
}

impl FacetKind {
    /// Every facet a complete report must carry, in report order.
    pub const ALL: [FacetKind; 4] = [
        FacetKind::BrandDna,
        FacetKind::CompetitorMap,
        FacetKind::GrowthRoadmap,
        FacetKind::ContentBlueprint,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FacetKind::BrandDna => "brand_dna",
            FacetKind::CompetitorMap => "competitor_map",
            FacetKind::GrowthRoadmap => "growth_roadmap",
            FacetKind::ContentBlueprint => "content_blueprint",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            FacetKind::BrandDna => "Brand DNA",
            FacetKind::CompetitorMap => "Competitor Map",
            FacetKind::GrowthRoadmap => "90-Day Growth Roadmap",
            FacetKind::ContentBlueprint => "Content Blueprint",
        }
    }
}

impl std::fmt::Display for FacetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a facet has no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Auth,
    RateLimit,
    Timeout,
    MalformedResponse,
    InvalidRequest,
    Transport,
    /// The pipeline never produced this facet (e.g. the run was cut short).
    NotComputed,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Auth => "auth",
            FailureKind::RateLimit => "rate_limit",
            FailureKind::Timeout => "timeout",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::Transport => "transport",
            FailureKind::NotComputed => "not_computed",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Provider text that could not be parsed, kept for inspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FacetOutcome {
    Populated {
        raw_response: String,
        structured: serde_json::Value,
    },
    Failed(FacetFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFacet {
    pub kind: FacetKind,
    pub template_id: String,
    pub outcome: FacetOutcome,
}

impl AnalysisFacet {
    #[must_use]
    pub fn populated(
        kind: FacetKind,
        template_id: impl Into<String>,
        raw_response: String,
        structured: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            template_id: template_id.into(),
            outcome: FacetOutcome::Populated {
                raw_response,
                structured,
            },
        }
    }

    #[must_use]
    pub fn failed(kind: FacetKind, template_id: impl Into<String>, failure: FacetFailure) -> Self {
        Self {
            kind,
            template_id: template_id.into(),
            outcome: FacetOutcome::Failed(failure),
        }
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        matches!(self.outcome, FacetOutcome::Populated { .. })
    }

    #[must_use]
    pub fn structured(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            FacetOutcome::Populated { structured, .. } => Some(structured),
            FacetOutcome::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&FacetFailure> {
        match &self.outcome {
            FacetOutcome::Failed(failure) => Some(failure),
            FacetOutcome::Populated { .. } => None,
        }
    }
}

/// A brand analysis report: one entry per [`FacetKind`], always.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub brand: BrandContext,
    pub facets: Vec<AnalysisFacet>,
    pub generated_at: DateTime<Utc>,
    pub delivery_target: Option<String>,
}

impl Report {
    /// Assemble a report from whatever facets were produced.
    ///
    /// Facets are put into [`FacetKind::ALL`] order. A kind that appears more
    /// than once keeps its first entry; a kind that is missing is recorded as
    /// [`FailureKind::NotComputed`], so the result always holds exactly four
    /// facets.
    #[must_use]
    pub fn assemble(
        brand: BrandContext,
        mut produced: Vec<AnalysisFacet>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let facets = FacetKind::ALL
            .iter()
            .map(|&kind| {
                produced
                    .iter()
                    .position(|f| f.kind == kind)
                    .map(|idx| produced.swap_remove(idx))
                    .unwrap_or_else(|| {
                        AnalysisFacet::failed(
                            kind,
                            kind.as_str(),
                            FacetFailure {
                                kind: FailureKind::NotComputed,
                                message: "facet was not computed".to_string(),
                                raw_response: None,
                            },
                        )
                    })
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            brand,
            facets,
            generated_at,
            delivery_target: None,
        }
    }

    #[must_use]
    pub fn with_delivery_target(mut self, destination: impl Into<String>) -> Self {
        self.delivery_target = Some(destination.into());
        self
    }

    /// Complete means every required facet holds a non-error result.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        FacetKind::ALL.iter().all(|&kind| {
            self.facet(kind)
                .is_some_and(AnalysisFacet::is_populated)
        })
    }

    #[must_use]
    pub fn facet(&self, kind: FacetKind) -> Option<&AnalysisFacet> {
        self.facets.iter().find(|f| f.kind == kind)
    }

    #[must_use]
    pub fn populated_count(&self) -> usize {
        self.facets.iter().filter(|f| f.is_populated()).count()
    }

    pub fn failed_facets(&self) -> impl Iterator<Item = &AnalysisFacet> {
        self.facets.iter().filter(|f| !f.is_populated())
    }
}
