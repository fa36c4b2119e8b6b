//! Fan-out of the four report facets for one brand.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use genome_core::{
    AnalysisFacet, AppConfig, BrandContext, FacetFailure, FacetKind, FailureKind, Report,
    MAX_PIPELINE_CONCURRENCY,
};
use genome_llm::{
    with_deadline, with_retry, CompletionProvider, ModelSettings, ProviderError, RetryPolicy,
};
use genome_prompts::{render, ContextFields, TemplateId};

use crate::error::PipelineError;
use crate::parse::parse_facet_json;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub models: ModelSettings,
    pub retry: RetryPolicy,
    /// Simultaneous provider calls per run; clamped to `1..=4`.
    pub max_concurrency: usize,
}

impl PipelineSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            models: ModelSettings::from_config(config),
            retry: RetryPolicy::from_config(config),
            max_concurrency: config.pipeline_max_concurrency,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            models: ModelSettings::default(),
            retry: RetryPolicy::default(),
            max_concurrency: MAX_PIPELINE_CONCURRENCY,
        }
    }
}

/// Runs every facet for a brand and assembles the result into a [`Report`].
pub struct AnalysisPipeline {
    provider: Arc<dyn CompletionProvider>,
    settings: PipelineSettings,
}

impl AnalysisPipeline {
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: PipelineSettings) -> Self {
        Self { provider, settings }
    }

    /// Produce a report for `brand`.
    ///
    /// Facets are computed concurrently and independently. A facet that
    /// fails is recorded on the report with its failure kind; the run goes
    /// on. The returned report always carries all four facets.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Unauthorized`] when the provider rejects the
    /// credentials. Remaining facet calls are abandoned.
    pub async fn run(&self, brand: &BrandContext) -> Result<Report, PipelineError> {
        let fields = ContextFields::for_brand(brand);
        let concurrency = self
            .settings
            .max_concurrency
            .clamp(1, MAX_PIPELINE_CONCURRENCY);

        tracing::info!(brand = %brand.identifier, concurrency, "analysis started");

        let facets: Vec<AnalysisFacet> = stream::iter(FacetKind::ALL)
            .map(|kind| self.run_facet(kind, brand, &fields))
            .buffer_unordered(concurrency)
            .try_collect()
            .await
            .map_err(|e| {
                tracing::error!(brand = %brand.identifier, error = %e, "analysis aborted");
                PipelineError::Unauthorized(e)
            })?;

        let report = Report::assemble(brand.clone(), facets, Utc::now());
        tracing::info!(
            brand = %brand.identifier,
            report_id = %report.id,
            populated = report.populated_count(),
            complete = report.is_complete(),
            "analysis finished"
        );
        Ok(report)
    }

    /// Compute one facet. Only authentication failures escape as `Err`;
    /// everything else becomes a failure marker on the facet.
    async fn run_facet(
        &self,
        kind: FacetKind,
        brand: &BrandContext,
        fields: &ContextFields,
    ) -> Result<AnalysisFacet, ProviderError> {
        let template = TemplateId::for_facet(kind);

        let prompt = match render(template, fields) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::error!(brand = %brand.identifier, facet = %kind, error = %e, "facet prompt failed to render");
                return Ok(AnalysisFacet::failed(
                    kind,
                    template.as_str(),
                    FacetFailure {
                        kind: FailureKind::InvalidRequest,
                        message: e.to_string(),
                        raw_response: None,
                    },
                ));
            }
        };

        let (temperature, max_tokens, json_response) = template
            .defaults()
            .map_or((0.7, 2000, true), |d| {
                (d.temperature, d.max_tokens, d.json_response)
            });
        let params = self.settings.models.text(temperature, max_tokens, json_response);
        let deadline = params.timeout;

        let provider = &self.provider;
        let (prompt_ref, params_ref) = (&prompt, &params);
        let result = with_retry(self.settings.retry, kind.as_str(), move || {
            with_deadline(deadline, provider.complete_text(prompt_ref, params_ref))
        })
        .await;

        let raw = match result {
            Ok(raw) => raw,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                tracing::warn!(brand = %brand.identifier, facet = %kind, error = %e, "facet failed");
                return Ok(AnalysisFacet::failed(
                    kind,
                    template.as_str(),
                    failure_from_provider(&e),
                ));
            }
        };

        match parse_facet_json(&raw) {
            Ok(structured) => {
                tracing::debug!(brand = %brand.identifier, facet = %kind, "facet populated");
                Ok(AnalysisFacet::populated(
                    kind,
                    template.as_str(),
                    raw,
                    structured,
                ))
            }
            Err(reason) => {
                tracing::warn!(brand = %brand.identifier, facet = %kind, %reason, "facet response was not a JSON object");
                Ok(AnalysisFacet::failed(
                    kind,
                    template.as_str(),
                    FacetFailure {
                        kind: FailureKind::MalformedResponse,
                        message: reason,
                        raw_response: Some(raw),
                    },
                ))
            }
        }
    }
}

pub(crate) fn failure_from_provider(err: &ProviderError) -> FacetFailure {
    let kind = match err {
        ProviderError::Auth(_) => FailureKind::Auth,
        ProviderError::RateLimited { .. } => FailureKind::RateLimit,
        ProviderError::Timeout { .. } => FailureKind::Timeout,
        ProviderError::MalformedResponse { .. } => FailureKind::MalformedResponse,
        ProviderError::InvalidRequest(_) => FailureKind::InvalidRequest,
        ProviderError::Api { status, .. } if *status < 500 => FailureKind::InvalidRequest,
        ProviderError::Api { .. } | ProviderError::Transport(_) => FailureKind::Transport,
    };
    FacetFailure {
        kind,
        message: err.to_string(),
        raw_response: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_to_failure_kinds() {
        assert_eq!(
            failure_from_provider(&ProviderError::Timeout { after_ms: 5 }).kind,
            FailureKind::Timeout
        );
        assert_eq!(
            failure_from_provider(&ProviderError::RateLimited {
                retry_after_secs: 1
            })
            .kind,
            FailureKind::RateLimit
        );
        assert_eq!(
            failure_from_provider(&ProviderError::Api {
                status: 502,
                message: String::new()
            })
            .kind,
            FailureKind::Transport
        );
        assert_eq!(
            failure_from_provider(&ProviderError::Api {
                status: 409,
                message: String::new()
            })
            .kind,
            FailureKind::InvalidRequest
        );
    }

    #[test]
    fn default_settings_allow_full_fan_out() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.max_concurrency, 4);
        assert_eq!(settings.retry, RetryPolicy::new(2, 1_000));
    }
}
