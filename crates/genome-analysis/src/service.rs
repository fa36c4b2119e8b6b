use std::sync::Arc;

use genome_core::Report;

use crate::cache::ReportCache;
use crate::error::PipelineError;
use crate::pipeline::AnalysisPipeline;
use crate::resolver::BrandResolver;

/// Resolve a brand, run the pipeline and cache the result.
pub struct GenomeAnalyzer {
    resolver: BrandResolver,
    pipeline: AnalysisPipeline,
    cache: Arc<ReportCache>,
}

impl GenomeAnalyzer {
    #[must_use]
    pub fn new(resolver: BrandResolver, pipeline: AnalysisPipeline, cache: Arc<ReportCache>) -> Self {
        Self {
            resolver,
            pipeline,
            cache,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ReportCache> {
        &self.cache
    }

    /// Analyze the brand named by `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidBrand`] for a rejected identifier, or
    /// [`PipelineError::Unauthorized`] if the provider refuses the credentials.
    pub async fn analyze(&self, identifier: &str) -> Result<Arc<Report>, PipelineError> {
        self.analyze_for(identifier, None).await
    }

    /// Like [`analyze`](Self::analyze), recording where the report is to be
    /// delivered.
    ///
    /// # Errors
    ///
    /// See [`analyze`](Self::analyze).
    pub async fn analyze_for(
        &self,
        identifier: &str,
        delivery_target: Option<&str>,
    ) -> Result<Arc<Report>, PipelineError> {
        let brand = self.resolver.resolve(identifier).await?;
        let mut report = self.pipeline.run(&brand).await?;
        if let Some(target) = delivery_target {
            report = report.with_delivery_target(target);
        }
        Ok(self.cache.insert(report).await)
    }
}
