use std::collections::HashMap;
use std::sync::Arc;

use genome_core::{brand_key, Report};
use tokio::sync::RwLock;

/// Most recent report per brand, keyed by normalised brand identifier.
#[derive(Default)]
pub struct ReportCache {
    reports: RwLock<HashMap<String, Arc<Report>>>,
}

impl ReportCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `report`, replacing any earlier one for the same brand.
    pub async fn insert(&self, report: Report) -> Arc<Report> {
        let report = Arc::new(report);
        self.reports
            .write()
            .await
            .insert(report.brand.key(), Arc::clone(&report));
        report
    }

    pub async fn get(&self, identifier: &str) -> Option<Arc<Report>> {
        self.reports
            .read()
            .await
            .get(&brand_key(identifier))
            .cloned()
    }

    pub async fn remove(&self, identifier: &str) -> Option<Arc<Report>> {
        self.reports.write().await.remove(&brand_key(identifier))
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reports.read().await.is_empty()
    }
}
