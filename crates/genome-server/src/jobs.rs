//! Genome report jobs: in-memory tracking plus the background runner.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use genome_analysis::GenomeAnalyzer;
use genome_chat::ChatManager;
use genome_core::Report;
use genome_dispatch::{DeliveryReceipt, ReportDispatcher};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    /// The report exists but could not be sent; it can be redelivered.
    DeliveryFailed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::DeliveryFailed | JobStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenomeJob {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
    pub brand_input: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_session_id: Option<Uuid>,
    pub report_id: Option<Uuid>,
    pub delivery: Option<DeliveryReceipt>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub report: Option<Arc<Report>>,
}

#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, GenomeJob>>,
}

impl JobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(
        &self,
        brand_input: &str,
        email: &str,
        chat_session_id: Option<Uuid>,
    ) -> GenomeJob {
        let job = GenomeJob {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            message: "Analysis starting...".to_string(),
            brand_input: brand_input.to_string(),
            email: email.to_string(),
            chat_session_id,
            report_id: None,
            delivery: None,
            created_at: Utc::now(),
            completed_at: None,
            report: None,
        };
        self.jobs.write().await.insert(job.job_id, job.clone());
        job
    }

    pub async fn get(&self, job_id: Uuid) -> Option<GenomeJob> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// All jobs, newest first.
    pub async fn list(&self) -> Vec<GenomeJob> {
        let mut jobs: Vec<GenomeJob> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Apply `f` to a job. Returns the updated job, or `None` if unknown.
    pub async fn update<F>(&self, job_id: Uuid, f: F) -> Option<GenomeJob>
    where
        F: FnOnce(&mut GenomeJob),
    {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id)?;
        f(job);
        Some(job.clone())
    }

    /// Drop finished jobs that completed before `cutoff`.
    pub async fn prune_finished(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.status.is_finished() && job.completed_at.is_some_and(|at| at < cutoff))
        });
        before - jobs.len()
    }
}

/// Collaborators a job run needs.
#[derive(Clone)]
pub struct JobRunner {
    pub jobs: Arc<JobStore>,
    pub analyzer: Arc<GenomeAnalyzer>,
    pub chat: Arc<ChatManager>,
    pub dispatcher: ReportDispatcher,
}

impl JobRunner {
    /// Start `job_id` on a background task.
    pub fn spawn(&self, job_id: Uuid) {
        let runner = self.clone();
        tokio::spawn(async move { runner.run(job_id).await });
    }

    /// Resolve, analyze, cache and deliver. Never panics; every outcome is
    /// recorded on the job.
    pub async fn run(&self, job_id: Uuid) {
        let Some(job) = self
            .jobs
            .update(job_id, |job| {
                job.status = JobStatus::Processing;
                job.message = "Analyzing brand data...".to_string();
            })
            .await
        else {
            tracing::warn!(job_id = %job_id, "genome job vanished before it started");
            return;
        };

        tracing::info!(job_id = %job_id, brand = %job.brand_input, "genome job started");

        match self
            .analyzer
            .analyze_for(&job.brand_input, Some(&job.email))
            .await
        {
            Ok(report) => {
                let absorbed = self.chat.store().absorb_report(&report).await;
                tracing::debug!(job_id = %job_id, sessions = absorbed, "report folded into chat sessions");
                self.jobs
                    .update(job_id, |job| {
                        job.report_id = Some(report.id);
                        job.report = Some(Arc::clone(&report));
                        job.message = "Sending Marketing Genome Report...".to_string();
                    })
                    .await;
                self.deliver(job_id, report, &job.email).await;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "genome job failed");
                let reason = e.to_string();
                self.jobs
                    .update(job_id, |job| {
                        job.status = JobStatus::Failed;
                        job.message = format!("Error generating genome: {reason}");
                        job.completed_at = Some(Utc::now());
                    })
                    .await;
                if let Err(notice_err) = self
                    .dispatcher
                    .notify_failure(&job.email, &job.brand_input, &reason)
                    .await
                {
                    tracing::warn!(job_id = %job_id, error = %notice_err, "failure notice not sent");
                }
            }
        }
    }

    /// Send `report` and record the outcome on the job.
    pub async fn deliver(&self, job_id: Uuid, report: Arc<Report>, email: &str) -> Option<GenomeJob> {
        match self.dispatcher.dispatch(report, email).await {
            Ok(receipt) => {
                tracing::info!(job_id = %job_id, message_id = %receipt.message_id, "genome job completed");
                self.jobs
                    .update(job_id, |job| {
                        job.status = JobStatus::Completed;
                        job.message = "Marketing Genome Report generated successfully!".to_string();
                        job.delivery = Some(receipt);
                        job.completed_at = Some(Utc::now());
                    })
                    .await
            }
            Err(failure) => {
                let reason = failure.error.to_string();
                self.jobs
                    .update(job_id, |job| {
                        job.status = JobStatus::DeliveryFailed;
                        job.message = format!("Report generated but delivery failed: {reason}");
                        job.report = Some(failure.report);
                        job.completed_at = Some(Utc::now());
                    })
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use genome_core::{BrandContext, FacetKind, FailureKind};
    use genome_dispatch::{DeliveryError, LogMailer, ReportMailer};

    use super::*;
    use crate::test_support::{runner_with, StubProvider};

    struct FlakyMailer {
        fail: AtomicBool,
    }

    #[async_trait]
    impl ReportMailer for FlakyMailer {
        async fn send_report(
            &self,
            report: &Report,
            destination: &str,
        ) -> Result<DeliveryReceipt, DeliveryError> {
            if self.fail.swap(false, Ordering::SeqCst) {
                return Err(DeliveryError::Rejected {
                    status: 503,
                    message: "relay down".to_string(),
                });
            }
            LogMailer.send_report(report, destination).await
        }

        async fn send_failure_notice(
            &self,
            destination: &str,
            brand: &str,
            reason: &str,
        ) -> Result<DeliveryReceipt, DeliveryError> {
            LogMailer
                .send_failure_notice(destination, brand, reason)
                .await
        }
    }

    #[tokio::test]
    async fn successful_run_completes_the_job() {
        let runner = runner_with(StubProvider::ok(), Arc::new(LogMailer));
        let job = runner.jobs.create("acme", "owner@acme.com", None).await;

        runner.run(job.job_id).await;

        let job = runner.jobs.get(job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.delivery.is_some());
        assert!(job.report_id.is_some());
        assert!(runner.analyzer.cache().get("acme").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_facet_still_yields_a_delivered_report() {
        let provider = StubProvider::stalling_on("competitive intelligence");
        let runner = runner_with(provider, Arc::new(LogMailer));
        let job = runner.jobs.create("acme", "owner@acme.com", None).await;

        runner.run(job.job_id).await;

        let job = runner.jobs.get(job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.delivery.is_some(), "partial report is still dispatched");

        let report = runner.analyzer.cache().get("acme").await.expect("cached report");
        assert_eq!(report.facets.len(), 4);
        assert_eq!(report.populated_count(), 3);
        let competitors = report
            .facets
            .iter()
            .find(|f| f.kind == FacetKind::CompetitorMap)
            .unwrap();
        assert_eq!(
            competitors.failure().map(|f| f.kind),
            Some(FailureKind::Timeout)
        );
    }

    #[tokio::test]
    async fn delivery_failure_keeps_report_for_redelivery() {
        let mailer = Arc::new(FlakyMailer {
            fail: AtomicBool::new(true),
        });
        let runner = runner_with(StubProvider::ok(), mailer);
        let job = runner.jobs.create("acme", "owner@acme.com", None).await;

        runner.run(job.job_id).await;
        let failed = runner.jobs.get(job.job_id).await.unwrap();
        assert_eq!(failed.status, JobStatus::DeliveryFailed);
        let report = failed.report.clone().expect("report preserved");

        let retried = runner
            .deliver(job.job_id, report, &failed.email)
            .await
            .unwrap();
        assert_eq!(retried.status, JobStatus::Completed);
        assert_eq!(retried.report_id, failed.report_id);
    }

    #[tokio::test]
    async fn auth_failure_fails_the_job() {
        let runner = runner_with(StubProvider::unauthorized(), Arc::new(LogMailer));
        let job = runner.jobs.create("acme", "owner@acme.com", None).await;

        runner.run(job.job_id).await;

        let job = runner.jobs.get(job.job_id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.report.is_none());
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn prune_drops_only_old_finished_jobs() {
        let store = JobStore::new();
        let old = store.create("acme", "a@acme.com", None).await;
        let running = store.create("globex", "b@globex.com", None).await;
        store
            .update(old.job_id, |job| {
                job.status = JobStatus::Completed;
                job.completed_at = Some(Utc::now() - chrono::Duration::hours(25));
            })
            .await;
        store
            .update(running.job_id, |job| job.status = JobStatus::Processing)
            .await;

        let removed = store
            .prune_finished(Utc::now() - chrono::Duration::hours(24))
            .await;
        assert_eq!(removed, 1);
        assert!(store.get(old.job_id).await.is_none());
        assert!(store.get(running.job_id).await.is_some());
    }

    #[test]
    fn job_report_is_not_serialized() {
        let job = GenomeJob {
            job_id: Uuid::new_v4(),
            status: JobStatus::DeliveryFailed,
            message: String::new(),
            brand_input: "acme".to_string(),
            email: "a@acme.com".to_string(),
            chat_session_id: None,
            report_id: None,
            delivery: None,
            created_at: Utc::now(),
            completed_at: None,
            report: Some(Arc::new(Report::assemble(
                BrandContext::new("acme").unwrap(),
                Vec::new(),
                Utc::now(),
            ))),
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "delivery_failed");
        assert!(json.get("report").is_none());
    }
}
