use async_trait::async_trait;
use chrono::{DateTime, Utc};
use genome_core::Report;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compose::{failure_notice, report_email};
use crate::error::DeliveryError;

/// Proof that a message was handed to the mail transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
    pub delivered_at: DateTime<Utc>,
}

/// Email collaborator. Owns formatting, transport and credentials.
#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send_report(
        &self,
        report: &Report,
        destination: &str,
    ) -> Result<DeliveryReceipt, DeliveryError>;

    /// Tell `destination` that no report could be produced for `brand`.
    async fn send_failure_notice(
        &self,
        destination: &str,
        brand: &str,
        reason: &str,
    ) -> Result<DeliveryReceipt, DeliveryError>;
}

/// Mailer that only logs. Used when no relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl ReportMailer for LogMailer {
    async fn send_report(
        &self,
        report: &Report,
        destination: &str,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let email = report_email(report);
        tracing::info!(
            report_id = %report.id,
            to = destination,
            subject = %email.subject,
            chars = email.text.len(),
            "report delivery logged (no mail relay configured)"
        );
        Ok(DeliveryReceipt {
            message_id: format!("log-{}", Uuid::new_v4()),
            destination: destination.to_string(),
            report_id: Some(report.id),
            delivered_at: Utc::now(),
        })
    }

    async fn send_failure_notice(
        &self,
        destination: &str,
        brand: &str,
        reason: &str,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let email = failure_notice(brand, reason);
        tracing::info!(
            to = destination,
            brand,
            subject = %email.subject,
            "failure notice logged (no mail relay configured)"
        );
        Ok(DeliveryReceipt {
            message_id: format!("log-{}", Uuid::new_v4()),
            destination: destination.to_string(),
            report_id: None,
            delivered_at: Utc::now(),
        })
    }
}
