use std::sync::Arc;

use genome_core::{validate_email, Report};

use crate::error::{DeliveryError, DispatchFailure};
use crate::mailer::{DeliveryReceipt, ReportMailer};

/// Hands finished reports to the mailer.
#[derive(Clone)]
pub struct ReportDispatcher {
    mailer: Arc<dyn ReportMailer>,
}

impl ReportDispatcher {
    #[must_use]
    pub fn new(mailer: Arc<dyn ReportMailer>) -> Self {
        Self { mailer }
    }

    /// Deliver `report` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchFailure`] holding the report and the cause when
    /// the address is invalid or the mailer fails.
    pub async fn dispatch(
        &self,
        report: Arc<Report>,
        destination: &str,
    ) -> Result<DeliveryReceipt, DispatchFailure> {
        let destination = match validate_email(destination) {
            Ok(d) => d,
            Err(e) => {
                return Err(DispatchFailure {
                    report,
                    error: e.into(),
                })
            }
        };

        match self.mailer.send_report(&report, destination).await {
            Ok(receipt) => Ok(receipt),
            Err(error) => {
                tracing::warn!(report_id = %report.id, to = destination, %error, "report delivery failed");
                Err(DispatchFailure { report, error })
            }
        }
    }

    /// Tell the requester that their report could not be produced.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the address is invalid or the mailer fails.
    pub async fn notify_failure(
        &self,
        destination: &str,
        brand: &str,
        reason: &str,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let destination = validate_email(destination)?;
        self.mailer
            .send_failure_notice(destination, brand, reason)
            .await
    }
}
