//! HTTP mail relay client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use genome_core::Report;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::compose::{failure_notice, report_email, Composed};
use crate::error::DeliveryError;
use crate::mailer::{DeliveryReceipt, ReportMailer};

const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

impl Sender {
    fn header(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: String,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a Report>,
}

#[derive(Deserialize)]
struct RelayResponse {
    message_id: Option<String>,
}

/// Posts messages as JSON to a mail relay and reads back its message id.
pub struct RelayMailer {
    client: Client,
    url: String,
    token: Option<String>,
    sender: Sender,
}

impl RelayMailer {
    /// # Errors
    ///
    /// Returns [`DeliveryError::Http`] if the HTTP client cannot be built.
    pub fn new(
        url: &str,
        token: Option<String>,
        sender: Sender,
        timeout_secs: u64,
    ) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("market-genome/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token,
            sender,
        })
    }

    async fn post(
        &self,
        destination: &str,
        email: &Composed,
        report: Option<&Report>,
    ) -> Result<String, DeliveryError> {
        let body = RelayRequest {
            from: self.sender.header(),
            to: destination,
            subject: &email.subject,
            text: &email.text,
            report,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message: text.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let parsed: RelayResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Malformed(e.to_string()))?;
        parsed
            .message_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| DeliveryError::Malformed("response has no message_id".to_string()))
    }
}

#[async_trait]
impl ReportMailer for RelayMailer {
    async fn send_report(
        &self,
        report: &Report,
        destination: &str,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let email = report_email(report);
        let message_id = self.post(destination, &email, Some(report)).await?;
        tracing::info!(report_id = %report.id, to = destination, %message_id, "report sent");
        Ok(DeliveryReceipt {
            message_id,
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
        let message_id = self.post(destination, &email, None).await?;
        tracing::info!(to = destination, brand, %message_id, "failure notice sent");
        Ok(DeliveryReceipt {
            message_id,
            destination: destination.to_string(),
            report_id: None,
            delivered_at: Utc::now(),
        })
    }
}
