//! Report dispatch: hand finished reports to an email collaborator.

pub mod compose;
pub mod dispatcher;
pub mod error;
pub mod mailer;
pub mod relay;

use std::sync::Arc;

use genome_core::AppConfig;

pub use dispatcher::ReportDispatcher;
pub use error::{DeliveryError, DispatchFailure};
pub use mailer::{DeliveryReceipt, LogMailer, ReportMailer};
pub use relay::{RelayMailer, Sender};

/// The relay mailer when a relay URL is configured, otherwise [`LogMailer`].
///
/// # Errors
///
/// Returns [`DeliveryError::Http`] if the relay client cannot be built.
pub fn mailer_from_config(config: &AppConfig) -> Result<Arc<dyn ReportMailer>, DeliveryError> {
    match &config.mail_relay_url {
        Some(url) => {
            let sender = Sender {
                email: config.sender_email.clone(),
                name: config.sender_name.clone(),
            };
            let relay = RelayMailer::new(
                url,
                config.mail_relay_token.clone(),
                sender,
                config.provider_timeout_secs,
            )?;
            tracing::info!(relay = %url, "mail relay configured");
            Ok(Arc::new(relay))
        }
        None => {
            tracing::warn!("GENOME_MAIL_RELAY_URL not set, reports will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}
