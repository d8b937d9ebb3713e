//! Mail delivery backends.

pub mod sendgrid;
pub mod smtp;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::TransportConfig;
use crate::error::SendError;
use crate::inbound::Attachment;
use crate::relay::address::EmailAddress;

pub use sendgrid::SendGridSender;
pub use smtp::SmtpSender;

/// A routed message ready for delivery.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: EmailAddress,
    pub from: EmailAddress,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

/// Delivers routed mail.
///
/// Implementations report failures; they never retry.
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Backend name, used in logs.
    fn name(&self) -> &str;

    async fn send(&self, mail: &OutgoingMail) -> Result<(), SendError>;
}

/// Build the sender selected by the transport configuration.
pub fn from_config(config: TransportConfig) -> Result<Arc<dyn MailSender>, SendError> {
    Ok(match config {
        TransportConfig::Smtp(smtp) => Arc::new(SmtpSender::new(smtp)?),
        TransportConfig::SendGrid(sendgrid) => Arc::new(SendGridSender::new(sendgrid)),
    })
}
