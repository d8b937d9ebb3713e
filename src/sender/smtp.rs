//! SMTP delivery via lettre.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment as MimeAttachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

use super::{MailSender, OutgoingMail};
use crate::config::{SmtpConfig, SmtpTls};
use crate::error::SendError;
use crate::relay::address::EmailAddress;

const OCTET_STREAM: &str = "application/octet-stream";

/// SMTP sender. lettre's transport is blocking, so sends run on the
/// blocking pool.
pub struct SmtpSender {
    transport: SmtpTransport,
}

impl SmtpSender {
    pub fn new(config: SmtpConfig) -> Result<Self, SendError> {
        let builder = match config.tls {
            SmtpTls::StartTls => SmtpTransport::starttls_relay(&config.host),
            SmtpTls::Tls => SmtpTransport::relay(&config.host),
            SmtpTls::None => Ok(SmtpTransport::builder_dangerous(&config.host)),
        }
        .map_err(|e| SendError::Transport {
            transport: "smtp".into(),
            reason: format!("SMTP relay error: {e}"),
        })?;

        let mut builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (config.username, config.password) {
            builder = builder.credentials(Credentials::new(
                username,
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl MailSender for SmtpSender {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), SendError> {
        let message = build_message(mail)?;
        let transport = self.transport.clone();

        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| SendError::Transport {
                transport: "smtp".into(),
                reason: format!("SMTP send task panicked: {e}"),
            })?
            .map_err(|e| SendError::Transport {
                transport: "smtp".into(),
                reason: format!("SMTP send failed: {e}"),
            })?;

        tracing::info!(to = %mail.to.email, "Email sent via SMTP");
        Ok(())
    }
}

fn mailbox(addr: &EmailAddress) -> Result<Mailbox, SendError> {
    let email = addr.email.parse().map_err(|e| SendError::InvalidAddress {
        address: addr.email.clone(),
        reason: format!("{e}"),
    })?;
    Ok(Mailbox::new(addr.display_name().map(str::to_string), email))
}

/// Message body before attachments are added.
enum Content {
    Single(SinglePart),
    Alternative(MultiPart),
}

/// Build the MIME message for `mail`.
pub fn build_message(mail: &OutgoingMail) -> Result<Message, SendError> {
    let builder = Message::builder()
        .from(mailbox(&mail.from)?)
        .to(mailbox(&mail.to)?)
        .subject(mail.subject.as_str());

    let content = match (mail.text.is_empty(), mail.html.is_empty()) {
        (false, false) => Content::Alternative(MultiPart::alternative_plain_html(
            mail.text.clone(),
            mail.html.clone(),
        )),
        (true, false) => Content::Single(SinglePart::html(mail.html.clone())),
        (_, true) => Content::Single(SinglePart::plain(mail.text.clone())),
    };

    let built = if mail.attachments.is_empty() {
        match content {
            Content::Single(part) => builder.singlepart(part),
            Content::Alternative(parts) => builder.multipart(parts),
        }
    } else {
        let mut mixed = match content {
            Content::Single(part) => MultiPart::mixed().singlepart(part),
            Content::Alternative(parts) => MultiPart::mixed().multipart(parts),
        };
        for attachment in &mail.attachments {
            let raw = attachment.content_type.as_deref().unwrap_or(OCTET_STREAM);
            let content_type = ContentType::parse(raw)
                .or_else(|_| ContentType::parse(OCTET_STREAM))
                .map_err(|e| SendError::Build(e.to_string()))?;
            mixed = mixed.singlepart(
                MimeAttachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        builder.multipart(mixed)
    };

    built.map_err(|e| SendError::Build(e.to_string()))
}
