//! SendGrid v3 `mail/send` delivery.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::ExposeSecret;
use serde::Serialize;

use super::{MailSender, OutgoingMail};
use crate::config::SendGridConfig;
use crate::error::SendError;
use crate::relay::address::EmailAddress;

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Contact<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<AttachmentPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<Contact<'a>>,
}

#[derive(Debug, Serialize)]
struct Contact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a EmailAddress> for Contact<'a> {
    fn from(addr: &'a EmailAddress) -> Self {
        Self {
            email: &addr.email,
            name: addr.display_name(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    mime_type: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct AttachmentPayload<'a> {
    content: String,
    filename: &'a str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
}

/// Build the JSON body for `mail`.
fn payload(mail: &OutgoingMail) -> SendRequest<'_> {
    // SendGrid wants text/plain before text/html and at least one entry.
    let mut content = Vec::new();
    if !mail.text.is_empty() || mail.html.is_empty() {
        content.push(Content {
            mime_type: "text/plain",
            value: if mail.text.is_empty() { " " } else { &mail.text },
        });
    }
    if !mail.html.is_empty() {
        content.push(Content {
            mime_type: "text/html",
            value: &mail.html,
        });
    }

    SendRequest {
        personalizations: vec![Personalization {
            to: vec![Contact::from(&mail.to)],
        }],
        from: Contact::from(&mail.from),
        subject: &mail.subject,
        content,
        attachments: mail
            .attachments
            .iter()
            .map(|a| AttachmentPayload {
                content: STANDARD.encode(&a.content),
                filename: &a.filename,
                mime_type: a.content_type.as_deref(),
            })
            .collect(),
    }
}

// ── Sender ──────────────────────────────────────────────────────────

/// Sends through the SendGrid HTTP API.
pub struct SendGridSender {
    config: SendGridConfig,
    client: reqwest::Client,
}

impl SendGridSender {
    pub fn new(config: SendGridConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MailSender for SendGridSender {
    fn name(&self) -> &str {
        "sendgrid"
    }

    async fn send(&self, mail: &OutgoingMail) -> Result<(), SendError> {
        let resp = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&payload(mail))
            .send()
            .await
            .map_err(|e| SendError::Transport {
                transport: "sendgrid".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SendError::Rejected {
                provider: "sendgrid".into(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %mail.to.email, status = status.as_u16(), "Email sent via SendGrid");
        Ok(())
    }
}
