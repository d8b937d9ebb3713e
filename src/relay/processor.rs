//! Relay orchestration: normalize, decide, rewrite, hand off.
//!
//! `handle()` is the fallible core. `process()` wraps it for the webhook:
//! every failure is logged and the caller always gets `{}` back, because a
//! non-2xx answer makes the inbound provider retry the whole event.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::address::EmailAddress;
use super::scanner::detect_relay;
use super::subject::{annotate, sanitize};
use crate::config::RelayConfig;
use crate::error::Result;
use crate::inbound::{self, InboundForm, InboundMessage};
use crate::sender::{MailSender, OutgoingMail};

/// Where a message ended up.
#[derive(Debug, Clone)]
pub enum Routed {
    /// Outgoing: the subject named a recipient.
    Relay(OutgoingMail),
    /// Outgoing intent, but nothing parseable followed the to-marker.
    /// Nothing is sent.
    AmbiguousRelay { subject: String },
    /// Redirected to the internal mailbox.
    Incoming(OutgoingMail),
}

impl Routed {
    /// The mail to deliver, if any.
    pub fn mail(&self) -> Option<&OutgoingMail> {
        match self {
            Routed::Relay(mail) | Routed::Incoming(mail) => Some(mail),
            Routed::AmbiguousRelay { .. } => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Routed::Relay(_) => "relay",
            Routed::AmbiguousRelay { .. } => "ambiguous-relay",
            Routed::Incoming(_) => "incoming",
        }
    }
}

/// Routes inbound messages and dispatches them to a [`MailSender`].
pub struct RelayProcessor {
    config: Arc<RelayConfig>,
    sender: Arc<dyn MailSender>,
}

impl RelayProcessor {
    pub fn new(config: Arc<RelayConfig>, sender: Arc<dyn MailSender>) -> Self {
        Self { config, sender }
    }

    /// Decide where `message` goes and rewrite it accordingly.
    pub fn route(&self, message: InboundMessage) -> Routed {
        let markers = &self.config.markers;
        let decision = detect_relay(&message.subject, markers);

        let InboundMessage {
            subject,
            from,
            to,
            text,
            html,
            attachments,
        } = message;

        if decision.is_relay {
            let Some(target) = decision.target else {
                return Routed::AmbiguousRelay { subject };
            };
            let name = self.config.nametags.lookup(&to.email);
            let from = EmailAddress::new(to.email.clone()).with_name(name);
            Routed::Relay(OutgoingMail {
                to: target,
                from,
                subject: sanitize(&subject, markers),
                text,
                html,
                attachments,
            })
        } else {
            let subject = annotate(&subject, &from, &markers.to);
            Routed::Incoming(OutgoingMail {
                to: self.config.mailbox.clone(),
                from: EmailAddress::new(to.email).with_name(from.name),
                subject,
                text,
                html,
                attachments,
            })
        }
    }

    /// Normalize the webhook form and route it.
    pub fn prepare(&self, form: &InboundForm) -> Result<Routed> {
        let mut message = inbound::parse_body(form)?;
        message.attachments.extend(inbound::parse_attachments(form));
        debug!(
            subject = %message.subject,
            from = %message.from,
            to = %message.to,
            attachments = message.attachments.len(),
            "Inbound message parsed"
        );
        Ok(self.route(message))
    }

    /// Route the form and wait for delivery. Errors propagate.
    pub async fn handle(&self, form: &InboundForm) -> Result<Routed> {
        let routed = self.prepare(form)?;
        if let Some(mail) = routed.mail() {
            self.sender.send(mail).await?;
        }
        Ok(routed)
    }

    /// Webhook entry point. Never fails and always returns `{}`.
    ///
    /// Delivery is spawned and not awaited; a failed send is logged only.
    pub fn process(&self, form: &InboundForm) -> serde_json::Value {
        match self.prepare(form) {
            Ok(routed) => self.dispatch(routed),
            Err(e) => error!(error = %e, "Failed to process inbound message"),
        }
        serde_json::json!({})
    }

    fn dispatch(&self, routed: Routed) {
        let route = routed.label();
        let mail = match routed {
            Routed::Relay(mail) | Routed::Incoming(mail) => mail,
            Routed::AmbiguousRelay { subject } => {
                warn!(%subject, "Relay marker without a recipient, dropping message");
                return;
            }
        };

        info!(route, to = %mail.to, from = %mail.from, subject = %mail.subject, "Routing message");

        let sender = Arc::clone(&self.sender);
        tokio::spawn(async move {
            if let Err(e) = sender.send(&mail).await {
                error!(
                    route,
                    sender = sender.name(),
                    to = %mail.to.email,
                    error = %e,
                    "Failed to send message"
                );
            }
        });
    }
}
