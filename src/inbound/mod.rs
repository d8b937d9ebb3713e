//! Inbound webhook normalization.
//!
//! Turns a SendGrid-style Inbound Parse POST into an [`InboundMessage`].
//! Two shapes are accepted:
//! - parsed fields (`subject`, `from`, `to`, `text`, `html`) with one file
//!   part per attachment and an optional `attachment-info` JSON field;
//! - raw mode, where the whole MIME message sits in the `email` field.

mod raw;

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ParseError;
use crate::relay::address::{self, EmailAddress};

// ── Webhook form ────────────────────────────────────────────────────

/// A file part of the webhook form.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Form field name (`attachment1`, `attachment2`, ...).
    pub field: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// The webhook form split into text fields and file parts.
#[derive(Debug, Clone, Default)]
pub struct InboundForm {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
    /// Raw-mode `email` field, kept as bytes so the message's own charset
    /// still applies.
    pub raw: Option<Vec<u8>>,
}

impl InboundForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_raw(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

// ── Normalized message ──────────────────────────────────────────────

/// An attachment carried through to the outgoing mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// The normalized inbound envelope.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub subject: String,
    pub from: EmailAddress,
    pub to: EmailAddress,
    pub text: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}

/// Entry of the `attachment-info` field.
#[derive(Debug, Deserialize)]
struct AttachmentInfo {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    content_type: Option<String>,
}

/// Normalize the text part of the form into a message.
///
/// Attachments are left empty; see [`parse_attachments`].
pub fn parse_body(form: &InboundForm) -> Result<InboundMessage, ParseError> {
    if let Some(raw) = &form.raw {
        return raw::parse_mime(raw);
    }

    let from = form
        .field("from")
        .ok_or_else(|| ParseError::MissingField("from".into()))?;
    let to = form
        .field("to")
        .ok_or_else(|| ParseError::MissingField("to".into()))?;

    Ok(InboundMessage {
        subject: form.field("subject").unwrap_or_default().to_string(),
        from: address::extract(from)?,
        to: first_recipient(to)?,
        text: form.field("text").unwrap_or_default().to_string(),
        html: form.field("html").unwrap_or_default().to_string(),
        attachments: Vec::new(),
    })
}

/// Collect the form's file parts as attachments.
///
/// Missing filenames and content types are filled from `attachment-info`.
pub fn parse_attachments(form: &InboundForm) -> Vec<Attachment> {
    let info: HashMap<String, AttachmentInfo> = form
        .field("attachment-info")
        .and_then(|json| match serde_json::from_str(json) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed attachment-info");
                None
            }
        })
        .unwrap_or_default();

    form.files
        .iter()
        .map(|file| {
            let meta = info.get(&file.field);
            let filename = file
                .filename
                .clone()
                .filter(|f| !f.is_empty())
                .or_else(|| meta.and_then(|m| m.filename.clone().or_else(|| m.name.clone())))
                .unwrap_or_else(|| file.field.clone());
            let content_type = file
                .content_type
                .clone()
                .or_else(|| meta.and_then(|m| m.content_type.clone()));
            Attachment {
                filename,
                content_type,
                content: file.content.clone(),
            }
        })
        .collect()
}

/// First parseable entry of a comma-separated recipient list.
fn first_recipient(to: &str) -> Result<EmailAddress, ParseError> {
    to.split(',')
        .find_map(|entry| address::extract(entry).ok())
        .ok_or_else(|| ParseError::InvalidAddress(to.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> InboundForm {
        InboundForm::new()
            .with_field("subject", "Question")
            .with_field("from", "Jane Doe <jane@example.com>")
            .with_field("to", "support@company.com")
            .with_field("text", "Hello")
            .with_field("html", "<p>Hello</p>")
    }

    #[test]
    fn parse_form_fields() {
        let msg = parse_body(&form()).unwrap();
        assert_eq!(msg.subject, "Question");
        assert_eq!(msg.from.name.as_deref(), Some("Jane Doe"));
        assert_eq!(msg.from.email, "jane@example.com");
        assert_eq!(msg.to.email, "support@company.com");
        assert_eq!(msg.text, "Hello");
        assert_eq!(msg.html, "<p>Hello</p>");
        assert!(msg.attachments.is_empty());
    }

    #[test]
    fn parse_missing_optional_fields() {
        let form = InboundForm::new()
            .with_field("from", "jane@example.com")
            .with_field("to", "support@company.com");
        let msg = parse_body(&form).unwrap();
        assert_eq!(msg.subject, "");
        assert_eq!(msg.text, "");
        assert_eq!(msg.html, "");
    }

    #[test]
    fn parse_takes_first_parseable_recipient() {
        let form = form().with_field("to", "undisclosed-recipients, Support <support@company.com>, b@y.com");
        let msg = parse_body(&form).unwrap();
        assert_eq!(msg.to.email, "support@company.com");
        assert_eq!(msg.to.name.as_deref(), Some("Support"));
    }

    #[test]
    fn raw_mode_keeps_message_charset() {
        let mut raw = b"From: jane@example.com\r\nTo: support@company.com\r\n".to_vec();
        raw.extend_from_slice(b"Subject: Menu\r\nContent-Type: text/plain; charset=iso-8859-1\r\n");
        raw.extend_from_slice(b"Content-Transfer-Encoding: 8bit\r\n\r\nCaf\xE9\r\n");

        let msg = parse_body(&InboundForm::new().with_raw(raw)).unwrap();
        assert_eq!(msg.subject, "Menu");
        assert_eq!(msg.text.trim(), "Caf\u{e9}");
    }

    #[test]
    fn parse_missing_from_fails() {
        let mut form = form();
        form.fields.remove("from");
        assert!(matches!(parse_body(&form), Err(ParseError::MissingField(f)) if f == "from"));
    }

    #[test]
    fn parse_unparseable_to_fails() {
        let form = form().with_field("to", "nobody");
        assert!(matches!(parse_body(&form), Err(ParseError::InvalidAddress(_))));
    }

    #[test]
    fn attachments_from_files() {
        let form = form().with_file(UploadedFile {
            field: "attachment1".into(),
            filename: Some("report.pdf".into()),
            content_type: Some("application/pdf".into()),
            content: b"%PDF".to_vec(),
        });
        let attachments = parse_attachments(&form);
        assert_eq!(
            attachments,
            vec![Attachment {
                filename: "report.pdf".into(),
                content_type: Some("application/pdf".into()),
                content: b"%PDF".to_vec(),
            }]
        );
    }

    #[test]
    fn attachment_info_fills_gaps() {
        let form = form()
            .with_field(
                "attachment-info",
                r#"{"attachment1": {"filename": "photo.png", "name": "photo.png", "type": "image/png"}}"#,
            )
            .with_file(UploadedFile {
                field: "attachment1".into(),
                content: vec![0x89, 0x50],
                ..Default::default()
            });
        let attachments = parse_attachments(&form);
        assert_eq!(attachments[0].filename, "photo.png");
        assert_eq!(attachments[0].content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn malformed_attachment_info_is_ignored() {
        let form = form()
            .with_field("attachment-info", "{not json")
            .with_file(UploadedFile {
                field: "attachment1".into(),
                content: vec![1, 2, 3],
                ..Default::default()
            });
        let attachments = parse_attachments(&form);
        assert_eq!(attachments[0].filename, "attachment1");
        assert_eq!(attachments[0].content_type, None);
    }

    #[test]
    fn no_files_no_attachments() {
        assert!(parse_attachments(&form()).is_empty());
    }
}
