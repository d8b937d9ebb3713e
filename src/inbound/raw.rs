//! Raw-mode webhook payloads: the whole MIME message in one field.

use mail_parser::{Addr, MessageParser, MimeHeaders};

use super::{Attachment, InboundMessage};
use crate::error::ParseError;
use crate::relay::address::EmailAddress;

/// Parse a full RFC 5322 message.
pub(super) fn parse_mime(raw: &[u8]) -> Result<InboundMessage, ParseError> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or(ParseError::InvalidMime)?;

    let from = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(to_email_address)
        .ok_or_else(|| ParseError::MissingField("From".into()))?;
    let to = parsed
        .to()
        .and_then(|addr| addr.first())
        .and_then(to_email_address)
        .ok_or_else(|| ParseError::MissingField("To".into()))?;

    let text = parsed
        .body_text(0)
        .map(|text| text.into_owned())
        .unwrap_or_default();
    let html = parsed
        .html_bodies()
        .find(|part| part.is_content_type("text", "html"))
        .and_then(|part| part.text_contents())
        .unwrap_or_default()
        .to_string();

    let attachments = parsed
        .attachments()
        .map(|part| Attachment {
            filename: part.attachment_name().unwrap_or("attachment").to_string(),
            content_type: part.content_type().map(|ct| match ct.subtype() {
                Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                None => ct.ctype().to_string(),
            }),
            content: part.contents().to_vec(),
        })
        .collect();

    Ok(InboundMessage {
        subject: parsed.subject().unwrap_or_default().to_string(),
        from,
        to,
        text,
        html,
        attachments,
    })
}

fn to_email_address(addr: &Addr<'_>) -> Option<EmailAddress> {
    let email = addr.address().filter(|a| a.contains('@'))?;
    Some(EmailAddress::new(email).with_name(addr.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTIPART: &str = concat!(
        "From: \"Jane Doe\" <jane@example.com>\r\n",
        "To: Support <support@company.com>\r\n",
        "Subject: Question Relay-To: bob@example.org\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
        "\r\n",
        "--outer\r\n",
        "Content-Type: multipart/alternative; boundary=\"inner\"\r\n",
        "\r\n",
        "--inner\r\n",
        "Content-Type: text/plain; charset=utf-8\r\n",
        "\r\n",
        "Hello there\r\n",
        "--inner\r\n",
        "Content-Type: text/html; charset=utf-8\r\n",
        "\r\n",
        "<p>Hello there</p>\r\n",
        "--inner--\r\n",
        "--outer\r\n",
        "Content-Type: text/csv; name=\"data.csv\"\r\n",
        "Content-Disposition: attachment; filename=\"data.csv\"\r\n",
        "\r\n",
        "a,b\r\n",
        "--outer--\r\n",
    );

    #[test]
    fn parse_multipart_message() {
        let msg = parse_mime(MULTIPART.as_bytes()).unwrap();
        assert_eq!(msg.subject, "Question Relay-To: bob@example.org");
        assert_eq!(msg.from, EmailAddress::new("jane@example.com").with_name(Some("Jane Doe")));
        assert_eq!(msg.to, EmailAddress::new("support@company.com").with_name(Some("Support")));
        assert_eq!(msg.text.trim(), "Hello there");
        assert_eq!(msg.html.trim(), "<p>Hello there</p>");
        assert_eq!(msg.attachments.len(), 1);
        assert_eq!(msg.attachments[0].filename, "data.csv");
        assert_eq!(msg.attachments[0].content_type.as_deref(), Some("text/csv"));
    }

    #[test]
    fn parse_plain_message_has_no_html() {
        let raw = "From: jane@example.com\r\nTo: support@company.com\r\nSubject: Hi\r\n\r\nJust text\r\n";
        let msg = parse_mime(raw.as_bytes()).unwrap();
        assert_eq!(msg.from.name, None);
        assert_eq!(msg.text.trim(), "Just text");
        assert_eq!(msg.html, "");
        assert!(msg.attachments.is_empty());
    }

    #[test]
    fn parse_without_from_fails() {
        let raw = "To: support@company.com\r\nSubject: Hi\r\n\r\nbody\r\n";
        assert!(matches!(
            parse_mime(raw.as_bytes()),
            Err(ParseError::MissingField(f)) if f == "From"
        ));
    }
}
