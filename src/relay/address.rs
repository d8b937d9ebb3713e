//! Address extraction for `Name <email>` and bare `email` fragments.
//!
//! Best-effort only. The fragments come from subjects this service writes
//! itself and from webhook form fields, so no RFC 5322 parsing is attempted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// An email address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Attach a display name. Blank names are dropped.
    pub fn with_name(mut self, name: Option<impl Into<String>>) -> Self {
        self.name = name
            .map(Into::into)
            .filter(|n: &String| !n.trim().is_empty());
        self
    }

    /// Display name, if one is set and non-empty.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_name() {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// Split a `"Display Name <user@host>"` or `"user@host"` fragment.
///
/// Fails when the address part is empty or has no `@`.
pub fn extract(fragment: &str) -> Result<EmailAddress, ParseError> {
    let fragment = fragment.trim();

    let (name, email) = match fragment.rfind('<') {
        Some(open) => {
            let rest = &fragment[open + 1..];
            let email = match rest.find('>') {
                Some(close) => &rest[..close],
                None => rest,
            };
            let name = fragment[..open].trim().trim_matches('"').trim();
            (Some(name), email.trim())
        }
        None => (None, fragment),
    };

    if email.is_empty() || !email.contains('@') {
        return Err(ParseError::InvalidAddress(fragment.to_string()));
    }

    Ok(EmailAddress::new(email).with_name(name))
}
