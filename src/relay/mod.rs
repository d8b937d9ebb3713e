//! Relay routing core.
//!
//! A message whose subject carries the to-marker goes out to the address
//! embedded after it. Anything else is redirected to the internal mailbox
//! with the original sender appended to the subject, so a reply from the
//! mailbox comes back through here and is relayed out:
//!
//! 1. `scanner::detect_relay()` reads the markers
//! 2. `subject::sanitize()` / `subject::annotate()` rewrite the subject
//! 3. `processor::RelayProcessor` assigns from/to and hands off to a sender

pub mod address;
pub mod nametags;
pub mod processor;
pub mod scanner;
pub mod subject;

pub use address::EmailAddress;
pub use nametags::NameTags;
pub use processor::{RelayProcessor, Routed};
pub use scanner::{RoutingDecision, detect_relay};

/// Default to-marker.
pub const DEFAULT_TO_MARKER: &str = "Relay-To:";
/// Default from-marker.
pub const DEFAULT_FROM_MARKER: &str = "Relay-From:";

/// The two subject marker tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub to: String,
    pub from: String,
}

impl Markers {
    pub fn new(to: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::new(DEFAULT_TO_MARKER, DEFAULT_FROM_MARKER)
    }
}
