//! Relay marker detection.
//!
//! Example subject:
//! `Re: Invoice Relay-To: Jane Doe <jane@example.com> Relay-From: Support <support@company.com>`
//!
//! Markers are anchored on their **last** occurrence so subjects that picked
//! up several marker blocks over repeated relay hops resolve to the newest one.

use tracing::debug;

use super::address::{self, EmailAddress};
use super::Markers;

/// Outcome of scanning a subject for relay markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// The to-marker is present, so the message is meant to go out.
    pub is_relay: bool,
    /// Recipient embedded after the to-marker. `None` when there is no
    /// to-marker or nothing parseable follows it.
    pub target: Option<EmailAddress>,
}

impl RoutingDecision {
    fn incoming() -> Self {
        Self {
            is_relay: false,
            target: None,
        }
    }
}

/// Scan `subject` for the relay markers.
pub fn detect_relay(subject: &str, markers: &Markers) -> RoutingDecision {
    let Some(to_pos) = subject.rfind(markers.to.as_str()) else {
        return RoutingDecision::incoming();
    };
    let start = to_pos + markers.to.len();

    // A from-marker only bounds the target when it comes after the to-marker.
    let end = match subject.rfind(markers.from.as_str()) {
        Some(from_pos) if from_pos >= start => from_pos,
        _ => subject.len(),
    };

    let fragment = subject[start..end].trim();
    let target = if fragment.is_empty() {
        None
    } else {
        match address::extract(fragment) {
            Ok(addr) => Some(addr),
            Err(e) => {
                debug!(fragment, error = %e, "Unparseable relay target");
                None
            }
        }
    };

    RoutingDecision {
        is_relay: true,
        target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Markers {
        Markers::default()
    }

    #[test]
    fn no_marker_is_not_relay() {
        for subject in ["", "Hello", "Relay-From: A <a@x.com>", "relay-to: a@x.com"] {
            let decision = detect_relay(subject, &markers());
            assert!(!decision.is_relay, "{subject}");
            assert_eq!(decision.target, None);
        }
    }

    #[test]
    fn to_marker_with_named_address() {
        let decision = detect_relay("Hello Relay-To: Name <e@x.com>", &markers());
        assert!(decision.is_relay);
        assert_eq!(
            decision.target,
            Some(EmailAddress::new("e@x.com").with_name(Some("Name")))
        );
    }

    #[test]
    fn to_marker_with_bare_address() {
        let decision = detect_relay("Relay-To: e@x.com", &markers());
        assert_eq!(decision.target, Some(EmailAddress::new("e@x.com")));
    }

    #[test]
    fn from_marker_after_to_marker_bounds_target() {
        let decision = detect_relay(
            "Invoice Relay-To: A <a@x.com> Relay-From: B <b@y.com>",
            &markers(),
        );
        assert!(decision.is_relay);
        assert_eq!(
            decision.target,
            Some(EmailAddress::new("a@x.com").with_name(Some("A")))
        );
    }

    #[test]
    fn from_marker_before_to_marker_is_not_delimiting() {
        let decision = detect_relay(
            "Relay-From: B <b@y.com> Invoice Relay-To: A <a@x.com>",
            &markers(),
        );
        assert!(decision.is_relay);
        assert_eq!(
            decision.target,
            Some(EmailAddress::new("a@x.com").with_name(Some("A")))
        );
    }

    #[test]
    fn last_to_marker_is_the_anchor() {
        let decision = detect_relay(
            "Hi Relay-To: Old <old@x.com> Relay-To: New <new@x.com>",
            &markers(),
        );
        assert_eq!(
            decision.target,
            Some(EmailAddress::new("new@x.com").with_name(Some("New")))
        );
    }

    #[test]
    fn last_from_marker_is_used_for_bounding() {
        let decision = detect_relay(
            "Relay-From: X <x@y.com> Relay-To: A <a@x.com> Relay-From: B <b@y.com>",
            &markers(),
        );
        assert_eq!(
            decision.target,
            Some(EmailAddress::new("a@x.com").with_name(Some("A")))
        );
    }

    #[test]
    fn empty_target_is_still_relay() {
        let decision = detect_relay("Hello Relay-To:   ", &markers());
        assert!(decision.is_relay);
        assert_eq!(decision.target, None);

        let decision = detect_relay("Relay-To: Relay-From: B <b@y.com>", &markers());
        assert!(decision.is_relay);
        assert_eq!(decision.target, None);
    }

    #[test]
    fn unparseable_target_is_still_relay() {
        let decision = detect_relay("Hello Relay-To: nobody here", &markers());
        assert!(decision.is_relay);
        assert_eq!(decision.target, None);
    }

    #[test]
    fn custom_markers() {
        let markers = Markers::new("[to]", "[from]");
        let decision = detect_relay("Status [to] a@x.com [from] b@y.com", &markers);
        assert_eq!(decision.target, Some(EmailAddress::new("a@x.com")));
        assert!(!detect_relay("Relay-To: a@x.com", &markers).is_relay);
    }

    #[test]
    fn overlapping_from_marker_is_not_delimiting() {
        let markers = Markers::new("Relay:", "lay:");
        let decision = detect_relay("Relay: a@x.com", &markers);
        assert_eq!(decision.target, Some(EmailAddress::new("a@x.com")));
    }
}
