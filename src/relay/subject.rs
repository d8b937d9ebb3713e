//! Subject rewriting for both relay directions.

use super::address::EmailAddress;
use super::Markers;

/// Strip every marker block from an outgoing subject.
///
/// Cuts at the first to-marker, then at the first from-marker, so the
/// external recipient never sees either marker whatever their order.
pub fn sanitize(subject: &str, markers: &Markers) -> String {
    let subject = subject
        .split(markers.to.as_str())
        .next()
        .unwrap_or_default();
    let subject = subject
        .split(markers.from.as_str())
        .next()
        .unwrap_or_default();
    subject.trim().to_string()
}

/// Append a to-marker block naming the original sender.
///
/// A reply to the annotated message carries the block back in and gets
/// relayed to `sender`.
pub fn annotate(subject: &str, sender: &EmailAddress, to_marker: &str) -> String {
    format!("{subject} {to_marker} {sender}").trim().to_string()
}
