//! Handshake markers and fixed control lines.
//!
//! After the length prefix the device answers with a line containing the
//! acknowledgment marker; after the payload it answers with a line containing
//! the completion marker.  Both are matched by substring containment, not
//! equality, because some firmware builds decorate them (`"A\r"`, `"[D] ok"`).
//!
//! The stock markers are single letters, so a plain containment test would
//! also match inbound tokens such as `PLAY` or `VOL_DOWN`.  [`classify`]
//! therefore checks the inbound vocabulary first and only then looks for the
//! marker.

use crate::protocol::command::{parse_token, InboundToken};

/// Stock acknowledgment marker sent by the display firmware.
pub const DEFAULT_ACK_MARKER: &str = "A";
/// Stock completion marker sent by the display firmware.
pub const DEFAULT_DONE_MARKER: &str = "D";

/// Heartbeat request written by the host.
pub const PING_LINE: &[u8] = b"PING\n";
/// Written after a volume step burst so the device can release its UI lock.
pub const VOLUME_ACK_LINE: &[u8] = b"VOL_ACP\n";

/// What a line received during a handshake wait turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeLine {
    /// The line carries the awaited marker.
    Marker,
    /// The line is a regular inbound token that must not be lost.
    Inbound(InboundToken),
    /// Anything else (debug output, partial lines).
    Other,
}

/// Returns `true` if `line` contains `marker`.  An empty marker never matches.
pub fn contains_marker(line: &str, marker: &str) -> bool {
    !marker.is_empty() && line.contains(marker)
}

/// Classifies a decoded, trimmed line seen while waiting for `marker`.
pub fn classify(line: &str, marker: &str) -> HandshakeLine {
    if let Some(token) = parse_token(line) {
        return HandshakeLine::Inbound(token);
    }
    if contains_marker(line, marker) {
        HandshakeLine::Marker
    } else {
        HandshakeLine::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::MediaCommand;

    #[test]
    fn test_marker_matches_by_containment() {
        assert!(contains_marker("A", "A"));
        assert!(contains_marker("ack: A", "A"));
        assert!(!contains_marker("ok", "A"));
    }

    #[test]
    fn test_empty_marker_never_matches() {
        assert!(!contains_marker("anything", ""));
    }

    #[test]
    fn test_inbound_tokens_take_precedence_over_marker() {
        assert_eq!(
            classify("PLAY", DEFAULT_ACK_MARKER),
            HandshakeLine::Inbound(InboundToken::Command(MediaCommand::Play))
        );
        assert_eq!(
            classify("ALIVE", DEFAULT_ACK_MARKER),
            HandshakeLine::Inbound(InboundToken::Alive)
        );
        assert_eq!(
            classify("VOL_DOWN", DEFAULT_DONE_MARKER),
            HandshakeLine::Inbound(InboundToken::Command(MediaCommand::VolDown))
        );
    }

    #[test]
    fn test_classify_marker_and_noise() {
        assert_eq!(classify("D", DEFAULT_DONE_MARKER), HandshakeLine::Marker);
        assert_eq!(classify("boot v1.2", DEFAULT_DONE_MARKER), HandshakeLine::Other);
    }

    #[test]
    fn test_control_lines_are_newline_terminated() {
        assert_eq!(PING_LINE.last(), Some(&b'\n'));
        assert_eq!(VOLUME_ACK_LINE.last(), Some(&b'\n'));
    }
}
