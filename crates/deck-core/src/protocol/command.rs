//! Inbound command vocabulary.
//!
//! The device reports button presses as plain text tokens, one per line.  The
//! vocabulary is closed: anything outside it is rejected at this boundary and
//! never reaches the dispatch layer.
//!
//! | Token       | Meaning                              |
//! |-------------|--------------------------------------|
//! | `PLAY`      | toggle play / pause                  |
//! | `SKIP_NEXT` | next track                           |
//! | `SKIP_PREV` | previous track                       |
//! | `MUTE`      | toggle mute                          |
//! | `VOL_UP`    | raise volume                         |
//! | `VOL_DOWN`  | lower volume                         |
//! | `ALIVE`     | heartbeat reply, never dispatched    |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A media control command decoded from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaCommand {
    Play,
    SkipNext,
    SkipPrev,
    Mute,
    VolUp,
    VolDown,
}

impl MediaCommand {
    /// Every command, in wire-table order.
    pub const ALL: [MediaCommand; 6] = [
        MediaCommand::Play,
        MediaCommand::SkipNext,
        MediaCommand::SkipPrev,
        MediaCommand::Mute,
        MediaCommand::VolUp,
        MediaCommand::VolDown,
    ];

    /// The exact token the device sends for this command.
    pub fn as_token(self) -> &'static str {
        match self {
            MediaCommand::Play => "PLAY",
            MediaCommand::SkipNext => "SKIP_NEXT",
            MediaCommand::SkipPrev => "SKIP_PREV",
            MediaCommand::Mute => "MUTE",
            MediaCommand::VolUp => "VOL_UP",
            MediaCommand::VolDown => "VOL_DOWN",
        }
    }

    /// Returns `true` for the two volume-step commands.
    pub fn is_volume_step(self) -> bool {
        matches!(self, MediaCommand::VolUp | MediaCommand::VolDown)
    }
}

impl fmt::Display for MediaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Error returned when a string is not part of the command vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized command token: {0:?}")]
pub struct UnknownToken(pub String);

impl FromStr for MediaCommand {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaCommand::ALL
            .into_iter()
            .find(|cmd| cmd.as_token() == s)
            .ok_or_else(|| UnknownToken(s.to_string()))
    }
}

/// Token used by the device to answer a `PING`.
pub const ALIVE_TOKEN: &str = "ALIVE";

/// One recognised inbound token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundToken {
    /// A media command to dispatch.
    Command(MediaCommand),
    /// Heartbeat reply; consumed as a liveness signal.
    Alive,
}

/// Parses one trimmed token against the closed vocabulary.
///
/// Returns `None` for empty or unknown input.  Matching is exact and
/// case-sensitive because the firmware only ever emits upper-case tokens.
pub fn parse_token(token: &str) -> Option<InboundToken> {
    if token == ALIVE_TOKEN {
        return Some(InboundToken::Alive);
    }
    token.parse::<MediaCommand>().ok().map(InboundToken::Command)
}

/// Decodes raw line bytes into trimmed text.
///
/// Returns `None` when the line is not valid UTF-8.  Such a line is discarded
/// as a whole: a garbled line that happens to contain a valid token is more
/// likely line noise than an intentional press.
pub fn decode_line(raw: &[u8]) -> Option<String> {
    std::str::from_utf8(raw).ok().map(|s| s.trim().to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_yields_play_command() {
        assert_eq!(
            parse_token("PLAY"),
            Some(InboundToken::Command(MediaCommand::Play))
        );
    }

    #[test]
    fn test_parse_unknown_token_yields_none() {
        assert_eq!(parse_token("FOO"), None);
    }

    #[test]
    fn test_parse_empty_token_yields_none() {
        assert_eq!(parse_token(""), None);
    }

    #[test]
    fn test_parse_alive_is_liveness_not_command() {
        assert_eq!(parse_token("ALIVE"), Some(InboundToken::Alive));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(parse_token("play"), None);
    }

    #[test]
    fn test_every_command_token_parses_back_to_itself() {
        for cmd in MediaCommand::ALL {
            assert_eq!(parse_token(cmd.as_token()), Some(InboundToken::Command(cmd)));
        }
    }

    #[test]
    fn test_partial_token_is_not_accepted() {
        // The old firmware sent a bare "VOL"; it is no longer part of the vocabulary.
        assert_eq!(parse_token("VOL"), None);
        assert_eq!(parse_token("PLAYING"), None);
    }

    #[test]
    fn test_decode_line_trims_crlf() {
        assert_eq!(decode_line(b"SKIP_NEXT\r\n").as_deref(), Some("SKIP_NEXT"));
    }

    #[test]
    fn test_decode_line_rejects_undecodable_bytes_without_panicking() {
        // Arrange: 0xFF / 0xFE are never valid UTF-8
        let raw = [0xFF, 0xFE, b'\n'];

        // Act / Assert
        assert_eq!(decode_line(&raw), None);
    }

    #[test]
    fn test_garbled_line_containing_a_token_yields_no_command() {
        let decoded = decode_line(&[0xC3, b'P', b'L', b'A', b'Y']);
        assert!(decoded.and_then(|t| parse_token(&t)).is_none());
    }

    #[test]
    fn test_volume_step_classification() {
        assert!(MediaCommand::VolUp.is_volume_step());
        assert!(MediaCommand::VolDown.is_volume_step());
        assert!(!MediaCommand::Mute.is_volume_step());
    }

    #[test]
    fn test_display_matches_wire_token() {
        assert_eq!(MediaCommand::SkipPrev.to_string(), "SKIP_PREV");
    }
}
