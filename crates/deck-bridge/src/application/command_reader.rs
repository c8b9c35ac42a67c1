//! Command Reader: turns inbound serial lines into typed events.
//!
//! Two device firmwares exist:
//!
//! - **single** – one token per line (`PLAY`, `VOL_UP`, ...).
//! - **panel** – one `|`-separated line of analog readings per scan, switches
//!   first, sliders last.
//!
//! In both modes an `ALIVE` line is consumed as a heartbeat answer and never
//! forwarded.  When the link comes back after a disconnect the reader emits
//! [`InboundEvent::LinkRestored`] ahead of the first new line, so readings
//! from before the drop are never paired with readings after it.  Anything that does not decode is dropped with a warning; the
//! reader never fails because of bad input.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deck_core::protocol::command::{
    decode_line, parse_token, InboundToken, MediaCommand, ALIVE_TOKEN,
};
use deck_core::protocol::panel::PanelSnapshot;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::application::shutdown::ShutdownSignal;
use crate::application::transport::TransportManager;

/// Which line format the device speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// One command token per line.
    Single,
    /// One line of `fields` readings per scan.
    Panel { fields: usize },
}

/// A decoded inbound line that carries work for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Command(MediaCommand),
    Panel(PanelSnapshot),
    /// The device was reconnected; earlier readings no longer apply.
    LinkRestored,
}

/// What one line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedLine {
    /// Forward to the dispatcher.
    Event(InboundEvent),
    /// Heartbeat answer.
    Alive,
    /// Blank, undecodable or unknown; already logged.
    Ignored,
}

/// Decodes one raw line according to `mode`.
pub fn decode_inbound(raw: &[u8], mode: InputMode) -> DecodedLine {
    let Some(text) = decode_line(raw) else {
        warn!(bytes = raw.len(), "discarding undecodable serial line");
        return DecodedLine::Ignored;
    };
    if text.is_empty() {
        return DecodedLine::Ignored;
    }
    if text == ALIVE_TOKEN {
        return DecodedLine::Alive;
    }

    match mode {
        InputMode::Single => match parse_token(&text) {
            Some(InboundToken::Command(command)) => {
                DecodedLine::Event(InboundEvent::Command(command))
            }
            Some(InboundToken::Alive) => DecodedLine::Alive,
            None => {
                warn!(line = %text, "received invalid command");
                DecodedLine::Ignored
            }
        },
        InputMode::Panel { fields } => match PanelSnapshot::parse(&text, fields) {
            Ok(snapshot) => DecodedLine::Event(InboundEvent::Panel(snapshot)),
            Err(e) => {
                warn!(line = %text, "discarding panel line: {e}");
                DecodedLine::Ignored
            }
        },
    }
}

/// Reader pacing and line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSettings {
    pub mode: InputMode,
    /// Pause when no line was available or the link is down.
    pub idle_interval: Duration,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            mode: InputMode::Single,
            idle_interval: Duration::from_millis(10),
        }
    }
}

/// Reads lines from the shared link and forwards events on a channel.
pub struct CommandReader {
    transport: Arc<TransportManager>,
    settings: ReaderSettings,
    events: mpsc::Sender<InboundEvent>,
    /// Last connection count seen; zero before the first connect.
    seen_connection: AtomicU64,
}

impl CommandReader {
    pub fn new(
        transport: Arc<TransportManager>,
        settings: ReaderSettings,
        events: mpsc::Sender<InboundEvent>,
    ) -> Self {
        Self {
            transport,
            settings,
            events,
            seen_connection: AtomicU64::new(0),
        }
    }

    /// Reports whether the link was reopened since the last call.  The first
    /// connect only primes the counter.
    fn link_restored(&self) -> bool {
        let current = self.transport.connection_count();
        let previous = self.seen_connection.swap(current, Ordering::AcqRel);
        previous != 0 && previous != current
    }

    /// Reads at most one line and returns the event it carried.
    ///
    /// Returns `None` when the link is down, no line was available, or the
    /// line carried no event.  An `ALIVE` line is reported to the transport.
    /// The first call after a reconnect returns [`InboundEvent::LinkRestored`].
    pub async fn read_command(&self) -> Option<InboundEvent> {
        if !self.transport.is_connected() {
            return None;
        }
        if self.link_restored() {
            return Some(InboundEvent::LinkRestored);
        }
        let raw = match self.transport.read_line().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!("serial read failed: {e}");
                return None;
            }
        };
        match decode_inbound(&raw, self.settings.mode) {
            DecodedLine::Event(event) => Some(event),
            DecodedLine::Alive => {
                self.transport.mark_alive();
                None
            }
            DecodedLine::Ignored => None,
        }
    }

    /// Runs until `shutdown` fires or the dispatcher goes away.
    pub async fn run(self, shutdown: ShutdownSignal) {
        info!(mode = ?self.settings.mode, "command reader started");
        while shutdown.is_running() {
            match self.read_command().await {
                Some(event) => {
                    debug!(?event, "inbound event");
                    if self.events.send(event).await.is_err() {
                        debug!("dispatcher channel closed");
                        break;
                    }
                }
                None => {
                    shutdown.sleep(self.settings.idle_interval).await;
                }
            }
        }
        info!("command reader stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::transport::TransportSettings;
    use crate::infrastructure::serial::mock::{MockPortBackend, PortScript};

    async fn connected(script: &PortScript) -> Arc<TransportManager> {
        let backend =
            Arc::new(MockPortBackend::with_script(script.clone()).with_port("COM3", "USB"));
        let transport = Arc::new(TransportManager::new(backend, TransportSettings::default()));
        assert!(transport.connect().await);
        transport
    }

    #[test]
    fn test_single_mode_decodes_known_tokens() {
        assert_eq!(
            decode_inbound(b"SKIP_PREV\r\n", InputMode::Single),
            DecodedLine::Event(InboundEvent::Command(MediaCommand::SkipPrev))
        );
    }

    #[test]
    fn test_unknown_and_blank_lines_are_ignored() {
        assert_eq!(decode_inbound(b"REBOOT\n", InputMode::Single), DecodedLine::Ignored);
        assert_eq!(decode_inbound(b"\r\n", InputMode::Single), DecodedLine::Ignored);
        assert_eq!(decode_inbound(b"play\n", InputMode::Single), DecodedLine::Ignored);
    }

    #[test]
    fn test_undecodable_bytes_are_ignored() {
        assert_eq!(
            decode_inbound(&[0xFF, b'P', b'L', b'A', b'Y', b'\n'], InputMode::Single),
            DecodedLine::Ignored
        );
    }

    #[test]
    fn test_alive_is_liveness_in_both_modes() {
        assert_eq!(decode_inbound(b"ALIVE\n", InputMode::Single), DecodedLine::Alive);
        assert_eq!(
            decode_inbound(b"ALIVE\n", InputMode::Panel { fields: 6 }),
            DecodedLine::Alive
        );
    }

    #[test]
    fn test_panel_mode_parses_and_rejects_wrong_shape() {
        // Arrange
        let mode = InputMode::Panel { fields: 3 };

        // Act
        let good = decode_inbound(b"4095|12|2047\n", mode);
        let short = decode_inbound(b"4095|12\n", mode);
        let junk = decode_inbound(b"4095|x|2047\n", mode);

        // Assert
        match good {
            DecodedLine::Event(InboundEvent::Panel(snapshot)) => {
                assert_eq!(snapshot.readings(), &[4095, 12, 2047]);
            }
            other => panic!("expected panel event, got {other:?}"),
        }
        assert_eq!(short, DecodedLine::Ignored);
        assert_eq!(junk, DecodedLine::Ignored);
    }

    #[tokio::test]
    async fn test_read_command_marks_alive_and_skips_it() {
        // Arrange
        let script = PortScript::new();
        script.push_line(b"ALIVE\n");
        script.push_line(b"MUTE\n");
        let transport = connected(&script).await;
        let (tx, _rx) = mpsc::channel(4);
        let reader = CommandReader::new(Arc::clone(&transport), ReaderSettings::default(), tx);

        // Act
        let first = reader.read_command().await;
        let second = reader.read_command().await;

        // Assert
        assert_eq!(first, None);
        assert!(transport.status().heartbeat_ok);
        assert_eq!(second, Some(InboundEvent::Command(MediaCommand::Mute)));
    }

    #[tokio::test]
    async fn test_reconnect_is_reported_once_before_new_lines() {
        // Arrange
        let script = PortScript::new();
        let transport = connected(&script).await;
        let (tx, _rx) = mpsc::channel(4);
        let reader = CommandReader::new(Arc::clone(&transport), ReaderSettings::default(), tx);
        let before = reader.read_command().await;

        // Act
        assert!(transport.connect().await);
        script.push_line(b"MUTE\n");
        let first = reader.read_command().await;
        let second = reader.read_command().await;

        // Assert
        assert_eq!(before, None);
        assert_eq!(first, Some(InboundEvent::LinkRestored));
        assert_eq!(second, Some(InboundEvent::Command(MediaCommand::Mute)));
    }

    #[tokio::test]
    async fn test_read_command_while_unconnected_returns_none() {
        let backend = Arc::new(MockPortBackend::new());
        let transport = Arc::new(TransportManager::new(backend, TransportSettings::default()));
        let (tx, _rx) = mpsc::channel(4);
        let reader = CommandReader::new(transport, ReaderSettings::default(), tx);

        assert_eq!(reader.read_command().await, None);
    }

    #[tokio::test]
    async fn test_run_forwards_events_in_order() {
        // Arrange
        let script = PortScript::new();
        for line in [&b"PLAY\n"[..], b"GARBAGE\n", b"VOL_UP\n"] {
            script.push_line(line);
        }
        let transport = connected(&script).await;
        let (tx, mut rx) = mpsc::channel(4);
        let shutdown = ShutdownSignal::new();
        let reader = CommandReader::new(transport, ReaderSettings::default(), tx);
        let task = tokio::spawn(reader.run(shutdown.clone()));

        // Act
        let first = rx.recv().await;
        let second = rx.recv().await;
        shutdown.stop();
        task.await.unwrap();

        // Assert
        assert_eq!(first, Some(InboundEvent::Command(MediaCommand::Play)));
        assert_eq!(second, Some(InboundEvent::Command(MediaCommand::VolUp)));
    }
}
