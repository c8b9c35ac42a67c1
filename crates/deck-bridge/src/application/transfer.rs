//! Image Transfer Protocol: pushes one rendered card to the display.
//!
//! # Handshake
//!
//! ```text
//! host                                   device
//!  │── 4-byte little-endian length ───────▶│
//!  │◀──────────────── line containing "A" ─│   (ack window, default 5 s)
//!  │── payload bytes ─────────────────────▶│
//!  │◀──────────────── line containing "D" ─│   (done window, default 4 s)
//! ```
//!
//! The two waits are not symmetric.  A missing acknowledgment aborts the
//! transfer before any payload byte is written.  A missing completion marker
//! only produces a warning: the payload has already left, so the transfer is
//! counted as sent.
//!
//! The whole handshake runs under one [`TransportManager::with_link`] call, so
//! no other reader or writer can touch the port in between.  Every other
//! inbound line that arrives while waiting (commands and panel scans alike)
//! is set aside for the Command Reader, and `ALIVE` lines still count as
//! heartbeat answers.

use std::sync::Arc;
use std::time::Duration;

use deck_core::protocol::command::{decode_line, InboundToken};
use deck_core::protocol::frame::{encode_length_prefix, FrameError};
use deck_core::protocol::markers::{
    classify, HandshakeLine, DEFAULT_ACK_MARKER, DEFAULT_DONE_MARKER,
};
use deck_core::protocol::poll::{poll_until, PollWindow};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::transport::{Link, TransportError, TransportManager};

/// Errors that abort a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The image cannot be described by the 4-byte length prefix.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    /// The link failed mid-handshake and has been closed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// How a transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Acknowledged and completed.
    Delivered,
    /// Acknowledged, payload written, but no completion marker arrived.
    SentUnconfirmed,
    /// No acknowledgment; the payload was never written.
    NotAcknowledged,
    /// The link was down when the transfer started.
    NotConnected,
}

impl TransferOutcome {
    /// `true` if the payload went out on the wire.
    pub fn payload_sent(self) -> bool {
        matches!(self, Self::Delivered | Self::SentUnconfirmed)
    }
}

/// Markers and wait windows for the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSettings {
    pub ack_marker: String,
    pub done_marker: String,
    pub ack_window: PollWindow,
    pub done_window: PollWindow,
}

impl Default for TransferSettings {
    fn default() -> Self {
        let interval = Duration::from_millis(50);
        Self {
            ack_marker: DEFAULT_ACK_MARKER.to_string(),
            done_marker: DEFAULT_DONE_MARKER.to_string(),
            ack_window: PollWindow::new(Duration::from_secs(5), interval),
            done_window: PollWindow::new(Duration::from_secs(4), interval),
        }
    }
}

/// Sends images over the shared link.
pub struct ImageTransfer {
    transport: Arc<TransportManager>,
    settings: TransferSettings,
}

impl ImageTransfer {
    pub fn new(transport: Arc<TransportManager>, settings: TransferSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Sends `image` using the length-prefixed handshake.
    ///
    /// The captions only label the log lines; they are already baked into the
    /// rendered image.
    ///
    /// # Errors
    ///
    /// [`TransferError::Frame`] if the image is too large for the prefix,
    /// [`TransferError::Transport`] if the link fails mid-handshake.
    pub async fn send(
        &self,
        image: Vec<u8>,
        title: &str,
        artist: &str,
    ) -> Result<TransferOutcome, TransferError> {
        let prefix = encode_length_prefix(image.len())?;
        let size = image.len();
        let settings = self.settings.clone();

        let outcome = self
            .transport
            .with_link(move |link| run_handshake(link, &prefix, &image, &settings))
            .await?;

        match outcome {
            TransferOutcome::Delivered => {
                info!(bytes = size, title, artist, "image delivered to display");
            }
            TransferOutcome::SentUnconfirmed => {
                warn!(
                    bytes = size,
                    title,
                    "no completion marker from display; counting image as sent"
                );
            }
            TransferOutcome::NotAcknowledged => {
                warn!(
                    bytes = size,
                    title,
                    "display did not acknowledge image size; payload not sent"
                );
            }
            TransferOutcome::NotConnected => {
                debug!(title, "display not connected; transfer skipped");
            }
        }
        Ok(outcome)
    }
}

fn run_handshake(
    link: &mut Link,
    prefix: &[u8],
    image: &[u8],
    settings: &TransferSettings,
) -> Result<TransferOutcome, TransferError> {
    if !link.is_connected() {
        return Ok(TransferOutcome::NotConnected);
    }

    link.write_all(prefix)?;
    if !wait_for_marker(link, &settings.ack_marker, settings.ack_window)? {
        return Ok(TransferOutcome::NotAcknowledged);
    }

    link.write_all(image)?;
    if !wait_for_marker(link, &settings.done_marker, settings.done_window)? {
        return Ok(TransferOutcome::SentUnconfirmed);
    }
    Ok(TransferOutcome::Delivered)
}

/// Reads lines until one carries `marker` or the window closes.
fn wait_for_marker(
    link: &mut Link,
    marker: &str,
    window: PollWindow,
) -> Result<bool, TransportError> {
    let found = poll_until(window, || -> Result<Option<()>, TransportError> {
        let Some(raw) = link.read_line()? else {
            return Ok(None);
        };
        let Some(text) = decode_line(&raw) else {
            debug!("ignoring undecodable line during handshake");
            return Ok(None);
        };
        match classify(&text, marker) {
            HandshakeLine::Marker => Ok(Some(())),
            HandshakeLine::Inbound(InboundToken::Alive) => {
                link.mark_alive();
                Ok(None)
            }
            HandshakeLine::Inbound(InboundToken::Command(command)) => {
                debug!(%command, "deferring command received during handshake");
                link.defer_line(raw);
                Ok(None)
            }
            HandshakeLine::Other if text.is_empty() => Ok(None),
            HandshakeLine::Other => {
                debug!(line = %text, "deferring line received during handshake");
                link.defer_line(raw);
                Ok(None)
            }
        }
    })?;
    Ok(found.is_some())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
