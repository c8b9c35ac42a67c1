//! Session Watcher: follows the desktop's now-playing session and pushes a
//! card to the display whenever the title changes.
//!
//! # One tick
//!
//! ```text
//! MediaSource::current ──▶ SessionTracker::observe
//!        │ error / timeout          │ NewTrack(snapshot)
//!        ▼                          ▼
//!   tracker.reset()        thumbnail? ─no──▶ log, done
//!                                   │ yes
//!                                   ▼
//!                         Renderer::render (blocking pool)
//!                                   │
//!                         link connected? ─no──▶ skipped
//!                                   │ yes
//!                                   ▼
//!                         ImageTransfer::send
//! ```
//!
//! The media query runs under its own timeout, so a stalled session manager
//! only delays this loop, never the reader or the supervisor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deck_core::domain::session::{
    truncate_caption, SessionTracker, TrackSnapshot, Transition, DEFAULT_CAPTION_LIMIT,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::shutdown::ShutdownSignal;
use crate::application::transfer::{ImageTransfer, TransferOutcome};
use crate::application::transport::TransportManager;

/// Default cap on the thumbnail read.
pub const DEFAULT_THUMBNAIL_LIMIT: usize = 5_000_000;

/// Errors from the media session capability.
#[derive(Debug, Error)]
pub enum MediaError {
    /// No session manager or media API is available.
    #[error("media session capability unavailable: {0}")]
    Unavailable(String),
    /// The query took longer than allowed.
    #[error("media session query timed out after {0:?}")]
    Timeout(Duration),
    /// The thumbnail stream could not be read.
    #[error("thumbnail read failed: {0}")]
    Thumbnail(String),
}

/// Errors from the external render step.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render failed: {0}")]
    Failed(String),
    #[error("render worker failed: {0}")]
    Worker(String),
}

/// The host's current-media-session API.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// The track currently playing, or `None` when nothing is.
    async fn current(&self) -> Result<Option<TrackSnapshot>, MediaError>;

    /// The current track's thumbnail, read up to `limit` bytes.
    async fn thumbnail(&self, limit: usize) -> Result<Option<Vec<u8>>, MediaError>;
}

/// Composes thumbnail and captions into the JPEG card the display shows.
#[cfg_attr(test, mockall::automock)]
pub trait Renderer: Send + Sync {
    fn render(&self, thumbnail: &[u8], title: &str, artist: &str) -> Result<Vec<u8>, RenderError>;
}

/// Watcher pacing and limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    pub poll_interval: Duration,
    /// Upper bound for one media query.
    pub query_timeout: Duration,
    pub caption_limit: usize,
    pub thumbnail_limit: usize,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            query_timeout: Duration::from_secs(5),
            caption_limit: DEFAULT_CAPTION_LIMIT,
            thumbnail_limit: DEFAULT_THUMBNAIL_LIMIT,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// No title change.
    Unchanged,
    /// The session ended.
    Cleared,
    /// The capability failed; state went back to "nothing playing".
    SourceFailed,
    /// New title, but no thumbnail to show.
    NoThumbnail,
    /// Rendering failed; nothing was sent.
    RenderFailed,
    /// Rendered, but the display is not connected.
    Skipped,
    /// The transfer ran.
    Transferred(TransferOutcome),
    /// The link failed mid-transfer.
    TransferFailed,
}

/// Polls the media session and triggers transfers on title changes.
pub struct SessionWatcher {
    media: Arc<dyn MediaSource>,
    renderer: Arc<dyn Renderer>,
    transport: Arc<TransportManager>,
    transfer: ImageTransfer,
    tracker: SessionTracker,
    settings: WatcherSettings,
}

impl SessionWatcher {
    pub fn new(
        media: Arc<dyn MediaSource>,
        renderer: Arc<dyn Renderer>,
        transport: Arc<TransportManager>,
        transfer: ImageTransfer,
        settings: WatcherSettings,
    ) -> Self {
        Self {
            media,
            renderer,
            transport,
            transfer,
            tracker: SessionTracker::new(),
            settings,
        }
    }

    /// Polls once and acts on the result.
    pub async fn tick(&mut self) -> WatchOutcome {
        let polled = tokio::time::timeout(self.settings.query_timeout, self.media.current())
            .await
            .unwrap_or(Err(MediaError::Timeout(self.settings.query_timeout)));

        let snapshot = match polled {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if self.tracker.state().title().is_some() {
                    warn!("media session query failed: {e}");
                } else {
                    debug!("media session query failed: {e}");
                }
                self.tracker.reset();
                return WatchOutcome::SourceFailed;
            }
        };

        match self.tracker.observe(snapshot) {
            None => WatchOutcome::Unchanged,
            Some(Transition::Cleared) => {
                info!("media session ended");
                WatchOutcome::Cleared
            }
            Some(Transition::NewTrack(track)) => self.on_new_track(track).await,
        }
    }

    async fn on_new_track(&self, track: TrackSnapshot) -> WatchOutcome {
        info!(title = %track.title, artist = %track.artist, "now playing");
        if !track.has_thumbnail {
            info!(title = %track.title, "track has no thumbnail; nothing to send");
            return WatchOutcome::NoThumbnail;
        }

        let fetched = tokio::time::timeout(
            self.settings.query_timeout,
            self.media.thumbnail(self.settings.thumbnail_limit),
        )
        .await
        .unwrap_or(Err(MediaError::Timeout(self.settings.query_timeout)));
        let limit = self.settings.thumbnail_limit;
        let thumbnail = match fetched {
            Ok(Some(mut bytes)) if !bytes.is_empty() => {
                if bytes.len() > limit {
                    warn!(bytes = bytes.len(), limit, "thumbnail over the read limit; truncating");
                    bytes.truncate(limit);
                }
                bytes
            }
            Ok(_) => {
                info!(title = %track.title, "thumbnail is empty; nothing to send");
                return WatchOutcome::NoThumbnail;
            }
            Err(e) => {
                warn!(title = %track.title, "{e}");
                return WatchOutcome::NoThumbnail;
            }
        };

        let title = truncate_caption(&track.title, self.settings.caption_limit);
        let artist = truncate_caption(&track.artist, self.settings.caption_limit);

        let image = match self.render(thumbnail, &title, &artist).await {
            Ok(image) => image,
            Err(e) => {
                warn!(title = %title, "{e}");
                return WatchOutcome::RenderFailed;
            }
        };

        if !self.transport.is_connected() {
            debug!(title = %title, "display not connected; card not sent");
            return WatchOutcome::Skipped;
        }

        match self.transfer.send(image, &title, &artist).await {
            Ok(outcome) => WatchOutcome::Transferred(outcome),
            Err(e) => {
                warn!(title = %title, "image transfer failed: {e}");
                WatchOutcome::TransferFailed
            }
        }
    }

    async fn render(
        &self,
        thumbnail: Vec<u8>,
        title: &str,
        artist: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let renderer = Arc::clone(&self.renderer);
        let title = title.to_string();
        let artist = artist.to_string();
        tokio::task::spawn_blocking(move || renderer.render(&thumbnail, &title, &artist))
            .await
            .map_err(|e| RenderError::Worker(e.to_string()))?
    }

    /// Ticks every `poll_interval` until `shutdown` fires.
    pub async fn run(mut self, shutdown: ShutdownSignal) {
        info!(interval = ?self.settings.poll_interval, "session watcher started");
        while shutdown.is_running() {
            self.tick().await;
            shutdown.sleep(self.settings.poll_interval).await;
        }
        info!("session watcher stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
