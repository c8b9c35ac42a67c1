//! Media session adapters and the default renderer.
//!
//! - [`IdleMediaSource`] – reports "nothing playing" forever.  Wired into the
//!   binary on hosts without a supported media session API.
//! - [`ScriptedMediaSource`] – plays back a queue of poll results; used by tests.
//! - [`PassthroughRenderer`] – sends the thumbnail bytes unchanged, for
//!   sources that already deliver display-ready JPEGs.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use deck_core::domain::session::TrackSnapshot;

use crate::application::session_watcher::{MediaError, MediaSource, RenderError, Renderer};

/// A source with no session, ever.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleMediaSource;

#[async_trait]
impl MediaSource for IdleMediaSource {
    async fn current(&self) -> Result<Option<TrackSnapshot>, MediaError> {
        Ok(None)
    }

    async fn thumbnail(&self, _limit: usize) -> Result<Option<Vec<u8>>, MediaError> {
        Ok(None)
    }
}

/// Replays scripted poll results in order, then reports "nothing playing".
#[derive(Debug, Default)]
pub struct ScriptedMediaSource {
    polls: Mutex<VecDeque<Result<Option<TrackSnapshot>, String>>>,
    thumbnail: Vec<u8>,
}

impl ScriptedMediaSource {
    /// Every track with a thumbnail reports `thumbnail`.
    pub fn new(thumbnail: Vec<u8>) -> Self {
        Self {
            polls: Mutex::new(VecDeque::new()),
            thumbnail,
        }
    }

    fn push(&self, poll: Result<Option<TrackSnapshot>, String>) {
        self.polls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(poll);
    }

    pub fn push_track(&self, track: TrackSnapshot) {
        self.push(Ok(Some(track)));
    }

    pub fn push_idle(&self) {
        self.push(Ok(None));
    }

    /// Queues a capability failure.
    pub fn push_failure(&self, reason: &str) {
        self.push(Err(reason.to_string()));
    }
}

#[async_trait]
impl MediaSource for ScriptedMediaSource {
    async fn current(&self) -> Result<Option<TrackSnapshot>, MediaError> {
        let next = self
            .polls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Ok(track)) => Ok(track),
            Some(Err(reason)) => Err(MediaError::Unavailable(reason)),
            None => Ok(None),
        }
    }

    async fn thumbnail(&self, limit: usize) -> Result<Option<Vec<u8>>, MediaError> {
        if self.thumbnail.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.thumbnail.iter().take(limit).copied().collect()))
    }
}

/// Returns the thumbnail as the rendered card.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughRenderer;

impl Renderer for PassthroughRenderer {
    fn render(
        &self,
        thumbnail: &[u8],
        _title: &str,
        _artist: &str,
    ) -> Result<Vec<u8>, RenderError> {
        if thumbnail.is_empty() {
            return Err(RenderError::Failed("empty thumbnail".to_string()));
        }
        Ok(thumbnail.to_vec())
    }
}
