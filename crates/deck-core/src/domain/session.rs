//! Session tracking: decides when the "now playing" card must be re-sent.
//!
//! # State machine
//!
//! ```text
//!             observe(Some(A))                observe(Some(B)), B != A
//!  NoTrack ───────────────────▶ HasTrack(A) ─────────────────────────▶ HasTrack(B)
//!     ▲                            │  ▲  │
//!     │        observe(None)       │  └──┘ observe(Some(A))  (no event)
//!     └────────────────────────────┘
//! ```
//!
//! Only a change of *title* produces a [`Transition`].  Re-observing the same
//! title, even with a different artist or thumbnail flag, is a no-op; this is
//! what keeps the bridge from re-sending the same image every poll.

use serde::{Deserialize, Serialize};

/// Default maximum caption length in characters.
pub const DEFAULT_CAPTION_LIMIT: usize = 25;

/// What the media capability reported on one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub title: String,
    pub artist: String,
    pub has_thumbnail: bool,
}

impl TrackSnapshot {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, has_thumbnail: bool) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            has_thumbnail,
        }
    }
}

/// Last observed now-playing state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing is playing, or the capability is unavailable.
    #[default]
    NoTrack,
    /// A track with the given properties is playing.
    HasTrack {
        title: String,
        artist: String,
        has_thumbnail: bool,
    },
}

impl SessionState {
    /// Current title, if any.
    pub fn title(&self) -> Option<&str> {
        match self {
            SessionState::NoTrack => None,
            SessionState::HasTrack { title, .. } => Some(title),
        }
    }
}

/// A title change detected by [`SessionTracker::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A different track started playing.
    NewTrack(TrackSnapshot),
    /// The session went away.
    Cleared,
}

/// Tracks the observed title across polls.
#[derive(Debug, Default)]
pub struct SessionTracker {
    state: SessionState,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Feeds one poll result and returns the transition it caused, if any.
    pub fn observe(&mut self, snapshot: Option<TrackSnapshot>) -> Option<Transition> {
        let Some(snap) = snapshot else {
            if self.state == SessionState::NoTrack {
                return None;
            }
            self.state = SessionState::NoTrack;
            return Some(Transition::Cleared);
        };

        if self.state.title() == Some(snap.title.as_str()) {
            return None;
        }

        self.state = SessionState::HasTrack {
            title: snap.title.clone(),
            artist: snap.artist.clone(),
            has_thumbnail: snap.has_thumbnail,
        };
        Some(Transition::NewTrack(snap))
    }

    /// Drops back to [`SessionState::NoTrack`] without reporting a transition.
    ///
    /// Used when the capability fails: the failure is treated as "nothing
    /// playing", so the next successful poll of the same title fires again.
    pub fn reset(&mut self) {
        self.state = SessionState::NoTrack;
    }
}

/// Truncates a caption to at most `limit` characters.
///
/// Counts `char`s, not bytes, so multi-byte titles are never split mid
/// character.
pub fn truncate_caption(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn track(title: &str) -> Option<TrackSnapshot> {
        Some(TrackSnapshot::new(title, "artist", true))
    }

    #[test]
    fn test_transfers_fire_once_per_title_run() {
        // Arrange
        let mut tracker = SessionTracker::new();
        let titles = ["A", "A", "B", "B", "B", "A"];

        // Act
        let fired: Vec<usize> = titles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| match tracker.observe(track(t)) {
                Some(Transition::NewTrack(_)) => Some(i),
                _ => None,
            })
            .collect();

        // Assert
        assert_eq!(fired, vec![0, 2, 5]);
    }

    #[test]
    fn test_no_session_to_no_session_is_silent() {
        let mut tracker = SessionTracker::new();
        assert_eq!(tracker.observe(None), None);
        assert_eq!(tracker.state(), &SessionState::NoTrack);
    }

    #[test]
    fn test_session_ending_reports_cleared() {
        let mut tracker = SessionTracker::new();
        tracker.observe(track("A"));
        assert_eq!(tracker.observe(None), Some(Transition::Cleared));
        assert_eq!(tracker.state().title(), None);
    }

    #[test]
    fn test_same_title_after_clear_fires_again() {
        let mut tracker = SessionTracker::new();
        tracker.observe(track("A"));
        tracker.observe(None);
        assert!(matches!(tracker.observe(track("A")), Some(Transition::NewTrack(_))));
    }

    #[test]
    fn test_artist_change_alone_is_not_a_transition() {
        let mut tracker = SessionTracker::new();
        tracker.observe(Some(TrackSnapshot::new("A", "one", true)));
        assert_eq!(tracker.observe(Some(TrackSnapshot::new("A", "two", true))), None);
    }

    #[test]
    fn test_reset_rearms_same_title() {
        // Arrange
        let mut tracker = SessionTracker::new();
        tracker.observe(track("A"));

        // Act
        tracker.reset();

        // Assert
        assert_eq!(tracker.state(), &SessionState::NoTrack);
        assert!(tracker.observe(track("A")).is_some());
    }

    #[test]
    fn test_new_track_carries_snapshot() {
        let mut tracker = SessionTracker::new();
        let snap = TrackSnapshot::new("Song", "Band", false);
        assert_eq!(
            tracker.observe(Some(snap.clone())),
            Some(Transition::NewTrack(snap))
        );
    }

    #[test]
    fn test_truncate_caption_limits_characters() {
        let long = "What's My Car Collection and More";
        assert_eq!(truncate_caption(long, DEFAULT_CAPTION_LIMIT).chars().count(), 25);
        assert_eq!(truncate_caption("short", DEFAULT_CAPTION_LIMIT), "short");
    }

    #[test]
    fn test_truncate_caption_respects_char_boundaries() {
        assert_eq!(truncate_caption("ééé", 2), "éé");
    }
}
