//! # deck-core
//!
//! Shared library for the now-playing deck bridge containing the serial wire
//! protocol, the closed inbound command vocabulary, panel telemetry decoding,
//! and the session-tracking state machine.
//!
//! It has zero dependencies on OS APIs, serial drivers, or async runtimes, so
//! every rule in here can be unit-tested on any machine.
//!
//! # Architecture overview
//!
//! The bridge sits between a desktop media session and a small display device
//! connected over USB serial.  Data flows in two directions:
//!
//! - **Outbound**: whenever the playing track changes, a rendered "now playing"
//!   card is sent to the device as a length-prefixed frame (see
//!   [`protocol::frame`]) gated by two acknowledgment lines (see
//!   [`protocol::markers`]).
//!
//! - **Inbound**: the device sends newline-terminated text lines, either one
//!   command token per line (`PLAY`, `VOL_UP`, …) or `|`-delimited raw panel
//!   readings (see [`protocol::command`] and [`protocol::panel`]).
//!
//! The [`domain`] module holds the pure state that decides *when* a transfer
//! happens: [`domain::session::SessionTracker`] fires exactly once per title
//! change.

pub mod domain;
pub mod protocol;

pub use domain::session::{SessionState, SessionTracker, TrackSnapshot, Transition};
pub use protocol::command::{parse_token, InboundToken, MediaCommand};
pub use protocol::frame::{decode_length_prefix, encode_frame, encode_length_prefix, FrameError};
pub use protocol::poll::{poll_until, PollWindow};
