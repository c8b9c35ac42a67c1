//! deck-bridge library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does deck-bridge do? (for beginners)
//!
//! The *deck* is a small USB display with a few buttons (or a panel of
//! switches and sliders).  It shows album art for whatever is playing on
//! the desktop and sends media commands back.
//!
//! The bridge:
//!
//! 1. Finds the deck among the USB serial ports and keeps the link alive
//!    with `PING`/`ALIVE` heartbeats, reconnecting when it goes quiet.
//! 2. Polls the desktop media session.  When the track changes it renders a
//!    card and sends it with a two-phase handshake: the device answers `A`
//!    before the payload and `D` after it.
//! 3. Reads command tokens (`PLAY`, `VOL_UP`, ...) or panel telemetry from
//!    the device and turns them into host media actions.

/// Application layer: use cases and the traits they depend on.
pub mod application;

/// Infrastructure layer: serial ports, media sources, sinks, config file.
pub mod infrastructure;
