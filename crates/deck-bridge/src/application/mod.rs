//! Application layer: the bridge's use cases and the traits they depend on.
//!
//! # Use cases
//!
//! - **`transport`** – owns the one serial link: discovery, connect,
//!   heartbeat, line I/O, and the supervisory loop.
//! - **`transfer`** – the two-phase image handshake (`A` then `D`).
//! - **`command_reader`** – pulls inbound lines and turns them into events.
//! - **`dispatch`** – turns events into host media actions.
//! - **`session_watcher`** – polls the media session and sends a new card
//!   whenever the track changes.
//! - **`coordinator`** – starts the loops and stops them together.
//! - **`shutdown`** – the stop flag every loop watches.
//!
//! **Dependency rule**: this layer defines traits (`PortBackend`,
//! `MediaSource`, `Renderer`, `CommandSink`, `LevelSink`) and never imports
//! `infrastructure` outside of tests.

pub mod command_reader;
pub mod coordinator;
pub mod dispatch;
pub mod session_watcher;
pub mod shutdown;
pub mod transfer;
pub mod transport;
