//! Host-side action sinks.
//!
//! - **`logging`** – `LoggingCommandSink`, the sink wired into the binary: it
//!   reports every action through `tracing`.
//! - **`volume`** – `VolumeControl`, an absolute master-volume [`LevelSink`]
//!   whose platform endpoint is activated in the background.
//! - **`mock`** – recording sinks for tests.
//!
//! [`LevelSink`]: crate::application::dispatch::LevelSink

pub mod logging;
pub mod mock;
pub mod volume;

pub use logging::LoggingCommandSink;
pub use volume::{LoggingVolumeEndpoint, VolumeControl, VolumeEndpoint};
