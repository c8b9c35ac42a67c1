//! Recording sinks for unit and integration tests.
//!
//! Each sink pushes what it receives into a `Mutex<Vec<...>>` so assertions
//! can inspect exactly what was dispatched and in what order.  A failing
//! variant returns [`SinkError::Platform`] from every call to exercise error
//! paths in callers.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use deck_core::protocol::command::MediaCommand;

use crate::application::dispatch::{CommandSink, LevelSink, SinkError};
use crate::infrastructure::sink::volume::VolumeEndpoint;

/// Records every dispatched command.
#[derive(Debug, Default)]
pub struct RecordingCommandSink {
    dispatched: Mutex<Vec<MediaCommand>>,
    should_fail: bool,
}

impl RecordingCommandSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every dispatch fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Commands dispatched so far, one entry per dispatch.
    pub fn dispatched(&self) -> Vec<MediaCommand> {
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CommandSink for RecordingCommandSink {
    fn dispatch(&self, command: MediaCommand) -> Result<(), SinkError> {
        if self.should_fail {
            return Err(SinkError::Platform("mock failure".into()));
        }
        self.dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
        Ok(())
    }
}

/// Records every level set through [`LevelSink`].
#[derive(Debug, Default)]
pub struct RecordingLevelSink {
    levels: Mutex<Vec<u8>>,
}

impl RecordingLevelSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Vec<u8> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LevelSink for RecordingLevelSink {
    async fn set_level(&self, percent: u8) -> Result<(), SinkError> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(percent);
        Ok(())
    }
}

/// Records every decibel level written to the endpoint.
#[derive(Debug, Default)]
pub struct RecordingVolumeEndpoint {
    levels: Mutex<Vec<f32>>,
}

impl RecordingVolumeEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Vec<f32> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl VolumeEndpoint for RecordingVolumeEndpoint {
    fn set_master_level_db(&self, decibels: f32) -> Result<(), SinkError> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(decibels);
        Ok(())
    }
}
