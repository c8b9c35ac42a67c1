//! Command sink that reports actions through `tracing`.

use deck_core::protocol::command::MediaCommand;
use tracing::info;

use crate::application::dispatch::{CommandSink, SinkError};

/// Logs each action at `info` instead of injecting it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingCommandSink;

impl LoggingCommandSink {
    pub fn new() -> Self {
        Self
    }
}

impl CommandSink for LoggingCommandSink {
    fn dispatch(&self, command: MediaCommand) -> Result<(), SinkError> {
        info!(%command, "media action");
        Ok(())
    }
}
