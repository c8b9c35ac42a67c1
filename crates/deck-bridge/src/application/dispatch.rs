//! DispatchUseCase: turns inbound events into media actions.
//!
//! This use case sits at the application layer and delegates to a
//! [`CommandSink`] trait object for the actual key/media injection and to a
//! [`LevelSink`] for absolute volume levels.  The platform implementations
//! live in the infrastructure layer.
//!
//! # Mapping
//!
//! | Event                        | Action                                  |
//! |------------------------------|-----------------------------------------|
//! | `PLAY`, `SKIP_*`, `MUTE`     | one dispatch                            |
//! | `VOL_UP`, `VOL_DOWN`         | `volume_burst` dispatches (default 5)   |
//! | panel switch press edge      | the switch's bound command, as above    |
//! | panel slider moved           | `set_level` with the mapped percent     |

use std::sync::Arc;

use async_trait::async_trait;
use deck_core::protocol::command::MediaCommand;
use deck_core::protocol::panel::{map_slider, EdgeDetector, PanelSnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::command_reader::InboundEvent;

/// Error type for sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("volume endpoint not ready")]
    NotReady,
}

/// Injects one media action into the host.
pub trait CommandSink: Send + Sync {
    /// Performs `command` once.
    fn dispatch(&self, command: MediaCommand) -> Result<(), SinkError>;
}

/// Sets an absolute level in percent.
#[async_trait]
pub trait LevelSink: Send + Sync {
    async fn set_level(&self, percent: u8) -> Result<(), SinkError>;
}

/// What a panel slider controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliderTarget {
    MasterVolume,
}

/// One physical control on the panel, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelControl {
    Switch(MediaCommand),
    Slider(SliderTarget),
}

/// Panel wiring: the controls in wire order plus the press thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLayout {
    pub controls: Vec<PanelControl>,
    pub high_threshold: u16,
    pub low_threshold: u16,
}

/// Dispatch tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// How many times a volume step is repeated.
    pub volume_burst: usize,
    /// Write `VOL_ACP` back to the device after a volume step.
    pub acknowledge_volume: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            volume_burst: 5,
            acknowledge_volume: false,
        }
    }
}

/// What one event caused.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Commands dispatched, each listed once regardless of burst size.
    pub commands: Vec<MediaCommand>,
    /// Levels applied by sliders.
    pub levels: Vec<u8>,
    /// The caller should write the volume acknowledgment to the device.
    pub acknowledge_volume: bool,
}

struct PanelState {
    layout: PanelLayout,
    detector: EdgeDetector,
    last_levels: Vec<Option<u8>>,
    levels: Option<Arc<dyn LevelSink>>,
}

/// The Dispatch use case.
pub struct DispatchUseCase {
    sink: Arc<dyn CommandSink>,
    settings: DispatchSettings,
    panel: Option<PanelState>,
}

impl DispatchUseCase {
    /// Creates a use case for single-token input.
    pub fn new(sink: Arc<dyn CommandSink>, settings: DispatchSettings) -> Self {
        Self {
            sink,
            settings,
            panel: None,
        }
    }

    /// Enables panel handling.  Sliders are ignored when `levels` is `None`.
    pub fn with_panel(mut self, layout: PanelLayout, levels: Option<Arc<dyn LevelSink>>) -> Self {
        let channels = layout.controls.len();
        self.panel = Some(PanelState {
            detector: EdgeDetector::new(channels, layout.high_threshold, layout.low_threshold),
            last_levels: vec![None; channels],
            layout,
            levels,
        });
        self
    }

    /// Dispatches `command`, repeating volume steps `volume_burst` times.
    ///
    /// Returns how many dispatches were made.
    ///
    /// # Errors
    ///
    /// Returns the first [`SinkError`]; remaining repetitions are skipped.
    pub fn handle_command(&self, command: MediaCommand) -> Result<usize, SinkError> {
        let repeats = if command.is_volume_step() {
            self.settings.volume_burst
        } else {
            1
        };
        for _ in 0..repeats {
            self.sink.dispatch(command)?;
        }
        debug!(%command, repeats, "dispatched");
        Ok(repeats)
    }

    /// Handles one inbound event.  Sink failures are logged, not returned.
    pub async fn handle_event(&mut self, event: InboundEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        match event {
            InboundEvent::Command(command) => self.dispatch_logged(command, &mut report),
            InboundEvent::Panel(snapshot) => self.handle_panel(&snapshot, &mut report).await,
            InboundEvent::LinkRestored => self.reset_panel(),
        }
        report
    }

    fn dispatch_logged(&self, command: MediaCommand, report: &mut DispatchReport) {
        match self.handle_command(command) {
            Ok(_) => {
                report.commands.push(command);
                if command.is_volume_step() && self.settings.acknowledge_volume {
                    report.acknowledge_volume = true;
                }
            }
            Err(e) => warn!(%command, "dispatch failed: {e}"),
        }
    }

    fn reset_panel(&mut self) {
        if let Some(panel) = self.panel.as_mut() {
            debug!("link restored; forgetting switch readings");
            panel.detector.reset();
        }
    }

    async fn handle_panel(&mut self, snapshot: &PanelSnapshot, report: &mut DispatchReport) {
        let Some(mut panel) = self.panel.take() else {
            warn!("panel telemetry received but no panel layout is configured");
            return;
        };

        for (channel, (control, reading)) in panel
            .layout
            .controls
            .iter()
            .zip(snapshot.readings())
            .enumerate()
        {
            match *control {
                PanelControl::Switch(command) => {
                    if panel.detector.update(channel, *reading) {
                        debug!(channel, %command, "switch pressed");
                        self.dispatch_logged(command, report);
                    }
                }
                PanelControl::Slider(SliderTarget::MasterVolume) => {
                    let percent = map_slider(*reading);
                    if panel.last_levels[channel] == Some(percent) {
                        continue;
                    }
                    panel.last_levels[channel] = Some(percent);
                    let Some(levels) = panel.levels.as_ref() else {
                        continue;
                    };
                    match levels.set_level(percent).await {
                        Ok(()) => report.levels.push(percent),
                        Err(e) => warn!(channel, percent, "set level failed: {e}"),
                    }
                }
            }
        }

        self.panel = Some(panel);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sink::mock::{RecordingCommandSink, RecordingLevelSink};

    fn use_case(sink: Arc<RecordingCommandSink>, settings: DispatchSettings) -> DispatchUseCase {
        DispatchUseCase::new(sink, settings)
    }

    fn snapshot(line: &str, fields: usize) -> InboundEvent {
        InboundEvent::Panel(PanelSnapshot::parse(line, fields).unwrap())
    }

    #[test]
    fn test_volume_step_is_repeated_burst_times() {
        // Arrange
        let sink = Arc::new(RecordingCommandSink::new());
        let uc = use_case(Arc::clone(&sink), DispatchSettings::default());

        // Act
        let repeats = uc.handle_command(MediaCommand::VolUp).unwrap();

        // Assert
        assert_eq!(repeats, 5);
        assert_eq!(sink.dispatched(), vec![MediaCommand::VolUp; 5]);
    }

    #[test]
    fn test_non_volume_commands_dispatch_once() {
        let sink = Arc::new(RecordingCommandSink::new());
        let uc = use_case(Arc::clone(&sink), DispatchSettings::default());

        for command in [
            MediaCommand::Play,
            MediaCommand::SkipNext,
            MediaCommand::SkipPrev,
            MediaCommand::Mute,
        ] {
            assert_eq!(uc.handle_command(command).unwrap(), 1);
        }

        assert_eq!(sink.dispatched().len(), 4);
    }

    #[test]
    fn test_sink_failure_is_returned() {
        let sink = Arc::new(RecordingCommandSink::failing());
        let uc = use_case(sink, DispatchSettings::default());

        assert!(matches!(
            uc.handle_command(MediaCommand::Play),
            Err(SinkError::Platform(_))
        ));
    }

    #[tokio::test]
    async fn test_volume_ack_is_requested_only_when_enabled() {
        // Arrange
        let sink = Arc::new(RecordingCommandSink::new());
        let settings = DispatchSettings {
            acknowledge_volume: true,
            ..DispatchSettings::default()
        };
        let mut uc = use_case(sink, settings);

        // Act
        let volume = uc.handle_event(InboundEvent::Command(MediaCommand::VolDown)).await;
        let play = uc.handle_event(InboundEvent::Command(MediaCommand::Play)).await;

        // Assert
        assert!(volume.acknowledge_volume);
        assert!(!play.acknowledge_volume);
    }

    #[tokio::test]
    async fn test_failed_dispatch_does_not_request_ack() {
        let sink = Arc::new(RecordingCommandSink::failing());
        let settings = DispatchSettings {
            acknowledge_volume: true,
            ..DispatchSettings::default()
        };
        let mut uc = use_case(sink, settings);

        let report = uc.handle_event(InboundEvent::Command(MediaCommand::VolUp)).await;

        assert_eq!(report, DispatchReport::default());
    }

    #[tokio::test]
    async fn test_panel_press_edges_and_slider_changes() {
        // Arrange
        let sink = Arc::new(RecordingCommandSink::new());
        let levels = Arc::new(RecordingLevelSink::new());
        let layout = PanelLayout {
            controls: vec![
                PanelControl::Switch(MediaCommand::Play),
                PanelControl::Switch(MediaCommand::SkipNext),
                PanelControl::Slider(SliderTarget::MasterVolume),
            ],
            high_threshold: 4000,
            low_threshold: 100,
        };
        let mut uc = use_case(Arc::clone(&sink), DispatchSettings::default())
            .with_panel(layout, Some(levels.clone() as Arc<dyn LevelSink>));

        // Act
        let scans = ["4095|4095|5", "50|4095|5", "40|4095|2047", "4095|20|2047"];
        for line in scans {
            uc.handle_event(snapshot(line, 3)).await;
        }

        // Assert
        assert_eq!(
            sink.dispatched(),
            vec![MediaCommand::Play, MediaCommand::SkipNext]
        );
        assert_eq!(levels.levels(), vec![0, 50]);
    }

    #[tokio::test]
    async fn test_link_restored_forgets_switch_readings() {
        // Arrange
        let sink = Arc::new(RecordingCommandSink::new());
        let layout = PanelLayout {
            controls: vec![PanelControl::Switch(MediaCommand::Mute)],
            high_threshold: 4000,
            low_threshold: 100,
        };
        let mut uc =
            use_case(Arc::clone(&sink), DispatchSettings::default()).with_panel(layout, None);
        uc.handle_event(snapshot("4095", 1)).await;

        // Act
        uc.handle_event(InboundEvent::LinkRestored).await;
        let after_reconnect = uc.handle_event(snapshot("20", 1)).await;
        uc.handle_event(snapshot("4095", 1)).await;
        let real_press = uc.handle_event(snapshot("20", 1)).await;

        // Assert
        assert!(after_reconnect.commands.is_empty());
        assert_eq!(real_press.commands, vec![MediaCommand::Mute]);
        assert_eq!(sink.dispatched(), vec![MediaCommand::Mute]);
    }

    #[tokio::test]
    async fn test_panel_telemetry_without_layout_is_ignored() {
        let sink = Arc::new(RecordingCommandSink::new());
        let mut uc = use_case(Arc::clone(&sink), DispatchSettings::default());

        let report = uc.handle_event(snapshot("4095|10", 2)).await;

        assert_eq!(report, DispatchReport::default());
        assert!(sink.dispatched().is_empty());
    }
}
