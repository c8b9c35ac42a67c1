//! TOML-based configuration for the bridge.
//!
//! Reads and writes [`BridgeConfig`] from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\DeckBridge\config.toml`
//! - Linux:    `~/.config/deckbridge/config.toml`
//! - macOS:    `~/Library/Application Support/DeckBridge/config.toml`
//!
//! Example:
//!
//! ```toml
//! [serial]
//! ports = ["COM3"]
//!
//! [input]
//! mode = "panel"
//! switch_count = 2
//! slider_count = 1
//! controls = [
//!     { kind = "switch", action = "PLAY" },
//!     { kind = "switch", action = "SKIP_NEXT" },
//!     { kind = "slider", action = "master_volume" },
//! ]
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]` and every section
//! `#[serde(default)]`, so a missing file, a missing section or a missing key
//! all fall back to the defaults below.
//!
//! # Validation
//!
//! [`BridgeConfig::validate`] checks shape only: non-zero timings, a control
//! list that matches the declared counts, and actions that name something
//! real.  [`BridgeConfig::to_settings`] validates and converts to the runtime
//! [`BridgeSettings`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use deck_core::domain::session::DEFAULT_CAPTION_LIMIT;
use deck_core::protocol::command::MediaCommand;
use deck_core::protocol::markers::{DEFAULT_ACK_MARKER, DEFAULT_DONE_MARKER};
use deck_core::protocol::panel::{DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD};
use deck_core::protocol::poll::PollWindow;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::command_reader::{InputMode, ReaderSettings};
use crate::application::coordinator::BridgeSettings;
use crate::application::dispatch::{DispatchSettings, PanelControl, PanelLayout, SliderTarget};
use crate::application::session_watcher::{WatcherSettings, DEFAULT_THUMBNAIL_LIMIT};
use crate::application::transfer::TransferSettings;
use crate::application::transport::{LinkSettings, SupervisorSettings, TransportSettings};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config parsed but is not usable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub bridge: GeneralConfig,
}

/// Serial port discovery and line settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Only ports whose hardware descriptor contains this text are tried.
    #[serde(default = "default_hardware_filter")]
    pub hardware_filter: String,
    /// Explicit ports to try, in order, instead of discovery.
    #[serde(default)]
    pub ports: Vec<String>,
    /// Drive DTR/RTS low after opening so the board does not reset.
    #[serde(default = "default_true")]
    pub deassert_control_lines: bool,
}

/// Supervisory loop pacing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupervisorConfig {
    #[serde(default = "default_connect_interval_ms")]
    pub connect_interval_ms: u64,
    #[serde(default = "default_connected_interval_ms")]
    pub connected_interval_ms: u64,
    /// How long a ping may stay unanswered before the link is dropped.
    #[serde(default = "default_silence_window_ms")]
    pub silence_window_ms: u64,
}

/// Image transfer handshake.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferConfig {
    #[serde(default = "default_ack_marker")]
    pub ack_marker: String,
    #[serde(default = "default_done_marker")]
    pub done_marker: String,
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    #[serde(default = "default_done_timeout_ms")]
    pub done_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Maximum caption length in characters.
    #[serde(default = "default_caption_limit")]
    pub caption_limit: usize,
    /// Maximum thumbnail size in bytes.
    #[serde(default = "default_thumbnail_limit")]
    pub thumbnail_limit: usize,
}

/// Media session polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    #[serde(default = "default_session_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

/// Device firmware variant.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputModeConfig {
    #[default]
    Single,
    Panel,
}

/// Kind of a panel control.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Switch,
    Slider,
}

/// One panel control in wire order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlConfig {
    pub kind: ControlKind,
    /// A command token for switches, a slider target for sliders.
    pub action: String,
}

/// Inbound command handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputConfig {
    #[serde(default)]
    pub mode: InputModeConfig,
    #[serde(default = "default_volume_burst")]
    pub volume_burst: usize,
    /// Write `VOL_ACP` after each volume step.
    #[serde(default)]
    pub acknowledge_volume: bool,
    #[serde(default)]
    pub switch_count: usize,
    #[serde(default)]
    pub slider_count: usize,
    #[serde(default)]
    pub controls: Vec<ControlConfig>,
    #[serde(default = "default_press_high_threshold")]
    pub press_high_threshold: u16,
    #[serde(default = "default_press_low_threshold")]
    pub press_low_threshold: u16,
    /// How long a slider waits for the volume endpoint to come up.
    #[serde(default = "default_volume_ready_timeout_ms")]
    pub volume_ready_timeout_ms: u64,
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// How long shutdown waits for each loop.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_baud_rate() -> u32 {
    115_200
}
fn default_read_timeout_ms() -> u64 {
    100
}
fn default_hardware_filter() -> String {
    "USB".to_string()
}
fn default_true() -> bool {
    true
}
fn default_connect_interval_ms() -> u64 {
    3000
}
fn default_connected_interval_ms() -> u64 {
    1000
}
fn default_silence_window_ms() -> u64 {
    5000
}
fn default_ack_marker() -> String {
    DEFAULT_ACK_MARKER.to_string()
}
fn default_done_marker() -> String {
    DEFAULT_DONE_MARKER.to_string()
}
fn default_ack_timeout_ms() -> u64 {
    5000
}
fn default_done_timeout_ms() -> u64 {
    4000
}
fn default_poll_interval_ms() -> u64 {
    50
}
fn default_caption_limit() -> usize {
    DEFAULT_CAPTION_LIMIT
}
fn default_thumbnail_limit() -> usize {
    DEFAULT_THUMBNAIL_LIMIT
}
fn default_session_poll_interval_ms() -> u64 {
    1000
}
fn default_query_timeout_ms() -> u64 {
    5000
}
fn default_volume_burst() -> usize {
    5
}
fn default_press_high_threshold() -> u16 {
    DEFAULT_HIGH_THRESHOLD
}
fn default_press_low_threshold() -> u16 {
    DEFAULT_LOW_THRESHOLD
}
fn default_volume_ready_timeout_ms() -> u64 {
    3000
}
fn default_join_timeout_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            hardware_filter: default_hardware_filter(),
            ports: Vec::new(),
            deassert_control_lines: default_true(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            connect_interval_ms: default_connect_interval_ms(),
            connected_interval_ms: default_connected_interval_ms(),
            silence_window_ms: default_silence_window_ms(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            ack_marker: default_ack_marker(),
            done_marker: default_done_marker(),
            ack_timeout_ms: default_ack_timeout_ms(),
            done_timeout_ms: default_done_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            caption_limit: default_caption_limit(),
            thumbnail_limit: default_thumbnail_limit(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_session_poll_interval_ms(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mode: InputModeConfig::default(),
            volume_burst: default_volume_burst(),
            acknowledge_volume: false,
            switch_count: 0,
            slider_count: 0,
            controls: Vec::new(),
            press_high_threshold: default_press_high_threshold(),
            press_low_threshold: default_press_low_threshold(),
            volume_ready_timeout_ms: default_volume_ready_timeout_ms(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            join_timeout_ms: default_join_timeout_ms(),
            log_level: default_log_level(),
        }
    }
}

// ── Validation and conversion ─────────────────────────────────────────────────

fn parse_slider_target(action: &str) -> Option<SliderTarget> {
    match action {
        "master_volume" => Some(SliderTarget::MasterVolume),
        _ => None,
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

impl BridgeConfig {
    /// Checks the configuration's shape.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timings = [
            ("serial.read_timeout_ms", self.serial.read_timeout_ms),
            ("supervisor.connect_interval_ms", self.supervisor.connect_interval_ms),
            ("supervisor.connected_interval_ms", self.supervisor.connected_interval_ms),
            ("supervisor.silence_window_ms", self.supervisor.silence_window_ms),
            ("transfer.ack_timeout_ms", self.transfer.ack_timeout_ms),
            ("transfer.done_timeout_ms", self.transfer.done_timeout_ms),
            ("transfer.poll_interval_ms", self.transfer.poll_interval_ms),
            ("session.poll_interval_ms", self.session.poll_interval_ms),
            ("session.query_timeout_ms", self.session.query_timeout_ms),
            ("input.volume_ready_timeout_ms", self.input.volume_ready_timeout_ms),
            ("bridge.join_timeout_ms", self.bridge.join_timeout_ms),
        ];
        if let Some((name, _)) = timings.iter().find(|(_, value)| *value == 0) {
            return Err(invalid(format!("{name} must be greater than zero")));
        }
        if self.serial.baud_rate == 0 {
            return Err(invalid("serial.baud_rate must be greater than zero"));
        }
        if self.transfer.ack_marker.is_empty() || self.transfer.done_marker.is_empty() {
            return Err(invalid("transfer markers must not be empty"));
        }
        if self.transfer.caption_limit == 0 || self.transfer.thumbnail_limit == 0 {
            return Err(invalid("transfer limits must be greater than zero"));
        }
        if self.input.volume_burst == 0 {
            return Err(invalid("input.volume_burst must be at least 1"));
        }

        if self.input.mode == InputModeConfig::Panel {
            self.panel_layout()?;
        }
        Ok(())
    }

    /// Builds the panel layout from `[input]`, checking counts and actions.
    fn panel_layout(&self) -> Result<PanelLayout, ConfigError> {
        let input = &self.input;
        let expected = input.switch_count + input.slider_count;
        if expected == 0 {
            return Err(invalid("panel mode needs at least one switch or slider"));
        }
        if input.controls.len() != expected {
            return Err(invalid(format!(
                "input.controls has {} entries but switch_count + slider_count is {expected}",
                input.controls.len()
            )));
        }
        if input.press_low_threshold >= input.press_high_threshold {
            return Err(invalid("input.press_low_threshold must be below press_high_threshold"));
        }

        let mut controls = Vec::with_capacity(expected);
        for (index, control) in input.controls.iter().enumerate() {
            let expected_kind = if index < input.switch_count {
                ControlKind::Switch
            } else {
                ControlKind::Slider
            };
            if control.kind != expected_kind {
                return Err(invalid(format!(
                    "input.controls[{index}] must be a {expected_kind:?} (switches come first)"
                )));
            }
            let parsed = match control.kind {
                ControlKind::Switch => control
                    .action
                    .parse::<MediaCommand>()
                    .map(PanelControl::Switch)
                    .map_err(|e| invalid(format!("input.controls[{index}]: {e}")))?,
                ControlKind::Slider => parse_slider_target(&control.action)
                    .map(PanelControl::Slider)
                    .ok_or_else(|| {
                        invalid(format!(
                            "input.controls[{index}]: unknown slider target {:?}",
                            control.action
                        ))
                    })?,
            };
            controls.push(parsed);
        }

        Ok(PanelLayout {
            controls,
            high_threshold: input.press_high_threshold,
            low_threshold: input.press_low_threshold,
        })
    }

    /// How long sliders wait for the volume endpoint.
    pub fn volume_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.input.volume_ready_timeout_ms)
    }

    /// Validates and converts to runtime settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if [`validate`](Self::validate) fails.
    pub fn to_settings(&self) -> Result<BridgeSettings, ConfigError> {
        self.validate()?;
        let ms = Duration::from_millis;
        let poll_interval = ms(self.transfer.poll_interval_ms);

        let (mode, panel) = match self.input.mode {
            InputModeConfig::Single => (InputMode::Single, None),
            InputModeConfig::Panel => {
                let layout = self.panel_layout()?;
                (
                    InputMode::Panel {
                        fields: layout.controls.len(),
                    },
                    Some(layout),
                )
            }
        };

        Ok(BridgeSettings {
            transport: TransportSettings {
                link: LinkSettings {
                    baud_rate: self.serial.baud_rate,
                    read_timeout: ms(self.serial.read_timeout_ms),
                    deassert_control_lines: self.serial.deassert_control_lines,
                },
                hardware_filter: self.serial.hardware_filter.clone(),
                ports: self.serial.ports.clone(),
                silence_window: ms(self.supervisor.silence_window_ms),
            },
            supervisor: SupervisorSettings {
                connect_interval: ms(self.supervisor.connect_interval_ms),
                connected_interval: ms(self.supervisor.connected_interval_ms),
            },
            transfer: TransferSettings {
                ack_marker: self.transfer.ack_marker.clone(),
                done_marker: self.transfer.done_marker.clone(),
                ack_window: PollWindow::new(ms(self.transfer.ack_timeout_ms), poll_interval),
                done_window: PollWindow::new(ms(self.transfer.done_timeout_ms), poll_interval),
            },
            watcher: WatcherSettings {
                poll_interval: ms(self.session.poll_interval_ms),
                query_timeout: ms(self.session.query_timeout_ms),
                caption_limit: self.transfer.caption_limit,
                thumbnail_limit: self.transfer.thumbnail_limit,
            },
            reader: ReaderSettings {
                mode,
                ..ReaderSettings::default()
            },
            dispatch: DispatchSettings {
                volume_burst: self.input.volume_burst,
                acknowledge_volume: self.input.acknowledge_volume,
            },
            panel,
            join_timeout: ms(self.bridge.join_timeout_ms),
        })
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<BridgeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BridgeConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Loads the config from the platform directory.
///
/// # Errors
///
/// See [`load_config_from`] and [`config_file_path`].
pub fn load_config() -> Result<BridgeConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Writes `config` to `path` as pretty TOML, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &BridgeConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `DeckBridge` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("DeckBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("deckbridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("DeckBridge")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn panel_config() -> BridgeConfig {
        let mut cfg = BridgeConfig::default();
        cfg.input.mode = InputModeConfig::Panel;
        cfg.input.switch_count = 2;
        cfg.input.slider_count = 1;
        cfg.input.controls = vec![
            ControlConfig {
                kind: ControlKind::Switch,
                action: "PLAY".to_string(),
            },
            ControlConfig {
                kind: ControlKind::Switch,
                action: "VOL_UP".to_string(),
            },
            ControlConfig {
                kind: ControlKind::Slider,
                action: "master_volume".to_string(),
            },
        ];
        cfg
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("deck_bridge_test_{}_{name}", std::process::id()))
            .join("config.toml")
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_default_config_matches_documented_values() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.serial.baud_rate, 115_200);
        assert_eq!(cfg.serial.hardware_filter, "USB");
        assert_eq!(cfg.supervisor.silence_window_ms, 5000);
        assert_eq!(cfg.transfer.ack_timeout_ms, 5000);
        assert_eq!(cfg.transfer.done_timeout_ms, 4000);
        assert_eq!(cfg.transfer.caption_limit, 25);
        assert_eq!(cfg.transfer.thumbnail_limit, 5_000_000);
        assert_eq!(cfg.input.volume_burst, 5);
        assert_eq!(cfg.bridge.log_level, "info");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(BridgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: BridgeConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, BridgeConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_given_keys() {
        // Arrange
        let toml_str = r#"
[serial]
ports = ["COM3", "COM4"]

[transfer]
ack_timeout_ms = 1500
"#;

        // Act
        let cfg: BridgeConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.serial.ports, vec!["COM3", "COM4"]);
        assert_eq!(cfg.serial.baud_rate, 115_200);
        assert_eq!(cfg.transfer.ack_timeout_ms, 1500);
        assert_eq!(cfg.transfer.done_timeout_ms, 4000);
    }

    #[test]
    fn test_panel_controls_parse_from_inline_tables() {
        let toml_str = r#"
[input]
mode = "panel"
switch_count = 1
slider_count = 1
controls = [
    { kind = "switch", action = "SKIP_PREV" },
    { kind = "slider", action = "master_volume" },
]
"#;
        let cfg: BridgeConfig = toml::from_str(toml_str).expect("deserialize panel");

        assert_eq!(cfg.input.mode, InputModeConfig::Panel);
        assert_eq!(cfg.input.controls[1].kind, ControlKind::Slider);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result: Result<BridgeConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");
        assert!(result.is_err());
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut cfg = BridgeConfig::default();
        cfg.transfer.ack_timeout_ms = 0;

        let err = cfg.validate().unwrap_err();

        assert!(err.to_string().contains("transfer.ack_timeout_ms"));
    }

    #[test]
    fn test_control_count_mismatch_is_rejected() {
        let mut cfg = panel_config();
        cfg.input.slider_count = 2;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_switch_action_is_rejected() {
        let mut cfg = panel_config();
        cfg.input.controls[0].action = "EJECT".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_slider_before_switches_is_rejected() {
        let mut cfg = panel_config();
        cfg.input.controls.swap(0, 2);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_inverted_thresholds_are_rejected() {
        let mut cfg = panel_config();
        cfg.input.press_low_threshold = 4000;
        cfg.input.press_high_threshold = 100;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_single_mode_ignores_control_list() {
        let mut cfg = panel_config();
        cfg.input.mode = InputModeConfig::Single;
        cfg.input.slider_count = 7;
        assert!(cfg.validate().is_ok());
    }

    // ── Conversion ────────────────────────────────────────────────────────────

    #[test]
    fn test_to_settings_builds_panel_layout() {
        // Arrange
        let cfg = panel_config();

        // Act
        let settings = cfg.to_settings().expect("valid config");

        // Assert
        assert_eq!(settings.reader.mode, InputMode::Panel { fields: 3 });
        let layout = settings.panel.expect("panel layout");
        assert_eq!(
            layout.controls,
            vec![
                PanelControl::Switch(MediaCommand::Play),
                PanelControl::Switch(MediaCommand::VolUp),
                PanelControl::Slider(SliderTarget::MasterVolume),
            ]
        );
    }

    #[test]
    fn test_to_settings_converts_timings() {
        let settings = BridgeConfig::default().to_settings().expect("valid config");

        assert_eq!(settings.transfer.ack_window.timeout, Duration::from_secs(5));
        assert_eq!(settings.transfer.done_window.timeout, Duration::from_secs(4));
        assert_eq!(settings.transfer.ack_window.interval, Duration::from_millis(50));
        assert_eq!(settings.transport.link.read_timeout, Duration::from_millis(100));
        assert_eq!(settings.supervisor.connect_interval, Duration::from_secs(3));
        assert_eq!(settings.join_timeout, Duration::from_secs(2));
        assert_eq!(settings.panel, None);
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");
        assert_eq!(load_config_from(&path).unwrap(), BridgeConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        // Arrange
        let path = temp_path("round_trip");
        let mut cfg = panel_config();
        cfg.serial.ports = vec!["/dev/ttyACM0".to_string()];
        cfg.bridge.log_level = "debug".to_string();

        // Act
        save_config_to(&path, &cfg).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_malformed_file_returns_parse_error() {
        let path = temp_path("malformed");
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).unwrap();
        }
        std::fs::write(&path, "[serial\nbaud_rate = ").unwrap();

        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }
}
