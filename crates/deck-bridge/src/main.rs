//! Deck Bridge entry point.
//!
//! Loads the configuration, wires the infrastructure adapters into a
//! [`Bridge`], and runs until Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! deck-bridge [OPTIONS]
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config dir]
//!   --port <NAME>            Serial port to try; repeat for several
//!   --mode <single|panel>    Device firmware variant
//!   --log-level <LEVEL>      error, warn, info, debug, trace
//!   --write-default-config   Write a default config file and exit
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.  `RUST_LOG`, when set,
//! wins over both for the log filter.
//!
//! | Variable            | Description                         |
//! |---------------------|-------------------------------------|
//! | `DECK_CONFIG`       | Config file path                    |
//! | `DECK_PORT`         | Comma-separated serial ports        |
//! | `DECK_MODE`         | `single` or `panel`                 |
//! | `DECK_LOG_LEVEL`    | Log level                           |
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load BridgeConfig (file + CLI overrides) -> BridgeSettings
//!  └─ Bridge::start()
//!       ├─ supervisor       (connect / heartbeat)
//!       ├─ command reader   -> dispatcher -> LoggingCommandSink / VolumeControl
//!       └─ session watcher  (IdleMediaSource -> PassthroughRenderer -> transfer)
//!  └─ ctrl_c -> Bridge::stop()
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use deck_bridge::application::coordinator::{Bridge, BridgeComponents};
use deck_bridge::application::dispatch::LevelSink;
use deck_bridge::infrastructure::media::{IdleMediaSource, PassthroughRenderer};
use deck_bridge::infrastructure::serial::NativeSerialBackend;
use deck_bridge::infrastructure::sink::{
    LoggingCommandSink, LoggingVolumeEndpoint, VolumeControl, VolumeEndpoint,
};
use deck_bridge::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, BridgeConfig, InputModeConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Device firmware variant, as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Single,
    Panel,
}

impl From<ModeArg> for InputModeConfig {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Single => InputModeConfig::Single,
            ModeArg::Panel => InputModeConfig::Panel,
        }
    }
}

/// Serial bridge between the desktop media session and a now-playing deck.
#[derive(Debug, Parser)]
#[command(
    name = "deck-bridge",
    about = "Serial bridge between the desktop media session and a now-playing display deck",
    version
)]
struct Cli {
    /// Config file to load instead of the platform default.
    #[arg(long, env = "DECK_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port to try instead of USB discovery.  May be repeated.
    #[arg(long = "port", env = "DECK_PORT", value_delimiter = ',')]
    ports: Vec<String>,

    /// Device firmware variant.
    #[arg(long, value_enum, env = "DECK_MODE")]
    mode: Option<ModeArg>,

    /// Log level when `RUST_LOG` is not set.
    #[arg(long, env = "DECK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Write a default config file to the config path and exit.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => {
                config_file_path().context("no --config given and no platform config directory")
            }
        }
    }

    /// Applies command-line overrides on top of the file configuration.
    fn apply_overrides(&self, config: &mut BridgeConfig) {
        if !self.ports.is_empty() {
            config.serial.ports = self.ports.clone();
        }
        if let Some(mode) = self.mode {
            config.input.mode = mode.into();
        }
        if let Some(level) = &self.log_level {
            config.bridge.log_level = level.clone();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = cli.config_path()?;

    if cli.write_default_config {
        save_config_to(&path, &BridgeConfig::default())
            .with_context(|| format!("failed to write default config to {}", path.display()))?;
        println!("wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = load_config_from(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    cli.apply_overrides(&mut config);

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.bridge.log_level)),
        )
        .init();

    let settings = config.to_settings().context("invalid configuration")?;
    info!(
        config = %path.display(),
        mode = ?config.input.mode,
        ports = ?config.serial.ports,
        "deck bridge starting"
    );

    let levels: Option<Arc<dyn LevelSink>> = match config.input.mode {
        InputModeConfig::Panel => Some(Arc::new(VolumeControl::initialize(
            || Ok(Arc::new(LoggingVolumeEndpoint) as Arc<dyn VolumeEndpoint>),
            config.volume_ready_timeout(),
        ))),
        InputModeConfig::Single => None,
    };

    let components = BridgeComponents {
        backend: Arc::new(NativeSerialBackend::new()),
        media: Arc::new(IdleMediaSource),
        renderer: Arc::new(PassthroughRenderer),
        sink: Arc::new(LoggingCommandSink::new()),
        levels,
    };

    let mut bridge = Bridge::start(settings, components);

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => warn!("failed to listen for Ctrl+C, shutting down: {e}"),
    }

    let report = bridge.stop().await;
    if !report.abandoned.is_empty() {
        warn!(tasks = ?report.abandoned, "some tasks were abandoned at shutdown");
    }
    info!("deck bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
