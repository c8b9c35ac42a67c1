//! Persistent storage for the bridge.
//!
//! - **`config`** – TOML configuration file: schema, defaults, validation,
//!   and conversion to the runtime [`BridgeSettings`].
//!
//! [`BridgeSettings`]: crate::application::coordinator::BridgeSettings

pub mod config;
