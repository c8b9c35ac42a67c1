//! Infrastructure layer: OS-facing adapters.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `deck_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`serial`** – `NativeSerialBackend` over the `serialport` crate, plus
//!   a scripted in-memory backend for tests.
//! - **`media`** – media session sources and the default card renderer.
//! - **`sink`** – host action sinks (media keys, master volume).
//! - **`storage`** – the TOML configuration file.

pub mod media;
pub mod serial;
pub mod sink;
pub mod storage;
