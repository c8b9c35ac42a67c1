//! Serial port adapters implementing [`PortBackend`](crate::application::transport::PortBackend).
//!
//! - **`native`** – real USB serial ports through the `serialport` crate.
//! - **`mock`** – scripted in-memory device used by unit and integration tests.

pub mod mock;
pub mod native;

pub use native::NativeSerialBackend;
