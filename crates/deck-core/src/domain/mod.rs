//! Domain logic for the bridge.
//!
//! Pure state with no I/O: the session tracker that decides when a new card
//! must be sent, caption shaping, and the volume attenuation table.

pub mod session;
pub mod volume;
