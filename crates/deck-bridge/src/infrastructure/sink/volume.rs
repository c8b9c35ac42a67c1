//! Master volume control with background endpoint activation.
//!
//! # Two-phase initialisation (for beginners)
//!
//! Activating an OS audio endpoint can take a while and must happen on a
//! thread that is allowed to block.  [`VolumeControl::initialize`] therefore
//! returns immediately in the *pending* state and activates the endpoint on
//! Tokio's blocking pool.  The result is published through a `watch`
//! channel:
//!
//! ```text
//! Pending ──activate ok──▶ Ready(endpoint)
//!    └─────activate err──▶ Failed(reason)
//! ```
//!
//! `set_level` waits (bounded) for the channel to leave `Pending`, so a
//! slider moved during startup is applied as soon as the endpoint is up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deck_core::domain::volume::level_to_decibels;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::application::dispatch::{LevelSink, SinkError};

/// A platform master-volume endpoint.
pub trait VolumeEndpoint: Send + Sync {
    /// Sets the master level as an attenuation in decibels (0.0 is full volume).
    fn set_master_level_db(&self, decibels: f32) -> Result<(), SinkError>;
}

/// Endpoint used when no platform audio API is wired in: logs the level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingVolumeEndpoint;

impl VolumeEndpoint for LoggingVolumeEndpoint {
    fn set_master_level_db(&self, decibels: f32) -> Result<(), SinkError> {
        info!(decibels, "master volume level");
        Ok(())
    }
}

#[derive(Clone)]
enum Readiness {
    Pending,
    Ready(Arc<dyn VolumeEndpoint>),
    Failed(String),
}

/// Absolute volume control backed by a lazily activated endpoint.
pub struct VolumeControl {
    state: watch::Receiver<Readiness>,
    ready_timeout: Duration,
}

impl VolumeControl {
    /// Starts activating the endpoint in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn initialize<F>(activate: F, ready_timeout: Duration) -> Self
    where
        F: FnOnce() -> Result<Arc<dyn VolumeEndpoint>, SinkError> + Send + 'static,
    {
        let (tx, rx) = watch::channel(Readiness::Pending);
        tokio::task::spawn_blocking(move || {
            let readiness = match activate() {
                Ok(endpoint) => {
                    info!("volume endpoint ready");
                    Readiness::Ready(endpoint)
                }
                Err(e) => {
                    error!("volume endpoint activation failed: {e}");
                    Readiness::Failed(e.to_string())
                }
            };
            tx.send_replace(readiness);
        });
        Self {
            state: rx,
            ready_timeout,
        }
    }

    /// `true` once the endpoint is active.
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), Readiness::Ready(_))
    }

    async fn endpoint(&self) -> Result<Arc<dyn VolumeEndpoint>, SinkError> {
        let mut rx = self.state.clone();
        let settled = tokio::time::timeout(
            self.ready_timeout,
            rx.wait_for(|r| !matches!(r, Readiness::Pending)),
        )
        .await;
        let readiness = match settled {
            Ok(Ok(readiness)) => readiness.clone(),
            Ok(Err(_)) | Err(_) => return Err(SinkError::NotReady),
        };
        match readiness {
            Readiness::Ready(endpoint) => Ok(endpoint),
            Readiness::Failed(reason) => Err(SinkError::Platform(reason)),
            Readiness::Pending => Err(SinkError::NotReady),
        }
    }
}

#[async_trait]
impl LevelSink for VolumeControl {
    async fn set_level(&self, percent: u8) -> Result<(), SinkError> {
        let endpoint = self.endpoint().await?;
        let decibels = level_to_decibels(percent);
        debug!(percent, decibels, "setting master volume");
        endpoint.set_master_level_db(decibels)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
