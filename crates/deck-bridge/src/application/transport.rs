//! Transport Manager: sole owner of the serial link to the display device.
//!
//! # Ownership model (for beginners)
//!
//! The open port lives inside a [`Link`] behind one `std::sync::Mutex`.  Every
//! logical operation (a connect, a heartbeat, one line read, a whole image
//! transfer handshake) runs as a single closure on Tokio's blocking pool while
//! holding that lock, so two operations can never interleave bytes on the
//! wire.  Nothing outside this module ever touches the raw port handle.
//!
//! Link *status* (connected, port name, liveness) is mirrored into a second,
//! tiny mutex that is never held across I/O.  That lets the reader and the
//! session watcher ask "are we connected?" without waiting behind a transfer.
//!
//! # Liveness
//!
//! The host writes `PING\n` on every heartbeat.  The device answers with
//! `ALIVE`, which the Command Reader (or a transfer handshake) reports through
//! [`TransportManager::mark_alive`].  If a ping stays unanswered for longer
//! than the silence window the link is declared stale and closed, and the
//! supervisory loop starts rediscovering.
//!
//! # Failure semantics
//!
//! Every I/O failure drops the handle and flips the link to unconnected
//! before the error is returned, so a dead handle is never reused.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use deck_core::protocol::markers::PING_LINE;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::shutdown::ShutdownSignal;

/// Errors raised by the serial link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Discovery found no port worth trying.
    #[error("no candidate serial ports found")]
    NoCandidates,
    /// A candidate port could not be opened or configured.
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },
    /// A read, write or buffer operation failed on the open port.
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),
    /// The operation needs an open link and there is none.
    #[error("serial link is not connected")]
    NotConnected,
    /// The link was closed for good during shutdown.
    #[error("serial link has been shut down")]
    ShutDown,
    /// The blocking worker running the operation panicked or was cancelled.
    #[error("link worker failed: {0}")]
    Worker(String),
}

// ── Port seam ─────────────────────────────────────────────────────────────────

/// Line settings applied when opening a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    /// Upper bound for a single read; keeps every operation short.
    pub read_timeout: Duration,
    /// Drive DTR and RTS low after opening so the device does not reset.
    pub deassert_control_lines: bool,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(100),
            deassert_control_lines: true,
        }
    }
}

/// A serial port found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// OS name used to open the port (`COM3`, `/dev/ttyUSB0`).
    pub name: String,
    /// Hardware descriptor used for filtering (`USB VID:PID=10C4:EA60 ...`).
    pub hardware_id: String,
}

impl PortCandidate {
    pub fn new(name: impl Into<String>, hardware_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hardware_id: hardware_id.into(),
        }
    }
}

/// An open serial port.  Dropping it closes the OS handle.
pub trait DevicePort: Send {
    /// Writes all of `bytes` and flushes.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Returns one complete line (terminator included) if one arrives within
    /// the port's read timeout, `Ok(None)` otherwise.
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;

    /// Discards everything received but not yet read.
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Enumerates and opens serial ports.
pub trait PortBackend: Send + Sync {
    /// Lists the ports currently present.  Never fails; an enumeration error
    /// is reported as an empty list.
    fn list_ports(&self) -> Vec<PortCandidate>;

    /// Opens `name` with the given line settings.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Open`] if the port cannot be opened or configured.
    fn open(&self, name: &str, settings: &LinkSettings)
        -> Result<Box<dyn DevicePort>, TransportError>;
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Discovery and liveness settings for the Transport Manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    pub link: LinkSettings,
    /// Only ports whose hardware descriptor contains this text are tried.
    /// Empty means every port.
    pub hardware_filter: String,
    /// Explicit port names, tried in order.  Overrides discovery when set.
    pub ports: Vec<String>,
    /// How long a ping may stay unanswered before the link is considered stale.
    pub silence_window: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            link: LinkSettings::default(),
            hardware_filter: "USB".to_string(),
            ports: Vec::new(),
            silence_window: Duration::from_secs(5),
        }
    }
}

/// Pacing of the supervisory loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Pause between connect attempts while unconnected.
    pub connect_interval: Duration,
    /// Pause between heartbeats while connected.
    pub connected_interval: Duration,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            connect_interval: Duration::from_secs(3),
            connected_interval: Duration::from_secs(1),
        }
    }
}

/// Returns the ports worth trying, in the order they should be tried.
pub fn discover_candidates(
    backend: &dyn PortBackend,
    settings: &TransportSettings,
) -> Vec<PortCandidate> {
    if !settings.ports.is_empty() {
        return settings
            .ports
            .iter()
            .map(|name| PortCandidate::new(name.clone(), "configured"))
            .collect();
    }
    backend
        .list_ports()
        .into_iter()
        .filter(|c| c.hardware_id.contains(&settings.hardware_filter))
        .collect()
}

// ── Link state ────────────────────────────────────────────────────────────────

/// Externally visible link state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStatus {
    /// Name of the open port, if any.
    pub port: Option<String>,
    pub connected: bool,
    /// `true` once the device has answered a ping since the last connect.
    pub heartbeat_ok: bool,
}

#[derive(Debug, Default)]
struct Liveness {
    status: LinkStatus,
    /// When the oldest unanswered ping was written.
    unanswered_since: Option<Instant>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access to the serial link for the duration of one operation.
///
/// Handed out by [`TransportManager::with_link`].  Every method that touches
/// the port drops the handle on failure.
pub struct Link {
    port: Option<Box<dyn DevicePort>>,
    /// Inbound lines set aside during a handshake, served before new reads.
    pending: VecDeque<Vec<u8>>,
    liveness: Arc<Mutex<Liveness>>,
    shut_down: bool,
}

impl Link {
    fn new(liveness: Arc<Mutex<Liveness>>) -> Self {
        Self {
            port: None,
            pending: VecDeque::new(),
            liveness,
            shut_down: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// Writes `bytes` to the device.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] without an open port, [`TransportError::Io`]
    /// if the write fails (the link is closed first).
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        if let Err(e) = port.write_all(bytes) {
            self.disconnect("write failed");
            return Err(e.into());
        }
        Ok(())
    }

    /// Reads one line straight from the device, bypassing set-aside lines.
    ///
    /// # Errors
    ///
    /// Same as [`write_all`](Self::write_all).
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::NotConnected)?;
        match port.read_line() {
            Ok(line) => Ok(line),
            Err(e) => {
                self.disconnect("read failed");
                Err(e.into())
            }
        }
    }

    /// Sets an inbound line aside so the Command Reader still sees it.
    pub fn defer_line(&mut self, raw: Vec<u8>) {
        self.pending.push_back(raw);
    }

    /// Records that the device answered a ping.
    pub fn mark_alive(&self) {
        record_alive(&self.liveness);
    }

    fn next_line(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if let Some(line) = self.pending.pop_front() {
            return Ok(Some(line));
        }
        self.read_line()
    }

    fn disconnect(&mut self, reason: &str) -> bool {
        let had_port = self.port.take().is_some();
        let mut liveness = lock(&self.liveness);
        if had_port {
            warn!(
                port = liveness.status.port.as_deref().unwrap_or("?"),
                "serial link closed: {reason}"
            );
        }
        *liveness = Liveness::default();
        had_port
    }

    fn reconnect(
        &mut self,
        backend: &dyn PortBackend,
        settings: &TransportSettings,
    ) -> Result<String, TransportError> {
        if self.shut_down {
            return Err(TransportError::ShutDown);
        }
        self.disconnect("reconnecting");
        self.pending.clear();

        let candidates = discover_candidates(backend, settings);
        let mut last_error = TransportError::NoCandidates;
        for candidate in candidates {
            debug!(port = %candidate.name, hwid = %candidate.hardware_id, "trying serial port");
            match backend.open(&candidate.name, &settings.link) {
                Ok(port) => {
                    self.port = Some(port);
                    let mut liveness = lock(&self.liveness);
                    liveness.status = LinkStatus {
                        port: Some(candidate.name.clone()),
                        connected: true,
                        heartbeat_ok: false,
                    };
                    liveness.unanswered_since = None;
                    return Ok(candidate.name);
                }
                Err(e) => {
                    error!("{e}");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    fn heartbeat(&mut self, silence_window: Duration) -> Result<bool, TransportError> {
        if self.port.is_none() {
            return Ok(false);
        }
        let (confirmed, unanswered_since) = {
            let liveness = lock(&self.liveness);
            (liveness.status.heartbeat_ok, liveness.unanswered_since)
        };
        if unanswered_since.is_some_and(|since| since.elapsed() > silence_window) {
            self.disconnect("no ALIVE within the silence window");
            return Ok(false);
        }

        // Until the device has answered once, whatever sits in the input
        // buffer is boot output.
        if !confirmed {
            let cleared = match self.port.as_mut() {
                Some(port) => port.clear_input(),
                None => return Ok(false),
            };
            if let Err(e) = cleared {
                self.disconnect("input flush failed");
                return Err(e.into());
            }
        }

        self.write_all(PING_LINE)?;
        lock(&self.liveness)
            .unanswered_since
            .get_or_insert_with(Instant::now);
        Ok(true)
    }
}

fn record_alive(liveness: &Mutex<Liveness>) {
    let mut liveness = lock(liveness);
    if !liveness.status.connected {
        return;
    }
    if !liveness.status.heartbeat_ok {
        info!(
            port = liveness.status.port.as_deref().unwrap_or("?"),
            "display answered heartbeat"
        );
    }
    liveness.status.heartbeat_ok = true;
    liveness.unanswered_since = None;
}

// ── Manager ───────────────────────────────────────────────────────────────────

/// Owns the [`Link`] and serializes every operation on it.
pub struct TransportManager {
    backend: Arc<dyn PortBackend>,
    settings: TransportSettings,
    link: Arc<Mutex<Link>>,
    liveness: Arc<Mutex<Liveness>>,
    /// Successful connects so far.
    connections: AtomicU64,
}

impl TransportManager {
    /// Creates an unconnected manager.
    pub fn new(backend: Arc<dyn PortBackend>, settings: TransportSettings) -> Self {
        let liveness = Arc::new(Mutex::new(Liveness::default()));
        Self {
            backend,
            settings,
            link: Arc::new(Mutex::new(Link::new(Arc::clone(&liveness)))),
            liveness,
            connections: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// How many times a port has been opened.  A change means the device was
    /// reconnected and may have been reset.
    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::Acquire)
    }

    /// Lists the candidate ports without opening any of them.
    pub fn discover(&self) -> Vec<PortCandidate> {
        discover_candidates(self.backend.as_ref(), &self.settings)
    }

    /// Snapshot of the link state.  Never waits behind a running operation.
    pub fn status(&self) -> LinkStatus {
        lock(&self.liveness).status.clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.liveness).status.connected
    }

    /// Records an `ALIVE` from the device.  Ignored while unconnected.
    pub fn mark_alive(&self) {
        record_alive(&self.liveness);
    }

    /// Runs `op` with exclusive access to the link on the blocking pool.
    ///
    /// # Errors
    ///
    /// Whatever `op` returns, or [`TransportError::Worker`] if it panicked.
    pub async fn with_link<T, E, F>(&self, op: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<TransportError> + Send + 'static,
        F: FnOnce(&mut Link) -> Result<T, E> + Send + 'static,
    {
        let link = Arc::clone(&self.link);
        let joined = tokio::task::spawn_blocking(move || {
            let mut guard = lock(&link);
            op(&mut guard)
        })
        .await;
        match joined {
            Ok(result) => result,
            Err(e) => Err(TransportError::Worker(e.to_string()).into()),
        }
    }

    /// Closes any open handle, then tries every candidate in order and keeps
    /// the first one that opens.
    ///
    /// Returns `true` if a port is now open.  Failures are logged, never raised.
    pub async fn connect(&self) -> bool {
        let backend = Arc::clone(&self.backend);
        let settings = self.settings.clone();
        let result = self
            .with_link(move |link| link.reconnect(backend.as_ref(), &settings))
            .await;
        match result {
            Ok(port) => {
                let count = self.connections.fetch_add(1, Ordering::AcqRel) + 1;
                info!(port = %port, connections = count, "connected to display");
                true
            }
            Err(TransportError::NoCandidates) => {
                warn!(filter = %self.settings.hardware_filter, "no serial devices found");
                false
            }
            Err(TransportError::ShutDown) => false,
            Err(e) => {
                error!("could not connect to any serial device: {e}");
                false
            }
        }
    }

    /// Writes a ping, or closes the link if the previous ping went unanswered
    /// for too long.  Returns `true` if the ping was written.
    pub async fn heartbeat(&self) -> bool {
        let silence_window = self.settings.silence_window;
        match self
            .with_link(move |link| link.heartbeat(silence_window))
            .await
        {
            Ok(written) => written,
            Err(e) => {
                warn!("heartbeat failed: {e}");
                false
            }
        }
    }

    /// Returns the next inbound line: first any line set aside during a
    /// transfer, then one read from the device.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] or [`TransportError::Io`].
    pub async fn read_line(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.with_link(Link::next_line).await
    }

    /// Writes a fixed control line such as the volume acknowledgment.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] or [`TransportError::Io`].
    pub async fn write_line(&self, line: &'static [u8]) -> Result<(), TransportError> {
        self.with_link(move |link| link.write_all(line)).await
    }

    /// Closes the handle for good; later connects are refused.
    ///
    /// Returns `true` if a handle was actually closed.  Calling it again is a
    /// no-op.
    pub async fn close(&self) -> bool {
        let result = self
            .with_link(|link| {
                link.shut_down = true;
                link.pending.clear();
                Ok::<_, TransportError>(link.disconnect("shutdown"))
            })
            .await;
        match result {
            Ok(closed) => closed,
            Err(e) => {
                error!("failed to close serial link: {e}");
                false
            }
        }
    }

    /// Keeps the link up until `shutdown` fires: connects while unconnected,
    /// heartbeats while connected.
    pub async fn supervise(self: Arc<Self>, pacing: SupervisorSettings, shutdown: ShutdownSignal) {
        info!("transport supervisor started");
        while shutdown.is_running() {
            let pause = if self.is_connected() {
                self.heartbeat().await;
                pacing.connected_interval
            } else if self.connect().await {
                pacing.connected_interval
            } else {
                pacing.connect_interval
            };
            shutdown.sleep(pause).await;
        }
        info!("transport supervisor stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
