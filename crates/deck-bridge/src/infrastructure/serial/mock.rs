//! Scripted serial device for tests.
//!
//! # Why a scripted device?
//!
//! The real display only exists on a USB cable.  [`MockPortBackend`] stands in
//! for the OS port list and [`PortScript`] for the firmware on the other end:
//!
//! - lines pushed with [`PortScript::push_line`] are returned by reads, one per call;
//! - every write is recorded, and an optional responder can queue replies to
//!   it (for example an `A` after the length prefix);
//! - opens, input flushes and closes are counted so tests can assert on the
//!   link lifecycle.
//!
//! All ports opened from one backend share the same script, which models a
//! single device that is unplugged and replugged.
//!
//! # Usage in tests
//!
//! ```ignore
//! let script = PortScript::new();
//! script.respond_with(|written| if written.len() == 4 { vec![b"A\n".to_vec()] } else { vec![] });
//! let backend = Arc::new(MockPortBackend::with_script(script.clone()).with_port("COM3", "USB"));
//! ```

use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::application::transport::{
    DevicePort, LinkSettings, PortBackend, PortCandidate, TransportError,
};

type Responder = Box<dyn FnMut(&[u8]) -> Vec<Vec<u8>> + Send>;

#[derive(Default)]
struct ScriptState {
    inbound: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    responder: Option<Responder>,
    clears: usize,
    closes: usize,
    fail_reads: bool,
    fail_writes: bool,
}

/// Shared behaviour of the simulated device.  Cheap to clone.
#[derive(Clone, Default)]
pub struct PortScript {
    state: Arc<Mutex<ScriptState>>,
}

impl PortScript {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a line the device will send.
    pub fn push_line(&self, line: &[u8]) {
        self.state().inbound.push_back(line.to_vec());
    }

    /// Installs a responder that sees every write and returns lines to queue.
    pub fn respond_with(&self, responder: impl FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static) {
        self.state().responder = Some(Box::new(responder));
    }

    /// Makes every subsequent read fail with a broken-pipe error.
    pub fn fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    /// Makes every subsequent write fail with a broken-pipe error.
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    /// Number of input buffer flushes.
    pub fn clears(&self) -> usize {
        self.state().clears
    }

    /// Number of port handles dropped.
    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Lines queued but not read yet.
    pub fn unread(&self) -> usize {
        self.state().inbound.len()
    }
}

/// A port handle opened from a [`MockPortBackend`].
pub struct ScriptedPort {
    script: PortScript,
}

impl DevicePort for ScriptedPort {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.script.state();
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        state.writes.push(bytes.to_vec());
        if let Some(mut responder) = state.responder.take() {
            let replies = responder(bytes);
            state.inbound.extend(replies);
            state.responder = Some(responder);
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut state = self.script.state();
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted read failure"));
        }
        Ok(state.inbound.pop_front())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        let mut state = self.script.state();
        state.inbound.clear();
        state.clears += 1;
        Ok(())
    }
}

impl Drop for ScriptedPort {
    fn drop(&mut self) {
        self.script.state().closes += 1;
    }
}

/// A fake OS port list whose ports all talk to one [`PortScript`].
#[derive(Default)]
pub struct MockPortBackend {
    ports: Vec<PortCandidate>,
    failing: HashSet<String>,
    script: PortScript,
    open_attempts: Mutex<Vec<String>>,
}

impl MockPortBackend {
    /// A backend with no ports and a fresh script.
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose ports use `script`.
    pub fn with_script(script: PortScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Adds a port to the enumeration result.
    pub fn with_port(mut self, name: &str, hardware_id: &str) -> Self {
        self.ports.push(PortCandidate::new(name, hardware_id));
        self
    }

    /// Makes opening `name` fail.
    pub fn failing_open(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn script(&self) -> PortScript {
        self.script.clone()
    }

    /// Every port name passed to `open`, in order.
    pub fn open_attempts(&self) -> Vec<String> {
        self.open_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PortBackend for MockPortBackend {
    fn list_ports(&self) -> Vec<PortCandidate> {
        self.ports.clone()
    }

    fn open(
        &self,
        name: &str,
        _settings: &LinkSettings,
    ) -> Result<Box<dyn DevicePort>, TransportError> {
        self.open_attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(name.to_string());
        if self.failing.contains(name) {
            return Err(TransportError::Open {
                port: name.to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "scripted open failure"),
            });
        }
        Ok(Box::new(ScriptedPort {
            script: self.script.clone(),
        }))
    }
}
