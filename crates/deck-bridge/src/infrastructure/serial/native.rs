//! USB serial ports backed by the `serialport` crate.
//!
//! Ports are opened 8N1 without flow control.  Reads use the configured
//! short timeout; a timeout is the normal "nothing yet" outcome and is
//! reported as `Ok(None)`, never as an error.

use std::io::{self, Read, Write};

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, warn};

use crate::application::transport::{
    DevicePort, LinkSettings, PortBackend, PortCandidate, TransportError,
};

/// A line longer than this without a newline is treated as line noise.
const MAX_LINE_LEN: usize = 4096;
const READ_CHUNK: usize = 256;

/// Enumerates and opens the host's serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeSerialBackend;

impl NativeSerialBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Builds the hardware descriptor used for filtering (`USB VID:PID=10C4:EA60 SER=0001`).
fn hardware_id(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut id = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
            if let Some(serial) = &usb.serial_number {
                id.push_str(" SER=");
                id.push_str(serial);
            }
            id
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "BLUETOOTH".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

impl PortBackend for NativeSerialBackend {
    fn list_ports(&self) -> Vec<PortCandidate> {
        match serialport::available_ports() {
            Ok(ports) => ports
                .into_iter()
                .map(|info| PortCandidate::new(info.port_name, hardware_id(&info.port_type)))
                .collect(),
            Err(e) => {
                warn!("serial port enumeration failed: {e}");
                Vec::new()
            }
        }
    }

    fn open(
        &self,
        name: &str,
        settings: &LinkSettings,
    ) -> Result<Box<dyn DevicePort>, TransportError> {
        let open_error = |source: serialport::Error| TransportError::Open {
            port: name.to_string(),
            source: source.into(),
        };

        let mut port = serialport::new(name, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()
            .map_err(open_error)?;

        if settings.deassert_control_lines {
            port.write_data_terminal_ready(false).map_err(open_error)?;
            port.write_request_to_send(false).map_err(open_error)?;
        }
        debug!(port = name, baud = settings.baud_rate, "serial port opened");

        Ok(Box::new(NativePort::new(port)))
    }
}

/// An open OS serial port with a line reassembly buffer.
struct NativePort {
    port: Box<dyn SerialPort>,
    buffer: Vec<u8>,
}

impl NativePort {
    fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            buffer: Vec::with_capacity(READ_CHUNK),
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        Some(self.buffer.drain(..=end).collect())
    }
}

impl DevicePort for NativePort {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let mut chunk = [0u8; READ_CHUNK];
        match self.port.read(&mut chunk) {
            Ok(0) => return Ok(None),
            Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                return Ok(None)
            }
            Err(e) => return Err(e),
        }

        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        if self.buffer.len() > MAX_LINE_LEN {
            warn!(bytes = self.buffer.len(), "discarding unterminated serial input");
            self.buffer.clear();
        }
        Ok(None)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.buffer.clear();
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
