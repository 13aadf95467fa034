//! Serial port handling
//!
//! Host serial port access for the detection engine.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::debug;

use super::{Transport, TransportError, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS};
use crate::reset::{Level, ResetLine, ResetPin};
use crate::Speed;

/// A serial port reported by the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path or COM name
    pub name: String,
    /// Whether the port belongs to a USB adapter
    pub usb: bool,
    /// Manufacturer and product of a USB adapter, or its `vid:pid`
    pub description: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (usb, description) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let words: Vec<String> = [usb.manufacturer, usb.product].into_iter().flatten().collect();
                let description = if words.is_empty() {
                    format!("{:04x}:{:04x}", usb.vid, usb.pid)
                } else {
                    words.join(" ")
                };
                (true, Some(description))
            }
            _ => (false, None),
        };
        Self {
            name: info.port_name,
            usb,
            description,
        }
    }
}

/// USB adapters first, then by name with shorter names ahead so that
/// ttyUSB2 comes before ttyUSB10
fn sort_ports(ports: &mut [PortInfo]) {
    ports.sort_by(|a, b| (!a.usb, a.name.len(), &a.name).cmp(&(!b.usb, b.name.len(), &b.name)));
}

/// Serial ports the OS knows about
pub fn list_ports() -> Result<Vec<PortInfo>, TransportError> {
    let mut ports: Vec<PortInfo> = serialport::available_ports()?
        .into_iter()
        .map(PortInfo::from)
        .collect();
    sort_ports(&mut ports);
    Ok(ports)
}

/// Open a serial port as 8N1 without flow control
pub fn open_port(name: &str, baud_rate: Option<Speed>) -> Result<Box<dyn SerialPort>, TransportError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);

    serialport::new(name, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_millis(DEFAULT_READ_TIMEOUT_MS))
        .open()
        .map_err(TransportError::from)
}

/// [`Transport`] backed by a host serial port
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `name` and wrap it
    pub fn open(name: &str, baud_rate: Option<Speed>) -> Result<Self, TransportError> {
        let port = open_port(name, baud_rate)?;
        debug!(port = name, "serial port opened");
        Ok(Self { port })
    }

    /// Wrap an already opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }

    /// Port name, if the OS reports one
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }

    /// Modem-control output of this port usable as a reset line
    pub fn control_line(&self, pin: ResetPin) -> Result<SerialControlLine, TransportError> {
        let port = self.port.try_clone()?;
        Ok(SerialControlLine { port, pin })
    }
}

impl Transport for SerialTransport {
    fn configure(&mut self, speed: Speed) -> Result<(), TransportError> {
        self.port
            .set_baud_rate(speed)
            .map_err(|e| match TransportError::from(e) {
                TransportError::Serial(reason) => TransportError::SpeedRejected { speed, reason },
                other => other,
            })
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        // flush() drains via tcdrain, which can block on some USB adapters
        self.port.write_all(bytes)?;
        Ok(())
    }

    fn receive(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; n];
        match self.port.read(&mut buf) {
            Ok(read) => {
                buf.truncate(read);
                Ok(buf)
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn pending_byte_count(&mut self) -> Result<usize, TransportError> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn flush_input(&mut self) -> Result<(), TransportError> {
        self.port.clear(serialport::ClearBuffer::Input)?;
        Ok(())
    }
}

/// Whether the modem-control signal must be asserted to put `level` on the pin
///
/// USB-UART bridges (FTDI, CP210x, CH340) drive DTR# and RTS# active low:
/// asserting the signal pulls the pin low.
fn signal_asserted(level: Level) -> bool {
    level == Level::Low
}

/// DTR or RTS output of a serial adapter, driven as a reset line
///
/// Levels are pin levels, see [`signal_asserted`].
pub struct SerialControlLine {
    port: Box<dyn SerialPort>,
    pin: ResetPin,
}

impl ResetLine for SerialControlLine {
    fn set_level(&mut self, level: Level) -> Result<(), TransportError> {
        let asserted = signal_asserted(level);
        match self.pin {
            ResetPin::Dtr => self.port.write_data_terminal_ready(asserted)?,
            ResetPin::Rts => self.port.write_request_to_send(asserted)?,
        }
        Ok(())
    }
}
