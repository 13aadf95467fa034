//! UART transport
//!
//! The engine talks to the target through the narrow [`Transport`] trait.
//! [`SerialTransport`] implements it on top of a host serial port; the
//! [`sim`](crate::sim) module provides an in-memory target for tests and demo mode.

mod error;
pub mod serial;

pub use error::TransportError;
pub use serial::{list_ports, open_port, PortInfo, SerialTransport};

use crate::Speed;

/// Default baud rate used to open a port before detection starts
pub const DEFAULT_BAUD_RATE: Speed = 115200;

/// Default read timeout of the underlying port in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

/// An opened, exclusively owned UART channel
pub trait Transport {
    /// Switch the channel to a new speed
    fn configure(&mut self, speed: Speed) -> Result<(), TransportError>;

    /// Send bytes to the target
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Receive up to `n` bytes that are already pending
    fn receive(&mut self, n: usize) -> Result<Vec<u8>, TransportError>;

    /// Number of received bytes waiting to be read
    fn pending_byte_count(&mut self) -> Result<usize, TransportError>;

    /// Drop everything buffered on the receive side
    fn flush_input(&mut self) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn configure(&mut self, speed: Speed) -> Result<(), TransportError> {
        (**self).configure(speed)
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).transmit(bytes)
    }

    fn receive(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        (**self).receive(n)
    }

    fn pending_byte_count(&mut self) -> Result<usize, TransportError> {
        (**self).pending_byte_count()
    }

    fn flush_input(&mut self) -> Result<(), TransportError> {
        (**self).flush_input()
    }
}
