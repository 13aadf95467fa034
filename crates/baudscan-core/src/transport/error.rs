//! Transport errors

use thiserror::Error;

use crate::Speed;

/// Errors raised by a [`Transport`](super::Transport) or a reset line
#[derive(Error, Debug)]
pub enum TransportError {
    /// Driver-level failure
    #[error("Serial port error: {0}")]
    Serial(String),

    /// The adapter refused the speed
    #[error("Baudrate {speed} rejected: {reason}")]
    SpeedRejected {
        /// Requested speed
        speed: Speed,
        /// Driver message
        reason: String,
    },

    /// The device is gone
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// Read or write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the device is gone and the run cannot continue
    pub fn is_fatal(&self) -> bool {
        match self {
            TransportError::Disconnected(_) => true,
            TransportError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }
}

impl From<serialport::Error> for TransportError {
    fn from(err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice => TransportError::Disconnected(err.to_string()),
            serialport::ErrorKind::Io(kind) => {
                TransportError::Io(std::io::Error::new(kind, err.description))
            }
            _ => TransportError::Serial(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_disconnect_is_fatal() {
        assert!(TransportError::Disconnected("unplugged".into()).is_fatal());
        assert!(!TransportError::Serial("framing".into()).is_fatal());
        assert!(!TransportError::SpeedRejected {
            speed: 12,
            reason: "unsupported".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_broken_pipe_is_fatal() {
        let err = TransportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(err.is_fatal());
        let err = TransportError::from(std::io::Error::from(std::io::ErrorKind::TimedOut));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_no_device_maps_to_disconnected() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        assert!(matches!(
            TransportError::from(err),
            TransportError::Disconnected(_)
        ));
    }
}
