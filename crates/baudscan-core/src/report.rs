//! Human-facing progress and status reporting

use std::fmt;
use tracing::{error, info, trace, warn};

/// Status event emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// Progress through the run
    Info(String),
    /// A candidate failed or something was skipped
    Warning(String),
    /// The detected speed
    Result(String),
    /// The run stopped on an error
    Error(String),
}

/// One received byte, rendered for a progress line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUnit(pub u8);

impl fmt::Display for ProgressUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            b @ 0x20..=0x7E => write!(f, "{}", b as char),
            b => write!(f, "0x{:02x}", b),
        }
    }
}

/// Sink for engine feedback; never influences detection
pub trait Reporter: Send {
    /// Report a status event
    fn report(&mut self, event: ReportEvent);

    /// A byte was just read during the current trial
    fn progress(&mut self, _unit: ProgressUnit) {}

    /// The current trial finished; any progress line can be closed
    fn progress_done(&mut self) {}
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, event: ReportEvent) {
        match event {
            ReportEvent::Info(msg) => info!("{}", msg),
            ReportEvent::Warning(msg) => warn!("{}", msg),
            ReportEvent::Result(msg) => info!(result = true, "{}", msg),
            ReportEvent::Error(msg) => error!("{}", msg),
        }
    }

    fn progress(&mut self, unit: ProgressUnit) {
        trace!(byte = %unit, "Reading bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_unit_display() {
        assert_eq!(ProgressUnit(b'A').to_string(), "A");
        assert_eq!(ProgressUnit(b' ').to_string(), " ");
        assert_eq!(ProgressUnit(0x0A).to_string(), "0x0a");
        assert_eq!(ProgressUnit(0xFE).to_string(), "0xfe");
    }
}
