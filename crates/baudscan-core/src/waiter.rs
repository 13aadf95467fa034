//! Bounded wait for incoming bytes

use std::time::{Duration, Instant};

use crate::cancel::CancellationToken;
use crate::transport::{Transport, TransportError};

/// Default time to wait for the first byte
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 1000;

/// Default pause between two pending-count checks
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2;

/// Result of one bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// At least one byte is pending
    Data,
    /// Nothing arrived before the timeout
    TimedOut,
    /// The cancellation token fired
    Cancelled,
}

impl WaitOutcome {
    /// `true` only for [`WaitOutcome::Data`]
    pub fn has_data(self) -> bool {
        self == WaitOutcome::Data
    }
}

/// Polls a transport's pending-byte count until data shows up or time runs out
#[derive(Debug, Clone)]
pub struct ByteWaiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for ByteWaiter {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        )
    }
}

impl ByteWaiter {
    /// Create a waiter with the given timeout and poll interval
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Wait for pending data on `transport`
    ///
    /// Checks the cancellation token on every iteration and yields the thread
    /// for `poll_interval` between checks.
    pub fn wait_for_data(
        &self,
        transport: &mut dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<WaitOutcome, TransportError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if cancel.is_cancelled() {
                return Ok(WaitOutcome::Cancelled);
            }
            if transport.pending_byte_count()? > 0 {
                return Ok(WaitOutcome::Data);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedTarget;

    #[test]
    fn test_silent_transport_times_out_after_timeout() {
        let waiter = ByteWaiter::new(Duration::from_millis(120), Duration::from_millis(5));
        let mut target = SimulatedTarget::silent();
        let start = Instant::now();
        let outcome = waiter
            .wait_for_data(&mut target, &CancellationToken::new())
            .unwrap();
        let elapsed = start.elapsed();
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(elapsed >= Duration::from_millis(120));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_pending_data_returns_immediately() {
        let waiter = ByteWaiter::new(Duration::from_secs(10), Duration::from_millis(5));
        let mut target = SimulatedTarget::new(9600, b"hi".to_vec());
        target.configure(9600).unwrap();
        let start = Instant::now();
        let outcome = waiter
            .wait_for_data(&mut target, &CancellationToken::new())
            .unwrap();
        assert!(outcome.has_data());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_cancelled_before_wait() {
        let waiter = ByteWaiter::new(Duration::from_secs(10), Duration::from_millis(5));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = waiter
            .wait_for_data(&mut SimulatedTarget::silent(), &cancel)
            .unwrap();
        assert_eq!(outcome, WaitOutcome::Cancelled);
    }
}
