//! Stimulus sent to a silent target
//!
//! Many consoles stay quiet until they see a line ending. When a wait times
//! out the engine may send the configured payload a bounded number of times
//! per trial before giving up on the candidate.

use std::time::Duration;
use tracing::info;

use crate::cancel::CancellationToken;
use crate::transport::{Transport, TransportError};
use crate::ConfigError;

/// Default payload, CR LF
pub const DEFAULT_TRIGGER_PAYLOAD: &[u8] = b"\r\n";

/// Default cap on trigger attempts per trial
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause after sending the payload
pub const DEFAULT_SETTLE_MS: u64 = 200;

/// Trigger settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    /// Fire on silence at all
    pub enabled: bool,
    /// Bytes sent on each attempt
    pub payload: Vec<u8>,
    /// Attempts allowed per trial
    pub max_attempts: u32,
    /// Pause after each attempt
    pub settle: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            payload: DEFAULT_TRIGGER_PAYLOAD.to_vec(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
        }
    }
}

/// Parse raw hex such as `"0D0A"` into bytes
///
/// Whitespace between byte pairs is ignored; a `0x` prefix is not accepted.
pub fn parse_hex_payload(hex: &str) -> Result<Vec<u8>, ConfigError> {
    let invalid = || ConfigError::InvalidTriggerPayload(hex.to_string());
    let digits: Vec<u8> = hex
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(invalid());
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(invalid)
        })
        .collect()
}

/// Sends the trigger payload when a trial hears nothing
#[derive(Debug, Clone, Default)]
pub struct TriggerStrategy {
    config: TriggerConfig,
}

impl TriggerStrategy {
    /// Create a strategy from its settings
    pub fn new(config: TriggerConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Whether another attempt is allowed after `attempts` were made
    pub fn can_fire(&self, attempts: u32) -> bool {
        self.config.enabled && attempts < self.config.max_attempts
    }

    /// Transmit the payload, then let the target answer
    ///
    /// Returns `Ok(false)` if cancelled during the settle delay.
    pub fn fire(
        &self,
        transport: &mut dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<bool, TransportError> {
        info!(payload = ?self.config.payload, "Triggering the device");
        transport.transmit(&self.config.payload)?;
        Ok(cancel.sleep(self.config.settle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedTarget;

    #[test]
    fn test_parse_hex_payload() {
        assert_eq!(parse_hex_payload("0D0A").unwrap(), vec![0x0D, 0x0A]);
        assert_eq!(parse_hex_payload("0d 0a 41").unwrap(), vec![0x0D, 0x0A, 0x41]);
        assert!(parse_hex_payload("").is_err());
        assert!(parse_hex_payload("0D0").is_err());
        assert!(parse_hex_payload("0x0D").is_err());
        assert!(parse_hex_payload("ZZ").is_err());
    }

    #[test]
    fn test_attempt_cap() {
        let strategy = TriggerStrategy::new(TriggerConfig {
            enabled: true,
            ..TriggerConfig::default()
        });
        assert!(strategy.can_fire(0));
        assert!(strategy.can_fire(2));
        assert!(!strategy.can_fire(3));
    }

    #[test]
    fn test_disabled_never_fires() {
        let strategy = TriggerStrategy::default();
        assert!(!strategy.can_fire(0));
    }

    #[test]
    fn test_fire_transmits_payload() {
        let strategy = TriggerStrategy::new(TriggerConfig {
            enabled: true,
            settle: Duration::from_millis(1),
            ..TriggerConfig::default()
        });
        let mut target = SimulatedTarget::silent();
        assert!(strategy.fire(&mut target, &CancellationToken::new()).unwrap());
        assert_eq!(target.transmitted(), b"\r\n");
    }
}
