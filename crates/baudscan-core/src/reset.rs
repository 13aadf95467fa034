//! Hardware reset sequencing
//!
//! Rebooting the target right after a speed switch makes it print its boot
//! banner at the candidate speed, which is usually the richest text it will
//! ever emit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::cancel::CancellationToken;
use crate::transport::TransportError;
use crate::ConfigError;

/// Default time the line is held at the active level
pub const DEFAULT_RESET_HOLD_MS: u64 = 100;

/// Default time to let the target boot after the pulse
pub const DEFAULT_RESET_DELAY_MS: u64 = 500;

/// Logic level of a reset line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic 0 on the pin
    Low,
    /// Logic 1 on the pin
    High,
}

impl Level {
    /// The other level
    pub fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

/// An output line able to reset the target
pub trait ResetLine: Send {
    /// Drive the line to `level`
    fn set_level(&mut self, level: Level) -> Result<(), TransportError>;
}

/// Which output of the host adapter is wired to the target's reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPin {
    /// Data Terminal Ready
    Dtr,
    /// Request To Send
    Rts,
}

impl FromStr for ResetPin {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dtr" => Ok(ResetPin::Dtr),
            "rts" => Ok(ResetPin::Rts),
            _ => Err(ConfigError::InvalidResetPin(s.to_string())),
        }
    }
}

impl fmt::Display for ResetPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetPin::Dtr => write!(f, "dtr"),
            ResetPin::Rts => write!(f, "rts"),
        }
    }
}

/// Level that resets the target; the line idles at the opposite level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetPolarity {
    /// Active low: idle high, pulse low
    #[default]
    Low,
    /// Active high: idle low, pulse high
    High,
}

impl ResetPolarity {
    /// Level asserted during the pulse
    pub fn active_level(self) -> Level {
        match self {
            ResetPolarity::Low => Level::Low,
            ResetPolarity::High => Level::High,
        }
    }

    /// Level held between pulses
    pub fn idle_level(self) -> Level {
        self.active_level().inverted()
    }
}

impl FromStr for ResetPolarity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ResetPolarity::Low),
            "high" => Ok(ResetPolarity::High),
            _ => Err(ConfigError::InvalidResetPolarity(s.to_string())),
        }
    }
}

/// Reset pulse settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetConfig {
    /// Output wired to the target reset; `None` disables reset
    pub pin: Option<ResetPin>,
    /// Level that resets the target
    pub polarity: ResetPolarity,
    /// Pulse length
    pub hold: Duration,
    /// Boot time allowed after the pulse
    pub settle: Duration,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            pin: None,
            polarity: ResetPolarity::default(),
            hold: Duration::from_millis(DEFAULT_RESET_HOLD_MS),
            settle: Duration::from_millis(DEFAULT_RESET_DELAY_MS),
        }
    }
}

/// Applies a reset pulse before each trial; a no-op without a line
pub struct ResetStrategy {
    line: Option<Box<dyn ResetLine>>,
    polarity: ResetPolarity,
    hold: Duration,
    settle: Duration,
}

impl fmt::Debug for ResetStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetStrategy")
            .field("configured", &self.line.is_some())
            .field("polarity", &self.polarity)
            .field("hold", &self.hold)
            .field("settle", &self.settle)
            .finish()
    }
}

impl Default for ResetStrategy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl ResetStrategy {
    /// Strategy that never touches any line
    pub fn disabled() -> Self {
        let config = ResetConfig::default();
        Self {
            line: None,
            polarity: config.polarity,
            hold: config.hold,
            settle: config.settle,
        }
    }

    /// Strategy driving `line` with the timing and polarity from `config`
    pub fn new(line: Box<dyn ResetLine>, config: &ResetConfig) -> Self {
        Self {
            line: Some(line),
            polarity: config.polarity,
            hold: config.hold,
            settle: config.settle,
        }
    }

    /// Whether a line is attached
    pub fn is_configured(&self) -> bool {
        self.line.is_some()
    }

    /// Drive the line to its idle level
    pub fn release(&mut self) -> Result<(), TransportError> {
        match self.line.as_mut() {
            Some(line) => line.set_level(self.polarity.idle_level()),
            None => Ok(()),
        }
    }

    /// Pulse the line and wait for the target to boot
    ///
    /// The line is back at idle when this returns, even on cancellation.
    /// Returns `Ok(false)` if cancelled.
    pub fn apply(&mut self, cancel: &CancellationToken) -> Result<bool, TransportError> {
        let Some(line) = self.line.as_mut() else {
            return Ok(true);
        };

        info!("Attempt to reset the target..");
        line.set_level(self.polarity.active_level())?;
        let held = cancel.sleep(self.hold);
        if let Err(e) = line.set_level(self.polarity.idle_level()) {
            warn!("failed to release reset line: {}", e);
            return Err(e);
        }
        if !held {
            return Ok(false);
        }
        Ok(cancel.sleep(self.settle))
    }
}
