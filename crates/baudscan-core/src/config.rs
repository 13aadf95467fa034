//! Detection options
//!
//! Option names and defaults follow the usual UART baudrate-detection
//! workflow: a mode, a range or a list of speeds, an optional reset line and
//! an optional trigger. Everything is checked by [`DetectionConfig::validate`]
//! before the engine touches the port.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::candidates::CandidateSource;
use crate::reset::{ResetConfig, ResetPin, ResetPolarity, DEFAULT_RESET_DELAY_MS, DEFAULT_RESET_HOLD_MS};
use crate::scorer::{InvalidBytePolicy, DEFAULT_THRESHOLD};
use crate::trigger::{parse_hex_payload, TriggerConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_SETTLE_MS};
use crate::waiter::{ByteWaiter, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};
use crate::{ConfigError, Speed};

/// Default speed list for list mode
pub const DEFAULT_BAUDRATE_LIST: &str = "9600,19200,38400,57600,115200";

/// Default bound on a single trial in milliseconds
pub const DEFAULT_TRIAL_TIMEOUT_MS: u64 = 10_000;

/// Candidate generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `baudrate_min` to `baudrate_max` (exclusive) by `baudrate_increment`
    Incremental,
    /// The speeds in `baudrate_list`
    List,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incremental" => Ok(Mode::Incremental),
            "list" => Ok(Mode::List),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// All options of a detection run, as stored in `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Serial device to scan (e.g. "/dev/ttyUSB0")
    pub port: Option<String>,

    /// "incremental" or "list"
    pub mode: String,

    /// Adapter output wired to the target reset ("dtr" or "rts")
    pub reset_pin: Option<String>,

    /// Level that resets the target ("low" or "high")
    pub reset_dir: String,

    /// Reset pulse length in milliseconds
    pub reset_hold_ms: u64,

    /// Wait after the pulse in milliseconds
    pub reset_delay_ms: u64,

    /// Send `trigger_char` when the target is silent
    pub trigger: bool,

    /// Trigger payload as raw hex, no leading "0x"
    pub trigger_char: String,

    /// Trigger attempts per trial
    pub trigger_max_attempts: u32,

    /// Wait after each trigger in milliseconds
    pub trigger_settle_ms: u64,

    /// First speed in incremental mode
    pub baudrate_min: Speed,

    /// Exclusive upper bound in incremental mode
    pub baudrate_max: Speed,

    /// Step between speeds in incremental mode
    pub baudrate_increment: Speed,

    /// Comma-separated speeds for list mode
    pub baudrate_list: String,

    /// Bound on each wait for the next byte, in milliseconds
    pub wait_timeout_ms: u64,

    /// Pending-count poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Counted bytes required to accept a speed
    pub threshold: usize,

    /// "fail-fast" or "reset-and-continue"
    pub invalid_policy: InvalidBytePolicy,

    /// Bound on one whole trial, in milliseconds
    pub trial_timeout_ms: u64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            port: None,
            mode: "incremental".to_string(),
            reset_pin: None,
            reset_dir: "low".to_string(),
            reset_hold_ms: DEFAULT_RESET_HOLD_MS,
            reset_delay_ms: DEFAULT_RESET_DELAY_MS,
            trigger: false,
            trigger_char: "0D0A".to_string(),
            trigger_max_attempts: DEFAULT_MAX_ATTEMPTS,
            trigger_settle_ms: DEFAULT_SETTLE_MS,
            baudrate_min: 300,
            baudrate_max: 115200,
            baudrate_increment: 300,
            baudrate_list: DEFAULT_BAUDRATE_LIST.to_string(),
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            threshold: DEFAULT_THRESHOLD,
            invalid_policy: InvalidBytePolicy::default(),
            trial_timeout_ms: DEFAULT_TRIAL_TIMEOUT_MS,
        }
    }
}

/// Validated settings the engine runs with
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Bounded wait for the next byte
    pub waiter: ByteWaiter,
    /// Stimulus for silent targets
    pub trigger: TriggerConfig,
    /// Counted bytes required to accept a speed
    pub threshold: usize,
    /// Handling of bytes that cannot appear in text
    pub invalid_policy: InvalidBytePolicy,
    /// Listening budget of one trial, counted from the end of the reset
    pub trial_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            waiter: ByteWaiter::default(),
            trigger: TriggerConfig::default(),
            threshold: DEFAULT_THRESHOLD,
            invalid_policy: InvalidBytePolicy::default(),
            trial_timeout: Duration::from_millis(DEFAULT_TRIAL_TIMEOUT_MS),
        }
    }
}

impl DetectionConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parsed candidate mode
    pub fn mode(&self) -> Result<Mode, ConfigError> {
        self.mode.parse()
    }

    /// Check every option; nothing may run if this fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reset = self.reset_config()?;
        self.candidates()?;
        self.engine_settings()?;
        if reset.pin.is_some() {
            let sequence = self.reset_hold_ms.saturating_add(self.reset_delay_ms);
            if self.trial_timeout_ms <= sequence {
                return Err(ConfigError::InvalidValue {
                    field: "trial_timeout_ms",
                    message: format!(
                        "must be longer than reset_hold_ms + reset_delay_ms ({} ms)",
                        sequence
                    ),
                });
            }
        }
        Ok(())
    }

    /// Build the candidate sequence for the selected mode
    pub fn candidates(&self) -> Result<CandidateSource, ConfigError> {
        match self.mode()? {
            Mode::Incremental => CandidateSource::incremental(
                self.baudrate_min,
                self.baudrate_max,
                self.baudrate_increment,
            ),
            Mode::List => CandidateSource::parse_list(&self.baudrate_list),
        }
    }

    /// Reset settings; `pin` is `None` when reset is disabled
    pub fn reset_config(&self) -> Result<ResetConfig, ConfigError> {
        let pin = match self.reset_pin.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(name.parse::<ResetPin>()?),
        };
        // Direction is only meaningful with a pin, but a typo is still reported
        let polarity: ResetPolarity = self.reset_dir.parse()?;
        Ok(ResetConfig {
            pin,
            polarity,
            hold: Duration::from_millis(self.reset_hold_ms),
            settle: Duration::from_millis(self.reset_delay_ms),
        })
    }

    /// Trigger settings with the payload decoded
    pub fn trigger_config(&self) -> Result<TriggerConfig, ConfigError> {
        Ok(TriggerConfig {
            enabled: self.trigger,
            payload: parse_hex_payload(&self.trigger_char)?,
            max_attempts: self.trigger_max_attempts,
            settle: Duration::from_millis(self.trigger_settle_ms),
        })
    }

    /// Settings for [`DetectionEngine`](crate::engine::DetectionEngine)
    pub fn engine_settings(&self) -> Result<EngineSettings, ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "threshold",
                message: "must be at least 1".to_string(),
            });
        }
        if self.wait_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "wait_timeout_ms",
                message: "must be at least 1".to_string(),
            });
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > self.wait_timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_ms",
                message: format!("must be between 1 and {}", self.wait_timeout_ms),
            });
        }
        if self.trial_timeout_ms < self.wait_timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "trial_timeout_ms",
                message: "must not be shorter than wait_timeout_ms".to_string(),
            });
        }
        Ok(EngineSettings {
            waiter: ByteWaiter::new(
                Duration::from_millis(self.wait_timeout_ms),
                Duration::from_millis(self.poll_interval_ms),
            ),
            trigger: self.trigger_config()?,
            threshold: self.threshold,
            invalid_policy: self.invalid_policy,
            trial_timeout: Duration::from_millis(self.trial_timeout_ms),
        })
    }
}
