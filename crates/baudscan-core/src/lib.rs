//! # baudscan Core Library
//!
//! Automatic baudrate detection for UART targets of unknown speed.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! The engine walks a list of candidate speeds and, for each one, listens to
//! the target and scores what it hears against a plain-text heuristic:
//! - mostly printable ASCII
//! - at least one word break and one vowel
//! - no byte that cannot appear in readable output
//!
//! The first speed that satisfies the heuristic wins.
//!
//! ## Example
//!
//! ```rust,ignore
//! use baudscan_core::prelude::*;
//!
//! let config = DetectionConfig::default();
//! let port = SerialTransport::open("/dev/ttyUSB0", None)?;
//! let mut engine = DetectionEngine::from_config(port, &config)?;
//!
//! match engine.run(config.candidates()?)? {
//!     DetectionResult::Found(speed) => println!("baudrate: {speed}"),
//!     DetectionResult::Exhausted => println!("no baudrate found"),
//! }
//! ```

pub mod cancel;
pub mod candidates;
pub mod classify;
pub mod config;
pub mod engine;
mod error;
pub mod report;
pub mod reset;
pub mod scorer;
pub mod sim;
pub mod transport;
pub mod trigger;
pub mod waiter;

pub use error::{ConfigError, DetectionError};

/// A baudrate in bits per second
pub type Speed = u32;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cancel::CancellationToken;
    pub use crate::candidates::CandidateSource;
    pub use crate::classify::{classify, ByteCategory};
    pub use crate::config::{DetectionConfig, Mode};
    pub use crate::engine::{AcceptHandler, DetectionEngine, DetectionResult};
    pub use crate::report::{ProgressUnit, ReportEvent, Reporter, TracingReporter};
    pub use crate::reset::{Level, ResetConfig, ResetLine, ResetPin, ResetPolarity, ResetStrategy};
    pub use crate::scorer::{Decision, InvalidBytePolicy, TrialScorer, TrialState};
    pub use crate::transport::{SerialTransport, Transport, TransportError};
    pub use crate::trigger::{TriggerConfig, TriggerStrategy};
    pub use crate::waiter::{ByteWaiter, WaitOutcome};
    pub use crate::{ConfigError, DetectionError, Speed};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
