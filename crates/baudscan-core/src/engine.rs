//! Detection engine
//!
//! Runs one trial per candidate speed and stops at the first accepted one.
//!
//! A trial moves through these states:
//!
//! ```text
//! SwitchingSpeed -> Resetting -> Waiting <-> Classifying
//!                                   |            |
//!                               TimedOut   Accepted | Rejected
//! ```
//!
//! `Waiting` may fire the trigger and wait again. The trial deadline counts
//! from the first wait, after any reset pulse. Transport failures reject the
//! current candidate unless the device is gone, which ends the run.

use std::time::Instant;
use tracing::{debug, warn};

use crate::cancel::CancellationToken;
use crate::classify::classify;
use crate::config::{DetectionConfig, EngineSettings};
use crate::report::{ProgressUnit, ReportEvent, Reporter, TracingReporter};
use crate::reset::ResetStrategy;
use crate::scorer::{Decision, TrialScorer};
use crate::transport::{Transport, TransportError};
use crate::trigger::TriggerStrategy;
use crate::waiter::WaitOutcome;
use crate::{ConfigError, DetectionError, Speed};

/// Final result of a detection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionResult {
    /// The first speed whose traffic looked like text
    Found(Speed),
    /// No candidate was accepted, or the run was cancelled
    Exhausted,
}

/// Engine state, as reported in trace logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not running yet
    Idle,
    /// Applying the candidate speed
    SwitchingSpeed,
    /// Pulsing the reset line
    Resetting,
    /// Waiting for the next byte
    Waiting,
    /// Scoring a received byte
    Classifying,
    /// The candidate was accepted
    Accepted,
    /// The candidate was rejected
    Rejected,
    /// The candidate stayed silent
    TimedOut,
    /// The run is over
    Done,
}

/// Why a candidate was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// A byte that cannot appear in text
    InvalidByte(u8),
    /// Invalid bytes kept arriving until the trial deadline
    Noise,
    /// Text arrived but never met the acceptance rule before the deadline
    Inconclusive,
    /// The transport failed for this speed
    Transport(String),
}

/// How one trial ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialOutcome {
    /// The speed is correct
    Accepted,
    /// The speed is wrong
    Rejected(RejectReason),
    /// Nothing was received
    TimedOut,
    /// The run was cancelled mid-trial
    Cancelled,
}

/// Called once with the accepted speed, before the run returns
///
/// This is where an interactive confirmation or a terminal session lives.
/// It never runs during scanning.
pub trait AcceptHandler: Send {
    /// Handle the accepted speed; errors are reported but do not change the result
    fn on_accept(&mut self, speed: Speed, transport: &mut dyn Transport) -> Result<(), TransportError>;
}

impl<F> AcceptHandler for F
where
    F: FnMut(Speed, &mut dyn Transport) -> Result<(), TransportError> + Send,
{
    fn on_accept(&mut self, speed: Speed, transport: &mut dyn Transport) -> Result<(), TransportError> {
        self(speed, transport)
    }
}

/// Steps inside a single trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrialStep {
    SwitchingSpeed,
    Resetting,
    Waiting,
    Classifying,
}

impl From<TrialStep> for EngineState {
    fn from(step: TrialStep) -> Self {
        match step {
            TrialStep::SwitchingSpeed => EngineState::SwitchingSpeed,
            TrialStep::Resetting => EngineState::Resetting,
            TrialStep::Waiting => EngineState::Waiting,
            TrialStep::Classifying => EngineState::Classifying,
        }
    }
}

/// Baudrate detection over an exclusively owned transport
pub struct DetectionEngine<T: Transport> {
    transport: T,
    settings: EngineSettings,
    trigger: TriggerStrategy,
    reset: ResetStrategy,
    reporter: Box<dyn Reporter>,
    cancel: CancellationToken,
    accept_handler: Option<Box<dyn AcceptHandler>>,
    state: EngineState,
}

impl<T: Transport> DetectionEngine<T> {
    /// Create an engine without reset line or accept handler
    pub fn new(transport: T, settings: EngineSettings) -> Self {
        let trigger = TriggerStrategy::new(settings.trigger.clone());
        Self {
            transport,
            settings,
            trigger,
            reset: ResetStrategy::disabled(),
            reporter: Box::new(TracingReporter),
            cancel: CancellationToken::new(),
            accept_handler: None,
            state: EngineState::Idle,
        }
    }

    /// Validate `config` and create an engine from it
    ///
    /// The reset line is hardware specific and attached with [`Self::with_reset`].
    pub fn from_config(transport: T, config: &DetectionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(transport, config.engine_settings()?))
    }

    /// Pulse a reset line before each trial
    pub fn with_reset(mut self, reset: ResetStrategy) -> Self {
        self.reset = reset;
        self
    }

    /// Send feedback to `reporter` instead of the log
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Stop when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Hand the accepted speed and transport to `handler`
    pub fn with_accept_handler(mut self, handler: Box<dyn AcceptHandler>) -> Self {
        self.accept_handler = Some(handler);
        self
    }

    /// Current state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Give the transport back
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Try every candidate until one is accepted
    ///
    /// Cancellation yields `Ok(Exhausted)`. The only error is losing the
    /// device. The reset line is left idle in every case.
    pub fn run(
        &mut self,
        candidates: impl IntoIterator<Item = Speed>,
    ) -> Result<DetectionResult, DetectionError> {
        self.transition(EngineState::Idle);
        self.reporter.report(ReportEvent::Info(
            "Starting baudrate detection, turn on your serial device now".to_string(),
        ));

        let result = match self.reset.release() {
            Err(e) if e.is_fatal() => Err(DetectionError::TransportLost(e)),
            other => {
                if let Err(e) = other {
                    warn!("failed to set reset line idle: {}", e);
                }
                self.scan(candidates)
            }
        };

        if let Err(e) = self.reset.release() {
            warn!("failed to release reset line: {}", e);
        }
        self.transition(EngineState::Done);

        if let Err(e) = &result {
            self.reporter.report(ReportEvent::Error(e.to_string()));
        }
        result
    }

    fn scan(
        &mut self,
        candidates: impl IntoIterator<Item = Speed>,
    ) -> Result<DetectionResult, DetectionError> {
        for speed in candidates {
            if self.cancel.is_cancelled() {
                break;
            }

            let outcome = self.run_trial(speed);
            self.reporter.progress_done();

            match outcome? {
                TrialOutcome::Accepted => {
                    self.transition(EngineState::Accepted);
                    self.reporter.report(ReportEvent::Result(format!(
                        "Valid baudrate found: {}",
                        speed
                    )));
                    self.hand_off(speed);
                    return Ok(DetectionResult::Found(speed));
                }
                TrialOutcome::Rejected(reason) => {
                    self.transition(EngineState::Rejected);
                    debug!(speed, ?reason, "candidate rejected");
                    let message = match reason {
                        RejectReason::Transport(e) => format!("Skipping baudrate {}: {}", speed, e),
                        _ => format!("{} does not appear to be a valid baudrate setting...", speed),
                    };
                    self.reporter.report(ReportEvent::Warning(message));
                }
                TrialOutcome::TimedOut => {
                    self.transition(EngineState::TimedOut);
                    self.reporter.report(ReportEvent::Warning(format!(
                        "No data received using the following baudrate value: {}...",
                        speed
                    )));
                }
                TrialOutcome::Cancelled => break,
            }
        }

        if self.cancel.is_cancelled() {
            self.reporter
                .report(ReportEvent::Info("Baudrate detection cancelled".to_string()));
        } else {
            self.reporter
                .report(ReportEvent::Warning("No valid baudrate found".to_string()));
        }
        Ok(DetectionResult::Exhausted)
    }

    /// One candidate, with a fresh scorer
    fn run_trial(&mut self, speed: Speed) -> Result<TrialOutcome, DetectionError> {
        let mut scorer = TrialScorer::new(self.settings.threshold, self.settings.invalid_policy);
        // Starts once the target is out of reset
        let mut listening_since: Option<Instant> = None;
        let mut step = TrialStep::SwitchingSpeed;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(TrialOutcome::Cancelled);
            }
            self.transition(step.into());

            step = match step {
                TrialStep::SwitchingSpeed => {
                    self.reporter
                        .report(ReportEvent::Info(format!("Switching to baudrate {}...", speed)));
                    if let Err(e) = self.switch_speed(speed) {
                        return recover(e);
                    }
                    TrialStep::Resetting
                }
                TrialStep::Resetting => match self.reset.apply(&self.cancel) {
                    Ok(true) => TrialStep::Waiting,
                    Ok(false) => return Ok(TrialOutcome::Cancelled),
                    Err(e) if e.is_fatal() => return Err(DetectionError::TransportLost(e)),
                    Err(e) => {
                        warn!(speed, "reset failed, listening anyway: {}", e);
                        TrialStep::Waiting
                    }
                },
                TrialStep::Waiting => {
                    match listening_since {
                        None => listening_since = Some(Instant::now()),
                        Some(started) if started.elapsed() >= self.settings.trial_timeout => {
                            debug!(speed, state = ?scorer.state(), "trial deadline reached");
                            return Ok(silence_outcome(&scorer));
                        }
                        Some(_) => {}
                    }
                    let waited = self
                        .settings
                        .waiter
                        .wait_for_data(&mut self.transport, &self.cancel);
                    match waited {
                        Ok(WaitOutcome::Data) => TrialStep::Classifying,
                        Ok(WaitOutcome::Cancelled) => return Ok(TrialOutcome::Cancelled),
                        Ok(WaitOutcome::TimedOut) => {
                            if !self.trigger.can_fire(scorer.state().trigger_attempts) {
                                return Ok(silence_outcome(&scorer));
                            }
                            scorer.record_trigger();
                            debug!(speed, attempt = scorer.state().trigger_attempts, "no data, triggering");
                            match self.trigger.fire(&mut self.transport, &self.cancel) {
                                Ok(true) => TrialStep::Waiting,
                                Ok(false) => return Ok(TrialOutcome::Cancelled),
                                Err(e) => return recover(e),
                            }
                        }
                        Err(e) => return recover(e),
                    }
                }
                TrialStep::Classifying => {
                    let bytes = match self.transport.receive(1) {
                        Ok(bytes) => bytes,
                        Err(e) => return recover(e),
                    };
                    match bytes.first() {
                        // Pending count raced with the read; listen again
                        None => TrialStep::Waiting,
                        Some(&byte) => {
                            self.reporter.progress(ProgressUnit(byte));
                            match scorer.observe(classify(byte)) {
                                Decision::Accept => return Ok(TrialOutcome::Accepted),
                                Decision::Reject => {
                                    return Ok(TrialOutcome::Rejected(RejectReason::InvalidByte(byte)))
                                }
                                Decision::Continue => TrialStep::Waiting,
                            }
                        }
                    }
                }
            };
        }
    }

    /// Flush, reconfigure, flush again
    fn switch_speed(&mut self, speed: Speed) -> Result<(), TransportError> {
        self.transport.flush_input()?;
        self.transport.configure(speed)?;
        self.transport.flush_input()
    }

    fn hand_off(&mut self, speed: Speed) {
        if let Some(handler) = self.accept_handler.as_mut() {
            if let Err(e) = handler.on_accept(speed, &mut self.transport) {
                self.reporter
                    .report(ReportEvent::Warning(format!("Post-detection session failed: {}", e)));
            }
        }
    }

    fn transition(&mut self, state: EngineState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "engine state");
            self.state = state;
        }
    }
}

/// Non-fatal transport errors only cost the current candidate
fn recover(err: TransportError) -> Result<TrialOutcome, DetectionError> {
    if err.is_fatal() {
        Err(DetectionError::TransportLost(err))
    } else {
        Ok(TrialOutcome::Rejected(RejectReason::Transport(err.to_string())))
    }
}

/// Outcome when a trial ends without a decision
fn silence_outcome(scorer: &TrialScorer) -> TrialOutcome {
    let state = scorer.state();
    if state.invalid_seen > 0 {
        TrialOutcome::Rejected(RejectReason::Noise)
    } else if state.received > 0 {
        TrialOutcome::Rejected(RejectReason::Inconclusive)
    } else {
        TrialOutcome::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedTarget;
    use std::time::Duration;

    fn fast_settings() -> EngineSettings {
        EngineSettings {
            waiter: crate::waiter::ByteWaiter::new(Duration::from_millis(30), Duration::from_millis(1)),
            trial_timeout: Duration::from_millis(500),
            ..EngineSettings::default()
        }
    }

    #[test]
    fn test_state_ends_done() {
        let target = SimulatedTarget::new(19200, b"Hello there, this is a console.".to_vec());
        let mut engine = DetectionEngine::new(target, fast_settings());
        assert_eq!(engine.state(), EngineState::Idle);
        let result = engine.run(vec![19200]).unwrap();
        assert_eq!(result, DetectionResult::Found(19200));
        assert_eq!(engine.state(), EngineState::Done);
    }

    #[test]
    fn test_rejected_speed_is_not_fatal() {
        let target = SimulatedTarget::new(19200, b"Hello there, this is a console.".to_vec()).reject_speed(9600);
        let mut engine = DetectionEngine::new(target, fast_settings());
        assert_eq!(engine.run(vec![9600, 19200]).unwrap(), DetectionResult::Found(19200));
        assert_eq!(engine.transport().configured_speeds(), &[19200]);
    }

    #[test]
    fn test_zero_deadline_still_listens_once() {
        let target = SimulatedTarget::new(19200, b"Hello there, this is a console.".to_vec());
        let settings = EngineSettings {
            trial_timeout: Duration::ZERO,
            ..fast_settings()
        };
        let mut engine = DetectionEngine::new(target, settings);
        assert_eq!(
            engine.run_trial(19200).unwrap(),
            TrialOutcome::Rejected(RejectReason::Inconclusive)
        );
    }

    #[test]
    fn test_silence_outcome() {
        let mut scorer = TrialScorer::new(20, crate::scorer::InvalidBytePolicy::ResetAndContinue);
        assert_eq!(silence_outcome(&scorer), TrialOutcome::TimedOut);
        scorer.observe(classify(b'x'));
        assert_eq!(silence_outcome(&scorer), TrialOutcome::Rejected(RejectReason::Inconclusive));
        scorer.observe(classify(0x91));
        assert_eq!(silence_outcome(&scorer), TrialOutcome::Rejected(RejectReason::Noise));
    }

    #[test]
    fn test_recover_classifies_errors() {
        assert!(matches!(
            recover(TransportError::Serial("x".into())),
            Ok(TrialOutcome::Rejected(RejectReason::Transport(_)))
        ));
        assert!(matches!(
            recover(TransportError::Disconnected("x".into())),
            Err(DetectionError::TransportLost(_))
        ));
    }
}
