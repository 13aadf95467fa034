//! Per-trial scoring
//!
//! A [`TrialScorer`] is created fresh for every candidate speed and dropped
//! when the trial ends. It owns the [`TrialState`] counters; nothing is
//! carried from one candidate to the next.

use serde::{Deserialize, Serialize};

use crate::classify::ByteCategory;

/// Default number of counted bytes required before a speed is accepted
pub const DEFAULT_THRESHOLD: usize = 20;

/// What to do when a byte that cannot appear in text arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidBytePolicy {
    /// Reject the candidate on the first invalid byte
    #[default]
    FailFast,
    /// Clear the counters and keep listening until the trial deadline
    ResetAndContinue,
}

/// Outcome of observing one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Keep listening
    Continue,
    /// Enough text seen; the speed is correct
    Accept,
    /// The speed cannot be correct
    Reject,
}

/// Counters for one candidate speed
///
/// `total` is always the sum of the four counted categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialState {
    /// Counted bytes since the last reset of the counters
    pub total: usize,
    /// Spaces and tabs
    pub whitespace: usize,
    /// Sentence punctuation
    pub punctuation: usize,
    /// Vowels of either case
    pub vowels: usize,
    /// Any other printable ASCII
    pub other_printable: usize,
    /// Every byte observed in this trial, whatever its category
    pub received: usize,
    /// Invalid bytes swallowed under [`InvalidBytePolicy::ResetAndContinue`]
    pub invalid_seen: usize,
    /// Trigger payloads sent during this trial
    pub trigger_attempts: u32,
}

impl TrialState {
    fn clear_counters(&mut self) {
        self.total = 0;
        self.whitespace = 0;
        self.punctuation = 0;
        self.vowels = 0;
        self.other_printable = 0;
    }
}

/// Accept/reject accumulator for one trial
#[derive(Debug, Clone)]
pub struct TrialScorer {
    threshold: usize,
    policy: InvalidBytePolicy,
    state: TrialState,
}

impl Default for TrialScorer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, InvalidBytePolicy::default())
    }
}

impl TrialScorer {
    /// Create a scorer with empty counters
    pub fn new(threshold: usize, policy: InvalidBytePolicy) -> Self {
        Self {
            threshold,
            policy,
            state: TrialState::default(),
        }
    }

    /// Current counters
    pub fn state(&self) -> &TrialState {
        &self.state
    }

    /// Count one trigger attempt
    pub fn record_trigger(&mut self) {
        self.state.trigger_attempts += 1;
    }

    /// Feed one classified byte
    pub fn observe(&mut self, category: ByteCategory) -> Decision {
        let state = &mut self.state;
        state.received += 1;
        match category {
            ByteCategory::Invalid => {
                return match self.policy {
                    InvalidBytePolicy::FailFast => Decision::Reject,
                    InvalidBytePolicy::ResetAndContinue => {
                        state.clear_counters();
                        state.invalid_seen += 1;
                        Decision::Continue
                    }
                };
            }
            ByteCategory::Control => return Decision::Continue,
            ByteCategory::Whitespace => state.whitespace += 1,
            ByteCategory::Punctuation => state.punctuation += 1,
            ByteCategory::Vowel => state.vowels += 1,
            ByteCategory::OtherPrintable => state.other_printable += 1,
        }
        state.total += 1;

        if state.total >= self.threshold && state.whitespace > 0 && state.vowels > 0 {
            Decision::Accept
        } else {
            Decision::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn feed(scorer: &mut TrialScorer, text: &[u8]) -> Vec<Decision> {
        text.iter().map(|&b| scorer.observe(classify(b))).collect()
    }

    fn assert_total_invariant(state: &TrialState) {
        assert_eq!(
            state.total,
            state.whitespace + state.punctuation + state.vowels + state.other_printable
        );
    }

    #[test]
    fn test_accepts_plain_sentence() {
        let mut scorer = TrialScorer::default();
        let decisions = feed(&mut scorer, b"Hello, world! This is a test.\n");
        let accepted_at = decisions
            .iter()
            .position(|d| *d == Decision::Accept)
            .expect("sentence should be accepted");
        assert!(accepted_at < 20);
        assert!(!decisions.contains(&Decision::Reject));
        assert_total_invariant(scorer.state());
    }

    #[test]
    fn test_needs_whitespace() {
        let mut scorer = TrialScorer::default();
        let decisions = feed(&mut scorer, b"abcdefghijklmnopqrstuvwxyz");
        assert!(decisions.iter().all(|d| *d == Decision::Continue));
        assert_eq!(scorer.state().whitespace, 0);
    }

    #[test]
    fn test_needs_vowel() {
        let mut scorer = TrialScorer::default();
        let decisions = feed(&mut scorer, b"XYZ 123 XYZ 123 XYZ 123 XYZ");
        assert!(decisions.iter().all(|d| *d == Decision::Continue));
    }

    #[test]
    fn test_control_bytes_not_counted() {
        let mut scorer = TrialScorer::default();
        for _ in 0..50 {
            assert_eq!(scorer.observe(ByteCategory::Control), Decision::Continue);
        }
        assert_eq!(scorer.state().total, 0);
    }

    #[test]
    fn test_fail_fast_rejects_on_invalid() {
        let mut scorer = TrialScorer::default();
        feed(&mut scorer, b"Hello");
        assert_eq!(scorer.observe(classify(0x85)), Decision::Reject);
    }

    #[test]
    fn test_reset_and_continue_clears_counters() {
        let mut scorer = TrialScorer::new(DEFAULT_THRESHOLD, InvalidBytePolicy::ResetAndContinue);
        feed(&mut scorer, b"Hello there");
        assert_eq!(scorer.observe(ByteCategory::Invalid), Decision::Continue);
        assert_eq!(scorer.state().total, 0);
        assert_eq!(scorer.state().invalid_seen, 1);
        assert_eq!(scorer.state().received, 12);

        let decisions = feed(&mut scorer, b"Booting kernel version 5");
        assert!(decisions.contains(&Decision::Accept));
        assert_total_invariant(scorer.state());
    }

    #[test]
    fn test_custom_threshold() {
        let mut scorer = TrialScorer::new(3, InvalidBytePolicy::FailFast);
        assert_eq!(feed(&mut scorer, b"a b"), vec![
            Decision::Continue,
            Decision::Continue,
            Decision::Accept
        ]);
    }
}
