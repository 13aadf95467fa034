//! Simulated UART target
//!
//! An in-memory [`Transport`] that behaves like a device fixed at one speed:
//! readable text when the host matches that speed, line noise or silence
//! otherwise. Used by demo mode and by the engine tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::classify::CONTROL_BYTES;
use crate::reset::{Level, ResetLine};
use crate::transport::{Transport, TransportError};
use crate::Speed;

/// Boot banner used by demo mode
pub const DEMO_BANNER: &[u8] = b"U-Boot 2023.04 (Jan 01 2024)\r\n\r\nDRAM:  256 MiB\r\nLoading kernel image...\r\nStarting kernel, please wait.\r\nlogin: ";

/// What the simulated target sends when the host listens at the wrong speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Noise {
    /// Nothing at all
    Silent,
    /// This many bytes of high-bit garbage after each speed switch
    Garbage(usize),
}

/// In-memory device with a fixed true speed
pub struct SimulatedTarget {
    true_speed: Option<Speed>,
    banner: Vec<u8>,
    noise: Noise,
    repeat_banner: bool,
    quiet_until_triggered: bool,
    reset_line: Option<SimulatedResetLine>,
    seen_pulses: usize,
    rejected_speeds: Vec<Speed>,
    disconnect_at: Option<Speed>,
    current_speed: Option<Speed>,
    configured: Vec<Speed>,
    transmitted: Vec<u8>,
    rx: VecDeque<u8>,
    rng: StdRng,
}

impl SimulatedTarget {
    /// Target that prints `banner` once whenever the host switches to `true_speed`
    pub fn new(true_speed: Speed, banner: Vec<u8>) -> Self {
        Self {
            true_speed: Some(true_speed),
            banner,
            noise: Noise::Silent,
            repeat_banner: false,
            quiet_until_triggered: false,
            reset_line: None,
            seen_pulses: 0,
            rejected_speeds: Vec::new(),
            disconnect_at: None,
            current_speed: None,
            configured: Vec::new(),
            transmitted: Vec::new(),
            rx: VecDeque::new(),
            rng: StdRng::seed_from_u64(0x5eed),
        }
    }

    /// Target that never sends anything
    pub fn silent() -> Self {
        let mut target = Self::new(0, Vec::new());
        target.true_speed = None;
        target
    }

    /// Demo target: boot banner at `true_speed`, garbage elsewhere
    pub fn demo(true_speed: Speed) -> Self {
        let mut target = Self::new(true_speed, DEMO_BANNER.to_vec()).with_noise(Noise::Garbage(64));
        target.rng = StdRng::from_entropy();
        target
    }

    /// Set wrong-speed behaviour
    pub fn with_noise(mut self, noise: Noise) -> Self {
        self.noise = noise;
        self
    }

    /// Keep sending the banner for as long as the speed matches
    pub fn repeating(mut self) -> Self {
        self.repeat_banner = true;
        self
    }

    /// Only print the banner after receiving any bytes
    pub fn quiet_until_triggered(mut self) -> Self {
        self.quiet_until_triggered = true;
        self
    }

    /// Only print the banner after a pulse on `line`
    pub fn boot_on_reset(mut self, line: &SimulatedResetLine) -> Self {
        self.reset_line = Some(line.clone());
        self
    }

    /// Refuse to switch to `speed`
    pub fn reject_speed(mut self, speed: Speed) -> Self {
        self.rejected_speeds.push(speed);
        self
    }

    /// Report the device as gone when asked to switch to `speed`
    pub fn disconnect_at(mut self, speed: Speed) -> Self {
        self.disconnect_at = Some(speed);
        self
    }

    /// Every speed successfully applied, in order
    pub fn configured_speeds(&self) -> &[Speed] {
        &self.configured
    }

    /// Everything the host sent
    pub fn transmitted(&self) -> &[u8] {
        &self.transmitted
    }

    fn at_true_speed(&self) -> bool {
        self.true_speed.is_some() && self.current_speed == self.true_speed
    }

    fn queue_banner(&mut self) {
        self.rx.extend(self.banner.iter().copied());
    }

    fn queue_noise(&mut self, count: usize) {
        for _ in 0..count {
            let byte = loop {
                let b: u8 = self.rng.gen_range(0x80..=0xFF);
                if !CONTROL_BYTES.contains(&b) {
                    break b;
                }
            };
            self.rx.push_back(byte);
        }
    }

    fn poll_reset(&mut self) {
        let Some(line) = self.reset_line.as_ref() else {
            return;
        };
        let pulses = line.pulses();
        if pulses > self.seen_pulses {
            self.seen_pulses = pulses;
            if self.at_true_speed() {
                self.rx.clear();
                self.queue_banner();
            } else if let Noise::Garbage(n) = self.noise {
                self.queue_noise(n);
            }
        }
    }
}

impl Transport for SimulatedTarget {
    fn configure(&mut self, speed: Speed) -> Result<(), TransportError> {
        if self.disconnect_at == Some(speed) {
            return Err(TransportError::Disconnected("simulated unplug".to_string()));
        }
        if self.rejected_speeds.contains(&speed) {
            return Err(TransportError::SpeedRejected {
                speed,
                reason: "unsupported by simulated adapter".to_string(),
            });
        }
        self.current_speed = Some(speed);
        self.configured.push(speed);
        self.rx.clear();

        // A target waiting for reset or trigger stays quiet after a switch
        if self.reset_line.is_some() || self.quiet_until_triggered {
            return Ok(());
        }
        if self.at_true_speed() {
            self.queue_banner();
        } else if let Noise::Garbage(n) = self.noise {
            self.queue_noise(n);
        }
        Ok(())
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.transmitted.extend_from_slice(bytes);
        if self.quiet_until_triggered && self.at_true_speed() {
            self.queue_banner();
        }
        Ok(())
    }

    fn receive(&mut self, n: usize) -> Result<Vec<u8>, TransportError> {
        let take = n.min(self.rx.len());
        Ok(self.rx.drain(..take).collect())
    }

    fn pending_byte_count(&mut self) -> Result<usize, TransportError> {
        self.poll_reset();
        if self.rx.is_empty() && self.repeat_banner && self.at_true_speed() {
            self.queue_banner();
        }
        Ok(self.rx.len())
    }

    fn flush_input(&mut self) -> Result<(), TransportError> {
        // Output queued by a speed switch models bytes still on the wire
        Ok(())
    }
}

/// Reset line that records every level it is driven to
///
/// Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct SimulatedResetLine {
    history: Arc<Mutex<Vec<Level>>>,
}

impl SimulatedResetLine {
    /// Create a line with an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels driven so far, oldest first
    pub fn history(&self) -> Vec<Level> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Most recent level, if any
    pub fn level(&self) -> Option<Level> {
        self.history().last().copied()
    }

    /// Completed pulses: returns to the first recorded level after leaving it
    pub fn pulses(&self) -> usize {
        let history = self.history();
        let Some(&idle) = history.first() else {
            return 0;
        };
        history
            .windows(2)
            .filter(|w| w[0] != idle && w[1] == idle)
            .count()
    }
}

impl ResetLine for SimulatedResetLine {
    fn set_level(&mut self, level: Level) -> Result<(), TransportError> {
        self.history
            .lock()
            .map_err(|_| TransportError::Serial("reset line state poisoned".to_string()))?
            .push(level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_only_at_true_speed() {
        let mut target = SimulatedTarget::new(19200, b"hello".to_vec());
        target.configure(9600).unwrap();
        assert_eq!(target.pending_byte_count().unwrap(), 0);
        target.configure(19200).unwrap();
        assert_eq!(target.receive(10).unwrap(), b"hello".to_vec());
    }

    #[test]
    fn test_noise_avoids_text_and_control_bytes() {
        let mut target = SimulatedTarget::new(19200, Vec::new()).with_noise(Noise::Garbage(200));
        target.configure(9600).unwrap();
        let noise = target.receive(200).unwrap();
        assert_eq!(noise.len(), 200);
        assert!(noise.iter().all(|b| *b >= 0x80 && !CONTROL_BYTES.contains(b)));
    }

    #[test]
    fn test_pulse_counting() {
        let mut line = SimulatedResetLine::new();
        for level in [Level::High, Level::Low, Level::High, Level::Low, Level::High] {
            line.set_level(level).unwrap();
        }
        assert_eq!(line.pulses(), 2);
    }

    #[test]
    fn test_rejected_speed() {
        let mut target = SimulatedTarget::silent().reject_speed(1);
        assert!(matches!(
            target.configure(1),
            Err(TransportError::SpeedRejected { speed: 1, .. })
        ));
        assert!(target.configured_speeds().is_empty());
    }
}
