//! Post-detection confirmation and passthrough terminal

use baudscan_core::cancel::CancellationToken;
use baudscan_core::engine::AcceptHandler;
use baudscan_core::transport::{Transport, TransportError};
use baudscan_core::Speed;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;
use tracing::info;

/// Pause between two passthrough polls
const PASSTHROUGH_POLL_MS: u64 = 5;

/// Bytes read from the target per poll
const PASSTHROUGH_CHUNK: usize = 256;

/// Asks whether to open a terminal on the detected speed and runs it
pub struct SessionHandler {
    cancel: CancellationToken,
    prompt: bool,
}

impl SessionHandler {
    pub fn new(cancel: CancellationToken, prompt: bool) -> Self {
        Self { cancel, prompt }
    }
}

impl AcceptHandler for SessionHandler {
    fn on_accept(&mut self, speed: Speed, transport: &mut dyn Transport) -> Result<(), TransportError> {
        if !self.prompt || !confirm("Would you like to open a miniterm session ? N/y: ")? {
            return Ok(());
        }
        info!(speed, "Opening terminal session, press Ctrl+C to exit");
        passthrough(transport, &self.cancel, spawn_stdin_reader(), &mut io::stdout())
    }
}

/// Read one answer from stdin; only 'y' or 'Y' confirms
fn confirm(question: &str) -> io::Result<bool> {
    print!("{}", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Forward stdin lines on a channel; the channel closes at end of input
fn spawn_stdin_reader() -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(mut line) = line else { break };
            line.push_str("\r\n");
            if tx.send(line.into_bytes()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Bridge `input` to the target and the target to `output` until
/// cancellation or end of input
pub fn passthrough(
    transport: &mut dyn Transport,
    cancel: &CancellationToken,
    input: Receiver<Vec<u8>>,
    output: &mut dyn Write,
) -> Result<(), TransportError> {
    loop {
        if cancel.is_cancelled() {
            return Ok(());
        }

        let pending = transport.pending_byte_count()?;
        if pending > 0 {
            let bytes = transport.receive(pending.min(PASSTHROUGH_CHUNK))?;
            output.write_all(&bytes)?;
            output.flush()?;
        }

        match input.try_recv() {
            Ok(line) => transport.transmit(&line)?,
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return Ok(()),
        }

        if !cancel.sleep(Duration::from_millis(PASSTHROUGH_POLL_MS)) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baudscan_core::sim::SimulatedTarget;

    #[test]
    fn test_passthrough_bridges_both_ways() {
        let mut target = SimulatedTarget::new(9600, b"login: ".to_vec()).quiet_until_triggered();
        target.configure(9600).unwrap();

        let (tx, rx) = mpsc::channel();
        tx.send(b"root\r\n".to_vec()).unwrap();
        drop(tx);

        let mut output = Vec::new();
        passthrough(&mut target, &CancellationToken::new(), rx, &mut output).unwrap();

        assert_eq!(target.transmitted(), b"root\r\n");
        assert_eq!(output, b"login: ".to_vec());
    }

    #[test]
    fn test_passthrough_stops_on_cancel() {
        let mut target = SimulatedTarget::new(9600, b"U-Boot> ".to_vec());
        target.configure(9600).unwrap();
        let (_tx, rx) = mpsc::channel::<Vec<u8>>();
        let cancel = CancellationToken::new();
        let remote = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });

        let mut output = Vec::new();
        passthrough(&mut target, &cancel, rx, &mut output).unwrap();
        assert_eq!(output, b"U-Boot> ".to_vec());
    }
}
