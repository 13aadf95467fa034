//! Terminal reporter

use baudscan_core::report::{ProgressUnit, ReportEvent, Reporter};
use std::io::Write;
use tracing::{error, info, warn};

/// Logs events and redraws a one-line byte preview on stderr
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    line_open: bool,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_line(&mut self) {
        if self.line_open {
            eprintln!();
            self.line_open = false;
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: ReportEvent) {
        self.close_line();
        match event {
            ReportEvent::Info(msg) => info!("{}", msg),
            ReportEvent::Warning(msg) => warn!("{}", msg),
            ReportEvent::Error(msg) => error!("{}", msg),
            ReportEvent::Result(msg) => println!("[+] {}", msg),
        }
    }

    fn progress(&mut self, unit: ProgressUnit) {
        let mut stderr = std::io::stderr().lock();
        // Progress is cosmetic; a closed stderr must not stop detection
        let _ = write!(stderr, "\r[*] Reading bytes: {:<6}", unit.to_string());
        let _ = stderr.flush();
        self.line_open = true;
    }

    fn progress_done(&mut self) {
        self.close_line();
    }
}
