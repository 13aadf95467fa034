use baudscan_core::config::DetectionConfig;
use baudscan_core::scorer::InvalidBytePolicy;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "baudscan", version, about = "UART baudrate detection")]
pub struct Cli {
    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,
    #[arg(
        long,
        global = true,
        help = "Config file (defaults to <config dir>/baudscan/config.json when present)"
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect the baudrate of the device on a serial port
    Detect(DetectArgs),
    /// List available serial ports
    ListPorts,
    /// Run detection against a simulated device
    Demo {
        #[arg(long, default_value_t = 19200, help = "Speed the simulated device talks at")]
        speed: u32,
        #[command(flatten)]
        args: DetectArgs,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyArg {
    FailFast,
    ResetAndContinue,
}

impl From<PolicyArg> for InvalidBytePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FailFast => InvalidBytePolicy::FailFast,
            PolicyArg::ResetAndContinue => InvalidBytePolicy::ResetAndContinue,
        }
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct DetectArgs {
    #[arg(long, short, help = "Serial device, e.g. /dev/ttyUSB0")]
    pub port: Option<String>,
    #[arg(long, help = "Candidate mode: 'incremental' or 'list'")]
    pub mode: Option<String>,
    #[arg(long, help = "Adapter output wired to the target reset: 'dtr' or 'rts'")]
    pub reset_pin: Option<String>,
    #[arg(long, help = "Level that resets the target: 'low' or 'high'")]
    pub reset_dir: Option<String>,
    #[arg(long)]
    pub reset_hold_ms: Option<u64>,
    #[arg(long)]
    pub reset_delay_ms: Option<u64>,
    #[arg(
        long,
        overrides_with = "no_trigger",
        help = "Send the trigger payload when nothing is received"
    )]
    pub trigger: bool,
    #[arg(long, overrides_with = "trigger", help = "Never send the trigger payload")]
    pub no_trigger: bool,
    #[arg(long, help = "Trigger payload as raw hex, no leading '0x'")]
    pub trigger_char: Option<String>,
    #[arg(long)]
    pub trigger_max_attempts: Option<u32>,
    #[arg(long, help = "Lowest speed to try (incremental mode)")]
    pub min: Option<u32>,
    #[arg(long, help = "Exclusive upper bound (incremental mode)")]
    pub max: Option<u32>,
    #[arg(long, help = "Increment between speeds (incremental mode)")]
    pub step: Option<u32>,
    #[arg(long, help = "Comma separated speeds (list mode)")]
    pub list: Option<String>,
    #[arg(long)]
    pub wait_timeout_ms: Option<u64>,
    #[arg(long)]
    pub trial_timeout_ms: Option<u64>,
    #[arg(long, help = "Counted bytes required to accept a speed")]
    pub threshold: Option<usize>,
    #[arg(long, value_enum)]
    pub invalid_policy: Option<PolicyArg>,
    #[arg(long, default_value_t = false, help = "Do not offer a terminal session after detection")]
    pub no_prompt: bool,
}

impl DetectArgs {
    /// Overlay the flags that were given on top of `config`
    pub fn apply(&self, config: &mut DetectionConfig) {
        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if let Some(mode) = &self.mode {
            config.mode = mode.clone();
        }
        if let Some(pin) = &self.reset_pin {
            config.reset_pin = Some(pin.clone());
        }
        if let Some(dir) = &self.reset_dir {
            config.reset_dir = dir.clone();
        }
        if let Some(ms) = self.reset_hold_ms {
            config.reset_hold_ms = ms;
        }
        if let Some(ms) = self.reset_delay_ms {
            config.reset_delay_ms = ms;
        }
        if self.trigger {
            config.trigger = true;
        } else if self.no_trigger {
            config.trigger = false;
        }
        if let Some(payload) = &self.trigger_char {
            config.trigger_char = payload.clone();
        }
        if let Some(n) = self.trigger_max_attempts {
            config.trigger_max_attempts = n;
        }
        if let Some(min) = self.min {
            config.baudrate_min = min;
        }
        if let Some(max) = self.max {
            config.baudrate_max = max;
        }
        if let Some(step) = self.step {
            config.baudrate_increment = step;
        }
        if let Some(list) = &self.list {
            config.baudrate_list = list.clone();
        }
        if let Some(ms) = self.wait_timeout_ms {
            config.wait_timeout_ms = ms;
        }
        if let Some(ms) = self.trial_timeout_ms {
            config.trial_timeout_ms = ms;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(policy) = self.invalid_policy {
            config.invalid_policy = policy.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detect_flags() {
        let cli = Cli::parse_from([
            "baudscan",
            "detect",
            "--port",
            "/dev/ttyUSB0",
            "--mode",
            "list",
            "--list",
            "9600,115200",
            "--trigger",
            "--invalid-policy",
            "reset-and-continue",
        ]);
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };

        let mut config = DetectionConfig::default();
        args.apply(&mut config);
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.mode, "list");
        assert_eq!(config.baudrate_list, "9600,115200");
        assert!(config.trigger);
        assert_eq!(config.invalid_policy, InvalidBytePolicy::ResetAndContinue);
    }

    #[test]
    fn test_unset_flags_keep_config_values() {
        let mut config = DetectionConfig {
            threshold: 40,
            trigger: true,
            ..DetectionConfig::default()
        };
        DetectArgs::default().apply(&mut config);
        assert_eq!(config.threshold, 40);
        assert!(config.trigger);
    }

    #[test]
    fn test_no_trigger_overrides_config() {
        let cli = Cli::parse_from(["baudscan", "detect", "--no-trigger"]);
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        let mut config = DetectionConfig {
            trigger: true,
            ..DetectionConfig::default()
        };
        args.apply(&mut config);
        assert!(!config.trigger);
    }

    #[test]
    fn test_last_trigger_flag_wins() {
        let cli = Cli::parse_from(["baudscan", "detect", "--no-trigger", "--trigger"]);
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        let mut config = DetectionConfig::default();
        args.apply(&mut config);
        assert!(config.trigger);
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
