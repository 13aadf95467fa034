use baudscan_core::config::Mode;
use baudscan_core::prelude::*;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_partial_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{
            "port": "/dev/ttyUSB3",
            "mode": "list",
            "baudrate_list": "115200,9600",
            "reset_pin": "rts",
            "reset_dir": "high",
            "trigger": true,
            "trigger_char": "0D"
        }"#,
    )
    .unwrap();

    let config = DetectionConfig::from_file(&path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB3"));
    assert_eq!(config.mode().unwrap(), Mode::List);
    assert_eq!(config.candidates().unwrap().collect::<Vec<_>>(), vec![115200, 9600]);

    let reset = config.reset_config().unwrap();
    assert_eq!(reset.pin, Some(ResetPin::Rts));
    assert_eq!(reset.polarity, ResetPolarity::High);
    assert_eq!(reset.hold, Duration::from_millis(100));

    let trigger = config.trigger_config().unwrap();
    assert!(trigger.enabled);
    assert_eq!(trigger.payload, vec![0x0D]);
    assert_eq!(trigger.max_attempts, 3);
}

#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    let config = DetectionConfig {
        mode: "list".to_string(),
        threshold: 32,
        invalid_policy: InvalidBytePolicy::ResetAndContinue,
        ..DetectionConfig::default()
    };
    config.save(&path).unwrap();

    assert_eq!(DetectionConfig::from_file(&path).unwrap(), config);
}

#[test]
fn test_malformed_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ mode: list").unwrap();

    assert!(matches!(
        DetectionConfig::from_file(&path),
        Err(ConfigError::Parse(_))
    ));
    assert!(matches!(
        DetectionConfig::from_file(&dir.path().join("missing.json")),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_bad_trigger_payload() {
    let config = DetectionConfig {
        trigger_char: "0x0D".to_string(),
        ..DetectionConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidTriggerPayload(_))
    ));
}

#[test]
fn test_incremental_range_checked() {
    let config = DetectionConfig {
        baudrate_min: 9600,
        baudrate_max: 9600,
        ..DetectionConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidRange { min: 9600, max: 9600 })
    ));
}
