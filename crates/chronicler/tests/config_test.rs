use chronicler::{ChroniclerConfig, LoggingConfig, QueueConfig, RetryPolicy, SessionConfig};
use std::io::Write;

#[test]
fn test_file_overrides_bundled_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[queue]
retain_failed = true
handler_timeout_secs = 90
store_path = "/var/lib/chronicler/queue.json"

[queue.retry]
max_retries = 5
jitter = true

[session]
delegate_timeout_secs = 15

[logging]
json = true
"#
    )
    .unwrap();

    let config = ChroniclerConfig::from_file(file.path()).unwrap();
    assert!(*config.queue().retain_failed());
    assert_eq!(*config.queue().handler_timeout_secs(), Some(90));
    assert_eq!(
        config.queue().store_path().as_deref(),
        Some(std::path::Path::new("/var/lib/chronicler/queue.json"))
    );
    assert_eq!(*config.queue().retry().max_retries(), 5);
    assert_eq!(*config.queue().retry().factor_millis(), 5000);
    assert!(*config.queue().retry().jitter());
    assert_eq!(*config.session().delegate_timeout_secs(), 15);
    assert!(config.session().internal_prefixes().iter().any(|p| p == "__operation_queue"));
    assert!(*config.logging().json());
    assert_eq!(config.logging().level(), "info");
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ChroniclerConfig::from_file(dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_invalid_value_is_an_error() {
    let result = ChroniclerConfig::from_toml_str("[queue.retry]\nmax_retries = \"many\"\n");
    assert!(result.is_err());
}

#[test]
fn test_toml_output_loads_back() {
    let config = ChroniclerConfig::default()
        .with_queue(
            QueueConfig::default()
                .with_retry(RetryPolicy::none())
                .with_dispatch_interval_ms(1500),
        )
        .with_session(SessionConfig::default().with_delegate_timeout_secs(5))
        .with_logging(LoggingConfig::default().with_level("debug"));

    let toml = config.to_toml().unwrap();
    assert!(toml.contains("[queue.retry]"));
    assert_eq!(ChroniclerConfig::from_toml_str(&toml).unwrap(), config);
}
