use screening_core::ScreeningConfig;
use std::time::Duration;

#[test]
fn test_defaults() {
    let config = ScreeningConfig::default();
    assert_eq!(config.agent.poll_interval(), Duration::from_millis(500));
    assert_eq!(config.agent.default_wait_timeout_ms, 10_000);
    assert_eq!(config.agent.long_press(), Duration::from_millis(1500));
    assert_eq!(config.transport.controller, "http://127.0.0.1:9001");
    assert_eq!(config.transport.path, "/agent");
    assert_eq!(config.logging.filter, "info");
}

#[test]
fn test_empty_document_is_default() {
    let config = ScreeningConfig::from_yaml_str("  \n").unwrap();
    assert_eq!(config.agent.poll_interval_ms, 500);
}

#[test]
fn test_partial_override() {
    let yaml = r#"
agent:
  poll_interval_ms: 100
transport:
  controller: "https://screening.example.com/"
"#;
    let config = ScreeningConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.agent.poll_interval_ms, 100);
    assert_eq!(config.agent.long_press_ms, 1500);
    assert_eq!(config.transport.controller, "https://screening.example.com/");
    assert_eq!(config.transport.path, "/agent");
    assert_eq!(config.logging.filter, "info");
}

#[test]
fn test_zero_poll_interval_is_clamped() {
    let config = ScreeningConfig::from_yaml_str("agent:\n  poll_interval_ms: 0\n").unwrap();
    assert_eq!(config.agent.poll_interval_ms, 0);
    assert_eq!(config.agent.poll_interval(), Duration::from_millis(1));
}

#[test]
fn test_wrong_type_is_rejected() {
    let yaml = "agent:\n  poll_interval_ms: soon\n";
    assert!(ScreeningConfig::from_yaml_str(yaml).is_err());
}
