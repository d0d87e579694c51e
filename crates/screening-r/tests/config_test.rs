use screening_r::config::{ConfigError, ConfigLoader};
use std::io::Write;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_load_from_file() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        "agent:\n  default_wait_timeout_ms: 2500\ntransport:\n  controller: \"http://10.0.0.2:9001\"\nlogging:\n  filter: \"screening_core=debug\""
    )?;

    let config = ConfigLoader::load_from(file.path()).await?;
    assert_eq!(config.agent.default_wait_timeout_ms, 2500);
    assert_eq!(config.agent.poll_interval_ms, 500);
    assert_eq!(config.transport.controller, "http://10.0.0.2:9001");
    assert_eq!(config.logging.filter, "screening_core=debug");
    Ok(())
}

#[tokio::test]
async fn test_empty_file_uses_defaults() -> anyhow::Result<()> {
    let file = NamedTempFile::new()?;
    let config = ConfigLoader::load_from(file.path()).await?;
    assert_eq!(config.transport.path, "/agent");
    Ok(())
}

#[tokio::test]
async fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConfigLoader::load_from(&dir.path().join("nope.yaml"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[tokio::test]
async fn test_invalid_yaml() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "agent: [unclosed")?;
    let err = ConfigLoader::load_from(file.path()).await.unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
    Ok(())
}

#[test]
fn test_search_paths_prefer_working_directory() {
    let paths = ConfigLoader::search_paths();
    assert!(paths[0].ends_with("screening.yaml"));
    if let Some(home) = dirs::home_dir() {
        assert_eq!(paths[1], home.join(".screening").join("config.yaml"));
    }
}
