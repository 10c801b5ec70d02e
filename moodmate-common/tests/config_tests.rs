//! Integration tests for configuration resolution
//!
//! Tests that touch `API__URL` / `MOODMATE_API_URL` are marked `#[serial]`
//! so they never race each other on the process environment.

use moodmate_common::config::{
    resolve_backend_url, CompiledDefaults, Settings, TomlConfig, API_URL_ENV,
    MOODMATE_API_URL_ENV,
};
use serial_test::serial;
use std::env;
use std::io::Write;

fn clear_env() {
    env::remove_var(API_URL_ENV);
    env::remove_var(MOODMATE_API_URL_ENV);
}

#[test]
#[serial]
fn test_default_backend_url_when_nothing_configured() {
    clear_env();
    let url = resolve_backend_url(None, &TomlConfig::default()).unwrap();
    assert_eq!(url, CompiledDefaults::default().backend_url);
}

#[test]
#[serial]
fn test_toml_backend_url() {
    clear_env();
    let toml = TomlConfig {
        backend_url: Some("http://toml-host:5000/".to_string()),
        ..Default::default()
    };
    assert_eq!(resolve_backend_url(None, &toml).unwrap(), "http://toml-host:5000");
}

#[test]
#[serial]
fn test_env_beats_toml() {
    clear_env();
    env::set_var(API_URL_ENV, "http://env-host:5000");
    let toml = TomlConfig {
        backend_url: Some("http://toml-host:5000".to_string()),
        ..Default::default()
    };
    assert_eq!(resolve_backend_url(None, &toml).unwrap(), "http://env-host:5000");
    clear_env();
}

#[test]
#[serial]
fn test_api_url_beats_namespaced_variable() {
    clear_env();
    env::set_var(MOODMATE_API_URL_ENV, "http://second:5000");
    assert_eq!(
        resolve_backend_url(None, &TomlConfig::default()).unwrap(),
        "http://second:5000"
    );
    env::set_var(API_URL_ENV, "http://first:5000");
    assert_eq!(
        resolve_backend_url(None, &TomlConfig::default()).unwrap(),
        "http://first:5000"
    );
    clear_env();
}

#[test]
#[serial]
fn test_cli_beats_everything() {
    clear_env();
    env::set_var(API_URL_ENV, "http://env-host:5000");
    let url = resolve_backend_url(Some("https://cli-host"), &TomlConfig::default()).unwrap();
    assert_eq!(url, "https://cli-host");
    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_url_is_rejected() {
    clear_env();
    env::set_var(API_URL_ENV, "ftp://nope");
    assert!(resolve_backend_url(None, &TomlConfig::default()).is_err());
    clear_env();
}

#[test]
fn test_missing_config_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = TomlConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
    assert!(config.backend_url.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "backend_url = \"http://file-host:5000\"\nport = 9100\nmax_upload_mb = 1\n[logging]\nlevel = \"debug\""
    )
    .unwrap();

    let config = TomlConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.backend_url.as_deref(), Some("http://file-host:5000"));
    assert_eq!(config.port, Some(9100));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = [").unwrap();
    assert!(TomlConfig::load(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_settings_merge() {
    clear_env();
    let toml = TomlConfig {
        port: Some(9100),
        bind_address: Some("0.0.0.0".to_string()),
        max_upload_mb: Some(2),
        ..Default::default()
    };

    let settings = Settings::resolve(None, None, None, &toml).unwrap();
    assert_eq!(settings.port, 9100);
    assert_eq!(settings.bind_address, "0.0.0.0");
    assert_eq!(settings.max_upload_bytes, 2 * 1024 * 1024);
    assert_eq!(settings.request_timeout_secs, 120);
    assert_eq!(settings.session_idle_minutes, 60);
    assert_eq!(settings.backend_url, "http://localhost:5000");

    let settings =
        Settings::resolve(Some("http://cli:1"), Some(8000), Some("127.0.0.2"), &toml).unwrap();
    assert_eq!(settings.port, 8000);
    assert_eq!(settings.bind_address, "127.0.0.2");
    assert_eq!(settings.backend_url, "http://cli:1");
}

#[test]
#[serial]
fn test_session_idle_minutes_from_toml() {
    clear_env();
    let toml = TomlConfig::parse("session_idle_minutes = 15\n").unwrap();
    let settings = Settings::resolve(None, None, None, &toml).unwrap();
    assert_eq!(settings.session_idle_minutes, 15);

    let toml = TomlConfig::parse("session_idle_minutes = 0\n").unwrap();
    let settings = Settings::resolve(None, None, None, &toml).unwrap();
    assert_eq!(settings.session_idle_minutes, 1);
}
