//! Unit tests for configuration parsing and validation.

use std::path::PathBuf;
use std::time::Duration;

use chunibot::config::GlobalConfig;
use chunibot::models::guess::MatchMode;
use chunibot::AppError;

const MINIMAL: &str = r#"jacket_base_url = "https://example.com/img""#;

fn parse_err(toml: &str) -> String {
    match GlobalConfig::from_toml_str(toml) {
        Err(AppError::Config(msg)) => msg,
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn minimal_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str(MINIMAL).expect("valid config");

    assert_eq!(config.db_path, PathBuf::from("data").join("chunibot.sqlite3"));
    assert!(config.authorized_user_ids.is_empty());
    assert_eq!(config.guess.timeout_seconds, 20);
    assert_eq!(config.guess.timeout(), Duration::from_secs(20));
    assert_eq!(config.guess.crop_size, 90);
    assert!((config.guess.similarity_threshold - 0.9).abs() < f64::EPSILON);
    assert_eq!(config.guess.default_mode, MatchMode::Lenient);
    assert!(config.login.enabled);
    assert_eq!(config.login.port, 5730);
    assert_eq!(config.login.timeout(), Duration::from_secs(300));
    assert!(config.slack.app_token.is_empty());
    assert!(config.slack.bot_token.is_empty());
}

#[test]
fn full_config_parses_every_section() {
    let toml = r#"
db_path = "/tmp/bot.sqlite3"
jacket_base_url = "https://example.com/img"
authorized_user_ids = ["U1", "U2"]

[slack]

[guess]
timeout_seconds = 5
crop_size = 64
similarity_threshold = 0.85
default_mode = "strict"

[login]
enabled = false
port = 8080
timeout_seconds = 60
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("valid config");

    assert_eq!(config.db_path, PathBuf::from("/tmp/bot.sqlite3"));
    assert_eq!(config.authorized_user_ids, vec!["U1", "U2"]);
    assert_eq!(config.guess.timeout_seconds, 5);
    assert_eq!(config.guess.crop_size, 64);
    assert_eq!(config.guess.default_mode, MatchMode::Strict);
    assert!(!config.login.enabled);
    assert_eq!(config.login.port, 8080);
    assert_eq!(config.login.timeout_seconds, 60);
}

#[test]
fn slack_tokens_are_never_read_from_file() {
    let toml = r#"
jacket_base_url = "https://example.com/img"

[slack]
app_token = "xapp-from-file"
bot_token = "xoxb-from-file"
"#;
    let config = GlobalConfig::from_toml_str(toml).expect("valid config");
    assert!(config.slack.app_token.is_empty());
    assert!(config.slack.bot_token.is_empty());
}

#[test]
fn missing_jacket_base_url_is_rejected() {
    assert!(GlobalConfig::from_toml_str("").is_err());
}

#[test]
fn blank_jacket_base_url_is_rejected() {
    let msg = parse_err(r#"jacket_base_url = "  ""#);
    assert!(msg.contains("jacket_base_url"));
}

#[test]
fn zero_guess_timeout_is_rejected() {
    let msg = parse_err(&format!("{MINIMAL}\n[guess]\ntimeout_seconds = 0\n"));
    assert!(msg.contains("timeout_seconds"));
}

#[test]
fn zero_crop_size_is_rejected() {
    let msg = parse_err(&format!("{MINIMAL}\n[guess]\ncrop_size = 0\n"));
    assert!(msg.contains("crop_size"));
}

#[test]
fn threshold_outside_unit_interval_is_rejected() {
    for bad in ["0.0", "1.5", "-0.2"] {
        let msg = parse_err(&format!(
            "{MINIMAL}\n[guess]\nsimilarity_threshold = {bad}\n"
        ));
        assert!(msg.contains("similarity_threshold"), "{bad}: {msg}");
    }
}

#[test]
fn threshold_of_one_is_allowed() {
    let config =
        GlobalConfig::from_toml_str(&format!("{MINIMAL}\n[guess]\nsimilarity_threshold = 1.0\n"))
            .expect("valid config");
    assert!((config.guess.similarity_threshold - 1.0).abs() < f64::EPSILON);
}

#[test]
fn unknown_default_mode_is_rejected() {
    assert!(
        GlobalConfig::from_toml_str(&format!("{MINIMAL}\n[guess]\ndefault_mode = \"fuzzy\"\n"))
            .is_err()
    );
}

#[test]
fn zero_login_timeout_is_rejected_only_when_enabled() {
    let msg = parse_err(&format!("{MINIMAL}\n[login]\ntimeout_seconds = 0\n"));
    assert!(msg.contains("login.timeout_seconds"));

    GlobalConfig::from_toml_str(&format!(
        "{MINIMAL}\n[login]\nenabled = false\ntimeout_seconds = 0\n"
    ))
    .expect("disabled relay ignores timeout");
}

#[test]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, MINIMAL).expect("write config");

    let config = GlobalConfig::load_from_path(&path).expect("load");
    assert_eq!(config.jacket_base_url, "https://example.com/img");
}

#[test]
fn load_from_missing_path_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = GlobalConfig::load_from_path(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn authorization_checks_allow_list() {
    let config = GlobalConfig::from_toml_str(&format!(
        "authorized_user_ids = [\"U_OWNER\"]\n{MINIMAL}\n"
    ))
    .expect("valid config");

    assert!(config.ensure_authorized("U_OWNER").is_ok());
    assert!(matches!(
        config.ensure_authorized("U_OTHER"),
        Err(AppError::Unauthorized(_))
    ));
}
