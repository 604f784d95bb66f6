//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::models::guess::MatchMode;
use crate::{AppError, Result};

/// Keychain service name credentials are stored under.
const KEYRING_SERVICE: &str = "chunibot";

/// Nested Slack configuration for Socket Mode connectivity.
///
/// Tokens are loaded at runtime via OS keychain or environment variables,
/// not from the TOML config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlackConfig {
    /// App-level token used for Socket Mode (populated at runtime).
    #[serde(skip)]
    pub app_token: String,
    /// Bot user token used for posting messages (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

/// Settings for the guess-the-song minigame.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GuessConfig {
    /// Seconds a round stays open before timing out.
    #[serde(default = "default_guess_timeout")]
    pub timeout_seconds: u64,
    /// Edge length, in pixels, of the square cut from the jacket.
    #[serde(default = "default_crop_size")]
    pub crop_size: u32,
    /// Minimum Jaro-Winkler similarity accepted in lenient mode.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Mode used when `/guess` is invoked without an argument.
    #[serde(default)]
    pub default_mode: MatchMode,
}

impl Default for GuessConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_guess_timeout(),
            crop_size: default_crop_size(),
            similarity_threshold: default_similarity_threshold(),
            default_mode: MatchMode::default(),
        }
    }
}

impl GuessConfig {
    /// Round timeout as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_guess_timeout() -> u64 {
    20
}

fn default_crop_size() -> u32 {
    90
}

fn default_similarity_threshold() -> f64 {
    0.9
}

/// Settings for the HTTP login relay.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoginConfig {
    /// Whether the relay endpoint is served at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Loopback port the relay binds to.
    #[serde(default = "default_login_port")]
    pub port: u16,
    /// Seconds a `/login` flow waits for the relay callback.
    #[serde(default = "default_login_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_login_port(),
            timeout_seconds: default_login_timeout(),
        }
    }
}

impl LoginConfig {
    /// How long a `/login` flow waits, as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_true() -> bool {
    true
}

fn default_login_port() -> u16 {
    5730
}

fn default_login_timeout() -> u64 {
    300
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data").join("chunibot.sqlite3")
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Location of the `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Base URL jacket file names are appended to.
    pub jacket_base_url: String,
    /// Slack user IDs allowed to run owner-only commands.
    #[serde(default)]
    pub authorized_user_ids: Vec<String>,
    /// Slack connectivity settings.
    #[serde(default)]
    pub slack: SlackConfig,
    /// Minigame settings.
    #[serde(default)]
    pub guess: GuessConfig,
    /// Login relay settings.
    #[serde(default)]
    pub login: LoginConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load Slack credentials from OS keychain with env-var fallback.
    ///
    /// Tries the `chunibot` keyring service first, then falls back to
    /// `SLACK_APP_TOKEN` / `SLACK_BOT_TOKEN` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither keychain nor env vars provide
    /// the required tokens.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.slack.app_token = load_credential("slack_app_token", "SLACK_APP_TOKEN").await?;
        self.slack.bot_token = load_credential("slack_bot_token", "SLACK_BOT_TOKEN").await?;
        Ok(())
    }

    /// Validate that a Slack user may run owner-only commands.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if the user is not in the allowed list.
    pub fn ensure_authorized(&self, user_id: &str) -> Result<()> {
        if self.authorized_user_ids.iter().any(|id| id == user_id) {
            Ok(())
        } else {
            Err(AppError::Unauthorized("user is not authorized".into()))
        }
    }

    fn validate(&self) -> Result<()> {
        if self.jacket_base_url.trim().is_empty() {
            return Err(AppError::Config("jacket_base_url must not be empty".into()));
        }

        if self.guess.timeout_seconds == 0 {
            return Err(AppError::Config(
                "guess.timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.guess.crop_size == 0 {
            return Err(AppError::Config(
                "guess.crop_size must be greater than zero".into(),
            ));
        }

        let threshold = self.guess.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(AppError::Config(format!(
                "guess.similarity_threshold must be in (0, 1], got {threshold}"
            )));
        }

        if self.login.enabled && self.login.timeout_seconds == 0 {
            return Err(AppError::Config(
                "login.timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // keyring is synchronous I/O.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYRING_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    match env::var(env_key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))),
    }
}
