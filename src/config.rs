//! Application-level configuration loading: voting defaults, presenter token
//! and storage retry tuning.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};
use uuid::Uuid;

use crate::dao::{retry::RetryPolicy, room_store::memory::DEFAULT_LOCK_WAIT};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_ROOM_BACK_CONFIG_PATH";
/// Environment variable that overrides the configured presenter token.
const ADMIN_TOKEN_ENV: &str = "QUIZ_ROOM_ADMIN_TOKEN";

/// Voting window used when the presenter does not pick one.
pub const DEFAULT_DURATION_SECONDS: u32 = 60;
/// Shortest voting window a presenter may open.
pub const MIN_DURATION_SECONDS: u32 = 10;
/// Longest voting window a presenter may open.
pub const MAX_DURATION_SECONDS: u32 = 3_600;
/// Leaderboard size when the caller does not ask for one.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
/// Largest leaderboard a caller may request.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;
/// Upper bound for a presenter transition, scoring included.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub default_duration_seconds: u32,
    pub leaderboard_limit: usize,
    pub admin_token: String,
    pub retry: RetryPolicy,
    pub transition_timeout: Option<Duration>,
    pub store_lock_wait: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration");
                    raw.into()
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        match env::var(ADMIN_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => config.admin_token = token,
            _ if config.admin_token.is_empty() => {
                config.admin_token = Uuid::new_v4().simple().to_string();
                warn!(
                    token = %config.admin_token,
                    "no presenter token configured; generated one for this run"
                );
            }
            _ => {}
        }

        config
    }

    /// Clamp a requested voting window to the allowed range, or use the default.
    pub fn resolve_duration(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_duration_seconds)
            .clamp(MIN_DURATION_SECONDS, MAX_DURATION_SECONDS)
    }

    /// Clamp a requested leaderboard size, or use the default.
    pub fn resolve_leaderboard_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.leaderboard_limit)
            .min(MAX_LEADERBOARD_LIMIT)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_duration_seconds: DEFAULT_DURATION_SECONDS,
            leaderboard_limit: DEFAULT_LEADERBOARD_LIMIT,
            admin_token: String::new(),
            retry: RetryPolicy::default(),
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
            store_lock_wait: DEFAULT_LOCK_WAIT,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    default_duration_seconds: Option<u32>,
    leaderboard_limit: Option<usize>,
    admin_token: Option<String>,
    #[serde(default)]
    retry: Option<RawRetry>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    transition_timeout_ms: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    store_lock_wait_ms: Option<Duration>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// Retry tuning block inside the configuration file.
struct RawRetry {
    max_attempts: Option<u32>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    base_delay_ms: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    max_delay_ms: Option<Duration>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    jitter_ms: Option<Duration>,
}

impl From<RawRetry> for RetryPolicy {
    fn from(value: RawRetry) -> Self {
        let defaults = RetryPolicy::default();
        Self {
            max_attempts: value.max_attempts.unwrap_or(defaults.max_attempts).max(1),
            base_delay: value.base_delay_ms.unwrap_or(defaults.base_delay),
            max_delay: value.max_delay_ms.unwrap_or(defaults.max_delay),
            jitter: value.jitter_ms.unwrap_or(defaults.jitter),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            default_duration_seconds: value
                .default_duration_seconds
                .unwrap_or(defaults.default_duration_seconds)
                .clamp(MIN_DURATION_SECONDS, MAX_DURATION_SECONDS),
            leaderboard_limit: value
                .leaderboard_limit
                .unwrap_or(defaults.leaderboard_limit)
                .min(MAX_LEADERBOARD_LIMIT),
            admin_token: value.admin_token.unwrap_or(defaults.admin_token),
            retry: value.retry.map(Into::into).unwrap_or(defaults.retry),
            transition_timeout: value
                .transition_timeout_ms
                .map(Some)
                .unwrap_or(defaults.transition_timeout),
            store_lock_wait: value.store_lock_wait_ms.unwrap_or(defaults.store_lock_wait),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "default_duration_seconds": 30, "retry": { "max_attempts": 3, "jitter_ms": 0 } }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.default_duration_seconds, 30);
        assert_eq!(config.leaderboard_limit, DEFAULT_LEADERBOARD_LIMIT);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.jitter, Duration::ZERO);
        assert_eq!(config.retry.base_delay, RetryPolicy::default().base_delay);
        assert_eq!(config.transition_timeout, Some(DEFAULT_TRANSITION_TIMEOUT));
    }

    #[test]
    fn durations_are_clamped() {
        let config = AppConfig::default();
        assert_eq!(config.resolve_duration(None), DEFAULT_DURATION_SECONDS);
        assert_eq!(config.resolve_duration(Some(3)), MIN_DURATION_SECONDS);
        assert_eq!(config.resolve_duration(Some(90)), 90);
        assert_eq!(config.resolve_duration(Some(100_000)), MAX_DURATION_SECONDS);
    }

    #[test]
    fn leaderboard_limit_is_capped() {
        let config = AppConfig::default();
        assert_eq!(config.resolve_leaderboard_limit(None), DEFAULT_LEADERBOARD_LIMIT);
        assert_eq!(config.resolve_leaderboard_limit(Some(500)), MAX_LEADERBOARD_LIMIT);
    }
}
