//! Application-level configuration loading, including the media upload budget.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRAILHUNT_BACK_CONFIG_PATH";

/// Default per-attempt budget for a media transfer before it is abandoned.
const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(25);
/// Default number of retries after the initial upload attempt.
const DEFAULT_UPLOAD_MAX_RETRIES: u32 = 2;
/// Default backoff step between upload attempts (1 s, then 2 s, ...).
const DEFAULT_UPLOAD_BACKOFF_STEP: Duration = Duration::from_secs(1);
/// Default age after which a still-`uploading` submission is considered stuck.
const DEFAULT_STALE_UPLOAD_CUTOFF: Duration = Duration::from_secs(120);
/// Default interval between stalled-upload reconciliation sweeps.
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

/// Bounded retry policy applied to media transfers by the submission pipeline.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Budget for a single transfer attempt.
    pub timeout: Duration,
    /// Retries granted after the first attempt fails.
    pub max_retries: u32,
    /// Linear backoff step: attempt `n` waits `n * backoff_step` before retrying.
    pub backoff_step: Duration,
}

impl UploadPolicy {
    /// Total number of attempts including the initial one.
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_UPLOAD_TIMEOUT,
            max_retries: DEFAULT_UPLOAD_MAX_RETRIES,
            backoff_step: DEFAULT_UPLOAD_BACKOFF_STEP,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Retry/timeout budget for photo uploads.
    pub upload: UploadPolicy,
    /// Age after which an `uploading` submission is swept to `upload_failed`.
    pub stale_upload_cutoff: Duration,
    /// Interval between reconciliation sweeps.
    pub reconcile_interval: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    config
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
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload: UploadPolicy::default(),
            stale_upload_cutoff: DEFAULT_STALE_UPLOAD_CUTOFF,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    upload_timeout_ms: Option<u64>,
    upload_max_retries: Option<u32>,
    upload_backoff_ms: Option<u64>,
    stale_upload_cutoff_s: Option<u64>,
    reconcile_interval_s: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            upload: UploadPolicy {
                timeout: raw
                    .upload_timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.upload.timeout),
                max_retries: raw.upload_max_retries.unwrap_or(defaults.upload.max_retries),
                backoff_step: raw
                    .upload_backoff_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.upload.backoff_step),
            },
            stale_upload_cutoff: raw
                .stale_upload_cutoff_s
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_upload_cutoff),
            reconcile_interval: raw
                .reconcile_interval_s
                .map(Duration::from_secs)
                .unwrap_or(defaults.reconcile_interval),
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
    fn raw_config_fields_override_defaults() {
        let raw = RawConfig {
            upload_timeout_ms: Some(500),
            upload_max_retries: Some(5),
            upload_backoff_ms: None,
            stale_upload_cutoff_s: Some(30),
            reconcile_interval_s: None,
        };

        let config: AppConfig = raw.into();
        assert_eq!(config.upload.timeout, Duration::from_millis(500));
        assert_eq!(config.upload.max_retries, 5);
        assert_eq!(config.upload.backoff_step, DEFAULT_UPLOAD_BACKOFF_STEP);
        assert_eq!(config.stale_upload_cutoff, Duration::from_secs(30));
        assert_eq!(config.reconcile_interval, DEFAULT_RECONCILE_INTERVAL);
    }

    #[test]
    fn upload_policy_counts_initial_attempt() {
        assert_eq!(UploadPolicy::default().attempts(), 3);
    }
}
