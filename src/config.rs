//! Application-level configuration loading: storage paths, generator endpoint and write retries.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::services::{
    generator::{DEFAULT_BASE_URL, DEFAULT_MODEL},
    storage_supervisor::RetryPolicy,
};

/// Default location on disk where the binary looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_ARENA_CONFIG_PATH";
const DEFAULT_STORE_PATH: &str = "data/quizzes.json";
const DEFAULT_PLOT_DIR: &str = "plots";

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// JSON document holding every stored quiz.
    pub store_path: PathBuf,
    /// Directory receiving score histograms.
    pub plot_dir: PathBuf,
    /// Generator endpoint settings.
    pub generator: GeneratorSettings,
    /// Backoff applied when writing the store fails.
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Where and how quizzes are generated.
pub struct GeneratorSettings {
    /// Scheme and host of the chat-completions API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Upper bound on a single generation call; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration stored at `path`.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        store = %app_config.store_path.display(),
                        model = %app_config.generator.model,
                        "loaded configuration"
                    );
                    app_config
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
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    store_path: PathBuf,
    plot_dir: PathBuf,
    generator: RawGenerator,
    persist: RawPersist,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            plot_dir: PathBuf::from(DEFAULT_PLOT_DIR),
            generator: RawGenerator::default(),
            persist: RawPersist::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawGenerator {
    base_url: String,
    model: String,
    timeout_secs: Option<u64>,
}

impl Default for RawGenerator {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPersist {
    max_attempts: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
}

impl Default for RawPersist {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            store_path: value.store_path,
            plot_dir: value.plot_dir,
            generator: GeneratorSettings {
                base_url: value.generator.base_url,
                model: value.generator.model,
                timeout: value
                    .generator
                    .timeout_secs
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
            },
            retry: RetryPolicy {
                max_attempts: value.persist.max_attempts.max(1),
                initial_delay: Duration::from_millis(value.persist.initial_delay_ms),
                max_delay: Duration::from_millis(value.persist.max_delay_ms),
            },
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
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("absent.json"));

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.store_path, PathBuf::from("data/quizzes.json"));
        assert_eq!(config.generator.model, DEFAULT_MODEL);
        assert_eq!(config.generator.timeout, None);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        fs::write(
            &path,
            r#"{
                "store_path": "/var/lib/quiz/store.json",
                "generator": { "model": "mistral-small-latest", "timeout_secs": 30 },
                "persist": { "max_attempts": 0 }
            }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path);

        assert_eq!(config.store_path, PathBuf::from("/var/lib/quiz/store.json"));
        assert_eq!(config.plot_dir, PathBuf::from("plots"));
        assert_eq!(config.generator.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.generator.model, "mistral-small-latest");
        assert_eq!(config.generator.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
    }

    #[cfg(feature = "mistral")]
    #[test]
    fn generator_defaults_match_the_client() {
        let client = crate::services::generator::MistralConfig::new("key");
        let config = AppConfig::default();

        assert_eq!(config.generator.base_url, client.base_url);
        assert_eq!(config.generator.model, client.model);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }
}
