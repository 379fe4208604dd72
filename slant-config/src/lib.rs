//! Loader for Slant configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//! 1. built-in defaults (every section is optional),
//! 2. files / inline YAML added through [`SlantConfigLoader`],
//! 3. `SLANT__`-prefixed environment variables (`SLANT__POLLING__INTERVAL_MS=500`).
//!
//! After merging, `${VAR}` placeholders in string values are expanded.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use slant_common::observability::LogFormat;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "SLANT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlantConfig {
    pub service: ServiceConfig,
    pub polling: PollingConfig,
    pub store: StoreConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

/// Remote analysis service connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub retries: usize,
    /// Static bearer credential; empty or absent means unauthenticated calls.
    pub auth_token: Option<String>,
    pub premium: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_service_url(),
            timeout_secs: 15,
            retries: 2,
            auth_token: None,
            premium: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
    /// Automatic quick-parse restarts before the analysis is reported failed.
    pub max_restarts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval_ms: 3000,
            max_restarts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://slant.db".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detailed_requires_premium: bool,
    pub support_contact: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detailed_requires_premium: false,
            support_contact: "support@slant.news".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub emit_stderr: bool,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            emit_stderr: false,
            filter: "info".into(),
            dir: None,
        }
    }
}

fn default_service_url() -> String {
    "http://localhost:8000/".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct SlantConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SlantConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SlantConfigLoader {
    /// Start from defaults only.
    ///
    /// ```
    /// use slant_config::SlantConfigLoader;
    ///
    /// let config = SlantConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.polling.max_attempts, 5);
    /// assert_eq!(config.polling.interval_ms, 3000);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when it does not exist.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use slant_config::SlantConfigLoader;
    ///
    /// let cfg = SlantConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// service:
    ///   base_url: "https://api.example.com/"
    ///   premium: true
    /// polling:
    ///   interval_ms: 250
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.service.base_url, "https://api.example.com/");
    /// assert!(cfg.service.premium);
    /// assert_eq!(cfg.polling.interval_ms, 250);
    /// assert_eq!(cfg.polling.max_attempts, 5);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge environment overrides, expand `${VAR}` placeholders and
    /// deserialize into [`SlantConfig`].
    pub fn load(self) -> Result<SlantConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let mut typed: SlantConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.service.auth_token = typed
            .service
            .auth_token
            .take()
            .filter(|token| !token.trim().is_empty() && !token.contains("${"));
        Ok(typed)
    }
}
