//! Configuration loading and types for the energy service.
//!
//! Configuration is assembled in layers: built-in defaults, an optional
//! YAML file deserialized into [`Config`], then environment overrides
//! (`S3_BUCKET_NAME`, `AWS_ACCESS_KEY_ID`, ...).  [`Config::validate`]
//! is the startup gate: a config that fails it never reaches the listener.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The S3 backend was selected but a credential is missing.
    #[error("AWS credentials are missing: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY")]
    MissingCredentials,

    /// `storage.backend` names something we do not know how to build.
    #[error("unknown storage backend '{0}' (expected 'aws' or 'memory')")]
    UnknownBackend(String),

    /// A field holds a value that cannot be used.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid YAML for [`Config`].
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Object storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Observability settings (metrics + health check).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind host address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum request body size in bytes (default 16 MiB).
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend type: `aws` or `memory`.
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Destination bucket for uploaded files.
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom S3-compatible endpoint (e.g. MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: String,

    /// Force path-style URL addressing.
    #[serde(default)]
    pub use_path_style: bool,

    /// AWS access key. Usually supplied through `AWS_ACCESS_KEY_ID`.
    #[serde(default)]
    pub access_key_id: String,

    /// AWS secret key. Usually supplied through `AWS_SECRET_ACCESS_KEY`.
    #[serde(default)]
    pub secret_access_key: String,

    /// Upper bound on a single upload call, in seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: String::new(),
            use_path_style: false,
            access_key_id: String::new(),
            secret_access_key: String::new(),
            upload_timeout_secs: default_upload_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: text or json.
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics collection and the `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub metrics: bool,

    /// Enable the `/health` endpoint.
    #[serde(default = "default_true")]
    pub health_check: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics: true,
            health_check: true,
        }
    }
}

// -- Defaults ----------------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_size() -> usize {
    16 * 1024 * 1024 // 16 MiB
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_storage_backend() -> String {
    "aws".to_string()
}

fn default_bucket() -> String {
    "home-energy-application".to_string()
}

fn default_region() -> String {
    "us-east-2".to_string()
}

fn default_upload_timeout() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

// -- Environment overrides ---------------------------------------------------

impl Config {
    /// Apply environment overrides using `lookup` to resolve variables.
    ///
    /// Empty values are treated as unset so a blank line in `.env` does
    /// not wipe out a value from the YAML file.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(bucket) = get("S3_BUCKET_NAME") {
            self.storage.bucket = bucket;
        }
        if let Some(key) = get("AWS_ACCESS_KEY_ID") {
            self.storage.access_key_id = key;
        }
        if let Some(secret) = get("AWS_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = secret;
        }
        if let Some(region) = get("AWS_REGION") {
            self.storage.region = region;
        }
        if let Some(backend) = get("STORAGE_BACKEND") {
            self.storage.backend = backend;
        }
        if let Some(raw) = get("MAX_CONTENT_LENGTH") {
            self.server.max_body_size =
                raw.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        field: "MAX_CONTENT_LENGTH",
                        reason: e.to_string(),
                    })?;
        }
        Ok(())
    }

    /// Check startup preconditions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.storage.backend.as_str() {
            "aws" => {
                if self.storage.access_key_id.is_empty()
                    || self.storage.secret_access_key.is_empty()
                {
                    return Err(ConfigError::MissingCredentials);
                }
            }
            "memory" => {}
            other => return Err(ConfigError::UnknownBackend(other.to_string())),
        }

        if self.storage.bucket.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.bucket",
                reason: "must not be empty".to_string(),
            });
        }
        if self.server.max_body_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_body_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.storage.upload_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "storage.upload_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

// -- Loader ------------------------------------------------------------------

/// Parse configuration from a YAML file at `path`.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    let config: Config = serde_yaml::from_str(&contents)?;
    Ok(config)
}

/// Build the effective configuration: file (if any), then process
/// environment, then validation.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };
    config.apply_env(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:5000");
        assert_eq!(config.server.max_body_size, 16 * 1024 * 1024);
        assert_eq!(config.storage.bucket, "home-energy-application");
        assert_eq!(config.storage.region, "us-east-2");
        assert_eq!(config.storage.backend, "aws");
        assert_eq!(config.storage.upload_timeout_secs, 60);
        assert_eq!(config.logging.level, "info");
        assert!(config.observability.metrics);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("S3_BUCKET_NAME", "readings-bucket"),
                ("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE"),
                ("AWS_SECRET_ACCESS_KEY", "secret"),
                ("MAX_CONTENT_LENGTH", "1024"),
            ]))
            .unwrap();
        assert_eq!(config.storage.bucket, "readings-bucket");
        assert_eq!(config.storage.access_key_id, "AKIAEXAMPLE");
        assert_eq!(config.storage.secret_access_key, "secret");
        assert_eq!(config.server.max_body_size, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[("S3_BUCKET_NAME", "")])).unwrap();
        assert_eq!(config.storage.bucket, "home-energy-application");
    }

    #[test]
    fn test_bad_max_content_length() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("MAX_CONTENT_LENGTH", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "MAX_CONTENT_LENGTH",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingCredentials)
        ));

        let mut half = Config::default();
        half.apply_env(env(&[("AWS_ACCESS_KEY_ID", "AKIAEXAMPLE")]))
            .unwrap();
        assert!(matches!(half.validate(), Err(ConfigError::MissingCredentials)));
    }

    #[test]
    fn test_memory_backend_needs_no_credentials() {
        let mut config = Config::default();
        config.storage.backend = "memory".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = Config::default();
        config.storage.backend = "ftp".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownBackend(ref b)) if b == "ftp"
        ));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = Config::default();
        config.storage.backend = "memory".to_string();
        config.server.max_body_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.backend = "memory".to_string();
        config.storage.upload_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 8080\nstorage:\n  backend: memory\n  bucket: test-bucket\nlogging:\n  format: json"
        )
        .unwrap();

        let config = load_config_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.storage.bucket, "test-bucket");
        assert_eq!(config.storage.region, "us-east-2");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_config_file_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [not, a, map]").unwrap();
        assert!(matches!(
            load_config_file(file.path()),
            Err(ConfigError::Yaml(_))
        ));
    }
}
