use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::analytics::DefaultTargets;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the admissions service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
    pub import: ImportConfig,
    pub analytics: AnalyticsConfig,
    pub mail: MailConfig,
    pub backup: BackupConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        let intake = IntakeConfig {
            max_upload_bytes: numeric_var("APP_MAX_UPLOAD_BYTES", IntakeConfig::DEFAULT_MAX_UPLOAD)?,
            upload_timeout_secs: numeric_var(
                "APP_UPLOAD_TIMEOUT_SECS",
                IntakeConfig::DEFAULT_TIMEOUT_SECS,
            )?,
        };

        let import = ImportConfig {
            unmatched_sample_limit: numeric_var(
                "APP_IMPORT_SAMPLE_LIMIT",
                ImportConfig::DEFAULT_SAMPLE_LIMIT,
            )?,
        };

        let analytics = AnalyticsConfig {
            default_targets_path: env::var("APP_DEFAULT_TARGETS")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
        };

        let mail = MailConfig {
            institution_name: env::var("APP_INSTITUTION_NAME")
                .unwrap_or_else(|_| MailConfig::DEFAULT_INSTITUTION.to_string()),
        };

        let backup = BackupConfig {
            dir: env::var("APP_BACKUP_DIR")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(BackupConfig::DEFAULT_DIR)),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            intake,
            import,
            analytics,
            mail,
            backup,
        })
    }
}

fn numeric_var<T: std::str::FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(variable) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { variable, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "compact" | "text" => Some(Self::Compact),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Limits applied to applicant uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    pub max_upload_bytes: usize,
    pub upload_timeout_secs: u64,
}

impl IntakeConfig {
    pub const DEFAULT_MAX_UPLOAD: usize = 5 * 1024 * 1024;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: Self::DEFAULT_MAX_UPLOAD,
            upload_timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Registrar import behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub unmatched_sample_limit: usize,
}

impl ImportConfig {
    pub const DEFAULT_SAMPLE_LIMIT: usize = 10;
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            unmatched_sample_limit: Self::DEFAULT_SAMPLE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsConfig {
    pub default_targets_path: Option<PathBuf>,
}

impl AnalyticsConfig {
    /// Loads the seed target table, falling back to the built-in table when no file is set.
    pub fn default_targets(&self) -> Result<DefaultTargets, ConfigError> {
        let Some(path) = &self.default_targets_path else {
            return Ok(DefaultTargets::standard());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::DefaultTargetsIo {
            path: path.clone(),
            source,
        })?;
        DefaultTargets::from_json(&raw).map_err(|source| ConfigError::DefaultTargetsFormat {
            path: path.clone(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub institution_name: String,
}

impl MailConfig {
    pub const DEFAULT_INSTITUTION: &'static str = "Admissions Office";
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            institution_name: Self::DEFAULT_INSTITUTION.to_string(),
        }
    }
}

/// Where backup archives are written and listed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    pub dir: PathBuf,
}

impl BackupConfig {
    pub const DEFAULT_DIR: &'static str = "backups";
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(Self::DEFAULT_DIR),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str, value: String },
    InvalidLogFormat(String),
    DefaultTargetsIo { path: PathBuf, source: std::io::Error },
    DefaultTargetsFormat { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a non-negative integer (got '{value}')")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json' (got '{value}')")
            }
            ConfigError::DefaultTargetsIo { path, .. } => {
                write!(f, "unable to read default targets from {}", path.display())
            }
            ConfigError::DefaultTargetsFormat { path, .. } => write!(
                f,
                "default targets in {} must be a JSON object of course name to target",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::DefaultTargetsIo { source, .. } => Some(source),
            ConfigError::DefaultTargetsFormat { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidLogFormat(_) => None,
        }
    }
}
