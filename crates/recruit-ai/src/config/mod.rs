use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::workflows::engagement::EngagementPolicy;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub engagement: EngagementPolicy,
    pub monitor: MonitorConfig,
    pub mail: Option<MailConfig>,
    pub author: Option<AuthorConfig>,
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

        let drive = match (
            non_empty_var("RECRUIT_SHEET_DRIVE_FILE_ID"),
            non_empty_var("GOOGLE_SERVICE_ACCOUNT_KEY"),
        ) {
            (Some(file_id), Some(key)) => Some(DriveSheetConfig {
                file_id,
                service_account_key: PathBuf::from(key),
            }),
            (Some(_), None) => return Err(ConfigError::MissingDriveCredentials),
            _ => None,
        };

        let storage = StorageConfig {
            drive,
            sheet_path: non_empty_var("RECRUIT_SHEET_PATH").map(PathBuf::from),
            write_interval: Duration::from_millis(parse_var("RECRUIT_WRITE_INTERVAL_MS", 1000)?),
        };

        let engagement = EngagementPolicy {
            response_window_minutes: parse_var("RECRUIT_RESPONSE_WINDOW_MINUTES", 120)?,
            hr_email: env::var("RECRUIT_HR_EMAIL").unwrap_or_else(|_| "hr@example.com".to_string()),
            company_name: env::var("RECRUIT_COMPANY_NAME")
                .unwrap_or_else(|_| "TechCorp".to_string()),
        };

        let monitor = MonitorConfig {
            tick_interval: Duration::from_secs(parse_var("RECRUIT_TICK_INTERVAL_SECS", 30)?),
            max_ticks: parse_var("RECRUIT_MAX_TICKS", 100)?,
        };

        let mail = match (non_empty_var("SMTP_EMAIL"), non_empty_var("SMTP_PASSWORD")) {
            (Some(username), Some(password)) => Some(MailConfig {
                smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                smtp_port: parse_var("SMTP_PORT", 587)?,
                imap_host: env::var("IMAP_HOST").unwrap_or_else(|_| "imap.gmail.com".to_string()),
                imap_port: parse_var("IMAP_PORT", 993)?,
                sender: username.clone(),
                username,
                password,
                timeout_secs: 10,
            }),
            _ => None,
        };

        let author = non_empty_var("LLM_API_KEY").map(|api_key| AuthorConfig {
            api_key,
            base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            timeout_secs: 30,
        });

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage,
            engagement,
            monitor,
            mail,
            author,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { variable: name }),
        None => Ok(default),
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Candidate sheet location and write pacing.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Drive-hosted sheet. Takes precedence over `sheet_path`.
    pub drive: Option<DriveSheetConfig>,
    /// CSV system of record. With neither location set, candidates stay in memory.
    pub sheet_path: Option<PathBuf>,
    pub write_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveSheetConfig {
    pub file_id: String,
    pub service_account_key: PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub tick_interval: Duration,
    pub max_ticks: u32,
}

/// Mail account credentials: SMTP for sending, IMAP on the same account for replies.
#[derive(Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub imap_host: String,
    pub imap_port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

/// OpenAI-compatible completion endpoint used for authored messages.
#[derive(Clone)]
pub struct AuthorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for AuthorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
    MissingDriveCredentials,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a non-negative integer")
            }
            ConfigError::MissingDriveCredentials => write!(
                f,
                "RECRUIT_SHEET_DRIVE_FILE_ID requires GOOGLE_SERVICE_ACCOUNT_KEY"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::MissingDriveCredentials => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
