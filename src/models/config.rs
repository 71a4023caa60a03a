//! Configuration data model and validation

use crate::logging::{LogFormat, LogLevel};
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Logging settings shared by both subcommands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Minimum level written
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Console, JSON or compact lines
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            enable_color: default_enable_color(),
        }
    }
}

impl LogSettings {
    /// Merge `LOG_LEVEL`, `GLH_LOG_FORMAT` and `ENABLE_COLOR`
    ///
    /// An unparsable `LOG_LEVEL` falls back to the current level rather than
    /// failing startup.
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if let Ok(parsed) = LogLevel::from_str(&level) {
                self.level = parsed;
            }
        }

        if let Ok(format) = std::env::var("GLH_LOG_FORMAT") {
            self.format = LogFormat::from_str(&format)?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.enable_color = false;
        }

        Ok(())
    }
}

/// Settings for the recording server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub log: LogSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            log: LogSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if IpAddr::from_str(&self.bind).is_err() {
            return Err(AppError::config(format!("Invalid bind address: {}", self.bind)));
        }
        Ok(())
    }

    /// Socket address the server listens on
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr> {
        let ip = IpAddr::from_str(&self.bind)?;
        Ok(std::net::SocketAddr::new(ip, self.port))
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(bind) = std::env::var("GLH_BIND") {
            self.bind = bind.trim().to_string();
        }

        if let Ok(port) = std::env::var("GLH_PORT") {
            self.port = port.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid GLH_PORT value '{}': {}", port, e)))?;
        }

        self.log.merge_from_env()
    }
}

/// Settings for one client execution of a run group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Group to execute, created beforehand on the server
    pub group_id: String,

    /// Base address of the recording server
    pub remote: String,

    /// Where the JSON report is written
    pub report_path: PathBuf,

    /// Payload for every run; a fresh UUID per run when absent
    #[serde(default)]
    pub payload: Option<String>,

    /// Per-request deadline for each run
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub log: LogSettings,
}

impl ClientConfig {
    pub fn new(group_id: impl Into<String>, remote: impl Into<String>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            group_id: group_id.into(),
            remote: remote.into(),
            report_path: report_path.into(),
            payload: None,
            request_timeout_secs: default_request_timeout_secs(),
            log: LogSettings::default(),
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Payload bytes handed to the dispatcher
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payload.clone().map(String::into_bytes).unwrap_or_default()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.group_id.trim().is_empty() {
            return Err(AppError::config("no run group ID"));
        }

        validate_remote(&self.remote)?;

        if self.report_path.as_os_str().is_empty() {
            return Err(AppError::config("no report file"));
        }

        if self.request_timeout_secs == 0 {
            return Err(AppError::config("Request timeout must be greater than 0"));
        }

        if self.request_timeout_secs > crate::defaults::MAX_REQUEST_TIMEOUT_SECS {
            return Err(AppError::config(format!(
                "Request timeout cannot exceed {} seconds",
                crate::defaults::MAX_REQUEST_TIMEOUT_SECS
            )));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(remote) = std::env::var("GLH_REMOTE") {
            if self.remote.is_empty() {
                self.remote = remote.trim().to_string();
            }
        }

        if let Ok(timeout) = std::env::var("GLH_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid GLH_REQUEST_TIMEOUT_SECS value '{}': {}", timeout, e)))?;
        }

        self.log.merge_from_env()
    }
}

/// Check that a remote base address is an absolute http(s) URL
pub fn validate_remote(remote: &str) -> Result<()> {
    if remote.trim().is_empty() {
        return Err(AppError::config("no remote server"));
    }

    let parsed = url::Url::parse(remote)
        .map_err(|e| AppError::config(format!("Invalid remote address '{}': {}", remote, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::config(format!("Remote address must use http or https: {}", remote)));
    }

    if parsed.host_str().is_none() {
        return Err(AppError::config(format!("Remote address must have a host: {}", remote)));
    }

    Ok(())
}

// Default value functions for serde
fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_format() -> LogFormat {
    LogFormat::Console
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

fn default_bind() -> String {
    crate::defaults::DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    crate::defaults::DEFAULT_PORT
}

fn default_request_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_REQUEST_TIMEOUT.as_secs()
}
