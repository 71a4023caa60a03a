//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::{ClientArgs, GlobalArgs, ServerArgs},
    config::env::EnvManager,
    error::{AppError, Result},
    logging::{LogFormat, LogLevel},
    models::{config::validate_remote, ClientConfig, LogSettings, ServerConfig},
};
use std::str::FromStr;

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    global: GlobalArgs,
}

impl ConfigParser {
    /// Create a new configuration parser with the global CLI flags
    pub fn new(global: GlobalArgs) -> Self {
        Self { global }
    }

    /// Load .env before any environment lookups
    pub fn load_env(&self) -> Result<bool> {
        EnvManager::load_env_file()
    }

    /// Build validated client settings
    pub fn client_config(&self, args: &ClientArgs) -> Result<ClientConfig> {
        let mut config = ClientConfig::new(
            args.group_id.clone().unwrap_or_default(),
            args.remote.clone().unwrap_or_default(),
            args.report_file.clone().unwrap_or_default(),
        );

        config.merge_from_env()?;

        config.payload = args.data.clone();
        if let Some(timeout) = args.timeout {
            config.request_timeout_secs = timeout;
        }
        self.apply_log_overrides(&mut config.log)?;

        config.validate()?;
        Ok(config)
    }

    /// Build validated server settings
    pub fn server_config(&self, args: &ServerArgs) -> Result<ServerConfig> {
        let mut config = ServerConfig::default();
        config.merge_from_env()?;

        if let Some(port) = args.port {
            config.port = port;
        }
        if let Some(bind) = &args.bind {
            config.bind = bind.clone();
        }
        self.apply_log_overrides(&mut config.log)?;

        config.validate()?;
        Ok(config)
    }

    /// Resolve the remote address for the `create` and `groups` subcommands
    pub fn remote(&self, remote: Option<&str>) -> Result<String> {
        let remote = match remote {
            Some(remote) => remote.to_string(),
            None => std::env::var("GLH_REMOTE").map_err(|_| AppError::config("no remote server"))?,
        };
        validate_remote(&remote)?;
        Ok(remote)
    }

    /// Log settings for subcommands without their own config
    pub fn log_settings(&self) -> Result<LogSettings> {
        let mut settings = LogSettings::default();
        settings.merge_from_env()?;
        self.apply_log_overrides(&mut settings)?;
        Ok(settings)
    }

    /// Apply CLI flag overrides to log settings
    fn apply_log_overrides(&self, settings: &mut LogSettings) -> Result<()> {
        if self.global.debug {
            settings.level = LogLevel::Debug;
        } else if self.global.verbose {
            settings.level = LogLevel::Info;
        }

        if let Some(format) = &self.global.log_format {
            settings.format = LogFormat::from_str(format)?;
        }

        if self.global.no_color {
            settings.enable_color = false;
        }

        Ok(())
    }
}

/// Display configuration summary for debug purposes
pub fn display_client_summary(config: &ClientConfig) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Run group: {}", config.group_id));
    summary.push(format!("Remote: {}", config.remote));
    summary.push(format!("Report file: {}", config.report_path.display()));
    summary.push(format!(
        "Payload: {}",
        config.payload.as_deref().unwrap_or("<uuid per run>")
    ));
    summary.push(format!("Request timeout: {}s", config.request_timeout_secs));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn client_args() -> ClientArgs {
        ClientArgs {
            group_id: Some("g1".to_string()),
            remote: Some("http://127.0.0.1:8080".to_string()),
            report_file: Some(PathBuf::from("report.json")),
            data: Some("payload".to_string()),
            timeout: Some(7),
        }
    }

    #[test]
    fn test_client_config_from_args() {
        let parser = ConfigParser::new(GlobalArgs::default());
        let config = parser.client_config(&client_args()).unwrap();

        assert_eq!(config.group_id, "g1");
        assert_eq!(config.payload.as_deref(), Some("payload"));
        assert_eq!(config.request_timeout_secs, 7);
    }

    #[test]
    fn test_missing_group_is_startup_failure() {
        let parser = ConfigParser::new(GlobalArgs::default());
        let args = ClientArgs {
            group_id: None,
            ..client_args()
        };
        let err = parser.client_config(&args).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_report_is_startup_failure() {
        let parser = ConfigParser::new(GlobalArgs::default());
        let args = ClientArgs {
            report_file: None,
            ..client_args()
        };
        assert!(parser.client_config(&args).is_err());
    }

    #[test]
    fn test_debug_flag_overrides_level() {
        let parser = ConfigParser::new(GlobalArgs {
            debug: true,
            no_color: true,
            log_format: Some("compact".to_string()),
            ..Default::default()
        });
        let config = parser.client_config(&client_args()).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Compact);
        assert!(!config.log.enable_color);
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        let parser = ConfigParser::new(GlobalArgs {
            log_format: Some("yaml".to_string()),
            ..Default::default()
        });
        assert!(parser.client_config(&client_args()).is_err());
    }

    #[test]
    fn test_server_overrides() {
        let parser = ConfigParser::new(GlobalArgs::default());
        let config = parser
            .server_config(&ServerArgs {
                port: Some(9191),
                bind: Some("127.0.0.1".to_string()),
            })
            .unwrap();
        assert_eq!(config.port, 9191);
        assert_eq!(config.bind, "127.0.0.1");
    }

    #[test]
    fn test_explicit_remote_is_validated() {
        let parser = ConfigParser::new(GlobalArgs::default());
        assert!(parser.remote(Some("http://localhost:1")).is_ok());
        assert!(parser.remote(Some("localhost")).is_err());
    }

    #[test]
    fn test_client_summary() {
        let config = ClientConfig::new("g1", "http://localhost:8080", "r.json");
        let summary = display_client_summary(&config);
        assert!(summary.contains("Run group: g1"));
        assert!(summary.contains("<uuid per run>"));
    }
}
