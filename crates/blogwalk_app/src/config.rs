use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use blogwalk_engine::FetchSettings;
use engine_logging::engine_info;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::DownloadArgs;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Settings of the command-line front end.
///
/// Layered as defaults, then the RON config file, then `BLOGWALK_*` environment
/// variables, then command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub proxy_url: Option<String>,
    pub api_key: Option<String>,
    pub user_agent: Option<String>,
    pub api_base: Option<String>,
    pub token_url: Option<String>,
    pub request_timeout_secs: u64,
    pub skip_existing: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            proxy_url: None,
            api_key: None,
            user_agent: None,
            api_base: None,
            token_url: None,
            request_timeout_secs: 30,
            skip_existing: true,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with `path` when given. A missing file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = ron::from_str(&text).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        engine_info!("loaded config from {:?}", path);
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(optional_env)
    }

    /// Environment overlay with an injectable lookup.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("BLOGWALK_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(proxy) = lookup("BLOGWALK_PROXY_URL").or_else(|| lookup("HTTP_PROXY")) {
            self.proxy_url = Some(proxy);
        }
        if let Some(key) = lookup("BLOGWALK_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(agent) = lookup("BLOGWALK_USER_AGENT") {
            self.user_agent = Some(agent);
        }
        if let Some(value) = lookup("BLOGWALK_SKIP_EXISTING") {
            self.skip_existing = parse_bool("BLOGWALK_SKIP_EXISTING", &value)?;
        }
        Ok(())
    }

    pub fn apply_flags(&mut self, args: &DownloadArgs) {
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Some(proxy) = &args.proxy_url {
            self.proxy_url = Some(proxy.clone());
        }
        if let Some(key) = &args.api_key {
            self.api_key = Some(key.clone());
        }
        if args.skip_existing {
            self.skip_existing = true;
        }
        if args.no_skip_existing {
            self.skip_existing = false;
        }
    }

    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.log_level.trim()).map_err(|_| ConfigError::InvalidValue {
            name: "log_level".to_string(),
            value: self.log_level.clone(),
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        let defaults = FetchSettings::default();
        FetchSettings {
            api_base: self.api_base.clone().unwrap_or(defaults.api_base),
            token_url: self.token_url.clone().unwrap_or(defaults.token_url),
            api_key: self.api_key.clone(),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            proxy_url: self.proxy_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..defaults
        }
    }
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    use super::*;
    use crate::cli::{Cli, Command};

    fn download_args(argv: &[&str]) -> DownloadArgs {
        let mut full = vec!["blogwalk", "download", "alice", "out"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Download(args) => args,
        }
    }

    #[test]
    fn missing_path_gives_defaults() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn ron_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"(log_level: "debug", proxy_url: Some("http://proxy:8080"), skip_existing: false)"#)
            .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.proxy_url.as_deref(), Some("http://proxy:8080"));
        assert!(!config.skip_existing);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn unreadable_or_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ron");
        assert!(matches!(
            AppConfig::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(log_level: 3").unwrap();
        assert!(matches!(
            AppConfig::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn env_overrides_file_and_flags_override_env() {
        let vars: HashMap<&str, &str> = [
            ("BLOGWALK_LOG_LEVEL", "warn"),
            ("HTTP_PROXY", "http://fallback:1"),
            ("BLOGWALK_API_KEY", "env-key"),
            ("BLOGWALK_SKIP_EXISTING", "no"),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.proxy_url.as_deref(), Some("http://fallback:1"));
        assert!(!config.skip_existing);

        config.apply_flags(&download_args(&["--api-key", "flag-key", "--skip-existing"]));
        assert_eq!(config.api_key.as_deref(), Some("flag-key"));
        assert_eq!(config.log_level, "warn");
        assert!(config.skip_existing);
    }

    #[test]
    fn dedicated_proxy_variable_wins_over_http_proxy() {
        let mut config = AppConfig::default();
        config
            .apply_vars(|name| match name {
                "BLOGWALK_PROXY_URL" => Some("http://mine:1".to_string()),
                "HTTP_PROXY" => Some("http://other:2".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.proxy_url.as_deref(), Some("http://mine:1"));
    }

    #[test]
    fn bad_boolean_and_level_are_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_vars(|name| (name == "BLOGWALK_SKIP_EXISTING").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        config.log_level = "loud".to_string();
        assert!(config.level_filter().is_err());
        config.log_level = "Trace".to_string();
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Trace);
    }

    #[test]
    fn fetch_settings_keep_engine_defaults_for_unset_values() {
        let config = AppConfig {
            api_key: Some("k".to_string()),
            request_timeout_secs: 5,
            ..AppConfig::default()
        };
        let settings = config.fetch_settings();
        let defaults = FetchSettings::default();
        assert_eq!(settings.api_base, defaults.api_base);
        assert_eq!(settings.api_key.as_deref(), Some("k"));
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.max_bytes, defaults.max_bytes);
    }
}
