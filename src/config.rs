use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;
use tracing::{error, info};

use crate::finesse::{Credentials, Endpoints};
use crate::monitor::{ConfigError, TimerConfig};
use crate::notifications::NotificationSettings;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid timers: {0}")]
    Timers(#[from] ConfigError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone)]
pub struct NotifierConfig {
    pub credentials: Credentials,
    #[serde(default)]
    pub timers: TimerConfig,
    pub endpoints: Endpoints,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl NotifierConfig {
    pub fn validate(&self) -> Result<(), LoadError> {
        self.timers.validate()?;
        for (field, value) in [
            ("credentials.username", &self.credentials.username),
            ("credentials.agent_id", &self.credentials.agent_id),
            ("endpoints.primary", &self.endpoints.primary),
            ("endpoints.secondary", &self.endpoints.secondary),
        ] {
            if value.trim().is_empty() {
                return Err(LoadError::Invalid(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Origin of the primary endpoint, used as the "open console" link in alerts.
    pub fn console_url(&self) -> String {
        match reqwest::Url::parse(&self.endpoints.primary) {
            Ok(url) => format!("{}/", url.origin().ascii_serialization()),
            Err(_) => self.endpoints.primary.clone(),
        }
    }
}

pub fn load_cli_config(config_path: &Path) -> Result<NotifierConfig, LoadError> {
    let shown = config_path
        .canonicalize()
        .unwrap_or_else(|_| config_path.to_path_buf());
    info!(path = %shown.display(), "Loading notifier config.");

    let raw = fs::read_to_string(config_path).map_err(|source| {
        error!(path = %shown.display(), error = %source, "Failed to read notifier config.");
        LoadError::Read {
            path: shown.display().to_string(),
            source,
        }
    })?;

    let config: NotifierConfig = toml::from_str(&raw).map_err(|source| {
        error!(path = %shown.display(), error = %source, "Failed to parse notifier config.");
        LoadError::Parse {
            path: shown.display().to_string(),
            source,
        }
    })?;
    config.validate()?;

    info!(
        agent_id = %config.credentials.agent_id,
        primary = %config.endpoints.primary,
        secondary = %config.endpoints.secondary,
        standard_interval_minutes = config.timers.standard_interval_minutes,
        pause_threshold_minutes = config.timers.pause_threshold_minutes,
        "Loaded notifier config."
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL: &str = r#"
[credentials]
username = "agent"
password = "s3cret"
agent_id = "1001"

[timers]
standard_interval_minutes = 2
pause_threshold_minutes = 15

[endpoints]
primary = "https://finesse1.example:8445/finesse/api"
secondary = "https://finesse2.example:8445/finesse/api"
timeout_ms = 1500

[notifications]
desktop = false

[notifications.webhook]
url = "https://chat.example/webhook"
headers = { "X-Token" = "abc" }
"#;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_config() {
        let file = write(FULL);
        let config = load_cli_config(file.path()).unwrap();

        assert_eq!(config.credentials.agent_id, "1001");
        assert_eq!(config.timers, TimerConfig::new(2, 15).unwrap());
        assert_eq!(config.endpoints.timeout_ms, 1500);
        assert!(!config.notifications.desktop);
        let webhook = config.notifications.webhook.as_ref().unwrap();
        assert_eq!(webhook.url, "https://chat.example/webhook");
        assert_eq!(
            webhook.headers.as_ref().unwrap().get("X-Token").map(String::as_str),
            Some("abc")
        );
        assert_eq!(config.console_url(), "https://finesse1.example:8445/");
    }

    #[test]
    fn test_defaults_apply() {
        let file = write(
            r#"
[credentials]
username = "agent"
password = "s3cret"
agent_id = "1001"

[endpoints]
primary = "https://a/finesse/api"
secondary = "https://b/finesse/api"
"#,
        );
        let config = load_cli_config(file.path()).unwrap();
        assert_eq!(config.timers, TimerConfig::default());
        assert_eq!(config.endpoints.timeout_ms, 3000);
        assert!(config.notifications.desktop);
        assert!(config.notifications.webhook.is_none());
    }

    #[test]
    fn test_invalid_timers_rejected() {
        let file = write(&FULL.replace("pause_threshold_minutes = 15", "pause_threshold_minutes = 2"));
        assert!(matches!(
            load_cli_config(file.path()),
            Err(LoadError::Timers(ConfigError::PauseNotAboveInterval { .. }))
        ));
    }

    #[test]
    fn test_empty_agent_id_rejected() {
        let file = write(&FULL.replace("agent_id = \"1001\"", "agent_id = \" \""));
        assert!(matches!(load_cli_config(file.path()), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_and_bad_toml() {
        assert!(matches!(
            load_cli_config(Path::new("/nonexistent/notifier.toml")),
            Err(LoadError::Read { .. })
        ));
        let file = write("[credentials\nusername = ");
        assert!(matches!(load_cli_config(file.path()), Err(LoadError::Parse { .. })));
    }
}
