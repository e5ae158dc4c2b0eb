use anyhow::anyhow;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "talk_ledger.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not access config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Config file {path:?} is not valid YAML: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Gemini model used for classification
    pub model: String,
    pub api_base: String,
    /// Where `serve` listens
    pub listen_address: IpAddr,
    pub listen_port: u16,
    /// JSON file holding the ledger
    pub db_path: PathBuf,
    /// Relay used by `add --via relay`
    pub relay_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            listen_address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            listen_port: 8788,
            db_path: PathBuf::from("talk_ledger.json"),
            relay_url: "http://127.0.0.1:8788".to_string(),
        }
    }
}

impl Config {
    /// A missing file means defaults.
    pub async fn load(path: &Path) -> Result<Config, ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if !tokio::fs::try_exists(path).await.map_err(io_error)? {
            log::debug!("No config file at {path:?}, using defaults");
            return Ok(Config::default());
        }
        let content = tokio::fs::read_to_string(path).await.map_err(io_error)?;
        let config: Config = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = serde_yaml::to_string(self).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        tokio::fs::write(path, serialized)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        for (name, url) in [("api_base", &self.api_base), ("relay_url", &self.relay_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be an http(s) URL, got {url:?}"
                )));
            }
        }
        if self.db_path.file_name().is_none() {
            return Err(ConfigError::Invalid(format!(
                "db_path {:?} must name a file",
                self.db_path
            )));
        }
        Ok(())
    }
}

/// Opens the config in the user's editor and returns the edited version.
pub fn prompt_edit_config(config: &Config) -> anyhow::Result<Config> {
    let serialized = serde_yaml::to_string(config)?;
    let Some(edited) = dialoguer::Editor::new().extension(".yaml").edit(&serialized)? else {
        return Err(anyhow!("You did not save the edits, please try again"));
    };
    let new_config: Config = serde_yaml::from_str(&edited)?;
    new_config.validate()?;
    Ok(new_config)
}

/// Source of the "today" anchor for relative dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Local::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}

impl From<Option<NaiveDate>> for Clock {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(Clock::System, Clock::Fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let tempdir = tempfile::tempdir().unwrap();
        let config = Config::load(&tempdir.path().join("talk_ledger.yaml"))
            .await
            .unwrap();
        assert_eq!(Config::default(), config);
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("talk_ledger.yaml");
        tokio::fs::write(&path, "model: gemini-1.5-pro\nlisten_port: 9000\n")
            .await
            .unwrap();

        let config = Config::load(&path).await.unwrap();
        assert_eq!("gemini-1.5-pro", config.model);
        assert_eq!(9000, config.listen_port);
        assert_eq!(Config::default().db_path, config.db_path);
    }

    #[tokio::test]
    async fn save_and_load() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("talk_ledger.yaml");
        let config = Config {
            relay_url: "https://ledger.example.com".to_string(),
            ..Config::default()
        };
        config.save(&path).await.unwrap();
        assert_eq!(config, Config::load(&path).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_keys_are_rejected() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("talk_ledger.yaml");
        tokio::fs::write(&path, "modle: typo\n").await.unwrap();
        assert!(matches!(
            Config::load(&path).await,
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_urls() {
        let config = Config {
            relay_url: "localhost:8788".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn fixed_clock() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert_eq!(date, Clock::from(Some(date)).today());
        assert_eq!(Clock::System, Clock::from(None));
    }
}
