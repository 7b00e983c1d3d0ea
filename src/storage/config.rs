use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::security::Capability;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Read-only switches for each calendar kind.
#[cfg_attr(test, mockall::automock)]
pub trait FeatureFlags {
    fn is_personal_calendar_supported(&self) -> bool;
    fn is_system_calendar_supported(&self) -> bool;
    fn is_public_calendar_supported(&self) -> bool;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub calendars: CalendarsConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarsConfig {
    pub personal_enabled: bool,
    pub system_enabled: bool,
    pub public_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub organization_id: Option<i64>,
    pub user_id: i64,
    pub capabilities: Vec<Capability>,
    /// Offset used for the "today" window.
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
    pub filter: String,
}

impl FeatureFlags for CalendarsConfig {
    fn is_personal_calendar_supported(&self) -> bool {
        self.personal_enabled
    }

    fn is_system_calendar_supported(&self) -> bool {
        self.system_enabled
    }

    fn is_public_calendar_supported(&self) -> bool {
        self.public_enabled
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calendar-events")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = Self::config_dir();

        Self {
            database: DatabaseConfig {
                path: config_dir.join("calendar.db"),
            },
            calendars: CalendarsConfig {
                personal_enabled: true,
                system_enabled: true,
                public_enabled: true,
            },
            session: SessionConfig {
                organization_id: Some(1),
                user_id: 1,
                capabilities: vec![
                    Capability::UpdateEvents,
                    Capability::DeleteEvents,
                    Capability::ViewConnections,
                ],
                utc_offset_minutes: 0,
            },
            logging: LoggingConfig {
                directory: Some(config_dir),
                filter: "info".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_enables_every_calendar_kind() {
        let config = Config::default();

        assert!(config.calendars.is_personal_calendar_supported());
        assert!(config.calendars.is_system_calendar_supported());
        assert!(config.calendars.is_public_calendar_supported());
    }

    #[test]
    fn default_session_can_view_connections() {
        let config = Config::default();
        assert!(config.session.capabilities.contains(&Capability::ViewConnections));
    }

    #[test]
    fn parse_valid_toml_config() {
        let toml_content = r#"
            [database]
            path = "/tmp/calendar.db"

            [calendars]
            personal_enabled = true
            system_enabled = false
            public_enabled = true

            [session]
            organization_id = 3
            user_id = 42
            capabilities = ["update_events", "view_connections"]
            utc_offset_minutes = 120

            [logging]
            filter = "calendar_events=debug"
        "#;

        let config = Config::from_toml(toml_content).unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/calendar.db"));
        assert!(!config.calendars.is_system_calendar_supported());
        assert_eq!(config.session.user_id, 42);
        assert_eq!(
            config.session.capabilities,
            vec![Capability::UpdateEvents, Capability::ViewConnections]
        );
        assert_eq!(config.logging.directory, None);
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let invalid_toml = "this is not valid toml";
        let result = Config::from_toml(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn saved_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.session.organization_id = None;
        config.calendars.public_enabled = false;

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = Config::load_from(&temp_dir.path().join("missing.toml"));

        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
