//! Handles settings for the application. Configuration is written in
//! `settings.toml` and can be overridden by `SAVENA__*` environment
//! variables.
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `"memory"` or the path of a SQLite file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl From<String> for Database {
    fn from(value: String) -> Self {
        if value == "memory" {
            Self::Memory
        } else {
            Self::Sqlite(value)
        }
    }
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Self::Memory => String::from("sqlite::memory:"),
            Self::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
        }
    }
}

/// The wallet store.
#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

/// This device's ledger and its sync with a wallet store.
#[derive(Debug, Deserialize)]
pub struct Device {
    pub database: Database,
    pub remote_url: String,
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_recurring_interval")]
    pub recurring_interval_secs: u64,
}

fn default_settings_path() -> String {
    "sync.json".to_string()
}

fn default_sync_interval() -> u64 {
    30
}

fn default_recurring_interval() -> u64 {
    60
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    pub device: Option<Device>,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("SAVENA").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_every_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            r#"
[app]
level = "debug"

[server]
port = 3000
database = "memory"

[device]
database = "./ledger.db"
remote_url = "http://127.0.0.1:3000"
sync_interval_secs = 10
"#,
        )
        .unwrap();

        let settings = Settings::new(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.app.level, "debug");
        let server = settings.server.unwrap();
        assert_eq!(server.database, Database::Memory);
        assert_eq!(server.bind, None);
        let device = settings.device.unwrap();
        assert_eq!(device.database.url(), "sqlite:./ledger.db?mode=rwc");
        assert_eq!(device.sync_interval_secs, 10);
        assert_eq!(device.recurring_interval_secs, 60);
        assert_eq!(device.settings_path, "sync.json");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");
        let settings = Settings::new(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.app.level, "info");
        assert!(settings.server.is_none());
        assert!(settings.device.is_none());
    }
}
