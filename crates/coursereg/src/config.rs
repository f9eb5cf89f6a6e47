//! Server configuration loaded from a JSON file
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::conflict::ValidationPolicy;

/// Environment variable naming the config file when no path is passed on the command line.
pub const CONFIG_ENV_VAR: &str = "COURSEREG_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Username of a staff account created at startup if it does not exist yet
    #[serde(default)]
    pub bootstrap_staff: Option<String>,
    #[serde(default)]
    pub validation: ValidationPolicy,
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_path() -> String {
    "coursereg.sqlite3".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            database_path: default_database_path(),
            bootstrap_staff: None,
            validation: ValidationPolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to the config file
    ///
    /// # Returns
    /// * `Ok(ServerConfig)` - Loaded configuration; missing keys take their defaults
    /// * `Err` - If the file can't be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Loads from `path` if given, else from [`CONFIG_ENV_VAR`], else returns defaults
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        let from_env = std::env::var(CONFIG_ENV_VAR).ok();
        match path.or(from_env.as_deref()) {
            Some(path) => Self::load_from_file(Path::new(path)),
            None => Ok(Self::default()),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ReportMode;
    use std::io::Write;

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": 9000, "validation": {{"max_duration_minutes": 120, "report": "collect_all"}}}}"#
        )
        .unwrap();

        let config = ServerConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.validation.max_duration_minutes, 120);
        assert_eq!(config.validation.report, ReportMode::CollectAll);
        assert!(config.validation.checks.room_conflict);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::load_from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(ServerConfig::load_from_file(file.path()).is_err());
    }
}
