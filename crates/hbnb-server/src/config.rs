//! Server configuration, read once at startup from `HBNB_*` environment
//! variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Which storage backend the process runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    File,
    Db,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub type_storage: StorageType,
    pub file_path: PathBuf,
    pub db_path: PathBuf,
    /// `test` resets the relational schema on startup
    #[serde(default)]
    pub env: Option<String>,
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::with_prefix("HBNB").try_parsing(true))
    }

    fn load(environment: config::Environment) -> Result<Self> {
        config::Config::builder()
            .set_default("type_storage", "file")?
            .set_default("file_path", "file.json")?
            .set_default("db_path", "hbnb.db")?
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 5000)?
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn is_test_env(&self) -> bool {
        self.env.as_deref() == Some("test")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let source = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::load(
            config::Environment::with_prefix("HBNB")
                .try_parsing(true)
                .source(Some(source)),
        )
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.type_storage, StorageType::File);
        assert_eq!(config.file_path, PathBuf::from("file.json"));
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
        assert!(!config.is_test_env());
    }

    #[test]
    fn test_environment_overrides() {
        let config = load(&[
            ("HBNB_TYPE_STORAGE", "db"),
            ("HBNB_DB_PATH", "/tmp/hbnb-test.db"),
            ("HBNB_ENV", "test"),
            ("HBNB_API_PORT", "5001"),
        ])
        .unwrap();
        assert_eq!(config.type_storage, StorageType::Db);
        assert_eq!(config.db_path, PathBuf::from("/tmp/hbnb-test.db"));
        assert_eq!(config.api_port, 5001);
        assert!(config.is_test_env());
    }

    #[test]
    fn test_unknown_storage_type() {
        tokio_test::assert_err!(load(&[("HBNB_TYPE_STORAGE", "mongo")]));
    }
}
