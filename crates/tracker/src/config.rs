//! Tracker configuration

use coursework_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Store directory path
    #[serde(default = "coursework_common::default_store_path")]
    pub store_path: PathBuf,

    /// Exchange configuration
    #[serde(default)]
    pub exchange: ExchangeConfig,

    /// Fetch policy
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Collaborator timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Listing view configuration
    #[serde(default)]
    pub listing: ListingConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            store_path: coursework_common::default_store_path(),
            exchange: ExchangeConfig::default(),
            fetch: FetchConfig::default(),
            timeouts: TimeoutConfig::default(),
            listing: ListingConfig::default(),
        }
    }
}

/// Exchange-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Exchange root; defaults to `<store_path>/exchange`
    pub root: Option<PathBuf>,

    /// Directory holding `<assignment>/` release sources
    pub source_root: PathBuf,

    /// Student identifier recorded in submission ids
    pub student_id: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            root: None,
            source_root: PathBuf::from("release"),
            student_id: std::env::var("USER").unwrap_or_else(|_| "student".to_string()),
        }
    }
}

/// Fetch policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Replace a non-empty fetch target instead of refusing
    #[serde(default)]
    pub allow_overwrite: bool,
}

/// Timeouts applied to exchange and validator calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-call limit in milliseconds
    pub collaborator_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            collaborator_ms: 30_000,
        }
    }
}

/// Listing view configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Interval between refreshes while waiting for a list to settle
    pub poll_interval_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from file
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the tracker cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.timeouts.collaborator_ms == 0 {
            return Err(Error::InvalidConfig(
                "timeouts.collaborator_ms must be greater than zero".to_string(),
            ));
        }
        if self.listing.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "listing.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.exchange.student_id.trim().is_empty() {
            return Err(Error::InvalidConfig("exchange.student_id is empty".to_string()));
        }
        Ok(())
    }

    /// Get the database path
    pub fn db_path(&self) -> PathBuf {
        self.store_path.join("state.db")
    }

    /// Get the exchange root
    pub fn exchange_root(&self) -> PathBuf {
        self.exchange
            .root
            .clone()
            .unwrap_or_else(|| self.store_path.join("exchange"))
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.collaborator_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.listing.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = TrackerConfig::load(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.timeouts.collaborator_ms, 30_000);
        assert!(!config.fetch.allow_overwrite);
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut config = TrackerConfig::default();
        config.store_path = tmp.path().to_path_buf();
        config.fetch.allow_overwrite = true;
        config.exchange.student_id = "hacker".to_string();
        config.save(&path).unwrap();

        let loaded = TrackerConfig::load(&path).unwrap();
        assert!(loaded.fetch.allow_overwrite);
        assert_eq!(loaded.exchange.student_id, "hacker");
        assert_eq!(loaded.exchange_root(), tmp.path().join("exchange"));
        assert_eq!(loaded.db_path(), tmp.path().join("state.db"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "store_path = \"/srv/coursework\"\n[fetch]\nallow_overwrite = true\n").unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/srv/coursework"));
        assert!(config.fetch.allow_overwrite);
        assert_eq!(config.listing.poll_interval_ms, 100);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = TrackerConfig::default();
        config.timeouts.collaborator_ms = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
