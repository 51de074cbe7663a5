use std::path::Path;

use hoard_cell::RetryPolicy;
use hoard_kv::KvConfig;
use hoard_query::QueryConfig;
use serde::{Deserialize, Serialize};

use crate::error::{HoardError, HoardResult};

/// Settings for a [`Hoard`](crate::Hoard) instance.
///
/// Every field has a default, so a TOML file only needs the values it
/// changes:
///
/// ```toml
/// max_data_size = 1048576
///
/// [retry]
/// max_attempts = 20
/// base_delay = 2
///
/// [query]
/// default_limit = 50
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoardConfig {
    /// Largest payload `add` accepts, in bytes.
    pub max_data_size: usize,
    /// Entries kept in the suggested-tag cache.
    pub suggest_cache_capacity: usize,
    /// File name of the state cell inside an `open_dir` directory.
    pub cell_file: String,
    /// Directory name of the object store inside an `open_dir` directory.
    pub objects_dir: String,
    // Tables go last so the struct serializes as valid TOML.
    pub retry: RetryPolicy,
    pub query: QueryConfig,
    pub kv: KvConfig,
}

impl Default for HoardConfig {
    fn default() -> Self {
        Self {
            max_data_size: 64 << 20,
            suggest_cache_capacity: 256,
            cell_file: "state".into(),
            objects_dir: "objects".into(),
            retry: RetryPolicy::default(),
            query: QueryConfig::default(),
            kv: KvConfig::default(),
        }
    }
}

impl HoardConfig {
    pub fn from_toml_str(contents: &str) -> HoardResult<Self> {
        toml::from_str(contents).map_err(|e| HoardError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> HoardResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HoardError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents)
            .map_err(|e| HoardError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn to_toml_string(&self) -> HoardResult<String> {
        toml::to_string(self).map_err(|e| HoardError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = HoardConfig::from_toml_str("").unwrap();
        assert_eq!(config, HoardConfig::default());
        assert_eq!(config.max_data_size, 64 << 20);
        assert_eq!(config.query.default_limit, 100);
    }

    #[test]
    fn partial_sections_override_only_named_fields() {
        let config = HoardConfig::from_toml_str(
            r#"
            suggest_cache_capacity = 8

            [retry]
            max_attempts = 5
            base_delay = 3

            [query]
            max_depth = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.suggest_cache_capacity, 8);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(3));
        assert_eq!(config.retry.max_delay, RetryPolicy::default().max_delay);
        assert_eq!(config.query.max_depth, 4);
        assert_eq!(config.query.default_limit, 100);
        assert_eq!(config.cell_file, "state");
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = HoardConfig::default();
        config.kv.max_leaf_entries = 16;
        config.retry = RetryPolicy::immediate(3);
        let text = config.to_toml_string().unwrap();
        assert_eq!(HoardConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn from_file_reads_and_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoard.toml");
        std::fs::write(&path, "max_data_size = 1024\n").unwrap();
        assert_eq!(HoardConfig::from_file(&path).unwrap().max_data_size, 1024);

        std::fs::write(&path, "max_data_size = \"big\"\n").unwrap();
        assert!(matches!(HoardConfig::from_file(&path), Err(HoardError::Config(_))));

        let missing = dir.path().join("absent.toml");
        assert!(matches!(HoardConfig::from_file(missing), Err(HoardError::Config(_))));
    }
}
