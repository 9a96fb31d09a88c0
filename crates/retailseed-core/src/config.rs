//! # Configuration File Parser
//!
//! Reads and parses `retailseed.toml`, the optional configuration file that
//! sets dataset volumes, pipeline width and sink endpoints without CLI flags.
//! Every section and every key is optional; the defaults reproduce the
//! standard fixture (50 stores, 25 000 customers, 100 000 invoices, ...).
//!
//! Example `retailseed.toml`:
//!
//! ```toml
//! [volumes]
//! stores = 10
//! customers = 1000
//! invoices = 5000
//!
//! [pipeline]
//! workers = 16
//! seed = 42
//! base_time = "2025-01-31T12:00:00"
//! catalog_source = "wide_column"
//!
//! [document_store]
//! uri = "mongodb://localhost:27017"
//! database = "varejo"
//!
//! [wide_column_store]
//! hosts = ["127.0.0.1:9042"]
//! keyspace = "meu_keyspace"
//! consistency = "quorum"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::error::{Result, RetailSeedError};
use crate::generate::foreign_key::{AddressAllocation, KeyRange};
use crate::schema::entities::DEFAULT_KEY_BASE;
use crate::sink::cassandra::parse_consistency;
use crate::sink::SinkRole;

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "retailseed.toml";

/// Format of `pipeline.base_time`.
pub const BASE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub const DEFAULT_WORKERS: usize = 10;

/// Top-level retailseed.toml structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetailSeedConfig {
    pub volumes: Volumes,
    pub pipeline: PipelineSection,
    pub document_store: DocumentStoreConfig,
    pub wide_column_store: WideColumnStoreConfig,

    /// Path the config was read from, for error messages.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// How many records of each entity to generate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Volumes {
    pub cities: usize,
    /// Defaults to `stores + customers`, exactly what the positional split needs.
    pub addresses: Option<usize>,
    pub suppliers: usize,
    pub products: usize,
    pub stores: usize,
    pub terminals: usize,
    pub registers: usize,
    pub customers: usize,
    pub invoices: usize,
}

impl Default for Volumes {
    fn default() -> Self {
        Self {
            cities: 2000,
            addresses: None,
            suppliers: 10_000,
            products: 5000,
            stores: 50,
            terminals: 500,
            registers: 500,
            customers: 25_000,
            invoices: 100_000,
        }
    }
}

impl Volumes {
    pub fn address_count(&self) -> usize {
        self.addresses
            .unwrap_or_else(|| self.stores.saturating_add(self.customers))
    }

    /// Split the address pool between stores and customers.
    ///
    /// `stage` names who asked, so the error says where the run stopped.
    pub fn address_allocation(&self, stage: &'static str) -> Result<AddressAllocation> {
        let available = self.address_count();
        AddressAllocation::new(
            KeyRange::new(DEFAULT_KEY_BASE, available),
            self.stores,
            self.customers,
        )
        .ok_or(RetailSeedError::AddressPoolExhausted {
            stage,
            stores: self.stores,
            customers: self.customers,
            needed: self.stores.saturating_add(self.customers),
            available,
        })
    }

    /// Every non-empty child stage needs a non-empty parent pool to draw
    /// references from.
    fn check_parent_pools(&self) -> Result<()> {
        let edges = [
            ("addresses", self.address_count(), "cities", self.cities),
            ("products", self.products, "suppliers", self.suppliers),
            ("terminals", self.terminals, "stores", self.stores),
            ("registers", self.registers, "stores", self.stores),
            ("invoices", self.invoices, "terminals", self.terminals),
            ("invoices", self.invoices, "registers", self.registers),
            ("invoices", self.invoices, "customers", self.customers),
            ("invoices", self.invoices, "products", self.products),
        ];
        for (child, child_count, parent, parent_count) in edges {
            if child_count > 0 && parent_count == 0 {
                return Err(RetailSeedError::Config {
                    message: format!(
                        "volumes.{} is {} but volumes.{} is 0. \
                         Every {} record references one of the {}.",
                        child, child_count, parent, child, parent
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Pipeline settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Worker tasks per stage.
    pub workers: Option<usize>,
    /// Fixed random seed for deterministic generation.
    pub seed: Option<u64>,
    /// Pinned base time, `YYYY-MM-DDTHH:MM:SS`.
    pub base_time: Option<String>,
    /// Sink the product catalog is read back from.
    pub catalog_source: Option<SinkRole>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    pub uri: String,
    pub database: String,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "varejo".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WideColumnStoreConfig {
    pub hosts: Vec<String>,
    /// Must already exist; only tables are ever created.
    pub keyspace: String,
    pub consistency: String,
}

impl Default for WideColumnStoreConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1:9042".to_string()],
            keyspace: "meu_keyspace".to_string(),
            consistency: "quorum".to_string(),
        }
    }
}

/// Read and parse a retailseed.toml file from the given directory.
///
/// Returns `None` if the file doesn't exist (config is optional).
/// Returns an error if the file exists but can't be parsed.
pub fn read_config(dir: &Path) -> Result<Option<RetailSeedConfig>> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Read and parse a config file at an explicit path, which must exist.
pub fn load_config_file(path: &Path) -> Result<RetailSeedConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RetailSeedError::Config {
        message: format!("Failed to read {}: {}", path.display(), e),
    })?;

    let mut config: RetailSeedConfig =
        toml::from_str(&content).map_err(|e| RetailSeedError::Config {
            message: format!("Failed to parse {}: {}", path.display(), e),
        })?;
    config.config_path = Some(path.to_path_buf());

    config.validate()?;
    Ok(config)
}

impl RetailSeedConfig {
    /// Validate semantic constraints that serde cannot enforce.
    ///
    /// Call this immediately after parsing, before connecting to any sink.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == Some(0) {
            return Err(RetailSeedError::Config {
                message: "pipeline.workers must be at least 1".to_string(),
            });
        }
        self.parse_base_time()?;
        parse_consistency(&self.wide_column_store.consistency)
            .map_err(|message| RetailSeedError::Config { message })?;
        if self.wide_column_store.hosts.is_empty() {
            return Err(RetailSeedError::Config {
                message: "wide_column_store.hosts must list at least one host".to_string(),
            });
        }
        self.volumes.check_parent_pools()?;
        self.volumes.address_allocation("configuration")?;
        Ok(())
    }

    pub fn parse_base_time(&self) -> Result<Option<NaiveDateTime>> {
        self.pipeline
            .base_time
            .as_deref()
            .map(|raw| {
                NaiveDateTime::parse_from_str(raw, BASE_TIME_FORMAT).map_err(|e| {
                    RetailSeedError::Config {
                        message: format!(
                            "pipeline.base_time '{}' is not {}: {}",
                            raw, BASE_TIME_FORMAT, e
                        ),
                    }
                })
            })
            .transpose()
    }

    /// Resolve the pipeline settings. An unset seed is drawn at random here
    /// and reported back through the settings.
    pub fn settings(&self) -> Result<PipelineSettings> {
        Ok(PipelineSettings {
            volumes: self.volumes.clone(),
            workers: self.pipeline.workers.unwrap_or(DEFAULT_WORKERS),
            seed: self.pipeline.seed.unwrap_or_else(rand::random),
            base_time: self.parse_base_time()?,
            catalog_source: self.pipeline.catalog_source.unwrap_or(SinkRole::Document),
        })
    }
}

/// Everything the orchestrator needs besides the sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub volumes: Volumes,
    pub workers: usize,
    pub seed: u64,
    /// `None` pins the wall clock when the pipeline is built.
    pub base_time: Option<NaiveDateTime>,
    pub catalog_source: SinkRole,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            volumes: Volumes::default(),
            workers: DEFAULT_WORKERS,
            seed: 0,
            base_time: None,
            catalog_source: SinkRole::Document,
        }
    }
}

impl PipelineSettings {
    /// Reject settings no stage could run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(RetailSeedError::Config {
                message: "worker count must be at least 1".to_string(),
            });
        }
        self.volumes.check_parent_pools()?;
        self.volumes.address_allocation("configuration")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[volumes]
cities = 20
addresses = 100
stores = 5
customers = 50
invoices = 10

[pipeline]
workers = 4
seed = 42
base_time = "2025-01-31T12:00:00"
catalog_source = "wide_column"

[document_store]
uri = "mongodb://db:27017"
database = "loja"

[wide_column_store]
hosts = ["10.0.0.1:9042", "10.0.0.2:9042"]
keyspace = "varejo"
consistency = "local_quorum"
"#;

        let config: RetailSeedConfig = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.volumes.cities, 20);
        assert_eq!(config.volumes.address_count(), 100);
        assert_eq!(config.volumes.suppliers, 10_000);
        assert_eq!(config.pipeline.workers, Some(4));
        assert_eq!(config.pipeline.catalog_source, Some(SinkRole::WideColumn));
        assert_eq!(config.document_store.database, "loja");
        assert_eq!(config.wide_column_store.hosts.len(), 2);

        let settings = config.settings().unwrap();
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.workers, 4);
        assert_eq!(
            settings.base_time.unwrap().to_string(),
            "2025-01-31 12:00:00"
        );
    }

    #[test]
    fn test_parse_empty_config_uses_fixture_defaults() {
        let config: RetailSeedConfig = toml::from_str("").unwrap();
        config.validate().unwrap();

        assert_eq!(config.volumes, Volumes::default());
        assert_eq!(config.volumes.address_count(), 25_050);
        assert_eq!(config.document_store.uri, "mongodb://localhost:27017");
        assert_eq!(config.wide_column_store.keyspace, "meu_keyspace");

        let settings = config.settings().unwrap();
        assert_eq!(settings.workers, DEFAULT_WORKERS);
        assert_eq!(settings.catalog_source, SinkRole::Document);
        assert!(settings.base_time.is_none());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let config: RetailSeedConfig = toml::from_str("[pipeline]\nworkers = 0\n").unwrap();
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("workers"), "{}", msg);

        let settings = PipelineSettings {
            workers: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_zero_parent_pool_rejected() {
        let config: RetailSeedConfig = toml::from_str("[volumes]\nsuppliers = 0\n").unwrap();
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("volumes.products"), "{}", msg);
        assert!(msg.contains("volumes.suppliers"), "{}", msg);
    }

    #[test]
    fn test_empty_child_with_empty_parent_is_fine() {
        let config: RetailSeedConfig =
            toml::from_str("[volumes]\nsuppliers = 0\nproducts = 0\ninvoices = 0\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address_pool_too_small_rejected() {
        let config: RetailSeedConfig =
            toml::from_str("[volumes]\naddresses = 10\nstores = 5\ncustomers = 6\n").unwrap();
        let err = config.validate().unwrap_err();
        match err {
            RetailSeedError::AddressPoolExhausted {
                needed, available, ..
            } => {
                assert_eq!(needed, 11);
                assert_eq!(available, 10);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_bad_base_time_and_consistency_rejected() {
        let config: RetailSeedConfig =
            toml::from_str("[pipeline]\nbase_time = \"yesterday\"\n").unwrap();
        assert!(config.validate().is_err());

        let config: RetailSeedConfig =
            toml::from_str("[wide_column_store]\nconsistency = \"mostly\"\n").unwrap();
        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("mostly"), "{}", msg);
    }

    #[test]
    fn test_unknown_catalog_source_fails_to_parse() {
        let result: std::result::Result<RetailSeedConfig, _> =
            toml::from_str("[pipeline]\ncatalog_source = \"spreadsheet\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_read_config_nonexistent() {
        let result = read_config(Path::new("/nonexistent/dir"));
        assert!(result.is_ok());
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_read_config_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &config_path,
            r#"
[volumes]
invoices = 200

[pipeline]
seed = 7
"#,
        )
        .unwrap();

        let config = read_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.volumes.invoices, 200);
        assert_eq!(config.pipeline.seed, Some(7));
        assert_eq!(config.config_path.as_deref(), Some(config_path.as_path()));
    }

    #[test]
    fn test_read_config_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "this is not valid [[[toml").unwrap();
        assert!(read_config(dir.path()).is_err());
    }

    #[test]
    fn test_load_config_file_missing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_file(&dir.path().join("absent.toml")).is_err());
    }
}
