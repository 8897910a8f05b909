//! Pipeline configuration.
//!
//! Everything a run needs is collected into one [`PipelineConfig`] value that
//! is handed to each component at construction time. It can be built from the
//! process environment ([`PipelineConfig::from_env`], the same variables the
//! deployment's `.env` file defines) or from a TOML file
//! ([`PipelineConfig::load_path`]).
//!
//! Bucket and credential are *not* required here. They are validated by the
//! component that uses them, before its first side effect, so a `curate` run
//! doesn't need a provider key.
//!
//! ```toml
//! region = "ap-southeast-1"
//! bucket = "fin-risk-lake"
//! symbols = ["AAPL", "MSFT", "TSLA", "NVDA"]
//! database = "fin_risk"
//! output_location = "s3://fin-risk-athena-results/"
//!
//! [throttle]
//! backoff_secs = 10
//! cool_down_ms = 1000
//! ```

use std::{path::PathBuf, time::Duration};

use secrecy::SecretString;
use serde::Deserialize;
use shared_utils::env::{get_env_var_or, get_optional_env_var};
use thiserror::Error;

use crate::{
    models::{RunDate, Symbol, symbol::EmptySymbolError},
    providers::{alpha_vantage::BASE_URL, throttle::ThrottlePolicy},
};

pub const DEFAULT_REGION: &str = "ap-southeast-1";
pub const DEFAULT_DATABASE: &str = "fin_risk";
pub const DEFAULT_SYMBOLS: [&str; 4] = ["AAPL", "MSFT", "TSLA", "NVDA"];
pub const DEFAULT_LAKE_ROOT: &str = "./lake";
pub const DEFAULT_WAREHOUSE_DB: &str = "./warehouse.db";

/// Errors related to building a [`PipelineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid symbol universe: {0}")]
    InvalidSymbol(#[from] EmptySymbolError),

    #[error("symbol universe is empty")]
    EmptyUniverse,

    #[error("invalid run date {value:?}, expected YYYY-MM-DD")]
    InvalidRunDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid value {value:?} for {name}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML")]
    Parse(#[from] toml::de::Error),
}

/// Fixed waits applied by the fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThrottleSettings {
    /// Seconds to wait before retrying a throttled request.
    pub backoff_secs: u64,
    /// Milliseconds to wait after every successful response.
    pub cool_down_ms: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        let policy = ThrottlePolicy::default();
        Self {
            backoff_secs: policy.backoff.as_secs(),
            cool_down_ms: policy.cool_down.as_millis() as u64,
        }
    }
}

/// Explicit configuration of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Cloud region; informational for the local store, logged at start-up.
    pub region: String,
    /// Destination bucket of raw and curated partitions. Empty means unset.
    pub bucket: String,
    /// Provider credential.
    pub alphavantage_key: Option<SecretString>,
    /// Provider endpoint.
    pub alphavantage_base_url: String,
    /// Database the refresh statements and gate query run against.
    pub database: String,
    /// Where the SQL engine writes query results.
    pub output_location: Option<String>,
    /// Symbol universe, in ingestion order.
    pub symbols: Vec<Symbol>,
    /// Partition date of this run.
    pub run_date: RunDate,
    /// Root directory of the local object store.
    pub lake_root: PathBuf,
    /// SQLite file backing the local warehouse.
    pub warehouse_db: String,
    pub throttle: ThrottleSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            bucket: String::new(),
            alphavantage_key: None,
            alphavantage_base_url: BASE_URL.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            output_location: None,
            symbols: DEFAULT_SYMBOLS
                .iter()
                .filter_map(|s| Symbol::new(s).ok())
                .collect(),
            run_date: RunDate::today(),
            lake_root: PathBuf::from(DEFAULT_LAKE_ROOT),
            warehouse_db: DEFAULT_WAREHOUSE_DB.to_string(),
            throttle: ThrottleSettings::default(),
        }
    }
}

/// On-disk shape of the TOML config; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    region: Option<String>,
    bucket: Option<String>,
    alphavantage_key: Option<String>,
    alphavantage_base_url: Option<String>,
    database: Option<String>,
    output_location: Option<String>,
    symbols: Option<Vec<String>>,
    run_date: Option<String>,
    lake_root: Option<PathBuf>,
    warehouse_db: Option<String>,
    throttle: Option<ThrottleSettings>,
}

impl PipelineConfig {
    /// Builds the configuration from environment variables.
    ///
    /// | variable                | field                   | default            |
    /// |-------------------------|-------------------------|--------------------|
    /// | `AWS_REGION`            | `region`                | `ap-southeast-1`   |
    /// | `S3_BUCKET`             | `bucket`                | unset              |
    /// | `ALPHAVANTAGE_KEY`      | `alphavantage_key`      | unset              |
    /// | `ALPHAVANTAGE_BASE_URL` | `alphavantage_base_url` | public endpoint    |
    /// | `ATHENA_DB`             | `database`              | `fin_risk`         |
    /// | `ATHENA_OUTPUT_S3`      | `output_location`       | unset              |
    /// | `SYMBOLS`               | `symbols`               | AAPL,MSFT,TSLA,NVDA|
    /// | `RUN_DATE`              | `run_date`              | today              |
    /// | `LAKE_ROOT`             | `lake_root`             | `./lake`           |
    /// | `WAREHOUSE_DB`          | `warehouse_db`          | `./warehouse.db`   |
    /// | `THROTTLE_BACKOFF_SECS` | `throttle.backoff_secs` | 10                 |
    /// | `THROTTLE_COOL_DOWN_MS` | `throttle.cool_down_ms` | 1000               |
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self {
            region: get_env_var_or("AWS_REGION", DEFAULT_REGION),
            bucket: get_optional_env_var("S3_BUCKET").unwrap_or_default(),
            alphavantage_key: get_optional_env_var("ALPHAVANTAGE_KEY")
                .map(|k| SecretString::new(k.into())),
            alphavantage_base_url: get_env_var_or("ALPHAVANTAGE_BASE_URL", BASE_URL),
            database: get_env_var_or("ATHENA_DB", DEFAULT_DATABASE),
            output_location: get_optional_env_var("ATHENA_OUTPUT_S3"),
            lake_root: PathBuf::from(get_env_var_or("LAKE_ROOT", DEFAULT_LAKE_ROOT)),
            warehouse_db: get_env_var_or("WAREHOUSE_DB", DEFAULT_WAREHOUSE_DB),
            ..Self::default()
        };

        if let Some(raw) = get_optional_env_var("SYMBOLS") {
            cfg.symbols = Symbol::parse_list(&raw)?;
        }
        if let Some(raw) = get_optional_env_var("RUN_DATE") {
            cfg.run_date = parse_run_date(&raw)?;
        }
        if let Some(raw) = get_optional_env_var("THROTTLE_BACKOFF_SECS") {
            cfg.throttle.backoff_secs = parse_number("THROTTLE_BACKOFF_SECS", &raw)?;
        }
        if let Some(raw) = get_optional_env_var("THROTTLE_COOL_DOWN_MS") {
            cfg.throttle.cool_down_ms = parse_number("THROTTLE_COOL_DOWN_MS", &raw)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a TOML config string; absent fields keep their defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(toml_str)?;
        let mut cfg = Self::default();

        if let Some(v) = file.region {
            cfg.region = v;
        }
        if let Some(v) = file.bucket {
            cfg.bucket = v.trim().to_string();
        }
        if let Some(v) = file.alphavantage_key.filter(|k| !k.trim().is_empty()) {
            cfg.alphavantage_key = Some(SecretString::new(v.into()));
        }
        if let Some(v) = file.alphavantage_base_url {
            cfg.alphavantage_base_url = v;
        }
        if let Some(v) = file.database {
            cfg.database = v;
        }
        cfg.output_location = file.output_location.or(cfg.output_location);
        if let Some(list) = file.symbols {
            cfg.symbols = list
                .iter()
                .map(Symbol::new)
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = file.run_date {
            cfg.run_date = parse_run_date(&v)?;
        }
        if let Some(v) = file.lake_root {
            cfg.lake_root = v;
        }
        if let Some(v) = file.warehouse_db {
            cfg.warehouse_db = v;
        }
        if let Some(v) = file.throttle {
            cfg.throttle = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and parses a TOML config file.
    pub fn load_path(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Overrides the run date (e.g. from `--dt`).
    pub fn with_run_date(mut self, run_date: RunDate) -> Self {
        self.run_date = run_date;
        self
    }

    /// The fetcher's pacing contract.
    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            backoff: Duration::from_secs(self.throttle.backoff_secs),
            cool_down: Duration::from_millis(self.throttle.cool_down_ms),
            ..ThrottlePolicy::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        Ok(())
    }
}

fn parse_run_date(raw: &str) -> Result<RunDate, ConfigError> {
    raw.parse().map_err(|source| ConfigError::InvalidRunDate {
        value: raw.to_string(),
        source,
    })
}

fn parse_number(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidNumber {
        name,
        value: raw.to_string(),
    })
}
