//! Driver configuration.
//!
//! Values come from built-in defaults, an optional TOML file, and command-line
//! overrides, in increasing precedence. The result is a [`DriverConfig`] that
//! is validated once and then passed by reference everywhere.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::matrix::{Dataset, ParameterMatrix, ResourceQuery};

/// Prefix of every source dataset file name.
pub const DEFAULT_DATASET_PREFIX: &str = "prometheus-data-cpu-only-";

/// Name of the benchmark executable inside the benchmark directory.
pub const DEFAULT_EXECUTABLE: &str = "tsbs";

/// Directory under the benchmark path that receives result files.
pub const RESULTS_DIR: &str = "bench-results";

/// Directory under the benchmark path that holds working directories.
pub const WORKING_ROOT: &str = "bench";

/// Immutable configuration for one driver run.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Directory holding the executable, working directories and results.
    pub benchmark_path: PathBuf,
    /// Directory holding the source dataset files.
    pub dataset_path: PathBuf,
    /// Benchmark executable.
    pub executable: PathBuf,
    /// Prefix joined with a dataset name to form its source file name.
    pub dataset_file_prefix: String,
    /// Datasets to benchmark, in order.
    pub matrix: ParameterMatrix,
    /// Query ids run by the query phases.
    pub query_ids: Vec<u32>,
    /// Queries run under the resource sampler.
    pub resource_queries: Vec<ResourceQuery>,
    /// Interval between resource samples.
    pub sample_interval: Duration,
    /// Randomize query time ranges in orchestrated runs.
    pub randomize_ranges: bool,
    /// Pass `-p` to mixed-workload invocations.
    pub mixed_extra_behavior: bool,
}

impl DriverConfig {
    /// Creates a configuration with default matrix and knobs.
    pub fn new(benchmark_path: impl Into<PathBuf>, dataset_path: impl Into<PathBuf>) -> Self {
        let benchmark_path = benchmark_path.into();
        Self {
            executable: benchmark_path.join(DEFAULT_EXECUTABLE),
            benchmark_path,
            dataset_path: dataset_path.into(),
            dataset_file_prefix: DEFAULT_DATASET_PREFIX.to_string(),
            matrix: ParameterMatrix::default(),
            query_ids: default_query_ids(),
            resource_queries: default_resource_queries(),
            sample_interval: Duration::from_millis(default_sample_interval_ms()),
            randomize_ranges: false,
            mixed_extra_behavior: false,
        }
    }

    /// Loads the TOML file (explicit path, else the per-user default when it
    /// exists) and applies `overrides` on top.
    pub fn load(explicit: Option<PathBuf>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let raw = match explicit {
            Some(path) => read_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path)?,
                _ => RawConfig::default(),
            },
        };
        Self::from_raw(raw, overrides)
    }

    /// Parses TOML text and applies `overrides`.
    pub fn from_toml_str(contents: &str, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        Self::from_raw(raw, overrides)
    }

    fn from_raw(raw: RawConfig, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let benchmark_path = overrides
            .benchmark_path
            .or(raw.benchmark_path)
            .ok_or(ConfigError::Missing("benchmark_path"))?;
        let dataset_path = overrides
            .dataset_path
            .or(raw.dataset_path)
            .ok_or(ConfigError::Missing("dataset_path"))?;

        let mut cfg = DriverConfig::new(benchmark_path, dataset_path);
        if let Some(exe) = overrides.executable.or(raw.executable) {
            cfg.executable = exe;
        }
        if let Some(prefix) = raw.dataset_file_prefix {
            cfg.dataset_file_prefix = prefix;
        }
        if let Some(datasets) = raw.datasets {
            cfg.matrix = ParameterMatrix::new(datasets);
        }
        if let Some(ids) = raw.query_ids {
            cfg.query_ids = ids;
        }
        if let Some(queries) = raw.resource_queries {
            cfg.resource_queries = queries;
        }
        if let Some(ms) = overrides.sample_interval_ms.or(raw.sample_interval_ms) {
            cfg.sample_interval = Duration::from_millis(ms);
        }
        cfg.randomize_ranges =
            overrides.randomize_ranges || raw.randomize_ranges.unwrap_or(false);
        cfg.mixed_extra_behavior = raw.mixed_extra_behavior.unwrap_or(false);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks the invariants the phase runners rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let datasets = self.matrix.datasets();
        if datasets.is_empty() {
            return Err(ConfigError::Invalid("at least one dataset is required".into()));
        }
        let mut names = HashSet::new();
        let mut scales = HashSet::new();
        for ds in datasets {
            if ds.name.trim().is_empty() {
                return Err(ConfigError::Invalid("dataset names must not be empty".into()));
            }
            if !names.insert(ds.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "dataset '{}' is listed twice",
                    ds.name
                )));
            }
            if !scales.insert(ds.scale) {
                return Err(ConfigError::Invalid(format!(
                    "scale index {} is used by more than one dataset",
                    ds.scale
                )));
            }
        }
        if self.query_ids.is_empty() {
            return Err(ConfigError::Invalid("at least one query id is required".into()));
        }
        if self.sample_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "sample interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Directory receiving result files.
    pub fn results_dir(&self) -> PathBuf {
        self.benchmark_path.join(RESULTS_DIR)
    }

    /// Parent of every working and backup directory.
    pub fn working_root(&self) -> PathBuf {
        self.benchmark_path.join(WORKING_ROOT)
    }

    /// Source file for `dataset`.
    pub fn dataset_file(&self, dataset: &Dataset) -> PathBuf {
        self.dataset_path
            .join(format!("{}{}", self.dataset_file_prefix, dataset.name))
    }
}

/// Values supplied on the command line; each one beats the file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Benchmark directory.
    pub benchmark_path: Option<PathBuf>,
    /// Dataset directory.
    pub dataset_path: Option<PathBuf>,
    /// Benchmark executable.
    pub executable: Option<PathBuf>,
    /// Sampling interval in milliseconds.
    pub sample_interval_ms: Option<u64>,
    /// Force randomized query ranges on.
    pub randomize_ranges: bool,
}

fn default_query_ids() -> Vec<u32> {
    vec![1, 2, 3]
}

fn default_resource_queries() -> Vec<ResourceQuery> {
    vec![
        ResourceQuery {
            query: 1,
            concurrency: 1,
        },
        ResourceQuery {
            query: 3,
            concurrency: 8,
        },
    ]
}

fn default_sample_interval_ms() -> u64 {
    1_000
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    benchmark_path: Option<PathBuf>,
    dataset_path: Option<PathBuf>,
    executable: Option<PathBuf>,
    dataset_file_prefix: Option<String>,
    datasets: Option<Vec<Dataset>>,
    query_ids: Option<Vec<u32>>,
    resource_queries: Option<Vec<ResourceQuery>>,
    sample_interval_ms: Option<u64>,
    randomize_ranges: Option<bool>,
    mixed_extra_behavior: Option<bool>,
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser failure.
        source: toml::de::Error,
    },
    /// A required value was supplied neither on the command line nor in the file.
    #[error("{0} is required; pass it on the command line or set it in the config file")]
    Missing(&'static str),
    /// Values are present but inconsistent.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Per-user config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("tsbs-runner").join("config.toml"))
}
