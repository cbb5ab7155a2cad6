//! Environment snapshot written next to the results of a run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::System;

use crate::config::DriverConfig;
use crate::error::Result;
use crate::matrix::Dataset;

/// File name of the manifest inside the results directory.
pub const MANIFEST_FILE: &str = "env.json";

/// Host and configuration details captured when a run starts.
#[derive(Debug, Serialize)]
pub struct RunManifest {
    /// When the run started.
    pub started_utc: DateTime<Utc>,
    /// Host name, when the OS reports one.
    pub hostname: Option<String>,
    /// Long OS version string.
    pub os_version: Option<String>,
    /// Kernel version string.
    pub kernel_version: Option<String>,
    /// Brand string of the first CPU.
    pub cpu_brand: Option<String>,
    /// Physical core count, when known.
    pub cpu_physical_cores: Option<usize>,
    /// Logical CPU count, at least one.
    pub cpu_logical_cores: usize,
    /// Installed memory in bytes.
    pub total_memory_bytes: u64,
    /// Benchmark executable invoked by the run.
    pub executable: PathBuf,
    /// Directory holding the source dataset files.
    pub dataset_path: PathBuf,
    /// Dataset matrix in run order.
    pub datasets: Vec<Dataset>,
    /// Query ids run per dataset.
    pub query_ids: Vec<u32>,
    /// Whether queries randomize their time ranges.
    pub randomize_ranges: bool,
}

impl RunManifest {
    /// Collects host details for a run of `config`.
    pub fn collect(config: &DriverConfig) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();
        Self {
            started_utc: Utc::now(),
            hostname: System::host_name(),
            os_version: System::long_os_version(),
            kernel_version: System::kernel_version(),
            cpu_brand: sys.cpus().first().map(|cpu| cpu.brand().to_string()),
            cpu_physical_cores: sys.physical_core_count(),
            cpu_logical_cores: sys.cpus().len().max(1),
            total_memory_bytes: sys.total_memory(),
            executable: config.executable.clone(),
            dataset_path: config.dataset_path.clone(),
            datasets: config.matrix.datasets().to_vec(),
            query_ids: config.query_ids.clone(),
            randomize_ranges: config.randomize_ranges,
        }
    }

    /// Writes the manifest as pretty JSON into `results_dir`.
    pub fn write(&self, results_dir: &Path) -> Result<PathBuf> {
        let path = results_dir.join(MANIFEST_FILE);
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }
}
