//! Static description of what gets benchmarked.
//!
//! A [`ParameterMatrix`] is the ordered dataset list plus the execution-mode
//! dimensions. It is built once from [`crate::config::DriverConfig`] and only
//! ever read afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Read/write ratios exercised by the mixed workload.
pub const MIXED_RATIOS: [f64; 4] = [0.0, 0.3, 0.7, 1.0];

/// Fractions of a dataset's rows targeted by the mixed workload.
pub const MIXED_SIZES: [f64; 4] = [0.1, 0.4, 0.7, 1.0];

/// Shape parameter passed to every mixed-workload invocation (`-a`).
pub const MIXED_ALPHA: f64 = 1.5;

/// One benchmark corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dataset {
    /// Corpus name, also the stem of its working directory.
    pub name: String,
    /// Number of rows in the source file.
    pub rows: u64,
    /// Scale index used in query result names and passed as `-g`.
    ///
    /// This is configured separately and need not match the dataset's
    /// position in the matrix.
    pub scale: u32,
}

impl Dataset {
    /// Creates a dataset entry.
    pub fn new(name: impl Into<String>, rows: u64, scale: u32) -> Self {
        Self {
            name: name.into(),
            rows,
            scale,
        }
    }

    /// Row count targeted by a mixed trial of the given size fraction.
    ///
    /// Truncates toward zero, so `0.4` of `1_000_000` rows is `400_000`.
    pub fn target_rows(&self, size: f64) -> u64 {
        (size * self.rows as f64) as u64
    }
}

/// Orthogonal switches forwarded to the benchmark executable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionMode {
    /// Operate on the full database (`-f`).
    pub full_database: bool,
    /// Use bitmap-only indexing (`-b`).
    pub bitmap_only: bool,
    /// Randomize query time ranges (`-m`).
    pub randomized_range: bool,
}

impl ExecutionMode {
    /// Hybrid storage, default indexing, sequential ranges.
    pub const HYBRID: ExecutionMode = ExecutionMode {
        full_database: false,
        bitmap_only: false,
        randomized_range: false,
    };

    /// Returns a copy with `full_database` set.
    pub fn with_full_database(mut self, on: bool) -> Self {
        self.full_database = on;
        self
    }

    /// Returns a copy with `bitmap_only` set.
    pub fn with_bitmap_only(mut self, on: bool) -> Self {
        self.bitmap_only = on;
        self
    }

    /// Returns a copy with `randomized_range` set.
    pub fn with_randomized_range(mut self, on: bool) -> Self {
        self.randomized_range = on;
        self
    }

    /// Every flag combination, hybrid first.
    pub fn all() -> [ExecutionMode; 8] {
        let mut modes = [ExecutionMode::HYBRID; 8];
        for (bits, mode) in modes.iter_mut().enumerate() {
            *mode = ExecutionMode {
                full_database: bits & 0b100 != 0,
                bitmap_only: bits & 0b010 != 0,
                randomized_range: bits & 0b001 != 0,
            };
        }
        modes
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.full_database { "full-database" } else { "hybrid" },
            if self.bitmap_only { " bitmap-only" } else { "" },
            if self.randomized_range { " randomized" } else { "" }
        )
    }
}

/// Query paired with the worker count used when sampling its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceQuery {
    /// Query id (`-q`).
    pub query: u32,
    /// Worker count (`-k`).
    pub concurrency: u32,
}

/// Ordered dataset list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterMatrix {
    datasets: Vec<Dataset>,
}

impl ParameterMatrix {
    /// Wraps an ordered dataset list.
    pub fn new(datasets: Vec<Dataset>) -> Self {
        Self { datasets }
    }

    /// Datasets in benchmark order.
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Datasets paired with their 1-based position.
    pub fn positioned(&self) -> impl Iterator<Item = (usize, &Dataset)> {
        self.datasets.iter().enumerate().map(|(idx, ds)| (idx + 1, ds))
    }

    /// 1-based position of `dataset`, matched by name.
    pub fn position(&self, dataset: &Dataset) -> Option<usize> {
        self.datasets
            .iter()
            .position(|ds| ds.name == dataset.name)
            .map(|idx| idx + 1)
    }

    /// Dataset with the most rows; the first one wins a tie.
    pub fn largest(&self) -> Option<&Dataset> {
        self.datasets
            .iter()
            .rev()
            .max_by_key(|ds| ds.rows)
    }

    /// Mixed-workload `(ratio, size)` trials, ratio-major.
    pub fn mixed_trials() -> impl Iterator<Item = (f64, f64)> {
        MIXED_RATIOS
            .into_iter()
            .flat_map(|ratio| MIXED_SIZES.into_iter().map(move |size| (ratio, size)))
    }
}

impl Default for ParameterMatrix {
    fn default() -> Self {
        Self::new(vec![
            Dataset::new("s1d-i10m-10000", 100_000, 1),
            Dataset::new("s1d-i1h-20000", 200_000, 2),
            Dataset::new("s10m-i1m-100000", 1_000_000, 3),
            Dataset::new("s1d-i1h-100000", 1_000_000, 4),
            Dataset::new("s10h-i1h-1000000", 10_000_000, 5),
        ])
    }
}
