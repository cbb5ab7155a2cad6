//! One runner per benchmark phase.
//!
//! Each runner walks the dataset list in matrix order and keeps going when an
//! invocation fails, returning the last non-zero exit code it saw (or zero).
//! Filesystem errors are not absorbed: they abort the phase with `Err`.

use std::path::Path;

use tracing::{info, warn};

use crate::command::{BenchCommand, CheckpointMode, Workload};
use crate::config::DriverConfig;
use crate::error::Result;
use crate::invoke::{OutputTarget, PhaseResult};
use crate::launcher::Launcher;
use crate::matrix::{ExecutionMode, ParameterMatrix, MIXED_ALPHA};
use crate::naming::{format_fraction, ResultKey, ResultNamer};
use crate::paths::{self, PathManager};

/// Remembers the last failing exit code across a phase's loop.
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    code: i32,
}

impl Tally {
    /// Records `result`; returns `false` when it failed.
    fn record(&mut self, result: &PhaseResult) -> bool {
        if result.success() {
            return true;
        }
        self.code = result.exit_code;
        false
    }

    fn code(self) -> i32 {
        self.code
    }
}

/// Runs individual phases against a configuration.
pub struct PhaseRunner<'a, L: Launcher> {
    config: &'a DriverConfig,
    launcher: &'a mut L,
    paths: PathManager,
    namer: ResultNamer,
}

impl<'a, L: Launcher> PhaseRunner<'a, L> {
    /// Creates a runner over `config`, executing through `launcher`.
    pub fn new(config: &'a DriverConfig, launcher: &'a mut L) -> Self {
        Self {
            paths: PathManager::new(config.working_root()),
            namer: ResultNamer::new(config.results_dir()),
            config,
            launcher,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &DriverConfig {
        self.config
    }

    /// Result naming in use.
    pub fn namer(&self) -> &ResultNamer {
        &self.namer
    }

    /// Creates the results directory.
    pub fn prepare(&self) -> Result<()> {
        paths::create_dir(self.namer.dir())?;
        paths::create_dir(self.paths.root())
    }

    fn matrix(&self) -> &'a ParameterMatrix {
        &self.config.matrix
    }

    fn command(&self, workload: Workload, root: &Path) -> BenchCommand {
        BenchCommand::new(&self.config.executable, workload, root)
    }

    /// Inserts every dataset into a freshly emptied working directory.
    pub fn fresh_insert(&mut self, mode: ExecutionMode) -> Result<i32> {
        let mut tally = Tally::default();
        for dataset in self.matrix().datasets() {
            let dir = self.paths.working_dir(dataset, mode);
            paths::ensure_empty(&dir)?;
            let cmd = self
                .command(Workload::Insert, &dir)
                .dataset(&self.config.dataset_file(dataset))
                .mode(mode);
            let out = self.namer.path(dataset, mode, ResultKey::FreshInsert);
            info!(dataset = %dataset.name, %mode, "benchmarking fresh insert");
            let result = self.launcher.invoke(&cmd, &OutputTarget::stdout(out))?;
            if !tally.record(&result) {
                warn!(
                    dataset = %dataset.name,
                    phase = "fresh-insert",
                    code = result.exit_code,
                    "non-zero return code"
                );
            }
        }
        Ok(tally.code())
    }

    /// Snapshots each populated working directory once, then inserts into it
    /// again.
    pub fn reinsert(&mut self, mode: ExecutionMode) -> Result<i32> {
        let mut tally = Tally::default();
        for dataset in self.matrix().datasets() {
            let dir = self.paths.working_dir(dataset, mode);
            paths::ensure_backup(&dir)?;
            let cmd = self
                .command(Workload::Insert, &dir)
                .dataset(&self.config.dataset_file(dataset))
                .mode(mode);
            let out = self.namer.path(dataset, mode, ResultKey::Insert);
            info!(dataset = %dataset.name, %mode, "benchmarking insert");
            let result = self.launcher.invoke(&cmd, &OutputTarget::stdout(out))?;
            if !tally.record(&result) {
                warn!(
                    dataset = %dataset.name,
                    phase = "insert",
                    code = result.exit_code,
                    "non-zero return code"
                );
            }
        }
        Ok(tally.code())
    }

    /// Runs every configured query against every dataset.
    pub fn query(&mut self, mode: ExecutionMode) -> Result<i32> {
        let mut tally = Tally::default();
        for (position, dataset) in self.matrix().positioned() {
            let dir = self.paths.working_dir(dataset, mode);
            for &query in &self.config.query_ids {
                let cmd = self
                    .command(Workload::Query, &dir)
                    .dataset(&self.config.dataset_file(dataset))
                    .query(query)
                    .group(dataset.scale)
                    .mode(mode);
                let out = self.namer.path(dataset, mode, ResultKey::Query { query });
                info!(
                    dataset = %dataset.name,
                    "benchmarking query for s{position}-q{query} {mode}"
                );
                let result = self.launcher.invoke(&cmd, &OutputTarget::stdout(out))?;
                if !tally.record(&result) {
                    warn!(
                        dataset = %dataset.name,
                        query,
                        phase = "query",
                        code = result.exit_code,
                        "non-zero return code for s{position}-q{query}"
                    );
                }
            }
        }
        Ok(tally.code())
    }

    /// Runs the mixed-workload grid, restoring the trial directory from the
    /// bitmap-only snapshot before every trial.
    pub fn mixed(&mut self, mode: ExecutionMode) -> Result<i32> {
        let mode = mode.with_bitmap_only(true);
        let mut tally = Tally::default();
        for dataset in self.matrix().datasets() {
            let source = self.paths.working_dir(dataset, mode);
            let backup = paths::ensure_backup(&source)?;
            let dir = self.paths.mixed_dir(dataset, mode);
            for (ratio, size) in ParameterMatrix::mixed_trials() {
                paths::restore_from_backup(&dir, &backup)?;
                let cmd = self
                    .command(Workload::Mixed, &dir)
                    .dataset(&self.config.dataset_file(dataset))
                    .alpha(MIXED_ALPHA)
                    .rows(dataset.target_rows(size))
                    .ratio(ratio)
                    .extra_mixed(self.config.mixed_extra_behavior)
                    .mode(mode);
                let out = self
                    .namer
                    .path(dataset, mode, ResultKey::Mixed { ratio, size });
                info!(
                    dataset = %dataset.name,
                    size = %format_fraction(size),
                    ratio = %format_fraction(ratio),
                    "benchmarking mixed workload"
                );
                let result = self.launcher.invoke(&cmd, &OutputTarget::stdout(out))?;
                if !tally.record(&result) {
                    warn!(
                        dataset = %dataset.name,
                        size = %format_fraction(size),
                        ratio = %format_fraction(ratio),
                        phase = "mixed",
                        code = result.exit_code,
                        "non-zero return code"
                    );
                }
            }
        }
        Ok(tally.code())
    }

    /// Inserts the largest dataset twice: checkpoints disabled, then
    /// checkpoints on with diagnostics captured from stderr.
    pub fn checkpoint_comparison(&mut self, mode: ExecutionMode) -> Result<i32> {
        let Some(dataset) = self.matrix().largest() else {
            return Ok(0);
        };
        let mut tally = Tally::default();
        let dir = self.paths.checkpoint_dir(dataset, mode);
        for ckpt in [CheckpointMode::Disabled, CheckpointMode::Print] {
            paths::ensure_empty(&dir)?;
            let cmd = self
                .command(Workload::Insert, &dir)
                .dataset(&self.config.dataset_file(dataset))
                .checkpoint(ckpt)
                .mode(mode);
            let out = self
                .namer
                .path(dataset, mode, ResultKey::Checkpoint { mode: ckpt });
            let mut target = OutputTarget::stdout(out);
            if ckpt == CheckpointMode::Print {
                target = target.with_stderr(self.namer.path(
                    dataset,
                    mode,
                    ResultKey::CheckpointDiagnostics,
                ));
            }
            info!(
                dataset = %dataset.name,
                checkpoint = ckpt.as_str(),
                %mode,
                "benchmarking checkpoint comparison"
            );
            let result = self.launcher.invoke(&cmd, &target)?;
            if !tally.record(&result) {
                warn!(
                    dataset = %dataset.name,
                    checkpoint = ckpt.as_str(),
                    phase = "checkpoint",
                    code = result.exit_code,
                    "non-zero return code"
                );
            }
        }
        Ok(tally.code())
    }

    /// Runs the configured query subset under the resource sampler.
    pub fn query_resource(&mut self, mode: ExecutionMode) -> Result<i32> {
        let mut tally = Tally::default();
        for (position, dataset) in self.matrix().positioned() {
            let dir = self.paths.working_dir(dataset, mode);
            for rq in &self.config.resource_queries {
                let query = rq.query;
                let cmd = self
                    .command(Workload::Query, &dir)
                    .dataset(&self.config.dataset_file(dataset))
                    .query(query)
                    .group(dataset.scale)
                    .concurrency(rq.concurrency)
                    .mode(mode);
                let out = self
                    .namer
                    .path(dataset, mode, ResultKey::QueryResourceOutput { query });
                let samples = self
                    .namer
                    .path(dataset, mode, ResultKey::QueryResourceSamples { query });
                info!(
                    dataset = %dataset.name,
                    concurrency = rq.concurrency,
                    "sampling resources for s{position}-q{query} {mode}"
                );
                let result = self.launcher.invoke_sampled(&cmd, &out, &samples)?;
                if !tally.record(&result) {
                    warn!(
                        dataset = %dataset.name,
                        query,
                        phase = "query-resource",
                        code = result.exit_code,
                        "non-zero return code for s{position}-q{query}"
                    );
                }
            }
        }
        Ok(tally.code())
    }
}
