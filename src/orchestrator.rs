//! Fail-fast sequencing of phases across the two storage branches.
//!
//! Each branch walks [`Stage`] from `FreshInsert` to `Done`. A stage that
//! returns a non-zero code stops its branch, and a failed hybrid branch stops
//! the run before the full-database branch starts.

use std::fmt;

use serde::Serialize;
use tracing::{error, info};

use crate::error::Result;
use crate::launcher::Launcher;
use crate::matrix::ExecutionMode;
use crate::phases::PhaseRunner;

/// Position in a branch's phase sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Nothing has run yet.
    NotStarted,
    /// Fresh insert, default indexing.
    FreshInsert,
    /// Queries, default indexing.
    Query,
    /// Fresh insert, bitmap-only indexing.
    BitmapFreshInsert,
    /// Queries, bitmap-only indexing.
    BitmapQuery,
    /// Second insert pass into the populated default-indexing directory.
    Reinsert,
    /// Mixed-workload grid.
    Mixed,
    /// Every stage returned zero.
    Done,
}

impl Stage {
    /// Stage that follows `self`; `Done` is terminal.
    pub fn next(self) -> Stage {
        match self {
            Stage::NotStarted => Stage::FreshInsert,
            Stage::FreshInsert => Stage::Query,
            Stage::Query => Stage::BitmapFreshInsert,
            Stage::BitmapFreshInsert => Stage::BitmapQuery,
            Stage::BitmapQuery => Stage::Reinsert,
            Stage::Reinsert => Stage::Mixed,
            Stage::Mixed | Stage::Done => Stage::Done,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::NotStarted => "not-started",
            Stage::FreshInsert => "fresh-insert",
            Stage::Query => "query",
            Stage::BitmapFreshInsert => "bitmap-fresh-insert",
            Stage::BitmapQuery => "bitmap-query",
            Stage::Reinsert => "reinsert",
            Stage::Mixed => "mixed",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Exit code returned by one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Stage that ran.
    pub stage: Stage,
    /// Last non-zero code inside the stage, or zero.
    pub exit_code: i32,
}

/// Outcome of one storage branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchReport {
    /// Whether this was the full-database branch.
    pub full_database: bool,
    /// Stages that ran, in order.
    pub stages: Vec<StageReport>,
    /// Last stage reached: `Done`, or the stage that failed.
    pub reached: Stage,
    /// Zero on success, otherwise the failing stage's code.
    pub exit_code: i32,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Branches that ran, in order.
    pub branches: Vec<BranchReport>,
    /// Zero when both branches completed.
    pub exit_code: i32,
}

/// Drives the phase sequence for both storage branches.
pub struct Orchestrator<'a, L: Launcher> {
    runner: PhaseRunner<'a, L>,
}

impl<'a, L: Launcher> Orchestrator<'a, L> {
    /// Wraps a phase runner.
    pub fn new(runner: PhaseRunner<'a, L>) -> Self {
        Self { runner }
    }

    /// Runs the hybrid branch, then the full-database branch if the first
    /// returned zero.
    pub fn run(&mut self) -> Result<RunReport> {
        self.runner.prepare()?;
        let mut branches = Vec::with_capacity(2);
        for full_database in [false, true] {
            let branch = self.run_branch(full_database)?;
            let code = branch.exit_code;
            branches.push(branch);
            if code != 0 {
                error!(full_database, code, "branch failed; stopping run");
                return Ok(RunReport {
                    branches,
                    exit_code: code,
                });
            }
        }
        Ok(RunReport {
            branches,
            exit_code: 0,
        })
    }

    /// Runs one branch, stopping at the first stage with a non-zero code.
    pub fn run_branch(&mut self, full_database: bool) -> Result<BranchReport> {
        let base = ExecutionMode::HYBRID.with_full_database(full_database);
        let mut report = BranchReport {
            full_database,
            stages: Vec::new(),
            reached: Stage::NotStarted,
            exit_code: 0,
        };
        let mut stage = Stage::NotStarted.next();
        while stage != Stage::Done {
            info!(full_database, %stage, "starting stage");
            let code = self.execute(stage, base)?;
            report.stages.push(StageReport {
                stage,
                exit_code: code,
            });
            report.reached = stage;
            if code != 0 {
                error!(full_database, %stage, code, "stage failed; halting branch");
                report.exit_code = code;
                return Ok(report);
            }
            stage = stage.next();
        }
        report.reached = Stage::Done;
        Ok(report)
    }

    fn execute(&mut self, stage: Stage, base: ExecutionMode) -> Result<i32> {
        let randomized = self.runner.config().randomize_ranges;
        let query_mode = base.with_randomized_range(randomized);
        let bitmap = base.with_bitmap_only(true);
        match stage {
            Stage::FreshInsert => self.runner.fresh_insert(base),
            Stage::Query => self.runner.query(query_mode),
            Stage::BitmapFreshInsert => self.runner.fresh_insert(bitmap),
            Stage::BitmapQuery => self.runner.query(query_mode.with_bitmap_only(true)),
            Stage::Reinsert => self.runner.reinsert(base),
            Stage::Mixed => self.runner.mixed(base),
            Stage::NotStarted | Stage::Done => Ok(0),
        }
    }
}
