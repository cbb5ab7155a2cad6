//! Sequential driver for the `tsbs` time-series benchmark executable.
//!
//! The driver walks a fixed matrix of datasets and execution modes through
//! insert, query, re-insert and mixed-workload phases, capturing each
//! invocation's output in a deterministically named result file.

#![warn(missing_docs)]

pub mod command;
pub mod config;
pub mod error;
pub mod invoke;
pub mod launcher;
pub mod logging;
pub mod manifest;
pub mod matrix;
pub mod naming;
pub mod orchestrator;
pub mod paths;
pub mod phases;
pub mod sampler;

pub use command::{BenchCommand, CheckpointMode, Workload};
pub use config::{ConfigError, ConfigOverrides, DriverConfig};
pub use error::{DriverError, Result};
pub use invoke::{invoke, OutputTarget, PhaseResult};
pub use launcher::{Launcher, ProcessLauncher};
pub use matrix::{Dataset, ExecutionMode, ParameterMatrix, ResourceQuery};
pub use naming::{Phase, ResultKey, ResultNamer};
pub use orchestrator::{BranchReport, Orchestrator, RunReport, Stage, StageReport};
pub use paths::PathManager;
pub use phases::PhaseRunner;
pub use sampler::{ResourceSample, ResourceSampler};
