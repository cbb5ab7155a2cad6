//! Seam between phase runners and process execution.

use std::path::Path;

use crate::command::BenchCommand;
use crate::error::Result;
use crate::invoke::{invoke, OutputTarget, PhaseResult};
use crate::sampler::ResourceSampler;

/// Executes benchmark commands on behalf of the phase runners.
pub trait Launcher {
    /// Runs `command` to completion with output captured per `target`.
    fn invoke(&mut self, command: &BenchCommand, target: &OutputTarget) -> Result<PhaseResult>;

    /// Runs `command` while recording resource samples into `samples`.
    fn invoke_sampled(
        &mut self,
        command: &BenchCommand,
        stdout: &Path,
        samples: &Path,
    ) -> Result<PhaseResult>;
}

/// Launcher backed by real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    sampler: ResourceSampler,
}

impl ProcessLauncher {
    /// Creates a launcher sampling with `sampler`.
    pub fn new(sampler: ResourceSampler) -> Self {
        Self { sampler }
    }
}

impl Launcher for ProcessLauncher {
    fn invoke(&mut self, command: &BenchCommand, target: &OutputTarget) -> Result<PhaseResult> {
        invoke(command, target)
    }

    fn invoke_sampled(
        &mut self,
        command: &BenchCommand,
        stdout: &Path,
        samples: &Path,
    ) -> Result<PhaseResult> {
        self.sampler.run(command, stdout, samples)
    }
}
