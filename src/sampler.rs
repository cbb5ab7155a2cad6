//! Polls a running child's CPU and memory use into a CSV file.
//!
//! Sampling shares the invoking thread with exit detection: each tick sleeps
//! for the interval, checks whether the child has exited, and only then takes
//! a sample. Granularity is therefore best-effort. Before the first tick the
//! child's CPU counters are read twice, `MINIMUM_CPU_UPDATE_INTERVAL` apart.

use std::fs::File;
use std::path::Path;
use std::process::{Child, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use csv::{Writer, WriterBuilder};
use serde::Serialize;
use sysinfo::{Pid, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::{debug, warn};

use crate::command::BenchCommand;
use crate::error::{DriverError, Result};
use crate::invoke::{create_output, exit_code, PhaseResult};

/// Default time between samples.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Header row of every samples file.
pub const SAMPLE_HEADER: [&str; 3] = ["cpu", "rss", "vms"];

/// One CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceSample {
    /// CPU utilization since the previous refresh, in percent of one core.
    #[serde(rename = "cpu")]
    pub cpu_percent: f32,
    /// Resident set size in bytes.
    #[serde(rename = "rss")]
    pub resident_memory_bytes: u64,
    /// Virtual memory size in bytes.
    #[serde(rename = "vms")]
    pub virtual_memory_bytes: u64,
}

/// Launches a command and records its resource use until it exits.
#[derive(Debug, Clone)]
pub struct ResourceSampler {
    interval: Duration,
}

impl Default for ResourceSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL)
    }
}

impl ResourceSampler {
    /// Creates a sampler ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Spawns `command` with stdout captured in `stdout_path` and writes one
    /// row per tick to `samples_path` until the child exits.
    pub fn run(
        &self,
        command: &BenchCommand,
        stdout_path: &Path,
        samples_path: &Path,
    ) -> Result<PhaseResult> {
        let stdout = create_output(stdout_path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(samples_path)?;
        writer.write_record(SAMPLE_HEADER)?;
        writer.flush()?;

        let mut child_cmd = command.to_command();
        child_cmd.stdout(Stdio::from(stdout));
        let mut child = child_cmd.spawn().map_err(|source| DriverError::Spawn {
            program: command.program().to_path_buf(),
            source,
        })?;
        debug!(command = %command, pid = child.id(), "sampling");

        let polled = self.poll(command, &mut child, &mut writer);
        let (status, samples) = match polled {
            Ok(done) => done,
            Err(err) => {
                warn!(pid = child.id(), "sampling failed, killing child: {err}");
                let _ = child.kill();
                let _ = child.wait();
                return Err(err);
            }
        };
        debug!(samples, samples_path = %samples_path.display(), "sampling finished");
        Ok(PhaseResult {
            exit_code: exit_code(status),
            output_path: stdout_path.to_path_buf(),
        })
    }

    fn poll(
        &self,
        command: &BenchCommand,
        child: &mut Child,
        writer: &mut Writer<File>,
    ) -> Result<(ExitStatus, usize)> {
        let pid = Pid::from_u32(child.id());
        let mut system = System::new();
        // CPU usage is a delta between refreshes; two primed readings give
        // the first row a real baseline.
        system.refresh_process(pid);
        thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_process(pid);
        let mut samples = 0usize;
        loop {
            thread::sleep(self.interval);
            let waited = child.try_wait().map_err(|source| DriverError::Wait {
                program: command.program().to_path_buf(),
                source,
            })?;
            if let Some(status) = waited {
                return Ok((status, samples));
            }
            if let Some(sample) = sample_process(&mut system, pid) {
                writer.serialize(sample)?;
                writer.flush()?;
                samples += 1;
            }
        }
    }
}

fn sample_process(system: &mut System, pid: Pid) -> Option<ResourceSample> {
    if !system.refresh_process(pid) {
        return None;
    }
    system.process(pid).map(|process| ResourceSample {
        cpu_percent: process.cpu_usage(),
        resident_memory_bytes: process.memory(),
        virtual_memory_bytes: process.virtual_memory(),
    })
}
