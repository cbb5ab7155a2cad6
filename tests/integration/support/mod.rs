#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tsbs_runner::{
    BenchCommand, Dataset, DriverConfig, Launcher, OutputTarget, ParameterMatrix, PhaseResult,
};
use walkdir::WalkDir;

pub fn small_datasets() -> Vec<Dataset> {
    vec![
        Dataset::new("alpha", 1_000, 3),
        Dataset::new("beta", 2_000, 1),
    ]
}

pub fn config(home: &Path, datasets: Vec<Dataset>) -> DriverConfig {
    let mut cfg = DriverConfig::new(home.join("bench-home"), home.join("datasets"));
    cfg.matrix = ParameterMatrix::new(datasets);
    cfg
}

/// File contents under `dir`, keyed by relative path.
pub fn snapshot(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let rel = entry.path().strip_prefix(dir).unwrap().to_path_buf();
            (rel, fs::read(entry.path()).unwrap())
        })
        .collect()
}

pub fn arg(cmd: &BenchCommand, flag: &str) -> Option<String> {
    cmd.value_of(flag).map(|v| v.to_string_lossy().into_owned())
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: BenchCommand,
    pub target: OutputTarget,
    pub samples: Option<PathBuf>,
}

impl Invocation {
    pub fn workload(&self) -> String {
        arg(&self.command, "-w").unwrap()
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(arg(&self.command, "-r").unwrap())
    }
}

type ExitRule = Box<dyn Fn(&BenchCommand) -> i32>;

/// Launcher that records commands and mimics the executable's effect on its
/// working directory: inserts append rows, mixed trials record the directory
/// they started from and then scribble on it.
pub struct RecordingLauncher {
    pub invocations: Vec<Invocation>,
    pub mixed_starts: Vec<BTreeMap<PathBuf, Vec<u8>>>,
    exit_rule: ExitRule,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::with_exit_rule(|_| 0)
    }

    pub fn with_exit_rule(rule: impl Fn(&BenchCommand) -> i32 + 'static) -> Self {
        Self {
            invocations: Vec::new(),
            mixed_starts: Vec::new(),
            exit_rule: Box::new(rule),
        }
    }

    pub fn workloads(&self) -> Vec<String> {
        self.invocations.iter().map(Invocation::workload).collect()
    }

    fn simulate(&mut self, cmd: &BenchCommand) {
        let root = PathBuf::from(arg(cmd, "-r").unwrap());
        match arg(cmd, "-w").as_deref() {
            Some("insert") => {
                fs::create_dir_all(&root).unwrap();
                let data = root.join("data.txt");
                let mut rows = fs::read(&data).unwrap_or_default();
                rows.extend_from_slice(b"row\n");
                fs::write(data, rows).unwrap();
            }
            Some("mixed") => {
                self.mixed_starts.push(snapshot(&root));
                let n = self.mixed_starts.len();
                fs::write(root.join(format!("trial-{n}.log")), b"dirty").unwrap();
                fs::write(root.join("data.txt"), format!("mutated by {n}")).unwrap();
            }
            _ => {}
        }
    }
}

impl Launcher for RecordingLauncher {
    fn invoke(
        &mut self,
        command: &BenchCommand,
        target: &OutputTarget,
    ) -> tsbs_runner::Result<PhaseResult> {
        self.simulate(command);
        self.invocations.push(Invocation {
            command: command.clone(),
            target: target.clone(),
            samples: None,
        });
        Ok(PhaseResult {
            exit_code: (self.exit_rule)(command),
            output_path: target.stdout.clone(),
        })
    }

    fn invoke_sampled(
        &mut self,
        command: &BenchCommand,
        stdout: &Path,
        samples: &Path,
    ) -> tsbs_runner::Result<PhaseResult> {
        self.invocations.push(Invocation {
            command: command.clone(),
            target: OutputTarget::stdout(stdout),
            samples: Some(samples.to_path_buf()),
        });
        Ok(PhaseResult {
            exit_code: (self.exit_rule)(command),
            output_path: stdout.to_path_buf(),
        })
    }
}

/// Shell-script stand-in for the benchmark executable.
#[cfg(unix)]
pub struct FakeTsbs {
    pub path: PathBuf,
    pub log: PathBuf,
}

#[cfg(unix)]
impl FakeTsbs {
    /// Writes the script into `dir`. Every invocation appends its arguments
    /// to `invocations.log`. Workload `fail_workload` exits with `fail_code`,
    /// and query invocations sleep for `query_sleep` seconds.
    pub fn install(dir: &Path, fail_workload: Option<(&str, i32)>, query_sleep: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        fs::create_dir_all(dir).unwrap();
        let path = dir.join("tsbs");
        let log = dir.join("invocations.log");
        let (fail_on, fail_code) = fail_workload.unwrap_or(("none", 0));
        let script = format!(
            r#"#!/bin/sh
echo "$*" >> "{log}"
echo "args: $*"
workload=""
root=""
ckpt=""
while [ $# -gt 0 ]; do
  case "$1" in
    -w) workload="$2"; shift 2 ;;
    -r) root="$2"; shift 2 ;;
    -c) ckpt="$2"; shift 2 ;;
    -d|-q|-g|-a|-s|-t|-k) shift 2 ;;
    *) shift ;;
  esac
done
if [ "$workload" = "{fail_on}" ]; then
  echo "failing $workload" >&2
  exit {fail_code}
fi
case "$workload" in
  insert)
    mkdir -p "$root"
    echo "row" >> "$root/data.txt"
    if [ "$ckpt" = "print" ]; then
      echo "checkpoint diagnostics" >&2
    fi
    ;;
  mixed)
    echo "start: $(cat "$root/data.txt")"
    echo "mutated" >> "$root/data.txt"
    ;;
  query)
    sleep {query_sleep}
    echo "query done"
    ;;
esac
exit 0
"#,
            log = log.display(),
        );
        fs::write(&path, script).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        Self { path, log }
    }

    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
