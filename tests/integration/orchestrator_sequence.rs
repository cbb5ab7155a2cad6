#![allow(missing_docs)]

mod support;

use std::path::PathBuf;

use support::{arg, config, small_datasets, RecordingLauncher};
use tempfile::TempDir;
use tsbs_runner::{Orchestrator, PhaseRunner, Stage};

fn is_full(inv: &support::Invocation) -> bool {
    inv.command.has_flag("-f")
}

fn is_bitmap(inv: &support::Invocation) -> bool {
    inv.command.has_flag("-b")
}

#[test]
fn successful_run_walks_both_branches_in_order() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path(), small_datasets());
    let mut launcher = RecordingLauncher::new();

    let report = Orchestrator::new(PhaseRunner::new(&cfg, &mut launcher))
        .run()
        .unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(report.branches.len(), 2);
    for (branch, full) in report.branches.iter().zip([false, true]) {
        assert_eq!(branch.full_database, full);
        assert_eq!(branch.reached, Stage::Done);
        let stages: Vec<Stage> = branch.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            [
                Stage::FreshInsert,
                Stage::Query,
                Stage::BitmapFreshInsert,
                Stage::BitmapQuery,
                Stage::Reinsert,
                Stage::Mixed
            ]
        );
    }

    // 2 datasets, 3 queries: 2 + 6 + 2 + 6 + 2 + 32 per branch.
    assert_eq!(launcher.invocations.len(), 100);
    let first_full = launcher
        .invocations
        .iter()
        .position(is_full)
        .expect("full-database branch ran");
    assert_eq!(first_full, 50);
    assert!(launcher.invocations[first_full..].iter().all(is_full));

    let hybrid: Vec<String> = launcher.workloads()[..50].to_vec();
    assert!(hybrid[..2].iter().all(|w| w == "insert"));
    assert!(hybrid[2..8].iter().all(|w| w == "query"));
    assert!(hybrid[8..10].iter().all(|w| w == "insert"));
    assert!(hybrid[10..16].iter().all(|w| w == "query"));
    assert!(hybrid[16..18].iter().all(|w| w == "insert"));
    assert!(hybrid[18..].iter().all(|w| w == "mixed"));

    let bitmap_stage = &launcher.invocations[8..16];
    assert!(bitmap_stage.iter().all(is_bitmap));
    let reinsert = &launcher.invocations[16..18];
    assert!(reinsert.iter().all(|inv| !is_bitmap(inv)));
    assert!(reinsert
        .iter()
        .all(|inv| inv.target.stdout.to_string_lossy().ends_with("-hybrid-insert.txt")));
}

#[test]
fn failing_phase_halts_branch_and_skips_full_database() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path(), small_datasets());
    let mut launcher = RecordingLauncher::with_exit_rule(|cmd| {
        if arg(cmd, "-w").as_deref() == Some("query") && arg(cmd, "-q").as_deref() == Some("2") {
            6
        } else {
            0
        }
    });

    let report = Orchestrator::new(PhaseRunner::new(&cfg, &mut launcher))
        .run()
        .unwrap();

    assert_eq!(report.exit_code, 6);
    assert_eq!(report.branches.len(), 1);
    assert_eq!(report.branches[0].reached, Stage::Query);
    // The query phase still finished its own loop before the branch halted.
    assert_eq!(launcher.invocations.len(), 2 + 6);
    assert!(!launcher.invocations.iter().any(is_full));
    assert!(!launcher.invocations.iter().any(is_bitmap));
}

#[test]
fn phase_keeps_iterating_and_reports_last_failure() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path(), small_datasets());
    let mut launcher = RecordingLauncher::with_exit_rule(|cmd| {
        let root = PathBuf::from(arg(cmd, "-r").unwrap());
        match root.file_name().unwrap().to_str().unwrap() {
            "alpha" => 5,
            "beta" => 7,
            _ => 0,
        }
    });

    let report = Orchestrator::new(PhaseRunner::new(&cfg, &mut launcher))
        .run()
        .unwrap();

    assert_eq!(report.exit_code, 7);
    assert_eq!(report.branches[0].reached, Stage::FreshInsert);
    assert_eq!(launcher.invocations.len(), 2);
}

#[test]
fn full_database_failure_reports_its_code() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path(), small_datasets());
    let mut launcher = RecordingLauncher::with_exit_rule(|cmd| {
        if cmd.has_flag("-f") && arg(cmd, "-w").as_deref() == Some("mixed") {
            2
        } else {
            0
        }
    });

    let report = Orchestrator::new(PhaseRunner::new(&cfg, &mut launcher))
        .run()
        .unwrap();

    assert_eq!(report.exit_code, 2);
    assert_eq!(report.branches[0].exit_code, 0);
    assert_eq!(report.branches[1].reached, Stage::Mixed);
    assert_eq!(launcher.invocations.len(), 100);
}

#[test]
fn randomized_ranges_only_touch_queries() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(tmp.path(), small_datasets());
    cfg.randomize_ranges = true;
    let mut launcher = RecordingLauncher::new();

    let mut orchestrator = Orchestrator::new(PhaseRunner::new(&cfg, &mut launcher));
    let branch = orchestrator.run_branch(false).unwrap();
    drop(orchestrator);

    assert_eq!(branch.reached, Stage::Done);
    for inv in &launcher.invocations {
        let randomized = inv.command.has_flag("-m");
        assert_eq!(randomized, inv.workload() == "query", "{}", inv.command);
        if randomized {
            assert!(inv
                .target
                .stdout
                .to_string_lossy()
                .contains("-rand-query.txt"));
        }
    }
}

#[test]
fn query_commands_carry_scale_index_not_position() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path(), small_datasets());
    let mut launcher = RecordingLauncher::new();
    {
        let mut runner = PhaseRunner::new(&cfg, &mut launcher);
        runner.prepare().unwrap();
        runner.query(tsbs_runner::ExecutionMode::HYBRID).unwrap();
    }

    let first = &launcher.invocations[0];
    assert_eq!(arg(&first.command, "-g").as_deref(), Some("3"));
    assert_eq!(arg(&first.command, "-q").as_deref(), Some("1"));
    assert!(first
        .target
        .stdout
        .ends_with("s3-q1-hybrid-query.txt"));
    assert_eq!(
        arg(&first.command, "-d"),
        Some(
            cfg.dataset_path
                .join("prometheus-data-cpu-only-alpha")
                .display()
                .to_string()
        )
    );
}

#[test]
fn mixed_trial_passes_truncated_row_target_and_ratio() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(
        tmp.path(),
        vec![tsbs_runner::Dataset::new("s1d-i1h-100000", 1_000_000, 4)],
    );
    let bitmap = tsbs_runner::ExecutionMode::HYBRID.with_bitmap_only(true);
    let mut launcher = RecordingLauncher::new();
    {
        let mut runner = PhaseRunner::new(&cfg, &mut launcher);
        runner.prepare().unwrap();
        runner.fresh_insert(bitmap).unwrap();
        runner.mixed(tsbs_runner::ExecutionMode::HYBRID).unwrap();
    }

    let trial = launcher
        .invocations
        .iter()
        .find(|inv| {
            arg(&inv.command, "-t").as_deref() == Some("0.7")
                && arg(&inv.command, "-s").as_deref() == Some("400000")
        })
        .expect("trial with ratio 0.7 and size 0.4");
    assert_eq!(arg(&trial.command, "-a").as_deref(), Some("1.5"));
    assert!(trial.command.has_flag("-b"));
    assert!(!trial.command.has_flag("-p"));
    assert!(trial
        .target
        .stdout
        .ends_with("s1d-i1h-100000-hybrid-bm-mixed-0.7-0.4.txt"));
    assert!(trial.root().ends_with("s1d-i1h-100000-bm-mixed"));
}

#[test]
fn checkpoint_comparison_runs_largest_dataset_twice() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path(), small_datasets());
    let mut launcher = RecordingLauncher::new();
    {
        let mut runner = PhaseRunner::new(&cfg, &mut launcher);
        runner.prepare().unwrap();
        let code = runner
            .checkpoint_comparison(tsbs_runner::ExecutionMode::HYBRID)
            .unwrap();
        assert_eq!(code, 0);
    }

    let runs = &launcher.invocations;
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|inv| inv.root().ends_with("beta-checkpoint")));
    assert_eq!(arg(&runs[0].command, "-c").as_deref(), Some("disabled"));
    assert!(runs[0].target.stderr.is_none());
    assert_eq!(arg(&runs[1].command, "-c").as_deref(), Some("print"));
    assert!(runs[1]
        .target
        .stderr
        .as_ref()
        .unwrap()
        .ends_with("beta-hybrid-checkpoint-print.err"));
    assert!(runs[1]
        .target
        .stdout
        .ends_with("beta-hybrid-checkpoint-print.txt"));
}

#[test]
fn resource_queries_are_sampled_with_their_concurrency() {
    let tmp = TempDir::new().unwrap();
    let cfg = config(tmp.path(), small_datasets());
    let mut launcher = RecordingLauncher::with_exit_rule(|cmd| {
        if arg(cmd, "-k").as_deref() == Some("1") {
            9
        } else {
            0
        }
    });
    let code = {
        let mut runner = PhaseRunner::new(&cfg, &mut launcher);
        runner.prepare().unwrap();
        runner
            .query_resource(tsbs_runner::ExecutionMode::HYBRID)
            .unwrap()
    };

    assert_eq!(code, 9);
    assert_eq!(launcher.invocations.len(), 2 * cfg.resource_queries.len());
    for inv in &launcher.invocations {
        let samples = inv.samples.as_ref().expect("sampled invocation");
        let q = arg(&inv.command, "-q").unwrap();
        let k = arg(&inv.command, "-k").unwrap();
        let expected_k = cfg
            .resource_queries
            .iter()
            .find(|rq| rq.query.to_string() == q)
            .unwrap()
            .concurrency
            .to_string();
        assert_eq!(k, expected_k);
        let name = samples.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with(&format!("-q{q}-hybrid-query-resource.csv")), "{name}");
    }
}
