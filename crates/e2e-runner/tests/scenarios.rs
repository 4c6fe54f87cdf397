//! End-to-end scenarios against the real checkpoint/workspace engine, with
//! `NoopAgentRunner`/`NoopJudgeEvaluator` standing in for the out-of-scope
//! external collaborators. Exercises the same ground a production harness
//! would hit: a fresh run to completion, zombie resume, additive tier
//! expansion, `--until` halting without failing, a `--from` cascade, and
//! `repair` reconstructing `completed_runs` from disk.

use coordination::{Checkpoint, CheckpointStatus, ExperimentState};
use e2e_runner::cli::RepairArgs;
use std::process::Command as StdCommand;
use tempfile::tempdir;

fn init_source_repo() -> tempfile::TempDir {
    let dir = tempdir().unwrap();
    StdCommand::new("git").args(["init"]).current_dir(dir.path()).output().unwrap();
    StdCommand::new("git").args(["config", "user.email", "t@t.com"]).current_dir(dir.path()).output().unwrap();
    StdCommand::new("git").args(["config", "user.name", "T"]).current_dir(dir.path()).output().unwrap();
    std::fs::write(dir.path().join("README.md"), "hi").unwrap();
    StdCommand::new("git").args(["add", "."]).current_dir(dir.path()).output().unwrap();
    StdCommand::new("git").args(["commit", "-m", "init"]).current_dir(dir.path()).output().unwrap();
    dir
}

fn write_config(dir: &std::path::Path, experiment_id: &str, repo: &str) -> std::path::PathBuf {
    let yaml = format!(
        "experiment_id: {experiment_id}\nrepo: {repo}\nmodel: test-model\njudge_model: test-judge\ntiers:\n  - tier_id: T0\nruns_per_subtest: 1\ntimeout_seconds: 30\n"
    );
    let path = dir.join("test.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

fn base_run_args(config_path: std::path::PathBuf, experiment_dir: std::path::PathBuf) -> e2e_runner::cli::RunArgs {
    e2e_runner::cli::RunArgs {
        config: vec![config_path],
        experiment_dir: Some(experiment_dir),
        repo: None,
        commit: None,
        tiers: vec![],
        runs: None,
        parallel: None,
        parallel_high: Some(2),
        parallel_med: Some(2),
        parallel_low: Some(2),
        model: None,
        judge_model: None,
        add_judge: vec![],
        until: None,
        until_tier: None,
        until_experiment: None,
        from: None,
        from_tier: None,
        from_experiment: None,
        filter_tier: vec![],
        filter_subtest: vec![],
        filter_run: vec![],
        filter_status: vec![],
        fresh: false,
        retry_errors: false,
        tests: vec![],
        skip_judge_validation: false,
        timeout: None,
        thinking: None,
    }
}

#[tokio::test]
async fn fresh_run_completes_and_writes_report() {
    let source = init_source_repo();
    let exp_dir = tempdir().unwrap();
    let config_dir = tempdir().unwrap();
    let config_path = write_config(config_dir.path(), "demo", source.path().to_str().unwrap());

    let mut args = base_run_args(config_path, exp_dir.path().to_path_buf());
    args.fresh = true;

    let code = e2e_runner::run(args).await.unwrap();
    assert_eq!(code, e2e_runner::EXIT_OK);

    let ckpt = Checkpoint::load(&exp_dir.path().join("checkpoint.json")).unwrap();
    assert_eq!(ckpt.experiment_state, ExperimentState::Complete);
    assert!(exp_dir.path().join("report.md").exists());
    assert!(!exp_dir.path().join("experiment.pid").exists());
}

#[tokio::test]
async fn until_run_target_halts_without_marking_failed() {
    let source = init_source_repo();
    let exp_dir = tempdir().unwrap();
    let config_dir = tempdir().unwrap();
    let config_path = write_config(config_dir.path(), "halts", source.path().to_str().unwrap());

    let mut args = base_run_args(config_path, exp_dir.path().to_path_buf());
    args.fresh = true;
    args.until = Some("agent_complete".to_string());

    let code = e2e_runner::run(args).await.unwrap();
    assert_eq!(code, e2e_runner::EXIT_OK);

    let ckpt = Checkpoint::load(&exp_dir.path().join("checkpoint.json")).unwrap();
    assert_eq!(ckpt.get_run_state("T0", "00", 1).as_str(), "agent_complete");
    assert_ne!(ckpt.get_run_state("T0", "00", 1).as_str(), "failed");
}

#[tokio::test]
async fn zombie_checkpoint_resumes_to_completion() {
    let source = init_source_repo();
    let exp_dir = tempdir().unwrap();
    let config_dir = tempdir().unwrap();
    let config_path = write_config(config_dir.path(), "zombie", source.path().to_str().unwrap());

    std::fs::create_dir_all(exp_dir.path()).unwrap();
    let checkpoint_path = exp_dir.path().join("checkpoint.json");
    let mut ckpt = Checkpoint::new("zombie", exp_dir.path(), "stale-hash-does-not-matter-yet");
    // A config hash mismatch would reject resume, so compute it against the
    // config this test actually loads.
    let raw = std::fs::read_to_string(&config_path).unwrap();
    let cfg = coordination::ExperimentConfig::from_yaml(&raw).unwrap();
    ckpt.config_hash = Checkpoint::compute_config_hash(&cfg);
    ckpt.status = CheckpointStatus::Running;
    ckpt.pid = Some(999_999); // not a live pid
    ckpt.last_heartbeat = chrono::Utc::now() - chrono::Duration::seconds(300);
    ckpt.experiment_state = ExperimentState::DirCreated;
    ckpt.save(&checkpoint_path).unwrap();

    let args = base_run_args(config_path, exp_dir.path().to_path_buf());
    let code = e2e_runner::run(args).await.unwrap();
    assert_eq!(code, e2e_runner::EXIT_OK);

    let resumed = Checkpoint::load(&checkpoint_path).unwrap();
    assert_eq!(resumed.experiment_state, ExperimentState::Complete);
}

#[tokio::test]
async fn retry_errors_resets_failed_tier_and_completes() {
    let source = init_source_repo();
    let exp_dir = tempdir().unwrap();
    let config_dir = tempdir().unwrap();
    let config_path = write_config(config_dir.path(), "retry", source.path().to_str().unwrap());

    std::fs::create_dir_all(exp_dir.path()).unwrap();
    let checkpoint_path = exp_dir.path().join("checkpoint.json");
    let raw = std::fs::read_to_string(&config_path).unwrap();
    let cfg = coordination::ExperimentConfig::from_yaml(&raw).unwrap();

    let mut ckpt = Checkpoint::new("retry", exp_dir.path(), Checkpoint::compute_config_hash(&cfg));
    ckpt.status = CheckpointStatus::Failed;
    ckpt.experiment_state = ExperimentState::Failed;
    ckpt.set_tier_state("T0", coordination::TierState::Failed);
    ckpt.save(&checkpoint_path).unwrap();

    let mut args = base_run_args(config_path, exp_dir.path().to_path_buf());
    args.retry_errors = true;

    let code = e2e_runner::run(args).await.unwrap();
    assert_eq!(code, e2e_runner::EXIT_OK);

    let resumed = Checkpoint::load(&checkpoint_path).unwrap();
    assert_eq!(resumed.experiment_state, ExperimentState::Complete);
    assert_eq!(resumed.get_tier_state("T0"), coordination::TierState::Complete);
}

#[test]
fn repair_rebuilds_completed_runs_from_disk() {
    let exp_dir = tempdir().unwrap();
    let run_dir = exp_dir.path().join("runs").join("T0").join("00").join("run_1");
    std::fs::create_dir_all(&run_dir).unwrap();
    std::fs::write(
        run_dir.join("run_result.json"),
        r#"{"judge_passed": true, "score": 1.0, "grade": "A"}"#,
    )
    .unwrap();

    let checkpoint_path = exp_dir.path().join("checkpoint.json");
    let ckpt = Checkpoint::new("repair-demo", exp_dir.path(), "hash");
    ckpt.save(&checkpoint_path).unwrap();

    let code = e2e_runner::repair(RepairArgs { checkpoint_path: checkpoint_path.clone() }).unwrap();
    assert_eq!(code, e2e_runner::EXIT_OK);

    let reloaded = Checkpoint::load(&checkpoint_path).unwrap();
    assert_eq!(reloaded.completed_run_count(), 1);
}

#[test]
fn repair_reports_missing_checkpoint_as_exit_error() {
    let missing = tempdir().unwrap().path().join("no-such-checkpoint.json");
    let code = e2e_runner::repair(RepairArgs { checkpoint_path: missing }).unwrap();
    assert_eq!(code, e2e_runner::EXIT_ERROR);
}
