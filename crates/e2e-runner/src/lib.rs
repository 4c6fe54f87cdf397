//! Library entry points behind the `e2e-harness` binary.
//!
//! `run` resolves `--config` paths into one or more experiments and drives
//! each through [`orchestrator::run_experiment`]; `repair` rebuilds
//! `completed_runs` from on-disk `run_result.json` files without touching
//! any other checkpoint state. Both return a process exit code rather than
//! calling `std::process::exit` themselves, so `main` stays the only place
//! that decides how the process actually ends.

pub mod cli;
pub mod collaborators;
pub mod config_loader;
pub mod orchestrator;

use anyhow::{Context, Result};
use cli::{RepairArgs, RunArgs};
use collaborators::{MarkdownReportRenderer, NoopAgentRunner, NoopJudgeEvaluator};
use config_loader::{filter_by_ids, resolve_config_paths, LoadedConfig};
use coordination::{Checkpoint, ExperimentConfig, ExperimentState, RunState, TierState};
use orchestrator::{run_experiment, Collaborators, RunScope, DEFAULT_MAX_SUBTESTS};
use std::path::PathBuf;
use tracing::{info, warn};

/// Every experiment in the batch reached a non-FAILED terminal or `--until` state.
pub const EXIT_OK: i32 = 0;
/// At least one experiment ended FAILED.
pub const EXIT_FAILED: i32 = 1;
/// A precondition couldn't be satisfied: no configs resolved, or (for
/// `repair`) the checkpoint couldn't be loaded.
pub const EXIT_ERROR: i32 = 2;

/// Resolve `--config`, apply CLI overrides per experiment, and run each to
/// completion in turn. Batch mode runs experiments sequentially — each one
/// already fans its own tiers/subtests/runs out concurrently internally.
pub async fn run(args: RunArgs) -> Result<i32> {
    let configs = resolve_config_paths(&args.config)?;
    let configs = filter_by_ids(configs, &args.tests);
    if configs.is_empty() {
        eprintln!("no experiment configs resolved from --config");
        return Ok(EXIT_ERROR);
    }

    let mut any_failed = false;
    for LoadedConfig { source, mut config } in configs {
        apply_cli_overrides(&mut config, &args);

        let experiment_dir = args
            .experiment_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("e2e-runs").join(&config.experiment_id));

        let scope =
            build_scope(&args, &config, experiment_dir).with_context(|| format!("building run scope for {}", source.display()))?;

        let collaborators = Collaborators {
            agent: Box::new(NoopAgentRunner),
            judge: Box::new(NoopJudgeEvaluator),
            reporter: Box::new(MarkdownReportRenderer),
        };

        info!(experiment_id = %config.experiment_id, source = %source.display(), "starting experiment");
        let outcome = run_experiment(config, scope, collaborators).await?;
        if !outcome.success {
            any_failed = true;
        }
    }

    Ok(if any_failed { EXIT_FAILED } else { EXIT_OK })
}

/// Rebuild `completed_runs` from `run_result.json` files under the
/// checkpoint's `experiment_dir`, leaving every other field untouched.
pub fn repair(args: RepairArgs) -> Result<i32> {
    let mut ckpt = match Checkpoint::load(&args.checkpoint_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("cannot load checkpoint at {}: {e}", args.checkpoint_path.display());
            return Ok(EXIT_ERROR);
        }
    };

    let repaired = coordination::results::repair_completed_runs(&ckpt.experiment_dir);
    let mut rebuilt = 0usize;
    for r in &repaired {
        match r {
            coordination::results::RepairedRun::Ok { tier, subtest, run, status } => {
                ckpt.set_completed_run(tier, subtest, *run, *status);
                rebuilt += 1;
            }
            coordination::results::RepairedRun::Unreadable { path, reason } => {
                warn!(path = %path.display(), reason, "skipping unreadable run result during repair");
            }
        }
    }

    ckpt.save(&args.checkpoint_path)?;
    info!(rebuilt, checkpoint = %args.checkpoint_path.display(), "repair complete");
    Ok(EXIT_OK)
}

/// Fold CLI flags into the loaded config's ephemeral section. Ephemeral
/// fields are excluded from `config_hash`, so these overrides never turn a
/// resume into a `ConfigMismatch`.
fn apply_cli_overrides(cfg: &mut ExperimentConfig, args: &RunArgs) {
    if let Some(model) = &args.model {
        cfg.model = model.clone();
    }
    if let Some(judge_model) = &args.judge_model {
        cfg.judge_model = judge_model.clone();
    }
    if !args.add_judge.is_empty() {
        cfg.extra_judge_models.extend(args.add_judge.iter().cloned());
    }
    if let Some(timeout) = args.timeout {
        cfg.timeout_seconds = timeout;
    }
    if let Some(thinking) = args.thinking {
        cfg.thinking = thinking.into();
    }
    if args.skip_judge_validation {
        cfg.skip_judge_validation = true;
    }
    if !args.tiers.is_empty() {
        cfg.ephemeral.tiers_to_run = Some(args.tiers.clone());
    }
    cfg.ephemeral.until_run_state = args.until.clone();
    cfg.ephemeral.until_tier_state = args.until_tier.clone();
    cfg.ephemeral.until_experiment_state = args.until_experiment.clone();
    if let Some(parallel) = args.parallel {
        cfg.ephemeral.parallel_subtests = Some(parallel as u32);
    }
}

fn build_scope(args: &RunArgs, cfg: &ExperimentConfig, experiment_dir: PathBuf) -> Result<RunScope> {
    let until_run = parse_state("--until", &cfg.ephemeral.until_run_state, RunState::from_str_lenient)?;
    let until_tier = parse_state("--until-tier", &cfg.ephemeral.until_tier_state, TierState::from_str_lenient)?;
    let until_experiment = parse_state(
        "--until-experiment",
        &cfg.ephemeral.until_experiment_state,
        ExperimentState::from_str_lenient,
    )?;

    let default_parallel = cfg.ephemeral.parallel_subtests.map(|p| p as usize).unwrap_or(4);

    Ok(RunScope {
        experiment_dir,
        tiers: args.tiers.clone(),
        max_subtests: cfg.ephemeral.max_subtests.unwrap_or(DEFAULT_MAX_SUBTESTS),
        runs_per_subtest: args.runs.unwrap_or(cfg.runs_per_subtest),
        parallel_high: args.parallel_high.unwrap_or(default_parallel),
        parallel_med: args.parallel_med.unwrap_or(default_parallel),
        parallel_low: args.parallel_low.unwrap_or(default_parallel),
        until_run,
        until_tier,
        until_experiment,
        from_run: args.from.clone(),
        from_tier: args.from_tier.clone(),
        from_experiment: args.from_experiment.clone(),
        filter_tier: args.filter_tier.clone(),
        filter_subtest: args.filter_subtest.clone(),
        filter_run: args.filter_run.clone(),
        filter_status: args.filter_status.iter().map(|s| (*s).into()).collect(),
        fresh: args.fresh,
        retry_errors: args.retry_errors,
        commit: args.commit.clone().or_else(|| cfg.commit.clone()),
    })
}

/// `from_str_lenient` silently falls back to the first sequence state on an
/// unrecognized string; for an explicit `--until*` flag that's a footgun, so
/// round-trip through `Display` and reject anything that doesn't match.
fn parse_state<S: PartialEq + std::fmt::Display>(flag: &str, raw: &Option<String>, parse: impl Fn(&str) -> S) -> Result<Option<S>> {
    let Some(raw) = raw else { return Ok(None) };
    let parsed = parse(raw);
    if parsed.to_string() != *raw {
        anyhow::bail!("{flag}: unrecognized state {raw:?}");
    }
    Ok(Some(parsed))
}
