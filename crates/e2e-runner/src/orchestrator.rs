//! Drives a single experiment from its checkpoint through the four nested
//! state levels: experiment, tier, subtest, run.
//!
//! Each level has its own exception-handling rule (a bare failure marks a
//! level FAILED, a shutdown request rewinds or marks INTERRUPTED, and an
//! `--until` halt commits the reached state without failing anything above
//! it). The run level's own synchronous `RunStateMachine` is driven
//! directly, since its action never needs to await anything beyond the
//! scheduler permit acquired just before calling it. The three levels above
//! it are re-derived here as plain async loops instead of going through
//! `ExperimentStateMachine`/`TierStateMachine`/`SubtestStateMachine`, whose
//! `advance` takes a synchronous action — the tier and subtest levels need
//! to await the scheduler and fan out over concurrent runs, which a
//! synchronous closure can't do without re-entering a runtime it's already
//! running inside of.

use anyhow::{Context, Result};
use coordination::checkpoint::CompletedRunStatus;
use coordination::collaborators::ExperimentSummary;
use coordination::states::run_transition_memory_class;
use coordination::{
    AgentOutcome, AgentRunner, Checkpoint, CheckpointStatus, ExperimentConfig, ExperimentState, HarnessError,
    HarnessResult, HeartbeatThread, JudgeEvaluator, JudgeOutcome, ParallelismScheduler, ReportRenderer, ResumeManager,
    RunContext, RunState, RunStateMachine, SubtestState, TierState, WorkspaceManager,
};
use coordination::results::RunResult;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Ephemeral scope for one `run` invocation, gathered from CLI flags plus
/// the loaded config's own ephemeral section.
pub struct RunScope {
    pub experiment_dir: PathBuf,
    pub tiers: Vec<String>,
    pub max_subtests: u32,
    pub runs_per_subtest: u32,
    pub parallel_high: usize,
    pub parallel_med: usize,
    pub parallel_low: usize,
    pub until_run: Option<RunState>,
    pub until_tier: Option<TierState>,
    pub until_experiment: Option<ExperimentState>,
    pub from_run: Option<String>,
    pub from_tier: Option<String>,
    pub from_experiment: Option<String>,
    pub filter_tier: Vec<String>,
    pub filter_subtest: Vec<String>,
    pub filter_run: Vec<u32>,
    pub filter_status: Vec<CompletedRunStatus>,
    pub fresh: bool,
    pub retry_errors: bool,
    pub commit: Option<String>,
}

/// The slice of `ExperimentConfig` a run transition needs to build its
/// `RunContext`, kept separate from `RunScope` since it comes from the
/// loaded config rather than CLI flags.
struct RunMeta {
    experiment_id: String,
    model: String,
    timeout_seconds: u64,
}

pub struct Collaborators {
    pub agent: Box<dyn AgentRunner + Send + Sync>,
    pub judge: Box<dyn JudgeEvaluator + Send + Sync>,
    pub reporter: Box<dyn ReportRenderer + Send + Sync>,
}

pub struct RunOutcome {
    pub success: bool,
    pub experiment_state: ExperimentState,
}

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// `ephemeral.max_subtests` is the only config field that determines how
/// many subtests a tier runs; absent that, each tier runs a single subtest.
pub const DEFAULT_MAX_SUBTESTS: u32 = 1;

fn next_in_sequence<S: Copy + PartialEq>(sequence: &[S], current: S) -> Option<S> {
    let idx = sequence.iter().position(|s| *s == current)?;
    sequence.get(idx + 1).copied()
}

fn non_empty<T>(v: &[T]) -> Option<&[T]> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

fn subtest_ids(max_subtests: u32) -> Vec<String> {
    (0..max_subtests.max(1)).map(|i| format!("{i:02}")).collect()
}

/// Run (or resume) a single experiment to completion, honoring `--until`/
/// `--from` scoping, pausing and retrying across rate-limit windows until
/// the state machine reaches a terminal state or an `--until` target.
pub async fn run_experiment(cfg: ExperimentConfig, scope: RunScope, collaborators: Collaborators) -> Result<RunOutcome> {
    std::fs::create_dir_all(&scope.experiment_dir)
        .with_context(|| format!("creating experiment dir {}", scope.experiment_dir.display()))?;

    let checkpoint_path = scope.experiment_dir.join("checkpoint.json");
    let pid_path = scope.experiment_dir.join("experiment.pid");
    let config_hash = Checkpoint::compute_config_hash(&cfg);
    let resume = ResumeManager::default();

    let mut ckpt = if scope.fresh || !checkpoint_path.exists() {
        Checkpoint::new(cfg.experiment_id.clone(), scope.experiment_dir.clone(), config_hash)
    } else {
        let mut loaded = Checkpoint::load(&checkpoint_path)?;
        if resume.handle_zombie(&mut loaded) {
            warn!(experiment_id = %cfg.experiment_id, "resumed checkpoint was a zombie, marked interrupted");
        }
        resume.check_config_hash(&loaded, &cfg)?;
        resume.reset_failed_states(&mut loaded);
        if !scope.tiers.is_empty() {
            resume.merge_cli_tiers_and_reset_incomplete(&mut loaded, &scope.tiers);
        }
        loaded
    };

    if scope.retry_errors {
        ckpt.reset_runs_for_from_state("pending", None, None, None, Some(&[CompletedRunStatus::Failed]));
    }
    if let Some(from) = &scope.from_run {
        let run_f = if scope.filter_run.is_empty() { None } else { Some(scope.filter_run.as_slice()) };
        ckpt.reset_runs_for_from_state(from, non_empty(&scope.filter_tier), non_empty(&scope.filter_subtest), run_f, non_empty(&scope.filter_status));
    }
    if let Some(from) = &scope.from_tier {
        ckpt.reset_tiers_for_from_state(from, non_empty(&scope.filter_tier));
    }
    if let Some(from) = &scope.from_experiment {
        ckpt.reset_experiment_for_from_state(from);
    }

    ckpt.status = CheckpointStatus::Running;
    ckpt.pid = Some(std::process::id());
    ckpt.save(&checkpoint_path)?;
    std::fs::write(&pid_path, std::process::id().to_string())?;

    let heartbeat = HeartbeatThread::spawn(checkpoint_path.clone(), HEARTBEAT_INTERVAL);

    let tiers_to_run: Vec<String> = if !scope.tiers.is_empty() {
        scope.tiers.clone()
    } else if let Some(t) = &cfg.ephemeral.tiers_to_run {
        t.clone()
    } else {
        cfg.tier_ids()
    };

    let ckpt = Arc::new(Mutex::new(ckpt));
    let scheduler = Arc::new(ParallelismScheduler::new(scope.parallel_high, scope.parallel_med, scope.parallel_low));
    let workspace = Arc::new(WorkspaceManager::new(scope.experiment_dir.clone(), cfg.repo.clone()));
    let collaborators = Arc::new(collaborators);
    let meta = Arc::new(RunMeta {
        experiment_id: cfg.experiment_id.clone(),
        model: cfg.model.clone(),
        timeout_seconds: cfg.timeout_seconds,
    });

    let mut result = run_until_settled(&ckpt, &checkpoint_path, &scope, &tiers_to_run, &workspace, &scheduler, &collaborators, &meta).await;

    while let Err(e) = &result {
        let Some((source, retry_after)) = e.as_rate_limit() else { break };
        info!(source, retry_after, "rate limit hit, pausing experiment");
        {
            let mut c = ckpt.lock().await;
            c.status = CheckpointStatus::PausedRateLimit;
            c.pause_count += 1;
            c.save(&checkpoint_path)?;
        }
        tokio::time::sleep(Duration::from_secs(retry_after)).await;
        {
            let mut c = ckpt.lock().await;
            resume.reset_failed_states(&mut c);
            c.status = CheckpointStatus::Running;
            c.save(&checkpoint_path)?;
        }
        result = run_until_settled(&ckpt, &checkpoint_path, &scope, &tiers_to_run, &workspace, &scheduler, &collaborators, &meta).await;
    }

    heartbeat.stop();

    let final_state = { ckpt.lock().await.experiment_state };
    match result {
        Ok(()) => {
            {
                let mut c = ckpt.lock().await;
                c.status = if final_state == ExperimentState::Failed {
                    CheckpointStatus::Failed
                } else {
                    CheckpointStatus::Completed
                };
                c.save(&checkpoint_path)?;
            }
            if final_state == ExperimentState::Complete {
                let _ = std::fs::remove_file(&pid_path);
            }
            render_final_report(&scope.experiment_dir, &cfg.experiment_id, collaborators.reporter.as_ref())?;
            Ok(RunOutcome {
                success: final_state != ExperimentState::Failed,
                experiment_state: final_state,
            })
        }
        Err(e) if e.is_shutdown() => {
            info!(experiment_id = %cfg.experiment_id, "shutdown requested, checkpoint saved for resume");
            Ok(RunOutcome {
                success: true,
                experiment_state: final_state,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Drive the experiment level until it reaches a terminal state, an
/// `--until-experiment` target, or an `--until` halt bubbles up from a run.
/// Mirrors `ExperimentStateMachine::advance`'s exception table: shutdown and
/// rate limits both mark INTERRUPTED, anything else marks FAILED.
#[allow(clippy::too_many_arguments)]
async fn run_until_settled(
    ckpt: &Arc<Mutex<Checkpoint>>,
    path: &Path,
    scope: &RunScope,
    tiers_to_run: &[String],
    workspace: &Arc<WorkspaceManager>,
    scheduler: &Arc<ParallelismScheduler>,
    collaborators: &Arc<Collaborators>,
    meta: &Arc<RunMeta>,
) -> HarnessResult<()> {
    let halted = Arc::new(AtomicBool::new(false));

    loop {
        let current = { ckpt.lock().await.experiment_state };
        if current.is_terminal() {
            break;
        }
        let Some(to) = next_in_sequence(ExperimentState::SEQUENCE, current) else {
            break;
        };

        let action_result = match to {
            ExperimentState::DirCreated => std::fs::create_dir_all(&scope.experiment_dir).map_err(HarnessError::from),
            ExperimentState::RepoCloned => workspace.setup_base_repo(scope.commit.as_deref()),
            ExperimentState::TiersRunning => {
                run_all_tiers(ckpt, path, scope, tiers_to_run, workspace, scheduler, collaborators, meta, &halted).await
            }
            ExperimentState::TiersComplete | ExperimentState::ReportsGenerated => Ok(()),
            _ => Ok(()),
        };

        match action_result {
            Ok(()) => {
                let mut c = ckpt.lock().await;
                c.experiment_state = to;
                c.save(path)?;
            }
            Err(e @ (HarnessError::ShutdownInterrupted | HarnessError::RateLimit { .. })) => {
                let mut c = ckpt.lock().await;
                c.experiment_state = ExperimentState::Interrupted;
                c.save(path)?;
                return Err(e);
            }
            Err(other) => {
                let mut c = ckpt.lock().await;
                c.experiment_state = ExperimentState::Failed;
                c.save(path)?;
                return Err(other);
            }
        }

        if let Some(target) = scope.until_experiment {
            if to == target {
                break;
            }
        }
        if halted.load(Ordering::Relaxed) {
            break;
        }
    }
    Ok(())
}

/// Drive every requested tier to completion (or an `--until-tier`/`--until`
/// target). Mirrors `TierStateMachine::advance`: shutdown rewinds to
/// `ConfigLoaded`, any other failure (including a rate limit bubbling up
/// from a run) marks the tier FAILED without aborting its siblings.
#[allow(clippy::too_many_arguments)]
async fn run_all_tiers(
    ckpt: &Arc<Mutex<Checkpoint>>,
    path: &Path,
    scope: &RunScope,
    tiers_to_run: &[String],
    workspace: &Arc<WorkspaceManager>,
    scheduler: &Arc<ParallelismScheduler>,
    collaborators: &Arc<Collaborators>,
    meta: &Arc<RunMeta>,
    halted: &Arc<AtomicBool>,
) -> HarnessResult<()> {
    for tier in tiers_to_run {
        if !scope.filter_tier.is_empty() && !scope.filter_tier.contains(tier) {
            continue;
        }
        if halted.load(Ordering::Relaxed) {
            break;
        }

        loop {
            let current = { ckpt.lock().await.get_tier_state(tier) };
            if current.is_terminal() {
                break;
            }
            let Some(to) = next_in_sequence(TierState::SEQUENCE, current) else {
                break;
            };

            let action_result = match to {
                TierState::SubtestsRunning => {
                    run_all_subtests(ckpt, path, tier, scope, workspace, scheduler, collaborators, meta, halted).await
                }
                _ => Ok(()),
            };

            match action_result {
                Ok(()) => {
                    let mut c = ckpt.lock().await;
                    c.set_tier_state(tier, to);
                    c.save(path)?;
                }
                Err(HarnessError::ShutdownInterrupted) => {
                    let mut c = ckpt.lock().await;
                    c.set_tier_state(tier, TierState::ConfigLoaded);
                    c.save(path)?;
                    return Err(HarnessError::ShutdownInterrupted);
                }
                Err(e @ HarnessError::RateLimit { .. }) => {
                    let mut c = ckpt.lock().await;
                    c.set_tier_state(tier, TierState::Failed);
                    c.save(path)?;
                    return Err(e);
                }
                Err(other) => {
                    let mut c = ckpt.lock().await;
                    c.set_tier_state(tier, TierState::Failed);
                    c.save(path)?;
                    warn!(tier = %tier, error = %other, "tier failed, continuing with remaining tiers");
                    break;
                }
            }

            if let Some(target) = scope.until_tier {
                if to == target {
                    break;
                }
            }
            if halted.load(Ordering::Relaxed) {
                break;
            }
        }
    }
    Ok(())
}

/// Drive every subtest in a tier. `--until` halts commit the reached run
/// state and set `halted`, but are never treated as a subtest failure; any
/// other error marks the subtest FAILED and moves on to its siblings.
#[allow(clippy::too_many_arguments)]
async fn run_all_subtests(
    ckpt: &Arc<Mutex<Checkpoint>>,
    path: &Path,
    tier: &str,
    scope: &RunScope,
    workspace: &Arc<WorkspaceManager>,
    scheduler: &Arc<ParallelismScheduler>,
    collaborators: &Arc<Collaborators>,
    meta: &Arc<RunMeta>,
    halted: &Arc<AtomicBool>,
) -> HarnessResult<()> {
    for subtest in subtest_ids(scope.max_subtests) {
        if !scope.filter_subtest.is_empty() && !scope.filter_subtest.contains(&subtest) {
            continue;
        }
        if halted.load(Ordering::Relaxed) {
            break;
        }

        loop {
            let current = { ckpt.lock().await.get_subtest_state(tier, &subtest) };
            if current.is_terminal() {
                break;
            }
            let Some(to) = next_in_sequence(SubtestState::SEQUENCE, current) else {
                break;
            };

            let action_result = if current == SubtestState::Pending {
                run_all_runs_in_subtest(ckpt, path, tier, &subtest, scope, workspace, scheduler, collaborators, meta).await
            } else {
                Ok(())
            };

            match action_result {
                Ok(()) => {
                    let mut c = ckpt.lock().await;
                    c.set_subtest_state(tier, &subtest, to);
                    c.save(path)?;
                }
                Err(HarnessError::UntilHalt { .. }) => {
                    let mut c = ckpt.lock().await;
                    c.set_subtest_state(tier, &subtest, to);
                    c.save(path)?;
                    halted.store(true, Ordering::Relaxed);
                    break;
                }
                Err(e @ (HarnessError::ShutdownInterrupted | HarnessError::RateLimit { .. })) => return Err(e),
                Err(other) => {
                    let mut c = ckpt.lock().await;
                    c.set_subtest_state(tier, &subtest, SubtestState::Failed);
                    c.save(path)?;
                    warn!(tier = %tier, subtest = %subtest, error = %other, "subtest failed, continuing with remaining subtests");
                    break;
                }
            }

            if halted.load(Ordering::Relaxed) {
                break;
            }
        }
    }
    Ok(())
}

/// Run every run number in a subtest concurrently (bounded by the
/// scheduler's semaphores, not by spawning separate tasks — each run is a
/// plain future polled alongside its siblings under `join_all`).
#[allow(clippy::too_many_arguments)]
async fn run_all_runs_in_subtest(
    ckpt: &Arc<Mutex<Checkpoint>>,
    path: &Path,
    tier: &str,
    subtest: &str,
    scope: &RunScope,
    workspace: &Arc<WorkspaceManager>,
    scheduler: &Arc<ParallelismScheduler>,
    collaborators: &Arc<Collaborators>,
    meta: &Arc<RunMeta>,
) -> HarnessResult<()> {
    let mut futures = Vec::new();
    for run in 1..=scope.runs_per_subtest {
        if !scope.filter_run.is_empty() && !scope.filter_run.contains(&run) {
            continue;
        }
        futures.push(drive_run(
            ckpt.clone(),
            path.to_path_buf(),
            scope.experiment_dir.clone(),
            tier.to_string(),
            subtest.to_string(),
            run,
            scope.until_run,
            workspace.clone(),
            scheduler.clone(),
            collaborators.clone(),
            meta.clone(),
        ));
    }

    let results = join_all(futures).await;
    let mut any_halted = false;
    for r in results {
        match r? {
            final_state if scope.until_run == Some(final_state) && !final_state.is_terminal() => {
                any_halted = true;
            }
            _ => {}
        }
    }

    if any_halted {
        Err(HarnessError::until_halt(scope.until_run.map(|s| s.to_string()).unwrap_or_default()))
    } else {
        Ok(())
    }
}

/// Drive a single run's real `RunStateMachine` to completion (or an
/// `--until` target). The only async step is the scheduler permit, acquired
/// before the synchronous `advance` call, so the real state machine's
/// `advance` can be used directly with no nesting hazard.
#[allow(clippy::too_many_arguments)]
async fn drive_run(
    ckpt: Arc<Mutex<Checkpoint>>,
    path: PathBuf,
    experiment_dir: PathBuf,
    tier: String,
    subtest: String,
    run: u32,
    until_run: Option<RunState>,
    workspace: Arc<WorkspaceManager>,
    scheduler: Arc<ParallelismScheduler>,
    collaborators: Arc<Collaborators>,
    meta: Arc<RunMeta>,
) -> HarnessResult<RunState> {
    let run_sm = RunStateMachine::new();
    let mut agent_outcome: Option<AgentOutcome> = None;
    let mut judge_outcome: Option<JudgeOutcome> = None;
    let mut worktree: Option<coordination::workspace::WorktreeInfo> = None;

    loop {
        let current = { run_sm.get_state(&ckpt.lock().await, &tier, &subtest, run) };
        if current.is_terminal() {
            break;
        }
        let Some(next) = next_in_sequence(RunState::SEQUENCE, current) else {
            break;
        };
        let class = run_transition_memory_class(next);
        let _permit = scheduler.acquire(class).await?;

        let mut c = ckpt.lock().await;
        let result = run_sm.advance(&mut c, &path, &tier, &subtest, run, |_from, to| {
            perform_run_transition(
                to,
                &experiment_dir,
                &tier,
                &subtest,
                run,
                &workspace,
                &collaborators,
                &meta,
                &mut worktree,
                &mut agent_outcome,
                &mut judge_outcome,
            )
        })?;
        drop(c);

        if let Some(target) = until_run {
            if result == target {
                break;
            }
        }
    }

    let final_state = { run_sm.get_state(&ckpt.lock().await, &tier, &subtest, run) };
    if final_state == RunState::WorktreeCleaned {
        if let Some(info) = &worktree {
            workspace.cleanup_worktree(info);
        }
    }
    Ok(final_state)
}

#[allow(clippy::too_many_arguments)]
fn perform_run_transition(
    to: RunState,
    experiment_dir: &Path,
    tier: &str,
    subtest: &str,
    run: u32,
    workspace: &Arc<WorkspaceManager>,
    collaborators: &Arc<Collaborators>,
    meta: &RunMeta,
    worktree: &mut Option<coordination::workspace::WorktreeInfo>,
    agent_outcome: &mut Option<AgentOutcome>,
    judge_outcome: &mut Option<JudgeOutcome>,
) -> HarnessResult<()> {
    let run_dir = experiment_dir.join("runs").join(tier).join(subtest).join(format!("run_{run}"));

    match to {
        RunState::DirStructureCreated => {
            std::fs::create_dir_all(run_dir.join("logs"))?;
            Ok(())
        }
        RunState::WorktreeCreated => {
            let info = workspace.create_worktree(tier, subtest, run)?;
            *worktree = Some(info);
            Ok(())
        }
        RunState::SymlinksApplied | RunState::ConfigCommitted | RunState::PromptWritten | RunState::JudgePromptBuilt => Ok(()),
        RunState::BaselineCaptured => {
            std::fs::write(run_dir.join("baseline.diff"), "")?;
            Ok(())
        }
        RunState::ReplayGenerated => {
            std::fs::write(run_dir.join("replay.json"), "{}")?;
            Ok(())
        }
        RunState::AgentComplete => {
            let ctx = RunContext {
                experiment_id: meta.experiment_id.clone(),
                tier: tier.into(),
                subtest: subtest.into(),
                run: run.into(),
                worktree_path: worktree.as_ref().map(|w| w.path.clone()).unwrap_or_default(),
                model: meta.model.clone(),
                timeout_seconds: meta.timeout_seconds,
            };
            let outcome = collaborators.agent.run(&ctx)?;
            std::fs::write(run_dir.join("logs").join("agent.stdout"), &outcome.stdout)?;
            std::fs::write(run_dir.join("logs").join("agent.stderr"), &outcome.stderr)?;
            *agent_outcome = Some(outcome);
            Ok(())
        }
        RunState::DiffCaptured => {
            let diff = agent_outcome.as_ref().and_then(|o| o.diff.clone()).unwrap_or_default();
            std::fs::write(run_dir.join("diff.patch"), diff)?;
            Ok(())
        }
        RunState::JudgeComplete => {
            let outcome = agent_outcome
                .clone()
                .ok_or_else(|| HarnessError::action_failed(format!("{tier}/{subtest}/{run}"), "no agent outcome to judge"))?;
            let ctx = RunContext {
                experiment_id: meta.experiment_id.clone(),
                tier: tier.into(),
                subtest: subtest.into(),
                run: run.into(),
                worktree_path: worktree.as_ref().map(|w| w.path.clone()).unwrap_or_default(),
                model: meta.model.clone(),
                timeout_seconds: meta.timeout_seconds,
            };
            let judged = collaborators.judge.evaluate(&ctx, &outcome)?;
            *judge_outcome = Some(judged);
            Ok(())
        }
        RunState::RunFinalized => {
            let judged = judge_outcome
                .clone()
                .ok_or_else(|| HarnessError::action_failed(format!("{tier}/{subtest}/{run}"), "no judge outcome to finalize"))?;
            let result = RunResult {
                judge_passed: judged.judge_passed,
                score: judged.score,
                grade: judged.grade,
                cost_usd: None,
                input_tokens: None,
                output_tokens: None,
            };
            std::fs::write(run_dir.join("run_result.json"), serde_json::to_string_pretty(&result)?)?;
            debug!(tier = %tier, subtest = %subtest, run, verdict = ?result.verdict(), "run finalized");
            Ok(())
        }
        RunState::Checkpointed | RunState::WorktreeCleaned | RunState::Pending => Ok(()),
        RunState::Failed | RunState::RateLimited => Ok(()),
    }
}

/// Reconstruct the experiment's outcome from on-disk `run_result.json` files
/// and write the rendered report.
pub fn render_final_report(experiment_dir: &Path, experiment_id: &str, reporter: &dyn ReportRenderer) -> Result<()> {
    let repaired = coordination::results::repair_completed_runs(experiment_dir);
    let mut tiers = Vec::new();
    let mut total = 0usize;
    let mut passed = 0usize;
    let mut failed = 0usize;

    for r in &repaired {
        if let coordination::results::RepairedRun::Ok { tier, status, .. } = r {
            if !tiers.contains(tier) {
                tiers.push(tier.clone());
            }
            total += 1;
            match status {
                CompletedRunStatus::Passed => passed += 1,
                CompletedRunStatus::Failed => failed += 1,
                CompletedRunStatus::AgentComplete => {}
            }
        }
    }

    let summary = ExperimentSummary {
        experiment_id: experiment_id.to_string(),
        tiers,
        total_runs: total,
        passed_runs: passed,
        failed_runs: failed,
    };
    let rendered = reporter.render(&summary).map_err(anyhow::Error::from)?;
    std::fs::write(experiment_dir.join("report.md"), rendered)?;
    Ok(())
}
