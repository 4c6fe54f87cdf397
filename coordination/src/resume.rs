//! Resume manager: the four independently testable concerns of resuming an
//! existing checkpoint, rather than one opaque `resume()` entry point.

use crate::checkpoint::{Checkpoint, CheckpointStatus};
use crate::config::ExperimentConfig;
use crate::error::HarnessResult;
use crate::health::is_zombie;
use crate::states::{ExperimentState, SubtestState, TierState};
use std::time::Duration;

pub struct ResumeManager {
    pub zombie_timeout: Duration,
}

impl Default for ResumeManager {
    fn default() -> Self {
        Self {
            zombie_timeout: Duration::from_secs(120),
        }
    }
}

impl ResumeManager {
    pub fn new(zombie_timeout: Duration) -> Self {
        Self { zombie_timeout }
    }

    /// A checkpoint with `status=running`, whose PID is dead/unreadable, and
    /// whose heartbeat is older than the zombie timeout, is a zombie. Reset
    /// to `interrupted`, preserving all run state.
    pub fn handle_zombie(&self, ckpt: &mut Checkpoint) -> bool {
        if ckpt.status != CheckpointStatus::Running {
            return false;
        }
        if is_zombie(ckpt, self.zombie_timeout) {
            ckpt.status = CheckpointStatus::Interrupted;
            true
        } else {
            false
        }
    }

    /// After loading the checkpoint, ephemeral CLI flags override whatever
    /// was saved. Non-ephemeral config drift is caught separately via
    /// `config_hash` comparison (the caller refuses to resume on mismatch).
    pub fn restore_cli_args(&self, cfg: &mut ExperimentConfig, cli_overrides: &crate::config::EphemeralOverrides) {
        if cli_overrides.parallel_subtests.is_some() {
            cfg.ephemeral.parallel_subtests = cli_overrides.parallel_subtests;
        }
        if cli_overrides.max_subtests.is_some() {
            cfg.ephemeral.max_subtests = cli_overrides.max_subtests;
        }
        if cli_overrides.until_run_state.is_some() {
            cfg.ephemeral.until_run_state = cli_overrides.until_run_state.clone();
        }
        if cli_overrides.until_tier_state.is_some() {
            cfg.ephemeral.until_tier_state = cli_overrides.until_tier_state.clone();
        }
        if cli_overrides.until_experiment_state.is_some() {
            cfg.ephemeral.until_experiment_state = cli_overrides.until_experiment_state.clone();
        }
        if cli_overrides.tiers_to_run.is_some() {
            cfg.ephemeral.tiers_to_run = cli_overrides.tiers_to_run.clone();
        }
    }

    /// Verify the resumed config still hashes identically (ephemeral fields
    /// excluded). A mismatch means a persistent field changed and resume
    /// must be refused.
    pub fn check_config_hash(&self, ckpt: &Checkpoint, cfg: &ExperimentConfig) -> HarnessResult<()> {
        let computed = Checkpoint::compute_config_hash(cfg);
        if computed != ckpt.config_hash {
            return Err(crate::error::HarnessError::config_mismatch(ckpt.config_hash.clone(), computed));
        }
        Ok(())
    }

    /// If `experiment_state` is FAILED or INTERRUPTED, rewind it to
    /// TIERS_RUNNING; any FAILED tier or subtest goes back to PENDING. Run
    /// states are left untouched.
    pub fn reset_failed_states(&self, ckpt: &mut Checkpoint) {
        if matches!(ckpt.experiment_state, ExperimentState::Failed | ExperimentState::Interrupted) {
            ckpt.experiment_state = ExperimentState::TiersRunning;
        }

        let failed_tiers: Vec<String> = ckpt
            .tier_states
            .iter()
            .filter(|(_, s)| **s == TierState::Failed)
            .map(|(t, _)| t.clone())
            .collect();
        for tier in failed_tiers {
            ckpt.tier_states.insert(tier, TierState::Pending);
        }

        let failed_subtests: Vec<(String, String)> = ckpt
            .subtest_states
            .iter()
            .flat_map(|(tier, subtests)| {
                subtests
                    .iter()
                    .filter(|(_, s)| **s == SubtestState::Failed)
                    .map(|(s, _)| (tier.clone(), s.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (tier, subtest) in failed_subtests {
            if let Some(m) = ckpt.subtest_states.get_mut(&tier) {
                m.insert(subtest, SubtestState::Pending);
            }
        }
    }

    /// Merge newly requested tiers into scope without disturbing completed
    /// work. If a requested tier has any non-terminal run, the experiment
    /// and that tier are pushed back into the running states, and any
    /// `AGGREGATED`/`RUNS_COMPLETE` subtest with incomplete runs goes back
    /// to `RUNS_IN_PROGRESS`. Fully completed subtests are left alone.
    pub fn merge_cli_tiers_and_reset_incomplete(&self, ckpt: &mut Checkpoint, requested_tiers: &[String]) {
        let mut any_incomplete = false;

        for tier in requested_tiers {
            let subtests: Vec<String> = ckpt
                .run_states
                .get(tier)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();

            let mut tier_incomplete = false;

            for subtest in &subtests {
                let runs: Vec<u32> = ckpt
                    .run_states
                    .get(tier)
                    .and_then(|m| m.get(subtest))
                    .map(|m| m.keys().copied().collect())
                    .unwrap_or_default();

                let has_incomplete = runs.iter().any(|r| !ckpt.get_run_state(tier, subtest, *r).is_terminal());

                if has_incomplete {
                    tier_incomplete = true;
                    let current = ckpt.get_subtest_state(tier, subtest);
                    if matches!(current, SubtestState::Aggregated | SubtestState::RunsComplete) {
                        ckpt.set_subtest_state(tier, subtest, SubtestState::RunsInProgress);
                    }
                }
            }

            if tier_incomplete {
                any_incomplete = true;
                ckpt.set_tier_state(tier, TierState::SubtestsRunning);
            }
        }

        if any_incomplete {
            ckpt.experiment_state = ExperimentState::TiersRunning;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::RunState;
    use chrono::{Duration as ChronoDuration, Utc};

    fn sample() -> Checkpoint {
        Checkpoint::new("test-017", "/tmp/exp", "abc123abc123abc1")
    }

    #[test]
    fn zombie_reset_scenario() {
        let mut ckpt = sample();
        ckpt.status = CheckpointStatus::Running;
        ckpt.pid = Some(999_999);
        ckpt.last_heartbeat = Utc::now() - ChronoDuration::seconds(300);

        let rm = ResumeManager::new(Duration::from_secs(120));
        let was_zombie = rm.handle_zombie(&mut ckpt);
        assert!(was_zombie);
        assert_eq!(ckpt.status, CheckpointStatus::Interrupted);
    }

    #[test]
    fn fresh_heartbeat_is_not_zombie() {
        let mut ckpt = sample();
        ckpt.status = CheckpointStatus::Running;
        ckpt.pid = Some(999_999);
        ckpt.last_heartbeat = Utc::now();

        let rm = ResumeManager::new(Duration::from_secs(120));
        assert!(!rm.handle_zombie(&mut ckpt));
        assert_eq!(ckpt.status, CheckpointStatus::Running);
    }

    #[test]
    fn reset_failed_states_scenario() {
        let mut ckpt = sample();
        ckpt.experiment_state = ExperimentState::Failed;
        ckpt.set_tier_state("T0", TierState::Failed);
        ckpt.set_subtest_state("T0", "00", SubtestState::Failed);

        let rm = ResumeManager::default();
        rm.reset_failed_states(&mut ckpt);

        assert_eq!(ckpt.experiment_state, ExperimentState::TiersRunning);
        assert_eq!(ckpt.get_tier_state("T0"), TierState::Pending);
        assert_eq!(ckpt.get_subtest_state("T0", "00"), SubtestState::Pending);
    }

    #[test]
    fn additive_tier_expansion_leaves_completed_subtests_alone() {
        let mut ckpt = sample();
        ckpt.set_run_state("T0", "00", 1, RunState::WorktreeCleaned);
        ckpt.set_subtest_state("T0", "00", SubtestState::Aggregated);
        ckpt.set_tier_state("T0", TierState::Complete);

        ckpt.set_run_state("T1", "00", 1, RunState::ReplayGenerated);

        let rm = ResumeManager::default();
        rm.merge_cli_tiers_and_reset_incomplete(&mut ckpt, &["T0".to_string(), "T1".to_string()]);

        assert_eq!(ckpt.get_subtest_state("T0", "00"), SubtestState::Aggregated);
        assert_eq!(ckpt.get_tier_state("T0"), TierState::Complete);
        assert_eq!(ckpt.get_tier_state("T1"), TierState::SubtestsRunning);
        assert_eq!(ckpt.experiment_state, ExperimentState::TiersRunning);
    }
}
