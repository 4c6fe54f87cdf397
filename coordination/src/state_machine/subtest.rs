//! Subtest-level state machine: PENDING -> RUNS_IN_PROGRESS -> RUNS_COMPLETE -> AGGREGATED.
//!
//! The PENDING action is typically "drive every run to completion"; when a
//! `--until` target is reached mid-batch, that action raises `UntilHaltError`
//! after the run machines have already saved their own states. The subtest
//! machine still performs and saves its own PENDING -> RUNS_IN_PROGRESS
//! transition (so the batch is resumable) before re-raising, and
//! `advance_to_completion` swallows the error without marking FAILED.
//!
//! `ShutdownInterrupted` and `RateLimitError` propagate unchanged at this
//! level — no subtest state is written; only a generic failure marks FAILED.

use super::TransitionRegistry;
use crate::checkpoint::Checkpoint;
use crate::error::{HarnessError, HarnessResult};
use crate::states::SubtestState;
use std::path::Path;

pub struct SubtestStateMachine {
    registry: TransitionRegistry<SubtestState>,
}

impl Default for SubtestStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SubtestStateMachine {
    pub fn new() -> Self {
        Self {
            registry: TransitionRegistry::from_sequence(SubtestState::SEQUENCE),
        }
    }

    pub fn get_state(&self, ckpt: &Checkpoint, tier: &str, subtest: &str) -> SubtestState {
        ckpt.get_subtest_state(tier, subtest)
    }

    pub fn is_complete(&self, ckpt: &Checkpoint, tier: &str, subtest: &str) -> bool {
        self.get_state(ckpt, tier, subtest).is_terminal()
    }

    pub fn advance<F>(
        &self,
        ckpt: &mut Checkpoint,
        path: &Path,
        tier: &str,
        subtest: &str,
        action: F,
    ) -> HarnessResult<SubtestState>
    where
        F: FnOnce(SubtestState, SubtestState) -> HarnessResult<()>,
    {
        let current = self.get_state(ckpt, tier, subtest);
        if current.is_terminal() {
            return Err(HarnessError::terminal_state(current.to_string()));
        }
        let to = self
            .registry
            .next(&current)
            .map(|t| t.to)
            .ok_or_else(|| HarnessError::no_transition(current.to_string()))?;

        match action(current, to) {
            Ok(()) => {
                ckpt.set_subtest_state(tier, subtest, to);
                ckpt.save(path)?;
                Ok(to)
            }
            Err(HarnessError::UntilHalt { state }) => {
                // The run batch stopped partway through: still commit this
                // transition so the batch resumes cleanly next invocation.
                ckpt.set_subtest_state(tier, subtest, to);
                ckpt.save(path)?;
                Err(HarnessError::UntilHalt { state })
            }
            Err(e @ HarnessError::ShutdownInterrupted) | Err(e @ HarnessError::RateLimit { .. }) => Err(e),
            Err(other) => {
                ckpt.set_subtest_state(tier, subtest, SubtestState::Failed);
                ckpt.save(path)?;
                Err(other)
            }
        }
    }

    pub fn advance_to_completion<F>(
        &self,
        ckpt: &mut Checkpoint,
        path: &Path,
        tier: &str,
        subtest: &str,
        until_state: Option<SubtestState>,
        mut action: F,
    ) -> HarnessResult<SubtestState>
    where
        F: FnMut(SubtestState, SubtestState) -> HarnessResult<()>,
    {
        loop {
            if self.is_complete(ckpt, tier, subtest) {
                break;
            }
            match self.advance(ckpt, path, tier, subtest, |from, to| action(from, to)) {
                Ok(new_state) => {
                    if let Some(target) = until_state {
                        if new_state == target {
                            break;
                        }
                    }
                }
                Err(HarnessError::UntilHalt { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(self.get_state(ckpt, tier, subtest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_ckpt_and_path() -> (Checkpoint, tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let ckpt = Checkpoint::new("test-017", dir.path(), "abc123abc123abc1");
        (ckpt, dir, path)
    }

    #[test]
    fn until_halt_commits_transition_and_is_swallowed() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = SubtestStateMachine::new();
        let final_state = sm
            .advance_to_completion(&mut ckpt, &path, "T0", "00", None, |from, _to| {
                if from == SubtestState::Pending {
                    Err(HarnessError::until_halt("agent_complete"))
                } else {
                    Ok(())
                }
            })
            .unwrap();
        assert_eq!(final_state, SubtestState::RunsInProgress);
        assert_ne!(final_state, SubtestState::Failed);
    }

    #[test]
    fn generic_failure_marks_failed() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = SubtestStateMachine::new();
        let err = sm
            .advance(&mut ckpt, &path, "T0", "00", |_, _| Err(HarnessError::action_failed("T0/00", "boom")))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ActionFailed { .. }));
        assert_eq!(ckpt.get_subtest_state("T0", "00"), SubtestState::Failed);
    }

    #[test]
    fn rate_limit_propagates_without_state_change() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = SubtestStateMachine::new();
        let err = sm
            .advance(&mut ckpt, &path, "T0", "00", |_, _| Err(HarnessError::rate_limit("agent", 30)))
            .unwrap_err();
        assert!(matches!(err, HarnessError::RateLimit { .. }));
        assert_eq!(ckpt.get_subtest_state("T0", "00"), SubtestState::Pending);
    }
}
