//! Run-level state machine: PENDING ... WORKTREE_CLEANED.
//!
//! Exception handling: a generic action failure marks the run FAILED; a
//! `ShutdownInterrupted` leaves the run at its pre-action state (so the next
//! invocation retries the same transition); a `RateLimitError` marks the run
//! RATE_LIMITED. All three re-raise after recording state.

use super::TransitionRegistry;
use crate::checkpoint::Checkpoint;
use crate::error::{HarnessError, HarnessResult};
use crate::states::RunState;
use std::path::Path;

pub struct RunStateMachine {
    registry: TransitionRegistry<RunState>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            registry: TransitionRegistry::from_sequence(RunState::SEQUENCE),
        }
    }

    pub fn get_state(&self, ckpt: &Checkpoint, tier: &str, subtest: &str, run: u32) -> RunState {
        ckpt.get_run_state(tier, subtest, run)
    }

    pub fn is_complete(&self, ckpt: &Checkpoint, tier: &str, subtest: &str, run: u32) -> bool {
        self.get_state(ckpt, tier, subtest, run).is_terminal()
    }

    /// Advance one transition. `action` receives `(from, to)` and performs
    /// the work of getting there (worktree creation, agent invocation, ...);
    /// it is called before the checkpoint is mutated.
    pub fn advance<F>(
        &self,
        ckpt: &mut Checkpoint,
        path: &Path,
        tier: &str,
        subtest: &str,
        run: u32,
        action: F,
    ) -> HarnessResult<RunState>
    where
        F: FnOnce(RunState, RunState) -> HarnessResult<()>,
    {
        let current = self.get_state(ckpt, tier, subtest, run);
        if current.is_terminal() {
            return Err(HarnessError::terminal_state(current.to_string()));
        }
        let to = self
            .registry
            .next(&current)
            .map(|t| t.to)
            .ok_or_else(|| HarnessError::no_transition(current.to_string()))?;

        if let Err(e) = action(current, to) {
            return match e {
                HarnessError::ShutdownInterrupted => Err(e),
                HarnessError::RateLimit { .. } => {
                    ckpt.set_run_state(tier, subtest, run, RunState::RateLimited);
                    ckpt.save(path)?;
                    Err(e)
                }
                other => {
                    ckpt.set_run_state(tier, subtest, run, RunState::Failed);
                    ckpt.save(path)?;
                    Err(other)
                }
            };
        }

        ckpt.set_run_state(tier, subtest, run, to);
        ckpt.save(path)?;
        Ok(to)
    }

    /// Drive transitions until terminal, or (inclusively) until `until_state`
    /// has just been entered.
    pub fn advance_to_completion<F>(
        &self,
        ckpt: &mut Checkpoint,
        path: &Path,
        tier: &str,
        subtest: &str,
        run: u32,
        until_state: Option<RunState>,
        mut action: F,
    ) -> HarnessResult<RunState>
    where
        F: FnMut(RunState, RunState) -> HarnessResult<()>,
    {
        loop {
            if self.is_complete(ckpt, tier, subtest, run) {
                break;
            }
            let new_state = self.advance(ckpt, path, tier, subtest, run, |from, to| action(from, to))?;
            if let Some(target) = until_state {
                if new_state == target {
                    break;
                }
            }
        }
        Ok(self.get_state(ckpt, tier, subtest, run))
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
    fn advance_moves_one_step_and_saves() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = RunStateMachine::new();
        let to = sm.advance(&mut ckpt, &path, "T0", "00", 1, |_from, _to| Ok(())).unwrap();
        assert_eq!(to, RunState::DirStructureCreated);
        let reloaded = Checkpoint::load(&path).unwrap();
        assert_eq!(reloaded.get_run_state("T0", "00", 1), RunState::DirStructureCreated);
    }

    #[test]
    fn generic_failure_marks_failed() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = RunStateMachine::new();
        let err = sm
            .advance(&mut ckpt, &path, "T0", "00", 1, |_, _| Err(HarnessError::action_failed("T0/00/1", "boom")))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ActionFailed { .. }));
        assert_eq!(ckpt.get_run_state("T0", "00", 1), RunState::Failed);
    }

    #[test]
    fn shutdown_leaves_state_untouched() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = RunStateMachine::new();
        let err = sm
            .advance(&mut ckpt, &path, "T0", "00", 1, |_, _| Err(HarnessError::ShutdownInterrupted))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ShutdownInterrupted));
        assert_eq!(ckpt.get_run_state("T0", "00", 1), RunState::Pending);
    }

    #[test]
    fn rate_limit_marks_rate_limited() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = RunStateMachine::new();
        let err = sm
            .advance(&mut ckpt, &path, "T0", "00", 1, |_, _| Err(HarnessError::rate_limit("agent", 60)))
            .unwrap_err();
        assert!(matches!(err, HarnessError::RateLimit { .. }));
        assert_eq!(ckpt.get_run_state("T0", "00", 1), RunState::RateLimited);
    }

    #[test]
    fn terminal_state_refuses_advance() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        ckpt.set_run_state("T0", "00", 1, RunState::WorktreeCleaned);
        let sm = RunStateMachine::new();
        let err = sm.advance(&mut ckpt, &path, "T0", "00", 1, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, HarnessError::TerminalState { .. }));
    }

    #[test]
    fn advance_to_completion_stops_inclusive_at_until_state() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = RunStateMachine::new();
        let final_state = sm
            .advance_to_completion(&mut ckpt, &path, "T0", "00", 1, Some(RunState::AgentComplete), |_, _| Ok(()))
            .unwrap();
        assert_eq!(final_state, RunState::AgentComplete);
        assert!(!final_state.is_terminal());
    }

    #[test]
    fn advance_to_completion_without_until_reaches_terminal() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = RunStateMachine::new();
        let final_state = sm
            .advance_to_completion(&mut ckpt, &path, "T0", "00", 1, None, |_, _| Ok(()))
            .unwrap();
        assert_eq!(final_state, RunState::WorktreeCleaned);
    }
}
