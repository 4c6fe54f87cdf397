//! Experiment-level state machine: INITIALIZING ... COMPLETE.
//!
//! Both `ShutdownInterrupted` and `RateLimitError` mark the experiment
//! INTERRUPTED (rather than FAILED) since both are expected to be resumable
//! conditions, not defects; only a generic action failure marks FAILED.

use super::TransitionRegistry;
use crate::checkpoint::Checkpoint;
use crate::error::{HarnessError, HarnessResult};
use crate::states::ExperimentState;
use std::path::Path;

pub struct ExperimentStateMachine {
    registry: TransitionRegistry<ExperimentState>,
}

impl Default for ExperimentStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentStateMachine {
    pub fn new() -> Self {
        Self {
            registry: TransitionRegistry::from_sequence(ExperimentState::SEQUENCE),
        }
    }

    pub fn get_state(&self, ckpt: &Checkpoint) -> ExperimentState {
        ckpt.experiment_state
    }

    pub fn is_complete(&self, ckpt: &Checkpoint) -> bool {
        self.get_state(ckpt).is_terminal()
    }

    pub fn advance<F>(&self, ckpt: &mut Checkpoint, path: &Path, action: F) -> HarnessResult<ExperimentState>
    where
        F: FnOnce(ExperimentState, ExperimentState) -> HarnessResult<()>,
    {
        let current = self.get_state(ckpt);
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
                HarnessError::ShutdownInterrupted | HarnessError::RateLimit { .. } => {
                    ckpt.experiment_state = ExperimentState::Interrupted;
                    ckpt.save(path)?;
                    Err(e)
                }
                other => {
                    ckpt.experiment_state = ExperimentState::Failed;
                    ckpt.save(path)?;
                    Err(other)
                }
            };
        }

        ckpt.experiment_state = to;
        ckpt.save(path)?;
        Ok(to)
    }

    pub fn advance_to_completion<F>(
        &self,
        ckpt: &mut Checkpoint,
        path: &Path,
        until_state: Option<ExperimentState>,
        mut action: F,
    ) -> HarnessResult<ExperimentState>
    where
        F: FnMut(ExperimentState, ExperimentState) -> HarnessResult<()>,
    {
        loop {
            if self.is_complete(ckpt) {
                break;
            }
            let new_state = self.advance(ckpt, path, |from, to| action(from, to))?;
            if let Some(target) = until_state {
                if new_state == target {
                    break;
                }
            }
        }
        Ok(self.get_state(ckpt))
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
    fn shutdown_marks_interrupted() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = ExperimentStateMachine::new();
        let err = sm.advance(&mut ckpt, &path, |_, _| Err(HarnessError::ShutdownInterrupted)).unwrap_err();
        assert!(matches!(err, HarnessError::ShutdownInterrupted));
        assert_eq!(ckpt.experiment_state, ExperimentState::Interrupted);
    }

    #[test]
    fn until_not_failed_scenario() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = ExperimentStateMachine::new();
        let final_state = sm
            .advance_to_completion(&mut ckpt, &path, Some(ExperimentState::TiersRunning), |_, _| Ok(()))
            .unwrap();
        assert_eq!(final_state, ExperimentState::TiersRunning);
        assert_ne!(final_state, ExperimentState::Failed);
    }
}
