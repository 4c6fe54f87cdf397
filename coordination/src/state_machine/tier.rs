//! Tier-level state machine: PENDING ... COMPLETE.
//!
//! A `ShutdownInterrupted` rewinds the tier to CONFIG_LOADED (so the next
//! invocation re-enters the subtests loop cleanly) rather than leaving it at
//! its pre-action state; both generic failures and rate limits mark FAILED.

use super::TransitionRegistry;
use crate::checkpoint::Checkpoint;
use crate::error::{HarnessError, HarnessResult};
use crate::states::TierState;
use std::path::Path;

pub struct TierStateMachine {
    registry: TransitionRegistry<TierState>,
}

impl Default for TierStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TierStateMachine {
    pub fn new() -> Self {
        Self {
            registry: TransitionRegistry::from_sequence(TierState::SEQUENCE),
        }
    }

    pub fn get_state(&self, ckpt: &Checkpoint, tier: &str) -> TierState {
        ckpt.get_tier_state(tier)
    }

    pub fn is_complete(&self, ckpt: &Checkpoint, tier: &str) -> bool {
        self.get_state(ckpt, tier).is_terminal()
    }

    pub fn advance<F>(&self, ckpt: &mut Checkpoint, path: &Path, tier: &str, action: F) -> HarnessResult<TierState>
    where
        F: FnOnce(TierState, TierState) -> HarnessResult<()>,
    {
        let current = self.get_state(ckpt, tier);
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
                HarnessError::ShutdownInterrupted => {
                    ckpt.set_tier_state(tier, TierState::ConfigLoaded);
                    ckpt.save(path)?;
                    Err(e)
                }
                other => {
                    ckpt.set_tier_state(tier, TierState::Failed);
                    ckpt.save(path)?;
                    Err(other)
                }
            };
        }

        ckpt.set_tier_state(tier, to);
        ckpt.save(path)?;
        Ok(to)
    }

    pub fn advance_to_completion<F>(
        &self,
        ckpt: &mut Checkpoint,
        path: &Path,
        tier: &str,
        until_state: Option<TierState>,
        mut action: F,
    ) -> HarnessResult<TierState>
    where
        F: FnMut(TierState, TierState) -> HarnessResult<()>,
    {
        loop {
            if self.is_complete(ckpt, tier) {
                break;
            }
            let new_state = self.advance(ckpt, path, tier, |from, to| action(from, to))?;
            if let Some(target) = until_state {
                if new_state == target {
                    break;
                }
            }
        }
        Ok(self.get_state(ckpt, tier))
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
    fn shutdown_rewinds_to_config_loaded() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        ckpt.set_tier_state("T0", TierState::SubtestsRunning);
        let sm = TierStateMachine::new();
        let err = sm
            .advance(&mut ckpt, &path, "T0", |_, _| Err(HarnessError::ShutdownInterrupted))
            .unwrap_err();
        assert!(matches!(err, HarnessError::ShutdownInterrupted));
        assert_eq!(ckpt.get_tier_state("T0"), TierState::ConfigLoaded);
    }

    #[test]
    fn rate_limit_marks_failed_at_tier_level() {
        let (mut ckpt, _dir, path) = new_ckpt_and_path();
        let sm = TierStateMachine::new();
        let err = sm
            .advance(&mut ckpt, &path, "T0", |_, _| Err(HarnessError::rate_limit("judge", 10)))
            .unwrap_err();
        assert!(matches!(err, HarnessError::RateLimit { .. }));
        assert_eq!(ckpt.get_tier_state("T0"), TierState::Failed);
    }
}
