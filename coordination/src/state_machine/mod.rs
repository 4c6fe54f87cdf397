//! The four nested state machines, sharing one transition-registry pattern:
//! an ordered list of `{from, to}` pairs with an O(1) from-state lookup.
//!
//! Each level's `advance()` implements its own row of the exception-handling
//! table (§4.2 in the design notes this crate was built from) — what happens
//! to the recorded state when the action raises a shutdown, rate-limit, or
//! generic error differs per level, so the four are hand-written rather than
//! forced through one shared `advance()`.

pub mod experiment;
pub mod run;
pub mod subtest;
pub mod tier;

pub use experiment::ExperimentStateMachine;
pub use run::RunStateMachine;
pub use subtest::SubtestStateMachine;
pub use tier::TierStateMachine;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Raised when a `--until` target is reached during a subtest's run batch.
/// Caught by `SubtestStateMachine::advance_to_completion`, which returns
/// normally instead of marking the subtest FAILED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntilHaltError {
    pub state: String,
}

impl UntilHaltError {
    pub fn new(state: impl Into<String>) -> Self {
        Self { state: state.into() }
    }
}

impl fmt::Display for UntilHaltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "until-state reached: {}", self.state)
    }
}

impl std::error::Error for UntilHaltError {}

impl From<UntilHaltError> for crate::error::HarnessError {
    fn from(e: UntilHaltError) -> Self {
        crate::error::HarnessError::until_halt(e.state)
    }
}

/// A single registered transition.
#[derive(Debug, Clone)]
pub struct Transition<S> {
    pub from: S,
    pub to: S,
}

/// Ordered transition list plus an O(1) from-state lookup map, built from a
/// state enum's forward sequence (each consecutive pair is one transition).
/// Terminal states have no entry, matching the contract that advancing past
/// a terminal state fails with `NoTransition`.
pub struct TransitionRegistry<S> {
    transitions: Vec<Transition<S>>,
    by_from: HashMap<S, usize>,
}

impl<S> TransitionRegistry<S>
where
    S: Copy + Eq + Hash,
{
    pub fn from_sequence(sequence: &[S]) -> Self {
        let mut transitions = Vec::with_capacity(sequence.len().saturating_sub(1));
        let mut by_from = HashMap::new();
        for pair in sequence.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            by_from.insert(from, transitions.len());
            transitions.push(Transition { from, to });
        }
        Self { transitions, by_from }
    }

    pub fn next(&self, from: &S) -> Option<&Transition<S>> {
        self.by_from.get(from).map(|idx| &self.transitions[*idx])
    }
}
