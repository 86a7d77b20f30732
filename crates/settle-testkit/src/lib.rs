//! Test fixtures for settle.
//!
//! Keeping these in a microcrate avoids copy-paste across the wait/retry tests.

pub mod proptest;

use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

/// Error raised by [`FailingCondition`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ConditionFailure(pub String);

/// Condition that replays a fixed script of results, then repeats the last one.
///
/// Counts its evaluations so tests can assert exactly how often a waiter
/// looked. Uses interior mutability so one instance can be shared by
/// reference (or `Arc`) between the closure and the assertions.
#[derive(Debug)]
pub struct ScriptedCondition {
    script: Vec<bool>,
    evaluations: AtomicU32,
}

impl ScriptedCondition {
    /// An empty script behaves like [`never`].
    pub fn new(script: impl Into<Vec<bool>>) -> Self {
        Self {
            script: script.into(),
            evaluations: AtomicU32::new(0),
        }
    }

    pub fn evaluate(&self) -> bool {
        let index = self.evaluations.fetch_add(1, Ordering::SeqCst) as usize;
        self.script
            .get(index)
            .or_else(|| self.script.last())
            .copied()
            .unwrap_or(false)
    }

    pub fn evaluations(&self) -> u32 {
        self.evaluations.load(Ordering::SeqCst)
    }

    /// 1-based index of the first `true` in the script, if any.
    pub fn first_success(&self) -> Option<u32> {
        self.script
            .iter()
            .position(|&done| done)
            .map(|index| index as u32 + 1)
    }
}

/// False for `k` evaluations, true from then on.
pub fn true_after(k: usize) -> ScriptedCondition {
    let mut script = vec![false; k];
    script.push(true);
    ScriptedCondition::new(script)
}

/// Never true.
pub fn never() -> ScriptedCondition {
    ScriptedCondition::new(vec![false])
}

/// Always true.
pub fn always() -> ScriptedCondition {
    ScriptedCondition::new(vec![true])
}

/// False for `k` evaluations, then raises [`ConditionFailure`] on every
/// later evaluation.
#[derive(Debug)]
pub struct FailingCondition {
    fail_after: u32,
    message: String,
    evaluations: AtomicU32,
}

pub fn failing_after(k: u32, message: impl Into<String>) -> FailingCondition {
    FailingCondition {
        fail_after: k,
        message: message.into(),
        evaluations: AtomicU32::new(0),
    }
}

impl FailingCondition {
    pub fn evaluate(&self) -> Result<bool, ConditionFailure> {
        let seen = self.evaluations.fetch_add(1, Ordering::SeqCst);
        if seen >= self.fail_after {
            Err(ConditionFailure(self.message.clone()))
        } else {
            Ok(false)
        }
    }

    pub fn evaluations(&self) -> u32 {
        self.evaluations.load(Ordering::SeqCst)
    }
}
