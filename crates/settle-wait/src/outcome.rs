use std::time::Duration;

/// Terminal result of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The condition held before the deadline (or on the last-chance evaluation).
    Satisfied { evaluations: u32, elapsed: Duration },
    /// The deadline passed with the condition still false.
    TimedOut { evaluations: u32, elapsed: Duration },
}

impl Outcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied { .. })
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// How many times the condition was evaluated.
    pub fn evaluations(&self) -> u32 {
        match self {
            Self::Satisfied { evaluations, .. } | Self::TimedOut { evaluations, .. } => {
                *evaluations
            }
        }
    }

    /// Time from the first evaluation to the last.
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Satisfied { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}

/// Outcome of polling a supplier, with the last value it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Polled<T> {
    pub outcome: Outcome,
    pub value: T,
}

impl<T> Polled<T> {
    pub fn is_satisfied(&self) -> bool {
        self.outcome.is_satisfied()
    }

    /// The matching value, or `None` if the wait timed out.
    pub fn satisfied_value(self) -> Option<T> {
        self.outcome.is_satisfied().then_some(self.value)
    }

    pub fn into_value(self) -> T {
        self.value
    }
}
