//! Search limits.

use std::time::{Duration, Instant};

/// A wall-time / solution / branch limit.
///
/// Three independent instances bound a solve: the global limit, the
/// local-search limit and the LNS sub-search limit.
#[derive(Debug, Clone)]
pub struct SearchLimit {
    started: Instant,
    time_limit: Option<Duration>,
    solution_limit: u64,
    branch_limit: u64,
    solutions: u64,
    branches: u64,
}

impl SearchLimit {
    /// Creates a limit; `u64::MAX` milliseconds means unlimited time.
    pub fn new(time_limit_ms: u64, solution_limit: u64, branch_limit: u64) -> Self {
        Self {
            started: Instant::now(),
            time_limit: (time_limit_ms != u64::MAX)
                .then(|| Duration::from_millis(time_limit_ms)),
            solution_limit,
            branch_limit,
            solutions: 0,
            branches: 0,
        }
    }

    /// A pure wall-time limit.
    pub fn time_only(time_limit_ms: u64) -> Self {
        Self::new(time_limit_ms, u64::MAX, u64::MAX)
    }

    /// Restarts the clock and counters.
    pub fn restart(&mut self) {
        self.started = Instant::now();
        self.solutions = 0;
        self.branches = 0;
    }

    /// Records a collected solution.
    pub fn record_solution(&mut self) {
        self.solutions += 1;
    }

    /// Records one explored branch (an attempted move).
    pub fn record_branch(&mut self) {
        self.branches += 1;
    }

    /// Returns `true` once any of the bounds is crossed.
    pub fn check(&self) -> bool {
        if let Some(limit) = self.time_limit {
            if self.started.elapsed() >= limit {
                return true;
            }
        }
        self.solutions >= self.solution_limit || self.branches >= self.branch_limit
    }

    /// Returns `true` if the wall-time bound specifically was crossed.
    pub fn time_exhausted(&self) -> bool {
        self.time_limit
            .is_some_and(|limit| self.started.elapsed() >= limit)
    }

    /// Number of recorded solutions.
    pub fn solutions(&self) -> u64 {
        self.solutions
    }
}
