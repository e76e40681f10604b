//! Search configuration for the planner.

use std::time::Duration;

/// Limits for one search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum number of states taken off the queue before giving up.
    pub max_states: usize,

    /// Maximum number of paths to return.
    pub max_results: usize,

    /// Maximum number of vehicles boarded on one path.
    pub max_boardings: u32,

    /// Wall-clock budget for one search (milliseconds).
    pub timeout_ms: u64,
}

impl SearchConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(max_states: usize, max_results: usize, max_boardings: u32, timeout_ms: u64) -> Self {
        Self {
            max_states,
            max_results,
            max_boardings,
            timeout_ms,
        }
    }

    pub fn with_max_states(mut self, max_states: usize) -> Self {
        self.max_states = max_states;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_max_boardings(mut self, max_boardings: u32) -> Self {
        self.max_boardings = max_boardings;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Returns the timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_states: 200_000,
            max_results: 3,
            max_boardings: 6,
            timeout_ms: 5_000,
        }
    }
}
