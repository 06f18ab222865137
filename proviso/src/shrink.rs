//! Shrinking functionality for minimizing failing test cases.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::arbitrary::Value;
use crate::config::TestConfig;
use crate::error::{FailureKind, PropertyError};

/// Result of a shrinking operation
#[derive(Debug, Clone)]
pub struct ShrinkResult<T> {
    /// Minimal value that still fails
    pub minimal: T,
    /// Error reported by the minimal value, if any candidate was adopted
    pub error: Option<PropertyError>,
    /// Index of the adopted candidate at each step
    pub path: Vec<usize>,
    /// Number of candidates adopted
    pub shrink_steps: usize,
    /// Number of candidates evaluated
    pub attempts: usize,
    /// Time spent shrinking
    pub shrink_duration: Duration,
    /// Whether a local minimum was reached before the budget ran out
    pub completed: bool,
}

impl<T> ShrinkResult<T> {
    /// Whether at least one candidate was adopted
    pub fn shrunk(&self) -> bool {
        self.shrink_steps > 0
    }
}

/// Configuration for shrinking behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkConfig {
    /// Maximum number of candidates evaluated
    pub max_iterations: usize,
    /// Timeout for shrinking process
    pub timeout: Duration,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            timeout: Duration::from_secs(10),
        }
    }
}

impl ShrinkConfig {
    pub fn new(max_iterations: usize, timeout: Duration) -> Self {
        Self {
            max_iterations,
            timeout,
        }
    }

    /// Create a shrink configuration with custom max iterations
    pub fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Default::default()
        }
    }
}

impl From<&TestConfig> for ShrinkConfig {
    fn from(config: &TestConfig) -> Self {
        Self::new(config.max_shrink_iterations, config.shrink_timeout)
    }
}

/// Only a failure of the same kind as the original one is adopted; candidates that pass,
/// get discarded, time out or crash their worker do not reproduce it.
fn still_fails(outcome: &Result<(), PropertyError>) -> bool {
    matches!(outcome, Err(error) if error.kind() == FailureKind::Predicate)
}

/// Bookkeeping shared by the sync and async search loops
struct Search {
    start: Instant,
    config: ShrinkConfig,
    path: Vec<usize>,
    steps: usize,
    attempts: usize,
    error: Option<PropertyError>,
}

impl Search {
    fn new(config: ShrinkConfig) -> Self {
        Self {
            start: Instant::now(),
            config,
            path: Vec::new(),
            steps: 0,
            attempts: 0,
            error: None,
        }
    }

    /// Count one more evaluation, or refuse when the budget is spent
    fn try_attempt(&mut self) -> bool {
        if self.attempts >= self.config.max_iterations {
            warn!(
                attempts = self.attempts,
                "shrinking stopped: candidate budget exhausted"
            );
            return false;
        }
        if self.start.elapsed() >= self.config.timeout {
            warn!(
                elapsed = ?self.start.elapsed(),
                "shrinking stopped: timeout reached"
            );
            return false;
        }
        self.attempts += 1;
        true
    }

    fn adopt(&mut self, index: usize, error: PropertyError) {
        self.path.push(index);
        self.steps += 1;
        self.error = Some(error);
        debug!(step = self.steps, index, "adopted shrink candidate");
    }

    fn finish<T>(self, minimal: T, completed: bool) -> ShrinkResult<T> {
        debug!(
            steps = self.steps,
            attempts = self.attempts,
            completed,
            "shrinking finished"
        );
        ShrinkResult {
            minimal,
            error: self.error,
            path: self.path,
            shrink_steps: self.steps,
            attempts: self.attempts,
            shrink_duration: self.start.elapsed(),
            completed,
        }
    }
}

/// Shrinking engine that coordinates the shrinking process
///
/// Starting from a failing value, it evaluates the candidates of the current best in
/// emission order and adopts the first one that still fails, until a step adopts
/// nothing or the budget is spent.
#[derive(Debug, Clone, Default)]
pub struct ShrinkEngine {
    config: ShrinkConfig,
}

impl ShrinkEngine {
    /// Create a new shrinking engine with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new shrinking engine with custom configuration
    pub fn with_config(config: ShrinkConfig) -> Self {
        Self { config }
    }

    /// Shrink a failing value
    ///
    /// `predicate` receives each candidate together with its path from `value` (the index
    /// of the adopted candidate at each previous step, then the candidate's own index).
    pub fn shrink<T, F>(&self, value: Value<T>, mut predicate: F) -> ShrinkResult<Value<T>>
    where
        T: 'static,
        F: FnMut(&Value<T>, &[usize]) -> Result<(), PropertyError>,
    {
        let mut search = Search::new(self.config);
        let mut current = value;

        loop {
            let mut adopted = None;
            for (index, candidate) in current.shrink().enumerate() {
                if !search.try_attempt() {
                    return search.finish(current, false);
                }
                search.path.push(index);
                let outcome = predicate(&candidate, &search.path);
                search.path.pop();
                if still_fails(&outcome) {
                    if let Err(error) = outcome {
                        adopted = Some((index, candidate, error));
                    }
                    break;
                }
            }

            match adopted {
                Some((index, candidate, error)) => {
                    search.adopt(index, error);
                    current = candidate;
                }
                None => return search.finish(current, true),
            }
        }
    }

    /// Shrink a failing value against an async predicate
    pub async fn shrink_async<T, F, Fut>(
        &self,
        value: Value<T>,
        mut predicate: F,
    ) -> ShrinkResult<Value<T>>
    where
        T: Clone + 'static,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<(), PropertyError>>,
    {
        let mut search = Search::new(self.config);
        let mut current = value;

        loop {
            let mut adopted = None;
            for (index, candidate) in current.shrink().enumerate() {
                if !search.try_attempt() {
                    return search.finish(current, false);
                }
                let outcome = predicate(candidate.value().clone()).await;
                if still_fails(&outcome) {
                    if let Err(error) = outcome {
                        adopted = Some((index, candidate, error));
                    }
                    break;
                }
            }

            match adopted {
                Some((index, candidate, error)) => {
                    search.adopt(index, error);
                    current = candidate;
                }
                None => return search.finish(current, true),
            }
        }
    }
}
