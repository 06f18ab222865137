//! Error types and result handling for property-based testing.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arbitrary::GenerationState;
use crate::config::TestConfig;
use crate::statistics::RunStatistics;
use crate::worker::{PredicateId, RunId};

/// Broad classification of a [`PropertyError`]
///
/// The runner decides what to do with an error purely from its kind: predicate
/// failures are shrunk, precondition failures are resampled, everything else ends
/// the property as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The predicate returned `false`, returned an error, or panicked
    Predicate,
    /// The predicate asked for its input to be discarded
    Precondition,
    /// An isolated run exceeded its allotted duration
    Timeout,
    /// The isolated worker terminated while the run was pending
    WorkerCrash,
    /// Anything else (replay failures, exhausted discard budget, internal errors)
    Other,
}

/// Comprehensive error type for property testing failures
///
/// Crosses the worker boundary tagged by `kind`, e.g.
/// `{"kind":"timeout","runId":3,"elapsed":{"secs":0,"nanos":50000000}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PropertyError {
    /// Property test failed with a specific message and optional context
    PropertyFailed {
        message: String,
        context: Option<String>,
        iteration: Option<usize>,
    },

    /// The input does not satisfy a precondition and must be resampled
    PreconditionFailed { reason: String },

    /// An isolated run did not answer within its timeout
    Timeout { run_id: RunId, elapsed: Duration },

    /// The worker executing an isolated run went away before answering
    WorkerCrash { run_id: RunId, reason: String },

    /// Too many inputs were discarded by preconditions
    DiscardLimitExceeded { discarded: usize },

    /// A generation descriptor could not be replayed into an input
    ReplayFailed { message: String },

    /// The test configuration was rejected before any run
    InvalidConfig { message: String },

    /// Internal error in the testing framework
    InternalError {
        message: String,
        source_message: Option<String>,
    },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyError::PropertyFailed {
                message,
                context,
                iteration,
            } => {
                write!(f, "Property failed: {}", message)?;
                if let Some(ctx) = context {
                    write!(f, " (context: {})", ctx)?;
                }
                if let Some(iter) = iteration {
                    write!(f, " (iteration: {})", iter)?;
                }
                Ok(())
            }
            PropertyError::PreconditionFailed { reason } => {
                write!(f, "Precondition failed: {}", reason)
            }
            PropertyError::Timeout { run_id, elapsed } => {
                write!(f, "Run {} timed out after {:?}", run_id, elapsed)
            }
            PropertyError::WorkerCrash { run_id, reason } => {
                write!(f, "Worker crashed during run {}: {}", run_id, reason)
            }
            PropertyError::DiscardLimitExceeded { discarded } => {
                write!(
                    f,
                    "Gave up after {} inputs were discarded by preconditions",
                    discarded
                )
            }
            PropertyError::ReplayFailed { message } => {
                write!(f, "Replay failed: {}", message)
            }
            PropertyError::InvalidConfig { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
            PropertyError::InternalError {
                message,
                source_message,
            } => {
                write!(f, "Internal error: {}", message)?;
                if let Some(src) = source_message {
                    write!(f, " (source: {})", src)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PropertyError {}

/// Helper functions for creating PropertyError instances with context
impl PropertyError {
    /// Create a simple property failed error
    pub fn property_failed(message: impl Into<String>) -> Self {
        Self::PropertyFailed {
            message: message.into(),
            context: None,
            iteration: None,
        }
    }

    /// Create a property failed error with context
    pub fn property_failed_with_context(
        message: impl Into<String>,
        context: Option<impl Into<String>>,
        iteration: Option<usize>,
    ) -> Self {
        Self::PropertyFailed {
            message: message.into(),
            context: context.map(|c| c.into()),
            iteration,
        }
    }

    /// Create a precondition failure, which discards the current input
    pub fn precondition_failed(reason: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(
        message: impl Into<String>,
        source_message: Option<impl Into<String>>,
    ) -> Self {
        Self::InternalError {
            message: message.into(),
            source_message: source_message.map(|s| s.into()),
        }
    }

    /// Convert a caught panic payload into a predicate failure
    ///
    /// A panicking predicate is reported exactly like one that returned an error.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "predicate panicked".to_string()
        };
        Self::PropertyFailed {
            message,
            context: Some("panicked".to_string()),
            iteration: None,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> FailureKind {
        match self {
            PropertyError::PropertyFailed { .. } => FailureKind::Predicate,
            PropertyError::PreconditionFailed { .. } => FailureKind::Precondition,
            PropertyError::Timeout { .. } => FailureKind::Timeout,
            PropertyError::WorkerCrash { .. } => FailureKind::WorkerCrash,
            PropertyError::DiscardLimitExceeded { .. }
            | PropertyError::ReplayFailed { .. }
            | PropertyError::InvalidConfig { .. }
            | PropertyError::InternalError { .. } => FailureKind::Other,
        }
    }

    /// Attach the run index to a predicate failure that does not carry one yet
    pub(crate) fn at_iteration(self, run: usize) -> Self {
        match self {
            PropertyError::PropertyFailed {
                message,
                context,
                iteration: None,
            } => PropertyError::PropertyFailed {
                message,
                context,
                iteration: Some(run),
            },
            other => other,
        }
    }
}

/// Malformed generator configuration, reported at construction time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintError {
    #[error("min ({min}) must be less than or equal to max ({max})")]
    InvertedBounds { min: i64, max: i64 },

    #[error("{field} bound {value} is not a finite integer")]
    NonIntegerBound { field: &'static str, value: f64 },

    #[error("corner bias {0} must lie within [0, 1]")]
    InvalidBias(f64),
}

/// Failures of the worker pool itself, as opposed to failures of a run
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("no workers are registered for predicate {0}")]
    UnknownPredicate(PredicateId),

    #[error("workers are already registered for predicate {0}")]
    DuplicatePredicate(PredicateId),

    #[error("run {0} is already in flight")]
    DuplicateRunId(RunId),

    #[error("the worker lane for predicate {0} is disconnected")]
    Disconnected(PredicateId),

    #[error("invalid worker configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl From<PoolError> for PropertyError {
    fn from(error: PoolError) -> Self {
        PropertyError::internal_error("worker pool rejected the run", Some(error.to_string()))
    }
}

/// Result of a property test execution
pub type PropertyResult<T> = Result<TestSuccess, TestFailure<T>>;

/// Information about a successful test run
#[derive(Debug, Clone)]
pub struct TestSuccess {
    /// Number of runs that passed
    pub num_runs: usize,
    /// Root seed the whole sequence was derived from
    pub seed: u64,
    /// Test configuration used
    pub config: TestConfig,
    /// Counters collected while running
    pub stats: RunStatistics,
    /// Total time spent on the test
    pub test_duration: Duration,
}

/// Information about a failed test run
///
/// This is the record handed to the reporting layer: the original and the minimal
/// failing input, how many runs and shrinks it took, and the seed that reproduces
/// the whole sequence.
#[derive(Debug)]
pub struct TestFailure<T> {
    /// The error that caused the failure (of the minimal input, when shrinking succeeded)
    pub error: PropertyError,
    /// Original input that caused the failure
    pub original_input: T,
    /// Shrunk input (if shrinking adopted at least one candidate)
    pub shrunk_input: Option<T>,
    /// Number of runs executed, the failing one included
    pub num_runs: usize,
    /// Number of shrink candidates adopted
    pub num_shrinks: usize,
    /// Root seed the whole sequence was derived from
    pub seed: u64,
    /// Descriptor that rebuilds the minimal input: per-run seed, size and shrink path
    pub counterexample: GenerationState,
    /// Test configuration used
    pub config: TestConfig,
    /// Counters collected while running
    pub stats: RunStatistics,
    /// Total time spent on the test
    pub test_duration: Duration,
    /// Time spent on shrinking
    pub shrink_duration: Duration,
}

impl<T> TestFailure<T> {
    /// The smallest failing input known
    pub fn minimal_input(&self) -> &T {
        self.shrunk_input.as_ref().unwrap_or(&self.original_input)
    }

    /// Classification of the failure
    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }

    /// Get a detailed report of the test failure
    pub fn detailed_report(&self) -> String
    where
        T: fmt::Debug,
    {
        let mut report = String::new();

        report.push_str(&format!(
            "Property test failed after {} run(s)\n",
            self.num_runs
        ));
        report.push_str(&format!("Error: {}\n", self.error));
        report.push_str(&format!("Original input: {:?}\n", self.original_input));

        if let Some(ref shrunk) = self.shrunk_input {
            report.push_str(&format!("Shrunk input: {:?}\n", shrunk));
            report.push_str(&format!("Shrinking steps: {}\n", self.num_shrinks));
            report.push_str(&format!("Shrinking time: {:?}\n", self.shrink_duration));
        } else {
            report.push_str("No shrinking performed\n");
        }

        report.push_str(&format!("Total test time: {:?}\n", self.test_duration));
        report.push_str(&format!(
            "Reproduce with: seed={} (counterexample {})\n",
            self.seed, self.counterexample
        ));

        report
    }

    /// Get a concise summary of the test failure
    pub fn summary(&self) -> String
    where
        T: fmt::Debug,
    {
        if let Some(ref shrunk) = self.shrunk_input {
            format!(
                "Property failed with input {:?} (shrunk from {:?}) after {} run(s), seed {}",
                shrunk, self.original_input, self.num_runs, self.seed
            )
        } else {
            format!(
                "Property failed with input {:?} after {} run(s), seed {}",
                self.original_input, self.num_runs, self.seed
            )
        }
    }
}

impl<T: fmt::Debug> fmt::Display for TestFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_failure() -> TestFailure<i64> {
        TestFailure {
            error: PropertyError::property_failed("too big"),
            original_input: 87,
            shrunk_input: Some(50),
            num_runs: 3,
            num_shrinks: 4,
            seed: 42,
            counterexample: GenerationState::new(7, 10).child(2).child(1),
            config: TestConfig::default(),
            stats: RunStatistics::default(),
            test_duration: Duration::from_millis(5),
            shrink_duration: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_property_error_display_with_context() {
        let error = PropertyError::property_failed_with_context(
            "value out of range",
            Some("checking bounds"),
            Some(3),
        );
        assert_eq!(
            error.to_string(),
            "Property failed: value out of range (context: checking bounds) (iteration: 3)"
        );
    }

    #[test]
    fn test_timeout_and_crash_display() {
        let timeout = PropertyError::Timeout {
            run_id: RunId(9),
            elapsed: Duration::from_millis(20),
        };
        assert_eq!(timeout.to_string(), "Run 9 timed out after 20ms");

        let crash = PropertyError::WorkerCrash {
            run_id: RunId(4),
            reason: "gone".to_string(),
        };
        assert_eq!(crash.to_string(), "Worker crashed during run 4: gone");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            PropertyError::property_failed("x").kind(),
            FailureKind::Predicate
        );
        assert_eq!(
            PropertyError::precondition_failed("x").kind(),
            FailureKind::Precondition
        );
        assert_eq!(
            PropertyError::DiscardLimitExceeded { discarded: 1 }.kind(),
            FailureKind::Other
        );
        assert_eq!(
            PropertyError::internal_error("x", None::<String>).kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn test_from_panic_payloads() {
        let from_str = PropertyError::from_panic(&"boom");
        assert_eq!(from_str, PropertyError::property_failed_with_context("boom", Some("panicked"), None));

        let from_string = PropertyError::from_panic(&"kaboom".to_string());
        assert_eq!(from_string.kind(), FailureKind::Predicate);
        assert!(from_string.to_string().contains("kaboom"));

        let opaque = PropertyError::from_panic(&17_u8);
        assert!(opaque.to_string().contains("predicate panicked"));
    }

    #[test]
    fn test_at_iteration_only_fills_missing() {
        let filled = PropertyError::property_failed("x").at_iteration(5);
        assert!(matches!(
            filled,
            PropertyError::PropertyFailed {
                iteration: Some(5),
                ..
            }
        ));

        let kept = PropertyError::property_failed_with_context("x", None::<String>, Some(1))
            .at_iteration(5);
        assert!(matches!(
            kept,
            PropertyError::PropertyFailed {
                iteration: Some(1),
                ..
            }
        ));
    }

    #[test]
    fn test_property_error_is_tagged_by_kind() {
        let timeout = PropertyError::Timeout {
            run_id: RunId(3),
            elapsed: Duration::from_millis(50),
        };
        let encoded = serde_json::to_value(&timeout).expect("serializable");
        assert_eq!(
            encoded,
            serde_json::json!({
                "kind": "timeout",
                "runId": 3,
                "elapsed": {"secs": 0, "nanos": 50_000_000}
            })
        );
        let decoded: PropertyError = serde_json::from_value(encoded).expect("valid error");
        assert_eq!(decoded, timeout);

        let failed = PropertyError::property_failed("too big").at_iteration(2);
        let encoded = serde_json::to_value(&failed).expect("serializable");
        assert_eq!(encoded["kind"], "propertyFailed");
        assert_eq!(encoded["iteration"], 2);
    }

    #[test]
    fn test_constraint_error_display() {
        let error = ConstraintError::InvertedBounds { min: 5, max: 2 };
        assert_eq!(
            error.to_string(),
            "min (5) must be less than or equal to max (2)"
        );
    }

    #[test]
    fn test_test_failure_summary_and_report() {
        let failure = sample_failure();
        assert_eq!(*failure.minimal_input(), 50);
        assert_eq!(
            failure.summary(),
            "Property failed with input 50 (shrunk from 87) after 3 run(s), seed 42"
        );

        let report = failure.detailed_report();
        assert!(report.contains("Original input: 87"));
        assert!(report.contains("Shrunk input: 50"));
        assert!(report.contains("seed=42"));
    }

    #[test]
    fn test_test_failure_without_shrinking() {
        let mut failure = sample_failure();
        failure.shrunk_input = None;
        assert_eq!(*failure.minimal_input(), 87);
        assert!(failure.detailed_report().contains("No shrinking performed"));
    }
}
