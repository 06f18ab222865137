#![allow(clippy::result_large_err)]

//! # Proviso - Property-Based Testing with Isolated Execution
//!
//! Proviso generates randomized inputs from seeded generators, checks a property against
//! each of them and, when one fails, shrinks it to a minimal counterexample that can be
//! reproduced from the reported seed.
//!
//! Properties that may hang or bring their thread down can run on a [`WorkerPool`]:
//! each run is dispatched as a message carrying either the input itself or the
//! [`GenerationState`] that rebuilds it, and resolves as a result, a timeout or a crash.
//!
//! ## Quick Start
//!
//! ```rust
//! use proviso::{IntegerConstraints, TestConfig, check_with_config, integer, property};
//!
//! let percentages = integer(IntegerConstraints::between(0, 100)).unwrap();
//! let config = TestConfig {
//!     seed: Some(7),
//!     ..TestConfig::default()
//! };
//!
//! let failure = check_with_config(percentages, property(|x: i64| x < 50), config)
//!     .expect_err("half of the range fails");
//! assert_eq!(*failure.minimal_input(), 50);
//! ```

// Public modules
pub mod arbitrary;
pub mod config;
pub mod error;
pub mod execution;
pub mod integer;
pub mod property;
pub mod rng;
pub mod shrink;
pub mod statistics;
pub mod worker;

// Re-export the main public API
pub use arbitrary::{Arbitrary, GenerationState, Shrinks, Value, replay};
pub use config::{ConfigError, GlobalConfig, MAX_SIZE, SizeSchedule, TestConfig, WorkerConfig};
pub use error::{ConstraintError, FailureKind, PoolError, PropertyError};
pub use execution::{
    AsyncPropertyTest, InputTransfer, IsolatedPropertyTest, PropertyTest, PropertyTestBuilder,
    check, check_async, check_async_with_config, check_isolated, check_with_config,
};
pub use integer::{IntegerArbitrary, IntegerConstraints, integer};
pub use property::{
    AsyncClosureProperty, AsyncProperty, ClosureProperty, FallibleProperty, Property,
    async_property, fallible, pre, property,
};
pub use rng::RandomSource;
pub use shrink::{ShrinkConfig, ShrinkEngine, ShrinkResult};
pub use statistics::RunStatistics;
pub use worker::{
    Payload, PendingRun, PoolStats, PredicateId, ResultMessage, RunId, RunMessage, WorkerEvent,
    WorkerPool, WorkerRunner,
};

// Re-export common types
pub use error::{PropertyResult, TestFailure, TestSuccess};
