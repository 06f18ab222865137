//! Property test execution engine for running synchronous, asynchronous and isolated
//! property tests.
//!
//! Runs are strictly sequential within one property. Run `i` uses the seed derived from
//! the root seed and its attempt index, so any single run can be reproduced without
//! replaying the ones before it.

use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::arbitrary::{Arbitrary, GenerationState, Value};
use crate::config::{ConfigError, SizeSchedule, TestConfig, WorkerConfig};
use crate::error::{FailureKind, PropertyError, PropertyResult, TestFailure, TestSuccess};
use crate::property::{AsyncProperty, Property, guarded_test, guarded_test_async};
use crate::rng::{RandomSource, derive_seed, fresh_seed};
use crate::shrink::{ShrinkConfig, ShrinkEngine, ShrinkResult};
use crate::statistics::RunStatistics;
use crate::worker::{Payload, PredicateId, WorkerPool, WorkerRunner};

/// What the loop does after one evaluation
enum Verdict {
    Continue,
    Stop(PropertyError),
}

/// State of one property run: seed bookkeeping, counters and timing
struct Campaign<'a, A> {
    arbitrary: &'a A,
    config: &'a TestConfig,
    root: u64,
    attempt: u64,
    stats: RunStatistics,
    start: Instant,
}

impl<'a, A> Campaign<'a, A> {
    fn new(arbitrary: &'a A, config: &'a TestConfig) -> Self {
        let root = config.seed.unwrap_or_else(fresh_seed);
        debug!(seed = root, num_runs = config.num_runs, "starting property");
        Self {
            arbitrary,
            config,
            root,
            attempt: 0,
            stats: RunStatistics::new(),
            start: Instant::now(),
        }
    }

    fn has_more(&self) -> bool {
        self.stats.passed < self.config.num_runs
    }

    /// Generate the input of the next attempt
    ///
    /// Discarded attempts consume a seed but not a size step.
    fn next<T>(&mut self) -> (Value<T>, GenerationState)
    where
        A: Arbitrary<T>,
    {
        let run = self.stats.passed;
        let size = self.config.size.size_for_run(run, self.config.num_runs);
        let seed = derive_seed(self.root, self.attempt);
        self.attempt += 1;

        let state = GenerationState::new(seed, size);
        let value = self.arbitrary.generate(&mut RandomSource::new(seed), size);
        debug!(run, seed, size, "generated input");
        (value, state)
    }

    fn judge(&mut self, outcome: Result<(), PropertyError>) -> Verdict {
        match outcome {
            Ok(()) => {
                self.stats.record_pass();
                Verdict::Continue
            }
            Err(error) if error.kind() == FailureKind::Precondition => {
                self.stats.record_skip();
                if self.stats.skipped > self.config.skip_budget() {
                    Verdict::Stop(PropertyError::DiscardLimitExceeded {
                        discarded: self.stats.skipped,
                    })
                } else {
                    Verdict::Continue
                }
            }
            Err(error) => {
                self.stats.record_failure();
                Verdict::Stop(error.at_iteration(self.stats.passed))
            }
        }
    }

    /// Fail the property on a configuration that does not validate
    ///
    /// The predicate never runs; the first input is generated only to fill the report.
    fn reject<T: fmt::Debug>(mut self, error: ConfigError) -> TestFailure<T>
    where
        A: Arbitrary<T>,
    {
        warn!(error = %error, "rejecting test configuration");
        let (value, state) = self.next();
        let error = PropertyError::InvalidConfig {
            message: error.to_string(),
        };
        self.failure(error, value.into_inner(), state, None)
    }

    fn shrink_config(&self) -> ShrinkConfig {
        ShrinkConfig::from(self.config)
    }

    fn success(self) -> TestSuccess {
        debug!(seed = self.root, stats = ?self.stats, "property held");
        TestSuccess {
            num_runs: self.stats.passed,
            seed: self.root,
            config: self.config.clone(),
            stats: self.stats,
            test_duration: self.start.elapsed(),
        }
    }

    fn failure<T: fmt::Debug>(
        mut self,
        error: PropertyError,
        original_input: T,
        state: GenerationState,
        shrink: Option<ShrinkResult<Value<T>>>,
    ) -> TestFailure<T> {
        info!(
            seed = self.root,
            run = self.stats.passed,
            input = ?original_input,
            error = %error,
            "property failed"
        );

        let (error, shrunk_input, num_shrinks, counterexample, shrink_duration) = match shrink {
            Some(result) => {
                self.stats.record_shrink(result.attempts, result.shrink_steps);
                info!(
                    steps = result.shrink_steps,
                    attempts = result.attempts,
                    completed = result.completed,
                    minimal = ?result.minimal.value(),
                    "shrinking completed"
                );
                let counterexample = state.descendant(&result.path);
                let shrunk = result.shrunk().then(|| result.minimal.into_inner());
                let error = result
                    .error
                    .map(|e| e.at_iteration(self.stats.passed))
                    .unwrap_or(error);
                (
                    error,
                    shrunk,
                    result.shrink_steps,
                    counterexample,
                    result.shrink_duration,
                )
            }
            None => (error, None, 0, state, Duration::ZERO),
        };

        TestFailure {
            error,
            original_input,
            shrunk_input,
            num_runs: self.stats.runs(),
            num_shrinks,
            seed: self.root,
            counterexample,
            config: self.config.clone(),
            stats: self.stats,
            test_duration: self.start.elapsed(),
            shrink_duration,
        }
    }
}

/// Generate, evaluate and, on a predicate failure, shrink
///
/// `evaluate` sees each input together with the descriptor that rebuilds it.
fn drive<T, A, E>(arbitrary: &A, config: &TestConfig, mut evaluate: E) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + 'static,
    A: Arbitrary<T>,
    E: FnMut(&Value<T>, &GenerationState) -> Result<(), PropertyError>,
{
    let mut campaign = Campaign::new(arbitrary, config);
    if let Err(error) = config.validate() {
        return Err(campaign.reject(error));
    }
    while campaign.has_more() {
        let (value, state): (Value<T>, _) = campaign.next();
        let error = match campaign.judge(evaluate(&value, &state)) {
            Verdict::Continue => continue,
            Verdict::Stop(error) => error,
        };

        if error.kind() != FailureKind::Predicate {
            // Timeouts, crashes and exhausted discards are reported as they are
            return Err(campaign.failure(error, value.into_inner(), state, None));
        }

        let original = value.value().clone();
        let engine = ShrinkEngine::with_config(campaign.shrink_config());
        let result = engine.shrink(value, |candidate, path| {
            evaluate(candidate, &state.descendant(path))
        });
        return Err(campaign.failure(error, original, state, Some(result)));
    }
    Ok(campaign.success())
}

/// Async counterpart of [`drive`]
async fn drive_async<T, A, P>(arbitrary: &A, property: &P, config: &TestConfig) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + 'static,
    A: Arbitrary<T>,
    P: AsyncProperty<T> + ?Sized,
{
    let mut campaign = Campaign::new(arbitrary, config);
    if let Err(error) = config.validate() {
        return Err(campaign.reject(error));
    }
    while campaign.has_more() {
        let (value, state): (Value<T>, _) = campaign.next();
        let outcome = guarded_test_async(property, value.value().clone())
            .await
            .map(|_| ());
        let error = match campaign.judge(outcome) {
            Verdict::Continue => continue,
            Verdict::Stop(error) => error,
        };

        if error.kind() != FailureKind::Predicate {
            return Err(campaign.failure(error, value.into_inner(), state, None));
        }

        let original = value.value().clone();
        let engine = ShrinkEngine::with_config(campaign.shrink_config());
        let result = engine
            .shrink_async(value, move |candidate| async move {
                guarded_test_async(property, candidate).await.map(|_| ())
            })
            .await;
        return Err(campaign.failure(error, original, state, Some(result)));
    }
    Ok(campaign.success())
}

/// Core property test execution struct
pub struct PropertyTest<T, A, P> {
    arbitrary: A,
    property: P,
    config: TestConfig,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, A, P> PropertyTest<T, A, P>
where
    T: Clone + fmt::Debug + 'static,
    A: Arbitrary<T>,
    P: Property<T>,
{
    /// Create a new property test with the given arbitrary, property, and configuration
    pub fn new(arbitrary: A, property: P, config: TestConfig) -> Self {
        Self {
            arbitrary,
            property,
            config,
            _phantom: PhantomData,
        }
    }

    /// Execute the property test
    pub fn run(self) -> PropertyResult<T> {
        let property = &self.property;
        drive(&self.arbitrary, &self.config, |value, _| {
            guarded_test(property, value.value().clone()).map(|_| ())
        })
    }
}

/// Async property test execution struct
///
/// The property is awaited once per run; it is never invoked concurrently with itself.
pub struct AsyncPropertyTest<T, A, P> {
    arbitrary: A,
    property: P,
    config: TestConfig,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, A, P> AsyncPropertyTest<T, A, P>
where
    T: Clone + fmt::Debug + 'static,
    A: Arbitrary<T>,
    P: AsyncProperty<T>,
{
    pub fn new(arbitrary: A, property: P, config: TestConfig) -> Self {
        Self {
            arbitrary,
            property,
            config,
            _phantom: PhantomData,
        }
    }

    /// Execute the async property test
    pub async fn run(self) -> PropertyResult<T> {
        drive_async(&self.arbitrary, &self.property, &self.config).await
    }
}

/// How inputs reach an isolated worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputTransfer {
    /// Send the generation descriptor; the worker rebuilds the input
    #[default]
    Reconstruct,
    /// Send the generated input itself
    Materialize,
}

/// Property test whose predicate runs on a worker of a [`WorkerPool`]
///
/// The predicate must already be registered under `predicate_id`, with a runner able to
/// rebuild inputs generated by `arbitrary` (see [`WorkerRunner::for_arbitrary`]).
pub struct IsolatedPropertyTest<'p, T, O, A> {
    arbitrary: A,
    pool: &'p WorkerPool<T, O>,
    predicate_id: PredicateId,
    config: TestConfig,
    transfer: InputTransfer,
}

impl<'p, T, O, A> IsolatedPropertyTest<'p, T, O, A>
where
    T: Clone + fmt::Debug + Send + 'static,
    O: Send + 'static,
    A: Arbitrary<T>,
{
    pub fn new(
        arbitrary: A,
        pool: &'p WorkerPool<T, O>,
        predicate_id: PredicateId,
        config: TestConfig,
    ) -> Self {
        Self {
            arbitrary,
            pool,
            predicate_id,
            config,
            transfer: InputTransfer::default(),
        }
    }

    /// Choose how inputs are sent to the worker
    pub fn transfer(mut self, transfer: InputTransfer) -> Self {
        self.transfer = transfer;
        self
    }

    /// Execute the property test
    ///
    /// Predicate failures reported by the worker are shrunk as usual; timeouts and worker
    /// crashes end the property without shrinking.
    pub fn run(self) -> PropertyResult<T> {
        let pool = self.pool;
        let predicate_id = self.predicate_id;
        let transfer = self.transfer;
        drive(&self.arbitrary, &self.config, |value, state| {
            let payload = match transfer {
                InputTransfer::Reconstruct => Payload::State(state.clone()),
                InputTransfer::Materialize => Payload::Main {
                    value: value.value().clone(),
                },
            };
            let pending = pool.dispatch(predicate_id, pool.next_run_id(), payload)?;
            pending.wait().outcome.map(|_| ())
        })
    }
}

/// Execute a property test with the default configuration and environment overrides
pub fn check<T, A, P>(arbitrary: A, property: P) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + 'static,
    A: Arbitrary<T>,
    P: Property<T>,
{
    check_with_config(arbitrary, property, TestConfig::from_env())
}

/// Execute a property test with a custom configuration
pub fn check_with_config<T, A, P>(arbitrary: A, property: P, config: TestConfig) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + 'static,
    A: Arbitrary<T>,
    P: Property<T>,
{
    PropertyTest::new(arbitrary, property, config).run()
}

/// Execute an async property test with the default configuration and environment overrides
pub async fn check_async<T, A, P>(arbitrary: A, property: P) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + 'static,
    A: Arbitrary<T>,
    P: AsyncProperty<T>,
{
    check_async_with_config(arbitrary, property, TestConfig::from_env()).await
}

/// Execute an async property test with a custom configuration
pub async fn check_async_with_config<T, A, P>(
    arbitrary: A,
    property: P,
    config: TestConfig,
) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + 'static,
    A: Arbitrary<T>,
    P: AsyncProperty<T>,
{
    AsyncPropertyTest::new(arbitrary, property, config).run().await
}

/// Execute a property test on a dedicated pool of isolated workers
///
/// The pool is started for this property only and shut down afterwards. Inputs are
/// sent as generation descriptors.
pub fn check_isolated<T, O, A, P>(
    arbitrary: A,
    property: P,
    config: TestConfig,
    workers: WorkerConfig,
) -> PropertyResult<T>
where
    T: Clone + fmt::Debug + Send + 'static,
    O: Send + 'static,
    A: Arbitrary<T> + Clone + Send + Sync + 'static,
    P: Property<T, Output = O> + Send + Sync + 'static,
{
    let predicate_id = PredicateId(0);
    let pool = WorkerPool::new(workers)
        .and_then(|pool| {
            pool.register(WorkerRunner::for_arbitrary(
                predicate_id,
                arbitrary.clone(),
                property,
            ))
            .map(|()| pool)
        })
        .map_err(PropertyError::from);

    match pool {
        Ok(pool) => {
            let result = IsolatedPropertyTest::new(arbitrary, &pool, predicate_id, config).run();
            pool.shutdown();
            result
        }
        // Every run would fail the same way; report it against the first input
        Err(error) => drive(&arbitrary, &config, |_, _| Err(error.clone())),
    }
}

/// Builder pattern for configuring property tests
pub struct PropertyTestBuilder<T> {
    config: TestConfig,
    transfer: InputTransfer,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> PropertyTestBuilder<T> {
    /// Create a new builder from the default configuration and environment overrides
    pub fn new() -> Self {
        Self {
            config: TestConfig::from_env(),
            transfer: InputTransfer::default(),
            _phantom: PhantomData,
        }
    }

    /// Start from an explicit configuration
    pub fn with_config(config: TestConfig) -> Self {
        Self {
            config,
            transfer: InputTransfer::default(),
            _phantom: PhantomData,
        }
    }

    /// Set the number of runs that must pass
    pub fn num_runs(mut self, num_runs: usize) -> Self {
        self.config.num_runs = num_runs;
        self
    }

    /// Set the root seed for reproducible tests
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set the maximum number of shrink candidates evaluated
    pub fn max_shrink_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_shrink_iterations = max_iterations;
        self
    }

    /// Set the shrinking timeout
    pub fn shrink_timeout(mut self, timeout: Duration) -> Self {
        self.config.shrink_timeout = timeout;
        self
    }

    /// Set the size policy
    pub fn size(mut self, size: SizeSchedule) -> Self {
        self.config.size = size;
        self
    }

    /// Set the number of discarded inputs tolerated per run
    pub fn max_skips_per_run(mut self, max_skips: usize) -> Self {
        self.config.max_skips_per_run = max_skips;
        self
    }

    /// Set how inputs reach isolated workers
    pub fn transfer(mut self, transfer: InputTransfer) -> Self {
        self.transfer = transfer;
        self
    }

    /// The configuration built so far
    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// Run the property test with the configured parameters
    pub fn run<A, P>(self, arbitrary: A, property: P) -> PropertyResult<T>
    where
        T: Clone + fmt::Debug + 'static,
        A: Arbitrary<T>,
        P: Property<T>,
    {
        PropertyTest::new(arbitrary, property, self.config).run()
    }

    /// Run the async property test with the configured parameters
    pub async fn run_async<A, P>(self, arbitrary: A, property: P) -> PropertyResult<T>
    where
        T: Clone + fmt::Debug + 'static,
        A: Arbitrary<T>,
        P: AsyncProperty<T>,
    {
        AsyncPropertyTest::new(arbitrary, property, self.config)
            .run()
            .await
    }

    /// Run the property on a predicate already registered with `pool`
    pub fn run_isolated<O, A>(
        self,
        arbitrary: A,
        pool: &WorkerPool<T, O>,
        predicate_id: PredicateId,
    ) -> PropertyResult<T>
    where
        T: Clone + fmt::Debug + Send + 'static,
        O: Send + 'static,
        A: Arbitrary<T>,
    {
        IsolatedPropertyTest::new(arbitrary, pool, predicate_id, self.config)
            .transfer(self.transfer)
            .run()
    }
}

impl<T> Default for PropertyTestBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_SIZE;
    use crate::integer::IntegerArbitrary;
    use crate::property::{async_property, fallible, pre, property};

    fn config(seed: u64) -> TestConfig {
        TestConfig {
            seed: Some(seed),
            ..TestConfig::default()
        }
    }

    struct AlwaysPassProperty;
    impl Property<i64> for AlwaysPassProperty {
        type Output = ();
        fn test(&self, _input: i64) -> Result<Self::Output, PropertyError> {
            Ok(())
        }
    }

    #[test]
    fn test_passing_property() {
        let arbitrary = IntegerArbitrary::new(-5, 5).expect("valid");
        let success = check_with_config(arbitrary, AlwaysPassProperty, config(1))
            .expect("always passes");
        assert_eq!(success.num_runs, 100);
        assert_eq!(success.seed, 1);
        assert_eq!(success.stats.passed, 100);
        assert_eq!(success.stats.skipped, 0);
    }

    #[test]
    fn test_failure_is_shrunk_and_reported() {
        let arbitrary = IntegerArbitrary::new(0, 100).expect("valid");
        let failure = check_with_config(arbitrary, property(|x: i64| x < 50), config(3))
            .expect_err("values above 49 exist");

        assert_eq!(*failure.minimal_input(), 50);
        assert!(failure.original_input >= 50);
        assert_eq!(failure.seed, 3);
        assert_eq!(failure.kind(), FailureKind::Predicate);
        assert_eq!(failure.num_runs, failure.stats.passed + 1);
        assert_eq!(failure.num_shrinks, failure.counterexample.path.len());

        // The descriptor rebuilds the minimal input
        let replayed = crate::arbitrary::replay(&arbitrary, &failure.counterexample)
            .expect("replayable");
        assert_eq!(*replayed.value(), 50);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let arbitrary = IntegerArbitrary::new(-1000, 1000).expect("valid");
        let run = || {
            check_with_config(arbitrary, property(|x: i64| x.abs() < 900), config(77))
                .expect_err("large magnitudes exist")
        };
        let (first, second) = (run(), run());
        assert_eq!(first.original_input, second.original_input);
        assert_eq!(first.shrunk_input, second.shrunk_input);
        assert_eq!(first.num_runs, second.num_runs);
        assert_eq!(first.counterexample, second.counterexample);
    }

    #[test]
    fn test_panic_is_a_predicate_failure() {
        let arbitrary = IntegerArbitrary::new(0, 100).expect("valid");
        let failure = check_with_config(
            arbitrary,
            property(|x: i64| {
                assert!(x < 50, "too large: {}", x);
                true
            }),
            config(3),
        )
        .expect_err("panics above 49");
        assert_eq!(failure.kind(), FailureKind::Predicate);
        assert_eq!(*failure.minimal_input(), 50);
    }

    #[test]
    fn test_preconditions_are_resampled() {
        let arbitrary = IntegerArbitrary::new(0, 1000).expect("valid");
        let success = check_with_config(
            arbitrary,
            fallible(|x: i64| -> Result<(), PropertyError> {
                pre(x % 2 == 0)?;
                if x % 2 == 0 {
                    Ok(())
                } else {
                    Err(PropertyError::property_failed("odd slipped through"))
                }
            }),
            config(5),
        )
        .expect("odd inputs are discarded");
        assert_eq!(success.num_runs, 100);
        assert!(success.stats.skipped > 0);
    }

    #[test]
    fn test_discard_budget_is_enforced() {
        let arbitrary = IntegerArbitrary::new(0, 1000).expect("valid");
        let config = TestConfig {
            num_runs: 10,
            max_skips_per_run: 2,
            ..config(6)
        };
        let failure = check_with_config(
            arbitrary,
            fallible(|_: i64| pre(false)),
            config,
        )
        .expect_err("everything is discarded");
        assert!(matches!(
            failure.error,
            PropertyError::DiscardLimitExceeded { discarded: 21 }
        ));
        assert_eq!(failure.kind(), FailureKind::Other);
        assert!(failure.shrunk_input.is_none());
        assert_eq!(failure.num_runs, 0);
    }

    #[test]
    fn test_builder() {
        let arbitrary = IntegerArbitrary::new(-10, 10).expect("valid");
        let builder = PropertyTestBuilder::with_config(TestConfig::default())
            .num_runs(500)
            .seed(11)
            .max_shrink_iterations(50)
            .size(SizeSchedule::Fixed(100));
        assert_eq!(builder.config().num_runs, 500);
        assert_eq!(builder.config().max_shrink_iterations, 50);

        let failure = builder
            .run(arbitrary, property(|x: i64| x != 7))
            .expect_err("7 is in range");
        assert_eq!(*failure.minimal_input(), 7);
        assert_eq!(failure.seed, 11);
    }

    #[test]
    fn test_invalid_config_fails_without_running() {
        let arbitrary = IntegerArbitrary::new(0, 100).expect("valid");
        let calls = std::cell::Cell::new(0);
        let counting = property(|_: i64| {
            calls.set(calls.get() + 1);
            true
        });

        let failure = check_with_config(
            arbitrary,
            counting,
            TestConfig {
                num_runs: 0,
                ..config(4)
            },
        )
        .expect_err("zero runs is rejected");
        assert_eq!(failure.kind(), FailureKind::Other);
        assert!(matches!(failure.error, PropertyError::InvalidConfig { .. }));
        assert_eq!(failure.num_runs, 0);
        assert_eq!(calls.get(), 0);

        let failure = check_with_config(
            arbitrary,
            property(|x: i64| x < 50),
            TestConfig {
                max_shrink_iterations: 0,
                ..config(4)
            },
        )
        .expect_err("an empty shrink budget is rejected");
        assert_eq!(failure.kind(), FailureKind::Other);
        assert!(failure.shrunk_input.is_none());
    }

    #[tokio::test]
    async fn test_async_invalid_config_is_rejected() {
        let arbitrary = IntegerArbitrary::new(0, 100).expect("valid");
        let failure = check_async_with_config(
            arbitrary,
            async_property(|_: i64| async move { Ok::<(), PropertyError>(()) }),
            TestConfig {
                size: SizeSchedule::Fixed(MAX_SIZE + 1),
                ..config(4)
            },
        )
        .await
        .expect_err("oversized schedule is rejected");
        assert_eq!(failure.kind(), FailureKind::Other);
        assert!(failure.error.to_string().contains("Invalid size"));
    }

    #[tokio::test]
    async fn test_async_failure_is_shrunk() {
        let arbitrary = IntegerArbitrary::new(0, 100).expect("valid");
        let failure = check_async_with_config(
            arbitrary,
            async_property(|x: i64| async move {
                tokio::task::yield_now().await;
                if x < 50 {
                    Ok(())
                } else {
                    Err(PropertyError::property_failed("too large"))
                }
            }),
            config(3),
        )
        .await
        .expect_err("values above 49 exist");
        assert_eq!(*failure.minimal_input(), 50);
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let arbitrary = IntegerArbitrary::new(0, 100).expect("valid");
        let sync = check_with_config(arbitrary, property(|x: i64| x < 50), config(9))
            .expect_err("fails");
        let asynchronous = check_async_with_config(
            arbitrary,
            async_property(|x: i64| async move {
                if x < 50 {
                    Ok(())
                } else {
                    Err(PropertyError::property_failed("too large"))
                }
            }),
            config(9),
        )
        .await
        .expect_err("fails");
        assert_eq!(sync.original_input, asynchronous.original_input);
        assert_eq!(sync.shrunk_input, asynchronous.shrunk_input);
        assert_eq!(sync.counterexample, asynchronous.counterexample);
    }
}
