//! Async integration tests for the proviso library

use proviso::{
    AsyncProperty, FailureKind, IntegerConstraints, PropertyError, PropertyTestBuilder,
    TestConfig, async_property, check_async, check_async_with_config, check_with_config, integer,
    property,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn seeded(seed: u64) -> TestConfig {
    TestConfig {
        seed: Some(seed),
        ..TestConfig::default()
    }
}

/// Test basic async property execution
#[tokio::test]
async fn test_basic_async_property() {
    let arbitrary = integer(IntegerConstraints::between(1, 100)).expect("valid bounds");

    struct PositiveValueProperty;
    impl AsyncProperty<i64> for PositiveValueProperty {
        type Output = ();
        async fn test(&self, value: i64) -> Result<Self::Output, PropertyError> {
            // Simulate some async work
            tokio::time::sleep(Duration::from_millis(1)).await;

            if value <= 0 {
                Err(PropertyError::property_failed("Value must be positive"))
            } else {
                Ok(())
            }
        }
    }

    let success = check_async(arbitrary, PositiveValueProperty)
        .await
        .expect("all values are positive");
    assert!(success.num_runs > 0);
    assert_eq!(success.stats.skipped, 0);
}

/// Test async property failure with shrinking
#[tokio::test]
async fn test_async_property_failure_with_shrinking() {
    let arbitrary = integer(IntegerConstraints::between(0, 100)).expect("valid bounds");
    let config = TestConfig {
        shrink_timeout: Duration::from_secs(2),
        ..seeded(42)
    };

    let failure = check_async_with_config(
        arbitrary,
        async_property(|x: i64| async move {
            tokio::task::yield_now().await;
            if x < 50 {
                Ok(())
            } else {
                Err(PropertyError::property_failed("Value too large"))
            }
        }),
        config,
    )
    .await
    .expect_err("values above 49 exist");

    assert_eq!(*failure.minimal_input(), 50);
    assert!(failure.shrink_duration <= failure.test_duration);
    assert_eq!(failure.seed, 42);
}

/// A sync predicate and its async twin see the same inputs and shrink the same way
#[tokio::test]
async fn test_async_sync_interoperability() {
    let arbitrary = integer(IntegerConstraints::between(-10, 10)).expect("valid bounds");
    let config = TestConfig {
        num_runs: 1000,
        ..seeded(8)
    };

    let sync = check_with_config(arbitrary, property(|x: i64| x != 7), config.clone())
        .expect_err("7 is in range");
    let asynchronous = check_async_with_config(
        arbitrary,
        async_property(|x: i64| async move {
            if x != 7 {
                Ok(())
            } else {
                Err(PropertyError::property_failed("seven"))
            }
        }),
        config,
    )
    .await
    .expect_err("7 is in range");

    assert_eq!(*sync.minimal_input(), 7);
    assert_eq!(sync.original_input, asynchronous.original_input);
    assert_eq!(sync.num_runs, asynchronous.num_runs);
    assert_eq!(sync.counterexample, asynchronous.counterexample);
}

/// A future that panics while polled fails like one that resolves to an error
#[tokio::test]
async fn test_async_panic_and_rejection_are_uniform() {
    let arbitrary = integer(IntegerConstraints::between(0, 100)).expect("valid bounds");

    let rejected = check_async_with_config(
        arbitrary,
        async_property(|x: i64| async move {
            if x < 50 {
                Ok(())
            } else {
                Err(PropertyError::property_failed("rejected"))
            }
        }),
        seeded(5),
    )
    .await
    .expect_err("fails");

    let panicked = check_async_with_config(
        arbitrary,
        async_property(|x: i64| async move {
            tokio::task::yield_now().await;
            if x >= 50 {
                panic!("thrown while polled: {}", x);
            }
            Ok::<(), PropertyError>(())
        }),
        seeded(5),
    )
    .await
    .expect_err("fails");

    assert_eq!(rejected.kind(), FailureKind::Predicate);
    assert_eq!(rejected.kind(), panicked.kind());
    assert_eq!(rejected.shrunk_input, panicked.shrunk_input);
    assert_eq!(rejected.num_shrinks, panicked.num_shrinks);
}

/// Test async property with the builder
#[tokio::test]
async fn test_async_property_with_builder() {
    let arbitrary = integer(IntegerConstraints::between(0, 1000)).expect("valid bounds");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let success = PropertyTestBuilder::with_config(TestConfig::default())
        .num_runs(25)
        .seed(12345)
        .shrink_timeout(Duration::from_secs(1))
        .run_async(
            arbitrary,
            async_property(move |x: i64| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    if (0..=1000).contains(&x) {
                        Ok(x)
                    } else {
                        Err(PropertyError::property_failed("out of range"))
                    }
                }
            }),
        )
        .await
        .expect("values stay in range");

    assert_eq!(success.num_runs, 25);
    assert_eq!(success.seed, 12345);
    // Runs are sequential and never repeated
    assert_eq!(calls.load(Ordering::SeqCst), 25);
}

/// Preconditions in async properties are resampled like sync ones
#[tokio::test]
async fn test_async_preconditions() {
    let arbitrary = integer(IntegerConstraints::between(0, 100)).expect("valid bounds");
    let success = check_async_with_config(
        arbitrary,
        async_property(|x: i64| async move {
            proviso::pre(x % 3 == 0)?;
            Ok::<i64, PropertyError>(x / 3)
        }),
        seeded(77),
    )
    .await
    .expect("non-multiples are discarded");

    assert_eq!(success.stats.passed, 100);
    assert!(success.stats.skipped > 0);
}
