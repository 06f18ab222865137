//! Running predicates on isolated workers
//!
//! Registers a predicate with a worker pool, dispatches runs by hand and then lets the
//! engine drive a whole property through the pool. Set `RUST_LOG=proviso=debug` to
//! follow dispatches and worker recycling.

use proviso::{
    GenerationState, IntegerConstraints, Payload, PredicateId, PropertyError, PropertyTestBuilder,
    RunId, TestConfig, WorkerConfig, WorkerPool, WorkerRunner, check_isolated, fallible, integer,
    property,
};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let percentages = integer(IntegerConstraints::between(0, 100))?;

    println!("=== Manual dispatch ===");
    let pool = WorkerPool::new(WorkerConfig::new(2, Duration::from_millis(200))?)?;
    pool.register(WorkerRunner::for_arbitrary(
        PredicateId(1),
        percentages,
        fallible(|x: i64| -> Result<i64, PropertyError> {
            if x == 99 {
                // Never answers in time
                thread::sleep(Duration::from_secs(1));
            }
            Ok(x * x)
        }),
    ))?;

    let from_state = pool.dispatch(
        PredicateId(1),
        RunId(100),
        Payload::State(GenerationState::new(2024, 60)),
    )?;
    let from_value = pool.dispatch(PredicateId(1), RunId(101), Payload::Main { value: 12 })?;
    let hanging = pool.dispatch(PredicateId(1), RunId(102), Payload::Main { value: 99 })?;

    for pending in [from_state, from_value, hanging] {
        let response = pending.wait();
        match &response.outcome {
            Ok(square) => println!("run {} -> {}", response.run_id, square),
            Err(err) => println!("run {} failed: {}", response.run_id, err),
        }
    }
    println!("{:?}", pool.stats());

    println!("\n=== Property on a shared pool ===");
    let result = PropertyTestBuilder::with_config(TestConfig::default())
        .seed(3)
        .run_isolated(percentages, &pool, PredicateId(1));
    match result {
        Ok(success) => println!("✓ {} runs passed", success.num_runs),
        Err(failure) => println!("✗ {}", failure),
    }

    println!("\n=== Dedicated pool ===");
    let config = TestConfig {
        seed: Some(42),
        ..TestConfig::default()
    };
    match check_isolated(
        percentages,
        property(|x: i64| x < 50),
        config,
        WorkerConfig::default(),
    ) {
        Ok(_) => println!("✓ Unexpectedly passed"),
        Err(failure) => println!("✗ {} (counterexample {})", failure, failure.counterexample),
    }

    pool.shutdown();
    Ok(())
}
