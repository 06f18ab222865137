//! Basic usage examples demonstrating the core Proviso API
//!
//! Generates bounded integers, checks properties against them and shows how a failure
//! is shrunk and reported.

use proviso::{
    IntegerConstraints, Property, PropertyError, PropertyTestBuilder, SizeSchedule, TestConfig,
    check, check_with_config, fallible, integer, pre, property, replay,
};
use std::time::Duration;

// Example 1: a property that holds
fn example_1_passing_property() {
    println!("=== Example 1: Passing Property ===");

    struct AbsoluteValueProperty;
    impl Property<i64> for AbsoluteValueProperty {
        type Output = ();

        fn test(&self, input: i64) -> Result<Self::Output, PropertyError> {
            if input.abs() >= 0 {
                Ok(())
            } else {
                Err(PropertyError::property_failed(format!(
                    "abs({}) is negative",
                    input
                )))
            }
        }
    }

    let arbitrary = match integer(IntegerConstraints::between(-1000, 1000)) {
        Ok(arbitrary) => arbitrary,
        Err(err) => {
            println!("✗ Invalid constraints: {}", err);
            return;
        }
    };
    match check(arbitrary, AbsoluteValueProperty) {
        Ok(success) => println!(
            "✓ Property held for {} runs (seed {})",
            success.num_runs, success.seed
        ),
        Err(failure) => println!("✗ {}", failure),
    }
}

// Example 2: a failing property is shrunk to its boundary
fn example_2_shrinking() {
    println!("\n=== Example 2: Shrinking ===");

    let Ok(percentages) = integer(IntegerConstraints::between(0, 100)) else {
        return;
    };
    let config = TestConfig {
        seed: Some(42),
        shrink_timeout: Duration::from_secs(5),
        ..TestConfig::default()
    };

    match check_with_config(percentages, property(|x: i64| x < 50), config) {
        Ok(_) => println!("✓ Unexpectedly passed"),
        Err(failure) => {
            print!("{}", failure.detailed_report());

            // The counterexample descriptor rebuilds the minimal input on its own
            if let Ok(rebuilt) = replay(&percentages, &failure.counterexample) {
                println!("Replayed counterexample: {}", rebuilt.value());
            }
        }
    }
}

// Example 3: preconditions and the builder
fn example_3_preconditions() {
    println!("\n=== Example 3: Preconditions ===");

    let Ok(arbitrary) = integer(IntegerConstraints::between(-100, 100)) else {
        return;
    };
    let result = PropertyTestBuilder::new()
        .num_runs(200)
        .seed(7)
        .size(SizeSchedule::Fixed(100))
        .run(
            arbitrary,
            fallible(|x: i64| -> Result<i64, PropertyError> {
                pre(x != 0)?;
                Ok(1000 / x)
            }),
        );

    match result {
        Ok(success) => println!(
            "✓ {} runs passed, {} inputs discarded",
            success.stats.passed, success.stats.skipped
        ),
        Err(failure) => println!("✗ {}", failure),
    }
}

fn main() {
    example_1_passing_property();
    example_2_shrinking();
    example_3_preconditions();
}
