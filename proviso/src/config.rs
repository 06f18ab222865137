//! Configuration types for controlling test behavior and generation parameters.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Largest size handed to generators
pub const MAX_SIZE: u32 = 100;

/// Environment variable overriding the root seed
pub const SEED_ENV: &str = "PROVISO_SEED";
/// Environment variable overriding the number of runs
pub const NUM_RUNS_ENV: &str = "PROVISO_NUM_RUNS";
/// Environment variable overriding the shrink budget
pub const MAX_SHRINKS_ENV: &str = "PROVISO_MAX_SHRINKS";

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid number of runs (must be > 0)
    #[error("Invalid run count: {0} (must be > 0)")]
    InvalidRuns(usize),
    /// Invalid shrink budget (must be > 0)
    #[error("Invalid shrink iterations count: {0} (must be > 0)")]
    InvalidShrinkIterations(usize),
    /// Invalid timeout (must be > 0)
    #[error("Invalid timeout (must be > 0)")]
    InvalidTimeout,
    /// Size outside `0..=MAX_SIZE`
    #[error("Invalid size: {0} (must be at most 100)")]
    InvalidSize(u32),
    /// Invalid number of workers (must be > 0)
    #[error("Invalid worker count: {0} (must be > 0)")]
    InvalidWorkerCount(usize),
    /// An environment override could not be parsed
    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Size policy applied across the runs of one property
///
/// Small sizes keep generated values close to the simplest value of their domain,
/// larger sizes let them reach the extremities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeSchedule {
    /// Every run uses the same size
    Fixed(u32),
    /// Sizes grow linearly from near zero up to `max` over the runs
    Ramp { max: u32 },
}

impl Default for SizeSchedule {
    fn default() -> Self {
        SizeSchedule::Ramp { max: MAX_SIZE }
    }
}

impl SizeSchedule {
    /// Size to use for the run with the given index
    pub fn size_for_run(&self, run_index: usize, num_runs: usize) -> u32 {
        match *self {
            SizeSchedule::Fixed(size) => size.min(MAX_SIZE),
            SizeSchedule::Ramp { max } => {
                let max = u64::from(max.min(MAX_SIZE));
                if num_runs <= 1 {
                    return max as u32;
                }
                let scaled = (run_index as u64 + 1).saturating_mul(max) / num_runs as u64;
                scaled.min(max) as u32
            }
        }
    }

    /// Validate the schedule
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            SizeSchedule::Fixed(size) | SizeSchedule::Ramp { max: size } if size > MAX_SIZE => {
                Err(ConfigError::InvalidSize(size))
            }
            _ => Ok(()),
        }
    }
}

/// Configuration for individual property tests
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfig {
    /// Number of runs that must pass
    pub num_runs: usize,
    /// Maximum number of shrink candidates evaluated
    pub max_shrink_iterations: usize,
    /// Timeout for shrinking process
    pub shrink_timeout: Duration,
    /// Optional root seed for reproducible tests
    pub seed: Option<u64>,
    /// Size policy
    pub size: SizeSchedule,
    /// Discarded inputs tolerated per run before giving up
    pub max_skips_per_run: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            num_runs: 100,
            max_shrink_iterations: 1000,
            shrink_timeout: Duration::from_secs(10),
            seed: None,
            size: SizeSchedule::default(),
            max_skips_per_run: 100,
        }
    }
}

impl TestConfig {
    /// Create a new test configuration with validation
    pub fn new(
        num_runs: usize,
        max_shrink_iterations: usize,
        shrink_timeout: Duration,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            num_runs,
            max_shrink_iterations,
            shrink_timeout,
            seed,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the test configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_runs == 0 {
            return Err(ConfigError::InvalidRuns(self.num_runs));
        }
        if self.max_shrink_iterations == 0 {
            return Err(ConfigError::InvalidShrinkIterations(
                self.max_shrink_iterations,
            ));
        }
        if self.shrink_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        self.size.validate()
    }

    /// Total number of discarded inputs tolerated for the whole property
    pub fn skip_budget(&self) -> usize {
        self.max_skips_per_run.saturating_mul(self.num_runs)
    }

    /// Default configuration with the environment overrides applied
    ///
    /// Malformed overrides are logged and ignored.
    pub fn from_env() -> Self {
        match GlobalConfig::from_env() {
            Ok(global) => Self::default().merge_with_global(&global),
            Err(err) => {
                warn!(error = %err, "ignoring invalid environment overrides");
                Self::default()
            }
        }
    }

    /// Merge this configuration with a global configuration, with explicit global
    /// overrides taking precedence over defaults
    pub fn merge_with_global(self, global: &GlobalConfig) -> Self {
        Self {
            num_runs: global.num_runs.unwrap_or(self.num_runs),
            max_shrink_iterations: global
                .max_shrink_iterations
                .unwrap_or(self.max_shrink_iterations),
            seed: global.seed.or(self.seed),
            ..self
        }
    }
}

/// Configuration of the isolated worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Number of worker threads started for each registered predicate
    pub workers_per_predicate: usize,
    /// Allotted duration of one isolated run
    pub run_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers_per_predicate: num_cpus::get(),
            run_timeout: Duration::from_secs(5),
        }
    }
}

impl WorkerConfig {
    /// Create a new worker configuration with validation
    pub fn new(workers_per_predicate: usize, run_timeout: Duration) -> Result<Self, ConfigError> {
        let config = Self {
            workers_per_predicate,
            run_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the worker configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers_per_predicate == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.workers_per_predicate));
        }
        if self.run_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(())
    }
}

/// Process-wide overrides, typically read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Root seed forced on every property
    pub seed: Option<u64>,
    /// Run count forced on every property
    pub num_runs: Option<usize>,
    /// Shrink budget forced on every property
    pub max_shrink_iterations: Option<usize>,
}

impl GlobalConfig {
    /// Read overrides from `PROVISO_SEED`, `PROVISO_NUM_RUNS` and `PROVISO_MAX_SHRINKS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read overrides through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let config = Self {
            seed: parse_var(&lookup, SEED_ENV)?,
            num_runs: parse_var(&lookup, NUM_RUNS_ENV)?,
            max_shrink_iterations: parse_var(&lookup, MAX_SHRINKS_ENV)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_runs == Some(0) {
            return Err(ConfigError::InvalidRuns(0));
        }
        if self.max_shrink_iterations == Some(0) {
            return Err(ConfigError::InvalidShrinkIterations(0));
        }
        Ok(())
    }
}

fn parse_var<F, V>(lookup: &F, var: &'static str) -> Result<Option<V>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    V: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = TestConfig::default();
        assert_eq!(config.num_runs, 100);
        assert_eq!(config.max_shrink_iterations, 1000);
        assert_eq!(config.shrink_timeout, Duration::from_secs(10));
        assert!(config.seed.is_none());
        assert_eq!(config.size, SizeSchedule::Ramp { max: MAX_SIZE });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            TestConfig::new(0, 10, Duration::from_secs(1), None),
            Err(ConfigError::InvalidRuns(0))
        );
        assert_eq!(
            TestConfig::new(10, 0, Duration::from_secs(1), None),
            Err(ConfigError::InvalidShrinkIterations(0))
        );
        assert_eq!(
            TestConfig::new(10, 10, Duration::ZERO, None),
            Err(ConfigError::InvalidTimeout)
        );

        let config = TestConfig {
            size: SizeSchedule::Fixed(101),
            ..TestConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSize(101)));
    }

    #[test]
    fn test_ramp_schedule() {
        let ramp = SizeSchedule::Ramp { max: 100 };
        assert_eq!(ramp.size_for_run(0, 100), 1);
        assert_eq!(ramp.size_for_run(49, 100), 50);
        assert_eq!(ramp.size_for_run(99, 100), 100);
        // Resampled runs past the end never exceed the cap
        assert_eq!(ramp.size_for_run(500, 100), 100);
        assert_eq!(ramp.size_for_run(0, 1), 100);
    }

    #[test]
    fn test_fixed_schedule_is_clamped() {
        assert_eq!(SizeSchedule::Fixed(30).size_for_run(7, 10), 30);
        assert_eq!(SizeSchedule::Fixed(500).size_for_run(0, 10), MAX_SIZE);
    }

    #[test]
    fn test_worker_config_validation() {
        assert!(WorkerConfig::default().validate().is_ok());
        assert_eq!(
            WorkerConfig::new(0, Duration::from_secs(1)),
            Err(ConfigError::InvalidWorkerCount(0))
        );
        assert_eq!(
            WorkerConfig::new(2, Duration::ZERO),
            Err(ConfigError::InvalidTimeout)
        );
    }

    #[test]
    fn test_global_config_from_lookup() {
        let vars: HashMap<&str, &str> = [(SEED_ENV, "1234"), (NUM_RUNS_ENV, " 25 ")]
            .into_iter()
            .collect();
        let global = GlobalConfig::from_lookup(|var| vars.get(var).map(|v| v.to_string()))
            .expect("valid overrides");
        assert_eq!(global.seed, Some(1234));
        assert_eq!(global.num_runs, Some(25));
        assert_eq!(global.max_shrink_iterations, None);

        let merged = TestConfig::default().merge_with_global(&global);
        assert_eq!(merged.seed, Some(1234));
        assert_eq!(merged.num_runs, 25);
        assert_eq!(merged.max_shrink_iterations, 1000);
    }

    #[test]
    fn test_global_config_rejects_garbage() {
        let result = GlobalConfig::from_lookup(|var| {
            (var == SEED_ENV).then(|| "not-a-seed".to_string())
        });
        assert_eq!(
            result,
            Err(ConfigError::InvalidEnv {
                var: SEED_ENV,
                value: "not-a-seed".to_string()
            })
        );

        let zero_runs =
            GlobalConfig::from_lookup(|var| (var == NUM_RUNS_ENV).then(|| "0".to_string()));
        assert_eq!(zero_runs, Err(ConfigError::InvalidRuns(0)));
    }
}
