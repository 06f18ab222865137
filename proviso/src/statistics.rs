//! Counters collected while a property runs.

/// Run counters
///
/// Discarded inputs never count as passes or failures; they are only visible here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Runs whose predicate passed
    pub passed: usize,
    /// Runs whose predicate failed (at most one, since the first failure ends the property)
    pub failed: usize,
    /// Inputs discarded by a precondition and resampled
    pub skipped: usize,
    /// Shrink candidates evaluated
    pub shrink_attempts: usize,
    /// Shrink candidates adopted
    pub shrink_steps: usize,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs that counted toward the run budget
    pub fn runs(&self) -> usize {
        self.passed + self.failed
    }

    /// Inputs generated, discarded ones included
    pub fn generated(&self) -> usize {
        self.runs() + self.skipped
    }

    pub fn record_pass(&mut self) {
        self.passed += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_shrink(&mut self, attempts: usize, steps: usize) {
        self.shrink_attempts += attempts;
        self.shrink_steps += steps;
    }

    /// Fraction of generated inputs that were discarded
    pub fn skip_ratio(&self) -> f64 {
        match self.generated() {
            0 => 0.0,
            total => self.skipped as f64 / total as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let mut stats = RunStatistics::new();
        assert_eq!(stats.skip_ratio(), 0.0);

        stats.record_pass();
        stats.record_pass();
        stats.record_skip();
        stats.record_failure();
        stats.record_shrink(12, 3);

        assert_eq!(stats.runs(), 3);
        assert_eq!(stats.generated(), 4);
        assert_eq!(stats.shrink_attempts, 12);
        assert_eq!(stats.shrink_steps, 3);
        assert!((stats.skip_ratio() - 0.25).abs() < f64::EPSILON);
    }
}
