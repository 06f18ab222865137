//! Bounded integer generator.

use serde::{Deserialize, Serialize};

use crate::arbitrary::{Arbitrary, Shrinks, Value};
use crate::error::ConstraintError;
use crate::rng::RandomSource;

/// Default lower bound, `-2^31`
pub const DEFAULT_MIN: i64 = -(1 << 31);
/// Default upper bound, `2^31 - 1`
pub const DEFAULT_MAX: i64 = (1 << 31) - 1;
/// Default fraction of draws steered to corner values
pub const DEFAULT_CORNER_BIAS: f64 = 0.1;

/// Largest magnitude accepted from floating-point bounds, `2^53`
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

/// Optional bounds of an integer generator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegerConstraints {
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
}

impl IntegerConstraints {
    /// Constraints with both bounds set
    pub fn between(min: i64, max: i64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Set the lower bound
    pub fn with_min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    /// Set the upper bound
    pub fn with_max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    /// Build constraints from floating-point bounds, as found in loosely typed
    /// configuration sources
    ///
    /// Each bound must be a finite integer no larger in magnitude than `2^53`.
    pub fn from_f64_bounds(min: Option<f64>, max: Option<f64>) -> Result<Self, ConstraintError> {
        Ok(Self {
            min: min.map(|value| exact_integer("min", value)).transpose()?,
            max: max.map(|value| exact_integer("max", value)).transpose()?,
        })
    }

    /// Apply defaults and check that `min <= max`
    pub fn resolve(self) -> Result<(i64, i64), ConstraintError> {
        let min = self.min.unwrap_or(DEFAULT_MIN);
        let max = self.max.unwrap_or(DEFAULT_MAX);
        if min > max {
            return Err(ConstraintError::InvertedBounds { min, max });
        }
        Ok((min, max))
    }
}

fn exact_integer(field: &'static str, value: f64) -> Result<i64, ConstraintError> {
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > MAX_EXACT_F64 {
        return Err(ConstraintError::NonIntegerBound { field, value });
    }
    Ok(value as i64)
}

/// Generator of integers within `[min, max]`
///
/// A configurable fraction of draws lands on a corner of the range (zero when it is in
/// range, the bounds, and their inner neighbours); the rest are uniform over the part of
/// the range reachable at the current size. Shrinking converges on the in-range value
/// nearest to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegerArbitrary {
    min: i64,
    max: i64,
    corner_bias: f64,
}

impl IntegerArbitrary {
    /// Create a generator over `[min, max]`
    pub fn new(min: i64, max: i64) -> Result<Self, ConstraintError> {
        Self::from_constraints(IntegerConstraints::between(min, max))
    }

    /// Create a generator from optional bounds
    pub fn from_constraints(constraints: IntegerConstraints) -> Result<Self, ConstraintError> {
        let (min, max) = constraints.resolve()?;
        Ok(Self {
            min,
            max,
            corner_bias: DEFAULT_CORNER_BIAS,
        })
    }

    /// Change the fraction of draws steered to corner values
    pub fn with_corner_bias(mut self, corner_bias: f64) -> Result<Self, ConstraintError> {
        if !(0.0..=1.0).contains(&corner_bias) {
            return Err(ConstraintError::InvalidBias(corner_bias));
        }
        self.corner_bias = corner_bias;
        Ok(self)
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn corner_bias(&self) -> f64 {
        self.corner_bias
    }

    /// The in-range value nearest to zero, which shrinking converges on
    pub fn target(&self) -> i64 {
        0.clamp(self.min, self.max)
    }

    /// Boundary values favoured by generation, without duplicates
    pub fn corners(&self) -> Vec<i64> {
        let mut corners = Vec::with_capacity(5);
        let mut push = |value: i64| {
            if (self.min..=self.max).contains(&value) && !corners.contains(&value) {
                corners.push(value);
            }
        };
        push(0);
        push(self.min);
        push(self.max);
        push(self.min.saturating_add(1));
        push(self.max.saturating_sub(1));
        corners
    }

    /// Wrap a value of this range so that it shrinks toward [`Self::target`]
    pub fn shrinkable(&self, value: i64) -> Value<i64> {
        let target = self.target();
        Value::new(value, move || shrink_toward(value, target, true))
    }
}

impl Arbitrary<i64> for IntegerArbitrary {
    fn generate(&self, random: &mut RandomSource, size: u32) -> Value<i64> {
        let value = if random.chance(self.corner_bias) {
            let corners = self.corners();
            let index = random.uniform_in(0, corners.len() as i64 - 1) as usize;
            corners[index]
        } else {
            random.uniform_sized(self.min, self.max, self.target(), size)
        };
        self.shrinkable(value)
    }
}

/// Create an integer generator, failing fast on malformed constraints
pub fn integer(constraints: IntegerConstraints) -> Result<IntegerArbitrary, ConstraintError> {
    IntegerArbitrary::from_constraints(constraints)
}

/// Candidates between `target` and `current`, each strictly closer to `target`
///
/// The first candidate is `target` itself when `try_target_first` is set; the others
/// remove half, a quarter, an eighth... of the gap. Each candidate remembers the
/// previous one as the floor of its own shrink, so that floor is never proposed again
/// and successive searches bisect toward the smallest value that still fails.
fn shrink_toward(current: i64, target: i64, try_target_first: bool) -> Shrinks<i64> {
    let gap = i128::from(current) - i128::from(target);
    if gap == 0 {
        return Box::new(std::iter::empty());
    }
    let first = if try_target_first { gap } else { gap / 2 };
    let mut previous = target;
    Box::new(
        std::iter::successors(Some(first), |remove| Some(remove / 2))
            .take_while(|remove| *remove != 0)
            .map(move |remove| {
                // Between target and current, hence within i64
                let next = (i128::from(current) - remove) as i64;
                let floor = previous;
                previous = next;
                Value::new(next, move || shrink_toward(next, floor, false))
            }),
    )
}
