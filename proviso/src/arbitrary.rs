//! Generation and shrinking abstraction shared by every generator.
//!
//! An [`Arbitrary`] turns a [`RandomSource`] and a size into a [`Value`]: the generated
//! input paired with the means to compute its shrink candidates. Candidates are computed
//! on demand and can be recomputed at will, so a shrink search can be replayed from the
//! original value alone.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PropertyError;
use crate::rng::RandomSource;

/// Lazily computed, ordered sequence of shrink candidates
pub type Shrinks<T> = Box<dyn Iterator<Item = Value<T>> + Send>;

type Shrinker<T> = Arc<dyn Fn() -> Shrinks<T> + Send + Sync>;

/// One generated instance plus its shrink capability
pub struct Value<T> {
    value: T,
    shrinker: Option<Shrinker<T>>,
}

impl<T: 'static> Value<T> {
    /// Pair a value with the function computing its shrink candidates
    ///
    /// Every candidate must be strictly simpler than `value` under an ordering with no
    /// infinite descending chain, which is what guarantees that shrinking terminates.
    pub fn new<F>(value: T, shrinker: F) -> Self
    where
        F: Fn() -> Shrinks<T> + Send + Sync + 'static,
    {
        Self {
            value,
            shrinker: Some(Arc::new(shrinker)),
        }
    }

    /// Shrink candidates, simplest first
    pub fn shrink(&self) -> Shrinks<T> {
        match &self.shrinker {
            Some(shrinker) => shrinker(),
            None => Box::new(std::iter::empty()),
        }
    }
}

impl<T> Value<T> {
    /// A value that has no simpler candidates
    pub fn unshrinkable(value: T) -> Self {
        Self {
            value,
            shrinker: None,
        }
    }

    /// The generated value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Unwrap the generated value
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Clone> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            shrinker: self.shrinker.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("value", &self.value)
            .field("shrinkable", &self.shrinker.is_some())
            .finish()
    }
}

/// A generator of randomized values for one domain, paired with a shrinking strategy
pub trait Arbitrary<T> {
    /// Generate a value from the random source at the given size
    fn generate(&self, random: &mut RandomSource, size: u32) -> Value<T>;
}

impl<T, A: Arbitrary<T> + ?Sized> Arbitrary<T> for &A {
    fn generate(&self, random: &mut RandomSource, size: u32) -> Value<T> {
        (**self).generate(random, size)
    }
}

impl<T, A: Arbitrary<T> + ?Sized> Arbitrary<T> for Arc<A> {
    fn generate(&self, random: &mut RandomSource, size: u32) -> Value<T> {
        (**self).generate(random, size)
    }
}

/// Reconstructable description of one generated input
///
/// Regenerating from `seed` at `size` and then following `path` (the index of the
/// adopted candidate at each shrink step) yields the described value again. Unlike the
/// value itself, the descriptor can always cross an isolation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationState {
    pub seed: u64,
    pub size: u32,
    #[serde(default)]
    pub path: Vec<usize>,
}

impl GenerationState {
    /// Descriptor of a freshly generated value
    pub fn new(seed: u64, size: u32) -> Self {
        Self {
            seed,
            size,
            path: Vec::new(),
        }
    }

    /// Descriptor of the `index`-th shrink candidate of this value
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self {
            seed: self.seed,
            size: self.size,
            path,
        }
    }

    /// Descriptor following `path` from this value
    pub fn descendant(&self, path: &[usize]) -> Self {
        let mut state = self.clone();
        state.path.extend_from_slice(path);
        state
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seed={} size={}", self.seed, self.size)?;
        if !self.path.is_empty() {
            let path: Vec<String> = self.path.iter().map(|i| i.to_string()).collect();
            write!(f, " path={}", path.join(":"))?;
        }
        Ok(())
    }
}

/// Rebuild the value described by `state`
pub fn replay<T, A>(arbitrary: &A, state: &GenerationState) -> Result<Value<T>, PropertyError>
where
    T: 'static,
    A: Arbitrary<T> + ?Sized,
{
    let mut random = RandomSource::new(state.seed);
    let mut current = arbitrary.generate(&mut random, state.size);
    for (depth, &index) in state.path.iter().enumerate() {
        current = current
            .shrink()
            .nth(index)
            .ok_or_else(|| PropertyError::ReplayFailed {
                message: format!(
                    "shrink index {} at depth {} does not exist ({})",
                    index, depth, state
                ),
            })?;
    }
    Ok(current)
}
