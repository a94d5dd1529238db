//! Small sampling helpers shared by the generators
//!
//! Every function takes the caller's generator; nothing here owns random state.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::config::{CountRange, RealRange};
use crate::error::ConfigError;

/// Uniform sample from an inclusive real range. A degenerate range yields its bound.
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R, (low, high): RealRange) -> f64 {
    between(rng, low, high)
}

/// Uniform sample in `[low, high]`; returns the midpoint when the interval is empty
pub(crate) fn between<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if low < high {
        rng.gen_range(low..=high)
    } else {
        (low + high) / 2.0
    }
}

/// Uniform sample from an inclusive count range
pub(crate) fn count<R: Rng + ?Sized>(rng: &mut R, (low, high): CountRange) -> usize {
    if low < high {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

/// A weighted choice over a fixed list of options, built once per generator
#[derive(Debug, Clone)]
pub(crate) struct WeightedChoice<T> {
    options: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T: Copy> WeightedChoice<T> {
    /// Build from `(option, weight)` pairs; `field` names the config key on error
    pub(crate) fn new(
        field: &str,
        entries: impl IntoIterator<Item = (T, f64)>,
    ) -> Result<Self, ConfigError> {
        let (options, weights): (Vec<T>, Vec<f64>) = entries.into_iter().unzip();
        let index = WeightedIndex::new(&weights)
            .map_err(|e| ConfigError::invalid(field, e.to_string()))?;
        Ok(Self { options, index })
    }

    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        self.options[self.index.sample(rng)]
    }
}
