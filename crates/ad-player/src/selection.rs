//! Creative selection.
//!
//! Creatives and non-linear variants are picked uniformly at random from their
//! candidate list. The random source is injected so tests can force a pick.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

/// Source of candidate indices.
pub trait RandomSource: Send + Sync {
    /// Return an index in `0..len`. Only called with `len > 0`.
    fn index(&self, len: usize) -> usize;
}

/// Pick one candidate uniformly at random.
///
/// Returns `None` for an empty slice. Out-of-range indices from a misbehaving
/// source are clamped to the last candidate.
pub fn select_from<'a, T>(random: &dyn RandomSource, candidates: &'a [T]) -> Option<&'a T> {
    if candidates.is_empty() {
        return None;
    }
    let index = random.index(candidates.len()).min(candidates.len() - 1);
    candidates.get(index)
}

/// Thread-local RNG, the production default.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

/// Reproducible picks from a fixed seed.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index(&self, len: usize) -> usize {
        self.rng.lock().random_range(0..len)
    }
}

/// Always picks the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedIndex(pub usize);

impl RandomSource for FixedIndex {
    fn index(&self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}
