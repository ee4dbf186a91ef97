//! Randomness source shared by identity generation, page selection and delays.
//!
//! Production code uses [`ThreadRandom`]; tests inject [`SeededRandom`] so a
//! visit (and the delays around it) is reproducible.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

/// Source of randomness, lent out as a `RngCore` so callers can use any of
/// `rand`'s samplers.
pub trait RandomSource: Send + Sync {
    /// Run `f` with the underlying generator.
    fn with_rng(&self, f: &mut dyn FnMut(&mut dyn RngCore));

    /// Uniform value in `[low, high]`. Returns `low` when `high <= low`.
    fn between(&self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        let mut value = low;
        self.with_rng(&mut |rng: &mut dyn RngCore| value = rng.gen_range(low..=high));
        value
    }
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn with_rng(&self, f: &mut dyn FnMut(&mut dyn RngCore)) {
        f(&mut rand::thread_rng());
    }
}

/// Deterministic generator for tests and reproducible runs.
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
    fn with_rng(&self, f: &mut dyn FnMut(&mut dyn RngCore)) {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut *rng);
    }
}

/// Pick one element uniformly. Panics if `items` is empty.
pub fn pick<'a, T>(rng: &dyn RandomSource, items: &'a [T]) -> &'a T {
    let mut chosen = None;
    rng.with_rng(&mut |r: &mut dyn RngCore| chosen = items.choose(r));
    chosen.expect("pick from an empty slice")
}

/// Shuffle in place.
pub fn shuffle<T>(rng: &dyn RandomSource, items: &mut [T]) {
    rng.with_rng(&mut |r: &mut dyn RngCore| items.shuffle(r));
}
