//! Input data for measurements and tests, and counters for the `counters` feature

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::{Rng, seq::SliceRandom as _};
use rand_distr::Distribution as _;

/// A counter usable as a `static`
#[derive(Debug)]
pub struct GlobalCounter(AtomicU64);

impl GlobalCounter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn increase(&self, amount: u64) {
        self.0.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn read(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Reset to zero, returning the previous value
    pub fn reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}

impl Default for GlobalCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// An element type the [`Data`] generators can produce
pub trait Element: Ord + fmt::Debug + Sized {
    /// Create the element with sort key `key`, which was generated at position `index`
    fn from_key(key: u32, index: usize) -> Self;
}

impl Element for u32 {
    fn from_key(key: u32, _index: usize) -> Self {
        key
    }
}

impl Element for u64 {
    fn from_key(key: u32, _index: usize) -> Self {
        u64::from(key)
    }
}

/// A key with a payload, ordered by the key only, so that sorts have to keep equal keys stable
#[derive(Debug, Clone, Copy)]
pub struct KeyValue {
    pub key: u32,
    pub value: u64,
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for KeyValue {}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

impl Element for KeyValue {
    fn from_key(key: u32, index: usize) -> Self {
        Self {
            key,
            value: index as u64,
        }
    }
}

/// A trait for generalizing sorting data creation
pub trait Data<T: Element> {
    /// Initialize a vector of the given size
    fn initialize(size: usize, rng: &mut impl Rng) -> Vec<T>;
}

/// Build the elements from `keys`
fn from_keys<T: Element>(keys: impl IntoIterator<Item = u32>) -> Vec<T> {
    keys.into_iter()
        .enumerate()
        .map(|(index, key)| T::from_key(key, index))
        .collect()
}

/// Convert a slice length to a key, keys are `u32` to keep the elements small
fn key_bound(size: usize) -> u32 {
    u32::try_from(size).unwrap_or(u32::MAX)
}

/// A random permutation of `0..size`
#[derive(Debug)]
pub struct PermutationData;

impl<T: Element> Data<T> for PermutationData {
    fn initialize(size: usize, rng: &mut impl Rng) -> Vec<T> {
        let mut keys: Vec<u32> = (0..key_bound(size)).collect();
        keys.shuffle(rng);

        from_keys(keys)
    }
}

/// Uniformly random keys in `0..size / DIVISOR`, e.g. every key appears about `DIVISOR` times
#[derive(Debug)]
pub struct UniformData<const DIVISOR: usize>;

impl<T: Element, const DIVISOR: usize> Data<T> for UniformData<DIVISOR> {
    fn initialize(size: usize, rng: &mut impl Rng) -> Vec<T> {
        let bound = key_bound(size / DIVISOR.max(1)).max(1);

        from_keys((0..size).map(|_| rng.random_range(0..bound)))
    }
}

/// A random permutation split into sorted runs of geometrically distributed length with
/// mean `RUN_LENGTH`
#[derive(Debug)]
pub struct RandomRunsConstData<const RUN_LENGTH: usize>;

impl<T: Element, const RUN_LENGTH: usize> Data<T> for RandomRunsConstData<RUN_LENGTH> {
    fn initialize(size: usize, rng: &mut impl Rng) -> Vec<T> {
        from_keys(random_runs(size, RUN_LENGTH, rng))
    }
}

/// Like [`RandomRunsConstData`], with a mean run length of `sqrt(size)`
#[derive(Debug)]
pub struct RandomRunsSqrtData;

impl<T: Element> Data<T> for RandomRunsSqrtData {
    fn initialize(size: usize, rng: &mut impl Rng) -> Vec<T> {
        from_keys(random_runs(size, size.isqrt(), rng))
    }
}

/// A permutation of `0..size` consisting of sorted runs with mean length `run_length`
fn random_runs(size: usize, run_length: usize, rng: &mut impl Rng) -> Vec<u32> {
    let mut keys: Vec<u32> = (0..key_bound(size)).collect();
    keys.shuffle(rng);

    // Number of failures before the first success, shifted to start at one
    let lengths = rand_distr::Geometric::new(1.0 / run_length.max(1) as f64)
        .expect("The inverse of a positive run length is a probability");

    let mut start = 0;
    while start < keys.len() {
        let length = usize::try_from(lengths.sample(rng))
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        let end = start.saturating_add(length).min(keys.len());

        keys[start..end].sort_unstable();
        start = end;
    }

    keys
}

/// Strictly decreasing keys `size - 1` down to `0`
#[derive(Debug)]
pub struct DescendingData;

impl<T: Element> Data<T> for DescendingData {
    fn initialize(size: usize, _rng: &mut impl Rng) -> Vec<T> {
        from_keys((0..key_bound(size)).rev())
    }
}

/// Sorted keys `0..size`, with the last `TAIL` replaced by random keys
#[derive(Debug)]
pub struct NoisyTailData<const TAIL: usize>;

impl<T: Element, const TAIL: usize> Data<T> for NoisyTailData<TAIL> {
    fn initialize(size: usize, rng: &mut impl Rng) -> Vec<T> {
        let bound = key_bound(size).max(1);
        let sorted = size.saturating_sub(TAIL);

        from_keys(
            (0..key_bound(sorted))
                .chain(std::iter::repeat_with(|| rng.random_range(0..bound)).take(size - sorted)),
        )
    }
}
