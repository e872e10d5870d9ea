//! Contains various structs intended for testing purposes

use std::cell::{Cell, RefCell};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use rand::{Rng as _, SeedableRng as _, seq::SliceRandom as _};

use crate::algorithms::Sort;
use crate::data::{self, Data, KeyValue};

/// The seed shared by all tests
pub const TEST_SEED: u64 = 0xa8bf17eb656f828d;
/// The rng used by each test
pub type Rng = rand::rngs::SmallRng;

/// How often [`test_soundness`] and [`test_drop_accounting`] repeat
const SOUNDNESS_RUNS: usize = 5;

/// Generate the `Rng` for a test
pub fn test_rng() -> Rng {
    Rng::seed_from_u64(TEST_SEED)
}

/// A value that returns a random ordering when compared
#[derive(Debug, Clone)]
pub struct RandomOrdered(Rc<RefCell<Rng>>, usize);

impl RandomOrdered {
    /// Map an [`Iterator`] of values to `Self`, comparing with a shared [`Rng`]
    pub fn map_iter(iter: impl Iterator<Item = usize>, seed: u64) -> impl Iterator<Item = Self> {
        let rng = Rc::new(RefCell::new(Rng::seed_from_u64(seed)));

        iter.map(move |value| Self(rng.clone(), value))
    }

    pub fn value(&self) -> &usize {
        &self.1
    }
}

impl PartialEq for RandomOrdered {
    fn eq(&self, _other: &Self) -> bool {
        self.0.borrow_mut().random()
    }
}

impl Eq for RandomOrdered {}

impl PartialOrd for RandomOrdered {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RandomOrdered {
    fn cmp(&self, _other: &Self) -> std::cmp::Ordering {
        match self.0.borrow_mut().random_range(0..3) {
            0 => std::cmp::Ordering::Less,
            1 => std::cmp::Ordering::Equal,
            _ => std::cmp::Ordering::Greater,
        }
    }
}

/// A struct that panicks with the likelihood of `1 / LIKELIHOOD` when compared.
#[derive(Debug, Clone)]
pub struct MaybePanickingOrdered<const LIKELIHOOD: usize, T: Ord>(Rc<RefCell<Rng>>, T);

impl<const LIKELIHOOD: usize, T: Ord> MaybePanickingOrdered<LIKELIHOOD, T> {
    /// Map an [`Iterator`] of `T` to `Self` with a shared [`Rng`]
    pub fn map_iter(iter: impl Iterator<Item = T>, seed: u64) -> impl Iterator<Item = Self> {
        let rng = Rc::new(RefCell::new(Rng::seed_from_u64(seed)));

        iter.map(move |element| Self(rng.clone(), element))
    }

    pub fn value(&self) -> &T {
        &self.1
    }

    fn maybe_panic(&self) {
        if self.0.borrow_mut().random_range(0..LIKELIHOOD) == 0 {
            panic!("MaybePanickingOrdered panicked during comparison");
        }
    }
}

impl<const LIKELIHOOD: usize, T: Ord> PartialEq for MaybePanickingOrdered<LIKELIHOOD, T> {
    fn eq(&self, other: &Self) -> bool {
        self.maybe_panic();
        self.1.eq(&other.1)
    }
}

impl<const LIKELIHOOD: usize, T: Ord> Eq for MaybePanickingOrdered<LIKELIHOOD, T> {}

impl<const LIKELIHOOD: usize, T: Ord> PartialOrd for MaybePanickingOrdered<LIKELIHOOD, T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<const LIKELIHOOD: usize, T: Ord> Ord for MaybePanickingOrdered<LIKELIHOOD, T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.maybe_panic();
        self.1.cmp(&other.1)
    }
}

/// A Wrapper struct that tracks an original index with an ordered element,
/// used to test sort results for stability
#[derive(Debug, Clone)]
pub struct IndexedOrdered<T: Ord>(usize, T);

impl<T: Ord> IndexedOrdered<T> {
    /// Create a new iterator of `IndexedOrdered`, tracking the position of each element in `iter`
    pub fn map_iter(iter: impl Iterator<Item = T>) -> impl Iterator<Item = Self> {
        iter.enumerate()
            .map(|(index, element)| Self(index, element))
    }

    /// Check `slice` is sorted and check for stability, e.g. equal elements keeping initial ordering.
    pub fn is_stable_sorted(slice: &[Self]) -> bool {
        slice.windows(2).all(|pair| match pair[1].cmp(&pair[0]) {
            // Slice is not sorted
            std::cmp::Ordering::Less => false,
            // Elements are not stable
            std::cmp::Ordering::Equal => pair[0].0 < pair[1].0,
            std::cmp::Ordering::Greater => true,
        })
    }
}

impl<T: Ord> PartialEq for IndexedOrdered<T> {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}

impl<T: Ord> Eq for IndexedOrdered<T> {}

impl<T: Ord> PartialOrd for IndexedOrdered<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Ord> Ord for IndexedOrdered<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.1.cmp(&other.1)
    }
}

/// A value keeping track of how many of its kind are alive
#[derive(Debug)]
pub struct DropCounted {
    value: usize,
    live: Rc<Cell<isize>>,
}

impl DropCounted {
    /// Map an [`Iterator`] of values to `Self`, all counted in `live`
    pub fn map_iter(
        iter: impl Iterator<Item = usize>,
        live: &Rc<Cell<isize>>,
    ) -> impl Iterator<Item = Self> {
        iter.map(move |value| {
            live.set(live.get() + 1);
            Self {
                value,
                live: live.clone(),
            }
        })
    }
}

impl Drop for DropCounted {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl PartialEq for DropCounted {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for DropCounted {}

impl PartialOrd for DropCounted {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DropCounted {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

/// Assert that `values` is a permutation of `0..len`
fn assert_permutation(values: impl Iterator<Item = usize>, len: usize) {
    let mut values: Vec<usize> = values.collect();
    values.sort_unstable();
    assert!(values.into_iter().eq(0..len), "Elements were lost or duplicated");
}

/// Test the sort on an empty slice
pub fn test_empty<S: Sort>() {
    S::sort::<usize>(&mut []);
}

/// Test the sort on some random ordered slices and check they are sorted afterwords
pub fn test_random_sorted<const RUNS: usize, const TEST_SIZE: usize, S: Sort>() {
    let mut rng = test_rng();

    let mut values: Box<[usize]> = (0..TEST_SIZE).collect();

    for run in 0..RUNS {
        values.shuffle(&mut rng);
        S::sort(&mut values);
        assert!(values.is_sorted(), "Run {run} was not sorted");
    }

    let mut values: Box<[usize]> = std::iter::repeat_n(0..TEST_SIZE / 4, 4).flatten().collect();
    for run in 0..RUNS {
        values.shuffle(&mut rng);
        S::sort(&mut values);
        assert!(values.is_sorted(), "Run {run} was not sorted");
    }
}

/// Like [`test_random_sorted`] but additionally checks that the sort was stable
pub fn test_random_stable_sorted<const RUNS: usize, const TEST_SIZE: usize, S: Sort>() {
    assert!(S::IS_STABLE);

    let mut rng = test_rng();
    let mut values: Box<[usize]> = std::iter::repeat_n(0..TEST_SIZE / 4, 4).flatten().collect();
    let mut ordered_values: Box<[IndexedOrdered<usize>]>;

    for run in 0..RUNS {
        values.shuffle(&mut rng);
        ordered_values = IndexedOrdered::map_iter(values.iter().copied()).collect();
        S::sort(&mut ordered_values);
        assert!(
            IndexedOrdered::is_stable_sorted(&ordered_values),
            "Run {run} was not stable sorted"
        );
    }
}

/// Sort elements with inconsistent or panicking comparisons and check that no element gets
/// lost or duplicated, mostly useful for running under miri
pub fn test_soundness<const TEST_SIZE: usize, S: Sort>() {
    type Panicking<const LIKELIHOOD: usize> = MaybePanickingOrdered<LIKELIHOOD, usize>;

    let mut rng = test_rng();
    let mut values: Box<[usize]> = (0..TEST_SIZE).collect();

    for _ in 0..SOUNDNESS_RUNS {
        values.shuffle(&mut rng);

        let mut elements: Box<[RandomOrdered]> =
            RandomOrdered::map_iter(values.iter().copied(), rng.random()).collect();
        // The types are not actually unwind safe but must not trigger UB anyway
        let _ = catch_unwind(AssertUnwindSafe(|| S::sort(&mut elements)));
        assert_permutation(elements.iter().map(|element| *element.value()), TEST_SIZE);

        let mut elements: Box<[Panicking<TEST_SIZE>]> =
            Panicking::<TEST_SIZE>::map_iter(values.iter().copied(), rng.random()).collect();
        let _ = catch_unwind(AssertUnwindSafe(|| S::sort(&mut elements)));
        assert_permutation(elements.iter().map(|element| *element.value()), TEST_SIZE);
    }
}

/// Check that every element is dropped exactly once, after sorting normally as well as after a
/// comparison panicked
pub fn test_drop_accounting<const TEST_SIZE: usize, S: Sort>() {
    let mut rng = test_rng();
    let live = Rc::new(Cell::new(0));

    let mut values: Box<[usize]> = (0..TEST_SIZE).collect();
    values.shuffle(&mut rng);

    {
        let mut elements: Vec<DropCounted> =
            DropCounted::map_iter(values.iter().copied(), &live).collect();
        assert_eq!(live.get(), TEST_SIZE as isize);

        S::sort(&mut elements);
        assert!(elements.is_sorted());
        assert_eq!(live.get(), TEST_SIZE as isize);

        for _ in 0..SOUNDNESS_RUNS {
            elements.shuffle(&mut rng);

            let panic_after = rng.random_range(0..=TEST_SIZE);
            let mut comparisons = 0;
            let _ = catch_unwind(AssertUnwindSafe(|| {
                S::sort_by(&mut elements, |a, b| {
                    comparisons += 1;
                    if comparisons > panic_after {
                        panic!("Comparison {comparisons} panicked");
                    }
                    a < b
                })
            }));

            assert_eq!(live.get(), TEST_SIZE as isize);
            assert_permutation(elements.iter().map(|element| element.value), TEST_SIZE);
        }
    }

    assert_eq!(live.get(), 0);
}

/// Sort `values` once for every comparison the sort makes, letting exactly that comparison
/// panic, and check that each element survives every one of these panics exactly once
pub fn test_panic_at_every_comparison<S: Sort>(values: &[usize]) {
    let live = Rc::new(Cell::new(0));
    let len = values.len();

    let mut expected = values.to_vec();
    expected.sort_unstable();

    let mut total = 0;
    let mut elements: Vec<DropCounted> =
        DropCounted::map_iter(values.iter().copied(), &live).collect();
    S::sort_by(&mut elements, |a, b| {
        total += 1;
        a < b
    });
    drop(elements);

    for panic_at in 0..total {
        let mut elements: Vec<DropCounted> =
            DropCounted::map_iter(values.iter().copied(), &live).collect();

        let mut comparisons = 0;
        let result = catch_unwind(AssertUnwindSafe(|| {
            S::sort_by(&mut elements, |a, b| {
                if comparisons == panic_at {
                    panic!("Comparison {comparisons} panicked");
                }
                comparisons += 1;
                a < b
            })
        }));
        assert!(result.is_err(), "Comparison {panic_at} was never made");
        assert_eq!(live.get(), len as isize, "Panic at comparison {panic_at}");

        let mut remaining: Vec<usize> = elements.iter().map(|element| element.value).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, expected, "Panic at comparison {panic_at}");
    }

    assert_eq!(live.get(), 0);
}

/// Compare the sort against the standard library on every kind of generated data
pub fn test_patterns<const TEST_SIZE: usize, S: Sort>() {
    let mut rng = test_rng();

    for size in [0, 1, 2, 3, 17, TEST_SIZE / 10 + 3, TEST_SIZE] {
        check_pattern::<S, data::PermutationData>(size, &mut rng);
        check_pattern::<S, data::UniformData<4>>(size, &mut rng);
        check_pattern::<S, data::UniformData<1000>>(size, &mut rng);
        check_pattern::<S, data::RandomRunsConstData<100>>(size, &mut rng);
        check_pattern::<S, data::RandomRunsSqrtData>(size, &mut rng);
        check_pattern::<S, data::DescendingData>(size, &mut rng);
        check_pattern::<S, data::NoisyTailData<10>>(size, &mut rng);
        check_pattern::<S, data::NoisyTailData<100>>(size, &mut rng);
    }
}

fn check_pattern<S: Sort, D: Data<KeyValue>>(size: usize, rng: &mut Rng) {
    let mut values: Vec<KeyValue> = D::initialize(size, rng);
    let mut expected = values.clone();
    expected.sort();

    S::sort(&mut values);

    let message = || format!("{} on {size} {}", S::display(), std::any::type_name::<D>());
    if S::IS_STABLE {
        let pairs = |slice: &[KeyValue]| -> Vec<(u32, u64)> {
            slice.iter().map(|element| (element.key, element.value)).collect()
        };
        assert_eq!(pairs(&values), pairs(&expected), "{}", message());
    } else {
        assert_eq!(values, expected, "{}", message());
    }

    // Sorting again must not change anything
    let sorted = values.clone();
    S::sort(&mut values);
    assert!(
        values
            .iter()
            .zip(&sorted)
            .all(|(a, b)| a.key == b.key && a.value == b.value),
        "{} is not idempotent",
        message()
    );
}

/// Generate the common tests for each given [`Sort`], using `RUNS` and `TEST_SIZE` from the
/// calling module
macro_rules! sort_test_suite {
    ($($sort:ident),* $(,)?) => {
        $(
            ::paste::paste! {
                mod [< $sort:snake >] {
                    use super::*;

                    #[test]
                    fn empty() {
                        $crate::test::test_empty::<$sort>();
                    }

                    #[test]
                    fn random() {
                        $crate::test::test_random_sorted::<RUNS, TEST_SIZE, $sort>();
                    }

                    #[test]
                    fn random_stable() {
                        $crate::test::test_random_stable_sorted::<RUNS, TEST_SIZE, $sort>();
                    }

                    #[test]
                    fn patterns() {
                        $crate::test::test_patterns::<TEST_SIZE, $sort>();
                    }

                    #[test]
                    fn soundness() {
                        $crate::test::test_soundness::<TEST_SIZE, $sort>();
                    }

                    #[test]
                    fn drop_accounting() {
                        $crate::test::test_drop_accounting::<TEST_SIZE, $sort>();
                    }
                }
            }
        )*
    };
}

pub(crate) use sort_test_suite;
