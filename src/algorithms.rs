//! The sorting algorithms and the traits tying them together

pub mod buffer;
pub mod insertionsort;
pub mod merging;
pub mod order;
pub mod runs;
pub mod spinsort;
pub mod timsort;

use std::collections::TryReserveError;

/// A (stable or unstable) sorting algorithm for slices
pub trait Sort {
    /// Whether the sort is stable
    const IS_STABLE: bool;

    /// String representation of this sort and its parameters
    fn display() -> String;

    /// Sort `slice` by the strict weak ordering `is_less`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the sort needs an auxiliary buffer and allocating it failed. The slice
    /// then holds a permutation of its input, which may already be partially sorted.
    fn try_sort_by<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        is_less: F,
    ) -> Result<(), TryReserveError>;

    /// Sort `slice` by the strict weak ordering `is_less`.
    ///
    /// Panics if allocating an auxiliary buffer fails.
    fn sort_by<T, F: FnMut(&T, &T) -> bool>(slice: &mut [T], is_less: F) {
        if let Err(error) = Self::try_sort_by(slice, is_less) {
            panic!("{} failed to allocate its buffer: {error}", Self::display());
        }
    }

    /// Sort `slice` by [`Ord`]
    fn sort<T: Ord>(slice: &mut [T]) {
        Self::sort_by(slice, T::lt);
    }
}

/// A sort that extends an already sorted prefix of a slice
pub trait PostfixSort {
    /// Whether the sort is stable
    const IS_STABLE: bool;

    /// String representation of this sort and its parameters
    fn display() -> String;

    /// Sort `slice` by `is_less`, assuming `slice[..split_point]` is already sorted
    fn sort<T, F: FnMut(&T, &T) -> bool>(slice: &mut [T], split_point: usize, is_less: &mut F);
}

/// Creates the buffers used by the merging sorts
pub trait BufGuardFactory {
    /// The buffer type created for elements of type `T`
    type Guard<T>: merging::BufGuard<T>;
}

/// A [`BufGuardFactory`] creating [`Vec`]s
#[derive(Debug, Clone, Copy)]
pub struct VecBufGuardFactory;

impl BufGuardFactory for VecBufGuardFactory {
    type Guard<T> = Vec<T>;
}

/// The default [`BufGuardFactory`] to use
pub type DefaultBufGuardFactory = VecBufGuardFactory;

/// The sorts of the standard library, used as a reference
pub struct StdSort<const STABLE: bool = true>;

impl<const STABLE: bool> Sort for StdSort<STABLE> {
    const IS_STABLE: bool = STABLE;

    fn display() -> String {
        if STABLE {
            "std-stable".to_string()
        } else {
            "std-unstable".to_string()
        }
    }

    fn try_sort_by<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        mut is_less: F,
    ) -> Result<(), TryReserveError> {
        let mut compare = |a: &T, b: &T| {
            if is_less(a, b) {
                std::cmp::Ordering::Less
            } else if is_less(b, a) {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        };

        if STABLE {
            slice.sort_by(&mut compare);
        } else {
            slice.sort_unstable_by(&mut compare);
        }

        Ok(())
    }
}
