//! Stable, adaptive merge sorts for slices: a galloping run-merging sort (timsort) and a
//! balanced recursive merge sort using at most `n / 2` auxiliary slots (spin sort).
//!
//! Both engines take an arbitrary "is less" predicate, which has to be a strict weak ordering.
//! Violating that may leave the slice unsorted, but always leaves it a permutation of its input.

pub mod algorithms;
pub mod data;

#[cfg(test)]
mod test;

use algorithms::Sort as _;

/// Sort `slice` stably with the default [`algorithms::spinsort::SpinSort`]
pub fn spinsort<T: Ord>(slice: &mut [T]) {
    <algorithms::spinsort::SpinSort>::sort(slice);
}

/// Sort `slice` stably by `is_less` with the default [`algorithms::spinsort::SpinSort`]
pub fn spinsort_by<T, F: FnMut(&T, &T) -> bool>(slice: &mut [T], is_less: F) {
    <algorithms::spinsort::SpinSort>::sort_by(slice, is_less);
}

/// Like [`spinsort_by`], but returns an error if the auxiliary buffer could not be allocated
pub fn try_spinsort_by<T, F: FnMut(&T, &T) -> bool>(
    slice: &mut [T],
    is_less: F,
) -> Result<(), std::collections::TryReserveError> {
    <algorithms::spinsort::SpinSort>::try_sort_by(slice, is_less)
}

/// Sort `slice` stably by `is_less`, using `buffer` as scratch space instead of allocating.
///
/// `buffer` has to hold at least `slice.len().div_ceil(2)` elements. Nothing stored in it is
/// ever dropped.
pub fn spinsort_by_with_buffer<T, F: FnMut(&T, &T) -> bool>(
    slice: &mut [T],
    is_less: F,
    buffer: &mut [std::mem::MaybeUninit<T>],
) {
    <algorithms::spinsort::SpinSort>::sort_with_buffer(slice, is_less, buffer);
}

/// Sort `slice` stably with the default [`algorithms::timsort::TimSort`]
pub fn timsort<T: Ord>(slice: &mut [T]) {
    <algorithms::timsort::TimSort>::sort(slice);
}

/// Sort `slice` stably by `is_less` with the default [`algorithms::timsort::TimSort`]
pub fn timsort_by<T, F: FnMut(&T, &T) -> bool>(slice: &mut [T], is_less: F) {
    <algorithms::timsort::TimSort>::sort_by(slice, is_less);
}

/// Like [`timsort_by`], but returns an error if the merge buffer could not be allocated
pub fn try_timsort_by<T, F: FnMut(&T, &T) -> bool>(
    slice: &mut [T],
    is_less: F,
) -> Result<(), std::collections::TryReserveError> {
    <algorithms::timsort::TimSort>::try_sort_by(slice, is_less)
}
