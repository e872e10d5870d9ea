//! Detection of presorted runs

use super::order::StrictWeakOrder as _;

/// Returns the largest `index`, such that `slice[..index]` is weakly increasing
pub fn weakly_increasing_prefix_len<T, F: FnMut(&T, &T) -> bool>(
    slice: &[T],
    is_less: &mut F,
) -> usize {
    match slice
        .windows(2)
        .position(|pair| is_less.less(&pair[1], &pair[0]))
    {
        // Found the first element breaking the sequence
        Some(index) => index + 1,
        // Sequence is not broken (or slice has less than two elements)
        None => slice.len(),
    }
}

/// Returns the largest `index`, such that `slice[..index]` is strictly decreasing
pub fn strictly_decreasing_prefix_len<T, F: FnMut(&T, &T) -> bool>(
    slice: &[T],
    is_less: &mut F,
) -> usize {
    match slice
        .windows(2)
        .position(|pair| !is_less.less(&pair[1], &pair[0]))
    {
        Some(index) => index + 1,
        None => slice.len(),
    }
}

/// Find the run at the start of `slice` and return its length.
///
/// A run is either weakly increasing or strictly decreasing. Strictly decreasing runs are
/// reversed in place, which keeps the sort stable since they cannot contain equal elements.
/// Afterwards `slice[..length]` is weakly increasing.
pub fn find_run_and_make_ascending<T, F: FnMut(&T, &T) -> bool>(
    slice: &mut [T],
    is_less: &mut F,
) -> usize {
    if slice.len() < 2 {
        return slice.len();
    }

    // The first pair decides the direction, so the scans start at the second element
    if is_less.less(&slice[1], &slice[0]) {
        let run_end = strictly_decreasing_prefix_len(&slice[1..], is_less) + 1;

        slice[..run_end].reverse();

        run_end
    } else {
        weakly_increasing_prefix_len(&slice[1..], is_less) + 1
    }
}
