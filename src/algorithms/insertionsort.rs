//! Multiple insertion sort implementations

use super::order::StrictWeakOrder as _;

/// The default `BINARY` parameter for `InsertionSort`
pub const DEFAULT_BINARY: bool = false;

/// The insertion [`super::Sort`]
///
/// With `BINARY`, insertion points are found by binary search, which bounds comparisons by
/// `O(n log n)`. Otherwise elements are moved left one step at a time, which is linear on
/// slices that are sorted up to a few displaced elements.
pub struct InsertionSort<const BINARY: bool = DEFAULT_BINARY>;

impl<const BINARY: bool> super::Sort for InsertionSort<BINARY> {
    const IS_STABLE: bool = true;

    fn display() -> String {
        <Self as super::PostfixSort>::display()
    }

    fn try_sort_by<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        mut is_less: F,
    ) -> Result<(), std::collections::TryReserveError> {
        <Self as super::PostfixSort>::sort(slice, 1, &mut is_less);

        Ok(())
    }
}

impl<const BINARY: bool> super::PostfixSort for InsertionSort<BINARY> {
    const IS_STABLE: bool = true;

    fn display() -> String {
        if BINARY {
            "binary-insertion-sort".to_string()
        } else {
            "insertion-sort".to_string()
        }
    }

    fn sort<T, F: FnMut(&T, &T) -> bool>(slice: &mut [T], split_point: usize, is_less: &mut F) {
        if slice.len() < 2 {
            return;
        }

        // An empty prefix is as sorted as a single element
        let split_point = split_point.max(1);

        if BINARY {
            binary_insertion_sort_with_partition(slice, split_point, is_less);
        } else {
            insertion_sort_with_partition(slice, split_point, is_less);
        }
    }
}

/// Sort slice using insertion sort, assuming that `slice[0..partition]` is already in order
fn insertion_sort_with_partition<T, F: FnMut(&T, &T) -> bool>(
    slice: &mut [T],
    partition_point: usize,
    is_less: &mut F,
) {
    assert!(
        partition_point <= slice.len(),
        "Partition point needs to be in bounds"
    );

    for i in partition_point..slice.len() {
        for j in (0..i).rev() {
            if is_less.less(&slice[j + 1], &slice[j]) {
                slice.swap(j + 1, j);
            } else {
                break;
            }
        }
    }
}

/// Sort slice using binary insertion sort, assuming that `slice[0..partition]` is already in order
fn binary_insertion_sort_with_partition<T, F: FnMut(&T, &T) -> bool>(
    slice: &mut [T],
    partition_point: usize,
    is_less: &mut F,
) {
    assert!(
        partition_point <= slice.len(),
        "Partition point needs to be in bounds"
    );

    for i in partition_point..slice.len() {
        // Insert behind all elements equal to slice[i], which keeps the sort stable
        let (sorted, rest) = slice.split_at(i);
        let j = sorted.partition_point(|element| is_less.greater_eq(&rest[0], element));

        // All comparisons are done, moving can't be interrupted by a panic
        slice[j..=i].rotate_right(1);
    }
}
