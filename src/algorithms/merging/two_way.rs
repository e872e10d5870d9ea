//! Merging two adjacent or separate sorted runs

use std::collections::TryReserveError;
use std::mem::MaybeUninit;

use super::{BufGuard, MergingDropGuard, Run};
use crate::algorithms::order::StrictWeakOrder as _;

/// The default `MIN_GALLOP` to use
pub const DEFAULT_MIN_GALLOP: usize = 7;

/// A galloping merge procedure, merging adjacent runs with a buffer for the shorter of them.
///
/// The galloping threshold adapts to the data and is kept across all merges done with the same
/// value, so one `Galloping` should be used per sort.
#[derive(Debug, Clone, Copy)]
pub struct Galloping<const MIN_GALLOP: usize = DEFAULT_MIN_GALLOP> {
    min_gallop: usize,
}

impl<const MIN_GALLOP: usize> Default for Galloping<MIN_GALLOP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MIN_GALLOP: usize> Galloping<MIN_GALLOP> {
    pub fn new() -> Self {
        Self {
            min_gallop: MIN_GALLOP,
        }
    }

    /// The current number of consecutive wins needed to switch into galloping mode
    pub fn min_gallop(&self) -> usize {
        self.min_gallop
    }

    pub fn display() -> String {
        format!("galloping (min-gallop = {MIN_GALLOP})")
    }

    /// Merge the two sorted runs `0..run_length` and `run_length..slice.len()`.
    ///
    /// Elements already in place at both ends are skipped by galloping, the rest is merged
    /// with `buffer` holding the shorter remaining run. `buffer` is replaced by a bigger one
    /// if it is too small, but never grows beyond half of the merged elements.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the buffer had to grow and the allocation failed. `slice` is unchanged
    /// in that case.
    pub fn merge<T, B: BufGuard<T>, F: FnMut(&T, &T) -> bool>(
        &mut self,
        slice: &mut [T],
        run_length: usize,
        buffer: &mut B,
        is_less: &mut F,
    ) -> Result<(), TryReserveError> {
        assert!(
            run_length <= slice.len(),
            "Split point needs to be in bounds"
        );

        if run_length == 0 || run_length == slice.len() {
            return Ok(());
        }

        // Elements of the left run not greater than the first right element are in place
        let start = gallop_right(&slice[run_length], &slice[..run_length], 0, is_less);
        if start == run_length {
            return Ok(());
        }

        // Elements of the right run not less than the last left element are in place
        let end = gallop_left(
            &slice[run_length - 1],
            &slice[run_length..],
            slice.len() - run_length - 1,
            is_less,
        ) + run_length;
        if end == run_length {
            // Only possible if `is_less` is not a strict weak ordering
            return Ok(());
        }

        let slice = &mut slice[start..end];
        let run_length = run_length - start;
        let shorter = std::cmp::min(run_length, slice.len() - run_length);

        #[cfg(feature = "counters")]
        {
            super::MERGE_SLICE_COUNTER.increase(slice.len() as u64);
            super::MERGE_BUFFER_COUNTER.increase(shorter as u64);
        }

        if buffer.as_uninit_slice_mut().len() < shorter {
            let capacity = shorter.next_power_of_two().min(slice.len() / 2).max(shorter);
            *buffer = B::try_with_capacity(capacity)?;
        }

        if run_length <= slice.len() - run_length {
            self.merge_low(slice, run_length, buffer.as_uninit_slice_mut(), is_less);
        } else {
            self.merge_high(slice, run_length, buffer.as_uninit_slice_mut(), is_less);
        }

        Ok(())
    }

    /// Merge `slice[..run_length]` and `slice[run_length..]`, copying the left run into
    /// `buffer` and filling `slice` from the front.
    ///
    /// Requires `slice[run_length] < slice[0]` and `slice[run_length - 1] > slice[len - 1]`,
    /// as established by the galloping in [`Self::merge`].
    fn merge_low<T, F: FnMut(&T, &T) -> bool>(
        &mut self,
        slice: &mut [T],
        run_length: usize,
        buffer: &mut [MaybeUninit<T>],
        is_less: &mut F,
    ) {
        assert!(
            buffer.len() >= run_length,
            "We need at least run_length buffer size"
        );
        assert!(
            (1..slice.len()).contains(&run_length),
            "Split point has to be within slice bounds"
        );

        let min_gallop = &mut self.min_gallop;

        // SAFETY: The guard owns the elements of both runs from here on. Every element is
        // copied to output exactly once, either by the merge or by the guard when a
        // comparison panics, and output is written strictly behind what has been read from
        // the right run.
        unsafe {
            // Copy start into temporary buffer
            std::ptr::copy_nonoverlapping(
                slice.as_ptr(),
                buffer.as_mut_ptr().cast::<T>(),
                run_length,
            );

            let slice_ptrs = slice.as_mut_ptr_range();
            let runs = [
                // Left run in buffer
                Run::from_uninit(buffer, run_length),
                // Right run at the end of slice
                Run(slice_ptrs.start.add(run_length)..slice_ptrs.end),
            ];
            let output = Run(slice_ptrs);

            let mut guard = MergingDropGuard::new(runs, output);

            let &mut [ref mut left, ref mut right] = &mut guard.runs;
            let output = &mut guard.output;

            (|| {
                right.copy_nonoverlapping_prefix_to(output, 1);

                // Right side only had one element, only need to copy the left side
                if right.is_empty() {
                    left.copy_nonoverlapping_prefix_to(output, left.len());

                    return;
                }

                // Left side only has one element, copy the rest of the right side and then the one
                // element from the left side
                if left.len() == 1 {
                    right.copy_prefix_to(output, right.len());
                    left.copy_nonoverlapping_prefix_to(output, 1);

                    return;
                }

                'outer: loop {
                    let mut count1 = 0;
                    let mut count2 = 0;

                    // One element at a time until one side wins often enough
                    while (count1 | count2) < *min_gallop {
                        debug_assert!(left.len() > 1 && !right.is_empty());

                        if is_less.less(&*right.start(), &*left.start()) {
                            right.copy_nonoverlapping_prefix_to(output, 1);
                            count2 += 1;
                            count1 = 0;

                            if right.is_empty() {
                                break 'outer;
                            }
                        } else {
                            left.copy_nonoverlapping_prefix_to(output, 1);
                            count1 += 1;
                            count2 = 0;

                            if left.len() == 1 {
                                break 'outer;
                            }
                        }
                    }

                    // Gallop as long as it pays off
                    loop {
                        debug_assert!(left.len() > 1 && !right.is_empty());

                        count1 = gallop_right(&*right.start(), left.as_slice(), 0, is_less);
                        if count1 != 0 {
                            left.copy_nonoverlapping_prefix_to(output, count1);

                            if left.len() <= 1 {
                                break 'outer;
                            }
                        }

                        right.copy_nonoverlapping_prefix_to(output, 1);

                        if right.is_empty() {
                            break 'outer;
                        }

                        count2 = gallop_left(&*left.start(), right.as_slice(), 0, is_less);
                        if count2 != 0 {
                            right.copy_prefix_to(output, count2);

                            if right.is_empty() {
                                break 'outer;
                            }
                        }

                        left.copy_nonoverlapping_prefix_to(output, 1);

                        if left.len() == 1 {
                            break 'outer;
                        }

                        *min_gallop = min_gallop.saturating_sub(1);

                        if count1 < MIN_GALLOP && count2 < MIN_GALLOP {
                            break;
                        }
                    }

                    // Penalize leaving galloping mode
                    *min_gallop += 2;
                }

                *min_gallop = std::cmp::max(*min_gallop, 1);

                if left.len() == 1 {
                    debug_assert!(!right.is_empty());
                    right.copy_prefix_to(output, right.len());
                    left.copy_nonoverlapping_prefix_to(output, 1);
                } else {
                    debug_assert!(!left.is_empty() && right.is_empty());
                    left.copy_nonoverlapping_prefix_to(output, left.len());
                }
            })();

            // Guard should be empty at this point
            debug_assert!(guard.is_empty());
            guard.disarm();
        }
    }

    /// Merge `slice[..run_length]` and `slice[run_length..]`, copying the right run into
    /// `buffer` and filling `slice` from the back.
    ///
    /// Has the same requirements as [`Self::merge_low`].
    fn merge_high<T, F: FnMut(&T, &T) -> bool>(
        &mut self,
        slice: &mut [T],
        run_length: usize,
        buffer: &mut [MaybeUninit<T>],
        is_less: &mut F,
    ) {
        assert!(
            buffer.len() >= slice.len() - run_length,
            "We need at least slice.len() - run_length buffer size"
        );
        assert!(
            (1..slice.len()).contains(&run_length),
            "Split point has to be within slice bounds"
        );

        let min_gallop = &mut self.min_gallop;

        // SAFETY: Mirrors merge_low, output is written strictly behind (from the back) what has
        // been read from the left run.
        unsafe {
            // Copy suffix into temporary buffer
            std::ptr::copy_nonoverlapping(
                slice.as_ptr().add(run_length),
                buffer.as_mut_ptr().cast::<T>(),
                slice.len() - run_length,
            );

            let slice_ptrs = slice.as_mut_ptr_range();
            let runs = [
                // Left run at the start of slice
                Run(slice_ptrs.start..slice_ptrs.start.add(run_length)),
                // Right run in buffer
                Run::from_uninit(buffer, slice.len() - run_length),
            ];
            let output = Run(slice_ptrs);

            let mut guard = MergingDropGuard::new(runs, output);

            let &mut [ref mut left, ref mut right] = &mut guard.runs;
            let output = &mut guard.output;

            (|| {
                left.copy_nonoverlapping_suffix_to(output, 1);

                // Left side only had one element, only need to copy the right side
                if left.is_empty() {
                    right.copy_nonoverlapping_suffix_to(output, right.len());

                    return;
                }

                // Right side only has one element, copy the rest of the left side and then the
                // one element from the right side
                if right.len() == 1 {
                    left.copy_suffix_to(output, left.len());
                    right.copy_nonoverlapping_suffix_to(output, 1);

                    return;
                }

                'outer: loop {
                    let mut count1 = 0;
                    let mut count2 = 0;

                    while (count1 | count2) < *min_gallop {
                        debug_assert!(right.len() > 1 && !left.is_empty());

                        if is_less.less(&*right.end().sub(1), &*left.end().sub(1)) {
                            left.copy_nonoverlapping_suffix_to(output, 1);
                            count1 += 1;
                            count2 = 0;

                            if left.is_empty() {
                                break 'outer;
                            }
                        } else {
                            right.copy_nonoverlapping_suffix_to(output, 1);
                            count1 = 0;
                            count2 += 1;

                            if right.len() == 1 {
                                break 'outer;
                            }
                        }
                    }

                    loop {
                        debug_assert!(right.len() > 1 && !left.is_empty());

                        let left_len = left.len();
                        count1 = left_len
                            - gallop_right(
                                &*right.end().sub(1),
                                left.as_slice(),
                                left_len - 1,
                                is_less,
                            );
                        if count1 != 0 {
                            left.copy_suffix_to(output, count1);

                            if left.is_empty() {
                                break 'outer;
                            }
                        }

                        right.copy_nonoverlapping_suffix_to(output, 1);

                        if right.len() == 1 {
                            break 'outer;
                        }

                        let right_len = right.len();
                        count2 = right_len
                            - gallop_left(
                                &*left.end().sub(1),
                                right.as_slice(),
                                right_len - 1,
                                is_less,
                            );
                        if count2 != 0 {
                            right.copy_nonoverlapping_suffix_to(output, count2);

                            if right.len() <= 1 {
                                break 'outer;
                            }
                        }

                        left.copy_nonoverlapping_suffix_to(output, 1);

                        if left.is_empty() {
                            break 'outer;
                        }

                        *min_gallop = min_gallop.saturating_sub(1);

                        if count1 < MIN_GALLOP && count2 < MIN_GALLOP {
                            break;
                        }
                    }

                    *min_gallop += 2;
                }

                *min_gallop = std::cmp::max(*min_gallop, 1);

                if right.len() == 1 {
                    debug_assert!(!left.is_empty());
                    left.copy_suffix_to(output, left.len());
                    right.copy_nonoverlapping_suffix_to(output, 1);
                } else {
                    debug_assert!(!right.is_empty() && left.is_empty());
                    right.copy_nonoverlapping_suffix_to(output, right.len());
                }
            })();

            debug_assert!(guard.is_empty());
            guard.disarm();
        }
    }
}

/// Return the insertion index of `key` in the sorted `slice`, galloping from `hint`.
///
/// With `LEFT`, the index is the leftmost one, e.g. `slice[..index] < key <= slice[index..]`,
/// otherwise the rightmost one, e.g. `slice[..index] <= key < slice[index..]`.
///
/// The search probes at distances 1, 3, 7, 15, ... from `hint` and then bisects the last
/// interval, so its cost is logarithmic in the distance between `hint` and the result.
fn gallop<T, F: FnMut(&T, &T) -> bool, const LEFT: bool>(
    key: &T,
    slice: &[T],
    hint: usize,
    is_less: &mut F,
) -> usize {
    assert!((0..slice.len()).contains(&hint));

    // Whether the insertion index lies behind `element`, the negation decides the other way
    let mut behind = |key: &T, element: &T| {
        if LEFT {
            is_less.less(element, key)
        } else {
            is_less.greater_eq(key, element)
        }
    };

    let mut last_offset = 0;
    let mut offset = 1;

    // check if we're searching slice[..hint] or slice[hint..]
    if behind(key, &slice[hint]) {
        // Use exponential search to find the containing interval
        let max_offset = slice.len() - hint;
        while offset < max_offset && behind(key, &slice[hint + offset]) {
            last_offset = offset;
            offset = (offset << 1) + 1;
        }
        offset = std::cmp::min(offset, max_offset);

        // Since we searched slice[hint..] we have to add it as starting offset
        last_offset += hint + 1;
        offset += hint;
    } else {
        // Use exponential search to find the containing interval
        let max_offset = hint + 1;
        while offset < max_offset && !behind(key, &slice[hint - offset]) {
            last_offset = offset;
            offset = (offset << 1) + 1;
        }
        offset = std::cmp::min(offset, max_offset);

        // Since we searched slice[..hint] backwards, we reverse our offset
        let tmp = last_offset;
        last_offset = hint + 1 - offset;
        offset = hint - tmp;
    }
    debug_assert!(last_offset <= offset && offset <= slice.len());

    // Perform binary search in the found interval
    slice[last_offset..offset].partition_point(|element| behind(key, element)) + last_offset
}

/// The leftmost insertion index of `key` in `slice`, see [`gallop`]
pub fn gallop_left<T, F: FnMut(&T, &T) -> bool>(
    key: &T,
    slice: &[T],
    hint: usize,
    is_less: &mut F,
) -> usize {
    gallop::<T, F, true>(key, slice, hint, is_less)
}

/// The rightmost insertion index of `key` in `slice`, see [`gallop`]
pub fn gallop_right<T, F: FnMut(&T, &T) -> bool>(
    key: &T,
    slice: &[T],
    hint: usize,
    is_less: &mut F,
) -> usize {
    gallop::<T, F, false>(key, slice, hint, is_less)
}

/// Merge the sorted runs `src1[..len1]` and `src2[..len2]` into `dst[..len1 + len2]`.
///
/// Equal elements are taken from `src1` first. If a comparison panics, `dst` receives all
/// elements in unspecified order.
///
/// # Safety
///
/// All three ranges must be valid, the sources initialized and `dst` must not overlap either
/// source. The elements are moved bitwise, afterwards the sources only hold stale copies.
pub(crate) unsafe fn full_merge<T, F: FnMut(&T, &T) -> bool>(
    dst: *mut T,
    src1: *mut T,
    len1: usize,
    src2: *mut T,
    len2: usize,
    is_less: &mut F,
) {
    #[cfg(feature = "counters")]
    super::MERGE_SLICE_COUNTER.increase((len1 + len2) as u64);

    // SAFETY: guaranteed by the caller
    unsafe {
        // Armed before the first comparison
        let runs = [
            Run::from_raw_parts(src1, len1),
            Run::from_raw_parts(src2, len2),
        ];
        let mut guard = MergingDropGuard::new(runs, Run::from_raw_parts(dst, len1 + len2));

        let &mut [ref mut left, ref mut right] = &mut guard.runs;
        let output = &mut guard.output;

        // Runs that are already in order are left to the guard
        if !left.is_empty() && !right.is_empty() && is_less.less(&*src2, &*src1.add(len1 - 1)) {
            if is_less.less(&*src2.add(len2 - 1), &*src1) {
                // Runs are in inverse order, no element of one equals an element of the other
                right.copy_nonoverlapping_prefix_to(output, len2);
                left.copy_nonoverlapping_prefix_to(output, len1);
            } else {
                while !left.is_empty() && !right.is_empty() {
                    if is_less.less(&*right.start(), &*left.start()) {
                        right.copy_nonoverlapping_prefix_to(output, 1);
                    } else {
                        left.copy_nonoverlapping_prefix_to(output, 1);
                    }
                }
            }
        }

        // The guard copies the remaining runs into place
        drop(guard);
    }
}

/// Merge the sorted run `src1[..len1]` with the sorted run `dst[len1..len1 + len2]` into
/// `dst[..len1 + len2]`.
///
/// Equal elements are taken from `src1` first. If a comparison panics, `dst` receives all
/// elements in unspecified order.
///
/// # Safety
///
/// Both ranges must be valid and initialized and `src1` must not overlap `dst`. The elements
/// of `src1` are moved bitwise, afterwards `src1` only holds stale copies.
pub(crate) unsafe fn half_merge<T, F: FnMut(&T, &T) -> bool>(
    dst: *mut T,
    src1: *mut T,
    len1: usize,
    len2: usize,
    is_less: &mut F,
) {
    #[cfg(feature = "counters")]
    {
        super::MERGE_SLICE_COUNTER.increase((len1 + len2) as u64);
        super::MERGE_BUFFER_COUNTER.increase(len1 as u64);
    }

    // SAFETY: guaranteed by the caller
    unsafe {
        let src2 = dst.add(len1);

        // The left run is read from outside of the output, the right run is always read ahead of
        // the output position
        let runs = [
            Run::from_raw_parts(src1, len1),
            Run::from_raw_parts(src2, len2),
        ];
        let mut guard = MergingDropGuard::new(runs, Run::from_raw_parts(dst, len1 + len2));

        let &mut [ref mut left, ref mut right] = &mut guard.runs;
        let output = &mut guard.output;

        // Otherwise the right run is already in its final place
        if !left.is_empty() && !right.is_empty() && is_less.less(&*src2, &*src1.add(len1 - 1)) {
            while !left.is_empty() && !right.is_empty() {
                if is_less.less(&*right.start(), &*left.start()) {
                    right.copy_prefix_to(output, 1);
                } else {
                    left.copy_nonoverlapping_prefix_to(output, 1);
                }
            }
        }

        // Either the rest of the right run is in place, or the guard moves the left run behind
        drop(guard);
    }
}
