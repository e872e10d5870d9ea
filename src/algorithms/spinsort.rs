//! The spin sort implementation, a balanced merge sort needing only `n / 2` auxiliary slots
//!
//! The slice is split in halves recursively down to `levels` levels. On every level, the data of
//! a range is sorted into a destination range of the same size, with the other range serving
//! as scratch space. Which of the two holds the data alternates with the parity of the level,
//! so every level needs exactly one merge and no copies. At the top, only one half of the slice
//! is sorted through the auxiliary buffer, the other half in place within the slice.

use std::collections::TryReserveError;
use std::mem::MaybeUninit;

use super::buffer::AuxBuffer;
use super::merging::PendingMove;
use super::merging::two_way::{full_merge, half_merge};
use super::order::StrictWeakOrder as _;
use super::runs::{strictly_decreasing_prefix_len, weakly_increasing_prefix_len};

/// The default insertion sort to use
pub type DefaultInsertionSort = super::insertionsort::InsertionSort<true>;

/// The default BufGuardFactory to use
pub type DefaultBufGuardFactory = super::DefaultBufGuardFactory;

/// The default `INSERTION_THRESHOLD` to use
pub const DEFAULT_INSERTION_THRESHOLD: usize = 36;

/// The default `PROBE_THRESHOLD` to use
pub const DEFAULT_PROBE_THRESHOLD: usize = 1024;

/// The default `TAIL_LIMIT` to use
pub const DEFAULT_TAIL_LIMIT: usize = 32;

/// The spin sort [`super::Sort`]
///
/// - Slices of at most `2 * INSERTION_THRESHOLD` elements are sorted by `I` directly, larger
///   ones are split recursively until the pieces have at most `INSERTION_THRESHOLD` elements.
/// - Slices, and recursion ranges longer than `PROBE_THRESHOLD`, are first checked for being
///   sorted or reverse sorted except for a tail shorter than `TAIL_LIMIT`, which is then sorted
///   and inserted separately.
pub struct SpinSort<
    I: super::PostfixSort = DefaultInsertionSort,
    B: super::BufGuardFactory = DefaultBufGuardFactory,
    const INSERTION_THRESHOLD: usize = DEFAULT_INSERTION_THRESHOLD,
    const PROBE_THRESHOLD: usize = DEFAULT_PROBE_THRESHOLD,
    const TAIL_LIMIT: usize = DEFAULT_TAIL_LIMIT,
>(std::marker::PhantomData<I>, std::marker::PhantomData<B>);

impl<
    I: super::PostfixSort,
    B: super::BufGuardFactory,
    const INSERTION_THRESHOLD: usize,
    const PROBE_THRESHOLD: usize,
    const TAIL_LIMIT: usize,
> super::Sort for SpinSort<I, B, INSERTION_THRESHOLD, PROBE_THRESHOLD, TAIL_LIMIT>
{
    const IS_STABLE: bool = I::IS_STABLE;

    fn display() -> String {
        format!(
            "spinsort (insertion = {}, insertion-threshold = {INSERTION_THRESHOLD}, \
             probe-threshold = {PROBE_THRESHOLD}, tail-limit = {TAIL_LIMIT})",
            I::display()
        )
    }

    fn try_sort_by<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        mut is_less: F,
    ) -> Result<(), TryReserveError> {
        if Self::sort_small(slice, &mut is_less) {
            return Ok(());
        }

        if let Some(presorted) = Self::find_presorted(slice, usize::MAX, &mut is_less) {
            // Only the unsorted tail needs scratch space
            let mut buffer = AuxBuffer::<T, B::Guard<T>>::owned(slice.len() - presorted.prefix);
            let scratch = buffer.scratch_slice()?;

            Self::finish_presorted(slice, presorted, scratch, &mut is_less);
            return Ok(());
        }

        let mut buffer = AuxBuffer::<T, B::Guard<T>>::owned(slice.len().div_ceil(2));
        Self::sort_general(slice, &mut buffer, &mut is_less)
    }
}

/// A slice that is sorted, or strictly decreasing, up to a short tail
#[derive(Debug, Clone, Copy)]
struct Presorted {
    /// The length of the ordered prefix
    prefix: usize,
    /// Whether the prefix is strictly decreasing
    reversed: bool,
}

impl<
    I: super::PostfixSort,
    B: super::BufGuardFactory,
    const INSERTION_THRESHOLD: usize,
    const PROBE_THRESHOLD: usize,
    const TAIL_LIMIT: usize,
> SpinSort<I, B, INSERTION_THRESHOLD, PROBE_THRESHOLD, TAIL_LIMIT>
{
    /// Sort `slice` by `is_less`, using `buffer` as scratch space instead of allocating one.
    ///
    /// Nothing stored in `buffer` before the call is read or dropped, and the sort never writes
    /// outside of it.
    ///
    /// # Panics
    ///
    /// Panics if `buffer` holds less than `slice.len().div_ceil(2)` elements.
    pub fn sort_with_buffer<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        mut is_less: F,
        buffer: &mut [MaybeUninit<T>],
    ) {
        assert!(
            buffer.len() >= slice.len().div_ceil(2),
            "Buffer needs to hold at least half of the slice"
        );

        Self::sort_with_scratch(slice, buffer, &mut is_less);
    }

    /// Sort `slice` with `scratch` as its auxiliary buffer, which has to be large enough
    fn sort_with_scratch<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        scratch: &mut [MaybeUninit<T>],
        is_less: &mut F,
    ) {
        if Self::sort_small(slice, is_less) || Self::probe(slice, scratch, is_less) {
            return;
        }

        let mut buffer = AuxBuffer::<T, B::Guard<T>>::borrowed(scratch);
        if let Err(error) = Self::sort_general(slice, &mut buffer, is_less) {
            unreachable!("Borrowed buffers never allocate: {error}");
        }
    }

    /// Sort slices too short for the recursive merging, returning whether `slice` was one
    fn sort_small<T, F: FnMut(&T, &T) -> bool>(slice: &mut [T], is_less: &mut F) -> bool {
        // Zero sized elements are indistinguishable
        if slice.len() < 2 || std::mem::size_of::<T>() == 0 {
            return true;
        }

        if slice.len() <= 2 * INSERTION_THRESHOLD {
            I::sort(slice, 1, is_less);
            return true;
        }

        false
    }

    /// Check if `slice` is sorted, or sorted except for a tail shorter than `TAIL_LIMIT`, and
    /// sort it in that case. The same holds for a strictly decreasing slice, which is reversed.
    ///
    /// Returns whether the slice was sorted. If not, it is left unchanged. The tail is sorted
    /// using `scratch`, which needs room for the tail.
    fn probe<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        scratch: &mut [MaybeUninit<T>],
        is_less: &mut F,
    ) -> bool {
        match Self::find_presorted(slice, scratch.len(), is_less) {
            Some(presorted) => {
                Self::finish_presorted(slice, presorted, scratch, is_less);
                true
            }
            None => false,
        }
    }

    /// Find an ordered prefix of `slice` leaving a tail shorter than `TAIL_LIMIT` and no longer
    /// than `scratch_len`. Only compares, `slice` is not modified.
    fn find_presorted<T, F: FnMut(&T, &T) -> bool>(
        slice: &[T],
        scratch_len: usize,
        is_less: &mut F,
    ) -> Option<Presorted> {
        let len = slice.len();
        let fits_tail = |prefix: usize| len - prefix < TAIL_LIMIT && len - prefix <= scratch_len;

        let sorted = weakly_increasing_prefix_len(slice, is_less);
        if sorted == len || fits_tail(sorted) {
            return Some(Presorted {
                prefix: sorted,
                reversed: false,
            });
        }

        // A decreasing prefix is only possible if the first pair is out of order
        if sorted > 1 {
            return None;
        }

        let reversed = strictly_decreasing_prefix_len(slice, is_less);
        fits_tail(reversed).then_some(Presorted {
            prefix: reversed,
            reversed: true,
        })
    }

    /// Sort `slice` as found by [`Self::find_presorted`], with `scratch` holding room for the tail
    fn finish_presorted<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        presorted: Presorted,
        scratch: &mut [MaybeUninit<T>],
        is_less: &mut F,
    ) {
        let Presorted { prefix, reversed } = presorted;

        if reversed {
            slice[..prefix].reverse();
        }
        if prefix < slice.len() {
            Self::insert_tail(slice, prefix, scratch, is_less);
        }
    }

    /// Sort `slice[mid..]` and insert it into the sorted `slice[..mid]`
    fn insert_tail<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        mid: usize,
        scratch: &mut [MaybeUninit<T>],
        is_less: &mut F,
    ) {
        Self::sort_with_scratch(&mut slice[mid..], scratch, is_less);
        Self::insert_partial_sort(slice, mid, scratch, is_less);
    }

    /// Merge the sorted `slice[mid..]`, which has less than `TAIL_LIMIT` elements, into the
    /// sorted `slice[..mid]`.
    ///
    /// Each tail element is inserted behind all elements equal to it. All positions are
    /// computed before anything is moved, so a panicking comparison leaves `slice` unchanged.
    fn insert_partial_sort<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        mid: usize,
        scratch: &mut [MaybeUninit<T>],
        is_less: &mut F,
    ) {
        let tail_len = slice.len() - mid;
        assert!(tail_len < TAIL_LIMIT, "Tail is too long");
        assert!(scratch.len() >= tail_len, "Scratch space is too small");

        // positions[i] is the number of prefix elements in front of tail[i]
        let mut positions = [0; TAIL_LIMIT];
        let (sorted, tail) = slice.split_at(mid);
        let mut lower = 0;
        for (position, key) in positions.iter_mut().zip(tail) {
            lower += sorted[lower..].partition_point(|element| is_less.greater_eq(key, element));
            *position = lower;
        }

        // SAFETY: the tail is moved to scratch, which doesn't overlap the slice. Then, starting
        // at the back, every block of the prefix is shifted right by the number of tail
        // elements in front of it, and the tail elements are written into the gaps. Every
        // element ends up in the slice exactly once.
        unsafe {
            let base = slice.as_mut_ptr();
            let scratch = scratch.as_mut_ptr().cast::<T>();

            std::ptr::copy_nonoverlapping(base.add(mid), scratch, tail_len);

            let mut end = mid;
            for i in (1..=tail_len).rev() {
                let position = positions[i - 1];

                std::ptr::copy(base.add(position), base.add(position + i), end - position);
                std::ptr::copy_nonoverlapping(scratch.add(i - 1), base.add(position + i - 1), 1);

                end = position;
            }
        }
    }

    /// The number of recursion levels used for a slice of `len` elements
    fn levels(len: usize) -> u32 {
        len.div_ceil(INSERTION_THRESHOLD).ilog2()
    }

    /// Sort `slice` by recursive merging, using `buffer` for half of the elements
    fn sort_general<T, G: super::merging::BufGuard<T>, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        buffer: &mut AuxBuffer<'_, T, G>,
        is_less: &mut F,
    ) -> Result<(), TryReserveError> {
        let len = slice.len();
        debug_assert!(len > 2 * INSERTION_THRESHOLD);

        let len1 = len.div_ceil(2);
        let len2 = len - len1;
        assert!(buffer.capacity() >= len1, "Buffer is too small");

        let levels = Self::levels(len);
        debug_assert!(levels > 0);

        // Nothing has been moved if this fails
        let scratch = buffer.scratch()?;
        let data = slice.as_mut_ptr();

        // SAFETY: scratch holds len1 elements and doesn't overlap slice. Between any two
        // comparisons, every element is either in its place in slice, or registered to be moved
        // back to it by `buffer` or by a guard within the called functions.
        unsafe {
            if levels % 2 == 1 {
                // On odd levels, data is sorted from the first range into the second
                std::ptr::copy_nonoverlapping(data.add(len2), scratch, len1);
                Self::range_sort(scratch, data.add(len2), len1, levels, is_less);

                buffer.populate(data, len2);
                Self::range_sort(data, scratch, len2, levels, is_less);
                buffer.clear();

                half_merge(data, scratch, len2, len1, is_less);
            } else {
                // On even levels, data is sorted within the second range
                std::ptr::copy_nonoverlapping(data, scratch, len1);
                buffer.populate(data, len1);

                Self::range_sort(data, scratch, len1, levels, is_less);
                Self::range_sort(data, data.add(len1), len2, levels, is_less);
                buffer.clear();

                half_merge(data, scratch, len1, len2, is_less);
            }
        }

        Ok(())
    }

    /// Sort `len` elements into `range2`, using `range1` as the other range.
    ///
    /// On odd levels the data starts out in `range1`, on even levels in `range2`. A level of 1
    /// sorts both halves by insertion and merges them, higher levels recurse with the ranges
    /// swapped.
    ///
    /// If a comparison panics, all elements end up in `range2`, in unspecified order.
    ///
    /// # Safety
    ///
    /// Both ranges need to be valid for `len` elements and must not overlap. The one not holding
    /// the data may be uninitialized.
    unsafe fn range_sort<T, F: FnMut(&T, &T) -> bool>(
        range1: *mut T,
        range2: *mut T,
        len: usize,
        level: u32,
        is_less: &mut F,
    ) {
        debug_assert!(level > 0);
        let data_in_range1 = level % 2 == 1;

        // SAFETY: guaranteed by the caller, see the individual comments
        unsafe {
            if len > PROBE_THRESHOLD {
                if data_in_range1 {
                    // Range2 is free scratch space, the data moves there once sorted
                    let moved = PendingMove::new(range1, range2, len);
                    let data = std::slice::from_raw_parts_mut(range1, len);
                    let scratch =
                        std::slice::from_raw_parts_mut(range2.cast::<MaybeUninit<T>>(), len);

                    if Self::probe(data, scratch, is_less) {
                        drop(moved);
                        return;
                    }
                    moved.cancel();
                } else {
                    let data = std::slice::from_raw_parts_mut(range2, len);
                    let scratch =
                        std::slice::from_raw_parts_mut(range1.cast::<MaybeUninit<T>>(), len);

                    if Self::probe(data, scratch, is_less) {
                        return;
                    }
                }
            }

            let len1 = len.div_ceil(2);
            let len2 = len - len1;

            // Whatever is sorted into range1 has to reach range2 if we unwind
            let mut pending =
                PendingMove::new(range1, range2, if data_in_range1 { len } else { 0 });

            if level < 2 {
                I::sort(std::slice::from_raw_parts_mut(range1, len1), 1, is_less);
                I::sort(
                    std::slice::from_raw_parts_mut(range1.add(len1), len2),
                    1,
                    is_less,
                );
            } else {
                if !data_in_range1 {
                    pending.set_len(len1);
                }
                Self::range_sort(range2, range1, len1, level - 1, is_less);

                if !data_in_range1 {
                    pending.set_len(len);
                }
                Self::range_sort(range2.add(len1), range1.add(len1), len2, level - 1, is_less);
            }

            // The merge has its own guard
            pending.cancel();
            full_merge(range2, range1, len1, range1.add(len1), len2, is_less);
        }
    }
}
