//! Primitives for merging sorted runs: buffers, raw runs and the guards keeping merges panic safe

pub mod two_way;

use std::collections::TryReserveError;
use std::mem::MaybeUninit;

/// Adapted from `std::slice::sort::stable::BufGuard<T>`, with fallible allocation
pub trait BufGuard<T>: Sized {
    /// Creates new buffer that holds at least `capacity` memory.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the allocation failed
    fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError>;
    /// Returns mutable access to uninitialized memory owned by the buffer.
    fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>];
}

#[allow(dead_code)]
pub static ALLOC_COUNTER: crate::data::GlobalCounter = crate::data::GlobalCounter::new();

impl<T> BufGuard<T> for Vec<T> {
    fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        #[cfg(feature = "counters")]
        ALLOC_COUNTER.increase(capacity as u64);

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity)?;

        Ok(buffer)
    }

    fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>] {
        self.spare_capacity_mut()
    }
}

#[allow(dead_code)]
pub static MERGE_SLICE_COUNTER: crate::data::GlobalCounter = crate::data::GlobalCounter::new();
#[allow(dead_code)]
pub static MERGE_BUFFER_COUNTER: crate::data::GlobalCounter = crate::data::GlobalCounter::new();

/// A run of elements given by raw pointers, which is consumed from the front or the back
/// while merging.
///
/// Runs never own their elements, the [`MergingDropGuard`] keeping them decides what happens
/// to them.
#[derive(Debug)]
pub(crate) struct Run<T>(pub(crate) std::ops::Range<*mut T>);

impl<T> Run<T> {
    /// Create the run `start..start + len`
    ///
    /// # Safety
    ///
    /// `start..start + len` must be within a single allocation.
    pub(crate) unsafe fn from_raw_parts(start: *mut T, len: usize) -> Self {
        // SAFETY: guaranteed by the caller
        Self(start..unsafe { start.add(len) })
    }

    /// Create the run of initialized elements at the start of `buffer`
    ///
    /// # Safety
    ///
    /// The first `len` elements of `buffer` must be initialized before they are read.
    pub(crate) unsafe fn from_uninit(buffer: &mut [MaybeUninit<T>], len: usize) -> Self {
        assert!(len <= buffer.len(), "Run needs to fit into the buffer");

        // SAFETY: len is in bounds of buffer, MaybeUninit<T> has the same layout as T
        unsafe { Self::from_raw_parts(buffer.as_mut_ptr().cast::<T>(), len) }
    }

    pub(crate) fn len(&self) -> usize {
        // SAFETY: both pointers stem from the same allocation and start <= end
        unsafe { self.0.end.offset_from(self.0.start) as usize }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.start == self.0.end
    }

    /// Pointer to the first remaining element
    pub(crate) fn start(&self) -> *mut T {
        self.0.start
    }

    /// Pointer behind the last remaining element
    pub(crate) fn end(&self) -> *mut T {
        self.0.end
    }

    /// # Safety
    ///
    /// All elements of the run must be initialized.
    pub(crate) unsafe fn as_slice<'a>(&self) -> &'a [T] {
        // SAFETY: guaranteed by the caller
        unsafe { std::slice::from_raw_parts(self.0.start, self.len()) }
    }

    /// Copy the first `count` elements to the start of `output` and strip them from both.
    ///
    /// # Safety
    ///
    /// Both runs need at least `count` elements and the copied ranges must not overlap.
    pub(crate) unsafe fn copy_nonoverlapping_prefix_to(&mut self, output: &mut Self, count: usize) {
        debug_assert!(self.len() >= count && output.len() >= count);

        // SAFETY: guaranteed by the caller
        unsafe {
            std::ptr::copy_nonoverlapping(self.0.start, output.0.start, count);
            self.0.start = self.0.start.add(count);
            output.0.start = output.0.start.add(count);
        }
    }

    /// Like [`Self::copy_nonoverlapping_prefix_to`], but the ranges may overlap
    ///
    /// # Safety
    ///
    /// Both runs need at least `count` elements.
    pub(crate) unsafe fn copy_prefix_to(&mut self, output: &mut Self, count: usize) {
        debug_assert!(self.len() >= count && output.len() >= count);

        // SAFETY: guaranteed by the caller
        unsafe {
            std::ptr::copy(self.0.start, output.0.start, count);
            self.0.start = self.0.start.add(count);
            output.0.start = output.0.start.add(count);
        }
    }

    /// Copy the last `count` elements to the end of `output` and strip them from both.
    ///
    /// # Safety
    ///
    /// Both runs need at least `count` elements and the copied ranges must not overlap.
    pub(crate) unsafe fn copy_nonoverlapping_suffix_to(&mut self, output: &mut Self, count: usize) {
        debug_assert!(self.len() >= count && output.len() >= count);

        // SAFETY: guaranteed by the caller
        unsafe {
            self.0.end = self.0.end.sub(count);
            output.0.end = output.0.end.sub(count);
            std::ptr::copy_nonoverlapping(self.0.end, output.0.end, count);
        }
    }

    /// Like [`Self::copy_nonoverlapping_suffix_to`], but the ranges may overlap
    ///
    /// # Safety
    ///
    /// Both runs need at least `count` elements.
    pub(crate) unsafe fn copy_suffix_to(&mut self, output: &mut Self, count: usize) {
        debug_assert!(self.len() >= count && output.len() >= count);

        // SAFETY: guaranteed by the caller
        unsafe {
            self.0.end = self.0.end.sub(count);
            output.0.end = output.0.end.sub(count);
            std::ptr::copy(self.0.end, output.0.end, count);
        }
    }
}

/// Guards a merge of `K` runs into `output`.
///
/// If the merge is interrupted by a panic, the remaining elements of all runs are copied into
/// the remaining space of `output`, in the order of `runs`. Hence every element ends up in
/// `output` exactly once, although not necessarily in order.
///
/// Copying a run must never overwrite a later run, so a run located inside `output` either has
/// to come after all runs located outside of it, or already sit at the start of `output`.
pub(crate) struct MergingDropGuard<T, const K: usize> {
    pub(crate) runs: [Run<T>; K],
    pub(crate) output: Run<T>,
}

impl<T, const K: usize> MergingDropGuard<T, K> {
    /// # Safety
    ///
    /// `output` must be writable and exactly as long as all `runs` together.
    pub(crate) unsafe fn new(runs: [Run<T>; K], output: Run<T>) -> Self {
        debug_assert_eq!(runs.iter().map(Run::len).sum::<usize>(), output.len());

        Self { runs, output }
    }

    /// Whether all runs have been fully merged
    pub(crate) fn is_empty(&self) -> bool {
        self.runs.iter().all(Run::is_empty)
    }

    /// Forget the guard without copying anything
    pub(crate) fn disarm(self) {
        std::mem::forget(self);
    }
}

impl<T, const K: usize> Drop for MergingDropGuard<T, K> {
    fn drop(&mut self) {
        for run in self.runs.iter_mut() {
            let len = run.len();

            // SAFETY: the output has exactly enough space left for all remaining elements
            unsafe {
                run.copy_prefix_to(&mut self.output, len);
            }
        }
    }
}

/// A move of `len` elements from `src` to `dst`, performed when dropped unless cancelled.
///
/// Used to return elements that currently live in scratch space to the range they belong in,
/// both after finishing normally and while unwinding.
pub(crate) struct PendingMove<T> {
    src: *const T,
    dst: *mut T,
    len: usize,
}

impl<T> PendingMove<T> {
    /// # Safety
    ///
    /// `src..src + len` and `dst..dst + len` must not overlap, and must stay valid and only be
    /// changed consistently with `len` (see [`Self::set_len`]) until the move is performed.
    pub(crate) unsafe fn new(src: *const T, dst: *mut T, len: usize) -> Self {
        Self { src, dst, len }
    }

    /// Change how many elements will be moved
    pub(crate) fn set_len(&mut self, len: usize) {
        self.len = len;
    }

    /// Forget the move without performing it
    pub(crate) fn cancel(self) {
        std::mem::forget(self);
    }
}

impl<T> Drop for PendingMove<T> {
    fn drop(&mut self) {
        // SAFETY: guaranteed by the creator of the move
        unsafe {
            std::ptr::copy_nonoverlapping(self.src, self.dst, self.len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_buffer_capacity() {
        let mut buffer = <Vec<String> as BufGuard<String>>::try_with_capacity(17).unwrap();
        assert!(buffer.as_uninit_slice_mut().len() >= 17);

        let mut buffer = <Vec<u8> as BufGuard<u8>>::try_with_capacity(0).unwrap();
        assert!(buffer.as_uninit_slice_mut().is_empty());
    }

    #[test]
    fn impossible_buffer_fails() {
        let result = <Vec<u64> as BufGuard<u64>>::try_with_capacity(usize::MAX / 4);
        assert!(result.is_err());
    }

    #[test]
    fn guard_completes_interrupted_merge() {
        let mut left = [1, 4, 7];
        let mut right = [2, 3, 9];
        let mut output = [0; 6];

        // SAFETY: all arrays outlive the guard and don't overlap
        unsafe {
            let runs = [
                Run::from_raw_parts(left.as_mut_ptr(), left.len()),
                Run::from_raw_parts(right.as_mut_ptr(), right.len()),
            ];
            let mut guard =
                MergingDropGuard::new(runs, Run::from_raw_parts(output.as_mut_ptr(), 6));

            let &mut [ref mut left_run, ref mut right_run] = &mut guard.runs;
            left_run.copy_nonoverlapping_prefix_to(&mut guard.output, 1);
            right_run.copy_nonoverlapping_prefix_to(&mut guard.output, 2);
            assert!(!guard.is_empty());

            // Dropping the guard simulates a panic at this point
            drop(guard);
        }

        assert_eq!(output, [1, 2, 3, 4, 7, 9]);
    }

    #[test]
    fn pending_move_runs_unless_cancelled() {
        let source = [5, 6, 7];
        let mut target = [0; 3];

        // SAFETY: both arrays outlive the moves and don't overlap
        unsafe {
            let mut pending = PendingMove::new(source.as_ptr(), target.as_mut_ptr(), 3);
            pending.set_len(2);
            drop(pending);
        }
        assert_eq!(target, [5, 6, 0]);

        // SAFETY: as above
        unsafe {
            PendingMove::new(source.as_ptr(), target.as_mut_ptr(), 3).cancel();
        }
        assert_eq!(target, [5, 6, 0]);
    }
}
