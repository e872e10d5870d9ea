//! The timsort implementation

use std::collections::TryReserveError;

use super::merging::two_way::Galloping;

/// The default insertion sort to use
pub type DefaultInsertionSort = super::insertionsort::InsertionSort<true>;

/// The default BufGuardFactory to use
pub type DefaultBufGuardFactory = super::DefaultBufGuardFactory;

/// The default `MIN_MERGE` to use
pub const DEFAULT_MIN_MERGE: usize = 32;

/// The default `MIN_GALLOP` to use
pub const DEFAULT_MIN_GALLOP: usize = super::merging::two_way::DEFAULT_MIN_GALLOP;

/// The timsort [`super::Sort`]
///
/// Slices shorter than `MIN_MERGE` are sorted by `I` alone. Otherwise runs are extended by `I`
/// to a minimum length derived from `MIN_MERGE`, and merged by galloping, starting with a
/// threshold of `MIN_GALLOP`.
pub struct TimSort<
    I: super::PostfixSort = DefaultInsertionSort,
    B: super::BufGuardFactory = DefaultBufGuardFactory,
    const MIN_MERGE: usize = DEFAULT_MIN_MERGE,
    const MIN_GALLOP: usize = DEFAULT_MIN_GALLOP,
>(std::marker::PhantomData<I>, std::marker::PhantomData<B>);

impl<
    I: super::PostfixSort,
    B: super::BufGuardFactory,
    const MIN_MERGE: usize,
    const MIN_GALLOP: usize,
> super::Sort for TimSort<I, B, MIN_MERGE, MIN_GALLOP>
{
    const IS_STABLE: bool = I::IS_STABLE;

    fn display() -> String {
        format!(
            "timsort (insertion = {}, merging = {}, min-merge = {MIN_MERGE})",
            I::display(),
            Galloping::<MIN_GALLOP>::display()
        )
    }

    fn try_sort_by<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        mut is_less: F,
    ) -> Result<(), TryReserveError> {
        Self::timsort(slice, &mut is_less)
    }
}

/// A single continuous run starting at `start` followed by `len` weakly increasing elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRun {
    start: usize,
    len: usize,
}

/// Everything needed to merge the pending runs of one sort
struct Merger<'a, T, G, const MIN_GALLOP: usize> {
    slice: &'a mut [T],
    pending_runs: Vec<PendingRun>,
    galloping: Galloping<MIN_GALLOP>,
    buffer: G,
}

impl<
    I: super::PostfixSort,
    B: super::BufGuardFactory,
    const MIN_MERGE: usize,
    const MIN_GALLOP: usize,
> TimSort<I, B, MIN_MERGE, MIN_GALLOP>
{
    /// Actual timsort implementation
    fn timsort<T, F: FnMut(&T, &T) -> bool>(
        slice: &mut [T],
        is_less: &mut F,
    ) -> Result<(), TryReserveError> {
        if slice.len() < 2 || std::mem::size_of::<T>() == 0 {
            return Ok(());
        }

        if slice.len() < MIN_MERGE {
            let split_point = super::runs::find_run_and_make_ascending(slice, is_less);
            I::sort(slice, split_point, is_less);
            return Ok(());
        }

        let min_run = Self::min_run_length(slice.len());

        // The buffer grows on demand while merging
        let mut merger = Merger {
            pending_runs: Vec::new(),
            galloping: Galloping::<MIN_GALLOP>::new(),
            buffer: <B::Guard<T> as super::merging::BufGuard<T>>::try_with_capacity(0)?,
            slice,
        };

        let mut n = merger.slice.len();
        let mut start = 0;

        while n != 0 {
            let mut run_length =
                super::runs::find_run_and_make_ascending(&mut merger.slice[start..], is_less);

            if run_length < min_run {
                let force = std::cmp::min(n, min_run);
                I::sort(
                    &mut merger.slice[start..start + force],
                    run_length,
                    is_less,
                );
                run_length = force;
            }

            merger.pending_runs.push(PendingRun {
                start,
                len: run_length,
            });
            merger.merge_collapse(is_less)?;

            start += run_length;
            n -= run_length;
        }

        debug_assert_eq!(start, merger.slice.len());
        merger.merge_force_collapse(is_less)?;
        debug_assert_eq!(merger.pending_runs.len(), 1);

        Ok(())
    }

    /// The minimum run length for a slice of length `n`.
    ///
    /// Returns `n` itself if it is less than `MIN_MERGE`. Otherwise returns a value `k` in
    /// `MIN_MERGE / 2..=MIN_MERGE` such that `n / k` is close to, but strictly less than, a power
    /// of two.
    fn min_run_length(mut n: usize) -> usize {
        // Becomes 1 if any of the shifted out bits is set
        let mut r = 0;
        while n >= MIN_MERGE {
            r |= n & 1;
            n >>= 1;
        }
        n + r
    }
}

impl<T, G: super::merging::BufGuard<T>, const MIN_GALLOP: usize> Merger<'_, T, G, MIN_GALLOP> {
    /// Merge pending runs until the run lengths satisfy
    ///
    /// 1. `runs[i - 3].len > runs[i - 2].len + runs[i - 1].len`
    /// 2. `runs[i - 2].len > runs[i - 1].len`
    ///
    /// for the topmost runs of the stack.
    fn merge_collapse<F: FnMut(&T, &T) -> bool>(
        &mut self,
        is_less: &mut F,
    ) -> Result<(), TryReserveError> {
        while self.pending_runs.len() > 1 {
            let runs = &self.pending_runs;
            let mut n = runs.len() - 2;

            if (n > 0 && runs[n - 1].len <= runs[n].len + runs[n + 1].len)
                || (n > 1 && runs[n - 2].len <= runs[n - 1].len + runs[n].len)
            {
                if runs[n - 1].len < runs[n + 1].len {
                    n -= 1;
                }

                self.merge_at(n, is_less)?;
            } else if runs[n].len <= runs[n + 1].len {
                self.merge_at(n, is_less)?;
            } else {
                break;
            }
        }

        Ok(())
    }

    /// Merge all pending runs into one
    fn merge_force_collapse<F: FnMut(&T, &T) -> bool>(
        &mut self,
        is_less: &mut F,
    ) -> Result<(), TryReserveError> {
        while self.pending_runs.len() > 1 {
            let runs = &self.pending_runs;
            let mut n = runs.len() - 2;

            if n > 0 && runs[n - 1].len < runs[n + 1].len {
                n -= 1;
            }

            self.merge_at(n, is_less)?;
        }

        Ok(())
    }

    /// Merge the pending runs at `index` and `index + 1`, which has to be one of the top two
    /// pairs of the stack.
    fn merge_at<F: FnMut(&T, &T) -> bool>(
        &mut self,
        index: usize,
        is_less: &mut F,
    ) -> Result<(), TryReserveError> {
        let stack_size = self.pending_runs.len();
        assert!(stack_size >= 2);
        assert!(index == stack_size - 2 || index == stack_size - 3);

        let run1 = self.pending_runs[index];
        let run2 = self.pending_runs[index + 1];
        debug_assert!(run1.len > 0 && run2.len > 0);
        debug_assert_eq!(run1.start + run1.len, run2.start);

        self.galloping.merge(
            &mut self.slice[run1.start..run2.start + run2.len],
            run1.len,
            &mut self.buffer,
            is_less,
        )?;

        // Only update the stack once the merge has succeeded
        self.pending_runs[index].len += run2.len;
        self.pending_runs.remove(index + 1);

        Ok(())
    }
}
