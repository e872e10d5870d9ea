//! The auxiliary buffer of the spin sort, either owned and allocated on demand or borrowed
//! from the caller

use std::collections::TryReserveError;
use std::mem::MaybeUninit;

use super::merging::{BufGuard, PendingMove};

/// The lifecycle state of an [`AuxBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BufferState {
    /// No element lives in the buffer
    Empty,
    /// The buffer holds elements that have to be moved back into the sorted slice
    Populated,
    /// The owned storage was given back, the buffer can't be used anymore
    Released,
}

enum Storage<'a, T, G> {
    /// Storage allocated through `G` once it is first needed
    Owned(Option<G>),
    /// Storage supplied by the caller, which is never freed and never dropped from
    Borrowed(&'a mut [MaybeUninit<T>]),
}

/// Scratch space for `capacity` elements.
///
/// Elements moved into the buffer are tracked together with the range of the slice they belong
/// to. Releasing the buffer, either explicitly or by dropping it while unwinding, first moves
/// them back home, so the slice always ends up as a permutation of its original elements.
pub struct AuxBuffer<'a, T, G: BufGuard<T>> {
    storage: Storage<'a, T, G>,
    capacity: usize,
    resident: Option<PendingMove<T>>,
    released: bool,
}

impl<'a, T, G: BufGuard<T>> AuxBuffer<'a, T, G> {
    /// Create a buffer for `capacity` elements, which is only allocated by [`Self::scratch`]
    pub fn owned(capacity: usize) -> Self {
        Self {
            storage: Storage::Owned(None),
            capacity,
            resident: None,
            released: false,
        }
    }

    /// Use `buffer` as scratch space
    pub fn borrowed(buffer: &'a mut [MaybeUninit<T>]) -> Self {
        Self {
            capacity: buffer.len(),
            storage: Storage::Borrowed(buffer),
            resident: None,
            released: false,
        }
    }

    /// The number of elements the buffer provides space for
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn state(&self) -> BufferState {
        if self.released {
            BufferState::Released
        } else if self.resident.is_some() {
            BufferState::Populated
        } else {
            BufferState::Empty
        }
    }

    /// Whether the buffer allocated its own storage
    #[cfg(test)]
    fn is_allocated(&self) -> bool {
        matches!(self.storage, Storage::Owned(Some(_)))
    }

    /// Return a pointer to the start of the scratch space, allocating it if necessary.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the allocation failed.
    pub fn scratch(&mut self) -> Result<*mut T, TryReserveError> {
        Ok(self.scratch_slice()?.as_mut_ptr().cast::<T>())
    }

    /// Like [`Self::scratch`], but return the `capacity` scratch slots as a slice
    ///
    /// # Errors
    ///
    /// Returns `Err` if the allocation failed.
    pub fn scratch_slice(&mut self) -> Result<&mut [MaybeUninit<T>], TryReserveError> {
        assert!(!self.released, "Buffer was already released");

        let capacity = self.capacity;
        let memory = match &mut self.storage {
            Storage::Owned(Some(guard)) => guard.as_uninit_slice_mut(),
            Storage::Owned(guard @ None) => guard
                .insert(G::try_with_capacity(capacity)?)
                .as_uninit_slice_mut(),
            Storage::Borrowed(buffer) => &mut **buffer,
        };

        Ok(&mut memory[..capacity])
    }

    /// Register that the first `len` scratch slots hold the elements belonging to
    /// `home..home + len`.
    ///
    /// # Safety
    ///
    /// [`Self::scratch`] must have been called before, and `home..home + len` must stay valid
    /// and hold no live elements of its own until the buffer is cleared or released.
    pub unsafe fn populate(&mut self, home: *mut T, len: usize) {
        assert!(len <= self.capacity, "Buffer is too small");
        debug_assert_eq!(self.state(), BufferState::Empty);

        let start = match &mut self.storage {
            Storage::Owned(Some(guard)) => guard.as_uninit_slice_mut().as_mut_ptr(),
            Storage::Owned(None) => unreachable!("Owned buffer was never allocated"),
            Storage::Borrowed(buffer) => buffer.as_mut_ptr(),
        };

        // SAFETY: the scratch space and home are distinct, the caller guarantees the rest
        self.resident = Some(unsafe { PendingMove::new(start.cast::<T>(), home, len) });
    }

    /// Forget the resident elements, after they have been moved out by other means
    pub fn clear(&mut self) {
        if let Some(resident) = self.resident.take() {
            resident.cancel();
        }
    }

    /// Move resident elements back home and free owned storage
    pub fn release(&mut self) {
        // Dropping the pending move puts the elements back
        self.resident = None;

        if let Storage::Owned(guard) = &mut self.storage {
            *guard = None;
        }
        self.released = true;
    }
}

impl<T, G: BufGuard<T>> Drop for AuxBuffer<'_, T, G> {
    fn drop(&mut self) {
        self.release();
    }
}
