//! Slot storage: a generic, cache-line-aligned payload cell.

use std::cell::UnsafeCell;

use crate::constants::CACHE_LINE_SIZE;

/// One payload cell of the ring buffer.
///
/// Aligning to [`CACHE_LINE_SIZE`] guarantees (per Rust's size-is-a-
/// multiple-of-alignment rule) that no two adjacent slots share a cache
/// line, regardless of how small `T` is. Access is through [`Slot::show`]
/// (read-only, for consumers) and [`Slot::acquire`] (mutable, for the
/// publisher holding the claimed sequence); both are `unsafe` because
/// their exclusivity is a protocol guarantee, not one the type system
/// can check.
#[repr(align(64))]
pub struct Slot<T> {
    value: UnsafeCell<T>,
}

// SAFETY: a `Slot<T>` is only ever dereferenced by the single publisher
// holding the claimed sequence (mutably) or by consumers after that
// publisher's commit has released it (read-only); see `show`/`acquire`.
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self {
            value: UnsafeCell::new(T::default()),
        }
    }
}

impl<T> Slot<T> {
    /// Read-only view of the slot's current content.
    ///
    /// # Safety
    ///
    /// The caller must have established, via the publisher/consumer
    /// protocol (a happens-before edge through the published cursor),
    /// that no publisher holds a concurrent mutable reference to this
    /// slot.
    #[inline(always)]
    pub unsafe fn show(&self) -> &T {
        &*self.value.get()
    }

    /// Exclusive, mutable view of the slot's content.
    ///
    /// # Safety
    ///
    /// The caller must hold the claimed sequence mapping to this slot
    /// and must not have committed it yet; only one publisher may hold
    /// this at a time for a given slot.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn acquire(&self) -> &mut T {
        &mut *self.value.get()
    }
}

const _: () = assert!(std::mem::align_of::<Slot<u8>>() == CACHE_LINE_SIZE);
