use alloc::alloc::Layout;
use alloc::alloc::alloc_zeroed;
use alloc::alloc::dealloc;
use alloc::alloc::handle_alloc_error;
use alloc::alloc::realloc;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::ptr;
use core::ptr::NonNull;

use crate::group::Group;

/// Arrays start on a cache line so a group never straddles more lines than
/// its size requires.
const ARRAY_ALIGN: usize = 64;

fn layout_for<T>(exponent: u8) -> Layout {
    let len = 1usize
        .checked_shl(u32::from(exponent))
        .expect("capacity overflow");
    Layout::array::<Group<T>>(len)
        .and_then(|layout| layout.align_to(ARRAY_ALIGN))
        .expect("capacity overflow")
}

/// A power-of-two sized, zero-initialized array of groups.
///
/// The array only ever grows, one doubling at a time, and splits every group
/// across the old and new halves as it does so.
pub(crate) struct GroupArray<T> {
    ptr: NonNull<Group<T>>,
    exponent: u8,
    _marker: PhantomData<Group<T>>,
}

// SAFETY: The array uniquely owns its groups, so it is as thread-safe as the
// values it stores.
unsafe impl<T: Send> Send for GroupArray<T> {}
// SAFETY: Shared access only hands out shared references to values.
unsafe impl<T: Sync> Sync for GroupArray<T> {}

impl<T> GroupArray<T> {
    /// Allocates `2^exponent` empty groups.
    pub(crate) fn new(exponent: u8) -> Self {
        let layout = layout_for::<T>(exponent);
        // SAFETY: A group is never zero-sized, and `layout` holds at least one.
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw.cast::<Group<T>>()) else {
            handle_alloc_error(layout)
        };

        Self {
            ptr,
            exponent,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        1 << self.exponent
    }

    #[inline(always)]
    pub(crate) fn mask(&self) -> usize {
        self.len() - 1
    }

    #[inline(always)]
    pub(crate) fn exponent(&self) -> u8 {
        self.exponent
    }

    #[inline(always)]
    pub(crate) fn groups(&self) -> &[Group<T>] {
        // SAFETY: `ptr` points to `len()` initialized groups.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    #[inline(always)]
    pub(crate) fn groups_mut(&mut self) -> &mut [Group<T>] {
        // SAFETY: `ptr` points to `len()` initialized groups, and `&mut self`
        // guarantees exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }

    /// # Safety
    ///
    /// The caller must ensure `index < self.len()`.
    #[inline(always)]
    pub(crate) unsafe fn group_unchecked(&self, index: usize) -> &Group<T> {
        debug_assert!(index < self.len());
        // SAFETY: Caller ensures `index` is in bounds.
        unsafe { &*self.ptr.as_ptr().add(index) }
    }

    /// # Safety
    ///
    /// The caller must ensure `index < self.len()`.
    #[inline(always)]
    pub(crate) unsafe fn group_unchecked_mut(&mut self, index: usize) -> &mut Group<T> {
        debug_assert!(index < self.len());
        // SAFETY: Caller ensures `index` is in bounds.
        unsafe { &mut *self.ptr.as_ptr().add(index) }
    }

    /// Doubles the array in place.
    ///
    /// Group `i` keeps the values whose tag does not contain `decision_mask`;
    /// the others move to group `i + old_len`.
    pub(crate) fn grow(&mut self, decision_mask: u8) {
        let old_len = self.len();
        let old_layout = layout_for::<T>(self.exponent);
        let new_exponent = self.exponent.checked_add(1).expect("capacity overflow");
        let new_layout = layout_for::<T>(new_exponent);

        // SAFETY: `ptr` was allocated with `old_layout`, and `new_layout` has the
        // same alignment and a larger, non-zero size that was already checked
        // not to overflow.
        let raw = unsafe {
            realloc(
                self.ptr.as_ptr().cast::<u8>(),
                old_layout,
                new_layout.size(),
            )
        };
        let Some(ptr) = NonNull::new(raw.cast::<Group<T>>()) else {
            handle_alloc_error(new_layout)
        };

        // SAFETY: The new block holds `2 * old_len` groups. The lower half was
        // moved bitwise by `realloc`, which is a valid move for any `T`. The
        // upper half is uninitialized and becomes empty groups once zeroed.
        unsafe {
            ptr::write_bytes(ptr.as_ptr().add(old_len), 0, old_len);
        }
        self.ptr = ptr;
        self.exponent = new_exponent;

        let (lower, upper) = self.groups_mut().split_at_mut(old_len);
        for (low, high) in lower.iter_mut().zip(upper) {
            low.split_into(high, decision_mask);
        }
    }

    /// Drops every value while keeping the allocation.
    pub(crate) fn clear(&mut self) {
        for group in self.groups_mut() {
            group.clear();
        }
    }
}

impl<T: Clone> Clone for GroupArray<T> {
    fn clone(&self) -> Self {
        let mut array = Self::new(self.exponent);
        for (dst, src) in array.groups_mut().iter_mut().zip(self.groups()) {
            dst.extend_cloned(src);
        }
        array
    }
}

impl<T> Drop for GroupArray<T> {
    fn drop(&mut self) {
        let layout = layout_for::<T>(self.exponent);
        // SAFETY: Every group is initialized and dropped exactly once, then the
        // block is freed with the layout it was allocated with.
        unsafe {
            ptr::drop_in_place(self.groups_mut() as *mut [Group<T>]);
            dealloc(self.ptr.as_ptr().cast::<u8>(), layout);
        }
    }
}

impl<T> Debug for GroupArray<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.groups()).finish()
    }
}
