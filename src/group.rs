use core::fmt::Debug;
use core::mem::MaybeUninit;
use core::ptr;

cfg_if::cfg_if! {
    if #[cfg(feature = "sixteen-slot")] {
        /// Number of slots in a single group.
        pub const GROUP_WIDTH: usize = 16;
    } else {
        /// Number of slots in a single group.
        pub const GROUP_WIDTH: usize = 12;
    }
}

/// Tags are padded to a full SSE2 register so a group can compare all of them
/// with a single aligned load.
const TAG_LANES: usize = 16;

/// de Bruijn sequence B(2, 4), see http://supertech.csail.mit.edu/papers/debruijn.pdf
const DE_BRUIJN_16: u16 = 0x0F65;

/// Maps the top nibble of `(bit * DE_BRUIJN_16)` back to the bit position.
const DE_BRUIJN_INDEX: [u8; 16] = [0, 1, 11, 2, 14, 12, 8, 3, 15, 10, 13, 7, 9, 6, 5, 4];

/// Index of the lowest set bit of a non-zero mask.
#[inline(always)]
pub(crate) fn lowest_bit_index(mask: u16) -> usize {
    debug_assert!(mask != 0);
    let lowest = mask & mask.wrapping_neg();
    DE_BRUIJN_INDEX[(lowest.wrapping_mul(DE_BRUIJN_16) >> 12) as usize] as usize
}

/// Slot indices of a tag match, yielded from low to high.
#[derive(Clone, Copy)]
pub(crate) struct BitMask(u16);

impl Iterator for BitMask {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 == 0 {
            return None;
        }
        let index = lowest_bit_index(self.0);
        self.0 &= self.0 - 1;
        Some(index)
    }
}

#[inline(always)]
fn used_mask(count: usize) -> u16 {
    ((1u32 << count) - 1) as u16
}

/// A fixed-capacity cluster of slots sharing one group index.
///
/// Occupied slots always form the dense prefix `0..count`, and `used` mirrors
/// that prefix as a bitmask so tag matches can be filtered with one `and`.
/// Slots past `count` are uninitialized and their tags are ignored.
///
/// An all-zero bit pattern is a valid empty group, which lets the group array
/// hand out zeroed memory.
#[repr(C, align(16))]
pub(crate) struct Group<T> {
    tags: [u8; TAG_LANES],
    used: u16,
    count: u8,
    slots: [MaybeUninit<T>; GROUP_WIDTH],
}

impl<T> Group<T> {
    #[cfg(test)]
    pub(crate) const fn new() -> Self {
        Self {
            tags: [0; TAG_LANES],
            used: 0,
            count: 0,
            slots: [const { MaybeUninit::uninit() }; GROUP_WIDTH],
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.count as usize
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline(always)]
    pub(crate) fn is_full(&self) -> bool {
        self.len() == GROUP_WIDTH
    }

    /// The tag stored for an occupied slot.
    #[inline(always)]
    pub(crate) fn tag(&self, slot: usize) -> u8 {
        debug_assert!(slot < self.len());
        self.tags[slot]
    }

    /// The occupied slots as an initialized slice.
    #[inline(always)]
    pub(crate) fn as_slice(&self) -> &[T] {
        // SAFETY: The first `count` slots are initialized, and `MaybeUninit<T>`
        // has the same layout as `T`.
        unsafe { core::slice::from_raw_parts(self.slots.as_ptr().cast::<T>(), self.len()) }
    }

    /// The occupied slots as an initialized mutable slice.
    #[inline(always)]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: The first `count` slots are initialized, and `MaybeUninit<T>`
        // has the same layout as `T`.
        unsafe {
            core::slice::from_raw_parts_mut(self.slots.as_mut_ptr().cast::<T>(), self.len())
        }
    }

    /// Get a reference to an occupied slot without bounds checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure `slot < self.len()`.
    #[inline(always)]
    pub(crate) unsafe fn get_unchecked(&self, slot: usize) -> &T {
        debug_assert!(slot < self.len());
        // SAFETY: Caller ensures `slot` is occupied, so it is in bounds and
        // initialized.
        unsafe { self.slots.get_unchecked(slot).assume_init_ref() }
    }

    /// Get a mutable reference to an occupied slot without bounds checking.
    ///
    /// # Safety
    ///
    /// The caller must ensure `slot < self.len()`.
    #[inline(always)]
    pub(crate) unsafe fn get_unchecked_mut(&mut self, slot: usize) -> &mut T {
        debug_assert!(slot < self.len());
        // SAFETY: Caller ensures `slot` is occupied, so it is in bounds and
        // initialized.
        unsafe { self.slots.get_unchecked_mut(slot).assume_init_mut() }
    }

    /// Appends `value` unless the group is full, in which case the value is
    /// handed back untouched.
    ///
    /// The caller is responsible for making sure `value` is not already
    /// present.
    #[inline]
    pub(crate) fn try_insert_new(&mut self, value: T, tag: u8) -> Result<usize, T> {
        if self.is_full() {
            return Err(value);
        }
        Ok(self.insert_new_unchecked(value, tag))
    }

    #[inline(always)]
    fn insert_new_unchecked(&mut self, value: T, tag: u8) -> usize {
        assert!(!self.is_full());
        let slot = self.len();
        // SAFETY: `slot < GROUP_WIDTH <= TAG_LANES` by the assertion above.
        unsafe {
            *self.tags.get_unchecked_mut(slot) = tag;
            self.slots.get_unchecked_mut(slot).write(value);
        }
        self.used |= 1 << slot;
        self.count += 1;
        slot
    }

    /// Finds the first occupied slot whose tag is `tag` and whose value
    /// satisfies `eq`.
    #[inline]
    pub(crate) fn find(&self, tag: u8, eq: impl Fn(&T) -> bool) -> Option<usize> {
        // SAFETY: `match_tag` only reports occupied slots.
        self.match_tag(tag)
            .find(|&slot| eq(unsafe { self.get_unchecked(slot) }))
    }

    /// Removes the value matching `tag` and `eq`, filling the hole with the
    /// last occupied slot.
    #[inline]
    pub(crate) fn remove(&mut self, tag: u8, eq: impl Fn(&T) -> bool) -> Option<T> {
        let slot = self.find(tag, eq)?;
        // SAFETY: `find` only returns occupied slots.
        Some(unsafe { self.remove_at(slot) })
    }

    /// Moves the value out of `slot` and swaps the last occupied slot into
    /// its place.
    ///
    /// # Safety
    ///
    /// The caller must ensure `slot < self.len()`.
    pub(crate) unsafe fn remove_at(&mut self, slot: usize) -> T {
        debug_assert!(slot < self.len());
        let last = self.len() - 1;
        // SAFETY: Caller ensures `slot` is occupied, and `last` is the last
        // occupied slot. After the copy `last` holds a stale duplicate that is
        // released below without being dropped.
        unsafe {
            let value = self.slots.get_unchecked(slot).assume_init_read();
            if slot < last {
                let base = self.slots.as_mut_ptr();
                ptr::copy_nonoverlapping(base.add(last), base.add(slot), 1);
                *self.tags.get_unchecked_mut(slot) = *self.tags.get_unchecked(last);
            }
            self.used >>= 1;
            self.count -= 1;
            value
        }
    }

    /// Removes the last occupied slot.
    #[inline]
    pub(crate) fn pop(&mut self) -> Option<(T, u8)> {
        if self.is_empty() {
            return None;
        }
        let last = self.len() - 1;
        self.used >>= 1;
        self.count -= 1;
        // SAFETY: `last` was occupied before the count was lowered, so the slot
        // is initialized and now owned by us alone.
        unsafe {
            Some((
                self.slots.get_unchecked(last).assume_init_read(),
                *self.tags.get_unchecked(last),
            ))
        }
    }

    /// Partitions the group on `decision_mask`: values whose tag has the bit
    /// set move to `upper`, the rest are compacted in place.
    ///
    /// `upper` must have room for every value that moves, which always holds
    /// when it starts out empty.
    pub(crate) fn split_into(&mut self, upper: &mut Group<T>, decision_mask: u8) {
        let count = self.len();
        // Forget the contents up front: if anything below panics we leak
        // rather than drop a value twice.
        self.count = 0;
        self.used = 0;

        let mut kept = 0;
        for slot in 0..count {
            // SAFETY: `slot < count`, so it was initialized, and it is read
            // exactly once. `kept <= slot`, so writing there never clobbers an
            // unread value.
            unsafe {
                let tag = *self.tags.get_unchecked(slot);
                let value = self.slots.get_unchecked(slot).assume_init_read();
                if tag & decision_mask != 0 {
                    upper.insert_new_unchecked(value, tag);
                } else {
                    *self.tags.get_unchecked_mut(kept) = tag;
                    self.slots.get_unchecked_mut(kept).write(value);
                    kept += 1;
                }
            }
        }

        self.count = kept as u8;
        self.used = used_mask(kept);
    }

    /// Recomputes every tag from a fresh hash, reading tag bits starting at
    /// `shift`.
    pub(crate) fn retag(&mut self, hasher: impl Fn(&T) -> u32, shift: u32) {
        for slot in 0..self.len() {
            // SAFETY: `slot < count`.
            let hash = hasher(unsafe { self.get_unchecked(slot) });
            self.tags[slot] = (hash >> shift) as u8;
        }
    }

    /// Drops every value, leaving an empty group.
    pub(crate) fn clear(&mut self) {
        let count = self.len();
        self.count = 0;
        self.used = 0;
        // SAFETY: The first `count` slots were initialized and are no longer
        // reachable through the group.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.slots.as_mut_ptr().cast::<T>(),
                count,
            ));
        }
    }

    /// Appends clones of every value in `other`, keeping their tags.
    pub(crate) fn extend_cloned(&mut self, other: &Group<T>)
    where
        T: Clone,
    {
        for (slot, value) in other.as_slice().iter().enumerate() {
            self.insert_new_unchecked(value.clone(), other.tag(slot));
        }
    }

    #[inline(always)]
    fn match_tag(&self, tag: u8) -> BitMask {
        BitMask(self.scan_tags(tag) & self.used)
    }

    /// Compare every tag lane against `tag`. Lanes past `count` may report
    /// garbage and must be masked by the caller.
    #[inline(always)]
    fn scan_tags(&self, tag: u8) -> u16 {
        #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
        {
            return self.scan_tags_sse2(tag);
        }

        #[allow(unreachable_code)]
        {
            let mut bits: u16 = 0;
            for (i, &t) in self.tags.iter().enumerate() {
                if t == tag {
                    bits |= 1 << i;
                }
            }
            bits
        }
    }

    #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))]
    #[inline(always)]
    fn scan_tags_sse2(&self, tag: u8) -> u16 {
        use core::arch::x86_64::*;
        // SAFETY: `Group` is `#[repr(C, align(16))]` with the 16 tag bytes at
        // offset 0, so the aligned load stays inside the tag array.
        unsafe {
            let data = _mm_load_si128(self.tags.as_ptr() as *const __m128i);
            let cmp = _mm_cmpeq_epi8(data, _mm_set1_epi8(tag as i8));
            _mm_movemask_epi8(cmp) as u16
        }
    }
}

impl<T> Drop for Group<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Debug for Group<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::ToString;
        use alloc::vec::Vec;

        let tags = (0..GROUP_WIDTH)
            .map(|slot| {
                if slot < self.len() {
                    format!("{:02x}", self.tags[slot])
                } else {
                    "..".to_string()
                }
            })
            .collect::<Vec<_>>();
        f.write_str(&tags.join(" "))
    }
}
