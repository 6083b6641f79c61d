use alloc::vec;
use alloc::vec::Vec;
use core::mem::MaybeUninit;

/// Upper bound on the number of radix digits used when ordering a bulk build.
pub(crate) const MAX_RADIX_DIGITS: u32 = 8;

/// Stable counting sort of hashed values by `(hash >> shift) & (2^digits - 1)`.
///
/// Bulk builds feed values to their groups in this order so consecutive
/// inserts touch neighboring memory.
pub(crate) fn radix_partition<T>(
    items: Vec<(u32, T)>,
    shift: u32,
    digits: u32,
) -> Vec<(u32, T)> {
    debug_assert!(digits <= MAX_RADIX_DIGITS);
    debug_assert!(shift + digits <= u32::BITS);
    if digits == 0 || items.len() < 2 {
        return items;
    }

    let mask = (1u32 << digits) - 1;
    let bucket = |hash: u32| ((hash >> shift) & mask) as usize;

    let mut offsets = vec![0usize; 1 << digits];
    for (hash, _) in &items {
        offsets[bucket(*hash)] += 1;
    }

    let mut start = 0;
    for offset in offsets.iter_mut() {
        let count = *offset;
        *offset = start;
        start += count;
    }

    let mut sorted: Vec<MaybeUninit<(u32, T)>> = Vec::with_capacity(items.len());
    sorted.resize_with(items.len(), MaybeUninit::uninit);
    for item in items {
        let next = &mut offsets[bucket(item.0)];
        sorted[*next].write(item);
        *next += 1;
    }

    sorted
        .into_iter()
        // SAFETY: The bucket offsets partition `0..len`, and every item was
        // written to a distinct index, so every slot is initialized.
        .map(|item| unsafe { item.assume_init() })
        .collect()
}
