use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;

use crate::group::GROUP_WIDTH;
use crate::group::Group;
use crate::group_array::GroupArray;
use crate::partition::MAX_RADIX_DIGITS;
use crate::partition::radix_partition;

/// Tag bits are re-read from higher hash bits every this many doublings so
/// they never overlap the group index by more than a few bits.
const TAG_SHIFT_STRIDE: u8 = 3;

/// Group indices come from a 32-bit hash, so doubling past this point can no
/// longer separate anything.
const MAX_EXPONENT: u8 = u32::BITS as u8;

#[inline(always)]
fn tag_shift_for(exponent: u8) -> u32 {
    u32::from(exponent.saturating_sub(1) / TAG_SHIFT_STRIDE * TAG_SHIFT_STRIDE)
}

/// Smallest exponent whose group array holds at least `capacity` slots.
fn exponent_for_capacity(capacity: usize) -> u8 {
    let groups = capacity.div_ceil(GROUP_WIDTH).max(1);
    let exponent = groups
        .checked_next_power_of_two()
        .map_or(usize::BITS, usize::trailing_zeros);
    exponent.min(u32::from(MAX_EXPONENT)) as u8
}

/// Debug statistics for a [`HashTable`].
///
/// Only available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Total number of slots across all groups
    pub capacity: usize,
    /// Number of groups in the backing array
    pub group_count: usize,
    /// Groups holding no values
    pub empty_groups: usize,
    /// Groups with every slot occupied
    pub full_groups: usize,
    /// Number of entries in overflow storage
    pub overflow_entries: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Total memory in bytes used by the group array
    pub total_bytes: usize,
    /// Bytes held by unoccupied slots
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Groups: {} ({} empty, {} full)",
            self.group_count, self.empty_groups, self.full_groups
        );
        println!("Overflow: {} entries", self.overflow_entries);
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// A hash table built from fixed-size groups of slots.
///
/// `HashTable<T>` stores values of type `T` without knowing how to hash
/// them: every operation takes the value's 32-bit hash and an equality
/// predicate, and operations that may grow the table also take a `hasher`
/// closure that recomputes the hash of a stored value.
///
/// The low bits of a hash select a group. Each group stores up to
/// [`GROUP_WIDTH`](crate::GROUP_WIDTH) values alongside one-byte tags taken
/// from higher hash bits, and lookups compare all tags of a group at once
/// before touching any value. When a group fills up, the table doubles and
/// every group splits in two on the next hash bit.
///
/// ## Example
///
/// ```rust
/// # use grouped_hash::hash_table::Entry;
/// # use grouped_hash::hash_table::HashTable;
/// # use grouped_hash::hashing::UniversalHashBuilder;
/// # use grouped_hash::hashing::hash32;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// let builder = UniversalHashBuilder::default();
/// let hasher = |p: &Person| hash32(&builder, &p.id);
///
/// let mut table: HashTable<Person> = HashTable::with_capacity(100);
/// let hash = hash32(&builder, &123u64);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     Entry::Vacant(entry) => {
///         entry.insert(
///             Person {
///                 id: 123,
///                 name: "Alice".to_string(),
///             },
///             hasher,
///         );
///     }
///     Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
/// assert_eq!(table.len(), 1);
/// ```
pub struct HashTable<T> {
    groups: GroupArray<T>,
    overflow: Vec<(u32, T)>,
    populated: usize,
    tag_shift: u32,
}

impl<T> Debug for HashTable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return f
                .debug_struct("HashTable")
                .field("groups", &"empty")
                .field("populated", &self.populated)
                .field("capacity", &self.capacity())
                .field("overflow", &self.overflow.len())
                .finish();
        }

        f.debug_struct("HashTable")
            .field("groups", &self.groups)
            .field("tag_shift", &self.tag_shift)
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .field("overflow", &self.overflow.len())
            .finish()
    }
}

impl<T> Clone for HashTable<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            groups: self.groups.clone(),
            overflow: self.overflow.clone(),
            populated: self.populated,
            tag_shift: self.tag_shift,
        }
    }
}

impl<T> Default for HashTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HashTable<T> {
    /// Creates an empty table with a single group.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u32> = HashTable::new();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), grouped_hash::GROUP_WIDTH);
    /// ```
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new hash table with room for at least `capacity` values.
    ///
    /// The actual capacity is rounded up to a power-of-two number of groups.
    /// A table only grows early when a single group overflows, so a table
    /// with capacity `n` usually holds fewer than `n` values before its
    /// first resize.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let exponent = exponent_for_capacity(capacity);
        Self {
            groups: GroupArray::new(exponent),
            overflow: Vec::new(),
            populated: 0,
            tag_shift: tag_shift_for(exponent),
        }
    }

    /// Builds a table from values that are known to be distinct.
    ///
    /// The table is sized for twice as many slots as values, and values are
    /// ordered by their target group before insertion so each group is
    /// filled in one pass over memory. Duplicates are not detected: passing
    /// two equal values stores both.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// # use grouped_hash::hashing::UniversalHashBuilder;
    /// # use grouped_hash::hashing::hash32;
    /// #
    /// let builder = UniversalHashBuilder::default();
    /// let hasher = |v: &u32| hash32(&builder, v);
    ///
    /// let table = HashTable::build_unique((0..1000).collect(), hasher);
    /// assert_eq!(table.len(), 1000);
    /// assert_eq!(table.find(hasher(&500), |&v| v == 500), Some(&500));
    /// ```
    pub fn build_unique(values: Vec<T>, hasher: impl Fn(&T) -> u32) -> Self {
        let mut table = Self::with_capacity(values.len().saturating_mul(2));

        let exponent = u32::from(table.groups.exponent());
        let digits = exponent.min(MAX_RADIX_DIGITS);
        let hashed = values
            .into_iter()
            .map(|value| (hasher(&value), value))
            .collect::<Vec<_>>();

        for (hash, value) in radix_partition(hashed, exponent - digits, digits) {
            table.insert_new(hash, value, &hasher);
        }
        table
    }

    /// Returns the number of elements in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// assert_eq!(table.len(), 0);
    ///
    /// table.insert_new(1, 1u32, |&v| v);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the total number of slots across all groups.
    pub fn capacity(&self) -> usize {
        self.groups.len() * GROUP_WIDTH
    }

    /// Returns the number of groups in the backing array. Always a power of
    /// two.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns an iterator over all values in the table.
    ///
    /// Values are visited group by group, so the order depends on the hashes
    /// and changes whenever the table grows.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for v in 0..10u32 {
    ///     table.insert_new(v, v, |&v| v);
    /// }
    ///
    /// let mut values: Vec<u32> = table.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, (0..10).collect::<Vec<_>>());
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            groups: self.groups.groups(),
            group_index: 0,
            slot_index: 0,
            overflow: self.overflow.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over mutable references to all values.
    ///
    /// Changing a value in a way that changes its hash or equality leaves it
    /// unreachable by lookups.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            groups: self.groups.groups_mut().iter_mut(),
            current: Default::default(),
            overflow: self.overflow.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// The table keeps its capacity. Dropping the iterator early removes the
    /// remaining values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_new(7, 7u32, |&v| v);
    ///
    /// let values: Vec<u32> = table.drain().collect();
    /// assert!(table.is_empty());
    /// assert_eq!(values, [7]);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            table: self,
            group_index: 0,
        }
    }

    /// Removes all elements from the table.
    ///
    /// This operation preserves the table's allocated capacity.
    pub fn clear(&mut self) {
        self.populated = 0;
        self.groups.clear();
        self.overflow.clear();
    }

    /// Grows the table until it has at least `len() + additional` slots.
    ///
    /// Growth splits groups exactly as an overflowing insert would, so this
    /// is only a way to pay the cost up front.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u32> = HashTable::new();
    /// table.reserve(1000, |&v| v);
    /// assert!(table.capacity() >= 1000);
    /// ```
    pub fn reserve(&mut self, additional: usize, hasher: impl Fn(&T) -> u32) {
        let target = exponent_for_capacity(self.populated.saturating_add(additional));
        while self.groups.exponent() < target {
            self.grow(&hasher);
        }
    }

    /// Finds a value by its hash and an equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// # use grouped_hash::hashing::UniversalHashBuilder;
    /// # use grouped_hash::hashing::hash32;
    /// #
    /// let builder = UniversalHashBuilder::default();
    /// let hasher = |s: &String| hash32(&builder, s);
    ///
    /// let mut table = HashTable::new();
    /// table.insert_new(hash32(&builder, "key"), "key".to_string(), hasher);
    ///
    /// assert!(table.find(hash32(&builder, "key"), |s| s == "key").is_some());
    /// assert!(table.find(hash32(&builder, "nope"), |s| s == "nope").is_none());
    /// ```
    #[inline]
    pub fn find(&self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<&T> {
        if self.populated == 0 {
            return None;
        }

        let group = self.target_group(hash);
        if let Some(slot) = group.find(self.tag(hash), &eq) {
            // SAFETY: `find` only returns occupied slots.
            return Some(unsafe { group.get_unchecked(slot) });
        }

        if self.overflow.is_empty() {
            return None;
        }
        self.find_overflow(hash, eq)
    }

    /// Finds a value by its hash and an equality predicate, returning a
    /// mutable reference.
    ///
    /// The value must keep its hash and equality unchanged.
    #[inline]
    pub fn find_mut(&mut self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<&mut T> {
        if self.populated == 0 {
            return None;
        }

        let index = self.group_index(hash);
        let tag = self.tag(hash);
        // SAFETY: `group_index` masks the hash to the array bounds.
        let group = unsafe { self.groups.group_unchecked_mut(index) };
        if let Some(slot) = group.find(tag, &eq) {
            // SAFETY: `find` only returns occupied slots.
            return Some(unsafe { group.get_unchecked_mut(slot) });
        }

        self.overflow
            .iter_mut()
            .find(|(h, v)| *h == hash && eq(v))
            .map(|(_, v)| v)
    }

    /// Gets the entry for a value, which may be vacant or occupied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::Entry;
    /// # use grouped_hash::hash_table::HashTable;
    /// # use grouped_hash::hashing::UniversalHashBuilder;
    /// # use grouped_hash::hashing::hash32;
    /// #
    /// let builder = UniversalHashBuilder::default();
    /// let hasher = |s: &String| hash32(&builder, s);
    ///
    /// let mut table: HashTable<String> = HashTable::new();
    /// let hash = hash32(&builder, "key");
    ///
    /// match table.entry(hash, |s| s == "key") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("key".to_string(), hasher);
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    /// assert!(matches!(table.entry(hash, |s| s == "key"), Entry::Occupied(_)));
    /// ```
    pub fn entry(&mut self, hash: u32, eq: impl Fn(&T) -> bool) -> Entry<'_, T> {
        let index = self.group_index(hash);
        // SAFETY: `group_index` masks the hash to the array bounds.
        let group = unsafe { self.groups.group_unchecked(index) };
        if let Some(slot) = group.find(self.tag(hash), &eq) {
            return Entry::Occupied(OccupiedEntry {
                table: self,
                location: Location::Group { index, slot },
            });
        }

        if !self.overflow.is_empty() {
            if let Some(position) = self.overflow.iter().position(|(h, v)| *h == hash && eq(v)) {
                return Entry::Occupied(OccupiedEntry {
                    table: self,
                    location: Location::Overflow(position),
                });
            }
        }

        Entry::Vacant(VacantEntry { table: self, hash })
    }

    /// Inserts a value that is known not to be in the table.
    ///
    /// The value goes to the group selected by `hash`. If that group is full
    /// the table doubles, splitting every group, until the value fits.
    /// `hasher` must return the same hash the stored values were inserted
    /// with; it is only called while growing.
    ///
    /// Inserting a value that is already present stores a second copy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for v in 0..1000u32 {
    ///     table.insert_new(v.wrapping_mul(0x9E37_79B9), v, |&v| v.wrapping_mul(0x9E37_79B9));
    /// }
    /// assert_eq!(table.len(), 1000);
    /// assert!(table.capacity() >= 1000);
    /// ```
    pub fn insert_new(&mut self, hash: u32, value: T, hasher: impl Fn(&T) -> u32) -> &mut T {
        let mut value = value;
        let (index, slot) = loop {
            let index = self.group_index(hash);
            let tag = self.tag(hash);
            // SAFETY: `group_index` masks the hash to the array bounds.
            let group = unsafe { self.groups.group_unchecked_mut(index) };
            match group.try_insert_new(value, tag) {
                Ok(slot) => break (index, slot),
                Err(rejected) => value = rejected,
            }

            if !self.should_split(index, hash, &hasher) {
                return self.insert_overflow(hash, value);
            }
            self.grow(&hasher);
        };

        self.populated += 1;
        // SAFETY: `index` is in bounds and `slot` was just filled.
        unsafe {
            self.groups
                .group_unchecked_mut(index)
                .get_unchecked_mut(slot)
        }
    }

    /// Removes a value from the table, returning it if it was present.
    ///
    /// The hole left behind is filled by the last value of the same group, so
    /// removal never leaves gaps.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_new(42, 42u32, |&v| v);
    ///
    /// assert_eq!(table.remove(42, |&v| v == 42), Some(42));
    /// assert_eq!(table.remove(42, |&v| v == 42), None);
    /// ```
    pub fn remove(&mut self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<T> {
        if self.populated == 0 {
            return None;
        }

        let index = self.group_index(hash);
        let tag = self.tag(hash);
        // SAFETY: `group_index` masks the hash to the array bounds.
        let group = unsafe { self.groups.group_unchecked_mut(index) };
        if let Some(value) = group.remove(tag, &eq) {
            self.populated -= 1;
            return Some(value);
        }

        if self.overflow.is_empty() {
            return None;
        }
        self.remove_overflow(hash, eq)
    }

    /// Keeps only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for v in 0..100u32 {
    ///     table.insert_new(v, v, |&v| v);
    /// }
    /// table.retain(|v| *v % 2 == 0);
    /// assert_eq!(table.len(), 50);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut T) -> bool) {
        for group in self.groups.groups_mut() {
            let mut slot = 0;
            while slot < group.len() {
                // SAFETY: `slot < group.len()`.
                if f(unsafe { group.get_unchecked_mut(slot) }) {
                    slot += 1;
                    continue;
                }
                self.populated -= 1;
                // SAFETY: `slot < group.len()`. The last value moves into
                // `slot`, so the same index is checked again.
                drop(unsafe { group.remove_at(slot) });
            }
        }

        let before = self.overflow.len();
        self.overflow.retain_mut(|(_, v)| f(v));
        self.populated -= before - self.overflow.len();
    }

    #[inline(always)]
    fn group_index(&self, hash: u32) -> usize {
        hash as usize & self.groups.mask()
    }

    #[inline(always)]
    fn tag(&self, hash: u32) -> u8 {
        (hash >> self.tag_shift) as u8
    }

    #[inline(always)]
    fn target_group(&self, hash: u32) -> &Group<T> {
        // SAFETY: `group_index` masks the hash to the array bounds.
        unsafe { self.groups.group_unchecked(self.group_index(hash)) }
    }

    /// Whether growing can make room in the full group at `index` for a
    /// value hashing to `hash`.
    ///
    /// Every member of the group agrees with `hash` on the low `exponent`
    /// bits. As long as any of them differs somewhere above that, enough
    /// doublings separate it from the new value. Only a group whose members
    /// all share `hash` exactly is hopeless.
    #[cold]
    #[inline(never)]
    fn should_split(&self, index: usize, hash: u32, hasher: &impl Fn(&T) -> u32) -> bool {
        let exponent = self.groups.exponent();
        if exponent >= MAX_EXPONENT {
            return false;
        }

        // SAFETY: Callers pass an index produced by `group_index`.
        let group = unsafe { self.groups.group_unchecked(index) };
        let spread = group
            .as_slice()
            .iter()
            .fold(0, |spread, value| spread | (hasher(value) ^ hash));

        spread != 0
    }

    /// Doubles the group array, retagging first whenever the new exponent
    /// moves the tag window.
    #[cold]
    #[inline(never)]
    fn grow(&mut self, hasher: &impl Fn(&T) -> u32) {
        let exponent = self.groups.exponent();
        debug_assert!(exponent < MAX_EXPONENT);

        let new_shift = tag_shift_for(exponent + 1);
        if new_shift != self.tag_shift {
            for group in self.groups.groups_mut() {
                group.retag(hasher, new_shift);
            }
            self.tag_shift = new_shift;
        }

        // Hash bit `exponent` becomes the new top bit of the group index; it
        // sits at this position inside the tag.
        let decision_mask = 1u8 << (u32::from(exponent) - new_shift);
        self.groups.grow(decision_mask);

        if !self.overflow.is_empty() {
            self.rehome_overflow();
        }
    }

    /// Moves overflowed values back into groups that gained room.
    #[cold]
    fn rehome_overflow(&mut self) {
        let overflow = core::mem::take(&mut self.overflow);
        for (hash, value) in overflow {
            let index = self.group_index(hash);
            let tag = self.tag(hash);
            // SAFETY: `group_index` masks the hash to the array bounds.
            let group = unsafe { self.groups.group_unchecked_mut(index) };
            if let Err(value) = group.try_insert_new(value, tag) {
                self.overflow.push((hash, value));
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn insert_overflow(&mut self, hash: u32, value: T) -> &mut T {
        self.populated += 1;
        let position = self.overflow.len();
        self.overflow.push((hash, value));
        &mut self.overflow[position].1
    }

    #[cold]
    #[inline(never)]
    fn find_overflow(&self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<&T> {
        self.overflow
            .iter()
            .find(|(h, v)| *h == hash && eq(v))
            .map(|(_, v)| v)
    }

    #[cold]
    #[inline(never)]
    fn remove_overflow(&mut self, hash: u32, eq: impl Fn(&T) -> bool) -> Option<T> {
        let position = self
            .overflow
            .iter()
            .position(|(h, v)| *h == hash && eq(v))?;
        self.populated -= 1;
        Some(self.overflow.swap_remove(position).1)
    }

    /// Removes one value, scanning groups from `*cursor` onward and then the
    /// overflow list.
    ///
    /// Values are popped from the end of each group, so the table is
    /// consistent after every call.
    fn take_next(&mut self, cursor: &mut usize) -> Option<T> {
        let groups = self.groups.groups_mut();
        while let Some(group) = groups.get_mut(*cursor) {
            if let Some((value, _)) = group.pop() {
                self.populated -= 1;
                return Some(value);
            }
            *cursor += 1;
        }

        let (_, value) = self.overflow.pop()?;
        self.populated -= 1;
        Some(value)
    }

    /// Computes a histogram of group fill levels.
    ///
    /// Only available with the `stats` feature.
    ///
    /// Returns a vector of length `GROUP_WIDTH + 2`: index `i` in
    /// `0..=GROUP_WIDTH` counts groups holding exactly `i` values, and the
    /// last index counts overflow entries.
    #[cfg(any(test, feature = "stats"))]
    pub fn group_fill_histogram(&self) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; GROUP_WIDTH + 2];
        for group in self.groups.groups() {
            hist[group.len()] += 1;
        }
        hist[GROUP_WIDTH + 1] = self.overflow.len();
        hist
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Only available with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let groups = self.groups.groups();
        let capacity = self.capacity();
        let occupied: usize = groups.iter().map(Group::len).sum();

        DebugStats {
            populated: self.populated,
            capacity,
            group_count: groups.len(),
            empty_groups: groups.iter().filter(|g| g.is_empty()).count(),
            full_groups: groups.iter().filter(|g| g.is_full()).count(),
            overflow_entries: self.overflow.len(),
            load_factor: self.populated as f64 / capacity as f64,
            total_bytes: core::mem::size_of_val(groups),
            wasted_bytes: (capacity - occupied) * core::mem::size_of::<T>(),
        }
    }

    /// Pretty-prints the group fill histogram horizontally using stdout.
    ///
    /// Requires the `stats` and `std` features. Each row is a fill level,
    /// plus an "OF" row for overflowed values.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_group_fill_histogram(&self) {
        let hist = self.group_fill_histogram();
        let max = *hist.iter().max().unwrap_or(&0);
        if max == 0 {
            println!("group fill histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "group fill histogram ({} groups, {} entries):",
            self.group_count(),
            self.populated
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];
            if units % 8 > 0 {
                bar.push(partial[units % 8 - 1]);
            }
            bar
        };

        for (fill, &count) in hist.iter().take(GROUP_WIDTH + 1).enumerate() {
            println!("{:>2} | {} ({})", fill, make_bar(count), count);
        }

        let of_count = hist[GROUP_WIDTH + 1];
        println!("OF | {} ({})", make_bar(of_count), of_count);
    }
}

impl<'a, T> IntoIterator for &'a HashTable<T> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut HashTable<T> {
    type IntoIter = IterMut<'a, T>;
    type Item = &'a mut T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> IntoIterator for HashTable<T> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            group_index: 0,
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, T> {
    /// A vacant entry - the value is not present in the table
    Vacant(VacantEntry<'a, T>),
    /// An occupied entry - the value is present in the table
    Occupied(OccupiedEntry<'a, T>),
}

impl<'a, T> Entry<'a, T> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// # use grouped_hash::hashing::UniversalHashBuilder;
    /// # use grouped_hash::hashing::hash32;
    /// #
    /// let builder = UniversalHashBuilder::default();
    /// let hasher = |s: &String| hash32(&builder, s);
    ///
    /// let mut table: HashTable<String> = HashTable::new();
    /// let hash = hash32(&builder, "key");
    ///
    /// let value = table
    ///     .entry(hash, |s| s == "key")
    ///     .or_insert("key".to_string(), hasher);
    /// assert_eq!(value, "key");
    ///
    /// let existing = table
    ///     .entry(hash, |s| s == "key")
    ///     .or_insert("other".to_string(), hasher);
    /// assert_eq!(existing, "key");
    /// ```
    pub fn or_insert(self, default: T, hasher: impl Fn(&T) -> u32) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default, hasher),
        }
    }

    /// Inserts the result of `default` if the entry is vacant. The closure is
    /// not called for an occupied entry.
    pub fn or_insert_with(
        self,
        default: impl FnOnce() -> T,
        hasher: impl Fn(&T) -> u32,
    ) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default(), hasher),
        }
    }

    /// Applies `f` to an occupied entry's value. Vacant entries are left
    /// alone and yield `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<(u32, u32)> = HashTable::new();
    /// let hash = |v: &(u32, u32)| v.0;
    ///
    /// let result = table.entry(42, |v| v.0 == 42).and_modify(|v| v.1 += 1);
    /// assert_eq!(result, None);
    ///
    /// table.entry(42, |v| v.0 == 42).or_insert((42, 0), hash);
    /// let result = table.entry(42, |v| v.0 == 42).and_modify(|v| v.1 += 1);
    /// assert_eq!(result, Some(&mut (42, 1)));
    /// ```
    pub fn and_modify(self, f: impl FnOnce(&mut T)) -> Option<&'a mut T> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `T::default()` if the entry is vacant.
    pub fn or_default(self, hasher: impl Fn(&T) -> u32) -> &'a mut T
    where
        T: Default,
    {
        self.or_insert_with(Default::default, hasher)
    }
}

/// A view into a vacant entry in the hash table.
///
/// [`entry`]: HashTable::entry
///
/// This struct is created by the [`entry`] method on [`HashTable`] when no
/// stored value matched.
pub struct VacantEntry<'a, T> {
    table: &'a mut HashTable<T>,
    hash: u32,
}

impl<'a, T> VacantEntry<'a, T> {
    /// The hash this entry was looked up with.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Inserts `value` and returns a mutable reference to it.
    ///
    /// `value` must hash to [`hash`](Self::hash) and match the predicate the
    /// entry was created with. `hasher` is used if the table has to grow.
    pub fn insert(self, value: T, hasher: impl Fn(&T) -> u32) -> &'a mut T {
        self.table.insert_new(self.hash, value, hasher)
    }
}

enum Location {
    Group { index: usize, slot: usize },
    Overflow(usize),
}

/// A view into an occupied entry in the hash table.
///
/// This struct is created by the [`entry`] method on [`HashTable`] when a
/// stored value matched.
///
/// [`entry`]: HashTable::entry
pub struct OccupiedEntry<'a, T> {
    table: &'a mut HashTable<T>,
    location: Location,
}

impl<'a, T> OccupiedEntry<'a, T> {
    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &T {
        match self.location {
            // SAFETY: The location was produced by a successful lookup and the
            // entry holds the table's only borrow since.
            Location::Group { index, slot } => unsafe {
                self.table
                    .groups
                    .group_unchecked(index)
                    .get_unchecked(slot)
            },
            Location::Overflow(position) => &self.table.overflow[position].1,
        }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut T {
        match self.location {
            // SAFETY: The location was produced by a successful lookup and the
            // entry holds the table's only borrow since.
            Location::Group { index, slot } => unsafe {
                self.table
                    .groups
                    .group_unchecked_mut(index)
                    .get_unchecked_mut(slot)
            },
            Location::Overflow(position) => &mut self.table.overflow[position].1,
        }
    }

    /// Converts the entry into a mutable reference to the value with the
    /// lifetime of the entry.
    pub fn into_mut(self) -> &'a mut T {
        match self.location {
            // SAFETY: The location was produced by a successful lookup and the
            // entry holds the table's only borrow since.
            Location::Group { index, slot } => unsafe {
                self.table
                    .groups
                    .group_unchecked_mut(index)
                    .get_unchecked_mut(slot)
            },
            Location::Overflow(position) => &mut self.table.overflow[position].1,
        }
    }

    /// Removes the entry from the table and returns the value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use grouped_hash::hash_table::Entry;
    /// # use grouped_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_new(5, 5u32, |&v| v);
    ///
    /// let removed = match table.entry(5, |&v| v == 5) {
    ///     Entry::Occupied(entry) => entry.remove(),
    ///     Entry::Vacant(_) => unreachable!(),
    /// };
    /// assert_eq!(removed, 5);
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(self) -> T {
        self.table.populated -= 1;
        match self.location {
            // SAFETY: The location was produced by a successful lookup and the
            // entry holds the table's only borrow since.
            Location::Group { index, slot } => unsafe {
                self.table
                    .groups
                    .group_unchecked_mut(index)
                    .remove_at(slot)
            },
            Location::Overflow(position) => self.table.overflow.swap_remove(position).1,
        }
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`]. It walks
/// `(group_index, slot_index)` positions in order, then the overflow list.
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, T> {
    groups: &'a [Group<T>],
    group_index: usize,
    slot_index: usize,
    overflow: core::slice::Iter<'a, (u32, T)>,
    remaining: usize,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            groups: self.groups,
            group_index: self.group_index,
            slot_index: self.slot_index,
            overflow: self.overflow.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(group) = self.groups.get(self.group_index) {
            if let Some(value) = group.as_slice().get(self.slot_index) {
                self.slot_index += 1;
                self.remaining -= 1;
                return Some(value);
            }
            self.group_index += 1;
            self.slot_index = 0;
        }

        let (_, value) = self.overflow.next()?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// A mutable iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter_mut`] method on [`HashTable`].
///
/// [`iter_mut`]: HashTable::iter_mut
pub struct IterMut<'a, T> {
    groups: core::slice::IterMut<'a, Group<T>>,
    current: core::slice::IterMut<'a, T>,
    overflow: core::slice::IterMut<'a, (u32, T)>,
    remaining: usize,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.current.next() {
                self.remaining -= 1;
                return Some(value);
            }
            match self.groups.next() {
                Some(group) => self.current = group.as_mut_slice().iter_mut(),
                None => break,
            }
        }

        let (_, value) = self.overflow.next()?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`]. It
/// yields owned values and empties the table as it iterates.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, T> {
    table: &'a mut HashTable<T>,
    group_index: usize,
}

impl<T> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.take_next(&mut self.group_index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

impl<T> FusedIterator for Drain<'_, T> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<T> {
    table: HashTable<T>,
    group_index: usize,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.table.take_next(&mut self.group_index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::cell::Cell;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u32 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish() as u32
    }

    fn hash_string_key(state: &HashState, key: &str) -> u32 {
        let mut h = state.build_hasher();
        h.write(key.as_bytes());
        h.finish() as u32
    }

    /// Checks that every value sits in the group its hash selects and carries
    /// the tag the current shift produces.
    fn assert_placement<T>(table: &HashTable<T>, hasher: impl Fn(&T) -> u32) {
        let mut total = 0;
        for (index, group) in table.groups.groups().iter().enumerate() {
            for (slot, value) in group.as_slice().iter().enumerate() {
                let hash = hasher(value);
                assert_eq!(hash as usize & table.groups.mask(), index);
                assert_eq!(group.tag(slot), (hash >> table.tag_shift) as u8);
            }
            total += group.len();
        }
        assert_eq!(total + table.overflow.len(), table.len());
        assert_eq!(table.tag_shift, tag_shift_for(table.groups.exponent()));
    }

    #[test]
    fn tag_shift_schedule() {
        let shifts: Vec<u32> = (0..11).map(tag_shift_for).collect();
        assert_eq!(shifts, [0, 0, 0, 0, 3, 3, 3, 6, 6, 6, 9]);
        assert_eq!(tag_shift_for(MAX_EXPONENT), 30);
    }

    #[test]
    fn capacity_rounds_to_groups() {
        assert_eq!(exponent_for_capacity(0), 0);
        assert_eq!(exponent_for_capacity(GROUP_WIDTH), 0);
        assert_eq!(exponent_for_capacity(GROUP_WIDTH + 1), 1);
        assert_eq!(exponent_for_capacity(GROUP_WIDTH * 5), 3);
        assert_eq!(exponent_for_capacity(usize::MAX), MAX_EXPONENT);

        let table: HashTable<u8> = HashTable::with_capacity(100);
        assert!(table.capacity() >= 100);
        assert!(table.group_count().is_power_of_two());
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let hasher = |v: &Item| hash_key(&state, v.key);
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            match table.entry(hash, |v: &Item| v.key == k) {
                Entry::Vacant(v) => {
                    v.insert(
                        Item {
                            key: k,
                            value: (k as i32) * 2,
                        },
                        hasher,
                    );
                    assert_eq!(
                        table.find(hash, |v| v.key == k),
                        Some(&Item {
                            key: k,
                            value: (k as i32) * 2
                        }),
                        "{:#?}",
                        table
                    );
                }
                Entry::Occupied(_) => panic!("unexpected occupied on first insert: {:#?}", table),
            }
        }
        assert_eq!(table.len(), 32);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: (k as i32) * 2
                }),
                "{:#?}",
                table
            );
        }

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
        assert_placement(&table, hasher);
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let hasher = |v: &Item| hash_key(&state, v.key);
        let mut table: HashTable<Item> = HashTable::new();
        let k = 42u64;
        let hash = hash_key(&state, k);

        match table.entry(hash, |v| v.key == k) {
            Entry::Vacant(v) => {
                assert_eq!(v.hash(), hash);
                v.insert(Item { key: k, value: 7 }, hasher);
            }
            Entry::Occupied(_) => panic!("should be vacant first time"),
        }

        match table.entry(hash, |v| v.key == k) {
            Entry::Occupied(mut occ) => {
                let prev_value = occ.get().value;
                *occ.get_mut() = Item { key: k, value: 11 };
                assert_eq!(prev_value, 7, "{:#?}", table);
            }
            Entry::Vacant(_) => panic!("should be occupied: {}#{:02X} in {:#?}", k, hash, table),
        }
        let found = table.find(hash, |v| v.key == k).unwrap();
        assert_eq!(found.value, 11);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let hasher = |v: &Item| hash_key(&state, v.key);
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..5u64 {
            table.insert_new(hash_key(&state, k), Item { key: k, value: 1 }, hasher);
        }
        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            let item = table.find_mut(hash, |v| v.key == k).unwrap();
            item.value += k as i32;
        }
        for k in 0..5u64 {
            let hash = hash_key(&state, k);
            assert_eq!(table.find(hash, |v| v.key == k).unwrap().value, 1 + k as i32);
        }
        assert!(table.find_mut(hash_key(&state, 5), |v| v.key == 5).is_none());
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let hasher = |v: &Item| hash_key(&state, v.key);
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..100u64 {
            table.insert_new(hash_key(&state, k), Item { key: k, value: k as i32 }, hasher);
        }

        for k in (0..100u64).step_by(3) {
            let removed = table.remove(hash_key(&state, k), |v| v.key == k);
            assert_eq!(removed.map(|item| item.key), Some(k));
        }
        assert_eq!(table.len(), 100 - 34);

        for k in 0..100u64 {
            let found = table.find(hash_key(&state, k), |v| v.key == k).is_some();
            assert_eq!(found, k % 3 != 0, "key {k}");
        }

        // Removing an absent value is a no-op.
        assert!(table.remove(hash_key(&state, 0), |v| v.key == 0).is_none());
        assert_eq!(table.len(), 66);
        assert_placement(&table, hasher);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many() {
        let state = HashState::default();
        let hasher = |v: &u64| hash_key(&state, *v);
        let mut table: HashTable<u64> = HashTable::new();
        for k in 0..20_000u64 {
            table.insert_new(hasher(&k), k, hasher);
            assert_eq!(table.len(), k as usize + 1);
        }

        assert!(table.capacity() >= table.len());
        assert!(table.group_count() > 1);
        for k in 0..20_000u64 {
            assert_eq!(table.find(hasher(&k), |&v| v == k), Some(&k));
        }
        for k in 20_000..21_000u64 {
            assert_eq!(table.find(hasher(&k), |&v| v == k), None);
        }
        assert_placement(&table, hasher);
    }

    #[test]
    fn growth_crosses_retag_boundaries() {
        // Identity hashes walk the group index through every low bit, so each
        // doubling and each retag is exercised deterministically.
        let hasher = |v: &u32| *v;
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..4096u32 {
            table.insert_new(v, v, hasher);
        }
        assert!(table.groups.exponent() >= 9);
        assert_placement(&table, hasher);
        for v in 0..4096u32 {
            assert_eq!(table.find(v, |&x| x == v), Some(&v));
        }
        assert!(table.overflow.is_empty());
    }

    #[test]
    fn explicit_collision() {
        let hasher = |_: &u64| 0xDEAD_BEEF;
        let mut table: HashTable<u64> = HashTable::new();
        for k in 0..100u64 {
            table.insert_new(0xDEAD_BEEF, k, hasher);
        }

        // Identical hashes can never be split apart, so the table stays small.
        assert_eq!(table.capacity(), GROUP_WIDTH);
        assert_eq!(table.overflow.len(), 100 - GROUP_WIDTH);
        assert_eq!(table.len(), 100);

        for k in 0..100u64 {
            assert_eq!(table.find(0xDEAD_BEEF, |&v| v == k), Some(&k));
        }
        for k in (0..100u64).rev() {
            assert_eq!(table.remove(0xDEAD_BEEF, |&v| v == k), Some(k));
        }
        assert!(table.is_empty());
    }

    #[test]
    fn strided_hashes_grow_until_split() {
        // These hashes agree on their low 6 bits, so the first group fills
        // before any doubling can separate them.
        let hasher = |v: &u32| v << 6;
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..(GROUP_WIDTH as u32 + 4) {
            table.insert_new(hasher(&v), v, hasher);
        }
        assert!(table.overflow.is_empty());
        assert!(table.group_count() > 64);
        assert_eq!(table.len(), GROUP_WIDTH + 4);
        for v in 0..(GROUP_WIDTH as u32 + 4) {
            assert_eq!(table.find(hasher(&v), |&x| x == v), Some(&v));
        }
        assert_placement(&table, hasher);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn structured_keys_keep_growing() {
        let hasher = |v: &u32| *v;
        let mut table: HashTable<u32> = HashTable::new();
        for k in 0..5000u32 {
            table.insert_new(k * 1024, k * 1024, hasher);
        }

        assert_eq!(table.len(), 5000);
        assert!(table.overflow.is_empty());
        assert!(table.group_count() >= 5000 / GROUP_WIDTH);
        for k in 0..5000u32 {
            assert_eq!(table.find(k * 1024, |&v| v == k * 1024), Some(&(k * 1024)));
        }
        assert!(table.find(1, |&v| v == 1).is_none());
        assert_placement(&table, hasher);
    }

    #[test]
    fn near_collision_splits() {
        // Hashes differing only at bit 3 need four doublings to separate.
        let hasher = |v: &u32| (v & 1) << 3;
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..(GROUP_WIDTH as u32 * 2) {
            table.insert_new(hasher(&v), v, hasher);
        }
        assert!(table.overflow.len() < GROUP_WIDTH * 2);
        assert!(table.group_count() >= 16);
        assert_placement(&table, hasher);
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let hasher = |v: &Item| hash_key(&state, v.key);
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..50u64 {
            table.insert_new(hash_key(&state, k), Item { key: k, value: 0 }, hasher);
        }

        let iter = table.iter();
        assert_eq!(iter.len(), 50);
        let mut keys: Vec<u64> = iter.map(|item| item.key).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..50).collect::<Vec<_>>());

        for item in table.iter_mut() {
            item.value = item.key as i32;
        }
        assert!(table.iter().all(|item| item.value == item.key as i32));

        let capacity = table.capacity();
        let mut drained: Vec<u64> = table.drain().map(|item| item.key).collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..50).collect::<Vec<_>>());
        assert!(table.is_empty());
        assert_eq!(table.iter().count(), 0);
        assert_eq!(table.capacity(), capacity);
    }

    #[test]
    fn partial_drain_empties_table() {
        let hasher = |v: &u32| v.wrapping_mul(0x9E37_79B9);
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..100 {
            table.insert_new(hasher(&v), v, hasher);
        }

        let mut drain = table.drain();
        assert_eq!(drain.len(), 100);
        drain.next();
        drain.next();
        assert_eq!(drain.len(), 98);
        drop(drain);
        assert!(table.is_empty());

        // The table is reusable afterwards.
        table.insert_new(hasher(&1), 1, hasher);
        assert_eq!(table.find(hasher(&1), |&v| v == 1), Some(&1));
    }

    #[test]
    fn into_iter_yields_everything() {
        let hasher = |v: &u32| *v;
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..30 {
            table.insert_new(v, v, hasher);
        }
        for _ in 0..3 {
            table.insert_new(0, 100, hasher);
        }
        let mut values: Vec<u32> = table.into_iter().collect();
        values.sort_unstable();
        let mut expected: Vec<u32> = (0..30).collect();
        expected.extend([100, 100, 100]);
        assert_eq!(values, expected);
    }

    #[test]
    fn insert_and_find_string_keys() {
        let state = HashState::default();
        let hasher = |s: &String| hash_string_key(&state, s);
        let mut table: HashTable<String> = HashTable::new();
        let keys = ["apple", "banana", "cherry", "date", "elderberry"];
        for key in keys {
            table
                .entry(hash_string_key(&state, key), |s| s == key)
                .or_insert(key.to_string(), hasher);
        }
        for key in keys {
            assert_eq!(
                table
                    .find(hash_string_key(&state, key), |s| s == key)
                    .map(String::as_str),
                Some(key)
            );
        }
        assert!(table.find(hash_string_key(&state, "fig"), |s| s == "fig").is_none());

        let removed = table.remove(hash_string_key(&state, "banana"), |s| s == "banana");
        assert_eq!(removed.as_deref(), Some("banana"));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn entry_or_insert_with() {
        let state = HashState::default();
        let hasher = |v: &Item| hash_key(&state, v.key);
        let mut table: HashTable<Item> = HashTable::new();
        let hash = hash_key(&state, 9);

        let value = table
            .entry(hash, |v| v.key == 9)
            .or_insert_with(|| Item { key: 9, value: 90 }, hasher);
        value.value += 1;

        let value = table
            .entry(hash, |v| v.key == 9)
            .or_insert_with(|| panic!("should not be called"), hasher);
        assert_eq!(value.value, 91);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn entry_or_default() {
        let mut table: HashTable<u32> = HashTable::new();
        *table.entry(0, |&v| v == 0).or_default(|&v| v) += 0;
        assert_eq!(table.find(0, |&v| v == 0), Some(&0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn entry_on_overflowed_value() {
        let hasher = |_: &u32| 7;
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..(GROUP_WIDTH as u32 + 2) {
            table.insert_new(7, v, hasher);
        }
        let last = GROUP_WIDTH as u32 + 1;

        match table.entry(7, |&v| v == last) {
            Entry::Occupied(mut entry) => {
                assert_eq!(*entry.get(), last);
                *entry.get_mut() = 500;
            }
            Entry::Vacant(_) => panic!("overflowed value not found: {table:#?}"),
        }
        match table.entry(7, |&v| v == 500) {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), 500),
            Entry::Vacant(_) => panic!("modified value not found"),
        }
        assert_eq!(table.len(), GROUP_WIDTH + 1);
        assert!(table.find(7, |&v| v == 500).is_none());
    }

    #[test]
    fn retain_keeps_matching() {
        let hasher = |v: &u32| *v;
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..500 {
            table.insert_new(v, v, hasher);
        }
        for _ in 0..GROUP_WIDTH + 5 {
            table.insert_new(0, 0, hasher);
        }

        table.retain(|v| *v % 5 != 0);
        assert_eq!(table.len(), 400);
        assert!(table.overflow.is_empty());
        for v in 0..500 {
            assert_eq!(table.find(v, |&x| x == v).is_some(), v % 5 != 0);
        }
        assert_placement(&table, hasher);
    }

    #[test]
    fn build_unique_finds_everything() {
        let state = HashState::default();
        let hasher = |v: &u64| hash_key(&state, *v);
        let values: Vec<u64> = (0..5000).collect();
        let table = HashTable::build_unique(values, hasher);

        assert_eq!(table.len(), 5000);
        assert!(table.capacity() >= 10_000);
        for k in 0..5000u64 {
            assert_eq!(table.find(hasher(&k), |&v| v == k), Some(&k));
        }
        assert!(table.find(hasher(&5000), |&v| v == 5000).is_none());
        assert_placement(&table, hasher);
    }

    #[test]
    fn build_unique_empty() {
        let table = HashTable::build_unique(Vec::<u32>::new(), |&v| v);
        assert!(table.is_empty());
        assert_eq!(table.group_count(), 1);
    }

    #[test]
    fn clone_is_independent() {
        let state = HashState::default();
        let hasher = |v: &Item| hash_key(&state, v.key);
        let mut table: HashTable<Item> = HashTable::new();
        for k in 0..200u64 {
            table.insert_new(hash_key(&state, k), Item { key: k, value: 1 }, hasher);
        }

        let mut copy = table.clone();
        assert_eq!(copy.len(), table.len());
        assert_eq!(copy.capacity(), table.capacity());

        copy.remove(hash_key(&state, 0), |v| v.key == 0);
        copy.find_mut(hash_key(&state, 1), |v| v.key == 1).unwrap().value = 99;

        assert_eq!(table.len(), 200);
        assert!(table.find(hash_key(&state, 0), |v| v.key == 0).is_some());
        assert_eq!(table.find(hash_key(&state, 1), |v| v.key == 1).unwrap().value, 1);
        assert_eq!(copy.len(), 199);
    }

    #[test]
    fn clone_with_overflow() {
        let hasher = |_: &String| 3;
        let mut table: HashTable<String> = HashTable::new();
        for v in 0..GROUP_WIDTH + 3 {
            table.insert_new(3, v.to_string(), hasher);
        }
        let copy = table.clone();
        table.clear();
        assert_eq!(copy.len(), GROUP_WIDTH + 3);
        assert_eq!(copy.overflow.len(), 3);
        for v in 0..GROUP_WIDTH + 3 {
            let key = v.to_string();
            assert!(copy.find(3, |s| *s == key).is_some());
        }
    }

    #[test]
    fn clear_keeps_capacity() {
        let hasher = |v: &u32| *v;
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..1000 {
            table.insert_new(v, v, hasher);
        }
        let capacity = table.capacity();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert!(table.find(5, |&v| v == 5).is_none());
    }

    #[test]
    fn values_dropped_exactly_once() {
        struct Counted {
            key: u32,
            drops: Rc<Cell<usize>>,
        }
        impl Drop for Counted {
            fn drop(&mut self) {
                self.drops.set(self.drops.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let hasher = |v: &Counted| v.key % 64;
        {
            let mut table: HashTable<Counted> = HashTable::new();
            for key in 0..1000 {
                let value = Counted {
                    key,
                    drops: drops.clone(),
                };
                table.insert_new(key % 64, value, hasher);
            }
            assert_eq!(drops.get(), 0);

            drop(table.remove(5, |v| v.key == 5));
            assert_eq!(drops.get(), 1);

            table.retain(|v| v.key % 2 == 0);
            assert_eq!(drops.get(), 500);

            let mut drain = table.drain();
            drop(drain.next());
            drop(drain);
            assert_eq!(drops.get(), 1000);
            table.insert_new(1, Counted { key: 1, drops: drops.clone() }, hasher);
        }
        assert_eq!(drops.get(), 1001);
    }

    #[test]
    fn zero_sized_values() {
        let mut table: HashTable<()> = HashTable::new();
        table.insert_new(1, (), |_| 1);
        assert_eq!(table.find(1, |_| true), Some(&()));
        assert_eq!(table.remove(1, |_| true), Some(()));
        assert!(table.is_empty());
    }

    #[test]
    fn debug_output() {
        let mut table: HashTable<u32> = HashTable::new();
        assert!(alloc::format!("{table:?}").contains("empty"));
        table.insert_new(0xAB00, 1, |_| 0xAB00);
        let output = alloc::format!("{table:?}");
        assert!(output.contains("populated: 1"), "{output}");
    }

    #[test]
    fn stats_and_histogram() {
        let hasher = |v: &u32| v.wrapping_mul(0x9E37_79B9);
        let mut table: HashTable<u32> = HashTable::new();
        for v in 0..1000 {
            table.insert_new(hasher(&v), v, hasher);
        }

        let hist = table.group_fill_histogram();
        assert_eq!(hist.len(), GROUP_WIDTH + 2);
        assert_eq!(hist[..=GROUP_WIDTH].iter().sum::<usize>(), table.group_count());
        let stored: usize = hist[..=GROUP_WIDTH]
            .iter()
            .enumerate()
            .map(|(fill, count)| fill * count)
            .sum();
        assert_eq!(stored + hist[GROUP_WIDTH + 1], table.len());

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 1000);
        assert_eq!(stats.capacity, table.capacity());
        assert_eq!(stats.group_count, table.group_count());
        assert!(stats.load_factor > 0.0 && stats.load_factor <= 1.0);

        #[cfg(feature = "std")]
        {
            stats.print();
            table.print_group_fill_histogram();
        }
    }

    #[test]
    fn single_values_round_trip() {
        let state = HashState::default();
        let mut table: HashTable<String> = HashTable::new();
        let hasher = |s: &String| hash_string_key(&state, s);
        let words = vec!["one", "two", "three"];
        for word in &words {
            table.insert_new(hasher(&word.to_string()), word.to_string(), hasher);
            assert!(table.find(hasher(&word.to_string()), |s| s == word).is_some());
            assert!(
                table
                    .remove(hasher(&word.to_string()), |s| s == word)
                    .is_some()
            );
            assert!(table.find(hasher(&word.to_string()), |s| s == word).is_none());
        }
        assert!(table.is_empty());
    }
}
