use alloc::vec::Vec;
use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::hash_table::HashTable;
use crate::hashing::DefaultHashBuilder;
use crate::hashing::hash32;

/// A hash set backed by the grouped [`HashTable`].
///
/// `HashSet<T, S>` stores values of type `T` where `T` implements `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash values. Hashes are
/// folded to 32 bits: the low bits pick a group, and a byte above them is
/// stored as a tag so lookups only compare values whose tag matches.
///
/// # Examples
///
/// ```rust
/// use grouped_hash::HashSet;
///
/// let mut set: HashSet<i32> = HashSet::from([4, 5, 6]);
/// assert_eq!(set.len(), 3);
///
/// set.insert(7);
/// assert!(set.contains(&7));
/// assert!(!set.contains(&3));
///
/// set.remove(&4);
/// assert_eq!(set.len(), 3);
/// ```
#[derive(Clone)]
pub struct HashSet<T, S = DefaultHashBuilder> {
    table: HashTable<T>,
    hash_builder: S,
}

impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T, S> Debug for HashSet<T, S>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter()).finish()
    }
}

impl<T, S> HashSet<T, S> {
    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots in the set's groups.
    ///
    /// Growth is driven by individual groups filling up, so the set usually
    /// resizes before every slot is taken.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::with_capacity(100);
    /// assert!(set.capacity() >= 100);
    /// ```
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all elements from the set, keeping its capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::from([1, 2, 3]);
    /// let capacity = set.capacity();
    /// set.clear();
    /// assert!(set.is_empty());
    /// assert_eq!(set.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over the values of the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::from([1, 2]);
    /// let mut values: Vec<i32> = set.iter().copied().collect();
    /// values.sort();
    /// assert_eq!(values, [1, 2]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator that removes and yields all values from the
    /// set.
    ///
    /// After calling `drain()`, the set will be empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::from([1, 2]);
    /// let values: Vec<_> = set.drain().collect();
    /// assert!(set.is_empty());
    /// assert_eq!(values.len(), 2);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::from([1, 2, 3, 4]);
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(v));
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    /// use grouped_hash::UniversalHashBuilder;
    ///
    /// let set: HashSet<i32, _> = HashSet::with_hasher(UniversalHashBuilder::with_keys(3, 5));
    /// assert!(set.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash set with the specified capacity and hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Builds a set from values that are known to be distinct, using the
    /// given hasher builder.
    ///
    /// This is faster than inserting one value at a time: the set is sized
    /// up front and values are placed in group order. Duplicates are not
    /// detected, and a set built from duplicate values reports them twice.
    pub fn from_unique_with_hasher(values: Vec<T>, hash_builder: S) -> Self {
        let table = HashTable::build_unique(values, |v| hash32(&hash_builder, v));
        Self {
            table,
            hash_builder,
        }
    }

    /// Reserves room for at least `additional` more values.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.reserve(1000);
    /// assert!(set.capacity() >= 1000);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, |v| hash32(&self.hash_builder, v));
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An existing equal value
    /// is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// assert_eq!(set.insert(37), true);
    /// assert_eq!(set.insert(37), false);
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        let hash = hash32(&self.hash_builder, &value);
        match self.table.entry(hash, |v| v == &value) {
            crate::hash_table::Entry::Occupied(_) => false,
            crate::hash_table::Entry::Vacant(entry) => {
                entry.insert(value, |v| hash32(&self.hash_builder, v));
                true
            }
        }
    }

    /// Adds a value that is known not to be in the set, skipping the
    /// duplicate check.
    ///
    /// Inserting a value that is already present is a logic error: debug
    /// builds panic, release builds store a second copy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::new();
    /// set.insert_new(4);
    /// set.insert_new(5);
    /// assert_eq!(set.len(), 2);
    /// ```
    pub fn insert_new(&mut self, value: T) {
        debug_assert!(
            !self.contains(&value),
            "insert_new called with a value already in the set"
        );
        let hash = hash32(&self.hash_builder, &value);
        self.table
            .insert_new(hash, value, |v| hash32(&self.hash_builder, v));
    }

    /// Returns `true` if the set contains a value.
    ///
    /// The value may be any borrowed form of the set's value type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let set: HashSet<String> = HashSet::from(["a".to_string()]);
    /// assert!(set.contains("a"));
    /// assert!(!set.contains("b"));
    /// ```
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(value).is_some()
    }

    /// Returns a reference to the value in the set, if any, that is equal to
    /// the given value.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash32(&self.hash_builder, value);
        self.table.find(hash, |v| v.borrow() == value)
    }

    /// Removes a value from the set. Returns whether the value was
    /// present in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::from([1]);
    /// assert_eq!(set.remove(&1), true);
    /// assert_eq!(set.remove(&1), false);
    /// ```
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the value in the set, if any, that is equal to the
    /// given one.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash32(&self.hash_builder, value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Adds a value to the set, replacing the existing value, if any, that is
    /// equal to the given one. Returns the replaced value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let mut set: HashSet<i32> = HashSet::from([1]);
    /// assert_eq!(set.replace(1), Some(1));
    /// assert_eq!(set.replace(2), None);
    /// assert_eq!(set.len(), 2);
    /// ```
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = hash32(&self.hash_builder, &value);
        match self.table.entry(hash, |v| v == &value) {
            crate::hash_table::Entry::Occupied(mut entry) => {
                Some(core::mem::replace(entry.get_mut(), value))
            }
            crate::hash_table::Entry::Vacant(entry) => {
                entry.insert(value, |v| hash32(&self.hash_builder, v));
                None
            }
        }
    }

    /// Returns `true` if the set contains no elements in common with `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let a: HashSet<i32> = HashSet::from([1, 2]);
    /// let b: HashSet<i32> = HashSet::from([3, 4]);
    /// assert!(a.is_disjoint(&b));
    /// ```
    pub fn is_disjoint(&self, other: &HashSet<T, S>) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if `other` contains every element of `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let sup: HashSet<i32> = HashSet::from([1, 2, 3]);
    /// let sub: HashSet<i32> = HashSet::from([1, 2]);
    /// assert!(sub.is_subset(&sup));
    /// assert!(!sup.is_subset(&sub));
    /// ```
    pub fn is_subset(&self, other: &HashSet<T, S>) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if `self` contains every element of `other`.
    pub fn is_superset(&self, other: &HashSet<T, S>) -> bool {
        other.is_subset(self)
    }

    /// Visits the values in `self` or `other`, without duplicates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let a: HashSet<i32> = HashSet::from([1, 2, 3]);
    /// let b: HashSet<i32> = HashSet::from([3, 4]);
    /// let mut union: Vec<i32> = a.union(&b).copied().collect();
    /// union.sort();
    /// assert_eq!(union, [1, 2, 3, 4]);
    /// ```
    pub fn union<'a>(&'a self, other: &'a HashSet<T, S>) -> Union<'a, T, S> {
        Union {
            iter: self.iter(),
            other_iter: other.iter(),
            other_set: self,
        }
    }

    /// Visits the values in both `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let a: HashSet<i32> = HashSet::from([1, 2, 3]);
    /// let b: HashSet<i32> = HashSet::from([2, 3, 4]);
    /// let mut common: Vec<i32> = a.intersection(&b).copied().collect();
    /// common.sort();
    /// assert_eq!(common, [2, 3]);
    /// ```
    pub fn intersection<'a>(&'a self, other: &'a HashSet<T, S>) -> Intersection<'a, T, S> {
        let (smaller, larger) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        Intersection {
            iter: smaller.iter(),
            other: larger,
        }
    }

    /// Visits the values in `self` that are not in `other`.
    pub fn difference<'a>(&'a self, other: &'a HashSet<T, S>) -> Difference<'a, T, S> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Visits the values in exactly one of `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let a: HashSet<i32> = HashSet::from([1, 2, 3]);
    /// let b: HashSet<i32> = HashSet::from([2, 3, 4]);
    /// let mut diff: Vec<i32> = a.symmetric_difference(&b).copied().collect();
    /// diff.sort();
    /// assert_eq!(diff, [1, 4]);
    /// ```
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a HashSet<T, S>,
    ) -> SymmetricDifference<'a, T, S> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Creates a new hash set using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let set: HashSet<i32> = HashSet::new();
    /// assert!(set.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash set with the specified capacity using the default
    /// hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }

    /// Builds a set from values that are known to be distinct.
    ///
    /// See [`from_unique_with_hasher`](Self::from_unique_with_hasher).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grouped_hash::HashSet;
    ///
    /// let set: HashSet<u32> = HashSet::from_unique((0..10_000).collect());
    /// assert_eq!(set.len(), 10_000);
    /// assert!(set.contains(&9_999));
    /// ```
    pub fn from_unique(values: Vec<T>) -> Self {
        Self::from_unique_with_hasher(values, S::default())
    }
}

impl<T, S> Default for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, const N: usize> From<[T; N]> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Builds a set from a list of values. Repeated values are stored once.
    fn from(values: [T; N]) -> Self {
        let mut set = Self::with_capacity(N);
        set.extend(values);
        set
    }
}

/// An iterator over the values of a `HashSet`.
pub struct Iter<'a, T> {
    inner: crate::hash_table::Iter<'a, T>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// A draining iterator over the values of a `HashSet`.
pub struct Drain<'a, T> {
    inner: crate::hash_table::Drain<'a, T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

impl<T> FusedIterator for Drain<'_, T> {}

/// A consuming iterator over the values of a `HashSet`.
pub struct IntoIter<T> {
    inner: crate::hash_table::IntoIter<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T, S> IntoIterator for HashSet<T, S> {
    type IntoIter = IntoIter<T>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S> IntoIterator for &'a HashSet<T, S> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut set = Self::with_capacity(iter.size_hint().0);
        set.extend(iter);
        set
    }
}

impl<T, S> Extend<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S> Extend<&'a T> for HashSet<T, S>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

/// An iterator over the union of two sets.
pub struct Union<'a, T, S> {
    iter: Iter<'a, T>,
    other_iter: Iter<'a, T>,
    other_set: &'a HashSet<T, S>,
}

impl<'a, T, S> Iterator for Union<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(v) = self.iter.next() {
            return Some(v);
        }
        loop {
            let v = self.other_iter.next()?;
            if !self.other_set.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, T, S> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S>,
}

impl<'a, T, S> Iterator for Intersection<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, T, S> {
    iter: Iter<'a, T>,
    other: &'a HashSet<T, S>,
}

impl<'a, T, S> Iterator for Difference<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S> {
    iter: core::iter::Chain<Difference<'a, T, S>, Difference<'a, T, S>>,
}

impl<'a, T, S> Iterator for SymmetricDifference<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::hashing::UniversalHashBuilder;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type IntSet = HashSet<i32, UniversalHashBuilder>;

    #[test]
    fn test_new_and_with_hasher() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);

        let set2 = HashSet::<i32, _>::with_hasher(SipHashBuilder::default());
        assert!(set2.is_empty());
        assert_eq!(set2.len(), 0);
    }

    #[test]
    fn test_with_capacity() {
        let set: HashSet<i32, SipHashBuilder> = HashSet::with_capacity(100);
        assert!(set.capacity() >= 100);
        assert!(set.is_empty());

        let set2 = HashSet::<i32, _>::with_capacity_and_hasher(200, SipHashBuilder::default());
        assert!(set2.capacity() >= 200);
        assert!(set2.is_empty());
    }

    #[test]
    fn test_literal_list() {
        let set = IntSet::from([4, 5, 6]);
        assert_eq!(set.len(), 3);

        let repeated = IntSet::from([1, 1, 2, 2, 2]);
        assert_eq!(repeated.len(), 2);
    }

    #[test]
    fn test_insert_new_increases_size() {
        let mut set = IntSet::new();
        assert_eq!(set.len(), 0);
        set.insert_new(4);
        assert_eq!(set.len(), 1);
        set.insert_new(5);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_insert_existing_does_not_increase_size() {
        let mut set = IntSet::from([1, 2]);
        assert!(!set.insert(2));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_insert_and_contains() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());

        assert!(set.insert(1));
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
        assert!(set.contains(&1));

        assert!(!set.insert(1));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&1));

        assert!(set.insert(2));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&1));
        assert!(set.contains(&2));
        assert!(!set.contains(&3));
    }

    #[test]
    fn test_contains_after_insert_and_remove() {
        let mut set = IntSet::from([1, 2, 3]);
        assert!(!set.contains(&10));
        set.insert(10);
        assert!(set.contains(&10));

        assert!(set.contains(&2));
        set.remove(&2);
        assert!(!set.contains(&2));
        assert!(!set.contains(&7));
    }

    #[test]
    fn test_remove() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert(1);
        set.insert(2);
        set.insert(3);

        assert!(set.remove(&2));
        assert_eq!(set.len(), 2);
        assert!(set.contains(&1));
        assert!(!set.contains(&2));
        assert!(set.contains(&3));

        assert!(!set.remove(&2));
        assert!(!set.remove(&4));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_take() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert(1);
        set.insert(2);

        assert_eq!(set.take(&1), Some(1));
        assert_eq!(set.len(), 1);
        assert!(!set.contains(&1));
        assert!(set.contains(&2));

        assert_eq!(set.take(&1), None);
        assert_eq!(set.take(&3), None);
    }

    #[test]
    fn test_get_and_replace() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert(42);

        assert_eq!(set.get(&42), Some(&42));
        assert_eq!(set.get(&1), None);

        assert_eq!(set.replace(42), Some(42));
        assert_eq!(set.replace(43), None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_borrowed_lookups() {
        let mut set: HashSet<String, SipHashBuilder> = HashSet::default();
        set.insert("apple".to_string());
        set.insert("banana".to_string());

        assert!(set.contains("apple"));
        assert_eq!(set.get("banana").map(String::as_str), Some("banana"));
        assert!(set.remove("apple"));
        assert_eq!(set.take("banana"), Some("banana".to_string()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert(1);
        set.insert(2);
        set.insert(3);

        assert_eq!(set.len(), 3);
        set.clear();
        assert_eq!(set.len(), 0);
        assert!(set.is_empty());
        assert!(!set.contains(&1));
        assert!(!set.contains(&2));
        assert!(!set.contains(&3));
    }

    #[test]
    fn test_reserve() {
        let mut set = HashSet::<i32, _>::with_hasher(SipHashBuilder::default());
        set.insert(1);
        set.reserve(1000);
        assert!(set.capacity() >= 1001);
        assert!(set.contains(&1));
    }

    #[test]
    fn test_iter() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.insert(1);
        set.insert(2);
        set.insert(3);

        let iter = set.iter();
        assert_eq!(iter.len(), 3);
        let values: Vec<i32> = iter.copied().collect();
        assert!(values.contains(&1));
        assert!(values.contains(&2));
        assert!(values.contains(&3));

        let values: Vec<i32> = (&set).into_iter().copied().collect();
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_into_iter_and_drain() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        set.extend([1, 2, 3]);

        let mut drained: Vec<i32> = set.drain().collect();
        drained.sort_unstable();
        assert_eq!(drained, [1, 2, 3]);
        assert!(set.is_empty());

        set.extend(&[4, 5]);
        let mut owned: Vec<i32> = set.into_iter().collect();
        owned.sort_unstable();
        assert_eq!(owned, [4, 5]);
    }

    #[test]
    fn test_insert_many() {
        let mut set = IntSet::new();
        for i in (0..1000).step_by(4) {
            set.insert(i);
        }
        for i in 0..1000 {
            assert_eq!(set.contains(&i), i % 4 == 0, "{i}");
        }
    }

    #[test]
    fn test_remove_many() {
        let mut set = IntSet::new();
        for i in 0..1000 {
            set.insert(i);
        }
        assert_eq!(set.len(), 1000);
        for i in (0..1000).step_by(5) {
            set.remove(&i);
        }
        assert_eq!(set.len(), 800);
        for i in 0..1000 {
            assert_eq!(set.contains(&i), i % 5 != 0, "{i}");
        }
    }

    #[test]
    fn test_from_unique() {
        let values: Vec<u64> = (0..10_000).map(|i| i * 7).collect();
        let set: HashSet<u64, SipHashBuilder> = HashSet::from_unique(values);
        assert_eq!(set.len(), 10_000);
        for i in 0..10_000u64 {
            assert!(set.contains(&(i * 7)));
            assert!(!set.contains(&(i * 7 + 1)));
        }

        let empty: HashSet<u64, SipHashBuilder> = HashSet::from_unique(Vec::new());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_from_iterator_and_eq() {
        let a: HashSet<i32, SipHashBuilder> = (0..100).collect();
        let b: HashSet<i32, SipHashBuilder> = (0..100).rev().collect();
        let c: HashSet<i32, SipHashBuilder> = (1..101).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = IntSet::from([1, 2, 3]);
        let copy = original.clone();
        original.insert(4);
        original.remove(&1);

        assert!(copy.contains(&1));
        assert!(!copy.contains(&4));
        assert_eq!(copy.len(), 3);
        assert_eq!(original.len(), 3);
    }

    #[test]
    fn test_retain() {
        let mut set: HashSet<i32, SipHashBuilder> = (0..100).collect();
        set.retain(|&x| x % 3 == 0);
        assert_eq!(set.len(), 34);
        assert!(set.iter().all(|x| x % 3 == 0));
    }

    #[test]
    fn test_debug() {
        let set = IntSet::from([7]);
        assert_eq!(alloc::format!("{set:?}"), "{7}");
    }

    #[test]
    fn test_string_values() {
        let mut set = HashSet::with_hasher(SipHashBuilder::default());
        let words = vec!["hello", "world", "rust", "groups"];
        for word in &words {
            assert!(set.insert(word.to_string()));
        }
        for word in &words {
            assert!(set.contains(*word));
        }
        assert!(!set.contains("missing"));
    }

    #[test]
    fn test_string_set_remove() {
        let mut set: HashSet<String, SipHashBuilder> = HashSet::from([
            "Where".to_string(),
            "Who".to_string(),
            "When".to_string(),
        ]);
        assert_eq!(set.len(), 3);

        assert!(set.remove("Who"));
        assert_eq!(set.len(), 2);
        assert!(!set.contains("Who"));
        assert!(set.contains("Where"));
        assert!(set.contains("When"));
    }

    #[test]
    fn test_is_disjoint() {
        let a = IntSet::from([1, 2, 3]);
        let b = IntSet::from([4, 5]);
        let c = IntSet::from([3, 9]);
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&c));
        assert!(IntSet::new().is_disjoint(&a));
    }

    #[test]
    fn test_is_subset_and_superset() {
        let sup = IntSet::from([1, 2, 3, 4]);
        let sub = IntSet::from([2, 4]);
        let other = IntSet::from([2, 5]);

        assert!(sub.is_subset(&sup));
        assert!(sup.is_superset(&sub));
        assert!(!other.is_subset(&sup));
        assert!(!sup.is_subset(&sub));
        assert!(IntSet::new().is_subset(&sub));
    }

    #[test]
    fn test_union() {
        let a = IntSet::from([1, 2, 3]);
        let b = IntSet::from([3, 4, 5]);
        let mut values: Vec<i32> = a.union(&b).copied().collect();
        values.sort_unstable();
        assert_eq!(values, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_intersection() {
        let a = IntSet::from([1, 2, 3, 4]);
        let b = IntSet::from([3, 4, 5]);
        let mut values: Vec<i32> = a.intersection(&b).copied().collect();
        values.sort_unstable();
        assert_eq!(values, [3, 4]);

        let mut values: Vec<i32> = b.intersection(&a).copied().collect();
        values.sort_unstable();
        assert_eq!(values, [3, 4]);
    }

    #[test]
    fn test_difference() {
        let a = IntSet::from([1, 2, 3, 4]);
        let b = IntSet::from([3, 4, 5]);
        let mut values: Vec<i32> = a.difference(&b).copied().collect();
        values.sort_unstable();
        assert_eq!(values, [1, 2]);
    }

    #[test]
    fn test_symmetric_difference() {
        let a = IntSet::from([1, 2, 3]);
        let b = IntSet::from([2, 3, 4]);
        let mut values: Vec<i32> = a.symmetric_difference(&b).copied().collect();
        values.sort_unstable();
        assert_eq!(values, [1, 4]);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn test_random_operations_match_model() {
        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
        let mut set: HashSet<u32, SipHashBuilder> = HashSet::new();
        let mut model = hashbrown::HashSet::new();

        for _ in 0..50_000 {
            let value = rng.random_range(0..5_000u32);
            match rng.random_range(0..4) {
                0 | 1 => assert_eq!(set.insert(value), model.insert(value)),
                2 => assert_eq!(set.remove(&value), model.remove(&value)),
                _ => assert_eq!(set.contains(&value), model.contains(&value)),
            }
            assert_eq!(set.len(), model.len());
        }

        let mut ours: Vec<u32> = set.iter().copied().collect();
        let mut theirs: Vec<u32> = model.into_iter().collect();
        ours.sort_unstable();
        theirs.sort_unstable();
        assert_eq!(ours, theirs);
    }
}
