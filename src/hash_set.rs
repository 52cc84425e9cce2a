//! A `BuildHasher`-driven set over the Robin Hood table; see [`HashSet`].

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::DefaultHashBuilder;
use crate::hash_table;
use crate::hash_table::HashTable;

/// A hash set built on [`HashTable`] with Robin Hood probing and tombstone
/// deletion.
///
/// Thin wrapper storing its elements directly in the table; hashing and
/// equality come from the element type.
///
/// # Example
///
/// ```rust
/// use robin_hash::HashSet;
///
/// let mut set = HashSet::new();
/// assert!(set.insert("a"));
/// assert!(!set.insert("a"));
///
/// assert!(set.contains(&"a"));
/// assert!(set.remove(&"a"));
/// assert!(set.is_empty());
/// ```
pub struct HashSet<T, S = DefaultHashBuilder> {
    table: HashTable<T>,
    hasher: S,
}

impl<T, S> Debug for HashSet<T, S>
where
    T: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, S> Default for HashSet<T, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<T, S> Clone for HashSet<T, S>
where
    T: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

impl<T, S> PartialEq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|value| other.contains(value))
    }
}

impl<T, S> Eq for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
}

impl<T> HashSet<T, DefaultHashBuilder> {
    /// Creates an empty set with the default hash builder.
    ///
    /// No memory is allocated until the first insertion.
    #[cfg(any(feature = "foldhash", feature = "std"))]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set sized for at least `capacity` elements, with the
    /// default hash builder.
    #[cfg(any(feature = "foldhash", feature = "std"))]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<T, S> HashSet<T, S> {
    /// Creates an empty set using the given hash builder.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: HashTable::new(),
            hasher,
        }
    }

    /// Creates a set sized for at least `capacity` elements, using the
    /// given hash builder.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hasher,
        }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the allocated slot count of the underlying table.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns `true` once the underlying table has reached 90% occupancy.
    pub fn is_full(&self) -> bool {
        self.table.is_full()
    }

    /// Drops all elements, retaining the allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Rehashes into the smallest capacity that fits the current length,
    /// reclaiming tombstones. An empty set is deallocated entirely.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Returns an iterator over the elements, in unspecified order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator that removes and yields every element, leaving
    /// the set empty (capacity retained).
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the elements for which the predicate returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|value| f(value));
    }
}

impl<T, S> HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    fn hash_value<Q>(&self, value: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        self.hasher.hash_one(value)
    }

    /// Reserves capacity so at least `additional` more elements fit without
    /// a rehash.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Adds a value to the set.
    ///
    /// Returns `true` if the value was newly inserted; an already-present
    /// value is left untouched and `false` is returned.
    pub fn insert(&mut self, value: T) -> bool {
        let hash = self.hash_value(&value);
        match self.table.entry(hash, |v| *v == value) {
            hash_table::Entry::Occupied(_) => false,
            hash_table::Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Returns `true` if the set contains `value`.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(value).is_some()
    }

    /// Returns a reference to the stored element equal to `value`, if
    /// present.
    pub fn get<Q>(&self, value: &Q) -> Option<&T>
    where
        T: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_value(value);
        self.table.find(hash, |v| v.borrow() == value)
    }

    /// Removes `value` from the set, returning `true` if it was present.
    pub fn remove<Q>(&mut self, value: &Q) -> bool
    where
        T: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.take(value).is_some()
    }

    /// Removes and returns the stored element equal to `value`, if present.
    pub fn take<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_value(value);
        self.table.remove(hash, |v| v.borrow() == value)
    }

    /// Returns `true` if the two sets share no elements.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if every element of `self` is in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if every element of `other` is in `self`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Visits the elements present in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, T, S> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Visits the elements present in both sets.
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, T, S> {
        if self.len() <= other.len() {
            Intersection {
                iter: self.iter(),
                other,
            }
        } else {
            Intersection {
                iter: other.iter(),
                other: self,
            }
        }
    }

    /// Visits the elements present in either set, without duplicates.
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, T, S> {
        Union {
            iter: self.iter(),
            difference: other.difference(self),
        }
    }
}

impl<T, S> FromIterator<T> for HashSet<T, S>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::default();
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
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for value in iter {
            self.insert(value);
        }
    }
}

/// An iterator over the elements of a [`HashSet`].
pub struct Iter<'a, T> {
    inner: hash_table::Iter<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// A draining iterator over the elements of a [`HashSet`].
///
/// Dropping the iterator finishes the drain.
pub struct Drain<'a, T> {
    inner: hash_table::Drain<'a, T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// A consuming iterator over the elements of a [`HashSet`].
pub struct IntoIter<T> {
    inner: hash_table::IntoIter<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// An iterator over the difference of two [`HashSet`]s.
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
        self.iter.by_ref().find(|v| !self.other.contains(v))
    }
}

/// An iterator over the intersection of two [`HashSet`]s.
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
        self.iter.by_ref().find(|v| self.other.contains(v))
    }
}

/// An iterator over the union of two [`HashSet`]s.
pub struct Union<'a, T, S> {
    iter: Iter<'a, T>,
    difference: Difference<'a, T, S>,
}

impl<'a, T, S> Iterator for Union<'a, T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().or_else(|| self.difference.next())
    }
}

impl<'a, T, S> IntoIterator for &'a HashSet<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, S> IntoIterator for HashSet<T, S> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipState {
        k0: u64,
        k1: u64,
    }

    impl SipState {
        fn random() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }
    }

    impl Default for SipState {
        fn default() -> Self {
            Self::random()
        }
    }

    impl BuildHasher for SipState {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    fn set() -> HashSet<u64, SipState> {
        HashSet::with_hasher(SipState::random())
    }

    #[test]
    fn insert_contains_remove() {
        let mut set = set();
        assert!(set.insert(1));
        assert!(!set.insert(1));
        assert!(set.insert(2));
        assert_eq!(set.len(), 2);

        assert!(set.contains(&1));
        assert!(!set.contains(&3));

        assert!(set.remove(&1));
        assert!(!set.remove(&1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn take_returns_stored_element() {
        let mut set: HashSet<String, SipState> = HashSet::with_hasher(SipState::random());
        set.insert("hello".to_string());
        assert_eq!(set.take("hello"), Some("hello".to_string()));
        assert_eq!(set.take("hello"), None);
    }

    #[test]
    fn get_borrows_stored_element() {
        let mut set: HashSet<String, SipState> = HashSet::with_hasher(SipState::random());
        set.insert("abc".to_string());
        assert_eq!(set.get("abc"), Some(&"abc".to_string()));
        assert_eq!(set.get("xyz"), None);
    }

    #[test]
    fn set_algebra() {
        let state = SipState::random();
        let mut a: HashSet<u64, SipState> = HashSet::with_hasher(state.clone());
        a.extend(0..10u64);
        let mut b: HashSet<u64, SipState> = HashSet::with_hasher(state.clone());
        b.extend(5..15u64);

        let mut inter: Vec<u64> = a.intersection(&b).copied().collect();
        inter.sort_unstable();
        assert_eq!(inter, (5..10).collect::<Vec<_>>());

        let mut diff: Vec<u64> = a.difference(&b).copied().collect();
        diff.sort_unstable();
        assert_eq!(diff, (0..5).collect::<Vec<_>>());

        let mut uni: Vec<u64> = a.union(&b).copied().collect();
        uni.sort_unstable();
        assert_eq!(uni, (0..15).collect::<Vec<_>>());

        let empty: HashSet<u64, SipState> = HashSet::with_hasher(state.clone());
        assert!(empty.is_subset(&a));
        assert!(a.is_superset(&empty));
        assert!(!a.is_disjoint(&b));

        let c: HashSet<u64, SipState> = {
            let mut s = HashSet::with_hasher(state);
            s.insert(100);
            s
        };
        assert!(a.is_disjoint(&c));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let state = SipState::random();
        let mut a: HashSet<u64, SipState> = HashSet::with_hasher(state.clone());
        let mut b: HashSet<u64, SipState> = HashSet::with_hasher(state);

        for v in 0..32u64 {
            a.insert(v);
        }
        for v in (0..32u64).rev() {
            b.insert(v);
        }
        assert_eq!(a, b);

        b.remove(&0);
        assert_ne!(a, b);
    }

    #[test]
    fn retain_and_drain() {
        let mut set = set();
        for v in 0..100u64 {
            set.insert(v);
        }

        set.retain(|&v| v < 10);
        assert_eq!(set.len(), 10);

        let mut drained: Vec<u64> = set.drain().collect();
        drained.sort_unstable();
        assert_eq!(drained, (0..10).collect::<Vec<_>>());
        assert!(set.is_empty());
    }

    #[test]
    fn from_iterator_and_into_iter() {
        let set: HashSet<u64, SipState> = (0..50u64).collect();
        assert_eq!(set.len(), 50);
        assert!(set.contains(&49));

        let mut values: Vec<u64> = set.into_iter().collect();
        values.sort_unstable();
        assert_eq!(values, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn clone_is_independent() {
        let mut set = set();
        for v in 0..20u64 {
            set.insert(v);
        }

        let mut cloned = set.clone();
        assert_eq!(set, cloned);

        cloned.remove(&5);
        assert!(set.contains(&5));
        assert!(!cloned.contains(&5));
    }
}
