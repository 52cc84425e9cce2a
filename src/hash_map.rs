//! A `BuildHasher`-driven map over the Robin Hood table; see [`HashMap`].

use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::DefaultHashBuilder;
use crate::hash_table;
use crate::hash_table::HashTable;

/// A hash map built on [`HashTable`] with Robin Hood probing and tombstone
/// deletion.
///
/// Key-value pairs are stored as `(K, V)` tuples in the underlying table;
/// hashing and equality are computed over the key alone. The default hash
/// builder is selected by crate features (see [`DefaultHashBuilder`]); any
/// [`BuildHasher`] works via [`with_hasher`].
///
/// [`with_hasher`]: HashMap::with_hasher
///
/// # Example
///
/// ```rust
/// use robin_hash::HashMap;
///
/// let mut map = HashMap::new();
/// map.insert("a", 1);
/// map.insert("b", 2);
///
/// assert_eq!(map.get(&"a"), Some(&1));
/// assert_eq!(map.insert("a", 10), Some(1));
/// assert_eq!(map.get(&"a"), Some(&10));
/// assert_eq!(map.len(), 2);
/// ```
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    table: HashTable<(K, V)>,
    hasher: S,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Clone for HashMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hasher: self.hasher.clone(),
        }
    }
}

impl<K, V, S> PartialEq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl<K, V, S> Eq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V> HashMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map with the default hash builder.
    ///
    /// No memory is allocated until the first insertion.
    #[cfg(any(feature = "foldhash", feature = "std"))]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a map sized for at least `capacity` entries, with the
    /// default hash builder.
    #[cfg(any(feature = "foldhash", feature = "std"))]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates an empty map using the given hash builder.
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            table: HashTable::new(),
            hasher,
        }
    }

    /// Creates a map sized for at least `capacity` entries, using the given
    /// hash builder.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hasher,
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
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

    /// Drops all entries, retaining the allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Rehashes into the smallest capacity that fits the current length,
    /// reclaiming tombstones. An empty map is deallocated entirely.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Returns an iterator over the entries, in unspecified order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the keys, in unspecified order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the values, in unspecified order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator that removes and yields every entry, leaving the
    /// map empty (capacity retained).
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the entries for which the predicate returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|(key, value)| f(key, value));
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn hash_key<Q>(&self, key: &Q) -> u64
    where
        Q: Hash + ?Sized,
    {
        self.hasher.hash_one(key)
    }

    /// Reserves capacity so at least `additional` more entries fit without
    /// a rehash.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Inserts a key-value pair.
    ///
    /// If the key was already present its value is replaced and the old
    /// value returned; the key itself is not replaced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_hash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert("a", 1), None);
    /// assert_eq!(map.insert("a", 2), Some(1));
    /// assert_eq!(map.get(&"a"), Some(&2));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_key(&key);
        match self.table.entry(hash, |(k, _)| *k == key) {
            hash_table::Entry::Occupied(mut entry) => {
                Some(core::mem::replace(&mut entry.get_mut().1, value))
            }
            hash_table::Entry::Vacant(entry) => {
                entry.insert((key, value));
                None
            }
        }
    }

    /// Returns a reference to the value for `key`, if present.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        self.table
            .find(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value for `key`, if present.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        self.table
            .find_mut(hash, |(k, _)| k.borrow() == key)
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Removes `key` from the map, returning its value if it was present.
    ///
    /// The underlying slot is tombstoned; see [`HashTable::remove`].
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key` from the map, returning the stored key and value if it
    /// was present.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: core::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_key(key);
        self.table.remove(hash, |(k, _)| k.borrow() == key)
    }

    /// Gets an entry for `key`, for in-place insertion or modification.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use robin_hash::HashMap;
    ///
    /// let mut counts: HashMap<&str, u64> = HashMap::new();
    /// for word in ["a", "b", "a"] {
    ///     *counts.entry(word).or_insert(0) += 1;
    /// }
    ///
    /// assert_eq!(counts.get(&"a"), Some(&2));
    /// assert_eq!(counts.get(&"b"), Some(&1));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        let hash = self.hash_key(&key);
        match self.table.entry(hash, |(k, _)| *k == key) {
            hash_table::Entry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            hash_table::Entry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// A view into a single entry of a [`HashMap`], which is either vacant or
/// occupied.
///
/// Constructed by the [`entry`] method.
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V> {
    /// The key is not present in the map.
    Vacant(VacantEntry<'a, K, V>),
    /// The key is present in the map.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K, V> Entry<'a, K, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the value computed by `default` if the entry is vacant and
    /// returns a mutable reference to the value.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }

    /// Applies `f` to the value if the entry is occupied, then returns the
    /// entry for chaining.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }
}

/// A view into a vacant entry of a [`HashMap`].
pub struct VacantEntry<'a, K, V> {
    entry: hash_table::VacantEntry<'a, (K, V)>,
    key: K,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    /// Returns the key that would be used on insertion.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Inserts a value and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry of a [`HashMap`].
pub struct OccupiedEntry<'a, K, V> {
    entry: hash_table::OccupiedEntry<'a, (K, V)>,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    /// Gets a reference to the key.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference tied to the map's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Replaces the value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the map, returning the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map, returning the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the entries of a [`HashMap`].
pub struct Iter<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }
}

/// An iterator over the keys of a [`HashMap`].
pub struct Keys<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

/// An iterator over the values of a [`HashMap`].
pub struct Values<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

/// A draining iterator over the entries of a [`HashMap`].
///
/// Dropping the iterator finishes the drain.
pub struct Drain<'a, K, V> {
    inner: hash_table::Drain<'a, (K, V)>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// A consuming iterator over the entries of a [`HashMap`].
pub struct IntoIter<K, V> {
    inner: hash_table::IntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> IntoIterator for HashMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

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

    fn map() -> HashMap<String, i32, SipState> {
        HashMap::with_hasher(SipState::random())
    }

    #[test]
    fn insert_get_remove() {
        let mut map = map();
        assert_eq!(map.insert("a".to_string(), 1), None);
        assert_eq!(map.insert("b".to_string(), 2), None);

        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), Some(&2));
        assert_eq!(map.get("c"), None);
        assert!(map.contains_key("a"));
        assert!(!map.contains_key("c"));

        assert_eq!(map.remove("a"), Some(1));
        assert_eq!(map.remove("a"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn insert_replaces_value_not_key() {
        let mut map = map();
        assert_eq!(map.insert("a".to_string(), 1), None);
        assert_eq!(map.insert("a".to_string(), 2), Some(1));
        assert_eq!(map.get("a"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn get_mut_modifies_in_place() {
        let mut map = map();
        map.insert("a".to_string(), 1);
        if let Some(v) = map.get_mut("a") {
            *v += 10;
        }
        assert_eq!(map.get("a"), Some(&11));
    }

    #[test]
    fn entry_api() {
        let mut map = map();

        *map.entry("x".to_string()).or_insert(0) += 1;
        *map.entry("x".to_string()).or_insert(0) += 1;
        assert_eq!(map.get("x"), Some(&2));

        map.entry("y".to_string())
            .and_modify(|v| *v += 1)
            .or_insert(100);
        assert_eq!(map.get("y"), Some(&100));
        map.entry("y".to_string())
            .and_modify(|v| *v += 1)
            .or_insert(0);
        assert_eq!(map.get("y"), Some(&101));

        match map.entry("x".to_string()) {
            Entry::Occupied(entry) => {
                assert_eq!(entry.key(), "x");
                assert_eq!(entry.remove(), 2);
            }
            Entry::Vacant(_) => panic!("x should be present"),
        }
        assert!(!map.contains_key("x"));
    }

    #[test]
    fn remove_entry_returns_stored_key() {
        let mut map = map();
        map.insert("key".to_string(), 5);
        assert_eq!(map.remove_entry("key"), Some(("key".to_string(), 5)));
        assert!(map.is_empty());
    }

    #[test]
    fn many_entries_survive_growth() {
        let mut map: HashMap<u64, u64, SipState> = HashMap::with_hasher(SipState::random());
        for k in 0..2000u64 {
            map.insert(k, k * 3);
        }
        assert_eq!(map.len(), 2000);
        for k in 0..2000u64 {
            assert_eq!(map.get(&k), Some(&(k * 3)));
        }
    }

    #[test]
    fn iterators_cover_all_entries() {
        let mut map = map();
        for k in 0..10u32 {
            map.insert(k.to_string(), k as i32);
        }

        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        let mut expected: Vec<String> = (0..10u32).map(|k| k.to_string()).collect();
        expected.sort();
        assert_eq!(keys, expected);

        let mut values: Vec<i32> = map.values().copied().collect();
        values.sort_unstable();
        assert_eq!(values, (0..10).collect::<Vec<_>>());

        assert_eq!(map.iter().count(), 10);
    }

    #[test]
    fn drain_and_reuse() {
        let mut map = map();
        for k in 0..10u32 {
            map.insert(k.to_string(), k as i32);
        }

        let drained: Vec<(String, i32)> = map.drain().collect();
        assert_eq!(drained.len(), 10);
        assert!(map.is_empty());

        map.insert("again".to_string(), 1);
        assert_eq!(map.get("again"), Some(&1));
    }

    #[test]
    fn retain_filters_by_key_and_value() {
        let mut map: HashMap<u64, u64, SipState> = HashMap::with_hasher(SipState::random());
        for k in 0..100u64 {
            map.insert(k, k);
        }

        map.retain(|&k, v| {
            *v += 1;
            k % 2 == 0
        });
        assert_eq!(map.len(), 50);
        assert_eq!(map.get(&2), Some(&3));
        assert_eq!(map.get(&3), None);
    }

    #[test]
    fn from_iterator_and_extend() {
        let state = SipState::random();
        let mut map: HashMap<u64, u64, SipState> =
            HashMap::with_hasher(state.clone());
        map.extend((0..50u64).map(|k| (k, k)));
        assert_eq!(map.len(), 50);

        let collected: HashMap<u64, u64, SipState> = map.into_iter().collect();
        assert_eq!(collected.len(), 50);
        assert_eq!(collected.get(&49), Some(&49));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let state = SipState::random();
        let mut a: HashMap<u64, u64, SipState> = HashMap::with_hasher(state.clone());
        let mut b: HashMap<u64, u64, SipState> = HashMap::with_hasher(state);

        for k in 0..32u64 {
            a.insert(k, k);
        }
        for k in (0..32u64).rev() {
            b.insert(k, k);
        }
        assert_eq!(a, b);

        b.insert(5, 999);
        assert_ne!(a, b);
    }

    #[test]
    fn clear_and_shrink() {
        let mut map = map();
        for k in 0..100u32 {
            map.insert(k.to_string(), k as i32);
        }
        let capacity = map.capacity();

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);

        map.shrink_to_fit();
        assert_eq!(map.capacity(), 0);
    }
}
