//! Hash-agnostic Robin Hood table. Callers supply precomputed hashes and
//! equality predicates; see [`HashTable`].

use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

/// Slot has never held a value, or was reset by `clear`.
///
/// Chosen as 0x00 so freshly allocated metadata can be initialized with a
/// single `write_bytes` and probe chains terminate on zeroed memory.
const FREE: u8 = 0x00;

/// Slot holds a live value; `hashes[i]` and `slots[i]` are initialized.
const OCCUPIED: u8 = 0x01;

/// High bit marks a tombstone. The stored hash is retained so probe
/// distances remain computable for chains that pass through the slot; the
/// value itself has already been dropped or moved out.
const DELETED: u8 = 0x80;

/// Minimum slot count for any non-empty table.
const MIN_CAPACITY: usize = 8;

#[inline(always)]
fn fix_capacity(requested: usize) -> usize {
    requested
        .max(MIN_CAPACITY)
        .checked_next_power_of_two()
        .expect("allocation size overflow")
}

#[derive(Debug)]
struct DataLayout {
    layout: Layout,
    flags_offset: usize,
    hashes_offset: usize,
    slots_offset: usize,
}

impl DataLayout {
    fn new<V>(capacity: usize) -> Self {
        let flags_layout = Layout::array::<u8>(capacity).expect("allocation size overflow");
        let hashes_layout =
            Layout::array::<MaybeUninit<u64>>(capacity).expect("allocation size overflow");
        let slots_layout =
            Layout::array::<MaybeUninit<V>>(capacity).expect("allocation size overflow");

        let (layout, flags_offset) = Layout::new::<()>().extend(flags_layout).unwrap();
        let (layout, hashes_offset) = layout.extend(hashes_layout).unwrap();
        let (layout, slots_offset) = layout.extend(slots_layout).unwrap();

        DataLayout {
            layout,
            flags_offset,
            hashes_offset,
            slots_offset,
        }
    }
}

/// Probe-length statistics for hash table analysis.
///
/// Available with the `stats` feature (and in unit tests).
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct ProbeStats {
    /// Number of live entries in the table.
    pub len: usize,
    /// Total number of slots allocated.
    pub capacity: usize,
    /// Number of tombstoned slots awaiting a rehash.
    pub tombstones: usize,
    /// Load factor (len / capacity).
    pub load_factor: f64,
    /// Longest probe distance of any live entry.
    pub max_probe_distance: usize,
    /// Sum of probe distances over all live entries.
    pub total_probe_distance: usize,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeStats {
    /// Mean probe distance over the live entries.
    pub fn mean_probe_distance(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.total_probe_distance as f64 / self.len as f64
        }
    }

    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Robin Hood Table Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.len,
            self.capacity,
            self.load_factor * 100.0
        );
        println!("Tombstones: {}", self.tombstones);
        println!(
            "Probe distance: max {}, mean {:.3}",
            self.max_probe_distance,
            self.mean_probe_distance()
        );
    }
}

/// A hash table using Robin Hood open addressing with backward-shift
/// insertion and tombstone deletion.
///
/// `HashTable<V>` stores values of type `V` in a flat power-of-two slot
/// array with a parallel metadata array (stored hash plus a status flag per
/// slot). Unlike standard hash maps, this table is hash-agnostic: every
/// operation takes a precomputed 64-bit hash and an equality predicate. The
/// [`crate::HashMap`] and [`crate::HashSet`] wrappers layer a
/// `BuildHasher`-driven API on top.
///
/// On an insertion collision the entry that has traveled further from its
/// desired slot keeps its position and the "richer" entry is displaced
/// onward, which bounds worst-case lookup length by the longest probe chain
/// present at insertion time. Lookups terminate early once their travel
/// distance exceeds the probe distance recorded for the slot under
/// examination.
///
/// Deletion leaves a tombstone; tombstones are reclaimed only when the
/// table rehashes (growth or [`shrink_to_fit`]), so heavy delete/insert
/// churn without intervening growth degrades probe lengths until a rehash.
///
/// [`shrink_to_fit`]: HashTable::shrink_to_fit
///
/// # Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use robin_hash::hash_table::Entry;
/// # use robin_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
/// #
/// #[derive(Debug, PartialEq)]
/// struct Person {
///     id: u64,
///     name: String,
/// }
///
/// let mut table = HashTable::with_capacity(100);
/// let hash = hash_id(123);
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => unreachable!(),
/// }
///
/// assert!(table.find(hash, |p| p.id == 123).is_some());
/// ```
pub struct HashTable<V> {
    layout: DataLayout,
    alloc: NonNull<u8>,

    len: usize,
    capacity: usize,

    _phantom: PhantomData<V>,
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for HashTable<V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .field("entries", &DebugEntries(self))
            .finish()
    }
}

struct DebugEntries<'a, V>(&'a HashTable<V>);

impl<V> Debug for DebugEntries<'_, V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl<V> Clone for HashTable<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        let mut new_table = Self::with_slot_capacity(self.capacity);

        // Walking the source in slot order and re-running the insertion
        // routine with the stored hashes replicates the source layout.
        //
        // SAFETY: Source slots flagged OCCUPIED hold initialized hashes and
        // values, and the clone has a FREE slot available whenever the
        // source did (same capacity, same number of live entries).
        unsafe {
            for index in 0..self.capacity {
                if *self.flags_ptr().as_ref().get_unchecked(index) == OCCUPIED {
                    let hash = self
                        .hashes_ptr()
                        .as_ref()
                        .get_unchecked(index)
                        .assume_init_read();
                    let value = self
                        .slots_ptr()
                        .as_ref()
                        .get_unchecked(index)
                        .assume_init_ref()
                        .clone();
                    new_table.insert_slot(hash, value);
                }
            }
        }
        new_table.len = self.len;

        new_table
    }
}

impl<V> PartialEq for HashTable<V>
where
    V: PartialEq,
{
    /// Order-independent set equality over the live entries.
    ///
    /// Both tables must have been populated with the same hash function,
    /// since membership is checked via the stored hashes.
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }

        // SAFETY: OCCUPIED slots hold initialized hashes and values.
        unsafe {
            for index in 0..self.capacity {
                if *self.flags_ptr().as_ref().get_unchecked(index) != OCCUPIED {
                    continue;
                }
                let hash = self
                    .hashes_ptr()
                    .as_ref()
                    .get_unchecked(index)
                    .assume_init_read();
                let value = self.slots_ptr().as_ref().get_unchecked(index).assume_init_ref();
                if other.find(hash, |v| v == value).is_none() {
                    return false;
                }
            }
        }
        true
    }
}

impl<V> Eq for HashTable<V> where V: Eq {}

impl<V> Drop for HashTable<V> {
    fn drop(&mut self) {
        // SAFETY: Values are dropped only for OCCUPIED slots, which are
        // initialized by construction; the allocation is freed only when one
        // was made.
        unsafe {
            if core::mem::needs_drop::<V>() && self.len > 0 {
                for index in 0..self.capacity {
                    if *self.flags_ptr().as_ref().get_unchecked(index) == OCCUPIED {
                        self.slots_ptr()
                            .as_mut()
                            .get_unchecked_mut(index)
                            .assume_init_drop();
                    }
                }
            }

            if self.layout.layout.size() != 0 {
                alloc::alloc::dealloc(self.alloc.as_ptr(), self.layout.layout);
            }
        }
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with zero capacity.
    ///
    /// No memory is allocated until the first insertion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::new();
    /// assert_eq!(table.capacity(), 0);
    /// assert!(table.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_slot_capacity(0)
    }

    /// Creates a table sized for at least `capacity` slots.
    ///
    /// The slot count is rounded up to the next power of two, with a minimum
    /// of 8; `with_capacity(0)` allocates nothing. Note that the table grows
    /// once it reaches 90% occupancy, so the number of entries it holds
    /// before resizing is slightly below the slot count.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 128);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            Self::with_slot_capacity(0)
        } else {
            Self::with_slot_capacity(fix_capacity(capacity))
        }
    }

    /// `slot_capacity` must be zero or a power of two ≥ `MIN_CAPACITY`.
    fn with_slot_capacity(slot_capacity: usize) -> Self {
        debug_assert!(
            slot_capacity == 0
                || (slot_capacity.is_power_of_two() && slot_capacity >= MIN_CAPACITY)
        );

        let layout = DataLayout::new::<V>(slot_capacity);
        let alloc = if layout.layout.size() == 0 {
            NonNull::dangling()
        } else {
            // SAFETY: The layout size is non-zero; a null return is routed to
            // `handle_alloc_error`. Zeroing the flag array marks every slot
            // FREE.
            unsafe {
                let raw_alloc = alloc::alloc::alloc(layout.layout);
                if raw_alloc.is_null() {
                    handle_alloc_error(layout.layout);
                }

                core::ptr::write_bytes(raw_alloc.add(layout.flags_offset), FREE, slot_capacity);

                NonNull::new_unchecked(raw_alloc)
            }
        };

        Self {
            layout,
            alloc,
            len: 0,
            capacity: slot_capacity,
            _phantom: PhantomData,
        }
    }

    fn flags_ptr(&self) -> NonNull<[u8]> {
        // SAFETY: Allocation is valid and sized for `capacity` flag bytes
        unsafe {
            NonNull::slice_from_raw_parts(
                self.alloc.add(self.layout.flags_offset).cast(),
                self.capacity,
            )
        }
    }

    fn hashes_ptr(&self) -> NonNull<[MaybeUninit<u64>]> {
        // SAFETY: Allocation is valid and sized for `capacity` hashes
        unsafe {
            NonNull::slice_from_raw_parts(
                self.alloc.add(self.layout.hashes_offset).cast(),
                self.capacity,
            )
        }
    }

    fn slots_ptr(&self) -> NonNull<[MaybeUninit<V>]> {
        // SAFETY: Allocation is valid and sized for `capacity` slots
        unsafe {
            NonNull::slice_from_raw_parts(
                self.alloc.add(self.layout.slots_offset).cast(),
                self.capacity,
            )
        }
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.capacity - 1
    }

    /// Distance between `pos` and the desired position of `hash`, accounting
    /// for wraparound.
    #[inline(always)]
    fn probe_distance(&self, hash: u64, pos: usize) -> usize {
        let desired = (hash as usize) & self.mask();
        (pos + self.capacity - desired) & self.mask()
    }

    /// Returns the number of live entries in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// assert_eq!(table.len(), 0);
    ///
    /// table.entry(1, |&n: &u64| n == 1).or_insert(1);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table contains no live entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the allocated slot count.
    ///
    /// Always zero or a power of two.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` once the table has reached 90% occupancy.
    ///
    /// The next insertion of a new entry will double the capacity. A
    /// zero-capacity table is trivially full.
    pub fn is_full(&self) -> bool {
        self.len * 10 >= self.capacity * 9
    }

    /// Looks up a value by its hash and an equality predicate.
    ///
    /// Walks forward from the hash's desired slot and gives up at the first
    /// FREE slot or once the traveled distance exceeds the probe distance of
    /// the slot under examination, so misses are cheap even in long chains.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use robin_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_str("key"), |s: &String| s == "key")
    ///     .or_insert("key".to_string());
    ///
    /// assert_eq!(
    ///     table.find(hash_str("key"), |s| s == "key"),
    ///     Some(&"key".to_string())
    /// );
    /// assert_eq!(table.find(hash_str("missing"), |s| s == "missing"), None);
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns OCCUPIED slots, whose values are
        // initialized.
        Some(unsafe { self.slots_ptr().as_ref().get_unchecked(index).assume_init_ref() })
    }

    /// Looks up a value by hash and equality predicate, returning a mutable
    /// reference.
    ///
    /// The caller must not mutate the value in a way that changes its hash
    /// or equality, or subsequent lookups will misbehave.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns OCCUPIED slots, whose values are
        // initialized.
        Some(unsafe {
            self.slots_ptr()
                .as_mut()
                .get_unchecked_mut(index)
                .assume_init_mut()
        })
    }

    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        if self.len == 0 {
            return None;
        }

        let mask = self.mask();
        let mut pos = (hash as usize) & mask;
        let mut dist = 0;
        loop {
            // SAFETY: `pos` is masked to the slot range; non-FREE slots hold
            // an initialized hash (tombstones retain theirs), and OCCUPIED
            // slots hold an initialized value.
            unsafe {
                let flag = *self.flags_ptr().as_ref().get_unchecked(pos);
                if flag == FREE {
                    return None;
                }
                let stored = self
                    .hashes_ptr()
                    .as_ref()
                    .get_unchecked(pos)
                    .assume_init_read();
                if dist > self.probe_distance(stored, pos) {
                    // Robin Hood ordering: the entry cannot be further away.
                    return None;
                }
                if flag == OCCUPIED
                    && stored == hash
                    && eq(self.slots_ptr().as_ref().get_unchecked(pos).assume_init_ref())
                {
                    return Some(pos);
                }
            }
            pos = (pos + 1) & mask;
            dist += 1;
        }
    }

    /// Gets an entry for the given hash and equality predicate, for in-place
    /// insertion or modification.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::Hash;
    /// # use core::hash::Hasher;
    /// #
    /// # use robin_hash::hash_table::Entry;
    /// # use robin_hash::hash_table::HashTable;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # fn hash_str(s: &str) -> u64 {
    /// #     let mut hasher = SipHasher::new();
    /// #     s.hash(&mut hasher);
    /// #     hasher.finish()
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// let hash = hash_str("hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// table
    ///     .entry(hash, |s: &String| s == "hello")
    ///     .and_modify(|s| s.push('!'));
    /// assert_eq!(
    ///     table.find(hash, |s| s.starts_with("hello")),
    ///     Some(&"hello!".to_string())
    /// );
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        match self.find_index(hash, &eq) {
            Some(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Removes and returns a value identified by hash and equality
    /// predicate.
    ///
    /// The slot is tombstoned rather than freed: its stored hash stays
    /// behind so probe chains running through it keep working. Tombstones
    /// are reclaimed by the next rehash.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert_eq!(table.remove(42, |&n| n == 42), None);
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` only returns OCCUPIED slots.
        Some(unsafe { self.remove_at(index) })
    }

    /// # Safety
    ///
    /// `index` must be an OCCUPIED slot.
    unsafe fn remove_at(&mut self, index: usize) -> V {
        // SAFETY: Caller guarantees the slot is OCCUPIED, so the value is
        // initialized. Setting the DELETED bit makes it a tombstone; the
        // stored hash is deliberately kept.
        let value = unsafe {
            let value = self
                .slots_ptr()
                .as_ref()
                .get_unchecked(index)
                .assume_init_read();
            *self.flags_ptr().as_mut().get_unchecked_mut(index) |= DELETED;
            value
        };
        self.len -= 1;
        value
    }

    /// Drops all live entries and resets every slot to FREE, retaining the
    /// allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(1, |&n: &u64| n == 1).or_insert(1);
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 16);
    /// ```
    pub fn clear(&mut self) {
        // SAFETY: Values are dropped only for OCCUPIED slots; zeroing the
        // flag array resets every slot (including tombstones) to FREE.
        unsafe {
            if core::mem::needs_drop::<V>() && self.len > 0 {
                for index in 0..self.capacity {
                    if *self.flags_ptr().as_ref().get_unchecked(index) == OCCUPIED {
                        self.slots_ptr()
                            .as_mut()
                            .get_unchecked_mut(index)
                            .assume_init_drop();
                    }
                }
            }

            if self.capacity > 0 {
                core::ptr::write_bytes(
                    self.alloc.as_ptr().add(self.layout.flags_offset),
                    FREE,
                    self.capacity,
                );
            }
        }

        self.len = 0;
    }

    /// Rehashes into the smallest capacity that fits the current length.
    ///
    /// An empty table is deallocated entirely. A rehash also reclaims every
    /// tombstone, so this is the remedy for probe chains degraded by heavy
    /// delete/insert churn.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(1000);
    /// for i in 0..4u64 {
    ///     table.entry(i, |&n| n == i).or_insert(i);
    /// }
    ///
    /// table.shrink_to_fit();
    /// assert_eq!(table.capacity(), 8);
    /// assert_eq!(table.len(), 4);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        if self.len == 0 {
            *self = Self::new();
            return;
        }

        let new_capacity = fix_capacity(self.len);
        if new_capacity < self.capacity {
            self.rehash(new_capacity);
        }
    }

    /// Reserves capacity so at least `additional` more entries fit without a
    /// rehash.
    pub fn reserve(&mut self, additional: usize) {
        let required = self
            .len
            .checked_add(additional)
            .expect("allocation size overflow");
        // Stay strictly below the 90% fill threshold after `required`
        // entries.
        if required * 10 >= self.capacity * 9 {
            let target = required.checked_mul(10).expect("allocation size overflow") / 9 + 1;
            self.rehash(fix_capacity(target));
        }
    }

    /// Retains only the values for which the predicate returns `true`.
    ///
    /// Removed values are tombstoned exactly as with [`remove`].
    ///
    /// [`remove`]: HashTable::remove
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) {
        for index in 0..self.capacity {
            // SAFETY: OCCUPIED slots hold initialized values; `remove_at` is
            // called only on slots still flagged OCCUPIED.
            unsafe {
                if *self.flags_ptr().as_ref().get_unchecked(index) != OCCUPIED {
                    continue;
                }
                let keep = f(self
                    .slots_ptr()
                    .as_mut()
                    .get_unchecked_mut(index)
                    .assume_init_mut());
                if !keep {
                    drop(self.remove_at(index));
                }
            }
        }
    }

    /// Returns an iterator over the live values, in unspecified order.
    ///
    /// The order follows the physical slot layout and changes across
    /// rehashes; it is not a public guarantee.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            table: self,
            index: 0,
        }
    }

    /// Returns an iterator that removes and yields every value, leaving the
    /// table empty (capacity retained).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use robin_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.entry(1, |&n: &u64| n == 1).or_insert(1);
    /// table.entry(2, |&n: &u64| n == 2).or_insert(2);
    ///
    /// let mut values: Vec<u64> = table.drain().collect();
    /// values.sort_unstable();
    /// assert_eq!(values, vec![1, 2]);
    /// assert!(table.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            table: self,
            index: 0,
        }
    }

    /// Doubles the capacity (from zero: allocates the minimum table).
    #[cold]
    fn grow(&mut self) {
        let new_capacity = fix_capacity(
            self.capacity
                .checked_mul(2)
                .expect("allocation size overflow"),
        );
        self.rehash(new_capacity);
    }

    /// Rehashes into a freshly allocated table of `new_capacity` slots and
    /// swaps it in.
    ///
    /// The replacement is fully built before the swap, so no partially
    /// mutated state is ever observable; the drained old buffers are freed
    /// by the replacement's drop. Live entries are reinserted in slot order
    /// via the normal insertion routine, which reestablishes the Robin Hood
    /// ordering exactly and discards every tombstone.
    fn rehash(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity >= self.len);

        let mut replacement = Self::with_slot_capacity(new_capacity);

        // SAFETY: OCCUPIED slots hold initialized hashes and values; each
        // value is moved out exactly once and its flag reset to FREE so the
        // old storage drops empty. The replacement has `new_capacity >= len`
        // slots, so a non-live slot is always reachable during insertion.
        unsafe {
            for index in 0..self.capacity {
                if *self.flags_ptr().as_ref().get_unchecked(index) != OCCUPIED {
                    continue;
                }
                let hash = self
                    .hashes_ptr()
                    .as_ref()
                    .get_unchecked(index)
                    .assume_init_read();
                let value = self
                    .slots_ptr()
                    .as_ref()
                    .get_unchecked(index)
                    .assume_init_read();
                *self.flags_ptr().as_mut().get_unchecked_mut(index) = FREE;
                replacement.insert_slot(hash, value);
            }
        }
        replacement.len = self.len;
        self.len = 0;

        core::mem::swap(self, &mut replacement);
    }

    /// Robin Hood backward-shift insertion. Returns the slot index where
    /// `value` itself landed (displaced occupants may settle elsewhere).
    ///
    /// At each step the carried entry either takes a FREE slot, displaces a
    /// live occupant that sits closer to its desired slot ("rob from the
    /// rich"), or claims a tombstone that sits closer to its desired slot.
    /// A tombstone is never claimed by a richer entry: live chains crossing
    /// the tombstone rely on its recorded probe distance for the lookup
    /// early-termination bound, and overwriting it with a smaller distance
    /// would make those keys unfindable.
    ///
    /// # Safety
    ///
    /// The table must have non-zero capacity and at least one non-OCCUPIED
    /// slot, and the value must not already be present (callers go through
    /// `find_index` first).
    unsafe fn insert_slot(&mut self, mut hash: u64, mut value: V) -> usize {
        let mask = self.mask();
        let mut pos = (hash as usize) & mask;
        let mut dist = 0;
        let mut home = usize::MAX;

        // SAFETY: `pos` is masked to the slot range; non-FREE slots hold an
        // initialized hash, and OCCUPIED slots additionally hold an
        // initialized value, so the swaps below only touch initialized
        // storage.
        unsafe {
            loop {
                let flag = *self.flags_ptr().as_ref().get_unchecked(pos);
                if flag == FREE {
                    self.hashes_ptr().as_mut().get_unchecked_mut(pos).write(hash);
                    self.slots_ptr().as_mut().get_unchecked_mut(pos).write(value);
                    *self.flags_ptr().as_mut().get_unchecked_mut(pos) = OCCUPIED;
                    return if home == usize::MAX { pos } else { home };
                }

                let stored = self
                    .hashes_ptr()
                    .as_ref()
                    .get_unchecked(pos)
                    .assume_init_read();
                let existing = self.probe_distance(stored, pos);
                if existing < dist {
                    if flag == OCCUPIED {
                        // Rob from the rich: the carried entry takes the
                        // slot, the displaced occupant probes onward.
                        core::mem::swap(
                            &mut hash,
                            self.hashes_ptr()
                                .as_mut()
                                .get_unchecked_mut(pos)
                                .assume_init_mut(),
                        );
                        core::mem::swap(
                            &mut value,
                            self.slots_ptr()
                                .as_mut()
                                .get_unchecked_mut(pos)
                                .assume_init_mut(),
                        );
                        if home == usize::MAX {
                            home = pos;
                        }
                        dist = existing;
                    } else {
                        // Tombstone poorer than the carried entry: claim it.
                        self.hashes_ptr().as_mut().get_unchecked_mut(pos).write(hash);
                        self.slots_ptr().as_mut().get_unchecked_mut(pos).write(value);
                        *self.flags_ptr().as_mut().get_unchecked_mut(pos) = OCCUPIED;
                        return if home == usize::MAX { pos } else { home };
                    }
                }

                pos = (pos + 1) & mask;
                dist += 1;
            }
        }
    }

    /// Probe-length statistics over the live entries.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_stats(&self) -> ProbeStats {
        let mut tombstones = 0;
        let mut max_probe_distance = 0;
        let mut total_probe_distance = 0;

        // SAFETY: non-FREE slots hold an initialized hash.
        unsafe {
            for index in 0..self.capacity {
                let flag = *self.flags_ptr().as_ref().get_unchecked(index);
                if flag == FREE {
                    continue;
                }
                if flag != OCCUPIED {
                    tombstones += 1;
                    continue;
                }
                let hash = self
                    .hashes_ptr()
                    .as_ref()
                    .get_unchecked(index)
                    .assume_init_read();
                let dist = self.probe_distance(hash, index);
                max_probe_distance = max_probe_distance.max(dist);
                total_probe_distance += dist;
            }
        }

        ProbeStats {
            len: self.len,
            capacity: self.capacity,
            tombstones,
            load_factor: if self.capacity == 0 {
                0.0
            } else {
                self.len as f64 / self.capacity as f64
            },
            max_probe_distance,
            total_probe_distance,
        }
    }

    /// Verifies the structural invariants. Test-only.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert!(self.capacity == 0 || self.capacity.is_power_of_two());

        let mut live = 0;
        // SAFETY: non-FREE slots hold an initialized hash; indices are
        // masked to the slot range.
        unsafe {
            for index in 0..self.capacity {
                if *self.flags_ptr().as_ref().get_unchecked(index) != OCCUPIED {
                    continue;
                }
                live += 1;

                // Every slot on the probe path must be non-FREE and record a
                // probe distance at least as large as the distance traveled
                // to reach it, or lookups would terminate early.
                let hash = self
                    .hashes_ptr()
                    .as_ref()
                    .get_unchecked(index)
                    .assume_init_read();
                let target = self.probe_distance(hash, index);
                let mut pos = (hash as usize) & self.mask();
                for dist in 0..target {
                    let flag = *self.flags_ptr().as_ref().get_unchecked(pos);
                    assert_ne!(flag, FREE, "probe chain broken at slot {pos}");
                    let stored = self
                        .hashes_ptr()
                        .as_ref()
                        .get_unchecked(pos)
                        .assume_init_read();
                    assert!(
                        self.probe_distance(stored, pos) >= dist,
                        "Robin Hood ordering violated at slot {pos}"
                    );
                    pos = (pos + 1) & self.mask();
                }
            }
        }
        assert_eq!(live, self.len);
    }
}

/// A view into a single slot of a [`HashTable`], which is either vacant or
/// occupied.
///
/// Constructed by the [`entry`] method.
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// No matching value is present in the table.
    Vacant(VacantEntry<'a, V>),
    /// A matching value is present in the table.
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
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

    /// Applies `f` to the value if the entry is occupied, returning a
    /// mutable reference to it; vacant entries are left untouched.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(&mut *value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }
}

/// A view into a vacant slot of a [`HashTable`].
///
/// Created by [`entry`] when no matching value is present.
///
/// [`entry`]: HashTable::entry
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value and returns a mutable reference to it.
    ///
    /// The fill-threshold check runs first: if the table is already at 90%
    /// occupancy (or has no capacity yet), it rehashes into double the
    /// capacity before the value is placed.
    pub fn insert(self, value: V) -> &'a mut V {
        if self.table.is_full() {
            self.table.grow();
        }

        // SAFETY: The grow above guarantees non-zero capacity with at least
        // one FREE slot; a vacant entry means the value is absent.
        let index = unsafe { self.table.insert_slot(self.hash, value) };
        self.table.len += 1;

        // SAFETY: `insert_slot` returns the OCCUPIED slot the value landed
        // in.
        unsafe {
            self.table
                .slots_ptr()
                .as_mut()
                .get_unchecked_mut(index)
                .assume_init_mut()
        }
    }
}

/// A view into an occupied slot of a [`HashTable`].
///
/// Created by [`entry`] when a matching value is present.
///
/// [`entry`]: HashTable::entry
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value.
    pub fn get(&self) -> &V {
        // SAFETY: `index` is an OCCUPIED slot located by `find_index`.
        unsafe {
            self.table
                .slots_ptr()
                .as_ref()
                .get_unchecked(self.index)
                .assume_init_ref()
        }
    }

    /// Gets a mutable reference to the value.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: `index` is an OCCUPIED slot located by `find_index`.
        unsafe {
            self.table
                .slots_ptr()
                .as_mut()
                .get_unchecked_mut(self.index)
                .assume_init_mut()
        }
    }

    /// Converts the entry into a mutable reference tied to the table's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: `index` is an OCCUPIED slot located by `find_index`.
        unsafe {
            self.table
                .slots_ptr()
                .as_mut()
                .get_unchecked_mut(self.index)
                .assume_init_mut()
        }
    }

    /// Replaces the value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the table, returning the value.
    ///
    /// The slot becomes a tombstone.
    pub fn remove(self) -> V {
        // SAFETY: `index` is an OCCUPIED slot located by `find_index`.
        unsafe { self.table.remove_at(self.index) }
    }
}

/// An iterator over the live values of a [`HashTable`].
///
/// Created by [`iter`]; yields `&V` in physical slot order.
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    table: &'a HashTable<V>,
    index: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: `index` stays within the slot range; OCCUPIED slots hold
        // initialized values.
        unsafe {
            while self.index < self.table.capacity {
                let index = self.index;
                self.index += 1;
                if *self.table.flags_ptr().as_ref().get_unchecked(index) == OCCUPIED {
                    return Some(
                        self.table
                            .slots_ptr()
                            .as_ref()
                            .get_unchecked(index)
                            .assume_init_ref(),
                    );
                }
            }
        }
        None
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type Item = &'a V;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A draining iterator over the values of a [`HashTable`].
///
/// Created by [`drain`]; yields owned `V` values and leaves the table
/// empty. Dropping the iterator finishes the drain.
///
/// [`drain`]: HashTable::drain
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: `index` stays within the slot range; each OCCUPIED slot's
        // value is read out exactly once, with the flag reset to FREE first
        // so the table's drop never sees it again.
        unsafe {
            while self.index < self.table.capacity {
                let index = self.index;
                self.index += 1;
                if *self.table.flags_ptr().as_ref().get_unchecked(index) == OCCUPIED {
                    *self.table.flags_ptr().as_mut().get_unchecked_mut(index) = FREE;
                    self.table.len -= 1;
                    return Some(
                        self.table
                            .slots_ptr()
                            .as_ref()
                            .get_unchecked(index)
                            .assume_init_read(),
                    );
                }
            }
        }
        None
    }
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}

        // Sweep leftover tombstones so the table is fully reset.
        if self.table.capacity > 0 {
            // SAFETY: The flag array is `capacity` bytes at `flags_offset`.
            unsafe {
                core::ptr::write_bytes(
                    self.table.alloc.as_ptr().add(self.table.layout.flags_offset),
                    FREE,
                    self.table.capacity,
                );
            }
        }
    }
}

/// A consuming iterator over the values of a [`HashTable`].
pub struct IntoIter<V> {
    table: HashTable<V>,
    index: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        // SAFETY: Same discipline as `Drain::next`; the table's own drop
        // frees the allocation and any values not yet yielded.
        unsafe {
            while self.index < self.table.capacity {
                let index = self.index;
                self.index += 1;
                if *self.table.flags_ptr().as_ref().get_unchecked(index) == OCCUPIED {
                    *self.table.flags_ptr().as_mut().get_unchecked_mut(index) = FREE;
                    self.table.len -= 1;
                    return Some(
                        self.table
                            .slots_ptr()
                            .as_ref()
                            .get_unchecked(index)
                            .assume_init_read(),
                    );
                }
            }
        }
        None
    }
}

impl<V> IntoIterator for HashTable<V> {
    type Item = V;
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            index: 0,
        }
    }
}
