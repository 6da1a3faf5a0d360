//! SwissMap: a single-threaded Swiss-table hash map with an
//! extendible-hashing directory on top. Rust-idiomatic API focused on lookup
//! speed and bounded worst-case insertion cost.
//!
//! Each bucket is an open-addressed Swiss table: one control byte per slot in
//! a separate metadata array, probed eight bytes at a time with SWAR bit
//! tricks. Seven bits of a FULL control byte carry the low hash bits (H2) so
//! that a probe can reject seven of eight candidate slots without touching
//! the slot array. Groups of eight control bytes are read as one `u64` and
//! may start at any byte offset; the first seven control bytes are mirrored
//! past the end of the array so that an unaligned group load near the end
//! stays in bounds, and the byte at index `capacity` is a sentinel that is
//! never used for storage.
//!
//! A Swiss table resizes all at once, which shows up as tail latency on big
//! maps. To bound that cost, a directory of bucket pointers is layered on
//! top (extendible hashing): the top `global_depth` bits of a hash index the
//! directory, adjacent directory entries may share a bucket, and a bucket
//! that outgrows `max_bucket_capacity` is split in two instead of the whole
//! map resizing. The worst-case insert therefore pays for one bucket split,
//! never a full-table rehash. Maps that stay within a single bucket skip the
//! directory entirely and behave like a plain Swiss table.

#![deny(unsafe_op_in_unsafe_fn)]

#[cfg(target_endian = "big")]
compile_error!("swissmap_rs relies on little-endian control-group loads");

use std::alloc::{self, Layout};
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ptr;

use ahash::RandomState;

// ================================================================================================
// CONSTANTS
// ================================================================================================

/// Number of control bytes examined per probe step.
const GROUP_SIZE: usize = 8;

/// A bucket rehashes once fewer than 7 of every 8 slots are usable.
const MAX_AVG_GROUP_LOAD: usize = 7;

/// Slot never used, or proven unobservable after a deletion.
const CTRL_EMPTY: u8 = 0b1000_0000;

/// Tombstone. Occupied for probing purposes, carries no entry.
const CTRL_DELETED: u8 = 0b1111_1110;

/// Exactly one per bucket, at index `capacity`. Never stores an entry and is
/// never a tombstone.
const CTRL_SENTINEL: u8 = 0b1111_1111;

/// Low bit of every byte in a group word.
const BITSET_LSB: u64 = 0x0101_0101_0101_0101;

/// High bit of every byte in a group word.
const BITSET_MSB: u64 = 0x8080_8080_8080_8080;

/// Smallest capacity a bucket is ever initialized with (one group, 2^3-1).
const MIN_BUCKET_CAPACITY: usize = 7;

/// Default split threshold. A bucket that would grow past this many slots is
/// split into two buckets of its current size instead.
const DEFAULT_MAX_BUCKET_CAPACITY: usize = 4095;

/// Control bytes for a bucket with no allocation yet. Probes against these
/// match empty immediately, and `growth_left == 0` forces the first insert
/// to allocate. Read-only.
static EMPTY_CTRLS: [u8; GROUP_SIZE] = [CTRL_EMPTY; GROUP_SIZE];

#[inline(always)]
fn empty_ctrls() -> *mut u8 {
    EMPTY_CTRLS.as_ptr() as *mut u8
}

// ================================================================================================
// SWAR PRIMITIVES
// ================================================================================================

/// Result of matching a group: at most the high bit of each byte is set.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Bitset(u64);

impl Bitset {
    #[inline(always)]
    fn any(self) -> bool {
        self.0 != 0
    }

    /// Byte index of the lowest set position. `GROUP_SIZE` if the set is
    /// empty.
    #[inline(always)]
    fn first(self) -> usize {
        (self.0.trailing_zeros() >> 3) as usize
    }

    /// Number of contiguous positions at the start of the group that are not
    /// in the set.
    #[inline(always)]
    fn absent_at_start(self) -> usize {
        self.first()
    }

    /// Number of contiguous positions at the end of the group that are not
    /// in the set.
    #[inline(always)]
    fn absent_at_end(self) -> usize {
        (self.0.leading_zeros() >> 3) as usize
    }

    #[inline(always)]
    fn remove(self, i: usize) -> Bitset {
        Bitset(self.0 & !(0x80u64 << (i << 3)))
    }
}

/// Eight consecutive control bytes loaded as one little-endian word. Groups
/// overlap; they may start at any byte offset.
#[derive(Clone, Copy)]
struct Group(u64);

impl Group {
    /// Positions whose control byte equals `h2`. May return false positives
    /// when a real match is present; callers verify with a key comparison.
    #[inline(always)]
    fn match_h2(self, h2: u8) -> Bitset {
        let v = self.0 ^ (BITSET_LSB * h2 as u64);
        Bitset(v.wrapping_sub(BITSET_LSB) & !v & BITSET_MSB)
    }

    /// Positions that are EMPTY. A byte is empty iff bit 7 is set and bit 1
    /// is not (DELETED and SENTINEL have both set).
    #[inline(always)]
    fn match_empty(self) -> Bitset {
        let v = self.0;
        Bitset(v & !(v << 6) & BITSET_MSB)
    }

    /// Positions that are EMPTY or DELETED. A byte qualifies iff bit 7 is
    /// set and bit 0 is not, which excludes the sentinel.
    #[inline(always)]
    fn match_empty_or_deleted(self) -> Bitset {
        let v = self.0;
        Bitset(v & !(v << 7) & BITSET_MSB)
    }

    /// EMPTY/DELETED/SENTINEL become EMPTY, FULL becomes DELETED. Select the
    /// high bit, invert, add one where the high bit was set, clear bit 0:
    /// a non-full byte folds to `1000_0000`, a full byte to `1111_1110`.
    #[inline(always)]
    fn convert_non_full_to_empty_and_full_to_deleted(self) -> Group {
        let v = self.0 & BITSET_MSB;
        Group((!v).wrapping_add(v >> 7) & !BITSET_LSB)
    }
}

/// H1 is everything above the low 7 bits. It seeds the probe sequence, and
/// its top bits index the directory.
#[inline(always)]
fn h1(h: u64) -> u64 {
    h >> 7
}

/// H2 is the low 7 bits, stored in FULL control bytes.
#[inline(always)]
fn h2(h: u64) -> u8 {
    (h & 0x7f) as u8
}

// ================================================================================================
// PROBE SEQUENCE
// ================================================================================================

/// Triangular probe sequence over group offsets:
///
///   offset(i) = h1 + GROUP_SIZE * i*(i+1)/2   (mod mask+1)
///
/// With `mask + 1` a power of two, `i*(i+1)/2` is a bijection on the group
/// residues, so every group start congruent to the initial offset mod
/// GROUP_SIZE is visited exactly once before the sequence repeats. Probes
/// stop at a group containing an EMPTY byte; growth accounting guarantees
/// every bucket keeps at least one.
#[derive(Clone, Copy)]
struct ProbeSeq {
    mask: usize,
    offset: usize,
    index: usize,
}

impl ProbeSeq {
    #[inline(always)]
    fn new(h1: u64, mask: usize) -> ProbeSeq {
        ProbeSeq {
            mask,
            offset: (h1 as usize) & mask,
            index: 0,
        }
    }

    #[inline(always)]
    fn next(&mut self) {
        self.index += GROUP_SIZE;
        self.offset = (self.offset + self.index) & self.mask;
    }

    /// Slot index for position `i` of the group at the current offset,
    /// wrapped so mirrored control bytes map back to real slots.
    #[inline(always)]
    fn offset_at(&self, i: usize) -> usize {
        (self.offset + i) & self.mask
    }
}

// ================================================================================================
// BUCKET
// ================================================================================================

/// A key/value pair in a bucket's slot array. A slot's contents are valid
/// iff its control byte is FULL.
pub struct Slot<K, V> {
    key: K,
    value: V,
}

/// One Swiss table. A map is composed of one or more buckets addressed
/// through the extendible-hashing directory.
struct Bucket<K, V> {
    /// `capacity + GROUP_SIZE` bytes. `ctrls[capacity]` is the sentinel and
    /// the trailing `GROUP_SIZE - 1` bytes mirror `ctrls[0..GROUP_SIZE-1]`.
    /// Points at `EMPTY_CTRLS` while the bucket has no allocation.
    ctrls: *mut u8,
    /// `capacity` slots. Null while the bucket has no allocation.
    slots: *mut Slot<K, V>,
    /// Always `2^k - 1` (usable as a mask), or 0 for a placeholder.
    capacity: usize,
    /// Number of FULL slots.
    used: usize,
    /// Inserts remaining before a rehash is required. Tombstones are not
    /// returned to this budget; a table full of tombstones must rehash
    /// rather than keep lengthening probe chains.
    growth_left: usize,
    /// Number of high hash bits the directory uses to address this bucket.
    local_depth: u32,
    /// First directory entry pointing at this bucket.
    index: usize,
}

impl<K, V> Bucket<K, V> {
    /// An empty bucket with no allocation. Usable for probing, not for
    /// storage.
    fn placeholder() -> Bucket<K, V> {
        Bucket {
            ctrls: empty_ctrls(),
            slots: ptr::null_mut(),
            capacity: 0,
            used: 0,
            growth_left: 0,
            local_depth: 0,
            index: 0,
        }
    }

    #[inline(always)]
    unsafe fn ctrl(&self, i: usize) -> u8 {
        unsafe { *self.ctrls.add(i) }
    }

    /// Group of 8 control bytes starting at byte `i`. Any `i <= capacity`
    /// is in bounds thanks to the mirrored tail.
    #[inline(always)]
    unsafe fn group(&self, i: usize) -> Group {
        Group(u64::from_le(unsafe {
            (self.ctrls.add(i) as *const u64).read_unaligned()
        }))
    }

    #[inline(always)]
    unsafe fn slot(&self, i: usize) -> *mut Slot<K, V> {
        unsafe { self.slots.add(i) }
    }

    /// Writes control byte `i` and its mirror. For `i` in
    /// `[GROUP_SIZE-1, capacity)` the mirror index is `i` itself; the
    /// redundant store is cheaper than a branch. The sentinel at `capacity`
    /// is never the target because indices wrap modulo `capacity` first.
    #[inline(always)]
    unsafe fn set_ctrl(&mut self, i: usize, c: u8) {
        unsafe {
            *self.ctrls.add(i) = c;
            *self
                .ctrls
                .add((i.wrapping_sub(GROUP_SIZE - 1) & self.capacity) + (GROUP_SIZE - 1)) = c;
        }
    }

    fn reset_growth_left(&mut self) {
        if self.capacity < GROUP_SIZE {
            // A single-group table can fill every slot but one; the spare
            // EMPTY terminates probes.
            self.growth_left = self.capacity.saturating_sub(1);
        } else {
            self.growth_left = self.capacity * MAX_AVG_GROUP_LOAD / GROUP_SIZE;
        }
    }

    /// Number of tombstones, valid when `growth_left == 0`: every slot of
    /// the usable 7/8 budget is either used or deleted.
    fn tombstones(&self) -> usize {
        self.capacity * MAX_AVG_GROUP_LOAD / GROUP_SIZE - self.used
    }

    /// True if slot `i` was never part of a fully occupied probe window, in
    /// which case deleting it can write EMPTY instead of a tombstone.
    ///
    /// Looking at the groups starting at `i` and at `i - GROUP_SIZE`, count
    /// the contiguous non-empty run to the right of `i` (inclusive) and to
    /// the left (exclusive). If the combined run is shorter than a group,
    /// every window covering `i` contains an EMPTY byte and lookups would
    /// have stopped before probing past `i`.
    unsafe fn was_never_full(&self, i: usize) -> bool {
        if self.capacity < GROUP_SIZE {
            // The whole table is one probe window.
            return true;
        }
        let index_before = i.wrapping_sub(GROUP_SIZE) & self.capacity;
        let empty_after = unsafe { self.group(i) }.match_empty();
        let empty_before = unsafe { self.group(index_before) }.match_empty();

        empty_before.any()
            && empty_after.any()
            && empty_before.absent_at_end() + empty_after.absent_at_start() < GROUP_SIZE
    }

    /// Inserts an entry known not to be present: probe for the first group
    /// with an unoccupied slot and claim its lowest one. A reclaimed
    /// tombstone does not consume growth budget; its original insert
    /// already did.
    unsafe fn unchecked_insert(&mut self, h: u64, key: K, value: V) {
        debug_assert!(self.growth_left > 0, "insert without growth budget");
        let mut seq = ProbeSeq::new(h1(h), self.capacity);
        loop {
            let g = unsafe { self.group(seq.offset) };
            let m = g.match_empty_or_deleted();
            if m.any() {
                let i = seq.offset_at(m.first());
                unsafe {
                    ptr::write(self.slot(i), Slot { key, value });
                    if self.ctrl(i) == CTRL_EMPTY {
                        self.growth_left -= 1;
                    }
                    self.set_ctrl(i, h2(h));
                }
                return;
            }
            seq.next();
        }
    }

    /// Allocates backing arrays for `new_capacity` slots (raised to the one
    /// group minimum), all control bytes EMPTY except the sentinel. Does not
    /// touch `used`; resize reinserts into the fresh arrays and keeps the
    /// count.
    unsafe fn init<A: Allocator<K, V>>(&mut self, allocator: &A, new_capacity: usize) {
        let new_capacity = if new_capacity + 1 < GROUP_SIZE {
            GROUP_SIZE - 1
        } else {
            new_capacity
        };
        debug_assert!((new_capacity + 1).is_power_of_two());

        self.slots = allocator.alloc_slots(new_capacity);
        self.ctrls = allocator.alloc_ctrls(new_capacity + GROUP_SIZE);
        unsafe {
            ptr::write_bytes(self.ctrls, CTRL_EMPTY, new_capacity + GROUP_SIZE);
            *self.ctrls.add(new_capacity) = CTRL_SENTINEL;
        }
        self.capacity = new_capacity;
        self.reset_growth_left();
    }

    /// Drops the live entries. Control bytes are left stale; callers reset
    /// or free them.
    unsafe fn drop_entries(&mut self) {
        for i in 0..self.capacity {
            unsafe {
                if self.ctrl(i) & CTRL_EMPTY == 0 {
                    ptr::drop_in_place(self.slot(i));
                }
            }
        }
    }

    /// Returns the backing arrays to the allocator and reverts to a
    /// placeholder. Entries must already have been dropped or moved out.
    unsafe fn close<A: Allocator<K, V>>(&mut self, allocator: &A) {
        if self.capacity > 0 {
            unsafe {
                allocator.free_slots(self.slots, self.capacity);
                allocator.free_ctrls(self.ctrls, self.capacity + GROUP_SIZE);
            }
        }
        self.ctrls = empty_ctrls();
        self.slots = ptr::null_mut();
        self.capacity = 0;
        self.used = 0;
        self.growth_left = 0;
    }
}

// ================================================================================================
// MAIN MAP STRUCTURE
// ================================================================================================

/// An unordered map from keys to values built from Swiss-table buckets
/// addressed by an extendible-hashing directory.
///
/// Lookups hash the key once, route through the directory (or straight to
/// the inline bucket while the map fits in one), and probe control bytes
/// eight at a time. Growth is incremental: an oversized bucket splits into
/// two, and only the pointer directory ever doubles.
///
/// `SwissMap` is single-threaded; `&mut self` methods mutate and nothing is
/// internally synchronized.
pub struct SwissMap<K, V, S = RandomState, A = DefaultAllocator>
where
    A: Allocator<K, V>,
{
    hasher: S,
    /// Mixed into every hash and re-drawn on `clear`, so repeatedly
    /// clearing a map does not preserve an attacker-learned layout.
    seed: u64,
    allocator: A,
    /// Present inline and used directly while `global_shift == 0`, the
    /// common case of a map that fits in one bucket. Once the directory
    /// exists this is a dead placeholder; the directory owns heap buckets
    /// exclusively.
    bucket0: Bucket<K, V>,
    /// `2^global_depth` entries. A bucket with `local_depth = d` occupies
    /// the `2^(global_depth - d)` contiguous entries starting at its
    /// `index`.
    dir: Vec<*mut Bucket<K, V>>,
    /// Entries across all buckets.
    used: usize,
    /// `64 - global_depth`, or 0 to select the inline single-bucket path.
    /// Storing the shift makes directory routing one shift with no branch
    /// on depth.
    global_shift: u32,
    /// Split threshold, always `2^k - 1`.
    max_bucket_capacity: usize,
}

// SAFETY: all bucket and directory memory is uniquely owned by the map and
// only reachable through it; there is no interior mutability. Shared
// references only ever read, so the map is Send/Sync exactly when its
// parameters are.
unsafe impl<K: Send, V: Send, S: Send, A: Send + Allocator<K, V>> Send for SwissMap<K, V, S, A> {}
unsafe impl<K: Sync, V: Sync, S: Sync, A: Sync + Allocator<K, V>> Sync for SwissMap<K, V, S, A> {}

// ================================================================================================
// CONSTRUCTORS AND BUILDER
// ================================================================================================

impl<K: Hash + Eq, V> SwissMap<K, V> {
    /// Create an empty map. No memory is allocated until the first insert.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a map sized for `capacity` entries at the 7/8 load factor.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }

    /// Start building a map with non-default options.
    pub fn builder() -> Builder {
        Builder::new()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> SwissMap<K, V, S> {
    /// Create an empty map using the provided hasher.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Create a map sized for `capacity` entries using the provided hasher.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self::with_options(capacity, hasher, DefaultAllocator, DEFAULT_MAX_BUCKET_CAPACITY)
    }
}

/// Construction-time options for a [`SwissMap`].
pub struct Builder<S = RandomState, A = DefaultAllocator> {
    hasher: S,
    allocator: A,
    max_bucket_capacity: usize,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            hasher: RandomState::new(),
            allocator: DefaultAllocator,
            max_bucket_capacity: DEFAULT_MAX_BUCKET_CAPACITY,
        }
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}

impl<S, A> Builder<S, A> {
    /// Replace the default `ahash` hasher.
    pub fn hasher<S2: BuildHasher>(self, hasher: S2) -> Builder<S2, A> {
        Builder {
            hasher,
            allocator: self.allocator,
            max_bucket_capacity: self.max_bucket_capacity,
        }
    }

    /// Replace the default allocator.
    pub fn allocator<A2>(self, allocator: A2) -> Builder<S, A2> {
        Builder {
            hasher: self.hasher,
            allocator,
            max_bucket_capacity: self.max_bucket_capacity,
        }
    }

    /// Set the capacity past which a bucket splits rather than resizing in
    /// place. Clamped up to a one-group minimum and normalized to `2^k - 1`.
    /// A very large value disables the directory layer and yields one
    /// classic Swiss table.
    pub fn max_bucket_capacity(mut self, capacity: usize) -> Builder<S, A> {
        self.max_bucket_capacity = capacity;
        self
    }

    /// Build a map sized for `initial_capacity` entries.
    pub fn build<K: Hash + Eq, V>(self, initial_capacity: usize) -> SwissMap<K, V, S, A>
    where
        S: BuildHasher,
        A: Allocator<K, V>,
    {
        SwissMap::with_options(
            initial_capacity,
            self.hasher,
            self.allocator,
            self.max_bucket_capacity,
        )
    }
}

// ================================================================================================
// PUBLIC API METHODS
// ================================================================================================

impl<K, V, S, A> SwissMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator<K, V>,
{
    fn with_options(
        initial_capacity: usize,
        hasher: S,
        allocator: A,
        max_bucket_capacity: usize,
    ) -> Self {
        let max_bucket_capacity = normalize_capacity(max_bucket_capacity.max(MIN_BUCKET_CAPACITY));

        let mut m = SwissMap {
            hasher,
            seed: rand::random(),
            allocator,
            bucket0: Bucket::placeholder(),
            dir: Vec::new(),
            used: 0,
            global_shift: 0,
            max_bucket_capacity,
        };

        if initial_capacity > 0 {
            // The realized capacity is 7/8 of the slot count, so aim for
            // initial_capacity * 8/7 slots.
            let target = initial_capacity * GROUP_SIZE / MAX_AVG_GROUP_LOAD;
            if target <= m.max_bucket_capacity {
                unsafe {
                    m.bucket0.init(&m.allocator, normalize_capacity(target));
                }
            } else {
                // Pre-split: enough max-sized buckets to hold the request,
                // and a directory sized for them.
                let n_buckets = (target + m.max_bucket_capacity - 1) / m.max_bucket_capacity;
                let global_depth = usize::BITS - (n_buckets - 1).leading_zeros();
                let n = 1usize << global_depth;
                let mut dir = Vec::with_capacity(n);
                for i in 0..n {
                    let mut b = Box::new(Bucket::placeholder());
                    unsafe {
                        b.init(&m.allocator, m.max_bucket_capacity);
                    }
                    b.local_depth = global_depth;
                    b.index = i;
                    dir.push(Box::into_raw(b));
                }
                m.dir = dir;
                m.global_shift = 64 - global_depth;
            }
        }

        m.maybe_check();
        m
    }

    /// Returns a reference to the value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<&V> {
        let h = self.hash_key(key);
        let b = self.bucket_shared(h);
        unsafe {
            let mut seq = ProbeSeq::new(h1(h), (*b).capacity);
            loop {
                let g = (*b).group(seq.offset);
                let mut m = g.match_h2(h2(h));
                while m.any() {
                    let idx = m.first();
                    let i = seq.offset_at(idx);
                    let slot = (*b).slot(i);
                    if (*slot).key == *key {
                        return Some(&(*slot).value);
                    }
                    m = m.remove(idx);
                }
                if g.match_empty().any() {
                    return None;
                }
                seq.next();
            }
        }
    }

    /// Returns a mutable reference to the value for `key`, if present.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let h = self.hash_key(key);
        let b = self.bucket_mut(h);
        unsafe {
            let mut seq = ProbeSeq::new(h1(h), (*b).capacity);
            loop {
                let g = (*b).group(seq.offset);
                let mut m = g.match_h2(h2(h));
                while m.any() {
                    let idx = m.first();
                    let i = seq.offset_at(idx);
                    let slot = (*b).slot(i);
                    if (*slot).key == *key {
                        return Some(&mut (*slot).value);
                    }
                    m = m.remove(idx);
                }
                if g.match_empty().any() {
                    return None;
                }
                seq.next();
            }
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts an entry, returning the previous value if the key was
    /// already present. May rehash, resize, or split the key's bucket.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let h = self.hash_key(&key);
        let mut b = self.bucket_mut(h);
        unsafe {
            let mut seq = ProbeSeq::new(h1(h), (*b).capacity);
            loop {
                let g = (*b).group(seq.offset);
                let mut m = g.match_h2(h2(h));
                while m.any() {
                    let idx = m.first();
                    let i = seq.offset_at(idx);
                    let slot = (*b).slot(i);
                    if (*slot).key == key {
                        let old = mem::replace(&mut (*slot).value, value);
                        self.maybe_check();
                        return Some(old);
                    }
                    m = m.remove(idx);
                }

                if g.match_empty().any() {
                    // The key is absent. Make room first if needed; a split
                    // can move the key's home bucket, so re-route before the
                    // unchecked insert. The key is still known absent, so
                    // the probe does not restart.
                    if (*b).growth_left == 0 {
                        self.rehash_or_grow(b);
                        b = self.bucket_mut(h);
                    }
                    (*b).unchecked_insert(h, key, value);
                    (*b).used += 1;
                    self.used += 1;
                    self.maybe_check();
                    return None;
                }
                seq.next();
            }
        }
    }

    /// Removes `key`, returning its value if it was present.
    ///
    /// The freed slot becomes EMPTY when no probe window covering it could
    /// ever have been full, and a tombstone otherwise. Writing EMPTY into a
    /// once-full window would cut probe chains short and lose entries.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let h = self.hash_key(key);
        let b = self.bucket_mut(h);
        unsafe {
            let mut seq = ProbeSeq::new(h1(h), (*b).capacity);
            loop {
                let g = (*b).group(seq.offset);
                let mut m = g.match_h2(h2(h));
                while m.any() {
                    let idx = m.first();
                    let i = seq.offset_at(idx);
                    let slot = (*b).slot(i);
                    if (*slot).key == *key {
                        (*b).used -= 1;
                        self.used -= 1;
                        let old = ptr::read(slot);
                        if (*b).was_never_full(i) {
                            (*b).set_ctrl(i, CTRL_EMPTY);
                            (*b).growth_left += 1;
                        } else {
                            (*b).set_ctrl(i, CTRL_DELETED);
                        }
                        self.maybe_check();
                        return Some(old.value);
                    }
                    m = m.remove(idx);
                }
                if g.match_empty().any() {
                    return None;
                }
                seq.next();
            }
        }
    }

    /// Removes every entry. Capacity is retained; the hash seed is
    /// re-drawn.
    pub fn clear(&mut self) {
        for b in self.bucket_walk() {
            unsafe {
                (*b).drop_entries();
                for i in 0..(*b).capacity {
                    (*b).set_ctrl(i, CTRL_EMPTY);
                }
                (*b).used = 0;
                (*b).reset_growth_left();
            }
        }
        self.used = 0;
        self.seed = rand::random();
        self.maybe_check();
    }

    /// Number of entries in the map.
    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Total slot capacity across all buckets.
    pub fn capacity(&self) -> usize {
        let mut total = 0;
        for b in self.bucket_walk() {
            total += unsafe { (*b).capacity };
        }
        total
    }

    /// Iterates over the entries in an unspecified, per-call pseudo-random
    /// order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let offset = rand::random::<u64>();
        let (start, dir, dir_len) = if self.global_shift == 0 {
            (&self.bucket0 as *const Bucket<K, V>, ptr::null(), 0)
        } else {
            let idx = (offset >> 32) as usize & (self.dir.len() - 1);
            (
                self.dir[idx] as *const Bucket<K, V>,
                self.dir.as_ptr(),
                self.dir.len(),
            )
        };
        Iter {
            start,
            cur: start,
            dir,
            dir_len,
            global_depth: self.global_depth(),
            offset: offset as usize,
            i: 0,
            done: false,
            _marker: PhantomData,
        }
    }

    /// Iterates over the keys in an unspecified order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Iterates over the values in an unspecified order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    // ============================================================================================
    // PRIVATE HELPER METHODS
    // ============================================================================================

    #[inline(always)]
    fn hash_key(&self, key: &K) -> u64 {
        let mut state = self.hasher.build_hasher();
        state.write_u64(self.seed);
        key.hash(&mut state);
        state.finish()
    }

    /// Routes a hash to its bucket. Masking the shift lets the compiler
    /// elide the variable-shift overflow check.
    #[inline(always)]
    fn bucket_shared(&self, h: u64) -> *const Bucket<K, V> {
        if self.global_shift == 0 {
            &self.bucket0
        } else {
            unsafe { *self.dir.get_unchecked((h >> (self.global_shift & 63)) as usize) }
        }
    }

    #[inline(always)]
    fn bucket_mut(&mut self, h: u64) -> *mut Bucket<K, V> {
        if self.global_shift == 0 {
            &mut self.bucket0
        } else {
            unsafe { *self.dir.get_unchecked((h >> (self.global_shift & 63)) as usize) }
        }
    }

    /// Directory length (1 while the map is single-bucket).
    fn bucket_count(&self) -> usize {
        1usize << (self.global_depth() & 63)
    }
}

impl<K, V, S, A: Allocator<K, V>> SwissMap<K, V, S, A> {
    #[inline(always)]
    fn global_depth(&self) -> u32 {
        if self.global_shift == 0 {
            0
        } else {
            64 - self.global_shift
        }
    }

    /// Visits each distinct bucket exactly once. The directory is
    /// partitioned into contiguous per-bucket ranges, so stepping by each
    /// bucket's range length walks the distinct buckets in order.
    fn bucket_walk(&self) -> BucketWalk<K, V> {
        BucketWalk {
            single: if self.global_shift == 0 {
                Some(&self.bucket0 as *const Bucket<K, V> as *mut Bucket<K, V>)
            } else {
                None
            },
            dir: if self.global_shift == 0 {
                ptr::null()
            } else {
                self.dir.as_ptr()
            },
            dir_len: if self.global_shift == 0 { 0 } else { self.dir.len() },
            pos: 0,
            global_depth: self.global_depth(),
        }
    }
}

impl<K, V, S, A> SwissMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator<K, V>,
{
    // ============================================================================================
    // REHASH, RESIZE, SPLIT
    // ============================================================================================

    /// Called when an insert finds `growth_left == 0`. Rehashes in place
    /// when at least a third of the capacity is tombstones (the threshold
    /// balances insert/remove churn against load factor); otherwise doubles,
    /// splitting instead once doubling would pass `max_bucket_capacity`.
    unsafe fn rehash_or_grow(&mut self, b: *mut Bucket<K, V>) {
        let cap = unsafe { (*b).capacity };
        if cap > GROUP_SIZE && unsafe { (*b).tombstones() } >= cap / 3 {
            unsafe { self.rehash_in_place(b) };
            return;
        }
        let new_capacity = 2 * cap + 1;
        if new_capacity > self.max_bucket_capacity {
            unsafe { self.split_bucket(b) };
        } else {
            unsafe { self.resize_bucket(b, new_capacity) };
        }
    }

    /// Replaces the bucket's arrays with larger ones and reinserts every
    /// entry. The new arrays are fully allocated before the old ones are
    /// read, and the old ones are released only after the move completes.
    unsafe fn resize_bucket(&mut self, b: *mut Bucket<K, V>, new_capacity: usize) {
        unsafe {
            let old_ctrls = (*b).ctrls;
            let old_slots = (*b).slots;
            let old_capacity = (*b).capacity;

            (*b).init(&self.allocator, new_capacity);

            for i in 0..old_capacity {
                let c = *old_ctrls.add(i);
                if c == CTRL_EMPTY || c == CTRL_DELETED {
                    continue;
                }
                let slot = ptr::read(old_slots.add(i));
                let h = self.hash_key(&slot.key);
                (*b).unchecked_insert(h, slot.key, slot.value);
            }

            if old_capacity > 0 {
                self.allocator.free_slots(old_slots, old_capacity);
                self.allocator
                    .free_ctrls(old_ctrls, old_capacity + GROUP_SIZE);
            }
        }
    }

    /// Drops every tombstone without allocating, restoring the probe
    /// invariant by moving displaced entries to their first reachable slot.
    unsafe fn rehash_in_place(&mut self, b: *mut Bucket<K, V>) {
        unsafe {
            let cap = (*b).capacity;

            // Phase 1: DELETED and the sentinel become EMPTY (tombstones
            // dropped), FULL becomes DELETED (marker: this slot still holds
            // an entry that has not been re-placed).
            let mut i = 0;
            while i < cap {
                let converted = (*b)
                    .group(i)
                    .convert_non_full_to_empty_and_full_to_deleted();
                ((*b).ctrls.add(i) as *mut u64).write_unaligned(converted.0.to_le());
                i += GROUP_SIZE;
            }

            // The group conversion clobbered the mirrored tail and the
            // sentinel; restore both.
            for i in 0..GROUP_SIZE - 1 {
                let j = (i.wrapping_sub(GROUP_SIZE - 1) & cap) + (GROUP_SIZE - 1);
                *(*b).ctrls.add(j) = *(*b).ctrls.add(i);
            }
            *(*b).ctrls.add(cap) = CTRL_SENTINEL;

            // Phase 2: re-place each marked entry. The range [0, i) never
            // regains a DELETED byte, so the scan terminates.
            let mut i = 0;
            while i < cap {
                if (*b).ctrl(i) != CTRL_DELETED {
                    i += 1;
                    continue;
                }
                loop {
                    let h = self.hash_key(&(*(*b).slot(i)).key);
                    let start = ProbeSeq::new(h1(h), cap);

                    let mut seq = start;
                    let target = loop {
                        let m = (*b).group(seq.offset).match_empty_or_deleted();
                        if m.any() {
                            break seq.offset_at(m.first());
                        }
                        seq.next();
                    };

                    // Probe-window ordinal of a position for this key.
                    let probe_group =
                        |pos: usize| (pos.wrapping_sub(start.offset) & cap) / GROUP_SIZE;

                    if i == target || probe_group(i) == probe_group(target) {
                        // Already in its best reachable window; keep it.
                        (*b).set_ctrl(i, h2(h));
                        break;
                    }

                    if (*b).ctrl(target) == CTRL_EMPTY {
                        (*b).set_ctrl(target, h2(h));
                        ptr::copy_nonoverlapping((*b).slot(i), (*b).slot(target), 1);
                        (*b).set_ctrl(i, CTRL_EMPTY);
                        break;
                    }

                    // Target holds another displaced entry. Swap, then
                    // re-place the entry now sitting at `i`.
                    debug_assert_eq!((*b).ctrl(target), CTRL_DELETED);
                    (*b).set_ctrl(target, h2(h));
                    ptr::swap((*b).slot(i), (*b).slot(target));
                }
                i += 1;
            }

            (*b).reset_growth_left();
            (*b).growth_left -= (*b).used;
        }
    }

    /// Splits a bucket: entries whose next undistinguished hash bit is 1
    /// move to a new sibling of the same capacity, the directory grows if
    /// this bucket was already at global depth, and the sibling takes the
    /// upper half of the bucket's directory range.
    unsafe fn split_bucket(&mut self, mut b: *mut Bucket<K, V>) {
        unsafe {
            let cap = (*b).capacity;
            let mut newb = Box::new(Bucket::placeholder());
            newb.local_depth = (*b).local_depth;
            newb.index = (*b).index;
            newb.init(&self.allocator, cap);

            // The first hash bit past the local_depth bits the directory
            // already distinguishes on.
            let bit = 1u64 << (63 - (*b).local_depth);
            for i in 0..cap {
                let c = (*b).ctrl(i);
                if c == CTRL_EMPTY || c == CTRL_DELETED {
                    continue;
                }
                let h = self.hash_key(&(*(*b).slot(i)).key);
                if h & bit == 0 {
                    continue;
                }

                let slot = ptr::read((*b).slot(i));
                newb.unchecked_insert(h, slot.key, slot.value);
                newb.used += 1;

                if (*b).was_never_full(i) {
                    (*b).set_ctrl(i, CTRL_EMPTY);
                    (*b).growth_left += 1;
                } else {
                    (*b).set_ctrl(i, CTRL_DELETED);
                }
                (*b).used -= 1;
            }

            if (*b).used >= cap * MAX_AVG_GROUP_LOAD / GROUP_SIZE {
                // Nothing moved: either the threshold is too small and the
                // draw was unlucky, or the hash is degenerate in its high
                // bits. Raise the threshold and fall back to resizing.
                self.max_bucket_capacity = 2 * self.max_bucket_capacity + 1;
                newb.close(&self.allocator);
                self.resize_bucket(b, 2 * cap + 1);
                return;
            }

            if newb.used >= cap * MAX_AVG_GROUP_LOAD / GROUP_SIZE || newb.growth_left == 0 {
                // Everything moved (the two conditions are equivalent).
                // Raise the threshold, let the sibling take this bucket's
                // place, and resize it.
                self.max_bucket_capacity = 2 * self.max_bucket_capacity + 1;
                let b_inline = self.global_shift == 0;
                (*b).close(&self.allocator);
                let installed = self.install_bucket(newb);
                if !b_inline {
                    drop(Box::from_raw(b));
                }
                self.resize_bucket(installed, 2 * cap + 1);
                return;
            }

            // The caller may insert into the evacuated bucket next; make
            // sure it has usable slots.
            if (*b).growth_left == 0 {
                self.rehash_in_place(b);
            }

            if (*b).local_depth >= self.global_depth() {
                let was_single = self.global_shift == 0;
                self.grow_directory((*b).local_depth + 1);
                if was_single {
                    // Growing the directory moved the inline bucket to the
                    // heap.
                    b = self.dir[0];
                }
            }

            (*b).local_depth += 1;
            newb.local_depth = (*b).local_depth;
            newb.index = (*b).index + (1usize << ((self.global_depth() - (*b).local_depth) & 63));
            self.install_bucket(newb);

            self.maybe_check();
        }
    }

    /// Writes a bucket into every directory entry of its range and hands
    /// ownership of the box to the directory. With no directory the bucket
    /// replaces the inline bucket.
    unsafe fn install_bucket(&mut self, b: Box<Bucket<K, V>>) -> *mut Bucket<K, V> {
        if self.global_shift == 0 {
            self.bucket0 = *b;
            &mut self.bucket0
        } else {
            let p = Box::into_raw(b);
            unsafe {
                let step = 1usize << ((self.global_depth() - (*p).local_depth) & 63);
                for j in 0..step {
                    self.dir[(*p).index + j] = p;
                }
            }
            p
        }
    }

    /// Reallocates the directory at `2^new_global_depth` entries, walking
    /// the old entries in order and re-basing each distinct bucket's index.
    /// The first growth also moves the inline bucket to the heap so every
    /// directory entry owns heap memory.
    unsafe fn grow_directory(&mut self, new_global_depth: u32) {
        debug_assert!(new_global_depth <= 32, "directory unexpectedly deep");
        let new_len = 1usize << new_global_depth;
        let mut new_dir: Vec<*mut Bucket<K, V>> = vec![ptr::null_mut(); new_len];

        unsafe {
            if self.global_shift == 0 {
                let b = Box::into_raw(Box::new(mem::replace(
                    &mut self.bucket0,
                    Bucket::placeholder(),
                )));
                (*b).index = 0;
                for e in new_dir.iter_mut() {
                    *e = b;
                }
            } else {
                let mut write = 0usize;
                let mut last: *mut Bucket<K, V> = ptr::null_mut();
                for j in 0..self.dir.len() {
                    let b = self.dir[j];
                    if b == last {
                        continue;
                    }
                    last = b;
                    (*b).index = write;
                    let step = 1usize << ((new_global_depth - (*b).local_depth) & 63);
                    for e in new_dir[write..write + step].iter_mut() {
                        *e = b;
                    }
                    write += step;
                }
                debug_assert_eq!(write, new_len);
            }
        }

        self.dir = new_dir;
        self.global_shift = 64 - new_global_depth;
    }

    // ============================================================================================
    // INVARIANT CHECKS
    // ============================================================================================

    #[inline(always)]
    fn maybe_check(&self) {
        if cfg!(feature = "invariants") {
            self.check_invariants();
        }
    }

    /// Verifies the directory structure and every bucket. Panics on any
    /// violation; a violation is a bug in the map.
    fn check_invariants(&self) {
        if self.global_shift == 0 {
            assert!(self.dir.is_empty(), "unexpected directory");
            assert_eq!(self.bucket0.local_depth, 0, "inline bucket with depth");
        } else {
            assert_eq!(self.dir.len(), self.bucket_count());
            for (i, &b) in self.dir.iter().enumerate() {
                assert!(!b.is_null(), "dir[{i}]: null bucket");
                unsafe {
                    assert!(
                        (*b).local_depth <= self.global_depth(),
                        "dir[{i}]: local depth {} exceeds global depth {}",
                        (*b).local_depth,
                        self.global_depth(),
                    );
                    let n = 1usize << ((self.global_depth() - (*b).local_depth) & 63);
                    assert!(
                        i >= (*b).index && i < (*b).index + n,
                        "dir[{i}]: outside range [{}, {})",
                        (*b).index,
                        (*b).index + n,
                    );
                }
            }
        }

        let mut total = 0;
        for b in self.bucket_walk() {
            unsafe {
                self.check_bucket(b);
                total += (*b).used;
            }
        }
        assert_eq!(total, self.used, "per-bucket used counts disagree with map");
    }

    unsafe fn check_bucket(&self, b: *mut Bucket<K, V>) {
        let b = unsafe { &*b };
        unsafe {
            if b.capacity > 0 {
                for i in 0..GROUP_SIZE - 1 {
                    let j = (i.wrapping_sub(GROUP_SIZE - 1) & b.capacity) + (GROUP_SIZE - 1);
                    assert_eq!(
                        b.ctrl(i),
                        b.ctrl(j),
                        "mirror mismatch: ctrl({i}) vs ctrl({j})",
                    );
                }
                assert_eq!(b.ctrl(b.capacity), CTRL_SENTINEL, "sentinel overwritten");
            }

            let mut used = 0;
            let mut deleted = 0;
            for i in 0..b.capacity {
                let c = b.ctrl(i);
                if c == CTRL_DELETED {
                    deleted += 1;
                } else if c != CTRL_EMPTY {
                    assert_ne!(c, CTRL_SENTINEL, "stray sentinel at {i}");
                    let slot = &*b.slot(i);
                    assert!(
                        self.get(&slot.key).is_some(),
                        "slot {i} holds a key that find cannot reach",
                    );
                    used += 1;
                }
            }
            assert_eq!(used, b.used, "used count drifted");
            let expected = b.capacity * MAX_AVG_GROUP_LOAD / GROUP_SIZE - b.used - deleted;
            assert_eq!(b.growth_left, expected, "growth_left drifted");
        }
    }
}

// ================================================================================================
// DROP
// ================================================================================================

impl<K, V, S, A: Allocator<K, V>> Drop for SwissMap<K, V, S, A> {
    fn drop(&mut self) {
        let heap = self.global_shift != 0;
        for b in self.bucket_walk() {
            unsafe {
                (*b).drop_entries();
                (*b).close(&self.allocator);
                if heap {
                    drop(Box::from_raw(b));
                }
            }
        }
    }
}

// ================================================================================================
// ALLOCATOR SURFACE
// ================================================================================================

/// Supplies backing memory for a bucket's control and slot arrays, sized by
/// element count.
///
/// An implementation may panic on allocation failure; the map allocates
/// replacement arrays before disturbing the arrays they replace, so a panic
/// leaves the map valid. Memory handed back through the `free` methods has
/// had its live contents dropped or moved out already.
pub trait Allocator<K, V> {
    /// Memory for `n` slots, uninitialized.
    fn alloc_slots(&self, n: usize) -> *mut Slot<K, V>;

    /// Memory for `n` control bytes, uninitialized.
    fn alloc_ctrls(&self, n: usize) -> *mut u8;

    /// # Safety
    ///
    /// `ptr`/`n` must come from a matching `alloc_slots` call on this
    /// allocator.
    unsafe fn free_slots(&self, ptr: *mut Slot<K, V>, n: usize);

    /// # Safety
    ///
    /// `ptr`/`n` must come from a matching `alloc_ctrls` call on this
    /// allocator.
    unsafe fn free_ctrls(&self, ptr: *mut u8, n: usize);
}

/// Default allocator backed by the global allocator. Failure aborts via
/// `handle_alloc_error`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAllocator;

impl<K, V> Allocator<K, V> for DefaultAllocator {
    fn alloc_slots(&self, n: usize) -> *mut Slot<K, V> {
        let layout = Layout::array::<Slot<K, V>>(n).unwrap();
        let ptr = unsafe { alloc::alloc(layout) as *mut Slot<K, V> };
        if ptr.is_null() {
            alloc::handle_alloc_error(layout);
        }
        ptr
    }

    fn alloc_ctrls(&self, n: usize) -> *mut u8 {
        let layout = Layout::array::<u8>(n).unwrap();
        let ptr = unsafe { alloc::alloc(layout) };
        if ptr.is_null() {
            alloc::handle_alloc_error(layout);
        }
        ptr
    }

    unsafe fn free_slots(&self, ptr: *mut Slot<K, V>, n: usize) {
        unsafe {
            alloc::dealloc(ptr as *mut u8, Layout::array::<Slot<K, V>>(n).unwrap());
        }
    }

    unsafe fn free_ctrls(&self, ptr: *mut u8, n: usize) {
        unsafe {
            alloc::dealloc(ptr, Layout::array::<u8>(n).unwrap());
        }
    }
}

// ================================================================================================
// ITERATORS
// ================================================================================================

/// Internal walk over the distinct buckets of a map, in directory order.
struct BucketWalk<K, V> {
    single: Option<*mut Bucket<K, V>>,
    dir: *const *mut Bucket<K, V>,
    dir_len: usize,
    pos: usize,
    global_depth: u32,
}

impl<K, V> Iterator for BucketWalk<K, V> {
    type Item = *mut Bucket<K, V>;

    fn next(&mut self) -> Option<*mut Bucket<K, V>> {
        if let Some(b) = self.single.take() {
            return Some(b);
        }
        if self.pos >= self.dir_len {
            return None;
        }
        unsafe {
            let b = *self.dir.add(self.pos);
            self.pos = (*b).index + (1usize << ((self.global_depth - (*b).local_depth) & 63));
            Some(b)
        }
    }
}

/// Iterator over a map's entries. Starts at a pseudo-random bucket and a
/// pseudo-random rotation within each bucket; steps across the directory by
/// each bucket's entry range so every bucket is visited exactly once.
pub struct Iter<'a, K, V> {
    start: *const Bucket<K, V>,
    cur: *const Bucket<K, V>,
    dir: *const *mut Bucket<K, V>,
    dir_len: usize,
    global_depth: u32,
    offset: usize,
    i: usize,
    done: bool,
    _marker: PhantomData<(&'a K, &'a V)>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if self.done {
            return None;
        }
        unsafe {
            loop {
                let b = self.cur;
                let cap = (*b).capacity;
                if (*b).used > 0 {
                    while self.i <= cap {
                        let j = self.i.wrapping_add(self.offset) & cap;
                        let c = *(*b).ctrls.add(j);
                        self.i += 1;
                        // FULL control bytes have the high bit clear; the
                        // sentinel at j == cap is skipped with the rest.
                        if c & CTRL_EMPTY == 0 {
                            let slot = (*b).slots.add(j);
                            return Some((&(*slot).key, &(*slot).value));
                        }
                    }
                }

                if self.dir_len == 0 {
                    self.done = true;
                    return None;
                }
                let step = 1usize << ((self.global_depth - (*b).local_depth) & 63);
                let next =
                    *self.dir.add(((*b).index + step) & (self.dir_len - 1)) as *const Bucket<K, V>;
                if next == self.start {
                    self.done = true;
                    return None;
                }
                self.cur = next;
                self.i = 0;
            }
        }
    }
}

/// Iterator over a map's keys.
pub struct Keys<'a, K, V>(Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.0.next().map(|(k, _)| k)
    }
}

/// Iterator over a map's values.
pub struct Values<'a, K, V>(Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.0.next().map(|(_, v)| v)
    }
}

// ================================================================================================
// STANDARD TRAIT IMPLEMENTATIONS
// ================================================================================================

impl<K, V, S, A> Default for SwissMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    A: Allocator<K, V> + Default,
{
    fn default() -> Self {
        Self::with_options(0, S::default(), A::default(), DEFAULT_MAX_BUCKET_CAPACITY)
    }
}

impl<'a, K, V, S, A> IntoIterator for &'a SwissMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator<K, V>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V, S, A> FromIterator<(K, V)> for SwissMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    A: Allocator<K, V> + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut m = Self::with_options(
            iter.size_hint().0,
            S::default(),
            A::default(),
            DEFAULT_MAX_BUCKET_CAPACITY,
        );
        for (k, v) in iter {
            m.insert(k, v);
        }
        m
    }
}

impl<K, V, S, A> Extend<(K, V)> for SwissMap<K, V, S, A>
where
    K: Hash + Eq,
    S: BuildHasher,
    A: Allocator<K, V>,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S, A> fmt::Debug for SwissMap<K, V, S, A>
where
    K: Hash + Eq + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
    A: Allocator<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// ================================================================================================
// UTILITY FUNCTIONS
// ================================================================================================

/// Normalizes a capacity to the mask-friendly form `2^k - 1`: one less than
/// `capacity` rounded up to a power of two. An exact power of two maps to
/// itself minus one.
#[inline(always)]
fn normalize_capacity(capacity: usize) -> usize {
    if capacity <= 1 {
        return 0;
    }
    usize::MAX >> (capacity - 1).leading_zeros()
}

// ================================================================================================
// TESTS
// ================================================================================================
