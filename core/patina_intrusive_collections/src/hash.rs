//! Intrusive Collections - Hash table
//!
//! A hash table chaining records through a small AVL tree per bucket. Each bucket tree is ordered by the hash
//! first and by the key comparator second, so most comparisons along a bucket are a single integer compare.
//! The non-empty buckets are threaded on a list, which is what iteration and rehashing walk.
//!
//! The table starts on [HASH_INIT_SIZE] buckets stored inline. A larger bucket buffer can be handed over with
//! [swap](HashTable::swap) at any time; every record is rehashed into it and the previous buffer is handed
//! back.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#[cfg(feature = "alloc")]
extern crate alloc;

use crate::{
    Avl, Error, Result,
    node::{self, Adapter, Balance, Direction, Link, NodeRef, Root},
};
use core::{cell::Cell, cmp::Ordering, fmt, iter::FusedIterator, marker::PhantomData, mem};

/// The number of buckets a table starts with.
pub const HASH_INIT_SIZE: usize = 8;

/// The intrusive node of a hash table: an AVL link and the hash of the record's key.
pub struct HashLink<'a, T> {
    link: Link<'a, T, Avl>,
    hash: Cell<u64>,
}

impl<T> HashLink<'_, T> {
    /// Creates an unlinked hash link.
    pub const fn new() -> Self {
        HashLink { link: Link::new(), hash: Cell::new(0) }
    }

    /// Indicates whether the record is part of a table.
    pub fn is_linked(&self) -> bool {
        self.link.is_linked()
    }

    /// Returns the hash cached when the record was added.
    pub fn hash(&self) -> u64 {
        self.hash.get()
    }
}

impl<T> Default for HashLink<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HashLink<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashLink").field("link", &self.link).field("hash", &self.hash.get()).finish()
    }
}

/// Locates the [HashLink] and the key of a record stored in a [HashTable].
pub trait HashAdapter<'a, T: 'a> {
    /// The key the table hashes and compares.
    type Key: ?Sized;

    /// Returns the hash link embedded in `item`.
    fn hash_link(item: &T) -> &HashLink<'a, T>;

    /// Returns the key of `item`.
    fn key(item: &T) -> &Self::Key;
}

/// Views the AVL link inside a [HashLink] as a plain tree link.
struct ByHash<A>(PhantomData<fn() -> A>);

impl<'a, T: 'a, A: HashAdapter<'a, T>> Adapter<'a, T> for ByHash<A> {
    type Balance = Avl;

    fn link(item: &T) -> &Link<'a, T, Avl> {
        &A::hash_link(item).link
    }
}

/// One slot of a [HashTable].
///
/// Buckets are only meaningful to the table that owns them. They are public so that callers can provide
/// bucket buffers to [swap](HashTable::swap), for instance from a `static` array.
pub struct Bucket<'a, T> {
    root: Root<'a, T>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<T> Bucket<'_, T> {
    const EMPTY: Self = Self::new();

    /// Creates an empty bucket.
    pub const fn new() -> Self {
        Bucket { root: Root::new(), prev: None, next: None }
    }

    /// Indicates whether no record hashes into the bucket.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<T> Default for Bucket<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Bucket<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket").field("empty", &self.is_empty()).field("prev", &self.prev).field("next", &self.next).finish()
    }
}

/// Where the buckets of a table live.
enum Slots<'a, 's, T> {
    Inline([Bucket<'a, T>; HASH_INIT_SIZE]),
    Borrowed(&'s mut [Bucket<'a, T>]),
    #[cfg(feature = "alloc")]
    Owned(alloc::vec::Vec<Bucket<'a, T>>),
}

impl<'a, 's, T> Slots<'a, 's, T> {
    fn buckets(&self) -> &[Bucket<'a, T>] {
        match self {
            Slots::Inline(buckets) => buckets,
            Slots::Borrowed(buckets) => &buckets[..usable(buckets.len())],
            #[cfg(feature = "alloc")]
            Slots::Owned(buckets) => buckets,
        }
    }

    fn buckets_mut(&mut self) -> &mut [Bucket<'a, T>] {
        match self {
            Slots::Inline(buckets) => buckets,
            Slots::Borrowed(buckets) => {
                let count = usable(buckets.len());
                &mut buckets[..count]
            }
            #[cfg(feature = "alloc")]
            Slots::Owned(buckets) => buckets,
        }
    }
}

/// Returns the largest power of two not above `len`.
fn usable(len: usize) -> usize {
    match len {
        0 => 0,
        len => 1 << (usize::BITS - 1 - len.leading_zeros()),
    }
}

/// The outcome of a bucket search.
enum Search<'a, T> {
    Found(&'a T),
    Vacant(Option<&'a T>, Direction),
}

/// A hash table of caller owned records.
///
/// Records are linked in through the [HashLink] that the adapter `A` selects. `hash` maps a key to a 64 bit
/// hash and `compare` orders two keys; keys comparing equal must hash equally, and neither function may
/// change its answer for a key while a record with that key is in the table. Records with equal keys are
/// duplicates and only the first one is kept.
///
/// Iteration visits the buckets in the order they became non-empty, and the records of one bucket in hash
/// order. It is not a global order over the keys.
pub struct HashTable<'a, 's, T, A, H, C> {
    slots: Slots<'a, 's, T>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    hash: H,
    compare: C,
    _adapter: PhantomData<fn() -> A>,
}

impl<'a, 's, T, A, H, C> HashTable<'a, 's, T, A, H, C>
where
    T: 'a,
    A: HashAdapter<'a, T>,
    H: Fn(&A::Key) -> u64,
    C: Fn(&A::Key, &A::Key) -> Ordering,
{
    /// Creates an empty table on [HASH_INIT_SIZE] inline buckets.
    pub const fn new(hash: H, compare: C) -> Self {
        HashTable {
            slots: Slots::Inline([Bucket::EMPTY; HASH_INIT_SIZE]),
            head: None,
            tail: None,
            len: 0,
            hash,
            compare,
            _adapter: PhantomData,
        }
    }

    /// Returns the number of records in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Indicates whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of buckets in use, always a power of two.
    pub fn bucket_count(&self) -> usize {
        self.slots.buckets().len()
    }

    fn index(&self, hash: u64) -> usize {
        hash as usize & (self.bucket_count() - 1)
    }

    fn bucket_of(&self, item: &T) -> &Bucket<'a, T> {
        &self.slots.buckets()[self.index(A::hash_link(item).hash())]
    }

    /// Returns the first record of the first non-empty bucket.
    pub fn first(&self) -> Option<&'a T> {
        self.head.and_then(|index| node::first::<T, ByHash<A>>(&self.slots.buckets()[index].root))
    }

    /// Returns the last record of the last non-empty bucket.
    pub fn last(&self) -> Option<&'a T> {
        self.tail.and_then(|index| node::last::<T, ByHash<A>>(&self.slots.buckets()[index].root))
    }

    /// Returns the record following `item`, moving on to the next non-empty bucket at the end of a bucket.
    pub fn next(&self, item: &'a T) -> Option<&'a T> {
        node::next::<T, ByHash<A>>(item).or_else(|| {
            let next = self.bucket_of(item).next?;
            node::first::<T, ByHash<A>>(&self.slots.buckets()[next].root)
        })
    }

    /// Returns the record preceding `item`, moving back to the previous non-empty bucket at the start of a
    /// bucket.
    pub fn prev(&self, item: &'a T) -> Option<&'a T> {
        node::prev::<T, ByHash<A>>(item).or_else(|| {
            let prev = self.bucket_of(item).prev?;
            node::last::<T, ByHash<A>>(&self.slots.buckets()[prev].root)
        })
    }

    /// Walks a bucket tree, comparing the hash first and the key second.
    fn search(root: &Root<'a, T>, hash: u64, key: &A::Key, compare: &C) -> Search<'a, T> {
        let mut parent = None;
        let mut direction = Direction::Left;
        let mut current = root.node();
        while let Some(item) = current {
            let order = hash.cmp(&A::hash_link(item).hash()).then_with(|| compare(key, A::key(item)));
            direction = match order {
                Ordering::Less => Direction::Left,
                Ordering::Greater => Direction::Right,
                Ordering::Equal => return Search::Found(item),
            };
            parent = Some(item);
            current = NodeRef::<T, ByHash<A>>::new(item).child(direction).map(NodeRef::get);
        }
        Search::Vacant(parent, direction)
    }

    /// Returns the record whose key equals `key`.
    ///
    /// # Time Complexity
    ///
    /// O(1) for a table with about as many buckets as records.
    ///
    pub fn find_key(&self, key: &A::Key) -> Option<&'a T> {
        let hash = (self.hash)(key);
        let bucket = &self.slots.buckets()[self.index(hash)];
        match Self::search(&bucket.root, hash, key, &self.compare) {
            Search::Found(item) => Some(item),
            Search::Vacant(..) => None,
        }
    }

    /// Returns the record whose key equals the key of `target`.
    pub fn find(&self, target: &T) -> Option<&'a T> {
        self.find_key(A::key(target))
    }

    /// Returns the record whose key equals `key`, or the last record visited while looking for it.
    ///
    /// Only the bucket `key` hashes into is searched. Without an exact match, the record returned is the one
    /// a record with `key` would be linked below, and `None` means that bucket is empty.
    pub fn nearest_key(&self, key: &A::Key) -> Option<&'a T> {
        let hash = (self.hash)(key);
        let bucket = &self.slots.buckets()[self.index(hash)];
        match Self::search(&bucket.root, hash, key, &self.compare) {
            Search::Found(item) => Some(item),
            Search::Vacant(parent, _) => parent,
        }
    }

    /// Same as [nearest_key](Self::nearest_key), with the key of `target`.
    pub fn nearest(&self, target: &T) -> Option<&'a T> {
        self.nearest_key(A::key(target))
    }

    /// Links `item` into the table.
    ///
    /// Returns the record already in the table if its key equals the key of `item`, in which case nothing is
    /// changed. `item` must not be linked into any table through the same adapter.
    ///
    pub fn add(&mut self, item: &'a T) -> Option<&'a T> {
        debug_assert!(!A::hash_link(item).is_linked(), "Adding a record that is already linked.");
        let hash = (self.hash)(A::key(item));
        self.insert(item, hash)
    }

    /// Links `item` into the table.
    ///
    /// # Errors
    ///
    /// Returns [AlreadyExists](Error::AlreadyExists) if a record with an equal key is already in the table.
    ///
    pub fn try_add(&mut self, item: &'a T) -> Result<()> {
        match self.add(item) {
            None => Ok(()),
            Some(_) => Err(Error::AlreadyExists),
        }
    }

    fn insert(&mut self, item: &'a T, hash: u64) -> Option<&'a T> {
        let index = self.index(hash);
        let bucket = &mut self.slots.buckets_mut()[index];
        let (parent, direction) = match Self::search(&bucket.root, hash, A::key(item), &self.compare) {
            Search::Found(existing) => return Some(existing),
            Search::Vacant(parent, direction) => (parent, direction),
        };

        A::hash_link(item).hash.set(hash);
        node::link_node::<T, ByHash<A>>(item, parent, direction, &mut bucket.root);
        Avl::post_insert::<T, ByHash<A>>(item, &mut bucket.root);
        if parent.is_none() {
            self.attach(index);
        }
        self.len += 1;
        None
    }

    /// Unlinks `item`, which must be part of this table.
    ///
    /// Returns `false` without doing anything if `item` is not linked.
    ///
    pub fn remove(&mut self, item: &'a T) -> bool {
        let link = A::hash_link(item);
        debug_assert!(link.is_linked(), "Removing a record that is not linked.");
        if !link.is_linked() {
            return false;
        }

        let index = self.index(link.hash());
        let bucket = &mut self.slots.buckets_mut()[index];
        Avl::erase::<T, ByHash<A>>(item, &mut bucket.root);
        if bucket.is_empty() {
            self.detach(index);
        }
        self.len -= 1;
        true
    }

    /// Puts the unlinked `new` in the exact place of `victim`, which is unlinked afterwards.
    ///
    /// `new` must have the same key as `victim`. The cached hash of `victim` is carried over.
    pub fn replace(&mut self, victim: &'a T, new: &'a T) {
        let hash = A::hash_link(victim).hash();
        debug_assert!(A::hash_link(victim).is_linked(), "Replacing a record that is not linked.");
        debug_assert!(!A::hash_link(new).is_linked(), "Replacing with a record that is already linked.");
        debug_assert_eq!((self.hash)(A::key(new)), hash, "Replacement hashes differently.");
        debug_assert_eq!((self.compare)(A::key(victim), A::key(new)), Ordering::Equal, "Replacement key differs.");

        A::hash_link(new).hash.set(hash);
        let index = self.index(hash);
        node::replace::<T, ByHash<A>>(victim, new, &mut self.slots.buckets_mut()[index].root);
    }

    /// Unlinks every record, bucket by bucket, handing each one to `destroy` once it is out of the table.
    pub fn clear<F>(&mut self, mut destroy: F)
    where
        F: FnMut(&'a T),
    {
        log::debug!("Clearing a hash table of {} records.", self.len);
        while let Some(index) = self.head {
            let bucket = &mut self.slots.buckets_mut()[index];
            while let Some(top) = bucket.root.node() {
                Avl::erase::<T, ByHash<A>>(top, &mut bucket.root);
                destroy(top);
            }
            self.detach(index);
        }
        self.len = 0;
    }

    /// Returns an iterator over the records, in bucket list order.
    pub fn iter(&self) -> Iter<'_, 'a, 's, T, A, H, C> {
        Iter { table: self, front: self.first(), back: self.last(), remaining: self.len }
    }

    /// Moves every record into a new set of buckets.
    ///
    /// With `Some(buckets)` the table switches to the largest power of two of buckets that fits in `buckets`.
    /// With `None` it goes back to its [HASH_INIT_SIZE] inline buckets, or does nothing if it already uses
    /// them. Every record is rehashed using the hash cached when it was added.
    ///
    /// Returns the buffer the table used before, if the caller provided it. The contents of the returned
    /// buffer are reset and can be reused for another swap.
    ///
    /// # Time Complexity
    ///
    /// O(n log(n / buckets))
    ///
    /// # Panics
    ///
    /// Panics if `buckets` is empty. Use [try_swap](Self::try_swap) to get an error instead.
    ///
    pub fn swap(&mut self, buckets: Option<&'s mut [Bucket<'a, T>]>) -> Option<&'s mut [Bucket<'a, T>]> {
        let slots = match buckets {
            Some(buckets) => {
                assert!(!buckets.is_empty(), "A bucket buffer must hold at least one bucket.");
                buckets.iter_mut().for_each(Bucket::reset);
                Slots::Borrowed(buckets)
            }
            None if matches!(self.slots, Slots::Inline(_)) => return None,
            None => Slots::Inline([Bucket::EMPTY; HASH_INIT_SIZE]),
        };

        match self.install(slots) {
            Slots::Borrowed(previous) => Some(previous),
            _ => None,
        }
    }

    /// Moves every record into the buckets of `buckets`, see [swap](Self::swap).
    ///
    /// # Errors
    ///
    /// Returns [BufferTooSmall](Error::BufferTooSmall) if `buckets` cannot hold a single bucket, in which case
    /// the table is left untouched.
    ///
    pub fn try_swap(&mut self, buckets: &'s mut [Bucket<'a, T>]) -> Result<Option<&'s mut [Bucket<'a, T>]>> {
        if buckets.is_empty() {
            return Err(Error::BufferTooSmall);
        }
        Ok(self.swap(Some(buckets)))
    }

    /// Moves every record into a table owned buffer of at least `bucket_hint` buckets.
    ///
    /// The bucket count is `bucket_hint` rounded up to a power of two. Returns the buffer the table used
    /// before, if the caller provided it.
    #[cfg(feature = "alloc")]
    pub fn resize(&mut self, bucket_hint: usize) -> Option<&'s mut [Bucket<'a, T>]> {
        let count = bucket_hint.max(1).next_power_of_two();
        if matches!(self.slots, Slots::Owned(_)) && count == self.bucket_count() {
            return None;
        }

        let buckets = (0..count).map(|_| Bucket::new()).collect();
        match self.install(Slots::Owned(buckets)) {
            Slots::Borrowed(previous) => Some(previous),
            _ => None,
        }
    }

    /// Installs `slots` and rehashes every record into them. Returns the previous slots, emptied.
    fn install(&mut self, slots: Slots<'a, 's, T>) -> Slots<'a, 's, T> {
        let mut previous = mem::replace(&mut self.slots, slots);
        let mut head = self.head.take();
        self.tail = None;
        let len = mem::take(&mut self.len);

        let buckets = previous.buckets_mut();
        while let Some(index) = head {
            let bucket = &mut buckets[index];
            head = bucket.next;
            while let Some(top) = bucket.root.node() {
                Avl::erase::<T, ByHash<A>>(top, &mut bucket.root);
                let rehashed = self.insert(top, A::hash_link(top).hash());
                debug_assert!(rehashed.is_none(), "Duplicate key found while rehashing.");
            }
        }
        buckets.iter_mut().for_each(Bucket::reset);

        debug_assert_eq!(self.len, len);
        log::debug!("Rehashed {} records into {} buckets.", len, self.bucket_count());
        previous
    }

    /// Appends the bucket at `index` to the bucket list.
    fn attach(&mut self, index: usize) {
        let tail = self.tail;
        let buckets = self.slots.buckets_mut();
        buckets[index].prev = tail;
        buckets[index].next = None;
        match tail {
            Some(tail) => buckets[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        log::trace!("Bucket {index} joined the bucket list.");
    }

    /// Takes the bucket at `index` off the bucket list.
    fn detach(&mut self, index: usize) {
        let buckets = self.slots.buckets_mut();
        let (prev, next) = (buckets[index].prev.take(), buckets[index].next.take());
        match prev {
            Some(prev) => buckets[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => buckets[next].prev = prev,
            None => self.tail = prev,
        }
        log::trace!("Bucket {index} left the bucket list.");
    }
}

impl<'t, 'a, 's, T, A, H, C> IntoIterator for &'t HashTable<'a, 's, T, A, H, C>
where
    T: 'a,
    A: HashAdapter<'a, T>,
    H: Fn(&A::Key) -> u64,
    C: Fn(&A::Key, &A::Key) -> Ordering,
{
    type Item = &'a T;
    type IntoIter = Iter<'t, 'a, 's, T, A, H, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, A, H, C> fmt::Debug for HashTable<'_, '_, T, A, H, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTable")
            .field("len", &self.len)
            .field("buckets", &self.slots.buckets().len())
            .field("inline", &matches!(self.slots, Slots::Inline(_)))
            .finish()
    }
}

/// An iterator over the records of a [HashTable], in bucket list order.
pub struct Iter<'t, 'a, 's, T, A, H, C> {
    table: &'t HashTable<'a, 's, T, A, H, C>,
    front: Option<&'a T>,
    back: Option<&'a T>,
    remaining: usize,
}

impl<'a, T, A, H, C> Iterator for Iter<'_, 'a, '_, T, A, H, C>
where
    T: 'a,
    A: HashAdapter<'a, T>,
    H: Fn(&A::Key) -> u64,
    C: Fn(&A::Key, &A::Key) -> Ordering,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.front?;
        self.remaining -= 1;
        self.front = self.table.next(item);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, A, H, C> DoubleEndedIterator for Iter<'_, 'a, '_, T, A, H, C>
where
    T: 'a,
    A: HashAdapter<'a, T>,
    H: Fn(&A::Key) -> u64,
    C: Fn(&A::Key, &A::Key) -> Ordering,
{
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.back?;
        self.remaining -= 1;
        self.back = self.table.prev(item);
        Some(item)
    }
}

impl<'a, T, A, H, C> ExactSizeIterator for Iter<'_, 'a, '_, T, A, H, C>
where
    T: 'a,
    A: HashAdapter<'a, T>,
    H: Fn(&A::Key) -> u64,
    C: Fn(&A::Key, &A::Key) -> Ordering,
{
}

impl<'a, T, A, H, C> FusedIterator for Iter<'_, 'a, '_, T, A, H, C>
where
    T: 'a,
    A: HashAdapter<'a, T>,
    H: Fn(&A::Key) -> u64,
    C: Fn(&A::Key, &A::Key) -> Ordering,
{
}


#[cfg(test)]
mod fuzz_tests {
    extern crate std;

    use super::*;
    use crate::check::{HashItem, HashKey, cmp_u32, hash_u32};
    use rand::{Rng, seq::SliceRandom};
    use std::{collections::HashSet, vec::Vec};

    const MAX_SIZE: usize = 0x1000;

    #[test]
    fn fuzz_add_remove_swap() {
        let mut rng = rand::thread_rng();
        let mut keys = HashSet::new();
        while keys.len() < MAX_SIZE {
            keys.insert(rng.gen_range(1..=1_000_000u32));
        }
        let mut keys: Vec<u32> = keys.into_iter().collect();
        keys.shuffle(&mut rng);

        let items = HashItem::many(keys.iter().copied());
        let mut small: [Bucket<HashItem>; 64] = [Bucket::EMPTY; 64];
        let mut large: [Bucket<HashItem>; 1024] = [Bucket::EMPTY; 1024];
        let mut small = Some(&mut small[..]);
        let mut large = Some(&mut large[..]);
        let mut table: HashTable<HashItem, HashKey, _, _> = HashTable::new(hash_u32, cmp_u32);

        let mut linked = 0;
        for round in 0..20_000 {
            let item = items.choose(&mut rng).unwrap();
            if rng.gen_bool(0.6) {
                if !item.link.is_linked() {
                    assert!(table.add(item).is_none());
                    linked += 1;
                }
            } else if item.link.is_linked() {
                assert!(table.remove(item));
                linked -= 1;
            }
            assert_eq!(table.len(), linked);

            // Cycle through the small buffer, the large buffer and the inline buckets.
            if round % 2_000 == 1_999 {
                let (returned, count) = match (round / 2_000) % 3 {
                    0 => (table.swap(small.take()), 64),
                    1 => (table.swap(large.take()), 1024),
                    _ => (table.swap(None), HASH_INIT_SIZE),
                };
                assert_eq!(table.bucket_count(), count);
                if let Some(returned) = returned {
                    match returned.len() {
                        64 => small = Some(returned),
                        _ => large = Some(returned),
                    }
                }
                assert_eq!(table.iter().count(), linked);
            }
        }

        for item in &items {
            let found = table.find_key(&item.key);
            assert_eq!(found.is_some(), item.link.is_linked());
            if let Some(found) = found {
                assert!(core::ptr::eq(found, item));
            }
        }
    }
}
