//! Intrusive Collections - Ordered tree
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
    Error, Result,
    node::{self, Adapter, Balance, Direction, NodeRef, Root},
};
use core::{cmp::Ordering, fmt, iter::FusedIterator, marker::PhantomData};

/// An ordered tree of caller owned records.
///
/// Records are linked in through the [Link](crate::Link) that the adapter `A` selects, and ordered by the
/// comparator `C`. Whether the tree is kept balanced as a red-black tree or as an AVL tree is decided by the
/// adapter's [Balance] type. The tree never allocates: every record is borrowed for `'a` and must outlive
/// the tree.
///
/// The comparator must be a strict total order for the whole life of the tree. Records comparing equal are
/// treated as duplicates, and only the first one is kept.
pub struct Tree<'a, T, A, C> {
    root: Root<'a, T>,
    len: usize,
    compare: C,
    _adapter: PhantomData<fn() -> A>,
}

impl<'a, T, A, C> Tree<'a, T, A, C>
where
    T: 'a,
    A: Adapter<'a, T>,
    C: Fn(&T, &T) -> Ordering,
{
    /// Creates an empty tree ordered by `compare`.
    pub const fn new(compare: C) -> Self {
        Tree { root: Root::new(), len: 0, compare, _adapter: PhantomData }
    }

    /// Returns the number of records in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Indicates whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Returns the number of levels in the tree.
    pub fn height(&self) -> usize {
        node::depth::<T, A>(&self.root)
    }

    /// Returns the smallest record.
    pub fn first(&self) -> Option<&'a T> {
        node::first::<T, A>(&self.root)
    }

    /// Returns the largest record.
    pub fn last(&self) -> Option<&'a T> {
        node::last::<T, A>(&self.root)
    }

    /// Returns the record following `item`, which must be part of this tree.
    pub fn next(&self, item: &'a T) -> Option<&'a T> {
        node::next::<T, A>(item)
    }

    /// Returns the record preceding `item`, which must be part of this tree.
    pub fn prev(&self, item: &'a T) -> Option<&'a T> {
        node::prev::<T, A>(item)
    }

    /// Returns the record comparing equal to `target`.
    ///
    /// # Time Complexity
    ///
    /// O(log n)
    ///
    pub fn find(&self, target: &T) -> Option<&'a T> {
        self.find_by(|item| (self.compare)(target, item))
    }

    /// Returns the record for which `f` returns [Ordering::Equal].
    ///
    /// `f` compares the key being looked for against the record it is given, the way the comparator
    /// compares a target against a record. This allows a lookup without building a target record.
    ///
    /// ```rust
    /// use patina_intrusive_collections::{intrusive_adapter, Link, RedBlack, Tree};
    ///
    /// struct Entry<'a> {
    ///     id: u32,
    ///     link: Link<'a, Entry<'a>, RedBlack>,
    /// }
    /// intrusive_adapter!(ById = Entry<'a> { link: RedBlack });
    ///
    /// let entries = [7, 3, 9].map(|id| Entry { id, link: Link::new() });
    /// let mut tree = Tree::<Entry, ById, _>::new(|a, b| a.id.cmp(&b.id));
    /// for entry in &entries {
    ///     tree.add(entry);
    /// }
    /// assert_eq!(tree.find_by(|entry| 9.cmp(&entry.id)).map(|entry| entry.id), Some(9));
    /// assert!(tree.find_by(|entry| 4.cmp(&entry.id)).is_none());
    /// ```
    pub fn find_by<F>(&self, mut f: F) -> Option<&'a T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut current = self.root.node();
        while let Some(item) = current {
            let direction = match f(item) {
                Ordering::Less => Direction::Left,
                Ordering::Greater => Direction::Right,
                Ordering::Equal => return Some(item),
            };
            current = NodeRef::<T, A>::new(item).child(direction).map(NodeRef::get);
        }
        None
    }

    /// Returns the record comparing equal to `target`, or the last record visited while looking for it.
    ///
    /// When there is no exact match, the record returned is the one `target` would have been linked below,
    /// which is one of its two in-order neighbours but not necessarily the closer one.
    pub fn nearest(&self, target: &T) -> Option<&'a T> {
        self.nearest_by(|item| (self.compare)(target, item))
    }

    /// Same as [nearest](Self::nearest), but with a key comparison like [find_by](Self::find_by).
    pub fn nearest_by<F>(&self, mut f: F) -> Option<&'a T>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut current = self.root.node();
        let mut last = None;
        while let Some(item) = current {
            last = Some(item);
            let direction = match f(item) {
                Ordering::Less => Direction::Left,
                Ordering::Greater => Direction::Right,
                Ordering::Equal => return Some(item),
            };
            current = NodeRef::<T, A>::new(item).child(direction).map(NodeRef::get);
        }
        last
    }

    /// Links `item` into the tree.
    ///
    /// Returns the record already in the tree if one compares equal to `item`, in which case nothing is
    /// changed. `item` must not be linked into any tree through the same adapter.
    ///
    /// # Time Complexity
    ///
    /// O(log n)
    ///
    pub fn add(&mut self, item: &'a T) -> Option<&'a T> {
        debug_assert!(!A::link(item).is_linked(), "Adding a record that is already linked.");

        let mut parent = None;
        let mut direction = Direction::Left;
        let mut current = self.root.node();
        while let Some(node) = current {
            direction = match (self.compare)(item, node) {
                Ordering::Less => Direction::Left,
                Ordering::Greater => Direction::Right,
                Ordering::Equal => return Some(node),
            };
            parent = Some(node);
            current = NodeRef::<T, A>::new(node).child(direction).map(NodeRef::get);
        }

        node::link_node::<T, A>(item, parent, direction, &mut self.root);
        <A::Balance as Balance>::post_insert::<T, A>(item, &mut self.root);
        self.len += 1;
        None
    }

    /// Links `item` into the tree.
    ///
    /// # Errors
    ///
    /// Returns [AlreadyExists](Error::AlreadyExists) if a record comparing equal is already in the tree.
    ///
    pub fn try_add(&mut self, item: &'a T) -> Result<()> {
        match self.add(item) {
            None => Ok(()),
            Some(_) => Err(Error::AlreadyExists),
        }
    }

    /// Unlinks `item` from the tree.
    ///
    /// Removing a record that is not linked does nothing and returns `false`. A linked `item` must belong to
    /// this tree.
    ///
    /// # Time Complexity
    ///
    /// O(log n)
    ///
    pub fn remove(&mut self, item: &'a T) -> bool {
        if !A::link(item).is_linked() {
            return false;
        }
        <A::Balance as Balance>::erase::<T, A>(item, &mut self.root);
        self.len -= 1;
        true
    }

    /// Puts the unlinked `new` in the exact place of `victim`, which is unlinked afterwards.
    ///
    /// No search is made, so `new` must compare equal to `victim`.
    ///
    /// # Time Complexity
    ///
    /// O(1)
    ///
    pub fn replace(&mut self, victim: &'a T, new: &'a T) {
        debug_assert!(A::link(victim).is_linked(), "Replacing a record that is not linked.");
        debug_assert!(!A::link(new).is_linked(), "Replacing with a record that is already linked.");
        debug_assert_eq!((self.compare)(victim, new), Ordering::Equal, "Replacement does not compare equal.");
        node::replace::<T, A>(victim, new, &mut self.root);
    }

    /// Unlinks every record, handing each one to `destroy` once it is out of the tree.
    pub fn clear<F>(&mut self, mut destroy: F)
    where
        F: FnMut(&'a T),
    {
        log::debug!("Clearing a tree of {} records.", self.len);
        while let Some(top) = self.root.node() {
            <A::Balance as Balance>::erase::<T, A>(top, &mut self.root);
            destroy(top);
        }
        self.len = 0;
    }

    /// Returns an iterator over the records in order.
    pub fn iter(&self) -> Iter<'_, 'a, T, A> {
        Iter { front: self.first(), back: self.last(), remaining: self.len, _tree: PhantomData }
    }

    /// Collects the records in order.
    #[cfg(feature = "alloc")]
    pub fn to_vec(&self) -> alloc::vec::Vec<&'a T> {
        self.iter().collect()
    }
}

impl<'t, 'a, T, A, C> IntoIterator for &'t Tree<'a, T, A, C>
where
    T: 'a,
    A: Adapter<'a, T>,
    C: Fn(&T, &T) -> Ordering,
{
    type Item = &'a T;
    type IntoIter = Iter<'t, 'a, T, A>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, A, C> fmt::Debug for Tree<'_, T, A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree").field("len", &self.len).field("empty", &self.root.is_empty()).finish()
    }
}

/// An in-order iterator over the records of a [Tree].
pub struct Iter<'t, 'a, T, A> {
    front: Option<&'a T>,
    back: Option<&'a T>,
    remaining: usize,
    _tree: PhantomData<(&'t Root<'a, T>, fn() -> A)>,
}

impl<'a, T: 'a, A: Adapter<'a, T>> Iterator for Iter<'_, 'a, T, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.front?;
        self.remaining -= 1;
        self.front = node::next::<T, A>(item);
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: 'a, A: Adapter<'a, T>> DoubleEndedIterator for Iter<'_, 'a, T, A> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.back?;
        self.remaining -= 1;
        self.back = node::prev::<T, A>(item);
        Some(item)
    }
}

impl<'a, T: 'a, A: Adapter<'a, T>> ExactSizeIterator for Iter<'_, 'a, T, A> {}

impl<'a, T: 'a, A: Adapter<'a, T>> FusedIterator for Iter<'_, 'a, T, A> {}
