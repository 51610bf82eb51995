//! A library of intrusive, `no_std` and `no_alloc` collections: a [red-black](RedBlack) or [AVL](Avl)
//! balanced [Tree], and a [HashTable] that chains records through small AVL trees.
//!
//! Intrusive means the bookkeeping lives inside the caller's own records. A record embeds one [Link] (or
//! [HashLink]) per collection it should be part of, and an [Adapter] tells a collection which link to use.
//! The collections never allocate or free anything; they borrow the records for a lifetime `'a` and only
//! ever rewrite the links. This makes them usable before any allocator exists, with records living in
//! `static`s, on the stack or in an arena.
//!
//! Links use [Cell](core::cell::Cell) for their fields, so records linked into a collection are not `Sync`.
//! Sharing a collection across execution contexts requires a lock around the whole collection.
//!
//! An `alloc` feature is available for the crate which adds [Tree::to_vec] and [HashTable::resize], the
//! latter letting the table own its bucket buffer. The core functionality does not need it.
//!
//! ## Benchmarks
//!
//! There are currently some benchmarks available in the `benches` directory. These benchmarks
//! test the performance of the collections with 4096 entries of 32bit, 128bit, and 384bit
//! key sizes respectively. The tests are as follows:
//!
//! - Insertion: Time to link every record into the collection.
//! - Search: Time it takes to search for every record in the collection once.
//! - Delete: Time it takes to unlink every record from the collection.
//!
//! ## Examples
//!
//! ```rust
//! use patina_intrusive_collections::{
//!     intrusive_adapter, Avl, HashAdapter, HashLink, HashTable, Link, RedBlack, Tree,
//! };
//!
//! struct Handle<'a> {
//!     id: u32,
//!     priority: u8,
//!     by_priority: Link<'a, Handle<'a>, RedBlack>,
//!     by_id_order: Link<'a, Handle<'a>, Avl>,
//!     by_id: HashLink<'a, Handle<'a>>,
//! }
//!
//! intrusive_adapter!(ByPriority = Handle<'a> { by_priority: RedBlack });
//! intrusive_adapter!(ByIdOrder = Handle<'a> { by_id_order: Avl });
//!
//! struct ById;
//!
//! impl<'a> HashAdapter<'a, Handle<'a>> for ById {
//!     type Key = u32;
//!
//!     fn hash_link<'s>(item: &'s Handle<'a>) -> &'s HashLink<'a, Handle<'a>> {
//!         &item.by_id
//!     }
//!
//!     fn key<'s>(item: &'s Handle<'a>) -> &'s u32 {
//!         &item.id
//!     }
//! }
//!
//! let handles = [(3, 20), (1, 10), (2, 30)].map(|(id, priority)| Handle {
//!     id,
//!     priority,
//!     by_priority: Link::new(),
//!     by_id_order: Link::new(),
//!     by_id: HashLink::new(),
//! });
//!
//! let mut by_priority = Tree::<Handle, ByPriority, _>::new(|a, b| a.priority.cmp(&b.priority));
//! let mut by_id_order = Tree::<Handle, ByIdOrder, _>::new(|a, b| a.id.cmp(&b.id));
//! let mut by_id = HashTable::<Handle, ById, _, _>::new(|id: &u32| *id as u64, |a: &u32, b: &u32| a.cmp(b));
//!
//! for handle in &handles {
//!     assert!(by_priority.add(handle).is_none());
//!     assert!(by_id_order.add(handle).is_none());
//!     assert!(by_id.add(handle).is_none());
//! }
//!
//! assert_eq!(by_priority.first().map(|handle| handle.id), Some(1));
//! assert_eq!(by_id_order.iter().map(|handle| handle.priority).collect::<Vec<_>>(), [10, 30, 20]);
//! assert_eq!(by_id.find_key(&2).map(|handle| handle.priority), Some(30));
//!
//! by_priority.remove(&handles[2]);
//! assert!(by_id.find_key(&2).is_some());
//! ```
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#![no_std]
mod avl;
pub mod hash;
pub mod node;
mod rbt;
pub mod tree;

#[cfg(test)]
mod check;

pub use avl::Avl;
pub use hash::{Bucket, HASH_INIT_SIZE, HashAdapter, HashLink, HashTable};
pub use node::{Adapter, Balance, Direction, Link, Root};
pub use rbt::{Color, RedBlack};
pub use tree::Tree;

/// Public result type for the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Public error types for the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A record comparing equal is already in the collection.
    AlreadyExists,
    /// The bucket buffer cannot hold a single bucket.
    BufferTooSmall,
}
