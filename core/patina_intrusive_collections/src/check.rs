//! Intrusive Collections - Test records and structural checks
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
extern crate std;

use crate::{
    Adapter, Avl, Color, Direction, HashLink, Link, RedBlack, Root,
    hash::HashAdapter,
    node::{self, NodeRef},
};
use core::cmp::Ordering;
use std::vec::Vec;

/// A record ordered by `key` in a red-black tree.
pub struct RbItem<'a> {
    pub key: i32,
    pub link: Link<'a, RbItem<'a>, RedBlack>,
}

impl RbItem<'_> {
    pub fn many<I: IntoIterator<Item = i32>>(keys: I) -> Vec<Self> {
        keys.into_iter().map(|key| RbItem { key, link: Link::new() }).collect()
    }
}

crate::intrusive_adapter!(pub RbKey = RbItem<'a> { link: RedBlack });

pub struct AvlItem<'a> {
    pub key: i32,
    pub link: Link<'a, AvlItem<'a>, Avl>,
}

impl AvlItem<'_> {
    pub fn many<I: IntoIterator<Item = i32>>(keys: I) -> Vec<Self> {
        keys.into_iter().map(|key| AvlItem { key, link: Link::new() }).collect()
    }
}

crate::intrusive_adapter!(pub AvlKey = AvlItem<'a> { link: Avl });

/// A record stored in a hash table, keyed by a `u32`.
pub struct HashItem<'a> {
    pub key: u32,
    pub link: HashLink<'a, HashItem<'a>>,
}

impl HashItem<'_> {
    pub fn many<I: IntoIterator<Item = u32>>(keys: I) -> Vec<Self> {
        keys.into_iter().map(|key| HashItem { key, link: HashLink::new() }).collect()
    }
}

pub struct HashKey;

impl<'a> HashAdapter<'a, HashItem<'a>> for HashKey {
    type Key = u32;

    fn hash_link<'s>(item: &'s HashItem<'a>) -> &'s HashLink<'a, HashItem<'a>> {
        &item.link
    }

    fn key<'s>(item: &'s HashItem<'a>) -> &'s u32 {
        &item.key
    }
}

/// A cheap multiplicative hash, enough to spread small keys over a few buckets.
pub fn hash_u32(key: &u32) -> u64 {
    (*key as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 17
}

pub fn cmp_u32(a: &u32, b: &u32) -> Ordering {
    a.cmp(b)
}

/// Hangs `child` off `parent` without any balancing.
pub fn attach<'a, T: 'a, A: Adapter<'a, T>>(parent: &'a T, child: &'a T, direction: Direction) {
    node::link_node::<T, A>(child, Some(parent), direction, &mut Root::new());
}

/// Returns the records of the tree in order, walking with `first` and `next`.
pub fn in_order<'a, T: 'a, A: Adapter<'a, T>>(root: &Root<'a, T>) -> Vec<&'a T> {
    let mut items = Vec::new();
    let mut current = node::first::<T, A>(root);
    while let Some(item) = current {
        items.push(item);
        current = node::next::<T, A>(item);
    }
    items
}

/// Verifies every parent back reference and returns the number of records reachable from the root.
pub fn check_links<'a, T: 'a, A: Adapter<'a, T>>(root: &Root<'a, T>) -> usize {
    fn walk<'a, T: 'a, A: Adapter<'a, T>>(node: NodeRef<'a, T, A>) -> usize {
        assert!(node.is_linked());
        let mut count = 1;
        for child in [node.left(), node.right()].into_iter().flatten() {
            assert_eq!(child.parent(), Some(node));
            count += walk(child);
        }
        count
    }

    match root.node() {
        None => 0,
        Some(top) => {
            let top = NodeRef::<T, A>::new(top);
            assert!(top.parent().is_none());
            walk(top)
        }
    }
}

/// Verifies the red-black properties and returns the black height of the tree.
pub fn check_red_black<'a, T: 'a, A: Adapter<'a, T, Balance = RedBlack>>(root: &Root<'a, T>) -> usize {
    fn black_height<'a, T: 'a, A: Adapter<'a, T, Balance = RedBlack>>(node: Option<NodeRef<'a, T, A>>) -> usize {
        let Some(node) = node else {
            return 1;
        };
        if node.tag() == Color::Red {
            for child in [node.left(), node.right()].into_iter().flatten() {
                assert_eq!(child.tag(), Color::Black, "A red node has a red child.");
            }
        }
        let left = black_height(node.left());
        let right = black_height(node.right());
        assert_eq!(left, right, "Black heights differ.");
        left + (node.tag() == Color::Black) as usize
    }

    check_links::<T, A>(root);
    let top = root.node().map(NodeRef::<T, A>::new);
    if let Some(top) = top {
        assert_eq!(top.tag(), Color::Black, "The top is not black.");
    }
    black_height(top)
}

/// Verifies the stored heights and the balance of every node.
pub fn check_avl<'a, T: 'a, A: Adapter<'a, T, Balance = Avl>>(root: &Root<'a, T>) {
    fn height<'a, T: 'a, A: Adapter<'a, T, Balance = Avl>>(node: Option<NodeRef<'a, T, A>>) -> u32 {
        let Some(node) = node else {
            return 0;
        };
        let left = height(node.left());
        let right = height(node.right());
        assert!(left.abs_diff(right) <= 1, "Node is out of balance: {left} vs {right}.");
        assert_eq!(node.tag(), left.max(right) + 1, "Stored height is stale.");
        node.tag()
    }

    check_links::<T, A>(root);
    height(root.node().map(NodeRef::<T, A>::new));
}
