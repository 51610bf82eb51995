//! Intrusive Collections - AVL balancing
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use crate::node::{Adapter, Balance, Direction, NodeRef, Root};
use core::cmp::max;

/// AVL balancing.
///
/// Every link stores the height of its subtree, a leaf being 1 high. The heights of the two children of
/// any node differ by at most one.
#[derive(Debug, Default, Clone, Copy)]
pub struct Avl;

impl Balance for Avl {
    type Tag = u32;
    const LEAF: u32 = 1;

    fn post_insert<'a, T: 'a, A: Adapter<'a, T, Balance = Self>>(item: &'a T, root: &mut Root<'a, T>) {
        let node = NodeRef::<T, A>::new(item);
        node.set_tag(Self::LEAF);
        if let Some(parent) = node.parent() {
            rebalance(parent, root);
        }
    }

    fn erase<'a, T: 'a, A: Adapter<'a, T, Balance = Self>>(item: &'a T, root: &mut Root<'a, T>) {
        let removed = NodeRef::<T, A>::new(item).splice_out(root);
        if let Some(parent) = removed.parent {
            rebalance(parent, root);
        }
    }
}

fn height<'a, T: 'a, A: Adapter<'a, T, Balance = Avl>>(node: Option<NodeRef<'a, T, A>>) -> u32 {
    node.map_or(0, |node| node.tag())
}

/// Recomputes the stored height of `node` from its children.
fn update<'a, T: 'a, A: Adapter<'a, T, Balance = Avl>>(node: NodeRef<'a, T, A>) {
    node.set_tag(max(height(node.left()), height(node.right())) + 1);
}

fn balance_factor<'a, T: 'a, A: Adapter<'a, T, Balance = Avl>>(node: NodeRef<'a, T, A>) -> i64 {
    height(node.left()) as i64 - height(node.right()) as i64
}

/// Rebalances `node`, whose `heavy` subtree is two levels taller than the other one.
///
/// Returns the record that took the place of `node`.
fn fix<'a, T: 'a, A: Adapter<'a, T, Balance = Avl>>(
    node: NodeRef<'a, T, A>,
    heavy: Direction,
    root: &mut Root<'a, T>,
) -> NodeRef<'a, T, A> {
    let child = node.child(heavy).expect("The heavy side of an unbalanced node is never empty.");

    // A child leaning the other way needs a double rotation.
    if height(child.child(heavy.opposite())) > height(child.child(heavy)) {
        child.rotate(root, heavy);
        update(child);
    }

    let top = node.rotate(root, heavy.opposite());
    update(node);
    update(top);
    top
}

/// Walks from `start` to the top, restoring heights and balance.
///
/// The walk stops at the first node whose height did not change, as nothing above it can have changed.
fn rebalance<'a, T: 'a, A: Adapter<'a, T, Balance = Avl>>(start: NodeRef<'a, T, A>, root: &mut Root<'a, T>) {
    let mut current = Some(start);
    while let Some(node) = current {
        let old = node.tag();
        let factor = balance_factor(node);

        let top = if factor > 1 {
            fix(node, Direction::Left, root)
        } else if factor < -1 {
            fix(node, Direction::Right, root)
        } else {
            update(node);
            node
        };

        if top.tag() == old {
            break;
        }
        current = top.parent();
    }
}
