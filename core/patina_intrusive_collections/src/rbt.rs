//! Intrusive Collections - Red-Black balancing
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use crate::node::{Adapter, Balance, Direction, NodeRef, Root};

/// The color of a red-black node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// Red-black balancing.
///
/// The top of a tree is black, no red node has a red child, and every path from a node down to an
/// absent child crosses the same number of black nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RedBlack;

/// Color helpers that treat an absent node as black.
trait Colored {
    fn color(&self) -> Color;

    fn is_red(&self) -> bool {
        self.color() == Color::Red
    }

    fn is_black(&self) -> bool {
        self.color() == Color::Black
    }
}

impl<'a, T: 'a, A: Adapter<'a, T, Balance = RedBlack>> Colored for NodeRef<'a, T, A> {
    fn color(&self) -> Color {
        self.tag()
    }
}

impl<'a, T: 'a, A: Adapter<'a, T, Balance = RedBlack>> Colored for Option<NodeRef<'a, T, A>> {
    fn color(&self) -> Color {
        self.map_or(Color::Black, |node| node.tag())
    }
}

impl Balance for RedBlack {
    type Tag = Color;
    const LEAF: Color = Color::Red;

    /// Repairs red-red violations from a freshly linked leaf upwards.
    ///
    /// # Time Complexity
    ///
    /// O(log n), with at most two rotations.
    ///
    fn post_insert<'a, T: 'a, A: Adapter<'a, T, Balance = Self>>(item: &'a T, root: &mut Root<'a, T>) {
        let mut node = NodeRef::<T, A>::new(item);
        node.set_tag(Color::Red);

        while let Some(parent) = node.parent().filter(|parent| parent.is_red()) {
            let grandparent = parent.parent().expect("A red node is never the top of the tree.");
            node = insert_update(node, parent, grandparent, root);
        }

        if let Some(top) = root.node() {
            NodeRef::<T, A>::new(top).set_tag(Color::Black);
        }
    }

    /// Removes a record by successor splicing and repairs the black height if a black node was taken out.
    ///
    /// # Time Complexity
    ///
    /// O(log n), with at most three rotations.
    ///
    fn erase<'a, T: 'a, A: Adapter<'a, T, Balance = Self>>(item: &'a T, root: &mut Root<'a, T>) {
        let removed = NodeRef::<T, A>::new(item).splice_out(root);
        match (removed.child, removed.parent) {
            (Some(child), _) => child.set_tag(Color::Black),
            (None, Some(parent)) if removed.tag == Color::Black => erase_rebalance(parent, root),
            _ => (),
        }
    }
}

/// One step of the insert repair for a red `node` under a red `parent`. Returns the next node to inspect.
fn insert_update<'a, T: 'a, A: Adapter<'a, T, Balance = RedBlack>>(
    node: NodeRef<'a, T, A>,
    parent: NodeRef<'a, T, A>,
    grandparent: NodeRef<'a, T, A>,
    root: &mut Root<'a, T>,
) -> NodeRef<'a, T, A> {
    let side = grandparent.side_of(parent);

    if let Some(uncle) = grandparent.child(side.opposite()).filter(|uncle| uncle.is_red()) {
        parent.set_tag(Color::Black);
        uncle.set_tag(Color::Black);
        grandparent.set_tag(Color::Red);
        return grandparent;
    }

    // Turn an inner grandchild into an outer one first.
    let (node, parent) = if parent.child(side.opposite()) == Some(node) {
        parent.rotate(root, side);
        (parent, node)
    } else {
        (node, parent)
    };

    parent.set_tag(Color::Black);
    grandparent.set_tag(Color::Red);
    grandparent.rotate(root, side.opposite());
    node
}

/// Repairs a missing black node in the child slot of `parent` that lost it.
fn erase_rebalance<'a, T: 'a, A: Adapter<'a, T, Balance = RedBlack>>(parent: NodeRef<'a, T, A>, root: &mut Root<'a, T>) {
    let mut node: Option<NodeRef<'a, T, A>> = None;
    let mut parent = Some(parent);

    while let Some(current) = parent {
        if node.is_red() {
            break;
        }
        let side = if current.left() == node { Direction::Left } else { Direction::Right };
        (node, parent) = erase_update(node, current, side, root);
    }

    if let Some(node) = node {
        node.set_tag(Color::Black);
    }
}

/// One step of the delete repair. `node` sits in the `side` slot of `parent` and is one black node short.
///
/// Returns the next `(node, parent)` pair to inspect.
fn erase_update<'a, T: 'a, A: Adapter<'a, T, Balance = RedBlack>>(
    node: Option<NodeRef<'a, T, A>>,
    parent: NodeRef<'a, T, A>,
    side: Direction,
    root: &mut Root<'a, T>,
) -> (Option<NodeRef<'a, T, A>>, Option<NodeRef<'a, T, A>>) {
    let far = side.opposite();
    let mut sibling = parent.child(far).expect("A short slot always has a sibling.");

    if sibling.is_red() {
        sibling.set_tag(Color::Black);
        parent.set_tag(Color::Red);
        parent.rotate(root, side);
        sibling = parent.child(far).expect("A short slot always has a sibling.");
    }

    if sibling.child(side).is_black() && sibling.child(far).is_black() {
        sibling.set_tag(Color::Red);
        return (Some(parent), parent.parent());
    }

    if sibling.child(far).is_black() {
        if let Some(near) = sibling.child(side) {
            near.set_tag(Color::Black);
        }
        sibling.set_tag(Color::Red);
        sibling.rotate(root, far);
        sibling = parent.child(far).expect("A short slot always has a sibling.");
    }

    sibling.set_tag(parent.tag());
    parent.set_tag(Color::Black);
    if let Some(far) = sibling.child(far) {
        far.set_tag(Color::Black);
    }
    parent.rotate(root, side);

    debug_assert!(node.is_black());
    (root.node().map(NodeRef::new), None)
}
