//! Intrusive Collections - Links, Roots and the shared node algebra
//!
//! A [Link] is embedded in a caller owned record. Links point at the enclosing records directly, and an
//! [Adapter] tells the algebra where a record keeps the link it should use, so one record can live in
//! several trees at once. Nothing in this module ever looks at the record itself.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use core::{cell::Cell, cmp::max, fmt, marker::PhantomData, ptr};

/// A balancing strategy for the trees built from [Link]s.
///
/// The strategy owns the meaning of the tag stored in every link, so a red-black link and an AVL link
/// are different types and can never be handed to the wrong engine.
pub trait Balance: Sized + 'static {
    /// The per-node bookkeeping value, a color or a height.
    type Tag: Copy + PartialEq + fmt::Debug;

    /// The tag given to a freshly linked leaf.
    const LEAF: Self::Tag;

    /// Restores the tree invariants after `item` was linked in as a leaf.
    fn post_insert<'a, T: 'a, A: Adapter<'a, T, Balance = Self>>(item: &'a T, root: &mut Root<'a, T>);

    /// Removes `item` from the tree and restores the tree invariants. `item` is unlinked afterwards.
    fn erase<'a, T: 'a, A: Adapter<'a, T, Balance = Self>>(item: &'a T, root: &mut Root<'a, T>);
}

/// Locates the [Link] a record uses for one particular tree.
pub trait Adapter<'a, T: 'a> {
    /// The balancing strategy of the trees this adapter links records into.
    type Balance: Balance;

    /// Returns the link embedded in `item`.
    fn link(item: &T) -> &Link<'a, T, Self::Balance>;
}

/// Generates a unit struct implementing [Adapter] for a record with a single lifetime parameter.
///
/// ```rust
/// use patina_intrusive_collections::{intrusive_adapter, Avl, Link};
///
/// struct Region<'a> {
///     base: u64,
///     link: Link<'a, Region<'a>, Avl>,
/// }
///
/// intrusive_adapter!(pub ByBase = Region<'a> { link: Avl });
/// ```
#[macro_export]
macro_rules! intrusive_adapter {
    ($vis:vis $name:ident = $item:ident<$lt:lifetime> { $field:ident: $balance:ty }) => {
        #[derive(Debug, Default, Clone, Copy)]
        $vis struct $name;

        impl<$lt> $crate::Adapter<$lt, $item<$lt>> for $name {
            type Balance = $balance;

            fn link<'s>(item: &'s $item<$lt>) -> &'s $crate::Link<$lt, $item<$lt>, $balance> {
                &item.$field
            }
        }
    };
}

/// The side of a node a child hangs off, or the way a node moves during a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left = 0,
    Right = 1,
}

impl Direction {
    /// Returns the other side.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Where a link is attached.
enum Parent<'a, T> {
    /// Not part of any tree.
    Unlinked,
    /// The structural root of a tree.
    Top,
    /// A child of the given record.
    Node(&'a T),
}

impl<T> Clone for Parent<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Parent<'_, T> {}

/// The intrusive node of every tree in this crate.
///
/// Embed one per tree the record should be part of. A link starts out unlinked and returns to that
/// state whenever its record is removed from a tree.
pub struct Link<'a, T, B: Balance> {
    child: [Cell<Option<&'a T>>; 2],
    parent: Cell<Parent<'a, T>>,
    tag: Cell<B::Tag>,
}

impl<'a, T, B: Balance> Link<'a, T, B> {
    /// Creates an unlinked link.
    pub const fn new() -> Self {
        Link { child: [Cell::new(None), Cell::new(None)], parent: Cell::new(Parent::Unlinked), tag: Cell::new(B::LEAF) }
    }

    /// Indicates whether the link is currently part of a tree.
    pub fn is_linked(&self) -> bool {
        !matches!(self.parent.get(), Parent::Unlinked)
    }

    /// Returns the balancing tag, a color or a height depending on `B`.
    pub fn tag(&self) -> B::Tag {
        self.tag.get()
    }
}

impl<T, B: Balance> Default for Link<'_, T, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, B: Balance> fmt::Debug for Link<'_, T, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = match self.parent.get() {
            Parent::Unlinked => "unlinked",
            Parent::Top => "top",
            Parent::Node(_) => "child",
        };
        f.debug_struct("Link")
            .field("parent", &parent)
            .field("left", &self.child[0].get().is_some())
            .field("right", &self.child[1].get().is_some())
            .field("tag", &self.tag.get())
            .finish()
    }
}

/// The entry point of one tree: a reference to its top record, absent when the tree is empty.
pub struct Root<'a, T> {
    node: Option<&'a T>,
}

impl<'a, T> Root<'a, T> {
    /// Creates an empty root.
    pub const fn new() -> Self {
        Root { node: None }
    }

    /// Returns the top record of the tree.
    pub fn node(&self) -> Option<&'a T> {
        self.node
    }

    /// Indicates whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }
}

impl<T> Default for Root<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Root<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root").field("empty", &self.is_empty()).finish()
    }
}

/// The slot a physically removed record left behind.
pub(crate) struct Removed<'a, T: 'a, A: Adapter<'a, T>> {
    /// The record now occupying the slot, if any.
    pub child: Option<NodeRef<'a, T, A>>,
    /// The parent of the slot, absent when the slot is the top.
    pub parent: Option<NodeRef<'a, T, A>>,
    /// The tag of the record that was physically taken out of the slot.
    pub tag: Tag<'a, T, A>,
}

pub(crate) type Tag<'a, T, A> = <<A as Adapter<'a, T>>::Balance as Balance>::Tag;

/// A record viewed through one of its links.
pub(crate) struct NodeRef<'a, T, A> {
    item: &'a T,
    _adapter: PhantomData<fn() -> A>,
}

impl<T, A> Clone for NodeRef<'_, T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A> Copy for NodeRef<'_, T, A> {}

impl<T, A> fmt::Debug for NodeRef<'_, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&(self.item as *const T)).finish()
    }
}

impl<T, A> PartialEq for NodeRef<'_, T, A> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.item, other.item)
    }
}

impl<'a, T: 'a, A: Adapter<'a, T>> NodeRef<'a, T, A> {
    pub fn new(item: &'a T) -> Self {
        NodeRef { item, _adapter: PhantomData }
    }

    pub fn get(self) -> &'a T {
        self.item
    }

    fn link(self) -> &'a Link<'a, T, A::Balance> {
        A::link(self.item)
    }

    pub fn child(self, direction: Direction) -> Option<Self> {
        self.link().child[direction as usize].get().map(Self::new)
    }

    pub fn set_child(self, direction: Direction, node: Option<Self>) {
        self.link().child[direction as usize].set(node.map(Self::get));
    }

    pub fn left(self) -> Option<Self> {
        self.child(Direction::Left)
    }

    pub fn right(self) -> Option<Self> {
        self.child(Direction::Right)
    }

    pub fn parent(self) -> Option<Self> {
        match self.link().parent.get() {
            Parent::Node(parent) => Some(Self::new(parent)),
            Parent::Top | Parent::Unlinked => None,
        }
    }

    /// Sets the parent, `None` marks the node as the top of its tree.
    pub fn set_parent(self, parent: Option<Self>) {
        self.link().parent.set(match parent {
            Some(parent) => Parent::Node(parent.item),
            None => Parent::Top,
        });
    }

    pub fn is_linked(self) -> bool {
        self.link().is_linked()
    }

    /// Marks the node as not part of any tree.
    pub fn unlink(self) {
        let link = self.link();
        link.child[0].set(None);
        link.child[1].set(None);
        link.parent.set(Parent::Unlinked);
    }

    pub fn tag(self) -> Tag<'a, T, A> {
        self.link().tag.get()
    }

    pub fn set_tag(self, tag: Tag<'a, T, A>) {
        self.link().tag.set(tag);
    }

    /// Returns the side of `self` that `child` hangs off.
    pub fn side_of(self, child: Self) -> Direction {
        if self.right() == Some(child) { Direction::Right } else { Direction::Left }
    }

    pub fn sibling(self) -> Option<Self> {
        let parent = self.parent()?;
        parent.child(parent.side_of(self).opposite())
    }

    /// Follows `direction` from the node down to the end of the chain.
    pub fn extreme(self, direction: Direction) -> Self {
        let mut node = self;
        while let Some(child) = node.child(direction) {
            node = child;
        }
        node
    }

    /// Returns the in-order neighbour of the node on the `direction` side.
    pub fn walk(self, direction: Direction) -> Option<Self> {
        if let Some(child) = self.child(direction) {
            return Some(child.extreme(direction.opposite()));
        }

        let mut last = self;
        while let Some(parent) = last.parent() {
            if parent.child(direction.opposite()) == Some(last) {
                return Some(parent);
            }
            last = parent;
        }
        None
    }

    /// Points whatever referenced `old` (its parent or the root) at `new`.
    pub fn replace_child(root: &mut Root<'a, T>, parent: Option<Self>, old: Self, new: Option<Self>) {
        match parent {
            Some(parent) => parent.set_child(parent.side_of(old), new),
            None => root.node = new.map(Self::get),
        }
    }

    /// Rotates the node towards `direction`, promoting its child on the opposite side into its position.
    ///
    /// Returns the promoted child, which is the new root of the subtree.
    pub fn rotate(self, root: &mut Root<'a, T>, direction: Direction) -> Self {
        let opposite = direction.opposite();
        let pivot = self.child(opposite).expect("Rotation requires a child on the promoted side.");
        let parent = self.parent();

        let inner = pivot.child(direction);
        self.set_child(opposite, inner);
        if let Some(inner) = inner {
            inner.set_parent(Some(self));
        }

        pivot.set_child(direction, Some(self));
        pivot.set_parent(parent);
        Self::replace_child(root, parent, self, Some(pivot));
        self.set_parent(Some(pivot));
        pivot
    }

    /// Attaches the node as the `direction` child of `parent`, or as the top when `parent` is absent.
    pub fn link_under(self, parent: Option<Self>, direction: Direction, root: &mut Root<'a, T>) {
        self.set_child(Direction::Left, None);
        self.set_child(Direction::Right, None);
        self.set_tag(<A::Balance as Balance>::LEAF);
        match parent {
            Some(parent) => parent.set_child(direction, Some(self)),
            None => root.node = Some(self.item),
        }
        self.set_parent(parent);
    }

    /// Puts `new` in the exact position of the node, which ends up unlinked.
    pub fn replace_with(self, new: Self, root: &mut Root<'a, T>) {
        let parent = self.parent();
        Self::replace_child(root, parent, self, Some(new));
        for direction in [Direction::Left, Direction::Right] {
            let child = self.child(direction);
            if let Some(child) = child {
                child.set_parent(Some(new));
            }
            new.set_child(direction, child);
        }
        new.set_parent(parent);
        new.set_tag(self.tag());
        self.unlink();
    }

    /// Physically takes the node out of the tree.
    ///
    /// A node with two children is replaced by its in-order successor, which inherits the node's tag; the
    /// slot the successor vacated is then the one reported back. The node is unlinked afterwards.
    pub fn splice_out(self, root: &mut Root<'a, T>) -> Removed<'a, T, A> {
        let removed = match (self.left(), self.right()) {
            (Some(left), Some(right)) => {
                let successor = right.extreme(Direction::Left);
                let child = successor.right();
                let mut parent = successor.parent();
                let tag = successor.tag();

                if let Some(child) = child {
                    child.set_parent(parent);
                }
                Self::replace_child(root, parent, successor, child);
                if parent == Some(self) {
                    parent = Some(successor);
                }

                // `self.right()` is re-read: it is `child` when the successor was the right child.
                successor.set_child(Direction::Left, Some(left));
                successor.set_child(Direction::Right, self.right());
                successor.set_parent(self.parent());
                successor.set_tag(self.tag());
                Self::replace_child(root, self.parent(), self, Some(successor));
                left.set_parent(Some(successor));
                if let Some(right) = self.right() {
                    right.set_parent(Some(successor));
                }

                Removed { child, parent, tag }
            }
            (left, right) => {
                let child = left.or(right);
                let parent = self.parent();
                Self::replace_child(root, parent, self, child);
                if let Some(child) = child {
                    child.set_parent(parent);
                }
                Removed { child, parent, tag: self.tag() }
            }
        };
        self.unlink();
        removed
    }
}

/// Returns the smallest record of the tree.
pub fn first<'a, T: 'a, A: Adapter<'a, T>>(root: &Root<'a, T>) -> Option<&'a T> {
    root.node().map(|top| NodeRef::<T, A>::new(top).extreme(Direction::Left).get())
}

/// Returns the largest record of the tree.
pub fn last<'a, T: 'a, A: Adapter<'a, T>>(root: &Root<'a, T>) -> Option<&'a T> {
    root.node().map(|top| NodeRef::<T, A>::new(top).extreme(Direction::Right).get())
}

/// Returns the in-order successor of `item`.
pub fn next<'a, T: 'a, A: Adapter<'a, T>>(item: &'a T) -> Option<&'a T> {
    NodeRef::<T, A>::new(item).walk(Direction::Right).map(NodeRef::get)
}

/// Returns the in-order predecessor of `item`.
pub fn prev<'a, T: 'a, A: Adapter<'a, T>>(item: &'a T) -> Option<&'a T> {
    NodeRef::<T, A>::new(item).walk(Direction::Left).map(NodeRef::get)
}

/// Rotates `item` towards `direction`, promoting its child on the other side. The in-order sequence of the
/// tree is unchanged.
///
/// Returns the promoted record.
///
/// # Panics
///
/// Panics if `item` has no child on the side opposite to `direction`.
pub fn rotate<'a, T: 'a, A: Adapter<'a, T>>(item: &'a T, root: &mut Root<'a, T>, direction: Direction) -> &'a T {
    NodeRef::<T, A>::new(item).rotate(root, direction).get()
}

/// Links an unlinked `item` in as the `direction` child of `parent`, or as the top of an empty tree when
/// `parent` is `None`. The caller is expected to run the balancing engine's `post_insert` next.
pub fn link_node<'a, T: 'a, A: Adapter<'a, T>>(
    item: &'a T,
    parent: Option<&'a T>,
    direction: Direction,
    root: &mut Root<'a, T>,
) {
    debug_assert!(!A::link(item).is_linked(), "Linking a record that is already part of a tree.");
    NodeRef::<T, A>::new(item).link_under(parent.map(NodeRef::new), direction, root);
}

/// Splices `new` into the exact position of `victim`, copying its children, parent and tag. `victim` is
/// unlinked afterwards. No comparison is made, so `new` must sort exactly where `victim` did.
pub fn replace<'a, T: 'a, A: Adapter<'a, T>>(victim: &'a T, new: &'a T, root: &mut Root<'a, T>) {
    debug_assert!(!ptr::eq(victim, new), "Replacing a record with itself.");
    NodeRef::<T, A>::new(victim).replace_with(NodeRef::new(new), root);
}

/// Indicates whether `item` is part of a tree through the link `A` selects.
pub fn is_linked<'a, T: 'a, A: Adapter<'a, T>>(item: &'a T) -> bool {
    NodeRef::<T, A>::new(item).is_linked()
}

/// Marks `item` as not part of any tree.
///
/// The tree `item` may be in is not touched, so this is only sound for records of a tree that is being
/// dropped as a whole, where the root is discarded too.
pub fn unlink<'a, T: 'a, A: Adapter<'a, T>>(item: &'a T) {
    NodeRef::<T, A>::new(item).unlink();
}

/// Returns the other child of the parent of `item`.
pub fn sibling<'a, T: 'a, A: Adapter<'a, T>>(item: &'a T) -> Option<&'a T> {
    NodeRef::<T, A>::new(item).sibling().map(NodeRef::get)
}

/// Returns the number of levels of the tree.
pub fn depth<'a, T: 'a, A: Adapter<'a, T>>(root: &Root<'a, T>) -> usize {
    fn level<'a, T: 'a, A: Adapter<'a, T>>(node: Option<NodeRef<'a, T, A>>) -> usize {
        match node {
            None => 0,
            Some(node) => max(level(node.left()), level(node.right())) + 1,
        }
    }
    level(root.node().map(NodeRef::<T, A>::new))
}
