use std::fmt::Debug;
use std::ptr::NonNull;

use crate::bits::TrieKey;

/// The three possible states of an item's `parent` field.
///
/// An explicit tagged enum rather than pointer-bit tagging, since there's no portable spare
/// alignment bit to steal from a `NonNull<T>` across every target this crate might run on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Parent<T> {
    /// This item is a secondary sibling: not linked into the trie at all, just into a ring.
    Secondary,
    /// This item is the primary (in-tree) item for its key, and is parented by a root slot.
    RootSlot(u32),
    /// This item is the primary item for its key, and is parented by another primary item.
    Item(NonNull<T>),
}

impl<T> Parent<T> {
    #[inline]
    pub fn is_root_slot(&self) -> bool {
        matches!(self, Parent::RootSlot(_))
    }

    #[inline]
    pub fn is_secondary(&self) -> bool {
        matches!(self, Parent::Secondary)
    }
}

/// The index-private link fields every trie item carries.
///
/// Callers embed a `Links<T, K>` somewhere inside their own record and implement [`TrieItem`]
/// to expose it. The engine never looks at any other field of the caller's record.
#[derive(Debug)]
pub struct Links<T, K> {
    parent: Parent<T>,
    child: [Option<NonNull<T>>; 2],
    sibling: [Option<NonNull<T>>; 2],
    key: K,
}

impl<T, K: TrieKey> Links<T, K> {
    /// A freshly constructed, unlinked set of links for `key`. The sibling pointers are left
    /// `None` here and fixed up to point at `self` once the owning item has a stable address —
    /// see [`TrieItem::init`].
    pub fn new(key: K) -> Self {
        Self {
            parent: Parent::Secondary,
            child: [None, None],
            sibling: [None, None],
            key,
        }
    }
}

/// Uniform accessor over an item's link fields. Implementing this trait for your record type is
/// all a caller needs to do to use it with [`FredkinTrie`](crate::FredkinTrie).
pub trait TrieItem: Sized {
    type Key: TrieKey;

    fn links(&self) -> &Links<Self, Self::Key>;
    fn links_mut(&mut self) -> &mut Links<Self, Self::Key>;

    #[inline]
    fn key(&self) -> Self::Key {
        self.links().key
    }

    /// Must be called exactly once, after the item has its final address, before the item is
    /// handed to `insert`. Fixes up the self-referential sibling ring for a solitary item.
    ///
    /// # Safety
    /// `this` must be a valid, non-dangling, non-aliased pointer to the item.
    unsafe fn init(mut this: NonNull<Self>) {
        let self_ptr = Some(this);
        let links = this.as_mut().links_mut();
        links.sibling = [self_ptr, self_ptr];
        links.child = [None, None];
        links.parent = Parent::Secondary;
    }

    #[inline]
    fn parent(&self) -> Parent<Self> {
        self.links().parent
    }

    #[inline]
    fn set_parent(&mut self, parent: Parent<Self>) {
        self.links_mut().parent = parent;
    }

    #[inline]
    fn parent_is_root_slot(&self) -> bool {
        self.links().parent.is_root_slot()
    }

    /// Precondition: `self.parent_is_root_slot()`.
    #[inline]
    fn root_slot_bit_index(&self) -> u32 {
        match self.links().parent {
            Parent::RootSlot(i) => i,
            _ => panic!("root_slot_bit_index called on an item that is not a root-slot child"),
        }
    }

    #[inline]
    fn set_parent_root_slot(&mut self, bit_index: u32) {
        self.links_mut().parent = Parent::RootSlot(bit_index);
    }

    #[inline]
    fn is_primary(&self) -> bool {
        !self.links().parent.is_secondary()
    }

    #[inline]
    fn is_secondary(&self) -> bool {
        self.links().parent.is_secondary()
    }

    #[inline]
    fn set_secondary(&mut self) {
        self.links_mut().parent = Parent::Secondary;
    }

    #[inline]
    fn child(&self, side: usize) -> Option<NonNull<Self>> {
        self.links().child[side]
    }

    #[inline]
    fn set_child(&mut self, side: usize, child: Option<NonNull<Self>>) {
        self.links_mut().child[side] = child;
    }

    #[inline]
    fn sibling(&self, side: usize) -> Option<NonNull<Self>> {
        self.links().sibling[side]
    }

    #[inline]
    fn set_sibling(&mut self, side: usize, sibling: Option<NonNull<Self>>) {
        self.links_mut().sibling[side] = sibling;
    }
}

#[cfg(test)]
mod test {
    use crate::test_item::TestItem;
    use crate::item::{Parent, TrieItem};
    use std::ptr::NonNull;

    #[test]
    fn fresh_item_is_secondary_and_self_ringed() {
        let mut item = TestItem::new(5, 0);
        let ptr = NonNull::from(item.as_mut());
        unsafe { TestItem::init(ptr) };
        assert!(item.is_secondary());
        assert!(!item.is_primary());
        assert_eq!(item.sibling(0), Some(ptr));
        assert_eq!(item.sibling(1), Some(ptr));
        assert_eq!(item.child(0), None);
        assert_eq!(item.child(1), None);
    }

    #[test]
    fn root_slot_round_trips() {
        let mut item = TestItem::new(5, 0);
        item.set_parent_root_slot(3);
        assert!(item.parent_is_root_slot());
        assert!(item.is_primary());
        assert_eq!(item.root_slot_bit_index(), 3);
    }

    #[test]
    fn set_secondary_clears_any_parent() {
        let mut item = TestItem::new(5, 0);
        item.set_parent_root_slot(3);
        item.set_secondary();
        assert!(item.is_secondary());
        assert!(matches!(item.parent(), Parent::Secondary));
    }
}
