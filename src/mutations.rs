//! Insert and remove internals for [`FredkinTrie`](crate::FredkinTrie): the low-level splice and
//! detach logic that maintains the trie's link invariants, kept separate from the public
//! tree-walking surface in `trie.rs`.

use std::ptr::NonNull;

use crate::bits::{highest_set_bit, TrieKey};
use crate::head::HeadAccessor;
use crate::item::{Parent, TrieItem};
use crate::trie::FredkinTrie;

/// Where `walk` landed while looking for `key`.
pub(crate) enum Walk<T> {
    /// An item with the searched-for key already exists in the tree.
    Found(NonNull<T>),
    /// The root slot for this key's top bit is empty.
    EmptySlot(u32),
    /// No item with this exact key; it would be linked as `parent`'s `side` child.
    Missing { parent: NonNull<T>, side: usize },
}

impl<T: TrieItem, const SLOTS: usize> FredkinTrie<T, SLOTS> {
    /// Walks from the root slot for `key` down to either an exact match or the empty slot where
    /// a new item with this key would be linked.
    pub(crate) fn walk(&self, key: T::Key) -> Walk<T> {
        let i = highest_set_bit(key);
        let Some(mut node) = self.head.child(i) else {
            return Walk::EmptySlot(i);
        };
        let mut bit_pos = i;
        loop {
            unsafe {
                if node.as_ref().key() == key {
                    return Walk::Found(node);
                }
                // Two distinct keys sharing the same highest set bit must still have at least
                // one lower bit in common-or-differing; bit_pos never underflows because a key
                // occupying slot 0 is always exactly 0, and that's caught by the equality check
                // above before we get here.
                debug_assert!(i > 0, "two distinct keys cannot share highest bit 0");
                bit_pos -= 1;
                let side = key.bit(bit_pos) as usize;
                match node.as_ref().child(side) {
                    Some(next) => node = next,
                    None => return Walk::Missing { parent: node, side },
                }
            }
        }
    }

    /// Inserts `item` into the trie. `item` must not already be linked into
    /// any index. Returns `false` (without mutating `item`'s key) only when the index is full.
    ///
    /// # Safety
    /// `item` must point to a valid, uniquely-owned `T` that will remain at this address,
    /// untouched by anything else, for as long as it stays linked into this trie (i.e. until a
    /// matching `remove` call). This is the same contract every intrusive collection built on
    /// raw pointers carries.
    pub unsafe fn insert(&mut self, item: NonNull<T>) -> bool {
        if self.head.size() >= self.head.max_size() {
            return false;
        }
        T::init(item);
        let key = item.as_ref().key();
        match self.walk(key) {
            Walk::Found(node) => self.splice_secondary(node, item),
            Walk::EmptySlot(i) => {
                let mut r = item;
                r.as_mut().set_parent_root_slot(i);
                self.head.set_child(i, Some(item));
            }
            Walk::Missing { mut parent, side } => {
                let mut r = item;
                r.as_mut().set_parent(Parent::Item(parent));
                parent.as_mut().set_child(side, Some(item));
            }
        }
        self.head.incr_size();
        true
    }

    /// Links `item` into `node`'s sibling ring as a secondary, immediately after `node`. `item`
    /// must already be self-ring-initialized by `T::init`.
    unsafe fn splice_secondary(&mut self, node: NonNull<T>, mut item: NonNull<T>) {
        let mut node = node;
        let mut succ = node.as_ref().sibling(1).expect("ring must be non-empty");
        item.as_mut().set_sibling(0, Some(node));
        item.as_mut().set_sibling(1, Some(succ));
        node.as_mut().set_sibling(1, Some(item));
        succ.as_mut().set_sibling(0, Some(item));
        item.as_mut().set_secondary();
    }

    /// Unlinks `r` from its sibling ring, leaving the remaining ring (if any) doubly-consistent.
    /// Does not touch `r`'s own `parent`/`child` fields.
    unsafe fn unlink_ring(&mut self, r: NonNull<T>) {
        let mut prev = r.as_ref().sibling(0).expect("ring is always non-empty");
        let mut next = r.as_ref().sibling(1).expect("ring is always non-empty");
        prev.as_mut().set_sibling(1, Some(next));
        next.as_mut().set_sibling(0, Some(prev));
    }

    /// Reparents `r`'s current tree slot (its parent's
    /// child slot, or its root slot) is overwritten with `to`. If `to` is `Some`, it's marked
    /// primary at that slot. Does not touch `r` itself.
    unsafe fn reparent_slot(&mut self, r: NonNull<T>, to: Option<NonNull<T>>) {
        match r.as_ref().parent() {
            Parent::RootSlot(bit) => {
                self.head.set_child(bit, to);
                if let Some(mut t) = to {
                    t.as_mut().set_parent_root_slot(bit);
                }
            }
            Parent::Item(mut parent) => {
                let side = if parent.as_ref().child(0) == Some(r) { 0 } else { 1 };
                parent.as_mut().set_child(side, to);
                if let Some(mut t) = to {
                    t.as_mut().set_parent(Parent::Item(parent));
                }
            }
            Parent::Secondary => panic!("reparent_slot called on a non-primary item"),
        }
    }

    /// Removes `r` from the index. `r` must currently be linked into this
    /// trie (as a primary or a secondary). Always succeeds.
    ///
    /// # Safety
    /// `r` must point to an item that is currently indexed by this trie, and it must not be
    /// aliased elsewhere for the duration of the call.
    pub unsafe fn remove(&mut self, r: NonNull<T>) {
        if r.as_ref().is_secondary() {
            self.unlink_ring(r);
            self.head.decr_size();
            return;
        }

        let ring_next = r.as_ref().sibling(1).expect("ring is always non-empty");
        if ring_next != r {
            // Step 3: a sibling takes over r's position in the tree.
            let s = ring_next;
            let (c0, c1) = (r.as_ref().child(0), r.as_ref().child(1));
            self.unlink_ring(r);
            self.reparent_slot(r, Some(s));
            self.adopt_children(s, c0, c1);
            self.head.decr_size();
            return;
        }

        let (c0, c1) = (r.as_ref().child(0), r.as_ref().child(1));
        if c0.is_none() && c1.is_none() {
            // Step 4: r is a plain leaf.
            self.reparent_slot(r, None);
            self.head.decr_size();
            return;
        }

        // Step 5: promote a grandchild with no further descendants.
        let dir = self.head.preferred_dir();
        let mut p = match dir {
            0 => c0.or(c1),
            _ => c1.or(c0),
        }
        .expect("r has at least one child here");
        loop {
            let next = match dir {
                0 => p.as_ref().child(0).or_else(|| p.as_ref().child(1)),
                _ => p.as_ref().child(1).or_else(|| p.as_ref().child(0)),
            };
            match next {
                Some(n) => p = n,
                None => break,
            }
        }

        self.reparent_slot(p, None);
        let new_c0 = if c0 == Some(p) { None } else { c0 };
        let new_c1 = if c1 == Some(p) { None } else { c1 };
        self.adopt_children(p, new_c0, new_c1);
        self.reparent_slot(r, Some(p));
        self.head.decr_size();
    }

    /// Sets `parent`'s children to `(c0, c1)`, fixing up their `parent` links. Used when a
    /// replacement item (a sibling or a promoted grandchild) takes over a removed item's
    /// children.
    unsafe fn adopt_children(&mut self, mut parent: NonNull<T>, c0: Option<NonNull<T>>, c1: Option<NonNull<T>>) {
        parent.as_mut().set_child(0, c0);
        if let Some(mut c) = c0 {
            c.as_mut().set_parent(Parent::Item(parent));
        }
        parent.as_mut().set_child(1, c1);
        if let Some(mut c) = c1 {
            c.as_mut().set_parent(Parent::Item(parent));
        }
    }
}

#[cfg(test)]
mod test {
    use std::ptr::NonNull;

    use crate::mutations::Walk;
    use crate::test_item::TestItem;
    use crate::trie::FredkinTrie32;
    use crate::TrieItem;

    fn ptr(b: &mut Box<TestItem>) -> NonNull<TestItem> {
        NonNull::from(b.as_mut())
    }

    #[test]
    fn insert_into_empty_slot_becomes_root_slot_primary() {
        let mut trie: FredkinTrie32<TestItem> = FredkinTrie32::new();
        let mut a = TestItem::new(5, 0);
        unsafe { assert!(trie.insert(ptr(&mut a))); }
        trie.check();
        assert!(a.parent_is_root_slot());
        assert_eq!(a.root_slot_bit_index(), 2); // highest set bit of 5 (0b101)
    }

    #[test]
    fn duplicate_key_becomes_secondary_in_ring() {
        let mut trie: FredkinTrie32<TestItem> = FredkinTrie32::new();
        let mut a = TestItem::new(3, 0);
        let mut b = TestItem::new(3, 1);
        unsafe {
            trie.insert(ptr(&mut a));
            trie.insert(ptr(&mut b));
        }
        trie.check();
        assert!(a.is_primary());
        assert!(b.is_secondary());
        assert_eq!(trie.count_key(3), 2);
    }

    #[test]
    fn remove_plain_leaf_clears_parent_slot() {
        let mut trie: FredkinTrie32<TestItem> = FredkinTrie32::new();
        let mut a = TestItem::new(4, 0); // root slot 2
        let mut b = TestItem::new(5, 1); // diverges below 4, becomes a's child
        unsafe {
            trie.insert(ptr(&mut a));
            trie.insert(ptr(&mut b));
            trie.check();
            trie.remove(ptr(&mut b));
        }
        trie.check();
        assert_eq!(trie.len(), 1);
        assert_eq!(trie.find(5).map(|i| i.key()), None);
        assert_eq!(trie.find(4).map(|i| i.key()), Some(4));
    }

    #[test]
    fn remove_primary_with_sibling_promotes_ring_member() {
        let mut trie: FredkinTrie32<TestItem> = FredkinTrie32::new();
        let mut a = TestItem::new(7, 0);
        let mut b = TestItem::new(7, 1);
        unsafe {
            trie.insert(ptr(&mut a));
            trie.insert(ptr(&mut b));
            trie.check();
            trie.remove(ptr(&mut a));
        }
        trie.check();
        assert_eq!(trie.len(), 1);
        assert!(b.is_primary());
        assert_eq!(trie.find(7).map(|i| i.key()), Some(7));
    }

    #[test]
    fn remove_internal_node_promotes_no_descendant_grandchild() {
        let mut trie: FredkinTrie32<TestItem> = FredkinTrie32::new();
        // All share root slot 3 (highest bit at index 3, keys in [8, 16)).
        let mut items: Vec<Box<TestItem>> =
            [8u32, 12, 10, 14, 9].iter().map(|&k| TestItem::new(k, 0)).collect();
        unsafe {
            for item in items.iter_mut() {
                trie.insert(ptr(item));
            }
            trie.check();
            let root = match trie.walk(8) {
                Walk::Found(n) => n,
                _ => panic!("key 8 must be indexed"),
            };
            trie.remove(root);
        }
        trie.check();
        assert_eq!(trie.len(), 4);
        for k in [12u32, 10, 14, 9] {
            assert!(trie.contains_key(k));
        }
        assert!(!trie.contains_key(8));
    }
}
