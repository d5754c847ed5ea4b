//! The public [`FredkinTrie`] surface: construction, lookup and iteration. The insert/remove
//! algorithms themselves live in `mutations.rs`, keeping tree-walking separate from the
//! splice/rebalance internals.

use std::fmt;
use std::ptr::NonNull;

use crate::bits::{highest_set_bit, TrieKey};
use crate::head::{Head, HeadAccessor, NobbleDir};
use crate::item::TrieItem;
use crate::iter::Iter;
use crate::mutations::Walk;

/// An intrusive, never-allocating associative index keyed by an unsigned integer, built on a
/// bitwise Fredkin trie.
///
/// `T` is the caller's record type (it must implement [`TrieItem`]); `SLOTS` must equal
/// `T::Key::BITS` — use [`FredkinTrie32`] or [`FredkinTrie64`] rather than spelling this out.
///
/// The trie never allocates: every item is owned by the caller and linked in by address. This
/// means every mutating method is `unsafe` — see each method's safety section.
///
/// ```
/// use fredkin_trie::{FredkinTrie32, TrieItem, Links};
/// use std::ptr::NonNull;
///
/// struct Entry {
///     links: Links<Entry, u32>,
///     value: &'static str,
/// }
///
/// impl TrieItem for Entry {
///     type Key = u32;
///     fn links(&self) -> &Links<Self, u32> { &self.links }
///     fn links_mut(&mut self) -> &mut Links<Self, u32> { &mut self.links }
/// }
///
/// let mut a = Box::new(Entry { links: Links::new(10), value: "ten" });
/// let mut trie: FredkinTrie32<Entry> = FredkinTrie32::new();
/// unsafe {
///     trie.insert(NonNull::from(a.as_mut()));
/// }
/// assert_eq!(trie.len(), 1);
/// assert_eq!(trie.find(10).map(|e| e.value), Some("ten"));
/// ```
pub struct FredkinTrie<T: TrieItem, const SLOTS: usize> {
    pub(crate) head: Head<T, T::Key, SLOTS>,
}

/// A [`FredkinTrie`] keyed by `u32`.
pub type FredkinTrie32<T> = FredkinTrie<T, 32>;
/// A [`FredkinTrie`] keyed by `u64`.
pub type FredkinTrie64<T> = FredkinTrie<T, 64>;

impl<T: TrieItem, const SLOTS: usize> FredkinTrie<T, SLOTS> {
    /// An empty index with one nobble direction (`NobbleDir::Zero`). Use [`Self::with_nobble_dir`]
    /// to pick a different removal-tiebreak policy.
    pub fn new() -> Self {
        Self::with_nobble_dir(NobbleDir::Zero)
    }

    pub fn with_nobble_dir(mode: NobbleDir) -> Self {
        Self { head: Head::new(mode) }
    }

    /// Removes every item from the index. Does not touch the items themselves — callers remain
    /// responsible for their storage, same as before the call.
    pub fn clear(&mut self) {
        self.head.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.size() == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.head.size()
    }

    /// The largest number of items this key width can distinguish (`2^BITS - 1`), not a
    /// reservation — the trie never preallocates anything.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.head.max_size()
    }

    /// The item with the smallest key, or `None` if the index is empty. O(log N).
    pub fn front(&self) -> Option<&T> {
        self.front_ptr().map(|p| unsafe { p.as_ref() })
    }

    pub(crate) fn front_ptr(&self) -> Option<NonNull<T>> {
        for i in 0..SLOTS as u32 {
            if let Some(mut node) = self.head.child(i) {
                unsafe {
                    while let Some(c) = node.as_ref().child(0) {
                        node = c;
                    }
                }
                return Some(node);
            }
        }
        None
    }

    /// The item with the largest key, or `None` if the index is empty. O(log N).
    ///
    /// When several items share that key, this returns the ring's tail (the item that was
    /// spliced in most recently), matching [`Self::prev`]'s entry point for that key.
    pub fn back(&self) -> Option<&T> {
        self.back_ptr().map(|p| unsafe { p.as_ref() })
    }

    pub(crate) fn back_ptr(&self) -> Option<NonNull<T>> {
        for i in (0..SLOTS as u32).rev() {
            if let Some(mut node) = self.head.child(i) {
                unsafe {
                    loop {
                        match node.as_ref().child(1).or_else(|| node.as_ref().child(0)) {
                            Some(n) => node = n,
                            None => break,
                        }
                    }
                    return node.as_ref().sibling(0);
                }
            }
        }
        None
    }

    /// Looks up an item with exactly this key. O(log N), no backtracking.
    pub fn find(&self, key: T::Key) -> Option<&T> {
        match self.walk(key) {
            Walk::Found(node) => Some(unsafe { node.as_ref() }),
            _ => None,
        }
    }

    /// Mutable version of [`Self::find`].
    pub fn find_mut(&mut self, key: T::Key) -> Option<&mut T> {
        match self.walk(key) {
            Walk::Found(mut node) => Some(unsafe { node.as_mut() }),
            _ => None,
        }
    }

    #[inline]
    pub fn contains_key(&self, key: T::Key) -> bool {
        matches!(self.walk(key), Walk::Found(_))
    }

    /// How many items currently share this key (0 if none).
    pub fn count_key(&self, key: T::Key) -> usize {
        let Some(primary) = (match self.walk(key) {
            Walk::Found(n) => Some(n),
            _ => None,
        }) else {
            return 0;
        };
        unsafe {
            let mut n = 1;
            let mut cur = primary.as_ref().sibling(1).expect("ring is always non-empty");
            while cur != primary {
                n += 1;
                cur = cur.as_ref().sibling(1).expect("ring is always non-empty");
            }
            n
        }
    }

    /// Looks up an item with exactly this key, panicking if none is indexed.
    pub fn index(&self, key: T::Key) -> &T {
        self.find(key).expect("no item with this key is indexed")
    }

    /// Removes and returns an arbitrary item with this key, or `None` if none is indexed.
    /// When duplicates exist, which one comes back is unspecified.
    ///
    /// # Safety
    /// See [`Self::remove`] — the same per-item contract applies to the returned pointer before
    /// the caller may re-insert or free it.
    pub unsafe fn remove_key(&mut self, key: T::Key) -> Option<NonNull<T>> {
        let node = match self.walk(key) {
            Walk::Found(n) => n,
            _ => return None,
        };
        self.remove_ptr_public(node);
        Some(node)
    }

    /// Public entry point used by `remove_key`/`swap`; just forwards to the internal algorithm.
    pub(crate) unsafe fn remove_ptr_public(&mut self, item: NonNull<T>) {
        self.remove(item);
    }

    /// Bounded-cost approximate search: performs at most `rounds` refinement steps below the
    /// root-slot anchor for `key`'s top bit before giving up and returning whatever item it has
    /// reached.
    ///
    /// The returned item's key is always `>= key` (never a heuristic about that part): if the
    /// anchor itself, or wherever the bounded descent lands, turns out to be below `key`, this
    /// falls through to the next populated root slot, whose subtree is `> key` by construction.
    /// What `rounds` controls is only how close to the *smallest* qualifying item the result is —
    /// use [`Self::nearest_find`] when you need that exact guarantee too.
    pub fn close_find(&self, key: T::Key, rounds: usize) -> Option<&T> {
        let i = highest_set_bit(key);
        let mut slot = i;
        let mut node = loop {
            if let Some(n) = self.head.child(slot) {
                break n;
            }
            slot += 1;
            if slot >= SLOTS as u32 {
                return None;
            }
        };

        if slot == i {
            let mut bit_pos = i;
            for _ in 0..rounds {
                unsafe {
                    if node.as_ref().key() == key {
                        return Some(node.as_ref());
                    }
                    if bit_pos == 0 {
                        break;
                    }
                    bit_pos -= 1;
                    let want = key.bit(bit_pos) as usize;
                    match node.as_ref().child(want) {
                        Some(n) => node = n,
                        None => {
                            if want == 0 {
                                if let Some(n) = node.as_ref().child(1) {
                                    node = n;
                                }
                            }
                            break;
                        }
                    }
                }
            }

            if unsafe { node.as_ref().key() } >= key {
                return Some(unsafe { node.as_ref() });
            }

            // The anchor shares key's top bit but can itself be below key (and a bounded
            // descent can land somewhere below key too) — fall through to the next populated
            // slot, whose whole subtree is guaranteed greater by construction.
            slot += 1;
            loop {
                if slot >= SLOTS as u32 {
                    return None;
                }
                if let Some(root) = self.head.child(slot) {
                    return Some(unsafe { self.min_ptr_in_subtree(root, slot - 1).as_ref() });
                }
                slot += 1;
            }
        }

        // slot > i: key's own branch is empty, so this anchor's whole subtree already has a
        // strictly higher top bit than key and is guaranteed greater by construction.
        Some(unsafe { self.min_ptr_in_subtree(node, slot - 1).as_ref() })
    }

    /// The exact minimum-keyed item in the subtree rooted at `node`, where `child_bit_pos` is
    /// the bit used to choose between `node`'s own `child(0)`/`child(1)`.
    ///
    /// Unlike a sorted binary search tree, a trie node's own key is not guaranteed smaller than
    /// its descendants' — only the *relative order between the two children* is fixed (anything
    /// under `child(0)` is unconditionally less than anything under `child(1)`, since they share
    /// every bit above this position and differ only here). So `node` itself always has to be
    /// weighed in, and whichever side doesn't share `node`'s own bit at this position can be
    /// skipped entirely — it's already dominated by `node` or by the other child.
    fn min_ptr_in_subtree(&self, node: NonNull<T>, child_bit_pos: u32) -> NonNull<T> {
        unsafe {
            let c0 = node.as_ref().child(0);
            let c1 = node.as_ref().child(1);
            let deeper_bit = child_bit_pos.checked_sub(1);
            let node_bit = node.as_ref().key().bit(child_bit_pos);

            if let Some(c0) = c0 {
                let from_c0 = match deeper_bit {
                    Some(b) => self.min_ptr_in_subtree(c0, b),
                    None => c0,
                };
                // child(1), if any, is unconditionally greater than everything under child(0),
                // so it can never hold the answer once child(0) exists.
                return if node_bit { from_c0 } else { smaller_of(Some(from_c0), node) };
            }

            if let Some(c1) = c1 {
                if !node_bit {
                    // node's bit here is 0, child(1)'s is 1 — node beats all of child(1).
                    return node;
                }
                let from_c1 = match deeper_bit {
                    Some(b) => self.min_ptr_in_subtree(c1, b),
                    None => c1,
                };
                return smaller_of(Some(from_c1), node);
            }

            node
        }
    }

    /// The item with the smallest key `>= key`, or `None` if no such item is indexed.
    /// Guaranteed correct, unlike
    /// [`Self::close_find`]; worst case O(log N) because it sometimes has to backtrack out of a
    /// branch that turned out not to contain anything qualifying.
    pub fn nearest_find(&self, key: T::Key) -> Option<&T> {
        let i = highest_set_bit(key);
        if let Some(root) = self.head.child(i) {
            if let Some(found) = self.nearest_in_branch(root, key, i) {
                return Some(unsafe { found.as_ref() });
            }
        }
        for slot in (i + 1)..SLOTS as u32 {
            if let Some(root) = self.head.child(slot) {
                return Some(unsafe { self.min_ptr_in_subtree(root, slot - 1).as_ref() });
            }
        }
        None
    }

    /// Smallest key `>= key` within `node`'s subtree, using the structural guarantee that at any
    /// node, the child sharing `key`'s next bit needs a recursive search while the other child
    /// (if `key`'s bit there is 0) is entirely `>= key` by construction.
    fn nearest_in_branch(&self, node: NonNull<T>, key: T::Key, bit_pos: u32) -> Option<NonNull<T>> {
        unsafe {
            let node_key = node.as_ref().key();
            if node_key == key {
                return Some(node);
            }
            let mut best = if node_key > key { Some(node) } else { None };

            if bit_pos == 0 {
                return best;
            }
            let next_bit = bit_pos - 1;
            let target_bit = key.bit(next_bit);

            if !target_bit {
                if let Some(c0) = node.as_ref().child(0) {
                    if let Some(found) = self.nearest_in_branch(c0, key, next_bit) {
                        best = Some(smaller_of(best, found));
                    }
                }
                // child(1) (if any) is entirely above `key`'s own branch here, but it can still
                // be smaller than an already-found `best` from deeper in child(0) or from `node`
                // itself, so fold it in unconditionally rather than only when `best` is empty.
                if let Some(c1) = node.as_ref().child(1) {
                    let from_c1 = match next_bit.checked_sub(1) {
                        Some(b) => self.min_ptr_in_subtree(c1, b),
                        None => c1,
                    };
                    best = Some(smaller_of(best, from_c1));
                }
            } else if let Some(c1) = node.as_ref().child(1) {
                if let Some(found) = self.nearest_in_branch(c1, key, next_bit) {
                    best = Some(smaller_of(best, found));
                }
            }
            best
        }
    }

    /// The item visited just after `x` in forward traversal order, or `None` if `x` is last.
    /// `x` must currently be indexed by this trie.
    pub fn next(&self, x: &T) -> Option<&T> {
        unsafe { self.next_ptr(NonNull::from(x)).map(|p| p.as_ref()) }
    }

    pub(crate) unsafe fn next_ptr(&self, x: NonNull<T>) -> Option<NonNull<T>> {
        let primary = self.primary_of(x);
        let nxt = x.as_ref().sibling(1).expect("ring is always non-empty");
        if nxt != primary {
            return Some(nxt);
        }
        self.next_after_primary(primary)
    }

    unsafe fn primary_of(&self, x: NonNull<T>) -> NonNull<T> {
        if x.as_ref().is_primary() {
            return x;
        }
        let mut cur = x.as_ref().sibling(1).expect("ring is always non-empty");
        while !cur.as_ref().is_primary() {
            cur = cur.as_ref().sibling(1).expect("ring is always non-empty");
        }
        cur
    }

    unsafe fn next_after_primary(&self, primary: NonNull<T>) -> Option<NonNull<T>> {
        if let Some(c) = primary.as_ref().child(0) {
            return Some(c);
        }
        if let Some(c) = primary.as_ref().child(1) {
            return Some(c);
        }
        let mut node = primary;
        loop {
            match node.as_ref().parent() {
                crate::item::Parent::Item(parent) => {
                    if parent.as_ref().child(0) == Some(node) {
                        if let Some(c1) = parent.as_ref().child(1) {
                            return Some(c1);
                        }
                    }
                    node = parent;
                }
                crate::item::Parent::RootSlot(bit) => {
                    for i in (bit + 1)..SLOTS as u32 {
                        if let Some(c) = self.head.child(i) {
                            return Some(c);
                        }
                    }
                    return None;
                }
                crate::item::Parent::Secondary => unreachable!("walked up to a secondary item"),
            }
        }
    }

    /// The item visited just before `x` in forward traversal order, or `None` if `x` is first.
    /// `x` must currently be indexed by this trie.
    pub fn prev(&self, x: &T) -> Option<&T> {
        unsafe { self.prev_ptr(NonNull::from(x)).map(|p| p.as_ref()) }
    }

    pub(crate) unsafe fn prev_ptr(&self, x: NonNull<T>) -> Option<NonNull<T>> {
        if !x.as_ref().is_primary() {
            return x.as_ref().sibling(0);
        }
        self.prev_before_primary(x)
    }

    unsafe fn prev_before_primary(&self, primary: NonNull<T>) -> Option<NonNull<T>> {
        if let Some(c) = primary.as_ref().child(1) {
            return c.as_ref().sibling(0);
        }
        if let Some(c) = primary.as_ref().child(0) {
            return c.as_ref().sibling(0);
        }
        let mut node = primary;
        loop {
            match node.as_ref().parent() {
                crate::item::Parent::Item(parent) => {
                    if parent.as_ref().child(1) == Some(node) {
                        if let Some(c0) = parent.as_ref().child(0) {
                            return c0.as_ref().sibling(0);
                        }
                    }
                    node = parent;
                }
                crate::item::Parent::RootSlot(bit) => {
                    for i in (0..bit).rev() {
                        if let Some(c) = self.head.child(i) {
                            return c.as_ref().sibling(0);
                        }
                    }
                    return None;
                }
                crate::item::Parent::Secondary => unreachable!("walked up to a secondary item"),
            }
        }
    }

    /// Forward iteration over every indexed item (including duplicates), approximately but not
    /// strictly in key order. Any mutation of the trie while
    /// an iterator is outstanding invalidates it; the borrow checker enforces this since the
    /// iterator borrows `&self`.
    pub fn iter(&self) -> Iter<'_, T, SLOTS> {
        Iter::new(self)
    }

    /// Swaps `item` into the index in place of an indexed item with the same key (found via
    /// [`Self::find`]), preserving that item's exact tree position. Returns the item that was
    /// replaced, or `None` if no item with this key was indexed (in which case `item` is not
    /// linked in).
    ///
    /// This is a convenience for replacing an item's storage (e.g. after moving it) without
    /// paying for a full remove-then-reinsert descent.
    ///
    /// # Safety
    /// `item` must point to a valid, unaliased `T` with the same key as the item it replaces,
    /// and must remain valid and untouched for as long as it stays indexed.
    pub unsafe fn swap(&mut self, mut item: NonNull<T>) -> Option<NonNull<T>> {
        let key = item.as_ref().key();
        let old = match self.walk(key) {
            Walk::Found(n) => n,
            _ => return None,
        };
        T::init(item);
        item.as_mut().set_secondary();

        let (parent, c0, c1) = (old.as_ref().parent(), old.as_ref().child(0), old.as_ref().child(1));
        let (s0, s1) = (old.as_ref().sibling(0), old.as_ref().sibling(1));

        item.as_mut().set_parent(parent);
        item.as_mut().set_child(0, c0);
        item.as_mut().set_child(1, c1);
        item.as_mut().set_sibling(0, s0);
        item.as_mut().set_sibling(1, s1);

        if let Some(mut c) = c0 {
            c.as_mut().set_parent(crate::item::Parent::Item(item));
        }
        if let Some(mut c) = c1 {
            c.as_mut().set_parent(crate::item::Parent::Item(item));
        }
        if let Some(mut p) = s0 {
            p.as_mut().set_sibling(1, Some(item));
        }
        if let Some(mut n) = s1 {
            n.as_mut().set_sibling(0, Some(item));
        }
        match parent {
            crate::item::Parent::RootSlot(bit) => self.head.set_child(bit, Some(item)),
            crate::item::Parent::Item(mut p) => {
                let side = if p.as_ref().child(0) == Some(old) { 0 } else { 1 };
                p.as_mut().set_child(side, Some(item));
            }
            crate::item::Parent::Secondary => unreachable!("old was found, so it must be primary"),
        }

        Some(old)
    }
}

fn smaller_of<T: TrieItem>(best: Option<NonNull<T>>, candidate: NonNull<T>) -> NonNull<T> {
    match best {
        Some(b) => unsafe {
            if candidate.as_ref().key() < b.as_ref().key() {
                candidate
            } else {
                b
            }
        },
        None => candidate,
    }
}

impl<T: TrieItem, const SLOTS: usize> Default for FredkinTrie<T, SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TrieItem, const SLOTS: usize> fmt::Debug for FredkinTrie<T, SLOTS>
where
    T::Key: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FredkinTrie").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod test {
    use std::ptr::NonNull;

    use crate::test_item::TestItem;
    use crate::trie::FredkinTrie32;
    use crate::TrieItem;

    fn build(keys: &[u32]) -> (FredkinTrie32<TestItem>, Vec<Box<TestItem>>) {
        let mut trie = FredkinTrie32::new();
        let mut items: Vec<Box<TestItem>> = keys.iter().map(|&k| TestItem::new(k, 0)).collect();
        unsafe {
            for item in items.iter_mut() {
                trie.insert(NonNull::from(item.as_mut()));
            }
        }
        trie.check();
        (trie, items)
    }

    #[test]
    fn find_exact_and_absent() {
        let (trie, _items) = build(&[1, 2, 4, 8, 16]);
        assert_eq!(trie.find(4).map(|i| i.key()), Some(4));
        assert!(trie.find(5).is_none());
        assert!(trie.contains_key(8));
        assert!(!trie.contains_key(100));
    }

    #[test]
    fn front_and_back_on_disjoint_slots() {
        let (trie, _items) = build(&[1, 2, 4, 8, 16, 32, 64, 128]);
        assert_eq!(trie.front().map(|i| i.key()), Some(1));
        assert_eq!(trie.back().map(|i| i.key()), Some(128));
    }

    #[test]
    fn empty_trie_has_no_front_back_or_find() {
        let trie: FredkinTrie32<TestItem> = FredkinTrie32::new();
        assert!(trie.front().is_none());
        assert!(trie.back().is_none());
        assert!(trie.find(0).is_none());
        assert!(trie.is_empty());
    }

    #[test]
    fn nearest_find_skips_to_next_populated_branch() {
        let (trie, _items) = build(&[5, 3, 9, 1, 7]);
        assert_eq!(trie.nearest_find(4).map(|i| i.key()), Some(5));
        assert_eq!(trie.nearest_find(8).map(|i| i.key()), Some(9));
        assert!(trie.nearest_find(10).is_none());
        assert_eq!(trie.nearest_find(0).map(|i| i.key()), Some(1));
    }

    #[test]
    fn close_find_zero_rounds_returns_some_branch_anchor() {
        let (trie, _items) = build(&[5, 3, 9]);
        // rounds = 0 is O(1): just the root-slot anchor (or next populated slot).
        let found = trie.close_find(5, 0).expect("a branch exists at or above key 5's slot");
        assert!(found.key() >= 5); // key >= k is a hard guarantee, not just a heuristic
    }

    #[test]
    fn close_find_falls_through_when_anchor_is_below_key() {
        // 64 is the root-slot anchor for slot 6, but 70 also lives in that slot and is above it.
        let (trie, _items) = build(&[64, 200]);
        let found = trie.close_find(70, 0).expect("slot 7 qualifies");
        assert_eq!(found.key(), 200);
        assert!(trie.close_find(201, 0).is_none());
    }

    #[test]
    fn nearest_find_considers_the_other_child_even_when_best_already_found() {
        // Reproduces a fold-in bug: inserting 127 first makes it the root-slot anchor, with 64
        // and 96 as its children. nearest_find(65) must weigh 96 against 127, not stop at 127.
        let (trie, _items) = build(&[127, 64, 96]);
        assert_eq!(trie.nearest_find(65).map(|i| i.key()), Some(96));
    }

    #[test]
    fn nearest_find_and_close_find_descend_past_a_smaller_internal_node() {
        // All four share root slot 3. 11 is the root-slot anchor, but its own child 8 is
        // smaller than both its children (9, 10) — the subtree minimum isn't found by blindly
        // descending child(0) from the anchor.
        let (trie, _items) = build(&[11, 8, 10, 9]);
        assert_eq!(trie.nearest_find(5).map(|i| i.key()), Some(8));
        assert_eq!(trie.close_find(5, usize::MAX).map(|i| i.key()), Some(8));
    }

    #[test]
    fn close_find_many_rounds_converges_on_exact_match() {
        let (trie, _items) = build(&[5, 3, 9, 1, 7]);
        let found = trie.close_find(7, usize::MAX).unwrap();
        assert_eq!(found.key(), 7);
    }

    #[test]
    fn next_and_prev_walk_duplicate_ring_then_tree() {
        let (trie, items) = build(&[3, 3, 5]);
        let primary_3 = trie.find(3).unwrap();
        // next() on the primary with a non-trivial ring returns its immediate successor sibling.
        let after_primary = trie.next(primary_3).expect("ring has a second member");
        assert_eq!(after_primary.key(), 3);
        assert!(!std::ptr::eq(after_primary, primary_3));

        let head_item = &*items[2]; // key 5, the only item on that branch
        assert!(trie.next(head_item).is_none());
        assert_eq!(trie.prev(head_item).map(|i| i.key()), Some(3));
    }
}
