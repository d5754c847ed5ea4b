//! Invariant checking and ad hoc diagnostic printers for [`FredkinTrie`].

use std::fmt;

use humansize::{file_size_opts, FileSize};

use crate::bits::{highest_set_bit, TrieKey};
use crate::head::HeadAccessor;
use crate::item::{Parent, TrieItem};
use crate::trie::FredkinTrie;

impl<T: TrieItem, const SLOTS: usize> FredkinTrie<T, SLOTS> {
    /// Walks the whole structure and panics if anything is inconsistent: root-slot membership,
    /// branch-bit consistency, parent tagging, sibling-ring double-consistency (exactly one
    /// primary per key holds trivially by construction, so it isn't separately re-derived here),
    /// and that `count` matches what's actually reachable.
    ///
    /// Call this from tests after every mutation. Not run automatically — there's no hidden
    /// per-operation cost here — release builds should skip it.
    pub fn check(&self) {
        let mut counted = 0usize;
        for i in 0..SLOTS as u32 {
            if let Some(root) = self.head.child(i) {
                unsafe {
                    assert!(
                        root.as_ref().parent_is_root_slot(),
                        "root slot {i} child isn't parented as a root slot"
                    );
                    assert_eq!(root.as_ref().root_slot_bit_index(), i);
                    counted += self.check_branch(root, i, 0);
                }
            }
        }
        assert_eq!(counted, self.len(), "head.count doesn't match reachable item count");
    }

    /// Checks the subtree rooted at `node`, `depth` levels below root slot `slot` (the root-slot
    /// item itself has `depth == 0`), and returns the number of items (primaries and their
    /// secondaries) found in it.
    unsafe fn check_branch(&self, node: std::ptr::NonNull<T>, slot: u32, depth: u32) -> usize {
        let key = node.as_ref().key();
        assert_eq!(highest_set_bit(key), slot, "item's key doesn't belong in root slot {slot}");

        // Invariant 3: an item `depth` levels below its root slot has its bit `(slot - depth)`
        // equal to the branch side it took from its parent. The root-slot item itself (depth 0)
        // has no parent side to check.
        if depth > 0 {
            let expected_side = key.bit(slot - depth);
            match node.as_ref().parent() {
                Parent::Item(parent) => {
                    let actual_side = parent.as_ref().child(1) == Some(node);
                    assert_eq!(
                        expected_side, actual_side,
                        "item's descent side doesn't match its key bit at depth {depth}"
                    );
                }
                Parent::RootSlot(_) => panic!("non-root item at depth {depth} is parented as a root slot"),
                Parent::Secondary => panic!("non-root item at depth {depth} is tagged secondary"),
            }
        }

        let mut count = self.check_ring(node);

        for side in 0..2 {
            if let Some(child) = node.as_ref().child(side) {
                match child.as_ref().parent() {
                    Parent::Item(p) if p == node => {}
                    _ => panic!("child[{side}]'s parent doesn't point back at its parent"),
                }
                count += self.check_branch(child, slot, depth + 1);
            }
        }
        count
    }

    /// Walks `primary`'s sibling ring, asserting double-consistency and that every member except
    /// `primary` is a secondary with the same key, and returns the ring's size.
    unsafe fn check_ring(&self, primary: std::ptr::NonNull<T>) -> usize {
        let key = primary.as_ref().key();
        let mut count = 1;
        let mut cur = primary.as_ref().sibling(1).expect("ring is always non-empty");
        while cur != primary {
            assert!(cur.as_ref().is_secondary(), "non-primary ring member isn't tagged secondary");
            assert_eq!(cur.as_ref().key(), key, "ring member has a different key than its primary");
            let next = cur.as_ref().sibling(1).expect("ring is always non-empty");
            assert_eq!(
                next.as_ref().sibling(0),
                Some(cur),
                "sibling ring isn't doubly-consistent going forward"
            );
            cur = next;
            count += 1;
        }
        assert_eq!(
            primary.as_ref().sibling(0).and_then(|p| p.as_ref().sibling(1)),
            Some(primary),
            "sibling ring isn't doubly-consistent at the primary"
        );
        count
    }

    /// Prints the tree shape to stderr: one line per item, indented by depth, noting root-slot
    /// anchors and non-trivial sibling rings. For ad hoc use while developing against the crate.
    #[allow(unused)]
    pub fn print_ptr_tree(&self)
    where
        T::Key: fmt::Debug,
    {
        eprintln!("FredkinTrie len {:?}", self.len());
        for i in 0..SLOTS as u32 {
            if let Some(root) = self.head.child(i) {
                unsafe { self.print_node(root, 1) };
            }
        }
    }

    unsafe fn print_node(&self, node: std::ptr::NonNull<T>, depth: usize)
    where
        T::Key: fmt::Debug,
    {
        for _ in 0..depth {
            eprint!("  ");
        }
        let ring_len = self.check_ring(node);
        eprintln!(
            "{:?} (ptr {:?}, ring len {})",
            node.as_ref().key(),
            node.as_ptr(),
            ring_len
        );
        for side in 0..2 {
            if let Some(child) = node.as_ref().child(side) {
                self.print_node(child, depth + 1);
            }
        }
    }

    /// Prints coarse size statistics to stdout: item count, root-slot occupancy, and a rough
    /// memory-usage estimate (`items * size_of::<T>()`, since the trie allocates nothing of its
    /// own).
    #[allow(unused)]
    pub fn print_stats(&self, name: &str) {
        let mut occupied_slots = 0usize;
        for i in 0..SLOTS as u32 {
            if self.head.child(i).is_some() {
                occupied_slots += 1;
            }
        }

        println!("-------- FredkinTrie {name} stats --------");
        println!("Items: {}", self.len());
        println!("Occupied root slots: {occupied_slots} / {SLOTS}");
        let item_bytes = self.len() * std::mem::size_of::<T>();
        println!(
            "Approx. item storage: {}",
            item_bytes
                .file_size(file_size_opts::CONVENTIONAL)
                .unwrap_or_else(|_| format!("{item_bytes} bytes"))
        );
    }
}
