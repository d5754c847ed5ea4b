//! An intrusive, never-allocating associative index keyed by an unsigned integer, built on a
//! bitwise Fredkin trie.
//!
//! Items are externally owned: the caller allocates and destroys them, and embeds a [`Links`]
//! field somewhere inside its own record to carry the index's private housekeeping. The trie
//! itself never allocates anything; it only ever follows pointers the caller already owns.
//!
//! ```
//! use fredkin_trie::{FredkinTrie32, TrieItem, Links};
//! use std::ptr::NonNull;
//!
//! struct Entry {
//!     links: Links<Entry, u32>,
//!     value: &'static str,
//! }
//!
//! impl TrieItem for Entry {
//!     type Key = u32;
//!     fn links(&self) -> &Links<Self, u32> { &self.links }
//!     fn links_mut(&mut self) -> &mut Links<Self, u32> { &mut self.links }
//! }
//!
//! let mut a = Box::new(Entry { links: Links::new(10), value: "ten" });
//! let mut trie: FredkinTrie32<Entry> = FredkinTrie32::new();
//! unsafe { trie.insert(NonNull::from(a.as_mut())); }
//! assert_eq!(trie.len(), 1);
//! assert_eq!(trie.find(10).map(|e| e.value), Some("ten"));
//! unsafe { trie.remove_key(10); }
//! assert!(trie.is_empty());
//! ```

mod bits;
mod head;
mod item;
mod iter;
mod mutations;
mod trie;

pub mod debug;
pub mod test_item;

pub use bits::{highest_set_bit, TrieKey};
pub use head::{Head, HeadAccessor, LockToken, NobbleDir};
pub use item::{Links, Parent, TrieItem};
pub use iter::Iter;
pub use trie::{FredkinTrie, FredkinTrie32, FredkinTrie64};
