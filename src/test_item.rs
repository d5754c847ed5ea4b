//! A minimal item fixture used by this crate's own tests and doctests: a small, self-contained
//! record so unit tests and the fuzzer don't need to invent a new payload type each time.

use crate::item::Links;
use crate::item::TrieItem;

/// A boxed item for use in tests: a key plus an arbitrary payload, wired up with the
/// [`Links`] the trie needs.
#[derive(Debug)]
pub struct TestItem {
    links: Links<TestItem, u32>,
    pub value: u32,
}

impl TestItem {
    pub fn new(key: u32, value: u32) -> Box<Self> {
        Box::new(Self { links: Links::new(key), value })
    }
}

impl TrieItem for TestItem {
    type Key = u32;

    fn links(&self) -> &Links<Self, u32> {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links<Self, u32> {
        &mut self.links
    }
}
