use std::ptr::NonNull;

use fredkin_trie::{FredkinTrie32, Links, TrieItem};

struct Entry {
    links: Links<Entry, u32>,
    name: &'static str,
}

impl TrieItem for Entry {
    type Key = u32;
    fn links(&self) -> &Links<Self, u32> { &self.links }
    fn links_mut(&mut self) -> &mut Links<Self, u32> { &mut self.links }
}

fn main() {
    let mut entries = vec![
        Box::new(Entry { links: Links::new(5), name: "five" }),
        Box::new(Entry { links: Links::new(3), name: "three" }),
        Box::new(Entry { links: Links::new(9), name: "nine" }),
    ];

    let mut trie: FredkinTrie32<Entry> = FredkinTrie32::new();
    for e in &mut entries {
        unsafe { trie.insert(NonNull::from(e.as_mut())); }
    }

    println!("Trie contains {:?}", trie.iter().map(|e| (e.key(), e.name)).collect::<Vec<_>>());
    println!("Nearest to 4: {:?}", trie.nearest_find(4).map(|e| e.name));
}
