use std::collections::HashMap;
use std::rc::Rc;
use std::time::SystemTime;

use log::debug;

use crate::charindex::*;
use crate::error::*;
use crate::fasttrie::FastTrie;
use crate::trienode::{TrieNode, TrieRoot};
use crate::types::*;

///Number of words a bulk insert looks at to seed the alphabet
pub const PRESCAN_WORDS: usize = 1000;

///Bulk inserts only pre-scan while the alphabet is smaller than this
pub const PRESCAN_ALPHABET_THRESHOLD: usize = 32;

///Alphabet harvesting from an object graph trie stops after this many nodes without a new character
pub const HARVEST_LIMIT: usize = 1000;

#[derive(Clone, Debug)]
struct ArenaNode {
    ///slot 0 holds the `NodeFlags`, every other slot `(child << NODE_CHILD_SHIFT) | char id`
    slots: Vec<u32>,
    ///shared nodes are never written to, they are copied first
    frozen: bool,
}

impl ArenaNode {
    fn new(flags: NodeFlags) -> Self {
        Self {
            slots: vec![flags.bits()],
            frozen: false,
        }
    }

    fn is_eow(&self) -> bool {
        self.slots[0] & NodeFlags::EOW.bits() != 0
    }

    fn find_slot(&self, id: CharId) -> Option<usize> {
        self.slots
            .iter()
            .skip(1)
            .position(|slot| slot & NODE_CHAR_MASK == id)
            .map(|pos| pos + 1)
    }

    fn child_at(&self, slot: usize) -> NodeIndex {
        self.slots[slot] >> NODE_CHILD_SHIFT
    }
}

///One edge taken while walking down from the root: the node and the slot that was followed
#[derive(Clone, Copy, Debug)]
struct PathStep {
    node: NodeIndex,
    slot: usize,
}

///Builds the node table of a trie word by word. Node 0 is the root, node 1 the shared end-of-word
///leaf. Nodes shared between several parents are frozen and copied before they are modified.
#[derive(Clone, Debug)]
pub struct TrieBuilder {
    nodes: Vec<ArenaNode>,
    char_index: CharIndexBuilder,
    info: TrieInfo,
    readonly: bool,
    prescan_words: usize,
    prescan_alphabet_threshold: usize,
    harvest_limit: usize,
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieBuilder {
    pub fn new() -> Self {
        let mut eow = ArenaNode::new(NodeFlags::EOW);
        eow.frozen = true;
        Self {
            nodes: vec![ArenaNode::new(NodeFlags::empty()), eow],
            char_index: CharIndexBuilder::new(),
            info: TrieInfo::default(),
            readonly: false,
            prescan_words: PRESCAN_WORDS,
            prescan_alphabet_threshold: PRESCAN_ALPHABET_THRESHOLD,
            harvest_limit: HARVEST_LIMIT,
        }
    }

    pub fn with_info(mut self, info: TrieInfo) -> Self {
        self.info = info;
        self
    }

    ///Tunes the alphabet pre-scan of bulk inserts
    pub fn with_prescan(mut self, words: usize, alphabet_threshold: usize) -> Self {
        self.prescan_words = words;
        self.prescan_alphabet_threshold = alphabet_threshold;
        self
    }

    ///Tunes the alphabet harvest of `convert_trie_root`
    pub fn with_harvest_limit(mut self, limit: usize) -> Self {
        self.harvest_limit = limit;
        self
    }

    pub fn info(&self) -> &TrieInfo {
        &self.info
    }

    ///Number of nodes in the table, including the root and the end-of-word leaf
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn alphabet_size(&self) -> usize {
        self.char_index.len()
    }

    pub fn is_frozen(&self) -> bool {
        self.readonly
    }

    ///Makes the builder read-only, any further mutation panics
    pub fn freeze(&mut self) {
        self.readonly = true;
    }

    fn assert_writable(&self) {
        assert!(!self.readonly, "attempt to modify a frozen trie builder");
    }

    fn push_node(&mut self, flags: NodeFlags) -> NodeIndex {
        let index = self.nodes.len() as u64;
        assert!(
            index <= MAX_CHILD_REF as u64,
            "node table overflow: {} nodes exceed the child reference width",
            index
        );
        self.nodes.push(ArenaNode::new(flags));
        index as NodeIndex
    }

    ///Private copy of a node, the copy shares the children of the original
    fn fork(&mut self, node: NodeIndex) -> NodeIndex {
        let slots = self.nodes[node as usize].slots.clone();
        let copy = self.push_node(NodeFlags::empty());
        self.nodes[copy as usize].slots = slots;
        copy
    }

    fn set_child(&mut self, node: NodeIndex, slot: usize, child: NodeIndex) {
        let parent = &mut self.nodes[node as usize];
        debug_assert!(!parent.frozen, "rewriting an edge of a frozen node");
        parent.slots[slot] = (child << NODE_CHILD_SHIFT) | (parent.slots[slot] & NODE_CHAR_MASK);
    }

    ///Makes `node`, reached through `trail`, writable. Frozen nodes on the way are copied top
    ///down and the edges leading to them are repointed; `trail` is updated in place.
    fn thaw(&mut self, trail: &mut [PathStep], node: NodeIndex) -> NodeIndex {
        if !self.nodes[node as usize].frozen {
            return node;
        }
        assert!(!trail.is_empty(), "the root node can not be frozen");
        let mut first = trail.len();
        while first > 0 && self.nodes[trail[first - 1].node as usize].frozen {
            first -= 1;
        }
        assert!(first > 0, "the root node can not be frozen");
        for j in first..trail.len() {
            let copy = self.fork(trail[j].node);
            let parent = trail[j - 1];
            self.set_child(parent.node, parent.slot, copy);
            trail[j].node = copy;
        }
        let copy = self.fork(node);
        let parent = trail[trail.len() - 1];
        self.set_child(parent.node, parent.slot, copy);
        copy
    }

    ///Freezes a node and everything below it
    fn freeze_subtree(&mut self, node: NodeIndex) {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            //a pending cursor edge points one past the end of the table
            let Some(arena_node) = self.nodes.get_mut(n as usize) else {
                continue;
            };
            if arena_node.frozen {
                continue;
            }
            arena_node.frozen = true;
            stack.extend(arena_node.slots[1..].iter().map(|slot| slot >> NODE_CHILD_SHIFT));
        }
    }

    ///Adds a single word
    pub fn insert(&mut self, word: &str) {
        self.assert_writable();
        if word.is_empty() {
            return;
        }
        let seq = self.char_index.to_sequence(word);
        let last = seq.len() - 1;
        let mut trail: Vec<PathStep> = Vec::with_capacity(seq.len());
        let mut node = ROOT_NODE;
        for (p, id) in seq.iter().copied().enumerate() {
            match self.nodes[node as usize].find_slot(id) {
                Some(slot) => {
                    let mut child = self.nodes[node as usize].child_at(slot);
                    if child == EOW_NODE && p < last {
                        //the shared leaf stays childless
                        node = self.thaw(&mut trail, node);
                        child = self.push_node(NodeFlags::EOW);
                        self.set_child(node, slot, child);
                    }
                    trail.push(PathStep { node, slot });
                    node = child;
                }
                None => {
                    node = self.thaw(&mut trail, node);
                    let child = if p == last {
                        EOW_NODE
                    } else {
                        self.push_node(NodeFlags::empty())
                    };
                    let slots = &mut self.nodes[node as usize].slots;
                    slots.push((child << NODE_CHILD_SHIFT) | id);
                    trail.push(PathStep {
                        node,
                        slot: slots.len() - 1,
                    });
                    node = child;
                }
            }
        }
        if node != EOW_NODE && !self.nodes[node as usize].is_eow() {
            node = self.thaw(&mut trail, node);
            self.nodes[node as usize].slots[0] |= NodeFlags::EOW.bits();
        }
    }

    ///Adds all words of an iterable. While the alphabet is still small, a bounded number of
    ///leading words is scanned first so that the most frequent characters get the smallest ids.
    pub fn insert_words<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.assert_writable();
        let mut words = words.into_iter();
        if self.char_index.len() < self.prescan_alphabet_threshold && self.prescan_words > 0 {
            let head: Vec<S> = words.by_ref().take(self.prescan_words).collect();
            self.seed_alphabet(head.iter().map(|w| w.as_ref()));
            for word in head.iter() {
                self.insert(word.as_ref());
            }
        }
        for word in words {
            self.insert(word.as_ref());
        }
    }

    fn seed_alphabet<'w>(&mut self, words: impl Iterator<Item = &'w str>) {
        let mut counts: HashMap<char, (usize, usize)> = HashMap::new();
        for c in words.flat_map(|w| w.chars()) {
            let first_seen = counts.len();
            counts.entry(c).or_insert((0, first_seen)).0 += 1;
        }
        let mut chars: Vec<(char, (usize, usize))> = counts.into_iter().collect();
        chars.sort_by(|(_, (count_a, seen_a)), (_, (count_b, seen_b))| {
            count_b.cmp(count_a).then(seen_a.cmp(seen_b))
        });
        for (c, _) in chars.iter() {
            self.char_index.get_char_index(*c);
        }
        debug!(
            "seeded alphabet with {} characters, {} in total",
            chars.len(),
            self.char_index.len()
        );
    }

    ///Membership test on the unfinished trie
    pub fn has(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        let mut node = ROOT_NODE;
        let mut seq = Vec::with_capacity(4);
        for c in word.chars() {
            let Some(char_id) = self.char_index.index_of(c) else {
                return false;
            };
            seq.clear();
            encode_char_id(char_id, &mut seq);
            for id in seq.iter().copied() {
                let arena_node = &self.nodes[node as usize];
                match arena_node.find_slot(id) {
                    Some(slot) => node = arena_node.child_at(slot),
                    None => return false,
                }
            }
        }
        self.nodes[node as usize].is_eow()
    }

    ///Low level insertion cursor, see `TrieCursor`
    pub fn cursor(&mut self) -> TrieCursor<'_> {
        self.assert_writable();
        TrieCursor::new(self)
    }

    pub fn build(mut self) -> FastTrie {
        self.freeze();
        let mut info = self.info.clone();
        if let Some(id) = self.char_index.build().index_of(info.strip_case_and_accents_prefix) {
            if id < SEQ_SPECIAL && self.nodes[ROOT_NODE as usize].find_slot(id).is_some() {
                info.is_case_aware = true;
            }
        }
        debug!(
            "built trie with {} nodes and an alphabet of {} characters",
            self.nodes.len(),
            self.char_index.len()
        );
        let nodes = self.nodes.into_iter().map(|n| n.slots).collect();
        FastTrie::new(nodes, self.char_index.build(), info)
    }

    ///Inserts all words and builds the trie
    pub fn from_word_list<I, S>(words: I) -> FastTrie
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = TrieBuilder::new();
        builder.insert_words(words);
        builder.build()
    }

    ///Converts an object graph trie with the default settings
    pub fn from_trie_root(root: &TrieRoot) -> FastTrie {
        TrieBuilder::new().convert_trie_root(root)
    }

    ///Converts an object graph trie into this (empty) builder and builds it. Nodes shared in the
    ///graph are encoded once. The marker configuration is taken from `root`.
    pub fn convert_trie_root(self, root: &TrieRoot) -> FastTrie {
        self.assert_writable();
        assert!(
            self.nodes.len() == 2 && self.nodes[ROOT_NODE as usize].slots.len() == 1,
            "an object graph trie can only be converted into an empty builder"
        );
        let started = SystemTime::now();
        let mut builder = self.with_info(root.info.clone());
        builder.harvest_alphabet(&root.node);

        let mut memo: HashMap<*const TrieNode, NodeIndex> = HashMap::new();
        if root.node.eow {
            builder.nodes[ROOT_NODE as usize].slots[0] |= NodeFlags::EOW.bits();
        }
        let mut stack = vec![(ROOT_NODE, root.node.children.iter())];
        while let Some((parent, children)) = stack.last_mut() {
            let parent = *parent;
            let Some((c, child)) = children.next() else {
                stack.pop();
                continue;
            };
            let index = if child.children.is_empty() {
                if !child.eow {
                    //dead end, no word passes here
                    continue;
                }
                EOW_NODE
            } else if let Some(index) = memo.get(&Rc::as_ptr(child)) {
                *index
            } else {
                let flags = if child.eow {
                    NodeFlags::EOW
                } else {
                    NodeFlags::empty()
                };
                let index = builder.push_node(flags);
                memo.insert(Rc::as_ptr(child), index);
                stack.push((index, child.children.iter()));
                index
            };
            builder.add_edge(parent, *c, index);
        }
        if let Ok(elapsed) = started.elapsed() {
            debug!(
                "converted object graph trie: {} unique nodes into {} arena nodes in {} ms",
                memo.len(),
                builder.nodes.len(),
                elapsed.as_millis()
            );
        }
        builder.build()
    }

    ///Collects the characters of an object graph trie, stops once `harvest_limit` nodes in a
    ///row yielded nothing new. Characters it misses get their ids when their edges are added.
    fn harvest_alphabet(&mut self, root: &TrieNode) {
        let mut stack: Vec<&TrieNode> = vec![root];
        let mut since_new = 0;
        while let Some(node) = stack.pop() {
            if since_new > self.harvest_limit {
                debug!(
                    "alphabet harvest stopped after {} nodes without a new character, {} collected",
                    since_new,
                    self.char_index.len()
                );
                break;
            }
            since_new += 1;
            for (c, child) in node.children.iter() {
                if !self.char_index.contains(*c) {
                    self.char_index.get_char_index(*c);
                    since_new = 0;
                }
                stack.push(child.as_ref());
            }
        }
    }

    ///Adds the edge `node --c--> child`, creating the intermediate nodes of multi-slot characters
    fn add_edge(&mut self, node: NodeIndex, c: char, child: NodeIndex) {
        let mut seq = Vec::with_capacity(1);
        self.char_index.push_char_seq(c, &mut seq);
        let mut node = node;
        let last = seq.len() - 1;
        for (p, id) in seq.iter().copied().enumerate() {
            if p == last {
                self.nodes[node as usize]
                    .slots
                    .push((child << NODE_CHILD_SHIFT) | id);
                break;
            }
            node = match self.nodes[node as usize].find_slot(id) {
                Some(slot) => self.nodes[node as usize].child_at(slot),
                None => {
                    let next = self.push_node(NodeFlags::empty());
                    self.nodes[node as usize]
                        .slots
                        .push((next << NODE_CHILD_SHIFT) | id);
                    next
                }
            };
        }
    }
}

///Inserts words character by character from a movable position, for sources that already know
///which prefix consecutive words share (sorted lists, serialized tries).
///
///The position is an explicit stack of the edges taken. `back_step` rewinds it, `reference`
///points the current edge at an existing node instead of building a new one. Nodes are numbered
///for `reference` in the order they are created: 0 is the root, 1 the end-of-word leaf, then every
///node the cursor creates below a character. Nodes that end up as plain word ends or as
///references take no number, nor do the intermediate nodes of multi-slot characters.
///
///Stepping back over a character that leads nowhere (no `mark_eow`, `reference` or further
///character below it) takes it out again, so does dropping the cursor.
pub struct TrieCursor<'b> {
    builder: &'b mut TrieBuilder,
    ///path[0] is a sentinel, path[1..=depth] are the edges from the root to the current node
    path: Vec<PathStep>,
    ///depth before the character that produced the corresponding path entry
    char_start: Vec<usize>,
    depth: usize,
    node: NodeIndex,
    refs: Vec<NodeIndex>,
    seq: Vec<CharId>,
}

impl<'b> TrieCursor<'b> {
    fn new(builder: &'b mut TrieBuilder) -> Self {
        Self {
            builder,
            path: vec![PathStep {
                node: ROOT_NODE,
                slot: 0,
            }],
            char_start: vec![0],
            depth: 0,
            node: ROOT_NODE,
            refs: vec![ROOT_NODE, EOW_NODE],
            seq: Vec::new(),
        }
    }

    ///The current node does not exist yet, it is created on the next write
    fn is_pending(&self) -> bool {
        self.node as usize >= self.builder.nodes.len()
    }

    ///Materializes the pending node before something is written below it. Only nodes that end a
    ///character are numbered for `reference`.
    fn settle(&mut self, numbered: bool) {
        if self.is_pending() {
            let index = self.builder.push_node(NodeFlags::empty());
            debug_assert_eq!(index, self.node);
            if numbered {
                self.refs.push(index);
            }
        }
    }

    ///Can `node` be taken out again when the cursor leaves it? True for a pending node, and for the
    ///newest node of the table while it holds neither a word end nor children.
    fn is_removable(&self, node: NodeIndex) -> bool {
        match self.builder.nodes.get(node as usize) {
            None => true,
            Some(arena_node) => {
                node as usize + 1 == self.builder.nodes.len()
                    && node != ROOT_NODE
                    && node != EOW_NODE
                    && !arena_node.frozen
                    && !arena_node.is_eow()
                    && arena_node.slots.len() == 1
            }
        }
    }

    ///Moves one character up. A node left behind without anything below it is removed together
    ///with the edge leading to it.
    fn step_out(&mut self) {
        let start = self.char_start[self.depth];
        let mut node = self.node;
        while self.depth > start {
            let step = self.path[self.depth];
            self.depth -= 1;
            let is_last_slot = self.builder.nodes[step.node as usize].slots.len() == step.slot + 1;
            if is_last_slot && self.is_removable(node) {
                if (node as usize) < self.builder.nodes.len() {
                    self.builder.nodes.pop();
                    if self.refs.last() == Some(&node) {
                        self.refs.pop();
                    }
                }
                self.builder.nodes[step.node as usize].slots.pop();
            }
            node = step.node;
        }
        self.node = node;
    }

    ///Number of characters between the root and the current position
    pub fn depth(&self) -> usize {
        let mut chars = 0;
        let mut depth = self.depth;
        while depth > 0 {
            depth = self.char_start[depth];
            chars += 1;
        }
        chars
    }

    pub fn insert_char(&mut self, c: char) {
        self.builder.assert_writable();
        let start = self.depth;
        let mut seq = std::mem::take(&mut self.seq);
        seq.clear();
        self.builder.char_index.push_char_seq(c, &mut seq);
        for id in seq.iter().copied() {
            self.insert_id(id, start);
        }
        self.seq = seq;
    }

    fn insert_id(&mut self, id: CharId, start: usize) {
        if self.is_pending() {
            self.settle(self.depth == start);
        } else if self.builder.nodes[self.node as usize].frozen {
            self.node = self
                .builder
                .thaw(&mut self.path[1..=self.depth], self.node);
        }
        let pending_child = self.builder.nodes.len() as NodeIndex;
        let arena_node = &mut self.builder.nodes[self.node as usize];
        let slot = match arena_node.find_slot(id) {
            Some(slot) => slot,
            None => {
                arena_node
                    .slots
                    .push((pending_child << NODE_CHILD_SHIFT) | id);
                arena_node.slots.len() - 1
            }
        };
        let child = arena_node.child_at(slot);
        self.depth += 1;
        let step = PathStep {
            node: self.node,
            slot,
        };
        if self.path.len() > self.depth {
            self.path[self.depth] = step;
            self.char_start[self.depth] = start;
        } else {
            self.path.push(step);
            self.char_start.push(start);
        }
        self.node = child;
    }

    ///Marks the current position as the end of a word
    pub fn mark_eow(&mut self) {
        self.builder.assert_writable();
        assert!(self.depth > 0, "the empty word can not be marked");
        if self.node == EOW_NODE {
            return;
        }
        let step = self.path[self.depth];
        if self.is_pending() {
            self.builder.set_child(step.node, step.slot, EOW_NODE);
            self.node = EOW_NODE;
            return;
        }
        if self.builder.nodes[self.node as usize].is_eow() {
            return;
        }
        self.node = self
            .builder
            .thaw(&mut self.path[1..=self.depth], self.node);
        self.builder.nodes[self.node as usize].slots[0] |= NodeFlags::EOW.bits();
    }

    ///Points the edge just inserted at an existing node (numbered as described on `TrieCursor`)
    ///instead of a new one. The referenced subtree is frozen, later writes through it copy.
    ///Panics where `try_reference` fails.
    pub fn reference(&mut self, node_ref: usize) {
        if let Err(err) = self.try_reference(node_ref) {
            panic!("{}", err);
        }
    }

    pub fn try_reference(&mut self, node_ref: usize) -> Result<()> {
        self.builder.assert_writable();
        let Some(target) = self.refs.get(node_ref).copied() else {
            return Err(TrieError::InvalidReference(format!(
                "reference to unknown node {}",
                node_ref
            )));
        };
        if self.depth == 0 || !self.is_pending() {
            return Err(TrieError::InvalidReference(
                "reference must directly follow the insertion of a new edge".to_string(),
            ));
        }
        if self.path[1..=self.depth].iter().any(|s| s.node == target) {
            return Err(TrieError::InvalidReference(format!(
                "reference to node {} would create a cycle",
                node_ref
            )));
        }
        self.builder.freeze_subtree(target);
        let step = self.path[self.depth];
        self.builder.set_child(step.node, step.slot, target);
        self.node = target;
        Ok(())
    }

    ///Moves `steps` characters back towards the root
    pub fn back_step(&mut self, steps: usize) {
        for _ in 0..steps {
            assert!(self.depth > 0, "back_step beyond the root");
            self.step_out();
        }
    }

    ///Inserts the remainder of a word at the current position, marks it and steps back to where
    ///it started
    pub fn insert_suffix(&mut self, suffix: &str) {
        let mut steps = 0;
        for c in suffix.chars() {
            self.insert_char(c);
            steps += 1;
        }
        if steps > 0 {
            self.mark_eow();
            self.back_step(steps);
        }
    }
}

impl Drop for TrieCursor<'_> {
    fn drop(&mut self) {
        while self.depth > 0 {
            self.step_out();
        }
    }
}
