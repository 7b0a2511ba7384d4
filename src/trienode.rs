use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::builder::TrieBuilder;
use crate::fasttrie::FastTrie;
use crate::triedata::TrieData;
use crate::types::*;

///A node of the object graph trie. Subtrees are reference counted so that tries produced by
///external tooling can share suffixes; writes copy a shared node first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrieNode {
    pub eow: bool,
    pub children: BTreeMap<char, Rc<TrieNode>>,
}

impl TrieNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: &str) {
        let mut node = self;
        for c in word.chars() {
            node = Rc::make_mut(node.children.entry(c).or_default());
        }
        node.eow = true;
    }
}

///Object graph trie together with its marker configuration
#[derive(Clone, Debug, Default)]
pub struct TrieRoot {
    pub node: TrieNode,
    pub info: TrieInfo,
}

impl TrieRoot {
    pub fn new(info: TrieInfo) -> Self {
        Self {
            node: TrieNode::new(),
            info,
        }
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut root = Self::default();
        for word in words {
            root.insert(word.as_ref());
        }
        root
    }

    pub fn insert(&mut self, word: &str) {
        if word.is_empty() {
            return;
        }
        self.node.insert(word);
    }

    ///Converts into the arena form
    pub fn to_fast_trie(&self) -> FastTrie {
        TrieBuilder::from_trie_root(self)
    }
}

impl TrieData for TrieRoot {
    type Node<'a> = &'a TrieNode;

    fn info(&self) -> &TrieInfo {
        &self.info
    }

    fn root(&self) -> &TrieNode {
        &self.node
    }

    fn is_end_of_word<'a>(&'a self, node: &'a TrieNode) -> bool {
        node.eow
    }

    fn children<'a>(&'a self, node: &'a TrieNode) -> Vec<(char, &'a TrieNode)> {
        node.children
            .iter()
            .map(|(c, child)| (*c, child.as_ref()))
            .collect()
    }

    ///Number of distinct nodes, shared subtrees count once
    fn size(&self) -> usize {
        let mut seen: HashSet<*const TrieNode> = HashSet::new();
        let mut stack: Vec<&TrieNode> = vec![&self.node];
        seen.insert(&self.node as *const TrieNode);
        while let Some(node) = stack.pop() {
            for child in node.children.values() {
                if seen.insert(Rc::as_ptr(child)) {
                    stack.push(child.as_ref());
                }
            }
        }
        seen.len()
    }

    fn child<'a>(&'a self, node: &'a TrieNode, c: char) -> Option<&'a TrieNode> {
        node.children.get(&c).map(|child| child.as_ref())
    }
}
