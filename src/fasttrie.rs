use crate::blob::TrieBlob;
use crate::charindex::*;
use crate::error::Result;
use crate::triedata::TrieData;
use crate::types::*;

///Immutable trie over the node table produced by `TrieBuilder`
#[derive(Clone, Debug)]
pub struct FastTrie {
    nodes: Vec<Vec<u32>>,
    char_index: CharIndex,
    info: TrieInfo,
}

impl FastTrie {
    pub(crate) fn new(nodes: Vec<Vec<u32>>, char_index: CharIndex, info: TrieInfo) -> Self {
        Self {
            nodes,
            char_index,
            info,
        }
    }

    pub fn char_index(&self) -> &CharIndex {
        &self.char_index
    }

    ///The raw node table, slot 0 of every node holds its flags
    pub fn nodes(&self) -> &[Vec<u32>] {
        &self.nodes
    }

    ///Panics if `node` is not a node of this trie
    pub fn node_flags(&self, node: NodeIndex) -> NodeFlags {
        NodeFlags::from_bits_truncate(self.nodes[node as usize][0])
    }

    fn follow(&self, node: NodeIndex, id: CharId) -> Option<NodeIndex> {
        self.nodes[node as usize][1..]
            .iter()
            .find(|slot| *slot & NODE_CHAR_MASK == id)
            .map(|slot| slot >> NODE_CHILD_SHIFT)
    }

    ///Flattens the trie into its binary form
    pub fn to_blob(&self) -> Result<TrieBlob> {
        TrieBlob::from_fast_trie(self)
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.to_blob()?.encode()
    }

    pub fn decode(buffer: &[u8]) -> Result<FastTrie> {
        Ok(TrieBlob::decode(buffer)?.to_fast_trie())
    }
}

impl TrieData for FastTrie {
    type Node<'a> = NodeIndex;

    fn info(&self) -> &TrieInfo {
        &self.info
    }

    fn root(&self) -> NodeIndex {
        ROOT_NODE
    }

    fn is_end_of_word(&self, node: NodeIndex) -> bool {
        self.nodes[node as usize][0] & NodeFlags::EOW.bits() != 0
    }

    fn children(&self, node: NodeIndex) -> Vec<(char, NodeIndex)> {
        decode_children(
            &self.nodes[node as usize][1..],
            |n| self.nodes.get(n as usize).map(|slots| &slots[1..]),
            &self.char_index,
        )
    }

    fn size(&self) -> usize {
        self.nodes.len()
    }

    fn child(&self, node: NodeIndex, c: char) -> Option<NodeIndex> {
        let seq = self.char_index.char_seq(c)?;
        let mut node = node;
        for id in seq {
            node = self.follow(node, id)?;
        }
        Some(node)
    }

    fn has(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        let Some(seq) = self.char_index.to_sequence(word) else {
            return false;
        };
        let mut node = ROOT_NODE;
        for id in seq {
            match self.follow(node, id) {
                Some(next) => node = next,
                None => return false,
            }
        }
        self.is_end_of_word(node)
    }
}

///Resolves the child slots of a node into `(character, child)` pairs. Characters that span
///several slots are followed through their intermediate nodes; `slots_of` returns the child slots
///(flags excluded) of such a node.
pub(crate) fn decode_children<'s, F>(
    slots: &'s [u32],
    slots_of: F,
    char_index: &CharIndex,
) -> Vec<(char, NodeIndex)>
where
    F: Fn(NodeIndex) -> Option<&'s [u32]>,
{
    let mut children = Vec::with_capacity(slots.len());
    let mut stack: Vec<(u32, SeqDecoder)> = slots
        .iter()
        .rev()
        .map(|slot| (*slot, SeqDecoder::new()))
        .collect();
    while let Some((slot, mut decoder)) = stack.pop() {
        let child = slot >> NODE_CHILD_SHIFT;
        match decoder.decode(slot & NODE_CHAR_MASK) {
            Some(id) => {
                if let Some(c) = char_index.char_at(id) {
                    children.push((c, child));
                }
            }
            None => {
                if let Some(next) = slots_of(child) {
                    stack.extend(next.iter().rev().map(|slot| (*slot, decoder)));
                }
            }
        }
    }
    children
}
