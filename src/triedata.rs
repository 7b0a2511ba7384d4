use crate::normalize::*;
use crate::types::*;

///Read access to a trie, independent of how its nodes are stored. Implemented by the arena
///(`FastTrie`), the binary form (`TrieBlob`) and the object graph (`TrieRoot`).
pub trait TrieData {
    ///A cheap handle to a node. Handles are only meaningful to the trie that produced them
    ///(through `root`, `child`, `children` or `find_node`), the methods taking a handle may panic
    ///on one from elsewhere.
    type Node<'a>: Copy
    where
        Self: 'a;

    fn info(&self) -> &TrieInfo;

    fn root(&self) -> Self::Node<'_>;

    fn is_end_of_word<'a>(&'a self, node: Self::Node<'a>) -> bool;

    ///All outgoing edges of a node, including the ones labelled with special characters
    fn children<'a>(&'a self, node: Self::Node<'a>) -> Vec<(char, Self::Node<'a>)>;

    ///Number of stored nodes
    fn size(&self) -> usize;

    fn child<'a>(&'a self, node: Self::Node<'a>, c: char) -> Option<Self::Node<'a>> {
        self.children(node)
            .into_iter()
            .find(|(k, _)| *k == c)
            .map(|(_, n)| n)
    }

    ///The node reached by following `prefix` from the root
    fn find_node<'a>(&'a self, prefix: &str) -> Option<Self::Node<'a>> {
        self.walk(self.root(), prefix)
    }

    ///The node reached by following `text` from `node`
    fn walk<'a>(&'a self, node: Self::Node<'a>, text: &str) -> Option<Self::Node<'a>> {
        let mut node = node;
        for c in text.chars() {
            node = self.child(node, c)?;
        }
        Some(node)
    }

    ///Is `word` stored verbatim?
    fn has(&self, word: &str) -> bool {
        match self.find_node(word) {
            Some(node) => self.is_end_of_word(node),
            None => false,
        }
    }

    fn has_prefix(&self, prefix: &str) -> bool {
        self.find_node(prefix).is_some()
    }

    ///Is `word` marked as forbidden (`!word`)?
    fn is_forbidden(&self, word: &str) -> bool {
        let root = self.root();
        match self.child(root, self.info().forbidden_word_prefix) {
            Some(node) => match self.walk(node, word) {
                Some(node) => self.is_end_of_word(node),
                None => false,
            },
            None => false,
        }
    }

    ///Is one of the case and accent insensitive forms of `word` stored (`~word`)?
    fn has_case_insensitive(&self, word: &str) -> bool {
        let root = self.root();
        let Some(node) = self.child(root, self.info().strip_case_and_accents_prefix) else {
            return false;
        };
        case_insensitive_forms(word)
            .iter()
            .any(|form| match self.walk(node, form) {
                Some(n) => self.is_end_of_word(n),
                None => false,
            })
    }

    ///Looks up a word taking compound markers and, optionally, case insensitive forms into
    ///account. `Running+` followed by `+Pod` makes `RunningPod` a word.
    fn find_word(&self, word: &str, options: FindOptions) -> bool {
        let info = self.info();
        let chars: Vec<char> = word.chars().collect();
        if chars.is_empty() {
            return false;
        }
        let root = self.root();
        let ic_root = if options.ignore_case {
            self.child(root, info.strip_case_and_accents_prefix)
        } else {
            None
        };
        let mut compound_roots = Vec::with_capacity(2);
        if options.allow_compounds {
            if let Some(n) = self.child(root, info.compound_character) {
                compound_roots.push((n, false));
            }
            if let Some(n) = ic_root.and_then(|r| self.child(r, info.compound_character)) {
                compound_roots.push((n, true));
            }
        }

        //(node, position, node holds folded forms, at the start of a word part)
        let mut stack = vec![(root, 0usize, false, true)];
        if let Some(n) = ic_root {
            stack.push((n, 0, true, true));
        }
        while let Some((node, pos, folded, fresh)) = stack.pop() {
            if pos == chars.len() {
                if !fresh && self.is_end_of_word(node) {
                    return true;
                }
            } else {
                let c = if folded { fold_char(chars[pos]) } else { chars[pos] };
                if !info.is_special(c) {
                    if let Some(next) = self.child(node, c) {
                        stack.push((next, pos + 1, folded, false));
                    }
                }
            }
            if !fresh && self.child(node, info.compound_character).is_some() {
                for (croot, cfolded) in compound_roots.iter() {
                    stack.push((*croot, pos, *cfolded, true));
                }
            }
        }
        false
    }

    ///Lazily enumerates every stored word, special prefixed entries included
    fn words(&self) -> Words<'_, Self>
    where
        Self: Sized,
    {
        Words::new(self, Some(self.root()), String::new(), false)
    }

    ///Lazily enumerates every stored word that starts with `prefix`. With an empty prefix the
    ///marker subtrees of the root (`~`, `!`, `+`) are left out.
    fn words_with_prefix(&self, prefix: &str) -> Words<'_, Self>
    where
        Self: Sized,
    {
        Words::new(self, self.find_node(prefix), prefix.to_string(), prefix.is_empty())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FindOptions {
    ///Also consult the case and accent insensitive forms
    pub ignore_case: bool,
    ///Follow compound markers
    pub allow_compounds: bool,
}

impl Default for FindOptions {
    fn default() -> Self {
        Self {
            ignore_case: false,
            allow_compounds: true,
        }
    }
}

impl FindOptions {
    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }
    pub fn with_compounds(mut self, allow_compounds: bool) -> Self {
        self.allow_compounds = allow_compounds;
        self
    }
}

struct WalkFrame<N> {
    children: Vec<(char, N)>,
    pos: usize,
    ///byte length of the word up to this frame
    len: usize,
}

///Depth-first word iterator with an explicit stack, see `TrieData::words`
pub struct Words<'a, T: TrieData + 'a> {
    trie: &'a T,
    stack: Vec<WalkFrame<T::Node<'a>>>,
    word: String,
    first: Option<String>,
}

impl<'a, T: TrieData + 'a> Words<'a, T> {
    fn new(trie: &'a T, start: Option<T::Node<'a>>, prefix: String, skip_special: bool) -> Self {
        let mut iter = Words {
            trie,
            stack: Vec::new(),
            word: prefix,
            first: None,
        };
        if let Some(node) = start {
            if !iter.word.is_empty() && trie.is_end_of_word(node) {
                iter.first = Some(iter.word.clone());
            }
            let mut children = trie.children(node);
            if skip_special {
                children.retain(|(c, _)| !trie.info().is_special(*c));
            }
            iter.stack.push(WalkFrame {
                children,
                pos: 0,
                len: iter.word.len(),
            });
        }
        iter
    }
}

impl<'a, T: TrieData + 'a> Iterator for Words<'a, T> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(word) = self.first.take() {
            return Some(word);
        }
        loop {
            let frame = self.stack.last_mut()?;
            if frame.pos >= frame.children.len() {
                self.stack.pop();
                continue;
            }
            let (c, node) = frame.children[frame.pos];
            frame.pos += 1;
            let len = frame.len;
            self.word.truncate(len);
            self.word.push(c);
            let children = self.trie.children(node);
            if !children.is_empty() {
                self.stack.push(WalkFrame {
                    children,
                    pos: 0,
                    len: self.word.len(),
                });
            }
            if self.trie.is_end_of_word(node) {
                return Some(self.word.clone());
            }
        }
    }
}
