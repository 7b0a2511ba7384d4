use std::sync::Arc;

use log::debug;

pub mod types;
pub mod error;
pub mod charindex;
pub mod normalize;
pub mod triedata;
pub mod builder;
pub mod fasttrie;
pub mod blob;
pub mod textformat;
pub mod trienode;
pub mod parser;
pub mod weightmap;
pub mod collector;
pub mod suggest;

pub use crate::types::*;
pub use crate::error::*;
pub use crate::charindex::*;
pub use crate::normalize::*;
pub use crate::triedata::*;
pub use crate::builder::*;
pub use crate::fasttrie::*;
pub use crate::blob::*;
pub use crate::textformat::*;
pub use crate::trienode::*;
pub use crate::parser::*;
pub use crate::weightmap::*;
pub use crate::collector::*;
pub use crate::suggest::*;

///A spelling dictionary: a compiled trie plus the locale's suggestion costs
#[derive(Clone, Debug)]
pub struct Dictionary {
    trie: FastTrie,

    ///Cost overrides used when the suggestion options do not bring their own
    weight_map: Option<Arc<WeightMap>>,
}

impl Dictionary {
    pub fn new(trie: FastTrie) -> Self {
        Self {
            trie,
            weight_map: None,
        }
    }

    ///Builds a dictionary from words that are stored verbatim, no dictionary syntax is applied
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(TrieBuilder::from_word_list(words))
    }

    ///Builds a dictionary from dictionary source text (one entry per line, see `ParseOptions`)
    pub fn parse(text: &str) -> Self {
        Self::parse_with_options(text, &ParseOptions::default())
    }

    pub fn parse_with_options(text: &str, options: &ParseOptions) -> Self {
        let words = parse_dictionary(text, options);
        debug!("parsed {} dictionary entries", words.len());
        let mut builder = TrieBuilder::new().with_info(options.trie_info());
        builder.insert_words(words.iter());
        Self::new(builder.build())
    }

    ///Loads a precompiled dictionary
    pub fn from_blob(buffer: &[u8]) -> Result<Self> {
        Ok(Self::new(FastTrie::decode(buffer)?))
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        self.trie.encode()
    }

    ///Loads a dictionary from the `TrieXv3` text serialization
    pub fn from_trie_text(text: &str) -> Result<Self> {
        Ok(Self::new(import_trie(text)?))
    }

    pub fn to_trie_text(&self, options: &ExportOptions) -> String {
        serialize_trie(&self.trie, options)
    }

    pub fn with_weight_map(mut self, weight_map: WeightMap) -> Self {
        self.weight_map = Some(Arc::new(weight_map));
        self
    }

    pub fn trie(&self) -> &FastTrie {
        &self.trie
    }

    pub fn info(&self) -> &TrieInfo {
        self.trie.info()
    }

    pub fn weight_map(&self) -> Option<&WeightMap> {
        self.weight_map.as_deref()
    }

    ///Is `word` correctly spelled? Compounds count, forbidden words do not.
    pub fn has(&self, word: &str) -> bool {
        self.trie.find_word(word, FindOptions::default()) && !self.trie.is_forbidden(word)
    }

    ///Like `has`, but also accepts words that only match up to case and accents
    pub fn has_ignore_case(&self, word: &str) -> bool {
        self.trie
            .find_word(word, FindOptions::default().with_ignore_case(true))
            && !self.trie.is_forbidden(word)
    }

    pub fn is_forbidden(&self, word: &str) -> bool {
        self.trie.is_forbidden(word)
    }

    fn is_plain(&self, word: &str) -> bool {
        let info = self.trie.info();
        !word.chars().any(|c| info.is_special(c))
    }

    ///All plain words, entries carrying markers are left out
    pub fn words(&self) -> impl Iterator<Item = String> + '_ {
        self.trie.words().filter(move |w| self.is_plain(w))
    }

    ///Plain words starting with `prefix`
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        self.trie
            .words_with_prefix(prefix)
            .filter(|w| self.is_plain(w))
            .collect()
    }

    fn options_for(&self, options: &SuggestionOptions) -> SuggestionOptions {
        let mut options = options.clone();
        if options.weight_map.is_none() {
            options.weight_map = self.weight_map.clone();
        }
        options
    }

    ///Ranked corrections for `word`
    pub fn suggest(&self, word: &str, options: &SuggestionOptions) -> Vec<String> {
        self.suggest_with_cost(word, options)
            .into_iter()
            .map(|s| s.word)
            .collect()
    }

    ///Ranked corrections with their costs, cost 0 means `word` is in the dictionary
    pub fn suggest_with_cost(&self, word: &str, options: &SuggestionOptions) -> Vec<SuggestionResult> {
        suggest(&self.trie, word, &self.options_for(options))
    }
}
