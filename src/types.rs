use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::weightmap::WeightMap;

///Integer id of a character in the alphabet (see `CharIndex`), 0 is reserved
pub type CharId = u32;

///Index of a node in a node table
pub type NodeIndex = u32;

///Accumulated edit cost of a suggestion, lower is better
pub type Cost = u32;

///The root node is always the first node of a node table
pub const ROOT_NODE: NodeIndex = 0;

///The canonical shared end-of-word leaf, every word that ends without further children points here
pub const EOW_NODE: NodeIndex = 1;

///Number of bits a child reference is shifted by within a node slot
pub const NODE_CHILD_SHIFT: u32 = 8;

///Mask selecting the character id part of a node slot
pub const NODE_CHAR_MASK: u32 = (1 << NODE_CHILD_SHIFT) - 1;

///Largest child reference that fits a node slot
pub const MAX_CHILD_REF: u32 = u32::MAX >> NODE_CHILD_SHIFT;

bitflags! {
    ///Flag bits held in slot 0 of every node
    pub struct NodeFlags: u32 {
        ///A complete word ends at this node
        const EOW = 0b0000_0001;
    }
}

pub const COMPOUND_CHARACTER: char = '+';
pub const OPTIONAL_COMPOUND_CHARACTER: char = '*';
pub const CASE_INSENSITIVE_PREFIX: char = '~';
pub const FORBIDDEN_PREFIX: char = '!';
pub const KEEP_CASE_PREFIX: char = '=';
pub const LINE_COMMENT: char = '#';

///Describes the special characters a trie uses for its markers
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrieInfo {
    ///Marks where a word may be joined with another one (`Running+`, `+Pod`)
    pub compound_character: char,
    ///Prefix of the case and accent insensitive forms (`~running`)
    pub strip_case_and_accents_prefix: char,
    ///Prefix of forbidden words (`!walkingtree`)
    pub forbidden_word_prefix: char,
    ///Does the trie hold case insensitive forms next to the exact ones?
    pub is_case_aware: bool,
}

impl Default for TrieInfo {
    fn default() -> Self {
        Self {
            compound_character: COMPOUND_CHARACTER,
            strip_case_and_accents_prefix: CASE_INSENSITIVE_PREFIX,
            forbidden_word_prefix: FORBIDDEN_PREFIX,
            is_case_aware: false,
        }
    }
}

impl TrieInfo {
    pub fn with_case_aware(mut self, case_aware: bool) -> Self {
        self.is_case_aware = case_aware;
        self
    }

    ///Characters that are markers rather than letters, they are never suggested
    pub fn is_special(&self, c: char) -> bool {
        c == self.compound_character
            || c == self.strip_case_and_accents_prefix
            || c == self.forbidden_word_prefix
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum CompoundMethod {
    ///Only natural compounds (marked in the dictionary) are considered
    None,
    ///Any two words may be joined, rendered with the compound separator
    JoinWords,
    ///Any two words may be joined, rendered with a space
    SeparateWords,
}

impl Default for CompoundMethod {
    fn default() -> Self {
        CompoundMethod::None
    }
}

///The numeric cost table of the suggestion search. The values are empirically tuned and are
///meant to be carried along as dictionary configuration.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditCosts {
    ///Cost of an insert, delete or substitution at the start of a word, it drops by one per position
    pub base_cost: Cost,
    ///Added to edits of the very first letter
    pub first_letter_penalty: Cost,
    ///Swapping two adjacent letters
    pub swap_cost: Cost,
    ///Dropping one letter of a doubled letter
    pub duplicate_letter_cost: Cost,
    ///Substituting a letter with an accented form of itself
    pub visually_similar_cost: Cost,
    ///Changing the case of the first letter
    pub first_letter_case_cost: Cost,
    ///Changing the case of any other letter
    pub case_cost: Cost,
    ///Splitting the input into two words (see `CompoundMethod`)
    pub word_break_cost: Cost,
    ///Following a compound marker of the dictionary
    pub compound_cost: Cost,
    ///The search limit is `base_cost * min(len * factor, change_limit)`
    pub word_length_cost_factor: f64,
    ///The collector limit is `base_cost * min(len * scale, change_limit)`
    pub max_allowed_cost_scale: f64,
}

impl Default for EditCosts {
    fn default() -> Self {
        Self {
            base_cost: 100,
            first_letter_penalty: 5,
            swap_cost: 75,
            duplicate_letter_cost: 80,
            visually_similar_cost: 1,
            first_letter_case_cost: 1,
            case_cost: 2,
            word_break_cost: 99,
            compound_cost: 0,
            word_length_cost_factor: 0.5,
            max_allowed_cost_scale: 1.03 * 0.5,
        }
    }
}

impl EditCosts {
    ///Cost of a plain insert, delete or substitution at input position `index`
    pub fn edit_cost(&self, index: usize) -> Cost {
        let discount = (index as Cost).min(self.base_cost / 2);
        let cost = self.base_cost - discount;
        if index == 0 {
            cost + self.first_letter_penalty
        } else {
            cost
        }
    }

    ///Cost of changing only the case of a letter at input position `index`
    pub fn case_change_cost(&self, index: usize) -> Cost {
        if index == 0 {
            self.first_letter_case_cost
        } else {
            self.case_cost
        }
    }

    ///Upper bound on the cost of a suggestion for a word of `len` characters
    pub fn search_limit(&self, len: usize, change_limit: u32) -> Cost {
        scaled_limit(self.base_cost, len, self.word_length_cost_factor, change_limit)
    }

    ///Initial `maxCost` of a collector for a word of `len` characters
    pub fn collector_limit(&self, len: usize, change_limit: u32) -> Cost {
        scaled_limit(self.base_cost, len, self.max_allowed_cost_scale, change_limit)
    }
}

fn scaled_limit(base: Cost, len: usize, factor: f64, change_limit: u32) -> Cost {
    let edits = (len as f64 * factor).min(change_limit as f64);
    (base as f64 * edits).floor() as Cost
}

pub const DEFAULT_NUM_SUGGESTIONS: usize = 10;
pub const DEFAULT_CHANGE_LIMIT: u32 = 5;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct SuggestionOptions {
    ///Maximum number of suggestions to return, 0 yields no suggestions at all
    pub num_suggestions: usize,

    ///`Some(true)`: case is irrelevant. `Some(false)`: case changes cost as much as any other
    ///substitution. `None`: case insensitive matches are found but exact case is preferred.
    pub ignore_case: Option<bool>,

    ///Maximum number of edit operations in a single suggestion
    pub change_limit: u32,

    ///Whether arbitrary words may be joined to match the input
    pub compound_method: CompoundMethod,

    ///Rendered between joined words for `CompoundMethod::JoinWords`
    pub compound_separator: String,

    ///Cooperative deadline for the search, partial results are returned when it expires
    pub timeout: Option<Duration>,

    pub costs: EditCosts,

    ///Locale specific cost overrides
    pub weight_map: Option<Arc<WeightMap>>,
}

impl Default for SuggestionOptions {
    fn default() -> Self {
        Self {
            num_suggestions: DEFAULT_NUM_SUGGESTIONS,
            ignore_case: None,
            change_limit: DEFAULT_CHANGE_LIMIT,
            compound_method: CompoundMethod::None,
            compound_separator: COMPOUND_CHARACTER.to_string(),
            timeout: Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            costs: EditCosts::default(),
            weight_map: None,
        }
    }
}

impl SuggestionOptions {
    pub fn with_num_suggestions(mut self, num_suggestions: usize) -> Self {
        self.num_suggestions = num_suggestions;
        self
    }
    pub fn with_ignore_case(mut self, ignore_case: Option<bool>) -> Self {
        self.ignore_case = ignore_case;
        self
    }
    pub fn with_change_limit(mut self, change_limit: u32) -> Self {
        self.change_limit = change_limit;
        self
    }
    pub fn with_compound_method(mut self, method: CompoundMethod) -> Self {
        self.compound_method = method;
        self
    }
    pub fn with_compound_separator(mut self, separator: &str) -> Self {
        self.compound_separator = separator.to_string();
        self
    }
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn with_costs(mut self, costs: EditCosts) -> Self {
        self.costs = costs;
        self
    }
    pub fn with_weight_map(mut self, weight_map: Arc<WeightMap>) -> Self {
        self.weight_map = Some(weight_map);
        self
    }

    ///The text inserted between two words joined by the search
    pub fn word_separator(&self) -> &str {
        match self.compound_method {
            CompoundMethod::SeparateWords => " ",
            _ => self.compound_separator.as_str(),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SuggestionResult {
    pub word: String,
    pub cost: Cost,
}

impl SuggestionResult {
    pub fn new(word: impl Into<String>, cost: Cost) -> Self {
        Self {
            word: word.into(),
            cost,
        }
    }
}
