use std::collections::HashMap;

use crate::types::*;

//A character id is stored in the 8 bit character field of a node slot. Ids below SEQ_SPECIAL
//take a single slot, larger ids are spread over a short sequence of slots that starts with one
//of the escape markers below.

///First id that needs more than one slot
pub const SEQ_SPECIAL: CharId = 0xf8;
///`[SEQ_INDEX_8BIT, id - SEQ_SPECIAL]`
pub const SEQ_INDEX_8BIT: CharId = 0xf9;
///`[SEQ_INDEX_14BIT, (id >> 7) & 0x7f, id & 0x7f]`
pub const SEQ_INDEX_14BIT: CharId = 0xfa;
///`[SEQ_INDEX_21BIT, (id >> 14) & 0x7f, (id >> 7) & 0x7f, id & 0x7f]`
pub const SEQ_INDEX_21BIT: CharId = 0xfb;

const SEQ_8BIT_LIMIT: CharId = SEQ_SPECIAL + 0x100;
const SEQ_14BIT_LIMIT: CharId = 1 << 14;
const SEQ_21BIT_LIMIT: CharId = 1 << 21;

///Appends the slot sequence of a character id to `out`
pub fn encode_char_id(id: CharId, out: &mut Vec<CharId>) {
    assert!(id < SEQ_21BIT_LIMIT, "character id {} is out of range", id);
    if id < SEQ_SPECIAL {
        out.push(id);
    } else if id < SEQ_8BIT_LIMIT {
        out.extend_from_slice(&[SEQ_INDEX_8BIT, id - SEQ_SPECIAL]);
    } else if id < SEQ_14BIT_LIMIT {
        out.extend_from_slice(&[SEQ_INDEX_14BIT, (id >> 7) & 0x7f, id & 0x7f]);
    } else {
        out.extend_from_slice(&[
            SEQ_INDEX_21BIT,
            (id >> 14) & 0x7f,
            (id >> 7) & 0x7f,
            id & 0x7f,
        ]);
    }
}

///Accumulates the slots of a multi-slot sequence back into a character id. The state is small
///and `Copy` so that tree walks can carry one per branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeqDecoder {
    remaining: u8,
    shift: u8,
    base: CharId,
    value: CharId,
}

impl SeqDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    ///Is the decoder in the middle of a sequence?
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }

    ///Feed the next slot value, returns the character id once a sequence is complete
    pub fn decode(&mut self, slot: CharId) -> Option<CharId> {
        if self.remaining == 0 {
            let (remaining, shift, base) = match slot {
                SEQ_INDEX_8BIT => (1, 8, SEQ_SPECIAL),
                SEQ_INDEX_14BIT => (2, 7, 0),
                SEQ_INDEX_21BIT => (3, 7, 0),
                _ => return Some(slot),
            };
            *self = Self {
                remaining,
                shift,
                base,
                value: 0,
            };
            return None;
        }
        self.value = (self.value << self.shift) | slot;
        self.remaining -= 1;
        if self.remaining == 0 {
            Some(self.base + self.value)
        } else {
            None
        }
    }
}

///Assigns character ids while a trie is being built. Ids are handed out in order of first use,
///id 0 is never assigned.
#[derive(Clone, Debug)]
pub struct CharIndexBuilder {
    chars: Vec<char>,
    encoder: HashMap<char, CharId>,
}

impl Default for CharIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CharIndexBuilder {
    pub fn new() -> Self {
        Self {
            chars: vec!['\0'],
            encoder: HashMap::new(),
        }
    }

    ///Returns the id of a character, allocating the next free id for unseen characters
    pub fn get_char_index(&mut self, c: char) -> CharId {
        if let Some(id) = self.encoder.get(&c) {
            return *id;
        }
        let id = self.chars.len() as CharId;
        self.chars.push(c);
        self.encoder.insert(c, id);
        id
    }

    pub fn index_of(&self, c: char) -> Option<CharId> {
        self.encoder.get(&c).copied()
    }

    pub fn contains(&self, c: char) -> bool {
        self.encoder.contains_key(&c)
    }

    ///Appends the slot sequence of a character to `out`
    pub fn push_char_seq(&mut self, c: char, out: &mut Vec<CharId>) {
        let id = self.get_char_index(c);
        encode_char_id(id, out);
    }

    pub fn to_sequence(&mut self, word: &str) -> Vec<CharId> {
        let mut seq = Vec::with_capacity(word.len());
        for c in word.chars() {
            self.push_char_seq(c, &mut seq);
        }
        seq
    }

    ///Number of assigned ids, not counting the reserved one
    pub fn len(&self) -> usize {
        self.chars.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn build(&self) -> CharIndex {
        CharIndex {
            chars: self.chars.clone(),
            encoder: self.encoder.clone(),
        }
    }
}

///The frozen alphabet of a trie
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharIndex {
    chars: Vec<char>,
    encoder: HashMap<char, CharId>,
}

impl CharIndex {
    ///Rebuilds an index from its char table, entry 0 is the reserved id and is ignored
    pub fn from_table(table: Vec<char>) -> Self {
        let mut encoder = HashMap::with_capacity(table.len());
        for (id, c) in table.iter().enumerate().skip(1) {
            encoder.entry(*c).or_insert(id as CharId);
        }
        Self {
            chars: table,
            encoder,
        }
    }

    ///The char table indexed by id
    pub fn table(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index_of(&self, c: char) -> Option<CharId> {
        self.encoder.get(&c).copied()
    }

    pub fn char_at(&self, id: CharId) -> Option<char> {
        if id == 0 {
            return None;
        }
        self.chars.get(id as usize).copied()
    }

    ///Slot sequence of a single character, `None` if the character is not in the alphabet
    pub fn char_seq(&self, c: char) -> Option<Vec<CharId>> {
        let id = self.index_of(c)?;
        let mut seq = Vec::with_capacity(1);
        encode_char_id(id, &mut seq);
        Some(seq)
    }

    ///Slot sequence of a word, `None` if any of its characters is not in the alphabet
    pub fn to_sequence(&self, word: &str) -> Option<Vec<CharId>> {
        let mut seq = Vec::with_capacity(word.len());
        for c in word.chars() {
            encode_char_id(self.index_of(c)?, &mut seq);
        }
        Some(seq)
    }

    ///Inverse of `to_sequence`
    pub fn from_sequence(&self, seq: &[CharId]) -> Option<String> {
        let mut decoder = SeqDecoder::new();
        let mut word = String::with_capacity(seq.len());
        for slot in seq {
            if let Some(id) = decoder.decode(*slot) {
                word.push(self.char_at(id)?);
            }
        }
        if decoder.is_pending() {
            None
        } else {
            Some(word)
        }
    }
}
