use std::collections::HashMap;

use log::debug;

use crate::builder::{TrieBuilder, TrieCursor};
use crate::error::*;
use crate::fasttrie::FastTrie;
use crate::triedata::TrieData;
use crate::types::*;

///First line of the header, makes the file self describing
pub const TRIE_TEXT_SHEBANG: &str = "#!/usr/bin/env cspell-trie reader";
pub const TRIE_TEXT_FORMAT: &str = "TrieXv3";
///Separates the header from the node data
pub const TRIE_TEXT_DATA_MARKER: &str = "__DATA__";

const EOW: char = '$';
const BACK: char = '<';
const REF: char = '#';
const EOR: char = ';';
const ESCAPE: char = '\\';

///A line break is added after this many words or references on one line
const WORDS_PER_LINE: usize = 20;

///Characters that have to be escaped in the node data
fn is_special(c: char) -> bool {
    matches!(c, '\n' | '\r' | '0'..='9') || "`~!@#$%^&*()_-+=[]{};:'\"<>,./?\\|".contains(c)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    ///Radix of the node references, clamped to 10..=36
    pub base: u32,
    ///Written as `#` lines into the header
    pub comment: String,
    ///Repeat small single-word suffixes instead of referencing them. Smaller output, but the
    ///repetitions are separate nodes once loaded.
    pub optimize_simple_references: bool,
    ///Start a new line before each word prefix of up to two characters so that dictionary updates
    ///give readable diffs
    pub add_line_breaks: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            base: 16,
            comment: String::new(),
            optimize_simple_references: false,
            add_line_breaks: true,
        }
    }
}

impl ExportOptions {
    pub fn with_base(mut self, base: u32) -> Self {
        self.base = base;
        self
    }
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }
    pub fn with_simple_references_optimized(mut self, optimize: bool) -> Self {
        self.optimize_simple_references = optimize;
        self
    }
    pub fn with_line_breaks(mut self, add_line_breaks: bool) -> Self {
        self.add_line_breaks = add_line_breaks;
        self
    }
}

///Serializes a trie into the line oriented `TrieXv3` text format.
///
///The data section is a depth-first walk: a character descends, `$` marks the end of a word and
///steps back up, `<` steps back up, and a digit 2-9 following either repeats the step that many
///times in total. `#n;` points the current edge at node `n` written earlier, nodes are numbered
///in the order they are first written, the root being 0 and plain word ends not counting.
///Special characters are escaped with a backslash.
pub fn serialize_trie(trie: &FastTrie, options: &ExportOptions) -> String {
    let radix = options.base.clamp(10, 36);
    let mut out = String::new();
    out.push_str(TRIE_TEXT_SHEBANG);
    out.push('\n');
    out.push_str(TRIE_TEXT_FORMAT);
    out.push('\n');
    out.push_str(&format!("base={}\n", radix));
    if !options.comment.is_empty() {
        for line in options.comment.lines() {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out.push_str("# Data:\n");
    out.push_str(TRIE_TEXT_DATA_MARKER);
    out.push('\n');

    let mut writer = TextWriter {
        trie,
        options,
        radix,
        out,
        ids: HashMap::new(),
        simple: HashMap::new(),
        count: 0,
        last: EOW,
        back: 0,
        words: 0,
        eol: false,
        word_chars: Vec::new(),
    };
    writer.walk(trie.root(), 0);
    writer.flush();
    debug!(
        "serialized trie with {} numbered nodes into {} bytes",
        writer.count,
        writer.out.len()
    );
    writer.out
}

struct TextWriter<'t> {
    trie: &'t FastTrie,
    options: &'t ExportOptions,
    radix: u32,
    out: String,
    ///number of every node written so far
    ids: HashMap<NodeIndex, usize>,
    ///memo of `is_simple`
    simple: HashMap<NodeIndex, bool>,
    count: usize,
    ///`$` or `<`, whichever starts the pending run of back steps
    last: char,
    ///pending back steps
    back: usize,
    ///words on the current line
    words: usize,
    eol: bool,
    word_chars: Vec<char>,
}

impl TextWriter<'_> {
    fn flush(&mut self) {
        while self.back > 0 {
            let n = self.back.min(9);
            self.out.push(self.last);
            if n > 1 {
                self.out.push_str(&n.to_string());
            }
            self.last = BACK;
            self.back -= n;
        }
        if self.eol {
            self.out.push('\n');
            self.eol = false;
            self.words = 0;
        }
    }

    fn end_of_word(&mut self) {
        self.flush();
        //the step back implied by `$` is counted by the back step that follows
        self.last = EOW;
        self.back = 0;
        self.words += 1;
    }

    fn back_step(&mut self) {
        self.back += 1;
    }

    fn line_break(&mut self) {
        self.eol = true;
    }

    fn text(&mut self, text: &str) {
        if self.words >= WORDS_PER_LINE {
            self.eol = true;
        }
        self.flush();
        self.out.push_str(text);
    }

    fn character(&mut self, c: char) {
        let mut escaped = String::with_capacity(4);
        if is_special(c) {
            escaped.push(ESCAPE);
            match c {
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\\' => escaped.push_str("\\\\"),
                _ => escaped.push(c),
            }
        } else {
            escaped.push(c);
        }
        self.text(&escaped);
    }

    fn reference(&mut self, id: usize) {
        let text = format!("{}{}{}", REF, to_radix(id, self.radix), EOR);
        self.text(&text);
        self.words += 1;
    }

    ///A node with a single child that ends a word and has no children of its own
    fn is_simple(&mut self, node: NodeIndex) -> bool {
        if let Some(simple) = self.simple.get(&node) {
            return *simple;
        }
        let children = self.trie.children(node);
        let simple = match children.as_slice() {
            [(_, child)] => {
                self.trie.is_end_of_word(*child) && self.trie.children(*child).is_empty()
            }
            _ => false,
        };
        self.simple.insert(node, simple);
        simple
    }

    fn walk(&mut self, node: NodeIndex, depth: usize) {
        if let Some(id) = self.ids.get(&node).copied() {
            if !self.options.optimize_simple_references || !self.is_simple(node) {
                self.reference(id);
                return;
            }
        }
        let mut children = self.trie.children(node);
        if !children.is_empty() {
            if self.options.add_line_breaks && depth > 0 && depth <= 2 {
                self.line_break();
            }
            self.ids.insert(node, self.count);
            self.count += 1;
            children.sort_by_key(|(c, _)| *c);
            for (c, child) in children {
                self.word_chars.truncate(depth);
                self.word_chars.push(c);
                self.character(c);
                self.walk(child, depth + 1);
                self.back_step();
                if depth == 0 {
                    self.line_break();
                }
            }
        }
        //after the children, so reading can fold it into the back step
        if self.trie.is_end_of_word(node) {
            self.end_of_word();
        }
        if self.options.add_line_breaks {
            let info = self.trie.info();
            let marked = self.word_chars.first().map_or(false, |c| {
                *c == info.strip_case_and_accents_prefix || *c == info.forbidden_word_prefix
            });
            if depth == 2 || (depth == 3 && marked) {
                self.line_break();
            }
        }
    }
}

fn to_radix(mut value: usize, radix: u32) -> String {
    let mut digits = Vec::new();
    loop {
        let digit = (value % radix as usize) as u32;
        //radix is at most 36, so every digit has a character
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        value /= radix as usize;
        if value == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

///Reads a `TrieXv3` text serialization, see `serialize_trie`
pub fn import_trie(text: &str) -> Result<FastTrie> {
    import_trie_with_builder(TrieBuilder::new(), text)
}

///Reads a `TrieXv3` text serialization into an empty builder, which decides the marker
///configuration of the result
pub fn import_trie_with_builder(mut builder: TrieBuilder, text: &str) -> Result<FastTrie> {
    let mut lines = text.lines();
    let mut header: Vec<&str> = Vec::new();
    let mut found_data = false;
    for line in lines.by_ref() {
        let line = line.trim();
        if line == TRIE_TEXT_DATA_MARKER {
            found_data = true;
            break;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        header.push(line);
    }
    if !found_data {
        return Err(unsupported("no data section in trie text"));
    }
    let radix = match header.as_slice() {
        [format, base, ..] if *format == TRIE_TEXT_FORMAT => base
            .strip_prefix("base=")
            .and_then(|radix| radix.parse::<u32>().ok())
            .filter(|radix| (2..=36).contains(radix))
            .ok_or_else(|| {
                TrieError::UnsupportedFormat(format!("invalid trie text base line {:?}", base))
            })?,
        _ => return Err(unsupported("unknown trie text format")),
    };

    {
        let mut reader = TextReader {
            cursor: builder.cursor(),
            radix,
            state: ReadState::Main,
        };
        for line in lines {
            for c in line.chars() {
                reader.feed(c)?;
            }
        }
        reader.finish()?;
    }
    let trie = builder.build();
    debug!("imported trie text into {} nodes", trie.size());
    Ok(trie)
}

fn unsupported(reason: &str) -> TrieError {
    TrieError::UnsupportedFormat(reason.to_string())
}

enum ReadState {
    Main,
    ///after `$` or `<`, digits repeat the step
    Back,
    ///after `\`
    Escape,
    ///after `\\`
    EscapeSequence,
    ///inside `#...;`
    Reference(String),
}

struct TextReader<'b> {
    cursor: TrieCursor<'b>,
    radix: u32,
    state: ReadState,
}

impl TextReader<'_> {
    fn back_step(&mut self, steps: usize) -> Result<()> {
        if steps > self.cursor.depth() {
            return Err(unsupported("trie text steps back beyond the root"));
        }
        self.cursor.back_step(steps);
        Ok(())
    }

    fn feed(&mut self, c: char) -> Result<()> {
        match std::mem::replace(&mut self.state, ReadState::Main) {
            ReadState::Reference(mut digits) => {
                if c == EOR {
                    let node_ref = usize::from_str_radix(&digits, self.radix).map_err(|_| {
                        TrieError::UnsupportedFormat(format!(
                            "invalid node reference {:?} in trie text",
                            digits
                        ))
                    })?;
                    //the shared end-of-word leaf takes a number in the cursor, not in the text
                    self.cursor.try_reference(node_ref + 1)?;
                } else {
                    digits.push(c);
                    self.state = ReadState::Reference(digits);
                }
            }
            ReadState::Escape => {
                if c == ESCAPE {
                    self.state = ReadState::EscapeSequence;
                } else {
                    self.cursor.insert_char(c);
                }
            }
            ReadState::EscapeSequence => {
                let c = match c {
                    'n' => '\n',
                    'r' => '\r',
                    '\\' => '\\',
                    c => c,
                };
                self.cursor.insert_char(c);
            }
            ReadState::Back => match c {
                BACK => {
                    self.back_step(1)?;
                    self.state = ReadState::Back;
                }
                '2'..='9' => {
                    let steps = c as usize - '0' as usize;
                    self.back_step(steps - 1)?;
                    self.state = ReadState::Back;
                }
                c => self.feed(c)?,
            },
            ReadState::Main => match c {
                EOW => {
                    if self.cursor.depth() == 0 {
                        return Err(unsupported("end of word marker at the root in trie text"));
                    }
                    self.cursor.mark_eow();
                    self.back_step(1)?;
                    self.state = ReadState::Back;
                }
                BACK => {
                    self.back_step(1)?;
                    self.state = ReadState::Back;
                }
                REF => self.state = ReadState::Reference(String::new()),
                ESCAPE => self.state = ReadState::Escape,
                '\n' | '\r' => {}
                c => self.cursor.insert_char(c),
            },
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        match self.state {
            ReadState::Main | ReadState::Back => Ok(()),
            ReadState::Reference(_) => Err(unsupported("unterminated reference in trie text")),
            ReadState::Escape | ReadState::EscapeSequence => {
                Err(unsupported("unterminated escape in trie text"))
            }
        }
    }
}
