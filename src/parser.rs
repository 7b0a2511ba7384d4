use std::collections::{HashSet, VecDeque};

use crate::normalize::*;
use crate::types::*;

///Comments containing this directive switch parser options for the lines that follow,
///e.g. `# cspell-dictionary: split, no-generate-alternatives`
pub const PARSER_DIRECTIVE: &str = "cspell-dictionary:";

///Options of the dictionary line parser
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    pub compound_character: char,
    ///`*word` and `word*` expand to the plain word and its compound forms
    pub optional_compound_character: char,
    pub forbidden_prefix: char,
    pub case_insensitive_prefix: char,
    ///Words with this prefix are stored as is, without case insensitive forms
    pub keep_case_prefix: char,
    pub comment_character: char,
    ///Generate the case and accent insensitive forms of every word
    pub strip_case_and_accents: bool,
    ///Also generate the insensitive forms of forbidden words
    pub strip_case_and_accents_on_forbidden: bool,
    ///Split lines on whitespace, `,` and `;`
    pub split: bool,
    ///When splitting, also keep the unsplit line
    pub split_keep_both: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            compound_character: COMPOUND_CHARACTER,
            optional_compound_character: OPTIONAL_COMPOUND_CHARACTER,
            forbidden_prefix: FORBIDDEN_PREFIX,
            case_insensitive_prefix: CASE_INSENSITIVE_PREFIX,
            keep_case_prefix: KEEP_CASE_PREFIX,
            comment_character: LINE_COMMENT,
            strip_case_and_accents: true,
            strip_case_and_accents_on_forbidden: false,
            split: false,
            split_keep_both: false,
        }
    }
}

impl ParseOptions {
    pub fn with_strip_case_and_accents(mut self, strip: bool) -> Self {
        self.strip_case_and_accents = strip;
        self
    }
    pub fn with_strip_case_and_accents_on_forbidden(mut self, strip: bool) -> Self {
        self.strip_case_and_accents_on_forbidden = strip;
        self
    }
    pub fn with_split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }
    pub fn with_split_keep_both(mut self, keep_both: bool) -> Self {
        self.split_keep_both = keep_both;
        self
    }

    ///Marker configuration of a trie built from the parsed words
    pub fn trie_info(&self) -> TrieInfo {
        TrieInfo {
            compound_character: self.compound_character,
            strip_case_and_accents_prefix: self.case_insensitive_prefix,
            forbidden_word_prefix: self.forbidden_prefix,
            is_case_aware: false,
        }
    }
}

///Turns dictionary source lines into the words stored in the trie. A single line may expand into
///several words (optional compounds, case insensitive forms), so the output is buffered.
pub struct DictionaryLineParser<I> {
    lines: I,
    options: ParseOptions,
    pending: VecDeque<String>,
}

impl<I, S> DictionaryLineParser<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    pub fn new(lines: I, options: &ParseOptions) -> Self {
        Self {
            lines,
            options: options.clone(),
            pending: VecDeque::new(),
        }
    }

    fn parse_line(&mut self, line: &str) {
        let line = self.strip_comment(line);
        let pieces: Vec<&str> = if self.options.split {
            let mut pieces: Vec<&str> = line
                .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
                .collect();
            if self.options.split_keep_both {
                pieces.push(line);
            }
            pieces
        } else {
            vec![line]
        };
        for piece in pieces {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            for word in self.expand_optional_compounds(piece) {
                for form in self.normalized_forms(&word) {
                    let form = self.remove_double_prefix(form);
                    self.pending.push_back(form);
                }
            }
        }
    }

    ///Drops the comment part of a line and applies any parser directive found in it
    fn strip_comment<'l>(&mut self, line: &'l str) -> &'l str {
        let Some(idx) = line.find(self.options.comment_character) else {
            return line;
        };
        if let Some(directive) = line[idx..].find(PARSER_DIRECTIVE) {
            let flags = &line[idx + directive + PARSER_DIRECTIVE.len()..];
            for flag in flags.split(|c: char| c.is_whitespace() || c == ',' || c == ';') {
                match flag.trim() {
                    "split" => self.options.split = true,
                    "no-split" => self.options.split = false,
                    "generate-alternatives" => self.options.strip_case_and_accents = true,
                    "no-generate-alternatives" => self.options.strip_case_and_accents = false,
                    _ => {}
                }
            }
        }
        &line[..idx]
    }

    fn expand_optional_compounds(&self, word: &str) -> Vec<String> {
        let optional = self.options.optional_compound_character;
        let compound = self.options.compound_character;
        let prefixed: Vec<String> = match word.strip_prefix(optional) {
            Some(rest) => vec![rest.to_string(), format!("{}{}", compound, rest)],
            None => vec![word.to_string()],
        };
        let mut words = Vec::with_capacity(prefixed.len() * 2);
        for w in prefixed {
            match w.strip_suffix(optional) {
                Some(rest) => {
                    words.push(rest.to_string());
                    words.push(format!("{}{}", rest, compound));
                }
                None => words.push(w),
            }
        }
        words
    }

    fn normalized_forms(&self, word: &str) -> Vec<String> {
        let stripped = word
            .strip_prefix(self.options.keep_case_prefix)
            .unwrap_or(word);
        let normalized = normalize_word(stripped);
        let mut forms = vec![normalized];
        if self.options.strip_case_and_accents && !self.keeps_case(word) {
            for form in case_insensitive_forms(&forms[0]) {
                if form != forms[0] {
                    let form = format!("{}{}", self.options.case_insensitive_prefix, form);
                    if !forms.contains(&form) {
                        forms.push(form);
                    }
                }
            }
        }
        forms
    }

    ///Words that never get case insensitive forms
    fn keeps_case(&self, word: &str) -> bool {
        match word.chars().next() {
            Some(c) if c == self.options.case_insensitive_prefix => true,
            Some(c) if c == self.options.keep_case_prefix => true,
            Some(c) if c == self.options.forbidden_prefix => {
                !self.options.strip_case_and_accents_on_forbidden
            }
            _ => false,
        }
    }

    fn remove_double_prefix(&self, word: String) -> String {
        let prefix = self.options.case_insensitive_prefix;
        let mut chars = word.chars();
        if chars.next() == Some(prefix) && chars.next() == Some(prefix) {
            word[prefix.len_utf8()..].to_string()
        } else {
            word
        }
    }
}

impl<I, S> Iterator for DictionaryLineParser<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(word) = self.pending.pop_front() {
                return Some(word);
            }
            let line = self.lines.next()?;
            self.parse_line(line.as_ref());
        }
    }
}

///Parses dictionary text into its distinct words, in order of first occurrence
pub fn parse_dictionary(text: &str, options: &ParseOptions) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    DictionaryLineParser::new(text.lines(), options)
        .filter(|word| seen.insert(word.clone()))
        .collect()
}
