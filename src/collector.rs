use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::types::*;

///Extra cost for a word of a multi-word suggestion, indexed by its length in characters
pub const WORD_LENGTH_COST: [Cost; 4] = [0, 50, 25, 5];

///Extra cost for every word of a suggestion after the first
pub const EXTRA_WORD_COST: Cost = 5;

///A lazily produced stream of suggestions that can prune with the collector's live bound
pub trait SuggestionSource {
    ///Produces the next suggestion with a cost of at most `max_cost`, `None` once the source is
    ///exhausted or `deadline` has passed
    fn next_suggestion(
        &mut self,
        max_cost: Cost,
        deadline: Option<Instant>,
    ) -> Option<SuggestionResult>;

    ///Did the source stop early because of the deadline?
    fn timed_out(&self) -> bool {
        false
    }
}

///Predicate over `(word, cost)`, suggestions it rejects are dropped
pub type WordFilter<'f> = Box<dyn Fn(&str, Cost) -> bool + 'f>;

#[derive(Clone, Copy, Debug)]
struct Entry {
    cost: Cost,
    ///discovery order, ties are ranked by it
    seq: u64,
}

///Keeps the best `num_suggestions` suggestions seen so far. `max_cost` starts at a bound derived
///from the word length and drops to the worst retained cost once the set is full, so the search
///feeding the collector can prune everything that would not make it in anyway.
pub struct SuggestionCollector<'f> {
    word: String,
    num_suggestions: usize,
    change_limit: u32,
    separators: Vec<char>,
    max_cost: Cost,
    entries: HashMap<String, Entry>,
    seq: u64,
    filters: Vec<WordFilter<'f>>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    timed_out: bool,
}

impl<'f> SuggestionCollector<'f> {
    pub fn new(word: &str, options: &SuggestionOptions) -> Self {
        let len = word.chars().count();
        let mut separators = vec![' '];
        separators.extend(options.compound_separator.chars());
        Self {
            word: word.to_string(),
            num_suggestions: options.num_suggestions,
            change_limit: options.change_limit,
            separators,
            max_cost: options.costs.collector_limit(len, options.change_limit),
            entries: HashMap::new(),
            seq: 0,
            filters: Vec::new(),
            timeout: options.timeout,
            deadline: None,
            timed_out: false,
        }
    }

    ///Adds a predicate every suggestion has to pass
    pub fn with_filter(mut self, filter: impl Fn(&str, Cost) -> bool + 'f) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn num_suggestions(&self) -> usize {
        self.num_suggestions
    }

    pub fn change_limit(&self) -> u32 {
        self.change_limit
    }

    ///The current pruning bound
    pub fn max_cost(&self) -> Cost {
        self.max_cost
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    ///Multi-word suggestions pay for every extra word and for very short words
    fn word_length_cost(&self, word: &str) -> Cost {
        let words: Vec<&str> = word.split(self.separators.as_slice()).collect();
        if words.len() < 2 {
            return 0;
        }
        let lengths: Cost = words
            .iter()
            .map(|w| {
                WORD_LENGTH_COST
                    .get(w.chars().count())
                    .copied()
                    .unwrap_or(0)
            })
            .sum();
        lengths + (words.len() as Cost - 1) * EXTRA_WORD_COST
    }

    ///Offers a suggestion, returns the (possibly lowered) bound
    pub fn add(&mut self, suggestion: SuggestionResult) -> Cost {
        if self.num_suggestions == 0 {
            return self.max_cost;
        }
        let cost = suggestion.cost + self.word_length_cost(&suggestion.word);
        if cost > self.max_cost {
            return self.max_cost;
        }
        if !self.filters.iter().all(|filter| filter(&suggestion.word, cost)) {
            return self.max_cost;
        }
        match self.entries.get_mut(&suggestion.word) {
            Some(known) => known.cost = known.cost.min(cost),
            None => {
                self.seq += 1;
                self.entries.insert(
                    suggestion.word,
                    Entry {
                        cost,
                        seq: self.seq,
                    },
                );
            }
        }
        if self.entries.len() >= self.num_suggestions {
            self.drop_worst();
        }
        self.max_cost
    }

    ///Trims to the best `num_suggestions` and lowers the bound to the worst of them
    fn drop_worst(&mut self) {
        let mut ranked = self.ranked();
        for (word, _) in ranked.drain(self.num_suggestions..) {
            self.entries.remove(&word);
        }
        if let Some((_, worst)) = ranked.last() {
            self.max_cost = worst.cost;
        }
    }

    fn ranked(&self) -> Vec<(String, Entry)> {
        let mut ranked: Vec<(String, Entry)> = self
            .entries
            .iter()
            .map(|(word, entry)| (word.clone(), *entry))
            .collect();
        ranked.sort_by(|(_, a), (_, b)| a.cost.cmp(&b.cost).then(a.seq.cmp(&b.seq)));
        ranked
    }

    ///The deadline of this collector, started by the first call that needs it
    fn deadline(&mut self) -> Option<Instant> {
        if self.deadline.is_none() {
            self.deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        }
        self.deadline
    }

    ///Drains a suggestion source, feeding it the live bound
    pub fn collect<S: SuggestionSource>(&mut self, source: &mut S) {
        if self.num_suggestions == 0 {
            return;
        }
        let deadline = self.deadline();
        while let Some(suggestion) = source.next_suggestion(self.max_cost, deadline) {
            self.add(suggestion);
        }
        if source.timed_out() {
            self.timed_out = true;
        }
    }

    ///Drains a plain iterator of suggestions, stops at the deadline
    pub fn collect_iter<I>(&mut self, suggestions: I)
    where
        I: IntoIterator<Item = SuggestionResult>,
    {
        if self.num_suggestions == 0 {
            return;
        }
        let deadline = self.deadline();
        for suggestion in suggestions {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    self.timed_out = true;
                    break;
                }
            }
            self.add(suggestion);
        }
    }

    ///The retained suggestions, by cost and then by discovery order
    pub fn suggestions(&self) -> Vec<SuggestionResult> {
        let mut ranked = self.ranked();
        ranked.truncate(self.num_suggestions);
        ranked
            .into_iter()
            .map(|(word, entry)| SuggestionResult::new(word, entry.cost))
            .collect()
    }
}
