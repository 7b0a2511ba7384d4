use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};

use crate::collector::*;
use crate::normalize::*;
use crate::triedata::TrieData;
use crate::types::*;
use crate::weightmap::*;

///The deadline is checked every this many expanded states
pub const DEADLINE_CHECK_INTERVAL: usize = 256;

///Edge label of the cost trie. Compound and break jumps carry the root they jump to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Label {
    Char(char),
    Compound(u8),
    Break(u8),
}

///What a step contributes to the suggested word
#[derive(Clone, Debug)]
enum Segment {
    None,
    Char(char),
    Text(Box<str>),
}

#[derive(Clone, Debug)]
struct PathNode<N> {
    node: N,
    ///position in the input
    index: usize,
    cost: Cost,
    edits: u32,
    seg: Segment,
    parent: Option<usize>,
    cost_node: usize,
    ///at the start of a word part, nothing was consumed from the current root yet
    fresh: bool,
}

///Search states with the same output path. `best` holds, per input position, the
///`(edits, cost)` pairs that were already queued.
#[derive(Clone, Debug, Default)]
struct CostTrieNode {
    children: HashMap<Label, usize>,
    best: HashMap<usize, Vec<(u32, Cost)>>,
}

///A candidate state before it is queued
struct Step<N> {
    node: N,
    index: usize,
    cost: Cost,
    edits: u32,
    seg: Segment,
    fresh: bool,
}

///The trie nodes the search starts from or jumps to
struct Roots<N> {
    exact: N,
    ignore_case: Option<N>,
    compound: Option<N>,
    compound_ignore_case: Option<N>,
}

///Best-first search for the dictionary words closest to an input word.
///
///A state is a trie node plus a position in the input. Moves match, substitute, insert, delete or
///swap letters, each with a cost from `EditCosts` (or the weight map). States are expanded cheapest
///first and states above the bound handed in by the consumer are dropped, so lowering the bound
///while the search runs prunes the remaining work. States that reach the same output with the
///same input position are only kept when no earlier one was at least as cheap with at most as
///many edits.
pub struct SuggestionSearch<'t, T: TrieData + 't> {
    trie: &'t T,
    src: Vec<char>,
    costs: EditCosts,
    ignore_case: Option<bool>,
    change_limit: u32,
    compound_method: CompoundMethod,
    word_separator: Box<str>,
    weight_map: Option<Arc<WeightMap>>,
    roots: Roots<T::Node<'t>>,
    paths: Vec<PathNode<T::Node<'t>>>,
    queue: BinaryHeap<Reverse<(Cost, u64, usize)>>,
    seq: u64,
    cost_trie: Vec<CostTrieNode>,
    emitted: HashMap<String, Cost>,
    pending: VecDeque<SuggestionResult>,
    search_limit: Cost,
    limit: Cost,
    expanded: usize,
    timed_out: bool,
    finished: bool,
}

impl<'t, T: TrieData + 't> SuggestionSearch<'t, T> {
    pub fn new(trie: &'t T, word: &str, options: &SuggestionOptions) -> Self {
        let src: Vec<char> = word.chars().collect();
        let info = trie.info();
        let exact = trie.root();
        let ignore_case = if options.ignore_case == Some(false) {
            None
        } else {
            trie.child(exact, info.strip_case_and_accents_prefix)
        };
        let roots = Roots {
            exact,
            ignore_case,
            compound: trie.child(exact, info.compound_character),
            compound_ignore_case: ignore_case.and_then(|n| trie.child(n, info.compound_character)),
        };
        let search_limit = options.costs.search_limit(src.len(), options.change_limit);
        let mut search = Self {
            trie,
            src,
            costs: options.costs.clone(),
            ignore_case: options.ignore_case,
            change_limit: options.change_limit,
            compound_method: options.compound_method,
            word_separator: options.word_separator().into(),
            weight_map: options.weight_map.clone(),
            roots,
            paths: Vec::new(),
            queue: BinaryHeap::new(),
            seq: 0,
            cost_trie: Vec::new(),
            emitted: HashMap::new(),
            pending: VecDeque::new(),
            search_limit,
            limit: search_limit,
            expanded: 0,
            timed_out: false,
            finished: false,
        };
        if !search.src.is_empty() {
            let start = [Some(search.roots.exact), search.roots.ignore_case];
            for node in start.into_iter().flatten() {
                search.cost_trie.push(CostTrieNode::default());
                let cost_node = search.cost_trie.len() - 1;
                search.enqueue(PathNode {
                    node,
                    index: 0,
                    cost: 0,
                    edits: 0,
                    seg: Segment::None,
                    parent: None,
                    cost_node,
                    fresh: true,
                });
            }
        }
        search
    }

    ///Number of states expanded so far
    pub fn expanded(&self) -> usize {
        self.expanded
    }

    ///Is a state no longer worth pursuing?
    fn is_pruned(&self, cost: Cost, edits: u32) -> bool {
        cost > self.limit || edits > self.change_limit
    }

    ///Records a state in the cost trie, false if an earlier state dominates it
    fn admit(&mut self, cost_node: usize, index: usize, edits: u32, cost: Cost) -> bool {
        let seen = self.cost_trie[cost_node].best.entry(index).or_default();
        if seen.iter().any(|(e, c)| *e <= edits && *c <= cost) {
            return false;
        }
        seen.retain(|(e, c)| !(edits <= *e && cost <= *c));
        seen.push((edits, cost));
        true
    }

    fn cost_child(&mut self, cost_node: usize, label: Label) -> usize {
        if let Some(child) = self.cost_trie[cost_node].children.get(&label) {
            return *child;
        }
        self.cost_trie.push(CostTrieNode::default());
        let child = self.cost_trie.len() - 1;
        self.cost_trie[cost_node].children.insert(label, child);
        child
    }

    fn enqueue(&mut self, path: PathNode<T::Node<'t>>) {
        if self.is_pruned(path.cost, path.edits)
            || !self.admit(path.cost_node, path.index, path.edits, path.cost)
        {
            return;
        }
        let remaining = (self.src.len() - path.index) as Cost;
        let priority = path.cost + remaining;
        self.seq += 1;
        self.paths.push(path);
        self.queue
            .push(Reverse((priority, self.seq, self.paths.len() - 1)));
    }

    ///Queues a move from `parent` that followed the given cost trie labels
    fn push(&mut self, parent: usize, step: Step<T::Node<'t>>, labels: &[Label]) {
        if self.is_pruned(step.cost, step.edits) {
            return;
        }
        let mut cost_node = self.paths[parent].cost_node;
        for label in labels {
            cost_node = self.cost_child(cost_node, *label);
        }
        self.enqueue(PathNode {
            node: step.node,
            index: step.index,
            cost: step.cost,
            edits: step.edits,
            seg: step.seg,
            parent: Some(parent),
            cost_node,
            fresh: step.fresh,
        });
    }

    ///The word spelled by the path ending at `idx`
    fn word_of(&self, idx: usize) -> String {
        let mut segments = Vec::new();
        let mut current = Some(idx);
        while let Some(i) = current {
            let path = &self.paths[i];
            segments.push(&path.seg);
            current = path.parent;
        }
        let mut word = String::new();
        for seg in segments.into_iter().rev() {
            match seg {
                Segment::None => {}
                Segment::Char(c) => word.push(*c),
                Segment::Text(text) => word.push_str(text),
            }
        }
        word
    }

    ///Letter edges of a node, markers excluded
    fn letters(&self, node: T::Node<'t>) -> Vec<(char, T::Node<'t>)> {
        let trie = self.trie;
        let info = trie.info();
        let mut children = trie.children(node);
        children.retain(|(c, _)| !info.is_special(*c));
        children
    }

    ///Follows a run of letters from `node`, markers never match
    fn follow(&self, node: T::Node<'t>, text: &[char]) -> Option<T::Node<'t>> {
        let trie = self.trie;
        let info = trie.info();
        let mut node = node;
        for c in text {
            if info.is_special(*c) {
                return None;
            }
            node = trie.child(node, *c)?;
        }
        Some(node)
    }

    ///Cost and edit count of replacing input letter `s` by trie letter `c` when both are the same
    ///letter up to case and accents
    fn similar_cost(&self, s: char, c: char, index: usize) -> Option<(Cost, u32)> {
        if s == c || fold_char(s) != fold_char(c) {
            return None;
        }
        let mut cost = 0;
        let mut edits = 0;
        if lower_char(s) != lower_char(c) {
            cost += self.costs.visually_similar_cost;
        }
        if strip_char_accents(s) != strip_char_accents(c) {
            match self.ignore_case {
                Some(true) => {}
                None => cost += self.costs.case_change_cost(index),
                Some(false) => {
                    cost += self.costs.edit_cost(index);
                    edits += 1;
                }
            }
        }
        Some((cost, edits))
    }

    ///Walks a weight map trie along the trie, every costed entry is a reachable insertion
    fn weighted_paths(
        &self,
        node: T::Node<'t>,
        costs: &CostNode,
    ) -> Vec<(T::Node<'t>, String, Cost)> {
        let trie = self.trie;
        let info = trie.info();
        let mut found = Vec::new();
        let mut stack: Vec<(&CostNode, T::Node<'t>, String)> = vec![(costs, node, String::new())];
        while let Some((cost_node, node, text)) = stack.pop() {
            for (c, next) in cost_node.children.iter() {
                if info.is_special(*c) {
                    continue;
                }
                let Some(child) = trie.child(node, *c) else {
                    continue;
                };
                let mut text = text.clone();
                text.push(*c);
                if let Some(cost) = next.cost {
                    found.push((child, text.clone(), cost + next.penalty.unwrap_or(0)));
                }
                if !next.children.is_empty() {
                    stack.push((next, child, text));
                }
            }
        }
        found
    }

    fn text_step(
        node: T::Node<'t>,
        index: usize,
        cost: Cost,
        edits: u32,
        text: &str,
    ) -> (Step<T::Node<'t>>, Vec<Label>) {
        let labels = text.chars().map(Label::Char).collect();
        let seg = if text.is_empty() {
            Segment::None
        } else {
            Segment::Text(text.into())
        };
        (
            Step {
                node,
                index,
                cost,
                edits,
                seg,
                fresh: false,
            },
            labels,
        )
    }

    fn expand(&mut self, idx: usize) {
        let trie = self.trie;
        let info = trie.info();
        let PathNode {
            node,
            index: i,
            cost,
            edits,
            fresh,
            ..
        } = self.paths[idx].clone();
        let len = self.src.len();
        let edit_cost = self.costs.edit_cost(i);
        let current = self.src.get(i).copied();
        let next = self.src.get(i + 1).copied();

        for (c, child) in self.letters(node) {
            if let Some(s) = current {
                if c == s {
                    self.push(idx, step(child, i + 1, cost, edits, c), &[Label::Char(c)]);
                } else {
                    let (delta, extra) = self
                        .similar_cost(s, c, i)
                        .filter(|(similar, _)| *similar < edit_cost)
                        .unwrap_or((edit_cost, 1));
                    self.push(
                        idx,
                        step(child, i + 1, cost + delta, edits + extra, c),
                        &[Label::Char(c)],
                    );
                }
                if next == Some(s) && c == s {
                    self.push(
                        idx,
                        step(child, i + 2, cost + self.costs.duplicate_letter_cost, edits + 1, c),
                        &[Label::Char(c)],
                    );
                }
            }
            //insert a letter the input lacks
            self.push(
                idx,
                step(child, i, cost + edit_cost, edits + 1, c),
                &[Label::Char(c)],
            );
        }

        if let Some(s) = current {
            //delete a letter of the input
            self.push(
                idx,
                Step {
                    node,
                    index: i + 1,
                    cost: cost + edit_cost,
                    edits: edits + 1,
                    seg: Segment::None,
                    fresh,
                },
                &[],
            );
            if let Some(n) = next.filter(|n| *n != s) {
                if let Some(swapped) = self.follow(node, &[n, s]) {
                    let text: String = [n, s].iter().collect();
                    let (step, labels) = Self::text_step(
                        swapped,
                        i + 2,
                        cost + self.costs.swap_cost,
                        edits + 1,
                        &text,
                    );
                    self.push(idx, step, &labels);
                }
            }
        }

        if !fresh && trie.child(node, info.compound_character).is_some() {
            let roots = [self.roots.compound, self.roots.compound_ignore_case];
            for (k, root) in roots.into_iter().enumerate() {
                if let Some(root) = root {
                    self.push(
                        idx,
                        Step {
                            node: root,
                            index: i,
                            cost: cost + self.costs.compound_cost,
                            edits,
                            seg: Segment::None,
                            fresh: true,
                        },
                        &[Label::Compound(k as u8)],
                    );
                }
            }
        }

        if self.compound_method != CompoundMethod::None
            && !fresh
            && i > 0
            && i < len
            && trie.is_end_of_word(node)
        {
            let roots = [Some(self.roots.exact), self.roots.ignore_case];
            for (k, root) in roots.into_iter().enumerate() {
                if let Some(root) = root {
                    self.push(
                        idx,
                        Step {
                            node: root,
                            index: i,
                            cost: cost + self.costs.word_break_cost,
                            edits: edits + 1,
                            seg: Segment::Text(self.word_separator.clone()),
                            fresh: true,
                        },
                        &[Label::Break(k as u8)],
                    );
                }
            }
        }

        if let Some(weight_map) = self.weight_map.clone() {
            self.expand_weighted(idx, &weight_map);
        }
    }

    ///Moves defined by the weight map
    fn expand_weighted(&mut self, idx: usize, weight_map: &WeightMap) {
        let PathNode {
            node,
            index: i,
            cost,
            edits,
            fresh,
            ..
        } = self.paths[idx].clone();

        for deletion in weight_map.deletions(&self.src, i) {
            self.push(
                idx,
                Step {
                    node,
                    index: deletion.end,
                    cost: cost + deletion.total(),
                    edits: edits + 1,
                    seg: Segment::None,
                    fresh,
                },
                &[],
            );
        }
        for (child, text, delta) in self.weighted_paths(node, weight_map.ins_del()) {
            let (step, labels) = Self::text_step(child, i, cost + delta, edits + 1, &text);
            self.push(idx, step, &labels);
        }
        for (end, targets) in weight_map.replace().prefixes(&self.src, i) {
            for (child, text, delta) in self.weighted_paths(node, targets) {
                let (step, labels) = Self::text_step(child, end, cost + delta, edits + 1, &text);
                self.push(idx, step, &labels);
            }
        }
        for swap in weight_map.swaps(&self.src, i) {
            if let Some(child) = self.follow(node, &swap.swapped) {
                let text: String = swap.swapped.iter().collect();
                let (step, labels) = Self::text_step(
                    child,
                    swap.end,
                    cost + swap.cost + swap.penalty,
                    edits + 1,
                    &text,
                );
                self.push(idx, step, &labels);
            }
        }
    }

    ///Emits the word of a finished state if it improves on what was emitted before
    fn emit(&mut self, idx: usize) {
        let path = &self.paths[idx];
        if path.fresh || path.index != self.src.len() || !self.trie.is_end_of_word(path.node) {
            return;
        }
        let mut cost = path.cost;
        let word = self.word_of(idx);
        if let Some(weight_map) = self.weight_map.as_ref() {
            cost += weight_map.calc_adjustment(&word);
        }
        if cost > self.limit {
            return;
        }
        if let Some(previous) = self.emitted.get(&word) {
            if *previous <= cost {
                return;
            }
        }
        trace!("suggestion {} ({})", word, cost);
        self.emitted.insert(word.clone(), cost);
        self.pending.push_back(SuggestionResult::new(word, cost));
    }

    fn finish(&mut self) {
        self.queue.clear();
        if self.finished {
            return;
        }
        self.finished = true;
        debug!(
            "suggestion search for {:?}: {} states expanded, {} queued, {} emitted{}",
            self.src.iter().collect::<String>(),
            self.expanded,
            self.paths.len(),
            self.emitted.len(),
            if self.timed_out { ", timed out" } else { "" }
        );
    }
}

fn step<N>(node: N, index: usize, cost: Cost, edits: u32, c: char) -> Step<N> {
    Step {
        node,
        index,
        cost,
        edits,
        seg: Segment::Char(c),
        fresh: false,
    }
}

impl<'t, T: TrieData + 't> SuggestionSource for SuggestionSearch<'t, T> {
    fn next_suggestion(
        &mut self,
        max_cost: Cost,
        deadline: Option<Instant>,
    ) -> Option<SuggestionResult> {
        self.limit = self.search_limit.min(max_cost);
        loop {
            while let Some(suggestion) = self.pending.pop_front() {
                if suggestion.cost <= self.limit {
                    return Some(suggestion);
                }
            }
            let Some(Reverse((_, _, idx))) = self.queue.pop() else {
                self.finish();
                return None;
            };
            self.expanded += 1;
            if self.expanded % DEADLINE_CHECK_INTERVAL == 0 {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        self.timed_out = true;
                        self.finish();
                        return None;
                    }
                }
            }
            let path = &self.paths[idx];
            if self.is_pruned(path.cost, path.edits) {
                continue;
            }
            self.emit(idx);
            self.expand(idx);
        }
    }

    fn timed_out(&self) -> bool {
        self.timed_out
    }
}

impl<'t, T: TrieData + 't> Iterator for SuggestionSearch<'t, T> {
    type Item = SuggestionResult;

    fn next(&mut self) -> Option<Self::Item> {
        let limit = self.search_limit;
        self.next_suggestion(limit, None)
    }
}

///Ranked suggestions for `word`, cheapest first. Forbidden words are never suggested, an empty
///word or `num_suggestions == 0` yields nothing.
pub fn suggest<T: TrieData>(
    trie: &T,
    word: &str,
    options: &SuggestionOptions,
) -> Vec<SuggestionResult> {
    if word.is_empty() || options.num_suggestions == 0 {
        return Vec::new();
    }
    let separators: Vec<char> = options.word_separator().chars().collect();
    let mut collector = SuggestionCollector::new(word, options).with_filter(|candidate, _| {
        if trie.is_forbidden(candidate) {
            return false;
        }
        let joined: String = candidate
            .chars()
            .filter(|c| !separators.contains(c))
            .collect();
        joined == candidate || !trie.is_forbidden(&joined)
    });
    let mut search = SuggestionSearch::new(trie, word, options);
    collector.collect(&mut search);
    if collector.timed_out() {
        debug!("suggestions for {:?} are partial, the search timed out", word);
    }
    collector.suggestions()
}
