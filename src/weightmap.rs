use std::collections::BTreeMap;
use std::fmt::Write;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::error::*;
use crate::types::*;

///Characters in a map definition that stand for the compound separator
pub const MAP_WORD_SEPARATORS: &[char] = &['∙', '•', '・', '●'];

///One entry of a locale's suggestion cost configuration, e.g.
///`{"map": "aeiou", "replace": 75, "description": "vowels sound alike"}`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionCostMapDef {
    ///Sets of substrings separated by `|`, multi character substrings are grouped with `()`:
    ///`"f(ph)(gh)|aá"`
    pub map: String,
    ///Cost to insert or delete any substring of a set
    #[serde(default, alias = "insDel", skip_serializing_if = "Option::is_none")]
    pub insert_delete: Option<Cost>,
    ///Cost to replace a substring with another one of the same set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<Cost>,
    ///Cost to swap two adjacent substrings of the same set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<Cost>,
    ///Added on top of the cost of every operation of this definition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<Cost>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SuggestionCostMapDef {
    pub fn new(map: &str) -> Self {
        Self {
            map: map.to_string(),
            ..Default::default()
        }
    }
    pub fn with_insert_delete(mut self, cost: Cost) -> Self {
        self.insert_delete = Some(cost);
        self
    }
    pub fn with_replace(mut self, cost: Cost) -> Self {
        self.replace = Some(cost);
        self
    }
    pub fn with_swap(mut self, cost: Cost) -> Self {
        self.swap = Some(cost);
        self
    }
    pub fn with_penalty(mut self, penalty: Cost) -> Self {
        self.penalty = Some(penalty);
        self
    }
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

///Trie of substrings with the cheapest cost and the highest penalty defined for them
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CostNode {
    pub children: BTreeMap<char, CostNode>,
    pub cost: Option<Cost>,
    pub penalty: Option<Cost>,
}

///A substring that matched a `CostNode` trie
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CostMatch {
    ///Position just past the matched substring
    pub end: usize,
    pub cost: Cost,
    pub penalty: Cost,
}

impl CostMatch {
    pub fn total(&self) -> Cost {
        self.cost + self.penalty
    }
}

impl CostNode {
    pub fn child(&self, c: char) -> Option<&CostNode> {
        self.children.get(&c)
    }

    fn add(&mut self, s: &str, cost: Cost, penalty: Option<Cost>) {
        if s.is_empty() {
            return;
        }
        let mut node = self;
        for c in s.chars() {
            node = node.children.entry(c).or_default();
        }
        node.cost = Some(node.cost.map_or(cost, |c| c.min(cost)));
        node.penalty = match (node.penalty, penalty) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    ///All costed substrings of `s` starting at `start`
    pub fn prefixes(&self, s: &[char], start: usize) -> Vec<CostMatch> {
        let mut matches = Vec::new();
        let mut node = self;
        for (i, c) in s.iter().enumerate().skip(start) {
            match node.children.get(c) {
                Some(next) => node = next,
                None => break,
            }
            if let Some(cost) = node.cost {
                matches.push(CostMatch {
                    end: i + 1,
                    cost,
                    penalty: node.penalty.unwrap_or(0),
                });
            }
        }
        matches
    }

    ///Cost entry of the exact substring `s`
    pub fn lookup(&self, s: &str) -> Option<&CostNode> {
        let mut node = self;
        for c in s.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }

    fn walk<'a>(&'a self, prefix: &mut String, out: &mut Vec<(String, &'a CostNode)>) {
        if self.cost.is_some() {
            out.push((prefix.clone(), self));
        }
        for (c, child) in self.children.iter() {
            prefix.push(*c);
            child.walk(prefix, out);
            prefix.pop();
        }
    }

    ///Every costed substring with its node, in lexical order
    pub fn entries(&self) -> Vec<(String, &CostNode)> {
        let mut out = Vec::new();
        self.walk(&mut String::new(), &mut out);
        out
    }
}

///Trie over the left hand substring of a pair, each left hand side holds a `CostNode` trie of the
///right hand substrings it pairs with
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PairCostNode {
    pub children: BTreeMap<char, PairCostNode>,
    pub target: Option<CostNode>,
}

impl PairCostNode {
    fn add(&mut self, left: &str, right: &str, cost: Cost, penalty: Option<Cost>) {
        let mut node = self;
        for c in left.chars() {
            node = node.children.entry(c).or_default();
        }
        node.target
            .get_or_insert_with(CostNode::default)
            .add(right, cost, penalty);
    }

    ///All left hand substrings of `s` starting at `start`, with the position past them
    pub fn prefixes(&self, s: &[char], start: usize) -> Vec<(usize, &CostNode)> {
        let mut matches = Vec::new();
        let mut node = self;
        for (i, c) in s.iter().enumerate().skip(start) {
            match node.children.get(c) {
                Some(next) => node = next,
                None => break,
            }
            if let Some(target) = node.target.as_ref() {
                matches.push((i + 1, target));
            }
        }
        matches
    }

    pub fn lookup(&self, left: &str) -> Option<&CostNode> {
        let mut node = self;
        for c in left.chars() {
            node = node.children.get(&c)?;
        }
        node.target.as_ref()
    }

    fn walk<'a>(&'a self, prefix: &mut String, out: &mut Vec<(String, String, &'a CostNode)>) {
        if let Some(target) = self.target.as_ref() {
            for (right, node) in target.entries() {
                out.push((prefix.clone(), right, node));
            }
        }
        for (c, child) in self.children.iter() {
            prefix.push(*c);
            child.walk(prefix, out);
            prefix.pop();
        }
    }

    pub fn entries(&self) -> Vec<(String, String, &CostNode)> {
        let mut out = Vec::new();
        self.walk(&mut String::new(), &mut out);
        out
    }
}

///A swap of two adjacent substrings found in the input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapMatch {
    ///Position just past the second substring
    pub end: usize,
    ///The two substrings in swapped order
    pub swapped: Vec<char>,
    pub cost: Cost,
    pub penalty: Cost,
}

///A penalty added to a suggestion for every match of a pattern
#[derive(Clone, Debug)]
pub struct PenaltyAdjustment {
    pub id: String,
    pub regex: Regex,
    pub penalty: Cost,
}

impl PenaltyAdjustment {
    pub fn new(id: &str, pattern: &str, penalty: Cost) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|err| {
            TrieError::InvalidWeightMap(format!("penalty {}: {}", id, err))
        })?;
        Ok(Self {
            id: id.to_string(),
            regex,
            penalty,
        })
    }
}

///Locale specific edit costs, compiled from `SuggestionCostMapDef`s. Costs of overlapping
///definitions take the minimum, penalties the maximum.
#[derive(Clone, Debug, Default)]
pub struct WeightMap {
    ins_del: CostNode,
    replace: PairCostNode,
    swap: PairCostNode,
    adjustments: Vec<PenaltyAdjustment>,
}

impl WeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_defs(defs: &[SuggestionCostMapDef]) -> Self {
        let mut map = Self::new();
        for def in defs {
            map.add_def(def);
        }
        map
    }

    pub fn add_def(&mut self, def: &SuggestionCostMapDef) {
        for set in split_map(&def.map) {
            if let Some(cost) = def.insert_delete {
                for s in set.iter() {
                    self.ins_del.add(s, cost, def.penalty);
                }
            }
            for (pairs, cost) in [(&mut self.replace, def.replace), (&mut self.swap, def.swap)] {
                let Some(cost) = cost else {
                    continue;
                };
                for left in set.iter() {
                    for right in set.iter() {
                        if left != right {
                            pairs.add(left, right, cost, def.penalty);
                        }
                    }
                }
            }
        }
    }

    ///Adds a pattern penalty, replacing an earlier one with the same id
    pub fn add_adjustment(&mut self, adjustment: PenaltyAdjustment) {
        match self.adjustments.iter_mut().find(|a| a.id == adjustment.id) {
            Some(existing) => *existing = adjustment,
            None => self.adjustments.push(adjustment),
        }
    }

    pub fn with_adjustment(mut self, adjustment: PenaltyAdjustment) -> Self {
        self.add_adjustment(adjustment);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ins_del.children.is_empty()
            && self.replace.children.is_empty()
            && self.swap.children.is_empty()
            && self.adjustments.is_empty()
    }

    pub fn ins_del(&self) -> &CostNode {
        &self.ins_del
    }

    pub fn replace(&self) -> &PairCostNode {
        &self.replace
    }

    pub fn swap(&self) -> &PairCostNode {
        &self.swap
    }

    pub fn adjustments(&self) -> &[PenaltyAdjustment] {
        &self.adjustments
    }

    ///Substrings of `s` at `start` that may be deleted
    pub fn deletions(&self, s: &[char], start: usize) -> Vec<CostMatch> {
        self.ins_del.prefixes(s, start)
    }

    ///Swaps of two adjacent substrings of `s` starting at `start`
    pub fn swaps(&self, s: &[char], start: usize) -> Vec<SwapMatch> {
        let mut swaps = Vec::new();
        for (mid, rights) in self.swap.prefixes(s, start) {
            for right in rights.prefixes(s, mid) {
                let mut swapped = Vec::with_capacity(right.end - start);
                swapped.extend_from_slice(&s[mid..right.end]);
                swapped.extend_from_slice(&s[start..mid]);
                swaps.push(SwapMatch {
                    end: right.end,
                    swapped,
                    cost: right.cost,
                    penalty: right.penalty,
                });
            }
        }
        swaps
    }

    ///Cost of replacing `a` with `b`, if the map defines one
    pub fn lookup_replace_cost(&self, a: &str, b: &str) -> Option<Cost> {
        self.replace.lookup(a)?.lookup(b)?.cost
    }

    ///Sum of all pattern penalties that apply to a suggestion
    pub fn calc_adjustment(&self, word: &str) -> Cost {
        self.adjustments
            .iter()
            .map(|adjustment| adjustment.regex.find_iter(word).count() as Cost * adjustment.penalty)
            .sum()
    }

    ///Human readable listing of all costs
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let penalty = |p: Option<Cost>| match p {
            Some(p) if p > 0 => format!(" + {}", p),
            _ => String::new(),
        };
        let mut lines: Vec<String> = self
            .ins_del
            .entries()
            .into_iter()
            .map(|(s, n)| format!("  ({}) = {}{}", s, n.cost.unwrap_or_default(), penalty(n.penalty)))
            .collect();
        lines.sort();
        let _ = writeln!(out, "InsDel:");
        for line in lines {
            let _ = writeln!(out, "{}", line);
        }
        for (title, arrow, pairs) in [("Replace:", "->", &self.replace), ("Swap:", "<->", &self.swap)] {
            let mut lines: Vec<String> = pairs
                .entries()
                .into_iter()
                .map(|(a, b, n)| {
                    format!(
                        "  ({}) {} ({}) = {}{}",
                        a,
                        arrow,
                        b,
                        n.cost.unwrap_or_default(),
                        penalty(n.penalty)
                    )
                })
                .collect();
            lines.sort();
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", title);
            for line in lines {
                let _ = writeln!(out, "{}", line);
            }
        }
        for adjustment in self.adjustments.iter() {
            let _ = writeln!(
                out,
                "Penalty {}: /{}/ + {}",
                adjustment.id,
                adjustment.regex.as_str(),
                adjustment.penalty
            );
        }
        out
    }
}

///Splits a map definition into its sets of substrings. Every substring is also added in its
///composed and decomposed form, separator symbols become the compound character.
pub fn split_map(map: &str) -> Vec<Vec<String>> {
    let map: String = map
        .chars()
        .map(|c| {
            if MAP_WORD_SEPARATORS.contains(&c) {
                COMPOUND_CHARACTER
            } else {
                c
            }
        })
        .collect();
    map.split('|')
        .map(split_map_substrings)
        .filter(|set| !set.is_empty())
        .collect()
}

fn split_map_substrings(set: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    let mut push = |s: &str| {
        for form in [s.to_string(), s.nfc().collect(), s.nfd().collect()] {
            if !form.is_empty() && !values.contains(&form) {
                values.push(form);
            }
        }
    };
    let mut group: Option<String> = None;
    for c in set.chars() {
        match group.as_mut() {
            Some(seq) if c == ')' => {
                let seq = std::mem::take(seq);
                push(&seq);
                group = None;
            }
            Some(seq) => seq.push(c),
            None if c == '(' => group = Some(String::new()),
            None => push(c.encode_utf8(&mut [0; 4])),
        }
    }
    values
}
