use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use rayon::prelude::*;

use spelltrie::*;
use spelltrie::test::*;

fn word_set<I: IntoIterator<Item = String>>(words: I) -> HashSet<String> {
    words.into_iter().collect()
}

fn words_of(suggestions: &[SuggestionResult]) -> Vec<&str> {
    suggestions.iter().map(|s| s.word.as_str()).collect()
}

#[test]
fn test0001_charindex_ids() {
    let mut builder = CharIndexBuilder::new();
    assert!(builder.is_empty());
    assert_eq!(builder.get_char_index('a'), 1);
    assert_eq!(builder.get_char_index('b'), 2);
    assert_eq!(builder.get_char_index('a'), 1);
    assert_eq!(builder.len(), 2);
    let index = builder.build();
    assert_eq!(index.char_at(0), None);
    assert_eq!(index.char_at(1), Some('a'));
    assert_eq!(index.char_at(2), Some('b'));
    assert_eq!(index.char_at(3), None);
    assert_eq!(index.index_of('b'), Some(2));
    assert_eq!(index.index_of('c'), None);
}

#[test]
fn test0002_charindex_escape_sequences() {
    let mut out = Vec::new();
    encode_char_id(5, &mut out);
    assert_eq!(out, vec![5]);

    out.clear();
    encode_char_id(SEQ_SPECIAL + 3, &mut out);
    assert_eq!(out, vec![SEQ_INDEX_8BIT, 3]);

    out.clear();
    encode_char_id(1000, &mut out);
    assert_eq!(out, vec![SEQ_INDEX_14BIT, 7, 104]);

    out.clear();
    encode_char_id(20000, &mut out);
    assert_eq!(out, vec![SEQ_INDEX_21BIT, 1, 28, 32]);

    let mut decoder = SeqDecoder::new();
    assert_eq!(decoder.decode(SEQ_INDEX_21BIT), None);
    assert!(decoder.is_pending());
    assert_eq!(decoder.decode(1), None);
    assert_eq!(decoder.decode(28), None);
    assert_eq!(decoder.decode(32), Some(20000));
    assert!(!decoder.is_pending());
    assert_eq!(decoder.decode(17), Some(17));
}

#[test]
fn test0003_charindex_sequence_roundtrip() {
    let mut builder = CharIndexBuilder::new();
    //push the alphabet well past the single slot range
    for i in 0..700u32 {
        if let Some(c) = char::from_u32(0x4e00 + i) {
            builder.get_char_index(c);
        }
    }
    let word = "a\u{4e00}\u{4e10}\u{4f00}\u{50a0}\u{1f600}\u{e9}";
    let seq = builder.to_sequence(word);
    assert!(seq.len() > word.chars().count());
    let index = builder.build();
    assert_eq!(index.to_sequence(word), Some(seq.clone()));
    assert_eq!(index.from_sequence(&seq), Some(word.to_string()));
    assert_eq!(index.to_sequence("unknown€"), None);
    //a truncated sequence does not decode
    assert_eq!(index.from_sequence(&seq[..seq.len() - 1]), None);
}

#[test]
fn test0101_builder_insert_has() {
    let mut builder = TrieBuilder::new();
    for word in get_test_words() {
        assert!(!builder.has(&word));
        builder.insert(&word);
        assert!(builder.has(&word));
    }
    assert!(!builder.has("tal"));
    assert!(!builder.has("talkers"));
    assert!(!builder.has(""));
}

#[test]
fn test0102_builder_shared_eow_leaf() {
    let mut builder = TrieBuilder::new();
    builder.insert("walk");
    //root, end-of-word leaf, w, a, l
    assert_eq!(builder.size(), 5);
    builder.insert("walks");
    assert_eq!(builder.size(), 6);
    builder.insert("talk");
    builder.insert("talks");
    let trie = builder.build();
    assert_eq!(trie.nodes()[EOW_NODE as usize], vec![NodeFlags::EOW.bits()]);
    for word in ["walk", "walks", "talk", "talks"] {
        assert!(trie.has(word), "{}", word);
    }
    assert!(!trie.has("walkss"));
    assert!(!trie.has("wal"));
}

#[test]
fn test0103_builder_cursor_suffixes() {
    let mut builder = TrieBuilder::new();
    {
        let mut cursor = builder.cursor();
        for c in "walk".chars() {
            cursor.insert_char(c);
        }
        assert_eq!(cursor.depth(), 4);
        cursor.mark_eow();
        cursor.insert_suffix("s");
        cursor.insert_suffix("ed");
        assert_eq!(cursor.depth(), 4);
        cursor.back_step(2);
        assert_eq!(cursor.depth(), 2);
        cursor.insert_suffix("ked");
    }
    for word in ["walk", "walks", "walked", "waked"] {
        assert!(builder.has(word), "{}", word);
    }
    for word in ["wal", "wake", "wa", "walkss"] {
        assert!(!builder.has(word), "{}", word);
    }
}

#[test]
fn test0104_builder_cursor_reference() {
    let mut builder = TrieBuilder::new();
    {
        let mut cursor = builder.cursor();
        //creates node 2 (after "i") and node 3 (after "in")
        cursor.insert_suffix("ing");
        for c in "walk".chars() {
            cursor.insert_char(c);
        }
        cursor.mark_eow();
        cursor.insert_char('i');
        cursor.reference(2);
        cursor.back_step(5);
        assert_eq!(cursor.depth(), 0);
    }
    assert!(builder.has("ing"));
    assert!(builder.has("walk"));
    assert!(builder.has("walking"));
    let size = builder.size();

    //writing through the shared subtree copies it
    {
        let mut cursor = builder.cursor();
        for c in "walking".chars() {
            cursor.insert_char(c);
        }
        cursor.insert_suffix("s");
    }
    assert!(builder.size() > size);
    assert!(builder.has("walkings"));
    assert!(builder.has("walking"));
    assert!(builder.has("ing"));
    assert!(!builder.has("ings"));
}

#[test]
#[should_panic]
fn test0105_builder_frozen() {
    let mut builder = TrieBuilder::new();
    builder.insert("walk");
    builder.freeze();
    assert!(builder.is_frozen());
    builder.insert("talk");
}

#[test]
#[should_panic]
fn test0106_builder_back_step_beyond_root() {
    let mut builder = TrieBuilder::new();
    let mut cursor = builder.cursor();
    cursor.insert_char('a');
    cursor.back_step(2);
}

#[test]
#[should_panic]
fn test0107_builder_reference_unknown_node() {
    let mut builder = TrieBuilder::new();
    let mut cursor = builder.cursor();
    cursor.insert_char('a');
    cursor.reference(42);
}

#[test]
fn test0108_builder_bulk_insert_prescan() {
    let mut builder = TrieBuilder::new().with_prescan(10, 32);
    builder.insert_words(get_sample_words());
    assert!(builder.alphabet_size() > 10);
    let trie = builder.build();
    assert_eq!(word_set(trie.words()), word_set(get_sample_words()));
}

#[test]
fn test0109_builder_cursor_drops_dead_ends() {
    let mut builder = TrieBuilder::new();
    {
        let mut cursor = builder.cursor();
        cursor.insert_suffix("walk");
        //never marked, stepping back takes it out again
        cursor.insert_char('x');
        cursor.back_step(1);
        assert_eq!(cursor.depth(), 0);
        cursor.insert_char('t');
        cursor.insert_char('a');
    }
    //root, end-of-word leaf and the nodes after "w", "wa" and "wal"
    assert_eq!(builder.size(), 5);
    assert!(builder.has("walk"));
    let trie = builder.build();
    assert_eq!(word_set(trie.words()), word_set(vec!["walk".to_string()]));
    assert!(!trie.has_prefix("x"));
    assert!(!trie.has_prefix("t"));
}

#[test]
fn test0110_builder_cursor_try_reference() {
    let mut builder = TrieBuilder::new();
    let mut cursor = builder.cursor();
    cursor.insert_suffix("ab");
    assert!(matches!(
        cursor.try_reference(2),
        Err(TrieError::InvalidReference(_))
    ));
    cursor.insert_char('c');
    assert!(matches!(
        cursor.try_reference(9),
        Err(TrieError::InvalidReference(_))
    ));
    cursor.try_reference(1).expect("end-of-word leaf");
    cursor.back_step(1);
    drop(cursor);
    assert!(builder.has("ab"));
    assert!(builder.has("c"));
}

#[test]
fn test0201_fasttrie_words() {
    let trie = TrieBuilder::from_word_list(get_test_words());
    let words: Vec<String> = trie.words().collect();
    assert_eq!(words.len(), TEST_WORDS.len());
    assert_eq!(word_set(words), word_set(get_test_words()));
    //the iterator can be restarted
    assert_eq!(trie.words().count(), TEST_WORDS.len());
    assert_eq!(
        word_set(trie.words_with_prefix("talk")),
        word_set(vec![
            "talk".to_string(),
            "talks".to_string(),
            "talked".to_string(),
            "talker".to_string()
        ])
    );
    assert_eq!(trie.words_with_prefix("x").count(), 0);
    assert!(trie.has_prefix("wal"));
    assert!(!trie.has_prefix("wak"));
}

#[test]
fn test0202_fasttrie_empty() {
    let trie = TrieBuilder::new().build();
    assert_eq!(trie.words().count(), 0);
    assert!(!trie.has("a"));
    assert!(!trie.has(""));
}

#[test]
fn test0301_blob_roundtrip() {
    let trie = TrieBuilder::from_word_list(get_sample_words());
    let buffer = trie.encode().expect("encode");
    assert_eq!(&buffer[0..8], BLOB_MAGIC);
    let blob = TrieBlob::decode(&buffer).expect("decode");
    assert_eq!(blob.size(), trie.size());
    for word in SAMPLE_WORDS {
        assert!(blob.has(word), "{}", word);
    }
    assert!(!blob.has("joyfull"));
    assert_eq!(word_set(blob.words()), word_set(trie.words()));

    let decoded = FastTrie::decode(&buffer).expect("decode");
    assert_eq!(word_set(decoded.words()), word_set(get_sample_words()));
    //re-encoding yields the same bytes
    assert_eq!(decoded.encode().expect("encode"), buffer);
}

#[test]
fn test0302_blob_header() {
    let dictionary = Dictionary::parse(get_compound_dictionary());
    let buffer = dictionary.encode().expect("encode");
    let read_u32 = |offset: usize| {
        u32::from_le_bytes([
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ])
    };
    assert_eq!(read_u32(8), BLOB_ENDIAN_MARKER);
    assert_eq!(read_u32(12), BLOB_VERSION);
    //case aware: the dictionary holds `~` forms
    assert_eq!(read_u32(16) & 1, 1);
    assert_eq!(read_u32(20), '+' as u32);
    assert_eq!(read_u32(24), '~' as u32);
    assert_eq!(read_u32(28), '!' as u32);
    assert_eq!(buffer[32], 8);
    assert_eq!(buffer[33], 8);
    assert_eq!(read_u32(36) as usize, BLOB_HEADER_SIZE);
    let blob = TrieBlob::decode(&buffer).expect("decode");
    assert!(blob.info().is_case_aware);
    assert_eq!(blob.info().compound_character, '+');
}

#[test]
fn test0303_blob_unsupported() {
    assert!(TrieBlob::decode(&[]).unwrap_err().is_unsupported_format());

    let buffer = TrieBuilder::from_word_list(get_test_words())
        .encode()
        .expect("encode");

    let mut bad_magic = buffer.clone();
    bad_magic[0] = b'X';
    assert!(TrieBlob::decode(&bad_magic)
        .unwrap_err()
        .is_unsupported_format());

    let mut bad_version = buffer.clone();
    bad_version[12..16].copy_from_slice(&2u32.to_le_bytes());
    let err = TrieBlob::decode(&bad_version).unwrap_err();
    assert!(err.is_unsupported_format());
    assert!(err.to_string().contains("version"));

    let truncated = &buffer[..buffer.len() - 4];
    assert!(TrieBlob::decode(truncated)
        .unwrap_err()
        .is_unsupported_format());

    //point the first child of the root into the void
    let node_table = u32::from_le_bytes([buffer[44], buffer[45], buffer[46], buffer[47]]) as usize;
    let mut bad_child = buffer.clone();
    let slot = node_table + 4;
    let id = bad_child[slot] as u32;
    bad_child[slot..slot + 4].copy_from_slice(&((0xfffff << 8) | id).to_le_bytes());
    assert!(FastTrie::decode(&bad_child)
        .unwrap_err()
        .is_unsupported_format());
}

#[test]
fn test0304_blob_large_multilingual() {
    let words = get_large_wordlist();
    let unique = word_set(words.clone());
    assert!(unique.len() >= 10_000);
    let trie = TrieBuilder::from_word_list(words.iter());
    //more characters than fit a single slot
    assert!(trie.char_index().len() > LARGE_WORDLIST_CJK_CHARS as usize);
    let buffer = trie.encode().expect("encode");
    let blob = TrieBlob::decode(&buffer).expect("decode");
    assert_eq!(word_set(blob.words()), word_set(trie.words()));
    assert_eq!(word_set(blob.words()), unique);
    for word in words.iter().step_by(7) {
        assert!(blob.has(word), "{}", word);
    }
    for word in ["zzz", "kalox", "κακ", "😀😀", "\u{4e00}"] {
        assert!(!blob.has(word), "{}", word);
    }
    let decoded = blob.to_fast_trie();
    assert_eq!(word_set(decoded.words()), unique);
}

#[test]
fn test0305_blob_cyclic() {
    let buffer = TrieBuilder::from_word_list(["ab"]).encode().expect("encode");
    let node_table = u32::from_le_bytes([buffer[44], buffer[45], buffer[46], buffer[47]]) as usize;
    //point the first child of the root back at the root
    let mut cyclic = buffer.clone();
    let slot = node_table + 4;
    let id = cyclic[slot] as u32;
    cyclic[slot..slot + 4].copy_from_slice(&((ROOT_NODE << NODE_CHILD_SHIFT) | id).to_le_bytes());
    let err = TrieBlob::decode(&cyclic).unwrap_err();
    assert!(err.is_unsupported_format());
    assert!(err.to_string().contains("cyclic"));
    assert!(FastTrie::decode(&cyclic)
        .unwrap_err()
        .is_unsupported_format());
    //shared nodes are fine
    assert!(TrieBlob::decode(&buffer).is_ok());
}

fn attach(root: &mut TrieNode, stem: &str, suffixes: &Rc<TrieNode>) {
    let chars: Vec<char> = stem.chars().collect();
    let (last, init) = chars.split_last().expect("stem");
    let mut node = root;
    for c in init {
        node = Rc::make_mut(node.children.entry(*c).or_default());
    }
    node.children.insert(*last, suffixes.clone());
}

#[test]
fn test0401_legacy_trie() {
    let root = TrieRoot::from_words(get_test_words());
    for word in TEST_WORDS {
        assert!(root.has(word));
    }
    assert!(!root.has("tal"));
    assert_eq!(word_set(root.words()), word_set(get_test_words()));
    let trie = root.to_fast_trie();
    assert_eq!(word_set(trie.words()), word_set(get_test_words()));
}

#[test]
fn test0402_legacy_trie_shared_subtrees() {
    let mut suffixes = TrieNode::new();
    suffixes.eow = true;
    suffixes.insert("s");
    suffixes.insert("ing");
    let suffixes = Rc::new(suffixes);
    let mut root = TrieRoot::default();
    attach(&mut root.node, "walk", &suffixes);
    attach(&mut root.node, "talk", &suffixes);

    let expected = word_set(
        ["walk", "walks", "walking", "talk", "talks", "talking"]
            .iter()
            .map(|w| w.to_string()),
    );
    assert_eq!(word_set(root.words()), expected);

    let converted = TrieBuilder::from_trie_root(&root);
    assert_eq!(word_set(converted.words()), expected);
    let plain = TrieBuilder::from_word_list(expected.iter());
    assert!(converted.size() < plain.size());

    //copy on write keeps the other stem untouched
    root.insert("walkings");
    assert!(root.has("walkings"));
    assert!(!root.has("talkings"));
    assert!(root.has("talking"));
}

#[test]
fn test0403_legacy_trie_harvest_limit() {
    let root = TrieRoot::from_words(["ax", "by", "zzz"]);
    let expected = word_set(["ax", "by", "zzz"].iter().map(|w| w.to_string()));

    //the full harvest reaches "y" before "x"
    let full = TrieBuilder::new().convert_trie_root(&root);
    assert_eq!(full.char_index().index_of('y'), Some(4));
    assert_eq!(full.char_index().index_of('x'), Some(5));
    assert_eq!(word_set(full.words()), expected);

    //the harvest stalls in the "zzz" chain, the rest is numbered while the edges are added
    let stalled = TrieBuilder::new()
        .with_harvest_limit(0)
        .convert_trie_root(&root);
    assert_eq!(stalled.char_index().index_of('x'), Some(4));
    assert_eq!(stalled.char_index().index_of('y'), Some(5));
    assert_eq!(stalled.char_index().len(), full.char_index().len());
    assert_eq!(word_set(stalled.words()), expected);
}

#[test]
#[should_panic]
fn test0404_legacy_trie_convert_into_used_builder() {
    let root = TrieRoot::from_words(get_test_words());
    let mut builder = TrieBuilder::new();
    builder.insert("walk");
    builder.convert_trie_root(&root);
}

#[test]
fn test0501_parser_compounds() {
    let words = parse_dictionary(get_compound_dictionary(), &ParseOptions::default());
    assert_eq!(
        words,
        vec!["walk", "Running", "~running", "Running+", "~running+", "+Pod", "~+pod"]
    );
    let words = parse_dictionary("*stick\nwalking*", &ParseOptions::default());
    assert_eq!(words, vec!["stick", "+stick", "walking", "walking+"]);
}

#[test]
fn test0502_parser_comments_and_prefixes() {
    let options = ParseOptions::default();
    assert_eq!(
        parse_dictionary("# a comment\n  walk  # trailing\n\nwalk\n", &options),
        vec!["walk"]
    );
    assert_eq!(parse_dictionary("=iPhone", &options), vec!["iPhone"]);
    assert_eq!(parse_dictionary("!Walkingtree", &options), vec!["!Walkingtree"]);
    assert_eq!(parse_dictionary("~Word", &options), vec!["~Word"]);
    assert_eq!(parse_dictionary("~~word", &options), vec!["~word"]);
    assert_eq!(parse_dictionary("caf\u{e9}", &options), vec!["caf\u{e9}", "~cafe"]);
    assert_eq!(
        parse_dictionary("\u{c9}clair", &options),
        vec!["\u{c9}clair", "~\u{e9}clair", "~eclair"]
    );
    assert_eq!(
        parse_dictionary("\u{c9}clair", &options.clone().with_strip_case_and_accents(false)),
        vec!["\u{c9}clair"]
    );
    //decomposed input is stored composed
    assert_eq!(
        parse_dictionary("cafe\u{301}", &options.clone().with_strip_case_and_accents(false)),
        vec!["caf\u{e9}"]
    );
}

#[test]
fn test0503_parser_split_and_directives() {
    let options = ParseOptions::default().with_split(true);
    assert_eq!(
        parse_dictionary("walk talk, joy;fun", &options),
        vec!["walk", "talk", "joy", "fun"]
    );
    assert_eq!(
        parse_dictionary(
            "walk talk\n# cspell-dictionary: split\nwalk talk joy",
            &ParseOptions::default()
        ),
        vec!["walk talk", "walk", "talk", "joy"]
    );
    let lines = vec!["# cspell-dictionary: no-generate-alternatives", "Walk"];
    let words: Vec<String> =
        DictionaryLineParser::new(lines.into_iter(), &ParseOptions::default()).collect();
    assert_eq!(words, vec!["Walk"]);
}

#[test]
fn test0601_dictionary_compounds() {
    let dictionary = Dictionary::parse(get_compound_dictionary());
    assert!(dictionary.info().is_case_aware);
    assert!(dictionary.has("walk"));
    assert!(dictionary.has("Running"));
    assert!(dictionary.has("RunningPod"));
    assert!(!dictionary.has("Runningpod"));
    assert!(!dictionary.has("Pod"));
    assert!(!dictionary.has("+Pod"));
    assert!(dictionary.has_ignore_case("runningpod"));
    assert!(dictionary.has_ignore_case("RUNNING"));
    assert_eq!(
        word_set(dictionary.words()),
        word_set(vec!["walk".to_string(), "Running".to_string()])
    );
    assert_eq!(dictionary.complete("Ru"), vec!["Running"]);
}

#[test]
fn test0602_dictionary_forbidden() {
    let dictionary = Dictionary::parse(get_forbidden_dictionary());
    assert!(dictionary.is_forbidden("walkingtree"));
    assert!(!dictionary.has("walkingtree"));
    assert!(dictionary.has("walkingstick"));
    assert!(dictionary.has("talkingtree"));
    assert!(!dictionary.is_forbidden("talkingtree"));
}

#[test]
fn test0603_dictionary_accents() {
    let dictionary = Dictionary::parse(ACCENT_DICTIONARY);
    assert!(dictionary.has("caf\u{e9}"));
    assert!(!dictionary.has("cafe"));
    assert!(dictionary.has_ignore_case("cafe"));
    assert!(dictionary.has_ignore_case("CAF\u{c9}"));
    assert!(dictionary.has_ignore_case("eclair"));
    assert!(dictionary.has("iPhone"));
    assert!(!dictionary.has_ignore_case("iphone"));
    assert!(dictionary.trie().has_case_insensitive("Na\u{ef}ve"));
}

#[test]
fn test0604_dictionary_blob() {
    let dictionary = Dictionary::parse(get_forbidden_dictionary());
    let buffer = dictionary.encode().expect("encode");
    let loaded = Dictionary::from_blob(&buffer).expect("decode");
    assert!(loaded.has("walkingstick"));
    assert!(!loaded.has("walkingtree"));
    assert_eq!(word_set(loaded.words()), word_set(dictionary.words()));
    assert!(Dictionary::from_blob(b"not a trie blob at all")
        .unwrap_err()
        .is_unsupported_format());
}

#[test]
fn test0701_weightmap_split() {
    assert_eq!(
        split_map("ab|(ph)f"),
        vec![vec!["a", "b"], vec!["ph", "f"]]
    );
    assert_eq!(split_map("a•b"), vec![vec!["a", "+", "b"]]);
    assert_eq!(split_map("\u{e1}")[0].len(), 2);
    assert!(split_map("|").is_empty());
}

#[test]
fn test0702_weightmap_costs() {
    let map = WeightMap::from_defs(&get_test_weightmap_defs());
    assert_eq!(map.lookup_replace_cost("a", "e"), Some(50));
    assert_eq!(map.lookup_replace_cost("a", "a"), None);
    assert_eq!(map.lookup_replace_cost("f", "ph"), Some(20));
    assert_eq!(map.lookup_replace_cost("ph", "gh"), Some(20));
    assert_eq!(map.lookup_replace_cost("a", "f"), None);

    let map = WeightMap::from_defs(&[
        SuggestionCostMapDef::new("ab").with_replace(30).with_penalty(5),
        SuggestionCostMapDef::new("ab").with_replace(20).with_penalty(10),
    ]);
    assert_eq!(map.lookup_replace_cost("a", "b"), Some(20));
    let entry = map
        .replace()
        .lookup("a")
        .and_then(|targets| targets.lookup("b"))
        .expect("entry");
    assert_eq!(entry.penalty, Some(10));
    let description = map.describe();
    assert!(description.contains("Replace:"));
    assert!(description.contains("(a) -> (b) = 20 + 10"));
}

#[test]
fn test0703_weightmap_json() {
    let json = r#"[
        {"map": "aeiou", "replace": 50, "description": "vowels"},
        {"map": "h", "insDel": 30}
    ]"#;
    let defs: Vec<SuggestionCostMapDef> = serde_json::from_str(json).expect("json");
    assert_eq!(defs[0].replace, Some(50));
    assert_eq!(defs[0].description.as_deref(), Some("vowels"));
    assert_eq!(defs[1].insert_delete, Some(30));
    let serialized = serde_json::to_string(&defs[1]).expect("json");
    assert_eq!(serialized, r#"{"map":"h","insertDelete":30}"#);

    let costs: EditCosts = serde_json::from_str(r#"{"baseCost": 90}"#).expect("json");
    assert_eq!(costs.base_cost, 90);
    assert_eq!(costs.swap_cost, 75);
}

#[test]
fn test0704_weightmap_adjustments() {
    let adjustment = PenaltyAdjustment::new("double-l", "ll", 10).expect("regex");
    let map = WeightMap::new().with_adjustment(adjustment);
    assert_eq!(map.calc_adjustment("hello all"), 20);
    assert_eq!(map.calc_adjustment("help"), 0);
    assert!(matches!(
        PenaltyAdjustment::new("bad", "(", 1),
        Err(TrieError::InvalidWeightMap(_))
    ));
}

#[test]
fn test0801_collector_bound() {
    let options = SuggestionOptions::default().with_num_suggestions(2);
    let mut collector = SuggestionCollector::new("walk", &options);
    assert_eq!(collector.max_cost(), 206);
    collector.add(SuggestionResult::new("walks", 95));
    collector.add(SuggestionResult::new("talk", 105));
    assert_eq!(collector.max_cost(), 105);
    collector.add(SuggestionResult::new("wall", 97));
    assert_eq!(collector.max_cost(), 97);
    //too expensive now
    collector.add(SuggestionResult::new("balk", 100));
    //cheapest wins
    collector.add(SuggestionResult::new("wall", 50));
    let suggestions = collector.suggestions();
    assert_eq!(words_of(&suggestions), vec!["wall", "walks"]);
    assert_eq!(suggestions[0].cost, 50);
    assert!(collector.len() <= 2);
}

#[test]
fn test0802_collector_filter_and_ties() {
    let options = SuggestionOptions::default();
    let mut collector =
        SuggestionCollector::new("walk", &options).with_filter(|word, _| word != "talk");
    collector.collect_iter(vec![
        SuggestionResult::new("talk", 10),
        SuggestionResult::new("walks", 95),
        SuggestionResult::new("balk", 95),
        SuggestionResult::new("walk", 0),
    ]);
    let suggestions = collector.suggestions();
    assert_eq!(words_of(&suggestions), vec!["walk", "walks", "balk"]);
}

#[test]
fn test0803_collector_word_length_cost() {
    let options = SuggestionOptions::default();
    let mut collector = SuggestionCollector::new("walkingtalkingjoy", &options);
    collector.add(SuggestionResult::new("walking talking joy", 198));
    collector.add(SuggestionResult::new("walking+a", 100));
    let suggestions = collector.suggestions();
    assert_eq!(suggestions[0], SuggestionResult::new("walking+a", 155));
    assert_eq!(suggestions[1], SuggestionResult::new("walking talking joy", 213));
}

#[test]
fn test0804_collector_zero() {
    let options = SuggestionOptions::default().with_num_suggestions(0);
    let trie = TrieBuilder::from_word_list(get_sample_words());
    let mut collector = SuggestionCollector::new("joyfull", &options);
    let mut search = SuggestionSearch::new(&trie, "joyfull", &options);
    collector.collect(&mut search);
    assert!(collector.suggestions().is_empty());
}

#[test]
fn test0901_suggest_scenario_tallk() {
    let dictionary = Dictionary::from_words(get_test_words());
    let options = get_test_options();
    assert_eq!(dictionary.suggest("tallk", &options), vec!["talk", "talks", "walk"]);
    assert_eq!(
        dictionary.suggest_with_cost("tallk", &options),
        vec![
            SuggestionResult::new("talk", 80),
            SuggestionResult::new("talks", 175),
            SuggestionResult::new("walk", 185),
        ]
    );
}

#[test]
fn test0902_suggest_sample_words() {
    let dictionary = Dictionary::from_words(get_sample_words());
    let options = get_test_options().with_change_limit(3);
    let suggestions = dictionary.suggest_with_cost("talks", &options);
    assert_eq!(
        words_of(&suggestions),
        vec!["talks", "talk", "walks", "talked", "talker", "walk"]
    );
    assert_eq!(suggestions[0].cost, 0);
    assert_eq!(suggestions[1].cost, 96);
    assert_eq!(
        dictionary.suggest("jernals", &get_test_options()),
        vec!["journals", "journal"]
    );
    //adjacent letters swapped
    let suggestions = dictionary.suggest_with_cost("juornals", &get_test_options());
    assert_eq!(suggestions[0], SuggestionResult::new("journals", 75));
    assert_eq!(suggestions[1].word, "journal");
    //doubled letter
    let suggestions = dictionary.suggest_with_cost("joyfull", &get_test_options());
    assert_eq!(suggestions[0], SuggestionResult::new("joyful", 80));
    assert_eq!(
        dictionary.suggest("joyfull", &get_test_options().with_num_suggestions(2)),
        vec!["joyful", "joyfully"]
    );
}

#[test]
fn test0903_suggest_separate_words() {
    let dictionary = Dictionary::from_words(get_sample_words());
    let options = get_test_options()
        .with_num_suggestions(1)
        .with_compound_method(CompoundMethod::SeparateWords);
    assert_eq!(
        dictionary.suggest_with_cost("walkingtalkingjoy", &options),
        vec![SuggestionResult::new("walking talking joy", 213)]
    );
    let options = options.with_compound_method(CompoundMethod::JoinWords);
    assert_eq!(
        dictionary.suggest("walkingtalkingjoy", &options),
        vec!["walking+talking+joy"]
    );
}

#[test]
fn test0904_suggest_scenario_compounds() {
    let dictionary = Dictionary::parse(get_compound_dictionary());
    let options = get_test_options()
        .with_num_suggestions(4)
        .with_change_limit(1);
    let suggestions = dictionary.suggest_with_cost("Runningpod", &options);
    assert_eq!(
        words_of(&suggestions),
        vec!["Runningpod", "runningpod", "RunningPod", "runningPod"]
    );
    let costs: Vec<Cost> = suggestions.iter().map(|s| s.cost).collect();
    assert_eq!(costs, vec![0, 1, 2, 3]);

    let strict = options.clone().with_ignore_case(Some(false));
    assert_eq!(
        dictionary.suggest_with_cost("Runningpod", &strict),
        vec![SuggestionResult::new("RunningPod", 93)]
    );

    let relaxed = options.with_ignore_case(Some(true));
    let suggestions = dictionary.suggest_with_cost("Runningpod", &relaxed);
    assert!(suggestions.iter().all(|s| s.cost == 0));
    assert_eq!(suggestions.len(), 4);
}

#[test]
fn test0905_suggest_forbidden() {
    let dictionary = Dictionary::parse(get_forbidden_dictionary());
    let options = get_test_options();
    let suggestions = dictionary.suggest("walkingtree", &options);
    assert!(!suggestions.contains(&"walkingtree".to_string()));
    let suggestions = dictionary.suggest("walkingtre", &options);
    assert!(!suggestions.contains(&"walkingtree".to_string()));
    let suggestions = dictionary.suggest_with_cost("talkingtree", &options);
    assert_eq!(suggestions[0], SuggestionResult::new("talkingtree", 0));
}

#[test]
fn test0906_suggest_degenerate() {
    let dictionary = Dictionary::from_words(get_sample_words());
    assert!(dictionary.suggest("", &get_test_options()).is_empty());
    assert!(dictionary
        .suggest("joyfull", &get_test_options().with_num_suggestions(0))
        .is_empty());
    let suggestions = dictionary.suggest("joyfull", &get_test_options().with_num_suggestions(3));
    assert_eq!(suggestions.len(), 3);
}

#[test]
fn test0907_suggest_exact_match_first() {
    let dictionary = Dictionary::from_words(get_sample_words());
    for word in SAMPLE_WORDS {
        let suggestions = dictionary.suggest_with_cost(word, &get_test_options());
        assert_eq!(suggestions[0], SuggestionResult::new(*word, 0));
    }
}

#[test]
fn test0908_suggest_weight_map() {
    let defs = get_test_weightmap_defs();
    let options = get_test_options();

    let plain = Dictionary::from_words(vec!["phone"]);
    assert!(plain.suggest("fone", &options).is_empty());
    let weighted = plain.clone().with_weight_map(WeightMap::from_defs(&defs));
    assert_eq!(
        weighted.suggest_with_cost("fone", &options),
        vec![SuggestionResult::new("phone", 20)]
    );

    let dictionary = Dictionary::from_words(vec!["hour"]).with_weight_map(WeightMap::from_defs(&defs));
    assert_eq!(
        dictionary.suggest_with_cost("our", &options)[0],
        SuggestionResult::new("hour", 30)
    );
    let dictionary = Dictionary::from_words(vec!["our"]).with_weight_map(WeightMap::from_defs(&defs));
    assert_eq!(
        dictionary.suggest_with_cost("hour", &options)[0],
        SuggestionResult::new("our", 30)
    );
    let dictionary = Dictionary::from_words(vec!["tie"]).with_weight_map(WeightMap::from_defs(&defs));
    assert_eq!(
        dictionary.suggest_with_cost("tei", &options)[0],
        SuggestionResult::new("tie", 50)
    );

    //options bring their own map
    let map = WeightMap::new()
        .with_adjustment(PenaltyAdjustment::new("double-l", "ll", 10).expect("regex"));
    let options = get_test_options().with_weight_map(Arc::new(map));
    let dictionary = Dictionary::from_words(vec!["hello"]);
    assert_eq!(
        dictionary.suggest_with_cost("hello", &options),
        vec![SuggestionResult::new("hello", 10)]
    );
}

#[test]
fn test0909_suggest_any_trie_data() {
    let options = get_test_options();
    let expected = vec![
        SuggestionResult::new("talk", 80),
        SuggestionResult::new("talks", 175),
        SuggestionResult::new("walk", 185),
    ];
    let root = TrieRoot::from_words(get_test_words());
    assert_eq!(suggest(&root, "tallk", &options), expected);
    let blob = TrieBuilder::from_word_list(get_test_words())
        .to_blob()
        .expect("blob");
    assert_eq!(suggest(&blob, "tallk", &options), expected);

    let dictionary = Dictionary::parse(get_compound_dictionary());
    let blob = dictionary.trie().to_blob().expect("blob");
    let options = options.with_num_suggestions(4).with_change_limit(1);
    assert_eq!(
        suggest(&blob, "Runningpod", &options),
        dictionary.suggest_with_cost("Runningpod", &options)
    );
}

#[test]
fn test0910_suggest_search_iterator() {
    let trie = TrieBuilder::from_word_list(get_test_words());
    let options = get_test_options();
    let found = word_set(SuggestionSearch::new(&trie, "tallk", &options).map(|s| s.word));
    assert!(found.contains("talk"));
    assert!(found.contains("talks"));
    assert!(found.contains("walk"));
}

#[test]
fn test0911_suggest_timeout() {
    let trie = TrieBuilder::from_word_list(get_large_wordlist());
    let options = get_test_options().with_timeout(Some(Duration::ZERO));
    let word = "kalominesarutivozebu";
    let mut collector = SuggestionCollector::new(word, &options);
    let mut search = SuggestionSearch::new(&trie, word, &options);
    collector.collect(&mut search);
    assert!(collector.timed_out());
    assert!(search.expanded() >= DEADLINE_CHECK_INTERVAL);
    //partial results are still valid suggestions
    assert!(collector.suggestions().len() <= options.num_suggestions);
}

#[test]
fn test0912_suggest_shared_between_threads() {
    let dictionary = Dictionary::from_words(get_sample_words());
    let options = get_test_options();
    let results: Vec<(String, Vec<String>)> = SAMPLE_WORDS
        .par_iter()
        .map(|word| (word.to_string(), dictionary.suggest(word, &options)))
        .collect();
    for (word, suggestions) in results {
        assert_eq!(suggestions[0], word);
    }
}

#[test]
fn test1001_text_format_layout() {
    let trie = TrieBuilder::from_word_list(["talk", "talks", "walk"]);
    let options = ExportOptions::default().with_base(10).with_line_breaks(false);
    assert_eq!(
        serialize_trie(&trie, &options),
        "#!/usr/bin/env cspell-trie reader\nTrieXv3\nbase=10\n# Data:\n__DATA__\ntalks$$4\nwalk$4\n"
    );
}

#[test]
fn test1002_text_format_roundtrip() {
    let trie = TrieBuilder::from_word_list(get_sample_words());
    let options = ExportOptions::default().with_comment("Sample Words\nsecond line");
    let text = serialize_trie(&trie, &options);
    assert!(text.starts_with(TRIE_TEXT_SHEBANG));
    assert!(text.contains("\nTrieXv3\nbase=16\n# Sample Words\n# second line\n# Data:\n__DATA__\n"));
    let imported = import_trie(&text).expect("import");
    assert_eq!(word_set(imported.words()), word_set(get_sample_words()));

    for options in [
        ExportOptions::default().with_line_breaks(false),
        ExportOptions::default().with_base(36),
        ExportOptions::default().with_simple_references_optimized(true),
    ] {
        let imported = import_trie(&serialize_trie(&trie, &options)).expect("import");
        assert_eq!(word_set(imported.words()), word_set(get_sample_words()));
    }

    //windows line endings
    let crlf = text.replace('\n', "\r\n");
    let imported = import_trie(&crlf).expect("import");
    assert_eq!(word_set(imported.words()), word_set(get_sample_words()));
}

#[test]
fn test1003_text_format_references() {
    let mut suffixes = TrieNode::new();
    suffixes.eow = true;
    suffixes.insert("s");
    suffixes.insert("ing");
    let suffixes = Rc::new(suffixes);
    let mut root = TrieRoot::default();
    attach(&mut root.node, "walk", &suffixes);
    attach(&mut root.node, "talk", &suffixes);
    let trie = root.to_fast_trie();

    let text = serialize_trie(&trie, &ExportOptions::default());
    //root, "t", "ta", "tal", then the shared node after "talk"
    assert!(text.contains("#4;"));
    let imported = import_trie(&text).expect("import");
    assert_eq!(word_set(imported.words()), word_set(trie.words()));
    assert!(imported.has("walking"));
    assert!(imported.has("talks"));
    //the shared suffixes stay shared
    assert_eq!(imported.size(), trie.size());
    assert!(imported.size() < TrieBuilder::from_word_list(trie.words()).size());
}

#[test]
fn test1004_text_format_multi_slot_references() {
    //enough characters that the suffix characters need several slots
    let mut root = TrieRoot::from_words((0..300u32).filter_map(|i| char::from_u32(0x4e00 + i)).map(String::from));
    let mut suffixes = TrieNode::new();
    suffixes.insert("\u{5000}\u{5001}");
    suffixes.insert("\u{5002}");
    let suffixes = Rc::new(suffixes);
    attach(&mut root.node, "\u{6000}\u{6001}", &suffixes);
    attach(&mut root.node, "\u{6002}\u{6001}", &suffixes);
    let trie = root.to_fast_trie();
    assert!(trie.char_index().index_of('\u{5000}').expect("id") >= SEQ_SPECIAL);

    let text = serialize_trie(&trie, &ExportOptions::default());
    assert!(text.contains('#'));
    let imported = import_trie(&text).expect("import");
    assert_eq!(word_set(imported.words()), word_set(trie.words()));
    assert!(imported.has("\u{6002}\u{6001}\u{5000}\u{5001}"));
    assert!(imported.has("\u{6000}\u{6001}\u{5002}"));
    assert!(!imported.has("\u{6000}\u{6001}"));
}

#[test]
fn test1005_text_format_special_characters() {
    let words = ["c++", "50%", "a$b", "x#1;", "back\\slash", "new\nline", "<tag>", "~tilde", "\u{4e00}"];
    let trie = TrieBuilder::from_word_list(words);
    let text = serialize_trie(&trie, &ExportOptions::default().with_base(10));
    let imported = import_trie(&text).expect("import");
    assert_eq!(
        word_set(imported.words()),
        word_set(words.iter().map(|w| w.to_string()))
    );
}

#[test]
fn test1006_text_format_invalid() {
    let data = |body: &str| format!("TrieXv3\nbase=10\n__DATA__\n{}", body);
    for text in ["", "hello", "TrieXv2\nbase=10\n__DATA__\nab$", "TrieXv3\nbase=x\n__DATA__\n"] {
        assert!(import_trie(text).unwrap_err().is_unsupported_format(), "{:?}", text);
    }
    assert!(matches!(
        import_trie(&data("ab#9;")),
        Err(TrieError::InvalidReference(_))
    ));
    for body in ["a$$", "a<<", "ab#1", "ab\\", "ab#z;"] {
        assert!(import_trie(&data(body)).unwrap_err().is_unsupported_format(), "{:?}", body);
    }
    //a branch without a word end is dropped
    let trie = import_trie(&data("ab<<c$")).expect("import");
    assert_eq!(word_set(trie.words()), word_set(vec!["c".to_string()]));
    assert_eq!(trie.size(), 2);
}

#[test]
fn test1007_dictionary_text_format() {
    let dictionary = Dictionary::parse(get_forbidden_dictionary());
    let text = dictionary.to_trie_text(&ExportOptions::default());
    let loaded = Dictionary::from_trie_text(&text).expect("import");
    assert_eq!(word_set(loaded.trie().words()), word_set(dictionary.trie().words()));
    assert!(loaded.has("walkingstick"));
    assert!(!loaded.has("walkingtree"));
    assert!(loaded.is_forbidden("walkingtree"));
}
