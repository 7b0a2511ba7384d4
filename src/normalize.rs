use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

///Canonical composed form of a dictionary word
pub fn normalize_word(word: &str) -> String {
    word.nfc().collect()
}

///Removes all diacritics: decompose, drop the combining marks, recompose
pub fn strip_accents(word: &str) -> String {
    word.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}

///The base letter of a single (possibly accented) character
pub fn strip_char_accents(c: char) -> char {
    std::iter::once(c)
        .nfd()
        .find(|d| !is_combining_mark(*d))
        .unwrap_or(c)
}

///Lowercase form of a character, characters that lowercase to more than one character are kept
pub fn lower_char(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

///Folds a character to the form used by case and accent insensitive dictionary entries
pub fn fold_char(c: char) -> char {
    lower_char(strip_char_accents(c))
}

///The case and accent insensitive forms of a word: the lowercase form and the lowercase form
///without accents (deduplicated, in that order)
pub fn case_insensitive_forms(word: &str) -> Vec<String> {
    let lower = word.to_lowercase();
    let stripped = strip_accents(&lower);
    if stripped == lower {
        vec![lower]
    } else {
        vec![lower, stripped]
    }
}
