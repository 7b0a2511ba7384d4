use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    ///The input is not a trie (binary blob or text serialization) this version can read: wrong
    ///signature, unknown version or inconsistent content. Callers typically skip the dictionary.
    #[error("unsupported trie format: {0}")]
    UnsupportedFormat(String),

    ///A value does not fit the bit field reserved for it in the binary format
    #[error("{what} overflows the binary format: {value} exceeds {limit}")]
    Overflow {
        what: &'static str,
        value: u64,
        limit: u64,
    },

    ///A cursor was asked to point an edge at a node it can not use
    #[error("invalid node reference: {0}")]
    InvalidReference(String),

    #[error("invalid weight map definition: {0}")]
    InvalidWeightMap(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TrieError {
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, TrieError::UnsupportedFormat(_))
    }
}

pub type Result<T> = std::result::Result<T, TrieError>;
