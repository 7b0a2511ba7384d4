use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;

use crate::charindex::*;
use crate::error::*;
use crate::fasttrie::{decode_children, FastTrie};
use crate::triedata::TrieData;
use crate::types::*;

pub const BLOB_MAGIC: &[u8; 8] = b"TrieBlob";
pub const BLOB_ENDIAN_MARKER: u32 = 0x04030201;
pub const BLOB_VERSION: u32 = 1;
pub const BLOB_HEADER_SIZE: usize = 64;

const BLOB_FLAG_CASE_AWARE: u32 = 0b1;
const BLOB_CHAR_BITS: u8 = NODE_CHILD_SHIFT as u8;

///Trie in its flat serialized layout. Every node is a header word
///`(number of children << 8) | flags` followed by one word per child,
///`(offset of the child << 8) | char id`. A node handle is the word offset of its header.
///
///Binary layout (all integers little endian):
///
///| offset | size | field |
///|-------:|-----:|-------|
///| 0  | 8 | magic `TrieBlob` |
///| 8  | 4 | endian marker `0x04030201` |
///| 12 | 4 | format version |
///| 16 | 4 | flags, bit 0: case aware |
///| 20 | 4 | compound character |
///| 24 | 4 | case insensitive prefix |
///| 28 | 4 | forbidden word prefix |
///| 32 | 1 | bits per character id |
///| 33 | 1 | child reference shift |
///| 34 | 2 | reserved |
///| 36 | 4 | char table offset (bytes) |
///| 40 | 4 | char table length (entries) |
///| 44 | 4 | node table offset (bytes) |
///| 48 | 4 | node table length (words) |
///| 52 | 12 | reserved |
#[derive(Clone, Debug, PartialEq)]
pub struct TrieBlob {
    info: TrieInfo,
    char_index: CharIndex,
    nodes: Vec<u32>,
}

impl TrieBlob {
    pub fn from_fast_trie(trie: &FastTrie) -> Result<TrieBlob> {
        Self::flatten(trie, MAX_CHILD_REF)
    }

    ///Lays out the node table, `max_ref` bounds node offsets and child counts
    fn flatten(trie: &FastTrie, max_ref: u32) -> Result<TrieBlob> {
        let table = trie.nodes();
        let mut offsets = Vec::with_capacity(table.len());
        let mut offset: u64 = 0;
        for node in table.iter() {
            offsets.push(offset);
            offset += node.len() as u64;
        }
        if let Some(last) = offsets.last() {
            if *last > max_ref as u64 {
                return Err(TrieError::Overflow {
                    what: "node offset",
                    value: *last,
                    limit: max_ref as u64,
                });
            }
        }
        let mut nodes = Vec::with_capacity(offset as usize);
        for node in table.iter() {
            let num_children = (node.len() - 1) as u32;
            if num_children > max_ref {
                return Err(TrieError::Overflow {
                    what: "children per node",
                    value: num_children as u64,
                    limit: max_ref as u64,
                });
            }
            nodes.push((num_children << NODE_CHILD_SHIFT) | (node[0] & NODE_CHAR_MASK));
            for slot in node[1..].iter() {
                let child = offsets[(slot >> NODE_CHILD_SHIFT) as usize] as u32;
                nodes.push((child << NODE_CHILD_SHIFT) | (slot & NODE_CHAR_MASK));
            }
        }
        Ok(TrieBlob {
            info: trie.info().clone(),
            char_index: trie.char_index().clone(),
            nodes,
        })
    }

    ///Rebuilds the arena form, node order is preserved
    pub fn to_fast_trie(&self) -> FastTrie {
        let starts = self.node_starts();
        let mut table = Vec::with_capacity(starts.len());
        for start in starts.iter().copied() {
            let start = start as usize;
            let mut node = Vec::with_capacity(self.num_children(start as u32) + 1);
            node.push(self.nodes[start] & NODE_CHAR_MASK);
            for slot in self.child_slots(start as u32) {
                let offset = slot >> NODE_CHILD_SHIFT;
                //decode() guarantees that every reference is a node start
                let index = starts.binary_search(&offset).unwrap_or_default() as u32;
                node.push((index << NODE_CHILD_SHIFT) | (slot & NODE_CHAR_MASK));
            }
            table.push(node);
        }
        FastTrie::new(table, self.char_index.clone(), self.info.clone())
    }

    pub fn char_index(&self) -> &CharIndex {
        &self.char_index
    }

    ///The node table as stored
    pub fn node_words(&self) -> &[u32] {
        &self.nodes
    }

    fn num_children(&self, node: u32) -> usize {
        (self.nodes[node as usize] >> NODE_CHILD_SHIFT) as usize
    }

    fn child_slots(&self, node: u32) -> &[u32] {
        let start = node as usize + 1;
        &self.nodes[start..start + self.num_children(node)]
    }

    ///Offsets of all node headers, ascending
    fn node_starts(&self) -> Vec<u32> {
        let mut starts = Vec::new();
        let mut pos = 0;
        while pos < self.nodes.len() {
            starts.push(pos as u32);
            pos += 1 + self.num_children(pos as u32);
        }
        starts
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let table = self.char_index.table();
        let char_table_offset = BLOB_HEADER_SIZE;
        let node_table_offset = char_table_offset + table.len() * 4;
        let size = node_table_offset + self.nodes.len() * 4;
        if size as u64 > u32::MAX as u64 {
            return Err(TrieError::Overflow {
                what: "blob size",
                value: size as u64,
                limit: u32::MAX as u64,
            });
        }
        let mut buffer: Vec<u8> = Vec::with_capacity(size);
        buffer.write_all(BLOB_MAGIC)?;
        buffer.write_u32::<LittleEndian>(BLOB_ENDIAN_MARKER)?;
        buffer.write_u32::<LittleEndian>(BLOB_VERSION)?;
        let flags = if self.info.is_case_aware {
            BLOB_FLAG_CASE_AWARE
        } else {
            0
        };
        buffer.write_u32::<LittleEndian>(flags)?;
        buffer.write_u32::<LittleEndian>(self.info.compound_character as u32)?;
        buffer.write_u32::<LittleEndian>(self.info.strip_case_and_accents_prefix as u32)?;
        buffer.write_u32::<LittleEndian>(self.info.forbidden_word_prefix as u32)?;
        buffer.write_u8(BLOB_CHAR_BITS)?;
        buffer.write_u8(NODE_CHILD_SHIFT as u8)?;
        buffer.write_u16::<LittleEndian>(0)?;
        buffer.write_u32::<LittleEndian>(char_table_offset as u32)?;
        buffer.write_u32::<LittleEndian>(table.len() as u32)?;
        buffer.write_u32::<LittleEndian>(node_table_offset as u32)?;
        buffer.write_u32::<LittleEndian>(self.nodes.len() as u32)?;
        buffer.write_all(&[0u8; 12])?;
        debug_assert_eq!(buffer.len(), BLOB_HEADER_SIZE);
        for c in table.iter() {
            buffer.write_u32::<LittleEndian>(*c as u32)?;
        }
        for word in self.nodes.iter() {
            buffer.write_u32::<LittleEndian>(*word)?;
        }
        debug!(
            "encoded trie blob: {} characters, {} node words, {} bytes",
            table.len(),
            self.nodes.len(),
            buffer.len()
        );
        Ok(buffer)
    }

    ///Parses and validates a binary trie. Anything that is not a well formed blob of a supported
    ///version yields `TrieError::UnsupportedFormat`.
    pub fn decode(buffer: &[u8]) -> Result<TrieBlob> {
        if buffer.len() < BLOB_HEADER_SIZE {
            return Err(unsupported("buffer is shorter than the header"));
        }
        let mut reader = Cursor::new(buffer);
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic).map_err(truncated)?;
        if &magic != BLOB_MAGIC {
            return Err(unsupported("bad magic"));
        }
        if read_u32(&mut reader)? != BLOB_ENDIAN_MARKER {
            return Err(unsupported("unexpected byte order"));
        }
        let version = read_u32(&mut reader)?;
        if version != BLOB_VERSION {
            return Err(TrieError::UnsupportedFormat(format!(
                "unsupported version {}",
                version
            )));
        }
        let flags = read_u32(&mut reader)?;
        let compound_character = read_char(&mut reader)?;
        let strip_case_and_accents_prefix = read_char(&mut reader)?;
        let forbidden_word_prefix = read_char(&mut reader)?;
        let char_bits = reader.read_u8().map_err(truncated)?;
        let shift = reader.read_u8().map_err(truncated)?;
        if char_bits != BLOB_CHAR_BITS || shift as u32 != NODE_CHILD_SHIFT {
            return Err(TrieError::UnsupportedFormat(format!(
                "unsupported slot layout ({} bit characters, shift {})",
                char_bits, shift
            )));
        }
        reader.read_u16::<LittleEndian>().map_err(truncated)?;
        let char_table_offset = read_u32(&mut reader)? as usize;
        let char_table_len = read_u32(&mut reader)? as usize;
        let node_table_offset = read_u32(&mut reader)? as usize;
        let node_table_len = read_u32(&mut reader)? as usize;

        let char_bytes = section(buffer, char_table_offset, char_table_len, "char table")?;
        let node_bytes = section(buffer, node_table_offset, node_table_len, "node table")?;
        if char_table_len == 0 {
            return Err(unsupported("empty char table"));
        }

        let mut table = Vec::with_capacity(char_table_len);
        let mut reader = Cursor::new(char_bytes);
        for id in 0..char_table_len {
            let value = read_u32(&mut reader)?;
            if id == 0 {
                table.push('\0');
                continue;
            }
            match char::from_u32(value) {
                Some(c) => table.push(c),
                None => {
                    return Err(TrieError::UnsupportedFormat(format!(
                        "invalid character {:#x} in char table",
                        value
                    )))
                }
            }
        }

        let mut nodes = Vec::with_capacity(node_table_len);
        let mut reader = Cursor::new(node_bytes);
        for _ in 0..node_table_len {
            nodes.push(read_u32(&mut reader)?);
        }

        let blob = TrieBlob {
            info: TrieInfo {
                compound_character,
                strip_case_and_accents_prefix,
                forbidden_word_prefix,
                is_case_aware: flags & BLOB_FLAG_CASE_AWARE != 0,
            },
            char_index: CharIndex::from_table(table),
            nodes,
        };
        blob.validate()?;
        Ok(blob)
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(unsupported("empty node table"));
        }
        let mut starts = Vec::new();
        let mut pos = 0;
        while pos < self.nodes.len() {
            let header = self.nodes[pos];
            if NodeFlags::from_bits(header & NODE_CHAR_MASK).is_none() {
                return Err(TrieError::UnsupportedFormat(format!(
                    "unknown node flags at word {}",
                    pos
                )));
            }
            starts.push(pos as u32);
            pos += 1 + (header >> NODE_CHILD_SHIFT) as usize;
        }
        if pos != self.nodes.len() {
            return Err(unsupported("last node runs past the end of the node table"));
        }
        for start in starts.iter() {
            for slot in self.child_slots(*start) {
                if starts.binary_search(&(slot >> NODE_CHILD_SHIFT)).is_err() {
                    return Err(TrieError::UnsupportedFormat(format!(
                        "child reference {} of node {} is not a node",
                        slot >> NODE_CHILD_SHIFT,
                        start
                    )));
                }
            }
        }
        self.check_acyclic(&starts)
    }

    ///Depth-first search over the node graph, an edge back to a node on the current path is a
    ///cycle. `starts` holds the offsets of all node headers, ascending.
    fn check_acyclic(&self, starts: &[u32]) -> Result<()> {
        const UNSEEN: u8 = 0;
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;
        let position = |offset: u32| starts.binary_search(&offset).unwrap_or_default();
        let mut state = vec![UNSEEN; starts.len()];
        let mut stack: Vec<(u32, usize)> = vec![(0, 0)];
        state[0] = ON_PATH;
        while let Some((node, next)) = stack.last_mut() {
            let node = *node;
            let slots = self.child_slots(node);
            if *next == slots.len() {
                state[position(node)] = DONE;
                stack.pop();
                continue;
            }
            let child = slots[*next] >> NODE_CHILD_SHIFT;
            *next += 1;
            let index = position(child);
            match state[index] {
                UNSEEN => {
                    state[index] = ON_PATH;
                    stack.push((child, 0));
                }
                ON_PATH => {
                    return Err(TrieError::UnsupportedFormat(format!(
                        "cyclic node table: node {} refers back to node {}",
                        node, child
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl TrieData for TrieBlob {
    type Node<'a> = u32;

    fn info(&self) -> &TrieInfo {
        &self.info
    }

    fn root(&self) -> u32 {
        0
    }

    fn is_end_of_word(&self, node: u32) -> bool {
        self.nodes[node as usize] & NodeFlags::EOW.bits() != 0
    }

    fn children(&self, node: u32) -> Vec<(char, u32)> {
        decode_children(
            self.child_slots(node),
            |n| {
                if (n as usize) < self.nodes.len() {
                    Some(self.child_slots(n))
                } else {
                    None
                }
            },
            &self.char_index,
        )
    }

    fn size(&self) -> usize {
        self.node_starts().len()
    }

    fn child(&self, node: u32, c: char) -> Option<u32> {
        let seq = self.char_index.char_seq(c)?;
        let mut node = node;
        for id in seq {
            node = self
                .child_slots(node)
                .iter()
                .find(|slot| *slot & NODE_CHAR_MASK == id)
                .map(|slot| slot >> NODE_CHILD_SHIFT)?;
        }
        Some(node)
    }
}

fn unsupported(reason: &str) -> TrieError {
    TrieError::UnsupportedFormat(reason.to_string())
}

fn truncated(_err: std::io::Error) -> TrieError {
    unsupported("truncated buffer")
}

fn read_u32(reader: &mut Cursor<&[u8]>) -> Result<u32> {
    reader.read_u32::<LittleEndian>().map_err(truncated)
}

fn read_char(reader: &mut Cursor<&[u8]>) -> Result<char> {
    let value = read_u32(reader)?;
    char::from_u32(value).ok_or_else(|| {
        TrieError::UnsupportedFormat(format!("invalid marker character {:#x}", value))
    })
}

///The byte range of a table of `len` 32 bit entries at `offset`
fn section<'b>(buffer: &'b [u8], offset: usize, len: usize, what: &str) -> Result<&'b [u8]> {
    let end = len
        .checked_mul(4)
        .and_then(|bytes| bytes.checked_add(offset));
    match end {
        Some(end) if offset >= BLOB_HEADER_SIZE && end <= buffer.len() => Ok(&buffer[offset..end]),
        _ => Err(TrieError::UnsupportedFormat(format!(
            "{} is out of bounds",
            what
        ))),
    }
}
