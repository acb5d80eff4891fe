//! Binary persistence for both index kinds.
//!
//! Every stream starts with a six-byte header: the magic `VCNT`, a format
//! version byte, and a kind byte naming the index type. The body layout is
//! kind specific. All integers and floats are little-endian, and ids are
//! written as a `u32` length followed by the bytes of the index's
//! [`IdCodec`].

#![expect(
    clippy::little_endian_bytes,
    reason = "the saved format is little-endian on every host"
)]

pub(crate) mod codec;
pub(crate) mod flat;
pub(crate) mod hnsw;
mod wire;

pub use self::codec::{DefaultIdCodec, FnIdCodec, IdCodec};

use std::{
    fmt,
    io::{Read, Write},
};

use tracing::warn;

use crate::error::{IndexError, Result};

use self::wire::{read_u8, write_u8};

/// Leading bytes of every saved index.
pub const MAGIC: [u8; 4] = *b"VCNT";

/// Format version written by this crate.
pub const FORMAT_VERSION: u8 = 1;

/// Index type recorded in a saved stream's header.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IndexKind {
    /// Exact brute-force index.
    Flat,
    /// Hierarchical navigable small-world graph.
    Hnsw,
}

impl IndexKind {
    /// Header byte for this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Flat => 1,
            Self::Hnsw => 2,
        }
    }

    /// Resolves a header byte written by [`IndexKind::tag`].
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Flat),
            2 => Some(Self::Hnsw),
            _ => None,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => f.write_str("flat"),
            Self::Hnsw => f.write_str("hnsw"),
        }
    }
}

/// Reads the header of a saved index and reports which kind it holds.
///
/// Only the header is consumed.
///
/// # Errors
/// Returns [`IndexError::InvalidFormat`] for a wrong magic or unknown kind
/// and [`IndexError::UnsupportedVersion`] for an unknown format version.
///
/// # Examples
/// ```
/// use vicinity_core::{FlatIndex, IndexKind, probe};
///
/// let index: FlatIndex<String> = FlatIndex::new(2);
/// let mut bytes = Vec::new();
/// index.save(&mut bytes).expect("save");
/// assert_eq!(probe(bytes.as_slice()).expect("probe"), IndexKind::Flat);
/// ```
pub fn probe<R: Read>(mut reader: R) -> Result<IndexKind> {
    read_header(&mut reader)
}

pub(crate) fn write_header<W: Write>(writer: &mut W, kind: IndexKind) -> Result<()> {
    writer.write_all(&MAGIC)?;
    write_u8(writer, FORMAT_VERSION)?;
    write_u8(writer, kind.tag())
}

fn read_header<R: Read>(reader: &mut R) -> Result<IndexKind> {
    let mut magic = [0_u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        warn!(found = ?magic, "rejecting stream with unknown magic");
        return Err(IndexError::invalid_format("bad magic"));
    }
    let version = read_u8(reader)?;
    if version != FORMAT_VERSION {
        warn!(version, "rejecting stream with unsupported format version");
        return Err(IndexError::UnsupportedVersion { version });
    }
    let tag = read_u8(reader)?;
    IndexKind::from_tag(tag).ok_or_else(|| {
        warn!(tag, "rejecting stream with unknown index kind");
        IndexError::invalid_format(format!("unknown index kind {tag}"))
    })
}

/// Reads the header and checks it names `expected`.
pub(crate) fn expect_header<R: Read>(reader: &mut R, expected: IndexKind) -> Result<()> {
    let found = read_header(reader)?;
    if found != expected {
        warn!(%expected, %found, "rejecting stream holding another index kind");
        return Err(IndexError::invalid_format(format!(
            "expected a {expected} index, found {found}"
        )));
    }
    Ok(())
}
