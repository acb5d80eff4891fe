//! Flat index body: `dim:u32, metric:u8, count:u32`, then `count` entries of
//! `{id, dim × f32}`.

use std::{
    collections::HashSet,
    io::{Read, Write},
};

use crate::{
    distance::Metric,
    error::{IndexError, Result},
    flat::FlatState,
    types::IndexId,
};

use super::{
    IndexKind,
    codec::IdCodec,
    expect_header,
    wire::{MAX_PREALLOC, read_id, read_len, read_u8, read_vector, write_id, write_len, write_u8, write_vector},
    write_header,
};

/// Fully decoded Flat index contents, ready to be swapped in.
#[derive(Debug)]
pub(crate) struct FlatSnapshot<Id> {
    pub(crate) dim: usize,
    pub(crate) metric: Metric,
    pub(crate) ids: Vec<Id>,
    pub(crate) vectors: Vec<Vec<f32>>,
}

pub(crate) fn write<Id: IndexId, W: Write>(
    writer: &mut W,
    codec: &dyn IdCodec<Id>,
    state: &FlatState<Id>,
) -> Result<()> {
    write_header(writer, IndexKind::Flat)?;
    write_len(writer, state.dim, "dimension")?;
    write_u8(writer, state.metric.tag())?;
    write_len(writer, state.ids.len(), "entry count")?;
    for (id, vector) in state.ids.iter().zip(&state.vectors) {
        write_id(writer, codec, id)?;
        write_vector(writer, vector)?;
    }
    Ok(())
}

pub(crate) fn read<Id: IndexId, R: Read>(
    reader: &mut R,
    codec: &dyn IdCodec<Id>,
) -> Result<FlatSnapshot<Id>> {
    expect_header(reader, IndexKind::Flat)?;
    let dim = read_len(reader)?;
    let tag = read_u8(reader)?;
    let metric = Metric::from_tag(tag)
        .ok_or_else(|| IndexError::invalid_format(format!("unknown metric tag {tag}")))?;
    let count = read_len(reader)?;
    if count > 0 && dim == 0 {
        return Err(IndexError::invalid_format(
            "entries present but dimension is zero",
        ));
    }

    let mut ids = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut vectors = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut seen = HashSet::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let id = read_id(reader, codec)?;
        if !seen.insert(id.clone()) {
            return Err(IndexError::invalid_format(format!(
                "id {id:?} appears more than once"
            )));
        }
        ids.push(id);
        vectors.push(read_vector(reader, dim)?);
    }
    Ok(FlatSnapshot {
        dim,
        metric,
        ids,
        vectors,
    })
}
