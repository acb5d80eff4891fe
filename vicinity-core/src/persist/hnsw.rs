//! HNSW index body.
//!
//! `dim:u32, metric:u8, M:u32, ef_construction:u32, ef_search:u32,
//! entry:i32 (-1 when empty), max_level:i32, node_count:u32`, then per node
//! `{id, deleted:u8, level:i32, norm:f32, dim × f32, for each layer
//! 0..=level: count:u32 + count × i32}`.

use std::io::{Read, Write};

use crate::{
    distance::Metric,
    error::{IndexError, Result},
    hnsw::{Graph, HnswParams, Node},
    types::IndexId,
};

use super::{
    IndexKind,
    codec::IdCodec,
    expect_header,
    wire::{
        MAX_PREALLOC, read_f32, read_i32, read_id, read_index, read_len, read_u8, read_vector,
        write_f32, write_i32, write_id, write_index, write_len, write_u8, write_vector,
    },
    write_header,
};

const NO_ENTRY: i32 = -1;

pub(crate) fn write<Id: IndexId, W: Write>(
    writer: &mut W,
    codec: &dyn IdCodec<Id>,
    graph: &Graph<Id>,
) -> Result<()> {
    let params = graph.params();
    write_header(writer, IndexKind::Hnsw)?;
    write_len(writer, graph.dim(), "dimension")?;
    write_u8(writer, params.metric().tag())?;
    write_len(writer, params.max_connections(), "max_connections")?;
    write_len(writer, params.ef_construction(), "ef_construction")?;
    write_len(writer, params.ef_search(), "ef_search")?;
    match graph.entry() {
        Some(entry) => write_index(writer, entry.node, "entry point")?,
        None => write_i32(writer, NO_ENTRY)?,
    }
    write_index(writer, graph.max_level(), "max level")?;
    write_len(writer, graph.node_count(), "node count")?;
    for node in graph.nodes() {
        write_id(writer, codec, &node.id)?;
        write_u8(writer, u8::from(node.deleted))?;
        write_index(writer, node.level(), "level")?;
        write_f32(writer, node.norm)?;
        write_vector(writer, &node.vector)?;
        for layer in node.layers() {
            write_len(writer, layer.len(), "neighbour count")?;
            for &neighbour in layer {
                write_index(writer, neighbour, "neighbour position")?;
            }
        }
    }
    Ok(())
}

/// Decodes and validates a graph. `params` supplies the settings the format
/// does not carry (level cap and RNG seed).
pub(crate) fn read<Id: IndexId, R: Read>(
    reader: &mut R,
    codec: &dyn IdCodec<Id>,
    params: &HnswParams,
) -> Result<Graph<Id>> {
    expect_header(reader, IndexKind::Hnsw)?;
    let dim = read_len(reader)?;
    let tag = read_u8(reader)?;
    let metric = Metric::from_tag(tag)
        .ok_or_else(|| IndexError::invalid_format(format!("unknown metric tag {tag}")))?;
    let max_connections = read_len(reader)?;
    let ef_construction = read_len(reader)?;
    let ef_search = read_len(reader)?;
    if ef_search == 0 {
        return Err(IndexError::invalid_format("ef_search must be at least 1"));
    }
    let settings = params
        .with_graph_settings(max_connections, ef_construction, ef_search, metric)
        .map_err(|err| IndexError::invalid_format(err.to_string()))?;
    let entry = match read_i32(reader)? {
        NO_ENTRY => None,
        raw => Some(usize::try_from(raw).map_err(|_| {
            IndexError::invalid_format(format!("entry point {raw} is out of range"))
        })?),
    };
    let max_level = read_index(reader, "max level")?;
    let count = read_len(reader)?;
    if count > 0 && dim == 0 {
        return Err(IndexError::invalid_format(
            "nodes present but dimension is zero",
        ));
    }

    let mut nodes = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        nodes.push(read_node(reader, codec, dim)?);
    }
    Graph::from_parts(dim, settings, nodes, entry, max_level)
}

fn read_node<Id: IndexId, R: Read>(
    reader: &mut R,
    codec: &dyn IdCodec<Id>,
    dim: usize,
) -> Result<Node<Id>> {
    let id = read_id(reader, codec)?;
    let deleted = match read_u8(reader)? {
        0 => false,
        1 => true,
        flag => {
            return Err(IndexError::invalid_format(format!(
                "deleted flag must be 0 or 1, found {flag}"
            )));
        }
    };
    let level = read_index(reader, "level")?;
    let norm = read_f32(reader)?;
    let vector = read_vector(reader, dim)?;
    let layers = level
        .checked_add(1)
        .ok_or_else(|| IndexError::invalid_format("level overflows"))?;
    let mut neighbours = Vec::with_capacity(layers.min(MAX_PREALLOC));
    for _ in 0..layers {
        let len = read_len(reader)?;
        let mut layer = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            layer.push(read_index(reader, "neighbour position")?);
        }
        neighbours.push(layer);
    }
    Ok(Node::from_parts(id, vector, norm, deleted, neighbours))
}
