//! Little-endian primitives shared by the Flat and HNSW body codecs.

use std::io::{Read, Write};

use crate::error::{IndexError, Result};

use super::codec::IdCodec;

/// Upper bound on elements preallocated from an untrusted count.
pub(crate) const MAX_PREALLOC: usize = 4096;

pub(crate) fn write_u8<W: Write>(writer: &mut W, value: u8) -> Result<()> {
    writer.write_all(&[value])?;
    Ok(())
}

pub(crate) fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_i32<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_f32<W: Write>(writer: &mut W, value: f32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

/// Writes a count or dimension as `u32`.
pub(crate) fn write_len<W: Write>(writer: &mut W, value: usize, what: &str) -> Result<()> {
    let narrow = u32::try_from(value)
        .map_err(|_| IndexError::invalid_format(format!("{what} {value} exceeds u32")))?;
    write_u32(writer, narrow)
}

/// Writes a position or level as `i32`.
pub(crate) fn write_index<W: Write>(writer: &mut W, value: usize, what: &str) -> Result<()> {
    let narrow = i32::try_from(value)
        .map_err(|_| IndexError::invalid_format(format!("{what} {value} exceeds i32")))?;
    write_i32(writer, narrow)
}

pub(crate) fn write_vector<W: Write>(writer: &mut W, vector: &[f32]) -> Result<()> {
    vector
        .iter()
        .try_for_each(|&component| write_f32(writer, component))
}

pub(crate) fn write_id<Id, W: Write>(writer: &mut W, codec: &dyn IdCodec<Id>, id: &Id) -> Result<()> {
    let bytes = codec.encode(id)?;
    write_len(writer, bytes.len(), "id length")?;
    writer.write_all(&bytes)?;
    Ok(())
}

fn read_array<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0_u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub(crate) fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let [value] = read_array::<1, R>(reader)?;
    Ok(value)
}

pub(crate) fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(reader)?))
}

pub(crate) fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    Ok(i32::from_le_bytes(read_array(reader)?))
}

pub(crate) fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    Ok(f32::from_le_bytes(read_array(reader)?))
}

/// Reads a `u32` count or dimension.
pub(crate) fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    let value = read_u32(reader)?;
    usize::try_from(value)
        .map_err(|_| IndexError::invalid_format(format!("length {value} exceeds usize")))
}

/// Reads an `i32` position or level, rejecting negative values.
pub(crate) fn read_index<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let value = read_i32(reader)?;
    usize::try_from(value).map_err(|_| IndexError::invalid_format(format!("negative {what} {value}")))
}

pub(crate) fn read_vector<R: Read>(reader: &mut R, dim: usize) -> Result<Vec<f32>> {
    let mut vector = Vec::with_capacity(dim.min(MAX_PREALLOC));
    for _ in 0..dim {
        vector.push(read_f32(reader)?);
    }
    Ok(vector)
}

pub(crate) fn read_id<Id, R: Read>(reader: &mut R, codec: &dyn IdCodec<Id>) -> Result<Id> {
    let len = read_u32(reader)?;
    let expected = usize::try_from(len)
        .map_err(|_| IndexError::invalid_format(format!("id length {len} exceeds usize")))?;
    let mut bytes = Vec::with_capacity(expected.min(MAX_PREALLOC));
    reader.by_ref().take(u64::from(len)).read_to_end(&mut bytes)?;
    if bytes.len() != expected {
        return Err(IndexError::invalid_format("unexpected end of input"));
    }
    codec.decode(&bytes)
}
