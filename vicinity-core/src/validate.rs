//! Vector validation applied before any mutation.

use crate::error::{IndexError, Result};

/// Checks `vector` against the recorded dimension (`0` = unset).
pub(crate) fn check_vector(dim: usize, vector: &[f32]) -> Result<()> {
    if vector.is_empty() {
        return Err(IndexError::EmptyVector);
    }
    if dim != 0 && vector.len() != dim {
        return Err(IndexError::DimMismatch {
            expected: dim,
            got: vector.len(),
        });
    }
    Ok(())
}

/// Validates a whole batch before any entry is written. With `dim` unset the
/// first vector fixes the length the rest must share.
pub(crate) fn check_batch<Id>(dim: usize, ids: &[Id], vectors: &[Vec<f32>]) -> Result<()> {
    if ids.len() != vectors.len() {
        return Err(IndexError::BatchSizeMismatch {
            ids: ids.len(),
            vectors: vectors.len(),
        });
    }
    let mut expected = dim;
    for vector in vectors {
        check_vector(expected, vector)?;
        expected = vector.len();
    }
    Ok(())
}
