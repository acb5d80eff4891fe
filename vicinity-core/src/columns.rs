//! Optional per-dimension labels attached to an index.

use crate::error::{IndexError, Result};

/// Column names for each vector component. Empty until configured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ColumnNames {
    names: Vec<String>,
}

impl ColumnNames {
    /// Replaces the names after checking them against `dim`.
    ///
    /// An unset dimension (`0`) is fixed to the number of names; the returned
    /// value is the dimension the caller must record.
    pub(crate) fn assign(&mut self, dim: usize, names: Vec<String>) -> Result<usize> {
        if names.is_empty() {
            return Err(IndexError::ColumnNamesMismatch {
                expected: dim,
                got: 0,
            });
        }
        if dim != 0 && names.len() != dim {
            return Err(IndexError::ColumnNamesMismatch {
                expected: dim,
                got: names.len(),
            });
        }
        let dim = names.len();
        self.names = names;
        Ok(dim)
    }

    pub(crate) fn get(&self, index: usize) -> Result<&str> {
        self.names
            .get(index)
            .map(String::as_str)
            .ok_or(IndexError::InvalidColumnIndex {
                index,
                columns: self.names.len(),
            })
    }

    pub(crate) fn to_vec(&self) -> Option<Vec<String>> {
        (!self.names.is_empty()).then(|| self.names.clone())
    }
}
