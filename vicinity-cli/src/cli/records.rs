//! Parsing for vector literals and the line-oriented build input.

use std::{io::BufRead, path::Path, str::FromStr};

use thiserror::Error;

use super::CliError;

/// A comma-separated vector literal such as `0.5,1,-2`.
///
/// # Examples
/// ```
/// use vicinity_cli::cli::VectorArg;
///
/// let parsed: VectorArg = "1, 2.5,-3".parse().expect("valid vector");
/// assert_eq!(parsed.0, vec![1.0, 2.5, -3.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct VectorArg(pub Vec<f32>);

/// Why a vector literal was rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VectorParseError {
    /// The literal held no components.
    #[error("vector has no components")]
    Empty,
    /// A component was not a finite number.
    #[error("component `{component}` is not a finite number")]
    Component {
        /// The offending text.
        component: String,
    },
}

impl FromStr for VectorArg {
    type Err = VectorParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let literal = raw.trim();
        if literal.is_empty() {
            return Err(VectorParseError::Empty);
        }
        literal
            .split(',')
            .map(|part| {
                let component = part.trim();
                component
                    .parse::<f32>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| VectorParseError::Component {
                        component: component.to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

/// One `id<whitespace>vector` line of build input.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    /// Identifier stored in the index.
    pub id: String,
    /// Vector components.
    pub vector: Vec<f32>,
}

/// Reads build records from `reader`, skipping blank lines and `#` comments.
///
/// `path` only labels errors.
///
/// # Errors
/// Returns [`CliError::Io`] when reading fails and [`CliError::Record`] for
/// a line without a vector or with a malformed one.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use vicinity_cli::cli::parse_records;
///
/// let input = "# points\na 0,0\n\nb 1,0\n";
/// let records = parse_records(input.as_bytes(), Path::new("points.txt")).expect("valid input");
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1].id, "b");
/// ```
pub fn parse_records<R: BufRead>(reader: R, path: &Path) -> Result<Vec<Record>, CliError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let text = line.map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = text.trim();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        let record_error = |reason: String| CliError::Record {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        };
        let (id, literal) = content
            .split_once(char::is_whitespace)
            .ok_or_else(|| record_error(format!("`{content}` has no vector")))?;
        let VectorArg(vector) = literal
            .parse()
            .map_err(|err: VectorParseError| record_error(err.to_string()))?;
        records.push(Record {
            id: id.to_owned(),
            vector,
        });
    }
    Ok(records)
}
