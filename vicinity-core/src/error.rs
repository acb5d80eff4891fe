//! Error types for the vicinity core library.
//!
//! Every fallible index operation returns [`IndexError`]. Each variant maps to
//! a stable [`IndexErrorCode`] so callers can match on machine-readable codes
//! without depending on display strings.

use std::{fmt, io, sync::Arc};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Errors produced by index mutation, configuration, and persistence.
///
/// Search operations never return this type: an invalid `k`, a query with the
/// wrong dimension, or an empty index all produce an empty result list.
#[non_exhaustive]
#[derive(Clone, Debug, Error)]
pub enum IndexError {
    /// The identifier is already present among live entries.
    #[error("id {id} already exists")]
    IdExists {
        /// Debug rendering of the conflicting identifier.
        id: String,
    },
    /// The vector length differs from the dimension fixed by earlier inserts.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimMismatch {
        /// Dimension recorded by the index.
        expected: usize,
        /// Length of the rejected vector.
        got: usize,
    },
    /// A zero-length vector was supplied.
    #[error("vectors must contain at least one component")]
    EmptyVector,
    /// A batch carried a different number of ids and vectors.
    #[error("batch has {ids} ids but {vectors} vectors")]
    BatchSizeMismatch {
        /// Number of identifiers in the batch.
        ids: usize,
        /// Number of vectors in the batch.
        vectors: usize,
    },
    /// The id type has no built-in persistence codec.
    #[error("id type `{type_name}` is not supported by the default codec")]
    UnsupportedIdType {
        /// Rust type name of the rejected id type.
        type_name: &'static str,
    },
    /// The byte stream is not a valid saved index.
    #[error("invalid index format: {reason}")]
    InvalidFormat {
        /// Human-readable description of the first problem found.
        reason: String,
    },
    /// The byte stream is a saved index written by an unknown format version.
    #[error("unsupported index format version {version}")]
    UnsupportedVersion {
        /// Version byte found in the stream.
        version: u8,
    },
    /// A column index fell outside the configured dimension.
    #[error("column index {index} is out of range for {columns} columns")]
    InvalidColumnIndex {
        /// Requested column position.
        index: usize,
        /// Number of named columns.
        columns: usize,
    },
    /// The number of column names differs from the index dimension.
    #[error("expected {expected} column names, got {got}")]
    ColumnNamesMismatch {
        /// Dimension recorded by the index.
        expected: usize,
        /// Number of names supplied.
        got: usize,
    },
    /// Construction parameters were rejected.
    #[error("invalid index parameter: {reason}")]
    InvalidParameters {
        /// Description of the rejected parameter.
        reason: String,
    },
    /// A previous writer panicked while holding the index lock.
    #[error("{resource} lock poisoned")]
    LockPoisoned {
        /// Name of the poisoned resource.
        resource: &'static str,
    },
    /// Reading or writing the underlying stream failed.
    #[error("i/o failure: {source}")]
    Io {
        /// Underlying stream error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl From<io::Error> for IndexError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            return Self::InvalidFormat {
                reason: "unexpected end of input".into(),
            };
        }
        Self::Io {
            source: Arc::new(error),
        }
    }
}

define_error_codes! {
    /// Stable codes describing [`IndexError`] variants.
    enum IndexErrorCode for IndexError {
        /// The identifier is already present among live entries.
        IdExists => IdExists { .. } => "INDEX_ID_EXISTS",
        /// The vector length differs from the recorded dimension.
        DimMismatch => DimMismatch { .. } => "INDEX_DIM_MISMATCH",
        /// A zero-length vector was supplied.
        EmptyVector => EmptyVector => "INDEX_EMPTY_VECTOR",
        /// A batch carried a different number of ids and vectors.
        BatchSizeMismatch => BatchSizeMismatch { .. } => "INDEX_BATCH_SIZE_MISMATCH",
        /// The id type has no built-in persistence codec.
        UnsupportedIdType => UnsupportedIdType { .. } => "INDEX_UNSUPPORTED_ID_TYPE",
        /// The byte stream is not a valid saved index.
        InvalidFormat => InvalidFormat { .. } => "INDEX_INVALID_FORMAT",
        /// The byte stream uses an unknown format version.
        UnsupportedVersion => UnsupportedVersion { .. } => "INDEX_UNSUPPORTED_VERSION",
        /// A column index fell outside the configured dimension.
        InvalidColumnIndex => InvalidColumnIndex { .. } => "INDEX_INVALID_COLUMN_INDEX",
        /// The number of column names differs from the index dimension.
        ColumnNamesMismatch => ColumnNamesMismatch { .. } => "INDEX_COLUMN_NAMES_MISMATCH",
        /// Construction parameters were rejected.
        InvalidParameters => InvalidParameters { .. } => "INDEX_INVALID_PARAMETERS",
        /// A previous writer panicked while holding the index lock.
        LockPoisoned => LockPoisoned { .. } => "INDEX_LOCK_POISONED",
        /// Reading or writing the underlying stream failed.
        Io => Io { .. } => "INDEX_IO",
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, IndexError>;

impl IndexError {
    pub(crate) fn id_exists<Id: fmt::Debug>(id: &Id) -> Self {
        Self::IdExists {
            id: format!("{id:?}"),
        }
    }

    pub(crate) fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }
}
