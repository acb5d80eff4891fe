//! Distance model shared by the Flat and HNSW indexes.
//!
//! Scores are distances: lower means closer. Squared Euclidean distance is
//! used for [`Metric::SquaredL2`]; cosine distance `1 - cos(a, b)` for
//! [`Metric::Cosine`], defined as `1` whenever either vector has zero norm.

mod kernels;

pub use self::kernels::{dot, norm, squared_l2};

use std::fmt;

/// Distance metric fixed for the lifetime of an index.
///
/// # Examples
/// ```
/// use vicinity_core::Metric;
///
/// assert_eq!(Metric::default(), Metric::SquaredL2);
/// let d = Metric::Cosine.distance(&[1.0, 0.0], &[0.0, 1.0]);
/// assert!((d - 1.0).abs() < 1e-6);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Metric {
    /// Squared Euclidean distance.
    #[default]
    SquaredL2,
    /// One minus cosine similarity.
    Cosine,
}

impl Metric {
    /// Wire tag used by the persistence format.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::SquaredL2 => 0,
            Self::Cosine => 1,
        }
    }

    /// Resolves a wire tag written by [`Metric::tag`].
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::SquaredL2),
            1 => Some(Self::Cosine),
            _ => None,
        }
    }

    /// Returns whether stored vectors need a cached norm.
    #[must_use]
    pub const fn uses_norm(self) -> bool {
        matches!(self, Self::Cosine)
    }

    /// Computes the distance between two vectors, deriving norms on the fly.
    #[must_use]
    pub fn distance(self, left: &[f32], right: &[f32]) -> f32 {
        match self {
            Self::SquaredL2 => squared_l2(left, right),
            Self::Cosine => cosine_with_norms(left, norm(left), right, norm(right)),
        }
    }

    /// Computes the distance reusing pre-computed norms. Norms are ignored
    /// for [`Metric::SquaredL2`].
    #[must_use]
    pub fn distance_with_norms(
        self,
        left: &[f32],
        left_norm: f32,
        right: &[f32],
        right_norm: f32,
    ) -> f32 {
        match self {
            Self::SquaredL2 => squared_l2(left, right),
            Self::Cosine => cosine_with_norms(left, left_norm, right, right_norm),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SquaredL2 => f.write_str("squared_l2"),
            Self::Cosine => f.write_str("cosine"),
        }
    }
}

#[expect(clippy::float_arithmetic, reason = "cosine distance is a float ratio")]
fn cosine_with_norms(left: &[f32], left_norm: f32, right: &[f32], right_norm: f32) -> f32 {
    if left_norm == 0.0 || right_norm == 0.0 {
        return 1.0;
    }
    let similarity = dot(left, right) / (left_norm * right_norm);
    // Rounding can push the ratio just outside [-1, 1].
    1.0 - similarity.clamp(-1.0, 1.0)
}
