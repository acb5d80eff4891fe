//! Scalar vector kernels shared by both index kinds.
//!
//! Components are accumulated in `f64` and narrowed once so long vectors do
//! not drift. Callers guarantee equal lengths; extra components on the longer
//! side are ignored by `zip`.

/// Dot product of two equal-length vectors.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "accumulates in f64 and narrows once at the end"
)]
pub fn dot(left: &[f32], right: &[f32]) -> f32 {
    let mut sum = 0.0f64;
    for (&l, &r) in left.iter().zip(right) {
        sum += f64::from(l) * f64::from(r);
    }
    sum as f32
}

/// Euclidean (L2) norm of a vector.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "accumulates in f64 and narrows once at the end"
)]
pub fn norm(vector: &[f32]) -> f32 {
    let mut sum = 0.0f64;
    for &value in vector {
        sum += f64::from(value) * f64::from(value);
    }
    sum.sqrt() as f32
}

/// Squared Euclidean distance. The square root is skipped because ranking
/// only needs a monotone score.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "accumulates in f64 and narrows once at the end"
)]
pub fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    let mut sum = 0.0f64;
    for (&l, &r) in left.iter().zip(right) {
        let diff = f64::from(l) - f64::from(r);
        sum += diff * diff;
    }
    sum as f32
}
