//! Level sampling for new HNSW nodes.

use rand::{
    RngCore,
    distributions::{Distribution, Standard},
};

use super::params::HnswParams;

/// Draws a node level as `floor(-ln(U) / ln(M))`, capped at the configured
/// maximum level.
#[expect(clippy::float_arithmetic, reason = "the level distribution is logarithmic")]
pub(crate) fn sample_level(rng: &mut (dyn RngCore + Send + Sync), params: &HnswParams) -> usize {
    let draw: f64 = Standard.sample(rng);
    // `Standard` yields [0, 1); flip it to (0, 1] so the logarithm is finite.
    let uniform = 1.0 - draw;
    #[expect(
        clippy::cast_precision_loss,
        reason = "fan-out values are far below 2^52"
    )]
    let scale = (params.max_connections() as f64).ln();
    let level = (-uniform.ln() / scale).floor();
    let cap = params.max_level();
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "level is a non-negative whole number below the cap"
    )]
    let sampled = level as usize;
    sampled.min(cap)
}
