// ============================================================
// Layer 5 — Mask Utilities
// ============================================================
// Every pooling and attention step receives the padding mask
// explicitly. Padded positions are treated as absent:
//
//   - before a max or softmax they are filled with MASK_FILL,
//     so a padded slot can never win a max-pool
//   - attention weights are multiplied by the mask afterwards,
//     so a padded slot always receives exactly zero weight
//   - recurrent outputs at padded positions are zeroed
//
// Masks are Bool tensors of shape [batch, seq_len], true at
// real tokens. Real tokens always form a prefix of the row.

use burn::prelude::*;
use burn::tensor::activation;

use crate::domain::error::{PairError, PairResult};

/// Large negative bias applied to masked scores
pub const MASK_FILL: f32 = -1.0e9;

/// Added under square roots so zero vectors (padding) stay differentiable
pub const NORM_EPS: f32 = 1.0e-8;

/// Fail fast when a sequence tensor and its mask disagree on [batch, seq_len].
pub fn check_mask<B: Backend>(
    role:  &str,
    dims:  [usize; 2],
    mask:  &Tensor<B, 2, Bool>,
) -> PairResult<()> {
    let mask_dims = mask.dims();
    if dims != mask_dims {
        return Err(PairError::invariant(format!(
            "sequence {role} has shape {dims:?} but its mask has shape {mask_dims:?}"
        )));
    }
    Ok(())
}

/// Number of real tokens per row, shape [batch, 1]
pub fn lengths<B: Backend>(mask: Tensor<B, 2, Bool>) -> Tensor<B, 2, Int> {
    mask.int().sum_dim(1)
}

/// Index of the last real token per row, shape [batch, 1]
/// All-padding rows point at position 0.
pub fn last_positions<B: Backend>(mask: Tensor<B, 2, Bool>) -> Tensor<B, 2, Int> {
    lengths(mask).sub_scalar(1).clamp_min(0)
}

/// Per-row permutation that reverses the real prefix and leaves
/// padding where it is:
///
///   mask [T, T, T, F, F]  →  indices [2, 1, 0, 3, 4]
///
/// The permutation is its own inverse, so the same indices undo it.
pub fn reversal_indices<B: Backend>(mask: Tensor<B, 2, Bool>) -> Tensor<B, 2, Int> {
    let [batch, len] = mask.dims();
    let device = mask.device();

    let lengths   = lengths(mask).expand([batch, len]);
    let positions = Tensor::<B, 1, Int>::arange(0..len as i64, &device)
        .unsqueeze::<2>()
        .expand([batch, len]);

    let reversed = lengths.clone().sub_scalar(1).sub(positions.clone());
    let inside   = positions.clone().lower(lengths);
    positions.mask_where(inside, reversed)
}

/// Reorder the time axis of `x` [batch, seq_len, dim] row by row
pub fn permute_time<B: Backend>(x: Tensor<B, 3>, indices: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    let [_, _, dim] = x.dims();
    x.gather(1, indices.unsqueeze_dim::<3>(2).repeat_dim(2, dim))
}

/// Pick one time step per row: x [batch, seq_len, dim], positions [batch, 1] → [batch, dim]
pub fn select_positions<B: Backend>(x: Tensor<B, 3>, positions: Tensor<B, 2, Int>) -> Tensor<B, 2> {
    let [batch, _, dim] = x.dims();
    x.gather(1, positions.unsqueeze_dim::<3>(2).repeat_dim(2, dim))
        .reshape([batch, dim])
}

/// Zero every padded position of x [batch, seq_len, dim]
pub fn zero_padding<B: Backend>(x: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
    let dims = x.dims();
    x * mask.float().unsqueeze_dim::<3>(2).expand(dims)
}

/// Softmax over the last axis of scores [batch, n_query, n_key],
/// ignoring padded keys. Rows whose keys are all padding come out
/// as all zeros.
pub fn masked_softmax<B: Backend>(
    scores:   Tensor<B, 3>,
    key_mask: Tensor<B, 2, Bool>,
) -> Tensor<B, 3> {
    let dims = scores.dims();
    let keep = key_mask.unsqueeze_dim::<3>(1).expand(dims);

    let weights = activation::softmax(scores.mask_fill(keep.clone().bool_not(), MASK_FILL), 2);
    weights * keep.float()
}

/// Scale `x` to unit L2 norm along `dim`
pub fn l2_normalize<B: Backend, const D: usize>(x: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
    let dims = x.dims();
    let norm = x.clone().powf_scalar(2.0).sum_dim(dim).add_scalar(NORM_EPS).sqrt();
    x / norm.expand(dims)
}
