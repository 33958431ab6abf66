// ============================================================
// Layer 4 — Pair Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec of
// EncodedInstances into device tensors.
//
// How batching works here:
//   Input:  N EncodedInstances with ragged sequence lengths
//   Step 1: PaddedBatch::from_instances pads/truncates each
//           role and derives the masks (see padding.rs)
//   Step 2: flatten each role row-major and reshape:
//           [r1_t1, .., r1_tS, r2_t1, .., rN_tS] → [N, S]
//   Output: PairBatch with ids + masks per role, labels [N]
//
// Masks travel as Bool tensors; the Int 0/1 mask built from the
// host data is converted with equal_elem(1).
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::padding::{PaddedBatch, PaddedSequences, PaddingConfig};
use crate::domain::error::{PairError, PairResult};
use crate::domain::instance::EncodedInstance;

// ─── PairBatch ────────────────────────────────────────────────────────────────
/// A batch of sentence pairs ready for the model forward pass.
/// All tensors have batch_size as their first dimension.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    /// Sequence A token ids, shape [batch_size, len_a]
    pub ids_a: Tensor<B, 2, Int>,

    /// true = real token, false = padding, shape [batch_size, len_a]
    pub mask_a: Tensor<B, 2, Bool>,

    /// Sequence B token ids, shape [batch_size, len_b]
    pub ids_b: Tensor<B, 2, Int>,

    /// shape: [batch_size, len_b]
    pub mask_b: Tensor<B, 2, Bool>,

    /// Class index per pair (0 = not paraphrase, 1 = paraphrase), shape [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> PairBatch<B> {
    /// Move a host-side padded batch onto the device.
    /// Shapes are validated first; a mismatch is an invariant violation.
    pub fn from_padded(padded: &PaddedBatch, device: &B::Device) -> PairResult<Self> {
        padded.validate()?;
        if padded.is_empty() {
            return Err(PairError::invariant("cannot build a tensor batch from zero instances"));
        }
        Ok(Self::build(padded, device))
    }

    /// Tensor construction without validation. Only called on
    /// batches produced by PaddedBatch::from_instances.
    fn build(padded: &PaddedBatch, device: &B::Device) -> Self {
        let (ids_a, mask_a) = Self::role_tensors(&padded.a, device);
        let (ids_b, mask_b) = Self::role_tensors(&padded.b, device);
        let labels = Tensor::<B, 1, Int>::from_ints(padded.class_indices().as_slice(), device);

        Self { ids_a, mask_a, ids_b, mask_b, labels }
    }

    fn role_tensors(
        role:   &PaddedSequences,
        device: &B::Device,
    ) -> (Tensor<B, 2, Int>, Tensor<B, 2, Bool>) {
        let shape = [role.rows(), role.len];

        let ids = Tensor::<B, 1, Int>::from_ints(role.flat_ids().as_slice(), device)
            .reshape(shape);
        let mask = Tensor::<B, 1, Int>::from_ints(role.flat_mask().as_slice(), device)
            .reshape(shape)
            .equal_elem(1);

        (ids, mask)
    }

    pub fn batch_size(&self) -> usize {
        self.labels.dims()[0]
    }
}

// ─── PairBatcher ──────────────────────────────────────────────────────────────
/// Holds the target device and the padding policy.
#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device:  B::Device,
    pub padding: PaddingConfig,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device, padding: PaddingConfig) -> Self {
        Self { device, padding }
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
// The DataLoader calls .batch(items) with each mini-batch of instances.
impl<B: Backend> Batcher<EncodedInstance, PairBatch<B>> for PairBatcher<B> {
    fn batch(&self, items: Vec<EncodedInstance>) -> PairBatch<B> {
        // from_instances always produces consistent shapes and the
        // DataLoader never hands out an empty batch
        let padded = PaddedBatch::from_instances(&items, &self.padding);
        PairBatch::build(&padded, &self.device)
    }
}
