// ============================================================
// Layer 5 — Matching / Comparison Strategies
// ============================================================
// Three ways of combining the encoder outputs of sentence A
// and sentence B, one per model variant:
//
//   ManhattanSimilarity        → siamese
//       exp(-Σ w_k |a_k - b_k|) over the pooled vectors.
//       No token-level interaction.
//
//   InnerAttention             → siamese_matching
//       Each position of A attends over B with scaled
//       dot-product scores; the attended summary is
//       concatenated to A's own vector (and vice versa).
//
//   MultiPerspectiveMatching   → bimpm
//       Each position of A is compared against B with four
//       matching functions, each under `perspectives` learned
//       weight vectors (cosine of w ∘ a against w ∘ b):
//         full          — B's pooled state for this direction
//         max-pool      — every position of B, max over B
//         attentive     — attention-weighted mean of B
//         max-attentive — the single B position with the
//                         highest cosine to a
//       Run separately on the forward and backward LSTM states
//       and concatenated: 8 × perspectives features per position.
//
// All strategies take the masks from the encoder outputs and
// treat padding as absent (see masking.rs).
//
// Reference: Wang, Hamza & Florian (2017) Bilateral Multi-Perspective
//            Matching for Natural Language Sentences
//            Mueller & Thyagarajan (2016) Siamese Recurrent Architectures

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
};

use crate::domain::error::{PairError, PairResult};
use crate::ml::encoder::RecurrentOutput;
use crate::ml::masking::{check_mask, l2_normalize, masked_softmax, zero_padding, MASK_FILL};

/// The joint representation produced by a comparison strategy.
#[derive(Debug, Clone)]
pub enum Matched<B: Backend> {
    /// Weighted Manhattan distance between pooled vectors, [batch]
    /// The similarity score is exp(-distance), see `similarity_logits`.
    Distance(Tensor<B, 1>),

    /// Per-position matched features for both roles, zero at padding.
    Sequences {
        a:      Tensor<B, 3>,
        mask_a: Tensor<B, 2, Bool>,
        b:      Tensor<B, 3>,
        mask_b: Tensor<B, 2, Bool>,
    },
}

/// Shared contract of the three strategies.
pub trait Comparison<B: Backend> {
    fn compare(&self, a: &RecurrentOutput<B>, b: &RecurrentOutput<B>) -> PairResult<Matched<B>>;
}

fn check_states<B: Backend>(role: &str, encoded: &RecurrentOutput<B>) -> PairResult<()> {
    let [batch, seq_len, _] = encoded.forward.dims();
    check_mask(role, [batch, seq_len], &encoded.mask)?;
    if encoded.backward.dims() != encoded.forward.dims() {
        return Err(PairError::invariant(format!(
            "sequence {role}: forward states {:?} and backward states {:?} differ",
            encoded.forward.dims(),
            encoded.backward.dims()
        )));
    }
    Ok(())
}

fn check_pair<B: Backend>(a: &RecurrentOutput<B>, b: &RecurrentOutput<B>) -> PairResult<()> {
    check_states("A", a)?;
    check_states("B", b)?;
    let (dims_a, dims_b) = (a.forward.dims(), b.forward.dims());
    if dims_a[0] != dims_b[0] || dims_a[2] != dims_b[2] {
        return Err(PairError::invariant(format!(
            "sequences A {dims_a:?} and B {dims_b:?} disagree on batch size or width"
        )));
    }
    Ok(())
}

// ─── Final-state comparison ──────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ManhattanSimilarityConfig {
    /// Width of the pooled sentence vector
    pub d_input: usize,
}

impl ManhattanSimilarityConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ManhattanSimilarity<B> {
        ManhattanSimilarity {
            weights: Initializer::Ones.init([self.d_input], device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ManhattanSimilarity<B: Backend> {
    /// One weight per feature; used through abs() so the distance stays a distance
    pub weights: Param<Tensor<B, 1>>,
}

impl<B: Backend> ManhattanSimilarity<B> {
    /// a, b: [batch, d] → [batch]. Symmetric in a and b.
    pub fn distance(&self, a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch, d] = a.dims();
        let weights = self.weights.val().abs().unsqueeze::<2>().expand([batch, d]);
        ((a - b).abs() * weights).sum_dim(1).reshape([batch])
    }
}

impl<B: Backend> Comparison<B> for ManhattanSimilarity<B> {
    fn compare(&self, a: &RecurrentOutput<B>, b: &RecurrentOutput<B>) -> PairResult<Matched<B>> {
        check_pair(a, b)?;
        Ok(Matched::Distance(self.distance(a.pooled(), b.pooled())))
    }
}

// ─── Inner-attention matching ────────────────────────────────────────────────

/// Parameter-free word-level attention between the two sentences.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerAttention;

impl InnerAttention {
    /// For every query position, the attention-weighted mean of the keys.
    /// query: [batch, n_q, d], keys: [batch, n_k, d] → [batch, n_q, d]
    pub fn attend<B: Backend>(
        query:    Tensor<B, 3>,
        keys:     Tensor<B, 3>,
        key_mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [_, _, d] = query.dims();
        let scores = query
            .matmul(keys.clone().swap_dims(1, 2))
            .div_scalar((d as f32).sqrt());
        masked_softmax(scores, key_mask).matmul(keys)
    }
}

impl<B: Backend> Comparison<B> for InnerAttention {
    fn compare(&self, a: &RecurrentOutput<B>, b: &RecurrentOutput<B>) -> PairResult<Matched<B>> {
        check_pair(a, b)?;
        let (states_a, states_b) = (a.states(), b.states());

        let attended_a = Self::attend(states_a.clone(), states_b.clone(), b.mask.clone());
        let attended_b = Self::attend(states_b.clone(), states_a.clone(), a.mask.clone());

        Ok(Matched::Sequences {
            a:      zero_padding(Tensor::cat(vec![states_a, attended_a], 2), a.mask.clone()),
            mask_a: a.mask.clone(),
            b:      zero_padding(Tensor::cat(vec![states_b, attended_b], 2), b.mask.clone()),
            mask_b: b.mask.clone(),
        })
    }
}

// ─── Multi-perspective matching ──────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct MultiPerspectiveConfig {
    /// Width of one LSTM direction
    pub d_hidden:     usize,
    pub perspectives: usize,
}

impl MultiPerspectiveConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MultiPerspectiveMatching<B> {
        MultiPerspectiveMatching {
            forward:      self.init_weights(device),
            backward:     self.init_weights(device),
            perspectives: self.perspectives,
        }
    }

    fn init_weights<B: Backend>(&self, device: &B::Device) -> PerspectiveWeights<B> {
        let init  = Initializer::Uniform { min: 0.0, max: 1.0 };
        let shape = [self.perspectives, self.d_hidden];
        PerspectiveWeights {
            full:          init.init(shape, device),
            max_pool:      init.init(shape, device),
            attentive:     init.init(shape, device),
            max_attentive: init.init(shape, device),
        }
    }

    /// Features produced per position: 4 functions × 2 directions
    pub fn output_width(&self) -> usize {
        8 * self.perspectives
    }
}

/// One [perspectives, d_hidden] weight matrix per matching function.
#[derive(Module, Debug)]
pub struct PerspectiveWeights<B: Backend> {
    pub full:          Param<Tensor<B, 2>>,
    pub max_pool:      Param<Tensor<B, 2>>,
    pub attentive:     Param<Tensor<B, 2>>,
    pub max_attentive: Param<Tensor<B, 2>>,
}

#[derive(Module, Debug)]
pub struct MultiPerspectiveMatching<B: Backend> {
    pub forward:      PerspectiveWeights<B>,
    pub backward:     PerspectiveWeights<B>,
    pub perspectives: usize,
}

/// Cosine of w_k ∘ v1 against w_k ∘ v2 for every perspective k.
/// v1, v2: [batch, seq, d], w: [l, d] → [batch, seq, l]
fn perspective_cosine<B: Backend>(v1: Tensor<B, 3>, v2: Tensor<B, 3>, w: Tensor<B, 2>) -> Tensor<B, 3> {
    let [batch, seq, d] = v1.dims();
    let [l, _] = w.dims();
    let shape = [batch, seq, l, d];

    let w  = w.reshape([1, 1, l, d]).expand(shape);
    let v1 = l2_normalize(v1.unsqueeze_dim::<4>(2).expand(shape) * w.clone(), 3);
    let v2 = l2_normalize(v2.unsqueeze_dim::<4>(2).expand(shape) * w, 3);

    (v1 * v2).sum_dim(3).reshape([batch, seq, l])
}

/// Plain cosine between every position of v1 and every position of v2.
/// v1: [batch, n1, d], v2: [batch, n2, d] → [batch, n1, n2]
fn cosine_matrix<B: Backend>(v1: Tensor<B, 3>, v2: Tensor<B, 3>) -> Tensor<B, 3> {
    l2_normalize(v1, 2).matmul(l2_normalize(v2, 2).swap_dims(1, 2))
}

/// Max over the positions of v2 of the perspective cosine with each v1 position.
/// v1: [batch, n1, d], v2: [batch, n2, d], w: [l, d] → [batch, n1, l]
fn max_pool_matching<B: Backend>(
    v1:      Tensor<B, 3>,
    v2:      Tensor<B, 3>,
    mask_2:  Tensor<B, 2, Bool>,
    w:       Tensor<B, 2>,
) -> Tensor<B, 3> {
    let [batch, n1, d] = v1.dims();
    let [_, n2, _] = v2.dims();
    let [l, _] = w.dims();

    let weighted = |v: Tensor<B, 3>, n: usize| {
        let shape = [batch, n, l, d];
        // [batch, n, l, d] → [batch, l, n, d]
        l2_normalize(v.unsqueeze_dim::<4>(2).expand(shape) * w.clone().reshape([1, 1, l, d]).expand(shape), 3)
            .swap_dims(1, 2)
    };

    // [batch, l, n1, n2]
    let sims = weighted(v1, n1).matmul(weighted(v2, n2).swap_dims(2, 3));
    let keep = mask_2.reshape([batch, 1, 1, n2]).expand([batch, l, n1, n2]);

    sims.mask_fill(keep.bool_not(), MASK_FILL)
        .max_dim(3)
        .reshape([batch, l, n1])
        .swap_dims(1, 2)
        // rows where v2 is all padding
        .clamp_min(-1.0)
}

impl<B: Backend> MultiPerspectiveMatching<B> {
    /// Match every position of `v1` against sequence 2 in one direction.
    /// Returns [batch, n1, 4 * perspectives].
    fn match_direction(
        &self,
        weights: &PerspectiveWeights<B>,
        v1:       Tensor<B, 3>,
        v2:       Tensor<B, 3>,
        mask_2:   Tensor<B, 2, Bool>,
        pooled_2: Tensor<B, 2>,
    ) -> Tensor<B, 3> {
        let [batch, n1, d] = v1.dims();
        let [_, n2, _] = v2.dims();

        let full = perspective_cosine(
            v1.clone(),
            pooled_2.unsqueeze_dim::<3>(1).expand([batch, n1, d]),
            weights.full.val(),
        );

        let max_pool = max_pool_matching(v1.clone(), v2.clone(), mask_2.clone(), weights.max_pool.val());

        let cosine = cosine_matrix(v1.clone(), v2.clone());

        let attended = masked_softmax(cosine.clone(), mask_2.clone()).matmul(v2.clone());
        let attentive = perspective_cosine(v1.clone(), attended, weights.attentive.val());

        let keep = mask_2.unsqueeze_dim::<3>(1).expand([batch, n1, n2]);
        let best = cosine.mask_fill(keep.bool_not(), MASK_FILL).argmax(2);
        let strongest = v2.gather(1, best.repeat_dim(2, d));
        let max_attentive = perspective_cosine(v1, strongest, weights.max_attentive.val());

        Tensor::cat(vec![full, max_pool, attentive, max_attentive], 2)
    }

    /// Match `one` against `other` in both directions → [batch, n_one, 8 * perspectives]
    fn match_sequence(&self, one: &RecurrentOutput<B>, other: &RecurrentOutput<B>) -> Tensor<B, 3> {
        let forward = self.match_direction(
            &self.forward,
            one.forward.clone(),
            other.forward.clone(),
            other.mask.clone(),
            other.pooled_forward.clone(),
        );
        let backward = self.match_direction(
            &self.backward,
            one.backward.clone(),
            other.backward.clone(),
            other.mask.clone(),
            other.pooled_backward.clone(),
        );
        zero_padding(Tensor::cat(vec![forward, backward], 2), one.mask.clone())
    }
}

impl<B: Backend> Comparison<B> for MultiPerspectiveMatching<B> {
    fn compare(&self, a: &RecurrentOutput<B>, b: &RecurrentOutput<B>) -> PairResult<Matched<B>> {
        check_pair(a, b)?;
        Ok(Matched::Sequences {
            a:      self.match_sequence(a, b),
            mask_a: a.mask.clone(),
            b:      self.match_sequence(b, a),
            mask_b: b.mask.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// Hand-built encoder output: forward = backward = `values`
    fn encoded(values: Vec<f32>, lengths: &[usize], seq: usize, d: usize) -> RecurrentOutput<TestBackend> {
        let device = Default::default();
        let batch  = lengths.len();
        let states = Tensor::<TestBackend, 1>::from_floats(values.as_slice(), &device).reshape([batch, seq, d]);
        let mask_flat: Vec<i32> = lengths
            .iter()
            .flat_map(|&len| (0..seq).map(move |t| (t < len) as i32))
            .collect();
        let mask = Tensor::<TestBackend, 1, Int>::from_ints(mask_flat.as_slice(), &device)
            .reshape([batch, seq])
            .equal_elem(1);
        let states = zero_padding(states, mask.clone());
        let pooled = states.clone().slice([0..batch, 0..1, 0..d]).reshape([batch, d]);
        RecurrentOutput {
            forward: states.clone(),
            backward: states,
            pooled_forward: pooled.clone(),
            pooled_backward: pooled,
            mask,
        }
    }

    fn floats<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    #[test]
    fn test_manhattan_similarity_is_symmetric_and_in_range() {
        let device = Default::default();
        let similarity = ManhattanSimilarityConfig::new(4).init::<TestBackend>(&device);
        let a = encoded(vec![0.1, 0.2, 0.0, 0.0, 0.3, -0.4, 0.5, 0.5], &[1, 2], 2, 2);
        let b = encoded(vec![0.3, 0.1, 0.9, 0.9, 0.3, -0.4, 0.0, 0.0], &[2, 1], 2, 2);

        let score = |matched: Matched<TestBackend>| match matched {
            Matched::Distance(distance) => floats(distance.neg().exp()),
            Matched::Sequences { .. } => unreachable!(),
        };
        let ab = score(similarity.compare(&a, &b).unwrap());
        let ba = score(similarity.compare(&b, &a).unwrap());

        assert_eq!(ab, ba);
        // second pair has identical pooled vectors
        assert!((ab[1] - 1.0).abs() < 1e-6);
        assert!(ab[0] > 0.0 && ab[0] < 1.0);
        // pooled = [pos 0, pos 0], so 2 × (|0.1-0.3| + |0.2-0.1|) = 0.6
        assert!((ab[0] - (-0.6f32).exp()).abs() < 1e-5);
    }

    #[test]
    fn test_inner_attention_keeps_lengths_and_doubles_width() {
        let a = encoded((0..12).map(|v| v as f32 / 10.0).collect(), &[3], 3, 4);
        let b = encoded((0..8).map(|v| v as f32 / 7.0).collect(), &[1], 2, 4);

        match InnerAttention.compare(&a, &b).unwrap() {
            Matched::Sequences { a: ma, b: mb, .. } => {
                // states() concatenates both directions (8) plus the attended summary (8)
                assert_eq!(ma.dims(), [1, 3, 16]);
                assert_eq!(mb.dims(), [1, 2, 16]);
                // B has a single real token, so every A position attends to it alone
                let ma = floats(ma);
                let b_first: Vec<f32> = floats(b.states())[..8].to_vec();
                for t in 0..3 {
                    let attended = &ma[t * 16 + 8..t * 16 + 16];
                    for (x, y) in attended.iter().zip(&b_first) {
                        assert!((x - y).abs() < 1e-5);
                    }
                }
            }
            Matched::Distance(_) => panic!("inner attention must produce sequences"),
        }
    }

    #[test]
    fn test_multi_perspective_output_width_and_padding() {
        let device = Default::default();
        TestBackend::seed(3);
        let matching = MultiPerspectiveConfig::new(4, 5).init::<TestBackend>(&device);
        let a = encoded((0..24).map(|v| (v as f32 * 0.37).sin()).collect(), &[3, 1], 3, 4);
        let b = encoded((0..16).map(|v| (v as f32 * 0.91).cos()).collect(), &[2, 2], 2, 4);

        let Matched::Sequences { a: ma, b: mb, .. } = matching.compare(&a, &b).unwrap() else {
            panic!("multi-perspective matching must produce sequences");
        };
        assert_eq!(ma.dims(), [2, 3, 40]);
        assert_eq!(mb.dims(), [2, 2, 40]);

        // second row of A has one real token: positions 1 and 2 are zero
        let ma = floats(ma);
        let row_1 = &ma[3 * 40..];
        assert!(row_1[40..].iter().all(|v| *v == 0.0));
        // every cosine feature lies in [-1, 1]
        assert!(ma.iter().all(|v| (-1.0 - 1e-5..=1.0 + 1e-5).contains(v)));
    }

    #[test]
    fn test_multi_perspective_is_invariant_to_extra_padding_of_b() {
        let device = Default::default();
        TestBackend::seed(11);
        let matching = MultiPerspectiveConfig::new(3, 4).init::<TestBackend>(&device);

        let a_values: Vec<f32> = (0..12).map(|v| (v as f32 * 0.53).sin()).collect();
        let b_values: Vec<f32> = (0..6).map(|v| (v as f32 * 0.29).cos()).collect();
        let mut b_padded = b_values.clone();
        // three more padded positions; values past the length are discarded
        b_padded.extend([9.0, -9.0, 4.0, 7.0, 7.0, 7.0, -3.0, 2.0, 8.0]);

        let a       = encoded(a_values, &[4], 4, 3);
        let b_tight = encoded(b_values, &[2], 2, 3);
        let b_loose = encoded(b_padded, &[2], 5, 3);

        let extract = |matched: Matched<TestBackend>| match matched {
            Matched::Sequences { a, .. } => floats(a),
            Matched::Distance(_) => unreachable!(),
        };
        let tight = extract(matching.compare(&a, &b_tight).unwrap());
        let loose = extract(matching.compare(&a, &b_loose).unwrap());

        assert_eq!(tight.len(), loose.len());
        for (t, l) in tight.iter().zip(&loose) {
            assert!((t - l).abs() < 1e-5, "{t} != {l}");
        }
    }

    #[test]
    fn test_padded_position_never_wins_max_pool() {
        let device = Default::default();
        let v1 = Tensor::<TestBackend, 3>::from_floats([[[1.0, 0.0]]], &device);
        // real B token is orthogonal to v1, padded token is identical to v1
        let v2 = Tensor::<TestBackend, 3>::from_floats([[[0.0, 1.0], [1.0, 0.0]]], &device);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 0], &device)
            .reshape([1, 2])
            .equal_elem(1);
        let w = Tensor::<TestBackend, 2>::ones([1, 2], &device);

        let best = floats(max_pool_matching(v1, v2, mask, w));
        assert!(best[0].abs() < 1e-4, "padding leaked into max-pool: {best:?}");
    }

    #[test]
    fn test_mismatched_batch_sizes_fail_fast() {
        let a = encoded(vec![0.5; 4], &[2], 2, 2);
        let b = encoded(vec![0.5; 8], &[2, 2], 2, 2);
        assert!(matches!(InnerAttention.compare(&a, &b), Err(PairError::InvariantViolation(_))));
    }
}
