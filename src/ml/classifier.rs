// ============================================================
// Layer 5 — Aggregation & Classifier
// ============================================================
// Turns the output of a comparison strategy into 2-class logits
// [not_paraphrase, paraphrase].
//
//   Distance      → similarity_logits()   (no parameters)
//   Sequences     → Aggregator: shared BiLSTM over the matched
//                   features of A and of B, pooled per role and
//                   concatenated  [batch, 4 * aggregation_size]
//                 → Classifier: Linear → ReLU → Dropout → Linear(2)

use burn::{
    nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu},
    prelude::*,
};

use crate::domain::error::{PairError, PairResult};
use crate::ml::encoder::{BiRecurrent, BiRecurrentConfig};
use crate::ml::matching::Matched;

/// Floor for 1 - similarity before taking the log
pub const PROBABILITY_FLOOR: f32 = 1.0e-7;

/// Logits whose softmax is [1 - s, s] for s = exp(-distance).
/// distance: [batch] → [batch, 2]
pub fn similarity_logits<B: Backend>(distance: Tensor<B, 1>) -> Tensor<B, 2> {
    let [batch] = distance.dims();
    // log s = -distance, no need to go through s itself
    let paraphrase = distance.clone().neg();
    let not_paraphrase = distance
        .neg()
        .exp()
        .neg()
        .add_scalar(1.0)
        .clamp_min(PROBABILITY_FLOOR)
        .log();
    Tensor::cat(
        vec![not_paraphrase.reshape([batch, 1]), paraphrase.reshape([batch, 1])],
        1,
    )
}

#[derive(Config, Debug)]
pub struct AggregatorConfig {
    /// Width of one matched position
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl AggregatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Aggregator<B> {
        Aggregator {
            recurrent: BiRecurrentConfig::new(self.d_input, self.d_hidden).init(device),
        }
    }

    /// Width of the pair vector handed to the classifier
    pub fn output_width(&self) -> usize {
        4 * self.d_hidden
    }
}

#[derive(Module, Debug)]
pub struct Aggregator<B: Backend> {
    pub recurrent: BiRecurrent<B>,
}

impl<B: Backend> Aggregator<B> {
    /// Matched sequences → fixed-size pair vector [batch, 4 * d_hidden]
    pub fn forward(&self, matched: Matched<B>) -> PairResult<Tensor<B, 2>> {
        match matched {
            Matched::Sequences { a, mask_a, b, mask_b } => {
                let pooled_a = self.recurrent.forward(a, mask_a)?.pooled();
                let pooled_b = self.recurrent.forward(b, mask_b)?.pooled();
                Ok(Tensor::cat(vec![pooled_a, pooled_b], 1))
            }
            Matched::Distance(_) => Err(PairError::invariant(
                "aggregation needs matched sequences, got a distance",
            )),
        }
    }
}

#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
    #[config(default = 0.1)]
    pub dropout:  f64,
}

impl ClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        Classifier {
            hidden:     LinearConfig::new(self.d_input, self.d_hidden).init(device),
            activation: Relu::new(),
            dropout:    DropoutConfig::new(self.dropout).init(),
            output:     LinearConfig::new(self.d_hidden, 2).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    pub hidden:     Linear<B>,
    pub activation: Relu,
    pub dropout:    Dropout,
    pub output:     Linear<B>,
}

impl<B: Backend> Classifier<B> {
    /// [batch, d_input] → [batch, 2]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.hidden.forward(x));
        self.output.forward(self.dropout.forward(x))
    }
}
