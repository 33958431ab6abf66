use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
};

use crate::domain::error::PairResult;
use crate::ml::masking::{
    check_mask, last_positions, permute_time, reversal_indices, select_positions, zero_padding,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct BiRecurrentConfig {
    pub d_input:  usize,
    pub d_hidden: usize,
}

impl BiRecurrentConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BiRecurrent<B> {
        BiRecurrent {
            forward_lstm:  LstmConfig::new(self.d_input, self.d_hidden, true).init(device),
            backward_lstm: LstmConfig::new(self.d_input, self.d_hidden, true).init(device),
        }
    }
}

/// Mask-aware bidirectional LSTM.
///
/// burn's Lstm always reads a row from position 0 to seq_len - 1, which is
/// fine for the forward direction of a right-padded row but would start the
/// backward direction on padding. The backward pass therefore runs over each
/// row with its real prefix reversed in place (see `reversal_indices`) and
/// the outputs are permuted back afterwards.
#[derive(Module, Debug)]
pub struct BiRecurrent<B: Backend> {
    pub forward_lstm:  Lstm<B>,
    pub backward_lstm: Lstm<B>,
}

/// Output of a bidirectional pass. Padded positions are zero.
#[derive(Debug, Clone)]
pub struct RecurrentOutput<B: Backend> {
    /// [batch, seq_len, d_hidden]
    pub forward:  Tensor<B, 3>,
    /// [batch, seq_len, d_hidden], position t has read t..len-1
    pub backward: Tensor<B, 3>,
    /// Forward state at the last real position, [batch, d_hidden]
    pub pooled_forward:  Tensor<B, 2>,
    /// Backward state at position 0 (it has read the whole row), [batch, d_hidden]
    pub pooled_backward: Tensor<B, 2>,
    pub mask: Tensor<B, 2, Bool>,
}

impl<B: Backend> RecurrentOutput<B> {
    /// Per-position vectors, both directions concatenated, [batch, seq_len, 2 * d_hidden]
    pub fn states(&self) -> Tensor<B, 3> {
        Tensor::cat(vec![self.forward.clone(), self.backward.clone()], 2)
    }

    /// Sentence vector, [batch, 2 * d_hidden]
    pub fn pooled(&self) -> Tensor<B, 2> {
        Tensor::cat(vec![self.pooled_forward.clone(), self.pooled_backward.clone()], 1)
    }
}

impl<B: Backend> BiRecurrent<B> {
    /// x: [batch, seq_len, d_input], mask: [batch, seq_len]
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> PairResult<RecurrentOutput<B>> {
        let [batch, seq_len, _] = x.dims();
        check_mask("input", [batch, seq_len], &mask)?;

        let (forward, _) = self.forward_lstm.forward(x.clone(), None);
        let forward = zero_padding(forward, mask.clone());

        let reversal = reversal_indices(mask.clone());
        let (backward, _) = self.backward_lstm.forward(permute_time(x, reversal.clone()), None);
        let backward = zero_padding(permute_time(backward, reversal), mask.clone());

        let [_, _, d_hidden] = forward.dims();
        let pooled_forward  = select_positions(forward.clone(), last_positions(mask.clone()));
        let pooled_backward = backward
            .clone()
            .slice([0..batch, 0..1, 0..d_hidden])
            .reshape([batch, d_hidden]);

        Ok(RecurrentOutput { forward, backward, pooled_forward, pooled_backward, mask })
    }
}

#[derive(Config, Debug)]
pub struct SequenceEncoderConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub hidden_size:   usize,
    #[config(default = 0.1)]
    pub dropout:       f64,
}

impl SequenceEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SequenceEncoder<B> {
        SequenceEncoder {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
            recurrent: BiRecurrentConfig::new(self.embedding_dim, self.hidden_size).init(device),
        }
    }
}

/// Token ids → contextual vectors. One instance encodes both sentences
/// of a pair, so A and B land in the same representation space.
#[derive(Module, Debug)]
pub struct SequenceEncoder<B: Backend> {
    pub embedding: Embedding<B>,
    pub dropout:   Dropout,
    pub recurrent: BiRecurrent<B>,
}

impl<B: Backend> SequenceEncoder<B> {
    /// ids: [batch, seq_len], mask: [batch, seq_len]
    pub fn encode(&self, ids: Tensor<B, 2, Int>, mask: Tensor<B, 2, Bool>) -> PairResult<RecurrentOutput<B>> {
        check_mask("ids", ids.dims(), &mask)?;
        let embedded = self.dropout.forward(self.embedding.forward(ids));
        self.recurrent.forward(embedded, mask)
    }
}
