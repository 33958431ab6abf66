// ============================================================
// Layer 5 — Pair Classification Models
// ============================================================
// Three variants sharing one skeleton:
//
//   ids_a, ids_b ──► SequenceEncoder (shared weights) ──► Comparison
//                                                            │
//               ┌────────────────────────────────────────────┤
//               ▼                                            ▼
//     similarity_logits            Aggregator ──► Classifier
//     (siamese)                    (siamese_matching, bimpm)
//                                                            │
//                                                  logits [batch, 2]
//
// Each variant is its own Module struct; the trainer and the
// predictor are generic over PairModel and pick the concrete
// type from ModelKind once, at the top.

use burn::{
    nn::loss::CrossEntropyLossConfig,
    prelude::*,
    tensor::activation::softmax,
};

use crate::data::batcher::PairBatch;
use crate::domain::error::{PairError, PairResult};
use crate::domain::model_kind::ModelKind;
use crate::ml::classifier::{
    similarity_logits, Aggregator, AggregatorConfig, Classifier, ClassifierConfig,
};
use crate::ml::encoder::{RecurrentOutput, SequenceEncoder, SequenceEncoderConfig};
use crate::ml::matching::{
    Comparison, InnerAttention, ManhattanSimilarity, ManhattanSimilarityConfig, Matched,
    MultiPerspectiveConfig, MultiPerspectiveMatching,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct PairModelConfig {
    pub kind:       ModelKind,
    pub vocab_size: usize,
    #[config(default = 300)]
    pub embedding_dim:     usize,
    /// Hidden size of each encoder LSTM direction
    #[config(default = 100)]
    pub hidden_size:       usize,
    /// Hidden size of each aggregation LSTM direction
    #[config(default = 100)]
    pub aggregation_size:  usize,
    /// BiMPM perspectives per matching function
    #[config(default = 20)]
    pub perspectives:      usize,
    #[config(default = 100)]
    pub classifier_hidden: usize,
    #[config(default = 0.1)]
    pub dropout:           f64,
}

impl PairModelConfig {
    pub fn validate(&self) -> PairResult<()> {
        let sizes = [
            ("vocab_size", self.vocab_size),
            ("embedding_dim", self.embedding_dim),
            ("hidden_size", self.hidden_size),
            ("aggregation_size", self.aggregation_size),
            ("perspectives", self.perspectives),
            ("classifier_hidden", self.classifier_hidden),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, size)| *size == 0) {
            return Err(PairError::config(format!("{name} must be positive")));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(PairError::config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(())
    }

    fn encoder<B: Backend>(&self, device: &B::Device) -> SequenceEncoder<B> {
        SequenceEncoderConfig::new(self.vocab_size, self.embedding_dim, self.hidden_size)
            .with_dropout(self.dropout)
            .init(device)
    }

    fn head<B: Backend>(&self, d_matched: usize, device: &B::Device) -> (Aggregator<B>, Classifier<B>) {
        let aggregation = AggregatorConfig::new(d_matched, self.aggregation_size);
        let classifier  = ClassifierConfig::new(aggregation.output_width(), self.classifier_hidden)
            .with_dropout(self.dropout);
        (aggregation.init(device), classifier.init(device))
    }
}

// ─── Shared contract ─────────────────────────────────────────────────────────

/// Loss and predictions for one batch
pub struct PairOutput<B: Backend> {
    /// Mean cross-entropy, shape [1]
    pub loss:   Tensor<B, 1>,
    /// [batch, 2]
    pub logits: Tensor<B, 2>,
    /// [batch]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> PairOutput<B> {
    pub fn loss_value(&self) -> f64 {
        self.loss.clone().into_scalar().elem::<f64>()
    }

    /// Number of rows whose argmax matches the label
    pub fn correct(&self) -> usize {
        let predicted = self.logits.clone().argmax(1).flatten::<1>(0, 1);
        predicted
            .equal(self.labels.clone())
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>() as usize
    }

    pub fn batch_size(&self) -> usize {
        self.labels.dims()[0]
    }
}

pub trait PairModel<B: Backend>: Module<B> + Sized {
    const KIND: ModelKind;

    fn init(config: &PairModelConfig, device: &B::Device) -> Self;

    /// [batch, 2] logits, class 1 = paraphrase
    fn logits(&self, batch: &PairBatch<B>) -> PairResult<Tensor<B, 2>>;

    fn forward(&self, batch: &PairBatch<B>) -> PairResult<PairOutput<B>> {
        let logits = self.logits(batch)?;
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), batch.labels.clone());
        Ok(PairOutput { loss, logits, labels: batch.labels.clone() })
    }

    /// [batch, 2] class probabilities
    fn probabilities(&self, batch: &PairBatch<B>) -> PairResult<Tensor<B, 2>> {
        Ok(softmax(self.logits(batch)?, 1))
    }
}

fn encode_pair<B: Backend>(
    encoder: &SequenceEncoder<B>,
    batch:   &PairBatch<B>,
) -> PairResult<(RecurrentOutput<B>, RecurrentOutput<B>)> {
    let a = encoder.encode(batch.ids_a.clone(), batch.mask_a.clone())?;
    let b = encoder.encode(batch.ids_b.clone(), batch.mask_b.clone())?;
    Ok((a, b))
}

// ─── siamese ─────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct SiameseModel<B: Backend> {
    pub encoder:    SequenceEncoder<B>,
    pub similarity: ManhattanSimilarity<B>,
}

impl<B: Backend> PairModel<B> for SiameseModel<B> {
    const KIND: ModelKind = ModelKind::Siamese;

    fn init(config: &PairModelConfig, device: &B::Device) -> Self {
        Self {
            encoder:    config.encoder(device),
            similarity: ManhattanSimilarityConfig::new(2 * config.hidden_size).init(device),
        }
    }

    fn logits(&self, batch: &PairBatch<B>) -> PairResult<Tensor<B, 2>> {
        let (a, b) = encode_pair(&self.encoder, batch)?;
        match self.similarity.compare(&a, &b)? {
            Matched::Distance(distance) => Ok(similarity_logits(distance)),
            Matched::Sequences { .. } => Err(PairError::invariant(
                "final-state comparison produced sequences",
            )),
        }
    }
}

// ─── siamese_matching ────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct SiameseMatchingModel<B: Backend> {
    pub encoder:    SequenceEncoder<B>,
    pub aggregator: Aggregator<B>,
    pub classifier: Classifier<B>,
}

impl<B: Backend> PairModel<B> for SiameseMatchingModel<B> {
    const KIND: ModelKind = ModelKind::SiameseMatching;

    fn init(config: &PairModelConfig, device: &B::Device) -> Self {
        // own states (2H) + attended summary (2H)
        let (aggregator, classifier) = config.head(4 * config.hidden_size, device);
        Self { encoder: config.encoder(device), aggregator, classifier }
    }

    fn logits(&self, batch: &PairBatch<B>) -> PairResult<Tensor<B, 2>> {
        let (a, b) = encode_pair(&self.encoder, batch)?;
        let pair = self.aggregator.forward(InnerAttention.compare(&a, &b)?)?;
        Ok(self.classifier.forward(pair))
    }
}

// ─── bimpm ───────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct BiMpmModel<B: Backend> {
    pub encoder:    SequenceEncoder<B>,
    pub matching:   MultiPerspectiveMatching<B>,
    pub aggregator: Aggregator<B>,
    pub classifier: Classifier<B>,
}

impl<B: Backend> PairModel<B> for BiMpmModel<B> {
    const KIND: ModelKind = ModelKind::Bimpm;

    fn init(config: &PairModelConfig, device: &B::Device) -> Self {
        let matching = MultiPerspectiveConfig::new(config.hidden_size, config.perspectives);
        let (aggregator, classifier) = config.head(matching.output_width(), device);
        Self {
            encoder:  config.encoder(device),
            matching: matching.init(device),
            aggregator,
            classifier,
        }
    }

    fn logits(&self, batch: &PairBatch<B>) -> PairResult<Tensor<B, 2>> {
        let (a, b) = encode_pair(&self.encoder, batch)?;
        let pair = self.aggregator.forward(self.matching.compare(&a, &b)?)?;
        Ok(self.classifier.forward(pair))
    }
}
