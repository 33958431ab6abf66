// ============================================================
// Layer 5 — Predictor
// ============================================================
// Prediction mode skips the training state machine entirely:
//
//   1. rebuild the model from the run's saved TrainConfig
//   2. load the best checkpoint (missing → ConfigError)
//   3. make_batches over the encoded instances, in input order
//   4. one forward pass per batch, softmax → probability pair
//
// Runs on the inner (non-autodiff) backend, so dropout is off
// and repeated calls on the same input give identical output.

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
};

use crate::application::train_use_case::{ComputeDevice, TrainConfig};
use crate::data::batcher::PairBatch;
use crate::data::padding::{make_batches, PaddingConfig};
use crate::domain::error::{PairError, PairResult};
use crate::domain::instance::{EncodedInstance, Label};
use crate::domain::model_kind::ModelKind;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{BiMpmModel, PairModel, SiameseMatchingModel, SiameseModel};

/// Class probabilities for one pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub not_paraphrase: f32,
    pub paraphrase:     f32,
}

impl Prediction {
    pub fn label(&self) -> Label {
        if self.paraphrase > self.not_paraphrase { Label::Paraphrase } else { Label::NotParaphrase }
    }
}

/// One Prediction per instance, in input order.
pub fn predict_probabilities<B: Backend, M: PairModel<B>>(
    model:      &M,
    instances:  &[EncodedInstance],
    batch_size: usize,
    padding:    &PaddingConfig,
    device:     &B::Device,
) -> PairResult<Vec<Prediction>> {
    let mut predictions = Vec::with_capacity(instances.len());

    for padded in make_batches(instances, batch_size, padding)? {
        let batch = PairBatch::<B>::from_padded(&padded, device)?;
        let probs: Vec<f32> = model
            .probabilities(&batch)?
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| PairError::invariant(format!("unreadable probabilities: {e:?}")))?;

        predictions.extend(probs.chunks_exact(2).map(|row| Prediction {
            not_paraphrase: row[0],
            paraphrase:     row[1],
        }));
    }
    Ok(predictions)
}

/// Restore the best checkpoint of a run and score `instances`.
pub fn run_prediction(
    device:      ComputeDevice,
    train_cfg:   &TrainConfig,
    vocab_size:  usize,
    instances:   &[EncodedInstance],
    batch_size:  usize,
    checkpoints: &CheckpointManager,
) -> Result<Vec<Prediction>> {
    match device {
        ComputeDevice::Wgpu =>
            predict_on::<Wgpu>(train_cfg, vocab_size, instances, batch_size, checkpoints, WgpuDevice::default()),
        ComputeDevice::Cpu =>
            predict_on::<NdArray>(train_cfg, vocab_size, instances, batch_size, checkpoints, NdArrayDevice::default()),
    }
}

fn predict_on<B: Backend>(
    train_cfg:   &TrainConfig,
    vocab_size:  usize,
    instances:   &[EncodedInstance],
    batch_size:  usize,
    checkpoints: &CheckpointManager,
    device:      B::Device,
) -> Result<Vec<Prediction>> {
    match train_cfg.model {
        ModelKind::Siamese => predict_with::<B, SiameseModel<B>>(
            train_cfg, vocab_size, instances, batch_size, checkpoints, &device,
        ),
        ModelKind::SiameseMatching => predict_with::<B, SiameseMatchingModel<B>>(
            train_cfg, vocab_size, instances, batch_size, checkpoints, &device,
        ),
        ModelKind::Bimpm => predict_with::<B, BiMpmModel<B>>(
            train_cfg, vocab_size, instances, batch_size, checkpoints, &device,
        ),
    }
}

fn predict_with<B: Backend, M: PairModel<B>>(
    train_cfg:   &TrainConfig,
    vocab_size:  usize,
    instances:   &[EncodedInstance],
    batch_size:  usize,
    checkpoints: &CheckpointManager,
    device:      &B::Device,
) -> Result<Vec<Prediction>> {
    let meta = checkpoints.require_best()?;

    let model_cfg = train_cfg.model_config(vocab_size);
    model_cfg.validate()?;
    let model = checkpoints.load_model::<B, M>(M::init(&model_cfg, device), &meta, device)?;

    tracing::info!(
        "Predicting {} pairs with {} (epoch {}, val_acc={:.4})",
        instances.len(), M::KIND, meta.epoch, meta.val_accuracy,
    );
    Ok(predict_probabilities(&model, instances, batch_size, &train_cfg.padding(), device)?)
}
