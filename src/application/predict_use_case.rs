// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Scores every pair of an input corpus with the best checkpoint
// of a finished training run:
//
//   Step 1: Open the run directory       (Layer 6 - infra)
//   Step 2: Reload TrainConfig + vocab   (Layer 6 - infra)
//   Step 3: Load and encode pairs        (Layer 4 - data)
//   Step 4: Predict                      (Layer 5 - ml)
//   Step 5: Write the predictions CSV
//
// Output rows:  index,p_not_paraphrase,p_paraphrase,label
// `index` is the position among the pairs that loaded; skipped
// rows are counted in the loader log.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::train_use_case::ComputeDevice;
use crate::data::{indexer::Indexer, loader::CorpusLoader};
use crate::domain::error::PairError;
use crate::domain::model_kind::ModelKind;
use crate::domain::traits::InstanceSource;
use crate::infra::{checkpoint::CheckpointManager, vocab_store::VocabularyStore};
use crate::ml::predictor::{run_prediction, Prediction};

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub checkpoint_dir: String,
    pub model:          ModelKind,
    pub run_id:         String,
    pub input_path:     String,
    pub output_path:    String,
    /// Defaults to the training batch size
    pub batch_size:     Option<usize>,
    pub device:         ComputeDevice,
}

#[derive(Debug, Serialize)]
struct PredictionRow {
    index:            usize,
    p_not_paraphrase: f32,
    p_paraphrase:     f32,
    label:            usize,
}

/// What a prediction run produced
#[derive(Debug, Clone, PartialEq)]
pub struct PredictSummary {
    pub predictions: usize,
    /// Only when every input pair carried a label
    pub accuracy:    Option<f64>,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PredictSummary> {
        let cfg = &self.config;

        // ── Step 1: Run directory (missing → ConfigError) ─────────────────────
        let checkpoints = CheckpointManager::open(&cfg.checkpoint_dir, cfg.model, &cfg.run_id)?;

        // ── Step 2: Architecture and vocabulary of that run ───────────────────
        let train_cfg = checkpoints.load_config()?;
        if train_cfg.model != cfg.model {
            return Err(PairError::config(format!(
                "run '{}' was trained as '{}', not '{}'",
                cfg.run_id, train_cfg.model, cfg.model
            ))
            .into());
        }
        let indexer = Indexer::with_vocabulary(VocabularyStore::new(checkpoints.dir()).load()?);
        let vocab_size = indexer.vocabulary()?.len();

        // ── Step 3: Input pairs ───────────────────────────────────────────────
        let (instances, _) = CorpusLoader::unlabelled(&cfg.input_path).load_all()?;
        let encoded = indexer.encode_all(&instances)?;

        // ── Step 4: Predict ───────────────────────────────────────────────────
        let batch_size = cfg.batch_size.unwrap_or(train_cfg.batch_size);
        let predictions = run_prediction(
            cfg.device, &train_cfg, vocab_size, &encoded, batch_size, &checkpoints,
        )?;

        // ── Step 5: Write CSV ─────────────────────────────────────────────────
        self.write_predictions(&predictions)?;

        let labels: Option<Vec<_>> = instances.iter().map(|i| i.label).collect();
        let accuracy = labels.filter(|l| !l.is_empty()).map(|labels| {
            let correct = labels
                .iter()
                .zip(&predictions)
                .filter(|(label, p)| p.label() == **label)
                .count();
            correct as f64 / labels.len() as f64
        });

        match accuracy {
            Some(acc) => tracing::info!("Wrote {} predictions, accuracy {:.2}%", predictions.len(), acc * 100.0),
            None      => tracing::info!("Wrote {} predictions to '{}'", predictions.len(), cfg.output_path),
        }
        Ok(PredictSummary { predictions: predictions.len(), accuracy })
    }

    fn write_predictions(&self, predictions: &[Prediction]) -> Result<()> {
        let path = &self.config.output_path;
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Cannot create predictions file '{path}'"))?;

        for (index, p) in predictions.iter().enumerate() {
            writer.serialize(PredictionRow {
                index,
                p_not_paraphrase: p.not_paraphrase,
                p_paraphrase:     p.paraphrase,
                label:            p.label().class_index(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}
