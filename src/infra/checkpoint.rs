// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights at full precision with Burn's
// named MessagePack recorder (gzip'd).
//
// Each run gets its own directory, keyed by model variant and
// run id, so two variants never overwrite each other:
//
//   checkpoints/
//     bimpm/
//       default/
//         model_epoch_3.mpk.gz   ← weights after an improving epoch
//         model_epoch_3.json     ← CheckpointMeta for that epoch
//         model_epoch_5.mpk.gz
//         model_epoch_5.json
//         best_checkpoint.json   ← CheckpointMeta of the best epoch
//         train_config.json      ← architecture + hyperparameters
//         vocabulary.json        ← written by VocabularyStore
//         metrics.csv            ← written by MetricsLogger
//
// Only epochs that improve validation accuracy are written, so
// the newest weights file is always the best one. The config is
// saved separately because the model has to be rebuilt with the
// exact same shapes before the weights can be loaded into it.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::PairError;
use crate::domain::model_kind::ModelKind;

const BEST_POINTER: &str = "best_checkpoint.json";
const CONFIG_FILE:  &str = "train_config.json";

/// f32 on disk, so a restored model is bit-identical to the saved one
type WeightsRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// What produced a checkpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub epoch:        usize,
    /// Optimizer steps taken so far
    pub step:         usize,
    pub val_accuracy: f64,
    pub val_loss:     f64,
}

/// Manages saving and loading of model checkpoints for one run.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Run directory for training; created if it doesn't exist yet
    pub fn create(root: impl AsRef<Path>, kind: ModelKind, run_id: &str) -> Result<Self> {
        let dir = Self::run_dir(root.as_ref(), kind, run_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Existing run directory, for prediction. Missing → ConfigError.
    pub fn open(root: impl AsRef<Path>, kind: ModelKind, run_id: &str) -> Result<Self> {
        let dir = Self::run_dir(root.as_ref(), kind, run_id);
        if !dir.is_dir() {
            return Err(PairError::config(format!(
                "no checkpoint directory for variant '{kind}', run '{run_id}' at '{}'",
                dir.display()
            ))
            .into());
        }
        Ok(Self { dir })
    }

    fn run_dir(root: &Path, kind: ModelKind, run_id: &str) -> PathBuf {
        root.join(kind.name()).join(run_id)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn weights_path(&self, epoch: usize) -> PathBuf {
        // no extension, the recorder adds .mpk.gz
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    /// Write the weights and metadata for an improving epoch and
    /// point best_checkpoint.json at it.
    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M, meta: &CheckpointMeta) -> Result<()> {
        let path = self.weights_path(meta.epoch);

        WeightsRecorder::default()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let json = serde_json::to_string_pretty(meta)?;
        fs::write(path.with_extension("json"), &json)
            .with_context(|| format!("Failed to write metadata for epoch {}", meta.epoch))?;
        fs::write(self.dir.join(BEST_POINTER), &json)
            .with_context(|| format!("Failed to write {BEST_POINTER}"))?;

        tracing::debug!("Saved checkpoint: epoch {} (val_acc={:.4})", meta.epoch, meta.val_accuracy);
        Ok(())
    }

    /// Metadata of the best checkpoint, if one was written
    pub fn best(&self) -> Result<Option<CheckpointMeta>> {
        let path = self.dir.join(BEST_POINTER);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let meta = serde_json::from_str(&json)
            .with_context(|| format!("Corrupt checkpoint pointer '{}'", path.display()))?;
        Ok(Some(meta))
    }

    /// Like `best`, but a missing checkpoint is a ConfigError
    pub fn require_best(&self) -> Result<CheckpointMeta> {
        self.best()?.ok_or_else(|| {
            PairError::config(format!(
                "no checkpoint in '{}'. Have you run 'train' first?",
                self.dir.display()
            ))
            .into()
        })
    }

    /// Restore the weights written for `meta.epoch` into `model`.
    /// The model must have the architecture the checkpoint was saved with.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        meta:   &CheckpointMeta,
        device: &B::Device,
    ) -> Result<M> {
        let path = self.weights_path(meta.epoch);
        tracing::info!("Loading checkpoint from epoch {}", meta.epoch);

        let record = WeightsRecorder::default()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    /// Save the training configuration to JSON.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load the configuration the run was trained with.
    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).map_err(|e| {
            PairError::config(format!("cannot read '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| PairError::config(format!("invalid '{}': {e}", path.display())).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{PairModel, PairModelConfig, SiameseModel};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn model(seed: u64) -> SiameseModel<TestBackend> {
        TestBackend::seed(seed);
        let config = PairModelConfig::new(ModelKind::Siamese, 12)
            .with_embedding_dim(4)
            .with_hidden_size(3);
        SiameseModel::init(&config, &Default::default())
    }

    fn embedding_weights(model: &SiameseModel<TestBackend>) -> Vec<f32> {
        model.encoder.embedding.weight.val().into_data().to_vec().unwrap()
    }

    fn meta(epoch: usize, val_accuracy: f64) -> CheckpointMeta {
        CheckpointMeta { epoch, step: epoch * 10, val_accuracy, val_loss: 0.5 }
    }

    #[test]
    fn test_best_pointer_follows_latest_save() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::create(tmp.path(), ModelKind::Siamese, "run").unwrap();
        assert!(manager.best().unwrap().is_none());

        let m = model(1);
        manager.save_model(&m, &meta(1, 0.6)).unwrap();
        manager.save_model(&m, &meta(3, 0.7)).unwrap();

        assert_eq!(manager.best().unwrap(), Some(meta(3, 0.7)));
        assert!(manager.dir().join("model_epoch_1.json").exists());
        assert!(manager.dir().ends_with("siamese/run"));
    }

    #[test]
    fn test_load_restores_saved_weights() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::create(tmp.path(), ModelKind::Siamese, "run").unwrap();

        let saved = model(1);
        manager.save_model(&saved, &meta(2, 0.8)).unwrap();

        let best = manager.require_best().unwrap();
        let loaded = manager.load_model(model(99), &best, &Default::default()).unwrap();

        assert_ne!(embedding_weights(&model(99)), embedding_weights(&saved));
        assert_eq!(embedding_weights(&loaded), embedding_weights(&saved));
    }

    #[test]
    fn test_missing_checkpoint_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();

        let err = CheckpointManager::open(tmp.path(), ModelKind::Bimpm, "nope").err().unwrap();
        assert!(matches!(err.downcast_ref::<PairError>(), Some(PairError::Config(_))));

        let manager = CheckpointManager::create(tmp.path(), ModelKind::Bimpm, "empty").unwrap();
        let err = manager.require_best().unwrap_err();
        assert!(matches!(err.downcast_ref::<PairError>(), Some(PairError::Config(_))));
    }

    #[test]
    fn test_config_round_trips_through_run_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::create(tmp.path(), ModelKind::Bimpm, "run").unwrap();
        let cfg = TrainConfig { perspectives: 7, ..TrainConfig::default() };

        manager.save_config(&cfg).unwrap();
        assert_eq!(manager.load_config().unwrap().perspectives, 7);
    }
}
