// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the config
//   Step 2: Load labelled pairs          (Layer 4 - data)
//   Step 3: Validation corpus or split   (Layer 4 - data)
//   Step 4: Open the run directory       (Layer 6 - infra)
//   Step 5: Build / reuse vocabulary     (Layer 6 - infra)
//   Step 6: Encode both splits           (Layer 4 - data)
//   Step 7: Save config                  (Layer 6 - infra)
//   Step 8: Run training loop            (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::data::{
    dataset::PairDataset,
    loader::CorpusLoader,
    padding::PaddingConfig,
    splitter::split_train_val,
};
use crate::domain::error::{PairError, PairResult};
use crate::domain::model_kind::ModelKind;
use crate::domain::traits::InstanceSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    vocab_store::VocabularyStore,
};
use crate::ml::model::PairModelConfig;
use crate::ml::trainer::{run_training, Schedule, TrainingData, TrainingReport};

/// Where the tensors live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    #[default]
    Wgpu,
    Cpu,
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters and paths for a training run.
// Saved next to the checkpoints so predict can rebuild the model.
// Missing JSON keys fall back to Default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub model:             ModelKind,
    pub device:            ComputeDevice,

    // ── model ──
    pub embedding_dim:     usize,
    pub hidden_size:       usize,
    pub aggregation_size:  usize,
    pub perspectives:      usize,
    pub classifier_hidden: usize,
    pub dropout:           f64,

    // ── optimisation ──
    pub batch_size:        usize,
    pub lr:                f64,
    /// Non-improving epochs before stopping; 0 disables early stopping
    pub patience:          usize,
    pub max_epochs:        usize,
    pub seed:              u64,
    pub shuffle:           bool,

    // ── batching ──
    pub max_len_a:         usize,
    pub max_len_b:         usize,
    pub pad_to_max:        bool,
    /// Vocabulary cap including the padding and OOV ids
    pub vocab_size:        Option<usize>,

    // ── paths ──
    pub train_path:        String,
    pub val_path:          Option<String>,
    /// Held out from train_path when val_path is not set
    pub val_fraction:      f64,
    pub checkpoint_dir:    String,
    /// Directory for metrics.csv; defaults to the run directory
    pub log_dir:           Option<String>,
    pub run_id:            String,
    pub resume:            bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model:             ModelKind::Bimpm,
            device:            ComputeDevice::Wgpu,
            embedding_dim:     300,
            hidden_size:       100,
            aggregation_size:  100,
            perspectives:      20,
            classifier_hidden: 100,
            dropout:           0.1,
            batch_size:        32,
            lr:                1e-3,
            patience:          3,
            max_epochs:        20,
            seed:              42,
            shuffle:           true,
            max_len_a:         50,
            max_len_b:         50,
            pad_to_max:        false,
            vocab_size:        None,
            train_path:        "data/train.csv".to_string(),
            val_path:          None,
            val_fraction:      0.1,
            checkpoint_dir:    "checkpoints".to_string(),
            log_dir:           None,
            run_id:            "default".to_string(),
            resume:            false,
        }
    }
}

impl TrainConfig {
    /// Read a JSON config. Unreadable or malformed → ConfigError.
    pub fn from_json_file(path: impl AsRef<Path>) -> PairResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| PairError::config(format!("cannot read config '{}': {e}", path.display())))?;
        serde_json::from_str(&json)
            .map_err(|e| PairError::config(format!("invalid config '{}': {e}", path.display())))
    }

    pub fn validate(&self) -> PairResult<()> {
        if self.batch_size == 0 {
            return Err(PairError::config("batch_size must be at least 1"));
        }
        if self.max_len_a == 0 || self.max_len_b == 0 {
            return Err(PairError::config("max_len_a and max_len_b must be at least 1"));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(PairError::config(format!("learning rate must be positive, got {}", self.lr)));
        }
        if self.max_epochs == 0 {
            return Err(PairError::config("max_epochs must be at least 1"));
        }
        if let Some(cap) = self.vocab_size {
            if cap < 3 {
                return Err(PairError::config(format!(
                    "vocab_size {cap} leaves no room beyond the padding and OOV ids"
                )));
            }
        }
        if self.val_path.is_none() && !(self.val_fraction > 0.0 && self.val_fraction < 1.0) {
            return Err(PairError::config(format!(
                "val_fraction must be in (0, 1) without a val_path, got {}",
                self.val_fraction
            )));
        }
        if self.run_id.trim().is_empty() {
            return Err(PairError::config("run_id must not be empty"));
        }
        // sizes of the network itself
        self.model_config(3).validate()
    }

    pub fn model_config(&self, vocab_size: usize) -> PairModelConfig {
        PairModelConfig::new(self.model, vocab_size)
            .with_embedding_dim(self.embedding_dim)
            .with_hidden_size(self.hidden_size)
            .with_aggregation_size(self.aggregation_size)
            .with_perspectives(self.perspectives)
            .with_classifier_hidden(self.classifier_hidden)
            .with_dropout(self.dropout)
    }

    pub fn padding(&self) -> PaddingConfig {
        if self.pad_to_max {
            PaddingConfig::fixed(self.max_len_a, self.max_len_b)
        } else {
            PaddingConfig::dynamic(self.max_len_a, self.max_len_b)
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule { max_epochs: self.max_epochs, patience: self.patience }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    /// Create a new TrainUseCase with the given configuration
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingReport> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;
        tracing::info!("Training variant '{}' (run '{}')", cfg.model, cfg.run_id);

        // ── Step 2: Load labelled training pairs ──────────────────────────────
        let (instances, _) = CorpusLoader::labelled(&cfg.train_path).load_all()?;

        // ── Step 3: Validation corpus, or a seeded hold-out ───────────────────
        let (train, val) = match &cfg.val_path {
            Some(path) => (instances, CorpusLoader::labelled(path).load_all()?.0),
            None       => split_train_val(instances, 1.0 - cfg.val_fraction, cfg.seed),
        };
        if train.is_empty() || val.is_empty() {
            return Err(PairError::config(format!(
                "need at least one training and one validation pair, got {} / {}",
                train.len(),
                val.len()
            ))
            .into());
        }
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());

        // ── Step 4: Run directory ─────────────────────────────────────────────
        let checkpoints = CheckpointManager::create(&cfg.checkpoint_dir, cfg.model, &cfg.run_id)?;

        // ── Step 5: Vocabulary (training pairs only) ──────────────────────────
        // A resumed run must keep the ids its embeddings were trained with
        let indexer = VocabularyStore::new(checkpoints.dir())
            .load_or_build(&train, cfg.vocab_size, cfg.resume)?;
        let vocab_size = indexer.vocabulary()?.len();
        tracing::info!("Vocabulary size: {}", vocab_size);

        // ── Step 6: Encode ────────────────────────────────────────────────────
        let data = TrainingData {
            train: PairDataset::new(indexer.encode_all(&train)?),
            val:   PairDataset::new(indexer.encode_all(&val)?),
            vocab_size,
        };

        // ── Step 7: Save config for prediction ────────────────────────────────
        checkpoints.save_config(cfg)?;

        let metrics = match &cfg.log_dir {
            Some(dir) => MetricsLogger::new(Path::new(dir).join(cfg.model.name()).join(&cfg.run_id)),
            None      => MetricsLogger::new(checkpoints.dir()),
        }
        .context("Cannot open metrics log")?;
        tracing::info!("Epoch metrics → '{}'", metrics.csv_path().display());

        // ── Step 8: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, data, &checkpoints, &metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::checkpoint::CheckpointMeta;
    use crate::ml::trainer::StopReason;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "model": "siamese_matching", "device": "cpu", "batch_size": 8 }"#).unwrap();

        let cfg = TrainConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.model, ModelKind::SiameseMatching);
        assert_eq!(cfg.device, ComputeDevice::Cpu);
        assert_eq!(cfg.batch_size, 8);
        assert_eq!(cfg.perspectives, 20);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{ "model": "transformer" }"#).unwrap();

        assert!(matches!(TrainConfig::from_json_file(&path), Err(PairError::Config(_))));
        assert!(matches!(
            TrainConfig::from_json_file(tmp.path().join("absent.json")),
            Err(PairError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { max_len_b: 0, ..TrainConfig::default() },
            TrainConfig { perspectives: 0, ..TrainConfig::default() },
            TrainConfig { lr: 0.0, ..TrainConfig::default() },
            TrainConfig { lr: f64::NAN, ..TrainConfig::default() },
            TrainConfig { vocab_size: Some(2), ..TrainConfig::default() },
            TrainConfig { val_fraction: 1.0, ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(PairError::Config(_))), "{cfg:?}");
        }
    }

    fn write_corpus(dir: &Path) -> String {
        let path = dir.join("pairs.csv");
        let mut text = String::from("id,qid1,qid2,question1,question2,is_duplicate\n");
        let rows = [
            ("how do i learn rust", "what is the best way to learn rust", 1),
            ("why is the sky blue", "how tall is everest", 0),
            ("how can i cook rice", "what is the way to cook rice", 1),
            ("who wrote hamlet", "where is the eiffel tower", 0),
            ("what is a monad", "can someone explain monads", 1),
            ("is coffee healthy", "how far is the moon", 0),
            ("how do i learn go", "best way to learn go", 1),
            ("what time is it", "why do cats purr", 0),
        ];
        for (i, (a, b, label)) in rows.iter().enumerate() {
            text.push_str(&format!("{i},{},{},{a},{b},{label}\n", 2 * i, 2 * i + 1));
        }
        fs::write(&path, text).unwrap();
        path.display().to_string()
    }

    fn small_config(dir: &Path) -> TrainConfig {
        TrainConfig {
            model:             ModelKind::SiameseMatching,
            device:            ComputeDevice::Cpu,
            embedding_dim:     6,
            hidden_size:       4,
            aggregation_size:  3,
            classifier_hidden: 4,
            batch_size:        3,
            max_epochs:        2,
            val_fraction:      0.25,
            train_path:        write_corpus(dir),
            checkpoint_dir:    dir.join("ckpt").display().to_string(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_execute_writes_run_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = small_config(tmp.path());

        let report = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(report.reason, StopReason::MaxEpochsReached);

        let run_dir = Path::new(&cfg.checkpoint_dir).join("siamese_matching").join("default");
        for file in ["train_config.json", "vocabulary.json", "best_checkpoint.json", "metrics.csv"] {
            assert!(run_dir.join(file).exists(), "missing {file}");
        }
        let rows = fs::read_to_string(run_dir.join("metrics.csv")).unwrap().lines().count();
        assert_eq!(rows, 1 + 2);
    }

    #[test]
    fn test_resume_continues_from_best_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = small_config(tmp.path());
        let run_dir = Path::new(&cfg.checkpoint_dir).join("siamese_matching").join("default");

        let first = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(first.state.epoch, 2);
        let steps_per_epoch = first.state.step / 2;
        assert!(steps_per_epoch > 0);

        let vocabulary = fs::read_to_string(run_dir.join("vocabulary.json")).unwrap();
        let best: CheckpointMeta =
            serde_json::from_str(&fs::read_to_string(run_dir.join("best_checkpoint.json")).unwrap()).unwrap();
        assert_eq!(first.state.best_epoch, Some(best.epoch));

        // A tighter cap would shrink a rebuilt vocabulary
        let resumed = TrainConfig {
            resume:     true,
            max_epochs: 4,
            patience:   0,
            vocab_size: Some(4),
            ..cfg
        };
        let second = TrainUseCase::new(resumed).execute().unwrap();

        assert_eq!(second.reason, StopReason::MaxEpochsReached);
        assert_eq!(second.state.epoch, 4);
        assert_eq!(second.state.step, best.step + (4 - best.epoch) * steps_per_epoch);
        assert!(second.state.best_accuracy.unwrap() >= best.val_accuracy);
        assert_eq!(fs::read_to_string(run_dir.join("vocabulary.json")).unwrap(), vocabulary);

        // Numbering restarts after the best epoch, so later epochs are logged again
        let epochs: Vec<usize> = fs::read_to_string(run_dir.join("metrics.csv"))
            .unwrap()
            .lines()
            .skip(1)
            .map(|row| row.split(',').next().unwrap().parse().unwrap())
            .collect();
        let mut expected = vec![1, 2];
        expected.extend(best.epoch + 1..=4);
        assert_eq!(epochs, expected);
    }

    #[test]
    fn test_empty_corpus_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty.csv");
        fs::write(&path, "question1,question2,is_duplicate\n").unwrap();
        let cfg = TrainConfig {
            train_path: path.display().to_string(),
            ..small_config(tmp.path())
        };

        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(matches!(err.downcast_ref::<PairError>(), Some(PairError::Config(_))));
    }
}
