// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `predict`
// and all their configurable flags.
//
// `train --config run.json` reads the whole TrainConfig from
// JSON; otherwise the flags below (with their defaults) build
// it. `--cpu` and `--resume` apply on top of either.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::predict_use_case::PredictConfig;
use crate::application::train_use_case::{ComputeDevice, TrainConfig};
use crate::domain::model_kind::ModelKind;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a paraphrase classifier on labelled sentence pairs
    Train(TrainArgs),

    /// Score sentence pairs with the best checkpoint of a run
    Predict(PredictArgs),
}

fn device(cpu: bool) -> ComputeDevice {
    if cpu { ComputeDevice::Cpu } else { ComputeDevice::Wgpu }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON training config; replaces every flag below except --cpu / --resume
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Model variant: siamese, siamese_matching or bimpm
    #[arg(long, default_value = "bimpm")]
    pub model: ModelKind,

    /// Labelled CSV/TSV with question1, question2, is_duplicate
    #[arg(long, default_value = "data/train.csv")]
    pub train_path: String,

    /// Separate validation corpus; otherwise --val-fraction is held out
    #[arg(long)]
    pub val_path: Option<String>,

    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    /// Root directory for run directories (<dir>/<model>/<run-id>)
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Directory for metrics.csv (defaults to the run directory)
    #[arg(long)]
    pub log_dir: Option<String>,

    #[arg(long, default_value = "default")]
    pub run_id: String,

    /// Continue from the run's best checkpoint
    #[arg(long)]
    pub resume: bool,

    /// Use the ndarray CPU backend instead of WGPU
    #[arg(long)]
    pub cpu: bool,

    #[arg(long, default_value_t = 300)]
    pub embedding_dim: usize,

    /// Hidden size of each encoder LSTM direction
    #[arg(long, default_value_t = 100)]
    pub hidden_size: usize,

    /// Hidden size of each aggregation LSTM direction
    #[arg(long, default_value_t = 100)]
    pub aggregation_size: usize,

    /// Learned perspectives per BiMPM matching function
    #[arg(long, default_value_t = 20)]
    pub perspectives: usize,

    #[arg(long, default_value_t = 100)]
    pub classifier_hidden: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Non-improving epochs before stopping (0 = never stop early)
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    #[arg(long, default_value_t = 20)]
    pub max_epochs: usize,

    #[arg(long, default_value_t = 50)]
    pub max_len_a: usize,

    #[arg(long, default_value_t = 50)]
    pub max_len_b: usize,

    /// Pad every batch to the max lengths instead of the batch maximum
    #[arg(long)]
    pub pad_to_max: bool,

    /// Vocabulary cap, including the padding and OOV ids
    #[arg(long)]
    pub vocab_size: Option<usize>,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Keep the training order fixed
    #[arg(long)]
    pub no_shuffle: bool,
}

impl TrainArgs {
    /// Build the application-layer TrainConfig.
    /// The application layer never sees clap types.
    pub fn into_config(self) -> Result<TrainConfig> {
        let mut cfg = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)?,
            None       => self.flags_config(),
        };
        if self.cpu {
            cfg.device = ComputeDevice::Cpu;
        }
        cfg.resume |= self.resume;
        Ok(cfg)
    }

    fn flags_config(&self) -> TrainConfig {
        TrainConfig {
            model:             self.model,
            device:            device(self.cpu),
            embedding_dim:     self.embedding_dim,
            hidden_size:       self.hidden_size,
            aggregation_size:  self.aggregation_size,
            perspectives:      self.perspectives,
            classifier_hidden: self.classifier_hidden,
            dropout:           self.dropout,
            batch_size:        self.batch_size,
            lr:                self.lr,
            patience:          self.patience,
            max_epochs:        self.max_epochs,
            seed:              self.seed,
            shuffle:           !self.no_shuffle,
            max_len_a:         self.max_len_a,
            max_len_b:         self.max_len_b,
            pad_to_max:        self.pad_to_max,
            vocab_size:        self.vocab_size,
            train_path:        self.train_path.clone(),
            val_path:          self.val_path.clone(),
            val_fraction:      self.val_fraction,
            checkpoint_dir:    self.checkpoint_dir.clone(),
            log_dir:           self.log_dir.clone(),
            run_id:            self.run_id.clone(),
            resume:            self.resume,
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Training config JSON of the run; supplies model, run id, checkpoint dir and device
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value = "bimpm")]
    pub model: ModelKind,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value = "default")]
    pub run_id: String,

    /// CSV/TSV with question1, question2 (is_duplicate optional)
    #[arg(long)]
    pub input: String,

    #[arg(long, default_value = "predictions.csv")]
    pub output: String,

    /// Defaults to the batch size the run was trained with
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Run on the CPU backend, overriding the config's device
    #[arg(long)]
    pub cpu: bool,
}

impl PredictArgs {
    pub fn into_config(self) -> Result<PredictConfig> {
        let (model, checkpoint_dir, run_id, device) = match &self.config {
            Some(path) => {
                let train = TrainConfig::from_json_file(path)?;
                let device = if self.cpu { ComputeDevice::Cpu } else { train.device };
                (train.model, train.checkpoint_dir, train.run_id, device)
            }
            None => (self.model, self.checkpoint_dir, self.run_id, device(self.cpu)),
        };
        Ok(PredictConfig {
            checkpoint_dir,
            model,
            run_id,
            input_path:  self.input,
            output_path: self.output,
            batch_size:  self.batch_size,
            device,
        })
    }
}
