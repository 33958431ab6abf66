// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — trains one model variant on labelled pairs
//   2. `predict` — scores pairs with a run's best checkpoint
//
// Any error (bad config, missing checkpoint, diverged loss)
// propagates out of main() as a non-zero exit status.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

/// The main CLI struct. clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "paraphrase-id",
    version = "0.1.0",
    about = "Train Siamese / matching / BiMPM paraphrase classifiers and score sentence pairs."
)]
pub struct Cli {
    /// The subcommand to run (train or predict)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => Self::run_train(args),
            Commands::Predict(args) => Self::run_predict(args),
        }
    }

    /// Handles the `train` subcommand.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        let config = args.into_config()?;
        tracing::info!("Starting training on pairs in: {}", config.train_path);

        let report = TrainUseCase::new(config).execute()?;

        println!(
            "Training finished ({:?}) after epoch {}. Best val accuracy {:.2}% at epoch {}.",
            report.reason,
            report.state.epoch,
            report.state.best_accuracy.unwrap_or(0.0) * 100.0,
            report.state.best_epoch.map_or("-".to_string(), |e| e.to_string()),
        );
        Ok(())
    }

    /// Handles the `predict` subcommand.
    fn run_predict(args: PredictArgs) -> Result<()> {
        use crate::application::predict_use_case::PredictUseCase;

        let config = args.into_config()?;
        let output = config.output_path.clone();
        let summary = PredictUseCase::new(config).execute()?;

        println!("Wrote {} predictions to {}", summary.predictions, output);
        if let Some(accuracy) = summary.accuracy {
            println!("Accuracy against the input labels: {:.2}%", accuracy * 100.0);
        }
        Ok(())
    }
}
