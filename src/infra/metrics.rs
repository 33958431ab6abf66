// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:          the epoch number (1, 2, 3, ...)
//   - train_loss:     mean cross-entropy over training instances
//   - train_accuracy: fraction of training pairs classified correctly
//   - val_loss:       mean cross-entropy on the validation set
//   - val_accuracy:   the metric that drives checkpointing
//   - improved:       1 if this epoch set a new best val_accuracy
//
// Output file: <run dir>/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,train_accuracy,val_loss,val_accuracy,improved
//   1,0.642100,0.631000,0.611800,0.664000,1
//   2,0.571300,0.702000,0.590200,0.689000,1
//   3,0.512900,0.748000,0.601100,0.681000,0
//
// A resumed run appends to the same file. Training restarts from
// the best checkpoint, so epochs that ran after it are trained and
// logged again under the same numbers; the later row is the one
// that belongs to the surviving weights.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    pub train_loss:     f64,
    pub train_accuracy: f64,

    /// Should track train_loss; a widening gap indicates overfitting
    pub val_loss:       f64,

    /// Range: [0.0, 1.0]
    pub val_accuracy:   f64,

    pub improved:       bool,
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");

        // Header only for a new file, so resumed runs append
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,train_accuracy,val_loss,val_accuracy,improved")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{}",
            m.epoch,
            m.train_loss,
            m.train_accuracy,
            m.val_loss,
            m.val_accuracy,
            m.improved as u8,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_acc={:.4}",
            m.epoch,
            m.train_loss,
            m.val_accuracy,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, val_accuracy: f64, improved: bool) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 0.6,
            train_accuracy: 0.7,
            val_loss: 0.65,
            val_accuracy,
            improved,
        }
    }

    #[test]
    fn test_rows_append_after_header() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&metrics(1, 0.5, true)).unwrap();

        // reopening keeps the existing rows
        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&metrics(2, 0.4, false)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("epoch,train_loss"));
        assert!(lines[1].starts_with("1,") && lines[1].ends_with(",1"));
        assert!(lines[2].starts_with("2,") && lines[2].ends_with(",0"));
    }
}
