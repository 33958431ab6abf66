// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Three kinds of failure, all fatal to the current run:
//
//   Config             → invalid/missing configuration, or a
//                        requested checkpoint that is absent
//   InvariantViolation → mask/sequence shape mismatch and other
//                        programming or data bugs
//   NumericDivergence  → the training loss became non-finite
//
// Application code wraps these in anyhow::Error; main() turns
// any of them into a non-zero exit status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("loss diverged at epoch {epoch}, step {step} (loss = {loss})")]
    NumericDivergence {
        epoch: usize,
        step:  usize,
        loss:  f64,
    },
}

impl PairError {
    pub fn config(msg: impl Into<String>) -> Self {
        PairError::Config(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        PairError::InvariantViolation(msg.into())
    }
}

pub type PairResult<T> = std::result::Result<T, PairError>;
