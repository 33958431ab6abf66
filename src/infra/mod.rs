// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the run directory on disk:
//
//   checkpoint.rs  — Full-precision model weights (.mpk.gz),
//                    checkpoint metadata, the best-checkpoint
//                    pointer and the saved TrainConfig that
//                    prediction uses to rebuild the model.
//
//   vocab_store.rs — vocabulary.json, so prediction and resumed
//                    training reuse the exact token ids.
//
//   metrics.rs     — One CSV row per epoch (loss, accuracy,
//                    improvement flag) for learning curves.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary persistence
pub mod vocab_store;

/// Training metrics CSV logger
pub mod metrics;
