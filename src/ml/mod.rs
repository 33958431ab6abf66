// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All the tensor code lives here.
//
//   masking.rs    — mask helpers shared by every layer below:
//                   lengths, last real positions, per-row
//                   reversal, masked softmax, L2 normalisation
//
//   encoder.rs    — embedding + mask-aware BiLSTM, one instance
//                   shared by sentence A and sentence B
//
//   matching.rs   — the three comparison strategies:
//                   final-state Manhattan similarity,
//                   inner attention, multi-perspective matching
//
//   classifier.rs — aggregation BiLSTM and the 2-way MLP head
//
//   model.rs      — siamese / siamese_matching / bimpm models
//                   behind the PairModel trait
//
//   trainer.rs    — epoch state machine, early stopping,
//                   checkpoint selection by val accuracy
//
//   predictor.rs  — restore best checkpoint, score pairs
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Hochreiter & Schmidhuber (1997) LSTM
//            Wang, Hamza & Florian (2017) BiMPM

/// Mask utilities for padded batches
pub mod masking;

/// Shared bidirectional sequence encoder
pub mod encoder;

/// Comparison strategies between two encoded sentences
pub mod matching;

/// Aggregation and classification head
pub mod classifier;

/// The three pair classification models
pub mod model;

/// Training loop state machine
pub mod trainer;

/// Checkpoint restore + batched prediction
pub mod predictor;
