// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a CSV of sentence pairs to tensor batches.
//
//   pairs.csv
//       │
//       ▼
//   CorpusLoader      → reads rows, skips and counts malformed ones
//       │
//       ▼
//   Preprocessor      → cleans and tokenizes each sentence
//       │
//       ▼
//   Indexer           → builds the Vocabulary, tokens → ids
//       │
//       ▼
//   split_train_val   → seeded hold-out (when no val corpus)
//       │
//       ▼
//   PairDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   PairBatcher       → pads, masks and stacks into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads Quora-style CSV/TSV pair files
pub mod loader;

/// Cleans and tokenizes raw sentences
pub mod preprocessor;

/// Vocabulary construction and id encoding
pub mod indexer;

/// Padding, truncation, masks and host-side batching
pub mod padding;

/// Implements Burn's Dataset trait for encoded pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits data into train/validation sets
pub mod splitter;
