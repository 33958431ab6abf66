// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing a sentence
// pair and what can go wrong while processing one.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Everything downstream (indexer, batcher, models, trainer)
// speaks in terms of these types.

// A raw sentence pair with its label, and its integer-id form
pub mod instance;

// The three model variants
pub mod model_kind;

// The error taxonomy shared by every layer
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
