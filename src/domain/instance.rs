// ============================================================
// Layer 3 — Instance Domain Types
// ============================================================
// A paraphrase-identification example is two token sequences
// in fixed roles (sequence A, sequence B) plus a binary label.
//
//   Instance         → raw tokens, produced by the corpus loader
//   EncodedInstance  → the same pair with tokens replaced by
//                      vocabulary ids, produced by the Indexer
//
// Both are immutable values: encoding builds a new struct and
// never mutates the Instance it came from.

use serde::{Deserialize, Serialize};

/// Binary target of the classifier.
/// The discriminant is the class index used by the loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    NotParaphrase = 0,
    Paraphrase    = 1,
}

impl Label {
    /// Class index in the two-way output: 0 = not paraphrase, 1 = paraphrase
    pub fn class_index(self) -> usize {
        self as usize
    }

    /// Parse the corpus encoding of a label ("0" / "1").
    /// Anything else is rejected so malformed rows can be skipped.
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.trim() {
            "0" => Some(Label::NotParaphrase),
            "1" => Some(Label::Paraphrase),
            _   => None,
        }
    }
}

/// A raw sentence pair.
///
/// `label` is `None` for unlabelled (prediction-time) data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub sequence_a: Vec<String>,
    pub sequence_b: Vec<String>,
    pub label:      Option<Label>,
}

impl Instance {
    pub fn new<S: Into<String>>(
        sequence_a: impl IntoIterator<Item = S>,
        sequence_b: impl IntoIterator<Item = S>,
        label:      Option<Label>,
    ) -> Self {
        Self {
            sequence_a: sequence_a.into_iter().map(Into::into).collect(),
            sequence_b: sequence_b.into_iter().map(Into::into).collect(),
            label,
        }
    }

    /// Iterate over every token of both sequences, A first
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.sequence_a
            .iter()
            .chain(self.sequence_b.iter())
            .map(String::as_str)
    }
}

/// An Instance whose tokens have been replaced by vocabulary ids.
/// Sequence lengths are identical to the source Instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedInstance {
    pub ids_a: Vec<usize>,
    pub ids_b: Vec<usize>,
    pub label: Option<Label>,
}
