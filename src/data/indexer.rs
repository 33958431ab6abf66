// ============================================================
// Layer 4 — Vocabulary Indexer
// ============================================================
// Builds the token → integer mapping from training instances
// and converts raw instances into integer-id sequence pairs.
//
// Id layout:
//   0        → @@PADDING@@   (always the padding id)
//   1        → @@UNKNOWN@@   (absorbs every unseen token)
//   2..      → corpus tokens in descending frequency order,
//              ties broken by first-seen order
//
// The optional size cap counts the two reserved ids, so the
// embedding table never has more than `max_size` rows. Tokens
// that do not fit under the cap map to the OOV id.
//
// The Vocabulary is built once and then only read; it is
// Clone + Serialize so the vocabulary store can persist it next
// to the checkpoints.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::error::{PairError, PairResult};
use crate::domain::instance::{EncodedInstance, Instance};

pub const PADDING_TOKEN: &str = "@@PADDING@@";
pub const OOV_TOKEN:     &str = "@@UNKNOWN@@";
pub const PADDING_ID:    usize = 0;
pub const OOV_ID:        usize = 1;

/// Bijective token ↔ id mapping with reserved padding and OOV ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VocabularyFile", into = "VocabularyFile")]
pub struct Vocabulary {
    tokens: Vec<String>,
    ids:    HashMap<String, usize>,
}

/// On-disk form: just the tokens in id order.
#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    tokens: Vec<String>,
}

impl From<VocabularyFile> for Vocabulary {
    fn from(file: VocabularyFile) -> Self {
        Vocabulary::from_tokens(file.tokens)
    }
}

impl From<Vocabulary> for VocabularyFile {
    fn from(vocab: Vocabulary) -> Self {
        VocabularyFile { tokens: vocab.tokens }
    }
}

impl Vocabulary {
    /// Scan every instance, count token frequencies and assign ids.
    pub fn build<'a>(
        corpus:   impl IntoIterator<Item = &'a Instance>,
        max_size: Option<usize>,
    ) -> Self {
        // token → (count, first-seen rank)
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for instance in corpus {
            for token in instance.tokens() {
                let next_rank = counts.len();
                counts.entry(token).or_insert((0, next_rank)).0 += 1;
            }
        }

        let mut ranked: Vec<(&str, usize, usize)> = counts
            .into_iter()
            .filter(|(token, _)| *token != PADDING_TOKEN && *token != OOV_TOKEN)
            .map(|(token, (count, first_seen))| (token, count, first_seen))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let capacity = max_size.map(|cap| cap.saturating_sub(2)).unwrap_or(ranked.len());
        ranked.truncate(capacity);

        let tokens = [PADDING_TOKEN, OOV_TOKEN]
            .into_iter()
            .chain(ranked.into_iter().map(|(token, _, _)| token))
            .map(str::to_string)
            .collect();

        Self::from_tokens(tokens)
    }

    /// Rebuild from tokens listed in id order (as persisted).
    fn from_tokens(tokens: Vec<String>) -> Self {
        let ids = tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id))
            .collect();
        Self { tokens, ids }
    }

    /// Id of a token, or the OOV id if the token is unknown
    pub fn id(&self, token: &str) -> usize {
        self.ids.get(token).copied().unwrap_or(OOV_ID)
    }

    /// Token for an id; ids outside the vocabulary decode to the OOV token
    pub fn decode(&self, id: usize) -> &str {
        self.tokens.get(id).map(String::as_str).unwrap_or(OOV_TOKEN)
    }

    /// Number of ids, including the two reserved ones.
    /// This is the row count of the embedding table.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Replace every token of both sequences with its id
    pub fn encode(&self, instance: &Instance) -> EncodedInstance {
        let ids = |seq: &[String]| seq.iter().map(|t| self.id(t)).collect::<Vec<_>>();
        EncodedInstance {
            ids_a: ids(&instance.sequence_a),
            ids_b: ids(&instance.sequence_b),
            label: instance.label,
        }
    }
}

// ─── Indexer ──────────────────────────────────────────────────────────────────
/// Owns the (not yet / already) built vocabulary.
/// Encoding before `build` is a configuration error.
#[derive(Debug, Default)]
pub struct Indexer {
    vocabulary: Option<Vocabulary>,
    max_size:   Option<usize>,
}

impl Indexer {
    pub fn new(max_size: Option<usize>) -> Self {
        Self { vocabulary: None, max_size }
    }

    /// Wrap a vocabulary restored from disk
    pub fn with_vocabulary(vocabulary: Vocabulary) -> Self {
        Self { vocabulary: Some(vocabulary), max_size: None }
    }

    /// Build (or rebuild) the vocabulary from a training corpus
    pub fn build(&mut self, corpus: &[Instance]) -> &Vocabulary {
        let vocab = Vocabulary::build(corpus, self.max_size);
        tracing::info!("Built vocabulary with {} ids", vocab.len());
        tracing::debug!(
            "Most frequent tokens: {:?}",
            (OOV_ID + 1..vocab.len().min(OOV_ID + 11)).map(|id| vocab.decode(id)).collect::<Vec<_>>()
        );
        self.vocabulary.insert(vocab)
    }

    pub fn vocabulary(&self) -> PairResult<&Vocabulary> {
        self.vocabulary
            .as_ref()
            .ok_or_else(|| PairError::config("vocabulary used before it was built"))
    }

    pub fn encode(&self, instance: &Instance) -> PairResult<EncodedInstance> {
        Ok(self.vocabulary()?.encode(instance))
    }

    pub fn encode_all(&self, instances: &[Instance]) -> PairResult<Vec<EncodedInstance>> {
        let vocab = self.vocabulary()?;
        Ok(instances.iter().map(|i| vocab.encode(i)).collect())
    }
}
