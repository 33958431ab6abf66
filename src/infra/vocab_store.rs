// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Persists the Vocabulary next to the checkpoints so prediction
// maps tokens to exactly the ids the model was trained with.
//
// On a fresh run the vocabulary is built from the training
// instances and written to vocabulary.json. On a resumed run the
// saved file is reused; rebuilding it could shift ids and make
// the restored embedding rows meaningless.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::indexer::{Indexer, Vocabulary};
use crate::domain::error::PairError;
use crate::domain::instance::Instance;

const VOCAB_FILE: &str = "vocabulary.json";

pub struct VocabularyStore {
    path: PathBuf,
}

impl VocabularyStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(VOCAB_FILE) }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reuse the saved vocabulary if `reuse` and one exists,
    /// otherwise build from `corpus` and save it.
    pub fn load_or_build(
        &self,
        corpus:   &[Instance],
        max_size: Option<usize>,
        reuse:    bool,
    ) -> Result<Indexer> {
        if reuse && self.exists() {
            tracing::info!("Loading existing vocabulary from '{}'", self.path.display());
            return Ok(Indexer::with_vocabulary(self.load()?));
        }
        let mut indexer = Indexer::new(max_size);
        self.save(indexer.build(corpus))?;
        Ok(indexer)
    }

    pub fn save(&self, vocabulary: &Vocabulary) -> Result<()> {
        let json = serde_json::to_string(vocabulary)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Cannot write vocabulary to '{}'", self.path.display()))?;
        tracing::debug!("Saved {} vocabulary ids", vocabulary.len());
        Ok(())
    }

    /// Missing file → ConfigError
    pub fn load(&self) -> Result<Vocabulary> {
        let json = fs::read_to_string(&self.path).map_err(|e| {
            PairError::config(format!("cannot read vocabulary '{}': {e}", self.path.display()))
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Corrupt vocabulary file '{}'", self.path.display()))
    }
}
