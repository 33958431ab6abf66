// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads sentence pairs from a Quora-style CSV file:
//
//   "id","qid1","qid2","question1","question2","is_duplicate"
//   "0","1","2","What is ...?","What is ...?","0"
//
// Only `question1`, `question2` and (in labelled mode)
// `is_duplicate` are used; any other column is ignored, so the
// unlabelled test split (`test_id,question1,question2`) reads
// with the same code. Files ending in `.tsv` are read as
// tab-separated.
//
// Malformed rows never abort the load. A row is skipped and
// counted when:
//   - the CSV record itself cannot be parsed
//   - either sentence is missing or tokenizes to nothing
//   - labelled mode is on and the label is not "0" or "1"
//
// Reference: csv crate documentation (serde deserialisation)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::instance::{Instance, Label};
use crate::domain::traits::{CorpusStats, InstanceSource};

/// One CSV row. Every field is optional so a short row becomes
/// a skipped instance instead of a fatal error.
#[derive(Debug, Deserialize)]
struct PairRecord {
    #[serde(default)]
    question1:    Option<String>,
    #[serde(default)]
    question2:    Option<String>,
    #[serde(default)]
    is_duplicate: Option<String>,
}

/// Loads sentence-pair instances from a CSV/TSV file.
/// Implements the InstanceSource trait from Layer 3.
pub struct CorpusLoader {
    path:         PathBuf,
    labelled:     bool,
    preprocessor: Preprocessor,
}

impl CorpusLoader {
    /// Loader for train/validation data: rows without a valid label are skipped
    pub fn labelled(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), labelled: true, preprocessor: Preprocessor::new() }
    }

    /// Loader for prediction data: labels are read when present but not required
    pub fn unlabelled(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), labelled: false, preprocessor: Preprocessor::new() }
    }

    fn delimiter(path: &Path) -> u8 {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsv") => b'\t',
            _           => b',',
        }
    }

    /// Read instances from any reader. Split out from load_all()
    /// so tests can feed in-memory CSV.
    pub fn read_from<R: Read>(&self, reader: R) -> Result<(Vec<Instance>, CorpusStats)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(Self::delimiter(&self.path))
            .from_reader(reader);

        let mut instances = Vec::new();
        let mut stats     = CorpusStats::default();

        for (row, record) in csv_reader.deserialize::<PairRecord>().enumerate() {
            let parsed = record
                .map_err(anyhow::Error::from)
                .and_then(|r| self.to_instance(r));

            match parsed {
                Ok(Some(instance)) => {
                    instances.push(instance);
                    stats.loaded += 1;
                }
                Ok(None) => {
                    tracing::debug!("Skipping malformed row {} in '{}'", row + 1, self.path.display());
                    stats.skipped += 1;
                }
                // Log a warning but continue; don't fail on one bad row
                Err(e) => {
                    tracing::warn!("Skipping row {} in '{}': {}", row + 1, self.path.display(), e);
                    stats.skipped += 1;
                }
            }
        }

        Ok((instances, stats))
    }

    fn to_instance(&self, record: PairRecord) -> Result<Option<Instance>> {
        let (Some(first), Some(second)) = (record.question1, record.question2) else {
            return Ok(None);
        };

        let label = record.is_duplicate.as_deref().and_then(Label::from_flag);
        if self.labelled && label.is_none() {
            return Ok(None);
        }

        let sequence_a = self.preprocessor.tokenize(&first)?;
        let sequence_b = self.preprocessor.tokenize(&second)?;
        if sequence_a.is_empty() || sequence_b.is_empty() {
            return Ok(None);
        }

        Ok(Some(Instance { sequence_a, sequence_b, label }))
    }
}

impl InstanceSource for CorpusLoader {
    fn load_all(&self) -> Result<(Vec<Instance>, CorpusStats)> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open corpus '{}'", self.path.display()))?;

        let (instances, stats) = self.read_from(file)?;

        tracing::info!(
            "Loaded {} instances from '{}' ({} skipped, skip rate {:.2}%)",
            stats.loaded,
            self.path.display(),
            stats.skipped,
            stats.skip_rate() * 100.0,
        );
        Ok((instances, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUORA: &str = "\
\"id\",\"qid1\",\"qid2\",\"question1\",\"question2\",\"is_duplicate\"
\"0\",\"1\",\"2\",\"How do I learn Rust?\",\"What is the best way to learn Rust?\",\"1\"
\"1\",\"3\",\"4\",\"Why is the sky blue?\",\"How tall is Everest?\",\"0\"
\"2\",\"5\",\"6\",\"Missing label\",\"Still missing\",\"\"
\"3\",\"7\",\"8\",\"\",\"Empty first sentence\",\"1\"
";

    #[test]
    fn test_labelled_mode_skips_malformed_rows() {
        let loader = CorpusLoader::labelled("train.csv");
        let (instances, stats) = loader.read_from(QUORA.as_bytes()).unwrap();

        assert_eq!(stats, CorpusStats { loaded: 2, skipped: 2 });
        assert_eq!(instances[0].sequence_a, vec!["how", "do", "i", "learn", "rust", "?"]);
        assert_eq!(instances[0].label, Some(Label::Paraphrase));
        assert_eq!(instances[1].label, Some(Label::NotParaphrase));
    }

    #[test]
    fn test_unlabelled_mode_keeps_rows_without_label() {
        let csv = "test_id,question1,question2\n0,Is it raining?,Does it rain?\n";
        let loader = CorpusLoader::unlabelled("test.csv");
        let (instances, stats) = loader.read_from(csv.as_bytes()).unwrap();

        assert_eq!(stats.loaded, 1);
        assert_eq!(instances[0].label, None);
        assert_eq!(instances[0].sequence_b, vec!["does", "it", "rain", "?"]);
    }

    #[test]
    fn test_tsv_extension_uses_tabs() {
        let tsv = "question1\tquestion2\tis_duplicate\na b\ta c\t1\n";
        let loader = CorpusLoader::labelled("pairs.tsv");
        let (instances, _) = loader.read_from(tsv.as_bytes()).unwrap();
        assert_eq!(instances[0].sequence_a, vec!["a", "b"]);
        assert_eq!(instances[0].sequence_b, vec!["a", "c"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = CorpusLoader::labelled("/definitely/not/here.csv");
        assert!(loader.load_all().is_err());
    }
}
