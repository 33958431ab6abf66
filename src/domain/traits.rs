// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only depends on these traits, so a
// TSV reader or an in-memory fixture can stand in for the CSV
// corpus loader without touching the use cases.

use anyhow::Result;
use crate::domain::instance::Instance;

/// Counts reported by a corpus read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub loaded:  usize,
    pub skipped: usize,
}

impl CorpusStats {
    /// Fraction of rows that were rejected as malformed
    pub fn skip_rate(&self) -> f64 {
        let total = self.loaded + self.skipped;
        if total == 0 { 0.0 } else { self.skipped as f64 / total as f64 }
    }
}

// ─── InstanceSource ───────────────────────────────────────────────────────────
/// Any component that can produce sentence-pair instances.
///
/// Implementations:
///   - CorpusLoader → Quora-style CSV files
pub trait InstanceSource {
    /// Load every well-formed instance. Malformed rows are skipped
    /// and counted in the returned stats rather than aborting.
    fn load_all(&self) -> Result<(Vec<Instance>, CorpusStats)>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_rate() {
        let stats = CorpusStats { loaded: 3, skipped: 1 };
        assert!((stats.skip_rate() - 0.25).abs() < 1e-12);
        assert_eq!(CorpusStats::default().skip_rate(), 0.0);
    }
}
