use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::PairError;

/// Which comparison strategy the classifier is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Final-state Manhattan similarity
    Siamese,
    /// Word-level inner attention + aggregation
    SiameseMatching,
    /// Bilateral multi-perspective matching + aggregation
    Bimpm,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Siamese, ModelKind::SiameseMatching, ModelKind::Bimpm];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Siamese         => "siamese",
            ModelKind::SiameseMatching => "siamese_matching",
            ModelKind::Bimpm           => "bimpm",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = PairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                PairError::config(format!(
                    "unknown model variant '{s}' (expected siamese, siamese_matching or bimpm)"
                ))
            })
    }
}
