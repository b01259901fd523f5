use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Word-length band a session draws from.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Inclusive character-length bounds for words in this band.
    pub fn length_bounds(&self) -> (usize, usize) {
        match self {
            Difficulty::Easy => (2, 5),
            Difficulty::Medium => (4, 8),
            Difficulty::Hard => (6, 12),
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}
