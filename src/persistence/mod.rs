//! High-score persistence
//!
//! The simulation only sees the `ScoreStore` seam. Backends:
//! - `MemoryScoreStore`: single value, process lifetime
//! - `FileScoreStore`: JSON leaderboard on disk

use std::path::{Path, PathBuf};

use crate::highscores::{HighScores, unix_now};

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed high score data: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Best score across matches
pub trait ScoreStore {
    fn high_score(&self) -> u64;
    fn set_high_score(&mut self, score: u64);
}

#[derive(Debug, Default, Clone)]
pub struct MemoryScoreStore {
    high_score: u64,
}

impl MemoryScoreStore {
    pub fn with_high_score(high_score: u64) -> Self {
        Self { high_score }
    }
}

impl ScoreStore for MemoryScoreStore {
    fn high_score(&self) -> u64 {
        self.high_score
    }

    fn set_high_score(&mut self, score: u64) {
        self.high_score = score;
    }
}

/// Leaderboard file; every new high score is written through
#[derive(Debug)]
pub struct FileScoreStore {
    path: PathBuf,
    scores: HighScores,
}

impl FileScoreStore {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        Ok(Self {
            path: path.to_path_buf(),
            scores: HighScores::load(path)?,
        })
    }

    /// Open the leaderboard, starting empty if it can't be read
    pub fn open_or_empty(path: &Path) -> Self {
        Self::open(path).unwrap_or_else(|e| {
            log::warn!("{e}; starting with an empty leaderboard");
            Self {
                path: path.to_path_buf(),
                scores: HighScores::new(),
            }
        })
    }

    pub fn scores(&self) -> &HighScores {
        &self.scores
    }
}

impl ScoreStore for FileScoreStore {
    fn high_score(&self) -> u64 {
        self.scores.top_score().unwrap_or(0)
    }

    fn set_high_score(&mut self, score: u64) {
        if self.scores.add_score(score, unix_now()).is_none() {
            return;
        }
        if let Err(e) = self.scores.save(&self.path) {
            log::warn!("High score not saved: {e}");
        }
    }
}
