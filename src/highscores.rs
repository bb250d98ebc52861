//! High score leaderboard
//!
//! Top scores across matches, persisted as a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::persistence::PersistenceError;

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub score: u64,
    /// Unix timestamp (seconds) when achieved
    pub timestamp: u64,
}

/// High score leaderboard, sorted descending by score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Rank a score would achieve (1-indexed, None if it doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a score if it qualifies; returns the rank achieved (1-indexed)
    pub fn add_score(&mut self, score: u64, timestamp: u64) -> Option<usize> {
        let rank = self.potential_rank(score)?;
        self.entries
            .insert(rank - 1, HighScoreEntry { score, timestamp });
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    /// Load the leaderboard; a missing file is an empty leaderboard
    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No high scores at {}, starting fresh", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut scores: HighScores = serde_json::from_str(&json)?;
        scores.entries.sort_by(|a, b| b.score.cmp(&a.score));
        scores.entries.truncate(MAX_HIGH_SCORES);
        log::info!("Loaded {} high scores", scores.entries.len());
        Ok(scores)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

/// Seconds since the Unix epoch, 0 if the clock is before it
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
