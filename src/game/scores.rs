use crate::config::HIGH_SCORE_LIMIT;
use crate::error::{GameError, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Where finished sessions report their score.
pub trait ScoreSink: Send + Sync {
    fn save_score(&self, song_id: &str, points: u32) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub song_id: String,
    pub points: u32,
    pub achieved_at: DateTime<Utc>,
}

/// Keeps the latest score per song, optionally mirrored to a JSON file.
#[derive(Default)]
pub struct ScoreBook {
    records: Mutex<Vec<ScoreRecord>>,
    path: Option<PathBuf>,
}

impl ScoreBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a book backed by `path`, starting empty if the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let records = if path.exists() {
            let text = fs::read_to_string(path)?;
            let records: Vec<ScoreRecord> = serde_json::from_str(&text)?;
            info!("Loaded {} score(s) from '{}'.", records.len(), path.display());
            records
        } else {
            Vec::new()
        };
        Ok(Self { records: Mutex::new(records), path: Some(path.to_path_buf()) })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let records = self.records.lock().unwrap();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(&*records)?)?;
        Ok(())
    }

    pub fn record(&self, song_id: &str, points: u32) -> ScoreRecord {
        let record = ScoreRecord { song_id: song_id.to_string(), points, achieved_at: Utc::now() };
        let mut records = self.records.lock().unwrap();
        // One entry per song; the newest replaces the old.
        records.retain(|r| r.song_id != song_id);
        records.push(record.clone());
        record
    }

    /// Best scores first, at most `limit` entries.
    pub fn high_scores(&self, limit: usize) -> Vec<ScoreRecord> {
        let mut sorted = self.records.lock().unwrap().clone();
        sorted.sort_by(|a, b| b.points.cmp(&a.points).then(b.achieved_at.cmp(&a.achieved_at)));
        sorted.truncate(limit);
        sorted
    }

    pub fn top(&self) -> Vec<ScoreRecord> {
        self.high_scores(HIGH_SCORE_LIMIT)
    }

    pub fn get(&self, song_id: &str) -> Option<ScoreRecord> {
        self.records.lock().unwrap().iter().find(|r| r.song_id == song_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let cleared = std::mem::take(&mut *self.records.lock().unwrap());
        info!("Cleared {} score(s).", cleared.len());
        if let Some(path) = &self.path {
            if let Err(e) = self.save(path) {
                warn!("Failed to write cleared score book '{}': {}", path.display(), e);
            }
        }
    }
}

impl ScoreSink for ScoreBook {
    fn save_score(&self, song_id: &str, points: u32) -> Result<()> {
        let record = self.record(song_id, points);
        info!("Recorded {} points for '{}' at {}.", record.points, record.song_id, record.achieved_at);
        match &self.path {
            Some(path) => self
                .save(path)
                .map_err(|e| GameError::Persistence(format!("'{}': {}", path.display(), e))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_scores_sorted_and_limited() {
        let book = ScoreBook::new();
        book.record("a", 30);
        book.record("b", 120);
        book.record("c", 70);
        let top: Vec<_> = book.high_scores(2).into_iter().map(|r| r.song_id).collect();
        assert_eq!(top, vec!["b", "c"]);
    }

    #[test]
    fn test_same_song_replaces_previous_score() {
        let book = ScoreBook::new();
        book.record("a", 30);
        book.record("a", 10);
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("a").map(|r| r.points), Some(10));
    }

    #[test]
    fn test_clear_empties_book() {
        let book = ScoreBook::new();
        book.record("a", 30);
        book.clear();
        assert!(book.is_empty());
        assert!(book.top().is_empty());
    }

    #[test]
    fn test_persistent_book_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");

        let book = ScoreBook::open(&path).unwrap();
        assert!(book.is_empty());
        book.save_score("song-1", 40).unwrap();
        book.save_score("song-2", 90).unwrap();

        let reopened = ScoreBook::open(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.top()[0].song_id, "song-2");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        fs::write(&path, "not json").unwrap();
        assert!(ScoreBook::open(&path).is_err());
    }

    #[test]
    fn test_unwritable_path_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be.
        let path = dir.path().join("scores.json");
        fs::create_dir(&path).unwrap();
        let book = ScoreBook { records: Mutex::new(Vec::new()), path: Some(path) };
        let err = book.save_score("a", 10).unwrap_err();
        assert!(matches!(err, GameError::Persistence(ref msg) if msg.contains("scores.json")));
        // The in-memory record is kept regardless.
        assert_eq!(book.len(), 1);
    }
}
