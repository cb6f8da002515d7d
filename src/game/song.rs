use crate::error::{GameError, Result};
use crate::game::timing;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    pub artist: String,
    /// URI or path handed to the audio collaborator.
    pub source: String,
    pub bpm: u32,
}

impl Song {
    pub fn new(id: &str, title: &str, artist: &str, source: &str, bpm: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            source: source.to_string(),
            bpm,
        }
    }

    /// Tick spacing for this song, rejecting a zero tempo.
    pub fn beat_interval(&self) -> Result<Duration> {
        timing::beat_interval(self.bpm).ok_or_else(|| GameError::InvalidTempo {
            song_id: self.id.clone(),
            bpm: self.bpm,
        })
    }
}

/// Read-only song lookup consumed by the engine.
pub trait SongLookup: Send + Sync {
    fn get_song(&self, id: &str) -> Option<Arc<Song>>;
}

/// A keyed in-memory song store.
#[derive(Default)]
pub struct SongLibrary {
    songs: Mutex<HashMap<String, Arc<Song>>>,
}

impl SongLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_songs(songs: impl IntoIterator<Item = Song>) -> Self {
        let library = Self::new();
        for song in songs {
            library.insert(song);
        }
        library
    }

    /// Inserts or replaces a song by id.
    pub fn insert(&self, song: Song) {
        info!("Library: added '{}' by {} ({} BPM).", song.title, song.artist, song.bpm);
        self.songs.lock().unwrap().insert(song.id.clone(), Arc::new(song));
    }

    pub fn len(&self) -> usize {
        self.songs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All songs sorted by title, for listing.
    pub fn songs(&self) -> Vec<Arc<Song>> {
        let mut all: Vec<_> = self.songs.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.title.cmp(&b.title));
        all
    }
}

impl SongLookup for SongLibrary {
    fn get_song(&self, id: &str) -> Option<Arc<Song>> {
        self.songs.lock().unwrap().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_hit_and_miss() {
        let library = SongLibrary::with_songs([Song::new("a", "Alpha", "X", "a.ogg", 120)]);
        assert_eq!(library.get_song("a").map(|s| s.bpm), Some(120));
        assert!(library.get_song("missing").is_none());
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let library = SongLibrary::new();
        library.insert(Song::new("a", "Alpha", "X", "a.ogg", 120));
        library.insert(Song::new("a", "Alpha (Edit)", "X", "a.ogg", 140));
        assert_eq!(library.len(), 1);
        assert_eq!(library.get_song("a").unwrap().bpm, 140);
    }

    #[test]
    fn test_songs_sorted_by_title() {
        let library = SongLibrary::with_songs([
            Song::new("2", "Zeta", "X", "z.ogg", 100),
            Song::new("1", "Beta", "X", "b.ogg", 100),
        ]);
        let titles: Vec<_> = library.songs().iter().map(|s| s.title.clone()).collect();
        assert_eq!(titles, vec!["Beta", "Zeta"]);
    }

    #[test]
    fn test_zero_bpm_is_invalid_tempo() {
        let song = Song::new("z", "Zero", "X", "z.ogg", 0);
        assert!(matches!(song.beat_interval(), Err(GameError::InvalidTempo { bpm: 0, .. })));
    }
}
