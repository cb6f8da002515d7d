use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Song not found: {0}")]
    SongNotFound(String),

    #[error("Invalid tempo for song '{song_id}': {bpm} BPM")]
    InvalidTempo { song_id: String, bpm: u32 },

    #[error("Lane {lane} out of range (0..{lanes})")]
    InvalidLane { lane: usize, lanes: usize },

    #[error("Score persistence failed: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Score book format error: {0}")]
    Format(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
