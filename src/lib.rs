//! StarBeat: a tempo-driven falling-note rhythm game engine.
//!
//! Songs come from a [`game::song::SongLookup`], playback goes through a
//! [`core::audio::AudioService`], and finished sessions report to a
//! [`game::scores::ScoreSink`]. The [`game::engine::Engine`] ties them together.

pub mod config;
pub mod core;
pub mod error;
pub mod game;

pub use error::{GameError, Result};
pub use game::engine::Engine;
pub use game::gameplay::{GameState, GameStatus};
