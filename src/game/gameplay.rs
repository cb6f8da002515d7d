use crate::config::EngineConfig;
use crate::error::{GameError, Result};
use crate::game::judgment::{self, TapVerdict};
use crate::game::note::{FallingNote, NoteId};
use crate::game::song::Song;
use log::{debug, info};
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum GameStatus {
    Loading,
    Playing,
    GameOver,
    Finished,
}

impl GameStatus {
    #[inline(always)]
    pub fn is_terminal(self) -> bool {
        matches!(self, GameStatus::GameOver | GameStatus::Finished)
    }
}

/// What observers see. Always handed out as a clone.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameState {
    pub current_song: Option<Song>,
    /// Live notes in spawn order.
    pub notes: Vec<FallingNote>,
    pub score: u32,
    pub status: GameStatus,
    pub error: Option<String>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_song: None,
            notes: Vec::new(),
            score: 0,
            status: GameStatus::Loading,
            error: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rules {
    pub lanes: usize,
    pub fall_speed_per_tick: f32,
    pub hit_reward: u32,
}

impl From<&EngineConfig> for Rules {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            lanes: cfg.lanes,
            fall_speed_per_tick: cfg.fall_speed_per_tick,
            hit_reward: cfg.hit_reward,
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Rules::from(&EngineConfig::default())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced,
    /// A note fell past the boundary and this tick ended the session.
    Missed(NoteId),
    /// The session was not playing; nothing moved.
    Idle,
}

/// The authoritative state of one engine plus the bookkeeping its transitions need.
#[derive(Debug)]
pub struct Session {
    state: GameState,
    rules: Rules,
    next_note_id: u64,
    score_saved: bool,
    generation: u64,
}

impl Session {
    pub fn new(rules: Rules) -> Self {
        Self { state: GameState::default(), rules, next_note_id: 0, score_saved: false, generation: 0 }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn rules(&self) -> Rules {
        self.rules
    }

    /// Bumped by every `begin_loading`; tells one session's work apart from the next.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline(always)]
    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    /// Resets everything for a new session and enters Loading.
    pub fn begin_loading(&mut self) {
        self.state = GameState::default();
        self.next_note_id = 0;
        self.score_saved = false;
        self.generation += 1;
    }

    /// Ends a session that never started playing.
    pub fn fail(&mut self, message: String) {
        info!("Session failed: {}", message);
        self.state.error = Some(message);
        self.state.status = GameStatus::GameOver;
    }

    pub fn start(&mut self, song: Song) {
        info!("Now playing '{}' by {} at {} BPM.", song.title, song.artist, song.bpm);
        self.state.current_song = Some(song);
        self.state.notes.clear();
        self.state.score = 0;
        self.state.error = None;
        self.state.status = GameStatus::Playing;
    }

    /// Drops a new note at the top of `lane`. No-op unless playing.
    pub fn spawn(&mut self, lane: usize) -> Option<NoteId> {
        if self.state.status != GameStatus::Playing {
            return None;
        }
        let id = NoteId(self.next_note_id);
        self.next_note_id += 1;
        self.state.notes.push(FallingNote::spawn(id, lane));
        debug!("Spawned {} in lane {}.", id, lane);
        Some(id)
    }

    /// Places an already-falling note; used to stage boards.
    #[cfg(test)]
    pub fn place(&mut self, lane: usize, position: f32) -> NoteId {
        let id = NoteId(self.next_note_id);
        self.next_note_id += 1;
        self.state.notes.push(FallingNote::at(id, lane, position));
        id
    }

    /// Moves every live note down one tick. A single note past the boundary ends
    /// the session; notes are left where they fell.
    pub fn advance(&mut self) -> TickOutcome {
        if self.state.status != GameStatus::Playing {
            return TickOutcome::Idle;
        }
        let speed = self.rules.fall_speed_per_tick;
        for note in &mut self.state.notes {
            note.advance(speed);
        }

        let missed = self.state.notes.iter().find(|n| judgment::is_missed(n.position)).map(|n| n.id);
        if let Some(id) = missed {
            info!("{} fell past the hit zone.", id);
            self.terminate(GameStatus::GameOver);
            return TickOutcome::Missed(id);
        }

        self.state.notes.retain(|n| !judgment::is_missed(n.position));
        TickOutcome::Advanced
    }

    /// Judges a tap on `lane`. A tap that finds nothing in the window ends the session.
    pub fn tap(&mut self, lane: usize) -> Result<TapVerdict> {
        if lane >= self.rules.lanes {
            return Err(GameError::InvalidLane { lane, lanes: self.rules.lanes });
        }
        if self.state.status != GameStatus::Playing {
            return Ok(TapVerdict::Ignored);
        }

        match judgment::find_hit(&self.state.notes, lane) {
            Some(index) => {
                let note = self.state.notes.remove(index);
                let points = self.rules.hit_reward;
                self.state.score += points;
                debug!("Hit {} in lane {} at {:.2}; score {}.", note.id, lane, note.position, self.state.score);
                Ok(TapVerdict::Hit { note: note.id, points })
            }
            None => {
                info!("Wrong tap in lane {}.", lane);
                self.terminate(GameStatus::GameOver);
                Ok(TapVerdict::WrongTap)
            }
        }
    }

    /// Moves Playing to a terminal status. Returns false if another source got there first.
    pub fn terminate(&mut self, to: GameStatus) -> bool {
        if self.state.status != GameStatus::Playing || !to.is_terminal() {
            return false;
        }
        info!("Session ended: {:?} with score {}.", to, self.state.score);
        self.state.status = to;
        true
    }

    /// Returns `(song_id, points)` to persist the first time this is called after a
    /// terminal transition, and only for a positive score.
    pub fn take_pending_save(&mut self) -> Option<(String, u32)> {
        if !self.state.status.is_terminal() || self.score_saved {
            return None;
        }
        self.score_saved = true;
        let song = self.state.current_song.as_ref()?;
        (self.state.score > 0).then(|| (song.id.clone(), self.state.score))
    }
}
