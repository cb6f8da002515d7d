use serde::Serialize;
use std::fmt;

/// Unique within a session; assigned in spawn order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FallingNote {
    pub id: NoteId,
    pub lane: usize,
    /// Normalized: 0.0 at the top, 1.0 at the bottom of the hit zone.
    pub position: f32,
    #[serde(skip)]
    origin: f32,
    #[serde(skip)]
    ticks_travelled: u32,
}

impl FallingNote {
    pub fn spawn(id: NoteId, lane: usize) -> Self {
        Self { id, lane, position: 0.0, origin: 0.0, ticks_travelled: 0 }
    }

    /// Places a note mid-fall; used to stage boards directly.
    #[cfg(test)]
    pub fn at(id: NoteId, lane: usize, position: f32) -> Self {
        Self { id, lane, position, origin: position, ticks_travelled: 0 }
    }

    /// Moves the note down one tick.
    ///
    /// The position is recomputed from the tick count instead of accumulated so
    /// that twenty ticks of 0.05 land exactly on 1.0.
    pub fn advance(&mut self, fall_speed_per_tick: f32) {
        self.ticks_travelled += 1;
        self.position = self.origin + self.ticks_travelled as f32 * fall_speed_per_tick;
    }
}
