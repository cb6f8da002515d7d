use crate::config::{HIT_WINDOW_LOW, MISS_BOUNDARY};
use crate::game::note::{FallingNote, NoteId};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TapVerdict {
    /// The oldest qualifying note in the lane was consumed.
    Hit { note: NoteId, points: u32 },
    /// No note in the lane was inside the window. Ends the session.
    WrongTap,
    /// The session is not playing; the tap has no effect.
    Ignored,
}

#[inline(always)]
pub fn in_hit_window(position: f32) -> bool {
    position > HIT_WINDOW_LOW && position <= MISS_BOUNDARY
}

#[inline(always)]
pub fn is_missed(position: f32) -> bool {
    position > MISS_BOUNDARY
}

/// Index of the note a tap on `lane` would consume.
///
/// Notes are kept in spawn order, so the first match is the oldest, i.e. the one
/// closest to the miss boundary.
pub fn find_hit(notes: &[FallingNote], lane: usize) -> Option<usize> {
    notes.iter().position(|n| n.lane == lane && in_hit_window(n.position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: u64, lane: usize, position: f32) -> FallingNote {
        FallingNote::at(NoteId(id), lane, position)
    }

    #[test]
    fn test_window_bounds() {
        assert!(!in_hit_window(0.0));
        assert!(!in_hit_window(0.5));
        assert!(!in_hit_window(0.85));
        assert!(in_hit_window(0.86));
        assert!(in_hit_window(0.9));
        assert!(in_hit_window(1.0));
        assert!(!in_hit_window(1.01));
    }

    #[test]
    fn test_miss_is_strictly_past_boundary() {
        assert!(!is_missed(1.0));
        assert!(is_missed(1.05));
    }

    #[test]
    fn test_find_hit_requires_matching_lane() {
        let notes = vec![note(0, 1, 0.9)];
        assert_eq!(find_hit(&notes, 1), Some(0));
        assert_eq!(find_hit(&notes, 2), None);
    }

    #[test]
    fn test_find_hit_ignores_notes_outside_window() {
        let notes = vec![note(0, 3, 0.5), note(1, 3, 0.2)];
        assert_eq!(find_hit(&notes, 3), None);
    }

    #[test]
    fn test_find_hit_prefers_oldest() {
        let notes = vec![note(0, 2, 0.95), note(1, 2, 0.9), note(2, 2, 0.3)];
        assert_eq!(find_hit(&notes, 2), Some(0));
    }

    #[test]
    fn test_empty_board_has_no_hit() {
        for lane in 0..5 {
            assert_eq!(find_hit(&[], lane), None);
        }
    }
}
