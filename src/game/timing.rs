use crate::config::MS_PER_MINUTE;
use std::time::Duration;

/// Milliseconds between ticks for a tempo, truncated (`60000 / bpm`).
///
/// Returns `None` for a zero tempo. Truncation means 90 BPM ticks every 666ms,
/// not 667ms; tempos above 60000 BPM would truncate to zero and are clamped to 1ms.
pub fn beat_interval_ms(bpm: u32) -> Option<u64> {
    if bpm == 0 {
        return None;
    }
    Some((MS_PER_MINUTE / bpm as u64).max(1))
}

#[inline(always)]
pub fn beat_interval(bpm: u32) -> Option<Duration> {
    beat_interval_ms(bpm).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_divisors() {
        assert_eq!(beat_interval_ms(120), Some(500));
        assert_eq!(beat_interval_ms(150), Some(400));
        assert_eq!(beat_interval_ms(60), Some(1000));
    }

    #[test]
    fn test_non_exact_divisor_truncates() {
        assert_eq!(beat_interval_ms(90), Some(666));
        assert_eq!(beat_interval_ms(7), Some(8571));
    }

    #[test]
    fn test_zero_bpm_rejected() {
        assert_eq!(beat_interval_ms(0), None);
        assert_eq!(beat_interval(0), None);
    }

    #[test]
    fn test_extreme_tempo_clamped() {
        assert_eq!(beat_interval_ms(60_000), Some(1));
        assert_eq!(beat_interval_ms(u32::MAX), Some(1));
    }

    #[test]
    fn test_duration_matches_ms() {
        assert_eq!(beat_interval(120), Some(Duration::from_millis(500)));
    }
}
