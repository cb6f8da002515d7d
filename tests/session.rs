use starbeat::config::EngineConfig;
use starbeat::core::audio::TimedPlayback;
use starbeat::game::judgment::{in_hit_window, TapVerdict};
use starbeat::game::scores::ScoreBook;
use starbeat::game::song::{Song, SongLibrary};
use starbeat::{Engine, GameStatus};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn engine(track_length: Duration, scores: Arc<ScoreBook>) -> Engine {
    let library = Arc::new(SongLibrary::with_songs([
        Song::new("quick", "Quick Beat", "Test Band", "quick.ogg", 1200),
    ]));
    let config = EngineConfig { rng_seed: Some(11), ..EngineConfig::default() };
    Engine::new(library, scores, Box::new(TimedPlayback::new(track_length)), &config)
}

/// Hits every note as soon as it enters the window, until the session ends.
fn autoplay(engine: &Engine) -> u32 {
    let updates = engine.subscribe();
    let mut tapped = HashSet::new();
    let mut hits = 0;
    while let Ok(state) = updates.recv_timeout(Duration::from_secs(10)) {
        if state.status.is_terminal() {
            break;
        }
        for note in state.notes.iter().filter(|n| in_hit_window(n.position)) {
            if tapped.insert(note.id) {
                if let TapVerdict::Hit { .. } = engine.on_lane_tapped(note.lane).unwrap() {
                    hits += 1;
                }
            }
        }
    }
    hits
}

#[test]
fn autoplayed_session_finishes_and_saves_once() {
    let scores = Arc::new(ScoreBook::new());
    let engine = engine(Duration::from_millis(1500), scores.clone());
    engine.load_song("quick").unwrap();

    let hits = autoplay(&engine);
    let state = engine.snapshot();
    assert_eq!(state.status, GameStatus::Finished);
    assert!(hits > 0);
    assert_eq!(state.score, hits * 10);

    // The track-end signal saves from its own thread; give it a moment.
    let deadline = Instant::now() + Duration::from_secs(5);
    while scores.is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    engine.end_game();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores.get("quick").map(|r| r.points), Some(state.score));
}

#[test]
fn idle_session_is_lost_to_a_miss() {
    let scores = Arc::new(ScoreBook::new());
    let engine = engine(Duration::from_secs(60), scores.clone());
    engine.load_song("quick").unwrap();

    let updates = engine.subscribe();
    let last = updates
        .iter()
        .find(|s| s.status.is_terminal())
        .expect("session should end");
    assert_eq!(last.status, GameStatus::GameOver);
    assert_eq!(last.score, 0);
    assert!(scores.is_empty());
}

#[test]
fn unknown_song_reports_error_state() {
    let scores = Arc::new(ScoreBook::new());
    let engine = engine(Duration::from_secs(1), scores.clone());
    assert!(engine.load_song("missing").is_err());

    let state = engine.snapshot();
    assert_eq!(state.status, GameStatus::GameOver);
    assert!(state.error.is_some());
    assert_eq!(engine.on_lane_tapped(0).unwrap(), TapVerdict::Ignored);
}
