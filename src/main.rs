use log::{error, info, warn, LevelFilter};
use starbeat::config::{self, CONFIG_INI_PATH, SCORES_JSON_PATH};
use starbeat::core::audio::TimedPlayback;
use starbeat::game::judgment::{in_hit_window, TapVerdict};
use starbeat::game::note::NoteId;
use starbeat::game::scores::ScoreBook;
use starbeat::game::song::{Song, SongLibrary};
use starbeat::{Engine, GameStatus};
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEMO_TRACK_LENGTH: Duration = Duration::from_secs(12);

fn demo_songs() -> Vec<Song> {
    vec![
        Song::new("demo-120", "Starlight Run", "The Metronomes", "demo/starlight.ogg", 120),
        Song::new("demo-150", "Neon Steps", "The Metronomes", "demo/neon.ogg", 150),
        Song::new("demo-90", "Slow Orbit", "Half Time", "demo/orbit.ogg", 90),
    ]
}

fn main() -> Result<(), Box<dyn Error>> {
    // --- Logging Setup ---
    // RUST_LOG=starbeat::game=debug shows every spawn, tick and hit.
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("starbeat::core::audio", LevelFilter::Warn)
        .init();

    info!("StarBeat starting...");
    let cfg = config::load(Path::new(CONFIG_INI_PATH));
    info!("Config: {} lanes, {} per tick, {} points per hit.", cfg.lanes, cfg.fall_speed_per_tick, cfg.hit_reward);

    let library = Arc::new(SongLibrary::with_songs(demo_songs()));
    let scores = match ScoreBook::open(Path::new(SCORES_JSON_PATH)) {
        Ok(book) => Arc::new(book),
        Err(e) => {
            warn!("Could not open score book, scores will not be kept: {}", e);
            Arc::new(ScoreBook::new())
        }
    };

    let song_id = std::env::args().nth(1).unwrap_or_else(|| "demo-120".to_string());
    let audio = TimedPlayback::new(DEMO_TRACK_LENGTH);
    let engine = Engine::new(library.clone(), scores.clone(), Box::new(audio), &cfg);

    let updates = engine.subscribe();
    if let Err(e) = engine.load_song(&song_id) {
        error!("Failed to start '{}': {}", song_id, e);
        info!("Available songs:");
        for song in library.songs() {
            info!("  {} - {} by {} ({} BPM)", song.id, song.title, song.artist, song.bpm);
        }
        return Err(e.into());
    }

    // --- Autoplay ---
    let mut tapped: HashSet<NoteId> = HashSet::new();
    for state in updates.iter() {
        if state.status.is_terminal() {
            break;
        }
        if state.status != GameStatus::Playing {
            continue;
        }
        for note in state.notes.iter().filter(|n| in_hit_window(n.position)) {
            if !tapped.insert(note.id) {
                continue;
            }
            match engine.on_lane_tapped(note.lane)? {
                TapVerdict::Hit { points, .. } => info!("Autoplay hit {} (+{}).", note.id, points),
                TapVerdict::WrongTap => warn!("Autoplay tapped lane {} with nothing to hit.", note.lane),
                TapVerdict::Ignored => {}
            }
        }
    }

    let result = engine.snapshot();
    info!("Session result: {:?} with {} points.", result.status, result.score);
    if let Some(message) = &result.error {
        warn!("Session error: {}", message);
    }
    engine.dispose();

    info!("High scores:");
    for (rank, record) in scores.top().iter().enumerate() {
        let title = library
            .songs()
            .into_iter()
            .find(|s| s.id == record.song_id)
            .map_or_else(|| record.song_id.clone(), |s| s.title.clone());
        info!("  {:>2}. {:<16} {:>6}  {}", rank + 1, title, record.points, record.achieved_at.format("%Y-%m-%d %H:%M"));
    }

    info!("StarBeat exited gracefully.");
    Ok(())
}
