use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// --- Public API ---

/// Identifies one `play` call. A backend never reuses an id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The track started by `id` reached its natural end. Not sent for `stop()`.
    Ended { id: PlaybackId, source: String },
}

/// The playback collaborator the engine drives.
///
/// Lifecycle: any number of `play`/`stop` pairs, then a single `release`.
pub trait AudioService: Send {
    fn play(&mut self, source: &str) -> PlaybackId;
    fn stop(&mut self);
    fn release(&mut self);
    fn is_playing(&self) -> bool;
    /// Single slot; a new listener replaces the previous one.
    fn set_listener(&mut self, listener: Sender<PlaybackEvent>);
}

// --- Clock-driven backend ---

const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A handle to a track "playing" on its own thread.
struct PlaybackThread {
    thread: thread::JoinHandle<()>,
    stop_signal: Arc<AtomicBool>,
}

/// Plays nothing audible: each track runs for a configured length on a timer
/// thread and then reports `PlaybackEvent::Ended`.
pub struct TimedPlayback {
    default_length: Duration,
    track_lengths: HashMap<String, Duration>,
    listener: Option<Sender<PlaybackEvent>>,
    current: Option<PlaybackThread>,
    playing: Arc<AtomicBool>,
    next_id: u64,
    released: bool,
}

impl TimedPlayback {
    pub fn new(default_length: Duration) -> Self {
        Self {
            default_length,
            track_lengths: HashMap::new(),
            listener: None,
            current: None,
            playing: Arc::new(AtomicBool::new(false)),
            next_id: 1,
            released: false,
        }
    }

    pub fn with_track_length(mut self, source: &str, length: Duration) -> Self {
        self.track_lengths.insert(source.to_string(), length);
        self
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn length_of(&self, source: &str) -> Duration {
        self.track_lengths.get(source).copied().unwrap_or(self.default_length)
    }

    fn halt_current(&mut self) {
        if let Some(old) = self.current.take() {
            old.stop_signal.store(true, Ordering::Relaxed);
            let _ = old.thread.join();
        }
        self.playing.store(false, Ordering::Relaxed);
    }
}

impl AudioService for TimedPlayback {
    fn play(&mut self, source: &str) -> PlaybackId {
        let id = PlaybackId(self.next_id);
        self.next_id += 1;
        if self.released {
            warn!("play('{}') after release ignored.", source);
            return id;
        }
        self.halt_current();

        let length = self.length_of(source);
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop_signal.clone();
        let playing = self.playing.clone();
        let listener = self.listener.clone();
        let source = source.to_string();

        info!("Playback started: '{}' ({:?}).", source, length);
        playing.store(true, Ordering::Relaxed);
        let thread = thread::spawn(move || {
            let started = Instant::now();
            while started.elapsed() < length {
                if stop_for_thread.load(Ordering::Relaxed) {
                    debug!("Playback of '{}' stopped early.", source);
                    return;
                }
                thread::sleep(POLL_INTERVAL.min(length.saturating_sub(started.elapsed())));
            }
            playing.store(false, Ordering::Relaxed);
            info!("Playback ended: '{}'.", source);
            if let Some(tx) = listener {
                let _ = tx.send(PlaybackEvent::Ended { id, source });
            }
        });

        self.current = Some(PlaybackThread { thread, stop_signal });
        id
    }

    fn stop(&mut self) {
        self.halt_current();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.halt_current();
        self.listener = None;
        self.released = true;
        info!("Playback backend released.");
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    fn set_listener(&mut self, listener: Sender<PlaybackEvent>) {
        self.listener = Some(listener);
    }
}

impl Drop for TimedPlayback {
    fn drop(&mut self) {
        self.halt_current();
    }
}
