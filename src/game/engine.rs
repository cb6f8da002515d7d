use crate::config::EngineConfig;
use crate::core::audio::{AudioService, PlaybackEvent, PlaybackId};
use crate::error::{GameError, Result};
use crate::game::gameplay::{GameState, GameStatus, Rules, Session, TickOutcome};
use crate::game::judgment::TapVerdict;
use crate::game::scores::ScoreSink;
use crate::game::song::SongLookup;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

/// The tempo loop thread and the channel that wakes it for cancellation.
struct TempoLoop {
    generation: u64,
    cancel: Sender<()>,
    thread: thread::JoinHandle<()>,
}

/// The track playing for one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ActiveTrack {
    generation: u64,
    id: PlaybackId,
}

struct AudioSlot {
    service: Box<dyn AudioService>,
    active: Option<ActiveTrack>,
    released: bool,
}

struct Inner {
    session: Mutex<Session>,
    subscribers: Mutex<Vec<Sender<GameState>>>,
    tempo: Mutex<Option<TempoLoop>>,
    audio: Mutex<AudioSlot>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    library: Arc<dyn SongLookup>,
    scores: Arc<dyn ScoreSink>,
}

/// Runs rhythm sessions: owns the state, the tempo loop and the audio handle.
///
/// Three sources can end a session: a note falling past the hit zone, a tap that
/// hits nothing, and the track ending. Each goes through the same Playing-only
/// transition under the session lock, so exactly one wins and the score is
/// persisted at most once.
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    pub fn new(
        library: Arc<dyn SongLookup>,
        scores: Arc<dyn ScoreSink>,
        audio: Box<dyn AudioService>,
        config: &EngineConfig,
    ) -> Self {
        let rng: Box<dyn RngCore + Send> = match config.rng_seed {
            Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
            None => Box::new(StdRng::from_os_rng()),
        };
        Self::with_rng(library, scores, audio, config, rng)
    }

    /// Like `new`, with an explicit lane source.
    pub fn with_rng(
        library: Arc<dyn SongLookup>,
        scores: Arc<dyn ScoreSink>,
        mut audio: Box<dyn AudioService>,
        config: &EngineConfig,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        let (event_tx, event_rx) = channel();
        audio.set_listener(event_tx);

        let inner = Arc::new(Inner {
            session: Mutex::new(Session::new(Rules::from(config))),
            subscribers: Mutex::new(Vec::new()),
            tempo: Mutex::new(None),
            audio: Mutex::new(AudioSlot { service: audio, active: None, released: false }),
            rng: Mutex::new(rng),
            library,
            scores,
        });

        spawn_playback_bridge(Arc::downgrade(&inner), event_rx);
        Self { inner }
    }

    /// Starts a session for `song_id`, ending any session still running.
    ///
    /// A missing song or a zero tempo leaves the engine in GameOver with the
    /// error message set, and is also returned.
    pub fn load_song(&self, song_id: &str) -> Result<()> {
        self.inner.end_game();
        let generation = self.inner.mutate(|s| {
            s.begin_loading();
            s.generation()
        });

        let song = match self.inner.library.get_song(song_id) {
            Some(song) => song,
            None => return Err(self.inner.fail_session(GameError::SongNotFound(song_id.to_string()))),
        };
        let interval = match song.beat_interval() {
            Ok(interval) => interval,
            Err(e) => return Err(self.inner.fail_session(e)),
        };

        // Audio and the tempo loop start under the session lock, so a teardown
        // either runs before the session is Playing or sees both to stop.
        let started = self.inner.mutate(|s| {
            if s.generation() != generation || s.status() != GameStatus::Loading {
                return false;
            }
            s.start((*song).clone());
            self.inner.start_audio(&song.source, generation);
            Inner::start_tempo_loop(&self.inner, interval, generation);
            true
        });
        if !started {
            debug!("Load of '{}' superseded by another load.", song_id);
        }
        Ok(())
    }

    /// Feeds a lane tap to the judge. Lanes outside the board are rejected untouched.
    pub fn on_lane_tapped(&self, lane: usize) -> Result<TapVerdict> {
        let (verdict, generation) = self.inner.mutate(|s| s.tap(lane).map(|v| (v, s.generation())))?;
        if verdict == TapVerdict::WrongTap {
            self.inner.end_session(generation);
        }
        Ok(verdict)
    }

    /// Ends the current session. Safe to call any number of times, from any thread.
    pub fn end_game(&self) {
        self.inner.end_game();
    }

    pub fn snapshot(&self) -> GameState {
        self.inner.session.lock().unwrap().state().clone()
    }

    /// Receives a snapshot after every state change, starting with the current one.
    pub fn subscribe(&self) -> Receiver<GameState> {
        let (tx, rx) = channel();
        let session = self.inner.session.lock().unwrap();
        let _ = tx.send(session.state().clone());
        self.inner.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn is_audio_playing(&self) -> bool {
        self.inner.audio.lock().unwrap().service.is_playing()
    }

    /// Ends any session and releases the audio handle. Further sessions will be silent.
    pub fn dispose(&self) {
        self.inner.end_game();
        let mut audio = self.inner.audio.lock().unwrap();
        if !audio.released {
            audio.service.release();
            audio.released = true;
            info!("Engine disposed.");
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Inner {
    /// Applies `f` to the session and publishes the result while still holding the lock,
    /// so subscribers see snapshots in mutation order.
    fn mutate<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.lock().unwrap();
        let result = f(&mut session);
        let snapshot = session.state().clone();
        self.subscribers.lock().unwrap().retain(|tx| tx.send(snapshot.clone()).is_ok());
        result
    }

    fn fail_session(&self, err: GameError) -> GameError {
        warn!("Cannot start session: {}", err);
        self.mutate(|s| s.fail(err.to_string()));
        err
    }

    fn start_audio(&self, source: &str, generation: u64) {
        let mut audio = self.audio.lock().unwrap();
        if audio.released {
            warn!("Audio already released; '{}' will not play.", source);
            return;
        }
        if audio.active.is_some() {
            audio.service.stop();
        }
        let id = audio.service.play(source);
        audio.active = Some(ActiveTrack { generation, id });
    }

    fn stop_audio(&self, generation: u64) {
        let mut audio = self.audio.lock().unwrap();
        if audio.active.is_some_and(|track| track.generation == generation) {
            audio.service.stop();
            audio.active = None;
        }
    }

    fn start_tempo_loop(this: &Arc<Self>, interval: Duration, generation: u64) {
        let (cancel, cancelled) = channel();
        let inner = Arc::clone(this);
        let thread = thread::spawn(move || inner.run_tempo_loop(interval, generation, cancelled));
        info!("Tempo loop started ({}ms per beat).", interval.as_millis());
        if let Some(stale) = this.tempo.lock().unwrap().replace(TempoLoop { generation, cancel, thread }) {
            warn!("Replacing a tempo loop that was never cancelled.");
            let _ = stale.cancel.send(());
        }
    }

    /// Spawn, wait one beat, advance; until the session leaves Playing or is cancelled.
    fn run_tempo_loop(&self, interval: Duration, generation: u64, cancelled: Receiver<()>) {
        loop {
            let lanes = self.session.lock().unwrap().rules().lanes;
            let lane = self.rng.lock().unwrap().random_range(0..lanes);
            let spawned = self.mutate(|s| if s.generation() == generation { s.spawn(lane) } else { None });
            if spawned.is_none() {
                break;
            }

            match cancelled.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            let outcome =
                self.mutate(|s| if s.generation() == generation { s.advance() } else { TickOutcome::Idle });
            match outcome {
                TickOutcome::Advanced => {}
                TickOutcome::Missed(note) => {
                    debug!("Tempo loop stopping after miss of {}.", note);
                    self.end_session(generation);
                    break;
                }
                TickOutcome::Idle => break,
            }
        }
        debug!("Tempo loop exited.");
    }

    fn cancel_tempo_loop(&self, generation: u64) {
        let tempo = {
            let mut slot = self.tempo.lock().unwrap();
            if slot.as_ref().is_some_and(|running| running.generation == generation) {
                slot.take()
            } else {
                None
            }
        };
        let Some(tempo) = tempo else {
            return;
        };
        let _ = tempo.cancel.send(());
        // The loop ends its own session on a miss; it cannot join itself.
        if tempo.thread.thread().id() != thread::current().id() && tempo.thread.join().is_err() {
            error!("Tempo loop panicked.");
        }
    }

    fn end_game(&self) {
        let generation = self.session.lock().unwrap().generation();
        self.end_session(generation);
    }

    /// Tears down one session. Work for a session that has since been replaced is skipped.
    fn end_session(&self, generation: u64) {
        self.cancel_tempo_loop(generation);
        self.stop_audio(generation);

        let pending = self.mutate(|s| {
            if s.generation() != generation {
                return None;
            }
            if s.status() == GameStatus::Playing {
                s.terminate(GameStatus::GameOver);
            }
            s.take_pending_save()
        });

        if let Some((song_id, points)) = pending {
            match self.scores.save_score(&song_id, points) {
                Ok(()) => info!("Saved score {} for '{}'.", points, song_id),
                Err(e) => error!("Failed to save score {} for '{}': {}", points, song_id, e),
            }
        }
    }

    fn on_playback_event(&self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Ended { id, source } => {
                let track = self.audio.lock().unwrap().active.filter(|track| track.id == id);
                let Some(track) = track else {
                    debug!("Ignoring end of stale track '{}' ({:?}).", source, id);
                    return;
                };
                let won = self.mutate(|s| s.generation() == track.generation && s.terminate(GameStatus::Finished));
                if won {
                    self.end_session(track.generation);
                }
            }
        }
    }
}

/// Forwards playback notifications into the engine until the audio side hangs up
/// or the engine is gone.
fn spawn_playback_bridge(engine: Weak<Inner>, events: Receiver<PlaybackEvent>) {
    thread::spawn(move || {
        for event in events {
            let Some(inner) = engine.upgrade() else {
                break;
            };
            inner.on_playback_event(event);
        }
        debug!("Playback bridge exited.");
    });
}
