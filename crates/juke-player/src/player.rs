//! The transport state machine.
//!
//! One `Player` owns the queue, the authoritative volume, and the sink.
//! Every transport command serialises on a single internal mutex and holds
//! it for the command's full duration, so the read-then-write sequences on
//! playback state and volume can never interleave. Fade-ins run on their
//! own task; they re-take the mutex briefly per step and verify the fade
//! generation immediately before each sink write, so a superseded ramp
//! cannot land a stale step after its successor's first one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use juke_core::config::PlayerConfig;
use juke_core::Track;

use crate::error::PlayerError;
use crate::fade::{FadePlan, MAX_FADE_SECS};
use crate::queue::Queue;
use crate::sink::AudioSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// How a command landed. State-machine misuse (pause while stopped, resume
/// while playing, ...) is reported, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Ignored(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    pub default_volume: f32,
    pub fade_secs: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            default_volume: 0.5,
            fade_secs: 2.0,
        }
    }
}

impl From<&PlayerConfig> for PlayerSettings {
    fn from(cfg: &PlayerConfig) -> Self {
        Self {
            default_volume: cfg.default_volume,
            fade_secs: cfg.fade_secs,
        }
    }
}

/// Read-only view for display layers.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub volume: f32,
    pub fade_secs: f32,
    pub shuffled: bool,
    pub cursor: Option<usize>,
    pub queue_len: usize,
    pub current: Option<Track>,
}

struct State {
    queue: Queue,
    playback: PlaybackState,
    /// Authoritative volume level, 0.0-1.0. Fades compute intermediate
    /// sink values but never change this; only `set_volume` does.
    volume: f32,
    fade_secs: f32,
}

struct Inner<S> {
    sink: S,
    state: Mutex<State>,
    /// Monotonic fade generation; bumping it supersedes any in-flight ramp.
    fade_gen: AtomicU64,
}

pub struct Player<S: AudioSink> {
    inner: Arc<Inner<S>>,
}

impl<S: AudioSink> Clone for Player<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: AudioSink> Player<S> {
    pub fn new(sink: S, settings: PlayerSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                state: Mutex::new(State {
                    queue: Queue::new(),
                    playback: PlaybackState::Stopped,
                    volume: settings.default_volume.clamp(0.0, 1.0),
                    fade_secs: settings.fade_secs.clamp(0.0, MAX_FADE_SECS),
                }),
                fade_gen: AtomicU64::new(0),
            }),
        }
    }

    /// Append tracks to the queue; returns how many were actually added
    /// (duplicates by path are skipped).
    pub async fn add_tracks(&self, tracks: Vec<Track>) -> usize {
        let mut st = self.inner.state.lock().await;
        let added = st.queue.append(tracks);
        info!("queued {} new tracks ({} total)", added, st.queue.len());
        added
    }

    /// Replace the queue wholesale (playlist reload).
    pub async fn reload_queue(&self, tracks: Vec<Track>) {
        let mut st = self.inner.state.lock().await;
        info!("queue reloaded with {} tracks", tracks.len());
        st.queue.reload(tracks);
    }

    /// Stopped -> Playing: load the track under the cursor (0 when fresh)
    /// and fade in from silence to the current volume level.
    pub async fn start(&self) -> Result<Outcome, PlayerError> {
        let mut st = self.inner.state.lock().await;
        match st.playback {
            PlaybackState::Playing => {
                warn!("start: already playing");
                Ok(Outcome::Ignored("already playing"))
            }
            PlaybackState::Paused => {
                warn!("start: paused, use resume");
                Ok(Outcome::Ignored("paused; resume instead"))
            }
            PlaybackState::Stopped => {
                st.queue.ensure_cursor()?;
                let track = st.queue.current().cloned().ok_or(PlayerError::EmptyQueue)?;
                info!("starting playback: {}", track.title);

                self.inner.sink.set_volume(0.0).map_err(PlayerError::Sink)?;
                self.inner
                    .sink
                    .load_track(&track.path)
                    .map_err(PlayerError::Sink)?;
                self.inner.sink.play().map_err(PlayerError::Sink)?;
                st.playback = PlaybackState::Playing;

                let plan = FadePlan::new(0.0, st.volume, st.fade_secs);
                self.spawn_fade(plan);
                Ok(Outcome::Done)
            }
        }
    }

    /// Playing -> Paused. Freezes the sink volume wherever the last fade
    /// step left it; the volume level and cursor are untouched.
    pub async fn pause(&self) -> Result<Outcome, PlayerError> {
        let mut st = self.inner.state.lock().await;
        if st.playback != PlaybackState::Playing {
            warn!("pause: nothing playing");
            return Ok(Outcome::Ignored("not playing"));
        }
        self.cancel_fade();
        self.inner.sink.pause().map_err(PlayerError::Sink)?;
        st.playback = PlaybackState::Paused;
        info!("paused");
        Ok(Outcome::Done)
    }

    /// Paused -> Playing.
    pub async fn resume(&self) -> Result<Outcome, PlayerError> {
        let mut st = self.inner.state.lock().await;
        if st.playback != PlaybackState::Paused {
            warn!("resume: nothing to resume");
            return Ok(Outcome::Ignored("nothing to resume"));
        }
        self.inner.sink.play().map_err(PlayerError::Sink)?;
        st.playback = PlaybackState::Playing;
        info!("resumed");
        Ok(Outcome::Done)
    }

    /// {Playing, Paused} -> Stopped. When audible, the fade-out runs to
    /// completion before the sink is halted; queue state is untouched.
    pub async fn stop(&self) -> Result<Outcome, PlayerError> {
        let mut st = self.inner.state.lock().await;
        match st.playback {
            PlaybackState::Stopped => {
                warn!("stop: already stopped");
                Ok(Outcome::Ignored("already stopped"))
            }
            PlaybackState::Playing => {
                self.cancel_fade();
                let plan = FadePlan::new(st.volume, 0.0, st.fade_secs);
                self.run_fade_inline(&plan).await?;
                self.inner.sink.stop().map_err(PlayerError::Sink)?;
                st.playback = PlaybackState::Stopped;
                info!("playback stopped");
                Ok(Outcome::Done)
            }
            PlaybackState::Paused => {
                // Nothing audible to ramp down; collapse the fade-out.
                self.cancel_fade();
                self.inner.sink.set_volume(0.0).map_err(PlayerError::Sink)?;
                self.inner.sink.stop().map_err(PlayerError::Sink)?;
                st.playback = PlaybackState::Stopped;
                info!("playback stopped");
                Ok(Outcome::Done)
            }
        }
    }

    /// Advance the cursor circularly. When playing, the old track fades
    /// out and the new one fades in; otherwise only the pointer moves.
    pub async fn skip(&self) -> Result<Outcome, PlayerError> {
        let mut st = self.inner.state.lock().await;
        if st.queue.is_empty() {
            return Err(PlayerError::EmptyQueue);
        }

        let was_playing = st.playback == PlaybackState::Playing;
        if was_playing {
            self.cancel_fade();
            let plan = FadePlan::new(st.volume, 0.0, st.fade_secs);
            self.run_fade_inline(&plan).await?;
        }

        let idx = st.queue.advance()?;
        let track = st.queue.current().cloned().ok_or(PlayerError::EmptyQueue)?;

        if was_playing {
            info!("skipping to [{}] {}", idx, track.title);
            self.inner
                .sink
                .load_track(&track.path)
                .map_err(PlayerError::Sink)?;
            self.inner.sink.play().map_err(PlayerError::Sink)?;
            let plan = FadePlan::new(0.0, st.volume, st.fade_secs);
            self.spawn_fade(plan);
        } else {
            debug!("skip: cursor moved to [{}] {}", idx, track.title);
        }
        Ok(Outcome::Done)
    }

    /// Clamp into [0, 1] and apply immediately, no ramp, in any state.
    /// Supersedes any in-flight fade. Non-finite input is rejected.
    pub async fn set_volume(&self, level: f32) -> Result<Outcome, PlayerError> {
        if !level.is_finite() {
            return Err(PlayerError::InvalidParameter("volume must be finite"));
        }
        let clamped = level.clamp(0.0, 1.0);
        if clamped != level {
            warn!("volume {} out of range, clamped to {}", level, clamped);
        }

        let mut st = self.inner.state.lock().await;
        self.cancel_fade();
        st.volume = clamped;
        self.inner
            .sink
            .set_volume(clamped)
            .map_err(PlayerError::Sink)?;
        debug!("volume set to {:.2}", clamped);
        Ok(Outcome::Done)
    }

    /// Clamp into [0, 10] seconds; affects only subsequent fades.
    pub async fn set_fade_duration(&self, secs: f32) -> Result<Outcome, PlayerError> {
        if !secs.is_finite() {
            return Err(PlayerError::InvalidParameter("fade duration must be finite"));
        }
        let clamped = secs.clamp(0.0, MAX_FADE_SECS);
        if clamped != secs {
            warn!("fade duration {} out of range, clamped to {}", secs, clamped);
        }

        let mut st = self.inner.state.lock().await;
        st.fade_secs = clamped;
        debug!("fade duration set to {:.1}s", clamped);
        Ok(Outcome::Done)
    }

    /// Shuffle on: permute the active order, keeping the current track
    /// current. Shuffle off: restore the canonical order.
    pub async fn toggle_shuffle(&self) -> Result<Outcome, PlayerError> {
        let mut st = self.inner.state.lock().await;
        if st.queue.is_shuffled() {
            st.queue.disable_shuffle();
            info!("shuffle off");
        } else {
            st.queue.enable_shuffle(&mut rand::thread_rng());
            info!("shuffle on");
        }
        Ok(Outcome::Done)
    }

    pub async fn snapshot(&self) -> PlayerSnapshot {
        let st = self.inner.state.lock().await;
        PlayerSnapshot {
            state: st.playback,
            volume: st.volume,
            fade_secs: st.fade_secs,
            shuffled: st.queue.is_shuffled(),
            cursor: st.queue.cursor(),
            queue_len: st.queue.len(),
            current: st.queue.current().cloned(),
        }
    }

    /// Supersede any in-flight fade without starting a new one.
    fn cancel_fade(&self) {
        self.inner.fade_gen.fetch_add(1, Ordering::SeqCst);
    }

    /// Run a ramp while the caller already holds the state lock. The lock
    /// itself keeps competing commands (and fade tasks) out until the ramp
    /// has finished, so no generation check is needed here.
    async fn run_fade_inline(&self, plan: &FadePlan) -> Result<(), PlayerError> {
        for step in plan.steps() {
            if !plan.interval().is_zero() {
                tokio::time::sleep(plan.interval()).await;
            }
            self.inner.sink.set_volume(*step).map_err(PlayerError::Sink)?;
        }
        Ok(())
    }

    /// Launch a ramp on its own task. Claims a fresh generation under the
    /// state lock, so a command that cancels fades afterwards is
    /// guaranteed to supersede this one.
    fn spawn_fade(&self, plan: FadePlan) {
        let gen = self.inner.fade_gen.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = self.inner.clone();
        tokio::spawn(async move {
            for step in plan.steps() {
                if !plan.interval().is_zero() {
                    tokio::time::sleep(plan.interval()).await;
                }
                let _guard = inner.state.lock().await;
                if inner.fade_gen.load(Ordering::SeqCst) != gen {
                    debug!("fade superseded");
                    return;
                }
                if let Err(e) = inner.sink.set_volume(*step) {
                    warn!("fade step failed: {}", e);
                    return;
                }
            }
        });
    }
}
