//! Audio coordinator
//!
//! Browser policy (and several desktop backends) forbid playback until a
//! genuine user interaction has happened. The coordinator models that as a
//! one-way `Locked -> Unlocked` gate: while locked, play requests are
//! captured — at most one pending BGM (latest wins) and every SE in
//! submission order — and replayed on [`AudioCoordinator::unlock`].
//!
//! Audio is best-effort throughout: a decode error or autoplay rejection is
//! logged and swallowed, never allowed to halt narrative progression.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AudioError {
    #[error("playback of '{url}' failed: {message}")]
    Playback { url: String, message: String },
}

impl AudioError {
    pub fn playback(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Playback {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Host audio capability. One exclusive BGM channel plus independent,
/// overlapping SE instances.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start the BGM track at `url`. Any previously playing track has
    /// already been stopped by the coordinator.
    async fn play_bgm(&self, url: &str, looping: bool, volume: f32) -> Result<(), AudioError>;

    /// Halt the BGM channel and reset its position.
    fn stop_bgm(&self);

    /// Whether the BGM channel is currently audible-or-running.
    fn bgm_playing(&self) -> bool;

    /// Adjust the volume of the active BGM track.
    fn set_bgm_volume(&self, volume: f32);

    /// Play a one-shot sound effect as an independent instance.
    async fn play_se(&self, url: &str, volume: f32) -> Result<(), AudioError>;
}

#[derive(Debug, Clone)]
struct PendingBgm {
    url: String,
    looping: bool,
}

/// Requests captured while the gate is locked.
#[derive(Debug, Default)]
struct PendingAudio {
    bgm: Option<PendingBgm>,
    se: Vec<String>,
}

struct AudioState {
    unlocked: bool,
    muted: bool,
    bgm_volume: f32,
    se_volume: f32,
    current_bgm: String,
    pending: PendingAudio,
}

/// Gates, queues and routes all sound. Shared by the scene director and the
/// orchestrator; interior state is locked only for decisions, never across
/// a backend await.
pub struct AudioCoordinator {
    backend: Arc<dyn AudioBackend>,
    state: Mutex<AudioState>,
}

impl AudioCoordinator {
    pub fn new(backend: Arc<dyn AudioBackend>, bgm_volume: f32, se_volume: f32) -> Self {
        Self {
            backend,
            state: Mutex::new(AudioState {
                unlocked: false,
                muted: false,
                bgm_volume: bgm_volume.clamp(0.0, 1.0),
                se_volume: se_volume.clamp(0.0, 1.0),
                current_bgm: String::new(),
                pending: PendingAudio::default(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AudioState> {
        self.state.lock().expect("audio state lock poisoned")
    }

    pub fn is_unlocked(&self) -> bool {
        self.lock().unlocked
    }

    /// One-way transition out of the locked state, to be called on the first
    /// genuine user interaction. Replays the captured BGM request (latest
    /// wins) and then every captured SE in submission order.
    pub async fn unlock(&self) {
        let pending = {
            let mut state = self.lock();
            if state.unlocked {
                return;
            }
            state.unlocked = true;
            std::mem::take(&mut state.pending)
        };
        info!("audio unlocked");

        if let Some(bgm) = pending.bgm {
            self.play_bgm(&bgm.url, bgm.looping).await;
        }
        for url in pending.se {
            self.play_se(&url).await;
        }
    }

    /// Play (or queue, while locked) the looping background track at `url`.
    /// Requesting the track that is already playing is a no-op.
    pub async fn play_bgm(&self, url: &str, looping: bool) {
        let volume = {
            let mut state = self.lock();
            if !state.unlocked {
                debug!("audio locked, queuing BGM '{url}'");
                state.pending.bgm = Some(PendingBgm {
                    url: url.to_string(),
                    looping,
                });
                return;
            }

            if state.current_bgm == url && self.backend.bgm_playing() {
                return;
            }

            self.backend.stop_bgm();
            state.current_bgm = url.to_string();
            if state.muted { 0.0 } else { state.bgm_volume }
        };

        if let Err(e) = self.backend.play_bgm(url, looping, volume).await {
            warn!("BGM playback failed: {e}");
        }
    }

    /// Stop the BGM channel and forget the active track.
    pub fn stop_bgm(&self) {
        let mut state = self.lock();
        self.backend.stop_bgm();
        state.current_bgm.clear();
    }

    /// Play (or queue, while locked) a one-shot sound effect.
    pub async fn play_se(&self, url: &str) {
        let volume = {
            let mut state = self.lock();
            if !state.unlocked {
                debug!("audio locked, queuing SE '{url}'");
                state.pending.se.push(url.to_string());
                return;
            }
            if state.muted { 0.0 } else { state.se_volume }
        };

        if let Err(e) = self.backend.play_se(url, volume).await {
            warn!("SE playback failed: {e}");
        }
    }

    pub fn set_bgm_volume(&self, volume: f32) {
        let mut state = self.lock();
        state.bgm_volume = volume.clamp(0.0, 1.0);
        if !state.muted {
            self.backend.set_bgm_volume(state.bgm_volume);
        }
    }

    pub fn set_se_volume(&self, volume: f32) {
        let mut state = self.lock();
        state.se_volume = volume.clamp(0.0, 1.0);
    }

    /// Silence current and future playback without stopping it.
    pub fn mute(&self) {
        let mut state = self.lock();
        state.muted = true;
        self.backend.set_bgm_volume(0.0);
    }

    pub fn unmute(&self) {
        let mut state = self.lock();
        state.muted = false;
        self.backend.set_bgm_volume(state.bgm_volume);
    }

    pub fn toggle_mute(&self) {
        // Route through mute/unmute so the backend volume stays in step.
        let muted = self.lock().muted;
        if muted {
            self.unmute();
        } else {
            self.mute();
        }
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }
}
