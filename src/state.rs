//! Playback state shared between the run loop and control methods
//!
//! `running` is a watch channel rather than a plain flag so waits inside the
//! loop (dialogue acknowledgement, choice pick) can race against a stop
//! request, and `auto_mode` is one so engaging it wakes a wait already
//! parked on input. `LoopPhase` is the explicit loop-lifecycle
//! acknowledgement that quick-load awaits before restarting: the loop
//! publishes `Exited` on the way out, and nothing sleeps an arbitrary delay
//! to "let the loop finish".

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Where the run loop currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// No loop has run yet, or the state was reset by return-to-title.
    Idle,
    Running,
    /// The last loop iteration has fully unwound.
    Exited,
}

/// Process-wide playback flags, owned by the orchestrator and discarded on
/// return-to-title.
pub struct PlaybackState {
    running: watch::Sender<bool>,
    phase: watch::Sender<LoopPhase>,
    paused: AtomicBool,
    auto_mode: watch::Sender<bool>,
    skip_mode: AtomicBool,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self {
            running: watch::Sender::new(false),
            phase: watch::Sender::new(LoopPhase::Idle),
            paused: AtomicBool::new(false),
            auto_mode: watch::Sender::new(false),
            skip_mode: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    pub fn set_running(&self, running: bool) {
        self.running.send_replace(running);
    }

    /// Resolves when a stop has been requested. Used to interrupt input and
    /// choice waits so a halt request never hangs on user inactivity.
    pub async fn stop_requested(&self) {
        let mut rx = self.running.subscribe();
        // Ignore a closed channel: sender lives as long as self.
        let _ = rx.wait_for(|running| !running).await;
    }

    pub fn phase(&self) -> LoopPhase {
        *self.phase.borrow()
    }

    /// Claim the run loop. Fails when another loop iteration chain is
    /// already active, which keeps the loop single-instance.
    pub fn begin_loop(&self) -> bool {
        self.phase.send_if_modified(|phase| {
            if *phase == LoopPhase::Running {
                false
            } else {
                *phase = LoopPhase::Running;
                true
            }
        })
    }

    pub fn publish_exit(&self) {
        self.phase.send_replace(LoopPhase::Exited);
    }

    pub fn reset_phase(&self) {
        self.phase.send_replace(LoopPhase::Idle);
    }

    /// Resolves once the loop has published its exit. Resolves immediately
    /// when no loop is running.
    pub async fn loop_exited(&self) {
        let mut rx = self.phase.subscribe();
        let _ = rx.wait_for(|phase| *phase != LoopPhase::Running).await;
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn auto_mode(&self) -> bool {
        *self.auto_mode.borrow()
    }

    pub fn toggle_auto(&self) -> bool {
        let mut engaged = false;
        self.auto_mode.send_modify(|auto| {
            *auto = !*auto;
            engaged = *auto;
        });
        engaged
    }

    /// Resolves once auto mode is engaged. Resolves immediately when it
    /// already is.
    pub async fn auto_engaged(&self) {
        let mut rx = self.auto_mode.subscribe();
        let _ = rx.wait_for(|auto| *auto).await;
    }

    pub fn skip_mode(&self) -> bool {
        self.skip_mode.load(Ordering::SeqCst)
    }

    pub fn toggle_skip(&self) -> bool {
        !self.skip_mode.fetch_xor(true, Ordering::SeqCst)
    }

    /// Back to the just-constructed state (return-to-title).
    pub fn reset(&self) {
        self.set_running(false);
        self.set_paused(false);
        self.auto_mode.send_replace(false);
        self.skip_mode.store(false, Ordering::SeqCst);
        self.reset_phase();
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
