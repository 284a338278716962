//! Opacity fade over a configurable duration
//!
//! Progress is derived from elapsed time each frame, so a slow frame step
//! never stretches the total duration. The effect resolves when progress
//! reaches 1 and can be run again immediately on the same target.

use std::time::Duration;
use tokio::time::{Instant, sleep};

/// A visual element whose opacity can be animated.
pub trait FadeTarget: Send + Sync {
    fn opacity(&self) -> f32;
    fn set_opacity(&self, value: f32);
}

/// A fade animation over one opacity property. Not cancellable: fades are
/// short and structural, and callers await them before starting the next
/// fade on the same target.
#[derive(Debug, Clone)]
pub struct Fade {
    duration: Duration,
    frame: Duration,
}

impl Fade {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            frame: Duration::from_millis(16),
        }
    }

    pub fn with_frame(mut self, frame: Duration) -> Self {
        self.frame = frame.max(Duration::from_millis(1));
        self
    }

    /// Animate opacity 0 -> 1.
    pub async fn fade_in(&self, target: &(impl FadeTarget + ?Sized)) {
        target.set_opacity(0.0);
        self.run(target, |progress| progress).await;
    }

    /// Animate the current opacity down to 0.
    pub async fn fade_out(&self, target: &(impl FadeTarget + ?Sized)) {
        let start = target.opacity();
        self.run(target, move |progress| start * (1.0 - progress))
            .await;
    }

    async fn run(&self, target: &(impl FadeTarget + ?Sized), curve: impl Fn(f32) -> f32) {
        if self.duration.is_zero() {
            target.set_opacity(curve(1.0));
            return;
        }

        let started = Instant::now();
        loop {
            let progress =
                (started.elapsed().as_secs_f32() / self.duration.as_secs_f32()).min(1.0);
            target.set_opacity(curve(progress));
            if progress >= 1.0 {
                return;
            }
            sleep(self.frame).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTarget {
        values: Mutex<Vec<f32>>,
    }

    impl FadeTarget for RecordingTarget {
        fn opacity(&self) -> f32 {
            self.values.lock().unwrap().last().copied().unwrap_or(1.0)
        }

        fn set_opacity(&self, value: f32) {
            self.values.lock().unwrap().push(value);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fade_in_ends_fully_opaque() {
        let target = RecordingTarget::default();
        Fade::new(Duration::from_millis(300)).fade_in(&target).await;

        let values = target.values.lock().unwrap();
        assert_eq!(*values.first().unwrap(), 0.0);
        assert_eq!(*values.last().unwrap(), 1.0);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn fade_out_scales_from_current_opacity() {
        let target = RecordingTarget::default();
        target.set_opacity(0.8);
        Fade::new(Duration::from_millis(300)).fade_out(&target).await;

        let values = target.values.lock().unwrap();
        assert_eq!(*values.last().unwrap(), 0.0);
        assert!(values.iter().all(|v| *v <= 0.8));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_fade_settles_immediately() {
        let target = RecordingTarget::default();
        Fade::new(Duration::ZERO).fade_in(&target).await;
        assert_eq!(target.opacity(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn fade_is_restartable() {
        let target = RecordingTarget::default();
        let fade = Fade::new(Duration::from_millis(100));
        fade.fade_in(&target).await;
        fade.fade_out(&target).await;
        fade.fade_in(&target).await;
        assert_eq!(target.opacity(), 1.0);
    }
}
