//! Typewriter text reveal
//!
//! Reveals a string one character at a time into a [`TextSink`]. `skip()`
//! raises a flag that the reveal loop observes at the next step — and also
//! wakes the in-flight interval sleep, so skipping never waits out a pending
//! interval — at which point the full remaining text is written at once.
//!
//! The primitive is restartable: `reveal` resets its flags on entry, and the
//! orchestrator guarantees at most one reveal is active at a time.

use crate::surface::TextSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;

/// Cancellable character-by-character text reveal.
pub struct Typewriter {
    interval: Duration,
    typing: AtomicBool,
    skip_requested: AtomicBool,
    skip_wake: Notify,
}

impl Typewriter {
    /// `interval` is the delay per revealed character. A zero interval
    /// disables the effect entirely: `reveal` writes the full text at once.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            typing: AtomicBool::new(false),
            skip_requested: AtomicBool::new(false),
            skip_wake: Notify::new(),
        }
    }

    pub fn shared(interval: Duration) -> Arc<Self> {
        Arc::new(Self::new(interval))
    }

    pub fn is_typing(&self) -> bool {
        self.typing.load(Ordering::SeqCst)
    }

    /// Request the active reveal to jump to the full text. A no-op when
    /// nothing is being revealed.
    pub fn skip(&self) {
        if self.is_typing() {
            self.skip_requested.store(true, Ordering::SeqCst);
            self.skip_wake.notify_one();
        }
    }

    /// Reveal `text` into `sink`. Resolves once the full text is visible,
    /// whether by running out the reveal or by being skipped.
    pub async fn reveal(&self, text: &str, sink: &(impl TextSink + ?Sized)) {
        if text.is_empty() {
            sink.set_text("");
            return;
        }
        if self.interval.is_zero() {
            sink.set_text(text);
            return;
        }

        self.skip_requested.store(false, Ordering::SeqCst);
        // A skip can land just as the previous reveal finishes, leaving a
        // stored wake permit behind; consume it so it cannot cut the first
        // interval of this reveal short.
        {
            let stale = self.skip_wake.notified();
            tokio::pin!(stale);
            if stale.as_mut().enable() {
                stale.await;
            }
        }
        self.typing.store(true, Ordering::SeqCst);

        for (index, ch) in text.char_indices() {
            if self.skip_requested.load(Ordering::SeqCst) {
                break;
            }
            let end = index + ch.len_utf8();
            sink.set_text(&text[..end]);
            if end == text.len() {
                break;
            }

            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = self.skip_wake.notified() => {}
            }
        }

        // Skipped or finished: either way the full text must be visible.
        sink.set_text(text);
        self.typing.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<String>>,
    }

    impl RecordingSink {
        fn last(&self) -> String {
            self.writes.lock().unwrap().last().cloned().unwrap_or_default()
        }

        fn count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl TextSink for RecordingSink {
        fn set_text(&self, text: &str) {
            self.writes.lock().unwrap().push(text.to_string());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reveals_one_character_at_a_time() {
        let sink = RecordingSink::default();
        let tw = Typewriter::new(Duration::from_millis(50));
        tw.reveal("abc", &sink).await;

        let writes = sink.writes.lock().unwrap().clone();
        assert_eq!(writes, vec!["a", "ab", "abc", "abc"]);
        assert!(!tw.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_writes_full_text_immediately() {
        let sink = RecordingSink::default();
        let tw = Typewriter::new(Duration::ZERO);
        tw.reveal("hello", &sink).await;

        assert_eq!(sink.count(), 1);
        assert_eq!(sink.last(), "hello");
        assert!(!tw.is_typing());
    }

    #[tokio::test]
    async fn skip_completes_without_waiting_remaining_intervals() {
        // 200 characters at 10s per character would run for over half an
        // hour; the test passes only because skip short-circuits.
        let sink = Arc::new(RecordingSink::default());
        let tw = Typewriter::shared(Duration::from_secs(10));
        let text: String = "あ".repeat(200);

        let handle = {
            let tw = tw.clone();
            let sink = sink.clone();
            let text = text.clone();
            tokio::spawn(async move { tw.reveal(&text, &*sink).await })
        };

        while !tw.is_typing() {
            tokio::task::yield_now().await;
        }
        tw.skip();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("skip must resolve the reveal promptly")
            .unwrap();
        assert_eq!(sink.last(), text);
        assert!(!tw.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_wake_permit_does_not_shorten_the_next_reveal() {
        let sink = RecordingSink::default();
        let tw = Typewriter::new(Duration::from_millis(50));
        // A skip that races the end of the previous reveal observes the
        // typing flag still set and stores a wake permit nobody consumes.
        tw.skip_wake.notify_one();

        let started = tokio::time::Instant::now();
        tw.reveal("abc", &sink).await;

        // Two full intervals: the leftover permit must not wake the first
        // sleep early.
        assert!(started.elapsed() >= Duration::from_millis(100));
        let writes = sink.writes.lock().unwrap().clone();
        assert_eq!(writes, vec!["a", "ab", "abc", "abc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_while_idle_is_a_no_op() {
        let sink = RecordingSink::default();
        let tw = Typewriter::new(Duration::from_millis(50));
        tw.skip();
        tw.reveal("ab", &sink).await;
        // The stale skip request must not cut the fresh reveal short.
        let writes = sink.writes.lock().unwrap().clone();
        assert_eq!(writes, vec!["a", "ab", "ab"]);
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_is_restartable_after_skip() {
        let sink = Arc::new(RecordingSink::default());
        let tw = Typewriter::shared(Duration::from_millis(50));

        let handle = {
            let tw = tw.clone();
            let sink = sink.clone();
            tokio::spawn(async move { tw.reveal("first line", &*sink).await })
        };
        while !tw.is_typing() {
            tokio::task::yield_now().await;
        }
        tw.skip();
        handle.await.unwrap();
        assert_eq!(sink.last(), "first line");

        tw.reveal("second", &*sink).await;
        assert_eq!(sink.last(), "second");
        assert!(!tw.is_typing());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_text_clears_the_sink() {
        let sink = RecordingSink::default();
        let tw = Typewriter::new(Duration::from_millis(50));
        tw.reveal("", &sink).await;
        assert_eq!(sink.last(), "");
        assert!(!tw.is_typing());
    }
}
