//! The "still working" indicator that runs alongside a pipeline invocation.
//!
//! Coordination is a single [`CancellationToken`]: the request owns a
//! [`ProgressGuard`] and the indicator task only ever observes the token.
//! Cancelling is idempotent and happens at most conceptually once per
//! request (`finish()` or the guard dropping, whichever comes first), so no
//! lock is needed. The indicator stops within one interval of the token
//! flipping and swallows sink errors — a status message that can no longer
//! be edited must not take the request down with it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Rotating status frames for the loading message.
pub const WORKING_FRAMES: [&str; 7] = [
    "\u{23f3} Working.",
    "\u{23f3} Working..",
    "\u{23f3} Working...",
    "\u{23f3} Working.....",
    "\u{23f3} Working..",
    "\u{23f3} Working.......",
    "\u{23f3} Working. . .",
];

/// Where indicator frames go; for the bot this edits the loading message.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn tick(&self, frame: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Owns the completion flag for one pipeline invocation.
///
/// `finish()` settles it explicitly; `Drop` settles it too, which is what
/// guarantees the indicator stops on early returns and panics.
pub struct ProgressGuard {
    token: CancellationToken,
}

impl ProgressGuard {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token for the indicator task to watch. Read-only by convention: the
    /// guard is the single writer.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Mark the pipeline invocation as done. Idempotent.
    pub fn finish(&self) {
        self.token.cancel();
    }
}

impl Default for ProgressGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn the indicator loop. Emits the next frame every `interval` until the
/// token settles; emit failures are logged and ignored.
pub fn spawn_indicator(
    sink: Arc<dyn ProgressSink>,
    token: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut frame = 0usize;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    let text = WORKING_FRAMES[frame % WORKING_FRAMES.len()];
                    frame = frame.wrapping_add(1);
                    if let Err(e) = sink.tick(text).await {
                        tracing::debug!("progress tick dropped: {e}");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingSink {
        ticks: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn tick(
            &self,
            _frame: &str,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("cannot edit".into())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn indicator_ticks_until_finished() {
        let sink = Arc::new(RecordingSink::default());
        let guard = ProgressGuard::new();
        let handle = spawn_indicator(sink.clone(), guard.token(), Duration::from_millis(800));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        guard.finish();
        handle.await.unwrap();

        assert!(sink.ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn indicator_stops_without_ticking_when_already_done() {
        let sink = Arc::new(RecordingSink::default());
        let guard = ProgressGuard::new();
        guard.finish();
        let handle = spawn_indicator(sink.clone(), guard.token(), Duration::from_millis(800));

        handle.await.unwrap();
        assert_eq!(sink.ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_errors_do_not_stop_the_indicator() {
        let sink = Arc::new(RecordingSink {
            ticks: AtomicUsize::new(0),
            fail: true,
        });
        let guard = ProgressGuard::new();
        let handle = spawn_indicator(sink.clone(), guard.token(), Duration::from_millis(800));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        guard.finish();
        handle.await.unwrap();

        assert!(sink.ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_guard_stops_the_indicator() {
        let sink = Arc::new(RecordingSink::default());
        let handle = {
            let guard = ProgressGuard::new();
            let handle =
                spawn_indicator(sink.clone(), guard.token(), Duration::from_millis(800));
            // Guard dropped here, as it would be on an error path.
            handle
        };
        handle.await.unwrap();
    }

    #[test]
    fn finish_is_idempotent() {
        let guard = ProgressGuard::new();
        let token = guard.token();
        guard.finish();
        guard.finish();
        assert!(token.is_cancelled());
    }
}
