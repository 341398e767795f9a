//! Cancellable per-frame render task.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

/// What the loop should do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Stop,
}

/// Call `frame` once per `interval` until it returns [`FrameControl::Stop`]
///
/// Must be called inside a Tokio runtime. Frames run on the blocking pool so
/// a slow draw never stalls the async workers. The returned handle can be
/// aborted to cancel the loop between frames.
pub fn spawn_render_loop<F>(interval: Duration, frame: F) -> JoinHandle<()>
where
    F: FnMut() -> FrameControl + Send + 'static,
{
    let period = interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let frame = Arc::new(Mutex::new(frame));
        let mut frames = 0u64;
        loop {
            ticker.tick().await;
            let next = Arc::clone(&frame);
            let control = match tokio::task::spawn_blocking(move || (next.lock())()).await {
                Ok(control) => control,
                Err(e) => {
                    error!("Render frame failed: {}", e);
                    FrameControl::Stop
                }
            };
            if control == FrameControl::Stop {
                break;
            }
            frames += 1;
        }
        debug!("Render loop stopped after {} frames", frames);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_stops_when_frame_says_so() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let handle = spawn_render_loop(Duration::from_millis(1), move || {
            if counter.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                FrameControl::Stop
            } else {
                FrameControl::Continue
            }
        });
        handle.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_abort_cancels_loop() {
        let handle = spawn_render_loop(Duration::from_millis(1), || FrameControl::Continue);
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_frames_run_off_the_async_thread() {
        let async_thread = std::thread::current().id();
        let frame_thread = Arc::new(Mutex::new(None));
        let seen = Arc::clone(&frame_thread);

        let handle = spawn_render_loop(Duration::from_millis(1), move || {
            *seen.lock() = Some(std::thread::current().id());
            FrameControl::Stop
        });
        handle.await.unwrap();

        let frame_thread = (*frame_thread.lock()).unwrap();
        assert_ne!(frame_thread, async_thread);
    }

    #[tokio::test]
    async fn test_panicking_frame_stops_loop() {
        let handle = spawn_render_loop(Duration::from_millis(1), || panic!("rasterizer overflow"));
        assert!(handle.await.is_ok());
    }
}
