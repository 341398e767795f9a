//! Render-level error boundary.
//!
//! Wraps page rendering so a panic while rendering becomes a fallback panel
//! with a retry action instead of taking the process down.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;

thread_local! {
    static ACTIVE_RENDERS: Cell<usize> = const { Cell::new(0) };
}

/// Fallback heading
pub const FALLBACK_MESSAGE: &str = "Oops! Something went wrong.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBoundary {
    has_error: bool,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// True while the current thread renders inside a boundary
    ///
    /// A panic hook uses this to tell panics a boundary will catch from
    /// ones that escape.
    pub fn is_active() -> bool {
        ACTIVE_RENDERS.with(|depth| depth.get() > 0)
    }

    /// Render `view`, or the fallback once a render has panicked
    pub fn render<F>(&mut self, view: F) -> String
    where
        F: FnOnce() -> String,
    {
        if self.has_error {
            return Self::fallback();
        }
        ACTIVE_RENDERS.with(|depth| depth.set(depth.get() + 1));
        let outcome = panic::catch_unwind(AssertUnwindSafe(view));
        ACTIVE_RENDERS.with(|depth| depth.set(depth.get() - 1));

        match outcome {
            Ok(rendered) => rendered,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("ErrorBoundary caught an error: {}", message);
                self.has_error = true;
                Self::fallback()
            }
        }
    }

    /// The retry action: the next render tries the view again
    pub fn retry(&mut self) {
        self.has_error = false;
    }

    pub fn fallback() -> String {
        format!("{}\n[Retry]", FALLBACK_MESSAGE)
    }
}
