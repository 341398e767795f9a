//! Optimize button on the viewer page.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::json;
use topokit_bridge::{Bridge, Channel};
use topokit_core::{BridgeError, OptimizationOutput};
use tracing::{error, info};

/// Button caption while idle
pub const IDLE_LABEL: &str = "Optimize Model";
/// Button caption while the optimizer runs
pub const BUSY_LABEL: &str = "Optimizing...";

/// Runs the optimizer for the page's model and tracks whether it is busy
#[derive(Debug)]
pub struct OptimizeAction {
    output_path: String,
    running: AtomicBool,
    last_result: Mutex<Option<Result<OptimizationOutput, BridgeError>>>,
}

impl OptimizeAction {
    /// `output_path` is passed to every run
    pub fn new(output_path: impl Into<String>) -> Self {
        Self {
            output_path: output_path.into(),
            running: AtomicBool::new(false),
            last_result: Mutex::new(None),
        }
    }

    pub fn output_path(&self) -> &str {
        &self.output_path
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The button is disabled while a run is in progress
    pub fn is_enabled(&self) -> bool {
        !self.is_running()
    }

    pub fn label(&self) -> &'static str {
        if self.is_running() {
            BUSY_LABEL
        } else {
            IDLE_LABEL
        }
    }

    /// Optimize `input_path` through the `run-optimization` channel
    ///
    /// Returns `None` without doing anything when a run is already going.
    pub async fn run(
        &self,
        bridge: &Bridge,
        input_path: &str,
    ) -> Option<Result<OptimizationOutput, BridgeError>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }
        let _running = RunningGuard(&self.running);

        let payload = json!({ "inputPath": input_path, "outputPath": self.output_path });
        let result = match bridge.invoke(Channel::RunOptimization.name(), payload).await {
            Ok(value) => serde_json::from_value::<OptimizationOutput>(value).map_err(|e| {
                BridgeError::InvalidPayload {
                    channel: Channel::RunOptimization.to_string(),
                    reason: e.to_string(),
                }
            }),
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => info!("Optimization completed"),
            Err(e) => error!("Optimization failed: {}", e),
        }
        *self.last_result.lock() = Some(result.clone());
        Some(result)
    }

    /// Outcome of the most recent run
    pub fn last_result(&self) -> Option<Result<OptimizationOutput, BridgeError>> {
        self.last_result.lock().clone()
    }

    /// Render the button and the last outcome
    pub fn render(&self) -> String {
        let mut lines = vec![format!("[{}]", self.label())];
        match self.last_result.lock().as_ref() {
            Some(Ok(_)) => lines.push(format!("Optimized model written to {}", self.output_path)),
            Some(Err(e)) => lines.push(e.to_string()),
            None => {}
        }
        lines.join("\n")
    }
}

/// Clears the busy flag when a run finishes or its future is dropped
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_button() {
        let action = OptimizeAction::new("optimized_model.stl");
        assert_eq!(action.label(), IDLE_LABEL);
        assert!(action.is_enabled());
        assert_eq!(action.render(), "[Optimize Model]");
        assert!(action.last_result().is_none());
    }
}
