//! Event type definitions for the event bus.

use serde::{Deserialize, Serialize};

/// Root event enum for all application events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppEvent {
    /// Host window notifications
    Window(WindowEvent),
    /// Project list activity
    Project(ProjectEvent),
    /// External optimizer activity
    Optimization(OptimizationEvent),
    /// Viewport lifecycle
    Viewer(ViewerEvent),
}

impl AppEvent {
    /// Get the category of this event
    pub fn category(&self) -> EventCategory {
        match self {
            AppEvent::Window(_) => EventCategory::Window,
            AppEvent::Project(_) => EventCategory::Project,
            AppEvent::Optimization(_) => EventCategory::Optimization,
            AppEvent::Viewer(_) => EventCategory::Viewer,
        }
    }

    /// Short description for logging
    pub fn description(&self) -> String {
        match self {
            AppEvent::Window(WindowEvent::Resized { width, height }) => {
                format!("window resized to {}x{}", width, height)
            }
            AppEvent::Project(ProjectEvent::ListLoaded { count }) => {
                format!("{} projects loaded", count)
            }
            AppEvent::Optimization(e) => match e {
                OptimizationEvent::Started { input_path, .. } => {
                    format!("optimization started for {}", input_path)
                }
                OptimizationEvent::Output { stream, text } => {
                    format!("optimizer {}: {} bytes", stream, text.len())
                }
                OptimizationEvent::Finished { success, .. } => {
                    format!("optimization finished (success: {})", success)
                }
            },
            AppEvent::Viewer(e) => match e {
                ViewerEvent::ModelLoaded { path, .. } => format!("model loaded: {}", path),
                ViewerEvent::ModelFailed { path, .. } => format!("model failed: {}", path),
                ViewerEvent::SessionDisposed { session } => format!("session {} disposed", session),
            },
        }
    }
}

/// Event category for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    Window,
    Project,
    Optimization,
    Viewer,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Window => write!(f, "Window"),
            Self::Project => write!(f, "Project"),
            Self::Optimization => write!(f, "Optimization"),
            Self::Viewer => write!(f, "Viewer"),
        }
    }
}

/// Host window events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowEvent {
    /// The host container changed size
    Resized { width: u32, height: u32 },
}

/// Project events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectEvent {
    ListLoaded { count: usize },
}

/// Which output stream of the optimizer a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// External optimizer events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationEvent {
    Started {
        input_path: String,
        output_path: String,
    },
    /// A chunk of process output, forwarded as it arrives
    Output { stream: OutputStream, text: String },
    Finished {
        success: bool,
        exit_code: Option<i32>,
    },
}

/// Viewport lifecycle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewerEvent {
    ModelLoaded { path: String, triangles: usize },
    ModelFailed { path: String, error: String },
    SessionDisposed { session: String },
}
