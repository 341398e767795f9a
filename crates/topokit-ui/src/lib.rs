//! # TopoKit UI
//!
//! View models for the application shell. Each view fetches on mount,
//! moves through loading, error and loaded states, and renders to text:
//! - [`ProjectList`]: projects from the bridge, newest first
//! - [`MetricsPanel`]: metrics record as a bar chart
//! - [`Navigation`] and [`Route`]: routing with a fallback to `/`
//! - [`OptimizeAction`]: the optimize button of the viewer page
//! - [`ErrorBoundary`]: panic fallback with retry
//! - [`App`]: all of the above behind one navigation bar

pub mod app;
pub mod error_boundary;
pub mod metrics_panel;
pub mod navigation;
pub mod optimize;
pub mod project_list;
pub mod spinner;

pub use app::App;
pub use error_boundary::{ErrorBoundary, FALLBACK_MESSAGE};
pub use metrics_panel::{render_chart, MetricsPanel, DATASET_LABEL, FETCH_ERROR};
pub use navigation::{Navigation, Route};
pub use optimize::{OptimizeAction, BUSY_LABEL, IDLE_LABEL};
pub use project_list::{project_line, ProjectList};
pub use spinner::{LoadingSpinner, SpinnerColor, SpinnerSize};
