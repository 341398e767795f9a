//! Data records exchanged between the store, the bridge and the views.

mod metrics;
mod optimization;
mod project;

pub use metrics::MetricsRecord;
pub use optimization::{OptimizationOutput, OptimizationRequest};
pub use project::{NewProject, Project};
