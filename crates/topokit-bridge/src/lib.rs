//! # TopoKit Bridge
//!
//! Request/response surface between the views and the host side:
//! - [`Bridge`] routes named channels (`get-projects`, `run-optimization`)
//! - [`OptimizerCommand`] runs the external optimizer and gathers its output
//! - [`MetricsClient`] fetches metrics records over HTTP

pub mod bridge;
pub mod metrics;
pub mod optimizer;

pub use bridge::{Bridge, Channel};
pub use metrics::MetricsClient;
pub use optimizer::OptimizerCommand;
