//! # TopoKit Core
//!
//! Core types shared by every TopoKit crate:
//! - the error taxonomy (viewer, bridge, store, fetch)
//! - the application event bus
//! - project, metrics and optimization data records

pub mod data;
pub mod error;
pub mod event_bus;

pub use data::{MetricsRecord, NewProject, OptimizationOutput, OptimizationRequest, Project};

pub use error::{BridgeError, Error, FetchError, Result, StoreError, ViewerError};

pub use event_bus::{
    event_bus, AppEvent, EventBus, EventCategory, EventFilter, OptimizationEvent, OutputStream,
    ProjectEvent, SubscriptionId, ViewerEvent, WindowEvent,
};
