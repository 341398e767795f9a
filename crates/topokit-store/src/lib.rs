//! # TopoKit Store
//!
//! Single-table SQLite persistence for project records.
//!
//! The store is opened once at startup and reached only through the process
//! bridge, which serialises access over one connection.

pub mod store;

pub use store::{ProjectStore, SCHEMA};
