//! Error handling for TopoKit
//!
//! One error enum per component boundary:
//! - Viewer errors (format dispatch, asset loading, rendering context)
//! - Bridge errors (argument validation, external process, channel routing)
//! - Store errors (SQLite persistence)
//! - Fetch errors (metrics HTTP requests)
//!
//! Every variant renders the exact text shown in the UI error state, so the
//! `Display` output is part of the contract.

use thiserror::Error;

/// Viewport error type
///
/// Produced by the viewport lifecycle manager. None of these are fatal: the
/// viewer converts them into its error state and keeps running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// The asset extension is not one of the supported formats
    #[error("Unsupported model format. Please use .gltf, .glb, or .obj.")]
    UnsupportedFormat {
        /// The rejected asset path or URL.
        path: String,
    },

    /// Reading or parsing the asset failed
    #[error("Error loading model {path}: {reason}")]
    LoadFailed {
        /// The asset path or URL.
        path: String,
        /// The underlying I/O, network or parse failure.
        reason: String,
    },

    /// The renderer could not be created for the surface
    #[error("Error creating rendering context: {reason}")]
    RenderContextUnavailable {
        /// Why the backend refused to start.
        reason: String,
    },

    /// The surface has a zero dimension
    #[error("Invalid surface size {width}x{height}")]
    InvalidSurface {
        /// Surface width in pixels.
        width: u32,
        /// Surface height in pixels.
        height: u32,
    },

    /// An operation reached a session after teardown
    #[error("Viewport session has been disposed")]
    SessionDisposed,
}

/// Process bridge error type
///
/// Represents failures of the named operations the UI invokes across the
/// bridge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// A required path argument was missing or empty
    #[error("Invalid input or output path")]
    InvalidArguments,

    /// The optimizer process could not be started
    #[error("Failed to start optimizer process: {reason}")]
    SpawnFailed {
        /// The OS-level spawn failure.
        reason: String,
    },

    /// The optimizer exited with a non-zero status
    #[error("Optimizer process failed: {stderr}")]
    ProcessFailed {
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Everything the process wrote to standard error.
        stderr: String,
    },

    /// The optimizer exceeded the configured timeout and was killed
    #[error("Optimizer process timed out after {timeout_secs}s")]
    Timeout {
        /// The configured timeout in seconds.
        timeout_secs: u64,
    },

    /// No handler is registered for the channel
    #[error("Unknown channel: {channel}")]
    UnknownChannel {
        /// The requested channel name.
        channel: String,
    },

    /// The channel exists but has no behaviour yet
    #[error("Operation '{operation}' is declared but not implemented")]
    NotImplemented {
        /// The declared operation name.
        operation: String,
    },

    /// The request payload could not be decoded
    #[error("Invalid payload for {channel}: {reason}")]
    InvalidPayload {
        /// The channel the payload was sent to.
        channel: String,
        /// The decoding failure.
        reason: String,
    },

    /// A background task running the operation panicked or was cancelled
    #[error("Bridge task failed: {reason}")]
    TaskFailed {
        /// The join failure.
        reason: String,
    },

    /// The persistence store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistence store error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The database file could not be opened or created
    #[error("Failed to open database at {path}: {reason}")]
    Open {
        /// The database path.
        path: String,
        /// The underlying failure.
        reason: String,
    },

    /// A statement failed
    #[error("Database error: {reason}")]
    Database {
        /// The SQLite error message.
        reason: String,
    },

    /// A stored row could not be decoded into a project
    #[error("Corrupt project row {id}: {reason}")]
    CorruptRow {
        /// The row id.
        id: i64,
        /// Which column failed to decode.
        reason: String,
    },
}

/// HTTP fetch error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The request could not be sent or the connection failed
    #[error("Request to {url} failed: {reason}")]
    Network {
        /// The requested URL.
        url: String,
        /// The transport failure.
        reason: String,
    },

    /// The server answered with a non-2xx status
    #[error("HTTP {status} from {url}")]
    Status {
        /// The response status code.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The response body was not the expected JSON
    #[error("Invalid response body from {url}: {reason}")]
    Decode {
        /// The requested URL.
        url: String,
        /// The decoding failure.
        reason: String,
    },
}

/// Main error type for TopoKit
///
/// A unified error type that can represent a failure from any component.
#[derive(Error, Debug)]
pub enum Error {
    /// Viewer error
    #[error(transparent)]
    Viewer(#[from] ViewerError),

    /// Bridge error
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is an invalid-arguments failure
    pub fn is_invalid_arguments(&self) -> bool {
        matches!(self, Error::Bridge(BridgeError::InvalidArguments))
    }

    /// Check if this is an external process failure (spawn, exit status or timeout)
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            Error::Bridge(
                BridgeError::SpawnFailed { .. }
                    | BridgeError::ProcessFailed { .. }
                    | BridgeError::Timeout { .. }
            )
        )
    }

    /// Check if this is a viewer error
    pub fn is_viewer_error(&self) -> bool {
        matches!(self, Error::Viewer(_))
    }

    /// Check if this is a fetch error
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Error::Fetch(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
