//! # TopoKit
//!
//! Desktop shell for topology-optimization projects:
//! - Project records kept in a local SQLite database
//! - An external optimizer process driven over a request/response bridge
//! - An interactive 3D viewport for `.gltf`, `.glb` and `.obj` models
//! - Per-project optimization metrics fetched from an HTTP endpoint
//!
//! ## Architecture
//!
//! TopoKit is organized as a workspace with multiple crates:
//!
//! 1. **topokit-core** - Shared data types, errors, event bus
//! 2. **topokit-settings** - Configuration files and platform directories
//! 3. **topokit-store** - SQLite project persistence
//! 4. **topokit-bridge** - Named channels, optimizer process, metrics client
//! 5. **topokit-viewer** - Viewport sessions, loaders, camera, render loop
//! 6. **topokit-ui** - Navigation, pages and view models
//! 7. **topokit** - Main binary that integrates all crates

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

pub use topokit_bridge::{Bridge, Channel, MetricsClient, OptimizerCommand};
pub use topokit_core::{
    AppEvent, BridgeError, Error, EventBus, FetchError, MetricsRecord, NewProject,
    OptimizationOutput, OptimizationRequest, Project, Result, StoreError, ViewerError,
};
pub use topokit_settings::{Config, SettingsManager};
pub use topokit_store::ProjectStore;
pub use topokit_ui::{App, ErrorBoundary};
pub use topokit_viewer::{HostSurface, ModelViewer, SoftwareRendererFactory};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr
/// - RUST_LOG environment variable support
/// - JSON lines instead of pretty text when `json` is set
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_thread_names(true)
                    .with_line_number(true),
            )
            .try_init()
    };

    result.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}

/// Log panics through `tracing`, then terminate the process
///
/// Installed after [`init_logging`]. Panics raised while an [`ErrorBoundary`]
/// renders are only logged, since the boundary turns them into its fallback.
/// Any other panic, including one inside a spawned task such as a viewport
/// render loop, exits with status 101.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());

        if ErrorBoundary::is_active() {
            tracing::warn!("Panic at {} inside a render boundary: {}", location, message);
            return;
        }
        tracing::error!("Unhandled panic at {}: {}", location, message);
        std::process::exit(101);
    }));
}

/// Wired application services
///
/// One store, one event bus and one bridge shared by every page.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<ProjectStore>,
    pub bus: Arc<EventBus>,
    pub bridge: Arc<Bridge>,
    pub metrics: MetricsClient,
}

impl Services {
    /// Open the database and build the bridge from `settings`
    pub fn from_settings(settings: &SettingsManager) -> anyhow::Result<Self> {
        let config = settings.config();
        config.validate().context("invalid configuration")?;

        let db_path = settings
            .database_path()
            .context("could not resolve the database path")?;
        let store = ProjectStore::open(&db_path)
            .with_context(|| format!("could not open {}", db_path.display()))?;

        Self::with_store(store, config)
    }

    /// Build services around an already opened store
    pub fn with_store(store: ProjectStore, config: &Config) -> anyhow::Result<Self> {
        let store = Arc::new(store);
        let bus = Arc::new(EventBus::new());
        let bridge = Arc::new(Bridge::with_event_bus(
            Arc::clone(&store),
            OptimizerCommand::from_settings(&config.optimizer),
            Arc::clone(&bus),
        ));
        let metrics = MetricsClient::from_settings(&config.metrics)
            .context("could not build the metrics client")?;

        Ok(Self {
            store,
            bus,
            bridge,
            metrics,
        })
    }

    /// Application shell without a viewport
    pub fn app(&self, config: &Config) -> App {
        App::new(Arc::clone(&self.bridge), self.metrics.clone(), &config.optimizer)
    }

    /// Application shell whose optimize page renders `model_src` offscreen
    pub fn app_with_viewer(&self, config: &Config, model_src: Option<String>) -> App {
        let viewer = ModelViewer::new(
            Arc::new(HostSurface::new(config.viewer.width, config.viewer.height)),
            Arc::new(SoftwareRendererFactory::new(config.viewer.background)),
            config.viewer.clone(),
            Arc::clone(&self.bus),
        );
        self.app(config).with_viewer(viewer, model_src)
    }
}

/// Poll `done` every few milliseconds until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while !done() {
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    true
}
