//! Application shell
//!
//! Navigation bar above one routed page, the page wrapped in an
//! [`ErrorBoundary`]. Navigating fetches what the page needs: the project
//! list, the metrics record, or the model for the viewer.

use std::sync::Arc;

use topokit_bridge::{Bridge, MetricsClient};
use topokit_core::{BridgeError, OptimizationOutput};
use topokit_settings::OptimizerSettings;
use topokit_viewer::{LoadState, ModelViewer, ViewerStatus};
use tracing::{info, warn};

use crate::error_boundary::ErrorBoundary;
use crate::metrics_panel::MetricsPanel;
use crate::navigation::{Navigation, Route};
use crate::optimize::OptimizeAction;
use crate::project_list::ProjectList;
use crate::spinner::LoadingSpinner;

pub struct App {
    bridge: Arc<Bridge>,
    metrics_client: MetricsClient,
    navigation: Navigation,
    boundary: ErrorBoundary,
    route: Route,
    projects: ProjectList,
    metrics: MetricsPanel,
    optimize: OptimizeAction,
    viewer: Option<ModelViewer>,
    model_src: Option<String>,
}

impl App {
    pub fn new(
        bridge: Arc<Bridge>,
        metrics_client: MetricsClient,
        optimizer: &OptimizerSettings,
    ) -> Self {
        Self {
            bridge,
            metrics_client,
            navigation: Navigation::new(),
            boundary: ErrorBoundary::new(),
            route: Route::Projects,
            projects: ProjectList::new(),
            metrics: MetricsPanel::new(),
            optimize: OptimizeAction::new(optimizer.default_output.clone()),
            viewer: None,
            model_src: None,
        }
    }

    /// Attach the 3D viewer used by the optimize page
    pub fn with_viewer(mut self, viewer: ModelViewer, model_src: Option<String>) -> Self {
        self.viewer = Some(viewer);
        self.model_src = model_src;
        self
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    pub fn navigation_mut(&mut self) -> &mut Navigation {
        &mut self.navigation
    }

    pub fn projects(&self) -> &ProjectList {
        &self.projects
    }

    pub fn metrics(&self) -> &MetricsPanel {
        &self.metrics
    }

    pub fn optimize_action(&self) -> &OptimizeAction {
        &self.optimize
    }

    pub fn viewer(&self) -> Option<&ModelViewer> {
        self.viewer.as_ref()
    }

    /// Go to `path` and fetch what the page shows
    ///
    /// Unknown paths land on the project list.
    pub async fn navigate(&mut self, path: &str) -> &Route {
        let route = Route::resolve(path);
        info!("Navigating to {}", route);
        self.navigation.location_changed(&route.path());

        if !matches!(route, Route::Optimize { .. }) {
            if let Some(viewer) = self.viewer.as_mut() {
                viewer.unmount();
            }
        }

        match &route {
            Route::Projects => self.projects.load(&self.bridge).await,
            Route::Results { project_id } => {
                // Entering the page mounts a fresh panel
                if !matches!(self.route, Route::Results { .. }) {
                    self.metrics = MetricsPanel::new();
                }
                self.metrics.show(&self.metrics_client, project_id).await;
            }
            Route::Optimize { .. } => {
                if let Some(viewer) = self.viewer.as_mut() {
                    if let Err(e) = viewer.show(self.model_src.as_deref()).await {
                        warn!("Viewer: {}", e);
                    }
                }
            }
        }

        self.route = route;
        &self.route
    }

    /// Run the optimizer on `input_path`, or on the viewer's model
    pub async fn optimize(
        &self,
        input_path: Option<&str>,
    ) -> Option<Result<OptimizationOutput, BridgeError>> {
        let input = input_path.or(self.model_src.as_deref()).unwrap_or_default();
        self.optimize.run(&self.bridge, input).await
    }

    /// Render the navigation bar and the current page
    pub fn render(&mut self) -> String {
        let page = PageView {
            route: &self.route,
            projects: &self.projects,
            metrics: &self.metrics,
            optimize: &self.optimize,
            viewer: self.viewer.as_ref().map(|v| (v.status(), v.model_src(), triangles(v))),
        };
        let body = self.boundary.render(|| page.render());
        format!("{}\n\n{}", self.navigation.render(), body)
    }

    /// Retry action of the error fallback
    pub fn retry(&mut self) {
        self.boundary.retry();
    }
}

fn triangles(viewer: &ModelViewer) -> usize {
    viewer.session().map(|s| s.triangle_count()).unwrap_or(0)
}

struct PageView<'a> {
    route: &'a Route,
    projects: &'a ProjectList,
    metrics: &'a MetricsPanel,
    optimize: &'a OptimizeAction,
    viewer: Option<(ViewerStatus, Option<&'a str>, usize)>,
}

impl PageView<'_> {
    fn render(&self) -> String {
        match self.route {
            Route::Projects => format!("Projects\n{}", self.projects.render()),
            Route::Results { project_id } => {
                format!("Results for project {}\n{}", project_id, self.metrics.render())
            }
            Route::Optimize { project_id } => {
                let mut lines = vec![format!("Optimize project {}", project_id)];
                lines.push(self.viewer_line());
                lines.push(self.optimize.render());
                lines.join("\n")
            }
        }
    }

    fn viewer_line(&self) -> String {
        let Some((status, model_src, triangles)) = &self.viewer else {
            return "Viewer unavailable".to_string();
        };
        match (status.load_state, model_src) {
            (LoadState::Loading, _) => LoadingSpinner::with_text("Loading model...").render(),
            (LoadState::Errored, _) => status.error.clone().unwrap_or_default(),
            (LoadState::Loaded, Some(src)) => format!("Model: {} ({} triangles)", src, triangles),
            _ => "No model selected.".to_string(),
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("route", &self.route)
            .field("menu_open", &self.navigation.is_menu_open())
            .finish()
    }
}
