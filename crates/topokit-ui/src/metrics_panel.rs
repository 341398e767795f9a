//! Metrics Panel
//!
//! Fetches the metrics record for a project whenever the project changes and
//! renders it as a horizontal bar chart. Fetches are not cancelled: if two
//! are in flight, whichever resolves last wins.

use topokit_bridge::MetricsClient;
use topokit_core::MetricsRecord;
use tracing::warn;

/// Dataset label of the chart
pub const DATASET_LABEL: &str = "Optimization Results";

/// Message shown for any failed fetch
pub const FETCH_ERROR: &str = "Failed to load metrics. Please try again later.";

const BAR_WIDTH: usize = 30;

/// Metrics panel view model
#[derive(Debug, Clone)]
pub struct MetricsPanel {
    /// Project whose metrics are shown
    pub project_id: Option<String>,
    /// A fetch is in flight
    pub loading: bool,
    /// Message from the last failed fetch
    pub error: Option<String>,
    /// Last fetched record; zeros until one arrives
    pub metrics: MetricsRecord,
}

impl Default for MetricsPanel {
    fn default() -> Self {
        Self {
            project_id: None,
            loading: true,
            error: None,
            metrics: MetricsRecord::default(),
        }
    }
}

impl MetricsPanel {
    /// Create in the loading state
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `project_id`, fetching when it differs from the current one
    ///
    /// Returns true if a fetch ran.
    pub async fn show(&mut self, client: &MetricsClient, project_id: &str) -> bool {
        if self.project_id.as_deref() == Some(project_id) && !self.loading {
            return false;
        }
        self.project_id = Some(project_id.to_string());
        self.refresh(client).await;
        true
    }

    /// Fetch metrics for the current project
    pub async fn refresh(&mut self, client: &MetricsClient) {
        let Some(project_id) = self.project_id.clone() else {
            return;
        };
        self.loading = true;
        match client.fetch(&project_id).await {
            Ok(metrics) => {
                self.metrics = metrics;
                self.error = None;
            }
            Err(e) => {
                warn!("Metrics fetch for project {} failed: {}", project_id, e);
                self.error = Some(FETCH_ERROR.to_string());
            }
        }
        self.loading = false;
    }

    /// Render the panel
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if let Some(error) = &self.error {
            lines.push(error.clone());
        }
        if self.loading {
            lines.push("Loading metrics...".to_string());
        } else {
            lines.push(render_chart(&self.metrics));
        }
        lines.join("\n")
    }
}

/// Text bar chart of a record, bars scaled to the largest value
pub fn render_chart(metrics: &MetricsRecord) -> String {
    let values = metrics.values();
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let label_width = MetricsRecord::LABELS
        .iter()
        .map(|l| l.len())
        .max()
        .unwrap_or(0);

    let mut lines = vec![DATASET_LABEL.to_string()];
    for (label, value) in MetricsRecord::LABELS.iter().zip(values) {
        let filled = if max > 0.0 && value > 0.0 {
            ((value / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        lines.push(format!(
            "{:<width$} |{}{}| {}",
            label,
            "█".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            value,
            width = label_width
        ));
    }
    lines.join("\n")
}
