//! Project List
//!
//! Fetches projects through the bridge on mount and renders one line per
//! project, newest first.

use topokit_bridge::{Bridge, Channel};
use topokit_core::{BridgeError, Project};
use tracing::{debug, warn};

/// Project list view model
#[derive(Debug, Clone)]
pub struct ProjectList {
    /// A fetch is in flight
    pub loading: bool,
    /// Message from the last failed fetch
    pub error: Option<String>,
    /// Projects from the last successful fetch
    pub projects: Vec<Project>,
}

impl Default for ProjectList {
    fn default() -> Self {
        Self {
            loading: true,
            error: None,
            projects: Vec::new(),
        }
    }
}

impl ProjectList {
    /// Create in the loading state
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch projects over the `get-projects` channel
    pub async fn load(&mut self, bridge: &Bridge) {
        self.loading = true;
        match fetch_projects(bridge).await {
            Ok(projects) => {
                debug!("Project list received {} projects", projects.len());
                self.projects = projects;
                self.error = None;
            }
            Err(e) => {
                warn!("Project list fetch failed: {}", e);
                self.error = Some(format!("Failed to load projects: {}", e));
            }
        }
        self.loading = false;
    }

    /// Render the list
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if self.loading {
            lines.push("Loading projects...".to_string());
        }
        if let Some(error) = &self.error {
            lines.push(error.clone());
        }
        if self.projects.is_empty() {
            lines.push("No projects found.".to_string());
        } else {
            lines.extend(self.projects.iter().map(|p| format!("• {}", project_line(p))));
        }
        lines.join("\n")
    }
}

/// `{name} - Created: MMM dd, yyyy`
pub fn project_line(project: &Project) -> String {
    format!(
        "{} - Created: {}",
        project.name,
        project.created_at.format("%b %d, %Y")
    )
}

async fn fetch_projects(bridge: &Bridge) -> Result<Vec<Project>, BridgeError> {
    let value = bridge
        .invoke(Channel::GetProjects.name(), serde_json::Value::Null)
        .await?;
    serde_json::from_value(value).map_err(|e| BridgeError::InvalidPayload {
        channel: Channel::GetProjects.to_string(),
        reason: e.to_string(),
    })
}
