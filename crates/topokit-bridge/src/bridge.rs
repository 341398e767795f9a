//! Named-channel request bridge.
//!
//! Views never touch the store or spawn processes themselves; they invoke a
//! channel with a JSON payload and await a JSON reply. Only `get-projects`
//! and `run-optimization` have behaviour. The single-project channels are
//! routable but answer [`BridgeError::NotImplemented`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use topokit_core::{
    event_bus, AppEvent, BridgeError, EventBus, OptimizationOutput, OptimizationRequest, Project,
    ProjectEvent,
};
use topokit_store::ProjectStore;
use tracing::{debug, info};

use crate::optimizer::OptimizerCommand;

/// Bridge channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    GetProjects,
    GetProject,
    CreateProject,
    DeleteProject,
    RunOptimization,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::GetProjects,
        Channel::GetProject,
        Channel::CreateProject,
        Channel::DeleteProject,
        Channel::RunOptimization,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::GetProjects => "get-projects",
            Channel::GetProject => "get-project",
            Channel::CreateProject => "create-project",
            Channel::DeleteProject => "delete-project",
            Channel::RunOptimization => "run-optimization",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| BridgeError::UnknownChannel {
                channel: s.to_string(),
            })
    }
}

/// Process bridge
pub struct Bridge {
    store: Arc<ProjectStore>,
    optimizer: OptimizerCommand,
    bus: Arc<EventBus>,
}

impl Bridge {
    /// Create a bridge publishing on the global event bus
    pub fn new(store: Arc<ProjectStore>, optimizer: OptimizerCommand) -> Self {
        Self::with_event_bus(store, optimizer, event_bus())
    }

    pub fn with_event_bus(
        store: Arc<ProjectStore>,
        optimizer: OptimizerCommand,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            optimizer,
            bus,
        }
    }

    pub fn optimizer(&self) -> &OptimizerCommand {
        &self.optimizer
    }

    /// Route a request by channel name
    pub async fn invoke(&self, channel: &str, payload: Value) -> Result<Value, BridgeError> {
        let channel: Channel = channel.parse()?;
        debug!("Bridge request on {}", channel);

        match channel {
            Channel::GetProjects => {
                let projects = self.list_projects().await?;
                to_value(channel, &projects)
            }
            Channel::RunOptimization => {
                let request: OptimizationRequest = if payload.is_null() {
                    OptimizationRequest::default()
                } else {
                    serde_json::from_value(payload).map_err(|e| BridgeError::InvalidPayload {
                        channel: channel.to_string(),
                        reason: e.to_string(),
                    })?
                };
                let output = self.run_optimization(&request).await?;
                to_value(channel, &output)
            }
            Channel::GetProject | Channel::CreateProject | Channel::DeleteProject => {
                Err(BridgeError::NotImplemented {
                    operation: channel.to_string(),
                })
            }
        }
    }

    /// All projects, newest first
    pub async fn list_projects(&self) -> Result<Vec<Project>, BridgeError> {
        let store = Arc::clone(&self.store);
        let projects = tokio::task::spawn_blocking(move || store.list())
            .await
            .map_err(|e| BridgeError::TaskFailed {
                reason: e.to_string(),
            })??;

        info!("Loaded {} projects", projects.len());
        self.bus
            .publish(AppEvent::Project(ProjectEvent::ListLoaded {
                count: projects.len(),
            }))
            .ok();
        Ok(projects)
    }

    /// Run the external optimizer on `request.input_path`
    pub async fn run_optimization(
        &self,
        request: &OptimizationRequest,
    ) -> Result<OptimizationOutput, BridgeError> {
        self.optimizer.run(request, &self.bus).await
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("store", &self.store.path())
            .field("optimizer", &self.optimizer.program)
            .finish()
    }
}

fn to_value<T: serde::Serialize>(channel: Channel, value: &T) -> Result<Value, BridgeError> {
    serde_json::to_value(value).map_err(|e| BridgeError::InvalidPayload {
        channel: channel.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(channel.name().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn test_unknown_channel() {
        let err = "update-project".parse::<Channel>().unwrap_err();
        assert_eq!(
            err,
            BridgeError::UnknownChannel {
                channel: "update-project".to_string()
            }
        );
    }
}
