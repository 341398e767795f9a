//! Project records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored project
///
/// Owned by the persistence store; every other layer holds read copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Store-assigned identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Opaque per-project settings blob
    pub settings: serde_json::Value,
    /// Creation time, store-assigned
    pub created_at: DateTime<Utc>,
    /// Last update time, store-assigned
    pub updated_at: DateTime<Utc>,
}

/// Values for inserting a project row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub settings: serde_json::Value,
    /// Explicit creation time; the store clock is used when absent
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}
