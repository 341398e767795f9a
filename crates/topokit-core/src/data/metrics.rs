//! Optimization metrics as served by the metrics endpoint.

use serde::{Deserialize, Serialize};

/// Metrics record for one project
///
/// Field names follow the endpoint's camelCase JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    pub material_savings: f64,
    pub time_reduction: f64,
    pub quality_improvement: f64,
}

impl MetricsRecord {
    /// Chart labels in display order
    pub const LABELS: [&'static str; 3] = [
        "Material Savings",
        "Print Time Reduction",
        "Quality Improvement",
    ];

    /// Values in the same order as [`MetricsRecord::LABELS`]
    pub fn values(&self) -> [f64; 3] {
        [
            self.material_savings,
            self.time_reduction,
            self.quality_improvement,
        ]
    }
}
