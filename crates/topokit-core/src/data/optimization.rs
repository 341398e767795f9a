//! Request and response payloads of the `run-optimization` operation.

use serde::{Deserialize, Serialize};

/// Arguments of an optimization run
///
/// Missing fields decode as empty strings so that validation, not
/// deserialization, reports them as invalid arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationRequest {
    #[serde(default)]
    pub input_path: String,
    #[serde(default)]
    pub output_path: String,
}

impl OptimizationRequest {
    pub fn new(input_path: impl Into<String>, output_path: impl Into<String>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }

    /// Both paths are present and non-blank
    pub fn is_valid(&self) -> bool {
        !self.input_path.trim().is_empty() && !self.output_path.trim().is_empty()
    }
}

/// Successful optimization result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationOutput {
    /// Everything the process wrote to standard output
    pub stdout: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_output_path_decodes_as_invalid() {
        let req: OptimizationRequest =
            serde_json::from_str(r#"{"inputPath": "in.stl"}"#).unwrap();
        assert_eq!(req.output_path, "");
        assert!(!req.is_valid());
    }

    #[test]
    fn test_blank_input_path_is_invalid() {
        assert!(!OptimizationRequest::new("", "out.stl").is_valid());
        assert!(!OptimizationRequest::new("   ", "out.stl").is_valid());
        assert!(OptimizationRequest::new("in.stl", "out.stl").is_valid());
    }
}
