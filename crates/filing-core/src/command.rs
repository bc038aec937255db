use filing_types::ResolutionStrategy;
use serde::{Deserialize, Serialize};

use crate::stepper::StepSettings;

/// One user action against the pipeline. Resolution commands must come
/// before the first compilation command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineCommand {
    Resolve {
        defect_id: String,
        strategy: ResolutionStrategy,
        #[serde(default)]
        instruction: Option<String>,
    },
    Reorder {
        from: usize,
        to: usize,
    },
    /// Apply the current step; `None` reuses the stored settings
    Apply {
        #[serde(default)]
        settings: Option<StepSettings>,
    },
    Skip,
    Next,
    Back,
    RunOcr,
}

impl PipelineCommand {
    pub fn is_resolution(&self) -> bool {
        matches!(self, PipelineCommand::Resolve { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub commands: Vec<PipelineCommand>,
}

impl PipelinePlan {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
