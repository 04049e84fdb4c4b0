use crate::naming::BranchType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decision taken for one branch: where it comes from and what it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPlan {
    pub base_branch_name: String,
    pub new_branch_name: String,
    /// An existing branch of this issue is the base, shown as a rename.
    pub rename: bool,
    /// Commit to create the branch at instead of the base branch tip.
    pub commit_oid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedBranchResult {
    pub base_branch_name: String,
    pub base_branch_url: String,
    pub new_branch_name: String,
    pub new_branch_url: String,
    pub success: bool,
}

/// One entry of the result log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub id: String,
    pub success: bool,
    pub executed: bool,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub reminders: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_branch: Option<LinkedBranchResult>,
}

impl StepResult {
    pub fn done(id: &str, step: String) -> Self {
        Self {
            id: id.to_string(),
            success: true,
            executed: true,
            steps: vec![step],
            ..Default::default()
        }
    }

    /// Nothing had to be done; reported for the record.
    pub fn skipped(id: &str, step: String) -> Self {
        Self {
            executed: false,
            ..Self::done(id, step)
        }
    }

    pub fn failed(id: &str, step: String, error: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            success: false,
            executed: true,
            steps: vec![step],
            errors: vec![error.to_string()],
            ..Default::default()
        }
    }

    pub fn with_reminders(mut self, reminders: Vec<String>) -> Self {
        self.reminders = reminders;
        self
    }

    pub fn with_linked_branch(mut self, linked_branch: LinkedBranchResult) -> Self {
        self.linked_branch = Some(linked_branch);
        self
    }
}

/// Workflow state kept inside an issue or pull request description
///
/// Fields this version does not know about are carried over untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    #[serde(default)]
    pub results: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotfix_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_type: Option<BranchType>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
