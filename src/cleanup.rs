use crate::{
    core::StepResult,
    github::GitHubCli,
    naming::{issue_prefix, BranchType},
};

pub const CLEANUP_STEP: &str = "remove-issue-branches";

/// Removes every branch that belongs to an issue, whatever its type.
pub struct BranchCleaner<'a, G: GitHubCli> {
    github: &'a G,
}

impl<'a, G: GitHubCli> BranchCleaner<'a, G> {
    pub fn new(github: &'a G) -> Self {
        Self { github }
    }

    /// Names of the branches that would be removed.
    pub fn issue_branches(branches: &[String], issue_number: u64) -> Vec<String> {
        let prefixes: Vec<String> = BranchType::ALL
            .iter()
            .map(|branch_type| issue_prefix(*branch_type, issue_number))
            .collect();

        branches
            .iter()
            .filter(|branch| prefixes.iter().any(|prefix| branch.contains(prefix.as_str())))
            .cloned()
            .collect()
    }

    /// One result per branch; a failed removal does not stop the others.
    pub fn remove_issue_branches(&self, issue_number: u64) -> Vec<StepResult> {
        let branches = match self.github.list_branches() {
            Ok(branches) => branches,
            Err(e) => {
                log::error!("❌ Cannot list branches: {}", e);
                return vec![StepResult::failed(
                    CLEANUP_STEP,
                    "Tried to list the repository branches, but there was a problem.".to_string(),
                    e,
                )];
            }
        };

        let targets = Self::issue_branches(&branches, issue_number);
        if targets.is_empty() {
            log::info!("ℹ️  No branches found for issue #{}", issue_number);
        }

        targets
            .iter()
            .filter_map(|branch| self.remove(branch))
            .collect()
    }

    fn remove(&self, branch: &str) -> Option<StepResult> {
        let removed = self.github.get_ref(branch).and_then(|reference| match reference {
            Some(_) => self.github.delete_ref(branch).map(|_| true),
            None => Ok(false),
        });

        match removed {
            Ok(true) => Some(StepResult::done(
                CLEANUP_STEP,
                format!("The branch **{}** was removed.", branch),
            )),
            Ok(false) => {
                log::debug!("Branch {} disappeared before removal", branch);
                None
            }
            Err(e) => {
                log::error!("❌ Cannot remove {}: {}", branch, e);
                Some(StepResult::failed(
                    CLEANUP_STEP,
                    format!("Tried to remove the branch **{}**, but there was a problem.", branch),
                    e,
                ))
            }
        }
    }
}
