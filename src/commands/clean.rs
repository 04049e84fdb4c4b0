use crate::{
    cleanup::BranchCleaner,
    commands::{finish_run, load_config},
    core::WorkflowConfig,
    errors::Result,
    github::GitHubCli,
    report::RunKind,
};
use clap::Args;

#[derive(Debug, Args)]
pub struct Clean {
    /// Issue whose branches are removed
    #[arg(long)]
    pub issue: u64,

    /// Skip the summary comment on the issue
    #[arg(long)]
    pub no_comment: bool,
}

impl Clean {
    pub fn execute<G: GitHubCli>(&self, github: &G) -> Result<WorkflowConfig> {
        let issue = github.get_issue(self.issue)?;
        let config = load_config(&issue)?;

        log::info!("🗑️  Removing branches of issue #{}", issue.number);
        let results = BranchCleaner::new(github).remove_issue_branches(issue.number);

        finish_run(
            github,
            &issue,
            config,
            results,
            RunKind::Cleanup,
            !self.no_comment,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::cli::MockGitHubCli;

    #[test]
    fn test_clean_removes_branches_and_reports() {
        let github = MockGitHubCli::new()
            .with_branch("develop", "d1")
            .with_branch("feature/8-export", "f8")
            .with_branch("bugfix/8-export", "b8")
            .with_issue(8, "Export", Some("Export to CSV"));

        let config = Clean {
            issue: 8,
            no_comment: false,
        }
        .execute(&github)
        .unwrap();

        assert_eq!(github.get_deleted_refs(), vec!["feature/8-export", "bugfix/8-export"]);
        assert_eq!(config.results.len(), 2);

        let comments = github.get_comments();
        assert!(comments[0].1.starts_with("# 🗑️ Cleanup Actions:\n1. The branch **feature/8-export** was removed.\n"));
        assert_eq!(github.get_updated_bodies().len(), 1);
    }

    #[test]
    fn test_clean_without_branches_posts_nothing() {
        let github = MockGitHubCli::new()
            .with_branch("develop", "d1")
            .with_issue(8, "Export", None);

        let config = Clean {
            issue: 8,
            no_comment: false,
        }
        .execute(&github)
        .unwrap();

        assert!(config.results.is_empty());
        assert!(github.get_comments().is_empty());
    }
}
