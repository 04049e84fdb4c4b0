use crate::{
    core::{StepResult, WorkflowConfig},
    errors::{GitBoardError, Result},
    github::{GitHubCli, Issue},
    report::{publish_summary, RunKind},
    store::{ConfigStore, EmbeddedConfigStore},
};

pub mod clean;
pub mod config;
pub mod link;

/// Workflow state embedded in an issue description.
///
/// Unpaired markers and an unreadable payload are both errors, raised before
/// any branch work so the stored state is never overwritten with defaults.
pub fn load_config(issue: &Issue) -> Result<WorkflowConfig> {
    let body = issue.body.as_deref().unwrap_or_default();
    let store = EmbeddedConfigStore::new();

    store.check(body).map_err(|e| {
        log::error!("❌ Configuration of #{} has broken markers: {}", issue.number, e);
        e
    })?;

    match store.read::<WorkflowConfig>(body) {
        Ok(config) => Ok(config.unwrap_or_default()),
        Err(GitBoardError::Json(e)) => {
            log::error!("❌ Configuration of #{} is unreadable: {}", issue.number, e);
            Err(GitBoardError::Corruption(format!(
                "configuration of #{} is not valid JSON: {}",
                issue.number, e
            )))
        }
        Err(e) => Err(e),
    }
}

/// Publishes the summary (unless disabled), then writes `results` into the
/// configuration and stores it back in the issue description.
///
/// The configuration is written even when the comment could not be posted.
pub fn finish_run<G: GitHubCli>(
    github: &G,
    issue: &Issue,
    mut config: WorkflowConfig,
    mut results: Vec<StepResult>,
    kind: RunKind,
    comment: bool,
) -> Result<WorkflowConfig> {
    if comment {
        publish_summary(github, issue.number, kind, &mut results);
    }

    for result in results.iter().filter(|r| !r.success) {
        log::warn!("⚠️  Step {} failed: {}", result.id, result.errors.join("; "));
    }

    config.results = results;
    let body = issue.body.as_deref().unwrap_or_default();
    let updated = EmbeddedConfigStore::new().write(body, &config)?;
    github.update_issue_body(issue.number, &updated)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::cli::MockGitHubCli;

    fn issue(body: Option<&str>) -> Issue {
        Issue {
            number: 3,
            title: "Crash".to_string(),
            body: body.map(|b| b.to_string()),
        }
    }

    #[test]
    fn test_load_config_defaults_without_block() {
        assert_eq!(load_config(&issue(None)).unwrap(), WorkflowConfig::default());
        assert_eq!(
            load_config(&issue(Some("plain text"))).unwrap(),
            WorkflowConfig::default()
        );
    }

    #[test]
    fn test_load_config_rejects_malformed_payload() {
        let body = "text\n\n<!-- GIT-BOARD-CONFIG-START\n{not json\nGIT-BOARD-CONFIG-END -->";
        assert!(matches!(
            load_config(&issue(Some(body))),
            Err(GitBoardError::Corruption(_))
        ));
    }

    #[test]
    fn test_load_config_rejects_lone_end_marker() {
        let body = "text\n\nGIT-BOARD-CONFIG-END -->";
        assert!(matches!(
            load_config(&issue(Some(body))),
            Err(GitBoardError::Corruption(_))
        ));
    }

    #[test]
    fn test_load_config_rejects_broken_markers() {
        let body = "text\n\n<!-- GIT-BOARD-CONFIG-START\n{}";
        assert!(matches!(
            load_config(&issue(Some(body))),
            Err(GitBoardError::Corruption(_))
        ));
    }

    #[test]
    fn test_finish_run_writes_config_after_failed_comment() {
        let github = MockGitHubCli::new().with_failing_comments();
        let results = vec![StepResult::done("link-branch", "Created.".to_string())];

        let config = finish_run(
            &github,
            &issue(Some("Steps to reproduce")),
            WorkflowConfig::default(),
            results,
            RunKind::Bugfix,
            true,
        )
        .unwrap();

        assert_eq!(config.results.len(), 2);
        assert!(!config.results[1].success);

        let bodies = github.get_updated_bodies();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].1.starts_with("Steps to reproduce\n\n<!-- GIT-BOARD-CONFIG-START\n"));

        let stored: WorkflowConfig = EmbeddedConfigStore::new()
            .read(&bodies[0].1)
            .unwrap()
            .unwrap();
        assert_eq!(stored, config);
    }

    #[test]
    fn test_finish_run_without_comment() {
        let github = MockGitHubCli::new();
        let results = vec![StepResult::done("link-branch", "Created.".to_string())];

        finish_run(
            &github,
            &issue(None),
            WorkflowConfig::default(),
            results,
            RunKind::Feature,
            false,
        )
        .unwrap();

        assert!(github.get_comments().is_empty());
        assert_eq!(github.get_updated_bodies().len(), 1);
    }
}
