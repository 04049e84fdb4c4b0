use crate::{core::StepResult, github::GitHubCli, naming::BranchType};

pub const PUBLISH_STEP: &str = "publish-summary";

/// Decides the title of the summary comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Cleanup,
    Hotfix,
    Bugfix,
    Feature,
}

impl RunKind {
    pub fn from_branch_type(branch_type: BranchType) -> Self {
        match branch_type {
            BranchType::Hotfix => RunKind::Hotfix,
            BranchType::Bugfix => RunKind::Bugfix,
            BranchType::Feature | BranchType::Release => RunKind::Feature,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RunKind::Cleanup => "🗑️ Cleanup Actions",
            RunKind::Hotfix => "🔥🐛 Hotfix Actions",
            RunKind::Bugfix => "🐛 Bugfix Actions",
            RunKind::Feature => "🛠️ Feature Actions",
        }
    }
}

fn numbered<'a>(lines: impl Iterator<Item = &'a String>) -> String {
    lines
        .enumerate()
        .map(|(index, line)| format!("{}. {}\n", index + 1, line))
        .collect()
}

/// Markdown body of the summary, `None` when no step was recorded.
pub fn render_summary(kind: RunKind, results: &[StepResult]) -> Option<String> {
    let steps = numbered(results.iter().flat_map(|r| &r.steps).filter(|s| !s.is_empty()));
    if steps.is_empty() {
        return None;
    }

    let mut body = format!("# {}:\n{}\n", kind.title(), steps);

    let reminders = numbered(results.iter().flat_map(|r| &r.reminders));
    if !reminders.is_empty() {
        body.push_str(&format!("\n## Reminder\n\n{}\n", reminders));
    }

    body.push_str("\nThank you for contributing! 🙌\n");
    Some(body)
}

/// Posts the summary on the issue. A failure is recorded in `results`
/// instead of being returned.
pub fn publish_summary<G: GitHubCli>(
    github: &G,
    number: u64,
    kind: RunKind,
    results: &mut Vec<StepResult>,
) {
    let Some(body) = render_summary(kind, results) else {
        log::info!("ℹ️  Nothing to report on #{}", number);
        return;
    };

    if let Err(e) = github.add_comment(number, &body) {
        log::error!("❌ Cannot publish summary on #{}: {}", number, e);
        results.push(StepResult::failed(
            PUBLISH_STEP,
            "Tried to publish the summary, but there was a problem.".to_string(),
            e,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::cli::MockGitHubCli;

    fn result(steps: &[&str], reminders: &[&str]) -> StepResult {
        StepResult {
            id: "link-branch".to_string(),
            success: true,
            executed: true,
            steps: steps.iter().map(|s| s.to_string()).collect(),
            reminders: reminders.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_render_numbers_steps_across_results() {
        let results = vec![
            result(&["Created A."], &["Commit to A."]),
            result(&["Created B."], &["Open a PR."]),
        ];

        let body = render_summary(RunKind::Bugfix, &results).unwrap();
        assert_eq!(
            body,
            "# 🐛 Bugfix Actions:\n1. Created A.\n2. Created B.\n\n\
             \n## Reminder\n\n1. Commit to A.\n2. Open a PR.\n\n\
             \nThank you for contributing! 🙌\n"
        );
    }

    #[test]
    fn test_render_without_reminders_has_no_reminder_section() {
        let body = render_summary(RunKind::Cleanup, &[result(&["Removed A."], &[])]).unwrap();
        assert!(body.starts_with("# 🗑️ Cleanup Actions:\n1. Removed A.\n"));
        assert!(!body.contains("## Reminder"));
    }

    #[test]
    fn test_render_without_steps_is_none() {
        let results = vec![result(&[], &["orphan reminder"])];
        assert_eq!(render_summary(RunKind::Feature, &results), None);
    }

    #[test]
    fn test_titles() {
        assert_eq!(RunKind::from_branch_type(BranchType::Hotfix).title(), "🔥🐛 Hotfix Actions");
        assert_eq!(RunKind::from_branch_type(BranchType::Release).title(), "🛠️ Feature Actions");
        assert_eq!(RunKind::from_branch_type(BranchType::Feature), RunKind::Feature);
    }

    #[test]
    fn test_publish_posts_comment() {
        let github = MockGitHubCli::new();
        let mut results = vec![result(&["Created A."], &[])];

        publish_summary(&github, 4, RunKind::Feature, &mut results);

        let comments = github.get_comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].0, 4);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_publish_skips_empty_summary() {
        let github = MockGitHubCli::new();
        let mut results = Vec::new();

        publish_summary(&github, 4, RunKind::Feature, &mut results);
        assert!(github.get_comments().is_empty());
    }

    #[test]
    fn test_publish_failure_becomes_failed_result() {
        let github = MockGitHubCli::new().with_failing_comments();
        let mut results = vec![result(&["Created A."], &[])];

        publish_summary(&github, 4, RunKind::Feature, &mut results);

        let last = results.last().unwrap();
        assert_eq!(last.id, PUBLISH_STEP);
        assert!(!last.success);
        assert_eq!(last.errors, vec!["GitHub CLI operation failed: HTTP 403: Forbidden"]);
    }
}
