// Branch naming rules

use crate::errors::{GitBoardError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BranchType {
    Feature,
    Bugfix,
    Hotfix,
    Release,
}

impl BranchType {
    pub const ALL: [BranchType; 4] = [
        BranchType::Feature,
        BranchType::Bugfix,
        BranchType::Hotfix,
        BranchType::Release,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BranchType::Feature => "feature",
            BranchType::Bugfix => "bugfix",
            BranchType::Hotfix => "hotfix",
            BranchType::Release => "release",
        }
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Branch types an issue may move between, in lookup order.
///
/// Order matters: the first type with a matching branch wins.
pub const SWITCHABLE_TYPES: [BranchType; 2] = [BranchType::Feature, BranchType::Bugfix];

/// The branch an issue asks for, computed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSpec {
    pub branch_type: BranchType,
    pub issue_number: u64,
    pub title_slug: String,
}

impl BranchSpec {
    /// Fails when the title has nothing left once sanitized.
    pub fn new(branch_type: BranchType, issue_number: u64, issue_title: &str) -> Result<Self> {
        let title_slug = format_branch_name(issue_title, issue_number);
        if title_slug.is_empty() {
            return Err(GitBoardError::Validation(format!(
                "title of issue #{} does not produce a usable branch name: {:?}",
                issue_number, issue_title
            )));
        }

        Ok(Self {
            branch_type,
            issue_number,
            title_slug,
        })
    }

    pub fn branch_name(&self) -> String {
        format!(
            "{}{}",
            issue_prefix(self.branch_type, self.issue_number),
            self.title_slug
        )
    }
}

/// `<type>/<issue>-`, the part of a branch name that ties it to an issue.
pub fn issue_prefix(branch_type: BranchType, issue_number: u64) -> String {
    format!("{}/{}-", branch_type, issue_number)
}

/// Turn an issue title into a branch-safe slug
///
/// The issue number is already part of the branch path, so a leading
/// `<issue>-` and any `#<issue>` reference are dropped from the slug.
pub fn format_branch_name(issue_title: &str, issue_number: u64) -> String {
    let title = strip_self_reference(issue_title, issue_number).to_lowercase();

    let sanitized: String = title
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .map(|c| if c == ' ' { '-' } else { c })
        .collect();

    let issue_prefix = format!("{}-", issue_number);
    let without_prefix = sanitized
        .strip_prefix(issue_prefix.as_str())
        .unwrap_or(&sanitized);

    let mut slug = String::with_capacity(without_prefix.len());
    for c in without_prefix.chars() {
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_string()
}

fn strip_self_reference(title: &str, issue_number: u64) -> String {
    let reference = format!("#{}", issue_number);
    let mut output = String::with_capacity(title.len());
    let mut rest = title;

    while let Some(index) = rest.find(&reference) {
        let after = &rest[index + reference.len()..];
        output.push_str(&rest[..index]);
        // `#12` is not a reference to issue 1
        if after.starts_with(|c: char| c.is_ascii_digit()) {
            output.push_str(&reference);
        }
        rest = after;
    }
    output.push_str(rest);

    output
}

/// Find a branch already created for this issue under a switchable type.
pub fn find_switch_candidate(branches: &[String], issue_number: u64) -> Option<&str> {
    SWITCHABLE_TYPES.iter().find_map(|branch_type| {
        let prefix = issue_prefix(*branch_type, issue_number);
        branches
            .iter()
            .find(|branch| branch.contains(&prefix))
            .map(|branch| branch.as_str())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(branches: &[&str]) -> Vec<String> {
        branches.iter().map(|b| b.to_string()).collect()
    }

    #[test]
    fn test_format_branch_name_basic_title() {
        assert_eq!(format_branch_name("Add dark mode", 14), "add-dark-mode");
    }

    #[test]
    fn test_format_branch_name_drops_punctuation_and_self_reference() {
        let spec = BranchSpec::new(BranchType::Bugfix, 2, "Fix login bug! #2 dup").unwrap();
        assert_eq!(spec.title_slug, "fix-login-bug-dup");
        assert_eq!(spec.branch_name(), "bugfix/2-fix-login-bug-dup");
    }

    #[test]
    fn test_format_branch_name_keeps_other_issue_references() {
        assert_eq!(format_branch_name("Follow up #21", 2), "follow-up-21");
        assert_eq!(format_branch_name("Follow up #3", 2), "follow-up-3");
    }

    #[test]
    fn test_format_branch_name_strips_issue_number_prefix() {
        assert_eq!(format_branch_name("42 rest of title", 42), "rest-of-title");
        assert_eq!(format_branch_name("42  spaced", 42), "spaced");
        // Only the exact issue number is stripped
        assert_eq!(format_branch_name("420 items", 42), "420-items");
    }

    #[test]
    fn test_format_branch_name_collapses_and_trims_dashes() {
        assert_eq!(
            format_branch_name("  Many   spaces -- here  ", 1),
            "many-spaces-here"
        );
    }

    #[test]
    fn test_format_branch_name_output_is_branch_safe() {
        let titles = [
            "Simple",
            "UPPER lower 123",
            "  leading and trailing  ",
            "9 starts with digit",
            "a b c d e f g",
        ];
        for title in titles {
            let slug = format_branch_name(title, 9);
            assert!(
                slug.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "unexpected characters in {:?}",
                slug
            );
        }
    }

    #[test]
    fn test_branch_spec_rejects_empty_slug() {
        let result = BranchSpec::new(BranchType::Feature, 5, "!!! ???");
        assert!(matches!(result, Err(GitBoardError::Validation(_))));

        let result = BranchSpec::new(BranchType::Feature, 5, "#5");
        assert!(matches!(result, Err(GitBoardError::Validation(_))));
    }

    #[test]
    fn test_find_switch_candidate_prefers_feature() {
        let branches = names(&["develop", "bugfix/7-old-name", "feature/7-new-name"]);
        assert_eq!(find_switch_candidate(&branches, 7), Some("feature/7-new-name"));
    }

    #[test]
    fn test_find_switch_candidate_falls_back_to_bugfix() {
        let branches = names(&["develop", "bugfix/7-crash", "feature/8-other"]);
        assert_eq!(find_switch_candidate(&branches, 7), Some("bugfix/7-crash"));
    }

    #[test]
    fn test_find_switch_candidate_ignores_other_issues_and_types() {
        let branches = names(&["feature/17-x", "hotfix/7-x", "release/7-x", "main"]);
        assert_eq!(find_switch_candidate(&branches, 7), None);
    }
}
