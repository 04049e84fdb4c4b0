use crate::{
    core::StepResult,
    errors::{GitBoardError, Result},
    github::GitHubCli,
};
use regex::Regex;

pub const PROJECT_STEP: &str = "link-project";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOwner {
    Organization,
    User,
}

impl ProjectOwner {
    /// Field that holds the owner in the GraphQL schema.
    pub fn query_field(&self) -> &'static str {
        match self {
            ProjectOwner::Organization => "organization",
            ProjectOwner::User => "user",
        }
    }
}

/// A GitHub project board, as given by its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub owner_type: ProjectOwner,
    pub owner: String,
    pub number: u64,
    pub url: String,
}

impl ProjectRef {
    /// Accepts `…/orgs/<name>/projects/<n>` and `…/users/<name>/projects/<n>`.
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = || GitBoardError::Validation(format!("invalid project URL: {:?}", url));

        let project_re =
            Regex::new(r"/(?P<kind>orgs|users)/(?P<owner>[^/]+)/projects/(?P<number>\d+)")
                .map_err(|_| invalid())?;
        let caps = project_re.captures(url).ok_or_else(invalid)?;

        let owner_type = match &caps["kind"] {
            "orgs" => ProjectOwner::Organization,
            _ => ProjectOwner::User,
        };
        let number = caps["number"].parse::<u64>().map_err(|_| invalid())?;

        Ok(Self {
            owner_type,
            owner: caps["owner"].to_string(),
            number,
            url: url.trim().to_string(),
        })
    }
}

/// Adds an issue to every configured project board.
pub struct ProjectLinker<'a, G: GitHubCli> {
    github: &'a G,
}

impl<'a, G: GitHubCli> ProjectLinker<'a, G> {
    pub fn new(github: &'a G) -> Self {
        Self { github }
    }

    /// One result per project; a failure does not stop the others.
    pub fn link_issue(&self, issue_number: u64, projects: &[ProjectRef]) -> Vec<StepResult> {
        if projects.is_empty() {
            return Vec::new();
        }

        let content_id = match self.github.linking_target(issue_number) {
            Ok(target) => target.issue_id,
            Err(e) => {
                log::error!("❌ Cannot resolve issue #{}: {}", issue_number, e);
                return vec![StepResult::failed(
                    PROJECT_STEP,
                    "Tried to link the issue to its projects, but there was a problem.".to_string(),
                    e,
                )];
            }
        };

        projects
            .iter()
            .map(|project| self.link(project, &content_id))
            .collect()
    }

    fn link(&self, project: &ProjectRef, content_id: &str) -> StepResult {
        let linked = self.github.project_detail(project).and_then(|detail| {
            self.github
                .add_project_item(&detail.id, content_id)
                .map(|_| detail)
        });

        match linked {
            Ok(detail) => {
                log::info!("📋 Added {} to project {}", content_id, detail.title);
                StepResult::done(
                    PROJECT_STEP,
                    format!("The issue was linked to [**{}**]({}).", detail.title, detail.url),
                )
            }
            Err(e) => {
                log::error!("❌ Cannot link to project {}: {}", project.url, e);
                StepResult::failed(
                    PROJECT_STEP,
                    format!(
                        "Tried to link the issue to the project **{}**, but there was a problem.",
                        project.url
                    ),
                    e,
                )
            }
        }
    }
}
