use crate::errors::{GitBoardError, Result};
use crate::github::types::{
    AddProjectItemData, BranchRef, CreateLinkedBranchData, GraphQlResponse, Issue, LinkedBranch,
    LinkingTarget, ProjectDetail, ProjectOwnerData, RepositoryData,
};
use crate::projects::ProjectRef;
use crate::settings::RepoSlug;
use std::{
    io::Write,
    process::{Command, Stdio},
};

const LINKING_TARGET_QUERY: &str = r#"
query($owner: String!, $repo: String!, $issueNumber: Int!) {
  repository(owner: $owner, name: $repo) {
    id
    issue(number: $issueNumber) {
      id
    }
  }
}"#;

const CREATE_LINKED_BRANCH_MUTATION: &str = r#"
mutation($issueId: ID!, $name: String!, $repositoryId: ID!, $oid: GitObjectID!) {
  createLinkedBranch(input: {
    issueId: $issueId,
    name: $name,
    repositoryId: $repositoryId,
    oid: $oid,
  }) {
    linkedBranch {
      id
      ref {
        name
      }
    }
  }
}"#;

const ADD_PROJECT_ITEM_MUTATION: &str = r#"
mutation($projectId: ID!, $contentId: ID!) {
  addProjectV2ItemById(input: {projectId: $projectId, contentId: $contentId}) {
    item {
      id
    }
  }
}"#;

/// Owner field differs between organization and user projects.
fn project_query(project: &ProjectRef) -> String {
    format!(
        r#"
query($ownerName: String!, $projectNumber: Int!) {{
  {}(login: $ownerName) {{
    projectV2(number: $projectNumber) {{
      id
      title
      url
    }}
  }}
}}"#,
        project.owner_type.query_field()
    )
}

/// Hosting platform operations used by the branch workflow.
pub trait GitHubCli {
    fn is_available(&self) -> Result<bool>;
    fn list_branches(&self) -> Result<Vec<String>>;
    /// `Ok(None)` when the branch does not exist.
    fn get_ref(&self, branch: &str) -> Result<Option<BranchRef>>;
    fn delete_ref(&self, branch: &str) -> Result<()>;
    fn linking_target(&self, issue_number: u64) -> Result<LinkingTarget>;
    /// Creates `branch` at `commit_oid` and links it to the issue in one call.
    fn create_linked_branch(
        &self,
        target: &LinkingTarget,
        branch: &str,
        commit_oid: &str,
    ) -> Result<LinkedBranch>;
    fn get_issue(&self, number: u64) -> Result<Issue>;
    fn update_issue_body(&self, number: u64, body: &str) -> Result<()>;
    fn add_comment(&self, number: u64, body: &str) -> Result<()>;
    fn project_detail(&self, project: &ProjectRef) -> Result<ProjectDetail>;
    /// Adds an issue or pull request (by node id) to a project; returns the item id.
    fn add_project_item(&self, project_id: &str, content_id: &str) -> Result<String>;
}

/// Talks to GitHub through `gh api`.
pub struct GitHubCliImpl {
    repository: RepoSlug,
    token: Option<String>,
}

impl GitHubCliImpl {
    pub fn new(repository: RepoSlug, token: Option<String>) -> Self {
        Self { repository, token }
    }

    fn run_command(&self, args: &[&str]) -> Result<std::process::Output> {
        let mut command = Command::new("gh");
        command.args(args);
        if let Some(token) = &self.token {
            command.env("GH_TOKEN", token);
        }

        let output = command
            .output()
            .map_err(|e| GitBoardError::GitHubCli(format!("Failed to execute gh command: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitBoardError::GitHubCli(stderr.trim().to_string()));
        }

        Ok(output)
    }

    fn api(&self, args: &[&str]) -> Result<String> {
        let mut full_args = vec!["api"];
        full_args.extend_from_slice(args);
        let output = self.run_command(&full_args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Sends `payload` as the request body on stdin; descriptions and
    /// comments can exceed the per-argument size limit of the OS.
    fn api_with_input(&self, args: &[&str], payload: &[u8]) -> Result<String> {
        let mut command = Command::new("gh");
        command
            .arg("api")
            .args(args)
            .args(["--input", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(token) = &self.token {
            command.env("GH_TOKEN", token);
        }

        let mut child = command
            .spawn()
            .map_err(|e| GitBoardError::GitHubCli(format!("Failed to execute gh command: {}", e)))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(payload)?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitBoardError::GitHubCli(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn repo_path(&self, path: &str) -> String {
        format!(
            "repos/{}/{}/{}",
            self.repository.owner, self.repository.name, path
        )
    }
}

pub(crate) fn is_not_found(error: &str) -> bool {
    error.contains("Not Found") || error.contains("HTTP 404")
}

/// JSON request body carrying an issue description or comment text.
pub(crate) fn body_payload(body: &str) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&serde_json::json!({ "body": body }))?)
}

pub(crate) fn parse_project_detail(stdout: &str, project: &ProjectRef) -> Result<ProjectDetail> {
    let response: GraphQlResponse<ProjectOwnerData> = serde_json::from_str(stdout)?;
    response
        .data
        .organization
        .and_then(|owner| owner.project)
        .ok_or_else(|| GitBoardError::NotFound(format!("project {}", project.url)))
}

pub(crate) fn parse_project_item(stdout: &str) -> Result<String> {
    let response: GraphQlResponse<AddProjectItemData> = serde_json::from_str(stdout)?;
    response
        .data
        .add_item
        .and_then(|payload| payload.item)
        .map(|item| item.id)
        .ok_or_else(|| GitBoardError::GitHubCli("project item was not created".to_string()))
}

pub(crate) fn parse_branch_names(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}

pub(crate) fn parse_linking_target(stdout: &str, issue_number: u64) -> Result<LinkingTarget> {
    let response: GraphQlResponse<RepositoryData> = serde_json::from_str(stdout)?;
    let repository = response
        .data
        .repository
        .ok_or_else(|| GitBoardError::NotFound("repository".to_string()))?;
    let issue = repository
        .issue
        .ok_or_else(|| GitBoardError::NotFound(format!("issue #{}", issue_number)))?;

    Ok(LinkingTarget {
        repository_id: repository.id,
        issue_id: issue.id,
    })
}

pub(crate) fn parse_linked_branch(stdout: &str, branch: &str) -> Result<LinkedBranch> {
    let response: GraphQlResponse<CreateLinkedBranchData> = serde_json::from_str(stdout)?;
    let linked = response
        .data
        .create_linked_branch
        .and_then(|payload| payload.linked_branch)
        .ok_or_else(|| {
            GitBoardError::GitHubCli(format!("branch {} was not linked", branch))
        })?;

    Ok(LinkedBranch {
        id: linked.id,
        ref_name: linked
            .reference
            .map(|reference| reference.name)
            .unwrap_or_else(|| branch.to_string()),
    })
}

impl GitHubCli for GitHubCliImpl {
    fn is_available(&self) -> Result<bool> {
        match Command::new("gh").arg("--version").output() {
            Ok(output) => Ok(output.status.success()),
            Err(_) => Ok(false),
        }
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        log::debug!("Listing branches of {}", self.repository);

        let path = self.repo_path("branches?per_page=100");
        let stdout = self.api(&["--paginate", &path, "--jq", ".[].name"])?;
        let branches = parse_branch_names(&stdout);

        log::debug!("Found {} branches", branches.len());
        Ok(branches)
    }

    fn get_ref(&self, branch: &str) -> Result<Option<BranchRef>> {
        log::debug!("Checking branch reference: {}", branch);

        let path = self.repo_path(&format!("git/ref/heads/{}", branch));
        match self.api(&[&path]) {
            Ok(stdout) => Ok(Some(serde_json::from_str(&stdout)?)),
            Err(GitBoardError::GitHubCli(ref error)) if is_not_found(error) => {
                log::debug!("Branch {} not found", branch);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn delete_ref(&self, branch: &str) -> Result<()> {
        log::debug!("Deleting branch reference: {}", branch);

        let path = self.repo_path(&format!("git/refs/heads/{}", branch));
        self.api(&["-X", "DELETE", &path])?;

        log::info!("✅ Deleted branch {}", branch);
        Ok(())
    }

    fn linking_target(&self, issue_number: u64) -> Result<LinkingTarget> {
        log::debug!("Fetching node ids for issue #{}", issue_number);

        let query = format!("query={}", LINKING_TARGET_QUERY);
        let owner = format!("owner={}", self.repository.owner);
        let repo = format!("repo={}", self.repository.name);
        let number = format!("issueNumber={}", issue_number);
        let stdout = self.api(&[
            "graphql", "-f", &query, "-f", &owner, "-f", &repo, "-F", &number,
        ])?;

        parse_linking_target(&stdout, issue_number)
    }

    fn create_linked_branch(
        &self,
        target: &LinkingTarget,
        branch: &str,
        commit_oid: &str,
    ) -> Result<LinkedBranch> {
        log::info!("🔗 Linking branch {} (oid: {})", branch, commit_oid);

        let query = format!("query={}", CREATE_LINKED_BRANCH_MUTATION);
        let issue_id = format!("issueId={}", target.issue_id);
        let name = format!("name={}", branch);
        let repository_id = format!("repositoryId={}", target.repository_id);
        let oid = format!("oid={}", commit_oid);
        let stdout = self.api(&[
            "graphql",
            "-f",
            &query,
            "-f",
            &issue_id,
            "-f",
            &name,
            "-f",
            &repository_id,
            "-f",
            &oid,
        ])?;

        parse_linked_branch(&stdout, branch)
    }

    fn get_issue(&self, number: u64) -> Result<Issue> {
        log::debug!("Reading issue #{}", number);

        let path = self.repo_path(&format!("issues/{}", number));
        match self.api(&[&path]) {
            Ok(stdout) => Ok(serde_json::from_str(&stdout)?),
            Err(GitBoardError::GitHubCli(ref error)) if is_not_found(error) => {
                Err(GitBoardError::NotFound(format!("issue #{}", number)))
            }
            Err(e) => Err(e),
        }
    }

    fn update_issue_body(&self, number: u64, body: &str) -> Result<()> {
        log::debug!("Updating description of #{}", number);

        let path = self.repo_path(&format!("issues/{}", number));
        self.api_with_input(&["-X", "PATCH", &path], &body_payload(body)?)?;

        log::info!("✅ Updated description of #{}", number);
        Ok(())
    }

    fn add_comment(&self, number: u64, body: &str) -> Result<()> {
        log::debug!("Commenting on #{}", number);

        let path = self.repo_path(&format!("issues/{}/comments", number));
        self.api_with_input(&["-X", "POST", &path], &body_payload(body)?)?;

        log::info!("✅ Comment added to #{}", number);
        Ok(())
    }

    fn project_detail(&self, project: &ProjectRef) -> Result<ProjectDetail> {
        log::debug!("Fetching project {}", project.url);

        let query = format!("query={}", project_query(project));
        let owner = format!("ownerName={}", project.owner);
        let number = format!("projectNumber={}", project.number);
        let stdout = self.api(&["graphql", "-f", &query, "-f", &owner, "-F", &number])?;

        let detail = parse_project_detail(&stdout, project)?;
        log::debug!("Project {} is {}", detail.title, detail.id);
        Ok(detail)
    }

    fn add_project_item(&self, project_id: &str, content_id: &str) -> Result<String> {
        log::debug!("Adding {} to project {}", content_id, project_id);

        let query = format!("query={}", ADD_PROJECT_ITEM_MUTATION);
        let project = format!("projectId={}", project_id);
        let content = format!("contentId={}", content_id);
        let stdout = self.api(&["graphql", "-f", &query, "-f", &project, "-f", &content])?;

        parse_project_item(&stdout)
    }
}

#[cfg(test)]
pub struct MockGitHubCli {
    pub available: bool,
    pub branches: Vec<String>,
    pub refs: std::sync::Mutex<std::collections::HashMap<String, String>>,
    pub issues: std::collections::HashMap<u64, Issue>,
    pub failing_links: Vec<String>,
    pub failing_deletes: Vec<String>,
    pub failing_branch_list: bool,
    pub failing_comments: bool,
    pub projects: std::collections::HashMap<String, ProjectDetail>,
    pub project_items: std::sync::Mutex<Vec<(String, String)>>,
    pub created_links: std::sync::Mutex<Vec<(String, String)>>,
    pub deleted_refs: std::sync::Mutex<Vec<String>>,
    pub comments: std::sync::Mutex<Vec<(u64, String)>>,
    pub updated_bodies: std::sync::Mutex<Vec<(u64, String)>>,
}

#[cfg(test)]
impl MockGitHubCli {
    pub fn new() -> Self {
        Self {
            available: true,
            branches: Vec::new(),
            refs: std::sync::Mutex::new(std::collections::HashMap::new()),
            issues: std::collections::HashMap::new(),
            failing_links: Vec::new(),
            failing_deletes: Vec::new(),
            failing_branch_list: false,
            failing_comments: false,
            projects: std::collections::HashMap::new(),
            project_items: std::sync::Mutex::new(Vec::new()),
            created_links: std::sync::Mutex::new(Vec::new()),
            deleted_refs: std::sync::Mutex::new(Vec::new()),
            comments: std::sync::Mutex::new(Vec::new()),
            updated_bodies: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Adds a branch with its tip commit.
    pub fn with_branch(mut self, name: &str, sha: &str) -> Self {
        self.branches.push(name.to_string());
        self.refs
            .lock()
            .unwrap()
            .insert(name.to_string(), sha.to_string());
        self
    }

    pub fn with_issue(mut self, number: u64, title: &str, body: Option<&str>) -> Self {
        self.issues.insert(
            number,
            Issue {
                number,
                title: title.to_string(),
                body: body.map(|b| b.to_string()),
            },
        );
        self
    }

    pub fn failing_link_for(mut self, branch: &str) -> Self {
        self.failing_links.push(branch.to_string());
        self
    }

    pub fn failing_delete_for(mut self, branch: &str) -> Self {
        self.failing_deletes.push(branch.to_string());
        self
    }

    pub fn with_failing_branch_list(mut self) -> Self {
        self.failing_branch_list = true;
        self
    }

    pub fn with_failing_comments(mut self) -> Self {
        self.failing_comments = true;
        self
    }

    pub fn with_project(mut self, url: &str, id: &str, title: &str) -> Self {
        self.projects.insert(
            url.to_string(),
            ProjectDetail {
                id: id.to_string(),
                title: title.to_string(),
                url: url.to_string(),
            },
        );
        self
    }

    pub fn set_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn get_created_links(&self) -> Vec<(String, String)> {
        self.created_links.lock().unwrap().clone()
    }

    pub fn get_deleted_refs(&self) -> Vec<String> {
        self.deleted_refs.lock().unwrap().clone()
    }

    pub fn get_comments(&self) -> Vec<(u64, String)> {
        self.comments.lock().unwrap().clone()
    }

    pub fn get_updated_bodies(&self) -> Vec<(u64, String)> {
        self.updated_bodies.lock().unwrap().clone()
    }

    pub fn get_project_items(&self) -> Vec<(String, String)> {
        self.project_items.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl GitHubCli for MockGitHubCli {
    fn is_available(&self) -> Result<bool> {
        Ok(self.available)
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        if self.failing_branch_list {
            return Err(GitBoardError::GitHubCli("HTTP 502: Bad Gateway".to_string()));
        }
        Ok(self.branches.clone())
    }

    fn get_ref(&self, branch: &str) -> Result<Option<BranchRef>> {
        Ok(self.refs.lock().unwrap().get(branch).map(|sha| BranchRef {
            name: format!("refs/heads/{}", branch),
            object: crate::github::types::RefObject { sha: sha.clone() },
        }))
    }

    fn delete_ref(&self, branch: &str) -> Result<()> {
        if self.failing_deletes.iter().any(|b| b == branch) {
            return Err(GitBoardError::GitHubCli(format!("cannot delete {}", branch)));
        }
        self.refs.lock().unwrap().remove(branch);
        self.deleted_refs.lock().unwrap().push(branch.to_string());
        Ok(())
    }

    fn linking_target(&self, issue_number: u64) -> Result<LinkingTarget> {
        Ok(LinkingTarget {
            repository_id: "R_repo".to_string(),
            issue_id: format!("I_{}", issue_number),
        })
    }

    fn create_linked_branch(
        &self,
        _target: &LinkingTarget,
        branch: &str,
        commit_oid: &str,
    ) -> Result<LinkedBranch> {
        if self.failing_links.iter().any(|b| b == branch) {
            return Err(GitBoardError::GitHubCli(format!(
                "GraphQL: Could not create linked branch {}",
                branch
            )));
        }
        self.created_links
            .lock()
            .unwrap()
            .push((branch.to_string(), commit_oid.to_string()));
        self.refs
            .lock()
            .unwrap()
            .insert(branch.to_string(), commit_oid.to_string());
        Ok(LinkedBranch {
            id: format!("LB_{}", branch),
            ref_name: branch.to_string(),
        })
    }

    fn get_issue(&self, number: u64) -> Result<Issue> {
        self.issues
            .get(&number)
            .cloned()
            .ok_or_else(|| GitBoardError::NotFound(format!("issue #{}", number)))
    }

    fn update_issue_body(&self, number: u64, body: &str) -> Result<()> {
        self.updated_bodies
            .lock()
            .unwrap()
            .push((number, body.to_string()));
        Ok(())
    }

    fn add_comment(&self, number: u64, body: &str) -> Result<()> {
        if self.failing_comments {
            return Err(GitBoardError::GitHubCli("HTTP 403: Forbidden".to_string()));
        }
        self.comments.lock().unwrap().push((number, body.to_string()));
        Ok(())
    }

    fn project_detail(&self, project: &ProjectRef) -> Result<ProjectDetail> {
        self.projects
            .get(&project.url)
            .cloned()
            .ok_or_else(|| GitBoardError::NotFound(format!("project {}", project.url)))
    }

    fn add_project_item(&self, project_id: &str, content_id: &str) -> Result<String> {
        self.project_items
            .lock()
            .unwrap()
            .push((project_id.to_string(), content_id.to_string()));
        Ok(format!("PVTI_{}", content_id))
    }
}
