use crate::{
    errors::{GitBoardError, Result},
    prefix::DEFAULT_SCRIPT_TIMEOUT,
    projects::ProjectRef,
};
use clap::Args;
use regex::Regex;
use std::{fmt, time::Duration};

pub const DEFAULT_SERVER_URL: &str = "https://github.com";
pub const DEFAULT_MAIN_BRANCH: &str = "main";
pub const DEFAULT_DEVELOPMENT_BRANCH: &str = "develop";
pub const DEFAULT_HOTFIX_TREE: &str = "hotfix";

/// `owner/name` of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

impl RepoSlug {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || GitBoardError::Validation(format!("expected owner/repo, got {:?}", input));

        let slug_re = Regex::new(r"^(?P<owner>[A-Za-z0-9_.-]+)/(?P<name>[A-Za-z0-9_.-]+)$")
            .map_err(|_| invalid())?;
        let caps = slug_re.captures(input.trim()).ok_or_else(invalid)?;

        Ok(Self {
            owner: caps["owner"].to_string(),
            name: caps["name"].to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branches {
    pub main: String,
    pub development: String,
    /// Folder hotfix version branches are created under.
    pub hotfix_tree: String,
}

impl Default for Branches {
    fn default() -> Self {
        Self {
            main: DEFAULT_MAIN_BRANCH.to_string(),
            development: DEFAULT_DEVELOPMENT_BRANCH.to_string(),
            hotfix_tree: DEFAULT_HOTFIX_TREE.to_string(),
        }
    }
}

/// Everything a run needs to know about its environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repository: RepoSlug,
    pub server_url: String,
    pub token: Option<String>,
    pub branches: Branches,
    pub commit_prefix_script: Option<String>,
    pub script_timeout: Duration,
    /// Project boards every linked issue is added to.
    pub projects: Vec<ProjectRef>,
}

impl Settings {
    pub fn new(repository: RepoSlug) -> Self {
        Self {
            repository,
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            branches: Branches::default(),
            commit_prefix_script: None,
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
            projects: Vec::new(),
        }
    }

    pub fn branch_url(&self, branch: &str) -> String {
        format!("{}/{}/tree/{}", self.server_url, self.repository, branch)
    }

    pub fn compare_url(&self, base: &str, head: &str) -> String {
        format!(
            "{}/{}/compare/{}...{}?expand=1",
            self.server_url, self.repository, base, head
        )
    }
}

/// Settings flags shared by every subcommand.
///
/// Anything not given here is looked up in the `git-board` section of the
/// repository git config before falling back to defaults.
#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    /// Repository as owner/repo
    #[arg(long, global = true, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    #[arg(long, global = true, env = "GITHUB_SERVER_URL")]
    pub server_url: Option<String>,

    /// Token handed to gh; gh's own login is used when absent
    #[arg(long, global = true, env = "GH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, global = true, env = "GIT_BOARD_MAIN_BRANCH")]
    pub main_branch: Option<String>,

    #[arg(long, global = true, env = "GIT_BOARD_DEVELOPMENT_BRANCH")]
    pub development_branch: Option<String>,

    #[arg(long, global = true, env = "GIT_BOARD_HOTFIX_TREE")]
    pub hotfix_tree: Option<String>,

    /// JavaScript computing a commit prefix from `branchName`
    #[arg(long, global = true, env = "GIT_BOARD_COMMIT_PREFIX_BUILDER")]
    pub commit_prefix_builder: Option<String>,

    #[arg(long, global = true, env = "GIT_BOARD_SCRIPT_TIMEOUT_MS")]
    pub script_timeout_ms: Option<u64>,

    /// Project board URL the issue is added to; repeatable
    #[arg(
        long = "project-url",
        global = true,
        env = "GIT_BOARD_PROJECT_URLS",
        value_delimiter = ','
    )]
    pub project_urls: Vec<String>,
}

impl SettingsArgs {
    /// Resolve against a git config lookup, e.g. `git-board.developmentBranch`.
    pub fn resolve<F>(self, git_config: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |flag: Option<String>, key: &str| {
            flag.or_else(|| git_config(&format!("git-board.{}", key)))
                .filter(|value| !value.trim().is_empty())
        };

        let repository = pick(self.repository, "repository").ok_or_else(|| {
            GitBoardError::Validation(
                "no repository given, use --repository or GITHUB_REPOSITORY".to_string(),
            )
        })?;
        let mut settings = Settings::new(RepoSlug::parse(&repository)?);

        if let Some(server_url) = pick(self.server_url, "serverUrl") {
            settings.server_url = server_url.trim_end_matches('/').to_string();
        }
        settings.token = self.token.filter(|token| !token.is_empty());

        if let Some(main) = pick(self.main_branch, "mainBranch") {
            settings.branches.main = main;
        }
        if let Some(development) = pick(self.development_branch, "developmentBranch") {
            settings.branches.development = development;
        }
        if let Some(hotfix_tree) = pick(self.hotfix_tree, "hotfixTree") {
            settings.branches.hotfix_tree = hotfix_tree.trim_end_matches('/').to_string();
        }
        settings.commit_prefix_script = pick(self.commit_prefix_builder, "commitPrefixBuilder");

        let timeout = match self.script_timeout_ms {
            Some(ms) => Some(ms),
            None => match git_config("git-board.scriptTimeoutMs") {
                Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                    GitBoardError::Validation(format!(
                        "git-board.scriptTimeoutMs is not a number: {:?}",
                        value
                    ))
                })?),
                None => None,
            },
        };
        if let Some(ms) = timeout {
            settings.script_timeout = Duration::from_millis(ms);
        }

        let project_urls = if self.project_urls.is_empty() {
            git_config("git-board.projectUrls")
                .map(|value| value.split(',').map(|url| url.to_string()).collect::<Vec<_>>())
                .unwrap_or_default()
        } else {
            self.project_urls
        };
        settings.projects = project_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(ProjectRef::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(settings)
    }
}
