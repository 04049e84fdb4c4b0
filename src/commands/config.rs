use crate::{
    core::WorkflowConfig,
    errors::Result,
    github::GitHubCli,
    store::{ConfigStore, EmbeddedConfigStore},
};
use clap::{Args, Subcommand};

#[derive(Debug, Args)]
pub struct Config {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration embedded in an issue or pull request
    Show {
        #[arg(long)]
        number: u64,
    },
}

impl Config {
    pub fn execute<G: GitHubCli>(&self, github: &G) -> Result<()> {
        match &self.command {
            ConfigCommand::Show { number } => {
                println!("{}", show(github, *number)?);
                Ok(())
            }
        }
    }
}

/// Pretty JSON of the embedded configuration.
pub fn show<G: GitHubCli>(github: &G, number: u64) -> Result<String> {
    let issue = github.get_issue(number)?;
    let body = issue.body.as_deref().unwrap_or_default();
    let store = EmbeddedConfigStore::new();
    store.check(body)?;

    match store.read::<WorkflowConfig>(body)? {
        Some(config) => Ok(serde_json::to_string_pretty(&config)?),
        None => Ok("no configuration present".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::GitBoardError, github::cli::MockGitHubCli};

    #[test]
    fn test_show_without_configuration() {
        let github = MockGitHubCli::new().with_issue(2, "Title", Some("just text"));
        assert_eq!(show(&github, 2).unwrap(), "no configuration present");
    }

    #[test]
    fn test_show_configuration() {
        let body = "Text\n\n<!-- GIT-BOARD-CONFIG-START\n{\"results\": [], \"branchType\": \"bugfix\"}\nGIT-BOARD-CONFIG-END -->";
        let github = MockGitHubCli::new().with_issue(2, "Title", Some(body));

        let shown = show(&github, 2).unwrap();
        assert!(shown.contains("\"branchType\": \"bugfix\""));
    }

    #[test]
    fn test_show_reports_corruption() {
        let body = "Text\n\nGIT-BOARD-CONFIG-END -->";
        let github = MockGitHubCli::new().with_issue(2, "Title", Some(body));

        assert!(matches!(show(&github, 2), Err(GitBoardError::Corruption(_))));
    }
}
