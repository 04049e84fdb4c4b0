use clap::Parser;
use clap::Subcommand;
use commands::clean::Clean;
use commands::config::Config;
use commands::link::Link;
use errors::{GitBoardError, Result};
use git::Git;
use github::{GitHubCli, GitHubCliImpl};
use settings::SettingsArgs;

mod cleanup;
mod commands;
mod core;
mod errors;
mod git;
mod github;
mod hotfix;
mod naming;
mod orchestrator;
mod prefix;
mod projects;
mod report;
mod settings;
mod store;

#[derive(Debug, Parser)]
#[command(name = "git-board")]
#[command(about = "Issue-linked branch workflow for GitHub repositories", long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the branch an issue asks for and link it to the issue
    Link(Link),
    /// Remove every branch of an issue
    Clean(Clean),
    /// Inspect the configuration stored in a description
    Config(Config),
}

fn run(args: Cli) -> Result<()> {
    let git = Git::open(".")?;
    let snapshot = git.config_snapshot()?;
    let settings = args
        .settings
        .resolve(|key| snapshot.get_string(key).ok())?;

    let github = GitHubCliImpl::new(settings.repository.clone(), settings.token.clone());
    if !github.is_available()? {
        log::error!("📝 GitHub CLI (gh) not found. Install it from https://cli.github.com/");
        return Err(GitBoardError::GitHubCliNotFound);
    }

    match args.command {
        Commands::Link(link) => link.execute(&git, &github, &settings),
        Commands::Clean(clean) => clean.execute(&github).map(|_| ()),
        Commands::Config(config) => config.execute(&github),
    }
}

fn main() {
    env_logger::init();

    let args = Cli::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
