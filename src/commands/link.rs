use crate::{
    commands::{finish_run, load_config},
    core::{BranchPlan, WorkflowConfig},
    errors::Result,
    git::{Git, Vcs},
    github::{GitHubCli, GitHubCliImpl},
    hotfix::HotfixState,
    naming::BranchType,
    orchestrator::{LinkRequest, LinkedBranchOrchestrator, Stage},
    prefix::{CommitPrefixEvaluator, JsSandbox, ScriptEvaluator},
    projects::ProjectLinker,
    report::RunKind,
    settings::Settings,
};
use clap::Args;

#[derive(Debug, Args)]
pub struct Link {
    /// Issue the branch is created for
    #[arg(long)]
    pub issue: u64,

    #[arg(long, value_enum)]
    pub branch_type: BranchType,

    /// Skip the summary comment on the issue
    #[arg(long)]
    pub no_comment: bool,

    /// Print the branches that would be created and stop
    #[arg(long)]
    pub dry_run: bool,
}

impl Link {
    pub fn execute(&self, git: &Git, github: &GitHubCliImpl, settings: &Settings) -> Result<()> {
        let config = self.run(git, github, JsSandbox::new(), settings)?;
        if let Some(config) = config {
            log::info!(
                "🏁 Issue #{} now has {} recorded results",
                self.issue,
                config.results.len()
            );
        }
        Ok(())
    }

    /// Returns the stored configuration, `None` for a dry run.
    pub fn run<V, G, E>(
        &self,
        vcs: &V,
        github: &G,
        evaluator: E,
        settings: &Settings,
    ) -> Result<Option<WorkflowConfig>>
    where
        V: Vcs,
        G: GitHubCli,
        E: ScriptEvaluator,
    {
        let issue = github.get_issue(self.issue)?;
        let mut config = load_config(&issue)?;

        let request = LinkRequest {
            issue_number: issue.number,
            issue_title: issue.title.clone(),
            branch_type: self.branch_type,
        };
        let mut hotfix = HotfixState::new(
            self.branch_type == BranchType::Hotfix,
            config.hotfix_branch.clone(),
        );

        let prefixes = CommitPrefixEvaluator::new(
            evaluator,
            settings.commit_prefix_script.clone(),
            settings.script_timeout,
        );
        let orchestrator = LinkedBranchOrchestrator::new(settings, vcs, github, prefixes);

        if self.dry_run {
            let plans = orchestrator.preview(&request, &mut hotfix)?;
            for plan in &plans {
                println!("{}", describe(plan));
            }
            for project in &settings.projects {
                println!("add #{} to project {}", issue.number, project.url);
            }
            return Ok(None);
        }

        let outcome = orchestrator.run(&request, &mut hotfix)?;
        if outcome.stage == Stage::Failed {
            log::error!("❌ Branch preparation for #{} did not complete", issue.number);
        }

        // Project boards are independent of how the branch work went
        let mut results = outcome.results;
        results.extend(ProjectLinker::new(github).link_issue(issue.number, &settings.projects));

        if hotfix.active {
            config.hotfix_branch = hotfix.branch.clone();
        }
        config.branch_type = Some(self.branch_type);

        let config = finish_run(
            github,
            &issue,
            config,
            results,
            RunKind::from_branch_type(self.branch_type),
            !self.no_comment,
        )?;

        Ok(Some(config))
    }
}

fn describe(plan: &BranchPlan) -> String {
    let source = match &plan.commit_oid {
        Some(oid) => format!("{} ({})", plan.base_branch_name, oid),
        None => plan.base_branch_name.clone(),
    };
    let verb = if plan.rename { "rename" } else { "create" };
    format!("{} {} from {}", verb, plan.new_branch_name, source)
}
