use crate::{
    core::{BranchPlan, LinkedBranchResult, StepResult},
    errors::{GitBoardError, Result},
    git::Vcs,
    github::GitHubCli,
    hotfix::{increment_version, HotfixState, TagResolver},
    naming::{find_switch_candidate, BranchSpec, BranchType},
    prefix::{CommitPrefixEvaluator, ScriptEvaluator},
    settings::Settings,
};

pub const FETCH_STEP: &str = "fetch";
pub const HOTFIX_STEP: &str = "hotfix-branch";
pub const LINK_STEP: &str = "link-branch";

const LATEST_TAG: &str = "tag";

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ResolveBase,
    ComputePlan,
    CreateOrRename,
    LinkToIssue,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRequest {
    pub issue_number: u64,
    pub issue_title: String,
    pub branch_type: BranchType,
}

#[derive(Debug)]
pub struct Outcome {
    pub stage: Stage,
    pub plans: Vec<BranchPlan>,
    pub results: Vec<StepResult>,
}

enum Creation {
    Created,
    Reused,
    Failed(GitBoardError),
}

struct Run {
    stage: Stage,
    results: Vec<StepResult>,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: Stage::ResolveBase,
            results: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        log::debug!("{:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }

    fn fail(&mut self, result: StepResult) {
        self.results.push(result);
        self.enter(Stage::Failed);
    }

    fn finish(mut self, plans: Vec<BranchPlan>) -> Outcome {
        if self.stage != Stage::Failed {
            self.enter(Stage::Done);
        }
        Outcome {
            stage: self.stage,
            plans,
            results: self.results,
        }
    }
}

/// Base branch for the issue branch itself.
///
/// A branch this issue already has under another type (or an older title)
/// becomes the base, so the new branch starts from its work.
pub fn plan_issue_branch(
    spec: &BranchSpec,
    branches: &[String],
    hotfix: &HotfixState,
    development_branch: &str,
) -> BranchPlan {
    let new_branch_name = spec.branch_name();

    if hotfix.active {
        if let Some(hotfix_branch) = &hotfix.branch {
            return BranchPlan {
                base_branch_name: hotfix_branch.clone(),
                new_branch_name,
                rename: false,
                commit_oid: None,
            };
        }
    } else if let Some(existing) = find_switch_candidate(branches, spec.issue_number) {
        if existing != new_branch_name {
            log::info!("🔄 Found branch {} for issue #{}", existing, spec.issue_number);
            return BranchPlan {
                base_branch_name: existing.to_string(),
                new_branch_name,
                rename: true,
                commit_oid: None,
            };
        }
    }

    BranchPlan {
        base_branch_name: development_branch.to_string(),
        new_branch_name,
        rename: false,
        commit_oid: None,
    }
}

/// Creates the branches an issue needs and links them to it
///
/// Nothing is rolled back: a branch created before a later failure stays,
/// and the failure is reported in the results.
pub struct LinkedBranchOrchestrator<'a, V: Vcs, G: GitHubCli, E: ScriptEvaluator> {
    settings: &'a Settings,
    vcs: &'a V,
    github: &'a G,
    prefixes: CommitPrefixEvaluator<E>,
}

impl<'a, V: Vcs, G: GitHubCli, E: ScriptEvaluator> LinkedBranchOrchestrator<'a, V, G, E> {
    pub fn new(
        settings: &'a Settings,
        vcs: &'a V,
        github: &'a G,
        prefixes: CommitPrefixEvaluator<E>,
    ) -> Self {
        Self {
            settings,
            vcs,
            github,
            prefixes,
        }
    }

    /// Branches to create, in order. A hotfix gets its version branch first.
    pub fn plan(
        &self,
        spec: &BranchSpec,
        branches: &[String],
        hotfix: &mut HotfixState,
    ) -> Result<Vec<BranchPlan>> {
        let mut plans = Vec::new();

        if hotfix.active {
            let tags = TagResolver::new(self.vcs);
            let tag = tags
                .latest_tag()?
                .ok_or_else(|| GitBoardError::NotFound(LATEST_TAG.to_string()))?;
            let version = increment_version(&tag)?;
            let hotfix_branch = format!("{}/{}", self.settings.branches.hotfix_tree, version);

            log::info!("🔥 Hotfix {} from tag {}", hotfix_branch, tag);
            hotfix.version = Some(version);
            hotfix.branch = Some(hotfix_branch.clone());

            let commit_oid = if branches.contains(&hotfix_branch) {
                None
            } else {
                let commit = tags.commit_of(&tag)?.ok_or_else(|| {
                    GitBoardError::NotFound(format!("commit of tag {}", tag))
                })?;
                Some(commit)
            };

            plans.push(BranchPlan {
                base_branch_name: format!("tags/{}", tag),
                new_branch_name: hotfix_branch,
                rename: false,
                commit_oid,
            });
        }

        plans.push(plan_issue_branch(
            spec,
            branches,
            hotfix,
            &self.settings.branches.development,
        ));

        Ok(plans)
    }

    /// Plans for a request without creating anything.
    pub fn preview(&self, request: &LinkRequest, hotfix: &mut HotfixState) -> Result<Vec<BranchPlan>> {
        let spec = BranchSpec::new(request.branch_type, request.issue_number, &request.issue_title)?;
        if let Err(e) = self.vcs.fetch_all() {
            log::warn!("⚠️  Planning with local state, fetch failed: {}", e);
        }
        let branches = self.github.list_branches()?;
        self.plan(&spec, &branches, hotfix)
    }

    pub fn run(&self, request: &LinkRequest, hotfix: &mut HotfixState) -> Result<Outcome> {
        // Checked before anything is fetched or created
        let spec = BranchSpec::new(request.branch_type, request.issue_number, &request.issue_title)?;
        let mut run = Run::new();

        log::info!(
            "Preparing {} branch for issue #{}",
            spec.branch_type,
            spec.issue_number
        );

        if let Err(e) = self.vcs.fetch_all() {
            log::error!("❌ Fetch failed: {}", e);
            run.results.push(StepResult::failed(
                FETCH_STEP,
                "Tried to fetch branches and tags, but there was a problem.".to_string(),
                e,
            ));
        }

        let branches = match self.github.list_branches() {
            Ok(branches) => branches,
            Err(e) => {
                log::error!("❌ Cannot list branches: {}", e);
                run.fail(StepResult::failed(
                    LINK_STEP,
                    "Tried to list the repository branches, but there was a problem.".to_string(),
                    e,
                ));
                return Ok(run.finish(Vec::new()));
            }
        };

        run.enter(Stage::ComputePlan);
        let plans = match self.plan(&spec, &branches, hotfix) {
            Ok(plans) => plans,
            Err(e @ GitBoardError::Validation(_)) => return Err(e),
            Err(e) => {
                log::error!("❌ Cannot plan branches: {}", e);
                let step = match (&e, &hotfix.branch) {
                    (GitBoardError::NotFound(what), _) if what == LATEST_TAG => {
                        "Tried to create a hotfix but no tag was found.".to_string()
                    }
                    (_, Some(branch)) if hotfix.version.is_some() => format!(
                        "Tried to create the hotfix branch **{}**, but there was a problem.",
                        branch
                    ),
                    _ => "Tried to look up the latest tag for the hotfix, but there was a problem."
                        .to_string(),
                };
                run.fail(StepResult::failed(HOTFIX_STEP, step, e));
                return Ok(run.finish(Vec::new()));
            }
        };

        for (index, plan) in plans.iter().enumerate() {
            let is_hotfix_branch = hotfix.active && index + 1 < plans.len();
            let creation = self.create_branch(&mut run, plan, spec.issue_number, &branches);

            if is_hotfix_branch {
                self.report_hotfix_branch(&mut run, plan, creation);
            } else {
                self.report_issue_branch(&mut run, plan, creation, hotfix);
            }

            // Later branches start from this one
            if run.stage == Stage::Failed {
                break;
            }
        }

        Ok(run.finish(plans))
    }

    fn create_branch(
        &self,
        run: &mut Run,
        plan: &BranchPlan,
        issue_number: u64,
        branches: &[String],
    ) -> Creation {
        run.enter(Stage::CreateOrRename);

        // The linking call cannot tell "already exists" apart from failure
        if branches.contains(&plan.new_branch_name) {
            log::info!("ℹ️  Branch {} already exists", plan.new_branch_name);
            return Creation::Reused;
        }

        let commit_oid = match &plan.commit_oid {
            Some(oid) => oid.clone(),
            None => match self.github.get_ref(&plan.base_branch_name) {
                Ok(Some(reference)) => reference.object.sha,
                Ok(None) => {
                    return Creation::Failed(GitBoardError::NotFound(format!(
                        "branch {}",
                        plan.base_branch_name
                    )))
                }
                Err(e) => return Creation::Failed(e),
            },
        };

        run.enter(Stage::LinkToIssue);
        let linked = self
            .github
            .linking_target(issue_number)
            .and_then(|target| {
                self.github
                    .create_linked_branch(&target, &plan.new_branch_name, &commit_oid)
            });

        match linked {
            Ok(linked) => {
                log::info!("✅ Linked {} to issue #{}", linked.ref_name, issue_number);
                Creation::Created
            }
            Err(e) => {
                log::error!("❌ Failed to link {}: {}", plan.new_branch_name, e);
                Creation::Failed(e)
            }
        }
    }

    fn linked_branch(&self, plan: &BranchPlan, success: bool) -> LinkedBranchResult {
        LinkedBranchResult {
            base_branch_name: plan.base_branch_name.clone(),
            base_branch_url: self.settings.branch_url(&plan.base_branch_name),
            new_branch_name: plan.new_branch_name.clone(),
            new_branch_url: self.settings.branch_url(&plan.new_branch_name),
            success,
        }
    }

    fn report_hotfix_branch(&self, run: &mut Run, plan: &BranchPlan, creation: Creation) {
        let tag = &plan.base_branch_name;
        let tag_url = self.settings.branch_url(tag);
        let branch = &plan.new_branch_name;
        let branch_url = self.settings.branch_url(branch);

        let result = match creation {
            Creation::Created => StepResult::done(
                HOTFIX_STEP,
                format!(
                    "The tag [**{}**]({}) was used to create the branch [**{}**]({}).",
                    tag, tag_url, branch, branch_url
                ),
            ),
            Creation::Reused => StepResult::skipped(
                HOTFIX_STEP,
                format!(
                    "The branch [**{}**]({}) already exists and won't be created from the tag [**{}**]({}).",
                    branch, branch_url, tag, tag_url
                ),
            ),
            Creation::Failed(e) => {
                let result = StepResult::failed(
                    HOTFIX_STEP,
                    format!(
                        "Tried to create the hotfix branch **{}** from the tag **{}**, but there was a problem.",
                        branch, tag
                    ),
                    e,
                );
                run.fail(result.with_linked_branch(self.linked_branch(plan, false)));
                return;
            }
        };

        run.results
            .push(result.with_linked_branch(self.linked_branch(plan, true)));
    }

    fn report_issue_branch(
        &self,
        run: &mut Run,
        plan: &BranchPlan,
        creation: Creation,
        hotfix: &HotfixState,
    ) {
        let new_branch = &plan.new_branch_name;
        let new_url = self.settings.branch_url(new_branch);
        let base_branch = &plan.base_branch_name;
        let base_url = self.settings.branch_url(base_branch);

        let result = match creation {
            Creation::Created if plan.rename => StepResult::done(
                LINK_STEP,
                format!(
                    "The branch **{}** was renamed to [**{}**]({}).",
                    base_branch, new_branch, new_url
                ),
            ),
            Creation::Created => StepResult::done(
                LINK_STEP,
                format!(
                    "The branch [**{}**]({}) was used to create the branch [**{}**]({}).",
                    base_branch, base_url, new_branch, new_url
                ),
            ),
            Creation::Reused => StepResult::skipped(
                LINK_STEP,
                format!(
                    "The branch [**{}**]({}) already exists.",
                    new_branch, new_url
                ),
            ),
            Creation::Failed(e) => {
                let result = StepResult::failed(
                    LINK_STEP,
                    format!(
                        "Tried to create the branch **{}** from **{}**, but there was a problem.",
                        new_branch, base_branch
                    ),
                    e,
                );
                run.fail(result.with_linked_branch(self.linked_branch(plan, false)));
                return;
            }
        };

        let prefix = self.prefixes.prefix_for(new_branch);
        run.results.push(
            result
                .with_reminders(self.branch_reminders(plan, &prefix))
                .with_linked_branch(self.linked_branch(plan, true)),
        );

        if hotfix.active {
            run.results.push(StepResult {
                id: HOTFIX_STEP.to_string(),
                success: true,
                reminders: self.hotfix_reminders(base_branch, hotfix, &prefix),
                ..Default::default()
            });
        }
    }

    fn with_prefix(reminder: String, prefix: &str) -> String {
        if prefix.is_empty() {
            reminder
        } else {
            format!(
                "{}\n> Consider committing with the prefix `{}`.",
                reminder, prefix
            )
        }
    }

    fn branch_reminders(&self, plan: &BranchPlan, prefix: &str) -> Vec<String> {
        let new_branch = &plan.new_branch_name;
        let new_url = self.settings.branch_url(new_branch);

        // A renamed branch goes back to development, not to its old self
        let target = if plan.rename {
            &self.settings.branches.development
        } else {
            &plan.base_branch_name
        };
        let target_url = self.settings.branch_url(target);

        vec![
            Self::with_prefix(
                format!(
                    "Commit the necessary changes to [`{}`]({}).",
                    new_branch, new_url
                ),
                prefix,
            ),
            format!(
                "Open a Pull Request from [`{}`]({}) to [`{}`]({}). [New PR]({})",
                new_branch,
                new_url,
                target,
                target_url,
                self.settings.compare_url(target, new_branch)
            ),
        ]
    }

    fn hotfix_reminders(&self, hotfix_branch: &str, hotfix: &HotfixState, prefix: &str) -> Vec<String> {
        let main = &self.settings.branches.main;
        let main_url = self.settings.branch_url(main);
        let hotfix_url = self.settings.branch_url(hotfix_branch);

        let mut reminders = vec![Self::with_prefix(
            format!(
                "Open a Pull Request from [`{}`]({}) to [`{}`]({}) after merging into [`{}`]({}). [New PR]({})",
                hotfix_branch,
                hotfix_url,
                main,
                main_url,
                hotfix_branch,
                hotfix_url,
                self.settings.compare_url(main, hotfix_branch)
            ),
            prefix,
        )];

        if let Some(version) = &hotfix.version {
            reminders.push(format!(
                "Create the tag `{}` after merging into [`{}`]({}).",
                version, main, main_url
            ));
        }

        reminders
    }
}
