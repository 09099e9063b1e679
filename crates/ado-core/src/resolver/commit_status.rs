//! Commit-status resolvers.
//!
//! Builds record the package version they produced as a commit status whose
//! description carries `version_id: <id>`. These resolvers pick candidate
//! branches with a `BranchSelector` and walk back from each head looking
//! for that marker.

use tracing::{info, warn};

use super::{Resolution, ResolutionContext, Resolver};
use crate::config::remote::{CONTEXT_2GP, CONTEXT_UNLOCKED};
use crate::dependency::{DynamicDependency, PackageVersionIdDependency, StaticDependency};
use crate::error::Result;
use crate::host::GitStatusState;
use crate::repo::{Branch, Commit, VcsRepository};

/// First-parent commits inspected per branch.
const MAX_COMMITS: usize = 5;

const DEFAULT_2GP_LABEL: &str = "Build Feature Test Package";
const DEFAULT_UNLOCKED_LABEL: &str = "Build Unlocked Test Package";

/// Which remote branches to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchSelector {
    /// Remote branch mirroring the local feature branch
    ExactMatch,
    /// Release branches `id - offset_start` down to `id - offset_end + 1`
    ReleaseBranch { offset_start: u32, offset_end: u32 },
    DefaultBranch,
}

#[derive(Debug, Clone)]
pub struct CommitStatusResolver {
    name: String,
    selector: BranchSelector,
    status_context_key: &'static str,
    default_label: &'static str,
}

impl CommitStatusResolver {
    pub fn new(
        selector: BranchSelector,
        status_context_key: &'static str,
        default_label: &'static str,
    ) -> Self {
        let kind = if status_context_key == CONTEXT_UNLOCKED {
            "Unlocked Commit Status"
        } else {
            "Commit Status"
        };
        let branches = match selector {
            BranchSelector::ExactMatch => "Exact-Match",
            BranchSelector::ReleaseBranch { offset_start: 0, .. } => "Release Branch",
            BranchSelector::ReleaseBranch { .. } => "Previous Release Branch",
            BranchSelector::DefaultBranch => "Default Branch",
        };
        Self {
            name: format!("{} {} Resolver", branches, kind),
            selector,
            status_context_key,
            default_label,
        }
    }

    /// Second-generation package builds.
    pub fn two_gp(selector: BranchSelector) -> Self {
        Self::new(selector, CONTEXT_2GP, DEFAULT_2GP_LABEL)
    }

    /// Unlocked package builds.
    pub fn unlocked(selector: BranchSelector) -> Self {
        Self::new(selector, CONTEXT_UNLOCKED, DEFAULT_UNLOCKED_LABEL)
    }

    pub fn selector(&self) -> BranchSelector {
        self.selector
    }

    fn candidate_branches(
        &self,
        repo: &dyn VcsRepository,
        context: &ResolutionContext,
        remote_prefix: &str,
    ) -> Result<Vec<Branch>> {
        let (Some(local_branch), Some(local_prefix)) =
            (context.local_branch.as_deref(), context.feature_prefix.as_deref())
        else {
            return Ok(Vec::new());
        };

        let names: Vec<String> = match self.selector {
            BranchSelector::ExactMatch => match local_branch.strip_prefix(local_prefix) {
                Some(feature) => vec![format!("{}{}", remote_prefix, feature)],
                None => Vec::new(),
            },
            BranchSelector::ReleaseBranch {
                offset_start,
                offset_end,
            } => match release_identifier(local_branch, local_prefix) {
                Some(release_id) => (offset_start..offset_end)
                    .filter_map(|offset| release_id.checked_sub(offset))
                    .map(|id| construct_release_branch_name(remote_prefix, id))
                    .collect(),
                None => Vec::new(),
            },
            BranchSelector::DefaultBranch => vec![repo.default_branch()],
        };

        // A missing branch is a miss for every selector, the default branch
        // included, so the engine moves on to the next strategy.
        let mut branches = Vec::new();
        for name in names {
            match repo.branch(&name) {
                Ok(branch) => branches.push(branch),
                Err(err) if err.is_not_found() => {
                    info!(branch = %name, repo = %repo.full_name(), "Remote branch not found");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(branches)
    }
}

impl Resolver for CommitStatusResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_resolve(&self, _dependency: &DynamicDependency, context: &ResolutionContext) -> bool {
        let (Some(branch), Some(prefix)) =
            (context.local_branch.as_deref(), context.feature_prefix.as_deref())
        else {
            return false;
        };
        match self.selector {
            BranchSelector::ReleaseBranch { .. } => is_release_branch_or_child(branch, prefix),
            _ => true,
        }
    }

    fn resolve(
        &self,
        dependency: &DynamicDependency,
        context: &ResolutionContext,
    ) -> Result<Resolution> {
        let repo = context.repository(dependency.url()?)?;
        let default_config = repo.project_config(&repo.default_branch())?;
        let remote_prefix = default_config
            .feature_prefix_or(repo.branch_prefix())
            .to_string();
        let status_context = default_config
            .status_context(self.status_context_key, self.default_label)
            .to_string();

        for branch in self.candidate_branches(repo.as_ref(), context, &remote_prefix)? {
            let Some((version_id, commit)) =
                locate_package_version(repo.as_ref(), &branch, &status_context)?
            else {
                continue;
            };
            info!(
                resolver = %self.name,
                version_id = %version_id,
                branch = %branch.name,
                commit = %commit.sha,
                "Located package version"
            );
            let config = repo.project_config(&commit.sha)?;
            let package = StaticDependency::PackageVersionId(PackageVersionIdDependency {
                version_id,
                version_number: None,
                package_name: Some(config.package_name(&repo.repo_url().name)),
            });
            return Ok(Resolution::at(commit.sha, Some(package)));
        }

        warn!(resolver = %self.name, repo = %repo.clone_url(), "Did not locate a package version");
        Ok(Resolution::miss())
    }
}

/// Walk first parents from the branch head looking for a successful status
/// in `status_context` that names a package version.
fn locate_package_version(
    repo: &dyn VcsRepository,
    branch: &Branch,
    status_context: &str,
) -> Result<Option<(String, Commit)>> {
    let mut commit = repo.get_commit(&branch.head_sha)?;
    for _ in 0..MAX_COMMITS {
        let version_id = repo
            .commit_statuses(&commit)?
            .iter()
            .filter(|s| s.state == GitStatusState::Succeeded && s.context.name == status_context)
            .find_map(|s| version_id_from_description(&s.description));
        if let Some(version_id) = version_id {
            return Ok(Some((version_id, commit)));
        }

        let Some(parent) = commit.first_parent().map(str::to_string) else {
            break;
        };
        commit = repo.get_commit(&parent)?;
    }
    Ok(None)
}

fn version_id_from_description(description: &str) -> Option<String> {
    let (_, rest) = description.split_once("version_id:")?;
    rest.split_whitespace().next().map(str::to_string)
}

/// Release number of `branch`: `<prefix><digits>` or `<prefix><digits>__<child>`.
pub fn release_identifier(branch: &str, prefix: &str) -> Option<u32> {
    let rest = branch.strip_prefix(prefix)?;
    let id = rest.split_once("__").map_or(rest, |(id, _)| id);
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

pub fn is_release_branch_or_child(branch: &str, prefix: &str) -> bool {
    release_identifier(branch, prefix).is_some()
}

pub fn construct_release_branch_name(prefix: &str, release_id: u32) -> String {
    format!("{}{}", prefix, release_id)
}
