//! Refs, tags, branches, commits and commit statuses.

use tracing::{debug, info};

use super::AdoRepository;
use super::models::{Branch, Commit, Comparison, RepoRef, Tag};
use crate::error::{Result, VcsError};
use crate::host::{
    GitObject, GitStatus, GitStatusContext, GitStatusState, HostResultExt, NewAnnotatedTag,
};
use crate::repo_url::sanitize_branch_name;

/// True for a full 40-character hex object id.
pub fn is_commit_sha(value: &str) -> bool {
    value.len() == 40 && value.chars().all(|c| c.is_ascii_hexdigit())
}

impl AdoRepository {
    /// The single ref named `refs/tags/<tag_name>`.
    pub(crate) fn get_ref_for_tag(&self, tag_name: &str) -> Result<RepoRef> {
        let filter = format!("tags/{}", tag_name);
        let full_name = format!("refs/{}", filter);
        let mut matches: Vec<RepoRef> = self
            .client()
            .get_refs(&self.scope, &filter)
            .context("get_refs", &filter)?
            .into_iter()
            .filter(|r| r.name == full_name)
            .map(RepoRef::from)
            .collect();

        if matches.len() != 1 {
            return Err(VcsError::not_found(format!(
                "Could not find reference for '{}' on {} ({} matches)",
                filter,
                self.full_name_internal(),
                matches.len()
            )));
        }
        Ok(matches.remove(0))
    }

    /// Annotated tag object behind `git_ref`.
    pub(crate) fn get_tag_by_ref(&self, git_ref: &RepoRef, tag_name: Option<&str>) -> Result<Tag> {
        let tag_name = tag_name.unwrap_or(&git_ref.name);
        if git_ref.peeled_commit_sha.is_none() {
            return Err(VcsError::not_found(format!(
                "Could not find tag '{}' with SHA {}\n{} is not an annotated tag.",
                tag_name, git_ref.object_sha, tag_name
            )));
        }

        let tag = self
            .client()
            .get_annotated_tag(&self.scope, &git_ref.object_sha)
            .context("get_annotated_tag", tag_name)?;
        Ok(tag.into())
    }

    pub(crate) fn create_tag(&self, tag_name: &str, message: &str, sha: &str) -> Result<Tag> {
        let request = NewAnnotatedTag {
            name: tag_name.to_string(),
            message: message.to_string(),
            tagged_object: GitObject {
                object_id: sha.to_string(),
                object_type: "commit".to_string(),
            },
        };
        let tag = self
            .client()
            .create_annotated_tag(&self.scope, request)
            .context("create_annotated_tag", tag_name)?;
        info!(tag = tag_name, commit = sha, "Created annotated tag");
        Ok(tag.into())
    }

    pub(crate) fn branch(&self, name: &str) -> Result<Branch> {
        let name = sanitize_branch_name(name);
        let stats = self
            .client()
            .get_branch(&self.scope, name)
            .context("get_branch", name)?;
        Ok(Branch {
            name: name.to_string(),
            head_sha: stats.commit.commit_id,
        })
    }

    pub(crate) fn branches(&self) -> Result<Vec<Branch>> {
        let branches = self
            .client()
            .get_branches(&self.scope)
            .context("get_branches", self.full_name_internal())?;
        Ok(branches.into_iter().map(Branch::from).collect())
    }

    pub(crate) fn get_commit(&self, sha: &str) -> Result<Commit> {
        let commit = self
            .client()
            .get_commit(&self.scope, sha)
            .context("get_commit", sha)?;
        Ok(commit.into())
    }

    /// Statuses of `commit`, fetched once and kept on the commit.
    pub(crate) fn commit_statuses(&self, commit: &Commit) -> Result<Vec<GitStatus>> {
        if let Some(statuses) = commit.statuses.get() {
            return Ok(statuses.clone());
        }
        let statuses = self
            .client()
            .get_commit_statuses(&self.scope, &commit.sha)
            .context("get_commit_statuses", &commit.sha)?;
        debug!(commit = %commit.sha, count = statuses.len(), "Loaded commit statuses");
        let _ = commit.statuses.set(statuses.clone());
        Ok(statuses)
    }

    pub(crate) fn create_commit_status(
        &self,
        sha: &str,
        context: &str,
        state: GitStatusState,
        description: &str,
        target_url: Option<&str>,
    ) -> Result<GitStatus> {
        let status = GitStatus {
            context: GitStatusContext {
                name: context.to_string(),
                genre: None,
            },
            state,
            description: description.to_string(),
            target_url: target_url.map(str::to_string),
        };
        let created = self
            .client()
            .create_commit_status(&self.scope, sha, status)
            .context("create_commit_status", sha)?;
        info!(commit = sha, context, "Recorded commit status");
        Ok(created)
    }

    pub(crate) fn compare_commits(&self, base: &str, head: &str) -> Result<Comparison> {
        let diffs = self
            .client()
            .get_commit_diffs(&self.scope, base, head)
            .context("get_commit_diffs", format!("{}...{}", base, head))?;
        Ok(Comparison {
            behind_by: diffs.behind_count,
            ahead_by: diffs.ahead_count,
            files: diffs.changes.into_iter().map(|c| c.path).collect(),
        })
    }

    /// Commit sha behind a commit id, branch name or tag name.
    pub(crate) fn resolve_commit_sha(&self, git_ref: &str) -> Result<String> {
        if is_commit_sha(git_ref) {
            return Ok(git_ref.to_string());
        }
        match self.branch(git_ref) {
            Ok(branch) => return Ok(branch.head_sha),
            Err(err) if !err.is_not_found() => return Err(err),
            Err(_) => {}
        }
        let tag_name = git_ref.strip_prefix("refs/tags/").unwrap_or(git_ref);
        let tag_ref = self.get_ref_for_tag(tag_name)?;
        Ok(tag_ref.peeled_commit_sha.unwrap_or(tag_ref.object_sha))
    }

    pub(super) fn full_name_internal(&self) -> String {
        self.url.full_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_sha_detection() {
        assert!(is_commit_sha("0123456789abcdef0123456789abcdef01234567"));
        assert!(!is_commit_sha("feature/0123456789abcdef0123456789abcdef01"));
        assert!(!is_commit_sha("main"));
    }
}
