//! Capability surface of the host's REST API.
//!
//! The adapter calls into a `HostClient`; the HTTP transport and
//! authentication behind it live outside this crate. `memory::MemoryHost`
//! is a scripted implementation used by tests and embedders.

pub mod memory;
pub mod models;

use thiserror::Error;

use crate::error::VcsError;

pub use models::*;

/// Failure reported by a host client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("{0}")]
    NotFound(String),

    #[error("HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl HostError {
    /// Transient contention while the artifact tool renames its staging files.
    pub fn is_rename_contention(&self) -> bool {
        matches!(self, Self::Rejected { status: 409, message } if message.contains("rename"))
    }
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Attach operation and target context to host failures.
pub trait HostResultExt<T> {
    fn context(self, operation: &str, target: impl std::fmt::Display) -> crate::Result<T>;
}

impl<T> HostResultExt<T> for HostResult<T> {
    fn context(self, operation: &str, target: impl std::fmt::Display) -> crate::Result<T> {
        self.map_err(|err| match err {
            HostError::NotFound(message) => {
                VcsError::NotFound(format!("{} '{}': {}", operation, target, message))
            }
            HostError::Rejected { .. } => VcsError::Client {
                operation: operation.to_string(),
                target: target.to_string(),
                message: err.to_string(),
            },
        })
    }
}

/// Operations the adapter needs from one authenticated host connection.
pub trait HostClient: std::fmt::Debug {
    // Repositories and refs
    fn get_repository(&self, project: &str, name: &str) -> HostResult<GitRepository>;
    fn get_refs(&self, scope: &RepoScope, filter: &str) -> HostResult<Vec<GitRef>>;
    fn get_branch(&self, scope: &RepoScope, name: &str) -> HostResult<GitBranchStats>;
    fn get_branches(&self, scope: &RepoScope) -> HostResult<Vec<GitBranchStats>>;

    // Commits
    fn get_commit(&self, scope: &RepoScope, sha: &str) -> HostResult<GitCommit>;
    fn get_commit_diffs(
        &self,
        scope: &RepoScope,
        base: &str,
        target: &str,
    ) -> HostResult<GitCommitDiffs>;
    fn get_commit_statuses(&self, scope: &RepoScope, sha: &str) -> HostResult<Vec<GitStatus>>;
    fn create_commit_status(
        &self,
        scope: &RepoScope,
        sha: &str,
        status: GitStatus,
    ) -> HostResult<GitStatus>;

    // Pull requests
    fn create_pull_request(
        &self,
        scope: &RepoScope,
        request: NewPullRequest,
    ) -> HostResult<GitPullRequest>;
    fn get_pull_request(&self, scope: &RepoScope, id: u64) -> HostResult<GitPullRequest>;
    fn get_pull_requests(
        &self,
        scope: &RepoScope,
        search: &PullRequestSearch,
    ) -> HostResult<Vec<GitPullRequest>>;
    fn update_pull_request(
        &self,
        scope: &RepoScope,
        id: u64,
        update: PullRequestUpdate,
    ) -> HostResult<GitPullRequest>;

    // Annotated tags
    fn get_annotated_tag(&self, scope: &RepoScope, object_id: &str)
    -> HostResult<GitAnnotatedTag>;
    fn create_annotated_tag(
        &self,
        scope: &RepoScope,
        tag: NewAnnotatedTag,
    ) -> HostResult<GitAnnotatedTag>;

    // Feeds and packages; `project` is `None` for organization-scoped feeds
    fn get_feed(&self, project: Option<&str>, name: &str) -> HostResult<Feed>;
    fn create_feed(&self, project: Option<&str>, name: &str) -> HostResult<Feed>;
    fn get_feed_view(&self, project: Option<&str>, feed_id: &str, name: &str)
    -> HostResult<FeedView>;
    fn create_feed_view(
        &self,
        project: Option<&str>,
        feed_id: &str,
        name: &str,
    ) -> HostResult<FeedView>;
    fn get_packages(&self, project: Option<&str>, feed_id: &str) -> HostResult<Vec<Package>>;
    fn get_package_versions(
        &self,
        project: Option<&str>,
        feed_id: &str,
        package_id: &str,
    ) -> HostResult<Vec<PackageVersion>>;
    fn get_package_version(
        &self,
        project: Option<&str>,
        feed_id: &str,
        package_id: &str,
        version_id: &str,
    ) -> HostResult<PackageVersion>;
    fn update_package_version(
        &self,
        project: Option<&str>,
        feed_id: &str,
        package_name: &str,
        version: &str,
        update: PackageVersionUpdate,
    ) -> HostResult<()>;
    fn publish_package(&self, request: &PublishRequest) -> HostResult<PackageVersion>;

    // Content; `version` is a branch name or commit sha
    fn get_tree_zip(&self, scope: &RepoScope, tree_id: &str) -> HostResult<Vec<u8>>;
    fn get_items(&self, scope: &RepoScope, path: &str, version: &str)
    -> HostResult<Vec<GitItem>>;
    fn get_item_content(&self, scope: &RepoScope, path: &str, version: &str)
    -> HostResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found_with_target() {
        let result: HostResult<()> = Err(HostError::NotFound("no such ref".to_string()));
        let err = result.context("get_refs", "tags/v1").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("tags/v1"));
    }

    #[test]
    fn rejection_maps_to_client_error() {
        let result: HostResult<()> = Err(HostError::Rejected {
            status: 401,
            message: "unauthorized".to_string(),
        });
        match result.context("get_feed", "releases").unwrap_err() {
            VcsError::Client {
                operation, target, ..
            } => {
                assert_eq!(operation, "get_feed");
                assert_eq!(target, "releases");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rename_contention_is_detected() {
        let err = HostError::Rejected {
            status: 409,
            message: "failed to rename staging file".to_string(),
        };
        assert!(err.is_rename_contention());
        assert!(!HostError::NotFound("x".to_string()).is_rename_contention());
    }
}
