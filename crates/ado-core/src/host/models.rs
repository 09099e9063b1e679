//! Wire models of the host's REST object model.
//!
//! Field names follow the host's camelCase JSON so a transport can
//! deserialize responses straight into these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project + repository a git call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoScope {
    pub project: String,
    pub repository: String,
}

impl RepoScope {
    pub fn new(project: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repository: repository.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProjectReference {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project: Option<TeamProjectReference>,
    /// Fully qualified, e.g. `refs/heads/main`
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub ssh_url: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRef {
    pub name: String,
    pub object_id: String,
    /// Commit an annotated tag points at; absent for lightweight tags
    #[serde(default)]
    pub peeled_object_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitObject {
    pub object_id: String,
    #[serde(default = "default_object_type")]
    pub object_type: String,
}

fn default_object_type() -> String {
    "commit".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitAnnotatedTag {
    pub name: String,
    /// Identity of the tag object itself
    pub object_id: String,
    #[serde(default)]
    pub message: String,
    pub tagged_object: GitObject,
}

/// Request body for creating an annotated tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotatedTag {
    pub name: String,
    pub message: String,
    pub tagged_object: GitObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommitRef {
    pub commit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitBranchStats {
    pub name: String,
    pub commit: GitCommitRef,
    #[serde(default)]
    pub ahead_count: u32,
    #[serde(default)]
    pub behind_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommit {
    pub commit_id: String,
    pub tree_id: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GitStatusState {
    NotSet,
    Pending,
    Succeeded,
    Failed,
    Error,
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitStatusContext {
    pub name: String,
    #[serde(default)]
    pub genre: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitStatus {
    pub context: GitStatusContext,
    pub state: GitStatusState,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitChange {
    pub path: String,
    pub change_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitCommitDiffs {
    #[serde(default)]
    pub ahead_count: u32,
    #[serde(default)]
    pub behind_count: u32,
    #[serde(default)]
    pub changes: Vec<GitChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRef {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PullRequestStatus {
    Active,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PullRequestMergeStatus {
    NotSet,
    Queued,
    Conflicts,
    Succeeded,
    RejectedByPolicy,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    #[default]
    NoFastForward,
    Squash,
    Rebase,
    RebaseMerge,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    #[serde(default)]
    pub delete_source_branch: bool,
    #[serde(default)]
    pub merge_strategy: MergeStrategy,
    #[serde(default)]
    pub bypass_policy: bool,
    #[serde(default)]
    pub bypass_reason: Option<String>,
    #[serde(default)]
    pub merge_commit_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitPullRequest {
    pub pull_request_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub source_ref_name: String,
    pub target_ref_name: String,
    pub status: PullRequestStatus,
    pub merge_status: PullRequestMergeStatus,
    pub created_by: IdentityRef,
    #[serde(default)]
    pub last_merge_commit: Option<GitCommitRef>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub auto_complete_set_by: Option<IdentityRef>,
    #[serde(default)]
    pub completion_options: Option<CompletionOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPullRequest {
    pub title: String,
    pub description: String,
    pub source_ref_name: String,
    pub target_ref_name: String,
}

/// Partial update; `None` fields are left untouched by the host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PullRequestStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_complete_set_by: Option<IdentityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_options: Option<CompletionOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestSearch {
    #[serde(default)]
    pub status: Option<PullRequestStatus>,
    #[serde(default)]
    pub source_ref_name: Option<String>,
    #[serde(default)]
    pub target_ref_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView {
    pub id: String,
    pub name: String,
    #[serde(default = "default_view_type", rename = "type")]
    pub view_type: String,
}

fn default_view_type() -> String {
    "release".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersion {
    pub id: String,
    /// Normalized semver string
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub views: Vec<FeedView>,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub versions: Vec<PackageVersion>,
}

/// Promote a package version into a view (JSON-patch `add /views/-`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageVersionUpdate {
    pub add_to_view: String,
}

/// Upload of a directory as a new universal-package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub feed: String,
    pub project: Option<String>,
    pub package_name: String,
    pub version: String,
    pub description: String,
    pub path: std::path::PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitItem {
    pub path: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub object_id: Option<String>,
}
