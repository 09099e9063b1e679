//! Host-independent values returned by `VcsRepository`.

use std::cell::OnceCell;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FeedScope;
use crate::host::{
    GitAnnotatedTag, GitBranchStats, GitCommit, GitPullRequest, GitRef, GitStatus,
    PullRequestMergeStatus, PullRequestStatus,
};
use crate::repo_url::sanitize_branch_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    Branch,
    Tag,
    Other,
}

/// Named pointer to a commit or annotated-tag object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub name: String,
    pub object_sha: String,
    /// Commit behind an annotated tag; `None` for lightweight tags
    pub peeled_commit_sha: Option<String>,
    pub kind: RefKind,
}

impl From<GitRef> for RepoRef {
    fn from(git_ref: GitRef) -> Self {
        let kind = if git_ref.name.starts_with("refs/tags/") {
            RefKind::Tag
        } else if git_ref.name.starts_with("refs/heads/") {
            RefKind::Branch
        } else {
            RefKind::Other
        };
        Self {
            name: git_ref.name,
            object_sha: git_ref.object_id,
            peeled_commit_sha: git_ref.peeled_object_id,
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageType {
    FirstGen,
    SecondGen,
}

/// Package identity recorded in an annotated tag message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDetails {
    pub version_id: Option<String>,
    pub package_type: Option<PackageType>,
}

impl PackageDetails {
    /// Read `version_id: <id>` and `package_type: 1GP|2GP` lines.
    pub fn from_message(message: &str) -> Self {
        let mut details = Self::default();
        for line in message.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "version_id" if !value.is_empty() => details.version_id = Some(value.to_string()),
                "package_type" => {
                    details.package_type = match value {
                        "1GP" => Some(PackageType::FirstGen),
                        "2GP" => Some(PackageType::SecondGen),
                        _ => None,
                    }
                }
                _ => {}
            }
        }
        details
    }
}

/// Annotated tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub message: String,
    /// Tag object id
    pub sha: String,
    pub tagged_commit_sha: String,
}

impl Tag {
    pub fn package_details(&self) -> PackageDetails {
        PackageDetails::from_message(&self.message)
    }
}

impl From<GitAnnotatedTag> for Tag {
    fn from(tag: GitAnnotatedTag) -> Self {
        Self {
            name: tag.name,
            message: tag.message,
            sha: tag.object_id,
            tagged_commit_sha: tag.tagged_object.object_id,
        }
    }
}

/// Commit; statuses are loaded on first request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
    pub tree_id: String,
    pub parent_shas: Vec<String>,
    pub(crate) statuses: OnceCell<Vec<GitStatus>>,
}

impl Commit {
    pub fn first_parent(&self) -> Option<&str> {
        self.parent_shas.first().map(String::as_str)
    }
}

impl From<GitCommit> for Commit {
    fn from(commit: GitCommit) -> Self {
        Self {
            sha: commit.commit_id,
            tree_id: commit.tree_id,
            parent_shas: commit.parents,
            statuses: OnceCell::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub head_sha: String,
}

impl From<GitBranchStats> for Branch {
    fn from(stats: GitBranchStats) -> Self {
        Self {
            name: sanitize_branch_name(&stats.name).to_string(),
            head_sha: stats.commit.commit_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: u64,
    pub title: String,
    pub body: String,
    /// Qualified source ref (`refs/heads/...`)
    pub source_ref: String,
    /// Qualified target ref
    pub target_ref: String,
    pub status: PullRequestStatus,
    pub merge_status: PullRequestMergeStatus,
    pub created_by: String,
    pub merge_commit_sha: Option<String>,
    pub labels: Vec<String>,
}

impl PullRequest {
    pub fn base_ref(&self) -> &str {
        sanitize_branch_name(&self.target_ref)
    }

    pub fn head_ref(&self) -> &str {
        sanitize_branch_name(&self.source_ref)
    }

    pub fn is_active(&self) -> bool {
        self.status == PullRequestStatus::Active
    }
}

impl From<GitPullRequest> for PullRequest {
    fn from(pr: GitPullRequest) -> Self {
        Self {
            id: pr.pull_request_id,
            title: pr.title,
            body: pr.description,
            source_ref: pr.source_ref_name,
            target_ref: pr.target_ref_name,
            status: pr.status,
            merge_status: pr.merge_status,
            created_by: pr.created_by.id,
            merge_commit_sha: pr.last_merge_commit.map(|c| c.commit_id),
            labels: pr.labels,
        }
    }
}

/// Result of the top-level `merge(base, head)` workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// An active pull request from head to base already existed.
    AlreadyOpen(PullRequest),
    /// Created and set to auto-complete.
    Completed(PullRequest),
    /// Could not merge cleanly and was abandoned.
    Abandoned(PullRequest),
    /// Could not merge cleanly and was left open for manual resolution.
    LeftOpen(PullRequest),
}

impl MergeOutcome {
    pub fn pull_request(&self) -> &PullRequest {
        match self {
            Self::AlreadyOpen(pr)
            | Self::Completed(pr)
            | Self::Abandoned(pr)
            | Self::LeftOpen(pr) => pr,
        }
    }
}

/// JSON stored in a package version's description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescription {
    pub tag_name: String,
    pub body: String,
}

/// One package version promoted into a feed view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    /// Normalized semver
    pub version_name: String,
    pub body: String,
    pub is_prerelease: bool,
    pub is_draft: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub view_membership: Vec<String>,
}

impl Release {
    pub fn version(&self) -> Option<semver::Version> {
        semver::Version::parse(&self.version_name).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFeed {
    pub id: String,
    pub name: String,
    pub scope: FeedScope,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub behind_by: u32,
    pub ahead_by: u32,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    File,
    Folder,
}
