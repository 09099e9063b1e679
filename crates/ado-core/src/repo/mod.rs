//! Repository adapter.
//!
//! `VcsRepository` is the uniform contract the resolution engine and the
//! dependency model work against. `AdoRepository` implements it over a
//! `HostClient`, mapping annotated tags, the feed/package-version hierarchy
//! and pull-request merge policies onto that contract.

mod content;
pub mod models;
mod pull;
mod refs;
mod release;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::config::remote::DEFAULT_FEATURE_PREFIX;
use crate::config::{AdoSettings, RemoteProjectConfig};
use crate::error::Result;
use crate::host::{
    GitRepository, GitStatus, GitStatusState, HostClient, HostResultExt, PullRequestStatus,
    RepoScope,
};
use crate::repo_url::{RepoUrl, parse_repo_url, sanitize_branch_name};
use crate::version::VersionNormalizer;

pub use models::*;

/// Uniform capability surface of a hosted repository.
pub trait VcsRepository: std::fmt::Debug {
    /// `owner/project/name`
    fn full_name(&self) -> String;
    fn clone_url(&self) -> &str;
    fn repo_url(&self) -> &RepoUrl;
    fn default_branch(&self) -> String;
    /// The host tracks work items, not issues.
    fn has_issues(&self) -> bool {
        false
    }
    /// Feature-branch prefix assumed when the project config names none.
    fn branch_prefix(&self) -> &str {
        DEFAULT_FEATURE_PREFIX
    }

    fn get_ref_for_tag(&self, tag_name: &str) -> Result<RepoRef>;
    fn get_tag_by_ref(&self, git_ref: &RepoRef, tag_name: Option<&str>) -> Result<Tag>;
    fn create_tag(&self, tag_name: &str, message: &str, sha: &str) -> Result<Tag>;

    fn branch(&self, name: &str) -> Result<Branch>;
    fn refresh_branch(&self, branch: &Branch) -> Result<Branch>;
    fn branches(&self) -> Result<Vec<Branch>>;
    fn get_commit(&self, sha: &str) -> Result<Commit>;
    fn commit_statuses(&self, commit: &Commit) -> Result<Vec<GitStatus>>;
    fn create_commit_status(
        &self,
        sha: &str,
        context: &str,
        state: GitStatusState,
        description: &str,
        target_url: Option<&str>,
    ) -> Result<GitStatus>;
    fn compare_commits(&self, base: &str, head: &str) -> Result<Comparison>;

    fn pull_requests(
        &self,
        status: Option<PullRequestStatus>,
        base: Option<&str>,
        head: Option<&str>,
    ) -> Result<Vec<PullRequest>>;
    fn create_pull(
        &self,
        title: &str,
        base: &str,
        head: &str,
        body: Option<&str>,
    ) -> Result<PullRequest>;
    fn get_pull_request(&self, id: u64) -> Result<PullRequest>;
    fn update_pull_request(&self, id: u64, status: PullRequestStatus) -> Result<PullRequest>;
    fn abandon_pull_request(&self, id: u64) -> Result<PullRequest>;
    fn can_auto_merge(&self, pull_request: &PullRequest) -> Result<bool>;
    fn complete_pull_request(
        &self,
        pull_request: &PullRequest,
        message: Option<&str>,
    ) -> Result<PullRequest>;
    fn merge(&self, base: &str, head: &str, message: Option<&str>) -> Result<MergeOutcome>;
    fn get_pull_requests_by_commit(&self, sha: &str) -> Result<Vec<PullRequest>>;
    fn get_pr_issue_labels(&self, pull_request: &PullRequest) -> Vec<String>;

    fn create_release(&self, tag_name: &str, body: &str, prerelease: bool) -> Result<Release>;
    fn releases(&self) -> Result<Vec<Release>>;
    fn release_from_tag(&self, tag_name: &str) -> Result<Release>;
    fn latest_release(&self) -> Result<Option<Release>>;
    fn get_latest_artifact(&self, prerelease: bool) -> Result<Option<Release>>;

    fn directory_contents(&self, path: &str, git_ref: &str) -> Result<BTreeMap<String, ItemKind>>;
    fn file_contents(&self, path: &str, git_ref: &str) -> Result<String>;
    fn archive(&self, git_ref: &str, dest: &Path) -> Result<PathBuf>;
    fn project_config(&self, git_ref: &str) -> Result<RemoteProjectConfig>;
}

/// Repository adapter over one host connection.
#[derive(Debug)]
pub struct AdoRepository {
    client: Rc<dyn HostClient>,
    url: RepoUrl,
    clone_url: String,
    settings: AdoSettings,
    normalizer: VersionNormalizer,
    repository: GitRepository,
    scope: RepoScope,
    /// Active pull requests by head branch, built on first `merge`
    open_pulls: RefCell<Option<HashMap<String, Vec<PullRequest>>>>,
    feed: RefCell<Option<PackageFeed>>,
    configs: RefCell<HashMap<String, RemoteProjectConfig>>,
}

impl AdoRepository {
    /// Look up the repository behind `url` and bind the adapter to it.
    pub fn connect(client: Rc<dyn HostClient>, url: &str, settings: AdoSettings) -> Result<Self> {
        let parsed = parse_repo_url(url)?;
        let project = parsed.project_or_name().to_string();
        let repository = client
            .get_repository(&project, &parsed.name)
            .context("get_repository", parsed.full_name())?;
        debug!(repo = %parsed.full_name(), id = %repository.id, "Connected to repository");

        let scope = RepoScope::new(project, repository.id.clone());
        let normalizer = VersionNormalizer::new(settings.build_label.clone());
        Ok(Self {
            client,
            url: parsed,
            clone_url: url.to_string(),
            settings,
            normalizer,
            repository,
            scope,
            open_pulls: RefCell::new(None),
            feed: RefCell::new(None),
            configs: RefCell::new(HashMap::new()),
        })
    }

    pub fn settings(&self) -> &AdoSettings {
        &self.settings
    }

    pub fn scope(&self) -> &RepoScope {
        &self.scope
    }

    pub fn project_id(&self) -> Option<&str> {
        self.repository.project.as_ref().map(|p| p.id.as_str())
    }

    fn client(&self) -> &dyn HostClient {
        self.client.as_ref()
    }
}

impl VcsRepository for AdoRepository {
    fn full_name(&self) -> String {
        self.url.full_name()
    }

    fn clone_url(&self) -> &str {
        &self.clone_url
    }

    fn repo_url(&self) -> &RepoUrl {
        &self.url
    }

    fn default_branch(&self) -> String {
        self.repository
            .default_branch
            .as_deref()
            .map(sanitize_branch_name)
            .unwrap_or("main")
            .to_string()
    }

    fn branch_prefix(&self) -> &str {
        &self.settings.branch_prefix
    }

    fn get_ref_for_tag(&self, tag_name: &str) -> Result<RepoRef> {
        Self::get_ref_for_tag(self, tag_name)
    }

    fn get_tag_by_ref(&self, git_ref: &RepoRef, tag_name: Option<&str>) -> Result<Tag> {
        Self::get_tag_by_ref(self, git_ref, tag_name)
    }

    fn create_tag(&self, tag_name: &str, message: &str, sha: &str) -> Result<Tag> {
        Self::create_tag(self, tag_name, message, sha)
    }

    fn branch(&self, name: &str) -> Result<Branch> {
        Self::branch(self, name)
    }

    fn refresh_branch(&self, branch: &Branch) -> Result<Branch> {
        Self::branch(self, &branch.name)
    }

    fn branches(&self) -> Result<Vec<Branch>> {
        Self::branches(self)
    }

    fn get_commit(&self, sha: &str) -> Result<Commit> {
        Self::get_commit(self, sha)
    }

    fn commit_statuses(&self, commit: &Commit) -> Result<Vec<GitStatus>> {
        Self::commit_statuses(self, commit)
    }

    fn create_commit_status(
        &self,
        sha: &str,
        context: &str,
        state: GitStatusState,
        description: &str,
        target_url: Option<&str>,
    ) -> Result<GitStatus> {
        Self::create_commit_status(self, sha, context, state, description, target_url)
    }

    fn compare_commits(&self, base: &str, head: &str) -> Result<Comparison> {
        Self::compare_commits(self, base, head)
    }

    fn pull_requests(
        &self,
        status: Option<PullRequestStatus>,
        base: Option<&str>,
        head: Option<&str>,
    ) -> Result<Vec<PullRequest>> {
        Self::pull_requests(self, status, base, head)
    }

    fn create_pull(
        &self,
        title: &str,
        base: &str,
        head: &str,
        body: Option<&str>,
    ) -> Result<PullRequest> {
        Self::create_pull(self, title, base, head, body)
    }

    fn get_pull_request(&self, id: u64) -> Result<PullRequest> {
        Self::get_pull_request(self, id)
    }

    fn update_pull_request(&self, id: u64, status: PullRequestStatus) -> Result<PullRequest> {
        Self::update_pull_request(self, id, status)
    }

    fn abandon_pull_request(&self, id: u64) -> Result<PullRequest> {
        Self::update_pull_request(self, id, PullRequestStatus::Abandoned)
    }

    fn can_auto_merge(&self, pull_request: &PullRequest) -> Result<bool> {
        Self::can_auto_merge(self, pull_request)
    }

    fn complete_pull_request(
        &self,
        pull_request: &PullRequest,
        message: Option<&str>,
    ) -> Result<PullRequest> {
        Self::complete_pull_request(self, pull_request, message)
    }

    fn merge(&self, base: &str, head: &str, message: Option<&str>) -> Result<MergeOutcome> {
        Self::merge(self, base, head, message)
    }

    fn get_pull_requests_by_commit(&self, sha: &str) -> Result<Vec<PullRequest>> {
        Self::get_pull_requests_by_commit(self, sha)
    }

    fn get_pr_issue_labels(&self, pull_request: &PullRequest) -> Vec<String> {
        pull_request.labels.clone()
    }

    fn create_release(&self, tag_name: &str, body: &str, prerelease: bool) -> Result<Release> {
        Self::create_release(self, tag_name, body, prerelease)
    }

    fn releases(&self) -> Result<Vec<Release>> {
        Self::releases(self)
    }

    fn release_from_tag(&self, tag_name: &str) -> Result<Release> {
        Self::release_from_tag(self, tag_name)
    }

    fn latest_release(&self) -> Result<Option<Release>> {
        Self::get_latest_artifact(self, false)
    }

    fn get_latest_artifact(&self, prerelease: bool) -> Result<Option<Release>> {
        Self::get_latest_artifact(self, prerelease)
    }

    fn directory_contents(&self, path: &str, git_ref: &str) -> Result<BTreeMap<String, ItemKind>> {
        Self::directory_contents(self, path, git_ref)
    }

    fn file_contents(&self, path: &str, git_ref: &str) -> Result<String> {
        Self::file_contents(self, path, git_ref)
    }

    fn archive(&self, git_ref: &str, dest: &Path) -> Result<PathBuf> {
        Self::archive(self, git_ref, dest)
    }

    fn project_config(&self, git_ref: &str) -> Result<RemoteProjectConfig> {
        Self::project_config(self, git_ref)
    }
}
