//! Scripted in-memory host.
//!
//! Holds repositories, refs, commits, pull requests, feeds and file content
//! in memory and counts calls per operation. Pull-request merge status can
//! be scripted as a sequence so polling behaviour is observable.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::models::*;
use super::{HostClient, HostError, HostResult};

#[derive(Debug, Default)]
struct MemoryState {
    repositories: Vec<GitRepository>,
    refs: Vec<GitRef>,
    tags: HashMap<String, GitAnnotatedTag>,
    branches: BTreeMap<String, String>,
    commits: HashMap<String, GitCommit>,
    statuses: HashMap<String, Vec<GitStatus>>,
    diffs: HashMap<(String, String), GitCommitDiffs>,
    pull_requests: Vec<GitPullRequest>,
    merge_scripts: HashMap<u64, VecDeque<PullRequestMergeStatus>>,
    merge_script_for_new: Vec<PullRequestMergeStatus>,
    feeds: Vec<Feed>,
    views: Vec<(String, FeedView)>,
    packages: Vec<(String, Package)>,
    published: Vec<PublishRequest>,
    files: HashMap<String, BTreeMap<String, String>>,
    trees: HashMap<String, Vec<u8>>,
    failures: HashMap<&'static str, (usize, HostError)>,
    calls: HashMap<&'static str, usize>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn record(&mut self, operation: &'static str) -> HostResult<()> {
        *self.calls.entry(operation).or_default() += 1;
        if let Some((remaining, err)) = self.failures.get_mut(operation)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(err.clone());
        }
        Ok(())
    }
}

/// In-memory `HostClient`.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: RefCell<MemoryState>,
}

fn not_found(what: impl std::fmt::Display) -> HostError {
    HostError::NotFound(format!("{} not found", what))
}

fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository; ids are derived from the names.
    pub fn add_repository(&self, project: &str, name: &str, default_branch: &str) {
        let repo = GitRepository {
            id: format!("repo-{}", name),
            name: name.to_string(),
            project: Some(TeamProjectReference {
                id: format!("project-{}", project),
                name: project.to_string(),
            }),
            default_branch: Some(format!("refs/heads/{}", default_branch)),
            remote_url: Some(format!(
                "https://dev.azure.com/org/{}/_git/{}",
                project, name
            )),
            ssh_url: Some(format!("git@ssh.dev.azure.com:v3/org/{}/{}", project, name)),
            web_url: None,
        };
        self.state.borrow_mut().repositories.push(repo);
    }

    /// Add a commit with a derived tree id.
    pub fn add_commit(&self, sha: &str, parents: &[&str]) {
        let commit = GitCommit {
            commit_id: sha.to_string(),
            tree_id: format!("tree-{}", sha),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            comment: String::new(),
        };
        self.state
            .borrow_mut()
            .commits
            .insert(sha.to_string(), commit);
    }

    pub fn add_branch(&self, name: &str, head_sha: &str) {
        self.state
            .borrow_mut()
            .branches
            .insert(name.to_string(), head_sha.to_string());
    }

    pub fn add_ref(&self, name: &str, object_id: &str, peeled: Option<&str>) {
        self.state.borrow_mut().refs.push(GitRef {
            name: name.to_string(),
            object_id: object_id.to_string(),
            peeled_object_id: peeled.map(str::to_string),
        });
    }

    /// Add an annotated tag object plus its `refs/tags/<name>` ref.
    pub fn add_annotated_tag(&self, name: &str, object_id: &str, commit: &str, message: &str) {
        self.add_ref(&format!("refs/tags/{}", name), object_id, Some(commit));
        self.state.borrow_mut().tags.insert(
            object_id.to_string(),
            GitAnnotatedTag {
                name: name.to_string(),
                object_id: object_id.to_string(),
                message: message.to_string(),
                tagged_object: GitObject {
                    object_id: commit.to_string(),
                    object_type: "commit".to_string(),
                },
            },
        );
    }

    pub fn add_status(&self, sha: &str, context: &str, state: GitStatusState, description: &str) {
        self.state
            .borrow_mut()
            .statuses
            .entry(sha.to_string())
            .or_default()
            .push(GitStatus {
                context: GitStatusContext {
                    name: context.to_string(),
                    genre: None,
                },
                state,
                description: description.to_string(),
                target_url: None,
            });
    }

    pub fn set_diffs(&self, base: &str, target: &str, diffs: GitCommitDiffs) {
        self.state
            .borrow_mut()
            .diffs
            .insert((base.to_string(), target.to_string()), diffs);
    }

    /// Store a file at `path` for `version` (branch name or commit sha).
    pub fn add_file(&self, version: &str, path: &str, content: &str) {
        self.state
            .borrow_mut()
            .files
            .entry(version.to_string())
            .or_default()
            .insert(normalize_path(path), content.to_string());
    }

    pub fn set_tree_zip(&self, tree_id: &str, bytes: Vec<u8>) {
        self.state
            .borrow_mut()
            .trees
            .insert(tree_id.to_string(), bytes);
    }

    /// Insert an existing pull request.
    pub fn add_pull_request(&self, pull_request: GitPullRequest) {
        let mut state = self.state.borrow_mut();
        state.next_id = state.next_id.max(pull_request.pull_request_id);
        state.pull_requests.push(pull_request);
    }

    /// Merge-status sequence reported by successive polls of every pull
    /// request created from now on. The last entry repeats.
    pub fn script_merge_status(&self, statuses: &[PullRequestMergeStatus]) {
        self.state.borrow_mut().merge_script_for_new = statuses.to_vec();
    }

    pub fn add_feed(&self, project: Option<&str>, name: &str) -> Feed {
        let mut state = self.state.borrow_mut();
        let feed = Feed {
            id: state.next_id("feed"),
            name: name.to_string(),
            project: project.map(str::to_string),
        };
        state.feeds.push(feed.clone());
        feed
    }

    pub fn add_feed_view(&self, feed_id: &str, name: &str) -> FeedView {
        let mut state = self.state.borrow_mut();
        let view = FeedView {
            id: state.next_id("view"),
            name: name.to_string(),
            view_type: "release".to_string(),
        };
        state.views.push((feed_id.to_string(), view.clone()));
        view
    }

    /// Add a package version directly, already promoted into `views`.
    pub fn add_package_version(
        &self,
        feed_id: &str,
        package_name: &str,
        version: &str,
        description: Option<&str>,
        views: &[&str],
    ) {
        let mut state = self.state.borrow_mut();
        let view_objects: Vec<FeedView> = views
            .iter()
            .map(|name| FeedView {
                id: format!("view-{}", name),
                name: name.to_string(),
                view_type: "release".to_string(),
            })
            .collect();
        let version = PackageVersion {
            id: state.next_id("version"),
            version: version.to_string(),
            description: description.map(str::to_string),
            views: view_objects,
            publish_date: Some(chrono::Utc::now()),
        };
        let package_id = state.next_id("package");
        match state
            .packages
            .iter_mut()
            .find(|(feed, p)| feed == feed_id && p.name == package_name)
        {
            Some((_, package)) => package.versions.push(version),
            None => state.packages.push((
                feed_id.to_string(),
                Package {
                    id: package_id,
                    name: package_name.to_string(),
                    versions: vec![version],
                },
            )),
        }
    }

    /// Fail the next `times` calls of `operation` with `err`.
    pub fn fail(&self, operation: &'static str, times: usize, err: HostError) {
        self.state
            .borrow_mut()
            .failures
            .insert(operation, (times, err));
    }

    /// Number of calls made to `operation`.
    pub fn calls(&self, operation: &str) -> usize {
        self.state
            .borrow()
            .calls
            .get(operation)
            .copied()
            .unwrap_or_default()
    }

    pub fn pull_requests(&self) -> Vec<GitPullRequest> {
        self.state.borrow().pull_requests.clone()
    }

    pub fn published(&self) -> Vec<PublishRequest> {
        self.state.borrow().published.clone()
    }

    pub fn feeds(&self) -> Vec<Feed> {
        self.state.borrow().feeds.clone()
    }

    pub fn statuses(&self, sha: &str) -> Vec<GitStatus> {
        self.state
            .borrow()
            .statuses
            .get(sha)
            .cloned()
            .unwrap_or_default()
    }

    pub fn package_versions(&self, package_name: &str) -> Vec<PackageVersion> {
        self.state
            .borrow()
            .packages
            .iter()
            .filter(|(_, p)| p.name == package_name)
            .flat_map(|(_, p)| p.versions.clone())
            .collect()
    }
}

impl HostClient for MemoryHost {
    fn get_repository(&self, project: &str, name: &str) -> HostResult<GitRepository> {
        let mut state = self.state.borrow_mut();
        state.record("get_repository")?;
        state
            .repositories
            .iter()
            .find(|r| {
                r.name == name
                    && r.project
                        .as_ref()
                        .is_some_and(|p| p.name == project || p.id == project)
            })
            .cloned()
            .ok_or_else(|| not_found(format!("repository {}/{}", project, name)))
    }

    fn get_refs(&self, _scope: &RepoScope, filter: &str) -> HostResult<Vec<GitRef>> {
        let mut state = self.state.borrow_mut();
        state.record("get_refs")?;
        let prefix = format!("refs/{}", filter);
        Ok(state
            .refs
            .iter()
            .filter(|r| r.name.starts_with(&prefix))
            .cloned()
            .collect())
    }

    fn get_branch(&self, _scope: &RepoScope, name: &str) -> HostResult<GitBranchStats> {
        let mut state = self.state.borrow_mut();
        state.record("get_branch")?;
        state
            .branches
            .get(name)
            .map(|sha| GitBranchStats {
                name: name.to_string(),
                commit: GitCommitRef {
                    commit_id: sha.clone(),
                },
                ahead_count: 0,
                behind_count: 0,
            })
            .ok_or_else(|| not_found(format!("branch {}", name)))
    }

    fn get_branches(&self, _scope: &RepoScope) -> HostResult<Vec<GitBranchStats>> {
        let mut state = self.state.borrow_mut();
        state.record("get_branches")?;
        Ok(state
            .branches
            .iter()
            .map(|(name, sha)| GitBranchStats {
                name: name.clone(),
                commit: GitCommitRef {
                    commit_id: sha.clone(),
                },
                ahead_count: 0,
                behind_count: 0,
            })
            .collect())
    }

    fn get_commit(&self, _scope: &RepoScope, sha: &str) -> HostResult<GitCommit> {
        let mut state = self.state.borrow_mut();
        state.record("get_commit")?;
        state
            .commits
            .get(sha)
            .cloned()
            .ok_or_else(|| not_found(format!("commit {}", sha)))
    }

    fn get_commit_diffs(
        &self,
        _scope: &RepoScope,
        base: &str,
        target: &str,
    ) -> HostResult<GitCommitDiffs> {
        let mut state = self.state.borrow_mut();
        state.record("get_commit_diffs")?;
        Ok(state
            .diffs
            .get(&(base.to_string(), target.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn get_commit_statuses(&self, _scope: &RepoScope, sha: &str) -> HostResult<Vec<GitStatus>> {
        let mut state = self.state.borrow_mut();
        state.record("get_commit_statuses")?;
        Ok(state.statuses.get(sha).cloned().unwrap_or_default())
    }

    fn create_commit_status(
        &self,
        _scope: &RepoScope,
        sha: &str,
        status: GitStatus,
    ) -> HostResult<GitStatus> {
        let mut state = self.state.borrow_mut();
        state.record("create_commit_status")?;
        if !state.commits.contains_key(sha) {
            return Err(not_found(format!("commit {}", sha)));
        }
        state
            .statuses
            .entry(sha.to_string())
            .or_default()
            .push(status.clone());
        Ok(status)
    }

    fn create_pull_request(
        &self,
        _scope: &RepoScope,
        request: NewPullRequest,
    ) -> HostResult<GitPullRequest> {
        let mut state = self.state.borrow_mut();
        state.record("create_pull_request")?;
        state.next_id += 1;
        let id = state.next_id;
        let pull_request = GitPullRequest {
            pull_request_id: id,
            title: request.title,
            description: request.description,
            source_ref_name: request.source_ref_name,
            target_ref_name: request.target_ref_name,
            status: PullRequestStatus::Active,
            merge_status: PullRequestMergeStatus::Queued,
            created_by: IdentityRef {
                id: "user-1".to_string(),
                display_name: "Build Service".to_string(),
            },
            last_merge_commit: None,
            labels: Vec::new(),
            auto_complete_set_by: None,
            completion_options: None,
        };
        let script: VecDeque<_> = state.merge_script_for_new.iter().copied().collect();
        if !script.is_empty() {
            state.merge_scripts.insert(id, script);
        }
        state.pull_requests.push(pull_request.clone());
        Ok(pull_request)
    }

    fn get_pull_request(&self, _scope: &RepoScope, id: u64) -> HostResult<GitPullRequest> {
        let mut state = self.state.borrow_mut();
        state.record("get_pull_request")?;
        let next_status = state.merge_scripts.get_mut(&id).and_then(|script| {
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().copied()
            }
        });
        let pull_request = state
            .pull_requests
            .iter_mut()
            .find(|pr| pr.pull_request_id == id)
            .ok_or_else(|| not_found(format!("pull request {}", id)))?;
        if let Some(status) = next_status {
            pull_request.merge_status = status;
        }
        Ok(pull_request.clone())
    }

    fn get_pull_requests(
        &self,
        _scope: &RepoScope,
        search: &PullRequestSearch,
    ) -> HostResult<Vec<GitPullRequest>> {
        let mut state = self.state.borrow_mut();
        state.record("get_pull_requests")?;
        Ok(state
            .pull_requests
            .iter()
            .filter(|pr| search.status.is_none_or(|s| pr.status == s))
            .filter(|pr| {
                search
                    .source_ref_name
                    .as_ref()
                    .is_none_or(|s| &pr.source_ref_name == s)
            })
            .filter(|pr| {
                search
                    .target_ref_name
                    .as_ref()
                    .is_none_or(|t| &pr.target_ref_name == t)
            })
            .cloned()
            .collect())
    }

    fn update_pull_request(
        &self,
        _scope: &RepoScope,
        id: u64,
        update: PullRequestUpdate,
    ) -> HostResult<GitPullRequest> {
        let mut state = self.state.borrow_mut();
        state.record("update_pull_request")?;
        let pull_request = state
            .pull_requests
            .iter_mut()
            .find(|pr| pr.pull_request_id == id)
            .ok_or_else(|| not_found(format!("pull request {}", id)))?;
        if let Some(status) = update.status {
            pull_request.status = status;
        }
        if update.auto_complete_set_by.is_some() {
            pull_request.auto_complete_set_by = update.auto_complete_set_by;
        }
        if update.completion_options.is_some() {
            pull_request.completion_options = update.completion_options;
        }
        Ok(pull_request.clone())
    }

    fn get_annotated_tag(
        &self,
        _scope: &RepoScope,
        object_id: &str,
    ) -> HostResult<GitAnnotatedTag> {
        let mut state = self.state.borrow_mut();
        state.record("get_annotated_tag")?;
        state
            .tags
            .get(object_id)
            .cloned()
            .ok_or_else(|| not_found(format!("annotated tag {}", object_id)))
    }

    fn create_annotated_tag(
        &self,
        _scope: &RepoScope,
        tag: NewAnnotatedTag,
    ) -> HostResult<GitAnnotatedTag> {
        {
            let mut state = self.state.borrow_mut();
            state.record("create_annotated_tag")?;
            if !state.commits.contains_key(&tag.tagged_object.object_id) {
                return Err(not_found(format!("commit {}", tag.tagged_object.object_id)));
            }
        }
        let object_id = self.state.borrow_mut().next_id("tag");
        self.add_annotated_tag(
            &tag.name,
            &object_id,
            &tag.tagged_object.object_id,
            &tag.message,
        );
        Ok(GitAnnotatedTag {
            name: tag.name,
            object_id,
            message: tag.message,
            tagged_object: tag.tagged_object,
        })
    }

    fn get_feed(&self, project: Option<&str>, name: &str) -> HostResult<Feed> {
        let mut state = self.state.borrow_mut();
        state.record("get_feed")?;
        state
            .feeds
            .iter()
            .find(|f| (f.name == name || f.id == name) && f.project.as_deref() == project)
            .cloned()
            .ok_or_else(|| not_found(format!("feed {}", name)))
    }

    fn create_feed(&self, project: Option<&str>, name: &str) -> HostResult<Feed> {
        self.state.borrow_mut().record("create_feed")?;
        Ok(self.add_feed(project, name))
    }

    fn get_feed_view(
        &self,
        _project: Option<&str>,
        feed_id: &str,
        name: &str,
    ) -> HostResult<FeedView> {
        let mut state = self.state.borrow_mut();
        state.record("get_feed_view")?;
        state
            .views
            .iter()
            .find(|(feed, view)| feed == feed_id && view.name == name)
            .map(|(_, view)| view.clone())
            .ok_or_else(|| not_found(format!("view {}", name)))
    }

    fn create_feed_view(
        &self,
        _project: Option<&str>,
        feed_id: &str,
        name: &str,
    ) -> HostResult<FeedView> {
        self.state.borrow_mut().record("create_feed_view")?;
        Ok(self.add_feed_view(feed_id, name))
    }

    fn get_packages(&self, _project: Option<&str>, feed_id: &str) -> HostResult<Vec<Package>> {
        let mut state = self.state.borrow_mut();
        state.record("get_packages")?;
        Ok(state
            .packages
            .iter()
            .filter(|(feed, _)| feed == feed_id)
            .map(|(_, package)| package.clone())
            .collect())
    }

    fn get_package_versions(
        &self,
        _project: Option<&str>,
        feed_id: &str,
        package_id: &str,
    ) -> HostResult<Vec<PackageVersion>> {
        let mut state = self.state.borrow_mut();
        state.record("get_package_versions")?;
        state
            .packages
            .iter()
            .find(|(feed, p)| feed == feed_id && p.id == package_id)
            .map(|(_, p)| p.versions.clone())
            .ok_or_else(|| not_found(format!("package {}", package_id)))
    }

    fn get_package_version(
        &self,
        _project: Option<&str>,
        feed_id: &str,
        package_id: &str,
        version_id: &str,
    ) -> HostResult<PackageVersion> {
        let mut state = self.state.borrow_mut();
        state.record("get_package_version")?;
        state
            .packages
            .iter()
            .filter(|(feed, p)| feed == feed_id && p.id == package_id)
            .flat_map(|(_, p)| p.versions.iter())
            .find(|v| v.id == version_id || v.version == version_id)
            .cloned()
            .ok_or_else(|| not_found(format!("package version {}", version_id)))
    }

    fn update_package_version(
        &self,
        _project: Option<&str>,
        feed_id: &str,
        package_name: &str,
        version: &str,
        update: PackageVersionUpdate,
    ) -> HostResult<()> {
        let mut state = self.state.borrow_mut();
        state.record("update_package_version")?;
        let view = state
            .views
            .iter()
            .find(|(feed, view)| feed == feed_id && view.name == update.add_to_view)
            .map(|(_, view)| view.clone())
            .ok_or_else(|| not_found(format!("view {}", update.add_to_view)))?;
        let target = state
            .packages
            .iter_mut()
            .filter(|(feed, p)| feed == feed_id && p.name == package_name)
            .flat_map(|(_, p)| p.versions.iter_mut())
            .find(|v| v.version == version)
            .ok_or_else(|| not_found(format!("package version {}@{}", package_name, version)))?;
        if !target.views.iter().any(|v| v.name == view.name) {
            target.views.push(view);
        }
        Ok(())
    }

    fn publish_package(&self, request: &PublishRequest) -> HostResult<PackageVersion> {
        let feed_id = {
            let mut state = self.state.borrow_mut();
            state.record("publish_package")?;
            state
                .feeds
                .iter()
                .find(|f| f.name == request.feed || f.id == request.feed)
                .map(|f| f.id.clone())
                .ok_or_else(|| not_found(format!("feed {}", request.feed)))?
        };
        self.add_package_version(
            &feed_id,
            &request.package_name,
            &request.version,
            Some(&request.description),
            &[],
        );
        let mut state = self.state.borrow_mut();
        state.published.push(request.clone());
        state
            .packages
            .iter()
            .filter(|(feed, p)| feed == &feed_id && p.name == request.package_name)
            .flat_map(|(_, p)| p.versions.iter())
            .find(|v| v.version == request.version)
            .cloned()
            .ok_or_else(|| not_found(format!("package version {}", request.version)))
    }

    fn get_tree_zip(&self, _scope: &RepoScope, tree_id: &str) -> HostResult<Vec<u8>> {
        let mut state = self.state.borrow_mut();
        state.record("get_tree_zip")?;
        state
            .trees
            .get(tree_id)
            .cloned()
            .ok_or_else(|| not_found(format!("tree {}", tree_id)))
    }

    fn get_items(&self, _scope: &RepoScope, path: &str, version: &str) -> HostResult<Vec<GitItem>> {
        let mut state = self.state.borrow_mut();
        state.record("get_items")?;
        let folder = normalize_path(path);
        let files = state
            .files
            .get(version)
            .ok_or_else(|| not_found(format!("version {}", version)))?;

        let prefix = if folder.is_empty() {
            String::new()
        } else {
            format!("{}/", folder)
        };
        let mut children: BTreeSet<(String, bool)> = BTreeSet::new();
        for file in files.keys() {
            let Some(rest) = file.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => children.insert((format!("{}{}", prefix, dir), true)),
                None => children.insert((file.clone(), false)),
            };
        }
        if children.is_empty() {
            return Err(not_found(format!("path {}", path)));
        }
        Ok(children
            .into_iter()
            .map(|(path, is_folder)| GitItem {
                path: format!("/{}", path),
                is_folder,
                object_id: None,
            })
            .collect())
    }

    fn get_item_content(
        &self,
        _scope: &RepoScope,
        path: &str,
        version: &str,
    ) -> HostResult<String> {
        let mut state = self.state.borrow_mut();
        state.record("get_item_content")?;
        state
            .files
            .get(version)
            .and_then(|files| files.get(&normalize_path(path)))
            .cloned()
            .ok_or_else(|| not_found(format!("item {} at {}", path, version)))
    }
}
