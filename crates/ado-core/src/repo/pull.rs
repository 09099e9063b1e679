//! Pull-request lifecycle.
//!
//! ```text
//! created -> active(queued) -> active(conflicts | succeeded | failure) -> completed | abandoned
//! ```
//!
//! Merge-conflict detection on the host is asynchronous, so `can_auto_merge`
//! polls the merge status under the configured `PollPolicy`.

use std::collections::HashMap;

use tracing::{info, warn};

use super::AdoRepository;
use super::models::{MergeOutcome, PullRequest};
use super::refs::is_commit_sha;
use crate::error::{Result, VcsError};
use crate::host::{
    HostResultExt, IdentityRef, NewPullRequest, PullRequestMergeStatus, PullRequestSearch,
    PullRequestStatus, PullRequestUpdate,
};
use crate::poll::{PollOutcome, poll_until};
use crate::repo_url::{qualify_branch_name, sanitize_branch_name};

impl AdoRepository {
    pub(crate) fn pull_requests(
        &self,
        status: Option<PullRequestStatus>,
        base: Option<&str>,
        head: Option<&str>,
    ) -> Result<Vec<PullRequest>> {
        let search = PullRequestSearch {
            status,
            source_ref_name: head.map(qualify_branch_name),
            target_ref_name: base.map(qualify_branch_name),
        };
        let pulls = self
            .client()
            .get_pull_requests(&self.scope, &search)
            .context("get_pull_requests", self.full_name_internal())?;
        Ok(pulls.into_iter().map(PullRequest::from).collect())
    }

    /// Open a pull request from branch `head` into `base`.
    pub(crate) fn create_pull(
        &self,
        title: &str,
        base: &str,
        head: &str,
        body: Option<&str>,
    ) -> Result<PullRequest> {
        if is_commit_sha(sanitize_branch_name(head)) {
            return Err(VcsError::validation(format!(
                "Pull request source must be a branch, not commit {}",
                head
            )));
        }

        let request = NewPullRequest {
            title: title.to_string(),
            description: body.unwrap_or_default().to_string(),
            source_ref_name: qualify_branch_name(head),
            target_ref_name: qualify_branch_name(base),
        };
        let created: PullRequest = self
            .client()
            .create_pull_request(&self.scope, request)
            .context("create_pull_request", format!("{} -> {}", head, base))?
            .into();
        info!(id = created.id, head, base, "Created pull request");

        if let Some(open) = self.open_pulls.borrow_mut().as_mut() {
            open.entry(created.head_ref().to_string())
                .or_default()
                .push(created.clone());
        }
        Ok(created)
    }

    pub(crate) fn get_pull_request(&self, id: u64) -> Result<PullRequest> {
        let pr = self
            .client()
            .get_pull_request(&self.scope, id)
            .context("get_pull_request", id)?;
        Ok(pr.into())
    }

    pub(crate) fn update_pull_request(
        &self,
        id: u64,
        status: PullRequestStatus,
    ) -> Result<PullRequest> {
        let update = PullRequestUpdate {
            status: Some(status),
            ..Default::default()
        };
        let updated: PullRequest = self
            .client()
            .update_pull_request(&self.scope, id, update)
            .context("update_pull_request", id)?
            .into();
        info!(id, status = ?status, "Updated pull request");

        if updated.status != PullRequestStatus::Active
            && let Some(open) = self.open_pulls.borrow_mut().as_mut()
        {
            for pulls in open.values_mut() {
                pulls.retain(|pr| pr.id != id);
            }
        }
        Ok(updated)
    }

    /// Poll the merge status until the host settles on an answer.
    ///
    /// `succeeded` is mergeable. `conflicts`, `failure` and
    /// `rejectedByPolicy` are not. A timeout counts as not mergeable.
    pub(crate) fn can_auto_merge(&self, pull_request: &PullRequest) -> Result<bool> {
        match self.wait_for_merge_status(pull_request) {
            Err(VcsError::Timeout { .. }) => {
                warn!(
                    id = pull_request.id,
                    timeout = ?self.settings.poll_policy().timeout,
                    "Timed out waiting for merge status"
                );
                Ok(false)
            }
            other => other,
        }
    }

    /// Like `can_auto_merge`, but an expired poll is `VcsError::Timeout`.
    pub fn wait_for_merge_status(&self, pull_request: &PullRequest) -> Result<bool> {
        let policy = self.settings.poll_policy();
        let outcome = poll_until(&policy, || {
            let current = self.get_pull_request(pull_request.id)?;
            Ok(match current.merge_status {
                PullRequestMergeStatus::Succeeded => Some(true),
                PullRequestMergeStatus::Conflicts
                | PullRequestMergeStatus::Failure
                | PullRequestMergeStatus::RejectedByPolicy => Some(false),
                PullRequestMergeStatus::Queued | PullRequestMergeStatus::NotSet => None,
            })
        })?;
        if let PollOutcome::TimedOut { attempts } = outcome {
            info!(id = pull_request.id, attempts, "Merge status still pending");
        }
        outcome.or_timeout("merge status", &format!("pull request {}", pull_request.id))
    }

    /// Set auto-complete with the configured completion policy.
    pub(crate) fn complete_pull_request(
        &self,
        pull_request: &PullRequest,
        message: Option<&str>,
    ) -> Result<PullRequest> {
        let update = PullRequestUpdate {
            status: None,
            auto_complete_set_by: Some(IdentityRef {
                id: pull_request.created_by.clone(),
                display_name: String::new(),
            }),
            completion_options: Some(
                self.settings
                    .completion
                    .to_options(message.map(str::to_string)),
            ),
        };
        let updated = self
            .client()
            .update_pull_request(&self.scope, pull_request.id, update)
            .context("update_pull_request", pull_request.id)?;
        info!(id = pull_request.id, "Set pull request to auto-complete");
        Ok(updated.into())
    }

    /// Merge `head` into `base` through a pull request.
    ///
    /// Skipped when an active pull request from `head` into `base` exists.
    pub(crate) fn merge(
        &self,
        base: &str,
        head: &str,
        message: Option<&str>,
    ) -> Result<MergeOutcome> {
        let base = sanitize_branch_name(base);
        let head = sanitize_branch_name(head);

        if let Some(existing) = self.find_open_pull(base, head)? {
            info!(id = existing.id, head, base, "Pull request already open");
            return Ok(MergeOutcome::AlreadyOpen(existing));
        }

        let title = format!("Merge {} into {}", head, base);
        let created = self.create_pull(&title, base, head, message)?;

        if self.can_auto_merge(&created)? {
            let completed = self.complete_pull_request(&created, message)?;
            return Ok(MergeOutcome::Completed(completed));
        }

        if self.settings.create_pull_request_on_conflict {
            warn!(id = created.id, head, base, "Merge conflict; leaving pull request open");
            Ok(MergeOutcome::LeftOpen(created))
        } else {
            warn!(id = created.id, head, base, "Merge conflict; abandoning pull request");
            let abandoned = self.update_pull_request(created.id, PullRequestStatus::Abandoned)?;
            Ok(MergeOutcome::Abandoned(abandoned))
        }
    }

    /// Completed pull requests whose merge commit is `sha`.
    pub(crate) fn get_pull_requests_by_commit(&self, sha: &str) -> Result<Vec<PullRequest>> {
        Ok(self
            .pull_requests(Some(PullRequestStatus::Completed), None, None)?
            .into_iter()
            .filter(|pr| pr.merge_commit_sha.as_deref() == Some(sha))
            .collect())
    }

    fn find_open_pull(&self, base: &str, head: &str) -> Result<Option<PullRequest>> {
        if self.open_pulls.borrow().is_none() {
            let mut by_head: HashMap<String, Vec<PullRequest>> = HashMap::new();
            for pr in self.pull_requests(Some(PullRequestStatus::Active), None, None)? {
                by_head
                    .entry(pr.head_ref().to_string())
                    .or_default()
                    .push(pr);
            }
            *self.open_pulls.borrow_mut() = Some(by_head);
        }

        Ok(self
            .open_pulls
            .borrow()
            .as_ref()
            .and_then(|open| open.get(head))
            .and_then(|pulls| pulls.iter().find(|pr| pr.base_ref() == base))
            .cloned())
    }
}
