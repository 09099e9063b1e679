//! Adapter settings.
//!
//! Example `ado.toml`:
//!
//! ```toml
//! feed_name = "New Project Feed"
//! feed_scope = "project"
//! retry_timeout_secs = 120
//!
//! [completion]
//! merge_strategy = "squash"
//! delete_source_branch = true
//! ```

use std::path::PathBuf;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::host::{CompletionOptions, MergeStrategy};
use crate::poll::PollPolicy;
use crate::version::BuildLabelPolicy;

pub const DEFAULT_RELEASE_VIEW: &str = "Release";
pub const DEFAULT_PRERELEASE_VIEW: &str = "Prerelease";

/// Where the package feed lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedScope {
    #[default]
    Organization,
    Project,
}

/// Auto-complete policy applied when a pull request is merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub delete_source_branch: bool,
    pub merge_strategy: MergeStrategy,
    pub bypass_policy: bool,
    pub bypass_reason: Option<String>,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            delete_source_branch: false,
            merge_strategy: MergeStrategy::Squash,
            bypass_policy: false,
            bypass_reason: None,
        }
    }
}

impl CompletionSettings {
    pub fn to_options(&self, merge_commit_message: Option<String>) -> CompletionOptions {
        CompletionOptions {
            delete_source_branch: self.delete_source_branch,
            merge_strategy: self.merge_strategy,
            bypass_policy: self.bypass_policy,
            bypass_reason: self
                .bypass_policy
                .then(|| self.bypass_reason.clone())
                .flatten(),
            merge_commit_message,
        }
    }
}

/// Settings consumed by the repository adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdoSettings {
    /// Package feed; defaults to the repository name
    pub feed_name: Option<String>,
    pub feed_scope: FeedScope,
    /// Remote feature-branch prefix when the project config sets none
    pub branch_prefix: String,
    pub retry_timeout_secs: f64,
    pub retry_interval_secs: f64,
    pub completion: CompletionSettings,
    /// Leave conflicting pull requests open for manual resolution
    pub create_pull_request_on_conflict: bool,
    pub build_label: BuildLabelPolicy,
    pub release_view: String,
    pub prerelease_view: String,
    /// Package name; defaults to the repository name
    pub package_name: Option<String>,
    /// Directory published as the package contents
    pub working_dir: PathBuf,
}

impl Default for AdoSettings {
    fn default() -> Self {
        Self {
            feed_name: None,
            feed_scope: FeedScope::default(),
            branch_prefix: "feature/".to_string(),
            retry_timeout_secs: 300.0,
            retry_interval_secs: 5.0,
            completion: CompletionSettings::default(),
            create_pull_request_on_conflict: true,
            build_label: BuildLabelPolicy::default(),
            release_view: DEFAULT_RELEASE_VIEW.to_string(),
            prerelease_view: DEFAULT_PRERELEASE_VIEW.to_string(),
            package_name: None,
            working_dir: PathBuf::from("."),
        }
    }
}

impl AdoSettings {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from_secs(self.retry_timeout_secs, self.retry_interval_secs)
    }

    pub fn with_feed(mut self, name: impl Into<String>, scope: FeedScope) -> Self {
        self.feed_name = Some(name.into());
        self.feed_scope = scope;
        self
    }

    pub fn with_retry(mut self, timeout_secs: f64, interval_secs: f64) -> Self {
        self.retry_timeout_secs = timeout_secs;
        self.retry_interval_secs = interval_secs;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    pub fn with_create_pull_request_on_conflict(mut self, leave_open: bool) -> Self {
        self.create_pull_request_on_conflict = leave_open;
        self
    }

    pub fn view_name(&self, prerelease: bool) -> &str {
        if prerelease {
            &self.prerelease_view
        } else {
            &self.release_view
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.retry_timeout_secs.is_finite() || self.retry_timeout_secs < 0.0 {
            bail!("retry_timeout_secs must be a non-negative number");
        }
        if !self.retry_interval_secs.is_finite() || self.retry_interval_secs < 0.0 {
            bail!("retry_interval_secs must be a non-negative number");
        }
        if self.release_view.trim().is_empty() || self.prerelease_view.trim().is_empty() {
            bail!("release_view and prerelease_view cannot be empty");
        }
        if self.release_view == self.prerelease_view {
            bail!(
                "release_view and prerelease_view must differ (both '{}')",
                self.release_view
            );
        }
        if let Some(feed) = &self.feed_name
            && feed.trim().is_empty()
        {
            bail!("feed_name cannot be empty");
        }
        if self.completion.bypass_policy && self.completion.bypass_reason.is_none() {
            bail!("completion.bypass_reason is required when bypass_policy is set");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_are_valid() {
        let settings = AdoSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.view_name(false), "Release");
        assert_eq!(settings.view_name(true), "Prerelease");
        assert_eq!(settings.completion.merge_strategy, MergeStrategy::Squash);
    }

    #[test]
    fn poll_policy_follows_retry_settings() {
        let policy = AdoSettings::default().with_retry(0.5, 0.25).poll_policy();
        assert_eq!(policy.timeout, Duration::from_millis(500));
        assert_eq!(policy.interval, Duration::from_millis(250));
    }

    #[test]
    fn bypass_reason_only_sent_with_bypass() {
        let mut completion = CompletionSettings {
            bypass_reason: Some("ci".to_string()),
            ..Default::default()
        };
        assert_eq!(completion.to_options(None).bypass_reason, None);

        completion.bypass_policy = true;
        let options = completion.to_options(Some("merge".to_string()));
        assert_eq!(options.bypass_reason.as_deref(), Some("ci"));
        assert_eq!(options.merge_commit_message.as_deref(), Some("merge"));
    }

    #[test]
    fn identical_views_are_rejected() {
        let settings = AdoSettings {
            prerelease_view: "Release".to_string(),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
