//! Resolution engine.
//!
//! A `Resolver` turns a `DynamicDependency` into a concrete ref plus an
//! optional package dependency. The engine tries resolvers in the order the
//! caller asks for and keeps the first one that yields a ref.

mod commit_status;
mod engine;
mod release;

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::dependency::{DynamicDependency, StaticDependency};
use crate::error::{Result, VcsError};
use crate::repo::VcsRepository;

pub use commit_status::{
    BranchSelector, CommitStatusResolver, construct_release_branch_name, is_release_branch_or_child,
    release_identifier,
};
pub use engine::{ResolutionEngine, ResolverRegistry};
pub use release::{ReleaseResolver, TagResolver, UnmanagedHeadResolver};

/// Named resolution technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    StaticTagReference,
    CommitStatusExactBranch,
    CommitStatusReleaseBranch,
    CommitStatusPreviousReleaseBranch,
    CommitStatusDefaultBranch,
    BetaReleaseTag,
    ReleaseTag,
    UnmanagedHead,
    UnlockedExactBranch,
    UnlockedReleaseBranch,
    UnlockedPreviousReleaseBranch,
    UnlockedDefaultBranch,
}

impl ResolutionStrategy {
    pub const ALL: [ResolutionStrategy; 12] = [
        Self::StaticTagReference,
        Self::CommitStatusExactBranch,
        Self::CommitStatusReleaseBranch,
        Self::CommitStatusPreviousReleaseBranch,
        Self::CommitStatusDefaultBranch,
        Self::BetaReleaseTag,
        Self::ReleaseTag,
        Self::UnmanagedHead,
        Self::UnlockedExactBranch,
        Self::UnlockedReleaseBranch,
        Self::UnlockedPreviousReleaseBranch,
        Self::UnlockedDefaultBranch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StaticTagReference => "static_tag_reference",
            Self::CommitStatusExactBranch => "commit_status_exact_branch",
            Self::CommitStatusReleaseBranch => "commit_status_release_branch",
            Self::CommitStatusPreviousReleaseBranch => "commit_status_previous_release_branch",
            Self::CommitStatusDefaultBranch => "commit_status_default_branch",
            Self::BetaReleaseTag => "beta_release_tag",
            Self::ReleaseTag => "release_tag",
            Self::UnmanagedHead => "unmanaged_head",
            Self::UnlockedExactBranch => "unlocked_exact_branch",
            Self::UnlockedReleaseBranch => "unlocked_release_branch",
            Self::UnlockedPreviousReleaseBranch => "unlocked_previous_release_branch",
            Self::UnlockedDefaultBranch => "unlocked_default_branch",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy order for a named preset.
pub fn strategies_for_preset(name: &str) -> Result<Vec<ResolutionStrategy>> {
    use ResolutionStrategy::*;

    Ok(match name {
        "production" => vec![StaticTagReference, ReleaseTag, UnmanagedHead],
        "include_beta" => vec![StaticTagReference, BetaReleaseTag, ReleaseTag, UnmanagedHead],
        "commit_status" => vec![
            StaticTagReference,
            CommitStatusExactBranch,
            CommitStatusReleaseBranch,
            CommitStatusPreviousReleaseBranch,
            CommitStatusDefaultBranch,
            BetaReleaseTag,
            ReleaseTag,
            UnmanagedHead,
        ],
        "unlocked" => vec![
            StaticTagReference,
            UnlockedExactBranch,
            UnlockedReleaseBranch,
            UnlockedPreviousReleaseBranch,
            UnlockedDefaultBranch,
            UnmanagedHead,
        ],
        other => {
            return Err(VcsError::validation(format!(
                "Unknown resolution strategy preset '{}'",
                other
            )));
        }
    })
}

/// Outcome of one resolver. No ref means "try the next strategy".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub git_ref: Option<String>,
    pub package_dependency: Option<StaticDependency>,
}

impl Resolution {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn at(git_ref: impl Into<String>, package_dependency: Option<StaticDependency>) -> Self {
        Self {
            git_ref: Some(git_ref.into()),
            package_dependency,
        }
    }

    pub fn is_miss(&self) -> bool {
        self.git_ref.is_none()
    }
}

/// Supplies repositories for dependency URLs.
pub trait RepositoryProvider: fmt::Debug {
    /// Repository behind `url` within `context`. Fails when no configured
    /// service covers the URL.
    fn get_repository(&self, context: &str, url: &str) -> Result<Rc<dyn VcsRepository>>;
}

/// What a resolver may consult besides the dependency itself.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub provider: Rc<dyn RepositoryProvider>,
    /// Cache scope for repository lookups, usually the local project name
    pub name: String,
    /// Branch checked out locally
    pub local_branch: Option<String>,
    /// Local feature-branch prefix
    pub feature_prefix: Option<String>,
}

impl ResolutionContext {
    pub fn new(provider: Rc<dyn RepositoryProvider>, name: impl Into<String>) -> Self {
        Self {
            provider,
            name: name.into(),
            local_branch: None,
            feature_prefix: None,
        }
    }

    pub fn with_branch(
        mut self,
        branch: impl Into<String>,
        feature_prefix: impl Into<String>,
    ) -> Self {
        self.local_branch = Some(branch.into());
        self.feature_prefix = Some(feature_prefix.into());
        self
    }

    pub fn repository(&self, url: &str) -> Result<Rc<dyn VcsRepository>> {
        self.provider.get_repository(&self.name, url)
    }
}

/// One resolution technique.
pub trait Resolver: fmt::Debug {
    fn name(&self) -> &str;

    fn can_resolve(&self, dependency: &DynamicDependency, context: &ResolutionContext) -> bool;

    fn resolve(
        &self,
        dependency: &DynamicDependency,
        context: &ResolutionContext,
    ) -> Result<Resolution>;
}
