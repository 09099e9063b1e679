//! Azure DevOps repository adapter and dependency resolution.
//!
//! Exposes a uniform version-control host abstraction over the host's REST
//! object model and drives an ordered, strategy-based engine that resolves
//! symbolic dependencies to concrete refs and package versions.

pub mod config;
pub mod dependency;
pub mod error;
pub mod host;
pub mod logging;
pub mod poll;
pub mod repo;
pub mod repo_url;
pub mod resolver;
pub mod service;
pub mod version;

pub use error::{Result, VcsError};

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{AdoSettings, CompletionSettings, FeedScope, RemoteProjectConfig};

    // Errors
    pub use crate::error::{Result, VcsError};

    // Host
    pub use crate::host::memory::MemoryHost;
    pub use crate::host::{HostClient, HostError};

    // Repository
    pub use crate::repo::{
        AdoRepository, Branch, Commit, MergeOutcome, PullRequest, Release, RepoRef, Tag,
        VcsRepository,
    };
    pub use crate::repo_url::{RepoUrl, parse_repo_url};

    // Dependencies and resolution
    pub use crate::dependency::{
        Dependency, DependencyPin, DependencySpec, DynamicDependency, StaticDependency,
        get_static_dependencies,
    };
    pub use crate::resolver::{
        RepositoryProvider, Resolution, ResolutionContext, ResolutionEngine, ResolutionStrategy,
        Resolver, ResolverRegistry, strategies_for_preset,
    };

    // Services
    pub use crate::service::{Connector, ServiceConfig, ServiceRegistry};

    // Versions
    pub use crate::version::{BuildLabelPolicy, VersionNormalizer, normalize_version};

    // Polling
    pub use crate::poll::{PollOutcome, PollPolicy, poll_until};
}
