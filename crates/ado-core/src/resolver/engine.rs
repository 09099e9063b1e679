//! Strategy registry and the engine that walks it.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::commit_status::{BranchSelector, CommitStatusResolver};
use super::release::{ReleaseResolver, TagResolver, UnmanagedHeadResolver};
use super::{Resolution, ResolutionContext, ResolutionStrategy, Resolver};
use crate::dependency::DynamicDependency;
use crate::error::{Result, VcsError};

/// Immutable map from strategy to resolver, built once.
#[derive(Debug)]
pub struct ResolverRegistry {
    resolvers: BTreeMap<ResolutionStrategy, Box<dyn Resolver>>,
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::with_default_resolvers()
    }
}

impl ResolverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            resolvers: BTreeMap::new(),
        }
    }

    /// Create a registry with a resolver for every strategy.
    pub fn with_default_resolvers() -> Self {
        use ResolutionStrategy::*;

        let release_branch = BranchSelector::ReleaseBranch {
            offset_start: 0,
            offset_end: 1,
        };
        let previous_release_branch = BranchSelector::ReleaseBranch {
            offset_start: 1,
            offset_end: 3,
        };

        Self::new()
            .with(StaticTagReference, TagResolver)
            .with(CommitStatusExactBranch, CommitStatusResolver::two_gp(BranchSelector::ExactMatch))
            .with(CommitStatusReleaseBranch, CommitStatusResolver::two_gp(release_branch))
            .with(
                CommitStatusPreviousReleaseBranch,
                CommitStatusResolver::two_gp(previous_release_branch),
            )
            .with(
                CommitStatusDefaultBranch,
                CommitStatusResolver::two_gp(BranchSelector::DefaultBranch),
            )
            .with(BetaReleaseTag, ReleaseResolver::new(true))
            .with(ReleaseTag, ReleaseResolver::new(false))
            .with(UnmanagedHead, UnmanagedHeadResolver)
            .with(UnlockedExactBranch, CommitStatusResolver::unlocked(BranchSelector::ExactMatch))
            .with(UnlockedReleaseBranch, CommitStatusResolver::unlocked(release_branch))
            .with(
                UnlockedPreviousReleaseBranch,
                CommitStatusResolver::unlocked(previous_release_branch),
            )
            .with(
                UnlockedDefaultBranch,
                CommitStatusResolver::unlocked(BranchSelector::DefaultBranch),
            )
    }

    /// Register `resolver` for `strategy`, replacing any previous one.
    pub fn with(mut self, strategy: ResolutionStrategy, resolver: impl Resolver + 'static) -> Self {
        self.resolvers.insert(strategy, Box::new(resolver));
        self
    }

    pub fn get(&self, strategy: ResolutionStrategy) -> Option<&dyn Resolver> {
        self.resolvers.get(&strategy).map(|r| r.as_ref())
    }

    pub fn strategies(&self) -> impl Iterator<Item = ResolutionStrategy> + '_ {
        self.resolvers.keys().copied()
    }
}

/// Tries resolvers in caller-supplied order.
#[derive(Debug, Default)]
pub struct ResolutionEngine {
    registry: ResolverRegistry,
}

impl ResolutionEngine {
    pub fn new(registry: ResolverRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// First strategy in `strategies` whose resolver yields a ref.
    ///
    /// Strategies without a registered resolver, or whose resolver declines
    /// the dependency, are skipped. Resolver errors propagate immediately.
    pub fn try_resolve(
        &self,
        dependency: &DynamicDependency,
        context: &ResolutionContext,
        strategies: &[ResolutionStrategy],
    ) -> Result<Option<(ResolutionStrategy, Resolution)>> {
        for &strategy in strategies {
            let Some(resolver) = self.registry.get(strategy) else {
                debug!(%strategy, "No resolver registered");
                continue;
            };
            if !resolver.can_resolve(dependency, context) {
                continue;
            }

            let resolution = resolver.resolve(dependency, context)?;
            if resolution.is_miss() {
                debug!(resolver = resolver.name(), dependency = %dependency, "Resolver found nothing");
                continue;
            }

            info!(
                resolver = resolver.name(),
                dependency = %dependency,
                git_ref = resolution.git_ref.as_deref().unwrap_or_default(),
                "Resolved dependency"
            );
            return Ok(Some((strategy, resolution)));
        }
        Ok(None)
    }

    /// Like `try_resolve`, but exhausting every strategy is an error.
    pub fn resolve(
        &self,
        dependency: &DynamicDependency,
        context: &ResolutionContext,
        strategies: &[ResolutionStrategy],
    ) -> Result<Resolution> {
        self.try_resolve(dependency, context, strategies)?
            .map(|(_, resolution)| resolution)
            .ok_or_else(|| {
                VcsError::resolution(format!("Unable to resolve dependency {}", dependency))
            })
    }
}
