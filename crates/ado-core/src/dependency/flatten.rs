//! Resolution and flattening of dynamic dependencies.

use tracing::info;

use super::{
    Dependency, DependencyPin, DynamicDependency, StaticDependency, UnmanagedRefDependency,
    parse_dependencies,
};
use crate::error::{Result, VcsError};
use crate::repo::{ItemKind, VcsRepository};
use crate::resolver::{ResolutionContext, ResolutionEngine, ResolutionStrategy};

const UNPACKAGED_PRE: &str = "unpackaged/pre";
const UNPACKAGED_POST: &str = "unpackaged/post";
const MAX_DEPTH: usize = 32;

impl DynamicDependency {
    /// Resolve to a concrete ref with the first strategy that yields one.
    ///
    /// An explicit tag restricts resolution to the tag strategy; a release
    /// selector restricts it to the release strategies.
    pub fn resolve(
        &mut self,
        engine: &ResolutionEngine,
        context: &ResolutionContext,
        strategies: &[ResolutionStrategy],
    ) -> Result<()> {
        if self.is_resolved() {
            return Ok(());
        }
        self.validate()?;

        let strategies = if self.tag.is_some() {
            vec![ResolutionStrategy::StaticTagReference]
        } else if let Some(release) = self.release {
            release.strategies()
        } else {
            strategies.to_vec()
        };

        let resolution = engine.resolve(self, context, &strategies)?;
        self.git_ref = resolution.git_ref;
        self.package_dependency = resolution.package_dependency;
        Ok(())
    }

    /// Expand into the ordered list of dependencies this one requires.
    ///
    /// 1. dependencies declared in the remote project config at the ref
    /// 2. each folder under `unpackaged/pre`, unmanaged
    /// 3. the package version, or the whole repository unmanaged
    /// 4. each folder under `unpackaged/post`, with namespace handling
    pub fn flatten(&self, context: &ResolutionContext) -> Result<Vec<Dependency>> {
        let Some(git_ref) = self.git_ref.as_deref() else {
            return Err(VcsError::resolution(format!(
                "Dependency {} is not resolved and cannot be flattened.",
                self
            )));
        };
        let url = self.url()?;

        if let Some(subfolder) = &self.subfolder {
            return Ok(vec![Dependency::Static(StaticDependency::Unmanaged(
                UnmanagedRefDependency {
                    subfolder: Some(subfolder.clone()),
                    unmanaged: true,
                    namespace_inject: self.namespace_inject.clone(),
                    namespace_strip: self.namespace_strip.clone(),
                    ..UnmanagedRefDependency::new(url, git_ref)
                },
            ))]);
        }

        info!(dependency = %self, "Collecting dependencies from repository");
        let repo = context.repository(url)?;
        let config = repo.project_config(git_ref)?;
        let namespace = config.namespace().map(str::to_string);

        let mut deps = parse_dependencies(&config.project.dependencies).map_err(|err| {
            VcsError::resolution(format!(
                "Unable to flatten dependency {} because a transitive dependency could not be parsed: {}",
                self, err
            ))
        })?;

        let managed = namespace.is_some() && !self.unmanaged;

        deps.extend(self.flatten_unpackaged(
            repo.as_ref(),
            url,
            git_ref,
            UNPACKAGED_PRE,
            false,
            None,
        )?);

        match &self.package_dependency {
            Some(package) => deps.push(Dependency::Static(package.clone())),
            None if managed => {
                return Err(VcsError::resolution(format!(
                    "Could not find latest release for {}",
                    self
                )));
            }
            None => deps.push(Dependency::Static(StaticDependency::Unmanaged(
                UnmanagedRefDependency {
                    unmanaged: self.unmanaged,
                    namespace_inject: self.namespace_inject.clone(),
                    namespace_strip: self.namespace_strip.clone(),
                    ..UnmanagedRefDependency::new(url, git_ref)
                },
            ))),
        }

        deps.extend(self.flatten_unpackaged(
            repo.as_ref(),
            url,
            git_ref,
            UNPACKAGED_POST,
            managed,
            namespace.as_deref(),
        )?);

        Ok(deps)
    }

    fn flatten_unpackaged(
        &self,
        repo: &dyn VcsRepository,
        url: &str,
        git_ref: &str,
        folder: &str,
        managed: bool,
        namespace: Option<&str>,
    ) -> Result<Vec<Dependency>> {
        let contents = match repo.directory_contents(folder, git_ref) {
            Ok(contents) => contents,
            Err(err) if err.is_not_found() => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        Ok(contents
            .into_iter()
            .filter(|(_, kind)| *kind == ItemKind::Folder)
            .map(|(name, _)| format!("{}/{}", folder, name))
            .filter(|subfolder| !self.skip.contains(subfolder))
            .map(|subfolder| {
                Dependency::Static(StaticDependency::Unmanaged(UnmanagedRefDependency {
                    subfolder: Some(subfolder),
                    unmanaged: !managed,
                    namespace_inject: namespace.filter(|_| managed).map(str::to_string),
                    namespace_strip: namespace.filter(|_| !managed).map(str::to_string),
                    ..UnmanagedRefDependency::new(url, git_ref)
                }))
            })
            .collect())
    }
}

/// Resolve and flatten `dependencies` into static dependencies.
///
/// Transitive dependencies are expanded in place. Pins apply at every level.
/// Repeats are dropped, keeping the first occurrence.
pub fn get_static_dependencies(
    dependencies: Vec<Dependency>,
    pins: &[DependencyPin],
    strategies: &[ResolutionStrategy],
    engine: &ResolutionEngine,
    context: &ResolutionContext,
) -> Result<Vec<StaticDependency>> {
    let mut resolved = Vec::new();
    for dependency in dependencies {
        expand(dependency, pins, strategies, engine, context, 0, &mut resolved)?;
    }

    let mut unique: Vec<StaticDependency> = Vec::with_capacity(resolved.len());
    for dep in resolved {
        if !unique.contains(&dep) {
            unique.push(dep);
        }
    }
    Ok(unique)
}

fn expand(
    dependency: Dependency,
    pins: &[DependencyPin],
    strategies: &[ResolutionStrategy],
    engine: &ResolutionEngine,
    context: &ResolutionContext,
    depth: usize,
    out: &mut Vec<StaticDependency>,
) -> Result<()> {
    let mut dynamic = match dependency {
        Dependency::Static(dep) => {
            out.push(dep);
            return Ok(());
        }
        Dependency::Dynamic(dep) => dep,
    };

    if depth >= MAX_DEPTH {
        return Err(VcsError::resolution(format!(
            "Dependency {} nests more than {} levels deep",
            dynamic, MAX_DEPTH
        )));
    }

    dynamic.apply_pins(pins)?;
    dynamic.resolve(engine, context, strategies)?;
    for child in dynamic.flatten(context)? {
        expand(child, pins, strategies, engine, context, depth + 1, out)?;
    }
    Ok(())
}
