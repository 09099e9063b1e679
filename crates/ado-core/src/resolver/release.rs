//! Tag, release and unmanaged-head resolvers.

use tracing::debug;

use super::{Resolution, ResolutionContext, Resolver};
use crate::dependency::{
    DynamicDependency, PackageNamespaceVersionDependency, PackageVersionIdDependency,
    StaticDependency,
};
use crate::error::{Result, VcsError};
use crate::repo::{PackageType, Release, Tag, VcsRepository};

/// Resolves an explicit tag through its release.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagResolver;

impl Resolver for TagResolver {
    fn name(&self) -> &str {
        "Tag Resolver"
    }

    fn can_resolve(&self, dependency: &DynamicDependency, _context: &ResolutionContext) -> bool {
        dependency.tag.is_some()
    }

    fn resolve(
        &self,
        dependency: &DynamicDependency,
        context: &ResolutionContext,
    ) -> Result<Resolution> {
        let Some(tag_name) = dependency.tag.as_deref() else {
            return Ok(Resolution::miss());
        };
        let repo = context.repository(dependency.url()?)?;

        let release = match repo.release_from_tag(tag_name) {
            Ok(release) => release,
            Err(err) if err.is_not_found() => {
                return Err(VcsError::resolution(format!(
                    "No release found for tag {}",
                    tag_name
                )));
            }
            Err(err) => return Err(err),
        };
        resolve_release(repo.as_ref(), dependency, &release)
    }
}

/// Resolves the latest release, optionally including prereleases.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseResolver {
    include_beta: bool,
}

impl ReleaseResolver {
    pub fn new(include_beta: bool) -> Self {
        Self { include_beta }
    }
}

impl Resolver for ReleaseResolver {
    fn name(&self) -> &str {
        if self.include_beta {
            "Release Resolver (Betas)"
        } else {
            "Release Resolver"
        }
    }

    fn can_resolve(&self, _dependency: &DynamicDependency, _context: &ResolutionContext) -> bool {
        true
    }

    fn resolve(
        &self,
        dependency: &DynamicDependency,
        context: &ResolutionContext,
    ) -> Result<Resolution> {
        let repo = context.repository(dependency.url()?)?;
        match repo.get_latest_artifact(self.include_beta)? {
            Some(release) => resolve_release(repo.as_ref(), dependency, &release),
            None => {
                debug!(repo = %repo.full_name(), "No release published");
                Ok(Resolution::miss())
            }
        }
    }
}

/// Head of the default branch, without a package. Always resolvable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnmanagedHeadResolver;

impl Resolver for UnmanagedHeadResolver {
    fn name(&self) -> &str {
        "Unmanaged Resolver"
    }

    fn can_resolve(&self, _dependency: &DynamicDependency, _context: &ResolutionContext) -> bool {
        true
    }

    fn resolve(
        &self,
        dependency: &DynamicDependency,
        context: &ResolutionContext,
    ) -> Result<Resolution> {
        let repo = context.repository(dependency.url()?)?;
        let head = repo.branch(&repo.default_branch())?.head_sha;
        repo.project_config(&head)?;
        Ok(Resolution::at(head, None))
    }
}

/// Dereference a release's tag to its commit and build the package
/// dependency from the tag message and the project config at that commit.
fn resolve_release(
    repo: &dyn VcsRepository,
    dependency: &DynamicDependency,
    release: &Release,
) -> Result<Resolution> {
    let tag_ref = repo.get_ref_for_tag(&release.tag_name)?;
    let tag: Tag = repo.get_tag_by_ref(&tag_ref, Some(&release.tag_name))?;
    let details = tag.package_details();
    let git_ref = tag.tagged_commit_sha.clone();

    let config = repo.project_config(&git_ref)?;
    let package_name = config.package_name(&repo.repo_url().name);
    let namespace = config.namespace().map(str::to_string);

    let install_unmanaged =
        dependency.unmanaged || (namespace.is_none() && details.version_id.is_none());
    if install_unmanaged {
        return Ok(Resolution::at(git_ref, None));
    }

    let package = match (details.package_type, namespace) {
        (Some(PackageType::FirstGen) | None, Some(namespace)) => {
            StaticDependency::PackageNamespaceVersion(PackageNamespaceVersionDependency {
                namespace,
                version: release.version_name.clone(),
                package_name: Some(package_name),
                version_id: details.version_id,
            })
        }
        (_, _) => match details.version_id {
            Some(version_id) => StaticDependency::PackageVersionId(PackageVersionIdDependency {
                version_id,
                version_number: Some(release.version_name.clone()),
                package_name: Some(package_name),
            }),
            None => return Ok(Resolution::at(git_ref, None)),
        },
    };
    Ok(Resolution::at(git_ref, Some(package)))
}
