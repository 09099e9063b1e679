//! Releases as package versions promoted into feed views.
//!
//! A release is one package version whose description holds
//! `{"tag_name": ..., "body": ...}`. Promotion into the `Release` or
//! `Prerelease` view decides which kind of release it is.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::AdoRepository;
use super::models::{PackageFeed, Release, ReleaseDescription};
use crate::config::FeedScope;
use crate::error::{Result, VcsError};
use crate::host::{
    FeedView, HostError, HostResultExt, Package, PackageVersion, PackageVersionUpdate,
    PublishRequest,
};

const PUBLISH_ATTEMPTS: u32 = 3;
const PUBLISH_BACKOFF: Duration = Duration::from_millis(100);

impl AdoRepository {
    pub(crate) fn create_release(
        &self,
        tag_name: &str,
        body: &str,
        prerelease: bool,
    ) -> Result<Release> {
        let feed = self.ensure_feed()?;
        let version = self.normalizer.normalize_to_string(tag_name)?;
        let package_name = self.package_name();

        let existing = self
            .find_package(&feed)?
            .map(|package| self.package_versions(&feed, &package))
            .transpose()?
            .unwrap_or_default()
            .into_iter()
            .find(|v| v.version == version);

        let mut package_version = match existing {
            Some(found) => {
                debug!(version = %version, "Package version already published");
                found
            }
            None => {
                let description = serde_json::to_string(&ReleaseDescription {
                    tag_name: tag_name.to_string(),
                    body: body.to_string(),
                })?;
                let request = PublishRequest {
                    feed: feed.name.clone(),
                    project: self.feed_project().map(str::to_string),
                    package_name: package_name.clone(),
                    version: version.clone(),
                    description,
                    path: self.settings.working_dir.clone(),
                };
                self.publish_with_retry(&request)?
            }
        };

        let view = self.ensure_view(&feed, self.settings.view_name(prerelease))?;
        if !package_version.views.iter().any(|v| v.name == view.name) {
            self.client()
                .update_package_version(
                    self.feed_project(),
                    &feed.id,
                    &package_name,
                    &version,
                    PackageVersionUpdate {
                        add_to_view: view.name.clone(),
                    },
                )
                .context("update_package_version", format!("{}@{}", package_name, version))?;
            info!(package = %package_name, version = %version, view = %view.name, "Promoted package version");
            package_version.views.push(view);
        }

        self.to_release(&package_version).ok_or_else(|| {
            VcsError::validation(format!(
                "Package version {} has no release description",
                version
            ))
        })
    }

    /// All releases, newest version first.
    pub(crate) fn releases(&self) -> Result<Vec<Release>> {
        let Some(feed) = self.lookup_feed()? else {
            return Ok(Vec::new());
        };
        let Some(package) = self.find_package(&feed)? else {
            return Ok(Vec::new());
        };

        let mut releases: Vec<Release> = self
            .package_versions(&feed, &package)?
            .iter()
            .filter_map(|v| self.to_release(v))
            .collect();
        releases.sort_by(|a, b| b.version().cmp(&a.version()));
        Ok(releases)
    }

    pub(crate) fn release_from_tag(&self, tag_name: &str) -> Result<Release> {
        self.releases()?
            .into_iter()
            .find(|r| r.tag_name == tag_name)
            .ok_or_else(|| VcsError::not_found(format!("Release for {} not found", tag_name)))
    }

    /// Highest version promoted into the release view, or into either view
    /// when `prerelease` is set. `None` when nothing was ever published.
    pub(crate) fn get_latest_artifact(&self, prerelease: bool) -> Result<Option<Release>> {
        let release_view = self.settings.view_name(false);
        let prerelease_view = self.settings.view_name(true);

        Ok(self
            .releases()?
            .into_iter()
            .filter(|r| {
                r.view_membership.iter().any(|view| {
                    view == release_view || (prerelease && view == prerelease_view)
                })
            })
            .max_by(|a, b| a.version().cmp(&b.version())))
    }

    fn to_release(&self, version: &PackageVersion) -> Option<Release> {
        let description: ReleaseDescription =
            serde_json::from_str(version.description.as_deref()?).ok()?;
        let views: Vec<String> = version.views.iter().map(|v| v.name.clone()).collect();
        let released = views.iter().any(|v| v == self.settings.view_name(false));
        Some(Release {
            tag_name: description.tag_name,
            version_name: version.version.clone(),
            body: description.body,
            is_prerelease: !released,
            is_draft: views.is_empty(),
            published_at: version.publish_date,
            view_membership: views,
        })
    }

    fn publish_with_retry(&self, request: &PublishRequest) -> Result<PackageVersion> {
        let target = format!("{}@{}", request.package_name, request.version);
        let mut attempt = 1;
        loop {
            match self.client().publish_package(request) {
                Ok(version) => {
                    info!(package = %target, feed = %request.feed, "Published package version");
                    return Ok(version);
                }
                Err(err) if err.is_rename_contention() && attempt < PUBLISH_ATTEMPTS => {
                    warn!(package = %target, attempt, error = %err, "Publish hit rename contention; retrying");
                    std::thread::sleep(PUBLISH_BACKOFF * attempt);
                    attempt += 1;
                }
                Err(err) => {
                    return Err::<PackageVersion, HostError>(err).context("publish_package", target);
                }
            }
        }
    }

    fn feed_name(&self) -> &str {
        self.settings
            .feed_name
            .as_deref()
            .unwrap_or(&self.url.name)
    }

    fn feed_project(&self) -> Option<&str> {
        match self.settings.feed_scope {
            FeedScope::Organization => None,
            FeedScope::Project => Some(&self.scope.project),
        }
    }

    fn package_name(&self) -> String {
        self.settings
            .package_name
            .clone()
            .unwrap_or_else(|| self.url.name.clone())
    }

    fn lookup_feed(&self) -> Result<Option<PackageFeed>> {
        if let Some(feed) = self.feed.borrow().as_ref() {
            return Ok(Some(feed.clone()));
        }
        match self.client().get_feed(self.feed_project(), self.feed_name()) {
            Ok(feed) => {
                let feed = PackageFeed {
                    id: feed.id,
                    name: feed.name,
                    scope: self.settings.feed_scope,
                };
                *self.feed.borrow_mut() = Some(feed.clone());
                Ok(Some(feed))
            }
            Err(HostError::NotFound(_)) => Ok(None),
            Err(err) => {
                Err::<Option<PackageFeed>, HostError>(err).context("get_feed", self.feed_name())
            }
        }
    }

    fn ensure_feed(&self) -> Result<PackageFeed> {
        if let Some(feed) = self.lookup_feed()? {
            return Ok(feed);
        }
        let created = self
            .client()
            .create_feed(self.feed_project(), self.feed_name())
            .context("create_feed", self.feed_name())?;
        info!(feed = %created.name, scope = ?self.settings.feed_scope, "Created package feed");
        let feed = PackageFeed {
            id: created.id,
            name: created.name,
            scope: self.settings.feed_scope,
        };
        *self.feed.borrow_mut() = Some(feed.clone());
        Ok(feed)
    }

    fn ensure_view(&self, feed: &PackageFeed, name: &str) -> Result<FeedView> {
        match self.client().get_feed_view(self.feed_project(), &feed.id, name) {
            Ok(view) => Ok(view),
            Err(HostError::NotFound(_)) => {
                let view = self
                    .client()
                    .create_feed_view(self.feed_project(), &feed.id, name)
                    .context("create_feed_view", name)?;
                info!(feed = %feed.name, view = name, "Created feed view");
                Ok(view)
            }
            Err(err) => Err::<FeedView, HostError>(err).context("get_feed_view", name),
        }
    }

    fn find_package(&self, feed: &PackageFeed) -> Result<Option<Package>> {
        let name = self.package_name();
        Ok(self
            .client()
            .get_packages(self.feed_project(), &feed.id)
            .context("get_packages", &feed.name)?
            .into_iter()
            .find(|p| p.name == name))
    }

    fn package_versions(
        &self,
        feed: &PackageFeed,
        package: &Package,
    ) -> Result<Vec<PackageVersion>> {
        self.client()
            .get_package_versions(self.feed_project(), &feed.id, &package.id)
            .context("get_package_versions", &package.name)
    }
}
