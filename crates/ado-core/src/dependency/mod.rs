//! Dependency model.
//!
//! A `DynamicDependency` names a repository plus an optional tag, ref or
//! release selector and must be resolved to a concrete ref before it can be
//! flattened. `StaticDependency` values are fully resolved and are what the
//! deployment pipeline consumes.

mod flatten;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VcsError};
use crate::resolver::ResolutionStrategy;

pub use flatten::get_static_dependencies;

/// Pin a repository to a specific tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPin {
    #[serde(alias = "azure_devops")]
    pub url: String,
    pub tag: String,
}

/// Which release a dynamic dependency should track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseSelector {
    Latest,
    LatestBeta,
}

impl ReleaseSelector {
    pub fn strategies(self) -> Vec<ResolutionStrategy> {
        match self {
            Self::Latest => vec![ResolutionStrategy::ReleaseTag],
            Self::LatestBeta => vec![
                ResolutionStrategy::BetaReleaseTag,
                ResolutionStrategy::ReleaseTag,
            ],
        }
    }
}

/// Reference to a repository that still needs a concrete ref.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicDependency {
    #[serde(default, alias = "azure_devops")]
    pub url: Option<String>,
    /// Concrete ref; set by resolution or declared up front
    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub release: Option<ReleaseSelector>,
    /// Deploy only this folder of the repository, always unmanaged
    #[serde(default)]
    pub subfolder: Option<String>,
    #[serde(default)]
    pub unmanaged: bool,
    #[serde(default)]
    pub namespace_inject: Option<String>,
    #[serde(default)]
    pub namespace_strip: Option<String>,
    /// `unpackaged/pre/<name>` style paths to leave out when flattening
    #[serde(default)]
    pub skip: Vec<String>,
    #[serde(skip)]
    pub package_dependency: Option<StaticDependency>,
}

impl DynamicDependency {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        self.git_ref = Some(git_ref.into());
        self
    }

    pub fn with_unmanaged(mut self, unmanaged: bool) -> Self {
        self.unmanaged = unmanaged;
        self
    }

    pub fn with_skip(mut self, path: impl Into<String>) -> Self {
        self.skip.push(path.into());
        self
    }

    pub fn with_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = Some(subfolder.into());
        self
    }

    /// Repository URL; a dependency without one cannot be located.
    pub fn url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| VcsError::validation("missing dependency locator"))
    }

    pub fn validate(&self) -> Result<()> {
        self.url().map(|_| ())
    }

    pub fn is_resolved(&self) -> bool {
        self.git_ref.is_some()
    }

    /// Apply the first pin naming this repository.
    ///
    /// Returns true when a pin applied. A pin that disagrees with an explicit
    /// tag is an error.
    pub fn apply_pins(&mut self, pins: &[DependencyPin]) -> Result<bool> {
        let url = self.url()?.trim_end_matches('/').to_string();
        let Some(pin) = pins
            .iter()
            .find(|pin| pin.url.trim_end_matches('/') == url)
        else {
            return Ok(false);
        };

        match &self.tag {
            Some(tag) if tag != &pin.tag => Err(VcsError::resolution(format!(
                "A pin is specified for {}, but the dependency already has tag {} (pin {})",
                url, tag, pin.tag
            ))),
            _ => {
                self.tag = Some(pin.tag.clone());
                Ok(true)
            }
        }
    }

    pub fn description(&self) -> String {
        let url = self.url.as_deref().unwrap_or("<no url>");
        let unmanaged = if self.unmanaged { " (unmanaged)" } else { "" };
        let location = self
            .tag
            .as_deref()
            .or(self.git_ref.as_deref())
            .map(|loc| format!(" @{}", loc))
            .unwrap_or_default();
        format!("{}{}{}", url, unmanaged, location)
    }
}

impl fmt::Display for DynamicDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Unmanaged metadata at a specific ref, optionally one subfolder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnmanagedRefDependency {
    pub url: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub subfolder: Option<String>,
    #[serde(default)]
    pub unmanaged: bool,
    #[serde(default)]
    pub namespace_inject: Option<String>,
    #[serde(default)]
    pub namespace_strip: Option<String>,
}

impl UnmanagedRefDependency {
    pub fn new(url: impl Into<String>, git_ref: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            git_ref: git_ref.into(),
            subfolder: None,
            unmanaged: false,
            namespace_inject: None,
            namespace_strip: None,
        }
    }

    fn subfolder_suffix(&self) -> String {
        match self.subfolder.as_deref() {
            Some(sub) if sub != "src" => format!("/{}", sub),
            _ => String::new(),
        }
    }

    pub fn name(&self) -> String {
        format!("Deploy {}{}", self.url, self.subfolder_suffix())
    }

    pub fn description(&self) -> String {
        format!("{}{} @{}", self.url, self.subfolder_suffix(), self.git_ref)
    }
}

/// Package version identified by namespace and version number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageNamespaceVersionDependency {
    pub namespace: String,
    pub version: String,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub version_id: Option<String>,
}

/// Package version identified by its version id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageVersionIdDependency {
    pub version_id: String,
    #[serde(default)]
    pub version_number: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
}

/// Fully resolved dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StaticDependency {
    Unmanaged(UnmanagedRefDependency),
    PackageNamespaceVersion(PackageNamespaceVersionDependency),
    PackageVersionId(PackageVersionIdDependency),
}

impl StaticDependency {
    pub fn name(&self) -> String {
        match self {
            Self::Unmanaged(dep) => dep.name(),
            Self::PackageNamespaceVersion(dep) => format!(
                "Install {} {}",
                dep.package_name.as_deref().unwrap_or(&dep.namespace),
                dep.version
            ),
            Self::PackageVersionId(dep) => format!(
                "Install {} {}",
                dep.package_name.as_deref().unwrap_or("package"),
                dep.version_number.as_deref().unwrap_or(&dep.version_id)
            ),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Unmanaged(dep) => dep.description(),
            Self::PackageNamespaceVersion(dep) => format!("{}@{}", dep.namespace, dep.version),
            Self::PackageVersionId(dep) => dep.version_id.clone(),
        }
    }
}

/// A dependency as declared in project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    PackageNamespaceVersion(PackageNamespaceVersionDependency),
    PackageVersionId(PackageVersionIdDependency),
    Repository(DynamicDependency),
}

/// A declared dependency, either still dynamic or already static.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Dynamic(DynamicDependency),
    Static(StaticDependency),
}

impl Dependency {
    pub fn description(&self) -> String {
        match self {
            Self::Dynamic(dep) => dep.description(),
            Self::Static(dep) => dep.description(),
        }
    }
}

impl TryFrom<DependencySpec> for Dependency {
    type Error = VcsError;

    fn try_from(spec: DependencySpec) -> Result<Self> {
        Ok(match spec {
            DependencySpec::PackageNamespaceVersion(dep) => {
                Self::Static(StaticDependency::PackageNamespaceVersion(dep))
            }
            DependencySpec::PackageVersionId(dep) => {
                Self::Static(StaticDependency::PackageVersionId(dep))
            }
            DependencySpec::Repository(dep) => {
                dep.validate()?;
                Self::Dynamic(dep)
            }
        })
    }
}

/// Validate declared dependencies.
pub fn parse_dependencies(specs: &[DependencySpec]) -> Result<Vec<Dependency>> {
    specs.iter().cloned().map(Dependency::try_from).collect()
}
