//! Project configuration read from a repository at a ref.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dependency::DependencySpec;

/// File holding a project's configuration at the repository root.
pub const REMOTE_CONFIG_FILE: &str = "cumulusci.toml";

pub const DEFAULT_FEATURE_PREFIX: &str = "feature/";

/// Status-context key used for second-generation package builds.
pub const CONTEXT_2GP: &str = "2gp_context";
/// Status-context key used for unlocked package builds.
pub const CONTEXT_UNLOCKED: &str = "unlocked_context";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteProjectConfig {
    #[serde(default)]
    pub project: ProjectSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub package: PackageSection,
    #[serde(default)]
    pub git: GitSection,
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitSection {
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub prefix_feature: Option<String>,
    /// Commit-status context names keyed by `2gp_context` / `unlocked_context`
    #[serde(default)]
    pub commit_status_context: BTreeMap<String, String>,
}

impl RemoteProjectConfig {
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Package name, falling back to the project name and then `fallback`.
    pub fn package_name(&self, fallback: &str) -> String {
        self.project
            .package
            .name
            .clone()
            .or_else(|| self.project.name.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.project
            .package
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
    }

    pub fn feature_prefix(&self) -> &str {
        self.feature_prefix_or(DEFAULT_FEATURE_PREFIX)
    }

    /// Configured feature prefix, or `fallback` when the project sets none.
    pub fn feature_prefix_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.project
            .git
            .prefix_feature
            .as_deref()
            .unwrap_or(fallback)
    }

    /// Configured status context for `key`, or `default_label`.
    pub fn status_context<'a>(&'a self, key: &str, default_label: &'a str) -> &'a str {
        self.project
            .git
            .commit_status_context
            .get(key)
            .map(String::as_str)
            .unwrap_or(default_label)
    }
}
