//! Repository URL parsing.
//!
//! Accepts both remote URL shapes the host hands out:
//! - `https://user@dev.azure.com/org/project/_git/repo[.git]`
//! - `git@ssh.dev.azure.com:v3/org/project/repo[.git]`

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, VcsError};

/// Message carried by the validation error for empty input.
pub const EMPTY_URL_MESSAGE: &str = "empty URL";

const HEADS_PREFIX: &str = "refs/heads/";

/// Components of a repository URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoUrl {
    /// Organization or user (first path segment)
    pub owner: String,
    /// Repository name without a trailing `.git`
    pub name: String,
    /// Host name; empty for scheme-less shorthand
    pub host: String,
    /// Project (second path segment), if any
    pub project: Option<String>,
}

impl RepoUrl {
    /// `owner/project/name`, or `owner/name` without a project.
    pub fn full_name(&self) -> String {
        match &self.project {
            Some(project) => format!("{}/{}/{}", self.owner, project, self.name),
            None => format!("{}/{}", self.owner, self.name),
        }
    }

    /// Key used to match a configured service: `host/owner`.
    pub fn service_key(&self) -> String {
        format!("{}/{}", self.host, self.owner)
    }

    /// Project used for host calls, falling back to the repository name.
    pub fn project_or_name(&self) -> &str {
        self.project.as_deref().unwrap_or(&self.name)
    }
}

/// Parse a repository URL into owner, name, host and project.
///
/// Empty or missing input is the only rejected case. Anything else degrades
/// gracefully so shorthand such as `org/repo` still yields an owner and name.
pub fn parse_repo_url<'a>(url: impl Into<Option<&'a str>>) -> Result<RepoUrl> {
    let raw = url.into().map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(VcsError::validation(EMPTY_URL_MESSAGE));
    }

    let scp_style = raw.starts_with("git");
    let formatted = if scp_style {
        format!("ssh://{}", raw)
    } else {
        raw.to_string()
    };

    let (mut host, path) = split_host_and_path(&formatted);
    if scp_style && let Some(stripped) = host.strip_prefix("ssh.") {
        host = stripped.to_string();
    }

    let mut segments: Vec<&str> = path
        .split(['/', '@', ':'])
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        segments.push(if host.is_empty() { raw } else { host.as_str() });
    }

    let last = segments[segments.len() - 1];
    let name = last.strip_suffix(".git").unwrap_or(last).to_string();
    let owner = segments[0].to_string();
    let project = segments.get(1).map(|s| s.to_string());

    Ok(RepoUrl {
        owner,
        name,
        host,
        project,
    })
}

/// Strip the `refs/heads/` prefix the host puts on branch names.
pub fn sanitize_branch_name(name: &str) -> &str {
    name.strip_prefix(HEADS_PREFIX).unwrap_or(name)
}

/// Qualify a short branch name as `refs/heads/<name>`.
pub fn qualify_branch_name(name: &str) -> String {
    if name.starts_with(HEADS_PREFIX) {
        name.to_string()
    } else {
        format!("{}{}", HEADS_PREFIX, name)
    }
}

/// Split `scheme://authority/path` into (host, path). Scheme-less input is
/// treated as a bare path.
fn split_host_and_path(formatted: &str) -> (String, String) {
    let Some((scheme, rest)) = formatted.split_once("://") else {
        return (String::new(), formatted.to_string());
    };

    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();

    // scp-style `host:v3` is not a port; drop it so the URL parser accepts it.
    let authority = match authority.rsplit_once(':') {
        Some((head, port)) if !port.chars().all(|c| c.is_ascii_digit()) => head,
        _ => authority,
    };

    let host = Url::parse(&format!("{}://{}/", scheme, authority))
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default();

    (host, path.to_string())
}
