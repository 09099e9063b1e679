//! Free-form tag string to semver conversion.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VcsError};

/// Label used for the fourth numeric component when nothing else applies.
pub const DEFAULT_BUILD_LABEL: &str = "build";

/// How the fourth ("build") component of a tag is labelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "label", rename_all = "kebab-case")]
pub enum BuildLabelPolicy {
    /// Always use the configured label, ignoring any parsed prefix.
    Fixed(String),
    /// Reuse a parsed prefix as the label; fall back to the configured label.
    PreferParsedPrefix(String),
}

impl Default for BuildLabelPolicy {
    fn default() -> Self {
        Self::PreferParsedPrefix(DEFAULT_BUILD_LABEL.to_string())
    }
}

impl BuildLabelPolicy {
    fn label<'a>(&'a self, prefix: Option<&'a str>) -> &'a str {
        match self {
            Self::Fixed(label) => label,
            Self::PreferParsedPrefix(fallback) => prefix.unwrap_or(fallback.as_str()),
        }
    }
}

/// Components extracted from a free-form version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVersion {
    pub prefix: Option<String>,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub build: Option<u64>,
}

impl ParsedVersion {
    /// Parse `[prefix<sep>]M.m.p[.b]`.
    ///
    /// The prefix is an alphanumeric run followed by at least one separator
    /// character that is neither a digit nor a dot.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (prefix, numbers) = split_prefix(input);

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() < 3 {
            return Err(VcsError::validation(format!(
                "Version '{}' must have at least major.minor.patch",
                input
            )));
        }

        let number = |part: &str| -> Result<u64> {
            part.parse::<u64>().map_err(|_| {
                VcsError::validation(format!(
                    "Version '{}' has a non-numeric component '{}'",
                    input, part
                ))
            })
        };

        Ok(Self {
            prefix: prefix.map(str::to_string),
            major: number(parts[0])?,
            minor: number(parts[1])?,
            patch: number(parts[2])?,
            build: parts.get(3).map(|part| number(*part)).transpose()?,
        })
    }
}

/// Converts tag strings to semver using a configured label policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionNormalizer {
    policy: BuildLabelPolicy,
}

impl VersionNormalizer {
    pub fn new(policy: BuildLabelPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BuildLabelPolicy {
        &self.policy
    }

    /// Normalize to `M.m.p`, `M.m.p-prefix` or `M.m.p-label.build`.
    pub fn normalize(&self, custom_version: &str) -> Result<semver::Version> {
        let parsed = ParsedVersion::parse(custom_version)?;
        let core = format!("{}.{}.{}", parsed.major, parsed.minor, parsed.patch);

        let text = match (parsed.prefix.as_deref(), parsed.build) {
            (prefix, Some(build)) => {
                format!("{}-{}.{}", core, self.policy.label(prefix), build)
            }
            (Some(prefix), None) => format!("{}-{}", core, prefix),
            (None, None) => core,
        };

        semver::Version::parse(&text).map_err(|e| {
            VcsError::validation(format!(
                "Version '{}' does not normalize to semver ('{}'): {}",
                custom_version, text, e
            ))
        })
    }

    pub fn normalize_to_string(&self, custom_version: &str) -> Result<String> {
        self.normalize(custom_version).map(|v| v.to_string())
    }
}

/// Normalize with an optional build-label override (default `build`).
pub fn normalize_version(
    custom_version: &str,
    build_prefix_override: Option<&str>,
) -> Result<semver::Version> {
    let label = build_prefix_override.unwrap_or(DEFAULT_BUILD_LABEL);
    VersionNormalizer::new(BuildLabelPolicy::PreferParsedPrefix(label.to_string()))
        .normalize(custom_version)
}

/// Split into (prefix, numeric tail). Without a well-formed prefix the whole
/// input is the numeric part.
fn split_prefix(input: &str) -> (Option<&str>, &str) {
    let is_numeric = |c: char| c.is_ascii_digit() || c == '.';

    let tail_start = input
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_numeric(*c))
        .last()
        .map(|(idx, _)| idx);

    let Some(tail_start) = tail_start else {
        return (None, input);
    };
    let head = &input[..tail_start];
    if head.is_empty() {
        return (None, input);
    }

    let alnum_end = head
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric())
        .map(|(idx, _)| idx)
        .unwrap_or(head.len());

    let prefix = if alnum_end == head.len() {
        // Entirely alphanumeric: the last character acts as the separator.
        let cut = head
            .char_indices()
            .last()
            .map(|(idx, _)| idx)
            .unwrap_or_default();
        &head[..cut]
    } else if head[alnum_end..].chars().all(|c| !is_numeric(c)) {
        &head[..alnum_end]
    } else {
        ""
    };

    if prefix.is_empty() {
        (None, input)
    } else {
        (Some(prefix), &input[tail_start..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> VersionNormalizer {
        VersionNormalizer::new(BuildLabelPolicy::Fixed(DEFAULT_BUILD_LABEL.to_string()))
    }

    #[test]
    fn normalizes_table() {
        let preferred = VersionNormalizer::default();
        let cases = [
            // (input, prefer-parsed-prefix, fixed)
            ("1.2.3", "1.2.3", "1.2.3"),
            ("1.2.3.4", "1.2.3-build.4", "1.2.3-build.4"),
            ("alpha-1.2.3", "1.2.3-alpha", "1.2.3-alpha"),
            ("beta_0.1.0.1", "0.1.0-beta.1", "0.1.0-build.1"),
            ("beta/0.1.0.1", "0.1.0-beta.1", "0.1.0-build.1"),
            ("rc1_2.0.0", "2.0.0-rc1", "2.0.0-rc1"),
        ];

        for (input, expected_preferred, expected_fixed) in cases {
            assert_eq!(
                preferred.normalize_to_string(input).unwrap(),
                expected_preferred,
                "prefer-parsed-prefix for {}",
                input
            );
            assert_eq!(
                fixed().normalize_to_string(input).unwrap(),
                expected_fixed,
                "fixed for {}",
                input
            );
        }
    }

    #[test]
    fn override_label_applies_without_prefix() {
        let version = normalize_version("1.2.3.7", Some("ci")).unwrap();
        assert_eq!(version.to_string(), "1.2.3-ci.7");
    }

    #[test]
    fn too_few_components_is_validation_error() {
        let err = normalize_version("1.2", None).unwrap_err();
        assert!(matches!(err, VcsError::Validation(_)));
    }

    #[test]
    fn non_numeric_component_is_validation_error() {
        assert!(matches!(
            normalize_version("v1.2.x", None).unwrap_err(),
            VcsError::Validation(_)
        ));
    }

    #[test]
    fn parses_prefix_and_build() {
        let parsed = ParsedVersion::parse("beta_0.1.0.1").unwrap();
        assert_eq!(parsed.prefix.as_deref(), Some("beta"));
        assert_eq!((parsed.major, parsed.minor, parsed.patch), (0, 1, 0));
        assert_eq!(parsed.build, Some(1));
    }

    #[test]
    fn normalized_versions_order_by_semver() {
        let normalizer = VersionNormalizer::default();
        let older = normalizer.normalize("1.2.3").unwrap();
        let newer = normalizer.normalize("1.10.0").unwrap();
        assert!(newer > older);
    }
}
