//! TOML parser for adapter settings with helpful error messages

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::settings::AdoSettings;

pub const SETTINGS_FILE_NAME: &str = "ado.toml";

/// Parse a settings file with detailed error messages
pub fn parse_settings_toml(path: &Path) -> Result<AdoSettings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

    parse_settings_toml_str(&content)
        .with_context(|| format!("Failed to parse settings file: {}", path.display()))
}

/// Parse settings content from string
pub fn parse_settings_toml_str(content: &str) -> Result<AdoSettings> {
    let settings: AdoSettings =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    settings.validate()?;

    Ok(settings)
}

/// Load `ado.toml` from `dir` if present, otherwise the user-level file,
/// otherwise defaults.
pub fn load_settings(dir: &Path) -> Result<AdoSettings> {
    let local = dir.join(SETTINGS_FILE_NAME);
    if local.is_file() {
        return parse_settings_toml(&local);
    }
    match user_settings_path() {
        Some(path) if path.is_file() => parse_settings_toml(&path),
        _ => Ok(AdoSettings::default()),
    }
}

/// `~/.config/cumulusci-ado/ado.toml` (platform config dir)
pub fn user_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("cumulusci-ado").join(SETTINGS_FILE_NAME))
}

/// Serialize settings to a TOML string
pub fn to_toml(settings: &AdoSettings) -> Result<String> {
    toml::to_string_pretty(settings).with_context(|| "Failed to serialize settings to TOML")
}

/// Enhance TOML parsing errors with the offending line
pub(crate) fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error
        .span()
        .and_then(|span| content.get(..span.start))
        .map(|before| before.matches('\n').count() + 1)
        .or_else(|| {
            error_msg
                .lines()
                .find(|line| line.contains("line "))
                .and_then(|line| {
                    line.split("line ")
                        .nth(1)
                        .and_then(|s| s.split_whitespace().next())
                        .and_then(|s| s.parse::<usize>().ok())
                })
        });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 1).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedScope;
    use crate::host::MergeStrategy;
    use crate::version::BuildLabelPolicy;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_full_settings() {
        let toml = r#"
feed_name = "New Project Feed"
feed_scope = "project"
retry_timeout_secs = 60
retry_interval_secs = 2.5
create_pull_request_on_conflict = false
build_label = { policy = "fixed", label = "ci" }

[completion]
delete_source_branch = true
merge_strategy = "rebaseMerge"
"#;

        let settings = parse_settings_toml_str(toml).unwrap();
        assert_eq!(settings.feed_name.as_deref(), Some("New Project Feed"));
        assert_eq!(settings.feed_scope, FeedScope::Project);
        assert_eq!(settings.retry_interval_secs, 2.5);
        assert!(!settings.create_pull_request_on_conflict);
        assert_eq!(settings.build_label, BuildLabelPolicy::Fixed("ci".to_string()));
        assert!(settings.completion.delete_source_branch);
        assert_eq!(settings.completion.merge_strategy, MergeStrategy::RebaseMerge);
    }

    #[test]
    fn test_parse_empty_settings() {
        let settings = parse_settings_toml_str("").unwrap();
        assert_eq!(settings, AdoSettings::default());
    }

    #[test]
    fn test_parse_invalid_toml_reports_line() {
        let toml = "feed_name = \"x\"\n[completion\nmerge_strategy = \"squash\"\n";
        let err = parse_settings_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("TOML parsing error"));
        assert!(err.contains(">>>"));
    }

    #[test]
    fn test_validation_failure() {
        let err = parse_settings_toml_str("retry_timeout_secs = -1").unwrap_err();
        assert!(err.to_string().contains("retry_timeout_secs"));
    }

    #[test]
    fn test_parse_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "branch_prefix = \"automation/\"").unwrap();
        let settings = parse_settings_toml(file.path()).unwrap();
        assert_eq!(settings.branch_prefix, "automation/");
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let err = format!("{:#}", parse_settings_toml(&path).unwrap_err());
        assert!(err.contains("missing.toml"));
    }

    #[test]
    fn test_load_settings_prefers_local_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE_NAME), "release_view = \"Stable\"").unwrap();
        let settings = load_settings(dir.path()).unwrap();
        assert_eq!(settings.release_view, "Stable");
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let original = AdoSettings::default().with_feed("packages", FeedScope::Project);
        let text = to_toml(&original).unwrap();
        assert_eq!(parse_settings_toml_str(&text).unwrap(), original);
    }
}
