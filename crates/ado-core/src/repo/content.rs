//! File content, directory listings, archives and remote project config.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::AdoRepository;
use super::models::ItemKind;
use crate::config::RemoteProjectConfig;
use crate::config::remote::REMOTE_CONFIG_FILE;
use crate::error::{Result, VcsError};
use crate::host::HostResultExt;

impl AdoRepository {
    /// Direct children of `path` at `git_ref`, keyed by name.
    pub(crate) fn directory_contents(
        &self,
        path: &str,
        git_ref: &str,
    ) -> Result<BTreeMap<String, ItemKind>> {
        let folder = path.trim_matches('/');
        let items = self
            .client()
            .get_items(&self.scope, path, git_ref)
            .context("get_items", format!("{}@{}", path, git_ref))?;

        Ok(items
            .into_iter()
            .filter(|item| item.path.trim_matches('/') != folder)
            .filter_map(|item| {
                let name = item
                    .path
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()?
                    .to_string();
                let kind = if item.is_folder {
                    ItemKind::Folder
                } else {
                    ItemKind::File
                };
                (!name.is_empty()).then_some((name, kind))
            })
            .collect())
    }

    pub(crate) fn file_contents(&self, path: &str, git_ref: &str) -> Result<String> {
        self.client()
            .get_item_content(&self.scope, path, git_ref)
            .context("get_item_content", format!("{}@{}", path, git_ref))
    }

    /// Download the tree at `git_ref` and extract it into `dest`.
    pub(crate) fn archive(&self, git_ref: &str, dest: &Path) -> Result<PathBuf> {
        let sha = self.resolve_commit_sha(git_ref)?;
        let commit = self.get_commit(&sha)?;
        let bytes = self
            .client()
            .get_tree_zip(&self.scope, &commit.tree_id)
            .context("get_tree_zip", &commit.tree_id)?;

        extract_zip(&bytes, dest)?;
        debug!(git_ref, dest = %dest.display(), "Extracted repository archive");
        Ok(dest.to_path_buf())
    }

    /// Project configuration at `git_ref`; defaults when the file is absent.
    pub(crate) fn project_config(&self, git_ref: &str) -> Result<RemoteProjectConfig> {
        if let Some(config) = self.configs.borrow().get(git_ref) {
            return Ok(config.clone());
        }

        let config = match self.file_contents(REMOTE_CONFIG_FILE, git_ref) {
            Ok(content) => RemoteProjectConfig::from_toml_str(&content)?,
            Err(err) if err.is_not_found() => {
                debug!(git_ref, "No remote project config; using defaults");
                RemoteProjectConfig::default()
            }
            Err(err) => return Err(err),
        };
        self.configs
            .borrow_mut()
            .insert(git_ref.to_string(), config.clone());
        Ok(config)
    }
}

fn extract_zip(data: &[u8], dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let outpath = match file.enclosed_name() {
            Some(path) => dest.join(path),
            None => {
                return Err(VcsError::validation(format!(
                    "Archive entry escapes the destination: {}",
                    file.name()
                )));
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        std::fs::File::create(&outpath)?.write_all(&buffer)?;
    }
    Ok(())
}
