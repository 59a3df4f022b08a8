//! Vault scanning: validates the vault marker, enumerates documents and
//! assets, and captures frontmatter and raw link targets per document.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::instrument;
use vaultport_core::{
    Error, ExportConfig, FolderNode, Metadata, Result, VaultStructure, Warning, WarningKind,
};
use vaultport_parser::{link_targets, parse_frontmatter, split_frontmatter};
use walkdir::{DirEntry, WalkDir};

/// Directory whose presence marks a folder as an Obsidian vault
pub const VAULT_MARKER: &str = ".obsidian";

/// Directories skipped unless configured otherwise
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[".obsidian", ".trash", ".git"];

/// Everything learned from one pass over the vault.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedVault {
    pub structure: VaultStructure,
    pub folders: FolderNode,
    /// Frontmatter and read problems found while scanning
    pub warnings: Vec<Warning>,
}

impl ScannedVault {
    /// Vault directory name.
    pub fn name(&self) -> &str {
        &self.folders.name
    }
}

/// Walks a vault directory and builds its [`VaultStructure`].
#[derive(Debug, Clone)]
pub struct VaultScanner {
    root: PathBuf,
    excluded_dirs: Vec<String>,
}

impl VaultScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Scanner using the vault path and exclusions of an export configuration.
    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(&config.vault_path).with_excluded_dirs(config.excluded_dirs.clone())
    }

    /// Replace the excluded directory names. Hidden directories are always skipped.
    pub fn with_excluded_dirs(mut self, dirs: Vec<String>) -> Self {
        self.excluded_dirs = dirs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vault name: the final component of the root path.
    pub fn vault_name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vault".to_string())
    }

    /// Whether the root contains the vault marker directory.
    pub fn is_vault(&self) -> bool {
        self.root.join(VAULT_MARKER).is_dir()
    }

    /// Scan the vault.
    ///
    /// Fails with `NotAVault` when the marker directory is missing and with
    /// `EmptyVault` when no markdown documents are found.
    #[instrument(skip(self), fields(root = %self.root.display()), name = "vault_scan")]
    pub fn scan(&self) -> Result<ScannedVault> {
        if !self.root.is_dir() {
            return Err(Error::file_not_found(&self.root));
        }
        if !self.is_vault() {
            return Err(Error::not_a_vault(&self.root));
        }

        let mut markdown_files = Vec::new();
        let mut asset_files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_skipped(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(relative) = self.relative_path(entry.path()) else {
                continue;
            };
            if is_markdown(entry.path()) {
                markdown_files.push(relative);
            } else {
                asset_files.push(relative);
            }
        }

        markdown_files.sort();
        asset_files.sort();

        if markdown_files.is_empty() {
            return Err(Error::empty_vault(&self.root));
        }

        let mut warnings = Vec::new();
        let mut links = BTreeMap::new();
        let mut metadata = BTreeMap::new();
        let mut readable = Vec::with_capacity(markdown_files.len());

        for path in markdown_files {
            let content = match fs::read_to_string(self.root.join(&path)) {
                Ok(content) => content,
                Err(e) => {
                    warnings.push(Warning::new(
                        WarningKind::UnreadableDocument,
                        &path,
                        format!("Could not read document: {}", e),
                    ));
                    continue;
                }
            };

            let (frontmatter, body) = split_frontmatter(&content);
            let map = match frontmatter.map(parse_frontmatter) {
                Some(Ok(map)) => map,
                Some(Err(e)) => {
                    warnings.push(Warning::new(
                        WarningKind::MalformedFrontmatter,
                        &path,
                        format!("Frontmatter ignored: {}", e),
                    ));
                    Metadata::new()
                }
                None => Metadata::new(),
            };

            links.insert(path.clone(), link_targets(body));
            metadata.insert(path.clone(), map);
            readable.push(path);
        }

        if readable.is_empty() {
            return Err(Error::empty_vault(&self.root));
        }

        let folders = FolderNode::build(&self.vault_name(), &readable);
        let structure = VaultStructure {
            root: self.root.clone(),
            markdown_files: readable,
            asset_files,
            links,
            metadata,
        };

        log::info!(
            "Scanned vault {}: {} documents, {} assets, {} links",
            self.root.display(),
            structure.markdown_files.len(),
            structure.asset_files.len(),
            structure.total_links()
        );

        Ok(ScannedVault {
            structure,
            folders,
            warnings,
        })
    }

    /// Read a document body (frontmatter removed) by relative path.
    pub fn read_document(&self, relative: &str) -> Result<String> {
        let content = self.read_raw(relative)?;
        let (_, body) = split_frontmatter(&content);
        Ok(body.to_string())
    }

    /// Read a document as stored on disk.
    pub fn read_raw(&self, relative: &str) -> Result<String> {
        let path = self.absolute_path(relative)?;
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::file_not_found(&path),
            _ => Error::io(e),
        })
    }

    /// On-disk location of a vault-relative path. Paths escaping the vault are rejected.
    pub fn absolute_path(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::file_not_found(relative));
        }
        Ok(self.root.join(relative))
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            return true;
        }
        entry.file_type().is_dir() && self.excluded_dirs.iter().any(|d| *d == name)
    }

    fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vault() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".obsidian")).unwrap();
        dir
    }

    fn write(dir: &TempDir, path: &str, content: &str) {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }

    #[test]
    fn test_missing_marker() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("A.md"), "# A").unwrap();
        let err = VaultScanner::new(dir.path()).scan().unwrap_err();
        assert!(matches!(err, Error::NotAVault { .. }));
    }

    #[test]
    fn test_empty_vault() {
        let dir = vault();
        write(&dir, "image.png", "png");
        let err = VaultScanner::new(dir.path()).scan().unwrap_err();
        assert!(matches!(err, Error::EmptyVault { .. }));
    }

    #[test]
    fn test_missing_root() {
        let err = VaultScanner::new("/definitely/not/here").scan().unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn test_scan_classifies_and_sorts() {
        let dir = vault();
        write(&dir, "b.md", "See [[a]] and ![[img/pic.png]]");
        write(&dir, "a.md", "---\ntitle: Alpha\n---\nBody");
        write(&dir, "notes/c.MD", "# C");
        write(&dir, "img/pic.png", "png");
        write(&dir, ".obsidian/app.json", "{}");
        write(&dir, ".trash/old.md", "old");
        write(&dir, ".hidden/secret.md", "secret");
        write(&dir, ".DS_Store", "junk");

        let scanned = VaultScanner::new(dir.path()).scan().unwrap();
        let s = &scanned.structure;
        assert_eq!(s.markdown_files, vec!["a.md", "b.md", "notes/c.MD"]);
        assert_eq!(s.asset_files, vec!["img/pic.png"]);
        assert_eq!(s.links["b.md"], vec!["a", "img/pic.png"]);
        assert_eq!(s.metadata["a.md"]["title"], "Alpha");
        assert!(scanned.warnings.is_empty());
        assert_eq!(scanned.folders.documents, vec!["a.md", "b.md"]);
        assert_eq!(scanned.folders.children[0].path, "notes");
    }

    #[test]
    fn test_custom_excluded_dir() {
        let dir = vault();
        write(&dir, "a.md", "A");
        write(&dir, "templates/t.md", "T");
        let scanned = VaultScanner::new(dir.path())
            .with_excluded_dirs(vec!["templates".into()])
            .scan()
            .unwrap();
        assert_eq!(scanned.structure.markdown_files, vec!["a.md"]);
    }

    #[test]
    fn test_malformed_frontmatter_warns() {
        let dir = vault();
        write(&dir, "bad.md", "---\ntitle: [unclosed\n---\nBody");
        let scanned = VaultScanner::new(dir.path()).scan().unwrap();
        assert!(scanned.structure.metadata["bad.md"].is_empty());
        assert_eq!(scanned.warnings.len(), 1);
        assert_eq!(scanned.warnings[0].kind, WarningKind::MalformedFrontmatter);
        assert_eq!(scanned.warnings[0].document, "bad.md");
    }

    #[test]
    fn test_read_document_strips_frontmatter() {
        let dir = vault();
        write(&dir, "sub/a.md", "---\ntitle: A\n---\nHello");
        let scanner = VaultScanner::new(dir.path());
        assert_eq!(scanner.read_document("sub/a.md").unwrap(), "Hello");
        assert!(matches!(
            scanner.read_document("missing.md"),
            Err(Error::FileNotFound { .. })
        ));
        assert!(scanner.read_document("../outside.md").is_err());
    }

    #[test]
    fn test_vault_name() {
        let dir = vault();
        let vault_dir = dir.path().join("My Vault");
        fs::create_dir_all(vault_dir.join(".obsidian")).unwrap();
        fs::write(vault_dir.join("a.md"), "A").unwrap();
        let scanned = VaultScanner::new(&vault_dir).scan().unwrap();
        assert_eq!(scanned.name(), "My Vault");
    }
}
