//! Package model shared by every format.
//!
//! Each format assembles its generated documents into a [`Package`]: an
//! ordered list of in-memory files and on-disk assets. The ZIP writer in
//! [`crate::archive`] consumes any package through that one interface.

use crate::ids::DocumentIds;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use vaultport_core::{FolderNode, Result, TransformedContent, Warning, WarningKind};

/// Name of the warnings file written at the package root
pub const WARNINGS_FILE: &str = "warnings.txt";

/// One file inside a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageEntry {
    /// Generated content
    Bytes { path: String, data: Vec<u8> },
    /// File copied from disk
    File { path: String, source: PathBuf },
}

impl PackageEntry {
    pub fn bytes(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            path: path.into(),
            data: data.into(),
        }
    }

    pub fn file(path: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Path inside the package.
    pub fn path(&self) -> &str {
        match self {
            Self::Bytes { path, .. } | Self::File { path, .. } => path,
        }
    }
}

/// An assembled, ready-to-write package.
pub trait Package {
    /// Files of the package in write order.
    fn entries(&self) -> Vec<PackageEntry>;

    /// Every warning of the run, assembly warnings included.
    fn warnings(&self) -> &[Warning];

    fn document_count(&self) -> usize;

    fn asset_count(&self) -> usize;
}

/// Vault-level facts the assemblers need.
#[derive(Debug, Clone)]
pub struct VaultInfo {
    /// Package / collection name
    pub name: String,
    /// Vault root on disk, for resolving asset sources
    pub root: PathBuf,
    pub folders: FolderNode,
    pub created_at: DateTime<Utc>,
}

impl VaultInfo {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, folders: FolderNode) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            folders,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Absolute source path of a vault-relative asset.
    pub fn asset_source(&self, asset: &str) -> PathBuf {
        self.root.join(asset)
    }
}

/// A target format: per-document generation plus package assembly.
///
/// Generation runs concurrently across documents and must only read its
/// inputs; assembly runs once on the collected results.
pub trait FormatExporter: Sync {
    type Document: Send;
    type Output: Package;

    fn generate_document(&self, content: &TransformedContent, ids: &DocumentIds) -> Self::Document;

    /// Fails with `EmptyVault` when `documents` is empty.
    fn assemble(
        &self,
        documents: Vec<Self::Document>,
        vault: &VaultInfo,
        warnings: Vec<Warning>,
    ) -> Result<Self::Output>;
}

// ============================================================================
// Assembly helpers
// ============================================================================

/// Hands out unique file names: `name.ext`, then `name_1.ext`, `name_2.ext`...
#[derive(Debug, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, name: &str) -> String {
        if self.used.insert(name.to_string()) {
            return name.to_string();
        }

        let (base, ext) = match name.rsplit_once('.') {
            Some((base, ext)) if !base.is_empty() => (base, format!(".{}", ext)),
            _ => (name, String::new()),
        };
        let mut counter = 1;
        loop {
            let candidate = format!("{}_{}{}", base, counter, ext);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Check an asset exists on disk; otherwise record an `AssetCopyFailed`
/// warning against `document` and return `None`.
pub fn locate_asset(
    vault: &VaultInfo,
    asset: &str,
    document: &str,
    warnings: &mut Vec<Warning>,
) -> Option<PathBuf> {
    let source = vault.asset_source(asset);
    if source.is_file() {
        return Some(source);
    }
    log::warn!("Asset {} is missing on disk", source.display());
    warnings.push(
        Warning::new(
            WarningKind::AssetCopyFailed,
            document,
            format!("Asset '{}' could not be read from the vault", asset),
        )
        .with_raw(asset),
    );
    None
}

/// Size of a file on disk, 0 when unreadable.
pub fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// `warnings.txt` entry, or `None` when there is nothing to report.
pub fn warnings_entry(warnings: &[Warning]) -> Option<PackageEntry> {
    if warnings.is_empty() {
        return None;
    }
    let text = warnings
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    Some(PackageEntry::bytes(WARNINGS_FILE, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names() {
        let mut names = UniqueNames::new();
        assert_eq!(names.claim("note.json"), "note.json");
        assert_eq!(names.claim("note.json"), "note_1.json");
        assert_eq!(names.claim("note.json"), "note_2.json");
        assert_eq!(names.claim("README"), "README");
        assert_eq!(names.claim("README"), "README_1");
        assert_eq!(names.claim(".hidden"), ".hidden");
        assert_eq!(names.claim(".hidden"), ".hidden_1");
    }

    #[test]
    fn test_locate_asset_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.png"), b"png").unwrap();
        let vault = VaultInfo::new("v", dir.path(), FolderNode::build("v", &[]));

        let mut warnings = Vec::new();
        assert!(locate_asset(&vault, "present.png", "A.md", &mut warnings).is_some());
        assert!(locate_asset(&vault, "gone.png", "A.md", &mut warnings).is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::AssetCopyFailed);
        assert_eq!(warnings[0].raw.as_deref(), Some("gone.png"));
    }

    #[test]
    fn test_warnings_entry() {
        assert!(warnings_entry(&[]).is_none());
        let entry = warnings_entry(&[
            Warning::new(WarningKind::BrokenLink, "A.md", "first"),
            Warning::new(WarningKind::MissingAsset, "B.md", "second"),
        ])
        .unwrap();
        assert_eq!(entry.path(), WARNINGS_FILE);
        let PackageEntry::Bytes { data, .. } = entry else {
            panic!("expected bytes");
        };
        assert_eq!(String::from_utf8(data).unwrap().lines().count(), 2);
    }
}
