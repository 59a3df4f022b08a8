//! In-memory lookup of every document and asset in a vault.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use unicode_normalization::UnicodeNormalization;
use vaultport_core::{VaultStructure, file_name, file_stem};

/// NFC-normalize a lookup key and unify path separators.
pub fn normalize_key(key: &str) -> String {
    key.replace('\\', "/").nfc().collect()
}

/// Immutable index built once per export run.
///
/// Lookups are keyed by NFC-normalized strings, values are the paths as
/// they appear in the vault. Every candidate list is sorted, so the first
/// entry is the lexicographically smallest path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VaultIndex {
    /// normalized path -> path
    paths: HashMap<String, String>,
    /// normalized stem -> sorted paths
    by_filename: BTreeMap<String, Vec<String>>,
    /// normalized asset path -> asset path
    assets: HashMap<String, String>,
    /// normalized file name (with extension) -> sorted asset paths
    assets_by_name: BTreeMap<String, Vec<String>>,
}

impl VaultIndex {
    /// Build the index from a vault snapshot. An empty vault gives an empty index.
    pub fn build(structure: &VaultStructure) -> Self {
        let mut index = VaultIndex::default();

        for path in &structure.markdown_files {
            index.paths.insert(normalize_key(path), path.clone());
            index
                .by_filename
                .entry(normalize_key(file_stem(path)))
                .or_default()
                .push(path.clone());
        }

        for path in &structure.asset_files {
            index.assets.insert(normalize_key(path), path.clone());
            index
                .assets_by_name
                .entry(normalize_key(file_name(path)))
                .or_default()
                .push(path.clone());
        }

        for paths in index
            .by_filename
            .values_mut()
            .chain(index.assets_by_name.values_mut())
        {
            paths.sort();
            paths.dedup();
        }

        log::debug!(
            "Built vault index: {} documents, {} distinct names, {} assets",
            index.paths.len(),
            index.by_filename.len(),
            index.assets.len()
        );

        index
    }

    /// The vault path of a document, looked up by (unnormalized) relative path.
    pub fn document(&self, path: &str) -> Option<&str> {
        self.paths.get(&normalize_key(path)).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.document(path).is_some()
    }

    /// All documents whose file stem equals `stem`, sorted.
    pub fn by_filename(&self, stem: &str) -> &[String] {
        self.by_filename
            .get(&normalize_key(stem))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The vault path of an asset, looked up by relative path.
    pub fn asset(&self, path: &str) -> Option<&str> {
        self.assets.get(&normalize_key(path)).map(String::as_str)
    }

    pub fn contains_asset(&self, path: &str) -> bool {
        self.asset(path).is_some()
    }

    /// All assets with the given file name (extension included), sorted.
    pub fn asset_by_name(&self, name: &str) -> &[String] {
        self.assets_by_name
            .get(&normalize_key(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct document stems, sorted.
    pub fn filenames(&self) -> Vec<&str> {
        self.by_filename.keys().map(String::as_str).collect()
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }
}
