//! Deterministic identifiers.
//!
//! Every id is derived from a vault-relative path, so exporting an
//! unchanged vault twice yields identical page ids, file names and URLs.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use uuid::Uuid;
use vaultport_core::{file_name, file_stem, prettify_name};

use crate::package::UniqueNames;

/// Namespace for every UUID v5 this crate produces
static NAMESPACE: LazyLock<Uuid> =
    LazyLock::new(|| Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"vaultport.export"));

/// Length of an Outline `urlId`
pub const URL_ID_LEN: usize = 10;

/// Identifiers of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentId {
    pub uuid: Uuid,
    /// 32 lowercase hex digits, used in Notion-style file names
    pub notion_id: String,
    /// Short Outline URL id
    pub url_id: String,
    /// URL slug of the document name
    pub slug: String,
}

impl DocumentId {
    /// Derive the identifiers of a document from its relative path.
    pub fn derive(path: &str) -> Self {
        let uuid = scoped_uuid("document", path);
        Self {
            uuid,
            notion_id: uuid.simple().to_string(),
            url_id: url_id(path),
            slug: slugify(&prettify_name(file_stem(path))),
        }
    }

    /// Outline document URL: `/doc/<slug>-<urlId>`.
    pub fn outline_url(&self) -> String {
        if self.slug.is_empty() {
            format!("/doc/{}", self.url_id)
        } else {
            format!("/doc/{}-{}", self.slug, self.url_id)
        }
    }
}

/// Identifier table for every document of a run, plus the flat file
/// names assets get in formats that collect them into one directory.
#[derive(Debug, Clone, Default)]
pub struct DocumentIds {
    by_path: BTreeMap<String, DocumentId>,
    asset_names: BTreeMap<String, String>,
}

impl DocumentIds {
    pub fn build<S: AsRef<str>>(paths: &[S]) -> Self {
        let by_path = paths
            .iter()
            .map(|p| (p.as_ref().to_string(), DocumentId::derive(p.as_ref())))
            .collect();
        Self {
            by_path,
            asset_names: BTreeMap::new(),
        }
    }

    /// Assign flat names to every vault asset. Names are claimed in sorted
    /// path order, so `a/img.png` keeps `img.png` and `b/img.png` becomes
    /// `img_1.png` on every run.
    pub fn with_assets<S: AsRef<str>>(mut self, assets: &[S]) -> Self {
        let mut sorted: Vec<&str> = assets.iter().map(|a| a.as_ref()).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut names = UniqueNames::new();
        self.asset_names = sorted
            .into_iter()
            .map(|path| (path.to_string(), names.claim(file_name(path))))
            .collect();
        self
    }

    /// Flat file name of an asset.
    pub fn asset_name(&self, asset: &str) -> String {
        self.asset_names
            .get(asset)
            .cloned()
            .unwrap_or_else(|| file_name(asset).to_string())
    }

    pub fn get(&self, path: &str) -> Option<&DocumentId> {
        self.by_path.get(path)
    }

    /// Identifiers for `path`, derived on the fly when it was not registered.
    pub fn id_for(&self, path: &str) -> DocumentId {
        self.get(path)
            .cloned()
            .unwrap_or_else(|| DocumentId::derive(path))
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Attachment id of an asset path.
    pub fn attachment_id(asset: &str) -> Uuid {
        scoped_uuid("attachment", asset)
    }

    /// Id of the folder document for a folder path.
    pub fn folder_id(folder: &str) -> Uuid {
        scoped_uuid("folder", folder)
    }

    /// Id of a collection, keyed by its name.
    pub fn collection_id(name: &str) -> Uuid {
        scoped_uuid("collection", name)
    }

    /// Id recorded as the author of exported documents.
    pub fn creator_id() -> Uuid {
        scoped_uuid("user", "vaultport")
    }
}

fn scoped_uuid(scope: &str, key: &str) -> Uuid {
    Uuid::new_v5(&NAMESPACE, format!("{}:{}", scope, key).as_bytes())
}

/// First [`URL_ID_LEN`] hex digits of the SHA-256 of `key`.
pub fn url_id(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
        .chars()
        .take(URL_ID_LEN)
        .collect()
}

/// Lowercase, dash-separated slug of a heading or title.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|&c| c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
