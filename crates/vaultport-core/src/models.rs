//! Core data models shared by every stage of the export pipeline.
//!
//! These types are designed to be:
//! - **Serializable**: All types derive Serialize/Deserialize
//! - **Immutable after construction**: each stage consumes values and builds new ones
//! - **Deterministic**: ordered maps only, so the same vault always yields the same output

use crate::ir::Block;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Frontmatter key-value map. Insertion order is preserved.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Source positions
// ============================================================================

/// Position in source text (line, column, byte offset)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl SourcePosition {
    /// Create a new source position
    pub fn new(line: usize, column: usize, offset: usize, length: usize) -> Self {
        Self {
            line,
            column,
            offset,
            length,
        }
    }

    /// Create position from byte offset using a pre-computed line index.
    pub fn from_offset_indexed(index: &LineIndex, offset: usize, length: usize) -> Self {
        let (line, column) = index.line_col(offset);
        Self {
            line,
            column,
            offset,
            length,
        }
    }

    /// Byte range covered by this position.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// Pre-computed line starts for O(log n) line/column lookup.
///
/// # Example
/// ```
/// use vaultport_core::{LineIndex, SourcePosition};
///
/// let content = "Line 1\nLine 2\nLine 3";
/// let index = LineIndex::new(content);
///
/// let pos = SourcePosition::from_offset_indexed(&index, 7, 6);
/// assert_eq!(pos.line, 2);
/// assert_eq!(pos.column, 1);
/// ```
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets where each line starts (line 1 = index 0)
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Build line index in O(n) - do once per document.
    pub fn new(content: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, ch) in content.char_indices() {
            if ch == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Get (line, column) for a byte offset. Both are 1-indexed.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line_idx = self.line_starts.partition_point(|&start| start <= offset);
        let line = line_idx.max(1);
        let line_start = self
            .line_starts
            .get(line_idx.saturating_sub(1))
            .copied()
            .unwrap_or(0);
        (line, offset - line_start + 1)
    }

    /// Get total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

// ============================================================================
// Vault snapshot
// ============================================================================

/// Immutable snapshot of a scanned vault.
///
/// All paths are relative to `root` and use `/` as separator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultStructure {
    pub root: PathBuf,
    /// Markdown documents, sorted
    pub markdown_files: Vec<String>,
    /// Non-markdown files outside excluded directories, sorted
    pub asset_files: Vec<String>,
    /// Raw wikilink targets per document, in document order
    pub links: BTreeMap<String, Vec<String>>,
    /// Parsed frontmatter per document
    pub metadata: BTreeMap<String, Metadata>,
}

impl VaultStructure {
    /// Total number of raw link tokens across all documents.
    pub fn total_links(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    /// Frontmatter for one document, if any was found.
    pub fn metadata_for(&self, path: &str) -> Option<&Metadata> {
        self.metadata.get(path)
    }
}

/// One folder of the vault and everything below it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FolderNode {
    /// Relative folder path; empty for the vault root
    pub path: String,
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<FolderNode>,
    /// Markdown documents directly inside this folder, sorted
    pub documents: Vec<String>,
    pub level: usize,
}

impl FolderNode {
    /// Build the folder tree spanned by a list of relative document paths.
    pub fn build(root_name: &str, documents: &[String]) -> Self {
        let mut root = FolderNode {
            path: String::new(),
            name: root_name.to_string(),
            parent: None,
            children: Vec::new(),
            documents: Vec::new(),
            level: 0,
        };

        let mut sorted: Vec<&String> = documents.iter().collect();
        sorted.sort();

        for doc in sorted {
            let segments: Vec<&str> = doc.split('/').collect();
            let (folders, _) = segments.split_at(segments.len() - 1);
            let mut node = &mut root;
            let mut current = String::new();
            for segment in folders {
                let parent = node.path.clone();
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(segment);
                let idx = match node.children.iter().position(|c| c.path == current) {
                    Some(idx) => idx,
                    None => {
                        node.children.push(FolderNode {
                            path: current.clone(),
                            name: segment.to_string(),
                            parent: Some(parent),
                            children: Vec::new(),
                            documents: Vec::new(),
                            level: node.level + 1,
                        });
                        node.children.len() - 1
                    }
                };
                node = &mut node.children[idx];
            }
            node.documents.push(doc.clone());
        }

        root.sort();
        root
    }

    fn sort(&mut self) {
        self.children.sort_by(|a, b| a.path.cmp(&b.path));
        for child in &mut self.children {
            child.sort();
        }
    }

    /// Depth-first iteration over this folder and all descendants.
    pub fn iter(&self) -> Vec<&FolderNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.iter());
        }
        out
    }

    /// Folder that directly contains `document`.
    pub fn folder_of(&self, document: &str) -> Option<&FolderNode> {
        self.iter()
            .into_iter()
            .find(|f| f.documents.iter().any(|d| d == document))
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

// ============================================================================
// Links
// ============================================================================

/// A wikilink or embed token as written in the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WikiLink {
    /// Full source text including brackets, e.g. `![[img.png]]`
    pub raw: String,
    /// Note or file name; never empty
    pub target: String,
    pub alias: Option<String>,
    pub header: Option<String>,
    pub block_id: Option<String>,
    pub is_embed: bool,
}

impl WikiLink {
    /// Create a plain link to `target`.
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            raw: format!("[[{}]]", target),
            target,
            alias: None,
            header: None,
            block_id: None,
            is_embed: false,
        }
    }

    /// Text shown to the reader: the alias if present, else the target.
    pub fn display_text(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target)
    }
}

/// Outcome of link resolution.
///
/// Every variant except `Broken` carries the resolved relative path, so a
/// broken link can never point anywhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "stage", content = "path", rename_all = "snake_case")]
pub enum Resolution {
    ExactPath(String),
    FilenameMatch(String),
    FuzzyMatch(String),
    Broken,
}

impl Resolution {
    /// Resolved relative path, absent for broken links.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::ExactPath(p) | Self::FilenameMatch(p) | Self::FuzzyMatch(p) => Some(p),
            Self::Broken => None,
        }
    }

    pub fn is_broken(&self) -> bool {
        matches!(self, Self::Broken)
    }

    /// Name of the stage that produced this outcome.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::ExactPath(_) => "exact_path",
            Self::FilenameMatch(_) => "filename_match",
            Self::FuzzyMatch(_) => "fuzzy_match",
            Self::Broken => "broken",
        }
    }
}

/// A wikilink together with its resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedWikiLink {
    pub link: WikiLink,
    pub resolution: Resolution,
}

impl ResolvedWikiLink {
    pub fn is_broken(&self) -> bool {
        self.resolution.is_broken()
    }

    pub fn path(&self) -> Option<&str> {
        self.resolution.path()
    }
}

// ============================================================================
// Warnings
// ============================================================================

/// Category of a recoverable, per-document issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    BrokenLink,
    MissingAsset,
    UnsupportedEmbed,
    UnknownCallout,
    MalformedFrontmatter,
    UnreadableDocument,
    AssetCopyFailed,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BrokenLink => "broken_link",
            Self::MissingAsset => "missing_asset",
            Self::UnsupportedEmbed => "unsupported_embed",
            Self::UnknownCallout => "unknown_callout",
            Self::MalformedFrontmatter => "malformed_frontmatter",
            Self::UnreadableDocument => "unreadable_document",
            Self::AssetCopyFailed => "asset_copy_failed",
        }
    }
}

/// A recoverable issue attached to one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    /// Relative path of the document the issue was found in
    pub document: String,
    /// Offending input fragment (link target, callout type, asset name)
    pub raw: Option<String>,
    /// 1-indexed line in the document body, when known
    pub line: Option<usize>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, document: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            document: document.into(),
            raw: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn broken_link(document: &str, link: &WikiLink) -> Self {
        Self::new(
            WarningKind::BrokenLink,
            document,
            format!(
                "Broken wikilink '{}': target '{}' not found",
                link.raw, link.target
            ),
        )
        .with_raw(link.target.clone())
    }

    pub fn missing_asset(document: &str, link: &WikiLink) -> Self {
        Self::new(
            WarningKind::MissingAsset,
            document,
            format!("Embedded file '{}' not found in vault", link.target),
        )
        .with_raw(link.target.clone())
    }

    pub fn unsupported_embed(document: &str, link: &WikiLink) -> Self {
        Self::new(
            WarningKind::UnsupportedEmbed,
            document,
            format!(
                "Note embed '{}' cannot be transcluded; exported as a link",
                link.raw
            ),
        )
        .with_raw(link.target.clone())
    }

    pub fn unknown_callout(document: &str, identifier: &str) -> Self {
        Self::new(
            WarningKind::UnknownCallout,
            document,
            format!(
                "Unknown callout type '{}' rendered as a plain quote",
                identifier
            ),
        )
        .with_raw(identifier)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.document, line, self.message),
            None => write!(f, "{}: {}", self.document, self.message),
        }
    }
}

// ============================================================================
// Transformer output
// ============================================================================

/// Per-document output of the content transformer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformedContent {
    /// Relative path of the source document
    pub path: String,
    /// Frontmatter `title` or the prettified file stem
    pub title: String,
    pub blocks: Vec<Block>,
    pub metadata: Metadata,
    /// Relative asset paths referenced by the document, first-seen order
    pub assets: Vec<String>,
    /// All wikilinks and embeds in document order
    pub links: Vec<ResolvedWikiLink>,
    pub warnings: Vec<Warning>,
}

impl TransformedContent {
    /// File name without extension.
    pub fn stem(&self) -> &str {
        file_stem(&self.path)
    }

    /// Relative folder containing the document; empty at the vault root.
    pub fn folder(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    pub fn broken_links(&self) -> impl Iterator<Item = &ResolvedWikiLink> {
        self.links.iter().filter(|l| l.is_broken())
    }
}

/// File name of a `/`-separated relative path without its extension.
pub fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// File name of a `/`-separated relative path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("a\nbb\nccc");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(3), (2, 2));
        assert_eq!(index.line_col(5), (3, 1));
        assert_eq!(index.line_count(), 3);
    }

    #[test]
    fn test_broken_resolution_has_no_path() {
        assert_eq!(Resolution::Broken.path(), None);
        assert_eq!(
            Resolution::FilenameMatch("a/B.md".into()).path(),
            Some("a/B.md")
        );
        assert_eq!(Resolution::FuzzyMatch("x.md".into()).stage(), "fuzzy_match");
    }

    #[test]
    fn test_display_text_prefers_alias() {
        let mut link = WikiLink::new("Note");
        assert_eq!(link.display_text(), "Note");
        link.alias = Some("Shown".into());
        assert_eq!(link.display_text(), "Shown");
    }

    #[test]
    fn test_warning_display() {
        let link = WikiLink::new("DoesNotExist");
        let warning = Warning::broken_link("a/b.md", &link).at_line(4);
        let text = warning.to_string();
        assert!(text.starts_with("a/b.md:4: "));
        assert!(text.contains("DoesNotExist"));
        assert_eq!(warning.raw.as_deref(), Some("DoesNotExist"));
    }

    #[test]
    fn test_folder_tree() {
        let docs = vec![
            "Index.md".to_string(),
            "projects/alpha/Plan.md".to_string(),
            "projects/Roadmap.md".to_string(),
            "areas/Health.md".to_string(),
        ];
        let root = FolderNode::build("Vault", &docs);

        assert_eq!(root.documents, vec!["Index.md"]);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].path, "areas");
        assert_eq!(root.children[1].path, "projects");

        let alpha = &root.children[1].children[0];
        assert_eq!(alpha.path, "projects/alpha");
        assert_eq!(alpha.parent.as_deref(), Some("projects"));
        assert_eq!(alpha.level, 2);

        let folder = root.folder_of("projects/Roadmap.md").unwrap();
        assert_eq!(folder.name, "projects");
        assert_eq!(root.iter().len(), 4);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("a/b/Note.md"), "Note");
        assert_eq!(file_stem("img.final.png"), "img.final");
        assert_eq!(file_stem(".hidden"), ".hidden");
        assert_eq!(file_name("a/b/c.png"), "c.png");
    }
}
