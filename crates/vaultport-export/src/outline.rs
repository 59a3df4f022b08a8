//! Outline JSON export.
//!
//! Package layout:
//! - `metadata.json`: export header
//! - `<Collection>.json`: collection, documents keyed by id, attachments
//! - `uploads/<file name>`: attachment payloads
//!
//! Document bodies are ProseMirror trees using Outline's node and mark
//! names. Vault folders become folder documents so the collection keeps
//! the vault's nesting.

use crate::ids::{DocumentIds, url_id};
use crate::package::{
    FormatExporter, Package, PackageEntry, VaultInfo, file_size, locate_asset, warnings_entry,
};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;
use vaultport_core::{
    Block, EmbedTarget, Error, FolderNode, Inline, LinkTarget, ListItem, Marks, Result,
    TransformedContent, Warning, file_name, is_image_path, to_json_bytes, truncate_at_word,
};

/// Outline release whose import format this targets
pub const OUTLINE_VERSION: &str = "0.78.0-0";

/// Maximum collection and document title length accepted by Outline
pub const MAX_TITLE_LEN: usize = 100;

const UPLOADS_DIR: &str = "uploads";
const CREATOR_NAME: &str = "vaultport";
const CREATOR_EMAIL: &str = "export@vaultport.local";
const FOLDER_ICON: &str = "📁";

/// Attachment URL Outline resolves on import.
pub fn attachment_url(id: &Uuid) -> String {
    format!("/api/attachments.redirect?id={}", id)
}

/// MIME type guessed from the file extension.
pub fn content_type(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// ProseMirror generation
// ============================================================================

/// Builds ProseMirror documents for Outline.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineGenerator;

impl OutlineGenerator {
    pub fn new() -> Self {
        Self
    }

    /// `{"type":"doc","content":[...]}`
    pub fn generate(&self, content: &TransformedContent, ids: &DocumentIds) -> Value {
        let writer = ProseMirrorWriter { ids };
        doc(writer.blocks(&content.blocks))
    }
}

/// A ProseMirror doc node; empty content gets one empty paragraph.
pub fn doc(content: Vec<Value>) -> Value {
    json!({ "type": "doc", "content": non_empty(content) })
}

fn non_empty(content: Vec<Value>) -> Vec<Value> {
    if content.is_empty() {
        vec![json!({ "type": "paragraph" })]
    } else {
        content
    }
}

struct ProseMirrorWriter<'a> {
    ids: &'a DocumentIds,
}

impl ProseMirrorWriter<'_> {
    fn blocks(&self, blocks: &[Block]) -> Vec<Value> {
        blocks.iter().map(|b| self.block(b)).collect()
    }

    fn block(&self, block: &Block) -> Value {
        match block {
            Block::Heading {
                level,
                content,
                anchor,
            } => node_with(
                "heading",
                Some(json!({ "level": level })),
                self.inlines_anchored(content, anchor.as_deref()),
            ),
            Block::Paragraph { content, anchor } => node_with(
                "paragraph",
                None,
                self.inlines_anchored(content, anchor.as_deref()),
            ),
            Block::Code { language, text } => {
                let content = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![text_node(text, &[])]
                };
                node_with(
                    "code_block",
                    Some(json!({ "language": language.as_deref().unwrap_or("none") })),
                    content,
                )
            }
            Block::List {
                ordered,
                start,
                items,
            } => self.list(*ordered, *start, items),
            Block::Quote { blocks } => node_with("blockquote", None, non_empty(self.blocks(blocks))),
            Block::Callout {
                kind,
                title,
                blocks,
                anchor,
                ..
            } => {
                let label = kind.display_label(title.as_deref());
                let header_text = match kind.emoji() {
                    Some(emoji) => format!("{} {}", emoji, label),
                    None => format!("{}:", label),
                };
                let mut header = vec![text_node(&header_text, &[json!({ "type": "strong" })])];
                header.extend(anchor.as_deref().map(anchor_node));

                let mut content = vec![node_with("paragraph", None, header)];
                content.extend(self.blocks(blocks));
                node_with("blockquote", None, content)
            }
            Block::Table { header, rows } => {
                let row = |cells: &[Vec<Inline>], cell_type: &str| {
                    let cells = cells
                        .iter()
                        .map(|c| {
                            node_with(
                                cell_type,
                                None,
                                vec![node_with("paragraph", None, self.inlines(c))],
                            )
                        })
                        .collect();
                    node_with("tr", None, cells)
                };
                let mut content = vec![row(header, "th")];
                content.extend(rows.iter().map(|r| row(r, "td")));
                node_with("table", None, content)
            }
            Block::Rule => json!({ "type": "horizontal_rule" }),
            Block::Html { raw } => node_with("paragraph", None, vec![text_node(raw, &[])]),
        }
    }

    fn list(&self, ordered: bool, start: u64, items: &[ListItem]) -> Value {
        let checklist = items.iter().any(|i| i.checked.is_some());
        let (list_type, item_type, attrs) = if checklist {
            ("checkbox_list", "checkbox_item", None)
        } else if ordered {
            ("ordered_list", "list_item", Some(json!({ "order": start })))
        } else {
            ("bullet_list", "list_item", None)
        };

        let content = items
            .iter()
            .map(|item| {
                let attrs = checklist.then(|| json!({ "checked": item.checked.unwrap_or(false) }));
                node_with(item_type, attrs, non_empty(self.blocks(&item.blocks)))
            })
            .collect();
        node_with(list_type, attrs, content)
    }

    fn inlines_anchored(&self, content: &[Inline], anchor: Option<&str>) -> Vec<Value> {
        let mut nodes = self.inlines(content);
        nodes.extend(anchor.map(anchor_node));
        nodes
    }

    fn inlines(&self, content: &[Inline]) -> Vec<Value> {
        let mut nodes: Vec<Value> = Vec::new();
        for inline in content {
            let node = self.inline(inline);
            if let Some(node) = node {
                push_merged(&mut nodes, node);
            }
        }
        nodes
    }

    fn inline(&self, inline: &Inline) -> Option<Value> {
        let node = match inline {
            Inline::Text { value, marks } => text_node(value, &mark_list(marks)),
            Inline::Link { text, url } => text_node(text, &[link_mark(url)]),
            Inline::Image { alt, src } => image_node(src, alt),
            Inline::WikiLink(link) => match &link.target {
                LinkTarget::Document { path } => {
                    let href = self.ids.id_for(path).outline_url();
                    text_node(&link.display, &[link_mark(&href)])
                }
                LinkTarget::Broken { .. } => text_node(&link.display, &[]),
            },
            Inline::Embed(embed) => match &embed.target {
                EmbedTarget::Asset { path } => {
                    let src = attachment_url(&DocumentIds::attachment_id(path));
                    if is_image_path(path) {
                        image_node(&src, &embed.display)
                    } else {
                        text_node(&embed.display, &[link_mark(&src)])
                    }
                }
                EmbedTarget::Document { path } => {
                    let href = self.ids.id_for(path).outline_url();
                    text_node(&embed.display, &[link_mark(&href)])
                }
                EmbedTarget::Missing { .. } => text_node(&embed.display, &[]),
            },
            Inline::Break => json!({ "type": "br" }),
        };
        let empty_text = node["type"] == "text" && node["text"].as_str().is_none_or(str::is_empty);
        (!empty_text).then_some(node)
    }
}

fn node_with(kind: &str, attrs: Option<Value>, content: Vec<Value>) -> Value {
    let mut node = Map::new();
    node.insert("type".into(), json!(kind));
    if let Some(attrs) = attrs {
        node.insert("attrs".into(), attrs);
    }
    if !content.is_empty() {
        node.insert("content".into(), Value::Array(content));
    }
    Value::Object(node)
}

fn text_node(text: &str, marks: &[Value]) -> Value {
    if marks.is_empty() {
        json!({ "type": "text", "text": text })
    } else {
        json!({ "type": "text", "text": text, "marks": marks })
    }
}

fn image_node(src: &str, alt: &str) -> Value {
    json!({ "type": "image", "attrs": { "src": src, "alt": alt } })
}

fn anchor_node(id: &str) -> Value {
    text_node(&format!(" <!-- block: {} -->", id), &[])
}

fn link_mark(href: &str) -> Value {
    json!({ "type": "link", "attrs": { "href": href } })
}

fn mark_list(marks: &Marks) -> Vec<Value> {
    let mut list = Vec::new();
    if marks.strong {
        list.push(json!({ "type": "strong" }));
    }
    if marks.emphasis {
        list.push(json!({ "type": "em" }));
    }
    if marks.code {
        list.push(json!({ "type": "code_inline" }));
    }
    if marks.strikethrough {
        list.push(json!({ "type": "strikethrough" }));
    }
    list
}

/// Append a node, joining it onto a preceding text node with the same marks.
fn push_merged(nodes: &mut Vec<Value>, node: Value) {
    if node["type"] == "text"
        && let Some(last) = nodes.last_mut()
        && last["type"] == "text"
        && last.get("marks") == node.get("marks")
        && let (Some(prev), Some(next)) = (last["text"].as_str(), node["text"].as_str())
    {
        let joined = format!("{}{}", prev, next);
        last["text"] = json!(joined);
        return;
    }
    nodes.push(node);
}

// ============================================================================
// Package assembly
// ============================================================================

/// One generated Outline document.
#[derive(Debug, Clone)]
pub struct OutlineDocument {
    pub path: String,
    pub id: Uuid,
    pub url_id: String,
    pub url: String,
    pub title: String,
    pub data: Value,
    /// `(vault-relative source, flat upload name)` of each attachment
    pub assets: Vec<(String, String)>,
}

/// Assembled Outline package.
#[derive(Debug, Clone)]
pub struct OutlinePackage {
    pub metadata: Value,
    /// File name of the collection json
    pub collection_file: String,
    pub collection: Value,
    pub uploads: Vec<PackageEntry>,
    pub warnings: Vec<Warning>,
    document_count: usize,
}

impl Package for OutlinePackage {
    fn entries(&self) -> Vec<PackageEntry> {
        let mut entries = Vec::with_capacity(self.uploads.len() + 3);
        for (path, value) in [
            ("metadata.json", &self.metadata),
            (self.collection_file.as_str(), &self.collection),
        ] {
            match to_json_bytes(value, path) {
                Ok(data) => entries.push(PackageEntry::bytes(path, data)),
                Err(e) => log::error!("Skipping {}: {}", path, e),
            }
        }
        entries.extend(self.uploads.iter().cloned());
        entries.extend(warnings_entry(&self.warnings));
        entries
    }

    fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    fn document_count(&self) -> usize {
        self.document_count
    }

    fn asset_count(&self) -> usize {
        self.uploads.len()
    }
}

/// Outline format: generator plus assembler.
#[derive(Debug, Clone, Default)]
pub struct OutlineExporter {
    generator: OutlineGenerator,
}

impl OutlineExporter {
    pub fn new(generator: OutlineGenerator) -> Self {
        Self { generator }
    }
}

impl FormatExporter for OutlineExporter {
    type Document = OutlineDocument;
    type Output = OutlinePackage;

    fn generate_document(&self, content: &TransformedContent, ids: &DocumentIds) -> OutlineDocument {
        let id = ids.id_for(&content.path);
        OutlineDocument {
            path: content.path.clone(),
            id: id.uuid,
            url: id.outline_url(),
            url_id: id.url_id,
            title: content.title.clone(),
            data: self.generator.generate(content, ids),
            assets: content
                .assets
                .iter()
                .map(|a| (a.clone(), ids.asset_name(a)))
                .collect(),
        }
    }

    fn assemble(
        &self,
        documents: Vec<OutlineDocument>,
        vault: &VaultInfo,
        mut warnings: Vec<Warning>,
    ) -> Result<OutlinePackage> {
        if documents.is_empty() {
            return Err(Error::empty_vault(&vault.root));
        }

        let timestamp = vault.created_at.to_rfc3339();
        let creator = DocumentIds::creator_id().to_string();
        let by_path: HashMap<&str, &OutlineDocument> =
            documents.iter().map(|d| (d.path.as_str(), d)).collect();
        let exported: HashSet<&str> = by_path.keys().copied().collect();

        let mut docs_json: BTreeMap<String, Value> = BTreeMap::new();
        let mut attachments: BTreeMap<String, Value> = BTreeMap::new();
        let mut uploads: Vec<PackageEntry> = Vec::new();
        let mut seen_assets: HashSet<&str> = HashSet::new();

        let stamp = |mut entry: Map<String, Value>| {
            entry.insert("createdById".into(), json!(creator));
            entry.insert("createdByName".into(), json!(CREATOR_NAME));
            entry.insert("createdByEmail".into(), json!(CREATOR_EMAIL));
            entry.insert("createdAt".into(), json!(timestamp));
            entry.insert("updatedAt".into(), json!(timestamp));
            entry.insert("publishedAt".into(), json!(timestamp));
            entry.insert("fullWidth".into(), json!(false));
            entry.insert("template".into(), json!(false));
            Value::Object(entry)
        };

        for folder in vault.folders.iter() {
            if folder.is_root() || !has_exported(folder, &exported) {
                continue;
            }
            let id = DocumentIds::folder_id(&folder.path);
            let mut entry = Map::new();
            entry.insert("id".into(), json!(id.to_string()));
            entry.insert("urlId".into(), json!(url_id(&format!("folder:{}", folder.path))));
            entry.insert("title".into(), json!(truncate_at_word(&folder.name, MAX_TITLE_LEN)));
            entry.insert("icon".into(), json!(FOLDER_ICON));
            entry.insert("color".into(), Value::Null);
            entry.insert("data".into(), doc(Vec::new()));
            entry.insert("parentDocumentId".into(), parent_id(folder.parent.as_deref()));
            docs_json.insert(id.to_string(), stamp(entry));
        }

        for document in &documents {
            let mut entry = Map::new();
            entry.insert("id".into(), json!(document.id.to_string()));
            entry.insert("urlId".into(), json!(document.url_id));
            entry.insert("title".into(), json!(truncate_at_word(&document.title, MAX_TITLE_LEN)));
            entry.insert("icon".into(), Value::Null);
            entry.insert("color".into(), Value::Null);
            entry.insert("data".into(), document.data.clone());
            let folder = document.path.rsplit_once('/').map(|(dir, _)| dir);
            entry.insert("parentDocumentId".into(), parent_id(folder));
            docs_json.insert(document.id.to_string(), stamp(entry));

            for (source, flat) in &document.assets {
                if !seen_assets.insert(source.as_str()) {
                    continue;
                }
                let Some(file) = locate_asset(vault, source, &document.path, &mut warnings) else {
                    continue;
                };
                let key = format!("{}/{}", UPLOADS_DIR, flat);
                let id = DocumentIds::attachment_id(source);
                attachments.insert(
                    id.to_string(),
                    json!({
                        "id": id.to_string(),
                        "documentId": document.id.to_string(),
                        "contentType": content_type(source),
                        "name": file_name(source),
                        "size": file_size(&file).to_string(),
                        "key": key,
                    }),
                );
                uploads.push(PackageEntry::file(key, file));
            }
        }

        let structure = folder_structure(&vault.folders, &by_path);
        let collection = json!({
            "id": DocumentIds::collection_id(&vault.name).to_string(),
            "urlId": url_id(&format!("collection:{}", vault.name)),
            "name": truncate_at_word(&vault.name, MAX_TITLE_LEN),
            "data": doc(Vec::new()),
            "sort": { "field": "index", "direction": "asc" },
            "icon": null,
            "color": null,
            "permission": null,
            "documentStructure": structure,
        });

        let metadata = json!({
            "exportVersion": 1,
            "version": OUTLINE_VERSION,
            "createdAt": timestamp,
            "createdById": creator,
            "createdByEmail": CREATOR_EMAIL,
        });

        log::info!(
            "Assembled Outline package: {} documents, {} attachments",
            documents.len(),
            uploads.len()
        );

        Ok(OutlinePackage {
            metadata,
            collection_file: format!("{}.json", vault.name.replace(['/', '\\'], "_")),
            collection: json!({
                "collection": collection,
                "documents": docs_json,
                "attachments": attachments,
            }),
            uploads,
            warnings,
            document_count: documents.len(),
        })
    }
}

fn parent_id(folder: Option<&str>) -> Value {
    match folder {
        Some(path) if !path.is_empty() => json!(DocumentIds::folder_id(path).to_string()),
        _ => Value::Null,
    }
}

fn has_exported(folder: &FolderNode, exported: &HashSet<&str>) -> bool {
    folder.documents.iter().any(|d| exported.contains(d.as_str()))
        || folder.children.iter().any(|c| has_exported(c, exported))
}

/// `documentStructure` of a folder: sub-folders first, then documents.
fn folder_structure(folder: &FolderNode, docs: &HashMap<&str, &OutlineDocument>) -> Vec<Value> {
    let exported: HashSet<&str> = docs.keys().copied().collect();
    let mut nodes = Vec::new();

    for child in &folder.children {
        if !has_exported(child, &exported) {
            continue;
        }
        let id = DocumentIds::folder_id(&child.path);
        let url_id = url_id(&format!("folder:{}", child.path));
        let slug = crate::ids::slugify(&child.name);
        nodes.push(json!({
            "id": id.to_string(),
            "url": format!("/doc/{}-{}", slug, url_id),
            "title": child.name,
            "children": folder_structure(child, docs),
        }));
    }

    for path in &folder.documents {
        if let Some(document) = docs.get(path.as_str()) {
            nodes.push(json!({
                "id": document.id.to_string(),
                "url": document.url,
                "title": document.title,
                "children": [],
            }));
        }
    }
    nodes
}
