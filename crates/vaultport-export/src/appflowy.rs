//! AppFlowy template import.
//!
//! Package layout:
//! - `config.json`: manifest
//! - `documents/<stem>.json`: one block-tree document per note
//! - `assets/<file name>`: referenced files
//! - `warnings.txt`: present when the run produced warnings

use crate::ids::DocumentIds;
use crate::package::{
    FormatExporter, Package, PackageEntry, UniqueNames, VaultInfo, locate_asset, warnings_entry,
};
use serde_json::{Map, Value, json};
use vaultport_core::{
    Block, EmbedRef, EmbedTarget, Error, Inline, LinkTarget, ListItem, Marks, Result,
    TransformedContent, Warning, is_image_path, to_json_bytes,
};

/// Directory holding referenced files inside the package
pub const ASSETS_DIR: &str = "assets";

const CREATED_BY: &str = "vaultport";

// ============================================================================
// Document generation
// ============================================================================

/// Builds AppFlowy block-tree documents.
#[derive(Debug, Clone)]
pub struct AppFlowyGenerator {
    include_frontmatter: bool,
}

impl Default for AppFlowyGenerator {
    fn default() -> Self {
        Self {
            include_frontmatter: true,
        }
    }
}

impl AppFlowyGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carry frontmatter into `document.properties`.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    /// `{"document":{"type":"page","children":[...],"properties"?:{...}}}`
    pub fn generate(&self, content: &TransformedContent, ids: &DocumentIds) -> Value {
        let writer = NodeWriter { ids };
        let mut document = Map::new();
        document.insert("type".into(), json!("page"));
        document.insert("children".into(), Value::Array(writer.blocks(&content.blocks)));
        if self.include_frontmatter && !content.metadata.is_empty() {
            document.insert(
                "properties".into(),
                Value::Object(content.metadata.clone()),
            );
        }
        json!({ "document": document })
    }
}

struct NodeWriter<'a> {
    ids: &'a DocumentIds,
}

impl NodeWriter<'_> {
    fn blocks(&self, blocks: &[Block]) -> Vec<Value> {
        blocks.iter().flat_map(|b| self.block(b)).collect()
    }

    fn block(&self, block: &Block) -> Vec<Value> {
        match block {
            Block::Heading {
                level,
                content,
                anchor,
            } => {
                let mut data = Map::new();
                data.insert("level".into(), json!(level));
                data.insert("delta".into(), self.delta(content));
                vec![node("heading", data, anchor.as_deref(), Vec::new())]
            }
            Block::Paragraph { content, anchor } => self.paragraph(content, anchor.as_deref()),
            Block::Code { language, text } => {
                let mut data = Map::new();
                data.insert("language".into(), json!(language.clone().unwrap_or_default()));
                data.insert("delta".into(), json!([{ "insert": text }]));
                vec![node("code", data, None, Vec::new())]
            }
            Block::List {
                ordered,
                start,
                items,
            } => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.list_item(item, *ordered, (i == 0).then_some(*start)))
                .collect(),
            Block::Quote { blocks } => vec![self.container("quote", Map::new(), blocks, None)],
            Block::Callout {
                kind,
                title,
                blocks,
                anchor,
                ..
            } => {
                let label = kind.display_label(title.as_deref());
                match kind.emoji() {
                    Some(emoji) => {
                        let mut data = Map::new();
                        data.insert("icon".into(), json!(emoji));
                        data.insert("delta".into(), json!([{ "insert": label }]));
                        vec![node("callout", data, anchor.as_deref(), self.blocks(blocks))]
                    }
                    None => {
                        let mut data = Map::new();
                        data.insert(
                            "delta".into(),
                            json!([{ "insert": format!("{}:", label), "attributes": { "bold": true } }]),
                        );
                        vec![node("quote", data, anchor.as_deref(), self.blocks(blocks))]
                    }
                }
            }
            Block::Table { header, rows } => {
                let rows: Vec<Value> = std::iter::once(header)
                    .chain(rows.iter())
                    .map(|row| {
                        let cells: Vec<Value> =
                            row.iter().map(|c| json!({ "delta": self.delta(c) })).collect();
                        json!({ "cells": cells })
                    })
                    .collect();
                let mut data = Map::new();
                data.insert("has_header".into(), json!(true));
                data.insert("rows".into(), Value::Array(rows));
                vec![node("table", data, None, Vec::new())]
            }
            Block::Rule => vec![node("divider", Map::new(), None, Vec::new())],
            Block::Html { raw } => {
                let mut data = Map::new();
                data.insert("delta".into(), json!([{ "insert": raw }]));
                vec![node("paragraph", data, None, Vec::new())]
            }
        }
    }

    /// A quote-like node whose delta is its first paragraph. The lead
    /// paragraph's anchor becomes the node's block id unless one is given.
    fn container<'b>(
        &self,
        kind: &str,
        mut data: Map<String, Value>,
        blocks: &'b [Block],
        anchor: Option<&'b str>,
    ) -> Value {
        let (lead, lead_anchor, rest) = match blocks.split_first() {
            Some((Block::Paragraph { content, anchor }, rest)) => {
                (content.as_slice(), anchor.as_deref(), rest)
            }
            _ => (&[][..], None, blocks),
        };
        data.insert("delta".into(), self.delta(lead));
        node(kind, data, anchor.or(lead_anchor), self.blocks(rest))
    }

    fn list_item(&self, item: &ListItem, ordered: bool, start: Option<u64>) -> Value {
        let mut data = Map::new();
        let kind = match item.checked {
            Some(checked) => {
                data.insert("checked".into(), json!(checked));
                "todo_list"
            }
            None if ordered => {
                if let Some(n) = start.filter(|&n| n != 1) {
                    data.insert("number".into(), json!(n));
                }
                "numbered_list"
            }
            None => "bulleted_list",
        };
        data.insert("delta".into(), self.delta(item.lead().unwrap_or(&[])));
        let anchor = item.lead().and(item.blocks.first()).and_then(Block::anchor);
        node(kind, data, anchor, self.blocks(item.rest()))
    }

    /// Paragraphs split around block-level images and files.
    fn paragraph(&self, content: &[Inline], anchor: Option<&str>) -> Vec<Value> {
        let mut nodes = Vec::new();
        let mut run: Vec<&Inline> = Vec::new();

        for inline in content {
            match self.media(inline) {
                Some(media) => {
                    if has_text(&run) {
                        nodes.push(self.paragraph_node(&run));
                    }
                    run.clear();
                    nodes.push(media);
                }
                None => run.push(inline),
            }
        }
        if has_text(&run) || nodes.is_empty() {
            nodes.push(self.paragraph_node(&run));
        }

        if let Some(id) = anchor
            && let Some(Value::Object(first)) = nodes.first_mut()
            && let Some(Value::Object(data)) = first.get_mut("data")
        {
            data.insert("block_id".into(), json!(id));
        }
        nodes
    }

    fn paragraph_node(&self, run: &[&Inline]) -> Value {
        let mut data = Map::new();
        data.insert("delta".into(), self.delta_refs(run));
        node("paragraph", data, None, Vec::new())
    }

    fn media(&self, inline: &Inline) -> Option<Value> {
        let mut data = Map::new();
        match inline {
            Inline::Embed(EmbedRef {
                display,
                target: EmbedTarget::Asset { path },
            }) => {
                let url = format!("{}/{}", ASSETS_DIR, self.ids.asset_name(path));
                data.insert("url".into(), json!(url));
                if is_image_path(path) {
                    data.insert("alt".into(), json!(display));
                    Some(node("image", data, None, Vec::new()))
                } else {
                    data.insert("name".into(), json!(display));
                    Some(node("file", data, None, Vec::new()))
                }
            }
            Inline::Image { alt, src } => {
                data.insert("url".into(), json!(src));
                data.insert("alt".into(), json!(alt));
                Some(node("image", data, None, Vec::new()))
            }
            _ => None,
        }
    }

    fn delta(&self, content: &[Inline]) -> Value {
        self.delta_refs(&content.iter().collect::<Vec<_>>())
    }

    fn delta_refs(&self, content: &[&Inline]) -> Value {
        let mut ops: Vec<(String, Map<String, Value>)> = Vec::new();
        for inline in content {
            let (text, attrs) = self.op(inline);
            if text.is_empty() {
                continue;
            }
            match ops.last_mut() {
                Some((last, last_attrs)) if *last_attrs == attrs && !attrs.contains_key("mention") => {
                    last.push_str(&text)
                }
                _ => ops.push((text, attrs)),
            }
        }

        Value::Array(
            ops.into_iter()
                .map(|(insert, attrs)| {
                    let mut op = Map::new();
                    op.insert("insert".into(), json!(insert));
                    if !attrs.is_empty() {
                        op.insert("attributes".into(), Value::Object(attrs));
                    }
                    Value::Object(op)
                })
                .collect(),
        )
    }

    fn op(&self, inline: &Inline) -> (String, Map<String, Value>) {
        let mut attrs = Map::new();
        let text = match inline {
            Inline::Text { value, marks } => {
                mark_attributes(marks, &mut attrs);
                value.clone()
            }
            Inline::Link { text, url } => {
                attrs.insert("href".into(), json!(url));
                text.clone()
            }
            Inline::Image { alt, src } => {
                attrs.insert("href".into(), json!(src));
                alt.clone()
            }
            Inline::WikiLink(link) => {
                if let LinkTarget::Document { path } = &link.target {
                    let mut mention = Map::new();
                    mention.insert("type".into(), json!("page"));
                    mention.insert("page_id".into(), json!(self.ids.id_for(path).uuid.to_string()));
                    if let Some(block) = &link.block_id {
                        mention.insert("block_id".into(), json!(block));
                    }
                    attrs.insert("mention".into(), Value::Object(mention));
                }
                link.display.clone()
            }
            Inline::Embed(embed) => {
                match &embed.target {
                    EmbedTarget::Document { path } => {
                        let mut mention = Map::new();
                        mention.insert("type".into(), json!("page"));
                        mention.insert(
                            "page_id".into(),
                            json!(self.ids.id_for(path).uuid.to_string()),
                        );
                        attrs.insert("mention".into(), Value::Object(mention));
                    }
                    EmbedTarget::Asset { path } => {
                        let url = format!("{}/{}", ASSETS_DIR, self.ids.asset_name(path));
                        attrs.insert("href".into(), json!(url));
                    }
                    EmbedTarget::Missing { .. } => {}
                }
                embed.display.clone()
            }
            Inline::Break => "\n".to_string(),
        };
        (text, attrs)
    }
}

fn node(kind: &str, mut data: Map<String, Value>, anchor: Option<&str>, children: Vec<Value>) -> Value {
    if let Some(id) = anchor {
        data.insert("block_id".into(), json!(id));
    }
    let mut node = Map::new();
    node.insert("type".into(), json!(kind));
    node.insert("data".into(), Value::Object(data));
    if !children.is_empty() {
        node.insert("children".into(), Value::Array(children));
    }
    Value::Object(node)
}

fn mark_attributes(marks: &Marks, attrs: &mut Map<String, Value>) {
    if marks.strong {
        attrs.insert("bold".into(), json!(true));
    }
    if marks.emphasis {
        attrs.insert("italic".into(), json!(true));
    }
    if marks.code {
        attrs.insert("code".into(), json!(true));
    }
    if marks.strikethrough {
        attrs.insert("strikethrough".into(), json!(true));
    }
}

fn has_text(run: &[&Inline]) -> bool {
    run.iter().any(|i| match i {
        Inline::Text { value, .. } => !value.trim().is_empty(),
        Inline::Break => false,
        _ => true,
    })
}

// ============================================================================
// Package assembly
// ============================================================================

/// One generated AppFlowy document.
#[derive(Debug, Clone)]
pub struct AppFlowyDocument {
    pub path: String,
    pub stem: String,
    pub body: Value,
    /// `(vault-relative source, flat package name)` of each referenced asset
    pub assets: Vec<(String, String)>,
}

/// Assembled AppFlowy package.
#[derive(Debug, Clone)]
pub struct AppFlowyPackage {
    pub config: Value,
    /// `(package path, document json)` in write order
    pub documents: Vec<(String, Value)>,
    pub assets: Vec<PackageEntry>,
    pub warnings: Vec<Warning>,
}

impl Package for AppFlowyPackage {
    fn entries(&self) -> Vec<PackageEntry> {
        let mut entries = Vec::with_capacity(self.documents.len() + self.assets.len() + 2);
        if let Ok(config) = to_json_bytes(&self.config, "config.json") {
            entries.push(PackageEntry::bytes("config.json", config));
        }
        for (path, body) in &self.documents {
            match to_json_bytes(body, path) {
                Ok(data) => entries.push(PackageEntry::bytes(path.clone(), data)),
                Err(e) => log::error!("Skipping {}: {}", path, e),
            }
        }
        entries.extend(self.assets.iter().cloned());
        entries.extend(warnings_entry(&self.warnings));
        entries
    }

    fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn asset_count(&self) -> usize {
        self.assets.len()
    }
}

/// AppFlowy format: generator plus assembler.
#[derive(Debug, Clone, Default)]
pub struct AppFlowyExporter {
    generator: AppFlowyGenerator,
}

impl AppFlowyExporter {
    pub fn new(generator: AppFlowyGenerator) -> Self {
        Self { generator }
    }
}

impl FormatExporter for AppFlowyExporter {
    type Document = AppFlowyDocument;
    type Output = AppFlowyPackage;

    fn generate_document(&self, content: &TransformedContent, ids: &DocumentIds) -> AppFlowyDocument {
        AppFlowyDocument {
            path: content.path.clone(),
            stem: content.stem().to_string(),
            body: self.generator.generate(content, ids),
            assets: content
                .assets
                .iter()
                .map(|a| (a.clone(), ids.asset_name(a)))
                .collect(),
        }
    }

    fn assemble(
        &self,
        documents: Vec<AppFlowyDocument>,
        vault: &VaultInfo,
        mut warnings: Vec<Warning>,
    ) -> Result<AppFlowyPackage> {
        if documents.is_empty() {
            return Err(Error::empty_vault(&vault.root));
        }

        let mut names = UniqueNames::new();
        let mut listing = Vec::with_capacity(documents.len());
        let mut packaged = Vec::with_capacity(documents.len());
        let mut assets: Vec<PackageEntry> = Vec::new();

        for doc in documents {
            let name = names.claim(&format!("{}.json", doc.stem));
            let path = format!("documents/{}", name);
            listing.push(json!({ "name": name, "type": "document", "path": path }));

            for (source, flat) in &doc.assets {
                let dest = format!("{}/{}", ASSETS_DIR, flat);
                if assets.iter().any(|e| e.path() == dest) {
                    continue;
                }
                if let Some(file) = locate_asset(vault, source, &doc.path, &mut warnings) {
                    assets.push(PackageEntry::file(dest, file));
                }
            }
            packaged.push((path, doc.body));
        }

        let mut config = Map::new();
        config.insert("template_type".into(), json!("obsidian_export"));
        config.insert("format_version".into(), json!("1.0"));
        config.insert("created_by".into(), json!(CREATED_BY));
        config.insert("name".into(), json!(vault.name));
        config.insert("documents".into(), Value::Array(listing));
        config.insert("asset_count".into(), json!(assets.len()));
        config.insert("has_warnings".into(), json!(!warnings.is_empty()));
        config.insert("warning_count".into(), json!(warnings.len()));

        log::info!(
            "Assembled AppFlowy package: {} documents, {} assets",
            packaged.len(),
            assets.len()
        );

        Ok(AppFlowyPackage {
            config: Value::Object(config),
            documents: packaged,
            assets,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DocumentId;
    use vaultport_core::{CalloutKind, FolderNode, LinkRef, Metadata};

    fn content(path: &str, blocks: Vec<Block>) -> TransformedContent {
        TransformedContent {
            path: path.into(),
            title: "T".into(),
            blocks,
            metadata: Metadata::new(),
            assets: Vec::new(),
            links: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn children(doc: &Value) -> &Vec<Value> {
        doc["document"]["children"].as_array().unwrap()
    }

    #[test]
    fn test_paragraph_with_link_and_image() {
        let ids = DocumentIds::build(&["A.md", "B.md"]).with_assets(&["image.png"]);
        let mut doc = content(
            "A.md",
            vec![Block::Paragraph {
                content: vec![
                    Inline::text("See "),
                    Inline::WikiLink(LinkRef {
                        display: "Bee".into(),
                        target: LinkTarget::Document { path: "B.md".into() },
                        header: None,
                        block_id: None,
                    }),
                    Inline::text(" and "),
                    Inline::Embed(EmbedRef {
                        display: "image.png".into(),
                        target: EmbedTarget::Asset {
                            path: "image.png".into(),
                        },
                    }),
                ],
                anchor: Some("p1".into()),
            }],
        );
        doc.metadata.insert("tags".into(), json!(["a"]));

        let out = AppFlowyGenerator::new().generate(&doc, &ids);
        assert_eq!(out["document"]["type"], "page");
        assert_eq!(out["document"]["properties"]["tags"], json!(["a"]));

        let nodes = children(&out);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0]["type"], "paragraph");
        assert_eq!(nodes[0]["data"]["block_id"], "p1");
        let delta = nodes[0]["data"]["delta"].as_array().unwrap();
        assert_eq!(delta[0]["insert"], "See ");
        assert_eq!(delta[1]["insert"], "Bee");
        assert_eq!(
            delta[1]["attributes"]["mention"]["page_id"],
            DocumentId::derive("B.md").uuid.to_string()
        );
        assert_eq!(nodes[1]["type"], "image");
        assert_eq!(nodes[1]["data"]["url"], "assets/image.png");
    }

    #[test]
    fn test_quote_keeps_lead_paragraph_anchor() {
        let ids = DocumentIds::build(&["A.md"]);
        let doc = content(
            "A.md",
            vec![Block::Quote {
                blocks: vec![
                    Block::Paragraph {
                        content: vec![Inline::text("quoted")],
                        anchor: Some("q1".into()),
                    },
                    Block::Paragraph {
                        content: vec![Inline::text("more")],
                        anchor: Some("q2".into()),
                    },
                ],
            }],
        );

        let out = AppFlowyGenerator::new().generate(&doc, &ids);
        let nodes = children(&out);
        assert_eq!(nodes[0]["type"], "quote");
        assert_eq!(nodes[0]["data"]["delta"][0]["insert"], "quoted");
        assert_eq!(nodes[0]["data"]["block_id"], "q1");
        assert_eq!(nodes[0]["children"][0]["data"]["block_id"], "q2");
    }

    #[test]
    fn test_broken_link_is_plain_insert() {
        let ids = DocumentIds::build(&["A.md"]);
        let doc = content(
            "A.md",
            vec![Block::Paragraph {
                content: vec![
                    Inline::text("Go "),
                    Inline::WikiLink(LinkRef {
                        display: "there".into(),
                        target: LinkTarget::Broken {
                            raw: "Nowhere".into(),
                        },
                        header: None,
                        block_id: None,
                    }),
                ],
                anchor: None,
            }],
        );
        let out = AppFlowyGenerator::new().generate(&doc, &ids);
        let delta = &children(&out)[0]["data"]["delta"];
        assert_eq!(delta, &json!([{ "insert": "Go there" }]));
    }

    #[test]
    fn test_block_types() {
        let ids = DocumentIds::default();
        let doc = content(
            "A.md",
            vec![
                Block::Heading {
                    level: 2,
                    content: vec![Inline::Text {
                        value: "Bold".into(),
                        marks: Marks {
                            strong: true,
                            ..Default::default()
                        },
                    }],
                    anchor: None,
                },
                Block::Code {
                    language: Some("rust".into()),
                    text: "fn main() {}".into(),
                },
                Block::List {
                    ordered: false,
                    start: 1,
                    items: vec![ListItem {
                        checked: Some(true),
                        blocks: vec![Block::Paragraph {
                            content: vec![Inline::text("done")],
                            anchor: None,
                        }],
                    }],
                },
                Block::Callout {
                    kind: CalloutKind::parse("tip"),
                    title: None,
                    folded: None,
                    blocks: vec![Block::Paragraph {
                        content: vec![Inline::text("body")],
                        anchor: None,
                    }],
                    anchor: None,
                },
                Block::Callout {
                    kind: CalloutKind::parse("custom-type"),
                    title: None,
                    folded: None,
                    blocks: Vec::new(),
                    anchor: None,
                },
                Block::Rule,
            ],
        );
        let out = AppFlowyGenerator::new().generate(&doc, &ids);
        let nodes = children(&out);
        let types: Vec<&str> = nodes.iter().map(|n| n["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec!["heading", "code", "todo_list", "callout", "quote", "divider"]
        );
        assert_eq!(nodes[0]["data"]["level"], 2);
        assert_eq!(nodes[0]["data"]["delta"][0]["attributes"]["bold"], true);
        assert_eq!(nodes[1]["data"]["language"], "rust");
        assert_eq!(nodes[2]["data"]["checked"], true);
        assert_eq!(nodes[3]["data"]["icon"], "💡");
        assert_eq!(nodes[3]["children"][0]["data"]["delta"][0]["insert"], "body");
        assert_eq!(nodes[4]["data"]["delta"][0]["insert"], "Custom-Type:");
    }

    #[test]
    fn test_duplicate_stems_get_suffix() {
        let ids = DocumentIds::build(&["a/Note.md", "b/Note.md"]);
        let exporter = AppFlowyExporter::default();
        let docs = vec![
            exporter.generate_document(&content("a/Note.md", Vec::new()), &ids),
            exporter.generate_document(&content("b/Note.md", Vec::new()), &ids),
        ];
        let dir = tempfile::tempdir().unwrap();
        let vault = VaultInfo::new("Vault", dir.path(), FolderNode::build("Vault", &[]));
        let package = exporter.assemble(docs, &vault, Vec::new()).unwrap();

        let paths: Vec<&str> = package.documents.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["documents/Note.json", "documents/Note_1.json"]);
        assert_eq!(package.config["documents"][1]["name"], "Note_1.json");
        assert_eq!(package.config["has_warnings"], false);
        assert_eq!(package.config["template_type"], "obsidian_export");

        let entries = package.entries();
        assert_eq!(entries[0].path(), "config.json");
        assert!(entries.iter().all(|e| e.path() != "warnings.txt"));
    }

    #[test]
    fn test_missing_asset_becomes_warning() {
        let ids = DocumentIds::build(&["A.md"]).with_assets(&["gone.png"]);
        let mut doc = content("A.md", Vec::new());
        doc.assets = vec!["gone.png".into()];
        let exporter = AppFlowyExporter::default();
        let docs = vec![exporter.generate_document(&doc, &ids)];

        let dir = tempfile::tempdir().unwrap();
        let vault = VaultInfo::new("Vault", dir.path(), FolderNode::build("Vault", &[]));
        let package = exporter.assemble(docs, &vault, Vec::new()).unwrap();
        assert_eq!(package.asset_count(), 0);
        assert_eq!(package.warnings().len(), 1);
        assert_eq!(package.config["warning_count"], 1);
        assert!(package.entries().iter().any(|e| e.path() == "warnings.txt"));
    }

    #[test]
    fn test_empty_assembly_fails() {
        let vault = VaultInfo::new("Vault", "/tmp/none", FolderNode::build("Vault", &[]));
        let err = AppFlowyExporter::default()
            .assemble(Vec::new(), &vault, Vec::new())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyVault { .. }));
    }
}
