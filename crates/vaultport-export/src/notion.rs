//! Notion-style markdown export.
//!
//! Every note becomes `<Page Name> <32hex>.md` inside the same folder
//! structure as the vault. Assets referenced by a page are copied into a
//! sibling directory `<Page Name> <32hex>/`, which is how Notion lays out
//! its own markdown exports and what importers expect.

use crate::ids::{DocumentIds, slugify};
use crate::package::{
    FormatExporter, Package, PackageEntry, UniqueNames, VaultInfo, locate_asset, warnings_entry,
};
use serde_json::Value;
use std::collections::HashMap;
use vaultport_core::{
    Block, EmbedTarget, Error, Inline, LinkTarget, ListItem, Marks, Metadata, Result,
    TransformedContent, Warning, file_name, file_stem, is_image_path, prettify_name,
};

const UNTITLED: &str = "Untitled";

/// Display name of a page: the prettified file stem.
pub fn page_name(path: &str) -> String {
    let name = prettify_name(file_stem(path));
    if name.is_empty() {
        UNTITLED.to_string()
    } else {
        name
    }
}

/// `<Page Name> <id>` for a document, without extension.
fn page_base(path: &str, ids: &DocumentIds) -> String {
    format!("{} {}", page_name(path), ids.id_for(path).notion_id)
}

fn folder_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn segments(folder: &str) -> Vec<&str> {
    folder.split('/').filter(|s| !s.is_empty()).collect()
}

/// Package path of a page: vault folders mirrored, file renamed.
pub fn page_path(path: &str, ids: &DocumentIds) -> String {
    let file = format!("{}.md", page_base(path, ids));
    match folder_of(path) {
        "" => file,
        folder => format!("{}/{}", folder, file),
    }
}

/// URL-encoded relative link from a page in `from_folder` to `to_path`.
fn relative_link(from_folder: &str, to_path: &str) -> String {
    let from = segments(from_folder);
    let to: Vec<&str> = to_path.split('/').filter(|s| !s.is_empty()).collect();
    let (to_dirs, to_file) = to.split_at(to.len().saturating_sub(1));

    let common = from
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = std::iter::repeat_n("..".to_string(), from.len() - common).collect();
    parts.extend(
        to_dirs[common..]
            .iter()
            .chain(to_file.iter())
            .map(|s| urlencoding::encode(s).into_owned()),
    );
    parts.join("/")
}

// ============================================================================
// Page generation
// ============================================================================

/// One generated page.
#[derive(Debug, Clone, PartialEq)]
pub struct NotionPage {
    /// 32-hex page id
    pub id: String,
    pub title: String,
    /// `<Page Name> <id>.md`
    pub file_name: String,
    pub content: String,
    /// Vault-relative source document
    pub source: String,
    /// Path inside the package
    pub path: String,
    /// `(vault-relative source, package path)` of each asset copy
    pub assets: Vec<(String, String)>,
}

/// Renders transformed documents as Notion-flavoured markdown.
#[derive(Debug, Clone)]
pub struct NotionGenerator {
    include_frontmatter: bool,
}

impl Default for NotionGenerator {
    fn default() -> Self {
        Self {
            include_frontmatter: true,
        }
    }
}

impl NotionGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render frontmatter as `Key: value` property lines under the title.
    pub fn with_frontmatter(mut self, include: bool) -> Self {
        self.include_frontmatter = include;
        self
    }

    pub fn generate(&self, content: &TransformedContent, ids: &DocumentIds) -> NotionPage {
        let id = ids.id_for(&content.path);
        let base = page_base(&content.path, ids);
        let folder = folder_of(&content.path);

        let mut names = UniqueNames::new();
        let asset_names: HashMap<String, String> = content
            .assets
            .iter()
            .map(|a| (a.clone(), names.claim(file_name(a))))
            .collect();

        let writer = MarkdownWriter {
            ids,
            folder,
            asset_dir: urlencoding::encode(&base).into_owned(),
            asset_names: &asset_names,
        };

        let mut sections = vec![format!("# {}", content.title)];
        if self.include_frontmatter
            && let Some(props) = properties(&content.metadata)
        {
            sections.push(props);
        }
        let body = writer.blocks(&content.blocks);
        if !body.is_empty() {
            sections.push(body);
        }

        let page_dir = match folder {
            "" => base.clone(),
            folder => format!("{}/{}", folder, base),
        };
        let assets = content
            .assets
            .iter()
            .filter_map(|a| {
                asset_names
                    .get(a)
                    .map(|name| (a.clone(), format!("{}/{}", page_dir, name)))
            })
            .collect();

        NotionPage {
            id: id.notion_id,
            title: content.title.clone(),
            file_name: format!("{}.md", base),
            content: sections.join("\n\n") + "\n",
            source: content.path.clone(),
            path: page_path(&content.path, ids),
            assets,
        }
    }
}

fn properties(metadata: &Metadata) -> Option<String> {
    let lines: Vec<String> = metadata
        .iter()
        .filter(|(key, _)| key.as_str() != "title")
        .map(|(key, value)| format!("{}: {}", key, property_value(value)))
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn property_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(property_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

struct MarkdownWriter<'a> {
    ids: &'a DocumentIds,
    folder: &'a str,
    /// URL-encoded page asset directory
    asset_dir: String,
    asset_names: &'a HashMap<String, String>,
}

impl MarkdownWriter<'_> {
    fn blocks(&self, blocks: &[Block]) -> String {
        blocks
            .iter()
            .map(|b| self.block(b))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn block(&self, block: &Block) -> String {
        match block {
            Block::Heading {
                level,
                content,
                anchor,
            } => with_anchor(
                format!("{} {}", "#".repeat((*level).clamp(1, 6) as usize), self.inline(content)),
                anchor.as_deref(),
            ),
            Block::Paragraph { content, anchor } => {
                with_anchor(self.inline(content), anchor.as_deref())
            }
            Block::Code { language, text } => format!(
                "```{}\n{}\n```",
                language.as_deref().unwrap_or(""),
                text
            ),
            Block::List {
                ordered,
                start,
                items,
            } => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let marker = match (item.checked, *ordered) {
                        (Some(true), _) => "- [x] ".to_string(),
                        (Some(false), _) => "- [ ] ".to_string(),
                        (None, true) => format!("{}. ", *start + i as u64),
                        (None, false) => "- ".to_string(),
                    };
                    self.list_item(&marker, item)
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Quote { blocks } => quote(&self.blocks(blocks)),
            Block::Callout {
                kind,
                title,
                blocks,
                anchor,
                ..
            } => {
                let header = kind.header_markdown(title.as_deref());
                let body = self.blocks(blocks);
                let text = if body.is_empty() {
                    header
                } else {
                    format!("{}\n{}", header, body)
                };
                with_anchor(quote(&text), anchor.as_deref())
            }
            Block::Table { header, rows } => {
                let row = |cells: &[Vec<Inline>]| {
                    let cells: Vec<String> = cells.iter().map(|c| self.cell(c)).collect();
                    format!("| {} |", cells.join(" | "))
                };
                let mut lines = vec![row(header)];
                lines.push(format!("|{}", " --- |".repeat(header.len().max(1))));
                lines.extend(rows.iter().map(|r| row(r)));
                lines.join("\n")
            }
            Block::Rule => "---".to_string(),
            Block::Html { raw } => raw.clone(),
        }
    }

    fn list_item(&self, marker: &str, item: &ListItem) -> String {
        let width = marker.chars().count();
        let mut lead = self.inline(item.lead().unwrap_or(&[]));
        if let Some(id) = item.lead().and(item.blocks.first()).and_then(Block::anchor) {
            lead.push(' ');
            lead.push_str(&anchor_comment(id));
        }
        let mut out = format!("{}{}", marker, indent_tail(&lead, width));
        let rest = self.blocks(item.rest());
        if !rest.is_empty() {
            out.push('\n');
            out.push_str(&indent(&rest, width));
        }
        out
    }

    /// Text runs already escape `|`; code spans still need it inside a table.
    fn cell(&self, content: &[Inline]) -> String {
        content
            .iter()
            .map(|inline| match inline {
                Inline::Text { value, marks } if marks.code => {
                    wrap_marks(&value.replace('|', "\\|"), marks)
                }
                Inline::Break => " ".to_string(),
                other => self.inline_one(other),
            })
            .collect()
    }

    fn inline(&self, content: &[Inline]) -> String {
        let mut out = String::new();
        for inline in content {
            let piece = self.inline_one(inline);
            if out.is_empty() || out.ends_with('\n') {
                out.push_str(&escape_line_start(&piece));
            } else {
                out.push_str(&piece);
            }
        }
        out
    }

    fn inline_one(&self, inline: &Inline) -> String {
        match inline {
            Inline::Text { value, marks } if marks.code => wrap_marks(value, marks),
            Inline::Text { value, marks } => wrap_marks(&escape_markdown(value), marks),
            Inline::Link { text, url } => format!("[{}]({})", escape_markdown(text), url),
            Inline::Image { alt, src } => format!("![{}]({})", escape_markdown(alt), src),
            Inline::WikiLink(link) => match &link.target {
                LinkTarget::Document { path } => {
                    let mut url = self.page_link(path);
                    if let Some(header) = &link.header {
                        url.push('#');
                        url.push_str(&slugify(header));
                    }
                    format!("[{}]({})", escape_markdown(&link.display), url)
                }
                LinkTarget::Broken { .. } => escape_markdown(&link.display),
            },
            Inline::Embed(embed) => match &embed.target {
                EmbedTarget::Asset { path } => {
                    let name = self
                        .asset_names
                        .get(path)
                        .map(String::as_str)
                        .unwrap_or_else(|| file_name(path));
                    let url = format!("{}/{}", self.asset_dir, urlencoding::encode(name));
                    if is_image_path(path) {
                        format!("![{}]({})", escape_markdown(&embed.display), url)
                    } else {
                        format!("[{}]({})", escape_markdown(&embed.display), url)
                    }
                }
                EmbedTarget::Document { path } => {
                    format!(
                        "[{}]({})",
                        escape_markdown(&embed.display),
                        self.page_link(path)
                    )
                }
                EmbedTarget::Missing { .. } => escape_markdown(&embed.display),
            },
            Inline::Break => "\n".to_string(),
        }
    }

    fn page_link(&self, path: &str) -> String {
        relative_link(self.folder, &page_path(path, self.ids))
    }
}

/// Backslash-escape characters that would turn plain text into markup.
fn escape_markdown(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '#' | '|' | '<' | '~') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a list, quote or setext marker opening a line (`- `, `> `, `1. `).
fn escape_line_start(text: &str) -> String {
    if text.starts_with(['-', '+', '>', '=']) {
        return format!("\\{}", text);
    }
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && text[digits..].starts_with(['.', ')']) {
        return format!("{}\\{}", &text[..digits], &text[digits..]);
    }
    text.to_string()
}

fn wrap_marks(value: &str, marks: &Marks) -> String {
    if marks.is_plain() || value.trim().is_empty() {
        return value.to_string();
    }
    let mut text = value.to_string();
    if marks.code {
        text = format!("`{}`", text);
    }
    if marks.strikethrough {
        text = format!("~~{}~~", text);
    }
    if marks.emphasis {
        text = format!("*{}*", text);
    }
    if marks.strong {
        text = format!("**{}**", text);
    }
    text
}

fn anchor_comment(id: &str) -> String {
    format!("<!-- block: {} -->", id)
}

fn with_anchor(text: String, anchor: Option<&str>) -> String {
    match anchor {
        Some(id) => format!("{}\n{}", text, anchor_comment(id)),
        None => text,
    }
}

fn quote(text: &str) -> String {
    text.lines()
        .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {}", l) })
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|l| if l.is_empty() { String::new() } else { format!("{}{}", pad, l) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indent every line but the first.
fn indent_tail(text: &str, width: usize) -> String {
    match text.split_once('\n') {
        Some((first, rest)) => format!("{}\n{}", first, indent(rest, width)),
        None => text.to_string(),
    }
}

// ============================================================================
// Package assembly
// ============================================================================

/// Assembled Notion-style package.
#[derive(Debug, Clone)]
pub struct NotionPackage {
    pub pages: Vec<NotionPage>,
    pub assets: Vec<PackageEntry>,
    pub warnings: Vec<Warning>,
}

impl Package for NotionPackage {
    fn entries(&self) -> Vec<PackageEntry> {
        let mut entries: Vec<PackageEntry> = self
            .pages
            .iter()
            .map(|p| PackageEntry::bytes(p.path.clone(), p.content.clone()))
            .collect();
        entries.extend(self.assets.iter().cloned());
        entries.extend(warnings_entry(&self.warnings));
        entries
    }

    fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    fn document_count(&self) -> usize {
        self.pages.len()
    }

    fn asset_count(&self) -> usize {
        self.assets.len()
    }
}

/// Notion-style format: generator plus assembler.
#[derive(Debug, Clone, Default)]
pub struct NotionExporter {
    generator: NotionGenerator,
}

impl NotionExporter {
    pub fn new(generator: NotionGenerator) -> Self {
        Self { generator }
    }
}

impl FormatExporter for NotionExporter {
    type Document = NotionPage;
    type Output = NotionPackage;

    fn generate_document(&self, content: &TransformedContent, ids: &DocumentIds) -> NotionPage {
        self.generator.generate(content, ids)
    }

    fn assemble(
        &self,
        pages: Vec<NotionPage>,
        vault: &VaultInfo,
        mut warnings: Vec<Warning>,
    ) -> Result<NotionPackage> {
        if pages.is_empty() {
            return Err(Error::empty_vault(&vault.root));
        }

        let mut assets = Vec::new();
        for page in &pages {
            for (source, dest) in &page.assets {
                if let Some(file) = locate_asset(vault, source, &page.source, &mut warnings) {
                    assets.push(PackageEntry::file(dest.clone(), file));
                }
            }
        }

        log::info!(
            "Assembled Notion package: {} pages, {} asset copies",
            pages.len(),
            assets.len()
        );

        Ok(NotionPackage {
            pages,
            assets,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use serde_json::json;
    use vaultport_core::{CalloutKind, EmbedRef, FolderNode, LinkRef};

    fn content(path: &str, title: &str, blocks: Vec<Block>) -> TransformedContent {
        TransformedContent {
            path: path.into(),
            title: title.into(),
            blocks,
            metadata: Metadata::new(),
            assets: Vec::new(),
            links: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn para(content: Vec<Inline>) -> Block {
        Block::Paragraph {
            content,
            anchor: None,
        }
    }

    fn link(display: &str, target: LinkTarget) -> Inline {
        Inline::WikiLink(LinkRef {
            display: display.into(),
            target,
            header: None,
            block_id: None,
        })
    }

    #[test]
    fn test_file_name_shape() {
        let ids = DocumentIds::build(&["notes/my_daily-log.md"]);
        let page = NotionGenerator::new().generate(
            &content("notes/my_daily-log.md", "My Daily Log", Vec::new()),
            &ids,
        );
        let pattern = Regex::new(r"^.+ [0-9a-f]{32}\.md$").unwrap();
        assert!(pattern.is_match(&page.file_name), "{}", page.file_name);
        assert!(page.file_name.starts_with("My Daily Log "));
        assert_eq!(page.path, format!("notes/{}", page.file_name));
        assert_eq!(page.id.len(), 32);
        assert!(page.content.starts_with("# My Daily Log\n"));
    }

    #[test]
    fn test_relative_link() {
        assert_eq!(relative_link("", "B 123.md"), "B%20123.md");
        assert_eq!(relative_link("a/b", "a/c/D.md"), "../c/D.md");
        assert_eq!(relative_link("a", "D.md"), "../D.md");
        assert_eq!(relative_link("", "x/D.md"), "x/D.md");
    }

    #[test]
    fn test_links_assets_and_broken() {
        let ids = DocumentIds::build(&["A.md", "B.md"]);
        let mut doc = content(
            "A.md",
            "A",
            vec![para(vec![
                Inline::text("See "),
                link("Bee", LinkTarget::Document { path: "B.md".into() }),
                Inline::text(", "),
                link("gone", LinkTarget::Broken { raw: "Gone".into() }),
                Inline::text(" "),
                Inline::Embed(EmbedRef {
                    display: "my image.png".into(),
                    target: EmbedTarget::Asset {
                        path: "media/my image.png".into(),
                    },
                }),
            ])],
        );
        doc.assets = vec!["media/my image.png".into()];
        let page = NotionGenerator::new().generate(&doc, &ids);

        let b_file = urlencoding::encode(&format!("B {}.md", ids.id_for("B.md").notion_id)).into_owned();
        assert!(page.content.contains(&format!("[Bee]({})", b_file)));
        assert!(page.content.contains(", gone "));

        let dir = urlencoding::encode(&format!("A {}", page.id)).into_owned();
        assert!(page.content.contains(&format!("![my image.png]({}/my%20image.png)", dir)));
        assert_eq!(
            page.assets,
            vec![(
                "media/my image.png".to_string(),
                format!("A {}/my image.png", page.id)
            )]
        );
    }

    #[test]
    fn test_blocks_render() {
        let ids = DocumentIds::default();
        let doc = content(
            "A.md",
            "A",
            vec![
                Block::Heading {
                    level: 2,
                    content: vec![Inline::text("Section")],
                    anchor: Some("sec".into()),
                },
                Block::List {
                    ordered: true,
                    start: 3,
                    items: vec![
                        ListItem {
                            checked: None,
                            blocks: vec![para(vec![Inline::text("three")])],
                        },
                        ListItem {
                            checked: None,
                            blocks: vec![para(vec![Inline::text("four")])],
                        },
                    ],
                },
                Block::Callout {
                    kind: CalloutKind::parse("note"),
                    title: None,
                    folded: None,
                    blocks: vec![para(vec![Inline::text("body")])],
                    anchor: None,
                },
                Block::Callout {
                    kind: CalloutKind::parse("custom-type"),
                    title: None,
                    folded: None,
                    blocks: vec![para(vec![Inline::text("x")])],
                    anchor: None,
                },
                Block::Table {
                    header: vec![vec![Inline::text("h")]],
                    rows: vec![vec![vec![Inline::text("a|b")]]],
                },
            ],
        );
        let page = NotionGenerator::new().generate(&doc, &ids);
        let text = &page.content;
        assert!(text.contains("## Section\n<!-- block: sec -->"));
        assert!(text.contains("3. three\n4. four"));
        assert!(text.contains("> 📝 **Note:**\n> body"));
        assert!(text.contains("> **Custom-Type:**\n> x"));
        assert!(text.contains("| h |\n| --- |\n| a\\|b |"));
    }

    #[test]
    fn test_text_markdown_is_escaped() {
        let ids = DocumentIds::default();
        let code = Marks {
            code: true,
            ..Marks::default()
        };
        let doc = content(
            "A.md",
            "A",
            vec![
                para(vec![
                    Inline::text("1. literal, 5 * 3 *not emphasis* and # not heading "),
                    Inline::Text {
                        value: "a*b_c".into(),
                        marks: code,
                    },
                ]),
                para(vec![Inline::text("- not a list [x] <b>")]),
                para(vec![link("[draft]", LinkTarget::Broken { raw: "Draft".into() })]),
            ],
        );
        let page = NotionGenerator::new().generate(&doc, &ids);

        assert!(page.content.contains(
            "1\\. literal, 5 \\* 3 \\*not emphasis\\* and \\# not heading `a*b_c`"
        ));
        assert!(page.content.contains("\\- not a list \\[x\\] \\<b>"));
        assert!(page.content.contains("\\[draft\\]"));
    }

    #[test]
    fn test_properties() {
        let ids = DocumentIds::default();
        let mut doc = content("A.md", "A", vec![para(vec![Inline::text("body")])]);
        doc.metadata.insert("tags".into(), json!(["x", "y"]));
        doc.metadata.insert("rating".into(), json!(4));

        let page = NotionGenerator::new().generate(&doc, &ids);
        assert_eq!(page.content, "# A\n\ntags: x, y\nrating: 4\n\nbody\n");

        let page = NotionGenerator::new().with_frontmatter(false).generate(&doc, &ids);
        assert_eq!(page.content, "# A\n\nbody\n");
    }

    #[test]
    fn test_assets_copied_per_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pic.png"), b"png").unwrap();
        let ids = DocumentIds::build(&["A.md", "B.md"]);
        let exporter = NotionExporter::default();

        let pages: Vec<NotionPage> = ["A.md", "B.md"]
            .iter()
            .map(|p| {
                let mut doc = content(p, p, Vec::new());
                doc.assets = vec!["pic.png".into()];
                exporter.generate_document(&doc, &ids)
            })
            .collect();
        let vault = VaultInfo::new("V", dir.path(), FolderNode::build("V", &[]));
        let package = exporter.assemble(pages, &vault, Vec::new()).unwrap();

        assert_eq!(package.asset_count(), 2);
        assert!(package.warnings().is_empty());
        let paths: Vec<String> = package.entries().iter().map(|e| e.path().to_string()).collect();
        assert_eq!(paths.len(), 4);
        assert!(paths[2].ends_with("/pic.png"));
        assert_ne!(paths[2], paths[3]);
    }
}
