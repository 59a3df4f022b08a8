//! Document transformation: Obsidian markdown body to [`TransformedContent`].
//!
//! 1. Extract wikilink tokens and block markers (code excluded)
//! 2. Resolve each token and splice in a placeholder link
//! 3. Build IR blocks from the placeholder markdown
//! 4. Rewrite markdown images that point at vault assets into embeds
//! 5. Collect assets and warnings

use crate::builder::{ANCHOR_SCHEME, LINK_SCHEME, Placeholder, Placeholders, build_blocks};
use std::ops::Range;
use tracing::instrument;
use vaultport_core::{
    Block, EmbedRef, EmbedTarget, Inline, LinkRef, LinkTarget, Metadata, ResolvedWikiLink,
    TransformedContent, Warning, file_stem, prettify_name,
};
use vaultport_graph::{Resolver, VaultIndex, is_asset_target};
use vaultport_parser::{ParseEngine, WikiLinkToken, splice_tracked};

/// Read-only state shared by every document of a run.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub index: &'a VaultIndex,
    pub resolver: &'a Resolver,
}

impl<'a> TransformContext<'a> {
    pub fn new(index: &'a VaultIndex, resolver: &'a Resolver) -> Self {
        Self { index, resolver }
    }
}

/// Stateless content transformer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer;

impl Transformer {
    pub fn new() -> Self {
        Self
    }

    /// Transform one document body.
    ///
    /// `frontmatter` is the already-parsed YAML block; `path` is the
    /// document's vault-relative path. The result depends only on these
    /// inputs and the context, never on other documents.
    #[instrument(skip_all, fields(path = %path), name = "transform_document")]
    pub fn transform(
        &self,
        text: &str,
        frontmatter: &Metadata,
        path: &str,
        ctx: &TransformContext<'_>,
    ) -> TransformedContent {
        let scan = ParseEngine::new(text).parse();

        let mut warnings = Vec::new();
        let mut links = Vec::with_capacity(scan.wikilinks.len());
        let mut tokens = Vec::with_capacity(scan.wikilinks.len());
        let mut replacements: Vec<(Range<usize>, String)> = Vec::new();

        for (n, token) in scan.wikilinks.iter().enumerate() {
            let (resolved, inline, warning) = resolve_token(token, path, ctx);
            if let Some(warning) = warning {
                warnings.push(warning.at_line(token.position.line));
            }
            links.push(resolved);
            tokens.push(inline);
            replacements.push((token.span(), format!("[]({}{})", LINK_SCHEME, n)));
        }

        let anchors: Vec<String> = scan.block_refs.iter().map(|r| r.id.clone()).collect();
        for (n, block_ref) in scan.block_refs.iter().enumerate() {
            replacements.push((
                block_ref.position.span(),
                format!("[]({}{})", ANCHOR_SCHEME, n),
            ));
        }

        let kinds = (0..tokens.len())
            .map(Placeholder::Token)
            .chain((0..anchors.len()).map(Placeholder::Anchor));
        let (markdown, offsets) = splice_tracked(text, replacements);
        let placeholders: Placeholders = offsets
            .into_iter()
            .zip(kinds)
            .filter_map(|(offset, kind)| Some((offset?, kind)))
            .collect();
        let output = build_blocks(&markdown, &tokens, &anchors, &placeholders);

        for identifier in &output.unknown_callouts {
            warnings.push(Warning::unknown_callout(path, identifier));
        }

        let mut blocks = output.blocks;
        embed_markdown_images(&mut blocks, path, ctx.index);
        if blocks.is_empty() {
            blocks.push(Block::empty_paragraph());
        }

        let assets = collect_assets(&blocks);

        TransformedContent {
            path: path.to_string(),
            title: document_title(frontmatter, path),
            blocks,
            metadata: frontmatter.clone(),
            assets,
            links,
            warnings,
        }
    }
}

/// Frontmatter `title`, else the prettified file stem.
pub fn document_title(frontmatter: &Metadata, path: &str) -> String {
    frontmatter
        .get("title")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| prettify_name(file_stem(path)))
}

// ============================================================================
// Token resolution
// ============================================================================

fn resolve_token(
    token: &WikiLinkToken,
    path: &str,
    ctx: &TransformContext<'_>,
) -> (ResolvedWikiLink, Inline, Option<Warning>) {
    let link = &token.link;
    let display = link.display_text().to_string();

    if !link.is_embed {
        let resolved = ctx.resolver.resolve(link, path, ctx.index);
        let (target, warning) = match resolved.path() {
            Some(p) => (LinkTarget::Document { path: p.to_string() }, None),
            None => (
                LinkTarget::Broken {
                    raw: link.target.clone(),
                },
                Some(Warning::broken_link(path, link)),
            ),
        };
        let inline = Inline::WikiLink(LinkRef {
            display,
            target,
            header: link.header.clone(),
            block_id: link.block_id.clone(),
        });
        return (resolved, inline, warning);
    }

    let resolved = ctx.resolver.resolve_embed(link, path, ctx.index);
    let (target, warning) = match (resolved.path(), is_asset_target(&link.target)) {
        (Some(p), true) => (EmbedTarget::Asset { path: p.to_string() }, None),
        (Some(p), false) => (
            EmbedTarget::Document { path: p.to_string() },
            Some(Warning::unsupported_embed(path, link)),
        ),
        (None, true) => (
            EmbedTarget::Missing {
                raw: link.target.clone(),
            },
            Some(Warning::missing_asset(path, link)),
        ),
        (None, false) => (
            EmbedTarget::Missing {
                raw: link.target.clone(),
            },
            Some(Warning::broken_link(path, link)),
        ),
    };

    (resolved, Inline::Embed(EmbedRef { display, target }), warning)
}

// ============================================================================
// IR post-processing
// ============================================================================

/// Visit every inline of a block tree in document order.
pub fn visit_inlines<F>(blocks: &[Block], f: &mut F)
where
    F: FnMut(&Inline),
{
    for block in blocks {
        match block {
            Block::Heading { content, .. } | Block::Paragraph { content, .. } => {
                content.iter().for_each(&mut *f)
            }
            Block::List { items, .. } => {
                for item in items {
                    visit_inlines(&item.blocks, f);
                }
            }
            Block::Quote { blocks } | Block::Callout { blocks, .. } => visit_inlines(blocks, f),
            Block::Table { header, rows } => {
                for cell in header.iter().chain(rows.iter().flatten()) {
                    cell.iter().for_each(&mut *f);
                }
            }
            Block::Code { .. } | Block::Rule | Block::Html { .. } => {}
        }
    }
}

fn visit_inlines_mut<F>(blocks: &mut [Block], f: &mut F)
where
    F: FnMut(&mut Inline),
{
    for block in blocks {
        match block {
            Block::Heading { content, .. } | Block::Paragraph { content, .. } => {
                content.iter_mut().for_each(&mut *f)
            }
            Block::List { items, .. } => {
                for item in items {
                    visit_inlines_mut(&mut item.blocks, f);
                }
            }
            Block::Quote { blocks } | Block::Callout { blocks, .. } => {
                visit_inlines_mut(blocks, f)
            }
            Block::Table { header, rows } => {
                for cell in header.iter_mut().chain(rows.iter_mut().flatten()) {
                    cell.iter_mut().for_each(&mut *f);
                }
            }
            Block::Code { .. } | Block::Rule | Block::Html { .. } => {}
        }
    }
}

/// Standard `![alt](relative/path)` images that name a vault asset become
/// asset embeds so they are packaged like `![[...]]` embeds.
fn embed_markdown_images(blocks: &mut [Block], path: &str, index: &VaultIndex) {
    let folder = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    visit_inlines_mut(blocks, &mut |inline| {
        if let Inline::Image { alt, src } = inline
            && let Some(asset) = local_asset(src, folder, index)
        {
            *inline = Inline::Embed(EmbedRef {
                display: alt.clone(),
                target: EmbedTarget::Asset { path: asset },
            });
        }
    });
}

fn local_asset(src: &str, folder: &str, index: &VaultIndex) -> Option<String> {
    if src.is_empty() || src.contains("://") || src.starts_with("data:") || src.starts_with('#') {
        return None;
    }
    let decoded = urlencoding::decode(src)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| src.to_string());

    if let Some(rooted) = decoded.strip_prefix('/') {
        return index.asset(rooted).map(str::to_string);
    }
    join_relative(folder, &decoded)
        .and_then(|joined| index.asset(&joined).map(str::to_string))
        .or_else(|| index.asset(&decoded).map(str::to_string))
}

/// Join a relative path onto a folder, folding `.` and `..` segments.
fn join_relative(folder: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = folder.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Referenced asset paths, deduplicated in first-seen order.
fn collect_assets(blocks: &[Block]) -> Vec<String> {
    let mut assets: Vec<String> = Vec::new();
    visit_inlines(blocks, &mut |inline| {
        if let Inline::Embed(EmbedRef {
            target: EmbedTarget::Asset { path },
            ..
        }) = inline
            && !assets.contains(path)
        {
            assets.push(path.clone());
        }
    });
    assets
}
