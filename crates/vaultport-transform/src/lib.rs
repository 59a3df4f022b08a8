//! # Content Transformer
//!
//! Turns an Obsidian markdown body into the target-agnostic IR of
//! [`vaultport_core::ir`], resolving every wikilink against a
//! [`VaultIndex`](vaultport_graph::VaultIndex) on the way.
//!
//! - Wikilinks become [`Inline::WikiLink`](vaultport_core::Inline) with a
//!   resolved path or a broken marker
//! - Embeds become [`Inline::Embed`](vaultport_core::Inline) pointing at an
//!   asset, a note, or nothing
//! - `> [!type]` blockquotes become callouts; unknown types are kept
//! - Trailing `^id` markers become block anchors
//! - Every broken link, missing asset, note embed and unknown callout type
//!   produces one warning
//!
//! ## Quick Start
//!
//! ```
//! use vaultport_core::{Metadata, VaultStructure};
//! use vaultport_graph::{Resolver, VaultIndex};
//! use vaultport_transform::{TransformContext, Transformer};
//!
//! let index = VaultIndex::build(&VaultStructure {
//!     markdown_files: vec!["A.md".into(), "B.md".into()],
//!     asset_files: vec!["image.png".into()],
//!     ..Default::default()
//! });
//! let resolver = Resolver::new();
//! let ctx = TransformContext::new(&index, &resolver);
//!
//! let out = Transformer::new().transform(
//!     "See [[B|Bee]] and ![[image.png]]",
//!     &Metadata::new(),
//!     "A.md",
//!     &ctx,
//! );
//! assert!(out.warnings.is_empty());
//! assert_eq!(out.assets, vec!["image.png"]);
//! ```

mod builder;
pub mod transformer;

pub use transformer::{TransformContext, Transformer, document_title, visit_inlines};
