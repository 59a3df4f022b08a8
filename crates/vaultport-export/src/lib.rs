//! # Package Export
//!
//! Turns transformed documents into import packages for three targets:
//!
//! | Format | Documents | Assets |
//! |--------|-----------|--------|
//! | AppFlowy | `documents/<stem>.json` block trees + `config.json` | `assets/` |
//! | Notion-style | `<Page Name> <32hex>.md` in mirrored folders | per-page directory |
//! | Outline | ProseMirror trees in `<Collection>.json` + `metadata.json` | `uploads/` |
//!
//! Every format is a [`FormatExporter`]: a per-document generator that runs
//! concurrently, followed by one assembly step producing a [`Package`].
//! [`write_package`] writes any package as a ZIP.
//!
//! Identifiers come from [`DocumentIds`] and depend only on document
//! paths, so re-exporting an unchanged vault reproduces every page id, file
//! name and link.
//!
//! ## Quick Start
//!
//! ```
//! use vaultport_core::{Block, FolderNode, Inline, Metadata, TransformedContent};
//! use vaultport_export::{DocumentIds, FormatExporter, NotionExporter, Package, VaultInfo};
//!
//! # fn main() -> vaultport_core::Result<()> {
//! let content = TransformedContent {
//!     path: "Welcome.md".into(),
//!     title: "Welcome".into(),
//!     blocks: vec![Block::Paragraph { content: vec![Inline::text("Hello")], anchor: None }],
//!     metadata: Metadata::new(),
//!     assets: vec![],
//!     links: vec![],
//!     warnings: vec![],
//! };
//! let ids = DocumentIds::build(&["Welcome.md"]);
//! let exporter = NotionExporter::default();
//! let page = exporter.generate_document(&content, &ids);
//! assert!(page.file_name.starts_with("Welcome "));
//!
//! let vault = VaultInfo::new("Vault", "/tmp/vault", FolderNode::build("Vault", &["Welcome.md".into()]));
//! let package = exporter.assemble(vec![page], &vault, vec![])?;
//! assert_eq!(package.document_count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod appflowy;
pub mod archive;
pub mod ids;
pub mod notion;
pub mod outline;
pub mod package;
pub mod report;

pub use appflowy::{AppFlowyDocument, AppFlowyExporter, AppFlowyGenerator, AppFlowyPackage};
pub use archive::write_package;
pub use ids::{DocumentId, DocumentIds, slugify};
pub use notion::{NotionExporter, NotionGenerator, NotionPackage, NotionPage};
pub use outline::{OutlineDocument, OutlineExporter, OutlineGenerator, OutlinePackage};
pub use package::{FormatExporter, Package, PackageEntry, VaultInfo};
pub use report::{ExportReport, ReportExporter};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        AppFlowyExporter, DocumentIds, ExportReport, FormatExporter, NotionExporter,
        OutlineExporter, Package, ReportExporter, VaultInfo, write_package,
    };
}
