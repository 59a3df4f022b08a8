//! # Vault Scanner
//!
//! Reads an Obsidian vault from disk. This is the only crate of the export
//! pipeline, apart from the package writer and the binary, that touches the
//! filesystem.
//!
//! - Validates the `.obsidian` marker directory
//! - Enumerates markdown documents and assets with `walkdir`, skipping hidden
//!   and excluded directories
//! - Splits and parses YAML frontmatter; malformed YAML degrades to a warning
//! - Records raw wikilink targets per document
//! - Builds the [`FolderNode`](vaultport_core::FolderNode) tree
//!
//! ## Quick Start
//!
//! ```no_run
//! use vaultport_vault::VaultScanner;
//!
//! let scanner = VaultScanner::new("/path/to/vault");
//! let scanned = scanner.scan()?;
//! for path in &scanned.structure.markdown_files {
//!     let body = scanner.read_document(path)?;
//!     println!("{}: {} bytes", path, body.len());
//! }
//! # Ok::<(), vaultport_core::Error>(())
//! ```

pub mod scanner;

pub use scanner::{DEFAULT_EXCLUDED_DIRS, ScannedVault, VAULT_MARKER, VaultScanner};

pub mod prelude {
    pub use crate::scanner::{ScannedVault, VaultScanner};
    pub use vaultport_core::prelude::*;
}
