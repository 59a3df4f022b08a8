//! # vaultport Core
//!
//! Core data models, the intermediate document representation, error types
//! and configuration for the vault export pipeline. Every other crate in the
//! workspace depends on the types defined here.
//!
//! ## Architecture Principles
//!
//! - **Pure data**: no I/O beyond loading and saving configuration
//! - **Closed IR**: [`Block`] and [`Inline`] are exhaustive enums, not maps
//! - **Zero Panic in Libraries**: fatal problems are [`Error`], recoverable ones are [`Warning`]
//! - **Builder Pattern for Complex Types**: [`ExportConfig`] is built and validated through a builder
//! - **Immutable by Default**: pipeline stages produce new values instead of mutating
//!
//! ## Core Modules
//!
//! - [`models`] - Vault snapshot, wikilinks, resolutions, warnings, transformer output
//! - [`ir`] - Intermediate representation consumed by the generators
//! - [`callout`] - Callout kinds and their icons
//! - [`error`] - Error types and Result alias
//! - [`config`] - Export configuration
//! - [`utils`] - Serialization and naming helpers
//!
//! ## Usage Examples
//!
//! ```
//! use vaultport_core::prelude::*;
//!
//! let link = WikiLink::new("Project Plan");
//! let resolved = ResolvedWikiLink {
//!     link,
//!     resolution: Resolution::FilenameMatch("work/Project Plan.md".to_string()),
//! };
//! assert_eq!(resolved.path(), Some("work/Project Plan.md"));
//! assert_eq!(resolved.resolution.stage(), "filename_match");
//! ```
//!
//! ```
//! use vaultport_core::prelude::*;
//!
//! fn check() -> Result<()> {
//!     let _err = Error::parse_error("Invalid markdown content");
//!     Ok(())
//! }
//! ```

pub mod callout;
pub mod config;
pub mod error;
pub mod ir;
pub mod models;
pub mod utils;

pub use callout::{CalloutFamily, CalloutKind};
pub use config::{ExportConfig, ExportConfigBuilder, ExportFormat};
pub use error::{Error, Result};
pub use ir::{
    Block, EmbedRef, EmbedTarget, Inline, LinkRef, LinkTarget, ListItem, Marks, inline_text,
    is_image_path,
};
pub use models::*;
pub use utils::{CSVBuilder, prettify_name, to_json_bytes, to_json_string, truncate_at_word};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::callout::{CalloutFamily, CalloutKind};
    pub use crate::config::{ExportConfig, ExportFormat};
    pub use crate::error::{Error, Result};
    pub use crate::ir::{Block, EmbedRef, EmbedTarget, Inline, LinkRef, LinkTarget, ListItem, Marks};
    pub use crate::models::{
        FolderNode, LineIndex, Metadata, Resolution, ResolvedWikiLink, SourcePosition,
        TransformedContent, VaultStructure, Warning, WarningKind, WikiLink,
    };
}
