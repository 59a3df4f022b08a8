//! # Vault Index and Link Resolution
//!
//! Provides:
//! - [`VaultIndex`]: every document path and bare filename of a vault,
//!   NFC-normalized, plus the same lookups for assets
//! - [`Resolver`]: Obsidian's resolution precedence
//!   1. exact relative path (with or without `.md`)
//!   2. bare filename, ties broken by lexicographic path order
//!   3. an optional [`FuzzyMatcher`] strategy
//!
//! ## Quick Start
//!
//! ```
//! use vaultport_core::{Resolution, VaultStructure, WikiLink};
//! use vaultport_graph::{Resolver, VaultIndex};
//!
//! let structure = VaultStructure {
//!     markdown_files: vec!["projects/Plan.md".into(), "archive/Plan.md".into()],
//!     ..Default::default()
//! };
//! let index = VaultIndex::build(&structure);
//! let resolver = Resolver::new();
//!
//! let resolved = resolver.resolve(&WikiLink::new("Plan"), "Home.md", &index);
//! assert_eq!(resolved.resolution, Resolution::FilenameMatch("archive/Plan.md".into()));
//! ```
//!
//! ### Fuzzy fallback
//!
//! ```
//! use vaultport_core::{VaultStructure, WikiLink};
//! use vaultport_graph::{Resolver, SimilarityMatcher, VaultIndex};
//!
//! let structure = VaultStructure {
//!     markdown_files: vec!["Meeting Notes.md".into()],
//!     ..Default::default()
//! };
//! let index = VaultIndex::build(&structure);
//! let resolver = Resolver::with_fuzzy(Box::new(SimilarityMatcher::default()));
//!
//! let resolved = resolver.resolve(&WikiLink::new("Meeting Note"), "Home.md", &index);
//! assert_eq!(resolved.path(), Some("Meeting Notes.md"));
//! ```

pub mod index;
pub mod resolver;

pub use index::{VaultIndex, normalize_key};
pub use resolver::{FuzzyMatcher, Resolver, SimilarityMatcher, is_asset_target};
