//! Individual Obsidian syntax parsers, each a regex layer with a fast pre-filter.

pub mod block_refs;
pub mod callouts;
pub mod frontmatter;
pub mod wikilinks;

pub use self::callouts::{CalloutHeader, parse_callout_header};
pub use self::frontmatter::{parse_frontmatter, split_frontmatter};
pub use self::wikilinks::parse_wikilink;
