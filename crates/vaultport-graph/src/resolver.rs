//! Three-stage wikilink resolution: exact path, filename, optional fuzzy.
//!
//! Resolution never fails. A link that no stage can place is
//! [`Resolution::Broken`], which the caller reports as a warning.

use crate::index::{VaultIndex, normalize_key};
use vaultport_core::{Resolution, ResolvedWikiLink, WikiLink};

// ============================================================================
// Fuzzy strategy
// ============================================================================

/// Last-resort matcher consulted when exact and filename matching fail.
///
/// `candidates` are all document stems of the vault, sorted. Implementations
/// return one of them or `None`.
pub trait FuzzyMatcher: Send + Sync {
    fn best_match(&self, target: &str, candidates: &[&str]) -> Option<String>;
}

/// Normalized Levenshtein similarity above a threshold.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl SimilarityMatcher {
    pub const DEFAULT_THRESHOLD: f64 = 0.8;

    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

impl FuzzyMatcher for SimilarityMatcher {
    fn best_match(&self, target: &str, candidates: &[&str]) -> Option<String> {
        let target = target.to_lowercase();
        let mut best: Option<(f64, &str)> = None;

        for &candidate in candidates {
            let score = strsim::normalized_levenshtein(&target, &candidate.to_lowercase());
            if score < self.threshold {
                continue;
            }
            // Equal scores keep the lexicographically smaller stem
            let better = match best {
                None => true,
                Some((best_score, best_name)) => {
                    score > best_score || (score == best_score && candidate < best_name)
                }
            };
            if better {
                best = Some((score, candidate));
            }
        }

        best.map(|(_, name)| name.to_string())
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves wikilinks against a [`VaultIndex`].
///
/// Holds no per-run state, so one resolver is shared by reference across
/// worker threads.
#[derive(Default)]
pub struct Resolver {
    fuzzy: Option<Box<dyn FuzzyMatcher>>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("fuzzy", &self.fuzzy.is_some())
            .finish()
    }
}

impl Resolver {
    /// A resolver with no fuzzy stage.
    pub fn new() -> Self {
        Self { fuzzy: None }
    }

    /// A resolver that falls back to `matcher` after the exact and filename stages.
    pub fn with_fuzzy(matcher: Box<dyn FuzzyMatcher>) -> Self {
        Self {
            fuzzy: Some(matcher),
        }
    }

    pub fn has_fuzzy(&self) -> bool {
        self.fuzzy.is_some()
    }

    /// Resolve a link to a document.
    ///
    /// `current_path` is the linking document; it does not influence the
    /// outcome, so resolution stays independent of where a link is written.
    pub fn resolve(
        &self,
        link: &WikiLink,
        current_path: &str,
        index: &VaultIndex,
    ) -> ResolvedWikiLink {
        let resolution = self.resolve_target(&link.target, index);
        if resolution.is_broken() {
            log::debug!("{}: unresolved link target '{}'", current_path, link.target);
        }
        ResolvedWikiLink {
            link: link.clone(),
            resolution,
        }
    }

    /// Resolve an embed. Targets with a non-markdown extension are looked up
    /// among assets; everything else resolves like a link.
    pub fn resolve_embed(
        &self,
        link: &WikiLink,
        current_path: &str,
        index: &VaultIndex,
    ) -> ResolvedWikiLink {
        if !is_asset_target(&link.target) {
            return self.resolve(link, current_path, index);
        }

        let target = clean_target(&link.target);
        let resolution = if let Some(path) = index.asset(&target) {
            Resolution::ExactPath(path.to_string())
        } else if let Some(path) = index.asset_by_name(last_segment(&target)).first() {
            Resolution::FilenameMatch(path.clone())
        } else {
            log::debug!("{}: missing embedded file '{}'", current_path, link.target);
            Resolution::Broken
        };

        ResolvedWikiLink {
            link: link.clone(),
            resolution,
        }
    }

    fn resolve_target(&self, target: &str, index: &VaultIndex) -> Resolution {
        let target = clean_target(target);
        if target.is_empty() {
            return Resolution::Broken;
        }

        // Stage 1: exact path, as written or with `.md` appended
        if let Some(path) = index.document(&target) {
            return Resolution::ExactPath(path.to_string());
        }
        if let Some(path) = index.document(&format!("{}.md", target)) {
            return Resolution::ExactPath(path.to_string());
        }

        // Stage 2: bare filename, lexicographically smallest path wins
        let stem = last_segment(&target);
        let stem = stem.strip_suffix(".md").unwrap_or(stem);
        if let Some(path) = index.by_filename(stem).first() {
            return Resolution::FilenameMatch(path.clone());
        }

        // Stage 3: configured fuzzy strategy
        if let Some(matcher) = &self.fuzzy {
            let candidates = index.filenames();
            if let Some(name) = matcher.best_match(stem, &candidates)
                && let Some(path) = index.by_filename(&name).first()
            {
                log::debug!("Fuzzy matched '{}' to '{}'", target, path);
                return Resolution::FuzzyMatch(path.clone());
            }
        }

        Resolution::Broken
    }
}

/// Strip leading `/` and `./`, unify separators and NFC-normalize.
fn clean_target(target: &str) -> String {
    let mut target = normalize_key(target.trim());
    loop {
        if let Some(rest) = target.strip_prefix("./") {
            target = rest.to_string();
        } else if let Some(rest) = target.strip_prefix('/') {
            target = rest.to_string();
        } else {
            break;
        }
    }
    target
}

fn last_segment(target: &str) -> &str {
    target.rsplit('/').next().unwrap_or(target)
}

/// Whether an embed target names a non-markdown file.
pub fn is_asset_target(target: &str) -> bool {
    let name = last_segment(target.trim());
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            !ext.eq_ignore_ascii_case("md") && !ext.contains(' ')
        }
        _ => false,
    }
}
