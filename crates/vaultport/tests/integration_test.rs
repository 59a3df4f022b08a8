//! End-to-end export tests against temporary vaults.

use regex::Regex;
use serde_json::Value;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vaultport::{Error, ExportConfig, ExportFormat, ExportReport, WarningKind, export};
use vaultport_export::DocumentId;
use zip::ZipArchive;

// ============================================================================
// Helpers
// ============================================================================

/// Minimal 1x1 PNG
const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

struct TestVault {
    dir: TempDir,
}

impl TestVault {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("vault/.obsidian")).unwrap();
        Self { dir }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("vault")
    }

    fn write(&self, relative: &str, content: &[u8]) -> &Self {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn export(&self, format: ExportFormat, output: &str) -> ExportReport {
        let config = ExportConfig::builder(self.root())
            .format(format)
            .output_path(self.output(output))
            .build()
            .unwrap();
        export(config).unwrap()
    }
}

fn open(path: &Path) -> ZipArchive<fs::File> {
    ZipArchive::new(fs::File::open(path).unwrap()).unwrap()
}

fn names(archive: &ZipArchive<fs::File>) -> Vec<String> {
    archive.file_names().map(|n| n.to_string()).collect()
}

fn read_entry(archive: &mut ZipArchive<fs::File>, name: &str) -> String {
    let mut file = archive.by_name(name).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

fn read_json(archive: &mut ZipArchive<fs::File>, name: &str) -> Value {
    serde_json::from_str(&read_entry(archive, name)).unwrap()
}

// ============================================================================
// Core scenario
// ============================================================================

#[test]
fn test_linked_documents_with_image_export_cleanly() {
    let vault = TestVault::new();
    vault
        .write("A.md", b"# A\n\nLink to [[B]] and ![[image.png]]\n")
        .write("B.md", b"# B\n\nBack to [[A|the start]].\n")
        .write("image.png", PNG);

    let report = vault.export(ExportFormat::AppFlowy, "out.zip");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.exported_documents, 2);
    assert_eq!(report.packaged_assets, 1);
    assert_eq!(report.total_links, 3);
    assert_eq!(report.broken_links, 0);

    let mut archive = open(&vault.output("out.zip"));
    let entries = names(&archive);
    assert!(entries.contains(&"config.json".to_string()));
    assert!(entries.contains(&"documents/A.json".to_string()));
    assert!(entries.contains(&"documents/B.json".to_string()));
    assert!(entries.contains(&"assets/image.png".to_string()));
    assert!(!entries.contains(&"warnings.txt".to_string()));

    let config = read_json(&mut archive, "config.json");
    assert_eq!(config["template_type"], "obsidian_export");
    assert_eq!(config["has_warnings"], false);
    assert_eq!(config["documents"].as_array().unwrap().len(), 2);

    let a = read_entry(&mut archive, "documents/A.json");
    let b_id = DocumentId::derive("B.md").uuid.to_string();
    assert!(a.contains(&b_id), "A should mention B's page id");
    assert!(a.contains("assets/image.png"));
}

#[test]
fn test_broken_link_reported_and_rendered_as_text() {
    let vault = TestVault::new();
    vault.write("Note.md", b"Line one\n\nSee [[Nowhere]] here\n");

    let report = vault.export(ExportFormat::Notion, "notion.zip");
    let broken: Vec<_> = report.warnings_of(WarningKind::BrokenLink).collect();
    assert_eq!(broken.len(), 1);
    assert_eq!(broken[0].document, "Note.md");
    assert_eq!(broken[0].raw.as_deref(), Some("Nowhere"));
    assert_eq!(broken[0].line, Some(3));
    assert_eq!(report.broken_links, 1);

    let mut archive = open(&vault.output("notion.zip"));
    let page = names(&archive)
        .into_iter()
        .find(|n| n.ends_with(".md"))
        .unwrap();
    let body = read_entry(&mut archive, &page);
    assert!(body.contains("See Nowhere here"));
    assert!(!body.contains("[["));

    let warnings = read_entry(&mut archive, "warnings.txt");
    assert_eq!(warnings.lines().count(), 1);
    assert!(warnings.contains("Nowhere"));
}

#[test]
fn test_custom_callout_becomes_quote_with_one_warning() {
    let vault = TestVault::new();
    vault.write(
        "Callouts.md",
        b"> [!custom-type] Heads up\n> Body text\n\n> [!note]\n> Known kind\n",
    );

    let report = vault.export(ExportFormat::Outline, "outline.zip");
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::UnknownCallout);
    assert_eq!(report.warnings[0].raw.as_deref(), Some("custom-type"));

    let mut archive = open(&vault.output("outline.zip"));
    let collection = read_json(&mut archive, "vault.json");
    let doc = collection["documents"]
        .as_object()
        .unwrap()
        .values()
        .next()
        .unwrap()
        .clone();
    let data = doc["data"].to_string();
    assert!(data.contains("blockquote"));
    assert!(data.contains("Body text"));
}

// ============================================================================
// Structural failures
// ============================================================================

#[test]
fn test_missing_marker_is_not_a_vault() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Note.md"), "text").unwrap();

    let config = ExportConfig::builder(dir.path())
        .output_path(dir.path().join("out.zip"))
        .build()
        .unwrap();
    assert!(matches!(export(config), Err(Error::NotAVault { .. })));
    assert!(!dir.path().join("out.zip").exists());
}

#[test]
fn test_empty_vault_fails() {
    let vault = TestVault::new();
    vault.write("image.png", PNG);

    let config = ExportConfig::builder(vault.root())
        .output_path(vault.output("out.zip"))
        .build()
        .unwrap();
    assert!(matches!(export(config), Err(Error::EmptyVault { .. })));
    assert!(!vault.output("out.zip").exists());
}

// ============================================================================
// Determinism and naming
// ============================================================================

#[test]
fn test_identifiers_identical_across_runs() {
    let vault = TestVault::new();
    vault
        .write("Projects/Plan.md", b"# Plan\n\n[[Ideas]]\n")
        .write("Ideas.md", b"# Ideas\n");

    vault.export(ExportFormat::Outline, "first.zip");
    vault.export(ExportFormat::Outline, "second.zip");

    let ids = |name: &str| {
        let mut archive = open(&vault.output(name));
        let collection = read_json(&mut archive, "vault.json");
        let docs: Vec<String> = collection["documents"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        (docs, collection["collection"]["id"].clone())
    };
    assert_eq!(ids("first.zip"), ids("second.zip"));
}

#[test]
fn test_appflowy_duplicate_stems_get_suffix() {
    let vault = TestVault::new();
    vault
        .write("a/Note.md", b"first")
        .write("b/Note.md", b"second");

    vault.export(ExportFormat::AppFlowy, "dup.zip");
    let entries = names(&open(&vault.output("dup.zip")));
    assert!(entries.contains(&"documents/Note.json".to_string()));
    assert!(entries.contains(&"documents/Note_1.json".to_string()));
}

#[test]
fn test_notion_file_names_carry_hex_ids() {
    let vault = TestVault::new();
    vault
        .write("Daily Log.md", b"entry ![[pic.png]]")
        .write("Work/Meeting-notes.md", b"[[Daily Log]]")
        .write("pic.png", PNG);

    let report = vault.export(ExportFormat::Notion, "notion.zip");
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let pattern = Regex::new(r"^.+ [0-9a-f]{32}\.md$").unwrap();
    let entries = names(&open(&vault.output("notion.zip")));
    let pages: Vec<&String> = entries.iter().filter(|n| n.ends_with(".md")).collect();
    assert_eq!(pages.len(), 2);
    for page in &pages {
        let file = page.rsplit('/').next().unwrap();
        assert!(pattern.is_match(file), "{}", file);
    }
    assert!(pages.iter().any(|p| p.starts_with("Work/")));

    let daily = DocumentId::derive("Daily Log.md").notion_id;
    assert!(entries.iter().any(|n| n.ends_with(&format!("{}/pic.png", daily))));
}

#[test]
fn test_outline_folders_become_nested_documents() {
    let vault = TestVault::new();
    vault
        .write("Top.md", b"# Top")
        .write("Area/Child.md", b"# Child")
        .write("Area/Deep/Leaf.md", b"# Leaf");

    vault.export(ExportFormat::Outline, "nested.zip");
    let mut archive = open(&vault.output("nested.zip"));

    let metadata = read_json(&mut archive, "metadata.json");
    assert_eq!(metadata["exportVersion"], 1);

    let collection = read_json(&mut archive, "vault.json");
    let documents = collection["documents"].as_object().unwrap();
    let by_title = |title: &str| {
        documents
            .values()
            .find(|d| d["title"] == title)
            .unwrap_or_else(|| panic!("missing {}", title))
            .clone()
    };

    let area = by_title("Area");
    let deep = by_title("Deep");
    let leaf = by_title("Leaf");
    let top = by_title("Top");

    assert_eq!(area["icon"], "📁");
    assert!(area["parentDocumentId"].is_null());
    assert_eq!(deep["parentDocumentId"], area["id"]);
    assert_eq!(leaf["parentDocumentId"], deep["id"]);
    assert!(top["parentDocumentId"].is_null());

    let structure = collection["collection"]["documentStructure"]
        .as_array()
        .unwrap();
    let area_node = structure.iter().find(|n| n["id"] == area["id"]).unwrap();
    let deep_node = &area_node["children"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["id"] == deep["id"])
        .unwrap()
        .clone();
    assert_eq!(deep_node["children"][0]["id"], leaf["id"]);
}

// ============================================================================
// Degraded inputs
// ============================================================================

#[test]
fn test_missing_asset_warns_without_aborting() {
    let vault = TestVault::new();
    vault.write("Gallery.md", b"# Gallery\n\n![[gone.png]]\n\nStill here\n");

    let report = vault.export(ExportFormat::AppFlowy, "gallery.zip");
    let missing: Vec<_> = report.warnings_of(WarningKind::MissingAsset).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].document, "Gallery.md");
    assert_eq!(report.exported_documents, 1);

    let mut archive = open(&vault.output("gallery.zip"));
    let doc = read_entry(&mut archive, "documents/Gallery.json");
    assert!(doc.contains("Still here"));
    let config = read_json(&mut archive, "config.json");
    assert_eq!(config["has_warnings"], true);
}

#[test]
fn test_validate_only_writes_nothing() {
    let vault = TestVault::new();
    vault.write("A.md", b"[[Missing]]");

    let config = ExportConfig::builder(vault.root())
        .output_path(vault.output("never.zip"))
        .validate_only(true)
        .build()
        .unwrap();
    let report = export(config).unwrap();

    assert!(report.validate_only);
    assert!(report.package_path.is_none());
    assert_eq!(report.broken_links, 1);
    assert!(!vault.output("never.zip").exists());
}

#[test]
fn test_code_blocks_keep_wikilink_syntax() {
    let vault = TestVault::new();
    vault.write("Code.md", b"```\n[[NotALink]]\n```\n");

    let report = vault.export(ExportFormat::Notion, "code.zip");
    assert!(report.warnings.is_empty());
    assert_eq!(report.total_links, 0);

    let mut archive = open(&vault.output("code.zip"));
    let page = names(&archive)
        .into_iter()
        .find(|n| n.ends_with(".md"))
        .unwrap();
    assert!(read_entry(&mut archive, &page).contains("[[NotALink]]"));
}

#[test]
fn test_fuzzy_matching_resolves_typos() {
    let vault = TestVault::new();
    vault
        .write("Meeting Notes.md", b"# Meeting")
        .write("Index.md", b"[[Meeting Note]]");

    let strict = ExportConfig::builder(vault.root())
        .validate_only(true)
        .build()
        .unwrap();
    assert_eq!(export(strict).unwrap().broken_links, 1);

    let fuzzy = ExportConfig::builder(vault.root())
        .validate_only(true)
        .fuzzy_matching(0.8)
        .build()
        .unwrap();
    assert_eq!(export(fuzzy).unwrap().broken_links, 0);
}

#[test]
fn test_default_output_next_to_vault() {
    let vault = TestVault::new();
    vault.write("A.md", b"# A");

    let config = ExportConfig::builder(vault.root())
        .format(ExportFormat::Notion)
        .build()
        .unwrap();
    let report = export(config).unwrap();

    let expected = vault.output("vault_notion.zip");
    assert!(expected.exists());
    assert_eq!(report.package_path, Some(expected.display().to_string()));
}
