//! # vaultport
//!
//! Converts an Obsidian vault into an import package for AppFlowy, Notion
//! or Outline.
//!
//! The pipeline scans the vault, builds the shared index and resolver,
//! transforms every document in parallel, renders it with the selected
//! format's generator and hands the results to a single-threaded assembler
//! that writes the ZIP package.
//!
//! ```no_run
//! use vaultport::{ExportConfig, ExportFormat, ExportPipeline};
//!
//! # fn main() -> vaultport::Result<()> {
//! let config = ExportConfig::builder("/notes/MyVault")
//!     .format(ExportFormat::Outline)
//!     .build()?;
//! let report = ExportPipeline::new(config).run()?;
//! println!("{} documents exported", report.exported_documents);
//! # Ok(())
//! # }
//! ```

use rayon::prelude::*;
use std::time::Instant;
use tracing::instrument;
use vaultport_core::TransformedContent;
use vaultport_export::{
    AppFlowyExporter, AppFlowyGenerator, DocumentIds, FormatExporter, NotionExporter,
    NotionGenerator, OutlineExporter, OutlineGenerator, Package, VaultInfo, write_package,
};
use vaultport_graph::{Resolver, SimilarityMatcher, VaultIndex};
use vaultport_transform::{TransformContext, Transformer};
use vaultport_vault::{ScannedVault, VaultScanner};

pub mod settings;

pub use settings::Settings;
pub use vaultport_core::{Error, ExportConfig, ExportFormat, Result, Warning, WarningKind};
pub use vaultport_export::{ExportReport, ReportExporter};

/// Per-document result of the parallel phase.
struct Rendered<D> {
    document: D,
    warnings: Vec<Warning>,
    links: usize,
    broken: usize,
}

/// Shared, read-only state for one run.
struct Session<'a> {
    config: &'a ExportConfig,
    scanner: &'a VaultScanner,
    scanned: &'a ScannedVault,
    index: &'a VaultIndex,
    resolver: &'a Resolver,
    ids: &'a DocumentIds,
}

/// Runs one export as configured.
#[derive(Debug, Clone)]
pub struct ExportPipeline {
    config: ExportConfig,
}

impl ExportPipeline {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Scan, transform, assemble and (unless validate-only) write the package.
    ///
    /// Structural problems (`NotAVault`, `EmptyVault`) and package write
    /// failures are errors; everything else lands in the report's warnings.
    #[instrument(skip(self), fields(vault = %self.config.vault_path.display(), format = %self.config.format), name = "export")]
    pub fn run(&self) -> Result<ExportReport> {
        let started = Instant::now();
        self.config.validate()?;

        let scanner = VaultScanner::from_config(&self.config);
        let scanned = scanner.scan()?;
        log::info!(
            "Scanned vault '{}': {} documents, {} assets",
            scanned.name(),
            scanned.structure.markdown_files.len(),
            scanned.structure.asset_files.len()
        );

        let index = VaultIndex::build(&scanned.structure);
        let resolver = if self.config.fuzzy_matching {
            Resolver::with_fuzzy(Box::new(SimilarityMatcher::new(
                self.config.fuzzy_threshold,
            )))
        } else {
            Resolver::new()
        };
        let ids = DocumentIds::build(&scanned.structure.markdown_files)
            .with_assets(&scanned.structure.asset_files);

        let session = Session {
            config: &self.config,
            scanner: &scanner,
            scanned: &scanned,
            index: &index,
            resolver: &resolver,
            ids: &ids,
        };

        let include_frontmatter = self.config.include_frontmatter;
        let mut report = match self.config.format {
            ExportFormat::AppFlowy => session.export(&AppFlowyExporter::new(
                AppFlowyGenerator::new().with_frontmatter(include_frontmatter),
            ))?,
            ExportFormat::Notion => session.export(&NotionExporter::new(
                NotionGenerator::new().with_frontmatter(include_frontmatter),
            ))?,
            ExportFormat::Outline => {
                session.export(&OutlineExporter::new(OutlineGenerator::new()))?
            }
        };

        report.duration_ms = started.elapsed().as_millis();
        log::info!(
            "Export finished in {}ms with {} warnings",
            report.duration_ms,
            report.warnings.len()
        );
        Ok(report)
    }
}

/// Run an export with the given configuration.
pub fn export(config: ExportConfig) -> Result<ExportReport> {
    ExportPipeline::new(config).run()
}

impl Session<'_> {
    fn export<E: FormatExporter>(&self, exporter: &E) -> Result<ExportReport> {
        let context = TransformContext::new(self.index, self.resolver);
        let rendered = self.render_all(exporter, context);

        let mut warnings = self.scanned.warnings.clone();
        let mut documents = Vec::with_capacity(rendered.len());
        let (mut links, mut broken) = (0, 0);
        for outcome in rendered {
            match outcome {
                Ok(r) => {
                    warnings.extend(r.warnings);
                    links += r.links;
                    broken += r.broken;
                    documents.push(r.document);
                }
                Err(warning) => warnings.push(warning),
            }
        }

        let vault = VaultInfo::new(
            self.config.package_name(),
            self.scanner.root(),
            self.scanned.folders.clone(),
        );
        let package = exporter.assemble(documents, &vault, warnings)?;

        let mut report = ExportReport::new(self.scanned.name(), self.config.format);
        report.validate_only = self.config.validate_only;
        report.total_documents = self.scanned.structure.markdown_files.len();
        report.exported_documents = package.document_count();
        report.total_assets = self.scanned.structure.asset_files.len();
        report.packaged_assets = package.asset_count();
        report.total_links = links;
        report.broken_links = broken;
        report.warnings = package.warnings().to_vec();

        if self.config.validate_only {
            log::info!("Validate-only run, no package written");
        } else {
            let written = write_package(&package, &self.config.output_path())?;
            log::info!("Wrote package {}", written.display());
            report.package_path = Some(written.display().to_string());
        }

        Ok(report)
    }

    /// Read, transform and render every document on the rayon pool.
    /// Results keep the sorted document order.
    #[instrument(skip_all, name = "render_documents")]
    fn render_all<E: FormatExporter>(
        &self,
        exporter: &E,
        context: TransformContext<'_>,
    ) -> Vec<std::result::Result<Rendered<E::Document>, Warning>> {
        let transformer = Transformer::new();
        self.scanned
            .structure
            .markdown_files
            .par_iter()
            .map(|path| -> std::result::Result<Rendered<E::Document>, Warning> {
                let body = self.scanner.read_document(path).map_err(|e| {
                    log::warn!("Skipping unreadable document {}: {}", path, e);
                    Warning::new(
                        WarningKind::UnreadableDocument,
                        path.as_str(),
                        format!("Could not read document: {}", e),
                    )
                })?;
                let frontmatter = self
                    .scanned
                    .structure
                    .metadata_for(path)
                    .cloned()
                    .unwrap_or_default();

                let content = transformer.transform(&body, &frontmatter, path, &context);
                Ok(self.render(exporter, content))
            })
            .collect()
    }

    fn render<E: FormatExporter>(
        &self,
        exporter: &E,
        mut content: TransformedContent,
    ) -> Rendered<E::Document> {
        let links = content.links.len();
        let broken = content.broken_links().count();
        let warnings = std::mem::take(&mut content.warnings);
        log::debug!(
            "Transformed {} ({} links, {} broken)",
            content.path,
            links,
            broken
        );
        Rendered {
            document: exporter.generate_document(&content, self.ids),
            warnings,
            links,
            broken,
        }
    }
}
