//! Run reports, exportable as JSON or CSV.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use vaultport_core::{CSVBuilder, ExportFormat, Result, Warning, WarningKind, to_json_string};

/// Outcome of one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub timestamp: DateTime<Utc>,
    pub vault_name: String,
    pub format: ExportFormat,
    /// Written package; `None` for validate-only runs
    pub package_path: Option<String>,
    pub validate_only: bool,
    pub total_documents: usize,
    pub exported_documents: usize,
    pub total_assets: usize,
    pub packaged_assets: usize,
    pub total_links: usize,
    pub broken_links: usize,
    pub duration_ms: u128,
    pub warnings: Vec<Warning>,
}

impl ExportReport {
    pub fn new(vault_name: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            timestamp: Utc::now(),
            vault_name: vault_name.into(),
            format,
            package_path: None,
            validate_only: false,
            total_documents: 0,
            exported_documents: 0,
            total_assets: 0,
            packaged_assets: 0,
            total_links: 0,
            broken_links: 0,
            duration_ms: 0,
            warnings: Vec::new(),
        }
    }

    /// Warning totals per kind, in kind order.
    pub fn warning_counts(&self) -> BTreeMap<WarningKind, usize> {
        let mut counts = BTreeMap::new();
        for warning in &self.warnings {
            *counts.entry(warning.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn warnings_of(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }

    /// Distinct callout identifiers that fell back to a plain quote.
    pub fn unknown_callout_types(&self) -> BTreeSet<&str> {
        self.warnings_of(WarningKind::UnknownCallout)
            .filter_map(|w| w.raw.as_deref())
            .collect()
    }

    /// Documents left out of the package because they could not be read.
    pub fn skipped_documents(&self) -> Vec<&str> {
        self.warnings_of(WarningKind::UnreadableDocument)
            .map(|w| w.document.as_str())
            .collect()
    }

    /// `(document, asset)` pairs for embeds whose asset was not found or not copied.
    pub fn missing_assets(&self) -> Vec<(&str, &str)> {
        self.warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::MissingAsset | WarningKind::AssetCopyFailed))
            .map(|w| (w.document.as_str(), w.raw.as_deref().unwrap_or("")))
            .collect()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Share of links that resolved, in `[0, 1]`.
    pub fn link_health(&self) -> f64 {
        if self.total_links == 0 {
            1.0
        } else {
            (self.total_links - self.broken_links.min(self.total_links)) as f64
                / self.total_links as f64
        }
    }
}

/// Report exporter
pub struct ReportExporter;

impl ReportExporter {
    /// Export the full report as JSON
    pub fn to_json(report: &ExportReport) -> Result<String> {
        to_json_string(report, "export report")
    }

    /// Export the warnings as CSV, one row per warning
    pub fn to_csv(report: &ExportReport) -> Result<String> {
        let builder = CSVBuilder::new(vec!["kind", "document", "line", "target", "message"]);
        let csv = report.warnings.iter().fold(builder, |csv, w| {
            csv.add_row_owned(vec![
                w.kind.as_str().to_string(),
                w.document.clone(),
                w.line.map(|l| l.to_string()).unwrap_or_default(),
                w.raw.clone().unwrap_or_default(),
                w.message.clone(),
            ])
        });
        Ok(csv.build())
    }

    /// Export the headline numbers as a single-row CSV
    pub fn summary_csv(report: &ExportReport) -> Result<String> {
        let csv = CSVBuilder::new(vec![
            "timestamp",
            "vault_name",
            "format",
            "documents",
            "assets",
            "links",
            "broken_links",
            "warnings",
        ])
        .add_row_owned(vec![
            report.timestamp.to_rfc3339(),
            report.vault_name.clone(),
            report.format.to_string(),
            report.exported_documents.to_string(),
            report.packaged_assets.to_string(),
            report.total_links.to_string(),
            report.broken_links.to_string(),
            report.warnings.len().to_string(),
        ]);
        Ok(csv.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ExportReport {
        let mut report = ExportReport::new("test", ExportFormat::Notion);
        report.total_links = 4;
        report.broken_links = 1;
        report.warnings = vec![
            Warning::new(WarningKind::BrokenLink, "a.md", "Broken wikilink 'x, y'")
                .with_raw("x, y")
                .at_line(3),
            Warning::new(WarningKind::UnknownCallout, "b.md", "Unknown callout").with_raw("recipe"),
            Warning::new(WarningKind::BrokenLink, "c.md", "Broken"),
        ];
        report
    }

    #[test]
    fn test_counts_and_health() {
        let report = report();
        let counts = report.warning_counts();
        assert_eq!(counts[&WarningKind::BrokenLink], 2);
        assert_eq!(counts[&WarningKind::UnknownCallout], 1);
        assert_eq!(report.warnings_of(WarningKind::BrokenLink).count(), 2);
        assert!((report.link_health() - 0.75).abs() < f64::EPSILON);
        assert!((ExportReport::new("x", ExportFormat::AppFlowy).link_health() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_views_by_kind() {
        let mut report = report();
        report.warnings.push(
            Warning::new(WarningKind::UnknownCallout, "d.md", "Unknown callout").with_raw("recipe"),
        );
        report.warnings.push(
            Warning::new(WarningKind::AssetCopyFailed, "d.md", "Asset not copied").with_raw("pic.png"),
        );
        report
            .warnings
            .push(Warning::new(WarningKind::UnreadableDocument, "e.md", "Could not read"));

        assert_eq!(report.unknown_callout_types().into_iter().collect::<Vec<_>>(), vec!["recipe"]);
        assert_eq!(report.missing_assets(), vec![("d.md", "pic.png")]);
        assert_eq!(report.skipped_documents(), vec!["e.md"]);
    }

    #[test]
    fn test_json_export() {
        let json = ReportExporter::to_json(&report()).unwrap();
        assert!(json.contains("\"vault_name\": \"test\""));
        assert!(json.contains("\"format\": \"notion\""));
    }

    #[test]
    fn test_csv_export() {
        let csv = ReportExporter::to_csv(&report()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "kind,document,line,target,message");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains(",a.md,3,\"x, y\","));

        let summary = ReportExporter::summary_csv(&report()).unwrap();
        assert_eq!(summary.lines().count(), 2);
        assert!(summary.contains(",test,notion,"));
    }
}
