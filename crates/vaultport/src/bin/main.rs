//! vaultport CLI

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vaultport::{
    ExportFormat, ExportPipeline, ExportReport, ReportExporter, Settings, WarningKind,
};

/// Warnings listed in the printed summary
const SUMMARY_WARNINGS: usize = 10;

/// vaultport - convert Obsidian vaults into import packages
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a vault into an import package
    Convert(ConvertArgs),
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Path to the Obsidian vault directory
    #[arg(env = "VAULTPORT_VAULT")]
    vault: String,

    /// Output ZIP path (default: <vault name>_<format>.zip next to the vault)
    #[arg(short, long)]
    output: Option<String>,

    /// Package name (default: vault directory name)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Target format (appflowy, notion, outline)
    #[arg(short, long, value_parser = parse_format)]
    format: Option<ExportFormat>,

    /// Check links and assets without writing a package
    #[arg(long, action = clap::ArgAction::SetTrue)]
    validate_only: bool,

    /// Fall back to similarity matching for unresolved links
    #[arg(long, action = clap::ArgAction::SetTrue)]
    fuzzy: bool,

    /// Similarity threshold in (0, 1] (implies --fuzzy)
    #[arg(long)]
    fuzzy_threshold: Option<f64>,

    /// Drop frontmatter properties from generated documents
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_frontmatter: bool,

    /// Additional directory names to skip
    #[arg(long = "exclude", value_name = "DIR")]
    exclude: Vec<String>,

    /// Emit a machine-readable report
    #[arg(long, value_enum)]
    report: Option<ReportFormat>,

    /// Write the report to a file instead of stdout
    #[arg(long, requires = "report")]
    report_file: Option<String>,

    /// Settings file (YAML, TOML or JSON)
    #[arg(long)]
    config: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ReportFormat {
    Json,
    Csv,
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse::<ExportFormat>().map_err(|e| e.to_string())
}

/// Expand `~` and `$VAR` in a user-supplied path.
fn expand_path(raw: &str) -> anyhow::Result<PathBuf> {
    let expanded =
        shellexpand::full(raw).with_context(|| format!("Failed to expand path '{}'", raw))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

fn init_logging(verbose: bool, format: LogFormat) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    match format {
        LogFormat::Text => env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(level),
        )
        .format_timestamp(None)
        .try_init()
        .context("Failed to initialize logger"),
        LogFormat::Json => {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize logger: {}", e))
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format)?;

    log::info!("vaultport v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Convert(args) => convert(args),
    }
}

fn convert(args: ConvertArgs) -> anyhow::Result<()> {
    let vault = expand_path(&args.vault)?;
    let config_file = args.config.as_deref().map(expand_path).transpose()?;

    let mut settings =
        Settings::load(config_file.as_deref()).context("Failed to load settings")?;
    if let Some(output) = &args.output {
        settings.output_path = Some(expand_path(output)?);
    }
    if let Some(name) = args.name {
        settings.package_name = Some(name);
    }
    if let Some(format) = args.format {
        settings.format = Some(format.as_str().to_string());
    }
    if args.validate_only {
        settings.validate_only = Some(true);
    }
    if args.fuzzy {
        settings.fuzzy_matching = Some(true);
    }
    if let Some(threshold) = args.fuzzy_threshold {
        settings.fuzzy_threshold = Some(threshold);
    }
    if args.no_frontmatter {
        settings.include_frontmatter = Some(false);
    }
    if !args.exclude.is_empty() {
        settings
            .excluded_dirs
            .get_or_insert_with(Vec::new)
            .extend(args.exclude);
    }

    let config = settings
        .into_config(&vault)
        .with_context(|| format!("Invalid configuration for {}", vault.display()))?;
    log::info!(
        "Converting {} to {} ({})",
        vault.display(),
        config.format.display_name(),
        if config.validate_only {
            "validate only".to_string()
        } else {
            config.output_path().display().to_string()
        }
    );

    let report = ExportPipeline::new(config)
        .run()
        .with_context(|| format!("Export of {} failed", vault.display()))?;

    match args.report {
        Some(format) => {
            let rendered = match format {
                ReportFormat::Json => ReportExporter::to_json(&report)?,
                ReportFormat::Csv => ReportExporter::to_csv(&report)?,
            };
            match &args.report_file {
                Some(path) => {
                    let path = expand_path(path)?;
                    fs::write(&path, rendered)
                        .with_context(|| format!("Failed to write report {}", path.display()))?;
                    print_summary(&report);
                }
                None => println!("{}", rendered),
            }
        }
        None => print_summary(&report),
    }

    Ok(())
}

fn print_summary(report: &ExportReport) {
    println!("{} export of '{}'", report.format.display_name(), report.vault_name);
    match &report.package_path {
        Some(path) => println!("  Package:    {}", path),
        None => println!("  Package:    (validate only, nothing written)"),
    }
    println!(
        "  Documents:  {}/{}",
        report.exported_documents, report.total_documents
    );
    println!(
        "  Assets:     {}/{}",
        report.packaged_assets, report.total_assets
    );
    println!(
        "  Links:      {} ({} broken, {:.1}% healthy)",
        report.total_links,
        report.broken_links,
        report.link_health() * 100.0
    );
    println!("  Duration:   {}ms", report.duration_ms);

    if !report.has_warnings() {
        println!("No warnings.");
        return;
    }

    println!("\nWarnings: {}", report.warnings.len());
    for (kind, count) in report.warning_counts() {
        println!("  {:<22} {}", kind.as_str(), count);
    }
    for warning in report.warnings.iter().take(SUMMARY_WARNINGS) {
        println!("  - {}", warning);
    }
    if report.warnings.len() > SUMMARY_WARNINGS {
        println!("  ... and {} more", report.warnings.len() - SUMMARY_WARNINGS);
    }

    let skipped = report.skipped_documents();
    if !skipped.is_empty() {
        println!("\nSkipped documents: {}", skipped.join(", "));
    }
    let callouts = report.unknown_callout_types();
    if !callouts.is_empty() {
        let names: Vec<&str> = callouts.into_iter().collect();
        println!("\nUnknown callout types: {}", names.join(", "));
    }

    let broken: Vec<_> = report.warnings_of(WarningKind::BrokenLink).collect();
    if !broken.is_empty() {
        println!("\nBroken links:");
        for warning in broken {
            println!(
                "  {} -> {}",
                warning.document,
                warning.raw.as_deref().unwrap_or("?")
            );
        }
    }
}
