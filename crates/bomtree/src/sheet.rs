use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, anyhow, bail};
use bomtree_sheet::{
    ColumnMapping, ExportOptions, Exporter, ImportOptions, ImportReport, Importer, Sheet,
    template_sheet,
};
use clap::{Args, ValueEnum};
use colored::Colorize;

use crate::OutputFormat;
use crate::context::Context;
use crate::report::FilterArgs;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Project id or name
    #[arg(short, long)]
    project: String,

    /// CSV file to import
    #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    file: PathBuf,

    /// JSON object mapping column headers to field names
    #[arg(long, value_name = "FILE")]
    mapping: Option<PathBuf>,

    /// Single mapping entry, e.g. --map "Codice=partNumber"
    #[arg(long = "map", value_name = "HEADER=FIELD")]
    map: Vec<String>,

    /// Check every row without creating anything
    #[arg(long)]
    validate_only: bool,

    /// Treat the first row as data as well
    #[arg(long)]
    include_header: bool,

    #[arg(short, long, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportKind {
    #[default]
    Bom,
    Kpi,
    Parts,
    Inventory,
}

impl std::fmt::Display for ExportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportKind::Bom => write!(f, "bom"),
            ExportKind::Kpi => write!(f, "kpi"),
            ExportKind::Parts => write!(f, "parts"),
            ExportKind::Inventory => write!(f, "inventory"),
        }
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Project id or name
    #[arg(short, long)]
    project: String,

    /// Output file (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    #[arg(short, long, default_value_t = ExportKind::Bom)]
    kind: ExportKind,

    /// Indent part numbers by level
    #[arg(long)]
    hierarchy: bool,

    /// Add one column per custom field
    #[arg(long)]
    custom_fields: bool,

    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Output file (stdout when omitted)
    #[arg(value_name = "FILE")]
    output: Option<PathBuf>,
}

fn load_mapping(file: Option<&Path>, entries: &[String]) -> Result<Option<ColumnMapping>> {
    let mut mapping = match file {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read mapping {}", path.display()))?;
            ColumnMapping::from_json(&json)
                .with_context(|| format!("Invalid mapping {}", path.display()))?
        }
        None if entries.is_empty() => return Ok(None),
        None => ColumnMapping::new(),
    };
    for entry in entries {
        let (header, target) = entry
            .split_once('=')
            .ok_or_else(|| anyhow!("Mapping entry '{entry}' is not HEADER=FIELD"))?;
        mapping.insert(header.trim(), target.trim());
    }
    Ok(Some(mapping))
}

fn write_sheet(sheet: &Sheet, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            sheet
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} {}", "Wrote".green(), path.display());
        }
        None => sheet.write_csv(io::stdout().lock())?,
    }
    Ok(())
}

pub fn execute_import(ctx: &Context, args: ImportArgs) -> Result<()> {
    let project = ctx.project(&args.project)?;
    let sheet = Sheet::open(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let options = ImportOptions {
        project_id: project.id,
        mapping: load_mapping(args.mapping.as_deref(), &args.map)?,
        skip_header_row: ctx.config.import.skip_header_row && !args.include_header,
        validate_only: args.validate_only,
    };
    let report = Importer::new(ctx.service()).import(&sheet, &options)?;

    match args.format {
        OutputFormat::Json => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        OutputFormat::Table => print_report(&report, args.validate_only)?,
    }

    if !report.success {
        bail!(
            "{} of {} rows failed",
            report.errors.len(),
            report.total_rows
        );
    }
    Ok(())
}

fn print_report(report: &ImportReport, validate_only: bool) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for error in &report.errors {
        let column = error
            .column
            .as_deref()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        writeln!(
            out,
            "{} {}{}: {} {}",
            format!("row {}", error.row).yellow(),
            error.kind.to_string().red(),
            column,
            error.message,
            format!("({})", error.data.join(", ")).dimmed()
        )?;
    }
    let verb = if validate_only { "valid" } else { "imported" };
    let summary = format!(
        "{}/{} rows {verb}",
        report.successful_rows, report.total_rows
    );
    if report.success {
        writeln!(out, "{}", summary.green())
    } else {
        writeln!(out, "{}", summary.yellow())
    }
}

pub fn execute_export(ctx: &Context, args: ExportArgs) -> Result<()> {
    let project = ctx.project(&args.project)?;
    let exporter = Exporter::new(ctx.service());

    let sheet = match args.kind {
        ExportKind::Bom => {
            let criteria = args.filters.criteria();
            let options = ExportOptions {
                include_hierarchy: args.hierarchy || ctx.config.export.include_hierarchy,
                include_custom_fields: args.custom_fields
                    || ctx.config.export.include_custom_fields,
                filters: (!criteria.is_empty()).then_some(criteria),
            };
            exporter.export_bom(project.id, &options)?
        }
        ExportKind::Kpi => exporter.export_kpi(project.id)?,
        ExportKind::Parts => exporter.export_part_summary(project.id)?,
        ExportKind::Inventory => exporter.export_inventory(project.id)?,
    };
    write_sheet(&sheet, args.output.as_deref())
}

pub fn execute_template(args: TemplateArgs) -> Result<()> {
    write_sheet(&template_sheet(), args.output.as_deref())
}
