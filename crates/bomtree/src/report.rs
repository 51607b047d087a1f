use std::io::{self, Write};

use anyhow::Result;
use bomtree_core::{FilterCriteria, ItemType, ProcurementStatus};
use bomtree_sheet::table;
use chrono::NaiveDate;
use clap::Args;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::OutputFormat;
use crate::context::Context;

#[derive(Args, Debug)]
pub struct ProjectReportArgs {
    /// Project id or name
    #[arg(short, long)]
    project: String,

    #[arg(short, long, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct TreeArgs {
    #[command(flatten)]
    report: ProjectReportArgs,

    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only items of this type
    #[arg(short = 't', long = "type")]
    item_type: Option<ItemType>,
    /// Only items with this procurement status
    #[arg(long)]
    status: Option<ProcurementStatus>,
    #[arg(long)]
    obsolete: Option<bool>,
    /// Part number contains (case-insensitive)
    #[arg(long)]
    search: Option<String>,
    /// Description contains (case-insensitive)
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    min_cost: Option<Decimal>,
    #[arg(long)]
    max_cost: Option<Decimal>,
    #[arg(long)]
    rfq: Option<String>,
    #[arg(long)]
    delivery_from: Option<NaiveDate>,
    #[arg(long)]
    delivery_to: Option<NaiveDate>,
}

impl FilterArgs {
    pub fn criteria(self) -> FilterCriteria {
        FilterCriteria {
            item_type: self.item_type,
            procurement_status: self.status,
            obsolete: self.obsolete,
            part_number: self.search,
            description: self.description,
            min_cost: self.min_cost,
            max_cost: self.max_cost,
            rfq_status: self.rfq,
            expected_delivery_from: self.delivery_from,
            expected_delivery_to: self.delivery_to,
        }
    }
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    report: ProjectReportArgs,

    /// Also list every part number with its totals
    #[arg(long)]
    parts: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub fn execute_tree(ctx: &Context, args: TreeArgs) -> Result<()> {
    let project = ctx.project(&args.report.project)?;
    let criteria = args.filters.criteria();
    let service = ctx.service();
    let forest = if criteria.is_empty() {
        service.get_bom_tree(project.id)?
    } else {
        service.get_bom_with_filters(project.id, &criteria)?
    };

    match args.report.format {
        OutputFormat::Json => print_json(&forest),
        OutputFormat::Table => {
            if forest.is_empty() {
                println!("{}", "No items".dimmed());
                return Ok(());
            }
            table::write_tree(&forest, io::stdout().lock())?;
            Ok(())
        }
    }
}

pub fn execute_quantities(ctx: &Context, args: ProjectReportArgs) -> Result<()> {
    let project = ctx.project(&args.project)?;
    let totals = ctx.service().recalculate_quantities(project.id)?;
    match args.format {
        OutputFormat::Json => print_json(&totals),
        OutputFormat::Table => {
            let width = totals.keys().map(|k| k.len()).max().unwrap_or(0);
            let mut out = io::stdout().lock();
            for (part_number, quantity) in &totals {
                writeln!(out, "{part_number:<width$}  {quantity}")?;
            }
            Ok(())
        }
    }
}

pub fn execute_duplicates(ctx: &Context, args: ProjectReportArgs) -> Result<()> {
    let project = ctx.project(&args.project)?;
    let duplicates = ctx.service().duplicate_part_numbers(project.id)?;
    match args.format {
        OutputFormat::Json => print_json(&duplicates),
        OutputFormat::Table => {
            if duplicates.is_empty() {
                println!("{}", "No duplicate part numbers".green());
            }
            for part_number in &duplicates {
                println!("{}", part_number.yellow());
            }
            Ok(())
        }
    }
}

pub fn execute_inventory(ctx: &Context, args: ProjectReportArgs) -> Result<()> {
    let project = ctx.project(&args.project)?;
    let lines = ctx.service().inventory(project.id)?;
    match args.format {
        OutputFormat::Json => print_json(&lines),
        OutputFormat::Table => {
            table::write_inventory(&lines, io::stdout().lock())?;
            Ok(())
        }
    }
}

pub fn execute_summary(ctx: &Context, args: SummaryArgs) -> Result<()> {
    let project = ctx.project(&args.report.project)?;
    let service = ctx.service();
    let kpi = service.kpi_summary(project.id)?;
    let parts = if args.parts {
        Some(service.part_summary(project.id)?)
    } else {
        None
    };

    match args.report.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "kpi": kpi, "parts": parts })),
        OutputFormat::Table => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", project.name.bold())?;
            table::write_kpi(&kpi, &mut out)?;
            if let Some(parts) = &parts {
                table::write_part_summary(parts, &mut out)?;
            }
            Ok(())
        }
    }
}
