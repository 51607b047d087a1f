use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use env_logger::Env;

mod config;
mod context;
mod item;
mod project;
mod report;
mod sheet;

#[derive(Parser)]
#[command(name = "bomtree")]
#[command(about = "Hierarchical bill of materials manager", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    /// SQLite database file (overrides config and BOMTREE_DB)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Configuration file (defaults to ./bomtree.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, list and delete projects
    #[command(alias = "p")]
    Project(project::ProjectArgs),

    /// Add an item to a project
    #[command(alias = "a")]
    Add(item::AddArgs),

    /// Change fields of an existing item
    Update(item::UpdateArgs),

    /// Delete an item without children
    #[command(alias = "rm")]
    Delete(item::DeleteArgs),

    /// Set or remove custom fields on an item
    Field(item::FieldArgs),

    /// Show the BOM tree, optionally filtered
    #[command(alias = "t")]
    Tree(report::TreeArgs),

    /// Effective quantities per part number
    Quantities(report::ProjectReportArgs),

    /// Part numbers occurring more than once in a project
    Duplicates(report::ProjectReportArgs),

    /// Stock position of every part
    Inventory(report::ProjectReportArgs),

    /// KPI and part summary
    Summary(report::SummaryArgs),

    /// Import items from a CSV sheet
    #[command(alias = "i")]
    Import(sheet::ImportArgs),

    /// Export the BOM or a report to CSV
    #[command(alias = "e")]
    Export(sheet::ExportArgs),

    /// Write an import template
    Template(sheet::TemplateArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // default level depends on --debug, RUST_LOG overrides both
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    let command = match cli.command {
        Commands::Template(args) => return sheet::execute_template(args),
        command => command,
    };

    let config = config::Config::load(cli.config.as_deref(), cli.db.as_deref())?;
    let ctx = context::Context::open(config)?;

    match command {
        Commands::Project(args) => project::execute(&ctx, args),
        Commands::Add(args) => item::execute_add(&ctx, args),
        Commands::Update(args) => item::execute_update(&ctx, args),
        Commands::Delete(args) => item::execute_delete(&ctx, args),
        Commands::Field(args) => item::execute_field(&ctx, args),
        Commands::Tree(args) => report::execute_tree(&ctx, args),
        Commands::Quantities(args) => report::execute_quantities(&ctx, args),
        Commands::Duplicates(args) => report::execute_duplicates(&ctx, args),
        Commands::Inventory(args) => report::execute_inventory(&ctx, args),
        Commands::Summary(args) => report::execute_summary(&ctx, args),
        Commands::Import(args) => sheet::execute_import(&ctx, args),
        Commands::Export(args) => sheet::execute_export(&ctx, args),
        Commands::Template(args) => sheet::execute_template(args),
    }
}
