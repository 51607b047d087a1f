use std::io::{self, Write};

use anyhow::Result;
use bomtree_core::{NewProject, ProjectPatch};
use clap::{Args, Subcommand};
use colored::Colorize;
use rust_decimal::Decimal;

use crate::OutputFormat;
use crate::context::Context;

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
enum ProjectCommand {
    /// Create a project and print its id
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        budget: Option<Decimal>,
    },

    /// List projects
    #[command(alias = "ls")]
    List {
        #[arg(short, long, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Change a project's name, description or budget
    Update {
        /// Project id or name
        project: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        budget: Option<Decimal>,
    },

    /// Delete a project that has no items
    Delete {
        /// Project id or name
        project: String,
    },
}

pub fn execute(ctx: &Context, args: ProjectArgs) -> Result<()> {
    let repo = ctx.projects();
    let mut out = io::stdout().lock();
    match args.command {
        ProjectCommand::Create {
            name,
            description,
            budget,
        } => {
            let project = repo.create(&NewProject {
                name,
                description,
                budget,
            })?;
            writeln!(out, "{}", project.id)?;
        }
        ProjectCommand::List { format } => {
            let projects = repo.list()?;
            match format {
                OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&projects)?)?,
                OutputFormat::Table => {
                    for p in &projects {
                        let items = ctx.service().repository().count_by_project(p.id)?;
                        writeln!(
                            out,
                            "{}  {}  {}",
                            p.id.to_string().dimmed(),
                            p.name.bold(),
                            format!("{items} items").cyan()
                        )?;
                    }
                }
            }
        }
        ProjectCommand::Update {
            project,
            name,
            description,
            budget,
        } => {
            let project = ctx.project(&project)?;
            let updated = repo.update(
                project.id,
                &ProjectPatch {
                    name,
                    description,
                    budget,
                },
            )?;
            writeln!(out, "{} {}", "Updated".green(), updated.name)?;
        }
        ProjectCommand::Delete { project } => {
            let project = ctx.project(&project)?;
            repo.delete(project.id)?;
            writeln!(out, "{} {}", "Deleted".green(), project.name)?;
        }
    }
    Ok(())
}
