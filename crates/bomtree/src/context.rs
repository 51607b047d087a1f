use anyhow::{Context as _, Result, anyhow};
use bomtree_core::{BomNode, Project};
use bomtree_store::{BomService, Database, ProjectRepository};
use uuid::Uuid;

use crate::config::Config;

/// Database handle and settings shared by every command.
pub struct Context {
    pub db: Database,
    pub config: Config,
}

impl Context {
    pub fn open(config: Config) -> Result<Self> {
        let db = Database::open(&config.store).with_context(|| {
            format!("Failed to open database {}", config.store.path.display())
        })?;
        Ok(Self { db, config })
    }

    pub fn service(&self) -> BomService<'_> {
        BomService::new(&self.db)
    }

    pub fn projects(&self) -> ProjectRepository<'_> {
        ProjectRepository::new(&self.db)
    }

    /// Look a project up by id, then by exact name.
    pub fn project(&self, key: &str) -> Result<Project> {
        let projects = self.projects();
        if let Ok(id) = key.parse::<Uuid>()
            && let Some(project) = projects.find_by_id(id)?
        {
            return Ok(project);
        }
        let mut matches: Vec<Project> = projects
            .list()?
            .into_iter()
            .filter(|p| p.name == key)
            .collect();
        match matches.len() {
            0 => Err(anyhow!("No project named '{key}'")),
            1 => Ok(matches.remove(0)),
            n => Err(anyhow!("{n} projects are named '{key}'; use the project id")),
        }
    }

    pub fn item(&self, project: &Project, part_number: &str) -> Result<BomNode> {
        self.service()
            .find_by_part_number(project.id, part_number)?
            .ok_or_else(|| anyhow!("No item {part_number} in project {}", project.name))
    }
}
