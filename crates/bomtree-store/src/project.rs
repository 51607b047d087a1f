use bomtree_core::{BomError, NewProject, Project, ProjectPatch};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::repository::count_project_items;
use crate::row::{encode_timestamp, opt_text, project_from_row, text};

#[derive(Clone, Copy)]
pub struct ProjectRepository<'db> {
    db: &'db Database,
}

impl<'db> ProjectRepository<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn create(&self, dto: &NewProject) -> Result<Project> {
        let name = dto.name.trim();
        if name.is_empty() {
            return Err(BomError::MissingRequiredField("name").into());
        }
        self.db.write(|tx| {
            let id = Uuid::new_v4();
            let now = encode_timestamp(&Utc::now());
            tx.execute(
                "INSERT INTO projects (id, name, description, budget, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params_from_iter([
                    text(id),
                    text(name),
                    opt_text(dto.description.as_ref()),
                    opt_text(dto.budget),
                    text(now),
                ]),
            )?;
            log::info!("Created project {name} ({id})");
            fetch_project(tx, id)?.ok_or_else(|| BomError::ProjectNotFound(id).into())
        })
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        self.db.read(|c| fetch_project(c, id))
    }

    pub fn list(&self) -> Result<Vec<Project>> {
        self.db.read(|c| {
            let mut stmt = c.prepare("SELECT * FROM projects ORDER BY created_at, name")?;
            let rows = stmt.query_map([], project_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    pub fn update(&self, id: Uuid, patch: &ProjectPatch) -> Result<Project> {
        self.db.write(|tx| {
            if fetch_project(tx, id)?.is_none() {
                return Err(BomError::ProjectNotFound(id).into());
            }
            let mut set: Vec<(&str, Value)> = Vec::new();
            if let Some(name) = &patch.name {
                if name.trim().is_empty() {
                    return Err(BomError::MissingRequiredField("name").into());
                }
                set.push(("name", text(name.trim())));
            }
            if let Some(description) = &patch.description {
                set.push(("description", text(description)));
            }
            if let Some(budget) = patch.budget {
                set.push(("budget", text(budget)));
            }
            set.push(("updated_at", text(encode_timestamp(&Utc::now()))));

            let assignments: Vec<String> = set
                .iter()
                .enumerate()
                .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
                .collect();
            let sql = format!(
                "UPDATE projects SET {} WHERE id = ?{}",
                assignments.join(", "),
                set.len() + 1
            );
            let values = set.into_iter().map(|(_, v)| v).chain([text(id)]);
            tx.execute(&sql, params_from_iter(values))?;
            fetch_project(tx, id)?.ok_or_else(|| BomError::ProjectNotFound(id).into())
        })
    }

    /// Delete an empty project. Items must be removed first.
    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.db.write(|tx| {
            if fetch_project(tx, id)?.is_none() {
                return Err(BomError::ProjectNotFound(id).into());
            }
            let items = count_project_items(tx, id)?;
            if items > 0 {
                return Err(BomError::ProjectNotEmpty {
                    project_id: id,
                    items,
                }
                .into());
            }
            tx.execute(
                "DELETE FROM path_counters WHERE project_id = ?1",
                [id.to_string()],
            )?;
            tx.execute("DELETE FROM projects WHERE id = ?1", [id.to_string()])?;
            log::info!("Deleted project {id}");
            Ok(())
        })
    }
}

pub(crate) fn fetch_project(conn: &Connection, id: Uuid) -> Result<Option<Project>> {
    Ok(conn
        .query_row(
            "SELECT * FROM projects WHERE id = ?1",
            [id.to_string()],
            project_from_row,
        )
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use bomtree_core::ErrorKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_project_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let repo = ProjectRepository::new(&db);

        let project = repo
            .create(&NewProject {
                name: "  Rover  ".into(),
                description: Some("Mk II chassis".into()),
                budget: Some(dec!(25000)),
            })
            .unwrap();
        assert_eq!(project.name, "Rover");
        assert_eq!(project.budget, Some(dec!(25000)));

        let updated = repo
            .update(
                project.id,
                &ProjectPatch {
                    name: Some("Rover Mk II".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Rover Mk II");
        assert_eq!(updated.description.as_deref(), Some("Mk II chassis"));
        assert!(updated.updated_at >= project.updated_at);

        assert_eq!(repo.list().unwrap().len(), 1);
        repo.delete(project.id).unwrap();
        assert!(repo.find_by_id(project.id).unwrap().is_none());
    }

    #[test]
    fn test_blank_name_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = ProjectRepository::new(&db)
            .create(&NewProject {
                name: "   ".into(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredField);
    }

    #[test]
    fn test_missing_project() {
        let db = Database::open_in_memory().unwrap();
        let repo = ProjectRepository::new(&db);
        let err = repo.delete(Uuid::new_v4()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Bom(BomError::ProjectNotFound(_))
        ));
    }
}
