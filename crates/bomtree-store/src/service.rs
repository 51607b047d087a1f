use std::collections::BTreeMap;

use bomtree_core::hierarchy::{validate_child, validate_type_change};
use bomtree_core::{
    BomError, BomNode, BomNodePatch, CustomValue, FilterCriteria, InventoryLine, KpiSummary,
    NewBomNode, PartSummary, TreeNode, build_hierarchical_tree, inventory_report, part_summary,
};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::project::fetch_project;
use crate::repository::{
    BomRepository, apply_patch, fetch_by_part_number, fetch_children, fetch_node, insert,
    part_number_taken,
};

/// Integrity layer over [`BomRepository`].
///
/// Enforces part-number uniqueness, same-project parents and the item-type
/// hierarchy, and assembles tree views from flat storage. Each mutation
/// validates and writes inside one transaction.
#[derive(Clone, Copy)]
pub struct BomService<'db> {
    db: &'db Database,
    repo: BomRepository<'db>,
}

impl<'db> BomService<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            repo: BomRepository::new(db),
        }
    }

    pub fn repository(&self) -> BomRepository<'db> {
        self.repo
    }

    pub fn create_item(&self, dto: &NewBomNode) -> Result<BomNode> {
        let node = self.db.write(|tx| {
            check_new_item(tx, dto)?;
            insert(tx, dto)
        })?;
        log::info!(
            "Created {} {} at {} in project {}",
            node.item_type,
            node.part_number,
            node.path,
            node.project_id
        );
        Ok(node)
    }

    /// Run every creation check without writing anything.
    ///
    /// Returns the resolved parent, if any.
    pub fn validate_new_item(&self, dto: &NewBomNode) -> Result<Option<BomNode>> {
        self.db.read(|c| check_new_item(c, dto))
    }

    pub fn update_item(&self, id: Uuid, patch: &BomNodePatch) -> Result<BomNode> {
        let node = self.db.write(|tx| {
            let current = fetch_node(tx, id)?.ok_or(BomError::NotFound(id))?;

            if let Some(quantity) = patch.quantity {
                check_quantity(quantity)?;
            }

            if let Some(part_number) = &patch.part_number
                && *part_number != current.part_number
            {
                check_part_number(tx, current.project_id, part_number, Some(id))?;
            }

            if let Some(proposed) = patch.item_type
                && proposed != current.item_type
            {
                let children = fetch_children(tx, id)?;
                let parent = match current.parent_id {
                    Some(pid) => fetch_node(tx, pid)?,
                    None => None,
                };
                validate_type_change(&current, proposed, &children, parent.as_ref())?;
            }

            apply_patch(tx, id, patch)
        })?;
        log::info!("Updated {} ({})", node.part_number, node.id);
        Ok(node)
    }

    pub fn delete_item(&self, id: Uuid) -> Result<()> {
        let node = self.get_item(id)?;
        self.repo.delete(id)?;
        log::info!("Deleted {} ({})", node.part_number, id);
        Ok(())
    }

    pub fn get_item(&self, id: Uuid) -> Result<BomNode> {
        Ok(self.repo.find_by_id(id)?.ok_or(BomError::NotFound(id))?)
    }

    pub fn find_by_part_number(&self, project_id: Uuid, part_number: &str) -> Result<Option<BomNode>> {
        self.repo.find_by_part_number(project_id, part_number)
    }

    /// Resolve a parent referenced by part number, as spreadsheets do.
    pub fn resolve_parent(&self, project_id: Uuid, part_number: &str) -> Result<BomNode> {
        self.db.read(|c| {
            fetch_by_part_number(c, project_id, part_number)?
                .ok_or_else(|| BomError::ParentNotFound(part_number.to_string()).into())
        })
    }

    pub fn is_part_number_available(
        &self,
        project_id: Uuid,
        part_number: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        self.db
            .read(|c| Ok(!part_number_taken(c, project_id, part_number, exclude)?))
    }

    pub fn get_flat_bom(&self, project_id: Uuid) -> Result<Vec<BomNode>> {
        self.repo.find_by_project(project_id)
    }

    /// The project's rooted forest.
    pub fn get_bom_tree(&self, project_id: Uuid) -> Result<Vec<TreeNode>> {
        let flat = self.repo.find_by_project(project_id)?;
        Ok(build_hierarchical_tree(&flat))
    }

    /// Matching items, flat and in path order.
    pub fn find_with_filters(
        &self,
        project_id: Uuid,
        criteria: &FilterCriteria,
    ) -> Result<Vec<BomNode>> {
        self.repo.find_with_filters(project_id, criteria)
    }

    /// Forest over the matching items only; a match whose parent is filtered
    /// out appears as a root.
    pub fn get_bom_with_filters(
        &self,
        project_id: Uuid,
        criteria: &FilterCriteria,
    ) -> Result<Vec<TreeNode>> {
        let flat = self.repo.find_with_filters(project_id, criteria)?;
        Ok(build_hierarchical_tree(&flat))
    }

    /// Full tree walk; effective quantity per part number.
    pub fn recalculate_quantities(&self, project_id: Uuid) -> Result<BTreeMap<String, u64>> {
        self.repo.calculate_total_quantities(project_id)
    }

    pub fn duplicate_part_numbers(&self, project_id: Uuid) -> Result<Vec<String>> {
        self.repo.find_duplicate_part_numbers(project_id)
    }

    pub fn inventory(&self, project_id: Uuid) -> Result<Vec<InventoryLine>> {
        Ok(inventory_report(&self.repo.find_by_project(project_id)?))
    }

    pub fn part_summary(&self, project_id: Uuid) -> Result<Vec<PartSummary>> {
        Ok(part_summary(&self.repo.find_by_project(project_id)?))
    }

    pub fn kpi_summary(&self, project_id: Uuid) -> Result<KpiSummary> {
        Ok(KpiSummary::from_nodes(&self.repo.find_by_project(project_id)?))
    }

    pub fn set_custom_field(&self, id: Uuid, name: &str, value: &CustomValue) -> Result<()> {
        if name.trim().is_empty() {
            return Err(BomError::MissingRequiredField("fieldName").into());
        }
        self.repo.set_custom_field(id, name.trim(), value)
    }

    pub fn remove_custom_field(&self, id: Uuid, name: &str) -> Result<bool> {
        self.repo.remove_custom_field(id, name)
    }
}

fn check_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 {
        return Err(BomError::InvalidQuantity(0).into());
    }
    Ok(())
}

fn check_part_number(
    conn: &Connection,
    project_id: Uuid,
    part_number: &str,
    exclude: Option<Uuid>,
) -> Result<()> {
    if part_number.trim().is_empty() {
        return Err(BomError::MissingRequiredField("partNumber").into());
    }
    if part_number_taken(conn, project_id, part_number, exclude)? {
        return Err(BomError::DuplicatePartNumber {
            project_id,
            part_number: part_number.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Creation checks in order: project, quantity, part number, parent, hierarchy.
fn check_new_item(conn: &Connection, dto: &NewBomNode) -> Result<Option<BomNode>> {
    if fetch_project(conn, dto.project_id)?.is_none() {
        return Err(BomError::ProjectNotFound(dto.project_id).into());
    }
    check_quantity(dto.quantity)?;
    check_part_number(conn, dto.project_id, &dto.part_number, None)?;

    let Some(parent_id) = dto.parent_id else {
        return Ok(None);
    };
    let parent = fetch_node(conn, parent_id)?
        .ok_or_else(|| BomError::ParentNotFound(parent_id.to_string()))?;
    if parent.project_id != dto.project_id {
        return Err(BomError::CrossProjectParent {
            parent_id,
            parent_project: parent.project_id,
            project_id: dto.project_id,
        }
        .into());
    }
    validate_child(parent.item_type, dto.item_type)?;
    Ok(Some(parent))
}
