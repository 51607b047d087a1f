use std::collections::{BTreeMap, BTreeSet, HashMap};

use bomtree_core::path::{allocate, next_ordinal};
use bomtree_core::{
    BomError, BomNode, BomNodePatch, CustomValue, FilterCriteria, MaterializedPath, NewBomNode,
    total_quantities,
};
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;
use crate::row::{
    custom_field_from_row, encode_timestamp, flag, int, node_from_row, opt_date, opt_int,
    opt_text, text,
};

/// Durable CRUD and aggregate queries over BOM items.
///
/// Every method checks out its own connection; mutations run in a single
/// `IMMEDIATE` transaction.
#[derive(Clone, Copy)]
pub struct BomRepository<'db> {
    db: &'db Database,
}

impl<'db> BomRepository<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// All items of a project in pre-order (numeric path order).
    pub fn find_by_project(&self, project_id: Uuid) -> Result<Vec<BomNode>> {
        self.db.read(|c| fetch_project_nodes(c, project_id))
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<BomNode>> {
        self.db.read(|c| fetch_node(c, id))
    }

    pub fn find_by_part_number(
        &self,
        project_id: Uuid,
        part_number: &str,
    ) -> Result<Option<BomNode>> {
        self.db
            .read(|c| fetch_by_part_number(c, project_id, part_number))
    }

    pub fn find_children(&self, id: Uuid) -> Result<Vec<BomNode>> {
        self.db.read(|c| fetch_children(c, id))
    }

    pub fn find_with_filters(
        &self,
        project_id: Uuid,
        criteria: &FilterCriteria,
    ) -> Result<Vec<BomNode>> {
        self.db.read(|c| {
            let mut clauses = vec!["project_id = ?1".to_string()];
            let mut values = vec![text(project_id)];
            if let Some(t) = criteria.item_type {
                values.push(text(t));
                clauses.push(format!("item_type = ?{}", values.len()));
            }
            if let Some(s) = criteria.procurement_status {
                values.push(text(s));
                clauses.push(format!("procurement_status = ?{}", values.len()));
            }
            if let Some(o) = criteria.obsolete {
                values.push(flag(o));
                clauses.push(format!("obsolete = ?{}", values.len()));
            }

            let mut nodes = fetch_where(c, &clauses.join(" AND "), values)?;
            // substring, cost and date criteria are evaluated on decoded values
            nodes.retain(|n| criteria.matches(n));
            Ok(nodes)
        })
    }

    /// Allocate a path and persist the item atomically.
    pub fn create(&self, dto: &NewBomNode) -> Result<BomNode> {
        self.db.write(|tx| insert(tx, dto))
    }

    pub fn update(&self, id: Uuid, patch: &BomNodePatch) -> Result<BomNode> {
        self.db.write(|tx| apply_patch(tx, id, patch))
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.db.write(|tx| remove(tx, id))
    }

    pub fn count_by_project(&self, project_id: Uuid) -> Result<usize> {
        self.db.read(|c| count_project_items(c, project_id))
    }

    /// Part numbers used by two or more items of the project.
    pub fn find_duplicate_part_numbers(&self, project_id: Uuid) -> Result<Vec<String>> {
        self.db.read(|c| {
            let mut stmt = c.prepare(
                "SELECT part_number FROM bom_items WHERE project_id = ?1
                 GROUP BY part_number HAVING COUNT(*) > 1 ORDER BY part_number",
            )?;
            let rows = stmt.query_map([project_id.to_string()], |r| r.get(0))?;
            Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
        })
    }

    /// Effective quantity per part number over the whole project tree.
    pub fn calculate_total_quantities(&self, project_id: Uuid) -> Result<BTreeMap<String, u64>> {
        let nodes = self.find_by_project(project_id)?;
        Ok(total_quantities(&nodes))
    }

    pub fn set_custom_field(&self, id: Uuid, name: &str, value: &CustomValue) -> Result<()> {
        self.db.write(|tx| {
            if !item_exists(tx, id)? {
                return Err(BomError::NotFound(id).into());
            }
            upsert_custom_field(tx, id, name, value)?;
            touch(tx, id)
        })
    }

    /// Returns whether a field was removed.
    pub fn remove_custom_field(&self, id: Uuid, name: &str) -> Result<bool> {
        self.db.write(|tx| {
            let removed = tx.execute(
                "DELETE FROM custom_fields WHERE bom_item_id = ?1 AND field_name = ?2",
                params![id.to_string(), name],
            )?;
            if removed > 0 {
                touch(tx, id)?;
            }
            Ok(removed > 0)
        })
    }
}

fn sort_by_path(nodes: &mut [BomNode]) {
    nodes.sort_by(|a, b| a.path.cmp(&b.path).then(a.id.cmp(&b.id)));
}

fn fetch_where(conn: &Connection, clause: &str, values: Vec<Value>) -> Result<Vec<BomNode>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM bom_items WHERE {clause}"))?;
    let rows = stmt.query_map(params_from_iter(values), node_from_row)?;
    let mut nodes = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    attach_custom_fields(conn, &mut nodes)?;
    sort_by_path(&mut nodes);
    Ok(nodes)
}

fn attach_custom_fields(conn: &Connection, nodes: &mut [BomNode]) -> Result<()> {
    if nodes.is_empty() {
        return Ok(());
    }
    let projects: BTreeSet<Uuid> = nodes.iter().map(|n| n.project_id).collect();
    let mut by_item: HashMap<Uuid, BTreeMap<String, CustomValue>> = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT cf.bom_item_id, cf.field_name, cf.field_type, cf.field_value
         FROM custom_fields cf JOIN bom_items b ON b.id = cf.bom_item_id
         WHERE b.project_id = ?1",
    )?;
    for project in projects {
        let rows = stmt.query_map([project.to_string()], custom_field_from_row)?;
        for row in rows {
            let (item, name, value) = row?;
            by_item.entry(item).or_default().insert(name, value);
        }
    }
    for node in nodes {
        if let Some(fields) = by_item.remove(&node.id) {
            node.custom_fields = fields;
        }
    }
    Ok(())
}

pub(crate) fn fetch_node(conn: &Connection, id: Uuid) -> Result<Option<BomNode>> {
    let node = conn
        .query_row(
            "SELECT * FROM bom_items WHERE id = ?1",
            [id.to_string()],
            node_from_row,
        )
        .optional()?;
    let Some(mut node) = node else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT bom_item_id, field_name, field_type, field_value
         FROM custom_fields WHERE bom_item_id = ?1",
    )?;
    let rows = stmt.query_map([id.to_string()], custom_field_from_row)?;
    for row in rows {
        let (_, name, value) = row?;
        node.custom_fields.insert(name, value);
    }
    Ok(Some(node))
}

pub(crate) fn fetch_project_nodes(conn: &Connection, project_id: Uuid) -> Result<Vec<BomNode>> {
    fetch_where(conn, "project_id = ?1", vec![text(project_id)])
}

/// First item (in path order) carrying `part_number` in the project.
pub(crate) fn fetch_by_part_number(
    conn: &Connection,
    project_id: Uuid,
    part_number: &str,
) -> Result<Option<BomNode>> {
    let nodes = fetch_where(
        conn,
        "project_id = ?1 AND part_number = ?2",
        vec![text(project_id), text(part_number)],
    )?;
    Ok(nodes.into_iter().next())
}

pub(crate) fn fetch_children(conn: &Connection, id: Uuid) -> Result<Vec<BomNode>> {
    fetch_where(conn, "parent_id = ?1", vec![text(id)])
}

pub(crate) fn count_children(conn: &Connection, id: Uuid) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bom_items WHERE parent_id = ?1",
        [id.to_string()],
        |r| r.get(0),
    )?;
    Ok(n as usize)
}

pub(crate) fn count_project_items(conn: &Connection, project_id: Uuid) -> Result<usize> {
    let n: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bom_items WHERE project_id = ?1",
        [project_id.to_string()],
        |r| r.get(0),
    )?;
    Ok(n as usize)
}

fn item_exists(conn: &Connection, id: Uuid) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM bom_items WHERE id = ?1",
            [id.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Whether another item of the project already uses `part_number`.
pub(crate) fn part_number_taken(
    conn: &Connection,
    project_id: Uuid,
    part_number: &str,
    exclude: Option<Uuid>,
) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM bom_items
             WHERE project_id = ?1 AND part_number = ?2 AND id IS NOT ?3
             LIMIT 1",
            params![
                project_id.to_string(),
                part_number,
                exclude.map(|id| id.to_string())
            ],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn sibling_ordinals(conn: &Connection, project_id: Uuid, parent: Option<Uuid>) -> Result<Vec<u32>> {
    let mut stmt = conn
        .prepare("SELECT path FROM bom_items WHERE project_id = ?1 AND parent_id IS ?2")?;
    let rows = stmt.query_map(
        params![project_id.to_string(), parent.map(|p| p.to_string())],
        |r| r.get::<_, String>(0),
    )?;
    let mut ordinals = Vec::new();
    for raw in rows {
        let raw = raw?;
        match raw.parse::<MaterializedPath>() {
            Ok(path) => ordinals.extend(path.last_ordinal()),
            Err(e) => log::warn!("Ignoring sibling with {e}"),
        }
    }
    Ok(ordinals)
}

fn reserve_ordinal(conn: &Connection, project_id: Uuid, parent: Option<Uuid>) -> Result<u32> {
    let parent_key = parent.map(|p| p.to_string()).unwrap_or_default();
    let high_water: i64 = conn
        .query_row(
            "SELECT last_ordinal FROM path_counters WHERE project_id = ?1 AND parent_key = ?2",
            params![project_id.to_string(), parent_key],
            |r| r.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let high_water = u32::try_from(high_water).unwrap_or(u32::MAX);

    let ordinal = next_ordinal(sibling_ordinals(conn, project_id, parent)?, high_water);
    conn.execute(
        "INSERT INTO path_counters (project_id, parent_key, last_ordinal) VALUES (?1, ?2, ?3)
         ON CONFLICT (project_id, parent_key) DO UPDATE SET last_ordinal = excluded.last_ordinal",
        params![project_id.to_string(), parent_key, i64::from(ordinal)],
    )?;
    Ok(ordinal)
}

/// Resolve the parent, allocate `(level, path)` and insert.
///
/// Callers must hold a write transaction so the ordinal cannot be taken twice.
pub(crate) fn insert(conn: &Connection, dto: &NewBomNode) -> Result<BomNode> {
    let parent = match dto.parent_id {
        Some(pid) => {
            Some(fetch_node(conn, pid)?.ok_or_else(|| BomError::ParentNotFound(pid.to_string()))?)
        }
        None => None,
    };

    let ordinal = reserve_ordinal(conn, dto.project_id, dto.parent_id)?;
    let alloc = allocate(parent.as_ref(), ordinal);

    let id = Uuid::new_v4();
    let now = encode_timestamp(&Utc::now());
    let p = &dto.procurement;
    let inv = &dto.inventory;
    let columns: Vec<(&str, Value)> = vec![
        ("id", text(id)),
        ("project_id", text(dto.project_id)),
        ("parent_id", opt_text(dto.parent_id)),
        ("part_number", text(&dto.part_number)),
        ("description", text(&dto.description)),
        ("quantity", int(dto.quantity)),
        ("item_type", text(dto.item_type)),
        ("level", int(alloc.level)),
        ("path", text(&alloc.path)),
        ("supplier", opt_text(p.supplier.as_ref())),
        ("supplier_part_number", opt_text(p.supplier_part_number.as_ref())),
        ("manufacturer", opt_text(p.manufacturer.as_ref())),
        ("manufacturer_part_number", opt_text(p.manufacturer_part_number.as_ref())),
        ("revision", opt_text(p.revision.as_ref())),
        ("category", opt_text(p.category.as_ref())),
        ("unit_of_measure", text(&p.unit_of_measure)),
        ("notes", opt_text(p.notes.as_ref())),
        ("estimated_cost", opt_text(p.estimated_cost)),
        ("actual_cost", opt_text(p.actual_cost)),
        ("rfq_status", opt_text(p.rfq_status.as_ref())),
        ("rfq_date", opt_date(p.rfq_date)),
        ("moq", opt_int(p.moq)),
        ("lead_time_days", opt_int(p.lead_time_days)),
        ("expected_delivery", opt_date(p.expected_delivery)),
        ("received_date", opt_date(p.received_date)),
        ("procurement_status", text(p.procurement_status)),
        ("lifecycle_status", text(p.lifecycle_status)),
        ("obsolete", flag(p.obsolete)),
        ("critical", flag(p.critical)),
        ("stock_quantity", int(inv.stock_quantity)),
        ("reorder_point", int(inv.reorder_point)),
        ("safety_stock", int(inv.safety_stock)),
        ("inventory_location", opt_text(inv.inventory_location.as_ref())),
        ("created_at", text(&now)),
        ("updated_at", text(&now)),
    ];

    let names: Vec<&str> = columns.iter().map(|(c, _)| *c).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    conn.execute(
        &format!(
            "INSERT INTO bom_items ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        ),
        params_from_iter(columns.into_iter().map(|(_, v)| v)),
    )?;

    for (name, value) in &dto.custom_fields {
        upsert_custom_field(conn, id, name, value)?;
    }

    log::debug!(
        "Inserted {} at path {} (level {})",
        dto.part_number,
        alloc.path,
        alloc.level
    );
    Ok(fetch_node(conn, id)?.ok_or(BomError::NotFound(id))?)
}

fn patch_assignments(patch: &BomNodePatch) -> Vec<(&'static str, Value)> {
    let mut set = Vec::new();
    if let Some(v) = &patch.part_number {
        set.push(("part_number", text(v)));
    }
    if let Some(v) = &patch.description {
        set.push(("description", text(v)));
    }
    if let Some(v) = patch.quantity {
        set.push(("quantity", int(v)));
    }
    if let Some(v) = patch.item_type {
        set.push(("item_type", text(v)));
    }
    let optional_text = [
        ("supplier", &patch.supplier),
        ("supplier_part_number", &patch.supplier_part_number),
        ("manufacturer", &patch.manufacturer),
        ("manufacturer_part_number", &patch.manufacturer_part_number),
        ("revision", &patch.revision),
        ("category", &patch.category),
        ("notes", &patch.notes),
        ("rfq_status", &patch.rfq_status),
        ("inventory_location", &patch.inventory_location),
    ];
    // Some(None) writes NULL
    for (column, value) in optional_text {
        if let Some(v) = value {
            set.push((column, opt_text(v.as_ref())));
        }
    }
    if let Some(v) = &patch.unit_of_measure {
        set.push(("unit_of_measure", text(v)));
    }
    let costs = [
        ("estimated_cost", patch.estimated_cost),
        ("actual_cost", patch.actual_cost),
    ];
    for (column, value) in costs {
        if let Some(v) = value {
            set.push((column, opt_text(v)));
        }
    }
    let dates = [
        ("rfq_date", patch.rfq_date),
        ("expected_delivery", patch.expected_delivery),
        ("received_date", patch.received_date),
    ];
    for (column, value) in dates {
        if let Some(v) = value {
            set.push((column, opt_date(v)));
        }
    }
    let optional_counts = [("moq", patch.moq), ("lead_time_days", patch.lead_time_days)];
    for (column, value) in optional_counts {
        if let Some(v) = value {
            set.push((column, opt_int(v)));
        }
    }
    let counts = [
        ("stock_quantity", patch.stock_quantity),
        ("reorder_point", patch.reorder_point),
        ("safety_stock", patch.safety_stock),
    ];
    for (column, value) in counts {
        if let Some(v) = value {
            set.push((column, int(v)));
        }
    }
    if let Some(v) = patch.procurement_status {
        set.push(("procurement_status", text(v)));
    }
    if let Some(v) = patch.lifecycle_status {
        set.push(("lifecycle_status", text(v)));
    }
    if let Some(v) = patch.obsolete {
        set.push(("obsolete", flag(v)));
    }
    if let Some(v) = patch.critical {
        set.push(("critical", flag(v)));
    }
    set
}

/// Write the supplied fields only; `NotFound` if the item does not exist.
pub(crate) fn apply_patch(conn: &Connection, id: Uuid, patch: &BomNodePatch) -> Result<BomNode> {
    if !item_exists(conn, id)? {
        return Err(BomError::NotFound(id).into());
    }

    let mut set = patch_assignments(patch);
    set.push(("updated_at", text(encode_timestamp(&Utc::now()))));

    let assignments: Vec<String> = set
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
        .collect();
    let sql = format!(
        "UPDATE bom_items SET {} WHERE id = ?{}",
        assignments.join(", "),
        set.len() + 1
    );
    let values = set
        .into_iter()
        .map(|(_, v)| v)
        .chain(std::iter::once(text(id)));
    conn.execute(&sql, params_from_iter(values))?;

    Ok(fetch_node(conn, id)?.ok_or(BomError::NotFound(id))?)
}

/// Physically delete a childless item together with its custom fields.
pub(crate) fn remove(conn: &Connection, id: Uuid) -> Result<()> {
    if !item_exists(conn, id)? {
        return Err(BomError::NotFound(id).into());
    }
    let children = count_children(conn, id)?;
    if children > 0 {
        return Err(BomError::HasChildren { id, children }.into());
    }
    conn.execute(
        "DELETE FROM custom_fields WHERE bom_item_id = ?1",
        [id.to_string()],
    )?;
    conn.execute("DELETE FROM bom_items WHERE id = ?1", [id.to_string()])?;
    Ok(())
}

fn upsert_custom_field(conn: &Connection, id: Uuid, name: &str, value: &CustomValue) -> Result<()> {
    conn.execute(
        "INSERT INTO custom_fields (bom_item_id, field_name, field_type, field_value)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (bom_item_id, field_name)
         DO UPDATE SET field_type = excluded.field_type, field_value = excluded.field_value",
        params![id.to_string(), name, value.field_type(), value.to_string()],
    )?;
    Ok(())
}

fn touch(conn: &Connection, id: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE bom_items SET updated_at = ?1 WHERE id = ?2",
        params![encode_timestamp(&Utc::now()), id.to_string()],
    )?;
    Ok(())
}
