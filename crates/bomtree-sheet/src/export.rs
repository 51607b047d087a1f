use std::collections::{BTreeSet, HashMap};

use bomtree_core::tree::flatten;
use bomtree_core::{
    BomNode, FilterCriteria, InventoryLine, KpiSummary, PartSummary, ProcurementStatus,
};
use bomtree_store::{BomService, Result};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::codec::Sheet;
use crate::field::TargetField;

pub const CUSTOM_COLUMN_PREFIX: &str = "CF: ";
const INDENT: &str = "  ";

/// Node columns written after `Level` and `Path`. Every one of them maps
/// back onto its field when the export is imported again.
const EXPORT_FIELDS: [TargetField; 29] = TargetField::ALL;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Indent part numbers by level.
    pub include_hierarchy: bool,
    /// One `CF: <name>` column per custom field seen in the export.
    pub include_custom_fields: bool,
    pub filters: Option<FilterCriteria>,
}

#[derive(Clone, Copy)]
pub struct Exporter<'db> {
    service: BomService<'db>,
}

impl<'db> Exporter<'db> {
    pub fn new(service: BomService<'db>) -> Self {
        Self { service }
    }

    /// One row per node in path order. A filtered export keeps that order
    /// even when a match's parent is left out.
    pub fn export_bom(&self, project_id: Uuid, options: &ExportOptions) -> Result<Sheet> {
        let all = self.service.get_flat_bom(project_id)?;
        let part_numbers: HashMap<Uuid, &str> =
            all.iter().map(|n| (n.id, n.part_number.as_str())).collect();
        let sheet = match &options.filters {
            Some(criteria) if !criteria.is_empty() => {
                let matches = self.service.find_with_filters(project_id, criteria)?;
                let nodes: Vec<&BomNode> = matches.iter().collect();
                log::debug!("Exporting {} of {} nodes", nodes.len(), all.len());
                bom_sheet(&nodes, &part_numbers, options)
            }
            _ => {
                let forest = bomtree_core::build_hierarchical_tree(&all);
                let nodes = flatten(&forest);
                log::debug!("Exporting {} nodes", nodes.len());
                bom_sheet(&nodes, &part_numbers, options)
            }
        };
        Ok(sheet)
    }

    pub fn export_kpi(&self, project_id: Uuid) -> Result<Sheet> {
        Ok(kpi_sheet(&self.service.kpi_summary(project_id)?))
    }

    pub fn export_part_summary(&self, project_id: Uuid) -> Result<Sheet> {
        Ok(part_summary_sheet(&self.service.part_summary(project_id)?))
    }

    pub fn export_inventory(&self, project_id: Uuid) -> Result<Sheet> {
        Ok(inventory_sheet(&self.service.inventory(project_id)?))
    }
}

fn bom_sheet(nodes: &[&BomNode], part_numbers: &HashMap<Uuid, &str>, options: &ExportOptions) -> Sheet {
    let custom_names: BTreeSet<&str> = if options.include_custom_fields {
        nodes
            .iter()
            .flat_map(|n| n.custom_fields.keys().map(String::as_str))
            .collect()
    } else {
        BTreeSet::new()
    };

    let mut header = vec!["Level".to_string(), "Path".to_string()];
    header.extend(EXPORT_FIELDS.iter().map(|f| f.label().to_string()));
    header.extend(custom_names.iter().map(|n| format!("{CUSTOM_COLUMN_PREFIX}{n}")));

    let mut sheet = Sheet::new("BOM", header);
    for node in nodes {
        let mut row = vec![node.level.to_string(), node.path.to_string()];
        for field in EXPORT_FIELDS {
            let value = match field {
                TargetField::PartNumber if options.include_hierarchy => format!(
                    "{}{}",
                    INDENT.repeat(node.level as usize),
                    node.part_number
                ),
                TargetField::ParentPartNumber => node
                    .parent_id
                    .and_then(|id| part_numbers.get(&id))
                    .map(|pn| pn.to_string())
                    .unwrap_or_default(),
                _ => cell(node, field),
            };
            row.push(value);
        }
        row.extend(custom_names.iter().map(|name| {
            node.custom_fields
                .get(*name)
                .map(ToString::to_string)
                .unwrap_or_default()
        }));
        sheet.push_row(row);
    }
    sheet
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn number<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn yes_no(flag: bool) -> String {
    String::from(if flag { "Yes" } else { "No" })
}

fn money(value: Decimal) -> String {
    format!(
        "{:.2}",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Display value of one node field.
fn cell(node: &BomNode, field: TargetField) -> String {
    let p = &node.procurement;
    let inv = &node.inventory;
    match field {
        TargetField::PartNumber => node.part_number.clone(),
        TargetField::Description => node.description.clone(),
        TargetField::Quantity => node.quantity.to_string(),
        TargetField::ItemType => node.item_type.label().to_string(),
        TargetField::ParentPartNumber => String::new(),
        TargetField::Supplier => text(&p.supplier),
        TargetField::SupplierPartNumber => text(&p.supplier_part_number),
        TargetField::Manufacturer => text(&p.manufacturer),
        TargetField::ManufacturerPartNumber => text(&p.manufacturer_part_number),
        TargetField::Revision => text(&p.revision),
        TargetField::Category => text(&p.category),
        TargetField::UnitOfMeasure => p.unit_of_measure.clone(),
        TargetField::Notes => text(&p.notes),
        TargetField::EstimatedCost => number(p.estimated_cost),
        TargetField::ActualCost => number(p.actual_cost),
        TargetField::RfqStatus => text(&p.rfq_status),
        TargetField::RfqDate => date(p.rfq_date),
        TargetField::Moq => number(p.moq),
        TargetField::LeadTimeDays => number(p.lead_time_days),
        TargetField::ExpectedDelivery => date(p.expected_delivery),
        TargetField::ReceivedDate => date(p.received_date),
        TargetField::ProcurementStatus => p.procurement_status.label().to_string(),
        TargetField::LifecycleStatus => p.lifecycle_status.as_str().to_string(),
        TargetField::Obsolete => yes_no(p.obsolete),
        TargetField::Critical => yes_no(p.critical),
        TargetField::StockQuantity => inv.stock_quantity.to_string(),
        TargetField::ReorderPoint => inv.reorder_point.to_string(),
        TargetField::SafetyStock => inv.safety_stock.to_string(),
        TargetField::InventoryLocation => text(&inv.inventory_location),
    }
}

/// Two-column `Metric`/`Value` sheet of project KPIs.
pub fn kpi_sheet(kpi: &KpiSummary) -> Sheet {
    let mut sheet = Sheet::new("KPI", vec!["Metric".into(), "Value".into()]);
    let mut metric = |name: &str, value: String| sheet.push_row(vec![name.to_string(), value]);

    metric("Total Items", kpi.total_items.to_string());
    for status in ProcurementStatus::ALL {
        metric(status.label(), kpi.count(status).to_string());
    }
    metric("Obsolete", kpi.obsolete.to_string());
    metric("Critical", kpi.critical.to_string());
    metric("Estimated Cost", money(kpi.estimated_cost));
    metric("Actual Cost", money(kpi.actual_cost));
    metric("Variance", money(kpi.variance));
    metric("Completion %", format!("{:.1}", kpi.completion_percentage));
    sheet
}

pub fn part_summary_sheet(lines: &[PartSummary]) -> Sheet {
    let header = [
        "Part Number",
        "Description",
        "Occurrences",
        "Total Quantity",
        "Unit Cost",
        "Total Cost",
        "Procurement Status",
        "Stock Status",
        "Needs Reorder",
        "Critical",
        "Obsolete",
    ];
    let mut sheet = Sheet::new("Part Summary", header.map(String::from).to_vec());
    for line in lines {
        sheet.push_row(vec![
            line.part_number.clone(),
            line.description.clone(),
            line.occurrences.to_string(),
            line.total_quantity.to_string(),
            line.unit_cost.map(money).unwrap_or_default(),
            line.total_cost.map(money).unwrap_or_default(),
            line.procurement_status.label().to_string(),
            line.stock_status.as_str().to_string(),
            yes_no(line.needs_reorder),
            yes_no(line.critical),
            yes_no(line.obsolete),
        ]);
    }
    sheet
}

pub fn inventory_sheet(lines: &[InventoryLine]) -> Sheet {
    let header = [
        "Part Number",
        "Description",
        "Location",
        "Stock",
        "Reorder Point",
        "Safety Stock",
        "Required",
        "Shortfall",
        "Needs Reorder",
        "Status",
    ];
    let mut sheet = Sheet::new("Inventory", header.map(String::from).to_vec());
    for line in lines {
        sheet.push_row(vec![
            line.part_number.clone(),
            line.description.clone(),
            text(&line.location),
            line.stock_quantity.to_string(),
            line.reorder_point.to_string(),
            line.safety_stock.to_string(),
            line.required_quantity.to_string(),
            line.shortfall.to_string(),
            yes_no(line.needs_reorder),
            line.status.as_str().to_string(),
        ]);
    }
    sheet
}
