use std::io::{self, Write};

use bomtree_core::{
    InventoryLine, ItemType, KpiSummary, PartSummary, ProcurementStatus, StockStatus, TreeNode,
};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::DynamicFullWidth);
    table.set_header(header.to_vec());
    table
}

fn status_color(status: ProcurementStatus) -> Option<Color> {
    match status {
        ProcurementStatus::Pending => None,
        ProcurementStatus::InProgress => Some(Color::Blue),
        ProcurementStatus::Completed => Some(Color::Green),
        ProcurementStatus::Delayed => Some(Color::Red),
    }
}

fn stock_color(status: StockStatus) -> Color {
    match status {
        StockStatus::Out => Color::Red,
        StockStatus::Critical => Color::Red,
        StockStatus::Low => Color::Yellow,
        StockStatus::Ok => Color::Green,
    }
}

fn colored(text: impl ToString, color: Option<Color>) -> Cell {
    let cell = Cell::new(text);
    match color {
        Some(color) => cell.fg(color),
        None => cell,
    }
}

/// Indented BOM tree, one line per node in path order.
pub fn write_tree<W: Write>(forest: &[TreeNode], mut writer: W) -> io::Result<()> {
    let mut table = new_table(&["Path", "Part Number", "Description", "Type", "Qty", "Status"]);
    for node in forest.iter().flat_map(TreeNode::iter).map(|t| &t.node) {
        let obsolete = node.procurement.obsolete;
        let part_number = format!("{}{}", "  ".repeat(node.level as usize), node.part_number);
        let type_color = match node.item_type {
            ItemType::Assembly => Some(Color::Cyan),
            ItemType::Subassembly => Some(Color::Blue),
            ItemType::Part => None,
        };
        let grey = obsolete.then_some(Color::DarkGrey);
        table.add_row(vec![
            colored(&node.path, grey),
            colored(part_number, grey.or(type_color)),
            colored(&node.description, grey),
            colored(node.item_type.label(), grey),
            colored(node.quantity, grey),
            colored(
                node.procurement.procurement_status.label(),
                grey.or(status_color(node.procurement.procurement_status)),
            ),
        ]);
    }
    writeln!(writer, "{table}")
}

pub fn write_inventory<W: Write>(lines: &[InventoryLine], mut writer: W) -> io::Result<()> {
    let mut table = new_table(&[
        "Part Number",
        "Location",
        "Stock",
        "Reorder",
        "Safety",
        "Required",
        "Shortfall",
        "Status",
    ]);
    for line in lines {
        let color = stock_color(line.status);
        table.add_row(vec![
            Cell::new(&line.part_number),
            Cell::new(line.location.as_deref().unwrap_or_default()),
            Cell::new(line.stock_quantity),
            Cell::new(line.reorder_point),
            Cell::new(line.safety_stock),
            Cell::new(line.required_quantity),
            colored(line.shortfall, (line.shortfall > 0).then_some(Color::Red)),
            Cell::new(line.status.as_str()).fg(color),
        ]);
    }
    writeln!(writer, "{table}")
}

pub fn write_part_summary<W: Write>(lines: &[PartSummary], mut writer: W) -> io::Result<()> {
    let mut table = new_table(&[
        "Part Number",
        "Description",
        "Used",
        "Total Qty",
        "Unit Cost",
        "Total Cost",
        "Status",
        "Stock",
    ]);
    for line in lines {
        let grey = line.obsolete.then_some(Color::DarkGrey);
        let pn_color = grey.or(line.critical.then_some(Color::Magenta));
        table.add_row(vec![
            colored(&line.part_number, pn_color),
            colored(&line.description, grey),
            Cell::new(line.occurrences),
            Cell::new(line.total_quantity),
            Cell::new(line.unit_cost.map(|c| c.to_string()).unwrap_or_default()),
            Cell::new(line.total_cost.map(|c| c.to_string()).unwrap_or_default()),
            colored(
                line.procurement_status.label(),
                status_color(line.procurement_status),
            ),
            Cell::new(line.stock_status.as_str()).fg(stock_color(line.stock_status)),
        ]);
    }
    writeln!(writer, "{table}")
}

pub fn write_kpi<W: Write>(kpi: &KpiSummary, mut writer: W) -> io::Result<()> {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Disabled);
    table.add_row(vec![Cell::new("Total items"), Cell::new(kpi.total_items)]);
    for status in ProcurementStatus::ALL {
        table.add_row(vec![
            colored(status.label(), status_color(status)),
            Cell::new(kpi.count(status)),
        ]);
    }
    table.add_row(vec![Cell::new("Obsolete"), Cell::new(kpi.obsolete)]);
    table.add_row(vec![Cell::new("Critical"), Cell::new(kpi.critical)]);
    table.add_row(vec![Cell::new("Estimated cost"), Cell::new(kpi.estimated_cost)]);
    table.add_row(vec![Cell::new("Actual cost"), Cell::new(kpi.actual_cost)]);
    let variance_color = if kpi.variance.is_sign_positive() && !kpi.variance.is_zero() {
        Color::Red
    } else {
        Color::Green
    };
    table.add_row(vec![
        Cell::new("Variance"),
        Cell::new(kpi.variance).fg(variance_color),
    ]);
    table.add_row(vec![
        Cell::new("Completion"),
        Cell::new(format!("{:.1}%", kpi.completion_percentage)),
    ]);
    writeln!(writer, "{table}")
}
