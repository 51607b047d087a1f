use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{BomNode, ItemType};
use crate::quantity::total_quantities;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    Out,
    Critical,
    Low,
    Ok,
}

impl StockStatus {
    /// Evaluated in order: empty, at or below safety stock, at or below reorder point.
    pub fn classify(stock: u32, safety_stock: u32, reorder_point: u32) -> Self {
        if stock == 0 {
            StockStatus::Out
        } else if stock <= safety_stock {
            StockStatus::Critical
        } else if stock <= reorder_point {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Out => "out",
            StockStatus::Critical => "critical",
            StockStatus::Low => "low",
            StockStatus::Ok => "ok",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn needs_reorder(stock: u32, reorder_point: u32) -> bool {
    reorder_point > 0 && stock <= reorder_point
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLine {
    pub part_number: String,
    pub description: String,
    pub location: Option<String>,
    pub stock_quantity: u32,
    pub reorder_point: u32,
    pub safety_stock: u32,
    pub required_quantity: u64,
    pub shortfall: u64,
    pub needs_reorder: bool,
    pub status: StockStatus,
}

/// Stock position of every distinct `part` part number.
///
/// Stock figures come from the first occurrence in path order; the required
/// quantity is the effective total across the whole project.
pub fn inventory_report(nodes: &[BomNode]) -> Vec<InventoryLine> {
    let totals = total_quantities(nodes);

    let mut ordered: Vec<&BomNode> = nodes
        .iter()
        .filter(|n| n.item_type == ItemType::Part)
        .collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut seen = HashSet::new();
    let mut lines: Vec<InventoryLine> = ordered
        .into_iter()
        .filter(|n| seen.insert(n.part_number.as_str()))
        .map(|n| {
            let inv = &n.inventory;
            let required = totals.get(&n.part_number).copied().unwrap_or(0);
            InventoryLine {
                part_number: n.part_number.clone(),
                description: n.description.clone(),
                location: inv.inventory_location.clone(),
                stock_quantity: inv.stock_quantity,
                reorder_point: inv.reorder_point,
                safety_stock: inv.safety_stock,
                required_quantity: required,
                shortfall: required.saturating_sub(u64::from(inv.stock_quantity)),
                needs_reorder: needs_reorder(inv.stock_quantity, inv.reorder_point),
                status: StockStatus::classify(
                    inv.stock_quantity,
                    inv.safety_stock,
                    inv.reorder_point,
                ),
            }
        })
        .collect();

    lines.sort_by(|a, b| natord::compare(&a.part_number, &b.part_number));
    lines
}
