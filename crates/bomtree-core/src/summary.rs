use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::inventory::{StockStatus, needs_reorder};
use crate::model::{BomNode, ProcurementStatus};
use crate::quantity::total_quantities;

/// Project-wide procurement KPIs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub total_items: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub delayed: usize,
    pub obsolete: usize,
    pub critical: usize,
    pub estimated_cost: Decimal,
    pub actual_cost: Decimal,
    /// `actual_cost - estimated_cost`
    pub variance: Decimal,
    /// Completed share in percent, one decimal; 0 for an empty project
    pub completion_percentage: Decimal,
}

impl KpiSummary {
    pub fn from_nodes(nodes: &[BomNode]) -> Self {
        let mut kpi = KpiSummary {
            total_items: nodes.len(),
            ..Default::default()
        };
        for node in nodes {
            let p = &node.procurement;
            match p.procurement_status {
                ProcurementStatus::Pending => kpi.pending += 1,
                ProcurementStatus::InProgress => kpi.in_progress += 1,
                ProcurementStatus::Completed => kpi.completed += 1,
                ProcurementStatus::Delayed => kpi.delayed += 1,
            }
            if p.obsolete {
                kpi.obsolete += 1;
            }
            if p.critical {
                kpi.critical += 1;
            }
            kpi.estimated_cost += p.estimated_cost.unwrap_or_default();
            kpi.actual_cost += p.actual_cost.unwrap_or_default();
        }
        kpi.variance = kpi.actual_cost - kpi.estimated_cost;
        if kpi.total_items > 0 {
            let pct = Decimal::from(kpi.completed) * Decimal::ONE_HUNDRED
                / Decimal::from(kpi.total_items);
            kpi.completion_percentage =
                pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        }
        kpi
    }

    pub fn count(&self, status: ProcurementStatus) -> usize {
        match status {
            ProcurementStatus::Pending => self.pending,
            ProcurementStatus::InProgress => self.in_progress,
            ProcurementStatus::Completed => self.completed,
            ProcurementStatus::Delayed => self.delayed,
        }
    }
}

/// One line per distinct part number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartSummary {
    pub part_number: String,
    pub description: String,
    pub occurrences: usize,
    pub total_quantity: u64,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub procurement_status: ProcurementStatus,
    pub stock_status: StockStatus,
    pub needs_reorder: bool,
    pub critical: bool,
    pub obsolete: bool,
}

/// Aggregate the project by part number, sorted naturally (`PRT-2` before `PRT-10`).
///
/// Descriptive fields come from the first occurrence in path order; the
/// critical and obsolete flags are set if any occurrence carries them.
pub fn part_summary(nodes: &[BomNode]) -> Vec<PartSummary> {
    let totals = total_quantities(nodes);

    let mut ordered: Vec<&BomNode> = nodes.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut lines: Vec<PartSummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for node in ordered {
        let p = &node.procurement;
        if let Some(&i) = index.get(node.part_number.as_str()) {
            let line = &mut lines[i];
            line.occurrences += 1;
            line.critical |= p.critical;
            line.obsolete |= p.obsolete;
            continue;
        }
        let inv = &node.inventory;
        let total_quantity = totals.get(&node.part_number).copied().unwrap_or(0);
        let unit_cost = p.unit_cost();
        index.insert(&node.part_number, lines.len());
        lines.push(PartSummary {
            part_number: node.part_number.clone(),
            description: node.description.clone(),
            occurrences: 1,
            total_quantity,
            unit_cost,
            total_cost: unit_cost.map(|c| c * Decimal::from(total_quantity)),
            procurement_status: p.procurement_status,
            stock_status: StockStatus::classify(
                inv.stock_quantity,
                inv.safety_stock,
                inv.reorder_point,
            ),
            needs_reorder: needs_reorder(inv.stock_quantity, inv.reorder_point),
            critical: p.critical,
            obsolete: p.obsolete,
        });
    }

    lines.sort_by(|a, b| natord::compare(&a.part_number, &b.part_number));
    lines
}
