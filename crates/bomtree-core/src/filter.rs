use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{BomNode, ItemType, ProcurementStatus};

/// Search criteria for filtered BOM views.
///
/// Every supplied criterion must hold; `None` criteria are ignored. Text
/// criteria are case-insensitive substring matches. Cost bounds apply to the
/// estimated cost and, like the delivery bounds, exclude nodes without a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    pub item_type: Option<ItemType>,
    pub procurement_status: Option<ProcurementStatus>,
    pub obsolete: Option<bool>,
    pub part_number: Option<String>,
    pub description: Option<String>,
    pub min_cost: Option<Decimal>,
    pub max_cost: Option<Decimal>,
    pub rfq_status: Option<String>,
    pub expected_delivery_from: Option<NaiveDate>,
    pub expected_delivery_to: Option<NaiveDate>,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        *self == FilterCriteria::default()
    }

    pub fn matches(&self, node: &BomNode) -> bool {
        let p = &node.procurement;

        if self.item_type.is_some_and(|t| t != node.item_type) {
            return false;
        }
        if self
            .procurement_status
            .is_some_and(|s| s != p.procurement_status)
        {
            return false;
        }
        if self.obsolete.is_some_and(|o| o != p.obsolete) {
            return false;
        }
        if let Some(pn) = &self.part_number
            && !contains_ci(Some(&node.part_number), pn)
        {
            return false;
        }
        if let Some(desc) = &self.description
            && !contains_ci(Some(&node.description), desc)
        {
            return false;
        }
        if let Some(rfq) = &self.rfq_status
            && !contains_ci(p.rfq_status.as_deref(), rfq)
        {
            return false;
        }
        if let Some(min) = self.min_cost
            && !p.estimated_cost.is_some_and(|c| c >= min)
        {
            return false;
        }
        if let Some(max) = self.max_cost
            && !p.estimated_cost.is_some_and(|c| c <= max)
        {
            return false;
        }
        if let Some(from) = self.expected_delivery_from
            && !p.expected_delivery.is_some_and(|d| d >= from)
        {
            return false;
        }
        if let Some(to) = self.expected_delivery_to
            && !p.expected_delivery.is_some_and(|d| d <= to)
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::node;
    use rust_decimal_macros::dec;

    fn sample() -> BomNode {
        let mut n = node("RES-10K-0402", ItemType::Part, "1.1", None);
        n.description = "Resistor 10k 0402".into();
        n.procurement.estimated_cost = Some(dec!(0.02));
        n.procurement.rfq_status = Some("Quote Received".into());
        n.procurement.procurement_status = ProcurementStatus::InProgress;
        n.procurement.expected_delivery = NaiveDate::from_ymd_opt(2024, 6, 1);
        n
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        assert!(FilterCriteria::default().is_empty());
        assert!(FilterCriteria::default().matches(&sample()));
    }

    #[test]
    fn test_criteria_are_anded() {
        let n = sample();
        let hit = FilterCriteria {
            item_type: Some(ItemType::Part),
            part_number: Some("10k".into()),
            description: Some("RESISTOR".into()),
            rfq_status: Some("quote".into()),
            procurement_status: Some(ProcurementStatus::InProgress),
            obsolete: Some(false),
            ..Default::default()
        };
        assert!(hit.matches(&n));

        let miss = FilterCriteria {
            obsolete: Some(true),
            ..hit.clone()
        };
        assert!(!miss.matches(&n));
    }

    #[test]
    fn test_ranges() {
        let n = sample();
        let in_range = FilterCriteria {
            min_cost: Some(dec!(0.01)),
            max_cost: Some(dec!(0.02)),
            expected_delivery_from: NaiveDate::from_ymd_opt(2024, 6, 1),
            expected_delivery_to: NaiveDate::from_ymd_opt(2024, 6, 30),
            ..Default::default()
        };
        assert!(in_range.matches(&n));

        let too_cheap = FilterCriteria {
            min_cost: Some(dec!(1)),
            ..Default::default()
        };
        assert!(!too_cheap.matches(&n));

        let mut no_cost = sample();
        no_cost.procurement.estimated_cost = None;
        let bounded = FilterCriteria {
            max_cost: Some(dec!(100)),
            ..Default::default()
        };
        assert!(!bounded.matches(&no_cost));
    }
}
