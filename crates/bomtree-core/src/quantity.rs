use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::model::BomNode;
use crate::tree::Arena;

/// Effective quantity of every reachable node relative to the whole build.
///
/// Roots contribute a multiplier of 1 whatever their own quantity; every
/// descendant multiplies its local quantity onto its parent's multiplier.
/// Products saturate at `u64::MAX`.
pub fn effective_quantities(nodes: &[BomNode]) -> HashMap<Uuid, u64> {
    let arena = Arena::new(nodes);
    let mut out = HashMap::with_capacity(nodes.len());

    let mut stack: Vec<(usize, u64)> = arena.roots().iter().map(|&r| (r, 1)).collect();
    while let Some((idx, multiplier)) = stack.pop() {
        out.insert(arena.node(idx).id, multiplier);
        for &child in arena.children(idx) {
            let local = u64::from(arena.node(child).quantity);
            stack.push((child, multiplier.saturating_mul(local)));
        }
    }

    if out.len() < nodes.len() {
        log::warn!(
            "{} BOM nodes are unreachable from any root and were left out of quantity totals",
            nodes.len() - out.len()
        );
    }
    out
}

/// Sum effective quantities by part number across all occurrences.
pub fn total_quantities(nodes: &[BomNode]) -> BTreeMap<String, u64> {
    let effective = effective_quantities(nodes);
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for node in nodes {
        if let Some(&qty) = effective.get(&node.id) {
            let entry = totals.entry(node.part_number.clone()).or_default();
            *entry = entry.saturating_add(qty);
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;
    use crate::testing::{node, with_qty};

    #[test]
    fn test_chain_multiplication_skips_root_quantity() {
        let root = node("ROOT", ItemType::Assembly, "1", None);
        let a = with_qty(node("A", ItemType::Assembly, "1.1", Some(&root)), 2);
        let b = with_qty(node("B", ItemType::Subassembly, "1.1.1", Some(&a)), 3);
        let c = with_qty(node("C", ItemType::Part, "1.1.1.1", Some(&b)), 4);
        let c_id = c.id;

        let effective = effective_quantities(&[root, a, b, c]);
        assert_eq!(effective[&c_id], 24);
    }

    #[test]
    fn test_root_quantity_is_ignored() {
        let root = with_qty(node("ASM-1", ItemType::Assembly, "1", None), 10);
        let part = with_qty(node("PRT-1", ItemType::Part, "1.1", Some(&root)), 3);
        let totals = total_quantities(&[root, part]);
        assert_eq!(totals["ASM-1"], 1);
        assert_eq!(totals["PRT-1"], 3);
    }

    #[test]
    fn test_duplicates_are_summed() {
        let asm = node("ASM-1", ItemType::Assembly, "1", None);
        let sub_a = with_qty(node("SUB-A", ItemType::Subassembly, "1.1", Some(&asm)), 2);
        let sub_b = with_qty(node("SUB-B", ItemType::Subassembly, "1.2", Some(&asm)), 3);
        let screw_a = with_qty(node("SCREW", ItemType::Part, "1.1.1", Some(&sub_a)), 4);
        let screw_b = with_qty(node("SCREW", ItemType::Part, "1.2.1", Some(&sub_b)), 5);
        let screw_top = with_qty(node("SCREW", ItemType::Part, "1.3", Some(&asm)), 1);

        let totals = total_quantities(&[asm, sub_a, sub_b, screw_a, screw_b, screw_top]);
        assert_eq!(totals["SCREW"], 2 * 4 + 3 * 5 + 1);
        assert_eq!(totals["SUB-A"], 2);
    }

    #[test]
    fn test_scenario_a_totals() {
        let asm = node("ASM-1", ItemType::Assembly, "1", None);
        let sub = node("SUB-1", ItemType::Subassembly, "1.1", Some(&asm));
        let prt = with_qty(node("PRT-1", ItemType::Part, "1.1.1", Some(&sub)), 5);
        let totals = total_quantities(&[asm, sub, prt]);
        assert_eq!(totals.get("PRT-1"), Some(&5));
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        let mut flat = vec![node("R", ItemType::Assembly, "1", None)];
        let mut path = String::from("1");
        for i in 1..6 {
            path.push_str(".1");
            let parent = flat[i - 1].clone();
            flat.push(with_qty(node(&format!("N{i}"), ItemType::Part, &path, Some(&parent)), u32::MAX));
        }
        let totals = total_quantities(&flat);
        assert_eq!(totals["N5"], u64::MAX);
    }

    #[test]
    fn test_empty_input() {
        assert!(total_quantities(&[]).is_empty());
    }
}
