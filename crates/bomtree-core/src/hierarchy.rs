//! Item-type containment rules.
//!
//! `assembly` holds subassemblies and parts, `subassembly` holds parts,
//! `part` is a leaf.

use itertools::Itertools;

use crate::error::BomError;
use crate::model::{BomNode, ItemType};

pub fn allowed_children(parent: ItemType) -> &'static [ItemType] {
    match parent {
        ItemType::Assembly => &[ItemType::Subassembly, ItemType::Part],
        ItemType::Subassembly => &[ItemType::Part],
        ItemType::Part => &[],
    }
}

pub fn can_be_child_of(parent: ItemType, child: ItemType) -> bool {
    allowed_children(parent).contains(&child)
}

/// Check that `child` may be placed under `parent`.
pub fn validate_child(parent: ItemType, child: ItemType) -> Result<(), BomError> {
    if can_be_child_of(parent, child) {
        Ok(())
    } else {
        Err(BomError::InvalidHierarchy { parent, child })
    }
}

/// Check that `node` may become `proposed` given its current children and parent.
pub fn validate_type_change(
    node: &BomNode,
    proposed: ItemType,
    children: &[BomNode],
    parent: Option<&BomNode>,
) -> Result<(), BomError> {
    if node.item_type == proposed {
        return Ok(());
    }

    let offending = children
        .iter()
        .filter(|c| !can_be_child_of(proposed, c.item_type))
        .map(|c| format!("{} ({})", c.part_number, c.item_type))
        .join(", ");
    if !offending.is_empty() {
        return Err(BomError::IncompatibleChildren {
            proposed,
            children: offending,
        });
    }

    if let Some(parent) = parent
        && !can_be_child_of(parent.item_type, proposed)
    {
        return Err(BomError::IncompatibleParent {
            parent: parent.item_type,
            proposed,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::node;
    use crate::error::ErrorKind;

    #[test]
    fn test_containment_table() {
        use ItemType::*;
        let expected = [
            (Assembly, Assembly, false),
            (Assembly, Subassembly, true),
            (Assembly, Part, true),
            (Subassembly, Assembly, false),
            (Subassembly, Subassembly, false),
            (Subassembly, Part, true),
            (Part, Assembly, false),
            (Part, Subassembly, false),
            (Part, Part, false),
        ];
        for (parent, child, ok) in expected {
            assert_eq!(can_be_child_of(parent, child), ok, "{parent} -> {child}");
        }
    }

    #[test]
    fn test_part_cannot_be_parent() {
        let err = validate_child(ItemType::Part, ItemType::Part).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHierarchy);
    }

    #[test]
    fn test_type_change_blocked_by_children() {
        let sub = node("SUB-1", ItemType::Subassembly, "1.1", None);
        let part = node("PRT-1", ItemType::Part, "1.1.1", Some(&sub));
        let err = validate_type_change(&sub, ItemType::Part, &[part], None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleChildren);
        assert!(err.to_string().contains("PRT-1"));
    }

    #[test]
    fn test_type_change_blocked_by_parent() {
        let asm = node("ASM-1", ItemType::Assembly, "1", None);
        let part = node("PRT-1", ItemType::Part, "1.1", Some(&asm));
        let err =
            validate_type_change(&part, ItemType::Assembly, &[], Some(&asm)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleParent);
    }

    #[test]
    fn test_type_change_allowed() {
        let asm = node("ASM-1", ItemType::Assembly, "1", None);
        let part = node("PRT-1", ItemType::Part, "1.1", Some(&asm));
        assert!(validate_type_change(&part, ItemType::Subassembly, &[], Some(&asm)).is_ok());
        // unchanged type is always fine
        assert!(validate_type_change(&asm, ItemType::Assembly, &[], None).is_ok());
    }
}
