use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::model::{BomNode, Inventory, ItemType, Procurement};

pub(crate) const PROJECT: Uuid = Uuid::from_u128(0xB0B);

/// Detached node for pure unit tests; level follows the path depth.
pub(crate) fn node(
    part_number: &str,
    item_type: ItemType,
    path: &str,
    parent: Option<&BomNode>,
) -> BomNode {
    let path: crate::MaterializedPath = path.parse().unwrap();
    let stamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    BomNode {
        id: Uuid::new_v4(),
        project_id: PROJECT,
        parent_id: parent.map(|p| p.id),
        part_number: part_number.to_string(),
        description: format!("{part_number} description"),
        quantity: 1,
        item_type,
        level: path.depth(),
        path,
        procurement: Procurement::default(),
        inventory: Inventory::default(),
        custom_fields: Default::default(),
        created_at: stamp,
        updated_at: stamp,
    }
}

pub(crate) fn with_qty(mut node: BomNode, quantity: u32) -> BomNode {
    node.quantity = quantity;
    node
}
