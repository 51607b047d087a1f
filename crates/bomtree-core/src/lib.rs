//! Domain core of the BOM integrity engine.
//!
//! Pure data types and algorithms with no storage attached: the node model,
//! materialized path allocation, item-type hierarchy rules, forest assembly,
//! quantity multiplication and the reporting folds built on top of them.

pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod inventory;
pub mod model;
pub mod path;
pub mod quantity;
pub mod summary;
pub mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BomError, ErrorKind};
pub use filter::FilterCriteria;
pub use inventory::{InventoryLine, StockStatus, inventory_report};
pub use model::{
    BomNode, BomNodePatch, CustomValue, Inventory, ItemType, LifecycleStatus, NewBomNode,
    NewProject, ProcurementStatus, Procurement, Project, ProjectPatch,
};
pub use path::{Allocation, MaterializedPath};
pub use quantity::{effective_quantities, total_quantities};
pub use summary::{KpiSummary, PartSummary, part_summary};
pub use tree::{TreeNode, build_hierarchical_tree};
