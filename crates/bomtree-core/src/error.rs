use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::model::ItemType;

/// Discriminant of every failure the engine can report.
///
/// Row reports and callers branch on this instead of matching message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DuplicatePartNumber,
    ParentNotFound,
    NotFound,
    ProjectNotFound,
    ProjectNotEmpty,
    CrossProjectParent,
    InvalidHierarchy,
    IncompatibleChildren,
    IncompatibleParent,
    HasChildren,
    InvalidQuantity,
    MissingRequiredField,
    InvalidNumber,
    InvalidMapping,
    NoDataRows,
    Codec,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Integrity violations raised by the tree engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BomError {
    #[error("part number {part_number} already exists in project {project_id}")]
    DuplicatePartNumber {
        project_id: Uuid,
        part_number: String,
    },

    #[error("parent item {0} not found")]
    ParentNotFound(String),

    #[error("BOM item {0} not found")]
    NotFound(Uuid),

    #[error("project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("cannot delete project {project_id}: it still holds {items} BOM items")]
    ProjectNotEmpty { project_id: Uuid, items: usize },

    #[error("parent item {parent_id} belongs to project {parent_project}, not {project_id}")]
    CrossProjectParent {
        parent_id: Uuid,
        parent_project: Uuid,
        project_id: Uuid,
    },

    #[error("invalid item type hierarchy: {parent} cannot contain {child}")]
    InvalidHierarchy { parent: ItemType, child: ItemType },

    #[error("cannot change item type to {proposed}: it contains children of incompatible types: {children}")]
    IncompatibleChildren { proposed: ItemType, children: String },

    #[error("cannot change item type to {proposed}: parent type {parent} does not allow this child type")]
    IncompatibleParent { parent: ItemType, proposed: ItemType },

    #[error("cannot delete item {id} with {children} children; delete children first")]
    HasChildren { id: Uuid, children: usize },

    #[error("quantity must be a positive integer, got {0}")]
    InvalidQuantity(i64),

    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),
}

impl BomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BomError::DuplicatePartNumber { .. } => ErrorKind::DuplicatePartNumber,
            BomError::ParentNotFound(_) => ErrorKind::ParentNotFound,
            BomError::NotFound(_) => ErrorKind::NotFound,
            BomError::ProjectNotFound(_) => ErrorKind::ProjectNotFound,
            BomError::ProjectNotEmpty { .. } => ErrorKind::ProjectNotEmpty,
            BomError::CrossProjectParent { .. } => ErrorKind::CrossProjectParent,
            BomError::InvalidHierarchy { .. } => ErrorKind::InvalidHierarchy,
            BomError::IncompatibleChildren { .. } => ErrorKind::IncompatibleChildren,
            BomError::IncompatibleParent { .. } => ErrorKind::IncompatibleParent,
            BomError::HasChildren { .. } => ErrorKind::HasChildren,
            BomError::InvalidQuantity(_) => ErrorKind::InvalidQuantity,
            BomError::MissingRequiredField(_) => ErrorKind::MissingRequiredField,
        }
    }
}
