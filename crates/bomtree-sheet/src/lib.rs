//! Spreadsheet reconciliation for bomtree.
//!
//! Rows come in through a [`Sheet`], are mapped onto node fields by a
//! [`ColumnMapping`] and created one by one through the
//! [`BomService`](bomtree_store::BomService). Exports and report sheets go
//! the other way.

pub mod codec;
pub mod export;
pub mod field;
pub mod import;
pub mod mapping;
#[cfg(feature = "table")]
pub mod table;
pub mod template;

use bomtree_core::ErrorKind;
use thiserror::Error;

pub use codec::Sheet;
pub use export::{ExportOptions, Exporter, inventory_sheet, kpi_sheet, part_summary_sheet};
pub use field::{Target, TargetField};
pub use import::{ImportOptions, ImportReport, Importer, RowError};
pub use mapping::ColumnMapping;
pub use template::{template_mapping, template_sheet};

/// Failures that stop a whole import batch before any row is processed.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid column mapping: {0}")]
    InvalidMapping(String),

    #[error("failed to parse column mapping: {0}")]
    MappingFile(#[from] serde_json::Error),

    #[error("the sheet contains no data rows")]
    NoDataRows,

    #[error("failed to read spreadsheet: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::InvalidMapping(_) | ImportError::MappingFile(_) => ErrorKind::InvalidMapping,
            ImportError::NoDataRows => ErrorKind::NoDataRows,
            ImportError::Csv(_) | ImportError::Io(_) => ErrorKind::Codec,
        }
    }
}
