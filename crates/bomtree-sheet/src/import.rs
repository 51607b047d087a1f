use std::collections::HashMap;

use bomtree_core::hierarchy::validate_child;
use bomtree_core::{BomError, ErrorKind, ItemType, NewBomNode};
use bomtree_store::{BomService, StoreError};
use serde::Serialize;
use uuid::Uuid;

use crate::codec::Sheet;
use crate::field::{RowDraft, Target, TargetField};
use crate::mapping::{ColumnMapping, MappedColumn};
use crate::ImportError;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub project_id: Uuid,
    /// Guessed from the header row when absent.
    pub mapping: Option<ColumnMapping>,
    /// When false the header row is processed as data too.
    pub skip_header_row: bool,
    /// Check every row without writing anything.
    pub validate_only: bool,
}

impl ImportOptions {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            mapping: None,
            skip_header_row: true,
            validate_only: false,
        }
    }
}

/// Why a single row was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    /// 1-based sheet row, the header being row 1.
    pub row: usize,
    pub column: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
    pub data: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub success: bool,
    pub total_rows: usize,
    pub successful_rows: usize,
    pub errors: Vec<RowError>,
    pub created_item_ids: Vec<Uuid>,
}

/// Rows accepted so far by a validate-only run.
type DryRunLedger = HashMap<String, ItemType>;

/// Row-by-row, best-effort spreadsheet import.
///
/// Rows are handled in sheet order and each one goes through
/// [`BomService`] on its own, so a parent referenced by part number must
/// appear on an earlier row.
#[derive(Clone, Copy)]
pub struct Importer<'db> {
    service: BomService<'db>,
}

struct RowFailure {
    column: Option<String>,
    kind: ErrorKind,
    message: String,
}

impl RowFailure {
    fn new(column: Option<&str>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            column: column.map(str::to_string),
            kind,
            message: message.into(),
        }
    }
}

impl<'db> Importer<'db> {
    pub fn new(service: BomService<'db>) -> Self {
        Self { service }
    }

    pub fn import(&self, sheet: &Sheet, options: &ImportOptions) -> Result<ImportReport, ImportError> {
        let header = sheet.header().ok_or(ImportError::NoDataRows)?;
        let (first_row, rows) = if options.skip_header_row {
            (2, sheet.body())
        } else {
            (1, sheet.rows.as_slice())
        };
        if rows.is_empty() {
            return Err(ImportError::NoDataRows);
        }

        let guessed;
        let mapping = match &options.mapping {
            Some(mapping) => mapping,
            None => {
                guessed = ColumnMapping::auto(header);
                &guessed
            }
        };
        let columns = mapping.resolve(header)?;
        log::debug!(
            "{} of {} mapped headers present in the sheet",
            columns.len(),
            mapping.len()
        );

        log::info!(
            "Importing {} rows from '{}' into project {}{}",
            rows.len(),
            sheet.name,
            options.project_id,
            if options.validate_only { " (validate only)" } else { "" }
        );

        let mut report = ImportReport {
            total_rows: rows.len(),
            ..Default::default()
        };
        let mut ledger = DryRunLedger::new();

        for (i, row) in rows.iter().enumerate() {
            let row_number = first_row + i;
            let outcome = self.import_row(row, &columns, options, &mut ledger);
            match outcome {
                Ok(id) => {
                    report.successful_rows += 1;
                    report.created_item_ids.extend(id);
                }
                Err(failure) => {
                    log::debug!("Row {row_number}: {}", failure.message);
                    report.errors.push(RowError {
                        row: row_number,
                        column: failure.column,
                        kind: failure.kind,
                        message: failure.message,
                        data: row.clone(),
                    });
                }
            }
        }

        report.success = report.errors.is_empty();
        log::info!(
            "Import finished: {}/{} rows succeeded",
            report.successful_rows,
            report.total_rows
        );
        Ok(report)
    }

    /// Returns the created id, or `None` when only validating.
    fn import_row(
        &self,
        row: &[String],
        columns: &[MappedColumn],
        options: &ImportOptions,
        ledger: &mut DryRunLedger,
    ) -> Result<Option<Uuid>, RowFailure> {
        let header_of = |field: TargetField| {
            columns
                .iter()
                .find(|c| c.target == Target::Field(field))
                .map(|c| c.header.as_str())
        };

        let mut draft = RowDraft::default();
        for column in columns {
            let cell = row.get(column.index).map(String::as_str).unwrap_or_default();
            draft
                .apply(&column.target, cell)
                .map_err(|message| {
                    RowFailure::new(Some(&column.header), ErrorKind::InvalidNumber, message)
                })?;
        }

        let missing = |field: TargetField| {
            RowFailure::new(
                header_of(field),
                ErrorKind::MissingRequiredField,
                format!("missing required field: {}", field.name()),
            )
        };
        let part_number = draft
            .part_number
            .take()
            .ok_or_else(|| missing(TargetField::PartNumber))?;
        let description = draft
            .description
            .take()
            .ok_or_else(|| missing(TargetField::Description))?;
        let quantity = draft.quantity.ok_or_else(|| missing(TargetField::Quantity))?;
        let item_type = draft.item_type.ok_or_else(|| missing(TargetField::ItemType))?;

        let mut dto = NewBomNode::new(options.project_id, part_number, description, quantity, item_type);
        dto.procurement = draft.procurement;
        dto.inventory = draft.inventory;
        dto.custom_fields = draft.custom_fields;

        let parent_column = header_of(TargetField::ParentPartNumber);
        let mut pending_parent = None;
        if let Some(parent_pn) = &draft.parent_part_number {
            match (options.validate_only, ledger.get(parent_pn)) {
                (true, Some(parent_type)) => pending_parent = Some(*parent_type),
                _ => {
                    let parent = self
                        .service
                        .resolve_parent(options.project_id, parent_pn)
                        .map_err(|e| failure(e, parent_column, header_of))?;
                    dto.parent_id = Some(parent.id);
                }
            }
        }

        if !options.validate_only {
            let node = self
                .service
                .create_item(&dto)
                .map_err(|e| failure(e, parent_column, header_of))?;
            return Ok(Some(node.id));
        }

        if ledger.contains_key(&dto.part_number) {
            let err = BomError::DuplicatePartNumber {
                project_id: dto.project_id,
                part_number: dto.part_number.clone(),
            };
            return Err(failure(err.into(), parent_column, header_of));
        }
        if let Some(parent_type) = pending_parent {
            validate_child(parent_type, dto.item_type)
                .map_err(|e| failure(e.into(), parent_column, header_of))?;
        }
        self.service
            .validate_new_item(&dto)
            .map_err(|e| failure(e, parent_column, header_of))?;
        ledger.insert(dto.part_number, dto.item_type);
        Ok(None)
    }
}

/// Attribute a service error to the column most likely at fault.
fn failure<'a>(
    err: StoreError,
    parent_column: Option<&'a str>,
    header_of: impl Fn(TargetField) -> Option<&'a str>,
) -> RowFailure {
    let kind = err.kind();
    let column = match kind {
        ErrorKind::DuplicatePartNumber => header_of(TargetField::PartNumber),
        ErrorKind::ParentNotFound | ErrorKind::CrossProjectParent => parent_column,
        ErrorKind::InvalidHierarchy => header_of(TargetField::ItemType),
        ErrorKind::InvalidQuantity => header_of(TargetField::Quantity),
        _ => None,
    };
    RowFailure::new(column, kind, err.to_string())
}
