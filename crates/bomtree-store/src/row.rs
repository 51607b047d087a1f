//! Column encoding for `bom_items` and `projects`.
//!
//! Dates are stored as `YYYY-MM-DD`, timestamps as RFC 3339, decimals and
//! ids as text, flags as 0/1.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use bomtree_core::{
    BomNode, CustomValue, Inventory, MaterializedPath, Procurement, Project,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::{Type, Value};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("cannot decode column {column}: {value:?}")]
pub struct DecodeError {
    column: String,
    value: String,
}

fn decode_failure(row: &Row<'_>, column: &str, value: &str) -> rusqlite::Error {
    let idx = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        Box::new(DecodeError {
            column: column.to_string(),
            value: value.to_string(),
        }),
    )
}

fn parsed<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|_| decode_failure(row, column, &raw))
}

fn parsed_opt<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = row.get(column)?;
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| decode_failure(row, column, &s)),
    }
}

fn date_opt(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| decode_failure(row, column, &s)),
    }
}

fn timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| decode_failure(row, column, &raw))
}

fn count(row: &Row<'_>, column: &str) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(column)?;
    u32::try_from(raw).map_err(|_| decode_failure(row, column, &raw.to_string()))
}

fn count_opt(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<u32>> {
    let raw: Option<i64> = row.get(column)?;
    raw.map(|v| u32::try_from(v).map_err(|_| decode_failure(row, column, &v.to_string())))
        .transpose()
}

/// Decode a `SELECT * FROM bom_items` row. Custom fields are attached separately.
pub(crate) fn node_from_row(row: &Row<'_>) -> rusqlite::Result<BomNode> {
    let procurement = Procurement {
        supplier: row.get("supplier")?,
        supplier_part_number: row.get("supplier_part_number")?,
        manufacturer: row.get("manufacturer")?,
        manufacturer_part_number: row.get("manufacturer_part_number")?,
        revision: row.get("revision")?,
        category: row.get("category")?,
        unit_of_measure: row.get("unit_of_measure")?,
        notes: row.get("notes")?,
        estimated_cost: parsed_opt::<Decimal>(row, "estimated_cost")?,
        actual_cost: parsed_opt::<Decimal>(row, "actual_cost")?,
        rfq_status: row.get("rfq_status")?,
        rfq_date: date_opt(row, "rfq_date")?,
        moq: count_opt(row, "moq")?,
        lead_time_days: count_opt(row, "lead_time_days")?,
        expected_delivery: date_opt(row, "expected_delivery")?,
        received_date: date_opt(row, "received_date")?,
        procurement_status: parsed(row, "procurement_status")?,
        lifecycle_status: parsed(row, "lifecycle_status")?,
        obsolete: row.get("obsolete")?,
        critical: row.get("critical")?,
    };
    let inventory = Inventory {
        stock_quantity: count(row, "stock_quantity")?,
        reorder_point: count(row, "reorder_point")?,
        safety_stock: count(row, "safety_stock")?,
        inventory_location: row.get("inventory_location")?,
    };

    Ok(BomNode {
        id: parsed(row, "id")?,
        project_id: parsed(row, "project_id")?,
        parent_id: parsed_opt::<Uuid>(row, "parent_id")?,
        part_number: row.get("part_number")?,
        description: row.get("description")?,
        quantity: count(row, "quantity")?,
        item_type: parsed(row, "item_type")?,
        level: count(row, "level")?,
        path: parsed::<MaterializedPath>(row, "path")?,
        procurement,
        inventory,
        custom_fields: BTreeMap::new(),
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

/// Decode a `(bom_item_id, field_name, field_type, field_value)` row.
pub(crate) fn custom_field_from_row(
    row: &Row<'_>,
) -> rusqlite::Result<(Uuid, String, CustomValue)> {
    let item: Uuid = parsed(row, "bom_item_id")?;
    let name: String = row.get("field_name")?;
    let field_type: String = row.get("field_type")?;
    let raw: String = row.get("field_value")?;
    let value = CustomValue::from_parts(&field_type, &raw)
        .ok_or_else(|| decode_failure(row, "field_value", &raw))?;
    Ok((item, name, value))
}

pub(crate) fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: parsed(row, "id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        budget: parsed_opt::<Decimal>(row, "budget")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

pub(crate) fn encode_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn encode_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn text(v: impl ToString) -> Value {
    Value::Text(v.to_string())
}

pub(crate) fn opt_text<T: ToString>(v: Option<T>) -> Value {
    v.map_or(Value::Null, text)
}

pub(crate) fn opt_date(v: Option<NaiveDate>) -> Value {
    v.map_or(Value::Null, |d| Value::Text(encode_date(&d)))
}

pub(crate) fn int(v: u32) -> Value {
    Value::Integer(i64::from(v))
}

pub(crate) fn opt_int(v: Option<u32>) -> Value {
    v.map_or(Value::Null, int)
}

pub(crate) fn flag(v: bool) -> Value {
    Value::Integer(i64::from(v))
}
