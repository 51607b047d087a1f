use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::path::MaterializedPath;

/// Position of an item in the three-tier assembly hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Assembly,
    Subassembly,
    Part,
}

impl ItemType {
    pub const ALL: [ItemType; 3] = [ItemType::Assembly, ItemType::Subassembly, ItemType::Part];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Assembly => "assembly",
            ItemType::Subassembly => "subassembly",
            ItemType::Part => "part",
        }
    }

    /// Human label used in exported sheets
    pub fn label(&self) -> &'static str {
        match self {
            ItemType::Assembly => "Assembly",
            ItemType::Subassembly => "Subassembly",
            ItemType::Part => "Part",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assembly" => Ok(ItemType::Assembly),
            "subassembly" => Ok(ItemType::Subassembly),
            "part" => Ok(ItemType::Part),
            _ => Err(format!("Unknown item type: {s}")),
        }
    }
}

/// Procurement progress. Any transition between values is accepted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProcurementStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Delayed,
}

impl ProcurementStatus {
    pub const ALL: [ProcurementStatus; 4] = [
        ProcurementStatus::Pending,
        ProcurementStatus::InProgress,
        ProcurementStatus::Completed,
        ProcurementStatus::Delayed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcurementStatus::Pending => "pending",
            ProcurementStatus::InProgress => "in_progress",
            ProcurementStatus::Completed => "completed",
            ProcurementStatus::Delayed => "delayed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProcurementStatus::Pending => "Pending",
            ProcurementStatus::InProgress => "In Progress",
            ProcurementStatus::Completed => "Completed",
            ProcurementStatus::Delayed => "Delayed",
        }
    }
}

impl fmt::Display for ProcurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcurementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcurementStatus::Pending),
            "in_progress" => Ok(ProcurementStatus::InProgress),
            "completed" => Ok(ProcurementStatus::Completed),
            "delayed" => Ok(ProcurementStatus::Delayed),
            _ => Err(format!("Unknown procurement status: {s}")),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    #[default]
    Active,
    Obsolete,
    Discontinued,
    Development,
    Prototype,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Active => "active",
            LifecycleStatus::Obsolete => "obsolete",
            LifecycleStatus::Discontinued => "discontinued",
            LifecycleStatus::Development => "development",
            LifecycleStatus::Prototype => "prototype",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LifecycleStatus::Active),
            "obsolete" => Ok(LifecycleStatus::Obsolete),
            "discontinued" => Ok(LifecycleStatus::Discontinued),
            "development" => Ok(LifecycleStatus::Development),
            "prototype" => Ok(LifecycleStatus::Prototype),
            _ => Err(format!("Unknown lifecycle status: {s}")),
        }
    }
}

/// Typed value of a user-defined field attached to a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CustomValue {
    String(String),
    Number(Decimal),
    Date(NaiveDate),
    Boolean(bool),
    Select(String),
}

impl CustomValue {
    pub fn field_type(&self) -> &'static str {
        match self {
            CustomValue::String(_) => "string",
            CustomValue::Number(_) => "number",
            CustomValue::Date(_) => "date",
            CustomValue::Boolean(_) => "boolean",
            CustomValue::Select(_) => "select",
        }
    }

    /// Rebuild a value from its stored `(field_type, field_value)` pair
    pub fn from_parts(field_type: &str, value: &str) -> Option<Self> {
        match field_type {
            "string" => Some(CustomValue::String(value.to_string())),
            "select" => Some(CustomValue::Select(value.to_string())),
            "number" => value.parse().ok().map(CustomValue::Number),
            "date" => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(CustomValue::Date),
            "boolean" => value.parse().ok().map(CustomValue::Boolean),
            _ => None,
        }
    }
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomValue::String(s) | CustomValue::Select(s) => f.write_str(s),
            CustomValue::Number(n) => write!(f, "{n}"),
            CustomValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CustomValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Commercial and logistics attributes of an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procurement {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_part_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer_part_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub unit_of_measure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_cost: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfq_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfq_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_time_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_delivery: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_date: Option<NaiveDate>,
    pub procurement_status: ProcurementStatus,
    pub lifecycle_status: LifecycleStatus,
    pub obsolete: bool,
    pub critical: bool,
}

impl Default for Procurement {
    fn default() -> Self {
        Self {
            supplier: None,
            supplier_part_number: None,
            manufacturer: None,
            manufacturer_part_number: None,
            revision: None,
            category: None,
            unit_of_measure: "pcs".to_string(),
            notes: None,
            estimated_cost: None,
            actual_cost: None,
            rfq_status: None,
            rfq_date: None,
            moq: None,
            lead_time_days: None,
            expected_delivery: None,
            received_date: None,
            procurement_status: ProcurementStatus::default(),
            lifecycle_status: LifecycleStatus::default(),
            obsolete: false,
            critical: false,
        }
    }
}

impl Procurement {
    /// Actual cost when known, otherwise the estimate
    pub fn unit_cost(&self) -> Option<Decimal> {
        self.actual_cost.or(self.estimated_cost)
    }
}

/// Stock bookkeeping for an item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub stock_quantity: u32,
    pub reorder_point: u32,
    pub safety_stock: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_location: Option<String>,
}

/// One row of a bill of materials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomNode {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub part_number: String,
    pub description: String,
    pub quantity: u32,
    pub item_type: ItemType,
    pub level: u32,
    pub path: MaterializedPath,
    #[serde(flatten)]
    pub procurement: Procurement,
    #[serde(flatten)]
    pub inventory: Inventory,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_fields: BTreeMap<String, CustomValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BomNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Creation request for a node. Path, level and id are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBomNode {
    pub project_id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub part_number: String,
    pub description: String,
    pub quantity: u32,
    pub item_type: ItemType,
    #[serde(flatten, default)]
    pub procurement: Procurement,
    #[serde(flatten, default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, CustomValue>,
}

impl NewBomNode {
    pub fn new(
        project_id: Uuid,
        part_number: impl Into<String>,
        description: impl Into<String>,
        quantity: u32,
        item_type: ItemType,
    ) -> Self {
        Self {
            project_id,
            parent_id: None,
            part_number: part_number.into(),
            description: description.into(),
            quantity,
            item_type,
            procurement: Procurement::default(),
            inventory: Inventory::default(),
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial update; only `Some` fields are written. Nullable attributes are
/// doubly optional: `Some(None)` (a JSON `null`) clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BomNodePatch {
    pub part_number: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub item_type: Option<ItemType>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub supplier_part_number: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub manufacturer_part_number: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub revision: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    pub unit_of_measure: Option<String>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<Option<Decimal>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub actual_cost: Option<Option<Decimal>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub rfq_status: Option<Option<String>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub rfq_date: Option<Option<NaiveDate>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub moq: Option<Option<u32>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub lead_time_days: Option<Option<u32>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub expected_delivery: Option<Option<NaiveDate>>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub received_date: Option<Option<NaiveDate>>,
    pub procurement_status: Option<ProcurementStatus>,
    pub lifecycle_status: Option<LifecycleStatus>,
    pub obsolete: Option<bool>,
    pub critical: Option<bool>,
    pub stock_quantity: Option<u32>,
    pub reorder_point: Option<u32>,
    pub safety_stock: Option<u32>,
    #[serde(deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub inventory_location: Option<Option<String>>,
}

/// Keeps an explicit `null` apart from a missing key.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl BomNodePatch {
    pub fn is_empty(&self) -> bool {
        *self == BomNodePatch::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub budget: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub budget: Option<Decimal>,
}
