//! Import target fields and per-field typed coercion.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bomtree_core::{
    CustomValue, Inventory, ItemType, LifecycleStatus, ProcurementStatus, Procurement,
};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

/// Every BOM attribute a spreadsheet column may be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetField {
    PartNumber,
    Description,
    Quantity,
    ItemType,
    ParentPartNumber,
    Supplier,
    SupplierPartNumber,
    Manufacturer,
    ManufacturerPartNumber,
    Revision,
    Category,
    UnitOfMeasure,
    Notes,
    EstimatedCost,
    ActualCost,
    RfqStatus,
    RfqDate,
    Moq,
    LeadTimeDays,
    ExpectedDelivery,
    ReceivedDate,
    ProcurementStatus,
    LifecycleStatus,
    Obsolete,
    Critical,
    StockQuantity,
    ReorderPoint,
    SafetyStock,
    InventoryLocation,
}

impl TargetField {
    pub const ALL: [TargetField; 29] = [
        TargetField::PartNumber,
        TargetField::Description,
        TargetField::Quantity,
        TargetField::ItemType,
        TargetField::ParentPartNumber,
        TargetField::Supplier,
        TargetField::SupplierPartNumber,
        TargetField::Manufacturer,
        TargetField::ManufacturerPartNumber,
        TargetField::Revision,
        TargetField::Category,
        TargetField::UnitOfMeasure,
        TargetField::Notes,
        TargetField::EstimatedCost,
        TargetField::ActualCost,
        TargetField::RfqStatus,
        TargetField::RfqDate,
        TargetField::Moq,
        TargetField::LeadTimeDays,
        TargetField::ExpectedDelivery,
        TargetField::ReceivedDate,
        TargetField::ProcurementStatus,
        TargetField::LifecycleStatus,
        TargetField::Obsolete,
        TargetField::Critical,
        TargetField::StockQuantity,
        TargetField::ReorderPoint,
        TargetField::SafetyStock,
        TargetField::InventoryLocation,
    ];

    /// Fields every imported row must carry.
    pub const REQUIRED: [TargetField; 4] = [
        TargetField::PartNumber,
        TargetField::Description,
        TargetField::Quantity,
        TargetField::ItemType,
    ];

    /// Name used in column mappings.
    pub fn name(&self) -> &'static str {
        match self {
            TargetField::PartNumber => "partNumber",
            TargetField::Description => "description",
            TargetField::Quantity => "quantity",
            TargetField::ItemType => "itemType",
            TargetField::ParentPartNumber => "parentPartNumber",
            TargetField::Supplier => "supplier",
            TargetField::SupplierPartNumber => "supplierPartNumber",
            TargetField::Manufacturer => "manufacturer",
            TargetField::ManufacturerPartNumber => "manufacturerPartNumber",
            TargetField::Revision => "revision",
            TargetField::Category => "category",
            TargetField::UnitOfMeasure => "unitOfMeasure",
            TargetField::Notes => "notes",
            TargetField::EstimatedCost => "estimatedCost",
            TargetField::ActualCost => "actualCost",
            TargetField::RfqStatus => "rfqStatus",
            TargetField::RfqDate => "rfqDate",
            TargetField::Moq => "moq",
            TargetField::LeadTimeDays => "leadTimeDays",
            TargetField::ExpectedDelivery => "expectedDelivery",
            TargetField::ReceivedDate => "receivedDate",
            TargetField::ProcurementStatus => "procurementStatus",
            TargetField::LifecycleStatus => "lifecycleStatus",
            TargetField::Obsolete => "obsolete",
            TargetField::Critical => "critical",
            TargetField::StockQuantity => "stockQuantity",
            TargetField::ReorderPoint => "reorderPoint",
            TargetField::SafetyStock => "safetyStock",
            TargetField::InventoryLocation => "inventoryLocation",
        }
    }

    /// Column header used by exports and templates.
    pub fn label(&self) -> &'static str {
        match self {
            TargetField::PartNumber => "Part Number",
            TargetField::Description => "Description",
            TargetField::Quantity => "Quantity",
            TargetField::ItemType => "Type",
            TargetField::ParentPartNumber => "Parent Part Number",
            TargetField::Supplier => "Supplier",
            TargetField::SupplierPartNumber => "Supplier Part Number",
            TargetField::Manufacturer => "Manufacturer",
            TargetField::ManufacturerPartNumber => "Manufacturer Part Number",
            TargetField::Revision => "Revision",
            TargetField::Category => "Category",
            TargetField::UnitOfMeasure => "Unit of Measure",
            TargetField::Notes => "Notes",
            TargetField::EstimatedCost => "Estimated Cost",
            TargetField::ActualCost => "Actual Cost",
            TargetField::RfqStatus => "RFQ Status",
            TargetField::RfqDate => "RFQ Date",
            TargetField::Moq => "MOQ",
            TargetField::LeadTimeDays => "Lead Time (days)",
            TargetField::ExpectedDelivery => "Expected Delivery",
            TargetField::ReceivedDate => "Received Date",
            TargetField::ProcurementStatus => "Procurement Status",
            TargetField::LifecycleStatus => "Lifecycle Status",
            TargetField::Obsolete => "Obsolete",
            TargetField::Critical => "Critical",
            TargetField::StockQuantity => "Stock Quantity",
            TargetField::ReorderPoint => "Reorder Point",
            TargetField::SafetyStock => "Safety Stock",
            TargetField::InventoryLocation => "Inventory Location",
        }
    }

    /// Headers found in legacy Italian workbooks.
    pub fn legacy_labels(&self) -> &'static [&'static str] {
        match self {
            TargetField::PartNumber => &["Codice", "Codice Parte"],
            TargetField::Description => &["Descrizione"],
            TargetField::Quantity => &["Quantità", "Qtà"],
            TargetField::ItemType => &["Tipo", "Item Type"],
            TargetField::ParentPartNumber => &["Codice Padre", "Parent"],
            TargetField::Supplier => &["Fornitore"],
            TargetField::Manufacturer => &["Produttore"],
            TargetField::EstimatedCost => &["Costo Stimato"],
            TargetField::ActualCost => &["Costo Effettivo"],
            TargetField::RfqDate => &["Data RFQ"],
            TargetField::ExpectedDelivery => &["Data Consegna"],
            TargetField::ReceivedDate => &["Data Ricevimento"],
            TargetField::ProcurementStatus => &["Stato Evasione"],
            TargetField::Obsolete => &["Obsoleto"],
            TargetField::Critical => &["Critico"],
            TargetField::StockQuantity => &["Giacenza"],
            TargetField::ReorderPoint => &["Punto di Riordino"],
            TargetField::SafetyStock => &["Scorta di Sicurezza"],
            TargetField::InventoryLocation => &["Ubicazione"],
            TargetField::Notes => &["Note"],
            _ => &[],
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for TargetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TargetField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown target field '{s}'"))
    }
}

pub const CUSTOM_PREFIX: &str = "cf:";

/// Where a mapped column's value lands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    Field(TargetField),
    Custom(String),
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix(CUSTOM_PREFIX) {
            Some(name) if !name.trim().is_empty() => Ok(Target::Custom(name.trim().to_string())),
            Some(_) => Err(format!("custom field target '{s}' has no name")),
            None => s.parse().map(Target::Field),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Field(field) => f.write_str(field.name()),
            Target::Custom(name) => write!(f, "{CUSTOM_PREFIX}{name}"),
        }
    }
}

const TRUE_TOKENS: [&str; 6] = ["true", "1", "sì", "si", "yes", "y"];

/// Recognised truthy tokens; anything else is false.
pub fn parse_bool(raw: &str) -> bool {
    let token = raw.trim().to_lowercase();
    TRUE_TOKENS.contains(&token.as_str())
}

/// Lenient item type: unknown tokens become `part`.
pub fn parse_item_type(raw: &str) -> ItemType {
    match raw.trim().to_lowercase().as_str() {
        "assieme" | "assembly" | "asm" => ItemType::Assembly,
        "sottoassieme" | "subassembly" | "sub" => ItemType::Subassembly,
        "parte" | "part" | "prt" => ItemType::Part,
        other => {
            log::warn!("Unrecognised item type '{other}', treating as part");
            ItemType::Part
        }
    }
}

/// Lenient procurement status: unknown tokens become `pending`.
pub fn parse_procurement_status(raw: &str) -> ProcurementStatus {
    match raw.trim().to_lowercase().as_str() {
        "in attesa" | "pending" => ProcurementStatus::Pending,
        "in corso" | "in progress" | "in_progress" => ProcurementStatus::InProgress,
        "completato" | "completed" => ProcurementStatus::Completed,
        "in ritardo" | "delayed" => ProcurementStatus::Delayed,
        other => {
            log::warn!("Unrecognised procurement status '{other}', treating as pending");
            ProcurementStatus::Pending
        }
    }
}

pub fn parse_lifecycle_status(raw: &str) -> LifecycleStatus {
    match raw.trim().to_lowercase().as_str() {
        "active" | "attivo" => LifecycleStatus::Active,
        "obsolete" | "obsoleto" => LifecycleStatus::Obsolete,
        "discontinued" | "fuori produzione" => LifecycleStatus::Discontinued,
        "development" | "sviluppo" | "in sviluppo" => LifecycleStatus::Development,
        "prototype" | "prototipo" => LifecycleStatus::Prototype,
        other => {
            log::warn!("Unrecognised lifecycle status '{other}', treating as active");
            LifecycleStatus::Active
        }
    }
}

/// Decimal tolerant of currency symbols, spaces and a decimal comma.
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '£' | ' ' | '\u{a0}' | '\''))
        .collect();
    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // 1.234,56
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        // 1,234.56
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };
    Decimal::from_str(&normalized).ok()
}

/// Non-negative whole number; `5.0` is accepted.
pub fn parse_count(raw: &str) -> Option<u32> {
    let value = parse_decimal(raw)?;
    if value.is_sign_negative() || !value.fract().is_zero() {
        return None;
    }
    u32::try_from(value.trunc().mantissa() / 10i128.pow(value.scale())).ok()
}

/// Typed custom value from a cell. Only the forms an export writes are
/// recognised (`true`/`false`, `YYYY-MM-DD`, plain decimals) and a number
/// must print back unchanged, so `007` or `1,5` stay strings.
pub fn infer_custom_value(raw: &str) -> CustomValue {
    let value = raw.trim();
    ["boolean", "date", "number"]
        .into_iter()
        .filter_map(|kind| CustomValue::from_parts(kind, value))
        .find(|typed| typed.to_string() == value)
        .unwrap_or_else(|| CustomValue::String(value.to_string()))
}

/// Days since 1899-12-30, the spreadsheet date epoch.
fn from_serial(serial: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(u64::from(serial)))
}

/// Permissive date parsing; `None` when nothing fits.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.date());
        }
    }
    // whole-day serials between 1900 and 9999
    match parse_decimal(s) {
        Some(n) if n >= Decimal::ONE && n < Decimal::from(2_958_466) => {
            u32::try_from(n.trunc().mantissa() / 10i128.pow(n.scale()))
                .ok()
                .and_then(from_serial)
        }
        _ => None,
    }
}

/// A row coerced into typed values, before required-field checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowDraft {
    pub part_number: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<u32>,
    pub item_type: Option<ItemType>,
    pub parent_part_number: Option<String>,
    pub procurement: Procurement,
    pub inventory: Inventory,
    pub custom_fields: BTreeMap<String, CustomValue>,
}

impl RowDraft {
    /// Coerce one non-empty cell into its target.
    ///
    /// Only numeric fields can fail; lenient fields fall back to defaults and
    /// unparseable dates are dropped.
    pub fn apply(&mut self, target: &Target, raw: &str) -> Result<(), String> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(());
        }
        let text = || Some(value.to_string());
        let count = |what: &str| {
            parse_count(value).ok_or_else(|| format!("{what} must be a whole number, got '{value}'"))
        };
        let decimal = |what: &str| {
            parse_decimal(value).ok_or_else(|| format!("{what} must be a number, got '{value}'"))
        };
        let date = || {
            let parsed = parse_date(value);
            if parsed.is_none() {
                log::warn!("Ignoring unparseable date '{value}'");
            }
            parsed
        };

        let field = match target {
            Target::Custom(name) => {
                self.custom_fields
                    .insert(name.clone(), infer_custom_value(value));
                return Ok(());
            }
            Target::Field(field) => *field,
        };

        let p = &mut self.procurement;
        let inv = &mut self.inventory;
        match field {
            TargetField::PartNumber => self.part_number = text(),
            TargetField::Description => self.description = text(),
            TargetField::Quantity => {
                let q = count("quantity")?;
                if q == 0 {
                    return Err("quantity must be a positive integer, got 0".to_string());
                }
                self.quantity = Some(q);
            }
            TargetField::ItemType => self.item_type = Some(parse_item_type(value)),
            TargetField::ParentPartNumber => self.parent_part_number = text(),
            TargetField::Supplier => p.supplier = text(),
            TargetField::SupplierPartNumber => p.supplier_part_number = text(),
            TargetField::Manufacturer => p.manufacturer = text(),
            TargetField::ManufacturerPartNumber => p.manufacturer_part_number = text(),
            TargetField::Revision => p.revision = text(),
            TargetField::Category => p.category = text(),
            TargetField::UnitOfMeasure => p.unit_of_measure = value.to_string(),
            TargetField::Notes => p.notes = text(),
            TargetField::EstimatedCost => p.estimated_cost = Some(decimal("estimated cost")?),
            TargetField::ActualCost => p.actual_cost = Some(decimal("actual cost")?),
            TargetField::RfqStatus => p.rfq_status = text(),
            TargetField::RfqDate => p.rfq_date = date(),
            TargetField::Moq => p.moq = Some(count("MOQ")?),
            TargetField::LeadTimeDays => p.lead_time_days = Some(count("lead time")?),
            TargetField::ExpectedDelivery => p.expected_delivery = date(),
            TargetField::ReceivedDate => p.received_date = date(),
            TargetField::ProcurementStatus => {
                p.procurement_status = parse_procurement_status(value)
            }
            TargetField::LifecycleStatus => p.lifecycle_status = parse_lifecycle_status(value),
            TargetField::Obsolete => p.obsolete = parse_bool(value),
            TargetField::Critical => p.critical = parse_bool(value),
            TargetField::StockQuantity => inv.stock_quantity = count("stock quantity")?,
            TargetField::ReorderPoint => inv.reorder_point = count("reorder point")?,
            TargetField::SafetyStock => inv.safety_stock = count("safety stock")?,
            TargetField::InventoryLocation => inv.inventory_location = text(),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_target_parse() {
        assert_eq!(
            "partNumber".parse::<Target>(),
            Ok(Target::Field(TargetField::PartNumber))
        );
        assert_eq!(
            "cf:Color".parse::<Target>(),
            Ok(Target::Custom("Color".into()))
        );
        assert!("cf:".parse::<Target>().is_err());
        assert!("part_number".parse::<Target>().is_err());
        for field in TargetField::ALL {
            assert_eq!(field.name().parse::<TargetField>(), Ok(field));
        }
    }

    #[test]
    fn test_synonyms_are_case_insensitive() {
        assert_eq!(parse_item_type("Assieme"), ItemType::Assembly);
        assert_eq!(parse_item_type(" asm "), ItemType::Assembly);
        assert_eq!(parse_item_type("SUB"), ItemType::Subassembly);
        assert_eq!(parse_item_type("Parte"), ItemType::Part);
        assert_eq!(parse_item_type("widget"), ItemType::Part);

        assert_eq!(parse_procurement_status("In Corso"), ProcurementStatus::InProgress);
        assert_eq!(parse_procurement_status("DELAYED"), ProcurementStatus::Delayed);
        assert_eq!(parse_procurement_status("who knows"), ProcurementStatus::Pending);
    }

    #[test]
    fn test_bool_tokens() {
        for t in ["true", "1", "Sì", "si", "YES", "y"] {
            assert!(parse_bool(t), "{t}");
        }
        for f in ["false", "0", "no", "", "maybe"] {
            assert!(!parse_bool(f), "{f}");
        }
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_decimal("12.50"), Some(dec!(12.50)));
        assert_eq!(parse_decimal("€ 1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal("$1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_decimal("0,75"), Some(dec!(0.75)));
        assert_eq!(parse_decimal("abc"), None);

        assert_eq!(parse_count("5"), Some(5));
        assert_eq!(parse_count("5.0"), Some(5));
        assert_eq!(parse_count("5.5"), None);
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("ten"), None);
    }

    #[test]
    fn test_dates() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(parse_date("2024-03-15"), d);
        assert_eq!(parse_date("2024/03/15"), d);
        assert_eq!(parse_date("15/03/2024"), d);
        assert_eq!(parse_date("15-03-2024"), d);
        assert_eq!(parse_date("15.03.2024"), d);
        assert_eq!(parse_date("2024-03-15T10:30:00Z"), d);
        assert_eq!(parse_date("2024-03-15 10:30:00"), d);
        assert_eq!(parse_date("45366"), d);
        assert_eq!(parse_date("next week"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_draft_apply() {
        let mut draft = RowDraft::default();
        let f = |field| Target::Field(field);
        draft.apply(&f(TargetField::PartNumber), " PRT-1 ").unwrap();
        draft.apply(&f(TargetField::Quantity), "4").unwrap();
        draft.apply(&f(TargetField::ItemType), "Parte").unwrap();
        draft.apply(&f(TargetField::Obsolete), "Sì").unwrap();
        draft.apply(&f(TargetField::ExpectedDelivery), "not a date").unwrap();
        draft.apply(&f(TargetField::EstimatedCost), "€ 3,20").unwrap();
        draft.apply(&Target::Custom("Color".into()), "red").unwrap();
        draft.apply(&f(TargetField::Description), "   ").unwrap();

        assert_eq!(draft.part_number.as_deref(), Some("PRT-1"));
        assert_eq!(draft.quantity, Some(4));
        assert_eq!(draft.item_type, Some(ItemType::Part));
        assert!(draft.procurement.obsolete);
        assert_eq!(draft.procurement.expected_delivery, None);
        assert_eq!(draft.procurement.estimated_cost, Some(dec!(3.20)));
        assert_eq!(draft.description, None);
        assert_eq!(draft.custom_fields.len(), 1);

        assert_eq!(draft.custom_fields["Color"], CustomValue::String("red".into()));

        assert!(draft.apply(&f(TargetField::Quantity), "abc").is_err());
        assert!(draft.apply(&f(TargetField::Quantity), "0").is_err());
        assert!(draft.apply(&f(TargetField::Moq), "-3").is_err());
    }

    #[test]
    fn test_custom_values_keep_their_type() {
        assert_eq!(infer_custom_value("12.50"), CustomValue::Number(dec!(12.50)));
        assert_eq!(infer_custom_value("-3"), CustomValue::Number(dec!(-3)));
        assert_eq!(
            infer_custom_value("2024-03-15"),
            CustomValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
        assert_eq!(infer_custom_value("false"), CustomValue::Boolean(false));
        for text in ["red", "007", "1,5", "True", "15/03/2024", "45000.0.1"] {
            assert_eq!(infer_custom_value(text), CustomValue::String(text.into()), "{text}");
        }
    }
}
