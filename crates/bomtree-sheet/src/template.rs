use crate::codec::Sheet;
use crate::field::TargetField;
use crate::mapping::ColumnMapping;

const TEMPLATE_FIELDS: [TargetField; 12] = [
    TargetField::PartNumber,
    TargetField::Description,
    TargetField::Quantity,
    TargetField::ItemType,
    TargetField::ParentPartNumber,
    TargetField::EstimatedCost,
    TargetField::RfqStatus,
    TargetField::RfqDate,
    TargetField::Moq,
    TargetField::ExpectedDelivery,
    TargetField::Obsolete,
    TargetField::ProcurementStatus,
];

const EXAMPLE_ROWS: [[&str; 12]; 2] = [
    [
        "ASM-001",
        "Main Assembly",
        "1",
        "Assembly",
        "",
        "1500",
        "Sent",
        "2024-01-15",
        "1",
        "2024-03-15",
        "No",
        "In Progress",
    ],
    [
        "SUB-001",
        "Head Subassembly",
        "1",
        "Subassembly",
        "ASM-001",
        "800",
        "Received",
        "",
        "1",
        "2024-02-28",
        "No",
        "Completed",
    ],
];

fn template_header(field: TargetField) -> String {
    if field.is_required() {
        format!("{} *", field.label())
    } else {
        field.label().to_string()
    }
}

/// Import template: required columns marked with `*`, plus two example rows.
pub fn template_sheet() -> Sheet {
    let mut sheet = Sheet::new(
        "BOM Template",
        TEMPLATE_FIELDS.into_iter().map(template_header).collect(),
    );
    for row in EXAMPLE_ROWS {
        sheet.push_row(row.map(String::from).to_vec());
    }
    sheet
}

/// Mapping matching the headers of [`template_sheet`].
pub fn template_mapping() -> ColumnMapping {
    TEMPLATE_FIELDS
        .into_iter()
        .map(|f| (template_header(f), f.name().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_headers() {
        let sheet = template_sheet();
        let header = sheet.header().unwrap();
        assert_eq!(header[0], "Part Number *");
        assert_eq!(header[4], "Parent Part Number");
        assert_eq!(sheet.body().len(), 2);
        assert!(sheet.body().iter().all(|r| r.len() == header.len()));
    }

    #[test]
    fn test_auto_mapping_matches_template_mapping() {
        let sheet = template_sheet();
        let header = sheet.header().unwrap();
        assert_eq!(ColumnMapping::auto(header), template_mapping());
    }
}
