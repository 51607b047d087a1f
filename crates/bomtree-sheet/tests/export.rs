use bomtree_core::{
    BomNode, CustomValue, FilterCriteria, ItemType, NewBomNode, NewProject, ProcurementStatus,
    Project,
};
use bomtree_sheet::{
    ExportOptions, Exporter, ImportOptions, Importer, Sheet, template_mapping, template_sheet,
};
use bomtree_store::{BomService, Database, ProjectRepository};
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn project(db: &Database, name: &str) -> Project {
    ProjectRepository::new(db)
        .create(&NewProject {
            name: name.into(),
            ..Default::default()
        })
        .unwrap()
}

/// ASM-1 > (SUB-1 x2 > PRT-1 x5), PRT-2 x3
fn seed(db: &Database, project: &Project) -> Vec<BomNode> {
    let service = BomService::new(db);
    let mut asm = NewBomNode::new(project.id, "ASM-1", "Frame", 1, ItemType::Assembly);
    asm.procurement.procurement_status = ProcurementStatus::Completed;
    asm.procurement.estimated_cost = Some(dec!(100));
    asm.procurement.actual_cost = Some(dec!(110));
    let asm = service.create_item(&asm).unwrap();

    let mut sub = NewBomNode::new(project.id, "SUB-1", "Head", 2, ItemType::Subassembly)
        .with_parent(asm.id);
    sub.procurement.procurement_status = ProcurementStatus::InProgress;
    let sub = service.create_item(&sub).unwrap();

    let mut prt1 = NewBomNode::new(project.id, "PRT-1", "Bolt, M4", 5, ItemType::Part)
        .with_parent(sub.id);
    prt1.procurement.procurement_status = ProcurementStatus::Delayed;
    prt1.procurement.estimated_cost = Some(dec!(2.5));
    prt1.procurement.critical = true;
    prt1.custom_fields
        .insert("Color".into(), CustomValue::String("red".into()));
    let prt1 = service.create_item(&prt1).unwrap();

    let mut prt2 =
        NewBomNode::new(project.id, "PRT-2", "Nut", 3, ItemType::Part).with_parent(asm.id);
    prt2.procurement.estimated_cost = Some(dec!(1.25));
    prt2.procurement.obsolete = true;
    let prt2 = service.create_item(&prt2).unwrap();

    vec![asm, sub, prt1, prt2]
}

/// Keep only the named columns, in the given order.
fn select(sheet: &Sheet, columns: &[&str]) -> String {
    let header = sheet.header().unwrap();
    let indices: Vec<usize> = columns
        .iter()
        .map(|c| header.iter().position(|h| h == c).unwrap())
        .collect();
    let mut out = Sheet::new(
        "selection",
        columns.iter().map(|c| c.to_string()).collect(),
    );
    for row in sheet.body() {
        out.push_row(indices.iter().map(|i| row[*i].clone()).collect());
    }
    out.to_csv_string().unwrap()
}

#[test]
fn export_indents_by_level_and_adds_custom_columns() {
    let db = Database::open_in_memory().unwrap();
    let project = project(&db, "Export");
    seed(&db, &project);

    let options = ExportOptions {
        include_hierarchy: true,
        include_custom_fields: true,
        filters: None,
    };
    let sheet = Exporter::new(BomService::new(&db))
        .export_bom(project.id, &options)
        .unwrap();

    let csv = select(
        &sheet,
        &[
            "Level",
            "Path",
            "Part Number",
            "Type",
            "Quantity",
            "Parent Part Number",
            "Obsolete",
            "CF: Color",
        ],
    );
    insta::assert_snapshot!(csv, @r#"
    Level,Path,Part Number,Type,Quantity,Parent Part Number,Obsolete,CF: Color
    0,1,ASM-1,Assembly,1,,No,
    1,1.1,  SUB-1,Subassembly,2,ASM-1,No,
    2,1.1.1,    PRT-1,Part,5,SUB-1,No,red
    1,1.2,  PRT-2,Part,3,ASM-1,Yes,
    "#);
}

#[test]
fn export_without_options_has_no_custom_columns() {
    let db = Database::open_in_memory().unwrap();
    let project = project(&db, "Export");
    seed(&db, &project);

    let sheet = Exporter::new(BomService::new(&db))
        .export_bom(project.id, &ExportOptions::default())
        .unwrap();
    let header = sheet.header().unwrap();
    assert!(!header.iter().any(|h| h.starts_with("CF: ")));
    assert_eq!(sheet.body().len(), 4);
    assert_eq!(sheet.body()[2][2], "PRT-1");
}

#[test]
fn filtered_export_keeps_orphans() {
    let db = Database::open_in_memory().unwrap();
    let project = project(&db, "Export");
    seed(&db, &project);

    let options = ExportOptions {
        filters: Some(FilterCriteria {
            item_type: Some(ItemType::Part),
            ..Default::default()
        }),
        ..Default::default()
    };
    let sheet = Exporter::new(BomService::new(&db))
        .export_bom(project.id, &options)
        .unwrap();
    insta::assert_snapshot!(select(&sheet, &["Path", "Part Number", "Parent Part Number"]), @r"
    Path,Part Number,Parent Part Number
    1.1.1,PRT-1,SUB-1
    1.2,PRT-2,ASM-1
    ");
}

#[test]
fn filtered_export_stays_in_path_order_when_a_middle_node_is_dropped() {
    let db = Database::open_in_memory().unwrap();
    let project = project(&db, "Export");
    let service = BomService::new(&db);
    let asm = service
        .create_item(&NewBomNode::new(project.id, "X-ASM", "Frame", 1, ItemType::Assembly))
        .unwrap();
    let sub = service
        .create_item(
            &NewBomNode::new(project.id, "SUB", "Head", 1, ItemType::Subassembly)
                .with_parent(asm.id),
        )
        .unwrap();
    service
        .create_item(&NewBomNode::new(project.id, "X-P1", "Bolt", 2, ItemType::Part).with_parent(sub.id))
        .unwrap();
    service
        .create_item(&NewBomNode::new(project.id, "X-P2", "Nut", 3, ItemType::Part).with_parent(asm.id))
        .unwrap();

    let options = ExportOptions {
        filters: Some(FilterCriteria {
            part_number: Some("x-".into()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let sheet = Exporter::new(service).export_bom(project.id, &options).unwrap();
    insta::assert_snapshot!(select(&sheet, &["Path", "Part Number", "Parent Part Number"]), @r"
    Path,Part Number,Parent Part Number
    1,X-ASM,
    1.1.1,X-P1,SUB
    1.2,X-P2,X-ASM
    ");
}

#[test]
fn kpi_export() {
    let db = Database::open_in_memory().unwrap();
    let project = project(&db, "Export");
    seed(&db, &project);

    let sheet = Exporter::new(BomService::new(&db))
        .export_kpi(project.id)
        .unwrap();
    insta::assert_snapshot!(sheet.to_csv_string().unwrap(), @r"
    Metric,Value
    Total Items,4
    Pending,1
    In Progress,1
    Completed,1
    Delayed,1
    Obsolete,1
    Critical,1
    Estimated Cost,103.75
    Actual Cost,110.00
    Variance,6.25
    Completion %,25.0
    ");
}

#[test]
fn part_summary_export_multiplies_quantities() {
    let db = Database::open_in_memory().unwrap();
    let project = project(&db, "Export");
    seed(&db, &project);

    let sheet = Exporter::new(BomService::new(&db))
        .export_part_summary(project.id)
        .unwrap();
    let csv = select(&sheet, &["Part Number", "Total Quantity", "Unit Cost", "Total Cost"]);
    insta::assert_snapshot!(csv, @r"
    Part Number,Total Quantity,Unit Cost,Total Cost
    ASM-1,1,110.00,110.00
    PRT-1,10,2.50,25.00
    PRT-2,3,1.25,3.75
    SUB-1,2,,
    ");
}

#[test]
fn export_reimports_into_an_identical_tree() {
    let db = Database::open_in_memory().unwrap();
    let source = project(&db, "Source");
    let seeded = seed(&db, &source);
    let target = project(&db, "Target");

    let service = BomService::new(&db);
    let typed = [
        ("Torque", CustomValue::Number(dec!(4.50))),
        ("Inspected", CustomValue::Boolean(true)),
        ("Approved", CustomValue::Date(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())),
    ];
    for (name, value) in &typed {
        service.set_custom_field(seeded[2].id, name, value).unwrap();
    }
    let original = service.get_flat_bom(source.id).unwrap();
    let options = ExportOptions {
        include_hierarchy: true,
        include_custom_fields: true,
        filters: None,
    };
    let csv = Exporter::new(service)
        .export_bom(source.id, &options)
        .unwrap()
        .to_csv_string()
        .unwrap();

    let sheet = Sheet::from_csv_str("roundtrip", &csv).unwrap();
    let report = Importer::new(service)
        .import(&sheet, &ImportOptions::new(target.id))
        .unwrap();
    assert!(report.success, "{:?}", report.errors);
    assert_eq!(report.created_item_ids.len(), original.len());

    let copy = service.get_flat_bom(target.id).unwrap();
    for node in &original {
        let twin = copy
            .iter()
            .find(|n| n.part_number == node.part_number)
            .unwrap();
        assert_eq!(twin.path, node.path);
        assert_eq!(twin.level, node.level);
        assert_eq!(twin.quantity, node.quantity);
        assert_eq!(twin.item_type, node.item_type);
        assert_eq!(twin.procurement, node.procurement);
        assert_eq!(twin.custom_fields, node.custom_fields);
    }
    assert_eq!(
        service.recalculate_quantities(target.id).unwrap(),
        service.recalculate_quantities(source.id).unwrap()
    );
}

#[test]
fn template_imports_with_its_own_mapping() {
    let db = Database::open_in_memory().unwrap();
    let project = project(&db, "Template");
    let service = BomService::new(&db);

    let mut options = ImportOptions::new(project.id);
    options.mapping = Some(template_mapping());
    let report = Importer::new(service)
        .import(&template_sheet(), &options)
        .unwrap();
    assert!(report.success, "{:?}", report.errors);

    let sub = service
        .find_by_part_number(project.id, "SUB-001")
        .unwrap()
        .unwrap();
    assert_eq!(sub.path.to_string(), "1.1");
    assert_eq!(sub.procurement.procurement_status, ProcurementStatus::Completed);
    assert_eq!(sub.procurement.estimated_cost, Some(dec!(800)));
}
