use bomtree_core::{ErrorKind, ItemType, NewProject, ProcurementStatus, Project};
use bomtree_sheet::{ColumnMapping, ImportError, ImportOptions, Importer, Sheet};
use bomtree_store::{BomService, Database, ProjectRepository};

const HEADER: &str = "Part Number,Description,Quantity,Type,Parent Part Number\n";

fn setup() -> (Database, Project) {
    let db = Database::open_in_memory().unwrap();
    let project = ProjectRepository::new(&db)
        .create(&NewProject {
            name: "Import".into(),
            ..Default::default()
        })
        .unwrap();
    (db, project)
}

fn sheet(body: &str) -> Sheet {
    Sheet::from_csv_str("bom", &format!("{HEADER}{body}")).unwrap()
}

#[test]
fn top_down_rows_resolve_parents_from_earlier_rows() {
    let (db, project) = setup();
    let service = BomService::new(&db);
    let report = Importer::new(service)
        .import(
            &sheet("ASM-2,Top,1,Assembly,\nPRT-2,Bolt,4,Part,ASM-2\n"),
            &ImportOptions::new(project.id),
        )
        .unwrap();

    assert!(report.success);
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.successful_rows, 2);
    assert!(report.errors.is_empty());
    assert_eq!(report.created_item_ids.len(), 2);

    let part = service
        .find_by_part_number(project.id, "PRT-2")
        .unwrap()
        .unwrap();
    assert_eq!(part.path.to_string(), "1.1");
    assert_eq!(part.level, 1);
    assert_eq!(Some(part.id), report.created_item_ids.get(1).copied());
}

#[test]
fn child_before_parent_fails_only_that_row() {
    let (db, project) = setup();
    let report = Importer::new(BomService::new(&db))
        .import(
            &sheet("PRT-2,Bolt,4,Part,ASM-2\nASM-2,Top,1,Assembly,\n"),
            &ImportOptions::new(project.id),
        )
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.successful_rows, 1);
    assert_eq!(report.created_item_ids.len(), 1);
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.row, 2);
    assert_eq!(error.kind, ErrorKind::ParentNotFound);
    assert_eq!(error.column.as_deref(), Some("Parent Part Number"));
    assert_eq!(error.data[0], "PRT-2");
}

#[test]
fn one_malformed_row_does_not_stop_the_batch() {
    let (db, project) = setup();
    let report = Importer::new(BomService::new(&db))
        .import(
            &sheet(
                "ASM-1,Top,1,Assembly,\n\
                 PRT-1,Bolt,2,Part,ASM-1\n\
                 PRT-2,Nut,abc,Part,ASM-1\n\
                 PRT-3,Washer,8,Part,ASM-1\n",
            ),
            &ImportOptions::new(project.id),
        )
        .unwrap();

    assert_eq!(report.total_rows, 4);
    assert_eq!(report.successful_rows, 3);
    assert_eq!(report.created_item_ids.len(), 3);
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert_eq!(error.row, 4);
    assert_eq!(error.kind, ErrorKind::InvalidNumber);
    assert_eq!(error.column.as_deref(), Some("Quantity"));
}

#[test]
fn missing_and_duplicate_values_are_row_errors() {
    let (db, project) = setup();
    let report = Importer::new(BomService::new(&db))
        .import(
            &sheet("ASM-1,Top,1,Assembly,\nASM-1,Again,1,Assembly,\nPRT-9,,1,Part,\nPRT-8,Zero,0,Part,\n"),
            &ImportOptions::new(project.id),
        )
        .unwrap();

    assert_eq!(report.successful_rows, 1);
    let kinds: Vec<_> = report
        .errors
        .iter()
        .map(|e| (e.row, e.kind, e.column.as_deref()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (3, ErrorKind::DuplicatePartNumber, Some("Part Number")),
            (4, ErrorKind::MissingRequiredField, Some("Description")),
            (5, ErrorKind::InvalidNumber, Some("Quantity")),
        ]
    );
}

#[test]
fn hierarchy_violations_are_reported_per_row() {
    let (db, project) = setup();
    let report = Importer::new(BomService::new(&db))
        .import(
            &sheet("PRT-1,Leaf,1,Part,\nPRT-2,Under leaf,1,Part,PRT-1\n"),
            &ImportOptions::new(project.id),
        )
        .unwrap();
    assert_eq!(report.successful_rows, 1);
    assert_eq!(report.errors[0].kind, ErrorKind::InvalidHierarchy);
    assert_eq!(report.errors[0].column.as_deref(), Some("Type"));
}

#[test]
fn lenient_fields_fall_back_instead_of_failing() {
    let (db, project) = setup();
    let content = "Codice,Descrizione,Quantità,Tipo,Stato Evasione,Data Consegna,Obsoleto,Colore\n\
                   X-1,Widget,3,gizmo,boh,someday,Sì,rosso\n\
                   X-2,Gadget,5.0,ASM,In Ritardo,15/03/2024,no,\n";
    let sheet = Sheet::from_csv_str("legacy", content).unwrap();
    let mut options = ImportOptions::new(project.id);
    options.mapping = Some(
        ColumnMapping::auto(sheet.header().unwrap()).with("Colore", "cf:colore"),
    );

    let service = BomService::new(&db);
    let report = Importer::new(service).import(&sheet, &options).unwrap();
    assert!(report.success, "{:?}", report.errors);

    let x1 = service.find_by_part_number(project.id, "X-1").unwrap().unwrap();
    assert_eq!(x1.item_type, ItemType::Part);
    assert_eq!(x1.quantity, 3);
    assert_eq!(x1.procurement.procurement_status, ProcurementStatus::Pending);
    assert_eq!(x1.procurement.expected_delivery, None);
    assert!(x1.procurement.obsolete);
    assert_eq!(x1.custom_fields["colore"].to_string(), "rosso");

    let x2 = service.find_by_part_number(project.id, "X-2").unwrap().unwrap();
    assert_eq!(x2.item_type, ItemType::Assembly);
    assert_eq!(x2.quantity, 5);
    assert_eq!(x2.procurement.procurement_status, ProcurementStatus::Delayed);
    assert_eq!(
        x2.procurement.expected_delivery,
        chrono::NaiveDate::from_ymd_opt(2024, 3, 15)
    );
    assert!(!x2.procurement.obsolete);
    assert!(x2.custom_fields.is_empty());
}

#[test]
fn validate_only_writes_nothing() {
    let (db, project) = setup();
    let service = BomService::new(&db);
    service
        .create_item(&bomtree_core::NewBomNode::new(
            project.id,
            "EXISTING",
            "Already there",
            1,
            ItemType::Assembly,
        ))
        .unwrap();

    let mut options = ImportOptions::new(project.id);
    options.validate_only = true;
    let report = Importer::new(service)
        .import(
            &sheet(
                "ASM-2,Top,1,Assembly,\n\
                 PRT-2,Bolt,4,Part,ASM-2\n\
                 PRT-3,Pin,1,Part,EXISTING\n\
                 PRT-2,Again,1,Part,ASM-2\n\
                 PRT-4,Under bolt,1,Part,PRT-2\n\
                 EXISTING,Clash,1,Part,\n",
            ),
            &options,
        )
        .unwrap();

    assert_eq!(report.total_rows, 6);
    assert_eq!(report.successful_rows, 3);
    assert!(report.created_item_ids.is_empty());
    let kinds: Vec<_> = report.errors.iter().map(|e| (e.row, e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (5, ErrorKind::DuplicatePartNumber),
            (6, ErrorKind::InvalidHierarchy),
            (7, ErrorKind::DuplicatePartNumber),
        ]
    );

    let stored = service.get_flat_bom(project.id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].part_number, "EXISTING");
}

#[test]
fn invalid_mapping_fails_before_any_row() {
    let (db, project) = setup();
    let mut options = ImportOptions::new(project.id);
    options.mapping = Some(
        ColumnMapping::new()
            .with("Part Number", "partNumber")
            .with("Description", "description")
            .with("Type", "itemType"),
    );
    let service = BomService::new(&db);
    let err = Importer::new(service)
        .import(&sheet("ASM-1,Top,1,Assembly,\n"), &options)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidMapping);
    assert!(service.get_flat_bom(project.id).unwrap().is_empty());
}

#[test]
fn sheets_without_data_rows_are_rejected() {
    let (db, project) = setup();
    let importer = Importer::new(BomService::new(&db));
    let options = ImportOptions::new(project.id);

    let empty = Sheet::from_csv_str("empty", "").unwrap();
    assert!(matches!(
        importer.import(&empty, &options),
        Err(ImportError::NoDataRows)
    ));
    assert!(matches!(
        importer.import(&sheet(""), &options),
        Err(ImportError::NoDataRows)
    ));
}

#[test]
fn header_row_is_data_when_not_skipped() {
    let (db, project) = setup();
    let mut options = ImportOptions::new(project.id);
    options.skip_header_row = false;
    let report = Importer::new(BomService::new(&db))
        .import(&sheet("ASM-1,Top,1,Assembly,\n"), &options)
        .unwrap();

    assert_eq!(report.total_rows, 2);
    assert_eq!(report.successful_rows, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].row, 1);
    assert_eq!(report.errors[0].kind, ErrorKind::InvalidNumber);
}

#[test]
fn unknown_project_is_reported_per_row() {
    let (db, _) = setup();
    let report = Importer::new(BomService::new(&db))
        .import(
            &sheet("ASM-1,Top,1,Assembly,\n"),
            &ImportOptions::new(uuid::Uuid::new_v4()),
        )
        .unwrap();
    assert_eq!(report.errors[0].kind, ErrorKind::ProjectNotFound);
}
