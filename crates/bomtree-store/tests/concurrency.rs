use std::collections::HashSet;
use std::thread;

use bomtree_core::{ItemType, NewBomNode, NewProject};
use bomtree_store::{BomService, Database, ProjectRepository, StoreConfig};

#[test]
fn concurrent_creates_under_one_parent_get_unique_paths() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        path: dir.path().join("bom.sqlite"),
        pool_size: 8,
        busy_timeout_ms: 30_000,
    };
    let db = Database::open(&config).unwrap();
    let project = ProjectRepository::new(&db)
        .create(&NewProject {
            name: "Race".into(),
            ..Default::default()
        })
        .unwrap();
    let asm = BomService::new(&db)
        .create_item(&NewBomNode::new(
            project.id,
            "ASM-1",
            "Top",
            1,
            ItemType::Assembly,
        ))
        .unwrap();

    const THREADS: usize = 8;
    const PER_THREAD: usize = 10;

    let paths: Vec<String> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let db = &db;
                s.spawn(move || {
                    let svc = BomService::new(db);
                    (0..PER_THREAD)
                        .map(|i| {
                            let dto = NewBomNode::new(
                                project.id,
                                format!("PRT-{t}-{i}"),
                                "Part",
                                1,
                                ItemType::Part,
                            )
                            .with_parent(asm.id);
                            svc.create_item(&dto).unwrap().path.to_string()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<&String> = paths.iter().collect();
    assert_eq!(paths.len(), THREADS * PER_THREAD);
    assert_eq!(unique.len(), paths.len());

    let ordinals: HashSet<u32> = BomService::new(&db)
        .repository()
        .find_children(asm.id)
        .unwrap()
        .iter()
        .filter_map(|n| n.path.last_ordinal())
        .collect();
    let expected: HashSet<u32> = (1..=(THREADS * PER_THREAD) as u32).collect();
    assert_eq!(ordinals, expected);
}

#[test]
fn concurrent_duplicate_part_number_creates_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StoreConfig::at(dir.path().join("bom.sqlite"));
    config.busy_timeout_ms = 30_000;
    let db = Database::open(&config).unwrap();
    let project = ProjectRepository::new(&db)
        .create(&NewProject {
            name: "Race".into(),
            ..Default::default()
        })
        .unwrap();

    let successes: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let db = &db;
                s.spawn(move || {
                    let dto = NewBomNode::new(project.id, "PRT-1", "Part", 1, ItemType::Part);
                    BomService::new(db).create_item(&dto).is_ok() as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(successes, 1);
    assert_eq!(BomService::new(&db).get_flat_bom(project.id).unwrap().len(), 1);
}
