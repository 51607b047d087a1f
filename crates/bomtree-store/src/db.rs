//! Connection pool and schema management.

use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// Ordered schema migrations; the database `user_version` records how many ran.
const MIGRATIONS: &[&str] = &[
    // 1: projects and items
    "CREATE TABLE projects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        budget TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE bom_items (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id),
        parent_id TEXT REFERENCES bom_items(id),
        part_number TEXT NOT NULL,
        description TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity >= 1),
        item_type TEXT NOT NULL CHECK (item_type IN ('assembly', 'subassembly', 'part')),
        level INTEGER NOT NULL,
        path TEXT NOT NULL,
        supplier TEXT,
        supplier_part_number TEXT,
        manufacturer TEXT,
        manufacturer_part_number TEXT,
        revision TEXT,
        category TEXT,
        unit_of_measure TEXT NOT NULL DEFAULT 'pcs',
        notes TEXT,
        estimated_cost TEXT,
        actual_cost TEXT,
        rfq_status TEXT,
        rfq_date TEXT,
        moq INTEGER,
        lead_time_days INTEGER,
        expected_delivery TEXT,
        received_date TEXT,
        procurement_status TEXT NOT NULL DEFAULT 'pending',
        lifecycle_status TEXT NOT NULL DEFAULT 'active',
        obsolete INTEGER NOT NULL DEFAULT 0,
        critical INTEGER NOT NULL DEFAULT 0,
        stock_quantity INTEGER NOT NULL DEFAULT 0,
        reorder_point INTEGER NOT NULL DEFAULT 0,
        safety_stock INTEGER NOT NULL DEFAULT 0,
        inventory_location TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX idx_bom_items_project ON bom_items(project_id);
    CREATE INDEX idx_bom_items_parent ON bom_items(parent_id);
    CREATE INDEX idx_bom_items_part_number ON bom_items(project_id, part_number);",
    // 2: custom fields
    "CREATE TABLE custom_fields (
        bom_item_id TEXT NOT NULL REFERENCES bom_items(id) ON DELETE CASCADE,
        field_name TEXT NOT NULL,
        field_type TEXT NOT NULL
            CHECK (field_type IN ('string', 'number', 'date', 'boolean', 'select')),
        field_value TEXT NOT NULL,
        PRIMARY KEY (bom_item_id, field_name)
    );",
    // 3: sibling ordinal high-water marks
    "CREATE TABLE path_counters (
        project_id TEXT NOT NULL REFERENCES projects(id),
        parent_key TEXT NOT NULL,
        last_ordinal INTEGER NOT NULL,
        PRIMARY KEY (project_id, parent_key)
    );",
];

pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

pub type Conn = PooledConnection<SqliteConnectionManager>;

/// Shared handle to the BOM database.
///
/// Built once at startup and handed to repositories by reference. Cloning
/// is cheap and shares the pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if config.is_memory() {
            return Self::open_in_memory();
        }

        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |c| {
            c.busy_timeout(busy_timeout)?;
            // WAL lets readers proceed while a writer holds the lock
            c.pragma_update(None, "journal_mode", "WAL")?;
            c.pragma_update(None, "foreign_keys", "ON")
        });
        let pool = Pool::builder()
            .max_size(config.pool_size.max(1))
            .build(manager)?;

        log::debug!("Opened BOM database at {}", config.path.display());
        Self::from_pool(pool)
    }

    /// Private database living as long as this handle.
    ///
    /// Every SQLite `:memory:` connection is a separate database, so the
    /// pool is pinned to a single connection that is never recycled.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|c| c.pragma_update(None, "foreign_keys", "ON"));
        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Self::from_pool(pool)
    }

    fn from_pool(pool: Pool<SqliteConnectionManager>) -> Result<Self> {
        let db = Self { pool };
        let mut conn = db.conn()?;
        migrate(&mut conn)?;
        drop(conn);
        Ok(db)
    }

    pub fn conn(&self) -> Result<Conn> {
        Ok(self.pool.get()?)
    }

    /// Run `f` against one pooled connection.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn()?;
        f(&conn)
    }

    /// Run `f` inside an `IMMEDIATE` transaction, committing on success.
    ///
    /// The write lock is taken up front, so everything read inside `f` stays
    /// current until commit.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn schema_version(&self) -> Result<i32> {
        self.read(|c| Ok(c.pragma_query_value(None, "user_version", |r| r.get(0))?))
    }
}

fn migrate(conn: &mut Connection) -> Result<()> {
    let current: i32 = conn.pragma_query_value(None, "user_version", |r| r.get(0))?;
    if current > SCHEMA_VERSION {
        return Err(StoreError::SchemaTooNew {
            found: current,
            supported: SCHEMA_VERSION,
        });
    }

    for (i, sql) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        let version = i as i32 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        log::info!("Applied BOM schema migration {version}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_database_is_migrated() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);

        // the same database is seen by successive checkouts
        db.read(|c| {
            c.execute(
                "INSERT INTO projects (id, name, created_at, updated_at) VALUES ('p', 'n', 't', 't')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let count: i64 = db
            .read(|c| Ok(c.query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reopen_file_keeps_version() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::at(dir.path().join("nested").join("bom.sqlite"));
        let db = Database::open(&config).unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
        drop(db);

        let db = Database::open(&config).unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
                .unwrap();
        }
        let err = Database::open(&StoreConfig::at(&path)).err().unwrap();
        assert!(matches!(err, StoreError::SchemaTooNew { .. }));
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        let result: Result<()> = db.write(|tx| {
            tx.execute(
                "INSERT INTO projects (id, name, created_at, updated_at) VALUES ('p', 'n', 't', 't')",
                [],
            )?;
            Err(bomtree_core::BomError::MissingRequiredField("name").into())
        });
        assert!(result.is_err());
        let count: i64 = db
            .read(|c| Ok(c.query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }
}
