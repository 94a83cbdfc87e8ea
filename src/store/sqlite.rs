use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use super::{StoreError, UsageStore};
use crate::models::{ApplianceType, ApplianceUsage, ProcessingEvent};

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/migrations/001_initial.sql"),
    )];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql)
                .map_err(|e| StoreError::MigrationFailed {
                    version,
                    reason: e.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Local SQLite backend.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: open_memory_database()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// All appliance usage rows in insertion order.
    pub fn appliance_uses(&self) -> Result<Vec<ApplianceUsage>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT type, running_for, appliance_external_id, file_name, date_collected
             FROM appliances_use ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, NaiveDateTime>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(kind, running_for, external_id, file_name, collected_at)| -> Result<_, StoreError> {
                Ok(ApplianceUsage {
                    appliance_type: kind.parse::<ApplianceType>()?,
                    running_for,
                    external_id,
                    file_name,
                    collected_at,
                })
            })
            .collect()
    }

    /// All processing events in insertion order.
    pub fn time_updates(&self) -> Result<Vec<ProcessingEvent>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_name, update_time FROM time_updates ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProcessingEvent {
                    file_name: row.get(0)?,
                    collected_at: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl UsageStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn insert_appliance_use(&self, usage: &ApplianceUsage) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO appliances_use (type, running_for, appliance_external_id, file_name, date_collected)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                usage.appliance_type.as_str(),
                usage.running_for,
                usage.external_id,
                usage.file_name,
                usage.date_collected(),
            ],
        )?;
        Ok(())
    }

    fn insert_time_update(&self, event: &ProcessingEvent) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO time_updates (file_name, update_time) VALUES (?1, ?2)",
            params![event.file_name, event.update_time()],
        )?;
        Ok(())
    }
}
