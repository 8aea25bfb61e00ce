//! Versioned schema for the `weather_data` table.
//!
//! Each migration runs in its own transaction and bumps `PRAGMA user_version`
//! on commit. Column additions inspect `PRAGMA table_info` first, so a table
//! created by an older deployment (which never set `user_version`) is brought
//! forward without losing rows.

use crate::error::StoreError;
use crate::utils::constants::WEATHER_TABLE;
use rusqlite::{Connection, Transaction};

struct Migration {
    version: u32,
    description: &'static str,
    apply: fn(&Transaction) -> rusqlite::Result<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create weather_data",
        apply: create_table,
    },
    Migration {
        version: 2,
        description: "add latitude column",
        apply: add_latitude,
    },
    Migration {
        version: 3,
        description: "add longitude column",
        apply: add_longitude,
    },
    Migration {
        version: 4,
        description: "unique (stationId, timestamp)",
        apply: create_unique_index,
    },
];

/// Columns every row is written with. Migration 1 creates them; a table that
/// predates versioning must already have them.
const BASE_COLUMNS: &[&str] = &[
    "stationId",
    "temperatureC",
    "humidityPct",
    "wetBulbTempC",
    "timestamp",
];

/// Columns present once every migration has been applied.
const REQUIRED_COLUMNS: &[&str] = &[
    "stationId",
    "temperatureC",
    "humidityPct",
    "wetBulbTempC",
    "timestamp",
    "latitude",
    "longitude",
];

/// Highest version in the migration list.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}

fn create_table(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            stationId TEXT NOT NULL,
            temperatureC REAL,
            humidityPct REAL,
            wetBulbTempC REAL NOT NULL,
            timestamp TEXT NOT NULL
        );",
        WEATHER_TABLE
    ))
}

fn add_latitude(tx: &Transaction) -> rusqlite::Result<()> {
    add_column_if_missing(tx, "latitude", "REAL")
}

fn add_longitude(tx: &Transaction) -> rusqlite::Result<()> {
    add_column_if_missing(tx, "longitude", "REAL")
}

fn create_unique_index(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(&format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_station_time ON {table}(stationId, timestamp);",
        table = WEATHER_TABLE
    ))
}

fn add_column_if_missing(tx: &Transaction, column: &str, sql_type: &str) -> rusqlite::Result<()> {
    if column_names(tx, WEATHER_TABLE)?.iter().any(|c| c == column) {
        return Ok(());
    }
    tx.execute_batch(&format!(
        "ALTER TABLE {} ADD COLUMN {} {};",
        WEATHER_TABLE, column, sql_type
    ))
}

pub(crate) fn column_names(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Required columns the table lacks. SQLite column names are case-insensitive,
/// so the comparison is too.
pub(crate) fn missing_columns(
    conn: &Connection,
    required: &[&'static str],
) -> rusqlite::Result<Vec<&'static str>> {
    let present = column_names(conn, WEATHER_TABLE)?;
    Ok(required
        .iter()
        .copied()
        .filter(|column| !present.iter().any(|p| p.eq_ignore_ascii_case(column)))
        .collect())
}

fn require_columns(conn: &Connection, required: &[&'static str]) -> Result<(), StoreError> {
    let missing = missing_columns(conn, required).map_err(StoreError::from_migration)?;
    if missing.is_empty() {
        return Ok(());
    }
    Err(StoreError::SchemaMigrationFailure(format!(
        "table {} is missing required columns: {}",
        WEATHER_TABLE,
        missing.join(", ")
    )))
}

pub(crate) fn user_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Apply every migration newer than the database's `user_version`, then
/// confirm the table has every column rows are written with.
/// Returns the number of steps applied; zero when already current.
///
/// A step only bumps `user_version` once the base columns are confirmed
/// inside its transaction, so an incompatible table is never marked current.
pub(crate) fn migrate(conn: &mut Connection) -> Result<usize, StoreError> {
    let current = user_version(conn).map_err(StoreError::from_migration)?;
    let mut applied = 0;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction().map_err(StoreError::from_migration)?;
        (migration.apply)(&tx).map_err(|e| match StoreError::from_migration(e) {
            StoreError::SchemaMigrationFailure(msg) => StoreError::SchemaMigrationFailure(format!(
                "step {} ({}): {}",
                migration.version, migration.description, msg
            )),
            other => other,
        })?;
        require_columns(&tx, BASE_COLUMNS)?;
        tx.pragma_update(None, "user_version", migration.version)
            .map_err(StoreError::from_migration)?;
        tx.commit().map_err(StoreError::from_migration)?;

        tracing::info!(
            message = "applied schema migration",
            version = migration.version,
            description = migration.description,
        );
        applied += 1;
    }

    require_columns(conn, REQUIRED_COLUMNS)?;
    Ok(applied)
}
