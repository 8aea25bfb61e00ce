use crate::error::StoreError;
use crate::models::{RankedObservation, StoredObservation};
use crate::store::schema;
use crate::utils::constants::{DEFAULT_STORE_TIMEOUT_SECS, WEATHER_TABLE};
use chrono::SecondsFormat;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Append-only history of ranked observations in a SQLite file.
///
/// Every operation opens its own connection, so the store can be cloned
/// into blocking tasks freely.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.path).map_err(|e| {
            StoreError::ConnectionFailure(format!("{}: {}", self.path.display(), e))
        })?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| StoreError::ConnectionFailure(e.to_string()))?;
        Ok(conn)
    }

    /// Bring the table up to the latest schema version. Safe to call on
    /// every run.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut conn = self.open()?;
        let applied = schema::migrate(&mut conn)?;
        if applied > 0 {
            tracing::info!(
                message = "schema updated",
                path = %self.path.display(),
                steps = applied,
                version = schema::latest_version(),
            );
        }
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32, StoreError> {
        let conn = self.open()?;
        schema::user_version(&conn).map_err(StoreError::from_query)
    }

    /// Insert all rows in a single transaction. Either every row becomes
    /// visible or none does.
    pub fn append(&self, rows: &[RankedObservation]) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.open()?;
        let tx = conn.transaction().map_err(StoreError::from_write)?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {} (stationId, temperatureC, humidityPct, wetBulbTempC, latitude, longitude, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    WEATHER_TABLE
                ))
                .map_err(StoreError::from_write)?;

            for row in rows {
                stmt.execute(params![
                    row.station_id,
                    row.temperature_c,
                    row.humidity_pct,
                    row.wet_bulb_temp_c,
                    row.latitude,
                    row.longitude,
                    row.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                ])
                .map_err(StoreError::from_write)?;
            }
        }
        tx.commit().map_err(StoreError::from_write)?;

        tracing::debug!(message = "appended rows", count = rows.len());
        Ok(rows.len())
    }

    /// Every stored row across all runs, in insertion order.
    pub fn all_rows(&self) -> Result<Vec<StoredObservation>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT stationId, wetBulbTempC, latitude, longitude FROM {} ORDER BY rowid",
                WEATHER_TABLE
            ))
            .map_err(StoreError::from_query)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(StoredObservation {
                    station_id: row.get(0)?,
                    wet_bulb_temp_c: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                })
            })
            .map_err(StoreError::from_query)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(StoreError::from_query)?;

        Ok(rows)
    }

    pub fn row_count(&self) -> Result<usize, StoreError> {
        let conn = self.open()?;
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", WEATHER_TABLE), [], |row| {
                row.get(0)
            })
            .map_err(StoreError::from_query)?;
        Ok(count as usize)
    }
}
