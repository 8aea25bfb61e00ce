use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One row of the station reference file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StationRecord {
    #[serde(alias = "stationId", alias = "stationid")]
    #[validate(length(min = 1))]
    pub station_id: String,

    #[serde(alias = "lat")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[serde(alias = "lon")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl StationRecord {
    pub fn new(station_id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            station_id: station_id.into(),
            latitude,
            longitude,
        }
    }

    pub fn coordinates(&self) -> StationCoordinates {
        StationCoordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Static station id -> coordinates table. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct StationReference {
    stations: HashMap<String, StationCoordinates>,
}

impl StationReference {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the table, validating every record. A repeated station id is rejected.
    pub fn from_records(records: Vec<StationRecord>) -> Result<Self> {
        let mut stations = HashMap::with_capacity(records.len());

        for record in records {
            // NaN passes the range checks, so test finiteness separately
            if !record.latitude.is_finite() || !record.longitude.is_finite() {
                return Err(ConfigError::Stations(format!(
                    "Station '{}' has non-finite coordinates ({}, {})",
                    record.station_id, record.latitude, record.longitude
                )));
            }
            record.validate()?;
            let coordinates = record.coordinates();
            if stations.insert(record.station_id.clone(), coordinates).is_some() {
                return Err(ConfigError::Stations(format!(
                    "Duplicate station id '{}'",
                    record.station_id
                )));
            }
        }

        Ok(Self { stations })
    }

    pub fn resolve(&self, station_id: &str) -> Option<StationCoordinates> {
        self.stations.get(station_id).copied()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}
