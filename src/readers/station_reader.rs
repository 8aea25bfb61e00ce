use crate::error::{ConfigError, Result};
use crate::models::{StationRecord, StationReference};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub struct StationReader;

impl StationReader {
    pub fn new() -> Self {
        Self
    }

    /// Read station records from a CSV file with a `stationId,latitude,longitude` header
    pub fn read_stations(&self, path: &Path) -> Result<Vec<StationRecord>> {
        let file = File::open(path).map_err(|e| {
            ConfigError::Stations(format!("Cannot open '{}': {}", path.display(), e))
        })?;
        self.read_stations_from(file)
    }

    pub fn read_stations_from<R: Read>(&self, reader: R) -> Result<Vec<StationRecord>> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut stations = Vec::new();
        for result in rdr.deserialize() {
            let station: StationRecord = result?;
            stations.push(station);
        }

        Ok(stations)
    }

    /// Read and validate the full reference table
    pub fn read_reference(&self, path: &Path) -> Result<StationReference> {
        let stations = self.read_stations(path)?;
        StationReference::from_records(stations)
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new()
    }
}
