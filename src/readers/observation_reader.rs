use crate::error::FetchError;
use crate::models::Observation;
use serde::Deserialize;
use std::collections::HashSet;

/// Accepted header spellings per required column.
const STATION_ID_COLUMNS: &[&str] = &["stationId", "stationid", "station_id"];
const TEMPERATURE_COLUMNS: &[&str] = &["temperatureC", "tempc", "temperature_c"];
const HUMIDITY_COLUMNS: &[&str] = &["humidityPct", "humidity", "humidity_pct"];

#[derive(Debug, Deserialize)]
struct RawObservation {
    #[serde(alias = "stationId", alias = "stationid")]
    station_id: String,
    #[serde(alias = "temperatureC", alias = "tempc")]
    temperature_c: f64,
    #[serde(alias = "humidityPct", alias = "humidity")]
    humidity_pct: f64,
}

/// Parses the provider's current-conditions CSV. Any bad row rejects the
/// whole snapshot.
pub struct ObservationReader;

impl ObservationReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_observations(&self, data: &[u8]) -> Result<Vec<Observation>, FetchError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data);

        let headers = rdr
            .headers()
            .map_err(|e| FetchError::MalformedContent(format!("Unreadable header: {}", e)))?
            .clone();
        for (column, aliases) in [
            ("stationId", STATION_ID_COLUMNS),
            ("temperatureC", TEMPERATURE_COLUMNS),
            ("humidityPct", HUMIDITY_COLUMNS),
        ] {
            if !headers.iter().any(|h| aliases.contains(&h)) {
                return Err(FetchError::MalformedContent(format!(
                    "Missing required column '{}'",
                    column
                )));
            }
        }

        let mut observations = Vec::new();
        let mut seen = HashSet::new();

        for result in rdr.deserialize::<RawObservation>() {
            let raw = result.map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or_default();
                FetchError::MalformedContent(format!("Row at line {}: {}", line, e))
            })?;

            if raw.station_id.is_empty() {
                return Err(FetchError::MalformedContent(
                    "Row with empty station id".to_string(),
                ));
            }

            if !seen.insert(raw.station_id.clone()) {
                return Err(FetchError::MalformedContent(format!(
                    "Duplicate station id '{}'",
                    raw.station_id
                )));
            }

            observations.push(Observation::new(
                raw.station_id,
                raw.temperature_c,
                raw.humidity_pct,
            ));
        }

        Ok(observations)
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_observations() {
        let data = b"stationId,temperatureC,humidityPct,feelsC\nKPHX,44.5,12,41\nOPKC, 35.0, 70.5,45\n";
        let observations = ObservationReader::new().read_observations(data).unwrap();

        assert_eq!(
            observations,
            vec![
                Observation::new("KPHX", 44.5, 12.0),
                Observation::new("OPKC", 35.0, 70.5),
            ]
        );
    }

    #[test]
    fn test_legacy_headers() {
        let data = b"stationid,tempc,humidity\nKPHX,44.5,12\n";
        let observations = ObservationReader::new().read_observations(data).unwrap();
        assert_eq!(observations.len(), 1);
    }

    #[test]
    fn test_header_only_is_empty_batch() {
        let data = b"stationId,temperatureC,humidityPct\n";
        let observations = ObservationReader::new().read_observations(data).unwrap();
        assert!(observations.is_empty());
    }

    #[test]
    fn test_missing_column() {
        let data = b"stationId,temperatureC\nKPHX,44.5\n";
        let err = ObservationReader::new().read_observations(data).unwrap_err();
        assert!(matches!(err, FetchError::MalformedContent(msg) if msg.contains("humidityPct")));
    }

    #[test]
    fn test_unparseable_row() {
        let data = b"stationId,temperatureC,humidityPct\nKPHX,44.5,12\nOPKC,hot,70\n";
        let err = ObservationReader::new().read_observations(data).unwrap_err();
        assert!(matches!(err, FetchError::MalformedContent(_)));
    }

    #[test]
    fn test_duplicate_station() {
        let data = b"stationId,temperatureC,humidityPct\nKPHX,44.5,12\nKPHX,40.0,15\n";
        let err = ObservationReader::new().read_observations(data).unwrap_err();
        assert!(matches!(err, FetchError::MalformedContent(msg) if msg.contains("KPHX")));
    }

    #[test]
    fn test_empty_station_id() {
        let data = b"stationId,temperatureC,humidityPct\n,44.5,12\n";
        let err = ObservationReader::new().read_observations(data).unwrap_err();
        assert!(matches!(err, FetchError::MalformedContent(_)));
    }
}
