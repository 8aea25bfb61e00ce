use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::StationCoordinates;

/// One station's raw reading, as parsed from the provider snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub station_id: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
}

impl Observation {
    pub fn new(station_id: impl Into<String>, temperature_c: f64, humidity_pct: f64) -> Self {
        Self {
            station_id: station_id.into(),
            temperature_c,
            humidity_pct,
        }
    }
}

/// All observations from a single fetch. `fetched_at` is the implicit
/// timestamp of every observation in the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBatch {
    pub fetched_at: DateTime<Utc>,
    pub observations: Vec<Observation>,
}

impl ObservationBatch {
    pub fn new(fetched_at: DateTime<Utc>, observations: Vec<Observation>) -> Self {
        Self {
            fetched_at,
            observations,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// An observation after wet-bulb derivation, coordinate lookup and top-K selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedObservation {
    pub station_id: String,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wet_bulb_temp_c: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl RankedObservation {
    pub fn from_observation(
        observation: Observation,
        wet_bulb_temp_c: f64,
        coordinates: Option<StationCoordinates>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            station_id: observation.station_id,
            temperature_c: observation.temperature_c,
            humidity_pct: observation.humidity_pct,
            wet_bulb_temp_c,
            latitude: coordinates.map(|c| c.latitude),
            longitude: coordinates.map(|c| c.longitude),
            timestamp,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Row shape served by the read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObservation {
    pub station_id: String,
    pub wet_bulb_temp_c: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ranked_observation_without_coordinates() {
        let ts = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let ranked =
            RankedObservation::from_observation(Observation::new("KPHX", 44.0, 12.0), 24.5, None, ts);

        assert_eq!(ranked.station_id, "KPHX");
        assert_eq!(ranked.latitude, None);
        assert!(!ranked.has_coordinates());
    }

    #[test]
    fn test_stored_observation_json_field_names() {
        let row = StoredObservation {
            station_id: "KPHX".to_string(),
            wet_bulb_temp_c: 24.5,
            latitude: Some(33.43),
            longitude: None,
        };

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["stationId"], "KPHX");
        assert_eq!(json["wetBulbTempC"], 24.5);
        assert_eq!(json["latitude"], 33.43);
        assert!(json["longitude"].is_null());
    }
}
