use crate::error::ProcessingError;
use crate::models::{ObservationBatch, RankedObservation, StationReference};
use crate::processors::WetBulbCalculator;
use crate::utils::constants::DEFAULT_TOP_K;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingReport {
    pub input_rows: usize,
    pub skipped_rows: usize,
    pub unresolved_stations: usize,
    pub kept_rows: usize,
}

impl ProcessingReport {
    pub fn summary(&self) -> String {
        format!(
            "{} rows in, {} skipped, {} kept ({} without coordinates)",
            self.input_rows, self.skipped_rows, self.kept_rows, self.unresolved_stations
        )
    }
}

/// Derives wet-bulb values, attaches coordinates, and keeps the top K.
pub struct ObservationProcessor {
    calculator: WetBulbCalculator,
    stations: Arc<StationReference>,
    top_k: usize,
}

impl ObservationProcessor {
    pub fn new(stations: Arc<StationReference>) -> Self {
        Self {
            calculator: WetBulbCalculator::new(),
            stations,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn process(
        &self,
        batch: ObservationBatch,
    ) -> Result<Vec<RankedObservation>, ProcessingError> {
        self.process_with_report(batch).map(|(rows, _)| rows)
    }

    pub fn process_with_report(
        &self,
        batch: ObservationBatch,
    ) -> Result<(Vec<RankedObservation>, ProcessingReport), ProcessingError> {
        let run_timestamp = batch.fetched_at;
        let mut report = ProcessingReport {
            input_rows: batch.len(),
            ..Default::default()
        };

        // Derive wet-bulb per row; a bad row is dropped, not fatal
        let mut derived = Vec::with_capacity(batch.len());
        for observation in batch.observations {
            match self
                .calculator
                .compute(observation.temperature_c, observation.humidity_pct)
            {
                Ok(wet_bulb) => {
                    if !self
                        .calculator
                        .is_within_calibration(observation.temperature_c, observation.humidity_pct)
                    {
                        tracing::debug!(
                            message = "observation outside wet-bulb calibration range",
                            station = %observation.station_id,
                            temperature_c = observation.temperature_c,
                            humidity_pct = observation.humidity_pct,
                        );
                    }
                    derived.push((observation, wet_bulb));
                }
                Err(e) => {
                    report.skipped_rows += 1;
                    tracing::warn!(
                        message = "skipping observation",
                        station = %observation.station_id,
                        error = %e,
                    );
                }
            }
        }

        if derived.is_empty() {
            return Err(ProcessingError::NoValidRows);
        }

        // Highest wet-bulb first, station id breaks ties
        derived.sort_by(|(a, a_wb), (b, b_wb)| match b_wb.total_cmp(a_wb) {
            Ordering::Equal => a.station_id.cmp(&b.station_id),
            other => other,
        });
        derived.truncate(self.top_k);

        let ranked: Vec<RankedObservation> = derived
            .into_iter()
            .map(|(observation, wet_bulb)| {
                let coordinates = self.stations.resolve(&observation.station_id);
                if coordinates.is_none() {
                    report.unresolved_stations += 1;
                }
                RankedObservation::from_observation(observation, wet_bulb, coordinates, run_timestamp)
            })
            .collect();

        report.kept_rows = ranked.len();
        Ok((ranked, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Observation, StationRecord};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn batch(observations: Vec<Observation>) -> ObservationBatch {
        ObservationBatch::new(
            Utc.with_ymd_and_hms(2024, 7, 1, 12, 15, 0).unwrap(),
            observations,
        )
    }

    fn processor() -> ObservationProcessor {
        let stations = StationReference::from_records(vec![
            StationRecord::new("A", 10.0, 20.0),
            StationRecord::new("B", -10.0, -20.0),
        ])
        .unwrap();
        ObservationProcessor::new(Arc::new(stations))
    }

    /// Temperature at saturation whose wet-bulb equals the target, found by bisection.
    fn temperature_for_wet_bulb(target: f64) -> f64 {
        let calc = WetBulbCalculator::new();
        let (mut lo, mut hi) = (target - 5.0, target + 5.0);
        for _ in 0..200 {
            let mid = (lo + hi) / 2.0;
            if calc.compute(mid, 100.0).unwrap() < target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        (lo + hi) / 2.0
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(
            processor().process(batch(vec![])),
            Err(ProcessingError::NoValidRows)
        );
    }

    #[test]
    fn test_all_rows_invalid() {
        let result = processor().process(batch(vec![
            Observation::new("A", 30.0, 0.0),
            Observation::new("B", 30.0, 140.0),
        ]));
        assert_eq!(result, Err(ProcessingError::NoValidRows));
    }

    #[test]
    fn test_descending_order_and_truncation() {
        let rows = processor()
            .with_top_k(2)
            .process(batch(vec![
                Observation::new("low", temperature_for_wet_bulb(10.0), 100.0),
                Observation::new("high", temperature_for_wet_bulb(30.0), 100.0),
                Observation::new("mid", temperature_for_wet_bulb(20.0), 100.0),
            ]))
            .unwrap();

        let ids: Vec<&str> = rows.iter().map(|r| r.station_id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid"]);
        assert!((rows[0].wet_bulb_temp_c - 30.0).abs() < 1e-6);
        assert!((rows[1].wet_bulb_temp_c - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_tie_broken_by_station_id() {
        let rows = processor()
            .process(batch(vec![
                Observation::new("B", 31.0, 55.0),
                Observation::new("A", 31.0, 55.0),
            ]))
            .unwrap();

        assert_eq!(rows[0].wet_bulb_temp_c, rows[1].wet_bulb_temp_c);
        assert_eq!(rows[0].station_id, "A");
        assert_eq!(rows[1].station_id, "B");
    }

    #[test]
    fn test_invalid_rows_skipped_and_unknown_station_kept() {
        let (rows, report) = processor()
            .process_with_report(batch(vec![
                Observation::new("A", 30.0, 50.0),
                Observation::new("B", 30.0, 0.0),
                Observation::new("UNKNOWN", 35.0, 60.0),
            ]))
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].station_id, "UNKNOWN");
        assert_eq!(rows[0].latitude, None);
        assert_eq!(rows[0].longitude, None);
        assert_eq!(rows[1].latitude, Some(10.0));
        assert_eq!(rows[1].longitude, Some(20.0));
        assert_eq!(
            report,
            ProcessingReport {
                input_rows: 3,
                skipped_rows: 1,
                unresolved_stations: 1,
                kept_rows: 2,
            }
        );
    }

    #[test]
    fn test_shared_run_timestamp() {
        let input = batch(vec![
            Observation::new("A", 30.0, 50.0),
            Observation::new("B", 25.0, 50.0),
        ]);
        let fetched_at = input.fetched_at;

        let rows = processor().process(input).unwrap();
        assert!(rows.iter().all(|r| r.timestamp == fetched_at));
    }

    #[test]
    fn test_wet_bulb_matches_calculator() {
        let calc = WetBulbCalculator::new();
        let rows = processor()
            .process(batch(vec![Observation::new("A", 38.2, 41.0)]))
            .unwrap();

        let expected = calc.compute(38.2, 41.0).unwrap();
        assert!((rows[0].wet_bulb_temp_c - expected).abs() < 1e-12);
    }
}
