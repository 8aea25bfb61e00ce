pub mod observation;
pub mod station;

pub use observation::{Observation, ObservationBatch, RankedObservation, StoredObservation};
pub use station::{StationCoordinates, StationRecord, StationReference};
