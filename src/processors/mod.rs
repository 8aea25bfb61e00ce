pub mod observation_processor;
pub mod wet_bulb;

pub use observation_processor::{ObservationProcessor, ProcessingReport};
pub use wet_bulb::WetBulbCalculator;
