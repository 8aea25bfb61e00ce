pub mod climately;

pub use climately::ClimatelySource;

use crate::error::FetchError;
use crate::models::ObservationBatch;
use async_trait::async_trait;

/// Anything that can produce a complete snapshot of current observations.
///
/// Implementations return either a full batch or an error, never a partial one,
/// and do not retry.
#[async_trait]
pub trait WeatherDataSource: Send + Sync {
    async fn fetch(&self) -> Result<ObservationBatch, FetchError>;
}
