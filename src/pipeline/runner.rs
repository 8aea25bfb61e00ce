use crate::error::{FetchError, ProcessingError};
use crate::models::RankedObservation;
use crate::processors::ObservationProcessor;
use crate::source::WeatherDataSource;
use crate::store::SqliteStore;
use crate::utils::constants::{
    DEFAULT_EXPECTED_ENTRY, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_STORE_TIMEOUT_SECS, DEFAULT_TOP_K,
};
use std::fmt;
use std::time::Duration;
use tracing::Instrument;

/// Explicit settings for one pipeline. Nothing in the pipeline reads the
/// environment.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub fetch_timeout: Duration,
    pub store_timeout: Duration,
    pub expected_entry: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
            expected_entry: DEFAULT_EXPECTED_ENTRY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Processing,
    Storing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Processing => "processing",
            Stage::Storing => "storing",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Fetching,
    Processing,
    Storing,
    Failed(Stage),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Rows appended to the store
    Success(usize),
    /// The batch had no rows that survived processing
    SkippedNoData,
    Failed { stage: Stage, reason: String },
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Success(count) => write!(f, "stored {} rows", count),
            RunOutcome::SkippedNoData => f.write_str("skipped, no valid rows"),
            RunOutcome::Failed { stage, reason } => write!(f, "failed while {}: {}", stage, reason),
        }
    }
}

/// Runs one fetch, process, store cycle at a time.
pub struct PipelineRunner {
    source: Box<dyn WeatherDataSource>,
    processor: ObservationProcessor,
    store: SqliteStore,
    config: PipelineConfig,
    state: PipelineState,
    runs: u64,
}

impl PipelineRunner {
    pub fn new(
        source: Box<dyn WeatherDataSource>,
        processor: ObservationProcessor,
        store: SqliteStore,
        config: PipelineConfig,
    ) -> Self {
        let processor = processor.with_top_k(config.top_k);
        let store = store.with_busy_timeout(config.store_timeout);
        Self {
            source,
            processor,
            store,
            config,
            state: PipelineState::Idle,
            runs: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub async fn run(&mut self) -> RunOutcome {
        self.runs += 1;
        let span = tracing::info_span!("pipeline_run", run = self.runs);
        let outcome = self.run_stages().instrument(span.clone()).await;

        span.in_scope(|| match &outcome {
            RunOutcome::Success(count) => {
                tracing::info!(message = "pipeline run complete", rows = count)
            }
            RunOutcome::SkippedNoData => {
                tracing::warn!(message = "pipeline run skipped, no valid rows")
            }
            RunOutcome::Failed { stage, reason } => {
                tracing::error!(message = "pipeline run failed", stage = %stage, error = %reason)
            }
        });
        outcome
    }

    async fn run_stages(&mut self) -> RunOutcome {
        self.state = PipelineState::Fetching;
        let batch = match tokio::time::timeout(self.config.fetch_timeout, self.source.fetch()).await
        {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => return self.fail(Stage::Fetching, e.to_string()),
            Err(_) => return self.fail(Stage::Fetching, FetchError::Timeout.to_string()),
        };
        tracing::debug!(message = "fetched batch", rows = batch.len(), fetched_at = %batch.fetched_at);

        self.state = PipelineState::Processing;
        let rows = match self.processor.process_with_report(batch) {
            Ok((rows, report)) => {
                tracing::info!(message = "processed batch", summary = %report.summary());
                rows
            }
            Err(ProcessingError::NoValidRows) => {
                self.state = PipelineState::Idle;
                return RunOutcome::SkippedNoData;
            }
        };

        self.state = PipelineState::Storing;
        match self.store_rows(rows).await {
            Ok(count) => {
                self.state = PipelineState::Idle;
                RunOutcome::Success(count)
            }
            Err(reason) => self.fail(Stage::Storing, reason),
        }
    }

    async fn store_rows(&self, rows: Vec<RankedObservation>) -> Result<usize, String> {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || {
            store.ensure_schema()?;
            store.append(&rows)
        })
        .await;

        match result {
            Ok(Ok(count)) => Ok(count),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(format!("Store task did not complete: {}", e)),
        }
    }

    fn fail(&mut self, stage: Stage, reason: String) -> RunOutcome {
        self.state = PipelineState::Failed(stage);
        tracing::debug!(message = "pipeline state", state = ?self.state);
        self.state = PipelineState::Idle;
        RunOutcome::Failed { stage, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{Observation, ObservationBatch, StationReference};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct FakeSource {
        result: Result<Vec<Observation>, FetchError>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl WeatherDataSource for FakeSource {
        async fn fetch(&self) -> Result<ObservationBatch, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
            let fetched_at = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
                + chrono::Duration::hours(call);
            self.result
                .clone()
                .map(|observations| ObservationBatch::new(fetched_at, observations))
        }
    }

    struct SlowSource;

    #[async_trait]
    impl WeatherDataSource for SlowSource {
        async fn fetch(&self) -> Result<ObservationBatch, FetchError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ObservationBatch::new(Utc::now(), vec![]))
        }
    }

    fn runner_with(source: impl WeatherDataSource + 'static, store: SqliteStore) -> PipelineRunner {
        PipelineRunner::new(
            Box::new(source),
            ObservationProcessor::new(Arc::new(StationReference::empty())),
            store,
            PipelineConfig {
                top_k: 3,
                ..Default::default()
            },
        )
    }

    fn fake(result: Result<Vec<Observation>, FetchError>) -> FakeSource {
        FakeSource {
            result,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn observations() -> Vec<Observation> {
        vec![
            Observation::new("A", 30.0, 50.0),
            Observation::new("B", 35.0, 60.0),
            Observation::new("C", 25.0, 40.0),
            Observation::new("D", 40.0, 20.0),
            Observation::new("E", 20.0, 90.0),
        ]
    }

    #[tokio::test]
    async fn test_success() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("weather.db"));
        let mut runner = runner_with(fake(Ok(observations())), store.clone());

        assert_eq!(runner.run().await, RunOutcome::Success(3));
        assert_eq!(runner.state(), PipelineState::Idle);
        assert_eq!(store.row_count().unwrap(), 3);

        // A later fetch carries a new timestamp, so history grows
        assert_eq!(runner.run().await, RunOutcome::Success(3));
        assert_eq!(store.row_count().unwrap(), 6);
        assert_eq!(runner.runs(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("weather.db"));
        let mut runner = runner_with(fake(Err(FetchError::BadStatus(503))), store.clone());

        let outcome = runner.run().await;
        assert!(matches!(
            outcome,
            RunOutcome::Failed { stage: Stage::Fetching, ref reason } if reason.contains("503")
        ));
        assert_eq!(runner.state(), PipelineState::Idle);
        // The store was never opened, so no database file exists
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_empty_batch_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("weather.db"));
        let mut runner = runner_with(fake(Ok(vec![])), store.clone());

        assert_eq!(runner.run().await, RunOutcome::SkippedNoData);
        assert_eq!(runner.state(), PipelineState::Idle);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_all_invalid_rows_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("weather.db"));
        let mut runner = runner_with(
            fake(Ok(vec![Observation::new("A", 30.0, 0.0)])),
            store,
        );

        assert_eq!(runner.run().await, RunOutcome::SkippedNoData);
    }

    #[tokio::test]
    async fn test_store_failure() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("no-such-dir").join("weather.db"));
        let mut runner = runner_with(fake(Ok(observations())), store);

        let outcome = runner.run().await;
        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                stage: Stage::Storing,
                ..
            }
        ));
        assert_eq!(runner.state(), PipelineState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("weather.db"));
        let mut runner = PipelineRunner::new(
            Box::new(SlowSource),
            ObservationProcessor::new(Arc::new(StationReference::empty())),
            store,
            PipelineConfig {
                fetch_timeout: Duration::from_secs(5),
                ..Default::default()
            },
        );

        let outcome = runner.run().await;
        assert_eq!(
            outcome,
            RunOutcome::Failed {
                stage: Stage::Fetching,
                reason: FetchError::Timeout.to_string(),
            }
        );
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(RunOutcome::Success(4).to_string(), "stored 4 rows");
        assert_eq!(
            RunOutcome::Failed {
                stage: Stage::Storing,
                reason: "disk full".to_string()
            }
            .to_string(),
            "failed while storing: disk full"
        );
    }
}
