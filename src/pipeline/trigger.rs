//! What decides when the next pipeline run starts.

use crate::pipeline::{PipelineRunner, RunOutcome};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next run. `false` means stop.
    async fn next_tick(&mut self) -> bool;
}

/// Fires immediately, then once per period until the shutdown future
/// completes.
pub struct IntervalTrigger {
    interval: Interval,
    shutdown: Pin<Box<dyn Future<Output = ()> + Send>>,
    stopped: bool,
}

impl IntervalTrigger {
    /// Must be called from within a tokio runtime.
    pub fn new(period: Duration, shutdown: impl Future<Output = ()> + Send + 'static) -> Self {
        let mut interval = tokio::time::interval(period);
        // A run that overruns the period delays the schedule rather than
        // firing a burst of catch-up runs
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            shutdown: Box::pin(shutdown),
            stopped: false,
        }
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn next_tick(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        tokio::select! {
            biased;
            _ = &mut self.shutdown => {
                self.stopped = true;
                false
            }
            _ = self.interval.tick() => true,
        }
    }
}

/// Fires a fixed number of times without waiting.
#[derive(Debug, Clone)]
pub struct ManualTrigger {
    remaining: usize,
}

impl ManualTrigger {
    pub fn new(ticks: usize) -> Self {
        Self { remaining: ticks }
    }
}

#[async_trait]
impl Trigger for ManualTrigger {
    async fn next_tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveSummary {
    pub runs: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Run the pipeline on every tick. Each run finishes before the trigger is
/// polled again, so runs never overlap and a shutdown never interrupts a
/// store transaction.
pub async fn drive<T>(runner: &mut PipelineRunner, trigger: &mut T) -> DriveSummary
where
    T: Trigger + ?Sized,
{
    let mut summary = DriveSummary::default();

    while trigger.next_tick().await {
        summary.runs += 1;
        match runner.run().await {
            RunOutcome::Success(_) => summary.succeeded += 1,
            RunOutcome::SkippedNoData => summary.skipped += 1,
            RunOutcome::Failed { .. } => summary.failed += 1,
        }
    }

    tracing::info!(
        message = "scheduler stopped",
        runs = summary.runs,
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        failed = summary.failed,
    );
    summary
}
