//! Cadence scheduler
//!
//! Runs each pipeline on its own fixed interval in a background task. A tick
//! that overruns delays the next one instead of overlapping it, and shutdown
//! lets an in-flight tick finish before the task exits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::AppError;

/// What one tick of a pipeline did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub pipeline: &'static str,
    pub selected: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TickReport {
    pub fn new(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            ..Default::default()
        }
    }
}

/// A unit of periodic work
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &'static str;

    async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, AppError>;
}

pub struct CadenceScheduler {
    pipelines: Vec<Arc<dyn Pipeline>>,
    period: Duration,
}

impl CadenceScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            pipelines: Vec::new(),
            period,
        }
    }

    pub fn with_pipeline(mut self, pipeline: Arc<dyn Pipeline>) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    /// Spawn one task per pipeline. The first tick runs immediately.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = self
            .pipelines
            .into_iter()
            .map(|pipeline| {
                tokio::spawn(run_pipeline(pipeline, self.period, shutdown_rx.clone()))
            })
            .collect();

        tracing::info!(period_secs = self.period.as_secs(), "Scheduler started");

        SchedulerHandle { shutdown_tx, tasks }
    }
}

async fn run_pipeline(
    pipeline: Arc<dyn Pipeline>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        tracing::debug!(pipeline = pipeline.name(), "Pipeline tick started");
        match pipeline.tick(Utc::now()).await {
            Ok(report) if report.selected > 0 => {
                tracing::info!(
                    pipeline = report.pipeline,
                    selected = report.selected,
                    sent = report.sent,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Pipeline tick finished"
                );
            }
            Ok(_) => {
                tracing::debug!(pipeline = pipeline.name(), "Pipeline tick finished, nothing due");
            }
            Err(e) => {
                tracing::error!(pipeline = pipeline.name(), error = %e, "Pipeline tick failed");
            }
        }
    }

    tracing::info!(pipeline = pipeline.name(), "Pipeline stopped");
}

/// Handle to the running scheduler
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop all pipelines, waiting for in-flight ticks to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Pipeline task panicked");
            }
        }
        tracing::info!("Scheduler stopped");
    }
}
