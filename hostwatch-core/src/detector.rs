use crate::collector::Collector;
use crate::error::MonitorError;
use crate::scheduler::Task;
use crate::snapshot::SnapshotStore;
use async_trait::async_trait;
use tracing::{info, warn};

/// Result of comparing a fresh capture against the stored baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drift {
    /// No baseline existed; the capture becomes the first one.
    NoBaseline,
    Unchanged,
    Changed,
}

/// Compare `current_raw` with `baseline` after normalizing both.
pub fn detect<F>(current_raw: &str, baseline: Option<&str>, normalize: F) -> Drift
where
    F: Fn(&str) -> String,
{
    match baseline {
        None => Drift::NoBaseline,
        Some(baseline) if normalize(current_raw) == normalize(baseline) => Drift::Unchanged,
        Some(_) => Drift::Changed,
    }
}

/// Snapshot-diff monitor for one resource: capture, compare, persist on drift.
pub struct DriftMonitor<C> {
    collector: C,
    store: SnapshotStore,
}

impl<C: Collector> DriftMonitor<C> {
    pub fn new(collector: C, store: SnapshotStore) -> Self {
        Self { collector, store }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run one detection cycle.
    ///
    /// A failed capture skips the cycle with an error rather than reporting
    /// `Unchanged`. On `NoBaseline` and `Changed` the raw capture is written
    /// as the new baseline.
    pub async fn check(&self) -> Result<Drift, MonitorError> {
        let subject = self.collector.subject();

        let current = self.collector.capture().await?;
        let baseline = self.store.load()?;

        let drift = detect(&current, baseline.as_deref(), |text| {
            self.collector.normalize(text)
        });

        match drift {
            Drift::NoBaseline => {
                info!(
                    path = %self.store.path().display(),
                    "No {} snapshot found. Saving initial snapshot.", subject
                );
                self.store.save(&current)?;
            }
            Drift::Unchanged => {
                info!("No changes detected in {}.", subject);
            }
            Drift::Changed => {
                warn!(
                    path = %self.store.path().display(),
                    "Detected changes in {}. Updating snapshot.", subject
                );
                self.store.save(&current)?;
            }
        }

        Ok(drift)
    }
}

#[async_trait]
impl<C: Collector> Task for DriftMonitor<C> {
    fn name(&self) -> &str {
        self.collector.name()
    }

    async fn run_once(&mut self) -> Result<(), MonitorError> {
        self.check().await.map(|_| ())
    }
}
