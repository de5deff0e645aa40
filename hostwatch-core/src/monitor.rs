use crate::collector::CommandCollector;
use crate::config::{Concern, MonitorConfig};
use crate::detector::DriftMonitor;
use crate::error::StoreError;
use crate::sampler::{CpuSampler, DiskSampler, MemorySampler, Sampler, ThresholdWatch};
use crate::scheduler::{Scheduler, Task};
use crate::service::SystemctlServices;
use crate::snapshot::SnapshotStore;
use crate::whitelist::{ServiceWatch, ServiceWhitelist};
use tracing::{debug, info};

/// Builds the monitoring tasks for this host from configuration.
pub struct HostMonitor {
    config: MonitorConfig,
}

impl HostMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Create every enabled task and register it with its interval.
    ///
    /// Fails if a snapshot directory or the whitelist file cannot be set up.
    pub fn scheduler(&self) -> Result<Scheduler, StoreError> {
        let mut scheduler = Scheduler::new();

        for concern in Concern::ALL {
            if !self.config.is_enabled(concern) {
                debug!(monitor = concern.name(), "monitor disabled by configuration");
                continue;
            }
            let task = self.task_for(concern)?;
            scheduler.register(task, self.config.interval_for(concern));
        }

        info!(tasks = ?scheduler.task_names(), "monitors configured");
        Ok(scheduler)
    }

    fn task_for(&self, concern: Concern) -> Result<Box<dyn Task>, StoreError> {
        let cfg = &self.config;
        let timeout = cfg.command_timeout();

        let task: Box<dyn Task> = match concern {
            Concern::Cpu => threshold(
                concern,
                Box::new(CpuSampler::new(cfg.cpu_sample_window())),
                cfg.cpu_threshold,
            ),
            Concern::Memory => threshold(
                concern,
                Box::new(MemorySampler::new()),
                cfg.memory_threshold,
            ),
            Concern::Disk => threshold(
                concern,
                Box::new(DiskSampler::new(&cfg.disk_path)),
                cfg.disk_threshold,
            ),
            Concern::Services => Box::new(ServiceWatch::new(
                Box::new(SystemctlServices::new(timeout)),
                ServiceWhitelist::load(cfg.whitelist_path())?,
            )),
            Concern::Firewall => Box::new(DriftMonitor::new(
                CommandCollector::firewall(timeout),
                SnapshotStore::new(cfg.firewall_snapshot_path())?,
            )),
            Concern::Users => Box::new(DriftMonitor::new(
                CommandCollector::accounts(timeout),
                SnapshotStore::new(cfg.users_snapshot_path())?,
            )),
        };

        Ok(task)
    }
}

fn threshold(concern: Concern, sampler: Box<dyn Sampler>, limit: f32) -> Box<dyn Task> {
    Box::new(ThresholdWatch::new(concern.name(), sampler, limit))
}
