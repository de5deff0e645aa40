use crate::error::{MonitorError, ReadError};
use crate::scheduler::Task;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sysinfo::{CpuRefreshKind, Disks, RefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::{error, info, warn};

/// A single utilization reading, or the sentinel for "could not read".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Percent(f32),
    Unavailable,
}

/// Produces one utilization percentage per call.
#[async_trait]
pub trait Sampler: Send {
    /// Resource label used in log lines, e.g. "CPU".
    fn resource(&self) -> &'static str;

    async fn sample(&mut self) -> Result<f32, ReadError>;
}

/// Sample once, converting failure into `Reading::Unavailable`.
pub async fn read(sampler: &mut dyn Sampler) -> Reading {
    match sampler.sample().await {
        Ok(percent) => Reading::Percent(percent),
        Err(e) => {
            error!(error = %e, "Failed to get {} usage", sampler.resource());
            Reading::Unavailable
        }
    }
}

/// Global CPU utilization averaged over a short measurement window.
pub struct CpuSampler {
    system: System,
    window: Duration,
}

impl CpuSampler {
    pub fn new(window: Duration) -> Self {
        Self {
            system: System::new_with_specifics(
                RefreshKind::new().with_cpu(CpuRefreshKind::everything()),
            ),
            window: window.max(MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }
}

#[async_trait]
impl Sampler for CpuSampler {
    fn resource(&self) -> &'static str {
        "CPU"
    }

    async fn sample(&mut self) -> Result<f32, ReadError> {
        // Usage is a delta between two refreshes.
        self.system.refresh_cpu_usage();
        tokio::time::sleep(self.window).await;
        self.system.refresh_cpu_usage();

        if self.system.cpus().is_empty() {
            return Err(ReadError {
                resource: "CPU",
                reason: "no CPUs reported".to_string(),
            });
        }
        Ok(self.system.global_cpu_usage())
    }
}

/// Share of physical memory not available to new allocations.
pub struct MemorySampler {
    system: System,
}

impl MemorySampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sampler for MemorySampler {
    fn resource(&self) -> &'static str {
        "memory"
    }

    async fn sample(&mut self) -> Result<f32, ReadError> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let available = self.system.available_memory();
        percent_used(total, total.saturating_sub(available)).ok_or_else(|| ReadError {
            resource: "memory",
            reason: "total memory reported as zero".to_string(),
        })
    }
}

/// Used space of the filesystem holding a path.
pub struct DiskSampler {
    path: PathBuf,
    disks: Disks,
}

impl DiskSampler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            disks: Disks::new(),
        }
    }
}

#[async_trait]
impl Sampler for DiskSampler {
    fn resource(&self) -> &'static str {
        "disk"
    }

    async fn sample(&mut self) -> Result<f32, ReadError> {
        self.disks.refresh_list();

        let mounts = self
            .disks
            .list()
            .iter()
            .map(|d| (d.mount_point(), d.total_space(), d.available_space()));
        let (total, available) = best_mount(&self.path, mounts).ok_or_else(|| ReadError {
            resource: "disk",
            reason: format!("no mounted filesystem contains {}", self.path.display()),
        })?;

        percent_used(total, total.saturating_sub(available)).ok_or_else(|| ReadError {
            resource: "disk",
            reason: format!("filesystem at {} reports zero size", self.path.display()),
        })
    }
}

/// Pick the deepest mount point containing `path`.
fn best_mount<'a>(
    path: &Path,
    mounts: impl Iterator<Item = (&'a Path, u64, u64)>,
) -> Option<(u64, u64)> {
    mounts
        .filter(|(mount, _, _)| path.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.components().count())
        .map(|(_, total, available)| (total, available))
}

fn percent_used(total: u64, used: u64) -> Option<f32> {
    if total == 0 {
        return None;
    }
    Some((used as f64 / total as f64 * 100.0) as f32)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdOutcome {
    /// The sampler was unavailable; no comparison was made.
    Skipped,
    Normal(f32),
    Breached(f32),
}

/// Periodic threshold check over one sampler.
pub struct ThresholdWatch {
    name: String,
    sampler: Box<dyn Sampler>,
    threshold: f32,
}

impl ThresholdWatch {
    pub fn new(name: impl Into<String>, sampler: Box<dyn Sampler>, threshold: f32) -> Self {
        Self {
            name: name.into(),
            sampler,
            threshold,
        }
    }

    pub async fn check(&mut self) -> ThresholdOutcome {
        let resource = self.sampler.resource();
        match read(self.sampler.as_mut()).await {
            Reading::Unavailable => ThresholdOutcome::Skipped,
            Reading::Percent(usage) => {
                info!("{} Usage: {:.1}%", resource, usage);
                if usage > self.threshold {
                    warn!(threshold = self.threshold, "High {} Usage: {:.1}%", resource, usage);
                    ThresholdOutcome::Breached(usage)
                } else {
                    ThresholdOutcome::Normal(usage)
                }
            }
        }
    }
}

#[async_trait]
impl Task for ThresholdWatch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_once(&mut self) -> Result<(), MonitorError> {
        self.check().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_used_handles_zero_total() {
        assert_eq!(percent_used(0, 0), None);
        assert_eq!(percent_used(200, 50), Some(25.0));
    }

    #[test]
    fn deepest_mount_wins() {
        let mounts = vec![
            (Path::new("/"), 100, 10),
            (Path::new("/var"), 50, 40),
            (Path::new("/var/lib/docker"), 20, 1),
        ];
        let pick = |p: &str| best_mount(Path::new(p), mounts.iter().copied());

        assert_eq!(pick("/var/log"), Some((50, 40)));
        assert_eq!(pick("/home"), Some((100, 10)));
        assert_eq!(pick("/var/lib/docker/overlay"), Some((20, 1)));
    }

    #[tokio::test]
    async fn memory_sampler_reads_a_percentage() {
        let mut sampler = MemorySampler::new();
        let usage = sampler.sample().await.unwrap();
        assert!((0.0..=100.0).contains(&usage), "memory usage out of range: {}", usage);
    }

    #[test]
    fn no_matching_mount() {
        let mounts = vec![(Path::new("/boot"), 10, 5)];
        assert_eq!(best_mount(Path::new("/srv"), mounts.into_iter()), None);
    }
}
