use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_THRESHOLD: f32 = 90.0;
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CPU_SAMPLE_WINDOW_MS: u64 = 1000;

/// One independently scheduled monitoring concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    Cpu,
    Memory,
    Disk,
    Services,
    Firewall,
    Users,
}

impl Concern {
    pub const ALL: [Concern; 6] = [
        Concern::Cpu,
        Concern::Memory,
        Concern::Disk,
        Concern::Services,
        Concern::Firewall,
        Concern::Users,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Concern::Cpu => "cpu",
            Concern::Memory => "memory",
            Concern::Disk => "disk",
            Concern::Services => "services",
            Concern::Firewall => "iptables",
            Concern::Users => "users",
        }
    }
}

/// Per-concern interval overrides, in seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Intervals {
    pub cpu: Option<u64>,
    pub memory: Option<u64>,
    pub disk: Option<u64>,
    pub services: Option<u64>,
    pub firewall: Option<u64>,
    pub users: Option<u64>,
}

impl Intervals {
    fn get(&self, concern: Concern) -> Option<u64> {
        match concern {
            Concern::Cpu => self.cpu,
            Concern::Memory => self.memory,
            Concern::Disk => self.disk,
            Concern::Services => self.services,
            Concern::Firewall => self.firewall,
            Concern::Users => self.users,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Monitors {
    pub cpu: bool,
    pub memory: bool,
    pub disk: bool,
    pub services: bool,
    pub firewall: bool,
    pub users: bool,
}

impl Default for Monitors {
    fn default() -> Self {
        Self {
            cpu: true,
            memory: true,
            disk: true,
            services: true,
            firewall: true,
            users: true,
        }
    }
}

impl Monitors {
    fn get(&self, concern: Concern) -> bool {
        match concern {
            Concern::Cpu => self.cpu,
            Concern::Memory => self.memory,
            Concern::Disk => self.disk,
            Concern::Services => self.services,
            Concern::Firewall => self.firewall,
            Concern::Users => self.users,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub log_directory: PathBuf,
    pub log_file: String,
    pub cpu_threshold: f32,
    pub memory_threshold: f32,
    pub disk_threshold: f32,
    /// Seconds between checks for every concern without an override.
    pub check_interval: u64,
    pub intervals: Intervals,
    /// Upper bound, in seconds, on any external command.
    pub command_timeout: u64,
    pub disk_path: PathBuf,
    pub cpu_sample_window_ms: u64,
    pub firewall_snapshot: String,
    pub users_snapshot: String,
    pub service_whitelist: String,
    pub monitors: Monitors,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("./logs"),
            log_file: "log.log".to_string(),
            cpu_threshold: DEFAULT_THRESHOLD,
            memory_threshold: DEFAULT_THRESHOLD,
            disk_threshold: DEFAULT_THRESHOLD,
            check_interval: DEFAULT_CHECK_INTERVAL_SECS,
            intervals: Intervals::default(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT_SECS,
            disk_path: PathBuf::from("/"),
            cpu_sample_window_ms: DEFAULT_CPU_SAMPLE_WINDOW_MS,
            firewall_snapshot: "iptables_snapshot.txt".to_string(),
            users_snapshot: "users_snapshot.txt".to_string(),
            service_whitelist: "service_whitelist.txt".to_string(),
            monitors: Monitors::default(),
        }
    }
}

impl MonitorConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, Path::new("<inline>"))
    }

    fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("cpu_threshold", self.cpu_threshold),
            ("memory_threshold", self.memory_threshold),
            ("disk_threshold", self.disk_threshold),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }

        if self.check_interval == 0 {
            return Err(ConfigError::Invalid("check_interval must be positive".to_string()));
        }
        for concern in Concern::ALL {
            if self.intervals.get(concern) == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "intervals.{} must be positive",
                    concern.name()
                )));
            }
        }
        if self.command_timeout == 0 {
            return Err(ConfigError::Invalid("command_timeout must be positive".to_string()));
        }
        if self.cpu_sample_window_ms == 0 {
            return Err(ConfigError::Invalid("cpu_sample_window_ms must be positive".to_string()));
        }

        Ok(())
    }

    pub fn interval_for(&self, concern: Concern) -> Duration {
        Duration::from_secs(self.intervals.get(concern).unwrap_or(self.check_interval))
    }

    pub fn is_enabled(&self, concern: Concern) -> bool {
        self.monitors.get(concern)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout)
    }

    pub fn cpu_sample_window(&self) -> Duration {
        Duration::from_millis(self.cpu_sample_window_ms)
    }

    pub fn firewall_snapshot_path(&self) -> PathBuf {
        self.log_directory.join(&self.firewall_snapshot)
    }

    pub fn users_snapshot_path(&self) -> PathBuf {
        self.log_directory.join(&self.users_snapshot)
    }

    pub fn whitelist_path(&self) -> PathBuf {
        self.log_directory.join(&self.service_whitelist)
    }
}
