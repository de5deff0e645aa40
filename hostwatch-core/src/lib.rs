pub mod collector;
pub mod command;
pub mod config;
pub mod detector;
pub mod error;
pub mod monitor;
pub mod sampler;
pub mod scheduler;
pub mod service;
pub mod snapshot;
pub mod whitelist;


pub use collector::{Collector, CommandCollector, Normalizer};
pub use command::{run_captured, CommandSpec};
pub use config::{Concern, MonitorConfig};
pub use detector::{detect, Drift, DriftMonitor};
pub use error::{CaptureError, ConfigError, MonitorError, ReadError, StoreError};
pub use monitor::HostMonitor;
pub use sampler::{Reading, Sampler, ThresholdOutcome, ThresholdWatch};
pub use scheduler::{Scheduler, Task};
pub use service::{ServiceSource, SystemctlServices};
pub use snapshot::SnapshotStore;
pub use whitelist::{ServiceWatch, ServiceWhitelist};
