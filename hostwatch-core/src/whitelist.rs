use crate::error::{MonitorError, StoreError};
use crate::scheduler::Task;
use crate::service::ServiceSource;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Known service identifiers, mirrored in a newline-delimited file.
///
/// Entries are only ever added while the process runs.
pub struct ServiceWhitelist {
    path: PathBuf,
    known: RwLock<HashSet<String>>,
}

impl ServiceWhitelist {
    /// Load the whitelist, creating an empty file if there is none.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        if !path.exists() {
            warn!(path = %path.display(), "Whitelist file does not exist. Creating a new one.");
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::new("create directory", parent, e))?;
            }
            fs::write(&path, "").map_err(|e| StoreError::new("create whitelist", &path, e))?;
        }

        let content =
            fs::read_to_string(&path).map_err(|e| StoreError::new("read whitelist", &path, e))?;
        let known = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            path,
            known: RwLock::new(known),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known.read().contains(id)
    }

    pub fn len(&self) -> usize {
        self.known.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.read().is_empty()
    }

    /// Trust `id` from now on. Returns false if it was already known.
    ///
    /// The file is appended before the in-memory set is updated, so a failed
    /// write leaves the service unknown and it is retried next cycle.
    pub fn learn(&self, id: &str) -> Result<bool, StoreError> {
        let mut known = self.known.write();
        if known.contains(id) {
            return Ok(false);
        }

        self.append(id)
            .map_err(|e| StoreError::new("append to whitelist", &self.path, e))?;
        known.insert(id.to_string());
        info!(service = id, "Service added to whitelist.");
        Ok(true)
    }

    /// Learn every active service not yet known and return those that were new.
    pub fn reconcile(&self, active: &[String]) -> Result<Vec<String>, StoreError> {
        let mut learned = Vec::new();
        for service in active {
            if self.is_known(service) {
                continue;
            }
            info!(service = %service, "New service detected: {}", service);
            if self.learn(service)? {
                learned.push(service.clone());
            }
        }
        Ok(learned)
    }

    fn append(&self, id: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", id)
    }
}

/// Periodic check of running services against the whitelist.
pub struct ServiceWatch {
    source: Box<dyn ServiceSource>,
    whitelist: ServiceWhitelist,
}

impl ServiceWatch {
    pub fn new(source: Box<dyn ServiceSource>, whitelist: ServiceWhitelist) -> Self {
        Self { source, whitelist }
    }

    pub fn whitelist(&self) -> &ServiceWhitelist {
        &self.whitelist
    }

    pub async fn check(&self) -> Result<Vec<String>, StoreError> {
        let active = self.source.list_active().await;
        self.whitelist.reconcile(&active)
    }
}

#[async_trait]
impl Task for ServiceWatch {
    fn name(&self) -> &str {
        "services"
    }

    async fn run_once(&mut self) -> Result<(), MonitorError> {
        self.check().await?;
        Ok(())
    }
}
