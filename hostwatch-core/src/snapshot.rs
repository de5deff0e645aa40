use crate::error::StoreError;
use parking_lot::Mutex;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// The single persisted baseline for one monitored resource.
pub struct SnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    /// Bind a store to `path`, creating its parent directory if missing.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::new("create directory", parent, e))?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the baseline. A missing file means no baseline yet.
    pub fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::new("read snapshot", &self.path, e)),
        }
    }

    /// Replace the baseline with `text`.
    ///
    /// The text goes to a sibling temporary file which is then renamed over
    /// the snapshot, so readers see either the old or the new baseline.
    pub fn save(&self, text: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();

        let temp_path = self.temp_path();
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(text.as_bytes())?;
            file.sync_all()
        };
        write().map_err(|e| StoreError::new("write snapshot", &temp_path, e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::new("replace snapshot", &self.path, e)
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_snapshot_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("iptables_snapshot.txt")).unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state/users_snapshot.txt");
        let _store = SnapshotStore::new(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn save_replaces_content_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snap.txt")).unwrap();

        store.save("RULE A\n").unwrap();
        store.save("RULE B\n").unwrap();

        assert_eq!(store.load().unwrap().as_deref(), Some("RULE B\n"));
        assert!(!dir.path().join("snap.txt.tmp").exists());
    }
}
