//! Exclusive lock file for a dataset
//!
//! Only one session may write to a dataset at a time. The lock is a file next
//! to the database holding the owner's pid, created with `create_new` and
//! removed on drop. A lock left behind by a process that no longer exists is
//! taken over.

use crate::DokkanError;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Guard holding the lock file for one database
#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    /// Returns the lock file path used for `database_path`
    pub fn lock_path(database_path: &Path) -> PathBuf {
        let mut name = database_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        database_path.with_file_name(name)
    }

    /// Acquires the lock for `database_path`
    ///
    /// # Returns
    ///
    /// * `Ok(SessionLock)` - The lock is held until the guard is dropped
    /// * `Err(DokkanError::Locked)` - A live process holds the lock
    /// * `Err(DokkanError::Io)` - The lock file could not be created
    pub fn acquire(database_path: &Path) -> Result<Self, DokkanError> {
        let path = Self::lock_path(database_path);

        match Self::create(&path) {
            Err(DokkanError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {}
            other => return other,
        }

        let holder = fs::read_to_string(&path).unwrap_or_default();
        match holder.trim().parse::<u32>() {
            Ok(pid) if !process_alive(pid) => {
                tracing::warn!(
                    "Removing stale lock file {} left by pid {}",
                    path.display(),
                    pid
                );
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            // Unparseable content may be a holder that has not written its pid yet
            _ => return Err(locked(&path, holder.trim())),
        }

        match Self::create(&path) {
            Err(DokkanError::Io(e)) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                Err(locked(&path, holder.trim()))
            }
            other => other,
        }
    }

    fn create(path: &Path) -> Result<Self, DokkanError> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn locked(path: &Path, holder: &str) -> DokkanError {
    DokkanError::Locked(format!("{} (held by pid {})", path.display(), holder))
}

fn process_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).is_some()
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}
