// src/store/lock.rs

//! File-based advisory mutex with staleness timeout.
//!
//! Coordination is strictly cross-process: two processes can both observe
//! `is_locked() == false` and race to create the lock file. The
//! serialization guarantee this gives is "the last writer wins for any
//! single mutation"; callers (deplist push, config write) must be
//! idempotent under that race.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::{Duration, SystemTime};

const LOCK_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const DEADLOCK_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct Locker {
    lock_file: PathBuf,
}

impl Locker {
    pub fn new(base_path: &Path) -> Self {
        Locker {
            lock_file: base_path.join("data.lock"),
        }
    }

    /// True iff the lock file exists and is younger than the lock timeout.
    /// A stale file is force-removed and `false` is returned.
    pub fn is_locked(&self) -> bool {
        let meta = match fs::metadata(&self.lock_file) {
            Ok(m) => m,
            Err(_) => return false,
        };
        let age = meta
            .modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .unwrap_or(Duration::ZERO);
        if age > LOCK_TIMEOUT {
            tracing::debug!("lock timeout reached, forcing release");
            let _ = fs::remove_file(&self.lock_file);
            return false;
        }
        true
    }

    /// Poll until unlocked or `deadlock_timeout` elapses, then create the
    /// lock file. Returns success iff the file exists after the call.
    pub fn acquire(&self) -> bool {
        let start = SystemTime::now();
        while self.is_locked() {
            sleep(POLL_INTERVAL);
            if SystemTime::now()
                .duration_since(start)
                .unwrap_or(Duration::ZERO)
                > DEADLOCK_TIMEOUT
            {
                tracing::warn!("deadlock timeout reached acquiring {}", self.lock_file.display());
                return false;
            }
        }
        let _ = fs::write(&self.lock_file, b"");
        self.lock_file.exists()
    }

    /// Best-effort unlink; a missing file is not an error.
    pub fn release(&self) {
        let _ = fs::remove_file(&self.lock_file);
    }
}
