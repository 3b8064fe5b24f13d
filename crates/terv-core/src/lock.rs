//! Cross-process install lock.
//!
//! A `.lock` marker file created with `create_new` serializes installs of
//! the same tool across processes. Waiters poll once per second; the first
//! wait is reported as a warning, later ones at debug level so a long hold
//! does not flood the output. An interrupt while holding the lock removes
//! the marker before the process dies, so a killed install cannot wedge
//! every later one.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, TervError};
use crate::reporter::Reporter;

const LOCK_NAME: &str = ".lock";

/// Held lock on a tool directory. Dropping it releases the lock.
pub struct LockGuard {
    lock_path: PathBuf,
    cleaner: tokio::task::JoinHandle<()>,
}

/// Acquire the install lock for `dir`, waiting until the current holder
/// releases it.
pub async fn acquire(dir: &Path, reporter: &dyn Reporter) -> Result<LockGuard> {
    fs::create_dir_all(dir).map_err(|err| lock_error(dir, err))?;
    let lock_path = dir.join(LOCK_NAME);

    let mut waited = false;
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(_) => break,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let msg = format!(
                    "Lock {} held by another process, waiting...",
                    lock_path.display()
                );
                if waited {
                    reporter.debug(&msg);
                } else {
                    reporter.warning(&msg);
                    waited = true;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(err) => return Err(lock_error(dir, err)),
        }
    }

    // an interrupt while holding the lock must not leave the marker behind
    let cleanup_path = lock_path.clone();
    let cleaner = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = fs::remove_file(&cleanup_path);
            std::process::exit(130);
        }
    });

    Ok(LockGuard { lock_path, cleaner })
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.cleaner.abort();
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_error(dir: &Path, source: std::io::Error) -> TervError {
    TervError::Lock {
        dir: dir.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;
    use tempfile::tempdir;

    #[tokio::test]
    async fn acquire_creates_and_release_removes_marker() {
        let dir = tempdir().unwrap();
        let guard = acquire(dir.path(), &NullReporter).await.unwrap();
        assert!(dir.path().join(LOCK_NAME).exists());
        drop(guard);
        assert!(!dir.path().join(LOCK_NAME).exists());
    }

    #[tokio::test]
    async fn held_lock_blocks_second_acquire() {
        let dir = tempdir().unwrap();
        let guard = acquire(dir.path(), &NullReporter).await.unwrap();

        let contender = acquire(dir.path(), &NullReporter);
        let raced =
            tokio::time::timeout(Duration::from_millis(100), contender).await;
        assert!(raced.is_err());

        drop(guard);
        let guard2 = tokio::time::timeout(Duration::from_secs(3), acquire(dir.path(), &NullReporter))
            .await
            .expect("lock should be acquirable after release")
            .unwrap();
        drop(guard2);
    }
}
