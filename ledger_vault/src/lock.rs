//! Advisory cross-process file lock for an open vault (§4.J).
//!
//! Lock release is tied to [`LockGuard`]'s `Drop`. A best-effort panic hook
//! additionally sweeps a process-wide registry of still-held lock paths so an
//! abrupt shutdown (a panic unwinding past the guard, or one on another
//! thread) doesn't leave a stale `.lock` file behind. This is the one piece
//! of genuinely global mutable state in this crate — do not reach for this
//! pattern elsewhere.

use ledger_core::errors::VaultError;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, OnceLock};
use std::time::{Duration, Instant};

const RETRY_INTERVAL: Duration = Duration::from_millis(200);

fn registry() -> &'static Mutex<HashSet<PathBuf>> {
    static REGISTRY: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashSet::new()))
}

fn install_panic_hook_once() {
    static INSTALLED: Once = Once::new();
    INSTALLED.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            sweep_registry();
            previous(info);
        }));
    });
}

fn sweep_registry() {
    if let Ok(mut held) = registry().lock() {
        for path in held.drain() {
            let _ = fs::remove_file(&path);
        }
    }
}

fn lock_path(vault_path: &Path) -> PathBuf {
    let mut path = vault_path.as_os_str().to_owned();
    path.push(".lock");
    PathBuf::from(path)
}

/// Held for the lifetime of an open vault; releases the lock file on drop.
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
        if let Ok(mut held) = registry().lock() {
            held.remove(&self.path);
        }
    }
}

/// Attempts to create `vault_path.lock`, retrying every 200ms until
/// `timeout_ms` elapses. A `timeout_ms` of 0 means "fail immediately if held".
pub fn acquire(vault_path: &Path, timeout_ms: u64) -> Result<LockGuard, VaultError> {
    install_panic_hook_once();
    let path = lock_path(vault_path);
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => {
                if let Ok(mut held) = registry().lock() {
                    held.insert(path.clone());
                }
                return Ok(LockGuard { path });
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                if Instant::now() >= deadline {
                    return Err(VaultError::Generic(format!(
                        "vault at {} is locked by another process",
                        vault_path.display()
                    )));
                }
                std::thread::sleep(RETRY_INTERVAL.min(deadline - Instant::now()));
            }
            Err(err) => {
                return Err(VaultError::Generic(format!("failed to acquire lock: {err}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_fast_without_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let vault_path = dir.path().join("vault.json");
        let first = acquire(&vault_path, 0).unwrap();
        let second = acquire(&vault_path, 0);
        assert!(second.is_err());
        drop(first);
        assert!(acquire(&vault_path, 0).is_ok());
    }
}
