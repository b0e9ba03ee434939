//! Storage backend abstraction: a real filesystem path, or a caller-supplied
//! async read/write/remove surface for hosts without a conventional
//! filesystem (§4.J, "browser-flavored" variant).

use async_trait::async_trait;
use ledger_core::errors::VaultError;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

#[async_trait]
pub trait VaultBackend: Send + Sync {
    async fn read(&self) -> Result<Option<Vec<u8>>, VaultError>;
    async fn write(&self, bytes: &[u8]) -> Result<(), VaultError>;
    async fn remove(&self) -> Result<(), VaultError>;

    /// `true` if this backend is a real filesystem path (and therefore
    /// eligible for the advisory file lock).
    fn file_path(&self) -> Option<&Path>;
}

/// Real filesystem backend; writes are atomic (temp file + rename).
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VaultBackend for FileBackend {
    async fn read(&self) -> Result<Option<Vec<u8>>, VaultError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(VaultError::Generic(format!("failed to read vault file: {err}"))),
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| VaultError::Generic(format!("failed to create vault dir: {err}")))?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|err| VaultError::Generic(format!("failed to write vault temp file: {err}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| VaultError::Generic(format!("failed to rename vault temp file: {err}")))
    }

    async fn remove(&self) -> Result<(), VaultError> {
        let _ = tokio::fs::remove_file(&self.path).await;
        Ok(())
    }

    fn file_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

type ReadFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, VaultError>> + Send>> + Send + Sync>;
type WriteFn = Arc<dyn Fn(Vec<u8>) -> Pin<Box<dyn Future<Output = Result<(), VaultError>> + Send>> + Send + Sync>;
type RemoveFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<(), VaultError>> + Send>> + Send + Sync>;

/// Caller-supplied `{read, write, remove}` store for hosts without a
/// conventional filesystem (e.g. embedding inside another service's
/// key-value store).
#[derive(Clone)]
pub struct PluggableBackend {
    read_fn: ReadFn,
    write_fn: WriteFn,
    remove_fn: Option<RemoveFn>,
}

impl PluggableBackend {
    pub fn new(read_fn: ReadFn, write_fn: WriteFn, remove_fn: Option<RemoveFn>) -> Self {
        Self {
            read_fn,
            write_fn,
            remove_fn,
        }
    }
}

#[async_trait]
impl VaultBackend for PluggableBackend {
    async fn read(&self) -> Result<Option<Vec<u8>>, VaultError> {
        (self.read_fn)().await
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), VaultError> {
        (self.write_fn)(bytes.to_vec()).await
    }

    async fn remove(&self) -> Result<(), VaultError> {
        match &self.remove_fn {
            Some(remove_fn) => remove_fn().await,
            None => Ok(()),
        }
    }

    fn file_path(&self) -> Option<&Path> {
        None
    }
}
